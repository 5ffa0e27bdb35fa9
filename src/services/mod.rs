// LangProbe Core Services

pub mod text_processor;
pub mod config_store;
pub mod providers;
pub mod detection;
pub mod document;
pub mod collection;

pub use text_processor::*;
pub use config_store::*;
pub use providers::*;
pub use document::*;
pub use collection::*;

// Re-export detection module functions
pub use detection::{
    build_profile,
    build_profiles,
    classify_classic,
    classify_document,
    implemented_methods,
    interpret_reply,
    score_char_signature,
    score_short_words,
    CorpusSource,
    DirectoryCorpus,
    GeminiLanguageSignal,
    LanguageModel,
    NeuralSignal,
    ProfileBuild,
    ProfileWarning,
    WordFrequencyProfile,
};
