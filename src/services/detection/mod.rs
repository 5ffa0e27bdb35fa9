// Detection Module
// Language identification core organized into specialized submodules:
// - profile: builds short-word frequency profiles from training corpora
// - short_words: smoothed log-likelihood scoring against the profiles
// - alphabet: distinctive-character scoring with a closeness policy
// - model: immutable bundle of profiles and parameters
// - llm_signal: external model adapter reported alongside the classic methods
// - aggregation: per-document result assembly keyed by method

pub mod profile;
pub mod short_words;
pub mod alphabet;
pub mod model;
pub mod llm_signal;
pub mod aggregation;

pub use profile::{
    build_profile,
    build_profiles,
    CorpusSource,
    DirectoryCorpus,
    ProfileWarning,
    WordFrequencyProfile,
};
pub use short_words::score_short_words;
pub use alphabet::score_char_signature;
pub use model::{LanguageModel, ProfileBuild};
pub use llm_signal::{interpret_reply, GeminiLanguageSignal, NeuralSignal};
pub use aggregation::{classify_classic, classify_document, ensure_well_formed, implemented_methods};
