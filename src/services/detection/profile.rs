// Profile Builder
// Builds per-language short-word frequency profiles from training corpora

use std::collections::HashMap;
use std::io;
use std::path::PathBuf;
use thiserror::Error;
use tracing::{error, info, warn};

use crate::services::config_store::LanguageConfig;
use crate::services::text_processor::{is_short_word, TextNormalizer};

/// Recoverable problems found while building profiles. The affected language
/// ends up with an empty profile and cannot win the short-word method.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ProfileWarning {
    #[error("training corpus for {language} could not be read: {reason}")]
    CorpusUnreadable { language: String, reason: String },
    #[error("training corpus for {language} contains no words of length <= {max_len}")]
    NoShortWords { language: String, max_len: usize },
}

impl ProfileWarning {
    pub fn language(&self) -> &str {
        match self {
            ProfileWarning::CorpusUnreadable { language, .. } => language,
            ProfileWarning::NoShortWords { language, .. } => language,
        }
    }
}

/// Relative frequency of each short word within one language's corpus.
/// Frequencies sum to 1 over the retained short words only.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct WordFrequencyProfile {
    frequencies: HashMap<String, f64>,
    total_tokens: usize,
}

impl WordFrequencyProfile {
    pub fn get(&self, word: &str) -> Option<f64> {
        self.frequencies.get(word).copied()
    }

    pub fn is_empty(&self) -> bool {
        self.frequencies.is_empty()
    }

    pub fn len(&self) -> usize {
        self.frequencies.len()
    }

    /// Number of short-word tokens the profile was built from.
    pub fn total_tokens(&self) -> usize {
        self.total_tokens
    }

    /// Most frequent words, ties ordered alphabetically.
    pub fn top_words(&self, n: usize) -> Vec<(&str, f64)> {
        let mut words: Vec<(&str, f64)> = self
            .frequencies
            .iter()
            .map(|(w, f)| (w.as_str(), *f))
            .collect();
        words.sort_by(|a, b| {
            b.1.partial_cmp(&a.1)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then_with(|| a.0.cmp(b.0))
        });
        words.truncate(n);
        words
    }
}

/// Build a profile from raw corpus text.
///
/// Returns an empty profile when the corpus has no qualifying short words;
/// the caller decides how to report that.
pub fn build_profile(
    corpus_text: &str,
    short_word_max_length: usize,
    normalizer: &TextNormalizer,
) -> WordFrequencyProfile {
    let clean = normalizer.normalize(corpus_text);

    let mut counts: HashMap<String, usize> = HashMap::new();
    let mut total = 0usize;
    for word in clean.words().filter(|w| is_short_word(w, short_word_max_length)) {
        *counts.entry(word.to_string()).or_insert(0) += 1;
        total += 1;
    }

    if total == 0 {
        return WordFrequencyProfile::default();
    }

    let frequencies = counts
        .into_iter()
        .map(|(word, count)| (word, count as f64 / total as f64))
        .collect();

    WordFrequencyProfile {
        frequencies,
        total_tokens: total,
    }
}

/// Supplies one raw training text per configured language.
pub trait CorpusSource {
    fn read_corpus(&self, language: &LanguageConfig) -> io::Result<String>;
}

/// Reads `<root>/<trainingFile>` for each language.
#[derive(Debug, Clone)]
pub struct DirectoryCorpus {
    root: PathBuf,
}

impl DirectoryCorpus {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }
}

impl CorpusSource for DirectoryCorpus {
    fn read_corpus(&self, language: &LanguageConfig) -> io::Result<String> {
        std::fs::read_to_string(self.root.join(&language.training_file))
    }
}

/// In-memory corpora keyed by language name.
impl CorpusSource for HashMap<String, String> {
    fn read_corpus(&self, language: &LanguageConfig) -> io::Result<String> {
        self.get(&language.name).cloned().ok_or_else(|| {
            io::Error::new(
                io::ErrorKind::NotFound,
                format!("no corpus registered for {}", language.name),
            )
        })
    }
}

/// Build one profile per language in configuration order. Never fails:
/// unreadable or empty corpora degrade to empty profiles plus a warning.
pub fn build_profiles(
    languages: &[LanguageConfig],
    short_word_max_length: usize,
    normalizer: &TextNormalizer,
    source: &dyn CorpusSource,
) -> (Vec<(String, WordFrequencyProfile)>, Vec<ProfileWarning>) {
    info!("[PROFILE] Building language profiles from training data...");

    let mut profiles = Vec::with_capacity(languages.len());
    let mut warnings = Vec::new();

    for lang in languages {
        let profile = match source.read_corpus(lang) {
            Ok(text) => {
                let profile = build_profile(&text, short_word_max_length, normalizer);
                if profile.is_empty() {
                    let warning = ProfileWarning::NoShortWords {
                        language: lang.name.clone(),
                        max_len: short_word_max_length,
                    };
                    warn!("[PROFILE] {}", warning);
                    warnings.push(warning);
                } else {
                    info!(
                        language = %lang.name,
                        distinct_words = profile.len(),
                        tokens = profile.total_tokens(),
                        "[PROFILE] Profile built"
                    );
                }
                profile
            }
            Err(e) => {
                let warning = ProfileWarning::CorpusUnreadable {
                    language: lang.name.clone(),
                    reason: e.to_string(),
                };
                warn!("[PROFILE] {}", warning);
                warnings.push(warning);
                WordFrequencyProfile::default()
            }
        };
        profiles.push((lang.name.clone(), profile));
    }

    if profiles.iter().all(|(_, p)| p.is_empty()) {
        error!("[PROFILE] No language profile could be built; check the training data folder");
    } else if warnings.is_empty() {
        info!("[PROFILE] Language profiles built successfully");
    }

    (profiles, warnings)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_build_profile_relative_frequencies() {
        let profile = build_profile("Der Hund und die Katze und der Vogel", 5, &TextNormalizer::default());
        // "katze" (5) qualifies, "vogel" (5) too; all 8 tokens are short
        assert_eq!(profile.total_tokens(), 8);
        assert!((profile.get("und").unwrap() - 2.0 / 8.0).abs() < 1e-12);
        assert!((profile.get("der").unwrap() - 2.0 / 8.0).abs() < 1e-12);
        let sum: f64 = ["der", "hund", "und", "die", "katze", "vogel"]
            .iter()
            .filter_map(|w| profile.get(w))
            .sum();
        assert!((sum - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_build_profile_skips_long_words() {
        let profile = build_profile("и государство не правительство", 5, &TextNormalizer::default());
        assert_eq!(profile.total_tokens(), 2);
        assert!(profile.get("государство").is_none());
        assert_eq!(profile.get("и"), Some(0.5));
    }

    #[test]
    fn test_build_profile_without_short_words_is_empty() {
        let profile = build_profile("Donaudampfschifffahrt Gesellschaften", 5, &TextNormalizer::default());
        assert!(profile.is_empty());
        assert_eq!(profile.total_tokens(), 0);
    }

    #[test]
    fn test_build_profiles_degrades_with_warnings() {
        let languages = vec![
            LanguageConfig::new("Russian", "russian.txt", "ёжцчшщъыьэюя"),
            LanguageConfig::new("German", "german.txt", "äöüß"),
            LanguageConfig::new("English", "english.txt", ""),
        ];
        let mut corpora = HashMap::new();
        corpora.insert("Russian".to_string(), "и в не на и".to_string());
        corpora.insert("German".to_string(), "Donaudampfschifffahrt".to_string());

        let (profiles, warnings) = build_profiles(&languages, 5, &TextNormalizer::default(), &corpora);

        assert_eq!(profiles.len(), 3);
        assert_eq!(profiles[0].0, "Russian");
        assert!(!profiles[0].1.is_empty());
        assert!(profiles[1].1.is_empty());
        assert!(profiles[2].1.is_empty());
        assert_eq!(warnings.len(), 2);
        assert!(matches!(&warnings[0], ProfileWarning::NoShortWords { language, max_len: 5 } if language == "German"));
        assert!(matches!(&warnings[1], ProfileWarning::CorpusUnreadable { language, .. } if language == "English"));
    }

    #[test]
    fn test_directory_corpus_reads_training_files() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("russian.txt"), "Я и ты, мы в доме.").unwrap();

        let languages = vec![
            LanguageConfig::new("Russian", "russian.txt", ""),
            LanguageConfig::new("German", "german.txt", ""),
        ];
        let source = DirectoryCorpus::new(dir.path());
        let (profiles, warnings) = build_profiles(&languages, 5, &TextNormalizer::default(), &source);

        assert_eq!(profiles[0].1.total_tokens(), 6);
        assert!(profiles[1].1.is_empty());
        assert_eq!(warnings.len(), 1);
        assert_eq!(warnings[0].language(), "German");
    }

    #[test]
    fn test_top_words_order() {
        let profile = build_profile("b a a c c c", 5, &TextNormalizer::default());
        let top = profile.top_words(2);
        assert_eq!(top[0].0, "c");
        assert_eq!(top[1].0, "a");
    }
}
