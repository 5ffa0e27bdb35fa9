// Language Model
// Immutable bundle of profiles, signature sets and parameters shared by all scoring calls

use std::collections::HashSet;
use tracing::info;

use crate::models::ScoreResult;
use crate::services::config_store::{AppConfig, ClassifierConfig, LanguageConfig};
use crate::services::text_processor::{NormalizedText, TextNormalizer};

use super::alphabet::score_char_signature;
use super::profile::{build_profiles, CorpusSource, ProfileWarning, WordFrequencyProfile};
use super::short_words::score_short_words;

/// Read-only scoring state, built once and shared (`Arc`) across tasks.
#[derive(Debug, Clone)]
pub struct LanguageModel {
    profiles: Vec<(String, WordFrequencyProfile)>,
    signatures: Vec<(String, HashSet<char>)>,
    params: ClassifierConfig,
    normalizer: TextNormalizer,
}

/// Result of the profile-build phase: the usable model plus any degradation.
#[derive(Debug)]
pub struct ProfileBuild {
    pub model: LanguageModel,
    pub warnings: Vec<ProfileWarning>,
}

impl ProfileBuild {
    /// Treat any degraded profile as an error.
    pub fn into_strict(self) -> Result<LanguageModel, Vec<ProfileWarning>> {
        if self.warnings.is_empty() {
            Ok(self.model)
        } else {
            Err(self.warnings)
        }
    }
}

impl LanguageModel {
    pub fn build(config: &AppConfig, source: &dyn CorpusSource) -> ProfileBuild {
        Self::build_with(&config.languages, config.classifier.clone(), source)
    }

    pub fn build_with(
        languages: &[LanguageConfig],
        params: ClassifierConfig,
        source: &dyn CorpusSource,
    ) -> ProfileBuild {
        let normalizer = TextNormalizer::for_languages(languages);
        let (profiles, warnings) =
            build_profiles(languages, params.short_word_max_length, &normalizer, source);
        let signatures = languages
            .iter()
            .map(|l| (l.name.clone(), l.signature_set()))
            .collect();

        info!(
            languages = languages.len(),
            degraded = warnings.len(),
            "[PROFILE] Language model ready"
        );

        ProfileBuild {
            model: Self {
                profiles,
                signatures,
                params,
                normalizer,
            },
            warnings,
        }
    }

    pub fn languages(&self) -> impl Iterator<Item = &str> {
        self.profiles.iter().map(|(name, _)| name.as_str())
    }

    pub fn profiles(&self) -> &[(String, WordFrequencyProfile)] {
        &self.profiles
    }

    pub fn params(&self) -> &ClassifierConfig {
        &self.params
    }

    pub fn normalizer(&self) -> &TextNormalizer {
        &self.normalizer
    }

    pub fn normalize(&self, raw: &str) -> NormalizedText {
        self.normalizer.normalize(raw)
    }

    pub fn score_short_words(&self, text: &NormalizedText) -> ScoreResult {
        score_short_words(text, &self.profiles, &self.params)
    }

    pub fn score_char_signature(&self, text: &str) -> ScoreResult {
        score_char_signature(text, &self.signatures, &self.params)
    }
}
