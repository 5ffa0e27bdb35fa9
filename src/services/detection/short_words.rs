// Short-Word Likelihood Classifier
// Scores a document against each language profile with a smoothed log-likelihood

use std::collections::BTreeMap;
use tracing::{debug, warn};

use crate::models::{Label, ScoreResult};
use crate::services::config_store::ClassifierConfig;
use crate::services::text_processor::{is_short_word, word_frequencies};

use super::profile::WordFrequencyProfile;

/// Confidence given to every language when the document carries no signal.
const INSUFFICIENT_SIGNAL_CONFIDENCE: f64 = 0.5;

fn insufficient_signal(profiles: &[(String, WordFrequencyProfile)]) -> ScoreResult {
    ScoreResult::unknown_uniform(
        profiles.iter().map(|(name, _)| name.as_str()),
        INSUFFICIENT_SIGNAL_CONFIDENCE,
    )
}

/// Log-likelihood of the document's short words under one profile.
/// An empty profile cannot score anything and yields negative infinity.
fn log_likelihood(
    short_words: &[(&str, usize)],
    profile: &WordFrequencyProfile,
    min_probability: f64,
) -> f64 {
    if profile.is_empty() {
        return f64::NEG_INFINITY;
    }
    short_words
        .iter()
        .map(|(word, count)| {
            let p = profile.get(word).unwrap_or(min_probability);
            *count as f64 * p.ln()
        })
        .sum()
}

/// Softmax over temperature-scaled log-likelihoods. Returns `None` when the
/// exponentials underflow to zero.
fn smoothed_softmax(log_probs: &[f64], temperature: f64) -> Option<Vec<f64>> {
    let scaled: Vec<f64> = log_probs.iter().map(|lp| lp / temperature).collect();
    let max = scaled.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    if !max.is_finite() {
        return None;
    }

    let exps: Vec<f64> = scaled.iter().map(|s| (s - max).exp()).collect();
    let total: f64 = exps.iter().sum();
    if total == 0.0 || !total.is_finite() {
        return None;
    }
    Some(exps.into_iter().map(|e| e / total).collect())
}

/// Score `text` (normalized) against the ordered language profiles.
///
/// The winner is the language with the highest confidence; on an exact tie the
/// language listed first in configuration wins.
pub fn score_short_words(
    text: &str,
    profiles: &[(String, WordFrequencyProfile)],
    params: &ClassifierConfig,
) -> ScoreResult {
    let counts = word_frequencies(text);
    let mut short_words: Vec<(&str, usize)> = counts
        .into_iter()
        .filter(|(word, _)| is_short_word(word, params.short_word_max_length))
        .collect();
    // Deterministic summation order
    short_words.sort_unstable_by(|a, b| a.0.cmp(b.0));

    debug!(
        "[SHORT_WORDS] Found {} distinct short words to analyze",
        short_words.len()
    );

    if short_words.is_empty() {
        warn!("[SHORT_WORDS] No short words in text, returning insufficient-signal result");
        return insufficient_signal(profiles);
    }

    let log_probs: Vec<f64> = profiles
        .iter()
        .map(|(_, profile)| log_likelihood(&short_words, profile, params.min_probability))
        .collect();

    debug!(
        "[SHORT_WORDS] Log-likelihoods: {:?}",
        profiles
            .iter()
            .map(|(name, _)| name.as_str())
            .zip(log_probs.iter())
            .collect::<Vec<_>>()
    );

    if log_probs.iter().all(|lp| *lp == f64::NEG_INFINITY) {
        warn!("[SHORT_WORDS] No language profile could score the text");
        return insufficient_signal(profiles);
    }

    let confidences = match smoothed_softmax(&log_probs, params.temperature) {
        Some(c) => c,
        None => {
            warn!("[SHORT_WORDS] Softmax degenerated, returning insufficient-signal result");
            return insufficient_signal(profiles);
        }
    };

    let mut best = 0usize;
    for (idx, conf) in confidences.iter().enumerate() {
        if *conf > confidences[best] {
            best = idx;
        }
    }

    let per_language_scores: BTreeMap<String, f64> = profiles
        .iter()
        .zip(confidences.iter())
        .map(|((name, _), conf)| (name.clone(), *conf))
        .collect();

    debug!(
        "[SHORT_WORDS] Winner {} with confidence {:.4}",
        profiles[best].0, confidences[best]
    );

    ScoreResult {
        label: Label::language(profiles[best].0.clone()),
        confidence: confidences[best],
        per_language_scores,
        error: None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::detection::profile::build_profile;
    use crate::services::text_processor::{normalize, TextNormalizer};

    const RUSSIAN_CORPUS: &str = "Я не знаю, что он сказал. Мы были в доме и на улице. \
        Он и она не были там. Это был мой дом, и я в нём жил. \
        Как ты? Я не могу, но он может. Что это? Это не то, что ты думал.";
    const GERMAN_CORPUS: &str = "Ich weiß nicht, was er sagt. Wir waren in dem Haus und auf der Straße. \
        Er und sie sind nicht da. Das ist mein Haus, und ich bin zu Hause. \
        Wie geht es dir? Ich kann nicht, aber er kann. Was ist das? Das ist nicht so.";

    fn profiles() -> Vec<(String, WordFrequencyProfile)> {
        let n = TextNormalizer::default();
        vec![
            ("Russian".to_string(), build_profile(RUSSIAN_CORPUS, 5, &n)),
            ("German".to_string(), build_profile(GERMAN_CORPUS, 5, &n)),
        ]
    }

    #[test]
    fn test_empty_text_returns_sentinel() {
        let result = score_short_words("", &profiles(), &ClassifierConfig::default());
        assert_eq!(result.label, Label::Unknown);
        assert_eq!(result.confidence, 0.5);
        assert_eq!(result.score_of("Russian"), Some(0.5));
        assert_eq!(result.score_of("German"), Some(0.5));
    }

    #[test]
    fn test_only_long_words_returns_sentinel() {
        let text = normalize("Государственность правительственный");
        let result = score_short_words(&text, &profiles(), &ClassifierConfig::default());
        assert_eq!(result.label, Label::Unknown);
        assert_eq!(result.confidence, 0.5);
    }

    #[test]
    fn test_all_profiles_empty_returns_sentinel() {
        let empty = vec![
            ("Russian".to_string(), WordFrequencyProfile::default()),
            ("German".to_string(), WordFrequencyProfile::default()),
        ];
        let result = score_short_words("и в не", &empty, &ClassifierConfig::default());
        assert_eq!(result.label, Label::Unknown);
        assert_eq!(result.score_of("German"), Some(0.5));
    }

    #[test]
    fn test_russian_function_words_win_with_high_confidence() {
        let text = normalize(&"и в не на что ".repeat(100));
        let result = score_short_words(&text, &profiles(), &ClassifierConfig::default());
        assert_eq!(result.label, Label::language("Russian"));
        assert!(result.confidence > 0.9, "confidence {}", result.confidence);
        assert!((result.score_sum() - 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_german_text_detected() {
        let text = normalize(&"ich und er ist nicht das in der ".repeat(50));
        let result = score_short_words(&text, &profiles(), &ClassifierConfig::default());
        assert_eq!(result.label, Label::language("German"));
        assert!((result.score_sum() - 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_empty_profile_loses_but_does_not_block() {
        let n = TextNormalizer::default();
        let partial = vec![
            ("Russian".to_string(), WordFrequencyProfile::default()),
            ("German".to_string(), build_profile(GERMAN_CORPUS, 5, &n)),
        ];
        let result = score_short_words("и в не", &partial, &ClassifierConfig::default());
        assert_eq!(result.label, Label::language("German"));
        assert_eq!(result.confidence, 1.0);
        assert_eq!(result.score_of("Russian"), Some(0.0));
    }

    #[test]
    fn test_higher_temperature_flattens_confidence() {
        let text = normalize("и в не на что он");
        let profiles = profiles();
        let mut last = f64::INFINITY;
        for temperature in [1000.0, 2000.0, 5000.0, 20000.0] {
            let params = ClassifierConfig {
                temperature,
                ..ClassifierConfig::default()
            };
            let result = score_short_words(&text, &profiles, &params);
            assert_eq!(result.label, Label::language("Russian"));
            assert!(result.confidence > 0.5);
            assert!(result.confidence < last, "T={} conf={}", temperature, result.confidence);
            last = result.confidence;
        }
    }

    // Exact ties go to the first configured language. This is a fixed
    // priority rule, not something learned from data.
    #[test]
    fn test_tie_goes_to_first_listed_language() {
        let n = TextNormalizer::default();
        let shared = build_profile("a b c a", 5, &n);
        let forward = vec![
            ("Russian".to_string(), shared.clone()),
            ("German".to_string(), shared.clone()),
        ];
        let backward = vec![
            ("German".to_string(), shared.clone()),
            ("Russian".to_string(), shared),
        ];

        for _ in 0..3 {
            let r1 = score_short_words("a b", &forward, &ClassifierConfig::default());
            assert_eq!(r1.label, Label::language("Russian"));
            assert_eq!(r1.confidence, 0.5);

            let r2 = score_short_words("a b", &backward, &ClassifierConfig::default());
            assert_eq!(r2.label, Label::language("German"));
        }
    }

    #[test]
    fn test_softmax_underflow_is_none() {
        assert!(smoothed_softmax(&[f64::NEG_INFINITY, f64::NEG_INFINITY], 1.0).is_none());
        let probs = smoothed_softmax(&[-1000.0, -1001.0, -5000.0], 1.0).unwrap();
        assert!((probs.iter().sum::<f64>() - 1.0).abs() < 1e-12);
    }
}
