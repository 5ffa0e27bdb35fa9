// Character-Signature Classifier
// Scores a document by counting characters distinctive to each language

use std::collections::{BTreeMap, HashMap, HashSet};
use tracing::debug;

use crate::models::{Label, ScoreResult};
use crate::services::config_store::ClassifierConfig;

/// Score `text` with per-language distinctive-character sets.
///
/// Every language gets `signature_smoothing` added to its raw count before
/// normalizing. When the two leading confidences are closer than
/// `closeness_threshold`, the label is `Unknown` but the reported confidence
/// stays the leading confidence.
pub fn score_char_signature(
    text: &str,
    signature_sets: &[(String, HashSet<char>)],
    params: &ClassifierConfig,
) -> ScoreResult {
    if signature_sets.is_empty() {
        return ScoreResult::unscored(Label::Unknown, 0.0);
    }

    let mut char_counts: HashMap<char, usize> = HashMap::new();
    for ch in text.chars().filter(|c| !c.is_whitespace()) {
        for lower in ch.to_lowercase() {
            *char_counts.entry(lower).or_insert(0) += 1;
        }
    }

    let raw_scores: Vec<f64> = signature_sets
        .iter()
        .map(|(_, set)| {
            let hits: usize = set
                .iter()
                .map(|c| char_counts.get(c).copied().unwrap_or(0))
                .sum();
            hits as f64 + params.signature_smoothing
        })
        .collect();
    let total: f64 = raw_scores.iter().sum();
    let confidences: Vec<f64> = raw_scores.iter().map(|s| s / total).collect();

    // Leader by first-listed priority, then runner-up
    let mut best = 0usize;
    for (idx, conf) in confidences.iter().enumerate() {
        if *conf > confidences[best] {
            best = idx;
        }
    }
    let runner_up = confidences
        .iter()
        .enumerate()
        .filter(|(idx, _)| *idx != best)
        .map(|(_, c)| *c)
        .fold(0.0_f64, f64::max);

    let leading = confidences[best];
    let label = if (leading - runner_up).abs() < params.closeness_threshold {
        Label::Unknown
    } else {
        Label::language(signature_sets[best].0.clone())
    };

    debug!(
        "[ALPHABET] raw={:?} leading={:.4} runner_up={:.4} label={}",
        raw_scores, leading, runner_up, label
    );

    let per_language_scores: BTreeMap<String, f64> = signature_sets
        .iter()
        .zip(confidences.iter())
        .map(|((name, _), conf)| (name.clone(), *conf))
        .collect();

    ScoreResult {
        label,
        confidence: leading,
        per_language_scores,
        error: None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sets() -> Vec<(String, HashSet<char>)> {
        vec![
            ("Russian".to_string(), "ёжцчшщъыьэюя".chars().collect()),
            ("German".to_string(), "äöüß".chars().collect()),
        ]
    }

    #[test]
    fn test_german_signature_characters() {
        let text = "über schön für ".repeat(3);
        let result = score_char_signature(&text, &sets(), &ClassifierConfig::default());
        assert_eq!(result.label, Label::language("German"));
        assert!(result.confidence > 0.8, "confidence {}", result.confidence);
        assert!((result.score_sum() - 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_russian_signature_characters() {
        let result = score_char_signature("я пишу вам эти щи", &sets(), &ClassifierConfig::default());
        assert_eq!(result.label, Label::language("Russian"));
        assert!(result.confidence > 0.8);
    }

    #[test]
    fn test_empty_text_is_uniform_and_unknown() {
        let result = score_char_signature("   ", &sets(), &ClassifierConfig::default());
        assert_eq!(result.label, Label::Unknown);
        assert_eq!(result.confidence, 0.5);
        assert_eq!(result.score_of("Russian"), result.score_of("German"));
    }

    // "Too close to call" keeps the leading confidence instead of 0.5.
    #[test]
    fn test_close_scores_report_leading_confidence() {
        // Russian (5+1)/11, German (4+1)/11, gap 1/11 < 0.1
        let text = "яяяяя ääää";
        let result = score_char_signature(text, &sets(), &ClassifierConfig::default());
        assert_eq!(result.label, Label::Unknown);
        assert!((result.confidence - 6.0 / 11.0).abs() < 1e-12);
        assert!((result.score_sum() - 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_uppercase_signature_characters_count() {
        let result = score_char_signature("ÜBER GRÖßE ÄRGER", &sets(), &ClassifierConfig::default());
        assert_eq!(result.label, Label::language("German"));
    }

    #[test]
    fn test_exact_tie_without_threshold_goes_to_first_listed() {
        let params = ClassifierConfig {
            closeness_threshold: 0.0,
            ..ClassifierConfig::default()
        };
        let result = score_char_signature("я ä", &sets(), &params);
        assert_eq!(result.label, Label::language("Russian"));
        assert_eq!(result.confidence, 0.5);

        let mut reversed = sets();
        reversed.reverse();
        let result = score_char_signature("я ä", &reversed, &params);
        assert_eq!(result.label, Label::language("German"));
    }

    #[test]
    fn test_three_languages_sum_to_one() {
        let mut three = sets();
        three.push(("French".to_string(), "éèçà".chars().collect()));
        let result = score_char_signature("ça été très déjà", &three, &ClassifierConfig::default());
        assert_eq!(result.label, Label::language("French"));
        assert!((result.score_sum() - 1.0).abs() < 1e-6);
    }
}
