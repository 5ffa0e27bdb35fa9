// Aggregation Logic
// Collects every method's result for one document, side by side.
// No numeric fusion: each method is reported independently.

use tracing::{debug, warn};

use crate::models::{Label, Method, MethodResults, ScoreResult};
use crate::services::text_processor::NormalizedText;

use super::llm_signal::NeuralSignal;
use super::model::LanguageModel;

/// Guarantee a result is reportable: finite confidences within [0, 1].
pub fn ensure_well_formed(method: Method, mut result: ScoreResult) -> ScoreResult {
    let finite = result.confidence.is_finite()
        && result.per_language_scores.values().all(|s| s.is_finite());
    if !finite {
        warn!("[AGGREGATE] {} produced a non-finite score, replacing with Unknown", method);
        let names: Vec<String> = result.per_language_scores.keys().cloned().collect();
        return ScoreResult::unknown_uniform(names.iter().map(String::as_str), 0.5);
    }

    result.confidence = result.confidence.clamp(0.0, 1.0);
    for score in result.per_language_scores.values_mut() {
        *score = score.clamp(0.0, 1.0);
    }
    if result.label == Label::Error && result.error.is_none() {
        result.error = Some(format!("{} failed", method));
    }
    result
}

/// Run both statistical methods on normalized text.
pub fn classify_classic(text: &NormalizedText, model: &LanguageModel) -> MethodResults {
    let mut results = MethodResults::new();
    results.insert(
        Method::ShortWords,
        ensure_well_formed(Method::ShortWords, model.score_short_words(text)),
    );
    results.insert(
        Method::Alphabetical,
        ensure_well_formed(Method::Alphabetical, model.score_char_signature(text)),
    );
    debug!(
        "[AGGREGATE] classic results: short_words={} alphabetical={}",
        results[&Method::ShortWords].label,
        results[&Method::Alphabetical].label
    );
    results
}

/// All methods for one document: classic on normalized text, neural on raw text.
pub async fn classify_document<N: NeuralSignal>(
    raw_text: &str,
    normalized: &NormalizedText,
    model: &LanguageModel,
    neural: Option<&N>,
) -> MethodResults {
    let mut results = classify_classic(normalized, model);
    if let Some(signal) = neural {
        let nn = signal.classify(raw_text).await;
        results.insert(Method::NeuralNetwork, ensure_well_formed(Method::NeuralNetwork, nn));
    }
    results
}

pub fn implemented_methods(neural_enabled: bool) -> Vec<Method> {
    Method::ALL
        .into_iter()
        .filter(|m| neural_enabled || *m != Method::NeuralNetwork)
        .collect()
}
