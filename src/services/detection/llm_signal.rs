// LLM Language Signal
// Adapter that asks an external model for the document language and maps its
// reply onto the same ScoreResult shape as the statistical methods.
// The reply parsing and its fallback heuristics live entirely here.

use regex::Regex;
use serde::Deserialize;
use std::collections::BTreeMap;
use std::future::Future;
use std::sync::OnceLock;
use std::time::Duration;
use tracing::{debug, error, info, warn};

use crate::models::{Label, ScoreResult};
use crate::services::config_store::NeuralConfig;
use crate::services::providers::{ProviderClient, ProviderError};

const MISSING_KEY_MESSAGE: &str = "GEMINI_API_KEY not set";
const FALLBACK_CONFIDENCE: f64 = 0.90;
const MAX_OUTPUT_TOKENS: i32 = 256;

/// Capability interface for an independent language signal computed on raw text.
pub trait NeuralSignal: Send + Sync {
    fn classify(&self, raw_text: &str) -> impl Future<Output = ScoreResult> + Send;
}

#[derive(Debug, Deserialize)]
struct LanguageReply {
    #[serde(default = "default_language")]
    language: String,
    #[serde(default)]
    confidence: Option<ReplyConfidence>,
}

/// Models sometimes quote the number.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum ReplyConfidence {
    Number(f64),
    Text(String),
}

impl ReplyConfidence {
    fn value(&self) -> Result<f64, String> {
        match self {
            ReplyConfidence::Number(n) => Ok(*n),
            ReplyConfidence::Text(s) => s
                .trim()
                .parse::<f64>()
                .map_err(|e| format!("confidence {:?} is not a number: {}", s, e)),
        }
    }
}

fn default_language() -> String {
    "Unknown".to_string()
}

fn default_confidence() -> f64 {
    0.5
}

fn json_object_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?s)\{.*\}").expect("JSON object pattern is valid"))
}

fn build_prompt(snippet: &str, languages: &[String]) -> String {
    let choices = languages
        .iter()
        .map(|l| format!("\"{}\"", l))
        .chain(std::iter::once("\"Unknown\"".to_string()))
        .collect::<Vec<_>>()
        .join(", ");
    format!(
        "Identify the language of the text below.\n\
         Possible languages: {choices}.\n\
         Your answer MUST be only a valid JSON object and nothing else. Do not add explanations or markdown.\n\
         JSON structure: {{ \"language\": \"detected_language\", \"confidence\": number_from_0.0_to_1.0 }}\n\
         Text: \"{snippet}\""
    )
}

/// `winner` gets `confidence`, the remainder is shared by the others.
fn scores_for_winner(languages: &[String], winner: &str, confidence: f64) -> BTreeMap<String, f64> {
    let others = languages.len().saturating_sub(1).max(1) as f64;
    languages
        .iter()
        .map(|l| {
            let score = if l == winner {
                confidence
            } else {
                (1.0 - confidence) / others
            };
            (l.clone(), score)
        })
        .collect()
}

fn uniform_unknown(languages: &[String]) -> ScoreResult {
    let share = 1.0 / languages.len().max(1) as f64;
    ScoreResult {
        label: Label::Unknown,
        confidence: 0.5,
        per_language_scores: languages.iter().map(|l| (l.clone(), share)).collect(),
        error: None,
    }
}

/// Map a raw model reply onto a `ScoreResult`.
///
/// A JSON object is looked for first; if none parses, the first configured
/// language name mentioned anywhere in the reply wins with 0.9.
pub fn interpret_reply(raw: &str, languages: &[String]) -> ScoreResult {
    let parsed = json_object_re()
        .find(raw)
        .ok_or_else(|| "no JSON object in reply".to_string())
        .and_then(|m| {
            serde_json::from_str::<LanguageReply>(m.as_str()).map_err(|e| e.to_string())
        })
        .and_then(|reply| {
            let confidence = match &reply.confidence {
                Some(c) => c.value()?,
                None => default_confidence(),
            };
            Ok((reply.language, confidence))
        });

    match parsed {
        Ok((language, confidence)) => {
            let confidence = if confidence.is_finite() {
                confidence.clamp(0.0, 1.0)
            } else {
                default_confidence()
            };
            match languages.iter().find(|l| **l == language) {
                Some(lang) => ScoreResult {
                    label: Label::language(lang.clone()),
                    confidence,
                    per_language_scores: scores_for_winner(languages, lang, confidence),
                    error: None,
                },
                // Labels outside the configured set collapse to Unknown
                None => ScoreResult {
                    confidence,
                    ..uniform_unknown(languages)
                },
            }
        }
        Err(e) => {
            warn!("[NEURAL] Could not parse model reply ({}), applying fallback", e);
            match languages.iter().find(|l| raw.contains(l.as_str())) {
                Some(lang) => ScoreResult {
                    label: Label::language(lang.clone()),
                    confidence: FALLBACK_CONFIDENCE,
                    per_language_scores: scores_for_winner(languages, lang, FALLBACK_CONFIDENCE),
                    error: None,
                },
                None => uniform_unknown(languages),
            }
        }
    }
}

fn truncate_chars(text: &str, max_chars: usize) -> &str {
    match text.char_indices().nth(max_chars) {
        Some((idx, _)) => &text[..idx],
        None => text,
    }
}

/// Gemini-backed implementation of [`NeuralSignal`].
pub struct GeminiLanguageSignal {
    client: ProviderClient,
    api_key: Option<String>,
    languages: Vec<String>,
    config: NeuralConfig,
}

impl GeminiLanguageSignal {
    pub fn new(
        client: ProviderClient,
        api_key: Option<String>,
        languages: Vec<String>,
        config: NeuralConfig,
    ) -> Self {
        Self {
            client,
            api_key,
            languages,
            config,
        }
    }

    async fn call_with_retry(&self, api_key: &str, prompt: &str) -> Result<String, String> {
        let mut last_err: Option<String> = None;
        let timeout_duration = Duration::from_secs(self.config.timeout_secs);

        for attempt in 1..=self.config.max_attempts {
            let fut = self
                .client
                .call_gemini(&self.config.model, api_key, prompt, MAX_OUTPUT_TOKENS);

            match tokio::time::timeout(timeout_duration, fut).await {
                Ok(Ok(result)) => {
                    debug!("[NEURAL] Raw reply: ->>>{}<<<-", result.content);
                    info!(
                        "[NEURAL] Gemini ok model={} attempt={} latency_ms={}",
                        self.config.model, attempt, result.latency_ms
                    );
                    return Ok(result.content);
                }
                Ok(Err(ProviderError::MissingApiKey)) => {
                    return Err(MISSING_KEY_MESSAGE.to_string());
                }
                Ok(Err(e)) => {
                    warn!(
                        "[NEURAL] Gemini error model={} attempt={} : {}",
                        self.config.model, attempt, e
                    );
                    last_err = Some(e.to_string());
                }
                Err(_) => {
                    warn!(
                        "[NEURAL] Gemini timeout model={} attempt={} ({}s)",
                        self.config.model, attempt, self.config.timeout_secs
                    );
                    last_err = Some("timeout".to_string());
                }
            }

            if attempt < self.config.max_attempts {
                let backoff_ms = 400u64 * attempt as u64;
                tokio::time::sleep(Duration::from_millis(backoff_ms)).await;
            }
        }

        Err(last_err.unwrap_or_else(|| "unknown error".to_string()))
    }
}

impl NeuralSignal for GeminiLanguageSignal {
    async fn classify(&self, raw_text: &str) -> ScoreResult {
        let api_key = match self.api_key.as_deref() {
            Some(key) if !key.trim().is_empty() => key,
            _ => {
                error!("[NEURAL] GEMINI_API_KEY is not set");
                return ScoreResult::failure(MISSING_KEY_MESSAGE);
            }
        };

        if raw_text.trim().is_empty() {
            return ScoreResult::unscored(Label::Unknown, 0.0);
        }

        let snippet = truncate_chars(raw_text, self.config.max_chars);
        let prompt = build_prompt(snippet, &self.languages);
        debug!("[NEURAL] Sending request with model {}", self.config.model);

        match self.call_with_retry(api_key, &prompt).await {
            Ok(reply) => {
                let result = interpret_reply(&reply, &self.languages);
                info!(
                    "[NEURAL] Language {} with confidence {:.3}",
                    result.label, result.confidence
                );
                result
            }
            Err(e) => {
                error!("[NEURAL] Gemini call failed: {}", e);
                ScoreResult::failure(e)
            }
        }
    }
}
