// LangProbe Data Models
// Result shapes shared by the classifiers, the neural adapter and the reports

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

// ============ Labels ============

const UNKNOWN_LABEL: &str = "Unknown";
const ERROR_LABEL: &str = "Error";

/// Outcome label of a single scoring method.
///
/// `Language` holds one of the configured language names; `Unknown` and
/// `Error` are the sentinels for "no usable signal" and "the method failed".
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum Label {
    Language(String),
    Unknown,
    Error,
}

impl Label {
    pub fn language(name: impl Into<String>) -> Self {
        Label::Language(name.into())
    }

    pub fn as_str(&self) -> &str {
        match self {
            Label::Language(name) => name,
            Label::Unknown => UNKNOWN_LABEL,
            Label::Error => ERROR_LABEL,
        }
    }
}

impl From<String> for Label {
    fn from(value: String) -> Self {
        match value.as_str() {
            UNKNOWN_LABEL => Label::Unknown,
            ERROR_LABEL => Label::Error,
            _ => Label::Language(value),
        }
    }
}

impl From<Label> for String {
    fn from(label: Label) -> Self {
        match label {
            Label::Language(name) => name,
            other => other.as_str().to_string(),
        }
    }
}

impl fmt::Display for Label {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.as_str())
    }
}

// ============ Score Result ============

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScoreResult {
    pub label: Label,
    pub confidence: f64,
    #[serde(default)]
    pub per_language_scores: BTreeMap<String, f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl ScoreResult {
    /// "Insufficient signal" result: `Unknown` with the same confidence for
    /// every language.
    pub fn unknown_uniform<'a, I>(languages: I, confidence: f64) -> Self
    where
        I: IntoIterator<Item = &'a str>,
    {
        Self {
            label: Label::Unknown,
            confidence,
            per_language_scores: languages
                .into_iter()
                .map(|name| (name.to_string(), confidence))
                .collect(),
            error: None,
        }
    }

    /// Result without any per-language signal.
    pub fn unscored(label: Label, confidence: f64) -> Self {
        Self {
            label,
            confidence,
            per_language_scores: BTreeMap::new(),
            error: None,
        }
    }

    pub fn failure(message: impl Into<String>) -> Self {
        Self {
            label: Label::Error,
            confidence: 0.0,
            per_language_scores: BTreeMap::new(),
            error: Some(message.into()),
        }
    }

    pub fn score_of(&self, language: &str) -> Option<f64> {
        self.per_language_scores.get(language).copied()
    }

    pub fn score_sum(&self) -> f64 {
        self.per_language_scores.values().sum()
    }
}

// ============ Methods ============

/// Scoring methods reported side by side for each document.
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Method {
    #[serde(rename = "Short_Words")]
    ShortWords,
    #[serde(rename = "Alphabetical")]
    Alphabetical,
    #[serde(rename = "Neural_Network_API")]
    NeuralNetwork,
}

impl Method {
    pub const ALL: [Method; 3] = [Method::ShortWords, Method::Alphabetical, Method::NeuralNetwork];

    pub fn name(&self) -> &'static str {
        match self {
            Method::ShortWords => "Short_Words",
            Method::Alphabetical => "Alphabetical",
            Method::NeuralNetwork => "Neural_Network_API",
        }
    }
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

pub type MethodResults = BTreeMap<Method, ScoreResult>;

// ============ Reports ============

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FileInfo {
    pub filename: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DocumentResult {
    pub file_info: FileInfo,
    pub results_by_method: MethodResults,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SkippedDocument {
    pub filename: String,
    pub reason: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CollectionReport {
    pub report_id: String,
    pub report_date: String,
    pub classified_languages: Vec<String>,
    pub implemented_methods: Vec<Method>,
    pub total_documents_processed: usize,
    pub results: Vec<DocumentResult>,
    #[serde(default)]
    pub skipped: Vec<SkippedDocument>,
}
