// AI Provider Service
// HTTP client for the Gemini generateContent API used as the external language signal

use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::env;
use std::time::{Duration, Instant};
use thiserror::Error;

use super::config_store::ConfigStore;

const GEMINI_DEFAULT_URL: &str = "https://generativelanguage.googleapis.com/v1beta/models";
const DEFAULT_HTTP_TIMEOUT_SECS: u64 = 80;

#[derive(Error, Debug)]
pub enum ProviderError {
    #[error("HTTP request failed: {0}")]
    HttpError(#[from] reqwest::Error),
    #[error("API error: {status} - {message}")]
    ApiError { status: u16, message: String },
    #[error("Missing content in response")]
    MissingContent,
    #[error("JSON parse error: {0}")]
    JsonError(String),
    #[error("API key not configured")]
    MissingApiKey,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderSpec {
    pub name: String,
    pub model: String,
}

/// Parse `name[:model]`.
pub fn parse_provider(spec: &str) -> ProviderSpec {
    match spec.split_once(':') {
        Some((name, model)) => ProviderSpec {
            name: name.to_string(),
            model: model.to_string(),
        },
        None => ProviderSpec {
            name: spec.to_string(),
            model: String::new(),
        },
    }
}

#[derive(Debug, Clone, Serialize)]
struct GeminiPart {
    text: String,
}

#[derive(Debug, Clone, Serialize)]
struct GeminiContent {
    role: String,
    parts: Vec<GeminiPart>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig {
    temperature: f64,
    max_output_tokens: i32,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
struct GeminiRequest {
    contents: Vec<GeminiContent>,
    generation_config: GenerationConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatResult {
    pub content: String,
    pub latency_ms: i64,
}

pub struct ProviderClient {
    client: Client,
    gemini_url: String,
}

impl Default for ProviderClient {
    fn default() -> Self {
        Self::new()
    }
}

impl ProviderClient {
    pub fn new() -> Self {
        let client = Client::builder()
            .timeout(Duration::from_secs(DEFAULT_HTTP_TIMEOUT_SECS))
            .build()
            .unwrap_or_default();

        let gemini_url =
            env::var("GEMINI_API_URL").unwrap_or_else(|_| GEMINI_DEFAULT_URL.to_string());

        Self { client, gemini_url }
    }

    /// Use a custom endpoint root instead of the public Gemini API.
    pub fn with_base_url(mut self, base_url: &str) -> Self {
        self.gemini_url = base_url.trim_end_matches('/').to_string();
        self
    }

    pub fn gemini_url(&self) -> &str {
        &self.gemini_url
    }

    pub async fn call_gemini(
        &self,
        model: &str,
        api_key: &str,
        prompt: &str,
        max_tokens: i32,
    ) -> Result<ChatResult, ProviderError> {
        if api_key.trim().is_empty() {
            return Err(ProviderError::MissingApiKey);
        }

        let url = format!("{}/{}:generateContent", self.gemini_url, model);
        let request = GeminiRequest {
            contents: vec![GeminiContent {
                role: "user".to_string(),
                parts: vec![GeminiPart {
                    text: prompt.to_string(),
                }],
            }],
            generation_config: GenerationConfig {
                temperature: 0.0,
                max_output_tokens: max_tokens,
            },
        };

        let start = Instant::now();

        let response = self
            .client
            .post(&url)
            .header("x-goog-api-key", api_key)
            .header("Content-Type", "application/json")
            .json(&request)
            .send()
            .await?;

        let latency_ms = start.elapsed().as_millis() as i64;
        let status = response.status();

        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ProviderError::ApiError {
                status: status.as_u16(),
                message: body,
            });
        }

        let data: serde_json::Value = response
            .json()
            .await
            .map_err(|e| ProviderError::JsonError(e.to_string()))?;

        let content = extract_gemini_text(&data).ok_or(ProviderError::MissingContent)?;

        Ok(ChatResult {
            content,
            latency_ms,
        })
    }
}

/// Concatenate the text parts of the first candidate.
/// Gemini response format: {"candidates":[{"content":{"parts":[{"text":"..."}]}}]}
fn extract_gemini_text(data: &serde_json::Value) -> Option<String> {
    let parts = data["candidates"][0]["content"]["parts"].as_array()?;
    let text: String = parts
        .iter()
        .filter_map(|p| p["text"].as_str())
        .collect::<Vec<_>>()
        .join("");
    if text.trim().is_empty() {
        None
    } else {
        Some(text)
    }
}

/// Get API key from environment or config file
pub fn get_api_key(provider: &str) -> Option<String> {
    let env_keys = match provider {
        "gemini" => vec!["GEMINI_API_KEY", "LANGPROBE_GEMINI_API_KEY"],
        _ => vec![],
    };

    for key in env_keys {
        if let Ok(val) = env::var(key) {
            let v = val.trim();
            if !v.is_empty() {
                return Some(v.to_string());
            }
        }
    }

    if let Some(config_dir) = ConfigStore::default_config_dir() {
        let store = ConfigStore::new(config_dir);
        if let Ok(Some(key)) = store.get_api_key(provider) {
            return Some(key);
        }
    }

    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_provider() {
        let spec = parse_provider("gemini:gemini-2.0-flash");
        assert_eq!(spec.name, "gemini");
        assert_eq!(spec.model, "gemini-2.0-flash");

        let spec2 = parse_provider("gemini");
        assert_eq!(spec2.name, "gemini");
        assert_eq!(spec2.model, "");
    }

    #[test]
    fn test_provider_client_base_url_override() {
        let client = ProviderClient::new().with_base_url("http://localhost:8080/models/");
        assert_eq!(client.gemini_url(), "http://localhost:8080/models");
    }

    #[test]
    fn test_extract_gemini_text() {
        let data = serde_json::json!({
            "candidates": [{"content": {"parts": [{"text": "{\"language\": "}, {"text": "\"German\"}"}]}}]
        });
        assert_eq!(extract_gemini_text(&data).as_deref(), Some("{\"language\": \"German\"}"));
        assert!(extract_gemini_text(&serde_json::json!({"candidates": []})).is_none());
    }

    #[tokio::test]
    async fn test_call_gemini_without_key_fails_fast() {
        let client = ProviderClient::new();
        let err = client.call_gemini("gemini-2.0-flash", "  ", "hi", 64).await.unwrap_err();
        assert!(matches!(err, ProviderError::MissingApiKey));
    }
}
