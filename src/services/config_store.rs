// Configuration Storage Service
// Handles config file read/write, validation and version backup

use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Config I/O failed: {0}")]
    Io(#[from] std::io::Error),
    #[error("Failed to parse config: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("Invalid config value for {field}: {message}")]
    Invalid { field: &'static str, message: String },
}

impl ConfigError {
    fn invalid(field: &'static str, message: impl Into<String>) -> Self {
        ConfigError::Invalid {
            field,
            message: message.into(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AppConfig {
    #[serde(default = "default_version")]
    pub version: String,
    #[serde(default)]
    pub classifier: ClassifierConfig,
    #[serde(default = "default_languages")]
    pub languages: Vec<LanguageConfig>,
    #[serde(default)]
    pub neural: NeuralConfig,
    #[serde(default = "default_data_folder")]
    pub data_folder: PathBuf,
    #[serde(default = "default_training_folder")]
    pub training_folder: PathBuf,
    #[serde(default)]
    pub api_keys: HashMap<String, String>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            version: default_version(),
            classifier: ClassifierConfig::default(),
            languages: default_languages(),
            neural: NeuralConfig::default(),
            data_folder: default_data_folder(),
            training_folder: default_training_folder(),
            api_keys: HashMap::new(),
        }
    }
}

impl AppConfig {
    pub fn language_names(&self) -> Vec<String> {
        self.languages.iter().map(|l| l.name.clone()).collect()
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        self.classifier.validate()?;
        self.neural.validate()?;

        if self.languages.is_empty() {
            return Err(ConfigError::invalid("languages", "at least one language is required"));
        }

        let mut seen = HashSet::new();
        for lang in &self.languages {
            let name = lang.name.trim();
            if name.is_empty() {
                return Err(ConfigError::invalid("languages", "language name is empty"));
            }
            if name == "Unknown" || name == "Error" {
                return Err(ConfigError::invalid(
                    "languages",
                    format!("'{}' is reserved for sentinel results", name),
                ));
            }
            if !seen.insert(name.to_string()) {
                return Err(ConfigError::invalid(
                    "languages",
                    format!("duplicate language '{}'", name),
                ));
            }
        }

        Ok(())
    }
}

/// One supported language. List order is tie-break priority.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct LanguageConfig {
    pub name: String,
    pub training_file: String,
    /// Characters that (almost) only this language uses.
    #[serde(default)]
    pub signature_chars: String,
}

impl LanguageConfig {
    pub fn new(name: &str, training_file: &str, signature_chars: &str) -> Self {
        Self {
            name: name.to_string(),
            training_file: training_file.to_string(),
            signature_chars: signature_chars.to_string(),
        }
    }

    pub fn signature_set(&self) -> HashSet<char> {
        self.signature_chars
            .chars()
            .flat_map(|c| c.to_lowercase())
            .filter(|c| !c.is_whitespace())
            .collect()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClassifierConfig {
    #[serde(default = "default_short_word_max_length")]
    pub short_word_max_length: usize,
    /// Divisor applied to log-likelihoods before the softmax.
    #[serde(default = "default_temperature")]
    pub temperature: f64,
    /// Probability floor for words missing from a profile.
    #[serde(default = "default_min_probability")]
    pub min_probability: f64,
    #[serde(default = "default_closeness_threshold")]
    pub closeness_threshold: f64,
    #[serde(default = "default_signature_smoothing")]
    pub signature_smoothing: f64,
}

impl Default for ClassifierConfig {
    fn default() -> Self {
        Self {
            short_word_max_length: default_short_word_max_length(),
            temperature: default_temperature(),
            min_probability: default_min_probability(),
            closeness_threshold: default_closeness_threshold(),
            signature_smoothing: default_signature_smoothing(),
        }
    }
}

impl ClassifierConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.short_word_max_length == 0 {
            return Err(ConfigError::invalid("shortWordMaxLength", "must be at least 1"));
        }
        if !(self.temperature.is_finite() && self.temperature > 0.0) {
            return Err(ConfigError::invalid(
                "temperature",
                format!("must be a positive number, got {}", self.temperature),
            ));
        }
        if !(self.min_probability > 0.0 && self.min_probability <= 1.0) {
            return Err(ConfigError::invalid(
                "minProbability",
                format!("must be in (0, 1], got {}", self.min_probability),
            ));
        }
        if !(0.0..=1.0).contains(&self.closeness_threshold) {
            return Err(ConfigError::invalid(
                "closenessThreshold",
                format!("must be in [0, 1], got {}", self.closeness_threshold),
            ));
        }
        if !(self.signature_smoothing.is_finite() && self.signature_smoothing > 0.0) {
            return Err(ConfigError::invalid(
                "signatureSmoothing",
                format!("must be a positive number, got {}", self.signature_smoothing),
            ));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NeuralConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,
    #[serde(default = "default_neural_model")]
    pub model: String,
    pub base_url: Option<String>,
    #[serde(default = "default_max_chars")]
    pub max_chars: usize,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    #[serde(default = "default_max_attempts")]
    pub max_attempts: usize,
    #[serde(default = "default_max_concurrency")]
    pub max_concurrency: usize,
}

impl Default for NeuralConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            model: default_neural_model(),
            base_url: None,
            max_chars: default_max_chars(),
            timeout_secs: default_timeout_secs(),
            max_attempts: default_max_attempts(),
            max_concurrency: default_max_concurrency(),
        }
    }
}

impl NeuralConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_attempts == 0 {
            return Err(ConfigError::invalid("neural.maxAttempts", "must be at least 1"));
        }
        if self.max_concurrency == 0 {
            return Err(ConfigError::invalid("neural.maxConcurrency", "must be at least 1"));
        }
        if self.max_chars == 0 {
            return Err(ConfigError::invalid("neural.maxChars", "must be at least 1"));
        }
        Ok(())
    }
}

fn default_version() -> String { "1.0.0".to_string() }
fn default_languages() -> Vec<LanguageConfig> {
    vec![
        LanguageConfig::new("Russian", "russian.txt", "ёжцчшщъыьэюя"),
        LanguageConfig::new("German", "german.txt", "äöüß"),
    ]
}
fn default_data_folder() -> PathBuf { PathBuf::from("data") }
fn default_training_folder() -> PathBuf { PathBuf::from("training_data") }
fn default_short_word_max_length() -> usize { 5 }
fn default_temperature() -> f64 { 1000.0 }
fn default_min_probability() -> f64 { 1e-10 }
fn default_closeness_threshold() -> f64 { 0.1 }
fn default_signature_smoothing() -> f64 { 1.0 }
fn default_true() -> bool { true }
fn default_neural_model() -> String { "gemini-2.0-flash".to_string() }
fn default_max_chars() -> usize { 2000 }
fn default_timeout_secs() -> u64 { 60 }
fn default_max_attempts() -> usize { 3 }
fn default_max_concurrency() -> usize { 4 }

pub struct ConfigStore {
    config_dir: PathBuf,
    config_file: PathBuf,
}

impl ConfigStore {
    pub fn new(config_dir: PathBuf) -> Self {
        let config_file = config_dir.join("config.json");
        Self { config_dir, config_file }
    }

    /// Store backed by an explicit file path (e.g. `--config <path>`).
    pub fn with_file(config_file: PathBuf) -> Self {
        let config_dir = config_file
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_else(|| PathBuf::from("."));
        Self { config_dir, config_file }
    }

    /// Get default config directory
    pub fn default_config_dir() -> Option<PathBuf> {
        dirs::config_dir().map(|p| p.join("langprobe"))
    }

    /// Store for an explicit `--config` path, else the per-user default.
    pub fn locate(explicit: Option<PathBuf>) -> Option<Self> {
        match explicit {
            Some(path) => Some(Self::with_file(path)),
            None => Self::default_config_dir().map(Self::new),
        }
    }

    pub fn config_file(&self) -> &Path {
        &self.config_file
    }

    /// Ensure config directory exists
    pub fn ensure_dir(&self) -> Result<(), ConfigError> {
        fs::create_dir_all(&self.config_dir)?;
        Ok(())
    }

    /// Load configuration from file; a missing file yields the defaults
    pub fn load(&self) -> Result<AppConfig, ConfigError> {
        if !self.config_file.exists() {
            return Ok(AppConfig::default());
        }

        let content = fs::read_to_string(&self.config_file)?;
        let config: AppConfig = serde_json::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    /// Save configuration to file
    pub fn save(&self, config: &AppConfig) -> Result<(), ConfigError> {
        config.validate()?;
        self.ensure_dir()?;

        if self.config_file.exists() {
            self.create_backup()?;
        }

        let content = serde_json::to_string_pretty(config)?;
        fs::write(&self.config_file, content)?;
        Ok(())
    }

    fn create_backup(&self) -> Result<(), ConfigError> {
        let backup_dir = self.config_dir.join("backups");
        fs::create_dir_all(&backup_dir)?;

        let timestamp = chrono::Utc::now().format("%Y%m%d_%H%M%S%3f");
        let backup_file = backup_dir.join(format!("config_{}.json", timestamp));
        fs::copy(&self.config_file, &backup_file)?;

        self.cleanup_old_backups(&backup_dir, 10)
    }

    /// Remove old backups, keeping only the most recent N
    fn cleanup_old_backups(&self, backup_dir: &Path, keep: usize) -> Result<(), ConfigError> {
        let mut entries: Vec<_> = fs::read_dir(backup_dir)?
            .filter_map(|e| e.ok())
            .filter(|e| e.path().extension().map_or(false, |ext| ext == "json"))
            .collect();

        if entries.len() <= keep {
            return Ok(());
        }

        // Oldest first
        entries.sort_by_key(|e| {
            e.metadata()
                .and_then(|m| m.modified())
                .unwrap_or(std::time::SystemTime::UNIX_EPOCH)
        });

        let remove_count = entries.len() - keep;
        for entry in entries.iter().take(remove_count) {
            let _ = fs::remove_file(entry.path());
        }

        Ok(())
    }

    pub fn get_api_key(&self, provider: &str) -> Result<Option<String>, ConfigError> {
        let config = self.load()?;
        Ok(config.api_keys.get(provider).cloned())
    }

    pub fn set_api_key(&self, provider: &str, key: &str) -> Result<(), ConfigError> {
        let mut config = self.load()?;
        config.api_keys.insert(provider.to_string(), key.to_string());
        self.save(&config)
    }

    pub fn delete_api_key(&self, provider: &str) -> Result<(), ConfigError> {
        let mut config = self.load()?;
        config.api_keys.remove(provider);
        self.save(&config)
    }
}

/// Configuration shared by every binary; defaults when no store is available.
pub fn load_app_config(explicit: Option<PathBuf>) -> Result<AppConfig, ConfigError> {
    match ConfigStore::locate(explicit) {
        Some(store) => store.load(),
        None => Ok(AppConfig::default()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = AppConfig::default();
        assert_eq!(config.classifier.short_word_max_length, 5);
        assert_eq!(config.classifier.temperature, 1000.0);
        assert_eq!(config.language_names(), vec!["Russian", "German"]);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_partial_json_fills_defaults() {
        let parsed: AppConfig =
            serde_json::from_str(r#"{"classifier": {"temperature": 50.0}}"#).unwrap();
        assert_eq!(parsed.classifier.temperature, 50.0);
        assert_eq!(parsed.classifier.closeness_threshold, 0.1);
        assert_eq!(parsed.languages.len(), 2);
        assert_eq!(parsed.neural.model, "gemini-2.0-flash");
    }

    #[test]
    fn test_validate_rejects_bad_values() {
        let mut config = AppConfig::default();
        config.classifier.temperature = 0.0;
        assert!(matches!(config.validate(), Err(ConfigError::Invalid { field: "temperature", .. })));

        let mut config = AppConfig::default();
        config.languages.push(LanguageConfig::new("German", "de2.txt", ""));
        assert!(config.validate().is_err());

        let mut config = AppConfig::default();
        config.languages.clear();
        assert!(config.validate().is_err());

        let mut config = AppConfig::default();
        config.languages[0].name = "Unknown".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_signature_set_is_lowercased() {
        let lang = LanguageConfig::new("German", "german.txt", "ÄÖÜß");
        let set = lang.signature_set();
        assert!(set.contains(&'ä'));
        assert!(set.contains(&'ß'));
        assert_eq!(set.len(), 4);
    }

    #[test]
    fn test_store_round_trip_with_backup() {
        let dir = tempfile::tempdir().unwrap();
        let store = ConfigStore::new(dir.path().to_path_buf());
        assert_eq!(store.load().unwrap().classifier.temperature, 1000.0);

        store.set_api_key("gemini", "key-1").unwrap();
        store.set_api_key("gemini", "key-2").unwrap();
        assert_eq!(store.get_api_key("gemini").unwrap().as_deref(), Some("key-2"));
        assert!(dir.path().join("backups").read_dir().unwrap().count() >= 1);

        store.delete_api_key("gemini").unwrap();
        assert_eq!(store.get_api_key("gemini").unwrap(), None);
    }

    #[test]
    fn test_load_app_config_from_explicit_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("custom.json");
        std::fs::write(&path, r#"{"classifier": {"shortWordMaxLength": 3}}"#).unwrap();

        let config = load_app_config(Some(path)).unwrap();
        assert_eq!(config.classifier.short_word_max_length, 3);

        let missing = load_app_config(Some(dir.path().join("absent.json"))).unwrap();
        assert_eq!(missing.classifier.short_word_max_length, 5);
    }
}
