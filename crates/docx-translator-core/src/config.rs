use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Target language, stored as the English language name used in prompts
/// (e.g. "Japanese", "Traditional Chinese").
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Lang(pub String);

impl Lang {
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Resolve a language from its English name, native label or ISO code.
    pub fn parse(input: &str) -> Result<Self> {
        let needle = input.trim();
        supported_languages()
            .into_iter()
            .find(|opt| {
                opt.name.eq_ignore_ascii_case(needle)
                    || opt.label == needle
                    || opt.code.eq_ignore_ascii_case(needle)
            })
            .map(|opt| Self::new(opt.name))
            .ok_or_else(|| Error::UnsupportedLanguage(input.to_string()))
    }
}

fn default_target_lang() -> Lang {
    Lang::new(DEFAULT_TARGET_LANG)
}

impl std::fmt::Display for Lang {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for Lang {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl From<String> for Lang {
    fn from(s: String) -> Self {
        Self(s)
    }
}

/// Translator backend configuration for OpenAI-compatible APIs.
///
/// Every entry of `api_keys` becomes one credential of the failover pool.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TranslatorConfig {
    #[serde(default = "default_api_base")]
    pub api_base: String,
    #[serde(default)]
    pub api_keys: Vec<String>,
    #[serde(default = "default_model")]
    pub model: String,
    #[serde(default = "default_temperature")]
    pub temperature: f32,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl TranslatorConfig {
    /// Create a new translator config
    pub fn new(
        api_base: impl Into<String>,
        api_keys: Vec<String>,
        model: impl Into<String>,
    ) -> Self {
        Self {
            api_base: api_base.into(),
            api_keys,
            model: model.into(),
            temperature: default_temperature(),
            timeout_secs: default_timeout_secs(),
        }
    }

    /// Reject configurations that cannot issue a single request.
    pub fn validate(&self) -> Result<()> {
        if self.api_keys.iter().all(|k| k.trim().is_empty()) {
            return Err(Error::TranslationMissingApiKey);
        }
        if self.api_base.trim().is_empty() {
            return Err(Error::ConfigInvalid {
                field: "translator.api_base".to_string(),
                reason: "must not be empty".to_string(),
            });
        }
        Ok(())
    }
}

fn default_api_base() -> String {
    "https://api.x.ai/v1".to_string()
}

fn default_model() -> String {
    "grok-beta".to_string()
}

const fn default_temperature() -> f32 {
    0.3
}

const fn default_timeout_secs() -> u64 {
    60
}

impl Default for TranslatorConfig {
    fn default() -> Self {
        Self {
            api_base: default_api_base(),
            api_keys: Vec::new(),
            model: default_model(),
            temperature: default_temperature(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

/// Batching thresholds, in characters
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchConfig {
    /// Flush once the open batch holds at least this many characters
    #[serde(default = "default_max_chars")]
    pub max_chars: usize,

    /// A single fragment this long is flushed immediately
    #[serde(default = "default_long_fragment_chars")]
    pub long_fragment_chars: usize,
}

const fn default_max_chars() -> usize {
    1000
}

const fn default_long_fragment_chars() -> usize {
    300
}

impl Default for BatchConfig {
    fn default() -> Self {
        Self {
            max_chars: default_max_chars(),
            long_fragment_chars: default_long_fragment_chars(),
        }
    }
}

/// Checkpoint configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CheckpointConfig {
    /// Write a checkpoint after every batch
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// Cache directory name, created next to the source document
    #[serde(default = "default_checkpoint_dir")]
    pub dir_name: String,
}

const fn default_true() -> bool {
    true
}

fn default_checkpoint_dir() -> String {
    ".translation_cache".to_string()
}

impl Default for CheckpointConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            dir_name: default_checkpoint_dir(),
        }
    }
}

/// Pacing of the processing loop
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct PipelineConfig {
    /// Pause after each translation request, in milliseconds
    #[serde(default = "default_request_delay_ms")]
    pub request_delay_ms: u64,

    /// Poll interval while paused, in milliseconds
    #[serde(default = "default_pause_poll_ms")]
    pub pause_poll_ms: u64,
}

const fn default_request_delay_ms() -> u64 {
    500
}

const fn default_pause_poll_ms() -> u64 {
    100
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            request_delay_ms: default_request_delay_ms(),
            pause_poll_ms: default_pause_poll_ms(),
        }
    }
}

/// Application configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Target language
    #[serde(default = "default_target_lang")]
    pub target_lang: Lang,

    /// Copy paragraph styles into the translated document
    #[serde(default = "default_true")]
    pub preserve_format: bool,

    /// Translator backend configuration
    #[serde(default)]
    pub translator: TranslatorConfig,

    /// Batching thresholds
    #[serde(default)]
    pub batch: BatchConfig,

    /// Checkpoint configuration
    #[serde(default)]
    pub checkpoint: CheckpointConfig,

    /// Loop pacing
    #[serde(default)]
    pub pipeline: PipelineConfig,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            target_lang: default_target_lang(),
            preserve_format: true,
            translator: TranslatorConfig::default(),
            batch: BatchConfig::default(),
            checkpoint: CheckpointConfig::default(),
            pipeline: PipelineConfig::default(),
        }
    }
}

impl AppConfig {
    /// Load configuration from file
    pub fn from_file(path: impl AsRef<std::path::Path>) -> Result<Self> {
        let content = std::fs::read_to_string(path.as_ref()).map_err(|e| {
            Error::ConfigLoad(format!(
                "Failed to read config file {}: {}",
                path.as_ref().display(),
                e
            ))
        })?;

        Self::from_toml(&content)
    }

    /// Parse configuration from TOML text
    pub fn from_toml(content: &str) -> Result<Self> {
        toml::from_str(content)
            .map_err(|e| Error::ConfigLoad(format!("Failed to parse config: {e}")))
    }

    /// Load from default locations (~/.config/docx-translator/config.toml, ./config.toml)
    pub fn load() -> Self {
        // Try user config
        if let Some(config_dir) = crate::util::config_dir() {
            let user_config = config_dir.join("docx-translator").join("config.toml");
            if user_config.exists() {
                match Self::from_file(&user_config) {
                    Ok(config) => {
                        tracing::debug!("Loaded config from {}", user_config.display());
                        return config;
                    }
                    Err(e) => {
                        tracing::warn!("Failed to load {}: {}", user_config.display(), e);
                    }
                }
            }
        }

        // Try local config
        let local_config = std::path::PathBuf::from("config.toml");
        if local_config.exists() {
            match Self::from_file(&local_config) {
                Ok(config) => {
                    tracing::debug!("Loaded config from ./config.toml");
                    return config;
                }
                Err(e) => {
                    tracing::warn!("Failed to load ./config.toml: {}", e);
                }
            }
        }

        // Return defaults
        tracing::debug!("No config file found, using defaults");
        Self::default()
    }

    /// Check values that would otherwise surface mid-run.
    pub fn validate(&self) -> Result<()> {
        self.translator.validate()?;
        if self.batch.max_chars == 0 {
            return Err(Error::ConfigInvalid {
                field: "batch.max_chars".to_string(),
                reason: "must be greater than zero".to_string(),
            });
        }
        if self.checkpoint.dir_name.trim().is_empty() {
            return Err(Error::ConfigInvalid {
                field: "checkpoint.dir_name".to_string(),
                reason: "must not be empty".to_string(),
            });
        }
        Ok(())
    }
}

/// A selectable target language
#[derive(Debug, Clone)]
pub struct LanguageOption {
    /// Label in the language itself (e.g., "日本語")
    pub label: &'static str,
    /// English name used in prompts and file names (e.g., "Japanese")
    pub name: &'static str,
    /// ISO code (e.g., "ja")
    pub code: &'static str,
}

/// Languages offered as translation targets.
pub fn supported_languages() -> Vec<LanguageOption> {
    vec![
        LanguageOption { label: "简体中文", name: "Chinese", code: "zh-CN" },
        LanguageOption { label: "繁體中文", name: "Traditional Chinese", code: "zh-TW" },
        LanguageOption { label: "日本語", name: "Japanese", code: "ja" },
        LanguageOption { label: "English", name: "English", code: "en" },
        LanguageOption { label: "Español", name: "Spanish", code: "es" },
        LanguageOption { label: "Français", name: "French", code: "fr" },
        LanguageOption { label: "Deutsch", name: "German", code: "de" },
        LanguageOption { label: "한국어", name: "Korean", code: "ko" },
        LanguageOption { label: "Русский", name: "Russian", code: "ru" },
        LanguageOption { label: "Italiano", name: "Italian", code: "it" },
    ]
}

/// Default target language name
pub const DEFAULT_TARGET_LANG: &str = "Chinese";

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lang_parse_accepts_name_label_and_code() {
        assert_eq!(Lang::parse("japanese").unwrap().as_str(), "Japanese");
        assert_eq!(Lang::parse("日本語").unwrap().as_str(), "Japanese");
        assert_eq!(Lang::parse("zh-TW").unwrap().as_str(), "Traditional Chinese");
        assert!(Lang::parse("Klingon").is_err());
    }

    #[test]
    fn test_partial_toml_uses_defaults() {
        let config = AppConfig::from_toml(
            r#"
            target_lang = "German"

            [translator]
            api_keys = ["k1", "k2"]

            [batch]
            max_chars = 400
            "#,
        )
        .unwrap();

        assert_eq!(config.target_lang.as_str(), "German");
        assert_eq!(config.translator.api_keys.len(), 2);
        assert_eq!(config.translator.model, "grok-beta");
        assert_eq!(config.batch.max_chars, 400);
        assert_eq!(config.batch.long_fragment_chars, 300);
        assert!(config.preserve_format);
        assert_eq!(config.checkpoint.dir_name, ".translation_cache");
        assert_eq!(config.pipeline.request_delay_ms, 500);
    }

    #[test]
    fn test_validate_requires_credentials() {
        let config = AppConfig::default();
        assert!(matches!(config.validate(), Err(Error::TranslationMissingApiKey)));

        let mut config = AppConfig::default();
        config.translator.api_keys = vec!["key".to_string()];
        assert!(config.validate().is_ok());

        config.batch.max_chars = 0;
        assert!(matches!(config.validate(), Err(Error::ConfigInvalid { .. })));
    }
}
