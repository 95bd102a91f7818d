//! Configuration loading, validation, and credential lookup for llmask.
//!
//! Loads configuration from `~/.llmask/config.toml` with environment
//! variable overrides. Validates all settings at startup.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Endpoint used when nothing else is configured.
pub const OPENAI_API_URL: &str = "https://api.openai.com/v1";

/// Name of the key file looked up in the working directory.
pub const KEY_FILE: &str = "openai.txt";

/// The root configuration structure.
///
/// Maps directly to `~/.llmask/config.toml`.
#[derive(Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// API key for the completion and transcription endpoints
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,

    /// Base URL of the OpenAI-compatible API
    #[serde(default = "default_api_url")]
    pub api_url: String,

    /// Model names per tier
    #[serde(default)]
    pub models: ModelsConfig,

    /// Round-trip loop settings
    #[serde(default)]
    pub ask: AskConfig,

    /// Background material processing
    #[serde(default)]
    pub media: MediaConfig,
}

fn default_api_url() -> String {
    OPENAI_API_URL.into()
}

/// Redact a secret string for Debug output.
fn redact(s: &Option<String>) -> &'static str {
    match s {
        Some(_) => "[REDACTED]",
        None => "None",
    }
}

impl std::fmt::Debug for AppConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppConfig")
            .field("api_key", &redact(&self.api_key))
            .field("api_url", &self.api_url)
            .field("models", &self.models)
            .field("ask", &self.ask)
            .field("media", &self.media)
            .finish()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelsConfig {
    /// Model for text-only questions (JSON mode + tools)
    #[serde(default = "default_text_model")]
    pub text: String,

    /// Model used once any image is attached
    #[serde(default = "default_vision_model")]
    pub vision: String,

    /// Speech-to-text model
    #[serde(default = "default_transcription_model")]
    pub transcription: String,
}

fn default_text_model() -> String {
    "gpt-4-turbo-2024-04-09".into()
}
fn default_vision_model() -> String {
    "gpt-4-turbo-2024-04-09".into()
}
fn default_transcription_model() -> String {
    "whisper-1".into()
}

impl Default for ModelsConfig {
    fn default() -> Self {
        Self {
            text: default_text_model(),
            vision: default_vision_model(),
            transcription: default_transcription_model(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AskConfig {
    /// Malformed answers tolerated before giving up
    #[serde(default = "default_max_retries")]
    pub max_retries: usize,

    /// Tool round-trips allowed per question
    #[serde(default = "default_max_tool_rounds")]
    pub max_tool_rounds: u32,

    /// Output ceiling for the vision tier, which defaults very low
    #[serde(default = "default_vision_max_tokens")]
    pub vision_max_tokens: u32,

    #[serde(default = "default_temperature")]
    pub temperature: f32,

    /// Stream assistant text to stdout as it arrives
    #[serde(default = "default_true")]
    pub stream: bool,

    /// System messages that open every fresh conversation
    #[serde(default = "default_preamble")]
    pub preamble: Vec<String>,
}

fn default_max_retries() -> usize {
    4
}
fn default_max_tool_rounds() -> u32 {
    25
}
fn default_vision_max_tokens() -> u32 {
    4096
}
fn default_temperature() -> f32 {
    1.0
}
fn default_true() -> bool {
    true
}
fn default_preamble() -> Vec<String> {
    vec![
        "you are a helpful assistant that answers questions using background material \
         and tools when they are available."
            .into(),
        "always respond with a single json object that matches the schema you are given, \
         with no commentary or formatting around it."
            .into(),
    ]
}

impl Default for AskConfig {
    fn default() -> Self {
        Self {
            max_retries: default_max_retries(),
            max_tool_rounds: default_max_tool_rounds(),
            vision_max_tokens: default_vision_max_tokens(),
            temperature: default_temperature(),
            stream: true,
            preamble: default_preamble(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MediaConfig {
    /// Path to the `pdftotext` binary
    #[serde(default = "default_pdftotext")]
    pub pdftotext: String,
}

fn default_pdftotext() -> String {
    "pdftotext".into()
}

impl Default for MediaConfig {
    fn default() -> Self {
        Self {
            pdftotext: default_pdftotext(),
        }
    }
}

impl AppConfig {
    /// Load configuration from the default path (~/.llmask/config.toml).
    ///
    /// Environment overrides:
    /// - `LLMASK_API_KEY`, then `OPENAI_API_KEY`, then `openai` for the key
    /// - `LLMASK_API_URL` for the endpoint
    /// - `LLMASK_MODEL` for the text model
    pub fn load() -> Result<Self, ConfigError> {
        let config_path = Self::config_path();
        let mut config = Self::load_from(&config_path)?;

        if config.api_key.is_none() {
            config.api_key = std::env::var("LLMASK_API_KEY")
                .ok()
                .or_else(|| std::env::var("OPENAI_API_KEY").ok())
                .or_else(|| std::env::var("openai").ok())
                .filter(|k| !k.trim().is_empty());
        }

        if let Ok(url) = std::env::var("LLMASK_API_URL") {
            config.api_url = url;
        }

        if let Ok(model) = std::env::var("LLMASK_MODEL") {
            config.models.text = model;
        }

        Ok(config)
    }

    /// Load configuration from a specific file path.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            tracing::info!("No config file found at {}, using defaults", path.display());
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::ReadError {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

        let config: Self = toml::from_str(&content).map_err(|e| ConfigError::ParseError {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

        config.validate()?;
        Ok(config)
    }

    /// Get the configuration directory path.
    pub fn config_dir() -> PathBuf {
        dirs_home().join(".llmask")
    }

    pub fn config_path() -> PathBuf {
        Self::config_dir().join("config.toml")
    }

    /// Validate the configuration.
    fn validate(&self) -> Result<(), ConfigError> {
        if self.ask.temperature < 0.0 || self.ask.temperature > 2.0 {
            return Err(ConfigError::ValidationError(
                "ask.temperature must be between 0.0 and 2.0".into(),
            ));
        }

        if self.ask.max_retries == 0 {
            return Err(ConfigError::ValidationError(
                "ask.max_retries must be at least 1".into(),
            ));
        }

        if self.ask.vision_max_tokens == 0 {
            return Err(ConfigError::ValidationError(
                "ask.vision_max_tokens must be > 0".into(),
            ));
        }

        if self.models.text.is_empty() || self.models.vision.is_empty() {
            return Err(ConfigError::ValidationError(
                "models.text and models.vision must be set".into(),
            ));
        }

        Ok(())
    }

    /// Resolve the API key: configuration/environment first, then the key
    /// file in `dir`.
    ///
    /// Keys for the OpenAI endpoint must carry the `sk-` prefix.
    pub fn resolve_api_key(&self, dir: &Path) -> Result<String, ConfigError> {
        let key = match &self.api_key {
            Some(key) => key.trim().to_string(),
            None => {
                let path = dir.join(KEY_FILE);
                match std::fs::read_to_string(&path) {
                    Ok(content) => content.trim().to_string(),
                    Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                        return Err(ConfigError::MissingApiKey);
                    }
                    Err(e) => {
                        return Err(ConfigError::ReadError {
                            path,
                            reason: e.to_string(),
                        });
                    }
                }
            }
        };

        if key.is_empty() {
            return Err(ConfigError::MissingApiKey);
        }

        const PREFIX: &str = "sk-";
        if self.api_url.trim_end_matches('/') == OPENAI_API_URL && !key.starts_with(PREFIX) {
            return Err(ConfigError::InvalidApiKey(format!(
                "openai key should start with {PREFIX:?} prefix"
            )));
        }

        Ok(key)
    }

    /// Generate a default config TOML string (for `init` command).
    pub fn default_toml() -> String {
        let config = Self::default();
        toml::to_string_pretty(&config).unwrap_or_default()
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            api_url: default_api_url(),
            models: ModelsConfig::default(),
            ask: AskConfig::default(),
            media: MediaConfig::default(),
        }
    }
}

/// Get the user's home directory.
fn dirs_home() -> PathBuf {
    #[cfg(target_os = "windows")]
    {
        std::env::var("USERPROFILE")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("C:\\Users\\Default"))
    }
    #[cfg(not(target_os = "windows"))]
    {
        std::env::var("HOME")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("/tmp"))
    }
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file at {path}: {reason}")]
    ReadError { path: PathBuf, reason: String },

    #[error("Failed to parse config file at {path}: {reason}")]
    ParseError { path: PathBuf, reason: String },

    #[error("Configuration validation failed: {0}")]
    ValidationError(String),

    #[error("No API key found (set LLMASK_API_KEY or OPENAI_API_KEY, or create {KEY_FILE})")]
    MissingApiKey,

    #[error("Invalid API key: {0}")]
    InvalidApiKey(String),
}
