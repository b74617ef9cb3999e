//! Configuration module for the Helly voice client
//!
//! This module handles client configuration from various sources: .env files, YAML files,
//! and environment variables. Priority: YAML > ENV vars > .env values > defaults.
//!
//! # Example
//! ```rust,no_run
//! use helly_voice::config::VoiceConfig;
//! use std::path::PathBuf;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! // Load from environment variables only
//! let config = VoiceConfig::from_env()?;
//!
//! // Load from YAML file with environment variable base
//! let config_path = PathBuf::from("config.yaml");
//! let config = VoiceConfig::from_file(&config_path)?;
//!
//! println!("Negotiating with {}", config.webrtc_url);
//! # Ok(())
//! # }
//! ```

use std::fmt;
use std::path::Path;
use std::str::FromStr;
use std::time::Duration;

use thiserror::Error;
use zeroize::{Zeroize, ZeroizeOnDrop};

mod yaml;

pub use yaml::YamlConfig;

use crate::core::realtime::DEFAULT_CONTROL_CHANNEL_LABEL;
use crate::core::realtime::azure::{
    AZURE_REALTIME_WEBRTC_URL, DEFAULT_DEPLOYMENT, DEFAULT_INSTRUCTIONS, RealtimeVoice,
    sessions_url_for_endpoint,
};
use crate::utils::url_validation::{UrlValidationError, validate_endpoint_url};

/// Delay between a successful connect and the automatic `start_listening`.
pub const DEFAULT_AUTO_LISTEN_DELAY_MS: u64 = 1000;

// =============================================================================
// Secret
// =============================================================================

/// A credential string that is wiped from memory on drop and never printed.
#[derive(Clone, Default, PartialEq, Eq, Zeroize, ZeroizeOnDrop)]
pub struct Secret(String);

impl Secret {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    /// Borrow the raw value. Only for building request headers.
    #[inline]
    pub fn expose(&self) -> &str {
        &self.0
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Masked form for logs and diagnostics: only the last four characters survive.
    pub fn masked(&self) -> String {
        let count = self.0.chars().count();
        if count <= 8 {
            return "****".to_string();
        }
        let tail: String = self.0.chars().skip(count - 4).collect();
        format!("****{tail}")
    }
}

impl From<String> for Secret {
    fn from(value: String) -> Self {
        Self(value)
    }
}

impl From<&str> for Secret {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl fmt::Debug for Secret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Secret({})", self.masked())
    }
}

// =============================================================================
// Errors
// =============================================================================

/// Errors raised while loading or validating configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file {path}: {source}")]
    Read {
        path: String,
        source: std::io::Error,
    },

    #[error("Failed to read instructions file {path}: {source}")]
    InstructionsFile {
        path: String,
        source: std::io::Error,
    },

    #[error("Failed to parse YAML config: {0}")]
    Parse(#[from] serde_yaml::Error),

    #[error("Missing required configuration: {0}")]
    Missing(&'static str),

    #[error("Invalid value for {name}: {value}")]
    InvalidValue { name: &'static str, value: String },

    #[error("Invalid {field} URL: {source}")]
    InvalidUrl {
        field: &'static str,
        source: UrlValidationError,
    },
}

// =============================================================================
// VoiceConfig
// =============================================================================

/// Voice client configuration.
///
/// `Default` gives every tunable its standard value but leaves the credential
/// and the sessions endpoint empty; [`VoiceConfig::validate`] rejects that.
#[derive(Debug, Clone)]
pub struct VoiceConfig {
    /// Azure OpenAI resource key, sent as `api-key` to the sessions endpoint
    pub api_key: Secret,
    /// Ephemeral key (sessions) endpoint
    pub sessions_url: String,
    /// SDP negotiation endpoint
    pub webrtc_url: String,
    /// Realtime deployment, sent as `model`
    pub deployment: String,
    pub voice: RealtimeVoice,
    /// System prompt sent once per session
    pub instructions: String,
    pub control_channel_label: String,
    /// Enables user transcripts when set
    pub input_audio_transcription_model: Option<String>,
    /// Signaling request timeout; unset means no client-side timeout
    pub http_timeout_seconds: Option<u64>,
    pub auto_listen_delay_ms: u64,
}

impl Default for VoiceConfig {
    fn default() -> Self {
        Self {
            api_key: Secret::default(),
            sessions_url: String::new(),
            webrtc_url: AZURE_REALTIME_WEBRTC_URL.to_string(),
            deployment: DEFAULT_DEPLOYMENT.to_string(),
            voice: RealtimeVoice::default(),
            instructions: DEFAULT_INSTRUCTIONS.to_string(),
            control_channel_label: DEFAULT_CONTROL_CHANNEL_LABEL.to_string(),
            input_audio_transcription_model: None,
            http_timeout_seconds: None,
            auto_listen_delay_ms: DEFAULT_AUTO_LISTEN_DELAY_MS,
        }
    }
}

impl VoiceConfig {
    /// Load configuration from environment variables
    ///
    /// Recognised variables:
    /// - `AZURE_OPENAI_API_KEY` (fallback `VITE_API_KEY`)
    /// - `REALTIME_SESSIONS_URL`, or `AZURE_OPENAI_ENDPOINT` to derive it
    /// - `REALTIME_WEBRTC_URL`
    /// - `REALTIME_DEPLOYMENT`, `REALTIME_VOICE`
    /// - `REALTIME_INSTRUCTIONS_FILE` (wins over) `REALTIME_INSTRUCTIONS`
    /// - `REALTIME_TRANSCRIPTION_MODEL`
    /// - `HTTP_TIMEOUT_SECONDS`, `AUTO_LISTEN_DELAY_MS`
    ///
    /// The .env file is loaded in main.rs before this is called.
    pub fn from_env() -> Result<Self, ConfigError> {
        let mut config = Self::default();
        config.apply_env()?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a YAML file with environment variable base
    ///
    /// Environment values are applied first and YAML values override them.
    /// After merging, performs validation on the final configuration.
    ///
    /// # Errors
    /// Returns an error if:
    /// - The YAML file cannot be read or is malformed
    /// - Environment variables have invalid formats
    /// - Configuration validation fails
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let yaml_config = YamlConfig::from_file(path)?;

        let mut config = Self::default();
        config.apply_env()?;
        config.apply_yaml(yaml_config)?;
        config.validate()?;
        Ok(config)
    }

    /// Load from `path` when given, otherwise from the environment.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        match path {
            Some(path) => Self::from_file(path),
            None => Self::from_env(),
        }
    }

    fn apply_env(&mut self) -> Result<(), ConfigError> {
        if let Some(key) = env_var("AZURE_OPENAI_API_KEY").or_else(|| env_var("VITE_API_KEY")) {
            self.api_key = Secret::from(key);
        }

        if let Some(url) = env_var("REALTIME_SESSIONS_URL") {
            self.sessions_url = url;
        } else if let Some(endpoint) = env_var("AZURE_OPENAI_ENDPOINT") {
            self.sessions_url = sessions_url_for_endpoint(&endpoint);
        }

        if let Some(url) = env_var("REALTIME_WEBRTC_URL") {
            self.webrtc_url = url;
        }
        if let Some(deployment) = env_var("REALTIME_DEPLOYMENT") {
            self.deployment = deployment;
        }
        if let Some(voice) = env_var("REALTIME_VOICE") {
            self.voice = RealtimeVoice::from_str_or_default(&voice);
        }

        if let Some(path) = env_var("REALTIME_INSTRUCTIONS_FILE") {
            self.instructions = read_instructions(&path)?;
        } else if let Some(instructions) = env_var("REALTIME_INSTRUCTIONS") {
            self.instructions = instructions;
        }

        if let Some(model) = env_var("REALTIME_TRANSCRIPTION_MODEL") {
            self.input_audio_transcription_model = Some(model);
        }
        if let Some(timeout) = parse_env::<u64>("HTTP_TIMEOUT_SECONDS")? {
            self.http_timeout_seconds = Some(timeout);
        }
        if let Some(delay) = parse_env::<u64>("AUTO_LISTEN_DELAY_MS")? {
            self.auto_listen_delay_ms = delay;
        }

        Ok(())
    }

    fn apply_yaml(&mut self, yaml: YamlConfig) -> Result<(), ConfigError> {
        if let Some(azure) = yaml.azure {
            if let Some(key) = azure.api_key {
                self.api_key = Secret::from(key);
            }
            if let Some(url) = azure.sessions_url {
                self.sessions_url = url;
            } else if let Some(endpoint) = azure.endpoint {
                self.sessions_url = sessions_url_for_endpoint(&endpoint);
            }
            if let Some(url) = azure.webrtc_url {
                self.webrtc_url = url;
            }
        }

        if let Some(realtime) = yaml.realtime {
            if let Some(deployment) = realtime.deployment {
                self.deployment = deployment;
            }
            if let Some(voice) = realtime.voice {
                self.voice = RealtimeVoice::from_str_or_default(&voice);
            }
            if let Some(path) = realtime.instructions_file {
                self.instructions = read_instructions(&path)?;
            } else if let Some(instructions) = realtime.instructions {
                self.instructions = instructions;
            }
            if let Some(model) = realtime.transcription_model {
                self.input_audio_transcription_model = Some(model);
            }
            if let Some(label) = realtime.control_channel_label {
                self.control_channel_label = label;
            }
        }

        if let Some(timeout) = yaml.http.and_then(|h| h.timeout_seconds) {
            self.http_timeout_seconds = Some(timeout);
        }
        if let Some(delay) = yaml.shell.and_then(|s| s.auto_listen_delay_ms) {
            self.auto_listen_delay_ms = delay;
        }

        Ok(())
    }

    /// Check the merged configuration.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.api_key.is_empty() {
            return Err(ConfigError::Missing("AZURE_OPENAI_API_KEY"));
        }
        if self.sessions_url.is_empty() {
            return Err(ConfigError::Missing(
                "REALTIME_SESSIONS_URL or AZURE_OPENAI_ENDPOINT",
            ));
        }
        validate_endpoint_url(&self.sessions_url).map_err(|source| ConfigError::InvalidUrl {
            field: "sessions",
            source,
        })?;
        validate_endpoint_url(&self.webrtc_url).map_err(|source| ConfigError::InvalidUrl {
            field: "webrtc",
            source,
        })?;

        if self.deployment.trim().is_empty() {
            return Err(ConfigError::InvalidValue {
                name: "deployment",
                value: self.deployment.clone(),
            });
        }
        if self.instructions.trim().is_empty() {
            return Err(ConfigError::InvalidValue {
                name: "instructions",
                value: String::new(),
            });
        }
        if self.control_channel_label.is_empty() {
            return Err(ConfigError::InvalidValue {
                name: "control_channel_label",
                value: String::new(),
            });
        }
        if self.http_timeout_seconds == Some(0) {
            return Err(ConfigError::InvalidValue {
                name: "http_timeout_seconds",
                value: "0".to_string(),
            });
        }

        Ok(())
    }

    pub fn http_timeout(&self) -> Option<Duration> {
        self.http_timeout_seconds.map(Duration::from_secs)
    }

    pub fn auto_listen_delay(&self) -> Duration {
        Duration::from_millis(self.auto_listen_delay_ms)
    }
}

impl fmt::Display for VoiceConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "api_key:               {}", self.api_key.masked())?;
        writeln!(f, "sessions_url:          {}", self.sessions_url)?;
        writeln!(f, "webrtc_url:            {}", self.webrtc_url)?;
        writeln!(f, "deployment:            {}", self.deployment)?;
        writeln!(f, "voice:                 {}", self.voice)?;
        writeln!(f, "control_channel_label: {}", self.control_channel_label)?;
        writeln!(
            f,
            "transcription_model:   {}",
            self.input_audio_transcription_model
                .as_deref()
                .unwrap_or("(disabled)")
        )?;
        match self.http_timeout_seconds {
            Some(secs) => writeln!(f, "http_timeout:          {secs}s")?,
            None => writeln!(f, "http_timeout:          (none)")?,
        }
        writeln!(f, "auto_listen_delay:     {}ms", self.auto_listen_delay_ms)?;
        write!(
            f,
            "instructions:          {} chars",
            self.instructions.chars().count()
        )
    }
}

fn env_var(name: &str) -> Option<String> {
    std::env::var(name)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn parse_env<T: FromStr>(name: &'static str) -> Result<Option<T>, ConfigError> {
    match env_var(name) {
        Some(raw) => raw
            .parse::<T>()
            .map(Some)
            .map_err(|_| ConfigError::InvalidValue { name, value: raw }),
        None => Ok(None),
    }
}

fn read_instructions(path: &str) -> Result<String, ConfigError> {
    let contents =
        std::fs::read_to_string(path).map_err(|source| ConfigError::InstructionsFile {
            path: path.to_string(),
            source,
        })?;
    Ok(contents.trim().to_string())
}
