//! Configuration loaded from TOML, with environment overrides.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
#[cfg(feature = "cli")]
use std::path::PathBuf;

use crate::defaults;
use crate::error::{Result, ScribecastError};

/// Root configuration structure
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(default)]
pub struct Config {
    pub audio: AudioConfig,
    pub server: ServerConfig,
    pub chat: ChatConfig,
    pub stt: SttConfig,
}

/// Audio buffering and windowing configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct AudioConfig {
    pub sample_rate: u32,
    /// Decode window length in seconds.
    pub window_secs: u32,
    /// Minimum buffered samples before a decode is attempted.
    pub min_samples: usize,
    /// RMS floor below which a window is dropped undecoded (0 disables).
    pub energy_floor: f32,
}

/// Subscriber server configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ServerConfig {
    /// TCP bind address, e.g. "127.0.0.1:8080"
    pub bind: String,
}

/// Chat completion side-channel configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ChatConfig {
    pub url: String,
    pub model: String,
    /// Environment variable the bearer key is read from.
    pub api_key_env: String,
    /// Instructions applied to starred prompts.
    pub system_prompt: String,
    pub max_tokens: u32,
    pub temperature: f32,
}

/// Speech-to-text configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct SttConfig {
    /// Path to the decode model file.
    pub model: String,
    pub language: String,
    /// Marker strings stripped from decoded segments.
    pub hallucination_filters: Vec<String>,
}

impl Default for AudioConfig {
    fn default() -> Self {
        Self {
            sample_rate: defaults::SAMPLE_RATE,
            window_secs: defaults::WINDOW_SECS,
            min_samples: defaults::MIN_WINDOW_SAMPLES,
            energy_floor: defaults::MIN_ENERGY_FOR_DECODE,
        }
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: defaults::BIND_ADDR.to_string(),
        }
    }
}

impl Default for ChatConfig {
    fn default() -> Self {
        Self {
            url: defaults::CHAT_URL.to_string(),
            model: defaults::CHAT_MODEL.to_string(),
            api_key_env: defaults::CHAT_API_KEY_ENV.to_string(),
            system_prompt: String::new(),
            max_tokens: 1024,
            temperature: 0.7,
        }
    }
}

impl Default for SttConfig {
    fn default() -> Self {
        Self {
            model: "models/ggml-base.en.bin".to_string(),
            language: defaults::DEFAULT_LANGUAGE.to_string(),
            hallucination_filters: defaults::HALLUCINATION_MARKERS
                .iter()
                .map(|m| m.to_string())
                .collect(),
        }
    }
}

impl AudioConfig {
    /// Decode window length in samples.
    pub fn window_samples(&self) -> usize {
        (self.window_secs as usize) * (self.sample_rate as usize)
    }
}

impl Config {
    /// Load configuration from a TOML file
    ///
    /// Returns an error if the file contains invalid TOML.
    /// Missing fields will use default values.
    pub fn load(path: &Path) -> Result<Self> {
        let contents = fs::read_to_string(path).map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                ScribecastError::ConfigFileNotFound {
                    path: path.display().to_string(),
                }
            } else {
                ScribecastError::Io(e)
            }
        })?;
        let config: Config = toml::from_str(&contents)?;
        Ok(config)
    }

    /// Load configuration from a file or return defaults if file doesn't exist
    ///
    /// Only returns defaults if the file is missing; invalid TOML is still
    /// an error.
    pub fn load_or_default(path: &Path) -> Result<Self> {
        match Self::load(path) {
            Ok(config) => Ok(config),
            Err(ScribecastError::ConfigFileNotFound { .. }) => Ok(Self::default()),
            Err(e) => Err(e),
        }
    }

    /// Apply environment variable overrides
    ///
    /// Supported environment variables:
    /// - SCRIBECAST_MODEL → stt.model
    /// - SCRIBECAST_LANGUAGE → stt.language
    /// - SCRIBECAST_BIND → server.bind
    /// - SCRIBECAST_CHAT_URL → chat.url
    pub fn with_env_overrides(mut self) -> Self {
        if let Ok(model) = std::env::var("SCRIBECAST_MODEL")
            && !model.is_empty()
        {
            self.stt.model = model;
        }

        if let Ok(language) = std::env::var("SCRIBECAST_LANGUAGE")
            && !language.is_empty()
        {
            self.stt.language = language;
        }

        if let Ok(bind) = std::env::var("SCRIBECAST_BIND")
            && !bind.is_empty()
        {
            self.server.bind = bind;
        }

        if let Ok(url) = std::env::var("SCRIBECAST_CHAT_URL")
            && !url.is_empty()
        {
            self.chat.url = url;
        }

        self
    }

    /// Reject configurations the pipeline cannot run with.
    pub fn validate(&self) -> Result<()> {
        if self.audio.sample_rate == 0 {
            return Err(ScribecastError::ConfigInvalidValue {
                key: "audio.sample_rate".to_string(),
                message: "must be positive".to_string(),
            });
        }
        if self.audio.window_secs == 0 {
            return Err(ScribecastError::ConfigInvalidValue {
                key: "audio.window_secs".to_string(),
                message: "must be positive".to_string(),
            });
        }
        if self.audio.min_samples > self.audio.window_samples() {
            return Err(ScribecastError::ConfigInvalidValue {
                key: "audio.min_samples".to_string(),
                message: "must not exceed the window length".to_string(),
            });
        }
        if self.server.bind.parse::<std::net::SocketAddr>().is_err() {
            return Err(ScribecastError::ConfigInvalidValue {
                key: "server.bind".to_string(),
                message: format!("not a socket address: {}", self.server.bind),
            });
        }
        Ok(())
    }

    /// Get the default configuration file path
    ///
    /// Returns ~/.config/scribecast/config.toml on Linux
    #[cfg(feature = "cli")]
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join("scribecast").join("config.toml"))
    }
}
