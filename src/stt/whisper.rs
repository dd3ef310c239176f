//! Whisper-based speech engine.
//!
//! Wraps whisper-rs behind the [`SpeechEngine`] seam, tuned for streaming:
//! greedy sampling, single segment, no timestamps, so each window decodes
//! fast enough to keep up with the producer.
//!
//! # Feature Gate
//!
//! Requires the `whisper` feature and cmake:
//!
//! ```bash
//! cargo build --features whisper
//! ```

use std::path::PathBuf;

use crate::defaults;
use crate::error::{Result, ScribecastError};
use crate::stt::engine::SpeechEngine;

#[cfg(feature = "whisper")]
use std::sync::Once;
#[cfg(feature = "whisper")]
use whisper_rs::{
    FullParams, SamplingStrategy, WhisperContext, WhisperContextParameters, install_logging_hooks,
};

#[cfg(feature = "whisper")]
static LOGGING_HOOKS_INSTALLED: Once = Once::new();

/// Configuration for the Whisper engine.
#[derive(Debug, Clone)]
pub struct WhisperConfig {
    /// Path to the ggml model file
    pub model_path: PathBuf,
    /// Language code (e.g., "en"), or "auto" for detection
    pub language: String,
    /// Number of threads for inference (None = auto-detect)
    pub threads: Option<usize>,
}

impl Default for WhisperConfig {
    fn default() -> Self {
        Self {
            model_path: PathBuf::from("models/ggml-base.en.bin"),
            language: defaults::DEFAULT_LANGUAGE.to_string(),
            threads: None,
        }
    }
}

/// Whisper decode context bound to one worker.
#[cfg(feature = "whisper")]
pub struct WhisperEngine {
    context: WhisperContext,
    config: WhisperConfig,
    model_name: String,
}

/// Whisper engine placeholder (without the `whisper` feature).
///
/// Construction succeeds so CLI plumbing can be exercised, but decoding
/// always fails. Enable the `whisper` feature for real decoding.
#[cfg(not(feature = "whisper"))]
pub struct WhisperEngine {
    config: WhisperConfig,
    model_name: String,
}

impl WhisperEngine {
    fn model_name_from(config: &WhisperConfig) -> String {
        config
            .model_path
            .file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or("unknown")
            .to_string()
    }

    /// Get the configuration.
    pub fn config(&self) -> &WhisperConfig {
        &self.config
    }
}

#[cfg(feature = "whisper")]
impl WhisperEngine {
    /// Loads the model and creates a decode context.
    ///
    /// # Errors
    /// `ModelNotFound` if the model file doesn't exist;
    /// `DecodeFailed` if whisper fails to load it.
    pub fn new(config: WhisperConfig) -> Result<Self> {
        // Install logging hooks to suppress whisper.cpp output (only once)
        LOGGING_HOOKS_INSTALLED.call_once(|| {
            install_logging_hooks();
        });

        if !config.model_path.exists() {
            return Err(ScribecastError::ModelNotFound {
                path: config.model_path.to_string_lossy().to_string(),
            });
        }

        let model_name = Self::model_name_from(&config);

        let context = WhisperContext::new_with_params(
            config
                .model_path
                .to_str()
                .ok_or_else(|| ScribecastError::DecodeFailed {
                    message: "Invalid UTF-8 in model path".to_string(),
                })?,
            WhisperContextParameters::default(),
        )
        .map_err(|e| ScribecastError::DecodeFailed {
            message: format!("Failed to load Whisper model: {}", e),
        })?;

        Ok(Self {
            context,
            config,
            model_name,
        })
    }
}

#[cfg(not(feature = "whisper"))]
impl WhisperEngine {
    /// Creates the stub engine (fails on decode).
    pub fn new(config: WhisperConfig) -> Result<Self> {
        if !config.model_path.exists() {
            return Err(ScribecastError::ModelNotFound {
                path: config.model_path.to_string_lossy().to_string(),
            });
        }
        let model_name = Self::model_name_from(&config);
        Ok(Self { config, model_name })
    }
}

#[cfg(feature = "whisper")]
impl SpeechEngine for WhisperEngine {
    fn decode(&mut self, window: &[f32]) -> Result<Vec<String>> {
        let mut state =
            self.context
                .create_state()
                .map_err(|e| ScribecastError::DecodeFailed {
                    message: format!("Failed to create Whisper state: {}", e),
                })?;

        let mut params = FullParams::new(SamplingStrategy::Greedy { best_of: 1 });
        if self.config.language == defaults::AUTO_LANGUAGE {
            params.set_language(None);
        } else {
            params.set_language(Some(&self.config.language));
        }
        if let Some(threads) = self.config.threads {
            params.set_n_threads(threads as i32);
        }
        params.set_no_context(true);
        params.set_single_segment(true);
        params.set_max_tokens(32);
        params.set_suppress_blank(true);
        params.set_print_special(false);
        params.set_print_progress(false);
        params.set_print_realtime(false);
        params.set_print_timestamps(false);

        state
            .full(params, window)
            .map_err(|e| ScribecastError::DecodeFailed {
                message: format!("Whisper inference failed: {}", e),
            })?;

        let mut segments = Vec::new();
        for segment in state.as_iter() {
            segments.push(segment.to_string());
        }
        Ok(segments)
    }

    fn name(&self) -> &str {
        &self.model_name
    }

    fn is_ready(&self) -> bool {
        true
    }
}

#[cfg(not(feature = "whisper"))]
impl SpeechEngine for WhisperEngine {
    fn decode(&mut self, _window: &[f32]) -> Result<Vec<String>> {
        Err(ScribecastError::DecodeFailed {
            message: "whisper feature not enabled; rebuild with --features whisper".to_string(),
        })
    }

    fn name(&self) -> &str {
        &self.model_name
    }

    fn is_ready(&self) -> bool {
        false
    }
}
