//! Command-line interface.

use clap::Parser;
use std::path::PathBuf;
use std::time::Duration;

use crate::config::Config;

/// Live streaming transcription relay.
///
/// Streams a WAV file (or stdin) through the decode pipeline and serves
/// transcript deltas to TCP subscribers as line-delimited JSON.
#[derive(Parser, Debug)]
#[command(name = "scribecast", version, about)]
pub struct Cli {
    /// WAV file to stream; "-" reads WAV data from stdin
    pub input: Option<PathBuf>,

    /// Path to config file (default: ~/.config/scribecast/config.toml)
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// TCP bind address for subscribers (e.g. 127.0.0.1:8080)
    #[arg(short, long)]
    pub bind: Option<String>,

    /// Path to the decode model file
    #[arg(short, long)]
    pub model: Option<PathBuf>,

    /// Transcription language code, or "auto"
    #[arg(short, long)]
    pub language: Option<String>,

    /// Decode window length (e.g. "5s", "2500ms")
    #[arg(long, value_parser = humantime::parse_duration)]
    pub window: Option<Duration>,

    /// Feed the WAV as fast as the pipeline accepts it instead of
    /// simulating real-time capture
    #[arg(long)]
    pub fast: bool,

    /// Use the scripted mock engine instead of loading a model
    #[arg(long)]
    pub mock: bool,

    /// Only print warnings and errors
    #[arg(short, long, conflicts_with = "verbose")]
    pub quiet: bool,

    /// Print debug diagnostics
    #[arg(short, long)]
    pub verbose: bool,
}

impl Cli {
    /// Applies command-line overrides on top of the loaded config.
    pub fn apply_to(&self, config: &mut Config) {
        if let Some(bind) = &self.bind {
            config.server.bind = bind.clone();
        }
        if let Some(model) = &self.model {
            config.stt.model = model.to_string_lossy().to_string();
        }
        if let Some(language) = &self.language {
            config.stt.language = language.clone();
        }
        if let Some(window) = self.window {
            config.audio.window_secs = window.as_secs().max(1) as u32;
        }
    }
}
