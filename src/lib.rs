//! scribecast - live streaming transcription relay
//!
//! Continuously ingests audio, decodes overlapping windows through a
//! pluggable speech engine, stitches the outputs into one growing
//! transcript, and fans deltas out to line-delimited JSON subscribers.

#![warn(clippy::unwrap_used)]
#![warn(clippy::expect_used)]
#![warn(clippy::let_underscore_must_use)]

pub mod audio;
pub mod chat;
#[cfg(feature = "cli")]
pub mod cli;
pub mod config;
pub mod defaults;
pub mod error;
pub mod hub;
pub mod pipeline;
pub mod runtime;
pub mod server;
pub mod session;
pub mod stt;

// Core seams (engine → pipeline → hub)
pub use audio::buffer::SampleBuffer;
pub use hub::{BroadcastHub, SubscriberId};
pub use stt::engine::{MockEngine, SpeechEngine};

// Pipeline
pub use pipeline::{WorkerConfig, WorkerHandle, spawn_worker};
pub use runtime::{INVALID_HANDLE, StreamRuntime};
pub use session::Session;

// Error handling
pub use error::{Result, ScribecastError};

// Config
pub use config::Config;

// Chat side-channel
pub use chat::{ChatClient, ChatProvider};

/// Build version string with optional git commit hash.
///
/// Returns `"0.3.1+abc1234"` when git hash is available, `"0.3.1"` otherwise.
pub fn version_string() -> String {
    let version = env!("CARGO_PKG_VERSION");
    match option_env!("GIT_HASH") {
        Some(hash) if !hash.is_empty() => format!("{}+{}", version, hash),
        _ => version.to_string(),
    }
}
