//! Speech-to-text: the engine seam, segment hygiene, and transcript merging.

pub mod engine;
pub mod filter;
pub mod merge;
pub mod whisper;

pub use engine::{MockEngine, SpeechEngine};
pub use whisper::{WhisperConfig, WhisperEngine};
