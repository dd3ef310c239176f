//! Speech engine seam.
//!
//! The acoustic model is an external collaborator: a black box that maps a
//! finite audio window to decoded text segments. This trait is the only
//! surface the pipeline depends on, which keeps the real engine swappable
//! for a mock in every test.

use std::collections::VecDeque;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use crate::error::{Result, ScribecastError};

/// One decode context over an acoustic model.
///
/// An engine instance is owned by exactly one worker thread, so `decode`
/// takes `&mut self` and the trait only requires `Send`. A decode error is
/// fatal to the owning worker, never retried.
pub trait SpeechEngine: Send {
    /// Decodes one audio window into text segments.
    ///
    /// # Arguments
    /// * `window` - f32 samples at 16kHz mono, newest window of the stream
    ///
    /// # Returns
    /// The decoded segments in order, possibly empty for a silent window.
    fn decode(&mut self, window: &[f32]) -> Result<Vec<String>>;

    /// Name of the underlying model, for logs and status.
    fn name(&self) -> &str;

    /// Whether the engine is loaded and usable.
    fn is_ready(&self) -> bool;
}

/// Scripted engine for tests and the `--mock` run mode.
///
/// Replays a fixed script of segment lists, then falls back to the default
/// response. Tracks how many windows it was handed.
#[derive(Debug, Clone)]
pub struct MockEngine {
    name: String,
    script: VecDeque<Vec<String>>,
    fallback: Vec<String>,
    should_fail: bool,
    calls: Arc<AtomicUsize>,
}

impl MockEngine {
    /// Creates a mock engine with an empty script.
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            script: VecDeque::new(),
            fallback: Vec::new(),
            should_fail: false,
            calls: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Queues one scripted response of decoded segments.
    pub fn with_segments(mut self, segments: &[&str]) -> Self {
        self.script
            .push_back(segments.iter().map(|s| s.to_string()).collect());
        self
    }

    /// Sets the response returned once the script is exhausted.
    pub fn with_fallback(mut self, segments: &[&str]) -> Self {
        self.fallback = segments.iter().map(|s| s.to_string()).collect();
        self
    }

    /// Configures the mock to fail on every decode.
    pub fn with_failure(mut self) -> Self {
        self.should_fail = true;
        self
    }

    /// Shared decode-call counter, usable after the engine moved into a
    /// worker thread.
    pub fn call_counter(&self) -> Arc<AtomicUsize> {
        Arc::clone(&self.calls)
    }
}

impl SpeechEngine for MockEngine {
    fn decode(&mut self, _window: &[f32]) -> Result<Vec<String>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.should_fail {
            return Err(ScribecastError::DecodeFailed {
                message: "mock decode failure".to_string(),
            });
        }
        Ok(self.script.pop_front().unwrap_or_else(|| self.fallback.clone()))
    }

    fn name(&self) -> &str {
        &self.name
    }

    fn is_ready(&self) -> bool {
        !self.should_fail
    }
}
