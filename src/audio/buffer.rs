//! Shared audio window buffer.
//!
//! Accumulates raw f32 samples from a producer and hands decode workers the
//! newest window on demand. The lock is held only for the copy-in or the
//! copy-and-erase, never across a decode call.

use std::sync::Mutex;

use crate::defaults::MIN_WINDOW_SAMPLES;

/// Thread-safe accumulator of audio samples.
///
/// Producers append to the tail; a worker drains a bounded suffix of the
/// newest samples per iteration. Capacity is unbounded: bounding producer
/// rate against consumer rate is a deployment policy, not enforced here.
#[derive(Debug)]
pub struct SampleBuffer {
    samples: Mutex<Vec<f32>>,
    /// Below this many buffered samples, `take_window` reports no audio.
    min_samples: usize,
}

impl SampleBuffer {
    /// Creates an empty buffer with the default minimum window threshold.
    pub fn new() -> Self {
        Self::with_min_samples(MIN_WINDOW_SAMPLES)
    }

    /// Creates an empty buffer with a custom minimum window threshold.
    pub fn with_min_samples(min_samples: usize) -> Self {
        Self {
            samples: Mutex::new(Vec::new()),
            min_samples,
        }
    }

    /// Appends samples to the tail of the buffer.
    pub fn append(&self, samples: &[f32]) {
        if samples.is_empty() {
            return;
        }
        let mut guard = self.samples.lock().unwrap_or_else(|e| e.into_inner());
        guard.extend_from_slice(samples);
    }

    /// Takes the newest window of up to `max_len` samples.
    ///
    /// Copies out the last `min(max_len, len)` samples and removes exactly
    /// that suffix, leaving older samples in place. Returns an empty vec
    /// when fewer than the minimum threshold are buffered; the caller is
    /// expected to back off rather than spin.
    pub fn take_window(&self, max_len: usize) -> Vec<f32> {
        let mut guard = self.samples.lock().unwrap_or_else(|e| e.into_inner());
        if guard.len() < self.min_samples || max_len == 0 {
            return Vec::new();
        }
        let take = max_len.min(guard.len());
        let split_at = guard.len() - take;
        guard.split_off(split_at)
    }

    /// Number of buffered samples.
    pub fn len(&self) -> usize {
        self.samples.lock().unwrap_or_else(|e| e.into_inner()).len()
    }

    /// Returns true when no samples are buffered.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Discards all buffered samples. Used on an external reset signal.
    pub fn clear(&self) {
        self.samples
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clear();
    }
}

impl Default for SampleBuffer {
    fn default() -> Self {
        Self::new()
    }
}
