//! Shared session state.
//!
//! One `Session` is the meeting point of the pipeline: the producer appends
//! into its buffer, workers merge into its transcript, the server broadcasts
//! through its hub, and pollers read its status. Every piece is individually
//! lock-guarded; no lock is ever held across I/O or a decode call.

use std::sync::Mutex;

use crate::audio::SampleBuffer;
use crate::config::Config;
use crate::hub::BroadcastHub;
use crate::pipeline::status::StatusBoard;
use crate::server::protocol::Outbound;
use crate::stt::merge;

#[derive(Debug)]
pub struct Session {
    /// Incoming audio, producer-appended, worker-drained.
    pub buffer: SampleBuffer,
    /// The single accepted transcript. Mutated only with merge output.
    transcript: Mutex<String>,
    /// Worker phase string plus host override.
    pub status: StatusBoard,
    /// Live subscriber fan-out.
    pub hub: BroadcastHub<Outbound>,
}

impl Session {
    pub fn new(config: &Config) -> Self {
        Self {
            buffer: SampleBuffer::with_min_samples(config.audio.min_samples),
            transcript: Mutex::new(String::new()),
            status: StatusBoard::new(),
            hub: BroadcastHub::new(),
        }
    }

    /// Current accepted transcript.
    pub fn transcript(&self) -> String {
        self.transcript
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }

    /// Stitches a cleaned segment into the transcript.
    ///
    /// The lock is held only for the merge-and-assign; the returned copy is
    /// what callers log or inspect.
    pub fn merge_segment(&self, segment: &str) -> String {
        let mut guard = self.transcript.lock().unwrap_or_else(|e| e.into_inner());
        *guard = merge::merge(guard.as_str(), segment);
        guard.clone()
    }

    /// Clears the transcript, keeping buffered audio.
    pub fn clear_transcript(&self) {
        self.transcript
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clear();
    }

    /// Full reset: buffered audio and transcript both wiped.
    pub fn reset(&self) {
        self.buffer.clear();
        self.clear_transcript();
    }
}

impl Default for Session {
    fn default() -> Self {
        Self::new(&Config::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_session_is_empty() {
        let session = Session::default();
        assert_eq!(session.transcript(), "");
        assert!(session.buffer.is_empty());
        assert!(!session.hub.is_any_connected());
    }

    #[test]
    fn test_merge_segment_accumulates() {
        let session = Session::default();
        session.merge_segment("the quick brown fox jumps over");
        let merged = session.merge_segment("fox jumps over the lazy dog");
        assert_eq!(merged, "the quick brown fox jumps over the lazy dog");
        assert_eq!(session.transcript(), merged);
    }

    #[test]
    fn test_reset_wipes_audio_and_transcript() {
        let mut config = Config::default();
        config.audio.min_samples = 1;
        let session = Session::new(&config);

        session.buffer.append(&[0.5; 32]);
        session.merge_segment("some words");
        session.reset();

        assert!(session.buffer.is_empty());
        assert_eq!(session.transcript(), "");
    }

    #[test]
    fn test_clear_transcript_keeps_audio() {
        let mut config = Config::default();
        config.audio.min_samples = 1;
        let session = Session::new(&config);

        session.buffer.append(&[0.5; 32]);
        session.merge_segment("some words");
        session.clear_transcript();

        assert_eq!(session.buffer.len(), 32);
        assert_eq!(session.transcript(), "");
    }
}
