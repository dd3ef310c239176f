//! Default configuration constants for scribecast.
//!
//! Shared constants used across configuration types to keep the audio,
//! pipeline, and server defaults in one place.

/// Default audio sample rate in Hz.
///
/// 16kHz is the standard for speech recognition and what every supported
/// decode engine expects as input.
pub const SAMPLE_RATE: u32 = 16000;

/// Default decode window length in seconds.
///
/// Each worker iteration drains at most this much of the newest buffered
/// audio and hands it to the engine. Longer windows give the decoder more
/// context at the cost of latency.
pub const WINDOW_SECS: u32 = 5;

/// Default decode window length in samples at [`SAMPLE_RATE`].
pub const WINDOW_SAMPLES: usize = (WINDOW_SECS as usize) * (SAMPLE_RATE as usize);

/// Minimum buffered samples before a worker attempts a decode.
///
/// Below this the worker treats the buffer as silence/startup and backs off
/// instead of spinning on tiny windows.
pub const MIN_WINDOW_SAMPLES: usize = 1024;

/// Worker back-off sleep while waiting for audio, in milliseconds.
pub const POLL_INTERVAL_MS: u64 = 10;

/// Minimum interval between automatic status updates, in milliseconds.
///
/// The worker loop runs hot while audio streams in; status writes are
/// throttled to this interval so pollers don't see a report storm.
pub const STATUS_INTERVAL_MS: u64 = 100;

/// Number of inference context slots in the pool.
///
/// Each slot owns one engine instance and one dedicated worker thread.
/// Single-slot deployments are the supported configuration for a shared
/// transcript; the pool exists for slot lifecycle management.
pub const MAX_CONTEXTS: usize = 4;

/// Minimum RMS energy for a window to be worth decoding.
///
/// Windows below this are silence/ambient noise and are dropped without
/// invoking the engine. Set to 0.0 to disable the gate.
pub const MIN_ENERGY_FOR_DECODE: f32 = 0.001;

/// Default TCP bind address for the subscriber server.
pub const BIND_ADDR: &str = "127.0.0.1:8080";

/// Default language code for transcription.
pub const DEFAULT_LANGUAGE: &str = "en";

/// Language value that triggers automatic language detection.
pub const AUTO_LANGUAGE: &str = "auto";

/// Default chat completion endpoint.
pub const CHAT_URL: &str = "https://api.openai.com/v1/chat/completions";

/// Default chat model name.
pub const CHAT_MODEL: &str = "gpt-4o-mini";

/// Environment variable holding the chat API key.
pub const CHAT_API_KEY_ENV: &str = "SCRIBECAST_API_KEY";

/// Decoder output markers that never correspond to speech.
///
/// Segments are cleaned of these before merging; a window that cleans to
/// empty is skipped entirely.
pub const HALLUCINATION_MARKERS: &[&str] = &[
    "(BLANK_AUDIO)",
    "(blank audio)",
    "(inaudible)",
    "(silence)",
    "(music)",
];

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn window_samples_matches_rate_and_secs() {
        assert_eq!(WINDOW_SAMPLES, 80_000);
    }

    #[test]
    fn min_window_is_smaller_than_full_window() {
        assert!(MIN_WINDOW_SAMPLES < WINDOW_SAMPLES);
    }

    #[test]
    fn bind_addr_parses() {
        let addr: std::net::SocketAddr = BIND_ADDR.parse().unwrap();
        assert_eq!(addr.port(), 8080);
    }
}
