//! Worker status reporting.
//!
//! The worker publishes a short phase string ("waiting for audio ...",
//! "running inference ...") that pollers read. A host may force its own
//! text, which wins over the automatic one until cleared.

use std::sync::Mutex;
use std::time::{Duration, Instant};

#[derive(Debug, Default)]
struct StatusInner {
    auto: String,
    forced: String,
}

/// Current pipeline status with a host-forced override.
#[derive(Debug, Default)]
pub struct StatusBoard {
    inner: Mutex<StatusInner>,
}

impl StatusBoard {
    pub fn new() -> Self {
        Self::default()
    }

    /// Publishes the automatic status.
    pub fn set_auto(&self, status: &str) {
        let mut inner = self.inner.lock().unwrap_or_else(|e| e.into_inner());
        inner.auto = status.to_string();
    }

    /// Forces a displayed status; an empty string clears the override.
    pub fn set_forced(&self, status: &str) {
        let mut inner = self.inner.lock().unwrap_or_else(|e| e.into_inner());
        inner.forced = status.to_string();
    }

    /// Returns the forced status when set, else the automatic one.
    pub fn get(&self) -> String {
        let inner = self.inner.lock().unwrap_or_else(|e| e.into_inner());
        if inner.forced.is_empty() {
            inner.auto.clone()
        } else {
            inner.forced.clone()
        }
    }
}

/// Rate limiter for status writes.
///
/// The worker loop runs every few milliseconds while idle; without this,
/// pollers would see a report storm.
#[derive(Debug)]
pub struct StatusThrottle {
    min_interval: Duration,
    last: Option<Instant>,
}

impl StatusThrottle {
    pub fn new(min_interval: Duration) -> Self {
        Self {
            min_interval,
            last: None,
        }
    }

    /// Returns true at most once per interval, and always on the first call.
    pub fn ready(&mut self) -> bool {
        let now = Instant::now();
        match self.last {
            Some(last) if now.duration_since(last) < self.min_interval => false,
            _ => {
                self.last = Some(now);
                true
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_auto_status_roundtrip() {
        let board = StatusBoard::new();
        assert_eq!(board.get(), "");
        board.set_auto("waiting for audio ...");
        assert_eq!(board.get(), "waiting for audio ...");
    }

    #[test]
    fn test_forced_status_wins() {
        let board = StatusBoard::new();
        board.set_auto("running inference ...");
        board.set_forced("paused by host");
        assert_eq!(board.get(), "paused by host");
    }

    #[test]
    fn test_empty_forced_clears_override() {
        let board = StatusBoard::new();
        board.set_auto("waiting for audio ...");
        board.set_forced("paused");
        board.set_forced("");
        assert_eq!(board.get(), "waiting for audio ...");
    }

    #[test]
    fn test_throttle_first_call_is_ready() {
        let mut throttle = StatusThrottle::new(Duration::from_millis(100));
        assert!(throttle.ready());
        assert!(!throttle.ready());
    }

    #[test]
    fn test_throttle_reopens_after_interval() {
        let mut throttle = StatusThrottle::new(Duration::from_millis(5));
        assert!(throttle.ready());
        std::thread::sleep(Duration::from_millis(10));
        assert!(throttle.ready());
    }

    #[test]
    fn test_throttle_zero_interval_always_ready() {
        let mut throttle = StatusThrottle::new(Duration::ZERO);
        assert!(throttle.ready());
        assert!(throttle.ready());
    }
}
