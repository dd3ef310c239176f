//! Pipeline orchestration: the decode worker loop.
//!
//! A worker owns one engine context and runs on a dedicated OS thread:
//! wait for enough buffered audio, drain the newest window, decode it
//! synchronously, stitch the cleaned segment into the shared transcript,
//! and fan the delta out to subscribers. Locks guard only data moves; the
//! decode call itself runs lock-free.

pub mod status;

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use tracing::{debug, error, info};

use crate::config::Config;
use crate::defaults;
use crate::server::protocol::Outbound;
use crate::session::Session;
use crate::stt::engine::SpeechEngine;
use crate::stt::filter::clean_segment;
use status::StatusThrottle;

/// Configuration for one decode worker.
#[derive(Debug, Clone)]
pub struct WorkerConfig {
    /// Maximum samples drained per decode window.
    pub window_samples: usize,
    /// Back-off sleep while waiting for audio.
    pub poll_interval: Duration,
    /// Minimum interval between automatic status updates.
    pub status_interval: Duration,
    /// RMS floor below which a window is dropped undecoded (0 disables).
    pub energy_floor: f32,
    /// Marker strings stripped from decoded segments.
    pub hallucination_filters: Vec<String>,
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            window_samples: defaults::WINDOW_SAMPLES,
            poll_interval: Duration::from_millis(defaults::POLL_INTERVAL_MS),
            status_interval: Duration::from_millis(defaults::STATUS_INTERVAL_MS),
            energy_floor: defaults::MIN_ENERGY_FOR_DECODE,
            hallucination_filters: defaults::HALLUCINATION_MARKERS
                .iter()
                .map(|m| m.to_string())
                .collect(),
        }
    }
}

impl WorkerConfig {
    /// Derives the worker configuration from the app config.
    pub fn from_config(config: &Config) -> Self {
        Self {
            window_samples: config.audio.window_samples(),
            energy_floor: config.audio.energy_floor,
            hallucination_filters: config.stt.hallucination_filters.clone(),
            ..Default::default()
        }
    }
}

/// Handle to a running decode worker.
#[derive(Debug)]
pub struct WorkerHandle {
    running: Arc<AtomicBool>,
    thread: Option<JoinHandle<()>>,
}

impl WorkerHandle {
    /// Signals the worker to exit after its current iteration.
    ///
    /// There is no forced interruption mid-decode; an in-flight inference
    /// call finishes first.
    pub fn stop(&self) {
        self.running.store(false, Ordering::SeqCst);
    }

    /// True while the worker loop is alive. Turns false after `stop` or
    /// after a fatal decode error.
    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    /// Stops the worker and waits for its thread to finish.
    pub fn join(mut self) {
        self.stop();
        if let Some(thread) = self.thread.take() {
            let _ = thread.join();
        }
    }
}

/// Spawns a decode worker bound to the given engine context.
pub fn spawn_worker(
    session: Arc<Session>,
    engine: Box<dyn SpeechEngine>,
    config: WorkerConfig,
) -> WorkerHandle {
    let running = Arc::new(AtomicBool::new(true));
    let thread = {
        let running = Arc::clone(&running);
        thread::spawn(move || run(session, engine, config, running))
    };

    WorkerHandle {
        running,
        thread: Some(thread),
    }
}

fn run(
    session: Arc<Session>,
    mut engine: Box<dyn SpeechEngine>,
    config: WorkerConfig,
    running: Arc<AtomicBool>,
) {
    info!(model = engine.name(), "decode worker started");
    let mut throttle = StatusThrottle::new(config.status_interval);

    while running.load(Ordering::SeqCst) {
        if throttle.ready() {
            session.status.set_auto("waiting for audio ...");
        }

        let window = session.buffer.take_window(config.window_samples);
        if window.is_empty() {
            thread::sleep(config.poll_interval);
            continue;
        }

        if config.energy_floor > 0.0 && rms(&window) < config.energy_floor {
            debug!(samples = window.len(), "window below energy floor, skipped");
            continue;
        }

        session.status.set_auto("running inference ...");
        let segments = match engine.decode(&window) {
            Ok(segments) => segments,
            Err(e) => {
                // Fatal for this context slot only; other workers and the
                // server keep going.
                error!(model = engine.name(), error = %e, "decode failed, worker exiting");
                break;
            }
        };

        let cleaned = clean_segment(&segments.concat(), &config.hallucination_filters);
        if cleaned.is_empty() {
            continue;
        }

        let merged = session.merge_segment(&cleaned);
        info!(segment = %cleaned, transcript_len = merged.len(), "window merged");
        session.hub.broadcast(Outbound::Transcribe { content: cleaned });
    }

    running.store(false, Ordering::SeqCst);
    info!(model = engine.name(), "decode worker stopped");
}

/// Root-mean-square energy of a window.
fn rms(samples: &[f32]) -> f32 {
    if samples.is_empty() {
        return 0.0;
    }
    let sum_sq: f32 = samples.iter().map(|s| s * s).sum();
    (sum_sq / samples.len() as f32).sqrt()
}
