//! Host binding surface.
//!
//! Embeddable, handle-based entry points over one session: claim an
//! inference context slot, feed audio, poll transcript and status. The
//! surface is polled, not exception-driven — failures come back as `0` or
//! `false` plus a log line, which is what an embedding host (or a wasm
//! shim) can actually consume.

use std::sync::{Arc, Mutex};

use tracing::warn;

use crate::config::Config;
use crate::defaults::MAX_CONTEXTS;
use crate::pipeline::{WorkerConfig, WorkerHandle, spawn_worker};
use crate::session::Session;
use crate::stt::engine::SpeechEngine;

/// Handle value meaning "no free slot / init failed".
pub const INVALID_HANDLE: usize = 0;

/// Pool of inference context slots over one shared session.
///
/// Each claimed slot runs a dedicated decode worker. Handles are `slot + 1`
/// so that zero stays the failure sentinel. Single-slot deployments are the
/// supported configuration for one shared transcript; claiming several
/// slots concurrently is possible but their merges are not sequenced
/// against each other.
pub struct StreamRuntime {
    session: Arc<Session>,
    worker_config: WorkerConfig,
    slots: Mutex<Vec<Option<WorkerHandle>>>,
}

impl StreamRuntime {
    pub fn new(config: &Config) -> Self {
        Self {
            session: Arc::new(Session::new(config)),
            worker_config: WorkerConfig::from_config(config),
            slots: Mutex::new((0..MAX_CONTEXTS).map(|_| None).collect()),
        }
    }

    /// The shared session, for wiring the server and producers.
    pub fn session(&self) -> Arc<Session> {
        Arc::clone(&self.session)
    }

    /// Claims the first free context slot and starts its worker.
    ///
    /// Returns the slot handle, or [`INVALID_HANDLE`] when the engine is
    /// not usable or every slot is taken. Slots whose worker already died
    /// (fatal decode error) are reaped and reused here.
    pub fn init(&self, engine: Box<dyn SpeechEngine>) -> usize {
        if !engine.is_ready() {
            warn!(model = engine.name(), "engine not ready, init refused");
            return INVALID_HANDLE;
        }

        let mut slots = self.slots.lock().unwrap_or_else(|e| e.into_inner());
        for (i, slot) in slots.iter_mut().enumerate() {
            // Reap a worker that exited on its own
            if slot.as_ref().is_some_and(|h| !h.is_running())
                && let Some(dead) = slot.take()
            {
                dead.join();
            }

            if slot.is_none() {
                *slot = Some(spawn_worker(
                    Arc::clone(&self.session),
                    engine,
                    self.worker_config.clone(),
                ));
                return i + 1;
            }
        }

        warn!("no free inference context slot");
        INVALID_HANDLE
    }

    /// Signals the slot's worker to exit after its current iteration and
    /// releases the slot. A no-op for unknown handles.
    pub fn free(&self, handle: usize) {
        let taken = {
            let mut slots = self.slots.lock().unwrap_or_else(|e| e.into_inner());
            match handle.checked_sub(1).and_then(|i| slots.get_mut(i)) {
                Some(slot) => slot.take(),
                None => None,
            }
        };
        // Join outside the slot lock; this waits out an in-flight decode.
        if let Some(worker) = taken {
            worker.join();
        }
    }

    /// Appends producer audio for the given slot.
    ///
    /// Returns false (and logs) when the handle does not name a live slot.
    pub fn set_audio(&self, handle: usize, samples: &[f32]) -> bool {
        let alive = {
            let slots = self.slots.lock().unwrap_or_else(|e| e.into_inner());
            handle
                .checked_sub(1)
                .and_then(|i| slots.get(i))
                .and_then(|slot| slot.as_ref())
                .is_some_and(|h| h.is_running())
        };
        if !alive {
            warn!(handle, "set_audio on dead or unknown context slot");
            return false;
        }
        self.session.buffer.append(samples);
        true
    }

    /// Current accepted transcript.
    pub fn get_transcribed(&self) -> String {
        self.session.transcript()
    }

    /// Current status string (forced override wins).
    pub fn get_status(&self) -> String {
        self.session.status.get()
    }

    /// Forces the displayed status; an empty string clears the override.
    pub fn set_status(&self, status: &str) {
        self.session.status.set_forced(status);
    }

    /// Wipes buffered audio and the accumulated transcript.
    pub fn reset_transcription(&self) {
        self.session.reset();
    }

    /// Number of slots with a live worker.
    pub fn active_workers(&self) -> usize {
        let slots = self.slots.lock().unwrap_or_else(|e| e.into_inner());
        slots
            .iter()
            .filter(|slot| slot.as_ref().is_some_and(|h| h.is_running()))
            .count()
    }

    /// Stops every worker and waits for their threads.
    pub fn shutdown(&self) {
        let taken: Vec<WorkerHandle> = {
            let mut slots = self.slots.lock().unwrap_or_else(|e| e.into_inner());
            slots.iter_mut().filter_map(Option::take).collect()
        };
        for worker in taken {
            worker.join();
        }
    }
}

impl Drop for StreamRuntime {
    fn drop(&mut self) {
        self.shutdown();
    }
}
