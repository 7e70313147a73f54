//! Session state shared between the control surface and the session worker
//!
//! The control surface only ever flips `running`; the worker owns the phase.
//! Each `start` bumps a generation so a worker left over from an earlier
//! session can tell it has been superseded even if `running` is true again.

use std::fmt;
use std::sync::atomic::{AtomicBool, AtomicU8, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

/// Session loop states
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum SessionPhase {
    Stopped = 0,
    Announcing = 1,
    Capturing = 2,
    Dispatching = 3,
}

impl From<u8> for SessionPhase {
    fn from(v: u8) -> Self {
        match v {
            1 => SessionPhase::Announcing,
            2 => SessionPhase::Capturing,
            3 => SessionPhase::Dispatching,
            _ => SessionPhase::Stopped,
        }
    }
}

impl fmt::Display for SessionPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SessionPhase::Stopped => write!(f, "stopped"),
            SessionPhase::Announcing => write!(f, "announcing"),
            SessionPhase::Capturing => write!(f, "capturing"),
            SessionPhase::Dispatching => write!(f, "dispatching"),
        }
    }
}

pub struct SessionState {
    running: AtomicBool,
    phase: AtomicU8,
    generation: AtomicU64,
    /// Held by the active worker for its whole run
    worker: Mutex<()>,
}

impl SessionState {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            running: AtomicBool::new(false),
            phase: AtomicU8::new(SessionPhase::Stopped as u8),
            generation: AtomicU64::new(0),
            worker: Mutex::new(()),
        })
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    /// Mark a new session as running and return its generation
    pub fn begin(&self) -> u64 {
        let generation = self.generation.fetch_add(1, Ordering::SeqCst) + 1;
        self.running.store(true, Ordering::SeqCst);
        generation
    }

    /// Cooperative stop: the worker notices at its next check point
    pub fn request_stop(&self) {
        self.running.store(false, Ordering::SeqCst);
    }

    /// End the given session, unless a newer one has already started
    pub fn finish(&self, generation: u64) {
        if self.generation.load(Ordering::SeqCst) == generation {
            self.running.store(false, Ordering::SeqCst);
        }
    }

    pub fn generation(&self) -> u64 {
        self.generation.load(Ordering::SeqCst)
    }

    /// True while `generation` is the current session and it has not been stopped
    pub fn should_continue(&self, generation: u64) -> bool {
        self.is_running() && self.generation() == generation
    }

    pub fn phase(&self) -> SessionPhase {
        SessionPhase::from(self.phase.load(Ordering::SeqCst))
    }

    pub fn set_phase(&self, phase: SessionPhase) {
        self.phase.store(phase as u8, Ordering::SeqCst);
    }

    /// Block until no other worker is active
    pub fn lock_worker(&self) -> MutexGuard<'_, ()> {
        // A worker that panicked while holding the lock has still finished
        self.worker.lock().unwrap_or_else(|e| e.into_inner())
    }
}

impl fmt::Debug for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SessionState")
            .field("running", &self.is_running())
            .field("phase", &self.phase())
            .field("generation", &self.generation())
            .finish()
    }
}

pub type SharedState = Arc<SessionState>;
