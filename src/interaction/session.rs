//! Single-flight interaction sessions
//!
//! The gate owns the one `busy` flag. Opening a session sets it; dropping
//! the session clears it, so every exit path (including unwinding) releases
//! the gate.

use crate::sensor::Activation;
use chrono::{DateTime, Utc};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use uuid::Uuid;

/// Admits at most one live [`InteractionSession`]
#[derive(Clone, Debug, Default)]
pub struct SessionGate {
    busy: Arc<AtomicBool>,
}

impl SessionGate {
    pub fn new() -> Self {
        Self::default()
    }

    /// Open a session unless one is already live
    ///
    /// `started` is the monotonic clock reading used for diagnostics.
    pub fn try_open(&self, started: Duration, activation: Option<Activation>) -> Option<InteractionSession> {
        self.busy
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .ok()?;
        Some(InteractionSession {
            id: Uuid::new_v4(),
            started_at: Utc::now(),
            started,
            activation,
            busy: Arc::clone(&self.busy),
        })
    }

    pub fn is_busy(&self) -> bool {
        self.busy.load(Ordering::SeqCst)
    }
}

/// One interaction, from activation to return-to-idle
#[derive(Debug)]
pub struct InteractionSession {
    pub id: Uuid,
    pub started_at: DateTime<Utc>,
    pub started: Duration,
    pub activation: Option<Activation>,
    busy: Arc<AtomicBool>,
}

impl Drop for InteractionSession {
    fn drop(&mut self) {
        self.busy.store(false, Ordering::SeqCst);
    }
}
