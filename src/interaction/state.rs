//! Observable rig state
//!
//! The orchestrator writes; the binary, tests and anything else watching the
//! rig read. Reads never block the control thread for long: the lock is a
//! `parking_lot::RwLock` held only for field updates.

use crate::utils::{PhaseSplit, TimingTracker};
use chrono::{DateTime, Utc};
use parking_lot::{RwLock, RwLockReadGuard, RwLockWriteGuard};
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;
use uuid::Uuid;

/// Interaction state machine phases
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
pub enum InteractionPhase {
    #[default]
    Idle,
    TurningToUser,
    Listening,
    Thinking,
    Speaking,
    Aborting,
    ReturningToIdle,
}

impl InteractionPhase {
    pub fn is_idle(&self) -> bool {
        matches!(self, InteractionPhase::Idle)
    }
}

impl std::fmt::Display for InteractionPhase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            InteractionPhase::Idle => "Idle",
            InteractionPhase::TurningToUser => "TurningToUser",
            InteractionPhase::Listening => "Listening",
            InteractionPhase::Thinking => "Thinking",
            InteractionPhase::Speaking => "Speaking",
            InteractionPhase::Aborting => "Aborting",
            InteractionPhase::ReturningToIdle => "ReturningToIdle",
        };
        write!(f, "{}", name)
    }
}

/// How an interaction ended
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum InteractionOutcome {
    /// Every phase ran
    Completed,
    /// A collaborator failed; the apology was attempted
    Aborted,
    /// The phase sequence panicked
    Crashed,
}

/// Summary of one finished interaction, logged as JSON
#[derive(Clone, Debug, Serialize)]
pub struct InteractionReport {
    pub id: Uuid,
    pub started_at: DateTime<Utc>,
    /// Sequence number of the press that started it
    pub activation_sequence: Option<u64>,
    /// From the debounced edge to the session opening
    pub activation_lag_ms: Option<u64>,
    pub outcome: InteractionOutcome,
    pub transcript: Option<String>,
    pub response: Option<String>,
    pub error: Option<String>,
    /// Length the speech animation was timed to
    pub speech_ms: Option<u64>,
    /// Whether `speech_ms` is the fallback estimate
    pub speech_estimated: bool,
    pub total_ms: u64,
    pub phases: Vec<PhaseSplit>,
}

/// Mutable rig state
#[derive(Clone, Debug, Default)]
pub struct RigState {
    pub phase: InteractionPhase,
    pub session: Option<Uuid>,
    pub last_transcript: Option<String>,
    pub last_response: Option<String>,
    pub last_error: Option<String>,
    pub completed: u64,
    pub aborted: u64,
    pub crashed: u64,
    pub dropped_activations: u64,
    pub durations: TimingTracker,
    pub last_report: Option<InteractionReport>,
}

impl RigState {
    /// Start tracking a new session
    pub fn begin(&mut self, id: Uuid) {
        self.session = Some(id);
        self.last_transcript = None;
        self.last_response = None;
        self.last_error = None;
    }

    /// Fold a finished interaction into the counters
    pub fn finish(&mut self, report: &InteractionReport) {
        match report.outcome {
            InteractionOutcome::Completed => self.completed += 1,
            InteractionOutcome::Aborted => self.aborted += 1,
            InteractionOutcome::Crashed => self.crashed += 1,
        }
        self.last_error = report.error.clone();
        self.durations.record(Duration::from_millis(report.total_ms));
        self.session = None;
        self.last_report = Some(report.clone());
    }

    pub fn snapshot(&self) -> RigSnapshot {
        RigSnapshot {
            phase: self.phase,
            session: self.session,
            last_transcript: self.last_transcript.clone(),
            last_response: self.last_response.clone(),
            last_error: self.last_error.clone(),
            completed: self.completed,
            aborted: self.aborted,
            crashed: self.crashed,
            dropped_activations: self.dropped_activations,
            average_interaction_ms: self.durations.average().as_millis() as u64,
        }
    }
}

/// Immutable copy of [`RigState`] for display and assertions
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct RigSnapshot {
    pub phase: InteractionPhase,
    pub session: Option<Uuid>,
    pub last_transcript: Option<String>,
    pub last_response: Option<String>,
    pub last_error: Option<String>,
    pub completed: u64,
    pub aborted: u64,
    pub crashed: u64,
    pub dropped_activations: u64,
    pub average_interaction_ms: u64,
}

/// Thread-safe handle to [`RigState`]
#[derive(Clone, Debug, Default)]
pub struct SharedRigState {
    inner: Arc<RwLock<RigState>>,
}

impl SharedRigState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn read(&self) -> RwLockReadGuard<'_, RigState> {
        self.inner.read()
    }

    pub fn write(&self) -> RwLockWriteGuard<'_, RigState> {
        self.inner.write()
    }

    pub fn snapshot(&self) -> RigSnapshot {
        self.read().snapshot()
    }

    pub fn phase(&self) -> InteractionPhase {
        self.read().phase
    }

    pub fn is_idle(&self) -> bool {
        self.read().phase.is_idle()
    }
}
