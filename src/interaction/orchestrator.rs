//! Interaction orchestrator
//!
//! Runs the phase sequence for one interaction at a time:
//!
//! ```text
//! Idle -> TurningToUser -> Listening -> Thinking -> Speaking -> ReturningToIdle -> Idle
//!                             |                       |
//!                             +-------> Aborting <----+
//! ```
//!
//! Activations are admitted through the [`SessionGate`] by the handle on
//! the caller's thread (typically the button poller) and executed on a
//! single control thread. An activation that finds the gate closed is
//! dropped, never queued.
//!
//! Whatever happens inside the sequence, the exit path always returns the
//! body to rest, stops every actuator and releases the gate.

use super::session::{InteractionSession, SessionGate};
use super::state::{
    InteractionOutcome, InteractionPhase, InteractionReport, SharedRigState,
};
use crate::actuator::ActuatorPort;
use crate::animation::{AnimationPlan, AnimationSynchronizer, BodyMotion, RandomSource};
use crate::collaborators::{AudioClip, Collaborators};
use crate::config::RigConfig;
use crate::sensor::Activation;
use crate::utils::{Clock, PhaseTimer};
use crate::{Result, RigError};
use crossbeam_channel::{bounded, Receiver, Sender, TrySendError};
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;
use tracing::{debug, error, info, trace, warn};
use uuid::Uuid;

/// Commands for the control thread
#[derive(Debug)]
pub enum RigCommand {
    /// Run an admitted session
    Begin(InteractionSession),
    /// Stop the control thread after any running interaction
    Shutdown,
}

/// Notifications published by the orchestrator
#[derive(Clone, Debug)]
pub enum RigEvent {
    PhaseChanged(InteractionPhase),
    /// An activation arrived while busy and was discarded
    ActivationDropped(Activation),
    InteractionFinished(InteractionReport),
    Shutdown,
}

/// Result of offering an activation to the orchestrator
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ActivationOutcome {
    Started(Uuid),
    Dropped,
}

/// What the Speaking phase did
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SpeechSummary {
    pub duration: Duration,
    pub estimated: bool,
}

fn publish(event_tx: &Sender<RigEvent>, event: RigEvent) {
    match event_tx.try_send(event) {
        Ok(()) => {}
        Err(TrySendError::Full(event)) => trace!("Event queue full, dropping {:?}", event),
        Err(TrySendError::Disconnected(_)) => {}
    }
}

/// Keep collaborator failures in the abort taxonomy
fn collaborator_error(e: RigError, wrap: fn(String) -> RigError) -> RigError {
    if e.aborts_interaction() {
        e
    } else {
        wrap(e.to_string())
    }
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}

/// Handle for offering activations and observing the orchestrator
///
/// Cheap to clone; the button poller and the binary each hold one.
#[derive(Clone)]
pub struct OrchestratorHandle {
    command_tx: Sender<RigCommand>,
    event_tx: Sender<RigEvent>,
    event_rx: Receiver<RigEvent>,
    gate: SessionGate,
    state: SharedRigState,
    port: Arc<ActuatorPort>,
    clock: Arc<dyn Clock>,
}

impl OrchestratorHandle {
    /// Offer an activation; never blocks
    ///
    /// Starts an interaction if none is running, otherwise drops it.
    pub fn activate(&self, activation: Activation) -> ActivationOutcome {
        let Some(session) = self.gate.try_open(self.clock.now(), Some(activation)) else {
            debug!("Busy, dropping activation #{}", activation.sequence);
            self.state.write().dropped_activations += 1;
            publish(&self.event_tx, RigEvent::ActivationDropped(activation));
            return ActivationOutcome::Dropped;
        };

        let id = session.id;
        match self.command_tx.try_send(RigCommand::Begin(session)) {
            Ok(()) => ActivationOutcome::Started(id),
            Err(e) => {
                // The session inside the error is dropped here, releasing the gate
                warn!("Control thread unavailable, dropping activation: {}", e);
                ActivationOutcome::Dropped
            }
        }
    }

    /// Lock out the actuators immediately, then stop the control thread
    pub fn shutdown(&self) -> Result<()> {
        self.port.emergency_stop();
        self.command_tx
            .send(RigCommand::Shutdown)
            .map_err(|e| RigError::Channel(format!("Failed to send shutdown: {}", e)))
    }

    pub fn is_busy(&self) -> bool {
        self.gate.is_busy()
    }

    pub fn state(&self) -> &SharedRigState {
        &self.state
    }

    pub fn port(&self) -> &Arc<ActuatorPort> {
        &self.port
    }

    /// Try to receive an event (non-blocking)
    pub fn try_recv_event(&self) -> Option<RigEvent> {
        self.event_rx.try_recv().ok()
    }

    /// Receive an event, waiting at most `timeout`
    pub fn recv_event_timeout(&self, timeout: Duration) -> Option<RigEvent> {
        self.event_rx.recv_timeout(timeout).ok()
    }

    /// Wait for the next finished interaction, skipping other events
    pub fn wait_for_report(&self, timeout: Duration) -> Option<InteractionReport> {
        let deadline = std::time::Instant::now() + timeout;
        loop {
            let remaining = deadline.saturating_duration_since(std::time::Instant::now());
            match self.event_rx.recv_timeout(remaining) {
                Ok(RigEvent::InteractionFinished(report)) => return Some(report),
                Ok(_) => continue,
                Err(_) => return None,
            }
        }
    }
}

/// Executes interactions on the control thread
pub struct Orchestrator {
    config: RigConfig,
    port: Arc<ActuatorPort>,
    collaborators: Collaborators,
    animator: AnimationSynchronizer,
    body: BodyMotion,
    clock: Arc<dyn Clock>,
    gate: SessionGate,
    state: SharedRigState,
    command_rx: Receiver<RigCommand>,
    event_tx: Sender<RigEvent>,
}

impl Orchestrator {
    /// Create an orchestrator and the handle used to drive it
    ///
    /// The orchestrator must be started with `start()` before activations
    /// offered through the handle are executed.
    pub fn new(
        config: RigConfig,
        port: Arc<ActuatorPort>,
        collaborators: Collaborators,
        clock: Arc<dyn Clock>,
        random: Box<dyn RandomSource>,
    ) -> (Self, OrchestratorHandle) {
        // One admitted session at most, so one slot is enough
        let (command_tx, command_rx) = bounded(1);
        let (event_tx, event_rx) = bounded(100);
        let gate = SessionGate::new();
        let state = SharedRigState::new();

        let animator = AnimationSynchronizer::new(
            Arc::clone(&port),
            Arc::clone(&clock),
            random,
            config.timing.animation_step(),
            config.timing.animation_jitter(),
        );
        let body = BodyMotion::new(
            Arc::clone(&port),
            Arc::clone(&clock),
            config.actuators.intensity(crate::actuator::Actuator::Body),
            config.timing.turn(),
            config.actuators.hold,
        );

        let handle = OrchestratorHandle {
            command_tx,
            event_tx: event_tx.clone(),
            event_rx,
            gate: gate.clone(),
            state: state.clone(),
            port: Arc::clone(&port),
            clock: Arc::clone(&clock),
        };

        let orchestrator = Self {
            config,
            port,
            collaborators,
            animator,
            body,
            clock,
            gate,
            state,
            command_rx,
            event_tx,
        };

        (orchestrator, handle)
    }

    /// Admit a session directly, bypassing the control thread
    pub fn open_session(&self) -> Option<InteractionSession> {
        self.gate.try_open(self.clock.now(), None)
    }

    /// Start the control thread
    ///
    /// This consumes the orchestrator and returns the thread's join handle.
    pub fn start(self) -> Result<JoinHandle<()>> {
        thread::Builder::new()
            .name("interaction".into())
            .spawn(move || {
                info!("Orchestrator started");
                loop {
                    match self.command_rx.recv() {
                        Ok(RigCommand::Begin(session)) => {
                            self.run_interaction(session);
                        }
                        Ok(RigCommand::Shutdown) => {
                            info!("Shutdown requested");
                            self.port.emergency_stop();
                            break;
                        }
                        Err(_) => {
                            warn!("Command channel disconnected");
                            self.port.stop_all();
                            break;
                        }
                    }
                }
                publish(&self.event_tx, RigEvent::Shutdown);
                info!("Orchestrator stopped");
            })
            .map_err(|e| RigError::Io(format!("Failed to spawn control thread: {}", e)))
    }

    fn enter(&self, phase: InteractionPhase) {
        self.state.write().phase = phase;
        info!("Phase: {}", phase);
        publish(&self.event_tx, RigEvent::PhaseChanged(phase));
    }

    /// Run one interaction to completion and return to idle
    ///
    /// Never fails and never unwinds: collaborator errors abort to the
    /// apology, panics are contained, and cleanup always runs.
    pub fn run_interaction(&self, session: InteractionSession) -> InteractionReport {
        info!("Interaction {} started", session.id);
        self.state.write().begin(session.id);

        let mut timer = PhaseTimer::start(Arc::clone(&self.clock));
        let mut transcript = None;
        let mut response = None;
        let mut speech = None;

        let sequence = panic::catch_unwind(AssertUnwindSafe(|| {
            match self.run_phases(&mut timer, &mut transcript, &mut response, &mut speech) {
                Ok(()) => Ok(()),
                Err(e) => {
                    error!("Interaction aborted: {}", e);
                    self.enter(InteractionPhase::Aborting);
                    if let Err(apology_err) = self.speak(&self.config.phrases.apology) {
                        warn!("Apology could not be spoken: {}", apology_err);
                    }
                    timer.split(InteractionPhase::Aborting.to_string());
                    Err(e)
                }
            }
        }));

        let (outcome, error) = match sequence {
            Ok(Ok(())) => (InteractionOutcome::Completed, None),
            Ok(Err(e)) => (InteractionOutcome::Aborted, Some(e)),
            Err(payload) => {
                let message = panic_message(payload.as_ref());
                error!("Interaction panicked: {}", message);
                (
                    InteractionOutcome::Crashed,
                    Some(RigError::InteractionPanicked(message)),
                )
            }
        };

        self.enter(InteractionPhase::ReturningToIdle);
        if let Err(e) = self.body.return_to_rest() {
            warn!("Body did not return cleanly: {}", e);
        }
        self.port.stop_all();
        timer.split(InteractionPhase::ReturningToIdle.to_string());

        let report = InteractionReport {
            id: session.id,
            started_at: session.started_at,
            activation_sequence: session.activation.map(|a| a.sequence),
            activation_lag_ms: session
                .activation
                .map(|a| session.started.saturating_sub(a.at).as_millis() as u64),
            outcome,
            transcript,
            response,
            error: error.map(|e| e.to_string()),
            speech_ms: speech.map(|s: SpeechSummary| s.duration.as_millis() as u64),
            speech_estimated: speech.map(|s| s.estimated).unwrap_or(false),
            total_ms: timer.elapsed().as_millis() as u64,
            phases: timer.into_splits(),
        };

        self.state.write().finish(&report);
        drop(session);
        self.enter(InteractionPhase::Idle);

        match serde_json::to_string(&report) {
            Ok(json) => info!("Interaction finished: {}", json),
            Err(e) => warn!("Failed to serialize report: {}", e),
        }
        publish(&self.event_tx, RigEvent::InteractionFinished(report.clone()));
        report
    }

    fn run_phases(
        &self,
        timer: &mut PhaseTimer,
        transcript_out: &mut Option<String>,
        response_out: &mut Option<String>,
        speech_out: &mut Option<SpeechSummary>,
    ) -> Result<()> {
        self.enter(InteractionPhase::TurningToUser);
        if let Err(e) = self.body.turn_to_user() {
            warn!("Body turn failed, continuing: {}", e);
        }
        timer.split(InteractionPhase::TurningToUser.to_string());

        self.enter(InteractionPhase::Listening);
        let clip = self
            .collaborators
            .capture
            .record(self.config.timing.max_listen())
            .map_err(|e| collaborator_error(e, RigError::Capture))?;
        let transcript = self
            .collaborators
            .transcriber
            .transcribe(&clip)
            .map_err(|e| collaborator_error(e, RigError::Transcription))?
            .map(|t| t.trim().to_string())
            .filter(|t| !t.is_empty())
            .ok_or(RigError::EmptyTranscript)?;
        // Releases any scratch recording
        drop(clip);
        info!("Heard: {:?}", transcript);
        self.state.write().last_transcript = Some(transcript.clone());
        *transcript_out = Some(transcript.clone());
        timer.split(InteractionPhase::Listening.to_string());

        self.enter(InteractionPhase::Thinking);
        let response = self.collaborators.responder.respond(&transcript);
        info!("Replying: {:?}", response);
        self.state.write().last_response = Some(response.clone());
        *response_out = Some(response.clone());
        timer.split(InteractionPhase::Thinking.to_string());

        self.enter(InteractionPhase::Speaking);
        *speech_out = Some(self.speak(&response)?);
        timer.split(InteractionPhase::Speaking.to_string());

        Ok(())
    }

    /// Synthesize `text`, then play it while animating mouth and tail
    ///
    /// Playback and animation run concurrently and are both joined before
    /// returning. A playback failure cancels the animation; an animation
    /// failure is logged and playback is allowed to finish.
    pub fn speak(&self, text: &str) -> Result<SpeechSummary> {
        let clip = self
            .collaborators
            .synthesizer
            .synthesize(text)
            .map_err(|e| collaborator_error(e, RigError::Synthesis))?;

        let (duration, estimated) = match self.collaborators.playback.duration_of(&clip) {
            Some(duration) => (duration, false),
            None => {
                let fallback = self.config.timing.fallback_speech();
                warn!("Speech length unknown, animating for {:?}", fallback);
                (fallback, true)
            }
        };
        debug!("Speaking for {:?}", duration);

        let plan = AnimationPlan::speaking(duration, &self.config);
        let cancel = AtomicBool::new(false);
        let (played, animated) = thread::scope(|s| {
            let player = s.spawn(|| self.play(&clip, &cancel));
            let animated = self.animator.animate_until(&plan, &cancel);
            let played = player
                .join()
                .unwrap_or_else(|_| Err(RigError::Playback("playback thread panicked".into())));
            (played, animated)
        });

        match animated {
            Ok(summary) if summary.cancelled => debug!("Animation cancelled after {} steps", summary.steps),
            Ok(_) => {}
            Err(e) => warn!("Speech animation failed: {}", e),
        }
        played?;

        Ok(SpeechSummary {
            duration,
            estimated,
        })
    }

    fn play(&self, clip: &AudioClip, cancel: &AtomicBool) -> Result<()> {
        let played = self
            .collaborators
            .playback
            .play(clip)
            .map_err(|e| collaborator_error(e, RigError::Playback));
        if played.is_err() {
            cancel.store(true, Ordering::SeqCst);
        }
        played
    }

    pub fn state(&self) -> &SharedRigState {
        &self.state
    }
}
