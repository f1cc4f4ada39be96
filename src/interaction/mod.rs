pub mod orchestrator;
pub mod session;
pub mod state;

pub use orchestrator::{
    ActivationOutcome, Orchestrator, OrchestratorHandle, RigCommand, RigEvent, SpeechSummary,
};
pub use session::{InteractionSession, SessionGate};
pub use state::{
    InteractionOutcome, InteractionPhase, InteractionReport, RigSnapshot, RigState, SharedRigState,
};
