//! Error types for the rig
//!
//! One enum covers every failure the orchestrator can observe. The variants
//! fall into four groups: sensor reads (ignored), actuator commands (logged),
//! collaborator calls (abort the interaction) and configuration (fatal at
//! startup).

use thiserror::Error;

/// Rig errors
#[derive(Error, Debug, Clone)]
pub enum RigError {
    /// Raw digital input could not be read this poll
    #[error("Sensor read error: {0}")]
    SensorRead(String),

    /// The actuator driver rejected or failed a command
    #[error("Actuator command error: {0}")]
    ActuatorCommand(String),

    /// The port is locked out after an emergency stop
    #[error("Actuators locked out: {0}")]
    ActuatorLockedOut(String),

    /// Audio capture failed
    #[error("Capture error: {0}")]
    Capture(String),

    /// Speech-to-text failed
    #[error("Transcription error: {0}")]
    Transcription(String),

    /// Speech-to-text produced nothing usable
    #[error("No transcript was produced")]
    EmptyTranscript,

    /// Text-to-speech failed
    #[error("Synthesis error: {0}")]
    Synthesis(String),

    /// Audio playback failed
    #[error("Playback error: {0}")]
    Playback(String),

    /// Missing devices, credentials or invalid settings
    #[error("Configuration error: {0}")]
    Config(String),

    /// File system I/O error
    #[error("IO error: {0}")]
    Io(String),

    /// Channel communication error
    #[error("Channel error: {0}")]
    Channel(String),

    /// The phase sequence panicked and was contained
    #[error("Interaction panicked: {0}")]
    InteractionPanicked(String),
}

impl From<std::io::Error> for RigError {
    fn from(e: std::io::Error) -> Self {
        RigError::Io(e.to_string())
    }
}

impl RigError {
    /// Check if this error is recoverable
    ///
    /// Recoverable errors leave the rig able to run the next interaction.
    pub fn is_recoverable(&self) -> bool {
        match self {
            RigError::SensorRead(_) => true,
            RigError::ActuatorCommand(_) => true,
            // Needs an explicit rearm
            RigError::ActuatorLockedOut(_) => false,
            RigError::Capture(_) => true,
            RigError::Transcription(_) => true,
            RigError::EmptyTranscript => true,
            RigError::Synthesis(_) => true,
            RigError::Playback(_) => true,
            RigError::Config(_) => false,
            RigError::Io(_) => false,
            RigError::Channel(_) => false,
            RigError::InteractionPanicked(_) => true,
        }
    }

    /// Whether this error forces the running interaction into `Aborting`
    pub fn aborts_interaction(&self) -> bool {
        matches!(
            self,
            RigError::Capture(_)
                | RigError::Transcription(_)
                | RigError::EmptyTranscript
                | RigError::Synthesis(_)
                | RigError::Playback(_)
        )
    }

    /// Get a user-friendly description of the error
    pub fn user_message(&self) -> String {
        match self {
            RigError::SensorRead(_) => "Button input is flaky. Check the wiring.".to_string(),
            RigError::ActuatorCommand(_) => {
                "A motor did not respond. Check the motor driver.".to_string()
            }
            RigError::ActuatorLockedOut(_) => {
                "Motors are locked out after an emergency stop.".to_string()
            }
            RigError::Capture(_) => "Could not record from the microphone.".to_string(),
            RigError::Transcription(_) | RigError::EmptyTranscript => {
                "Speech recognition failed. Please try again.".to_string()
            }
            RigError::Synthesis(_) => "Could not generate speech.".to_string(),
            RigError::Playback(_) => "Could not play audio. Check the speaker.".to_string(),
            RigError::Config(_) => "Configuration error. Please check settings.".to_string(),
            RigError::Io(_) => "File system error occurred.".to_string(),
            RigError::Channel(_) => {
                "Internal communication error. Please restart the rig.".to_string()
            }
            RigError::InteractionPanicked(_) => "Something went badly wrong mid-chat.".to_string(),
        }
    }
}

/// Result type alias for rig operations
pub type Result<T> = std::result::Result<T, RigError>;
