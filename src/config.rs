//! Configuration for the rig
//!
//! Provides centralized configuration for the button, the actuators, the
//! phase timings and the spoken phrases. Loaded from TOML; every section and
//! field falls back to the reference values when omitted.

use crate::actuator::{Actuator, HoldPolicy, Intensity};
use crate::sensor::Polarity;
use crate::{Result, RigError};
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::info;

/// Button sampling and debounce settings
#[derive(Clone, Debug, Deserialize, PartialEq)]
#[serde(default)]
pub struct ButtonConfig {
    /// Interval between raw input reads
    pub poll_interval_ms: u64,
    /// Minimum time after an activation before another can fire
    pub debounce_ms: u64,
    /// Which raw level counts as pressed
    pub polarity: Polarity,
}

impl Default for ButtonConfig {
    fn default() -> Self {
        Self {
            poll_interval_ms: 100,
            debounce_ms: 200,
            polarity: Polarity::ActiveLow,
        }
    }
}

/// Per-actuator drive strength and the body hold policy
#[derive(Clone, Debug, Deserialize, PartialEq)]
#[serde(default)]
pub struct ActuatorConfig {
    pub body_intensity: i32,
    pub mouth_intensity: i32,
    pub tail_intensity: i32,
    /// How the body holds its turned position
    pub hold: HoldPolicy,
}

impl Default for ActuatorConfig {
    fn default() -> Self {
        Self {
            body_intensity: 100,
            mouth_intensity: 100,
            tail_intensity: 100,
            hold: HoldPolicy::Brake,
        }
    }
}

impl ActuatorConfig {
    /// Configured intensity for one actuator, clamped
    pub fn intensity(&self, actuator: Actuator) -> Intensity {
        let raw = match actuator {
            Actuator::Body => self.body_intensity,
            Actuator::Mouth => self.mouth_intensity,
            Actuator::Tail => self.tail_intensity,
        };
        Intensity::clamped(raw)
    }
}

/// Fixed phase durations
#[derive(Clone, Debug, Deserialize, PartialEq)]
#[serde(default)]
pub struct TimingConfig {
    /// Body drive time when turning out and back
    pub turn_ms: u64,
    /// Upper bound handed to the capture collaborator
    pub max_listen_ms: u64,
    /// Base interval between animation updates
    pub animation_step_ms: u64,
    /// Random extra added to each animation step, at most this much
    pub animation_jitter_ms: u64,
    /// Speech length assumed when playback cannot report one
    pub fallback_speech_ms: u64,
}

impl Default for TimingConfig {
    fn default() -> Self {
        Self {
            turn_ms: 500,
            max_listen_ms: 5000,
            animation_step_ms: 150,
            animation_jitter_ms: 100,
            fallback_speech_ms: 3000,
        }
    }
}

impl TimingConfig {
    pub fn turn(&self) -> Duration {
        Duration::from_millis(self.turn_ms)
    }

    pub fn max_listen(&self) -> Duration {
        Duration::from_millis(self.max_listen_ms)
    }

    pub fn animation_step(&self) -> Duration {
        Duration::from_millis(self.animation_step_ms)
    }

    pub fn animation_jitter(&self) -> Duration {
        Duration::from_millis(self.animation_jitter_ms)
    }

    pub fn fallback_speech(&self) -> Duration {
        Duration::from_millis(self.fallback_speech_ms)
    }
}

/// Fixed phrases
#[derive(Clone, Debug, Deserialize, PartialEq)]
#[serde(default)]
pub struct PhraseConfig {
    /// Spoken in place of a response when an interaction aborts
    pub apology: String,
    /// Returned by the guarded responder when its backend fails
    pub fallback_response: String,
}

impl Default for PhraseConfig {
    fn default() -> Self {
        Self {
            apology: "Sorry, I didn't catch that. Could you press my button and try again?"
                .to_string(),
            fallback_response: "Blub. My brain is a little waterlogged right now.".to_string(),
        }
    }
}

/// Which audio adapters the binary wires in
#[derive(Clone, Copy, Debug, Default, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum AudioMode {
    /// Scripted voice, no audio hardware
    #[default]
    Bench,
    /// Spawn external record/play programs
    Process,
    /// Use the cpal/rodio device adapters
    Device,
}

/// Audio adapter settings (outside the core)
#[derive(Clone, Debug, Deserialize, PartialEq)]
#[serde(default)]
pub struct AudioConfig {
    pub mode: AudioMode,
    /// Recording program and its arguments; `{seconds}` and `{path}` are substituted
    pub record_command: Vec<String>,
    /// Playback program and its arguments; `{path}` is substituted
    pub play_command: Vec<String>,
    /// Where captured and synthesized clips are written
    pub scratch_dir: PathBuf,
    pub sample_rate: u32,
}

impl Default for AudioConfig {
    fn default() -> Self {
        Self {
            mode: AudioMode::Bench,
            record_command: vec![
                "arecord".into(),
                "-q".into(),
                "-f".into(),
                "S16_LE".into(),
                "-r".into(),
                "16000".into(),
                "-c".into(),
                "1".into(),
                "-d".into(),
                "{seconds}".into(),
                "{path}".into(),
            ],
            play_command: vec!["aplay".into(), "-q".into(), "{path}".into()],
            scratch_dir: std::env::temp_dir().join("billy"),
            sample_rate: 16000,
        }
    }
}

/// Configuration for the complete rig
#[derive(Clone, Debug, Default, Deserialize, PartialEq)]
#[serde(default)]
pub struct RigConfig {
    pub button: ButtonConfig,
    pub actuators: ActuatorConfig,
    pub timing: TimingConfig,
    pub phrases: PhraseConfig,
    pub audio: AudioConfig,
}

impl RigConfig {
    /// Create a new configuration with reference values
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse a configuration from TOML text
    pub fn from_toml_str(content: &str) -> Result<Self> {
        toml::from_str(content).map_err(|e| RigError::Config(format!("Invalid config: {}", e)))
    }

    /// Load a configuration from a TOML file
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path).map_err(|e| {
            RigError::Config(format!("Failed to read {}: {}", path.display(), e))
        })?;
        let config = Self::from_toml_str(&content)?;
        info!("Loaded configuration from {}", path.display());
        Ok(config)
    }

    /// Default config file location (`<config dir>/billy/config.toml`)
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join("billy").join("config.toml"))
    }

    /// Load the default config file, or reference values when it does not exist
    pub fn load_default() -> Result<Self> {
        match Self::default_path() {
            Some(path) if path.exists() => Self::load(path),
            _ => {
                info!("No config file found, using defaults");
                Ok(Self::default())
            }
        }
    }

    /// Set the button polling interval and debounce window
    pub fn with_button_timing(mut self, poll_interval_ms: u64, debounce_ms: u64) -> Self {
        self.button.poll_interval_ms = poll_interval_ms;
        self.button.debounce_ms = debounce_ms;
        self
    }

    /// Set the button polarity
    pub fn with_polarity(mut self, polarity: Polarity) -> Self {
        self.button.polarity = polarity;
        self
    }

    /// Set the phase timings
    pub fn with_timing(mut self, timing: TimingConfig) -> Self {
        self.timing = timing;
        self
    }

    /// Set the body hold policy
    pub fn with_hold(mut self, hold: HoldPolicy) -> Self {
        self.actuators.hold = hold;
        self
    }

    /// Set the apology phrase
    pub fn with_apology(mut self, apology: impl Into<String>) -> Self {
        self.phrases.apology = apology.into();
        self
    }

    /// Set what is said when no reply can be generated
    pub fn with_fallback_response(mut self, fallback: impl Into<String>) -> Self {
        self.phrases.fallback_response = fallback.into();
        self
    }

    /// Select the audio adapters
    pub fn with_audio_mode(mut self, mode: AudioMode) -> Self {
        self.audio.mode = mode;
        self
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.button.poll_interval_ms)
    }

    pub fn debounce(&self) -> Duration {
        Duration::from_millis(self.button.debounce_ms)
    }

    /// Validate the configuration
    ///
    /// Only called at startup; a failure here means no interaction may begin.
    pub fn validate(&self) -> Result<()> {
        if self.button.poll_interval_ms == 0 {
            return Err(RigError::Config("button.poll_interval_ms must be > 0".into()));
        }
        if self.timing.animation_step_ms == 0 {
            return Err(RigError::Config("timing.animation_step_ms must be > 0".into()));
        }
        if self.timing.max_listen_ms == 0 {
            return Err(RigError::Config("timing.max_listen_ms must be > 0".into()));
        }
        if self.phrases.apology.trim().is_empty() {
            return Err(RigError::Config("phrases.apology must not be empty".into()));
        }
        if self.phrases.fallback_response.trim().is_empty() {
            return Err(RigError::Config("phrases.fallback_response must not be empty".into()));
        }

        if self.audio.mode == AudioMode::Process {
            if self.audio.record_command.is_empty() {
                return Err(RigError::Config("audio.record_command is required".into()));
            }
            if self.audio.play_command.is_empty() {
                return Err(RigError::Config("audio.play_command is required".into()));
            }
        }
        if self.audio.mode == AudioMode::Device && !cfg!(feature = "audio-io") {
            return Err(RigError::Config(
                "audio.mode = \"device\" requires the audio-io feature".into(),
            ));
        }

        Ok(())
    }
}
