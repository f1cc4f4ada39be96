//! Shared fakes for the integration tests

#![allow(dead_code)]

use billy::actuator::{Actuator, ActuatorDriver, ActuatorPort, Direction, DriverCommand, Intensity, SimulatedDriver};
use billy::animation::RngSource;
use billy::collaborators::{
    AudioCapture, AudioClip, AudioPlayback, Collaborators, CompletionBackend, SpeechToText,
    TextToSpeech,
};
use billy::config::{RigConfig, TimingConfig};
use billy::interaction::{Orchestrator, OrchestratorHandle};
use billy::sensor::{Activation, DigitalInputSource};
use billy::utils::{Clock, SystemClock};
use billy::{Result, RigError};
use parking_lot::Mutex;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

pub const JOKE: &str = "Why did the fish blush? It saw the ocean's bottom!";
pub const APOLOGY: &str = "Sorry, say that again?";
pub const FALLBACK: &str = "Blub. Ask me later.";

/// Short phase timings so real-time scenarios finish quickly
pub fn quick_config() -> RigConfig {
    RigConfig::default()
        .with_apology(APOLOGY)
        .with_fallback_response(FALLBACK)
        .with_timing(TimingConfig {
            turn_ms: 20,
            max_listen_ms: 100,
            animation_step_ms: 20,
            animation_jitter_ms: 10,
            fallback_speech_ms: 120,
        })
}

/// Where a [`ScriptedVoice`] misbehaves
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Fault {
    None,
    CaptureFails,
    TranscriptionFails,
    NoTranscript,
    SynthesisFails,
    PlaybackFails,
    UnknownDuration,
    BackendFails,
    RespondPanics,
}

impl Fault {
    pub const ALL: [Fault; 9] = [
        Fault::None,
        Fault::CaptureFails,
        Fault::TranscriptionFails,
        Fault::NoTranscript,
        Fault::SynthesisFails,
        Fault::PlaybackFails,
        Fault::UnknownDuration,
        Fault::BackendFails,
        Fault::RespondPanics,
    ];
}

#[derive(Debug, Default)]
pub struct CallCounts {
    pub record: AtomicUsize,
    pub transcribe: AtomicUsize,
    pub respond: AtomicUsize,
    pub synthesize: AtomicUsize,
    pub play: AtomicUsize,
}

impl CallCounts {
    pub fn get(counter: &AtomicUsize) -> usize {
        counter.load(Ordering::SeqCst)
    }
}

/// Fault-injecting stand-in for every voice collaborator
pub struct ScriptedVoice {
    clock: Arc<dyn Clock>,
    transcript: String,
    response: String,
    speech: Duration,
    listen: Duration,
    fault: Fault,
    pub calls: CallCounts,
    spoken: Mutex<Vec<String>>,
    /// (start, end) clock readings of each playback
    played: Mutex<Vec<(Duration, Duration)>>,
}

impl ScriptedVoice {
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self {
            clock,
            transcript: "tell me a joke".to_string(),
            response: JOKE.to_string(),
            speech: Duration::from_millis(200),
            listen: Duration::from_millis(10),
            fault: Fault::None,
            calls: CallCounts::default(),
            spoken: Mutex::new(Vec::new()),
            played: Mutex::new(Vec::new()),
        }
    }

    /// Length of every synthesized clip
    pub fn with_speech(mut self, speech: Duration) -> Self {
        self.speech = speech;
        self
    }

    pub fn with_fault(mut self, fault: Fault) -> Self {
        self.fault = fault;
        self
    }

    /// Texts handed to synthesis, in order
    pub fn spoken(&self) -> Vec<String> {
        self.spoken.lock().clone()
    }

    pub fn playbacks(&self) -> Vec<(Duration, Duration)> {
        self.played.lock().clone()
    }
}

impl AudioCapture for ScriptedVoice {
    fn record(&self, max_duration: Duration) -> Result<AudioClip> {
        self.calls.record.fetch_add(1, Ordering::SeqCst);
        if self.fault == Fault::CaptureFails {
            return Err(RigError::Capture("microphone unplugged".into()));
        }
        let listened = self.listen.min(max_duration);
        self.clock.sleep(listened);
        Ok(AudioClip::synthetic("recording", Some(listened)))
    }
}

impl SpeechToText for ScriptedVoice {
    fn transcribe(&self, _clip: &AudioClip) -> Result<Option<String>> {
        self.calls.transcribe.fetch_add(1, Ordering::SeqCst);
        match self.fault {
            Fault::TranscriptionFails => Err(RigError::Io("model file missing".into())),
            Fault::NoTranscript => Ok(None),
            _ => Ok(Some(self.transcript.clone())),
        }
    }
}

impl CompletionBackend for ScriptedVoice {
    fn complete(&self, _prompt: &str) -> Result<String> {
        self.calls.respond.fetch_add(1, Ordering::SeqCst);
        match self.fault {
            Fault::RespondPanics => panic!("response generator exploded"),
            Fault::BackendFails => Err(RigError::Io("completion server unreachable".into())),
            _ => Ok(self.response.clone()),
        }
    }
}

impl TextToSpeech for ScriptedVoice {
    fn synthesize(&self, text: &str) -> Result<AudioClip> {
        self.calls.synthesize.fetch_add(1, Ordering::SeqCst);
        self.spoken.lock().push(text.to_string());
        if self.fault == Fault::SynthesisFails {
            return Err(RigError::Synthesis("voice model unavailable".into()));
        }
        Ok(AudioClip::synthetic(text, Some(self.speech)))
    }
}

impl AudioPlayback for ScriptedVoice {
    fn play(&self, clip: &AudioClip) -> Result<()> {
        self.calls.play.fetch_add(1, Ordering::SeqCst);
        if self.fault == Fault::PlaybackFails {
            self.clock.sleep(Duration::from_millis(5));
            return Err(RigError::Playback("speaker disconnected".into()));
        }
        let start = self.clock.now();
        self.clock.sleep(clip.duration_hint().unwrap_or_default());
        self.played.lock().push((start, self.clock.now()));
        Ok(())
    }

    fn duration_of(&self, clip: &AudioClip) -> Option<Duration> {
        if self.fault == Fault::UnknownDuration {
            return None;
        }
        clip.duration_hint()
    }
}

/// Driver that fails every `n`th command after initialization
pub struct FlakyDriver {
    inner: SimulatedDriver,
    every: usize,
    count: AtomicUsize,
}

impl FlakyDriver {
    pub fn new(every: usize) -> Self {
        Self {
            inner: SimulatedDriver::new(),
            every: every.max(1),
            count: AtomicUsize::new(0),
        }
    }

    pub fn history(&self) -> Vec<DriverCommand> {
        self.inner.history()
    }

    fn trip(&self) -> Result<()> {
        let n = self.count.fetch_add(1, Ordering::SeqCst) + 1;
        if n % self.every == 0 {
            return Err(RigError::ActuatorCommand(format!("bus glitch on command {}", n)));
        }
        Ok(())
    }
}

impl ActuatorDriver for FlakyDriver {
    fn set(&self, actuator: Actuator, direction: Direction, intensity: Intensity) -> Result<()> {
        self.trip()?;
        self.inner.set(actuator, direction, intensity)
    }

    fn brake(&self, actuator: Actuator) -> Result<()> {
        self.trip()?;
        self.inner.brake(actuator)
    }

    // Releases always succeed so cleanup can be checked
    fn release(&self, actuator: Actuator) -> Result<()> {
        self.inner.release(actuator)
    }
}

/// Driver whose motion commands to the given actuators always fail
pub struct BrokenDriver {
    inner: SimulatedDriver,
    broken: Vec<Actuator>,
}

impl BrokenDriver {
    pub fn new(broken: &[Actuator]) -> Self {
        Self {
            inner: SimulatedDriver::new(),
            broken: broken.to_vec(),
        }
    }

    pub fn history(&self) -> Vec<DriverCommand> {
        self.inner.history()
    }

    fn check(&self, actuator: Actuator) -> Result<()> {
        if self.broken.contains(&actuator) {
            return Err(RigError::ActuatorCommand(format!("{:?} motor stalled", actuator)));
        }
        Ok(())
    }
}

impl ActuatorDriver for BrokenDriver {
    fn set(&self, actuator: Actuator, direction: Direction, intensity: Intensity) -> Result<()> {
        self.check(actuator)?;
        self.inner.set(actuator, direction, intensity)
    }

    fn brake(&self, actuator: Actuator) -> Result<()> {
        self.check(actuator)?;
        self.inner.brake(actuator)
    }

    fn release(&self, actuator: Actuator) -> Result<()> {
        self.inner.release(actuator)
    }
}

/// Raw input levels played back one per read; the last level repeats
pub struct ScriptedInput {
    levels: Mutex<VecDeque<Result<bool>>>,
    last: Mutex<bool>,
}

impl ScriptedInput {
    pub fn new(levels: Vec<Result<bool>>) -> Self {
        Self {
            levels: Mutex::new(levels.into()),
            last: Mutex::new(true),
        }
    }
}

impl DigitalInputSource for ScriptedInput {
    fn read(&self) -> Result<bool> {
        match self.levels.lock().pop_front() {
            Some(Ok(level)) => {
                *self.last.lock() = level;
                Ok(level)
            }
            Some(Err(e)) => Err(e),
            None => Ok(*self.last.lock()),
        }
    }
}

/// Every capability from `voice`, replies guarded by the configured fallback
pub fn collaborators(config: &RigConfig, voice: Arc<ScriptedVoice>) -> Collaborators {
    Collaborators::guarded(voice, config.phrases.fallback_response.clone())
}

/// Orchestrator over `driver` and `voice` on the system clock
pub fn orchestrator_with(
    config: RigConfig,
    driver: Arc<dyn ActuatorDriver>,
    voice: Arc<ScriptedVoice>,
    clock: Arc<dyn Clock>,
) -> (Orchestrator, OrchestratorHandle) {
    let port = Arc::new(ActuatorPort::new(driver));
    let collaborators = collaborators(&config, voice);
    Orchestrator::new(
        config,
        port,
        collaborators,
        clock,
        Box::new(RngSource::seeded(42)),
    )
}

pub struct Bench {
    pub driver: Arc<SimulatedDriver>,
    pub voice: Arc<ScriptedVoice>,
    pub orchestrator: Orchestrator,
    pub handle: OrchestratorHandle,
}

/// Simulated driver plus a scripted voice on the system clock
pub fn bench(config: RigConfig, voice: impl FnOnce(Arc<dyn Clock>) -> ScriptedVoice) -> Bench {
    let clock = SystemClock::shared();
    let driver = Arc::new(SimulatedDriver::new());
    let voice = Arc::new(voice(Arc::clone(&clock)));
    let (orchestrator, handle) =
        orchestrator_with(config, driver.clone(), Arc::clone(&voice), clock);
    Bench {
        driver,
        voice,
        orchestrator,
        handle,
    }
}

pub fn press(sequence: u64) -> Activation {
    Activation {
        at: Duration::ZERO,
        sequence,
    }
}

/// Directions commanded to `actuator`, in order
pub fn directions(history: &[DriverCommand], actuator: Actuator) -> Vec<Direction> {
    history
        .iter()
        .filter_map(|c| match c {
            DriverCommand::Set(a, d, _) if *a == actuator => Some(*d),
            _ => None,
        })
        .collect()
}
