//! External capabilities consumed by the orchestrator
//!
//! Capture, transcription, response generation, synthesis and playback are
//! all reached through the traits below. The adapters in this module are
//! swappable implementations; the orchestrator never talks to devices,
//! processes or models directly.

pub mod bench;
#[cfg(feature = "audio-io")]
pub mod device;
pub mod process;
pub mod responder;
pub mod wav;

pub use bench::BenchVoice;
#[cfg(feature = "audio-io")]
pub use device::{DeviceCapture, DevicePlayback};
pub use process::{ProcessCapture, ProcessPlayback};
pub use responder::{CompletionBackend, GuardedResponder};

use crate::Result;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempPath;
use uuid::Uuid;

/// Where a clip's audio lives
#[derive(Clone, Debug)]
pub enum ClipData {
    /// Mono samples in memory
    Samples {
        sample_rate: u32,
        samples: Arc<Vec<f32>>,
    },
    /// A WAV file on disk
    File(PathBuf),
    /// No audio, only a label and (maybe) a known length
    Synthetic {
        label: String,
        duration: Option<Duration>,
    },
}

/// Opaque handle to a piece of audio
///
/// A clip made with [`AudioClip::from_scratch`] owns its file, which is
/// deleted once the last clone is dropped.
#[derive(Clone, Debug)]
pub struct AudioClip {
    pub id: Uuid,
    pub data: ClipData,
    scratch: Option<Arc<TempPath>>,
}

impl AudioClip {
    pub fn from_samples(sample_rate: u32, samples: Vec<f32>) -> Self {
        Self {
            id: Uuid::new_v4(),
            data: ClipData::Samples {
                sample_rate,
                samples: Arc::new(samples),
            },
            scratch: None,
        }
    }

    pub fn from_file(path: impl Into<PathBuf>) -> Self {
        Self {
            id: Uuid::new_v4(),
            data: ClipData::File(path.into()),
            scratch: None,
        }
    }

    /// Clip over a scratch file that goes away with the clip
    pub fn from_scratch(path: TempPath) -> Self {
        Self {
            id: Uuid::new_v4(),
            data: ClipData::File(path.to_path_buf()),
            scratch: Some(Arc::new(path)),
        }
    }

    pub fn synthetic(label: impl Into<String>, duration: Option<Duration>) -> Self {
        Self {
            id: Uuid::new_v4(),
            data: ClipData::Synthetic {
                label: label.into(),
                duration,
            },
            scratch: None,
        }
    }

    /// Length of the clip when it can be determined without playing it
    pub fn duration_hint(&self) -> Option<Duration> {
        match &self.data {
            ClipData::Samples {
                sample_rate,
                samples,
            } => {
                if *sample_rate == 0 {
                    return None;
                }
                Some(Duration::from_secs_f64(
                    samples.len() as f64 / *sample_rate as f64,
                ))
            }
            ClipData::File(path) => wav::wav_duration(path).ok(),
            ClipData::Synthetic { duration, .. } => *duration,
        }
    }
}

/// Microphone recording
pub trait AudioCapture: Send + Sync {
    /// Record for at most `max_duration`; may return early on silence
    fn record(&self, max_duration: Duration) -> Result<AudioClip>;
}

/// Speech-to-text
pub trait SpeechToText: Send + Sync {
    /// Transcribe `clip`; `None` when nothing intelligible was said
    fn transcribe(&self, clip: &AudioClip) -> Result<Option<String>>;
}

/// Reply generation
///
/// Infallible by contract: implementations substitute a fallback phrase on
/// their own failures. See [`GuardedResponder`].
pub trait ResponseGenerator: Send + Sync {
    fn respond(&self, text: &str) -> String;
}

/// Text-to-speech
pub trait TextToSpeech: Send + Sync {
    fn synthesize(&self, text: &str) -> Result<AudioClip>;
}

/// Speaker output
pub trait AudioPlayback: Send + Sync {
    /// Play `clip`, returning once it has finished
    fn play(&self, clip: &AudioClip) -> Result<()>;

    /// Length of `clip`, if known before playing
    fn duration_of(&self, clip: &AudioClip) -> Option<Duration> {
        clip.duration_hint()
    }
}

/// The full set of capabilities one interaction needs
#[derive(Clone)]
pub struct Collaborators {
    pub capture: Arc<dyn AudioCapture>,
    pub transcriber: Arc<dyn SpeechToText>,
    pub responder: Arc<dyn ResponseGenerator>,
    pub synthesizer: Arc<dyn TextToSpeech>,
    pub playback: Arc<dyn AudioPlayback>,
}

impl Collaborators {
    /// Use one object for every capability, with replies coming from its
    /// completion backend behind a [`GuardedResponder`]
    pub fn guarded<T>(voice: Arc<T>, fallback: impl Into<String>) -> Self
    where
        T: AudioCapture + SpeechToText + CompletionBackend + TextToSpeech + AudioPlayback + 'static,
    {
        Self {
            capture: voice.clone(),
            transcriber: voice.clone(),
            responder: Arc::new(GuardedResponder::new(voice.clone(), fallback)),
            synthesizer: voice.clone(),
            playback: voice,
        }
    }
}
