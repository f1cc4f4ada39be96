//! Scripted voice for running the rig without audio hardware or models

use super::{
    AudioCapture, AudioClip, AudioPlayback, ClipData, CompletionBackend, SpeechToText,
    TextToSpeech,
};
use crate::utils::Clock;
use crate::Result;
use parking_lot::Mutex;
use std::sync::Arc;
use std::time::Duration;
use tracing::info;

const JOKES: &[&str] = &[
    "Why did the fish blush? It saw the ocean's bottom!",
    "What do you call a fish with no eyes? A fsh.",
    "Why are fish so smart? They live in schools.",
];

/// Pretends to hear, think and speak
///
/// Capture takes a fixed listening time, every recording transcribes to the
/// same prompt, replies cycle through a joke list, and synthesized speech
/// lasts a fixed time per word. With a tone rate set, synthesis produces a
/// beep of that length instead of a silent clip, so real playback adapters
/// have something to play.
pub struct BenchVoice {
    clock: Arc<dyn Clock>,
    listen: Duration,
    prompt: String,
    per_word: Duration,
    tone_rate: Option<u32>,
    next_joke: Mutex<usize>,
}

const TONE_HZ: f32 = 330.0;
const TONE_LEVEL: f32 = 0.2;

fn tone(sample_rate: u32, duration: Duration) -> Vec<f32> {
    let count = (duration.as_secs_f64() * sample_rate as f64).round() as usize;
    (0..count)
        .map(|i| {
            let t = i as f32 / sample_rate as f32;
            (2.0 * std::f32::consts::PI * TONE_HZ * t).sin() * TONE_LEVEL
        })
        .collect()
}

impl BenchVoice {
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self {
            clock,
            listen: Duration::from_millis(1500),
            prompt: "tell me a joke".to_string(),
            per_word: Duration::from_millis(350),
            tone_rate: None,
            next_joke: Mutex::new(0),
        }
    }

    /// What every recording transcribes to
    pub fn with_prompt(mut self, prompt: impl Into<String>) -> Self {
        self.prompt = prompt.into();
        self
    }

    pub fn with_listen_time(mut self, listen: Duration) -> Self {
        self.listen = listen;
        self
    }

    /// Speaking time per synthesized word
    pub fn with_word_time(mut self, per_word: Duration) -> Self {
        self.per_word = per_word;
        self
    }

    /// Synthesize audible beeps at `sample_rate`
    pub fn with_tone(mut self, sample_rate: u32) -> Self {
        self.tone_rate = Some(sample_rate);
        self
    }
}

impl AudioCapture for BenchVoice {
    fn record(&self, max_duration: Duration) -> Result<AudioClip> {
        let listened = self.listen.min(max_duration);
        self.clock.sleep(listened);
        Ok(AudioClip::synthetic(self.prompt.clone(), Some(listened)))
    }
}

impl SpeechToText for BenchVoice {
    fn transcribe(&self, clip: &AudioClip) -> Result<Option<String>> {
        match &clip.data {
            ClipData::Synthetic { label, .. } if !label.trim().is_empty() => {
                Ok(Some(label.clone()))
            }
            ClipData::Synthetic { .. } => Ok(None),
            ClipData::Samples { samples, .. } if samples.is_empty() => Ok(None),
            // Real audio: pretend it said the prompt
            _ => Ok(Some(self.prompt.clone())),
        }
    }
}

impl CompletionBackend for BenchVoice {
    fn complete(&self, _prompt: &str) -> Result<String> {
        let mut next = self.next_joke.lock();
        let joke = JOKES[*next % JOKES.len()];
        *next += 1;
        Ok(joke.to_string())
    }
}

impl TextToSpeech for BenchVoice {
    fn synthesize(&self, text: &str) -> Result<AudioClip> {
        let words = text.split_whitespace().count() as u32;
        let duration = self.per_word * words.max(1);
        Ok(match self.tone_rate {
            Some(rate) => AudioClip::from_samples(rate, tone(rate, duration)),
            None => AudioClip::synthetic(text, Some(duration)),
        })
    }
}

impl AudioPlayback for BenchVoice {
    fn play(&self, clip: &AudioClip) -> Result<()> {
        let duration = clip.duration_hint().unwrap_or_default();
        if let ClipData::Synthetic { label, .. } = &clip.data {
            info!("(speaking) {}", label);
        }
        self.clock.sleep(duration);
        Ok(())
    }
}
