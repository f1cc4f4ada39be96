//! Sound card capture and playback through cpal and rodio
//!
//! Streams are opened per call and dropped before returning, so the adapters
//! themselves hold no device handles and are freely shareable.

use super::{AudioCapture, AudioClip, AudioPlayback, ClipData};
use crate::{Result, RigError};
use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use cpal::StreamConfig;
use parking_lot::Mutex;
use std::fs::File;
use std::io::BufReader;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error, info};

/// Records from the default input device for the full listening window
#[derive(Debug, Default)]
pub struct DeviceCapture;

impl DeviceCapture {
    pub fn new() -> Self {
        Self
    }
}

impl AudioCapture for DeviceCapture {
    fn record(&self, max_duration: Duration) -> Result<AudioClip> {
        let host = cpal::default_host();
        let device = host
            .default_input_device()
            .ok_or_else(|| RigError::Capture("No input device available".into()))?;

        info!(
            "Recording from {}",
            device.name().unwrap_or_else(|_| "Unknown".to_string())
        );

        let config: StreamConfig = device
            .default_input_config()
            .map_err(|e| RigError::Capture(format!("Failed to get input config: {}", e)))?
            .into();
        let channels = config.channels as usize;
        let sample_rate = config.sample_rate.0;

        let buffer = Arc::new(Mutex::new(Vec::<f32>::new()));
        let sink = Arc::clone(&buffer);

        let stream = device
            .build_input_stream(
                &config,
                move |data: &[f32], _: &cpal::InputCallbackInfo| {
                    let mut buf = sink.lock();
                    if channels == 1 {
                        buf.extend_from_slice(data);
                    } else {
                        // Average all channels to mono
                        buf.extend(
                            data.chunks(channels)
                                .map(|frame| frame.iter().sum::<f32>() / channels as f32),
                        );
                    }
                },
                |err| error!("Audio input stream error: {}", err),
                None,
            )
            .map_err(|e| RigError::Capture(format!("Failed to build input stream: {}", e)))?;

        stream
            .play()
            .map_err(|e| RigError::Capture(format!("Failed to start input stream: {}", e)))?;
        std::thread::sleep(max_duration);
        drop(stream);

        let samples = std::mem::take(&mut *buffer.lock());
        debug!("Captured {} samples at {} Hz", samples.len(), sample_rate);
        Ok(AudioClip::from_samples(sample_rate, samples))
    }
}

/// Plays through the default output device
#[derive(Debug, Default)]
pub struct DevicePlayback;

impl DevicePlayback {
    pub fn new() -> Self {
        Self
    }
}

impl AudioPlayback for DevicePlayback {
    fn play(&self, clip: &AudioClip) -> Result<()> {
        let (_stream, handle) = rodio::OutputStream::try_default()
            .map_err(|e| RigError::Playback(format!("No output device: {}", e)))?;
        let sink = rodio::Sink::try_new(&handle)
            .map_err(|e| RigError::Playback(format!("Failed to open sink: {}", e)))?;

        match &clip.data {
            ClipData::Samples {
                sample_rate,
                samples,
            } => {
                sink.append(rodio::buffer::SamplesBuffer::new(
                    1,
                    *sample_rate,
                    samples.as_ref().clone(),
                ));
            }
            ClipData::File(path) => {
                let file = File::open(path)
                    .map_err(|e| RigError::Playback(format!("{}: {}", path.display(), e)))?;
                let source = rodio::Decoder::new(BufReader::new(file))
                    .map_err(|e| RigError::Playback(format!("Failed to decode: {}", e)))?;
                sink.append(source);
            }
            ClipData::Synthetic { label, .. } => {
                return Err(RigError::Playback(format!(
                    "clip '{}' has no audio to play",
                    label
                )));
            }
        }

        sink.sleep_until_end();
        Ok(())
    }
}
