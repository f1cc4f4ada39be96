//! WAV file helpers

use crate::{Result, RigError};
use hound::{SampleFormat, WavReader, WavSpec, WavWriter};
use std::path::Path;
use std::time::Duration;
use tracing::debug;

/// Write mono f32 samples (range -1.0 to 1.0) as 16-bit PCM
pub fn write_wav<P: AsRef<Path>>(path: P, samples: &[f32], sample_rate: u32) -> Result<()> {
    let spec = WavSpec {
        channels: 1,
        sample_rate,
        bits_per_sample: 16,
        sample_format: SampleFormat::Int,
    };

    let mut writer = WavWriter::create(path.as_ref(), spec)
        .map_err(|e| RigError::Io(format!("Failed to create WAV writer: {}", e)))?;

    for &sample in samples {
        let sample_i16 = (sample.clamp(-1.0, 1.0) * i16::MAX as f32) as i16;
        writer
            .write_sample(sample_i16)
            .map_err(|e| RigError::Io(format!("Failed to write sample: {}", e)))?;
    }

    writer
        .finalize()
        .map_err(|e| RigError::Io(format!("Failed to finalize WAV file: {}", e)))?;

    debug!("Wrote {} samples to {:?}", samples.len(), path.as_ref());
    Ok(())
}

/// Playing time of a WAV file, read from its header
pub fn wav_duration<P: AsRef<Path>>(path: P) -> Result<Duration> {
    let reader = WavReader::open(path.as_ref())
        .map_err(|e| RigError::Io(format!("Failed to open WAV file: {}", e)))?;
    let spec = reader.spec();
    if spec.sample_rate == 0 {
        return Err(RigError::Io("WAV header has a zero sample rate".into()));
    }
    // `duration` counts frames, not interleaved samples
    let frames = reader.duration() as f64;
    Ok(Duration::from_secs_f64(frames / spec.sample_rate as f64))
}
