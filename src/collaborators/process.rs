//! Capture and playback by spawning external programs
//!
//! Reference setup is ALSA's `arecord`/`aplay`. Command lines come from
//! configuration; `{path}` is replaced by the clip path and `{seconds}` by
//! the recording limit in whole seconds.

use super::wav::write_wav;
use super::{AudioCapture, AudioClip, AudioPlayback, ClipData};
use crate::{Result, RigError};
use std::path::{Path, PathBuf};
use std::process::Command;
use std::time::Duration;
use tempfile::TempPath;
use tracing::{debug, info};

fn render(template: &[String], path: &Path, seconds: u64) -> Result<Command> {
    let (program, args) = template
        .split_first()
        .ok_or_else(|| RigError::Config("empty command line".into()))?;
    let path = path.to_string_lossy();
    let seconds = seconds.to_string();

    let mut command = Command::new(program);
    for arg in args {
        command.arg(arg.replace("{path}", &path).replace("{seconds}", &seconds));
    }
    Ok(command)
}

/// Empty WAV path in `dir`, removed when the returned handle drops
fn scratch_file(dir: &Path, prefix: &str) -> std::io::Result<TempPath> {
    std::fs::create_dir_all(dir)?;
    Ok(tempfile::Builder::new()
        .prefix(prefix)
        .suffix(".wav")
        .tempfile_in(dir)?
        .into_temp_path())
}

fn run(mut command: Command, what: &str) -> std::result::Result<(), String> {
    debug!("Running {:?}", command);
    let status = command
        .status()
        .map_err(|e| format!("failed to start {}: {}", what, e))?;
    if status.success() {
        Ok(())
    } else {
        Err(format!("{} exited with {}", what, status))
    }
}

/// Records by running an external program that writes a WAV file
pub struct ProcessCapture {
    command: Vec<String>,
    scratch_dir: PathBuf,
}

impl ProcessCapture {
    pub fn new(command: Vec<String>, scratch_dir: impl Into<PathBuf>) -> Self {
        Self {
            command,
            scratch_dir: scratch_dir.into(),
        }
    }
}

impl AudioCapture for ProcessCapture {
    fn record(&self, max_duration: Duration) -> Result<AudioClip> {
        let path = scratch_file(&self.scratch_dir, "capture-")
            .map_err(|e| RigError::Capture(format!("scratch dir unavailable: {}", e)))?;
        let seconds = max_duration.as_secs_f64().ceil().max(1.0) as u64;

        let command = render(&self.command, &path, seconds)?;
        run(command, "recorder").map_err(RigError::Capture)?;

        let written = std::fs::metadata(&path).map(|m| m.len()).unwrap_or(0);
        if written == 0 {
            return Err(RigError::Capture(format!(
                "recorder wrote nothing to {}",
                path.display()
            )));
        }
        info!("Captured audio to {}", path.display());
        Ok(AudioClip::from_scratch(path))
    }
}

/// Plays by running an external program on a WAV file
pub struct ProcessPlayback {
    command: Vec<String>,
    scratch_dir: PathBuf,
}

impl ProcessPlayback {
    pub fn new(command: Vec<String>, scratch_dir: impl Into<PathBuf>) -> Self {
        Self {
            command,
            scratch_dir: scratch_dir.into(),
        }
    }

    /// Path the player should open, plus the scratch file backing it if
    /// the clip had to be written out first
    fn file_for(&self, clip: &AudioClip) -> Result<(PathBuf, Option<TempPath>)> {
        match &clip.data {
            ClipData::File(path) => Ok((path.clone(), None)),
            ClipData::Samples {
                sample_rate,
                samples,
            } => {
                let scratch = scratch_file(&self.scratch_dir, "speech-")
                    .map_err(|e| RigError::Playback(format!("scratch dir unavailable: {}", e)))?;
                write_wav(&scratch, samples, *sample_rate)
                    .map_err(|e| RigError::Playback(e.to_string()))?;
                Ok((scratch.to_path_buf(), Some(scratch)))
            }
            ClipData::Synthetic { label, .. } => Err(RigError::Playback(format!(
                "clip '{}' has no audio to play",
                label
            ))),
        }
    }
}

impl AudioPlayback for ProcessPlayback {
    fn play(&self, clip: &AudioClip) -> Result<()> {
        // Any written scratch file is removed when `_scratch` drops, pass or fail
        let (path, _scratch) = self.file_for(clip)?;
        let command = render(&self.command, &path, 0)?;
        run(command, "player").map_err(RigError::Playback)
    }
}
