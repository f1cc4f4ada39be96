//! Keyboard stand-in for the physical button
//!
//! Each line read from the input pulls the line low (pressed) for a short
//! hold time, then releases it. Used on a bench without GPIO.

use super::DigitalInputSource;
use crate::{Result, RigError};
use std::io::BufRead;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;
use tracing::{debug, info};

/// Active-low button driven by lines of text
pub struct StdinButton {
    level: Arc<AtomicBool>,
    presses: Arc<AtomicU64>,
    closed: Arc<AtomicBool>,
}

impl StdinButton {
    /// Read lines from stdin on a background thread
    pub fn spawn(hold: Duration) -> Result<Self> {
        Self::spawn_reader(std::io::BufReader::new(std::io::stdin()), hold)
    }

    /// Read lines from any reader on a background thread
    pub fn spawn_reader<R>(reader: R, hold: Duration) -> Result<Self>
    where
        R: BufRead + Send + 'static,
    {
        let level = Arc::new(AtomicBool::new(true));
        let presses = Arc::new(AtomicU64::new(0));
        let closed = Arc::new(AtomicBool::new(false));

        let (thread_level, thread_presses, thread_closed) =
            (Arc::clone(&level), Arc::clone(&presses), Arc::clone(&closed));
        thread::Builder::new()
            .name("stdin-button".into())
            .spawn(move || {
                for line in reader.lines() {
                    if line.is_err() {
                        break;
                    }
                    let n = thread_presses.fetch_add(1, Ordering::SeqCst) + 1;
                    debug!("Simulated press #{}", n);
                    thread_level.store(false, Ordering::SeqCst);
                    thread::sleep(hold);
                    thread_level.store(true, Ordering::SeqCst);
                }
                info!("Button input closed");
                thread_closed.store(true, Ordering::SeqCst);
            })
            .map_err(|e| RigError::Io(format!("Failed to spawn stdin reader: {}", e)))?;

        Ok(Self {
            level,
            presses,
            closed,
        })
    }

    /// Lines read so far
    pub fn presses(&self) -> u64 {
        self.presses.load(Ordering::SeqCst)
    }

    /// Whether the input reached end of file
    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }
}

impl DigitalInputSource for StdinButton {
    fn read(&self) -> Result<bool> {
        Ok(self.level.load(Ordering::SeqCst))
    }
}
