//! Fixed-interval button sampling thread

use super::{Activation, DebouncedEdgeSensor};
use crate::utils::Clock;
use crate::{Result, RigError};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;
use tracing::{debug, info};

/// Samples a [`DebouncedEdgeSensor`] on its own thread
///
/// Each fresh activation is handed to the sink. The sink must not block:
/// the poller only ever reads input and attempts to start an interaction.
pub struct ButtonPoller {
    sensor: DebouncedEdgeSensor,
    clock: Arc<dyn Clock>,
    interval: Duration,
    running: Arc<AtomicBool>,
}

impl ButtonPoller {
    pub fn new(sensor: DebouncedEdgeSensor, clock: Arc<dyn Clock>, interval: Duration) -> Self {
        Self {
            sensor,
            clock,
            interval,
            running: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Flag that stops the thread when cleared
    pub fn running_flag(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.running)
    }

    /// Start polling; returns the thread handle
    pub fn start<F>(mut self, sink: F) -> Result<JoinHandle<()>>
    where
        F: Fn(Activation) + Send + 'static,
    {
        self.running.store(true, Ordering::SeqCst);
        let running = Arc::clone(&self.running);

        thread::Builder::new()
            .name("button-poller".into())
            .spawn(move || {
                info!("Button poller started ({:?} interval)", self.interval);
                while running.load(Ordering::SeqCst) {
                    if let Some(activation) = self.sensor.poll() {
                        debug!("Delivering activation #{}", activation.sequence);
                        sink(activation);
                    }
                    self.clock.sleep(self.interval);
                }
                info!("Button poller stopped");
            })
            .map_err(|e| RigError::Io(format!("Failed to spawn button poller: {}", e)))
    }
}
