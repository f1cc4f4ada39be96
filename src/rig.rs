//! Composition root
//!
//! Wires the driver, the button input, the collaborators, the clock and the
//! random source into a running rig: one control thread for interactions
//! and one poller thread for the button.

use crate::actuator::{ActuatorDriver, ActuatorPort};
use crate::animation::{RandomSource, RngSource};
use crate::collaborators::Collaborators;
use crate::config::RigConfig;
use crate::interaction::{Orchestrator, OrchestratorHandle};
use crate::sensor::{ButtonPoller, DebouncedEdgeSensor, DigitalInputSource};
use crate::utils::{Clock, SystemClock};
use crate::{Result, RigError};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::JoinHandle;
use tracing::{info, warn};

/// Builder for a [`Rig`]
///
/// The driver, the input source and the collaborators are required. The
/// clock defaults to the system clock and the random source to an
/// OS-seeded generator.
pub struct RigBuilder {
    config: RigConfig,
    driver: Option<Arc<dyn ActuatorDriver>>,
    input: Option<Arc<dyn DigitalInputSource>>,
    collaborators: Option<Collaborators>,
    clock: Option<Arc<dyn Clock>>,
    random: Option<Box<dyn RandomSource>>,
}

impl RigBuilder {
    pub fn new() -> Self {
        Self {
            config: RigConfig::default(),
            driver: None,
            input: None,
            collaborators: None,
            clock: None,
            random: None,
        }
    }

    /// Set the complete configuration
    pub fn with_config(mut self, config: RigConfig) -> Self {
        self.config = config;
        self
    }

    pub fn with_driver(mut self, driver: Arc<dyn ActuatorDriver>) -> Self {
        self.driver = Some(driver);
        self
    }

    /// Raw button level source
    pub fn with_input(mut self, input: Arc<dyn DigitalInputSource>) -> Self {
        self.input = Some(input);
        self
    }

    pub fn with_collaborators(mut self, collaborators: Collaborators) -> Self {
        self.collaborators = Some(collaborators);
        self
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = Some(clock);
        self
    }

    pub fn with_random(mut self, random: Box<dyn RandomSource>) -> Self {
        self.random = Some(random);
        self
    }

    /// Validate the configuration and assemble the rig
    ///
    /// Fails with a configuration error when a required part is missing;
    /// no thread is started here.
    pub fn build(self) -> Result<Rig> {
        self.config.validate()?;

        let driver = self
            .driver
            .ok_or_else(|| RigError::Config("no actuator driver configured".into()))?;
        let input = self
            .input
            .ok_or_else(|| RigError::Config("no button input configured".into()))?;
        let collaborators = self
            .collaborators
            .ok_or_else(|| RigError::Config("no voice collaborators configured".into()))?;
        let clock = self.clock.unwrap_or_else(SystemClock::shared);
        let random: Box<dyn RandomSource> = match self.random {
            Some(random) => random,
            None => Box::new(RngSource::from_os()),
        };

        let port = Arc::new(ActuatorPort::new(driver));
        let (orchestrator, handle) = Orchestrator::new(
            self.config.clone(),
            port,
            collaborators,
            Arc::clone(&clock),
            random,
        );

        Ok(Rig {
            config: self.config,
            input,
            clock,
            orchestrator,
            handle,
        })
    }
}

impl Default for RigBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// An assembled rig that has not started yet
pub struct Rig {
    config: RigConfig,
    input: Arc<dyn DigitalInputSource>,
    clock: Arc<dyn Clock>,
    orchestrator: Orchestrator,
    handle: OrchestratorHandle,
}

impl Rig {
    pub fn builder() -> RigBuilder {
        RigBuilder::new()
    }

    pub fn orchestrator(&self) -> &OrchestratorHandle {
        &self.handle
    }

    /// Start the control thread and the button poller
    pub fn start(self) -> Result<RigHandle> {
        let control = self.orchestrator.start()?;

        let sensor = DebouncedEdgeSensor::new(
            self.input,
            Arc::clone(&self.clock),
            self.config.button.polarity,
            self.config.debounce(),
        );
        let poller = ButtonPoller::new(sensor, self.clock, self.config.poll_interval());
        let poller_running = poller.running_flag();

        let sink = self.handle.clone();
        let poller_thread = match poller.start(move |activation| {
            sink.activate(activation);
        }) {
            Ok(thread) => thread,
            Err(e) => {
                // Do not leave the control thread behind
                if let Err(stop_err) = self.handle.shutdown() {
                    warn!("Failed to stop control thread: {}", stop_err);
                }
                let _ = control.join();
                return Err(e);
            }
        };

        info!("Rig started");
        Ok(RigHandle {
            orchestrator: self.handle,
            poller_running,
            threads: vec![("button-poller", poller_thread), ("interaction", control)],
        })
    }
}

/// A running rig
pub struct RigHandle {
    orchestrator: OrchestratorHandle,
    poller_running: Arc<AtomicBool>,
    threads: Vec<(&'static str, JoinHandle<()>)>,
}

impl RigHandle {
    pub fn orchestrator(&self) -> &OrchestratorHandle {
        &self.orchestrator
    }

    /// Stop the poller, lock out the actuators and join every thread
    ///
    /// The emergency stop is issued from the calling thread before anything
    /// is joined, so a running interaction can no longer move anything.
    pub fn shutdown(self) -> Result<()> {
        info!("Shutting down rig");
        self.poller_running.store(false, Ordering::SeqCst);
        self.orchestrator.shutdown()?;

        let mut panicked = Vec::new();
        for (name, thread) in self.threads {
            if thread.join().is_err() {
                panicked.push(name);
            }
        }
        if !panicked.is_empty() {
            return Err(RigError::Io(format!("threads panicked: {}", panicked.join(", "))));
        }
        info!("Rig stopped");
        Ok(())
    }
}
