//! Simulated motor driver
//!
//! Logs every command and keeps a history, standing in for the motor HAT on
//! a bench without hardware. Long-running rigs should cap the history with
//! [`SimulatedDriver::with_history_limit`].

use super::{Actuator, ActuatorDriver, Direction, Intensity};
use crate::{Result, RigError};
use parking_lot::Mutex;
use std::collections::VecDeque;
use tracing::info;

/// A command as seen by the driver
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DriverCommand {
    Set(Actuator, Direction, Intensity),
    Brake(Actuator),
    Release(Actuator),
}

impl DriverCommand {
    pub fn actuator(&self) -> Actuator {
        match self {
            DriverCommand::Set(a, _, _) | DriverCommand::Brake(a) | DriverCommand::Release(a) => *a,
        }
    }
}

/// Driver that records commands instead of energizing pins
#[derive(Debug)]
pub struct SimulatedDriver {
    history: Mutex<VecDeque<DriverCommand>>,
    history_limit: Option<usize>,
    has_brake: bool,
    init_fails: bool,
    verbose: bool,
}

impl SimulatedDriver {
    pub fn new() -> Self {
        Self {
            history: Mutex::new(VecDeque::new()),
            history_limit: None,
            has_brake: true,
            init_fails: false,
            verbose: false,
        }
    }

    /// Hardware with only forward/reverse/release
    pub fn without_brake() -> Self {
        Self {
            has_brake: false,
            ..Self::new()
        }
    }

    /// Hardware that is missing or unreachable
    pub fn failing_init() -> Self {
        Self {
            init_fails: true,
            ..Self::new()
        }
    }

    /// Log every command at info level
    pub fn verbose(mut self) -> Self {
        self.verbose = true;
        self
    }

    /// Keep only the most recent `limit` commands
    pub fn with_history_limit(mut self, limit: usize) -> Self {
        self.history_limit = Some(limit);
        self
    }

    /// Every retained command, in order
    pub fn history(&self) -> Vec<DriverCommand> {
        self.history.lock().iter().copied().collect()
    }

    /// Commands received for one actuator
    pub fn history_for(&self, actuator: Actuator) -> Vec<DriverCommand> {
        self.history
            .lock()
            .iter()
            .filter(|c| c.actuator() == actuator)
            .copied()
            .collect()
    }

    pub fn clear(&self) {
        self.history.lock().clear();
    }

    fn record(&self, command: DriverCommand) {
        if self.verbose {
            info!("motor: {:?}", command);
        }
        let mut history = self.history.lock();
        if let Some(limit) = self.history_limit {
            while history.len() >= limit.max(1) {
                history.pop_front();
            }
        }
        history.push_back(command);
    }
}

impl Default for SimulatedDriver {
    fn default() -> Self {
        Self::new()
    }
}

impl ActuatorDriver for SimulatedDriver {
    fn init(&self) -> Result<()> {
        if self.init_fails {
            return Err(RigError::ActuatorCommand("motor driver not found".into()));
        }
        Ok(())
    }

    fn set(&self, actuator: Actuator, direction: Direction, intensity: Intensity) -> Result<()> {
        self.record(DriverCommand::Set(actuator, direction, intensity));
        Ok(())
    }

    fn brake(&self, actuator: Actuator) -> Result<()> {
        self.record(DriverCommand::Brake(actuator));
        Ok(())
    }

    fn release(&self, actuator: Actuator) -> Result<()> {
        self.record(DriverCommand::Release(actuator));
        Ok(())
    }

    fn supports_brake(&self) -> bool {
        self.has_brake
    }
}
