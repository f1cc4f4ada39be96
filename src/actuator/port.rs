//! Serialized access to the actuator driver
//!
//! Each actuator has its own lock, held across the driver call, so commands
//! to one actuator are strictly ordered while different actuators can be
//! driven from different threads at once. The lock also guards the last
//! commanded state.

use super::{Actuator, ActuatorDriver, ActuatorState, Direction, Intensity};
use crate::{Result, RigError};
use parking_lot::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// The single command path to the rig's motors
pub struct ActuatorPort {
    driver: Arc<dyn ActuatorDriver>,
    slots: [Mutex<ActuatorState>; 3],
    initialized: Mutex<bool>,
    locked_out: AtomicBool,
}

impl ActuatorPort {
    /// Create a port over `driver`; the driver is initialized on first use
    pub fn new(driver: Arc<dyn ActuatorDriver>) -> Self {
        Self {
            driver,
            slots: Default::default(),
            initialized: Mutex::new(false),
            locked_out: AtomicBool::new(false),
        }
    }

    fn ensure_initialized(&self) -> Result<()> {
        let mut initialized = self.initialized.lock();
        if !*initialized {
            self.driver.init()?;
            *initialized = true;
            info!("Actuator driver initialized");
        }
        Ok(())
    }

    fn check_armed(&self, actuator: Actuator) -> Result<()> {
        if self.locked_out.load(Ordering::SeqCst) {
            return Err(RigError::ActuatorLockedOut(format!(
                "refusing to command {} after emergency stop",
                actuator
            )));
        }
        Ok(())
    }

    /// Drive `actuator` at `signed_intensity` in `[-100, 100]`
    ///
    /// Positive is forward, negative is reverse, zero releases. Values outside
    /// the range are clamped.
    pub fn drive(&self, actuator: Actuator, signed_intensity: i32) -> Result<()> {
        self.ensure_initialized()?;
        let target = ActuatorState::from_signed(signed_intensity);

        let mut slot = self.slots[actuator.index()].lock();
        self.check_armed(actuator)?;

        match target {
            ActuatorState::Forward(i) => self.driver.set(actuator, Direction::Forward, i)?,
            ActuatorState::Reverse(i) => self.driver.set(actuator, Direction::Reverse, i)?,
            _ => self.driver.release(actuator)?,
        }
        debug!("{} -> {:?}", actuator, target);
        *slot = target;
        Ok(())
    }

    /// Drive in `direction` at `intensity`
    pub fn drive_toward(&self, actuator: Actuator, direction: Direction, intensity: Intensity) -> Result<()> {
        self.drive(actuator, intensity.signed(direction))
    }

    /// Release `actuator`
    pub fn stop(&self, actuator: Actuator) -> Result<()> {
        self.drive(actuator, 0)
    }

    /// Hold `actuator` against an external force without drive current
    ///
    /// Degrades to `stop` when the driver has no brake state.
    pub fn brake(&self, actuator: Actuator) -> Result<()> {
        if !self.driver.supports_brake() {
            debug!("Driver has no brake state, releasing {} instead", actuator);
            return self.stop(actuator);
        }
        self.ensure_initialized()?;

        let mut slot = self.slots[actuator.index()].lock();
        self.check_armed(actuator)?;
        self.driver.brake(actuator)?;
        debug!("{} -> Braking", actuator);
        *slot = ActuatorState::Braking;
        Ok(())
    }

    /// Release every actuator, best effort
    ///
    /// Never fails: initialization or driver errors are logged and the
    /// remaining actuators are still attempted. Safe to call repeatedly and
    /// on a port whose driver never initialized.
    pub fn stop_all(&self) {
        if let Err(e) = self.ensure_initialized() {
            warn!("Cannot stop actuators, driver not initialized: {}", e);
            return;
        }
        for actuator in Actuator::ALL {
            let mut slot = self.slots[actuator.index()].lock();
            match self.driver.release(actuator) {
                Ok(()) => *slot = ActuatorState::Stopped,
                Err(e) => warn!("Failed to stop {}: {}", actuator, e),
            }
        }
    }

    /// Lock out further motion, then release every actuator synchronously
    ///
    /// Commands already holding an actuator's lock finish first; any command
    /// arriving afterwards is refused until [`rearm`](Self::rearm).
    pub fn emergency_stop(&self) {
        self.locked_out.store(true, Ordering::SeqCst);
        info!("Emergency stop: actuators locked out");
        self.stop_all();
    }

    /// Allow motion again after an emergency stop
    pub fn rearm(&self) {
        self.locked_out.store(false, Ordering::SeqCst);
        info!("Actuators re-armed");
    }

    pub fn is_locked_out(&self) -> bool {
        self.locked_out.load(Ordering::SeqCst)
    }

    /// Last successfully commanded state of `actuator`
    pub fn state(&self, actuator: Actuator) -> ActuatorState {
        *self.slots[actuator.index()].lock()
    }

    /// Whether every actuator's last commanded state is `Stopped`
    pub fn all_stopped(&self) -> bool {
        Actuator::ALL.iter().all(|a| self.state(*a).is_stopped())
    }
}
