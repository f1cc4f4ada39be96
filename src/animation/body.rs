//! Body turn-and-hold motion
//!
//! The body is spring-loaded back to its rest position. Turning toward the
//! user drives it forward for a fixed time and then holds it there. With
//! [`HoldPolicy::Brake`] the hold is an electrical brake (no drive current);
//! with [`HoldPolicy::Coast`] the motor is released and the spring may pull
//! the body partly back. Returning drives reverse for the same time and then
//! releases so the spring finishes the travel.

use crate::actuator::{Actuator, ActuatorPort, Direction, HoldPolicy, Intensity};
use crate::utils::Clock;
use crate::Result;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

pub struct BodyMotion {
    port: Arc<ActuatorPort>,
    clock: Arc<dyn Clock>,
    intensity: Intensity,
    turn: Duration,
    hold: HoldPolicy,
}

impl BodyMotion {
    pub fn new(
        port: Arc<ActuatorPort>,
        clock: Arc<dyn Clock>,
        intensity: Intensity,
        turn: Duration,
        hold: HoldPolicy,
    ) -> Self {
        Self {
            port,
            clock,
            intensity,
            turn,
            hold,
        }
    }

    /// Drive forward for the turn time, then hold
    pub fn turn_to_user(&self) -> Result<()> {
        debug!("Turning body toward user ({:?}, hold = {:?})", self.turn, self.hold);
        self.port
            .drive_toward(Actuator::Body, Direction::Forward, self.intensity)?;
        self.clock.sleep(self.turn);
        match self.hold {
            HoldPolicy::Brake => self.port.brake(Actuator::Body),
            HoldPolicy::Coast => self.port.stop(Actuator::Body),
        }
    }

    /// Drive reverse for the turn time, then release
    ///
    /// The release is attempted even if the reverse drive fails.
    pub fn return_to_rest(&self) -> Result<()> {
        debug!("Returning body to rest");
        let driven = self
            .port
            .drive_toward(Actuator::Body, Direction::Reverse, self.intensity);
        if driven.is_ok() {
            self.clock.sleep(self.turn);
        }
        let stopped = self.port.stop(Actuator::Body);
        if let (Err(e), Ok(())) = (&driven, &stopped) {
            warn!("Body reverse drive failed, released anyway: {}", e);
        }
        driven.and(stopped)
    }
}
