//! Actuators and the port that commands them
//!
//! The rig has three motors. Each is driven forward or reverse at a bounded
//! intensity, released (coast) or braked. The [`ActuatorPort`] is the only
//! path to the driver.

pub mod driver;
pub mod port;

pub use driver::{DriverCommand, SimulatedDriver};
pub use port::ActuatorPort;

use crate::Result;
use serde::{Deserialize, Serialize};

/// One motor-driven mechanism
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Actuator {
    Body,
    Mouth,
    Tail,
}

impl Actuator {
    /// Every actuator on the rig
    pub const ALL: [Actuator; 3] = [Actuator::Body, Actuator::Mouth, Actuator::Tail];

    pub(crate) fn index(self) -> usize {
        match self {
            Actuator::Body => 0,
            Actuator::Mouth => 1,
            Actuator::Tail => 2,
        }
    }
}

impl std::fmt::Display for Actuator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Actuator::Body => write!(f, "body"),
            Actuator::Mouth => write!(f, "mouth"),
            Actuator::Tail => write!(f, "tail"),
        }
    }
}

/// Drive direction
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub enum Direction {
    Forward,
    Reverse,
}

impl Direction {
    pub fn opposite(self) -> Self {
        match self {
            Direction::Forward => Direction::Reverse,
            Direction::Reverse => Direction::Forward,
        }
    }
}

/// Drive strength in `[0, 100]`
///
/// Out-of-range input is clamped, never rejected.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Serialize)]
pub struct Intensity(u8);

impl Intensity {
    pub const MAX: Intensity = Intensity(100);

    pub fn clamped(raw: i32) -> Self {
        Intensity(raw.clamp(0, 100) as u8)
    }

    pub fn get(self) -> u8 {
        self.0
    }

    /// Signed drive value for this intensity in `direction`
    pub fn signed(self, direction: Direction) -> i32 {
        match direction {
            Direction::Forward => self.0 as i32,
            Direction::Reverse => -(self.0 as i32),
        }
    }
}

/// Last commanded state of one actuator
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
pub enum ActuatorState {
    #[default]
    Stopped,
    Forward(Intensity),
    Reverse(Intensity),
    Braking,
}

impl ActuatorState {
    /// State commanded by a signed drive value, clamped to `[-100, 100]`
    pub fn from_signed(signed_intensity: i32) -> Self {
        let clamped = signed_intensity.clamp(-100, 100);
        match clamped {
            0 => ActuatorState::Stopped,
            v if v > 0 => ActuatorState::Forward(Intensity::clamped(v)),
            v => ActuatorState::Reverse(Intensity::clamped(-v)),
        }
    }

    pub fn is_stopped(&self) -> bool {
        matches!(self, ActuatorState::Stopped)
    }

    pub fn is_moving(&self) -> bool {
        matches!(self, ActuatorState::Forward(_) | ActuatorState::Reverse(_))
    }
}

/// How the body holds its turned position against the return spring
///
/// `Brake` is the three-state policy: drive, brake while holding, then drive
/// back and release. Hardware without an electrical brake uses `Coast`, which
/// releases instead of braking.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum HoldPolicy {
    #[default]
    Brake,
    Coast,
}

/// Register/pin level motor control
///
/// Implementations must tolerate concurrent calls for different actuators;
/// the port never issues concurrent calls for the same actuator.
pub trait ActuatorDriver: Send + Sync {
    /// One-time hardware setup, called lazily by the port
    fn init(&self) -> Result<()> {
        Ok(())
    }

    /// Energize `actuator` in `direction`
    fn set(&self, actuator: Actuator, direction: Direction, intensity: Intensity) -> Result<()>;

    /// Short the windings to resist external motion
    fn brake(&self, actuator: Actuator) -> Result<()>;

    /// De-energize and let the actuator coast
    fn release(&self, actuator: Actuator) -> Result<()>;

    /// Whether `brake` is a distinct electrical state on this hardware
    fn supports_brake(&self) -> bool {
        true
    }
}
