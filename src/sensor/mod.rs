//! Button input
//!
//! A raw [`DigitalInputSource`] is sampled at a fixed cadence by the
//! [`ButtonPoller`]; the [`DebouncedEdgeSensor`] turns those samples into one
//! [`Activation`] per physical press.

pub mod debounce;
pub mod poller;
pub mod stdin;

pub use debounce::{DebouncedEdgeSensor, EdgeState};
pub use poller::ButtonPoller;
pub use stdin::StdinButton;

use crate::Result;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Raw digital level reader
pub trait DigitalInputSource: Send + Sync {
    /// Current raw level; an error means "no reading this poll"
    fn read(&self) -> Result<bool>;
}

/// Which raw level means "pressed"
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Polarity {
    /// Pull-up wiring: the pin reads low while pressed
    #[default]
    ActiveLow,
    ActiveHigh,
}

impl Polarity {
    /// Whether a raw `level` is the pressed level
    pub fn is_active(self, level: bool) -> bool {
        match self {
            Polarity::ActiveLow => !level,
            Polarity::ActiveHigh => level,
        }
    }
}

/// One logical button press after debounce
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Activation {
    /// Clock reading at which the press was observed
    pub at: Duration,
    /// Running count of activations from this sensor, starting at 1
    pub sequence: u64,
}
