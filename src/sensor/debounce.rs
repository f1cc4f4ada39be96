//! Edge detection with debounce and hold suppression

use super::{Activation, DigitalInputSource, Polarity};
use crate::utils::Clock;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, trace};

/// Debounce bookkeeping, owned and mutated only by the sensor's poll step
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct EdgeState {
    /// Last raw level seen, `None` before the first successful read
    pub last_level: Option<bool>,
    /// No activation may fire before this clock reading
    pub suppressed_until: Duration,
    /// Cleared on activation; set again once the input is back at the
    /// inactive level and the window has passed
    pub armed: bool,
}

/// Turns raw samples into one activation per press
///
/// An activation fires on the inactive-to-active transition. After that the
/// sensor stays disarmed until the input has returned to inactive *and* the
/// debounce window has elapsed, so both contact bounce and a held button are
/// ignored.
pub struct DebouncedEdgeSensor {
    source: Arc<dyn DigitalInputSource>,
    clock: Arc<dyn Clock>,
    polarity: Polarity,
    window: Duration,
    state: EdgeState,
    activations: u64,
}

impl DebouncedEdgeSensor {
    pub fn new(
        source: Arc<dyn DigitalInputSource>,
        clock: Arc<dyn Clock>,
        polarity: Polarity,
        window: Duration,
    ) -> Self {
        Self {
            source,
            clock,
            polarity,
            window,
            state: EdgeState {
                armed: true,
                ..EdgeState::default()
            },
            activations: 0,
        }
    }

    /// Sample the input once
    pub fn poll(&mut self) -> Option<Activation> {
        let now = self.clock.now();
        let level = match self.source.read() {
            Ok(level) => level,
            Err(e) => {
                trace!("Button read failed, treating as no change: {}", e);
                return None;
            }
        };

        let active = self.polarity.is_active(level);
        let was_active = self.state.last_level.map(|l| self.polarity.is_active(l));
        self.state.last_level = Some(level);

        if !self.state.armed {
            if !active && now >= self.state.suppressed_until {
                self.state.armed = true;
                trace!("Button re-armed");
            }
            return None;
        }

        // The first reading only establishes a baseline
        if was_active == Some(false) && active {
            self.state.armed = false;
            self.state.suppressed_until = now + self.window;
            self.activations += 1;
            debug!("Button activation #{}", self.activations);
            return Some(Activation {
                at: now,
                sequence: self.activations,
            });
        }

        None
    }

    pub fn state(&self) -> EdgeState {
        self.state
    }

    /// Activations emitted so far
    pub fn activation_count(&self) -> u64 {
        self.activations
    }
}
