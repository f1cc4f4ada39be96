//! Open-loop actuator animation
//!
//! Speech animation is timed against a duration only: the mouth flaps and
//! the tail wags at a jittered fixed rate until the clip length has elapsed.
//! There is no amplitude tracking.

pub mod body;

pub use body::BodyMotion;

use crate::actuator::{Actuator, ActuatorPort, Direction, Intensity};
use crate::config::RigConfig;
use crate::utils::Clock;
use crate::Result;
use parking_lot::Mutex;
use rand::rngs::StdRng;
use rand::{Rng, RngCore, SeedableRng};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

/// Randomness consumed by the animation
pub trait RandomSource: Send {
    /// Fair coin flip
    fn coin(&mut self) -> bool;

    /// Uniform duration in `[0, max]`
    fn jitter(&mut self, max: Duration) -> Duration;
}

/// [`RandomSource`] over any `rand` generator
pub struct RngSource<R>(pub R);

impl RngSource<StdRng> {
    /// Generator seeded from the operating system
    pub fn from_os() -> Self {
        RngSource(StdRng::from_os_rng())
    }

    /// Reproducible generator
    pub fn seeded(seed: u64) -> Self {
        RngSource(StdRng::seed_from_u64(seed))
    }
}

impl<R: RngCore + Send> RandomSource for RngSource<R> {
    fn coin(&mut self) -> bool {
        self.0.random_bool(0.5)
    }

    fn jitter(&mut self, max: Duration) -> Duration {
        let max_ms = max.as_millis() as u64;
        if max_ms == 0 {
            return Duration::ZERO;
        }
        Duration::from_millis(self.0.random_range(0..=max_ms))
    }
}

/// How one actuator moves during an animation
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MotionPattern {
    /// Alternate forward and reverse every step, starting forward
    Toggle,
    /// Pick forward or reverse at random every step
    RandomWag,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct AnimationTrack {
    pub actuator: Actuator,
    pub pattern: MotionPattern,
    pub intensity: Intensity,
}

/// Target duration plus one pattern per actuator
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AnimationPlan {
    pub duration: Duration,
    pub tracks: Vec<AnimationTrack>,
}

impl AnimationPlan {
    /// Mouth toggles open/closed, tail wags at random
    pub fn speaking(duration: Duration, config: &RigConfig) -> Self {
        Self {
            duration,
            tracks: vec![
                AnimationTrack {
                    actuator: Actuator::Mouth,
                    pattern: MotionPattern::Toggle,
                    intensity: config.actuators.intensity(Actuator::Mouth),
                },
                AnimationTrack {
                    actuator: Actuator::Tail,
                    pattern: MotionPattern::RandomWag,
                    intensity: config.actuators.intensity(Actuator::Tail),
                },
            ],
        }
    }

    pub fn actuators(&self) -> Vec<Actuator> {
        self.tracks.iter().map(|t| t.actuator).collect()
    }
}

/// What one animation run did
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct AnimationSummary {
    pub steps: u32,
    pub elapsed: Duration,
    pub cancelled: bool,
}

/// Stops the animated actuators however the animation exits
struct StopOnExit<'a> {
    port: &'a ActuatorPort,
    actuators: Vec<Actuator>,
}

impl Drop for StopOnExit<'_> {
    fn drop(&mut self) {
        for actuator in &self.actuators {
            if let Err(e) = self.port.stop(*actuator) {
                warn!("Failed to stop {} after animation: {}", actuator, e);
            }
        }
    }
}

/// Drives animation plans against the wall clock
pub struct AnimationSynchronizer {
    port: Arc<ActuatorPort>,
    clock: Arc<dyn Clock>,
    random: Mutex<Box<dyn RandomSource>>,
    step: Duration,
    jitter: Duration,
}

impl AnimationSynchronizer {
    pub fn new(
        port: Arc<ActuatorPort>,
        clock: Arc<dyn Clock>,
        random: Box<dyn RandomSource>,
        step: Duration,
        jitter: Duration,
    ) -> Self {
        Self {
            port,
            clock,
            random: Mutex::new(random),
            step,
            jitter,
        }
    }

    /// Longest pause between two updates
    pub fn max_step(&self) -> Duration {
        self.step + self.jitter
    }

    /// Run `plan` to completion
    pub fn animate(&self, plan: &AnimationPlan) -> Result<AnimationSummary> {
        self.animate_until(plan, &AtomicBool::new(false))
    }

    /// Run `plan` until its duration elapses or `cancel` is set
    ///
    /// Every actuator in the plan is stopped on return, including on error.
    /// The final pause is shortened so the run never overshoots the
    /// duration by more than one step.
    pub fn animate_until(&self, plan: &AnimationPlan, cancel: &AtomicBool) -> Result<AnimationSummary> {
        let start = self.clock.now();
        let _stop = StopOnExit {
            port: &self.port,
            actuators: plan.actuators(),
        };

        let mut toggles: Vec<Direction> = vec![Direction::Reverse; plan.tracks.len()];
        let mut steps = 0u32;
        let mut cancelled = false;

        loop {
            let elapsed = self.clock.since(start);
            if elapsed >= plan.duration {
                break;
            }
            if cancel.load(Ordering::SeqCst) {
                cancelled = true;
                break;
            }

            for (track, last) in plan.tracks.iter().zip(toggles.iter_mut()) {
                let direction = match track.pattern {
                    MotionPattern::Toggle => {
                        *last = last.opposite();
                        *last
                    }
                    MotionPattern::RandomWag => {
                        if self.random.lock().coin() {
                            Direction::Forward
                        } else {
                            Direction::Reverse
                        }
                    }
                };
                self.port.drive_toward(track.actuator, direction, track.intensity)?;
            }
            steps += 1;

            let jitter = self.random.lock().jitter(self.jitter);
            let remaining = plan.duration - elapsed;
            self.clock.sleep((self.step + jitter).min(remaining));
        }

        let summary = AnimationSummary {
            steps,
            elapsed: self.clock.since(start),
            cancelled,
        };
        debug!("Animation finished: {:?}", summary);
        Ok(summary)
    }
}
