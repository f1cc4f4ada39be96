pub mod clock;
pub mod perf;

pub use clock::{Clock, ManualClock, SystemClock};
pub use perf::{PhaseSplit, PhaseTimer, TimingTracker};
