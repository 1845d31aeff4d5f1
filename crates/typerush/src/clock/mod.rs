//! Time sources and timer primitives.
//!
//! Every machine reads time through [`ClockSource`] so the same state logic
//! runs against a monotonic wall clock (practice, flash), an external video
//! player's playback position (beat-sync), or a hand-driven clock in tests.
//!
//! - [`WallClock`]: elapsed time since creation or the last restart
//! - [`ManualClock`]: shared, explicitly advanced clock for deterministic runs
//! - [`VideoClockSource`]: player position plus calibration offset, with
//!   extrapolation across missing readings
//! - [`TimerSet`]: generation-tagged cancellable delays owned by one round
//! - [`PollSchedule`]: primary/fallback poll cadence

mod poll;
mod timers;
mod video;
mod wall;

use std::cell::Cell;
use std::rc::Rc;

pub use poll::{PollKind, PollSchedule};
pub use timers::{TimerHandle, TimerSet};
pub use video::{PendingIntent, PlayerEvent, PlayerState, VideoClockSource, VideoPlayer};
pub use wall::WallClock;

/// Millisecond time source.
pub trait ClockSource {
    /// Current time in milliseconds
    fn now_ms(&self) -> i64;

    /// Whether this source can drift relative to wall time
    fn drift_tolerant(&self) -> bool;
}

impl<C: ClockSource + ?Sized> ClockSource for &C {
    fn now_ms(&self) -> i64 {
        (**self).now_ms()
    }

    fn drift_tolerant(&self) -> bool {
        (**self).drift_tolerant()
    }
}

/// Clock that only moves when told to. Clones share the same time.
#[derive(Debug, Clone, Default)]
pub struct ManualClock {
    now: Rc<Cell<i64>>,
}

impl ManualClock {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn starting_at(ms: i64) -> Self {
        let clock = Self::new();
        clock.set(ms);
        clock
    }

    pub fn set(&self, ms: i64) {
        self.now.set(ms);
    }

    pub fn advance(&self, ms: i64) {
        self.now.set(self.now.get() + ms);
    }
}

impl ClockSource for ManualClock {
    fn now_ms(&self) -> i64 {
        self.now.get()
    }

    fn drift_tolerant(&self) -> bool {
        false
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_manual_clock_clones_share_time() {
        let clock = ManualClock::starting_at(100);
        let handle = clock.clone();
        handle.advance(250);
        assert_eq!(clock.now_ms(), 350);
        clock.set(0);
        assert_eq!(handle.now_ms(), 0);
    }

    #[test]
    fn test_clock_source_by_reference() {
        fn read<C: ClockSource>(c: C) -> i64 {
            c.now_ms()
        }
        let clock = ManualClock::starting_at(42);
        assert_eq!(read(&clock), 42);
        assert!(!(&clock).drift_tolerant());
    }
}
