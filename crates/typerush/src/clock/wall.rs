use std::time::Instant;

use super::ClockSource;

/// Monotonic clock measuring milliseconds since it was created or restarted.
#[derive(Debug, Clone, Copy)]
pub struct WallClock {
    origin: Instant,
}

impl WallClock {
    pub fn new() -> Self {
        Self {
            origin: Instant::now(),
        }
    }

    /// Move the origin to now
    pub fn restart(&mut self) {
        self.origin = Instant::now();
    }
}

impl Default for WallClock {
    fn default() -> Self {
        Self::new()
    }
}

impl ClockSource for WallClock {
    fn now_ms(&self) -> i64 {
        i64::try_from(self.origin.elapsed().as_millis()).unwrap_or(i64::MAX)
    }

    fn drift_tolerant(&self) -> bool {
        false
    }
}
