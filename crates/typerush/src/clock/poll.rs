/// Which poll loop asked for an update
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PollKind {
    /// High-frequency, per-frame poll
    Primary,
    /// Slow poll that only runs when the primary one has stalled
    Fallback,
}

/// Cadence for a primary poll plus a slower fallback.
///
/// The fallback only takes effect when the primary poll has not run for a
/// full fallback interval (a throttled background window, a blocked frame).
#[derive(Debug, Clone)]
pub struct PollSchedule {
    primary_ms: i64,
    fallback_ms: i64,
    last_poll_ms: Option<i64>,
}

impl PollSchedule {
    pub fn new(primary_ms: u64, fallback_ms: u64) -> Self {
        Self {
            primary_ms: primary_ms as i64,
            fallback_ms: fallback_ms.max(primary_ms) as i64,
            last_poll_ms: None,
        }
    }

    /// Should a poll of `kind` run at wall time `now_ms`? Records the poll when it should.
    pub fn due(&mut self, kind: PollKind, now_ms: i64) -> bool {
        let interval = match kind {
            PollKind::Primary => self.primary_ms,
            PollKind::Fallback => self.fallback_ms,
        };
        let due = match self.last_poll_ms {
            None => true,
            Some(last) => now_ms - last >= interval,
        };
        if due {
            self.last_poll_ms = Some(now_ms);
        }
        due
    }

    /// Wall time of the next primary poll
    pub fn next_primary_ms(&self) -> i64 {
        self.last_poll_ms.map_or(0, |last| last + self.primary_ms)
    }

    pub fn primary_ms(&self) -> u64 {
        self.primary_ms as u64
    }

    pub fn fallback_ms(&self) -> u64 {
        self.fallback_ms as u64
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_primary_poll_cadence() {
        let mut schedule = PollSchedule::new(16, 400);
        assert!(schedule.due(PollKind::Primary, 0));
        assert!(!schedule.due(PollKind::Primary, 10));
        assert!(schedule.due(PollKind::Primary, 16));
        assert_eq!(schedule.next_primary_ms(), 32);
    }

    #[test]
    fn test_fallback_only_when_primary_stalls() {
        let mut schedule = PollSchedule::new(16, 400);
        assert!(schedule.due(PollKind::Primary, 0));
        assert!(!schedule.due(PollKind::Fallback, 200));
        assert!(schedule.due(PollKind::Primary, 300));
        assert!(!schedule.due(PollKind::Fallback, 500));
        // Primary stalled for a full fallback interval
        assert!(schedule.due(PollKind::Fallback, 700));
    }

    #[test]
    fn test_fallback_never_faster_than_primary() {
        let schedule = PollSchedule::new(100, 10);
        assert_eq!(schedule.fallback_ms(), 100);
    }
}
