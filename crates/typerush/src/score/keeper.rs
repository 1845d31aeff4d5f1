use chrono::{DateTime, Duration, Utc};
use tracing::{debug, info};

use super::{Difficulty, GameMode, ScoringRules, SessionRecord, SessionStats, apply};
use crate::round::RoundOutcome;

/// Session totals owned by the active machine.
///
/// Wall-clock timestamps are taken once at [`ScoreKeeper::begin`]; the end
/// timestamp is derived from the session clock so the recorded duration
/// matches what the machine measured.
#[derive(Debug, Clone)]
pub struct ScoreKeeper {
    mode: GameMode,
    difficulty: Difficulty,
    rules: ScoringRules,
    stats: SessionStats,
    started: Option<(DateTime<Utc>, i64)>,
}

impl ScoreKeeper {
    pub fn new(mode: GameMode, difficulty: Difficulty, rules: ScoringRules) -> Self {
        Self {
            mode,
            difficulty,
            rules,
            stats: SessionStats::default(),
            started: None,
        }
    }

    pub fn mode(&self) -> GameMode {
        self.mode
    }

    pub fn difficulty(&self) -> Difficulty {
        self.difficulty
    }

    pub fn set_difficulty(&mut self, difficulty: Difficulty) {
        self.difficulty = difficulty;
    }

    pub fn rules(&self) -> &ScoringRules {
        &self.rules
    }

    pub fn stats(&self) -> &SessionStats {
        &self.stats
    }

    pub fn is_running(&self) -> bool {
        self.started.is_some()
    }

    /// Reset totals and start timing a session at session-clock time `clock_ms`.
    pub fn begin(&mut self, clock_ms: i64) {
        self.begin_at(Utc::now(), clock_ms);
    }

    pub fn begin_at(&mut self, wall: DateTime<Utc>, clock_ms: i64) {
        self.stats = SessionStats::default();
        self.started = Some((wall, clock_ms));
        info!("{} session started ({})", self.mode, self.difficulty);
    }

    /// Fold in one outcome; returns the points it earned.
    pub fn record(&mut self, outcome: &RoundOutcome) -> i64 {
        let before = self.stats.points;
        self.stats = apply(self.stats, &self.rules, self.mode, self.difficulty, outcome);
        let earned = self.stats.points - before;
        debug!(
            "{:?} {:?}: +{} (total {})",
            outcome.source, outcome.kind, earned, self.stats.points
        );
        earned
    }

    /// Close the session at session-clock time `clock_ms`.
    ///
    /// Returns `None` if no session was running.
    pub fn finish(&mut self, clock_ms: i64) -> Option<SessionRecord> {
        let (started_at, started_ms) = self.started.take()?;
        let ended_at = started_at + Duration::milliseconds((clock_ms - started_ms).max(0));
        let record = SessionRecord::from_stats(
            self.mode,
            self.difficulty,
            started_at,
            ended_at,
            &self.stats,
        );
        info!(
            "{} session finished: {} solved, {} timed out, {} points",
            self.mode, record.solved, record.timed_out, record.points
        );
        Some(record)
    }

    /// Drop the running session and its totals without a record.
    pub fn abandon(&mut self) {
        self.started = None;
        self.stats = SessionStats::default();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::round::{OutcomeKind, OutcomeSource};
    use chrono::TimeZone;

    fn solved(mistakes: u32) -> RoundOutcome {
        RoundOutcome {
            source: OutcomeSource::Prompt(1),
            kind: OutcomeKind::Solved,
            elapsed_ms: 2000,
            mistakes,
            typed_chars: 8,
        }
    }

    #[test]
    fn test_keeper_session_lifecycle() {
        let mut keeper = ScoreKeeper::new(GameMode::Practice, Difficulty::Normal, ScoringRules::default());
        let start = Utc.with_ymd_and_hms(2026, 5, 2, 9, 0, 0).unwrap();
        keeper.begin_at(start, 10_000);
        assert_eq!(keeper.record(&solved(0)), 160);
        assert_eq!(keeper.record(&solved(1)), 147);

        let record = keeper.finish(130_000).unwrap();
        assert_eq!(record.points, 307);
        assert_eq!(record.solved, 2);
        assert_eq!(record.total_mistakes, 1);
        assert_eq!(record.duration_ms(), 120_000);
        assert!(!keeper.is_running());
        assert!(keeper.finish(140_000).is_none());
    }

    #[test]
    fn test_begin_resets_totals() {
        let mut keeper = ScoreKeeper::new(GameMode::Flash, Difficulty::Easy, ScoringRules::default());
        keeper.begin(0);
        keeper.record(&solved(0));
        keeper.begin(5000);
        assert_eq!(keeper.stats().points, 0);
        keeper.abandon();
        assert!(!keeper.is_running());
    }
}
