use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{Difficulty, GameMode, SessionStats};

/// Summary of one finished session, as kept in history
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionRecord {
    pub mode: GameMode,
    pub difficulty: Difficulty,
    pub started_at: DateTime<Utc>,
    pub ended_at: DateTime<Utc>,
    pub solved: u32,
    pub total_mistakes: u32,
    pub timed_out: u32,
    #[serde(default)]
    pub skipped: u32,
    pub points: i64,
    #[serde(default)]
    pub wpm: f64,
    #[serde(default = "full_accuracy")]
    pub accuracy: f64,
}

fn full_accuracy() -> f64 {
    100.0
}

impl SessionRecord {
    pub fn from_stats(
        mode: GameMode,
        difficulty: Difficulty,
        started_at: DateTime<Utc>,
        ended_at: DateTime<Utc>,
        stats: &SessionStats,
    ) -> Self {
        Self {
            mode,
            difficulty,
            started_at,
            ended_at,
            solved: stats.solved_count,
            total_mistakes: stats.total_mistakes,
            timed_out: stats.timed_out_count,
            skipped: stats.skipped_count,
            points: stats.points,
            wpm: stats.wpm(),
            accuracy: stats.accuracy(),
        }
    }

    pub fn duration_ms(&self) -> i64 {
        (self.ended_at - self.started_at).num_milliseconds()
    }
}
