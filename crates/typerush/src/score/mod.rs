//! Scoring for all three modes.
//!
//! [`apply`] is a pure reducer from one [`RoundOutcome`] to updated
//! [`SessionStats`]; [`ScoreKeeper`] wraps it for one session and produces
//! the [`SessionRecord`] written to history when the session ends.

mod keeper;
mod record;
mod stats;

use serde::{Deserialize, Serialize};
use strum::{Display, EnumString, FromRepr, IntoStaticStr};

use crate::round::{OutcomeKind, RoundOutcome};

pub use keeper::ScoreKeeper;
pub use record::SessionRecord;
pub use stats::{compute_accuracy, compute_wpm, progress_ratio};

#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    FromRepr,
    EnumString,
    IntoStaticStr,
    Display,
)]
#[repr(u8)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum GameMode {
    Practice = 0,
    Flash = 1,
    #[serde(rename = "beat")]
    #[strum(serialize = "beat")]
    BeatSync = 2,
}

impl GameMode {
    /// Storage key of this mode's record history
    pub fn record_key(&self) -> &'static str {
        match self {
            Self::Practice => "typing-sessions",
            Self::Flash => "typing-flash-sessions",
            Self::BeatSync => "typing-beat-sessions",
        }
    }
}

#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Default,
    Serialize,
    Deserialize,
    FromRepr,
    EnumString,
    IntoStaticStr,
    Display,
)]
#[repr(u8)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum Difficulty {
    Easy = 0,
    #[default]
    Normal = 1,
    Hard = 2,
}

impl Difficulty {
    pub fn label(&self) -> &'static str {
        self.into()
    }
}

/// Point values. Every field defaults to the stock rules.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScoringRules {
    pub base_easy: i64,
    pub base_normal: i64,
    pub base_hard: i64,
    /// Added to a practice round solved without mistakes
    pub bonus: i64,
    /// Subtracted per mistake in a practice round
    pub penalty_per_mistake: i64,
    /// Flat value of a solved flash round or beat-sync line
    pub points_per_solve: i64,
}

impl Default for ScoringRules {
    fn default() -> Self {
        Self {
            base_easy: 100,
            base_normal: 150,
            base_hard: 200,
            bonus: 10,
            penalty_per_mistake: 3,
            points_per_solve: 100,
        }
    }
}

impl ScoringRules {
    pub fn base_points(&self, difficulty: Difficulty) -> i64 {
        match difficulty {
            Difficulty::Easy => self.base_easy,
            Difficulty::Normal => self.base_normal,
            Difficulty::Hard => self.base_hard,
        }
    }

    /// Points one outcome contributes. Never negative.
    pub fn round_points(&self, mode: GameMode, difficulty: Difficulty, outcome: &RoundOutcome) -> i64 {
        if outcome.kind != OutcomeKind::Solved {
            return 0;
        }
        match mode {
            GameMode::Practice => {
                let base = self.base_points(difficulty);
                if outcome.mistakes == 0 {
                    base + self.bonus
                } else {
                    (base - self.penalty_per_mistake * outcome.mistakes as i64).max(0)
                }
            }
            GameMode::Flash | GameMode::BeatSync => self.points_per_solve,
        }
    }
}

/// Running totals for one session
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionStats {
    pub solved_count: u32,
    pub total_mistakes: u32,
    pub timed_out_count: u32,
    pub skipped_count: u32,
    pub points: i64,
    /// Characters accepted across all rounds
    pub typed_chars: u64,
    /// Time spent in solved rounds
    pub solved_ms: i64,
}

impl SessionStats {
    /// Words per minute over solved rounds
    pub fn wpm(&self) -> f64 {
        compute_wpm(self.typed_chars, self.solved_ms)
    }

    pub fn accuracy(&self) -> f64 {
        compute_accuracy(self.typed_chars + self.total_mistakes as u64, self.total_mistakes as u64)
    }
}

/// Fold one round outcome into the session totals.
pub fn apply(
    stats: SessionStats,
    rules: &ScoringRules,
    mode: GameMode,
    difficulty: Difficulty,
    outcome: &RoundOutcome,
) -> SessionStats {
    let mut next = stats;
    next.total_mistakes += outcome.mistakes;
    next.typed_chars += outcome.typed_chars as u64;
    match outcome.kind {
        OutcomeKind::Solved => {
            next.solved_count += 1;
            next.solved_ms += outcome.elapsed_ms.max(0);
        }
        OutcomeKind::TimedOut => next.timed_out_count += 1,
        OutcomeKind::Skipped => next.skipped_count += 1,
    }
    next.points += rules.round_points(mode, difficulty, outcome);
    next
}
