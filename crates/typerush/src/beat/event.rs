use strum::{Display, IntoStaticStr};

use crate::round::RoundOutcome;
use crate::score::SessionRecord;

/// Where a beat-sync run stands relative to the track.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Display, IntoStaticStr)]
#[strum(serialize_all = "snake_case")]
pub enum BeatPhase {
    /// No track loaded
    #[default]
    Idle,
    /// Track loaded, player parked at the start
    Ready,
    /// Video running, first line still more than a pre-roll away
    Waiting,
    /// Inside the pre-roll; `remaining_ms` until the first line starts
    Countdown { remaining_ms: i64 },
    Active,
    /// Every line's window has passed
    Cleared,
    /// Too many missed lines
    Dead,
}

impl BeatPhase {
    /// Video is running and the engine follows it
    pub fn is_running(&self) -> bool {
        matches!(self, Self::Waiting | Self::Countdown { .. } | Self::Active)
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Cleared | Self::Dead)
    }

    /// Ignores the countdown's remaining time
    pub(super) fn changes_kind(&self, to: &Self) -> bool {
        std::mem::discriminant(self) != std::mem::discriminant(to)
    }
}

/// Settlement of one line
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Display, IntoStaticStr)]
#[strum(serialize_all = "lowercase")]
pub enum LineStatus {
    #[default]
    Pending,
    Solved,
    /// Window ended before the line was typed
    Missed,
    /// Skipped by command or jumped over by a seek
    Skipped,
}

/// Notifications returned from engine calls, in the order they happened.
#[derive(Debug, Clone, PartialEq)]
pub enum BeatEvent {
    /// Only reported when the kind of phase changes, not on every countdown step
    PhaseChanged { from: BeatPhase, to: BeatPhase },
    LineChanged { index: usize },
    Mistake { line: usize, total: u32 },
    LineFinished { outcome: RoundOutcome, points: i64 },
    /// The engine moved the player to adjusted time `to_ms`
    Seeked { to_ms: i64 },
    SessionStarted,
    SessionFinished(SessionRecord),
}
