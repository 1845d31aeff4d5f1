use serde::{Deserialize, Serialize};
use strum::{Display, IntoStaticStr};

use super::RoundPhase;
use crate::score::SessionRecord;

/// What a round was typing
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum OutcomeSource {
    /// Prompt id
    Prompt(u64),
    /// Lyric line index
    Line(usize),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, IntoStaticStr)]
#[serde(rename_all = "camelCase")]
#[strum(serialize_all = "snake_case")]
pub enum OutcomeKind {
    Solved,
    TimedOut,
    Skipped,
}

/// How one round ended
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RoundOutcome {
    pub source: OutcomeSource,
    pub kind: OutcomeKind,
    /// Time from input going live to the outcome
    pub elapsed_ms: i64,
    pub mistakes: u32,
    /// Characters accepted into the input
    pub typed_chars: usize,
}

impl RoundOutcome {
    pub fn is_solved(&self) -> bool {
        self.kind == OutcomeKind::Solved
    }
}

/// Notifications returned from machine calls, in the order they happened.
#[derive(Debug, Clone, PartialEq)]
pub enum MachineEvent {
    PhaseChanged { from: RoundPhase, to: RoundPhase },
    CountdownTick { remaining: u32 },
    RoundStarted { source: OutcomeSource },
    /// A keystroke was rejected; `total` is the round's mistake count
    Mistake { total: u32 },
    RoundFinished { outcome: RoundOutcome, points: i64 },
    SessionStarted,
    SessionFinished(SessionRecord),
}
