//! Prelude module for convenient imports
//!
//! ```ignore
//! use typerush::prelude::*;
//! ```
//!
//! Brings in the session machines, their configs, the clock types a front end
//! needs to drive them, and the error types.

// Session machines
pub use crate::beat::{BeatConfig, BeatEvent, BeatPhase, BeatSyncEngine};
pub use crate::flash::{FlashConfig, FlashRoundMachine};
pub use crate::practice::{PracticeConfig, PracticeSessionMachine};

// Round surface
pub use crate::round::{Key, MachineEvent, RoundOutcome, RoundPhase};

// Clocks
pub use crate::clock::{ClockSource, PlayerEvent, PlayerState, PollKind, VideoPlayer, WallClock};

// Data and sources
pub use crate::prompt::{LyricSource, LyricTrack, PromptPool, PromptSource, VideoId};

// Scoring and history
pub use crate::score::{Difficulty, GameMode, ScoringRules, SessionRecord};
pub use crate::storage::RecordStore;

pub use crate::config::GameConfig;
pub use crate::error::{Error, Result};
