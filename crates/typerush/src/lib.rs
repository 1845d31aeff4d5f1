//! # typerush
//!
//! Core library for a romanized-Japanese typing trainer.
//!
//! This crate provides:
//! - Romaji variant matching (prefix checks, completion, highlight)
//! - Clock sources: wall clock, manual clock, video-player clock with extrapolation
//! - The round state machine shared by every mode, with cancellable timers
//! - Practice, flash and beat-sync session machines
//! - Scoring, session records and on-disk history
//!
//! Machines are single-threaded and poll-driven: callers feed keys and poll
//! on a timer, and every call returns the events it produced.
//!
//! ## Feature Flags
//!
//! - `api`: HTTP prompt and caption sources (ureq).

pub mod beat;
pub mod clock;
pub mod config;
pub mod error;
pub mod flash;
pub mod practice;
pub mod prelude;
pub mod prompt;
pub mod romaji;
pub mod roster;
pub mod round;
pub mod score;
pub mod storage;

pub use beat::{BeatConfig, BeatEvent, BeatPhase, BeatSyncEngine, LineStatus};
pub use clock::{
    ClockSource, ManualClock, PlayerEvent, PlayerState, PollKind, PollSchedule, TimerSet,
    VideoClockSource, VideoPlayer, WallClock,
};
pub use config::{GameConfig, GameConfigBuilder, StorageConfig};
pub use error::{Error, Result};
pub use flash::{FlashConfig, FlashRoundMachine};
pub use practice::{PracticeConfig, PracticeSessionMachine};
pub use prompt::{LyricLine, LyricTrack, PickMode, Prompt, PromptPool, VideoId};
pub use romaji::{RomajiTarget, expand_variants, is_complete, is_prefix_valid};
pub use roster::{ProgressUpdate, RoomState, RosterMessage, StartGate};
pub use round::{Key, MachineEvent, RoundMachine, RoundOutcome, RoundPhase, RoundState};
pub use score::{Difficulty, GameMode, ScoreKeeper, ScoringRules, SessionRecord, SessionStats};
pub use storage::{RecordStore, daily_bests};
