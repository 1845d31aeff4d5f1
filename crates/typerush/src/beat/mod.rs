//! Beat-sync mode: type each caption line while it plays.
//!
//! [`BeatSyncEngine`] follows a [`VideoClockSource`](crate::clock::VideoClockSource)
//! and keeps a current line index in step with the adjusted playback time.
//! The index is always recomputed from the line table, so seeks in either
//! direction land on the right line. A line typed before its window ends
//! locks input until the window closes; a line whose window ends untyped is
//! missed, and too many misses end the run.

mod engine;
mod event;

use serde::{Deserialize, Serialize};

use crate::score::Difficulty;

pub use engine::BeatSyncEngine;
pub use event::{BeatEvent, BeatPhase, LineStatus};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BeatConfig {
    /// Countdown window before the first line
    pub preroll_ms: i64,
    /// Missed lines before the run fails; 0 never fails
    pub max_misses: u32,
    pub primary_poll_ms: u64,
    pub fallback_poll_ms: u64,
    /// Calibration offset added to the player position
    pub offset_ms: i64,
    /// Step for keyboard offset adjustments
    pub nudge_ms: i64,
    /// Label stamped on each run's record
    pub difficulty: Difficulty,
}

impl Default for BeatConfig {
    fn default() -> Self {
        Self {
            preroll_ms: 3000,
            max_misses: 5,
            primary_poll_ms: 16,
            fallback_poll_ms: 400,
            offset_ms: 0,
            nudge_ms: 50,
            difficulty: Difficulty::Normal,
        }
    }
}

impl BeatConfig {
    pub fn preroll_ms(mut self, ms: i64) -> Self {
        self.preroll_ms = ms.max(0);
        self
    }

    pub fn max_misses(mut self, misses: u32) -> Self {
        self.max_misses = misses;
        self
    }

    pub fn offset_ms(mut self, ms: i64) -> Self {
        self.offset_ms = ms;
        self
    }

    pub fn difficulty(mut self, difficulty: Difficulty) -> Self {
        self.difficulty = difficulty;
        self
    }
}
