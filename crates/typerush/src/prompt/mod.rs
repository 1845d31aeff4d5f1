//! Prompts, lyric tracks and the sources they come from.
//!
//! - [`Prompt`]: one practice/flash phrase, shared by reference with the round typing it
//! - [`LyricTrack`]: validated, time-ordered caption lines for beat-sync
//! - [`PromptPool`]: owns the prompt list and picks the next one
//! - [`PromptSource`] / [`LyricSource`]: one-shot fetch boundaries (JSON files, HTTP with `api`)

mod pool;
mod source;

use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

pub use pool::{DEFAULT_TARGET, PickMode, PromptPool, TARGET_MAX, TARGET_MIN, update_target};
#[cfg(feature = "api")]
pub use source::{HttpLyricSource, HttpPromptSource};
pub use source::{JsonLyricSource, JsonPromptSource, LyricSource, PromptSource, StaticPrompts};

/// A phrase to type. Immutable once fetched.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Prompt {
    pub id: u64,
    #[serde(alias = "text")]
    pub display_text: String,
    #[serde(alias = "romaji")]
    pub canonical_romaji: String,
    #[serde(alias = "difficulty", default)]
    pub difficulty_score: u32,
}

impl Prompt {
    pub fn new(
        id: u64,
        display_text: impl Into<String>,
        canonical_romaji: impl Into<String>,
        difficulty_score: u32,
    ) -> Self {
        Self {
            id,
            display_text: display_text.into(),
            canonical_romaji: canonical_romaji.into(),
            difficulty_score,
        }
    }
}

pub type SharedPrompt = Arc<Prompt>;

/// One caption line with its typing window
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LyricLine {
    #[serde(alias = "text")]
    pub display_text: String,
    #[serde(alias = "romaji")]
    pub canonical_romaji: String,
    pub start_ms: i64,
    pub end_ms: i64,
}

impl LyricLine {
    pub fn new(
        display_text: impl Into<String>,
        canonical_romaji: impl Into<String>,
        start_ms: i64,
        end_ms: i64,
    ) -> Self {
        Self {
            display_text: display_text.into(),
            canonical_romaji: canonical_romaji.into(),
            start_ms,
            end_ms,
        }
    }

    pub fn duration_ms(&self) -> i64 {
        self.end_ms - self.start_ms
    }
}

/// A loaded caption track: at least one line, every window non-empty,
/// sorted by start time. Gaps between lines are allowed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LyricTrack {
    title: String,
    lines: Vec<LyricLine>,
}

impl LyricTrack {
    pub fn new(title: impl Into<String>, mut lines: Vec<LyricLine>) -> Result<Self> {
        if lines.is_empty() {
            return Err(Error::DataUnavailable("track has no lines".into()));
        }
        if let Some((idx, line)) = lines
            .iter()
            .enumerate()
            .find(|(_, l)| l.end_ms <= l.start_ms)
        {
            return Err(Error::InvalidTrack(format!(
                "line {} ends at {} ms, not after its start at {} ms",
                idx, line.end_ms, line.start_ms
            )));
        }
        lines.sort_by_key(|l| l.start_ms);
        Ok(Self {
            title: title.into(),
            lines,
        })
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn lines(&self) -> &[LyricLine] {
        &self.lines
    }

    pub fn len(&self) -> usize {
        self.lines.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    /// Start of the first line
    pub fn first_start_ms(&self) -> i64 {
        self.lines.first().map_or(0, |l| l.start_ms)
    }

    /// Index of the first line whose window has not ended at `t`
    pub fn line_index_at(&self, t: i64) -> Option<usize> {
        self.lines.iter().position(|l| t < l.end_ms)
    }
}

/// External video identifier, validated before any player is created.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct VideoId(String);

impl VideoId {
    pub fn parse(raw: &str) -> Result<Self> {
        let id = raw.trim();
        let valid = id.len() >= 6
            && id
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-');
        if valid {
            Ok(Self(id.to_string()))
        } else {
            Err(Error::InvalidVideoId(raw.to_string()))
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for VideoId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
