//! Game settings loaded from a TOML file.
//!
//! Every section and field is optional; anything left out keeps its default.
//!
//! ```toml
//! [practice]
//! session_ms = 60000
//! difficulty = "hard"
//!
//! [flash]
//! max_timeouts = 5
//!
//! [beat]
//! offset_ms = -120
//!
//! [storage]
//! dir = "/home/me/.local/share/typerush"
//! ```

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::beat::BeatConfig;
use crate::error::{Error, Result};
use crate::flash::FlashConfig;
use crate::practice::PracticeConfig;
use crate::score::ScoringRules;
use crate::storage::{DEFAULT_RECORD_CAP, RecordStore};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// Record directory; the front end picks one when unset
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dir: Option<PathBuf>,
    /// Records kept per mode
    pub cap: usize,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            dir: None,
            cap: DEFAULT_RECORD_CAP,
        }
    }
}

impl StorageConfig {
    /// Record store under the configured directory, or `fallback_dir`
    pub fn store_or(&self, fallback_dir: impl AsRef<Path>) -> RecordStore {
        let dir = self
            .dir
            .clone()
            .unwrap_or_else(|| fallback_dir.as_ref().to_path_buf());
        RecordStore::new(dir).with_cap(self.cap)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GameConfig {
    pub practice: PracticeConfig,
    pub flash: FlashConfig,
    pub beat: BeatConfig,
    pub scoring: ScoringRules,
    pub storage: StorageConfig,
}

impl GameConfig {
    pub fn builder() -> GameConfigBuilder {
        GameConfigBuilder::default()
    }

    /// Parse a TOML document
    pub fn from_toml(content: &str) -> Result<Self> {
        toml::from_str(content).map_err(|e| Error::Config(e.to_string()))
    }

    /// Read `path`. A missing file gives the defaults.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = match fs::read_to_string(path) {
            Ok(c) => c,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                warn!("Config {} not found, using defaults", path.display());
                return Ok(Self::default());
            }
            Err(e) => return Err(e.into()),
        };
        let config: Self = toml::from_str(&content)
            .map_err(|e| Error::Config(format!("{}: {}", path.display(), e)))?;
        debug!("Loaded config from {}", path.display());
        Ok(config)
    }

    pub fn to_toml(&self) -> Result<String> {
        toml::to_string_pretty(self).map_err(|e| Error::Config(e.to_string()))
    }
}

/// Overrides applied on top of a base configuration
#[derive(Debug, Clone, Default)]
pub struct GameConfigBuilder {
    base: Option<GameConfig>,
    practice: Option<PracticeConfig>,
    flash: Option<FlashConfig>,
    beat: Option<BeatConfig>,
    scoring: Option<ScoringRules>,
    storage_dir: Option<PathBuf>,
}

impl GameConfigBuilder {
    /// Start from a loaded config instead of the defaults
    pub fn base(mut self, config: GameConfig) -> Self {
        self.base = Some(config);
        self
    }

    pub fn practice(mut self, practice: PracticeConfig) -> Self {
        self.practice = Some(practice);
        self
    }

    pub fn flash(mut self, flash: FlashConfig) -> Self {
        self.flash = Some(flash);
        self
    }

    pub fn beat(mut self, beat: BeatConfig) -> Self {
        self.beat = Some(beat);
        self
    }

    pub fn scoring(mut self, scoring: ScoringRules) -> Self {
        self.scoring = Some(scoring);
        self
    }

    pub fn storage_dir<P: Into<PathBuf>>(mut self, dir: P) -> Self {
        self.storage_dir = Some(dir.into());
        self
    }

    pub fn build(self) -> GameConfig {
        let base = self.base.unwrap_or_default();
        GameConfig {
            practice: self.practice.unwrap_or(base.practice),
            flash: self.flash.unwrap_or(base.flash),
            beat: self.beat.unwrap_or(base.beat),
            scoring: self.scoring.unwrap_or(base.scoring),
            storage: StorageConfig {
                dir: self.storage_dir.or(base.storage.dir),
                cap: base.storage.cap,
            },
        }
    }
}
