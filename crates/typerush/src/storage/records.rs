use std::fs;
use std::path::{Path, PathBuf};

use tracing::{debug, info, warn};

use crate::error::Result;
use crate::score::{GameMode, SessionRecord};

/// Default number of records kept per mode
pub const DEFAULT_RECORD_CAP: usize = 200;

/// Session history, one JSON array per mode under a base directory.
///
/// Every append rewrites the whole file, keeping only the newest `cap` records.
#[derive(Debug, Clone)]
pub struct RecordStore {
    base_dir: PathBuf,
    cap: usize,
}

impl RecordStore {
    pub fn new<P: AsRef<Path>>(base_dir: P) -> Self {
        Self {
            base_dir: base_dir.as_ref().to_path_buf(),
            cap: DEFAULT_RECORD_CAP,
        }
    }

    pub fn with_cap(mut self, cap: usize) -> Self {
        self.cap = cap.max(1);
        self
    }

    pub fn cap(&self) -> usize {
        self.cap
    }

    pub fn base_dir(&self) -> &Path {
        &self.base_dir
    }

    pub fn path_for(&self, mode: GameMode) -> PathBuf {
        self.base_dir.join(format!("{}.json", mode.record_key()))
    }

    /// Read a mode's history, oldest first. A missing file is an empty history.
    pub fn load(&self, mode: GameMode) -> Result<Vec<SessionRecord>> {
        let path = self.path_for(mode);
        let content = match fs::read_to_string(&path) {
            Ok(c) => c,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!("No history at {}", path.display());
                return Ok(Vec::new());
            }
            Err(e) => return Err(e.into()),
        };
        let records: Vec<SessionRecord> = serde_json::from_str(&content)?;
        debug!("Loaded {} records from {}", records.len(), path.display());
        Ok(records)
    }

    /// Append one record and rewrite the file. Returns the stored count.
    pub fn append(&self, record: &SessionRecord) -> Result<usize> {
        let mut records = match self.load(record.mode) {
            Ok(r) => r,
            Err(e) => {
                warn!("Discarding unreadable history for {}: {}", record.mode, e);
                Vec::new()
            }
        };
        records.push(record.clone());
        if records.len() > self.cap {
            let excess = records.len() - self.cap;
            records.drain(..excess);
        }

        fs::create_dir_all(&self.base_dir)?;
        let path = self.path_for(record.mode);
        let content = serde_json::to_string_pretty(&records)?;
        fs::write(&path, content)?;
        info!("Saved {} record ({} stored)", record.mode, records.len());
        Ok(records.len())
    }

    /// Remove a mode's history file
    pub fn clear(&self, mode: GameMode) -> Result<()> {
        match fs::remove_file(self.path_for(mode)) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::score::{Difficulty, SessionStats};
    use chrono::{Duration, TimeZone, Utc};
    use tempfile::tempdir;

    fn record(mode: GameMode, points: i64) -> SessionRecord {
        let start = Utc.with_ymd_and_hms(2026, 1, 10, 8, 0, 0).unwrap();
        let stats = SessionStats {
            solved_count: 1,
            points,
            ..Default::default()
        };
        SessionRecord::from_stats(mode, Difficulty::Normal, start, start + Duration::seconds(60), &stats)
    }

    #[test]
    fn test_load_missing_is_empty() {
        let dir = tempdir().unwrap();
        let store = RecordStore::new(dir.path());
        assert!(store.load(GameMode::Practice).unwrap().is_empty());
    }

    #[test]
    fn test_append_and_load() {
        let dir = tempdir().unwrap();
        let store = RecordStore::new(dir.path().join("nested"));
        assert_eq!(store.append(&record(GameMode::Practice, 100)).unwrap(), 1);
        assert_eq!(store.append(&record(GameMode::Practice, 200)).unwrap(), 2);
        assert_eq!(store.append(&record(GameMode::Flash, 300)).unwrap(), 1);

        let practice = store.load(GameMode::Practice).unwrap();
        assert_eq!(practice.iter().map(|r| r.points).collect::<Vec<_>>(), vec![100, 200]);
        assert!(store.path_for(GameMode::Flash).ends_with("typing-flash-sessions.json"));
    }

    #[test]
    fn test_append_keeps_newest_within_cap() {
        let dir = tempdir().unwrap();
        let store = RecordStore::new(dir.path()).with_cap(3);
        for points in 1..=5 {
            store.append(&record(GameMode::Flash, points)).unwrap();
        }
        let kept = store.load(GameMode::Flash).unwrap();
        assert_eq!(kept.iter().map(|r| r.points).collect::<Vec<_>>(), vec![3, 4, 5]);
    }

    #[test]
    fn test_corrupt_history_is_replaced() {
        let dir = tempdir().unwrap();
        let store = RecordStore::new(dir.path());
        fs::write(store.path_for(GameMode::Practice), "not json").unwrap();
        assert!(store.load(GameMode::Practice).is_err());
        assert_eq!(store.append(&record(GameMode::Practice, 50)).unwrap(), 1);
    }

    #[test]
    fn test_clear() {
        let dir = tempdir().unwrap();
        let store = RecordStore::new(dir.path());
        store.clear(GameMode::Practice).unwrap();
        store.append(&record(GameMode::Practice, 1)).unwrap();
        store.clear(GameMode::Practice).unwrap();
        assert!(store.load(GameMode::Practice).unwrap().is_empty());
    }
}
