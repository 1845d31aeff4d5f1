//! File-backed room channel.
//!
//! The room transport runs outside this program. It appends the messages it
//! receives to a feed file, one JSON object per line, and picks up our
//! progress from a second file written the same way.

use std::fs::{self, File, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use tracing::{debug, warn};
use typerush::{ProgressUpdate, RoomState, RosterMessage};

/// Appends room progress messages, one JSON object per line
pub struct ProgressLog {
    file: File,
}

impl ProgressLog {
    pub fn create(path: &Path) -> Result<Self> {
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)
            .with_context(|| format!("Failed to open {}", path.display()))?;
        Ok(Self { file })
    }

    pub fn write(&mut self, update: ProgressUpdate) -> Result<()> {
        let line = RosterMessage::Progress(update).to_json()?;
        writeln!(self.file, "{}", line)?;
        Ok(())
    }
}

/// Reads room messages appended to a feed file.
pub struct RoomFeed {
    path: PathBuf,
    /// Bytes of complete lines already read
    consumed: usize,
    room: Option<RoomState>,
}

impl RoomFeed {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            consumed: 0,
            room: None,
        }
    }

    /// Latest room snapshot seen in the feed
    pub fn room(&self) -> Option<&RoomState> {
        self.room.as_ref()
    }

    /// Messages completed since the last read.
    ///
    /// A missing file has no messages yet. A trailing line without its
    /// newline is left for the next read; lines that do not parse are skipped.
    pub fn read_new(&mut self) -> Result<Vec<RosterMessage>> {
        let text = match fs::read_to_string(&self.path) {
            Ok(text) => text,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => {
                return Err(e).with_context(|| format!("Failed to read {}", self.path.display()));
            }
        };
        if text.len() < self.consumed {
            debug!("Room feed was truncated, reading from the top");
            self.consumed = 0;
        }

        let mut messages = Vec::new();
        for line in text[self.consumed..].split_inclusive('\n') {
            if !line.ends_with('\n') {
                break;
            }
            self.consumed += line.len();
            let line = line.trim();
            if line.is_empty() {
                continue;
            }
            match RosterMessage::from_json(line) {
                Ok(RosterMessage::RoomUpdate(room)) => {
                    self.room = Some(room.clone());
                    messages.push(RosterMessage::RoomUpdate(room));
                }
                Ok(message) => messages.push(message),
                Err(e) => warn!("Skipping room message: {}", e),
            }
        }
        Ok(messages)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;
    use typerush::StartGate;

    const ROOM: &str = r#"{"type":"room_update","data":{"roomId":"r1","players":{"a":{"id":"a","name":"Aki","score":300},"b":{"id":"b","name":"Bo","score":500}}}}"#;

    fn append(path: &Path, text: &str) {
        let mut file = OpenOptions::new().create(true).append(true).open(path).unwrap();
        file.write_all(text.as_bytes()).unwrap();
    }

    #[test]
    fn test_missing_feed_is_empty() {
        let dir = TempDir::new().unwrap();
        let mut feed = RoomFeed::new(dir.path().join("feed.jsonl"));
        assert!(feed.read_new().unwrap().is_empty());
        assert!(feed.room().is_none());
    }

    #[test]
    fn test_reads_only_new_complete_lines() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("feed.jsonl");
        let mut feed = RoomFeed::new(&path);

        append(&path, &format!("{}\n", ROOM));
        append(&path, r#"{"type":"game_started","data":{"startAt":"#);
        let messages = feed.read_new().unwrap();
        assert_eq!(messages.len(), 1);
        let names: Vec<&str> = feed
            .room()
            .unwrap()
            .standings()
            .iter()
            .map(|p| p.name.as_str())
            .collect();
        assert_eq!(names, vec!["Bo", "Aki"]);

        append(&path, "5000}}\nnot json\n");
        let messages = feed.read_new().unwrap();
        assert_eq!(
            messages,
            vec![RosterMessage::GameStarted {
                start_at: Some(5000)
            }]
        );
        assert!(feed.read_new().unwrap().is_empty());
    }

    #[test]
    fn test_start_message_arms_gate() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("feed.jsonl");
        append(&path, "{\"type\":\"game_started\",\"data\":{}}\n");

        let mut feed = RoomFeed::new(&path);
        let mut gate = StartGate::new();
        let armed: Vec<i64> = feed
            .read_new()
            .unwrap()
            .iter()
            .filter_map(|m| gate.on_message(m, 1000))
            .collect();
        assert_eq!(armed, vec![4000]);
        assert!(!gate.poll(3999));
        assert!(gate.poll(4000));
    }

    #[test]
    fn test_progress_log_appends_json_lines() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("progress.jsonl");
        let mut log = ProgressLog::create(&path).unwrap();
        let update = ProgressUpdate {
            score: 200,
            correct_count: 2,
            mistake_count: 1,
            timeouts: None,
        };
        log.write(update).unwrap();
        log.write(update).unwrap();

        let text = fs::read_to_string(&path).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines.len(), 2);
        assert_eq!(
            RosterMessage::from_json(lines[0]).unwrap(),
            RosterMessage::Progress(update)
        );
    }
}
