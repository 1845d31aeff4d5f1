//! Message shapes for a shared multiplayer room.
//!
//! The transport lives elsewhere; this module only describes what goes over
//! it and holds the [`StartGate`] that turns a "game started" announcement
//! into a local start at the announced instant. All timestamps are wall
//! milliseconds since the Unix epoch.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::Result;
use crate::score::{Difficulty, GameMode, SessionStats};

/// Start delay used when a start announcement carries no timestamp
pub const FALLBACK_START_DELAY_MS: i64 = 3000;

/// Running totals published to the room after each round
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProgressUpdate {
    pub score: i64,
    pub correct_count: u32,
    pub mistake_count: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timeouts: Option<u32>,
}

impl ProgressUpdate {
    /// Timeouts are only reported by modes with lives
    pub fn from_stats(stats: &SessionStats, mode: GameMode) -> Self {
        Self {
            score: stats.points,
            correct_count: stats.solved_count,
            mistake_count: stats.total_mistakes,
            timeouts: (mode != GameMode::Practice).then_some(stats.timed_out_count),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RosterPlayer {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub score: i64,
    #[serde(default)]
    pub correct_count: u32,
    #[serde(default)]
    pub mistake_count: u32,
    #[serde(default)]
    pub timeouts: Option<u32>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RoomState {
    pub room_id: String,
    #[serde(default)]
    pub is_started: bool,
    #[serde(default)]
    pub players: BTreeMap<String, RosterPlayer>,
    #[serde(default)]
    pub difficulty: Option<String>,
}

impl RoomState {
    /// Room difficulty, if it names one we know
    pub fn difficulty(&self) -> Option<Difficulty> {
        self.difficulty.as_deref()?.parse().ok()
    }

    /// Players by score, fewer mistakes breaking ties
    pub fn standings(&self) -> Vec<&RosterPlayer> {
        let mut players: Vec<&RosterPlayer> = self.players.values().collect();
        players.sort_by(|a, b| {
            b.score
                .cmp(&a.score)
                .then(a.mistake_count.cmp(&b.mistake_count))
                .then_with(|| a.name.cmp(&b.name))
        });
        players
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "data", rename_all = "snake_case")]
pub enum RosterMessage {
    /// Outbound
    Progress(ProgressUpdate),
    RoomUpdate(RoomState),
    GameStarted {
        #[serde(default, rename = "startAt")]
        start_at: Option<i64>,
    },
}

impl RosterMessage {
    pub fn from_json(text: &str) -> Result<Self> {
        Ok(serde_json::from_str(text)?)
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }
}

/// Fires a local start once an announced start time is reached.
#[derive(Debug, Clone, Default)]
pub struct StartGate {
    start_at: Option<i64>,
    fired: bool,
}

impl StartGate {
    pub fn new() -> Self {
        Self::default()
    }

    /// Arm for `start_at`, or a short delay from `now_ms` when none was given.
    /// Returns the instant the gate will open.
    pub fn arm(&mut self, start_at: Option<i64>, now_ms: i64) -> i64 {
        let at = start_at.unwrap_or(now_ms + FALLBACK_START_DELAY_MS);
        debug!("Start gate armed for {} ({} ms away)", at, at - now_ms);
        self.start_at = Some(at);
        self.fired = false;
        at
    }

    /// Arm from a room message; other messages are ignored.
    pub fn on_message(&mut self, message: &RosterMessage, now_ms: i64) -> Option<i64> {
        match message {
            RosterMessage::GameStarted { start_at } => Some(self.arm(*start_at, now_ms)),
            _ => None,
        }
    }

    /// True exactly once, on the first poll at or after the start time
    pub fn poll(&mut self, now_ms: i64) -> bool {
        match self.start_at {
            Some(at) if !self.fired && now_ms >= at => {
                self.fired = true;
                true
            }
            _ => false,
        }
    }

    pub fn remaining_ms(&self, now_ms: i64) -> Option<i64> {
        if self.fired {
            return None;
        }
        self.start_at.map(|at| (at - now_ms).max(0))
    }

    pub fn is_armed(&self) -> bool {
        self.start_at.is_some() && !self.fired
    }

    pub fn disarm(&mut self) {
        self.start_at = None;
        self.fired = false;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_progress_from_stats() {
        let stats = SessionStats {
            solved_count: 4,
            total_mistakes: 2,
            timed_out_count: 1,
            points: 400,
            ..Default::default()
        };
        let flash = ProgressUpdate::from_stats(&stats, GameMode::Flash);
        let json = serde_json::to_value(flash).unwrap();
        assert_eq!(json["score"], 400);
        assert_eq!(json["correctCount"], 4);
        assert_eq!(json["mistakeCount"], 2);
        assert_eq!(json["timeouts"], 1);

        let practice = ProgressUpdate::from_stats(&stats, GameMode::Practice);
        let json = serde_json::to_value(practice).unwrap();
        assert!(json.get("timeouts").is_none());
    }

    #[test]
    fn test_room_update_standings() {
        let text = r#"{
            "type": "room_update",
            "data": {
                "roomId": "r1",
                "isStarted": false,
                "difficulty": "hard",
                "players": {
                    "a": {"id": "a", "name": "Aoi", "score": 300, "correctCount": 3, "mistakeCount": 4},
                    "b": {"id": "b", "name": "Ren", "score": 300, "correctCount": 3, "mistakeCount": 1},
                    "c": {"id": "c", "name": "Sora", "score": 500, "correctCount": 5, "mistakeCount": 0}
                }
            }
        }"#;
        let RosterMessage::RoomUpdate(room) = RosterMessage::from_json(text).unwrap() else {
            panic!("expected a room update");
        };
        assert_eq!(room.difficulty(), Some(Difficulty::Hard));
        let names: Vec<&str> = room.standings().iter().map(|p| p.name.as_str()).collect();
        assert_eq!(names, vec!["Sora", "Ren", "Aoi"]);
    }

    #[test]
    fn test_gate_fires_once_at_announced_time() {
        let mut gate = StartGate::new();
        let message = RosterMessage::from_json(r#"{"type":"game_started","data":{"startAt":10000}}"#)
            .unwrap();
        assert_eq!(gate.on_message(&message, 8000), Some(10_000));
        assert_eq!(gate.remaining_ms(8000), Some(2000));
        assert!(!gate.poll(9999));
        assert!(gate.poll(10_050));
        assert!(!gate.poll(10_100));
        assert!(!gate.is_armed());
    }

    #[test]
    fn test_gate_falls_back_without_timestamp() {
        let mut gate = StartGate::new();
        let message = RosterMessage::from_json(r#"{"type":"game_started","data":{}}"#).unwrap();
        assert_eq!(gate.on_message(&message, 1000), Some(4000));
        gate.disarm();
        assert!(!gate.poll(5000));
    }

    #[test]
    fn test_outbound_progress_json() {
        let message = RosterMessage::Progress(ProgressUpdate {
            score: 100,
            correct_count: 1,
            mistake_count: 0,
            timeouts: None,
        });
        let json: serde_json::Value = serde_json::from_str(&message.to_json().unwrap()).unwrap();
        assert_eq!(json["type"], "progress");
        assert_eq!(json["data"]["correctCount"], 1);
    }
}
