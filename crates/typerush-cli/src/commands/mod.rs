//! CLI command implementations.
//!
//! Practice and flash share one terminal driver ([`drive`]) through the
//! [`RoundGame`] trait; beat-sync runs its own loop because it also pumps
//! the simulated player.

pub mod beat;
pub mod check;
pub mod flash;
pub mod history;
pub mod practice;

use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result, bail};
use chrono::Utc;
use tracing::{debug, info};
use typerush::prompt::{JsonPromptSource, PromptSource, StaticPrompts};
use typerush::{
    GameConfig, GameMode, Key, MachineEvent, ProgressUpdate, PromptPool, RecordStore, RoomState,
    SessionRecord, SessionStats, StartGate,
};

use crate::cli::{PromptArgs, RoomArgs};
use crate::input::{Input, TerminalSession};
use crate::render;
use crate::room::{ProgressLog, RoomFeed};

/// Redraw and input cadence of the game loops
pub const FRAME: Duration = Duration::from_millis(16);

fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join("typerush").join("config.toml"))
}

/// Settings from `path`, or the per-user config file when it exists.
pub fn load_config(path: Option<&Path>, data_dir: Option<&Path>) -> Result<GameConfig> {
    let config = match path.map(Path::to_path_buf).or_else(default_config_path) {
        Some(path) if path.exists() => GameConfig::load(&path)
            .with_context(|| format!("Failed to load config {}", path.display()))?,
        Some(path) => {
            debug!("No config at {}, using defaults", path.display());
            GameConfig::default()
        }
        None => GameConfig::default(),
    };
    Ok(match data_dir {
        Some(dir) => GameConfig::builder().base(config).storage_dir(dir).build(),
        None => config,
    })
}

pub fn record_store(config: &GameConfig) -> Result<RecordStore> {
    let fallback = dirs::data_dir().map(|dir| dir.join("typerush"));
    match (&config.storage.dir, fallback) {
        (Some(dir), _) => Ok(config.storage.store_or(dir)),
        (None, Some(fallback)) => Ok(config.storage.store_or(fallback)),
        (None, None) => bail!("No data directory found; pass --data-dir"),
    }
}

fn fetch_into(pool: &mut PromptPool, source: &dyn PromptSource) -> Result<()> {
    let count = pool.refresh(source).context("Failed to load prompts")?;
    info!("Loaded {} prompts", count);
    Ok(())
}

/// Prompt pool filled from the source picked on the command line
pub fn load_pool(args: &PromptArgs) -> Result<PromptPool> {
    let mut pool = PromptPool::new(Vec::new());

    #[cfg(feature = "api")]
    if let Some(server) = &args.server {
        fetch_into(&mut pool, &typerush::prompt::HttpPromptSource::new(server.as_str()))?;
        return Ok(pool);
    }

    match &args.prompts {
        Some(path) => fetch_into(&mut pool, &JsonPromptSource::new(path))?,
        None => fetch_into(&mut pool, &StaticPrompts::builtin())?,
    }
    Ok(pool)
}

pub fn epoch_ms() -> i64 {
    Utc::now().timestamp_millis()
}

/// The surface of a round-based session machine the terminal driver needs
pub trait RoundGame {
    const MODE: GameMode;

    fn start(&mut self) -> typerush::Result<Vec<MachineEvent>>;
    fn poll(&mut self) -> Vec<MachineEvent>;
    fn key(&mut self, key: Key) -> Vec<MachineEvent>;
    fn stop(&mut self) -> Vec<MachineEvent>;
    fn stats(&self) -> &SessionStats;
    fn status_line(&self) -> String;
}

/// Where the session stands when [`drive`] returns
pub struct SessionEnd {
    pub record: Option<SessionRecord>,
    /// Last room snapshot from the feed, if any
    pub room: Option<RoomState>,
}

/// Hold until the room start time. Returns `false` if the user quit first.
///
/// The gate is armed from `--start-at` when given, otherwise by the first
/// start announcement in the room feed.
fn wait_for_start(
    session: &mut TerminalSession,
    start_at: Option<i64>,
    mut feed: Option<&mut RoomFeed>,
) -> Result<bool> {
    let mut gate = StartGate::new();
    if let Some(at) = start_at {
        gate.arm(Some(at), epoch_ms());
    }
    loop {
        let now = epoch_ms();
        if let Some(feed) = feed.as_deref_mut() {
            for message in feed.read_new()? {
                if !gate.is_armed()
                    && let Some(at) = gate.on_message(&message, now)
                {
                    info!("Room starts at {}", at);
                }
            }
        }
        if gate.poll(now) {
            return Ok(true);
        }
        let line = match gate.remaining_ms(now) {
            Some(remaining) => format!("Room starts in {}", render::clock(remaining)),
            None => "Waiting for the room to start...".to_string(),
        };
        render::status(&line)?;
        // Keys pressed before the start are dropped
        session.next_frame();
        if session.is_quitting() {
            return Ok(false);
        }
    }
}

/// Run a practice or flash session in the terminal until it finishes or
/// the user quits. Quitting ends the session early, so its record is kept.
pub fn drive<G: RoundGame>(game: &mut G, room: &RoomArgs) -> Result<SessionEnd> {
    let mut session = TerminalSession::open(FRAME)?;
    let mut progress = room
        .progress_out
        .as_deref()
        .map(ProgressLog::create)
        .transpose()?;
    let mut feed = room.room_feed.as_deref().map(RoomFeed::new);

    if (room.start_at.is_some() || feed.is_some())
        && !wait_for_start(&mut session, room.start_at, feed.as_mut())?
    {
        return Ok(SessionEnd {
            record: None,
            room: feed.and_then(|feed| feed.room().cloned()),
        });
    }

    let mut pending = game.start()?;
    let mut record = None;
    loop {
        for event in pending.drain(..) {
            match event {
                MachineEvent::RoundFinished { outcome, points } => {
                    render::message(&render::outcome(&outcome, points))?;
                    if let Some(log) = progress.as_mut() {
                        log.write(ProgressUpdate::from_stats(game.stats(), G::MODE))?;
                    }
                }
                MachineEvent::SessionFinished(finished) => record = Some(finished),
                other => debug!("{:?}", other),
            }
        }
        if record.is_some() {
            break;
        }
        if session.is_quitting() {
            pending.extend(game.stop());
            if pending.is_empty() {
                break;
            }
            continue;
        }

        render::status(&game.status_line())?;
        for input in session.next_frame() {
            if let Input::Key(key) = input {
                pending.extend(game.key(key));
            }
        }
        if !session.is_quitting() {
            pending.extend(game.poll());
        }
        if let Some(feed) = feed.as_mut() {
            feed.read_new()?;
        }
    }
    render::message("")?;
    Ok(SessionEnd {
        record,
        room: feed.and_then(|feed| feed.room().cloned()),
    })
}

/// Room standings, best first (raw mode is off by now)
pub fn print_standings(room: &RoomState) {
    println!("Room {}:", room.room_id);
    for (rank, player) in room.standings().iter().enumerate() {
        println!(
            "  {}. {:<16} {:>6} pts  {:>3} solved  {:>3} miss",
            rank + 1,
            player.name,
            player.score,
            player.correct_count,
            player.mistake_count
        );
    }
}

/// Print the end-of-session summary (raw mode is off by now)
pub fn print_summary(record: Option<&SessionRecord>) {
    match record {
        Some(record) => {
            for line in render::summary(record) {
                println!("{}", line);
            }
        }
        None => println!("No session recorded."),
    }
}
