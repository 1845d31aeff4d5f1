use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};
use typerush::romaji::DEFAULT_VARIANT_CAP;
use typerush::{Difficulty, GameMode};

#[derive(Parser)]
#[command(name = "typerush")]
#[command(version, about = "Romaji typing trainer", long_about = None)]
pub struct Cli {
    /// Settings file (TOML)
    #[arg(short, long, global = true, env = "TYPERUSH_CONFIG")]
    pub config: Option<PathBuf>,

    /// Directory for session history
    #[arg(long, global = true, env = "TYPERUSH_DATA_DIR")]
    pub data_dir: Option<PathBuf>,

    /// Debug logging to stderr
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// Timed practice: type prompts one after another
    Practice(PracticeArgs),
    /// Memorize the prompt, then type it from memory
    Flash(FlashArgs),
    /// Type lyric lines in time with a video
    Beat(BeatArgs),
    /// Show saved sessions
    History(HistoryArgs),
    /// Check an input against a romaji spelling
    Check(CheckArgs),
}

/// Where prompts come from
#[derive(Args, Clone, Default)]
pub struct PromptArgs {
    /// JSON file with a prompt array (built-in prompts when omitted)
    #[arg(long)]
    pub prompts: Option<PathBuf>,

    /// Fetch prompts from a server instead
    #[cfg(feature = "api")]
    #[arg(long, env = "TYPERUSH_SERVER", conflicts_with = "prompts")]
    pub server: Option<String>,
}

/// Shared-room start and progress reporting
#[derive(Args, Clone, Default)]
pub struct RoomArgs {
    /// Start at this epoch time in milliseconds
    #[arg(long, value_name = "EPOCH_MS")]
    pub start_at: Option<i64>,

    /// Append a progress message (JSON line) after every round
    #[arg(long, value_name = "FILE")]
    pub progress_out: Option<PathBuf>,

    /// Read room messages (JSON lines); the session starts on the announced start
    #[arg(long, value_name = "FILE")]
    pub room_feed: Option<PathBuf>,
}

#[derive(Args)]
pub struct PracticeArgs {
    #[arg(short, long)]
    pub difficulty: Option<Difficulty>,

    /// Session length in seconds, 0 for untimed
    #[arg(short, long)]
    pub secs: Option<i64>,

    /// Pick prompts near the adaptive difficulty target
    #[arg(long)]
    pub adaptive: bool,

    /// No per-prompt time limit
    #[arg(long)]
    pub no_limit: bool,

    #[command(flatten)]
    pub prompts: PromptArgs,

    #[command(flatten)]
    pub room: RoomArgs,
}

#[derive(Args)]
pub struct FlashArgs {
    /// Timeouts allowed before the session ends
    #[arg(short, long)]
    pub lives: Option<u32>,

    /// Session length in seconds, 0 for untimed
    #[arg(short, long)]
    pub secs: Option<i64>,

    #[command(flatten)]
    pub prompts: PromptArgs,

    #[command(flatten)]
    pub room: RoomArgs,
}

#[derive(Args)]
pub struct BeatArgs {
    /// Caption track: a JSON file, or a directory of `<video id>.json` files
    #[arg(long, value_name = "PATH")]
    pub track: Option<PathBuf>,

    /// Video id (defaults to the track file name)
    #[arg(long)]
    pub video: Option<String>,

    /// Calibration offset in milliseconds
    #[arg(long, allow_hyphen_values = true)]
    pub offset: Option<i64>,

    /// Missed lines allowed before the run fails, 0 for unlimited
    #[arg(short, long)]
    pub lives: Option<u32>,

    /// Difficulty recorded with the run
    #[arg(short, long)]
    pub difficulty: Option<Difficulty>,

    /// Fetch captions from a server instead
    #[cfg(feature = "api")]
    #[arg(long, env = "TYPERUSH_SERVER", requires = "video", conflicts_with = "track")]
    pub server: Option<String>,
}

#[derive(Args)]
pub struct HistoryArgs {
    /// Only this mode (practice, flash, beat)
    #[arg(short, long)]
    pub mode: Option<GameMode>,

    /// Best session per day instead of the session list
    #[arg(long)]
    pub daily: bool,

    /// Print records as JSON
    #[arg(long, conflicts_with = "daily")]
    pub json: bool,

    /// Most recent sessions shown
    #[arg(short = 'n', long, default_value_t = 20)]
    pub limit: usize,

    /// Delete the history
    #[arg(long, conflicts_with_all = ["daily", "json"])]
    pub clear: bool,
}

#[derive(Args)]
pub struct CheckArgs {
    /// Canonical romaji spelling
    pub canonical: String,

    /// Input typed so far
    pub input: Option<String>,

    /// List every accepted spelling
    #[arg(long)]
    pub variants: bool,

    /// Most spellings expanded
    #[arg(long, default_value_t = DEFAULT_VARIANT_CAP)]
    pub cap: usize,
}
