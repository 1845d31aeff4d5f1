//! Terminal output.
//!
//! Raw mode is on while a game runs, so every line written here ends in
//! `\r\n` and the status line is redrawn in place.

use std::io::{self, Write};

use chrono::Local;
use crossterm::cursor::MoveToColumn;
use crossterm::queue;
use crossterm::style::Print;
use crossterm::terminal::{Clear, ClearType};
use owo_colors::OwoColorize;
use typerush::romaji::Highlight;
use typerush::round::OutcomeKind;
use typerush::score::progress_ratio;
use typerush::{RoundOutcome, SessionRecord};

/// Redraw the status line in place.
pub fn status(line: &str) -> io::Result<()> {
    let mut out = io::stdout();
    queue!(out, MoveToColumn(0), Clear(ClearType::CurrentLine), Print(line))?;
    out.flush()
}

/// Print a line above the status line.
pub fn message(line: &str) -> io::Result<()> {
    let mut out = io::stdout();
    queue!(
        out,
        MoveToColumn(0),
        Clear(ClearType::CurrentLine),
        Print(line),
        Print("\r\n")
    )?;
    out.flush()
}

/// Typed part green, next character underlined (red after a wrong key), rest dimmed.
pub fn highlight(h: &Highlight) -> String {
    let next = h.next_char.map(String::from).unwrap_or_default();
    let next = if h.is_mismatch {
        next.red().bold().to_string()
    } else {
        next.yellow().underline().to_string()
    };
    format!("{}{}{}", h.matched.green(), next, h.remainder.dimmed())
}

/// Bar showing how much of the closest spelling is typed
pub fn typed_progress(h: &Highlight, width: usize) -> String {
    let matched = h.matched.chars().count();
    let total = matched + usize::from(h.next_char.is_some()) + h.remainder.chars().count();
    let filled = (progress_ratio(matched, total) * width as f64).round() as usize;
    let filled = filled.min(width);
    format!("{}{}", "▰".repeat(filled).cyan(), "▱".repeat(width - filled).dimmed())
}

/// `m:ss`, rounding up so a countdown shows 0:00 only when it is over
pub fn clock(ms: i64) -> String {
    let secs = (ms.max(0) + 999) / 1000;
    format!("{}:{:02}", secs / 60, secs % 60)
}

pub fn outcome(outcome: &RoundOutcome, points: i64) -> String {
    match outcome.kind {
        OutcomeKind::Solved => format!(
            "{} +{} ({} mistakes, {:.1}s)",
            "solved".green(),
            points,
            outcome.mistakes,
            outcome.elapsed_ms as f64 / 1000.0
        ),
        OutcomeKind::TimedOut => format!("{} {:+}", "timed out".red(), points),
        OutcomeKind::Skipped => format!("{}", "skipped".dimmed()),
    }
}

/// Lives as filled and empty hearts
pub fn lives(left: u32, max: u32) -> String {
    let filled = left.min(max) as usize;
    format!(
        "{}{}",
        "♥".repeat(filled).red(),
        "♡".repeat(max as usize - filled).dimmed()
    )
}

/// Multi-line summary printed after a session
pub fn summary(record: &SessionRecord) -> Vec<String> {
    vec![
        format!(
            "{} {} session, {}",
            "Finished".bold(),
            record.mode,
            record.difficulty
        ),
        format!("  points    {}", record.points.bold()),
        format!(
            "  solved    {}  timed out {}  skipped {}",
            record.solved, record.timed_out, record.skipped
        ),
        format!("  mistakes  {}", record.total_mistakes),
        format!(
            "  speed     {:.1} wpm  accuracy {:.1}%",
            record.wpm, record.accuracy
        ),
        format!("  duration  {}", clock(record.duration_ms())),
    ]
}

/// One line of history
pub fn record_row(record: &SessionRecord) -> String {
    format!(
        "{}  {:<6}  {:>6} pts  {:>3} solved  {:>3} miss  {:>5.1} wpm  {:>5.1}%",
        record.started_at.with_timezone(&Local).format("%Y-%m-%d %H:%M"),
        record.difficulty.label(),
        record.points,
        record.solved,
        record.total_mistakes,
        record.wpm,
        record.accuracy
    )
}
