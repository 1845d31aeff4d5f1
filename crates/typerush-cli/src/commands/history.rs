//! Saved session history.

use std::collections::BTreeMap;

use anyhow::{Context, Result};
use typerush::{GameMode, RecordStore, SessionRecord, daily_bests};

use crate::cli::HistoryArgs;
use crate::render;

const ALL_MODES: [GameMode; 3] = [GameMode::Practice, GameMode::Flash, GameMode::BeatSync];

pub fn run(store: &RecordStore, args: &HistoryArgs) -> Result<()> {
    let modes: Vec<GameMode> = match args.mode {
        Some(mode) => vec![mode],
        None => ALL_MODES.to_vec(),
    };

    if args.clear {
        for mode in modes {
            store
                .clear(mode)
                .with_context(|| format!("Failed to clear {} history", mode))?;
            println!("Cleared {} history", mode);
        }
        return Ok(());
    }

    let mut all: BTreeMap<&'static str, Vec<SessionRecord>> = BTreeMap::new();
    for mode in modes {
        let records = store
            .load(mode)
            .with_context(|| format!("Failed to read {} history", mode))?;
        all.insert(mode.into(), records);
    }

    if args.json {
        println!("{}", serde_json::to_string_pretty(&all)?);
        return Ok(());
    }

    for (mode, records) in &all {
        println!("== {} ({} sessions) ==", mode, records.len());
        if args.daily {
            for best in daily_bests(records) {
                println!("{}  {}", best.date, render::record_row(&best.record));
            }
        } else {
            for record in records.iter().rev().take(args.limit) {
                println!("{}", render::record_row(record));
            }
        }
        println!();
    }
    Ok(())
}
