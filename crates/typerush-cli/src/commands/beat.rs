//! Beat-sync run against a simulated player.
//!
//! There is no real video here: a [`SimulatedPlayer`] plays a silent
//! timeline as long as the track, so the engine sees the same seeks,
//! state changes and end-of-video it would get from an embedded player.

use anyhow::{Context, Result, bail};
use tracing::{debug, info};
use typerush::prompt::{JsonLyricSource, LyricSource};
use typerush::round::{OutcomeKind, OutcomeSource};
use typerush::{
    BeatEvent, BeatPhase, BeatSyncEngine, GameConfig, LyricTrack, PollKind, RecordStore, VideoId,
};

use super::FRAME;
use crate::cli::BeatArgs;
use crate::input::{Input, TerminalSession};
use crate::player::SimulatedPlayer;
use crate::render;

/// Silence after the last line before the video ends
const TAIL_MS: i64 = 2000;

/// Id used for a single track file whose name is not a usable id
const LOCAL_VIDEO_ID: &str = "local-track";

type Engine = BeatSyncEngine<SimulatedPlayer>;

fn fetch_track(args: &BeatArgs) -> Result<LyricTrack> {
    #[cfg(feature = "api")]
    if let Some(server) = &args.server {
        let id = VideoId::parse(args.video.as_deref().unwrap_or_default())?;
        return typerush::prompt::HttpLyricSource::new(server.as_str())
            .fetch_track(&id)
            .with_context(|| format!("Failed to fetch captions for {}", id));
    }

    let Some(path) = &args.track else {
        bail!("Pass --track with a caption file or directory");
    };
    let id = match &args.video {
        Some(raw) => VideoId::parse(raw)?,
        None if path.is_dir() => bail!("--video is required with a track directory"),
        None => path
            .file_stem()
            .and_then(|stem| VideoId::parse(&stem.to_string_lossy()).ok())
            .map_or_else(|| VideoId::parse(LOCAL_VIDEO_ID), Ok)?,
    };
    JsonLyricSource::new(path)
        .fetch_track(&id)
        .with_context(|| format!("Failed to load track {} from {}", id, path.display()))
}

pub fn run(config: &GameConfig, store: RecordStore, args: &BeatArgs) -> Result<()> {
    let track = fetch_track(args)?;
    info!("Loaded \"{}\" ({} lines)", track.title(), track.len());

    let mut beat = config.beat.clone();
    if let Some(offset) = args.offset {
        beat = beat.offset_ms(offset);
    }
    if let Some(lives) = args.lives {
        beat = beat.max_misses(lives);
    }
    if let Some(difficulty) = args.difficulty {
        beat = beat.difficulty(difficulty);
    }
    let nudge_ms = beat.nudge_ms;

    let duration_ms = track.lines().last().map_or(0, |line| line.end_ms) + TAIL_MS;
    let player = SimulatedPlayer::new(duration_ms);
    let mut engine: Engine =
        BeatSyncEngine::new(player, beat, config.scoring.clone()).with_store(store);

    println!(
        "{}: Space starts and skips, Up/Down shifts timing, F4 resets, Ctrl+C quits.",
        track.title()
    );
    let mut pending = engine.load_track(track);

    let mut session = TerminalSession::open(FRAME)?;
    loop {
        for event in engine.clock_mut().player_mut().drain_events() {
            pending.extend(engine.on_player_event(event));
        }
        for input in session.next_frame() {
            match input {
                Input::Key(key) => pending.extend(engine.key(key)),
                Input::Nudge(step) => {
                    let offset = engine.nudge_offset(step * nudge_ms);
                    render::message(&format!("Offset {:+} ms", offset))?;
                }
                Input::Quit => {}
            }
        }
        if session.is_quitting() {
            // An interrupted run still gets its record
            pending.extend(engine.stop());
        } else {
            pending.extend(engine.tick(PollKind::Primary));
            pending.extend(engine.tick(PollKind::Fallback));
        }

        for event in pending.drain(..) {
            show(&engine, event)?;
        }
        if session.is_quitting() {
            break;
        }
        render::status(&status_line(&engine))?;
    }
    drop(session);
    println!();

    super::print_summary(engine.last_record());
    Ok(())
}

fn show(engine: &Engine, event: BeatEvent) -> Result<()> {
    match event {
        BeatEvent::LineFinished { outcome, points } => {
            let line = match (engine.track(), outcome.source) {
                (Some(track), OutcomeSource::Line(i)) => track
                    .lines()
                    .get(i)
                    .map_or("", |line| line.display_text.as_str()),
                _ => "",
            };
            let text = match outcome.kind {
                OutcomeKind::Skipped => render::outcome(&outcome, points),
                _ => format!("{}  {}", render::outcome(&outcome, points), line),
            };
            render::message(&text)?;
        }
        BeatEvent::SessionFinished(record) => render::message(&format!(
            "Run over: {} pts, {} of {} lines",
            record.points,
            record.solved,
            engine.track().map_or(0, LyricTrack::len)
        ))?,
        BeatEvent::PhaseChanged {
            to: BeatPhase::Dead,
            ..
        } => render::message("Too many missed lines. Space to retry.")?,
        BeatEvent::Seeked { to_ms } => debug!("Seeked to {}", render::clock(to_ms)),
        other => debug!("{:?}", other),
    }
    Ok(())
}

fn status_line(engine: &Engine) -> String {
    let lives = engine
        .lives_left()
        .map(|left| format!("{} ", render::lives(left, engine.config().max_misses)))
        .unwrap_or_default();
    let header = format!(
        "{}{} pts [{}] ",
        lives,
        engine.stats().points,
        render::clock(engine.adjusted_ms())
    );
    match engine.phase() {
        BeatPhase::Idle => "No track loaded".to_string(),
        BeatPhase::Ready => format!("{}Press Space to start", header),
        BeatPhase::Waiting => format!("{}Intro... Space skips ahead", header),
        BeatPhase::Countdown { remaining_ms } => {
            format!("{}Get ready {}", header, render::clock(remaining_ms))
        }
        BeatPhase::Active => match (engine.current_line(), engine.line_state()) {
            (Some(line), Some(_)) if engine.is_locked() => {
                format!("{}{}  (done, wait for the next line)", header, line.display_text)
            }
            (Some(line), Some(state)) => format!(
                "{}{}  {}",
                header,
                line.display_text,
                render::highlight(&state.highlight())
            ),
            _ => header,
        },
        BeatPhase::Cleared => format!("{}Cleared! Space to play again", header),
        BeatPhase::Dead => format!("{}Failed. Space to retry", header),
    }
}
