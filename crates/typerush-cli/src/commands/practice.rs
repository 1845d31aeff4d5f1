//! Timed practice session.

use anyhow::Result;
use typerush::{
    GameConfig, GameMode, Key, MachineEvent, PickMode, PracticeSessionMachine, RecordStore,
    RoundPhase, SessionStats, WallClock,
};

use super::RoundGame;
use crate::cli::PracticeArgs;
use crate::render;

pub fn run(config: &GameConfig, store: RecordStore, args: &PracticeArgs) -> Result<()> {
    let mut practice = config.practice.clone();
    if let Some(difficulty) = args.difficulty {
        practice = practice.difficulty(difficulty);
    }
    if let Some(secs) = args.secs {
        practice = practice.session_ms(secs.saturating_mul(1000));
    }
    if args.adaptive {
        practice = practice.pick(PickMode::Adaptive);
    }
    if args.no_limit {
        practice = practice.round_limit(false);
    }

    let pool = super::load_pool(&args.prompts)?;
    let mut machine =
        PracticeSessionMachine::new(WallClock::new(), pool, practice, config.scoring.clone())
            .with_store(store);

    println!(
        "Practice ({}). Type the romaji, Esc skips, F4 resets, Ctrl+C quits.",
        machine.config().difficulty
    );
    let end = super::drive(&mut machine, &args.room)?;
    super::print_summary(end.record.as_ref());
    if let Some(room) = &end.room {
        super::print_standings(room);
    }
    Ok(())
}

impl RoundGame for PracticeSessionMachine<WallClock> {
    const MODE: GameMode = GameMode::Practice;

    fn start(&mut self) -> typerush::Result<Vec<MachineEvent>> {
        PracticeSessionMachine::start(self)
    }

    fn poll(&mut self) -> Vec<MachineEvent> {
        PracticeSessionMachine::poll(self)
    }

    fn key(&mut self, key: Key) -> Vec<MachineEvent> {
        PracticeSessionMachine::key(self, key)
    }

    fn stop(&mut self) -> Vec<MachineEvent> {
        PracticeSessionMachine::stop(self)
    }

    fn stats(&self) -> &SessionStats {
        PracticeSessionMachine::stats(self)
    }

    fn status_line(&self) -> String {
        let session = self
            .session_remaining_ms()
            .map(|ms| format!("[{}] ", render::clock(ms)))
            .unwrap_or_default();
        let score = format!("{} pts", self.stats().points);
        match self.phase() {
            RoundPhase::Idle => format!("Press Space to start  {}", score),
            RoundPhase::Countdown { remaining } => format!("{}Starting in {}...", session, remaining),
            RoundPhase::Active => {
                let (Some(prompt), Some(state)) = (self.current_prompt(), self.round_state()) else {
                    return format!("{}{}", session, score);
                };
                let limit = self
                    .round_remaining_ms()
                    .map(|ms| format!("  ({})", render::clock(ms)))
                    .unwrap_or_default();
                let highlight = state.highlight();
                format!(
                    "{}{}  {} {}{}  {}",
                    session,
                    prompt.display_text,
                    render::highlight(&highlight),
                    render::typed_progress(&highlight, 10),
                    limit,
                    score
                )
            }
            _ => format!("{}{}", session, score),
        }
    }
}
