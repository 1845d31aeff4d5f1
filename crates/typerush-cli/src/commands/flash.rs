//! Flash rounds: memorize, then type from memory.

use anyhow::Result;
use typerush::{
    FlashRoundMachine, GameConfig, GameMode, Key, MachineEvent, RecordStore, RoundPhase,
    SessionStats, WallClock,
};

use super::RoundGame;
use crate::cli::FlashArgs;
use crate::render;

pub fn run(config: &GameConfig, store: RecordStore, args: &FlashArgs) -> Result<()> {
    let mut flash = config.flash.clone();
    if let Some(lives) = args.lives {
        flash = flash.max_timeouts(lives);
    }
    if let Some(secs) = args.secs {
        flash = flash.session_ms(secs.saturating_mul(1000));
    }

    let pool = super::load_pool(&args.prompts)?;
    let mut machine = FlashRoundMachine::new(WallClock::new(), pool, flash, config.scoring.clone())
        .with_store(store);

    println!(
        "Flash: memorize the phrase, then type it. {} lives, Esc skips, Ctrl+C quits.",
        machine.config().max_timeouts
    );
    let end = super::drive(&mut machine, &args.room)?;
    super::print_summary(end.record.as_ref());
    if let Some(room) = &end.room {
        super::print_standings(room);
    }
    Ok(())
}

impl RoundGame for FlashRoundMachine<WallClock> {
    const MODE: GameMode = GameMode::Flash;

    fn start(&mut self) -> typerush::Result<Vec<MachineEvent>> {
        FlashRoundMachine::start(self)
    }

    fn poll(&mut self) -> Vec<MachineEvent> {
        FlashRoundMachine::poll(self)
    }

    fn key(&mut self, key: Key) -> Vec<MachineEvent> {
        FlashRoundMachine::key(self, key)
    }

    fn stop(&mut self) -> Vec<MachineEvent> {
        FlashRoundMachine::stop(self)
    }

    fn stats(&self) -> &SessionStats {
        FlashRoundMachine::stats(self)
    }

    fn status_line(&self) -> String {
        let header = format!(
            "{} {} pts ",
            render::lives(self.lives_left(), self.config().max_timeouts),
            self.stats().points
        );
        let session = self
            .session_remaining_ms()
            .map(|ms| format!("[{}] ", render::clock(ms)))
            .unwrap_or_default();
        let prompt = self.current_prompt();
        match self.phase() {
            RoundPhase::Idle => format!("Press Space to start  {}", header),
            RoundPhase::Countdown { remaining } => format!("{}{}Starting in {}...", header, session, remaining),
            RoundPhase::Revealing => match prompt {
                Some(prompt) => format!("{}{}Remember: {}", header, session, prompt.display_text),
                None => format!("{}{}", header, session),
            },
            RoundPhase::ShowingAnswer => match prompt {
                Some(prompt) => format!(
                    "{}{}Answer: {} ({})",
                    header, session, prompt.display_text, prompt.canonical_romaji
                ),
                None => format!("{}{}", header, session),
            },
            RoundPhase::Active => {
                let typed = self
                    .round_state()
                    .map(|state| state.input().to_string())
                    .unwrap_or_default();
                let limit = self
                    .round_remaining_ms()
                    .map(render::clock)
                    .unwrap_or_default();
                format!("{}{}({}) > {}", header, session, limit, typed)
            }
            _ => format!("{}{}", header, session),
        }
    }
}
