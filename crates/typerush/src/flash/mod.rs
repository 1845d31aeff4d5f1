//! Flash mode: memorize a phrase while it is shown, then type it from memory.
//!
//! Each round reveals the prompt for a short window, hides it, and opens
//! input with a tight deadline. A solved round chains straight into the next
//! one; a timed-out round costs a life and shows the answer first. The
//! session ends when its clock runs out or the last life is lost, whichever
//! comes first, even in the middle of a round.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::clock::{ClockSource, TimerSet};
use crate::error::{Error, Result};
use crate::prompt::{PickMode, PromptPool, SharedPrompt};
use crate::round::{
    Edit, Key, MachineEvent, OutcomeKind, OutcomeSource, RoundMachine, RoundOutcome, RoundPhase,
    RoundState, RoundTimings,
};
use crate::score::{Difficulty, GameMode, ScoreKeeper, ScoringRules, SessionRecord, SessionStats};
use crate::storage::RecordStore;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FlashConfig {
    pub countdown_ticks: u32,
    pub tick_ms: i64,
    pub session_ms: i64,
    pub reveal_ms: i64,
    pub round_limit_ms: i64,
    /// How long a missed answer stays on screen
    pub answer_ms: i64,
    /// Timeouts allowed before the session ends
    pub max_timeouts: u32,
    /// Countdown ticks before each round after the first
    pub between_rounds_ticks: u32,
    pub pick: PickMode,
}

impl Default for FlashConfig {
    fn default() -> Self {
        Self {
            countdown_ticks: 3,
            tick_ms: 1000,
            session_ms: 120_000,
            reveal_ms: 1500,
            round_limit_ms: 10_000,
            answer_ms: 800,
            max_timeouts: 3,
            between_rounds_ticks: 0,
            pick: PickMode::Random,
        }
    }
}

impl FlashConfig {
    pub fn max_timeouts(mut self, lives: u32) -> Self {
        self.max_timeouts = lives.max(1);
        self
    }

    pub fn session_ms(mut self, ms: i64) -> Self {
        self.session_ms = ms.max(0);
        self
    }

    pub fn round_limit_ms(mut self, ms: i64) -> Self {
        self.round_limit_ms = ms.max(1);
        self
    }

    fn timings(&self, countdown_ticks: u32) -> RoundTimings {
        RoundTimings {
            countdown_ticks,
            tick_ms: self.tick_ms,
            reveal_ms: Some(self.reveal_ms),
            limit_ms: Some(self.round_limit_ms),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SessionTimer {
    AnswerShown,
    SessionEnd,
}

pub struct FlashRoundMachine<C> {
    clock: C,
    config: FlashConfig,
    pool: PromptPool,
    round: RoundMachine,
    session_timers: TimerSet<SessionTimer>,
    keeper: ScoreKeeper,
    timeouts: u32,
    session_started_ms: Option<i64>,
    current: Option<SharedPrompt>,
    store: Option<RecordStore>,
    last_record: Option<SessionRecord>,
}

impl<C: ClockSource> FlashRoundMachine<C> {
    pub fn new(clock: C, pool: PromptPool, config: FlashConfig, rules: ScoringRules) -> Self {
        Self {
            clock,
            config,
            pool,
            round: RoundMachine::new(),
            session_timers: TimerSet::new(),
            keeper: ScoreKeeper::new(GameMode::Flash, Difficulty::Normal, rules),
            timeouts: 0,
            session_started_ms: None,
            current: None,
            store: None,
            last_record: None,
        }
    }

    pub fn with_store(mut self, store: RecordStore) -> Self {
        self.store = Some(store);
        self
    }

    pub fn phase(&self) -> RoundPhase {
        self.round.phase()
    }

    pub fn config(&self) -> &FlashConfig {
        &self.config
    }

    pub fn current_prompt(&self) -> Option<&SharedPrompt> {
        self.current.as_ref()
    }

    pub fn round_state(&self) -> Option<&RoundState> {
        self.round.state()
    }

    pub fn stats(&self) -> &SessionStats {
        self.keeper.stats()
    }

    pub fn timeouts(&self) -> u32 {
        self.timeouts
    }

    pub fn lives_left(&self) -> u32 {
        self.config.max_timeouts.saturating_sub(self.timeouts)
    }

    pub fn last_record(&self) -> Option<&SessionRecord> {
        self.last_record.as_ref()
    }

    /// The prompt text is on screen (memorize window or missed answer)
    pub fn prompt_visible(&self) -> bool {
        matches!(
            self.round.phase(),
            RoundPhase::Revealing | RoundPhase::ShowingAnswer
        )
    }

    pub fn is_running(&self) -> bool {
        self.session_started_ms.is_some() || self.round.phase().is_in_round()
    }

    pub fn session_remaining_ms(&self) -> Option<i64> {
        let started = self.session_started_ms?;
        if self.config.session_ms == 0 {
            return None;
        }
        Some((started + self.config.session_ms - self.clock.now_ms()).max(0))
    }

    pub fn round_remaining_ms(&self) -> Option<i64> {
        self.round
            .deadline_ms()
            .map(|deadline| (deadline - self.clock.now_ms()).max(0))
    }

    /// Start a session. Does nothing while one is running.
    pub fn start(&mut self) -> Result<Vec<MachineEvent>> {
        let mut events = Vec::new();
        if self.is_running() {
            return Ok(events);
        }
        if self.pool.is_empty() {
            return Err(Error::DataUnavailable("no prompts for flash rounds".into()));
        }
        self.clear(&mut events);
        let now = self.clock.now_ms();
        self.begin_round(self.config.countdown_ticks, now, &mut events);
        self.sync_session_start(&mut events);
        Ok(events)
    }

    pub fn poll(&mut self) -> Vec<MachineEvent> {
        let now = self.clock.now_ms();
        let mut events = Vec::new();
        loop {
            let round_due = self.round.next_due_ms().filter(|due| *due <= now);
            let session_due = self.session_timers.next_due_ms().filter(|due| *due <= now);
            match (round_due, session_due) {
                (None, None) => break,
                (Some(r), Some(s)) if s < r => self.fire_session(s, &mut events),
                (Some(r), _) => self.fire_round(r, &mut events),
                (None, Some(s)) => self.fire_session(s, &mut events),
            }
        }
        events
    }

    fn fire_round(&mut self, due: i64, events: &mut Vec<MachineEvent>) {
        if let Some(outcome) = self.round.poll(due, events) {
            self.finish_round(outcome, due, events);
        }
        self.sync_session_start(events);
    }

    fn fire_session(&mut self, due: i64, events: &mut Vec<MachineEvent>) {
        let Some((timer, due)) = self.session_timers.pop_due(due) else {
            return;
        };
        match timer {
            SessionTimer::AnswerShown => {
                if self.round.phase() == RoundPhase::ShowingAnswer {
                    self.begin_round(self.config.between_rounds_ticks, due, events);
                }
            }
            SessionTimer::SessionEnd => self.finish_session(due, events),
        }
    }

    pub fn key(&mut self, key: Key) -> Vec<MachineEvent> {
        let now = self.clock.now_ms();
        let mut events = Vec::new();
        match key {
            Key::HardReset => return self.reset(),
            Key::Space if !self.is_running() => {
                return self.start().unwrap_or_else(|e| {
                    warn!("Cannot start flash session: {}", e);
                    Vec::new()
                });
            }
            _ => {}
        }
        let edit = match key {
            Key::Char(c) => self.round.type_char(c, now, &mut events),
            Key::Space => self.round.type_char(' ', now, &mut events),
            Key::Backspace => self.round.backspace(now, &mut events),
            Key::Enter => self
                .round
                .submit(now, &mut events)
                .map_or(Edit::Ignored, Edit::Completed),
            Key::Escape => {
                if let Some(outcome) = self.round.skip(now, &mut events) {
                    self.finish_round(outcome, now, &mut events);
                }
                Edit::Ignored
            }
            Key::HardReset => Edit::Ignored,
        };
        if let Edit::Completed(outcome) = edit {
            self.finish_round(outcome, now, &mut events);
        }
        events
    }

    pub fn set_input(&mut self, input: &str) -> Vec<MachineEvent> {
        let now = self.clock.now_ms();
        let mut events = Vec::new();
        if let Edit::Completed(outcome) = self.round.edit(input, now, &mut events) {
            self.finish_round(outcome, now, &mut events);
        }
        events
    }

    pub fn stop(&mut self) -> Vec<MachineEvent> {
        let mut events = Vec::new();
        if self.session_started_ms.is_some() {
            let now = self.clock.now_ms();
            self.finish_session(now, &mut events);
        } else {
            self.clear(&mut events);
        }
        events
    }

    pub fn reset(&mut self) -> Vec<MachineEvent> {
        let mut events = Vec::new();
        self.clear(&mut events);
        events
    }

    fn clear(&mut self, events: &mut Vec<MachineEvent>) {
        self.session_timers.cancel_all();
        self.round.reset(events);
        self.keeper.abandon();
        self.timeouts = 0;
        self.session_started_ms = None;
        self.current = None;
    }

    fn begin_round(&mut self, countdown_ticks: u32, now: i64, events: &mut Vec<MachineEvent>) {
        let Some(prompt) = self.pool.next(self.config.pick) else {
            warn!("Prompt pool is empty, ending flash session");
            self.finish_session(now, events);
            return;
        };
        debug!("Flash prompt {}", prompt.id);
        self.round.begin(
            OutcomeSource::Prompt(prompt.id),
            &prompt.canonical_romaji,
            self.config.timings(countdown_ticks),
            now,
            events,
        );
        self.current = Some(Arc::clone(&prompt));
    }

    fn sync_session_start(&mut self, events: &mut Vec<MachineEvent>) {
        if self.session_started_ms.is_some() {
            return;
        }
        let Some(at) = self.round.presented_at_ms() else {
            return;
        };
        self.session_started_ms = Some(at);
        self.keeper.begin(at);
        if self.config.session_ms > 0 {
            self.session_timers
                .schedule(SessionTimer::SessionEnd, at + self.config.session_ms);
        }
        events.push(MachineEvent::SessionStarted);
    }

    fn finish_round(&mut self, outcome: RoundOutcome, at: i64, events: &mut Vec<MachineEvent>) {
        let points = self.keeper.record(&outcome);
        events.push(MachineEvent::RoundFinished { outcome, points });
        match outcome.kind {
            OutcomeKind::Solved | OutcomeKind::Skipped => {
                self.begin_round(self.config.between_rounds_ticks, at, events);
            }
            OutcomeKind::TimedOut => {
                self.timeouts += 1;
                info!("Flash timeout {}/{}", self.timeouts, self.config.max_timeouts);
                if self.timeouts >= self.config.max_timeouts {
                    self.finish_session(at, events);
                } else {
                    self.round.set_phase(RoundPhase::ShowingAnswer, events);
                    self.session_timers
                        .schedule(SessionTimer::AnswerShown, at + self.config.answer_ms);
                }
            }
        }
    }

    fn finish_session(&mut self, at: i64, events: &mut Vec<MachineEvent>) {
        self.session_timers.cancel_all();
        self.round.halt(RoundPhase::Finished, events);
        self.session_started_ms = None;
        let Some(record) = self.keeper.finish(at) else {
            return;
        };
        if let Some(store) = &self.store
            && let Err(e) = store.append(&record)
        {
            warn!("Failed to save flash record: {}", e);
        }
        self.last_record = Some(record.clone());
        events.push(MachineEvent::SessionFinished(record));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use crate::prompt::Prompt;
    use tempfile::tempdir;

    fn machine() -> (FlashRoundMachine<ManualClock>, ManualClock) {
        let clock = ManualClock::new();
        let pool = PromptPool::with_seed(
            vec![
                Prompt::new(1, "さくら", "sakura", 200),
                Prompt::new(2, "つき", "tsuki", 200),
                Prompt::new(3, "しお", "shio", 200),
            ],
            5,
        );
        let m = FlashRoundMachine::new(clock.clone(), pool, FlashConfig::default(), ScoringRules::default());
        (m, clock)
    }

    fn type_current(m: &mut FlashRoundMachine<ManualClock>) -> Vec<MachineEvent> {
        let romaji = m.current_prompt().unwrap().canonical_romaji.clone();
        romaji.chars().flat_map(|c| m.key(Key::from_char(c))).collect()
    }

    #[test]
    fn test_countdown_reveal_then_active() {
        let (mut m, clock) = machine();
        m.start().unwrap();
        assert_eq!(m.phase(), RoundPhase::Countdown { remaining: 3 });

        clock.set(3000);
        m.poll();
        assert_eq!(m.phase(), RoundPhase::Revealing);
        assert!(m.prompt_visible());
        assert!(m.key(Key::Char('s')).is_empty());

        clock.set(4500);
        m.poll();
        assert_eq!(m.phase(), RoundPhase::Active);
        assert!(!m.prompt_visible());
        assert_eq!(m.round_remaining_ms(), Some(10_000));
        assert_eq!(m.session_remaining_ms(), Some(118_500));
    }

    #[test]
    fn test_solve_chains_into_next_reveal() {
        let (mut m, clock) = machine();
        m.start().unwrap();
        clock.set(4500);
        m.poll();
        clock.set(6000);
        let first = m.current_prompt().unwrap().id;
        let events = type_current(&mut m);
        assert!(events.iter().any(|e| matches!(
            e,
            MachineEvent::RoundFinished { points: 100, .. }
        )));
        assert_eq!(m.phase(), RoundPhase::Revealing);
        assert_ne!(m.current_prompt().unwrap().id, first);
        assert_eq!(m.stats().solved_count, 1);
    }

    #[test]
    fn test_mistakes_do_not_cost_points() {
        let (mut m, clock) = machine();
        m.start().unwrap();
        clock.set(4500);
        m.poll();
        m.key(Key::Char('q'));
        m.key(Key::Char('q'));
        let events = type_current(&mut m);
        assert!(events.iter().any(|e| matches!(
            e,
            MachineEvent::RoundFinished { outcome, points: 100 } if outcome.mistakes == 2
        )));
        assert_eq!(m.stats().total_mistakes, 2);
    }

    #[test]
    fn test_timeout_shows_answer_then_next_round() {
        let (mut m, clock) = machine();
        m.start().unwrap();
        clock.set(14_500);
        m.poll();
        assert_eq!(m.phase(), RoundPhase::ShowingAnswer);
        assert!(m.prompt_visible());
        assert_eq!(m.timeouts(), 1);
        assert_eq!(m.lives_left(), 2);

        clock.set(15_300);
        m.poll();
        assert_eq!(m.phase(), RoundPhase::Revealing);
    }

    #[test]
    fn test_three_timeouts_end_session_and_append_record() {
        let dir = tempdir().unwrap();
        let (m, clock) = machine();
        let mut m = m.with_store(RecordStore::new(dir.path()));
        m.start().unwrap();

        // countdown 3000 + (reveal 1500 + limit 10000) per round, 800 between
        clock.set(3000 + 11_500 + 800 + 11_500 + 800 + 11_500);
        let events = m.poll();

        assert_eq!(m.phase(), RoundPhase::Finished);
        assert_eq!(m.timeouts(), 3);
        let record = m.last_record().unwrap();
        assert_eq!(record.timed_out, 3);
        assert_eq!(record.solved, 0);
        assert_eq!(record.mode, GameMode::Flash);
        assert!(events.iter().any(|e| matches!(e, MachineEvent::SessionFinished(_))));

        let stored = RecordStore::new(dir.path()).load(GameMode::Flash).unwrap();
        assert_eq!(stored.len(), 1);
        assert_eq!(stored[0].timed_out, 3);

        // Nothing left scheduled
        clock.set(500_000);
        assert!(m.poll().is_empty());
    }

    #[test]
    fn test_session_clock_ends_mid_round() {
        let clock = ManualClock::new();
        let pool = PromptPool::with_seed(vec![Prompt::new(1, "あ", "a", 1)], 0);
        let config = FlashConfig::default().session_ms(5000);
        let mut m = FlashRoundMachine::new(clock.clone(), pool, config, ScoringRules::default());
        m.start().unwrap();
        clock.set(8000);
        m.poll();
        assert_eq!(m.phase(), RoundPhase::Finished);
        let record = m.last_record().unwrap();
        assert_eq!(record.timed_out, 0);
        assert_eq!(record.duration_ms(), 5000);
    }

    #[test]
    fn test_reset_twice_matches_once() {
        let (mut m, clock) = machine();
        m.start().unwrap();
        clock.set(14_500);
        m.poll();
        m.reset();
        assert_eq!(m.phase(), RoundPhase::Idle);
        assert_eq!(m.timeouts(), 0);
        assert!(m.reset().is_empty());
        assert_eq!(m.phase(), RoundPhase::Idle);
        clock.set(100_000);
        assert!(m.poll().is_empty());
    }

    #[test]
    fn test_escape_skips_without_losing_a_life() {
        let (mut m, clock) = machine();
        m.start().unwrap();
        clock.set(4500);
        m.poll();
        m.key(Key::Escape);
        assert_eq!(m.phase(), RoundPhase::Revealing);
        assert_eq!(m.lives_left(), 3);
        assert_eq!(m.stats().skipped_count, 1);
    }
}
