//! Self-paced practice: a timed session of prompts, one after another.
//!
//! The session opens with a countdown, then each round goes straight to
//! active typing. A solved or timed-out round drops back to idle and the
//! next prompt is picked on the following poll. When the session clock runs
//! out the round in progress is abandoned and a record is produced.

mod time_limit;

use std::collections::VecDeque;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::clock::{ClockSource, TimerSet};
use crate::error::{Error, Result};
use crate::prompt::{PickMode, PromptPool, SharedPrompt};
use crate::round::{
    Edit, Key, MachineEvent, OutcomeKind, OutcomeSource, RoundMachine, RoundOutcome, RoundPhase,
    RoundState, RoundTimings,
};
use crate::score::{
    Difficulty, GameMode, ScoreKeeper, ScoringRules, SessionRecord, SessionStats, compute_accuracy,
    compute_wpm,
};
use crate::storage::RecordStore;

pub use time_limit::{TimeLimitPreset, preset, time_limit_ms, time_limit_secs};

/// Most recent solved rounds kept for the adaptive target
pub const HISTORY_CAP: usize = 100;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PracticeConfig {
    pub countdown_ticks: u32,
    pub tick_ms: i64,
    /// Session length; 0 for an untimed session
    pub session_ms: i64,
    /// Give each prompt a deadline from its length
    pub round_limit: bool,
    pub difficulty: Difficulty,
    pub pick: PickMode,
}

impl Default for PracticeConfig {
    fn default() -> Self {
        Self {
            countdown_ticks: 3,
            tick_ms: 1000,
            session_ms: 120_000,
            round_limit: true,
            difficulty: Difficulty::Normal,
            pick: PickMode::Random,
        }
    }
}

impl PracticeConfig {
    pub fn session_ms(mut self, ms: i64) -> Self {
        self.session_ms = ms.max(0);
        self
    }

    pub fn difficulty(mut self, difficulty: Difficulty) -> Self {
        self.difficulty = difficulty;
        self
    }

    pub fn pick(mut self, pick: PickMode) -> Self {
        self.pick = pick;
        self
    }

    pub fn round_limit(mut self, enabled: bool) -> Self {
        self.round_limit = enabled;
        self
    }
}

/// Speed and accuracy of one solved prompt
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RoundResult {
    pub prompt_id: u64,
    pub wpm: f64,
    pub accuracy: f64,
    pub at_ms: i64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SessionTimer {
    NextRound,
    SessionEnd,
}

pub struct PracticeSessionMachine<C> {
    clock: C,
    config: PracticeConfig,
    pool: PromptPool,
    round: RoundMachine,
    session_timers: TimerSet<SessionTimer>,
    keeper: ScoreKeeper,
    session_started_ms: Option<i64>,
    current: Option<SharedPrompt>,
    history: VecDeque<RoundResult>,
    store: Option<RecordStore>,
    last_record: Option<SessionRecord>,
}

impl<C: ClockSource> PracticeSessionMachine<C> {
    pub fn new(clock: C, pool: PromptPool, config: PracticeConfig, rules: ScoringRules) -> Self {
        let keeper = ScoreKeeper::new(GameMode::Practice, config.difficulty, rules);
        Self {
            clock,
            config,
            pool,
            round: RoundMachine::new(),
            session_timers: TimerSet::new(),
            keeper,
            session_started_ms: None,
            current: None,
            history: VecDeque::new(),
            store: None,
            last_record: None,
        }
    }

    /// Append each finished session's record to `store`
    pub fn with_store(mut self, store: RecordStore) -> Self {
        self.store = Some(store);
        self
    }

    pub fn phase(&self) -> RoundPhase {
        self.round.phase()
    }

    pub fn config(&self) -> &PracticeConfig {
        &self.config
    }

    pub fn clock(&self) -> &C {
        &self.clock
    }

    pub fn pool(&self) -> &PromptPool {
        &self.pool
    }

    pub fn pool_mut(&mut self) -> &mut PromptPool {
        &mut self.pool
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

    pub fn history(&self) -> impl Iterator<Item = &RoundResult> {
        self.history.iter()
    }

    pub fn last_record(&self) -> Option<&SessionRecord> {
        self.last_record.as_ref()
    }

    /// A session has been started and has not finished
    pub fn is_running(&self) -> bool {
        self.session_started_ms.is_some() || self.round.phase().is_in_round()
    }

    /// Time left in the session
    pub fn session_remaining_ms(&self) -> Option<i64> {
        let started = self.session_started_ms?;
        if self.config.session_ms == 0 {
            return None;
        }
        Some((started + self.config.session_ms - self.clock.now_ms()).max(0))
    }

    /// Time left for the current prompt
    pub fn round_remaining_ms(&self) -> Option<i64> {
        self.round
            .deadline_ms()
            .map(|deadline| (deadline - self.clock.now_ms()).max(0))
    }

    /// Start a session: countdown, then the first prompt.
    ///
    /// Does nothing while a session is already running.
    pub fn start(&mut self) -> Result<Vec<MachineEvent>> {
        let mut events = Vec::new();
        if self.is_running() {
            return Ok(events);
        }
        if self.pool.is_empty() {
            return Err(Error::DataUnavailable("no prompts to practice".into()));
        }
        self.clear(&mut events);
        let now = self.clock.now_ms();
        self.begin_round(self.config.countdown_ticks, now, &mut events);
        self.sync_session_start(&mut events);
        Ok(events)
    }

    /// Advance timers to the current clock time.
    pub fn poll(&mut self) -> Vec<MachineEvent> {
        let now = self.clock.now_ms();
        let mut events = Vec::new();
        loop {
            let round_due = self.round.next_due_ms().filter(|due| *due <= now);
            let session_due = self.session_timers.next_due_ms().filter(|due| *due <= now);
            // Round delays go first when both are due at the same instant
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
        if let Some((timer, due)) = self.session_timers.pop_due(due) {
            self.on_session_timer(timer, due, events);
        }
    }

    pub fn key(&mut self, key: Key) -> Vec<MachineEvent> {
        let now = self.clock.now_ms();
        let mut events = Vec::new();
        match key {
            Key::HardReset => return self.reset(),
            Key::Space if !self.is_running() => {
                return self.start().unwrap_or_else(|e| {
                    warn!("Cannot start practice: {}", e);
                    Vec::new()
                });
            }
            _ => {}
        }
        if !self.round.phase().accepts_input() {
            return events;
        }
        let edit = match key {
            Key::Char(c) => self.round.type_char(c, now, &mut events),
            Key::Space => self.round.type_char(' ', now, &mut events),
            Key::Backspace => self.round.backspace(now, &mut events),
            Key::Enter => match self.round.submit(now, &mut events) {
                Some(outcome) => Edit::Completed(outcome),
                None => Edit::Ignored,
            },
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

    /// Replace the whole input (paste, IME commit)
    pub fn set_input(&mut self, input: &str) -> Vec<MachineEvent> {
        let now = self.clock.now_ms();
        let mut events = Vec::new();
        if let Edit::Completed(outcome) = self.round.edit(input, now, &mut events) {
            self.finish_round(outcome, now, &mut events);
        }
        events
    }

    /// End the session now, producing a record if it had started.
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

    /// Cancel everything and return to idle without a record.
    pub fn reset(&mut self) -> Vec<MachineEvent> {
        let mut events = Vec::new();
        self.clear(&mut events);
        events
    }

    fn clear(&mut self, events: &mut Vec<MachineEvent>) {
        self.session_timers.cancel_all();
        self.round.reset(events);
        self.keeper.abandon();
        self.session_started_ms = None;
        self.current = None;
    }

    fn begin_round(&mut self, countdown_ticks: u32, now: i64, events: &mut Vec<MachineEvent>) {
        let Some(prompt) = self.pool.next(self.config.pick) else {
            warn!("Prompt pool is empty, ending session");
            self.finish_session(now, events);
            return;
        };
        let limit_ms = self
            .config
            .round_limit
            .then(|| time_limit_ms(&prompt.canonical_romaji, self.config.difficulty));
        let timings = RoundTimings {
            countdown_ticks,
            tick_ms: self.config.tick_ms,
            reveal_ms: None,
            limit_ms,
        };
        debug!("Practice prompt {} ({:?} ms)", prompt.id, limit_ms);
        self.round.begin(
            OutcomeSource::Prompt(prompt.id),
            &prompt.canonical_romaji,
            timings,
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
        if outcome.kind == OutcomeKind::Solved {
            self.remember(&outcome, at);
        }
        events.push(MachineEvent::RoundFinished { outcome, points });
        self.round.set_phase(RoundPhase::Idle, events);
        self.session_timers.schedule(SessionTimer::NextRound, at);
    }

    fn remember(&mut self, outcome: &RoundOutcome, at: i64) {
        let OutcomeSource::Prompt(prompt_id) = outcome.source else {
            return;
        };
        let wpm = compute_wpm(outcome.typed_chars as u64, outcome.elapsed_ms);
        let accuracy = compute_accuracy(
            outcome.typed_chars as u64 + outcome.mistakes as u64,
            outcome.mistakes as u64,
        );
        self.pool.record_result(wpm, accuracy);
        if self.history.len() == HISTORY_CAP {
            self.history.pop_front();
        }
        self.history.push_back(RoundResult {
            prompt_id,
            wpm,
            accuracy,
            at_ms: at,
        });
    }

    fn on_session_timer(&mut self, timer: SessionTimer, due: i64, events: &mut Vec<MachineEvent>) {
        match timer {
            SessionTimer::NextRound => {
                if self.round.phase() == RoundPhase::Idle && self.session_started_ms.is_some() {
                    self.begin_round(0, due, events);
                }
            }
            SessionTimer::SessionEnd => self.finish_session(due, events),
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
            warn!("Failed to save practice record: {}", e);
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

    fn machine(session_ms: i64) -> (PracticeSessionMachine<ManualClock>, ManualClock) {
        let clock = ManualClock::new();
        let pool = PromptPool::with_seed(
            vec![
                Prompt::new(1, "ねこ", "neko", 100),
                Prompt::new(2, "いぬ", "inu", 100),
            ],
            11,
        );
        let config = PracticeConfig::default().session_ms(session_ms);
        let machine = PracticeSessionMachine::new(clock.clone(), pool, config, ScoringRules::default());
        (machine, clock)
    }

    fn type_str(m: &mut PracticeSessionMachine<ManualClock>, s: &str) -> Vec<MachineEvent> {
        s.chars().flat_map(|c| m.key(Key::from_char(c))).collect()
    }

    fn current_romaji(m: &PracticeSessionMachine<ManualClock>) -> String {
        m.current_prompt().unwrap().canonical_romaji.clone()
    }

    fn finished_points(events: &[MachineEvent]) -> Vec<i64> {
        events
            .iter()
            .filter_map(|e| match e {
                MachineEvent::RoundFinished { points, .. } => Some(*points),
                _ => None,
            })
            .collect()
    }

    #[test]
    fn test_start_countdown_then_active() {
        let (mut m, clock) = machine(120_000);
        m.start().unwrap();
        assert_eq!(m.phase(), RoundPhase::Countdown { remaining: 3 });
        assert!(m.session_remaining_ms().is_none());

        clock.set(3000);
        let events = m.poll();
        assert!(events.contains(&MachineEvent::SessionStarted));
        assert_eq!(m.phase(), RoundPhase::Active);
        assert_eq!(m.session_remaining_ms(), Some(120_000));
    }

    #[test]
    fn test_empty_pool_cannot_start() {
        let clock = ManualClock::new();
        let mut m = PracticeSessionMachine::new(
            clock,
            PromptPool::with_seed(Vec::new(), 0),
            PracticeConfig::default(),
            ScoringRules::default(),
        );
        assert!(m.start().unwrap_err().is_data_unavailable());
        assert_eq!(m.phase(), RoundPhase::Idle);
    }

    #[test]
    fn test_clean_and_sloppy_rounds_score() {
        let (mut m, clock) = machine(120_000);
        m.start().unwrap();
        clock.set(3000);
        m.poll();

        clock.set(4000);
        let romaji = current_romaji(&m);
        let events = type_str(&mut m, &romaji);
        assert_eq!(finished_points(&events), vec![160]);
        assert_eq!(m.phase(), RoundPhase::Idle);

        // Next prompt arrives on the following poll
        m.poll();
        assert_eq!(m.phase(), RoundPhase::Active);
        let romaji = current_romaji(&m);
        let events = m.key(Key::Char('x'));
        assert_eq!(events, vec![MachineEvent::Mistake { total: 1 }]);
        let events = type_str(&mut m, &romaji);
        assert_eq!(finished_points(&events), vec![147]);
        assert_eq!(m.stats().points, 307);
        assert_eq!(m.history().count(), 2);
    }

    #[test]
    fn test_round_times_out_then_continues() {
        let (mut m, clock) = machine(120_000);
        m.start().unwrap();
        clock.set(3000);
        m.poll();
        let limit = m.round_remaining_ms().unwrap();
        assert_eq!(limit, time_limit_ms(&current_romaji(&m), Difficulty::Normal));

        clock.set(3000 + limit);
        let events = m.poll();
        assert!(events.iter().any(|e| matches!(
            e,
            MachineEvent::RoundFinished { outcome, .. } if outcome.kind == OutcomeKind::TimedOut
        )));
        // Timed-out round chains straight into the next prompt in the same poll
        assert_eq!(m.phase(), RoundPhase::Active);
        assert_eq!(m.stats().timed_out_count, 1);
    }

    #[test]
    fn test_escape_skips_prompt() {
        let (mut m, clock) = machine(120_000);
        m.start().unwrap();
        clock.set(3000);
        m.poll();
        let first = m.current_prompt().unwrap().id;
        m.key(Key::Escape);
        assert_eq!(m.phase(), RoundPhase::Idle);
        m.poll();
        assert_ne!(m.current_prompt().unwrap().id, first);
        assert_eq!(m.stats().skipped_count, 1);
    }

    #[test]
    fn test_session_end_abandons_round_and_records() {
        let dir = tempfile::tempdir().unwrap();
        let (m, clock) = machine(10_000);
        let mut m = m.with_store(RecordStore::new(dir.path()));
        m.start().unwrap();
        clock.set(3000);
        m.poll();
        m.key(Key::Char('n'));

        clock.set(13_000);
        let events = m.poll();
        assert_eq!(m.phase(), RoundPhase::Finished);
        let record = m.last_record().unwrap();
        assert_eq!(record.mode, GameMode::Practice);
        assert_eq!(record.duration_ms(), 10_000);
        assert!(events.iter().any(|e| matches!(e, MachineEvent::SessionFinished(_))));

        let stored = RecordStore::new(dir.path()).load(GameMode::Practice).unwrap();
        assert_eq!(stored.len(), 1);

        // Input is dead once finished; space starts a new session
        assert!(m.key(Key::Char('n')).is_empty());
        m.key(Key::Space);
        assert_eq!(m.phase(), RoundPhase::Countdown { remaining: 3 });
    }

    #[test]
    fn test_space_types_while_active() {
        let clock = ManualClock::new();
        let pool = PromptPool::with_seed(vec![Prompt::new(1, "はい どうぞ", "hai douzo", 100)], 0);
        let mut m = PracticeSessionMachine::new(
            clock.clone(),
            pool,
            PracticeConfig::default(),
            ScoringRules::default(),
        );
        m.key(Key::Space);
        clock.set(3000);
        m.poll();
        let events = type_str(&mut m, "hai douzo");
        assert_eq!(finished_points(&events).len(), 1);
    }

    #[test]
    fn test_reset_is_idempotent() {
        let (mut m, clock) = machine(120_000);
        m.start().unwrap();
        clock.set(3500);
        m.poll();
        m.key(Key::Char('n'));

        m.reset();
        let phase_once = m.phase();
        let stats_once = *m.stats();
        let events = m.reset();
        assert!(events.is_empty());
        assert_eq!(m.phase(), phase_once);
        assert_eq!(m.phase(), RoundPhase::Idle);
        assert_eq!(*m.stats(), stats_once);
        assert!(m.round_state().is_none());

        // No stale timer fires after the reset
        clock.set(200_000);
        assert!(m.poll().is_empty());
    }

    #[test]
    fn test_stop_before_start_of_session() {
        let (mut m, _clock) = machine(120_000);
        m.start().unwrap();
        m.stop();
        assert_eq!(m.phase(), RoundPhase::Idle);
        assert!(m.last_record().is_none());
    }

    #[test]
    fn test_untimed_session_runs_until_stopped() {
        let (mut m, clock) = machine(0);
        m.start().unwrap();
        clock.set(3000);
        m.poll();
        assert!(m.session_remaining_ms().is_none());
        clock.set(1_000_000);
        m.poll();
        assert_ne!(m.phase(), RoundPhase::Finished);
        let events = m.stop();
        assert!(events.iter().any(|e| matches!(e, MachineEvent::SessionFinished(_))));
    }
}
