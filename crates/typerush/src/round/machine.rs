use tracing::debug;

use super::{Edit, MachineEvent, OutcomeKind, OutcomeSource, RoundOutcome, RoundPhase, RoundState};
use crate::clock::TimerSet;

/// Durations for one round. Zero countdown ticks skips the countdown,
/// `None` reveal skips the reveal, `None` limit means no round deadline.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RoundTimings {
    pub countdown_ticks: u32,
    pub tick_ms: i64,
    pub reveal_ms: Option<i64>,
    pub limit_ms: Option<i64>,
}

impl Default for RoundTimings {
    fn default() -> Self {
        Self {
            countdown_ticks: 3,
            tick_ms: 1000,
            reveal_ms: None,
            limit_ms: None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum RoundTimer {
    Tick,
    Reveal,
    Deadline,
}

/// Drives one round through `countdown -> revealing -> active -> resolved | timed_out`.
///
/// All delays belong to a single [`TimerSet`] that is cancelled as a unit
/// whenever a round begins, ends, or is reset. Successor delays are scheduled
/// from the due time of the delay that fired, not from the poll time, so a
/// late poll does not stretch the countdown.
///
/// Keystrokes never look at the deadline. Only [`RoundMachine::poll`] times
/// a round out, so a completing keystroke that lands before the poll which
/// would observe the deadline wins.
#[derive(Debug)]
pub struct RoundMachine {
    phase: RoundPhase,
    state: Option<RoundState>,
    timings: RoundTimings,
    timers: TimerSet<RoundTimer>,
    presented_at_ms: Option<i64>,
}

impl Default for RoundMachine {
    fn default() -> Self {
        Self::new()
    }
}

impl RoundMachine {
    pub fn new() -> Self {
        Self {
            phase: RoundPhase::Idle,
            state: None,
            timings: RoundTimings::default(),
            timers: TimerSet::new(),
            presented_at_ms: None,
        }
    }

    pub fn phase(&self) -> RoundPhase {
        self.phase
    }

    pub fn state(&self) -> Option<&RoundState> {
        self.state.as_ref()
    }

    pub fn timings(&self) -> RoundTimings {
        self.timings
    }

    /// When the countdown of the current round ended
    pub fn presented_at_ms(&self) -> Option<i64> {
        self.presented_at_ms
    }

    /// When input went live in the current round
    pub fn activated_at_ms(&self) -> Option<i64> {
        match self.phase {
            RoundPhase::Active | RoundPhase::Resolved | RoundPhase::TimedOut => {
                self.state.as_ref().map(|s| s.started_at_ms())
            }
            _ => None,
        }
    }

    /// Deadline of the active round
    pub fn deadline_ms(&self) -> Option<i64> {
        let started = self.activated_at_ms()?;
        self.timings.limit_ms.map(|limit| started + limit)
    }

    pub fn next_due_ms(&self) -> Option<i64> {
        self.timers.next_due_ms()
    }

    pub fn timer_generation(&self) -> u64 {
        self.timers.generation()
    }

    /// Move to `to`, recording the change. No-op if already there.
    pub fn set_phase(&mut self, to: RoundPhase, events: &mut Vec<MachineEvent>) {
        if self.phase == to {
            return;
        }
        let from = self.phase;
        self.phase = to;
        debug!("Round phase {} -> {}", from, to);
        events.push(MachineEvent::PhaseChanged { from, to });
    }

    /// Start a new round, cancelling everything left from the previous one.
    pub fn begin(
        &mut self,
        source: OutcomeSource,
        canonical: &str,
        timings: RoundTimings,
        now_ms: i64,
        events: &mut Vec<MachineEvent>,
    ) {
        self.timers.cancel_all();
        self.timings = timings;
        self.presented_at_ms = None;
        self.state = Some(RoundState::new(source, canonical, now_ms));
        events.push(MachineEvent::RoundStarted { source });

        if timings.countdown_ticks > 0 {
            let remaining = timings.countdown_ticks;
            self.set_phase(RoundPhase::Countdown { remaining }, events);
            events.push(MachineEvent::CountdownTick { remaining });
            self.timers.schedule(RoundTimer::Tick, now_ms + timings.tick_ms);
        } else {
            self.present(now_ms, events);
        }
    }

    fn present(&mut self, at_ms: i64, events: &mut Vec<MachineEvent>) {
        self.presented_at_ms = Some(at_ms);
        match self.timings.reveal_ms {
            Some(reveal_ms) => {
                self.set_phase(RoundPhase::Revealing, events);
                self.timers.schedule(RoundTimer::Reveal, at_ms + reveal_ms);
            }
            None => self.activate(at_ms, events),
        }
    }

    fn activate(&mut self, at_ms: i64, events: &mut Vec<MachineEvent>) {
        if let Some(state) = self.state.as_mut() {
            state.set_started_at_ms(at_ms);
        }
        self.set_phase(RoundPhase::Active, events);
        if let Some(limit_ms) = self.timings.limit_ms {
            self.timers.schedule(RoundTimer::Deadline, at_ms + limit_ms);
        }
    }

    /// Fire every round delay due at or before `now_ms`.
    ///
    /// Returns the outcome if the round timed out.
    pub fn poll(&mut self, now_ms: i64, events: &mut Vec<MachineEvent>) -> Option<RoundOutcome> {
        while let Some((timer, due_ms)) = self.timers.pop_due(now_ms) {
            match timer {
                RoundTimer::Tick => {
                    let RoundPhase::Countdown { remaining } = self.phase else {
                        continue;
                    };
                    let remaining = remaining.saturating_sub(1);
                    if remaining == 0 {
                        events.push(MachineEvent::CountdownTick { remaining: 0 });
                        self.present(due_ms, events);
                    } else {
                        self.set_phase(RoundPhase::Countdown { remaining }, events);
                        events.push(MachineEvent::CountdownTick { remaining });
                        self.timers.schedule(RoundTimer::Tick, due_ms + self.timings.tick_ms);
                    }
                }
                RoundTimer::Reveal => {
                    if self.phase == RoundPhase::Revealing {
                        self.activate(due_ms, events);
                    }
                }
                RoundTimer::Deadline => {
                    if self.phase == RoundPhase::Active {
                        return self.conclude(OutcomeKind::TimedOut, due_ms, events);
                    }
                }
            }
        }
        None
    }

    /// Offer a new input value. Only the active phase accepts input.
    pub fn edit(&mut self, next: &str, now_ms: i64, events: &mut Vec<MachineEvent>) -> Edit {
        if !self.phase.accepts_input() {
            return Edit::Ignored;
        }
        let Some(state) = self.state.as_mut() else {
            return Edit::Ignored;
        };
        let edit = state.edit(next, now_ms);
        self.after_edit(edit, events)
    }

    pub fn type_char(&mut self, c: char, now_ms: i64, events: &mut Vec<MachineEvent>) -> Edit {
        if !self.phase.accepts_input() {
            return Edit::Ignored;
        }
        let Some(state) = self.state.as_mut() else {
            return Edit::Ignored;
        };
        let edit = state.type_char(c, now_ms);
        self.after_edit(edit, events)
    }

    pub fn backspace(&mut self, now_ms: i64, events: &mut Vec<MachineEvent>) -> Edit {
        if !self.phase.accepts_input() {
            return Edit::Ignored;
        }
        let Some(state) = self.state.as_mut() else {
            return Edit::Ignored;
        };
        let edit = state.backspace(now_ms);
        self.after_edit(edit, events)
    }

    /// Enter: resolve if the input is already complete
    pub fn submit(&mut self, now_ms: i64, events: &mut Vec<MachineEvent>) -> Option<RoundOutcome> {
        if !self.phase.accepts_input() {
            return None;
        }
        let complete = self.state.as_ref().is_some_and(|s| s.is_complete());
        if complete {
            self.conclude(OutcomeKind::Solved, now_ms, events)
        } else {
            None
        }
    }

    fn after_edit(&mut self, edit: Edit, events: &mut Vec<MachineEvent>) -> Edit {
        match edit {
            Edit::Rejected { mistakes } => {
                events.push(MachineEvent::Mistake { total: mistakes });
            }
            Edit::Completed(outcome) => {
                self.timers.cancel_all();
                self.set_phase(RoundPhase::Resolved, events);
                debug!("Round solved in {} ms", outcome.elapsed_ms);
            }
            Edit::Ignored | Edit::Accepted | Edit::Deleted => {}
        }
        edit
    }

    fn conclude(
        &mut self,
        kind: OutcomeKind,
        at_ms: i64,
        events: &mut Vec<MachineEvent>,
    ) -> Option<RoundOutcome> {
        let outcome = self.state.as_ref()?.outcome(kind, at_ms);
        self.timers.cancel_all();
        let to = match kind {
            OutcomeKind::Solved => RoundPhase::Resolved,
            OutcomeKind::TimedOut => RoundPhase::TimedOut,
            OutcomeKind::Skipped => RoundPhase::Idle,
        };
        self.set_phase(to, events);
        Some(outcome)
    }

    /// Abandon the round in progress as skipped.
    pub fn skip(&mut self, now_ms: i64, events: &mut Vec<MachineEvent>) -> Option<RoundOutcome> {
        if !self.phase.is_in_round() {
            return None;
        }
        self.conclude(OutcomeKind::Skipped, now_ms, events)
    }

    /// Cancel all delays and return to idle with no round.
    pub fn reset(&mut self, events: &mut Vec<MachineEvent>) {
        self.timers.cancel_all();
        self.state = None;
        self.presented_at_ms = None;
        self.set_phase(RoundPhase::Idle, events);
    }

    /// Cancel all delays and stop in `phase`, keeping the round's state for display.
    pub fn halt(&mut self, phase: RoundPhase, events: &mut Vec<MachineEvent>) {
        self.timers.cancel_all();
        self.set_phase(phase, events);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn timings() -> RoundTimings {
        RoundTimings {
            countdown_ticks: 3,
            tick_ms: 1000,
            reveal_ms: Some(1500),
            limit_ms: Some(10_000),
        }
    }

    fn phases(events: &[MachineEvent]) -> Vec<RoundPhase> {
        events
            .iter()
            .filter_map(|e| match e {
                MachineEvent::PhaseChanged { to, .. } => Some(*to),
                _ => None,
            })
            .collect()
    }

    #[test]
    fn test_full_round_sequence() {
        let mut machine = RoundMachine::new();
        let mut events = Vec::new();
        machine.begin(OutcomeSource::Prompt(7), "neko", timings(), 0, &mut events);
        assert_eq!(machine.phase(), RoundPhase::Countdown { remaining: 3 });

        machine.poll(2999, &mut events);
        assert_eq!(machine.phase(), RoundPhase::Countdown { remaining: 1 });
        machine.poll(3000, &mut events);
        assert_eq!(machine.phase(), RoundPhase::Revealing);
        assert_eq!(machine.presented_at_ms(), Some(3000));

        assert_eq!(machine.type_char('n', 3100, &mut events), Edit::Ignored);
        machine.poll(4500, &mut events);
        assert_eq!(machine.phase(), RoundPhase::Active);
        assert_eq!(machine.deadline_ms(), Some(14_500));

        for c in "nek".chars() {
            machine.type_char(c, 5000, &mut events);
        }
        let edit = machine.type_char('o', 6000, &mut events);
        let Edit::Completed(outcome) = edit else {
            panic!("expected completion, got {:?}", edit);
        };
        assert_eq!(outcome.elapsed_ms, 1500);
        assert_eq!(machine.phase(), RoundPhase::Resolved);
        assert_eq!(machine.next_due_ms(), None);

        assert_eq!(
            phases(&events),
            vec![
                RoundPhase::Countdown { remaining: 3 },
                RoundPhase::Countdown { remaining: 2 },
                RoundPhase::Countdown { remaining: 1 },
                RoundPhase::Revealing,
                RoundPhase::Active,
                RoundPhase::Resolved,
            ]
        );
    }

    #[test]
    fn test_late_poll_catches_up_without_drift() {
        let mut machine = RoundMachine::new();
        let mut events = Vec::new();
        machine.begin(OutcomeSource::Prompt(1), "ka", timings(), 0, &mut events);
        // One poll far past the reveal: countdown and reveal are both processed
        let outcome = machine.poll(4600, &mut events);
        assert!(outcome.is_none());
        assert_eq!(machine.phase(), RoundPhase::Active);
        assert_eq!(machine.activated_at_ms(), Some(4500));
    }

    #[test]
    fn test_timeout_outcome() {
        let mut machine = RoundMachine::new();
        let mut events = Vec::new();
        let t = RoundTimings {
            countdown_ticks: 0,
            reveal_ms: None,
            ..timings()
        };
        machine.begin(OutcomeSource::Prompt(1), "ka", t, 100, &mut events);
        assert_eq!(machine.phase(), RoundPhase::Active);
        machine.type_char('k', 200, &mut events);

        let outcome = machine.poll(20_000, &mut events).unwrap();
        assert_eq!(outcome.kind, OutcomeKind::TimedOut);
        assert_eq!(outcome.elapsed_ms, 10_000);
        assert_eq!(machine.phase(), RoundPhase::TimedOut);
    }

    #[test]
    fn test_completion_before_polled_deadline_wins() {
        let mut machine = RoundMachine::new();
        let mut events = Vec::new();
        let t = RoundTimings {
            countdown_ticks: 0,
            reveal_ms: None,
            limit_ms: Some(1000),
            ..timings()
        };
        machine.begin(OutcomeSource::Prompt(1), "a", t, 0, &mut events);
        // The deadline has passed on the clock but no poll has observed it
        let edit = machine.type_char('a', 1200, &mut events);
        assert!(matches!(edit, Edit::Completed(o) if o.kind == OutcomeKind::Solved));
        assert!(machine.poll(1200, &mut events).is_none());
        assert_eq!(machine.phase(), RoundPhase::Resolved);
    }

    #[test]
    fn test_begin_cancels_previous_round_timers() {
        let mut machine = RoundMachine::new();
        let mut events = Vec::new();
        let t = RoundTimings {
            countdown_ticks: 0,
            reveal_ms: None,
            limit_ms: Some(1000),
            ..timings()
        };
        machine.begin(OutcomeSource::Prompt(1), "a", t, 0, &mut events);
        let first_generation = machine.timer_generation();
        machine.begin(OutcomeSource::Prompt(2), "b", t, 900, &mut events);
        assert!(machine.timer_generation() > first_generation);

        // The first round's deadline at 1000 must not fire into round two
        assert!(machine.poll(1500, &mut events).is_none());
        assert_eq!(machine.phase(), RoundPhase::Active);
        assert_eq!(machine.poll(1900, &mut events).unwrap().source, OutcomeSource::Prompt(2));
    }

    #[test]
    fn test_mistake_event() {
        let mut machine = RoundMachine::new();
        let mut events = Vec::new();
        let t = RoundTimings {
            countdown_ticks: 0,
            reveal_ms: None,
            ..timings()
        };
        machine.begin(OutcomeSource::Prompt(1), "ka", t, 0, &mut events);
        events.clear();
        machine.type_char('x', 10, &mut events);
        assert_eq!(events, vec![MachineEvent::Mistake { total: 1 }]);
    }

    #[test]
    fn test_skip_and_reset() {
        let mut machine = RoundMachine::new();
        let mut events = Vec::new();
        machine.begin(OutcomeSource::Prompt(1), "ka", timings(), 0, &mut events);
        let outcome = machine.skip(500, &mut events).unwrap();
        assert_eq!(outcome.kind, OutcomeKind::Skipped);
        assert_eq!(machine.phase(), RoundPhase::Idle);
        assert!(machine.skip(600, &mut events).is_none());

        machine.reset(&mut events);
        events.clear();
        machine.reset(&mut events);
        assert!(events.is_empty());
        assert!(machine.state().is_none());
    }
}
