use std::ops::Range;

use tracing::{debug, info, warn};

use super::{BeatConfig, BeatEvent, BeatPhase, LineStatus};
use crate::clock::{
    ClockSource, PlayerEvent, PlayerState, PollKind, PollSchedule, VideoClockSource, VideoPlayer,
    WallClock,
};
use crate::error::{Error, Result};
use crate::prompt::{LyricLine, LyricTrack};
use crate::round::{Edit, Key, OutcomeKind, OutcomeSource, RoundOutcome, RoundState};
use crate::score::{
    Difficulty, GameMode, ScoreKeeper, ScoringRules, SessionRecord, SessionStats,
};
use crate::storage::RecordStore;

/// Intro skip is ignored this close to the first line
const INTRO_SKIP_MARGIN_MS: i64 = 200;

/// Letters, apostrophes, whitespace and the long-vowel hyphen
fn is_typeable(c: char) -> bool {
    c.is_ascii_alphabetic() || c == '\'' || c == '-' || c.is_whitespace()
}

/// Keeps the current caption line in step with a video player.
///
/// Time flows in only through [`poll`](Self::poll) and
/// [`tick`](Self::tick); keystrokes never settle a line by time, so a
/// completing keystroke that lands before the poll which would have missed
/// the line always counts as solved.
pub struct BeatSyncEngine<P, W = WallClock> {
    clock: VideoClockSource<P, W>,
    config: BeatConfig,
    track: Option<LyricTrack>,
    phase: BeatPhase,
    current: Option<usize>,
    /// Lines below this index were skipped by command
    skip_floor: usize,
    statuses: Vec<LineStatus>,
    line: Option<RoundState>,
    misses: u32,
    last_time_ms: Option<i64>,
    keeper: ScoreKeeper,
    polls: PollSchedule,
    store: Option<RecordStore>,
    last_record: Option<SessionRecord>,
}

impl<P: VideoPlayer> BeatSyncEngine<P, WallClock> {
    pub fn new(player: P, config: BeatConfig, rules: ScoringRules) -> Self {
        Self::with_clock(VideoClockSource::new(player), config, rules)
    }
}

impl<P: VideoPlayer, W: ClockSource> BeatSyncEngine<P, W> {
    pub fn with_clock(mut clock: VideoClockSource<P, W>, config: BeatConfig, rules: ScoringRules) -> Self {
        clock.set_offset_ms(config.offset_ms);
        let polls = PollSchedule::new(config.primary_poll_ms, config.fallback_poll_ms);
        let keeper = ScoreKeeper::new(GameMode::BeatSync, config.difficulty, rules);
        Self {
            clock,
            config,
            track: None,
            phase: BeatPhase::Idle,
            current: None,
            skip_floor: 0,
            statuses: Vec::new(),
            line: None,
            misses: 0,
            last_time_ms: None,
            keeper,
            polls,
            store: None,
            last_record: None,
        }
    }

    /// Append each finished run's record to `store`
    pub fn with_store(mut self, store: RecordStore) -> Self {
        self.store = Some(store);
        self
    }

    pub fn phase(&self) -> BeatPhase {
        self.phase
    }

    pub fn config(&self) -> &BeatConfig {
        &self.config
    }

    pub fn clock(&self) -> &VideoClockSource<P, W> {
        &self.clock
    }

    pub fn clock_mut(&mut self) -> &mut VideoClockSource<P, W> {
        &mut self.clock
    }

    pub fn track(&self) -> Option<&LyricTrack> {
        self.track.as_ref()
    }

    pub fn current_index(&self) -> Option<usize> {
        self.current
    }

    pub fn current_line(&self) -> Option<&LyricLine> {
        self.current.and_then(|i| self.line_at(i))
    }

    /// Typing state of the current line
    pub fn line_state(&self) -> Option<&RoundState> {
        self.line.as_ref()
    }

    pub fn statuses(&self) -> &[LineStatus] {
        &self.statuses
    }

    /// The current line is settled and ignores input until its window ends
    pub fn is_locked(&self) -> bool {
        self.current
            .is_some_and(|i| self.status(i) != Some(LineStatus::Pending))
    }

    pub fn misses(&self) -> u32 {
        self.misses
    }

    /// Misses left before the run fails, `None` when misses are unlimited
    pub fn lives_left(&self) -> Option<u32> {
        (self.config.max_misses > 0).then(|| self.config.max_misses.saturating_sub(self.misses))
    }

    pub fn stats(&self) -> &SessionStats {
        self.keeper.stats()
    }

    pub fn last_record(&self) -> Option<&SessionRecord> {
        self.last_record.as_ref()
    }

    /// Player position plus calibration offset
    pub fn adjusted_ms(&self) -> i64 {
        self.clock.now_ms()
    }

    pub fn offset_ms(&self) -> i64 {
        self.clock.offset_ms()
    }

    /// Change the calibration offset; the next poll uses it.
    pub fn set_offset_ms(&mut self, offset_ms: i64) {
        self.clock.set_offset_ms(offset_ms);
        self.config.offset_ms = offset_ms;
        // An offset change is not a seek
        self.last_time_ms = None;
    }

    /// Difficulty recorded for the next run; a run in progress keeps its own.
    pub fn set_difficulty(&mut self, difficulty: Difficulty) {
        self.config.difficulty = difficulty;
        if !self.phase.is_running() {
            self.keeper.set_difficulty(difficulty);
        }
    }

    /// Shift the offset by `delta_ms`, returning the new offset
    pub fn nudge_offset(&mut self, delta_ms: i64) -> i64 {
        let offset = self.clock.offset_ms() + delta_ms;
        self.set_offset_ms(offset);
        offset
    }

    /// Load a track and park the player at its start.
    pub fn load_track(&mut self, track: LyricTrack) -> Vec<BeatEvent> {
        let mut events = Vec::new();
        info!("Loaded \"{}\" ({} lines)", track.title(), track.len());
        self.track = Some(track);
        self.to_ready(&mut events);
        events
    }

    /// Play the track from the beginning.
    ///
    /// Does nothing while a run is in progress.
    pub fn start(&mut self) -> Result<Vec<BeatEvent>> {
        let mut events = Vec::new();
        self.start_into(&mut events)?;
        Ok(events)
    }

    /// Poll gated by the primary/fallback cadence
    pub fn tick(&mut self, kind: PollKind) -> Vec<BeatEvent> {
        if !self.polls.due(kind, self.clock.wall_now_ms()) {
            return Vec::new();
        }
        self.poll()
    }

    /// Read the clock and bring phase and current line up to date.
    pub fn poll(&mut self) -> Vec<BeatEvent> {
        let mut events = Vec::new();
        self.update(&mut events);
        events
    }

    pub fn on_player_event(&mut self, event: PlayerEvent) -> Vec<BeatEvent> {
        let mut events = Vec::new();
        if self.clock.on_player_event(event) != Some(PlayerState::Ended) {
            return events;
        }
        self.update(&mut events);
        if self.phase.is_running() {
            debug!("Video ended before the last line closed");
            let now = self.clock.now_ms();
            self.skip_pending(0..self.statuses.len(), now, &mut events);
            self.finish(BeatPhase::Cleared, &mut events);
        }
        events
    }

    pub fn key(&mut self, key: Key) -> Vec<BeatEvent> {
        let mut events = Vec::new();
        match key {
            Key::HardReset => self.to_ready(&mut events),
            Key::Space => self.on_space(&mut events),
            Key::Escape => {
                if self.phase == BeatPhase::Active {
                    self.skip_current(false, &mut events);
                }
            }
            Key::Char(c) if is_typeable(c) => {
                self.edit_line(|state, now| state.type_char(c, now), &mut events)
            }
            Key::Backspace => self.edit_line(|state, now| state.backspace(now), &mut events),
            Key::Char(_) | Key::Enter => {}
        }
        events
    }

    /// Replace the whole input; characters that cannot be typed are dropped.
    pub fn set_input(&mut self, input: &str) -> Vec<BeatEvent> {
        let mut events = Vec::new();
        let sanitized: String = input.chars().filter(|c| is_typeable(*c)).collect();
        self.edit_line(|state, now| state.edit(&sanitized, now), &mut events);
        events
    }

    /// Give up on the current line, optionally seeking to the next line's start.
    pub fn skip_line(&mut self, seek: bool) -> Vec<BeatEvent> {
        let mut events = Vec::new();
        if self.phase == BeatPhase::Active {
            self.skip_current(seek, &mut events);
        }
        events
    }

    /// Jump into the pre-roll, or from the pre-roll straight to the first line.
    pub fn skip_intro(&mut self) -> Vec<BeatEvent> {
        let mut events = Vec::new();
        self.skip_intro_into(&mut events);
        events
    }

    /// End a run early and keep its record; unplayed lines count as skipped.
    pub fn stop(&mut self) -> Vec<BeatEvent> {
        let mut events = Vec::new();
        if !self.phase.is_running() {
            return events;
        }
        self.update(&mut events);
        if self.phase.is_running() {
            info!("Beat-sync stopped early");
            self.clock.pause();
            let now = self.clock.now_ms();
            self.skip_pending(0..self.statuses.len(), now, &mut events);
            self.finish(BeatPhase::Cleared, &mut events);
        }
        events
    }

    /// Stop, rewind and return to ready without a record.
    pub fn reset(&mut self) -> Vec<BeatEvent> {
        let mut events = Vec::new();
        self.to_ready(&mut events);
        events
    }

    fn line_at(&self, i: usize) -> Option<&LyricLine> {
        self.track.as_ref()?.lines().get(i)
    }

    fn status(&self, i: usize) -> Option<LineStatus> {
        self.statuses.get(i).copied()
    }

    fn set_phase(&mut self, to: BeatPhase, events: &mut Vec<BeatEvent>) {
        let from = self.phase;
        self.phase = to;
        if from.changes_kind(&to) {
            debug!("Beat phase {} -> {}", from, to);
            events.push(BeatEvent::PhaseChanged { from, to });
        }
    }

    fn clear_lines(&mut self) {
        let len = self.track.as_ref().map_or(0, LyricTrack::len);
        self.statuses = vec![LineStatus::Pending; len];
        self.current = None;
        self.skip_floor = 0;
        self.line = None;
        self.misses = 0;
        self.last_time_ms = None;
    }

    fn to_ready(&mut self, events: &mut Vec<BeatEvent>) {
        self.keeper.abandon();
        self.clear_lines();
        if self.track.is_none() {
            self.set_phase(BeatPhase::Idle, events);
            return;
        }
        self.clock.pause();
        self.clock.rewind();
        self.set_phase(BeatPhase::Ready, events);
    }

    fn start_into(&mut self, events: &mut Vec<BeatEvent>) -> Result<()> {
        if self.phase.is_running() {
            return Ok(());
        }
        if self.track.is_none() {
            return Err(Error::DataUnavailable("no lyric track loaded".into()));
        }
        self.keeper.set_difficulty(self.config.difficulty);
        self.clear_lines();
        self.clock.rewind();
        self.clock.play();
        self.keeper.begin(self.clock.wall_now_ms());
        self.set_phase(BeatPhase::Waiting, events);
        events.push(BeatEvent::SessionStarted);
        self.update(events);
        Ok(())
    }

    fn on_space(&mut self, events: &mut Vec<BeatEvent>) {
        match self.phase {
            BeatPhase::Idle => {}
            BeatPhase::Ready => {
                if let Err(e) = self.start_into(events) {
                    warn!("Cannot start beat-sync: {}", e);
                }
            }
            BeatPhase::Waiting | BeatPhase::Countdown { .. } => self.skip_intro_into(events),
            BeatPhase::Active => {
                if self.space_is_typeable() {
                    self.edit_line(|state, now| state.type_char(' ', now), events);
                } else {
                    self.skip_current(true, events);
                }
            }
            BeatPhase::Cleared | BeatPhase::Dead => self.to_ready(events),
        }
    }

    /// The current line expects a space next
    fn space_is_typeable(&self) -> bool {
        if self.is_locked() {
            return false;
        }
        self.line.as_ref().is_some_and(|state| {
            let mut next = state.input().to_string();
            next.push(' ');
            state.target().is_prefix_valid(&next)
        })
    }

    fn skip_intro_into(&mut self, events: &mut Vec<BeatEvent>) {
        let Some(first_start) = self.track.as_ref().map(LyricTrack::first_start_ms) else {
            return;
        };
        match self.phase {
            BeatPhase::Waiting => {
                let now = self.clock.now_ms();
                if now >= first_start - INTRO_SKIP_MARGIN_MS {
                    return;
                }
                self.seek((first_start - self.config.preroll_ms).max(now), events);
            }
            BeatPhase::Countdown { .. } => self.seek(first_start, events),
            _ => return,
        }
        self.update(events);
    }

    fn seek(&mut self, to_ms: i64, events: &mut Vec<BeatEvent>) {
        self.clock.seek_to_ms(to_ms);
        events.push(BeatEvent::Seeked { to_ms });
    }

    fn update(&mut self, events: &mut Vec<BeatEvent>) {
        if !self.phase.is_running() {
            return;
        }
        let Some(first_start) = self.track.as_ref().map(LyricTrack::first_start_ms) else {
            return;
        };
        let now = self.clock.now_ms();
        if let Some(last) = self.last_time_ms
            && now < last
        {
            debug!("Clock moved back {} -> {} ms, rescanning lines", last, now);
            self.skip_floor = 0;
        }
        self.last_time_ms = Some(now);

        if now < first_start {
            let remaining_ms = first_start - now;
            let to = if remaining_ms <= self.config.preroll_ms {
                BeatPhase::Countdown { remaining_ms }
            } else {
                BeatPhase::Waiting
            };
            self.set_phase(to, events);
            self.current = None;
            self.line = None;
            return;
        }
        self.set_phase(BeatPhase::Active, events);
        self.advance(now, events);
    }

    fn advance(&mut self, now: i64, events: &mut Vec<BeatEvent>) {
        if let Some(i) = self.current
            && self.status(i) == Some(LineStatus::Pending)
            && self.line_at(i).is_some_and(|line| now >= line.end_ms)
        {
            self.miss_line(i, events);
            if !self.phase.is_running() {
                return;
            }
        }

        let Some(track) = &self.track else {
            return;
        };
        let len = track.len();
        let next = (self.skip_floor..len).find(|&i| now < track.lines()[i].end_ms);
        let jumped_from = self.current.map_or(0, |c| c + 1);

        let Some(idx) = next else {
            self.skip_pending(jumped_from..len, now, events);
            self.finish(BeatPhase::Cleared, events);
            return;
        };
        if self.current == Some(idx) {
            return;
        }
        self.skip_pending(jumped_from..idx, now, events);

        let Some(line) = self.line_at(idx) else {
            return;
        };
        let state = RoundState::new(OutcomeSource::Line(idx), &line.canonical_romaji, line.start_ms);
        debug!("Line {} [{}..{}] {}", idx, line.start_ms, line.end_ms, line.canonical_romaji);
        self.current = Some(idx);
        self.line = Some(state);
        events.push(BeatEvent::LineChanged { index: idx });
    }

    fn line_outcome(&self, i: usize, kind: OutcomeKind, at: i64) -> RoundOutcome {
        match &self.line {
            Some(state) if state.source() == OutcomeSource::Line(i) => state.outcome(kind, at),
            _ => RoundOutcome {
                source: OutcomeSource::Line(i),
                kind,
                elapsed_ms: 0,
                mistakes: 0,
                typed_chars: 0,
            },
        }
    }

    fn settle(&mut self, i: usize, status: LineStatus, outcome: RoundOutcome, events: &mut Vec<BeatEvent>) {
        if let Some(slot) = self.statuses.get_mut(i) {
            *slot = status;
        }
        let points = self.keeper.record(&outcome);
        events.push(BeatEvent::LineFinished { outcome, points });
    }

    /// Settle every still-pending line in `range` as skipped
    fn skip_pending(&mut self, range: Range<usize>, at: i64, events: &mut Vec<BeatEvent>) {
        for i in range {
            if self.status(i) != Some(LineStatus::Pending) {
                continue;
            }
            let outcome = self.line_outcome(i, OutcomeKind::Skipped, at);
            self.settle(i, LineStatus::Skipped, outcome, events);
        }
    }

    fn miss_line(&mut self, i: usize, events: &mut Vec<BeatEvent>) {
        let end_ms = self.line_at(i).map_or(0, |line| line.end_ms);
        let outcome = self.line_outcome(i, OutcomeKind::TimedOut, end_ms);
        self.settle(i, LineStatus::Missed, outcome, events);
        self.misses += 1;
        debug!("Missed line {} ({} misses)", i, self.misses);
        if self.config.max_misses > 0 && self.misses >= self.config.max_misses {
            self.clock.pause();
            self.finish(BeatPhase::Dead, events);
        }
    }

    fn skip_current(&mut self, seek: bool, events: &mut Vec<BeatEvent>) {
        let Some(i) = self.current else {
            return;
        };
        let now = self.clock.now_ms();
        if self.status(i) == Some(LineStatus::Pending) {
            let outcome = self.line_outcome(i, OutcomeKind::Skipped, now);
            self.settle(i, LineStatus::Skipped, outcome, events);
        }
        self.skip_floor = self.skip_floor.max(i + 1);
        if seek
            && let Some(next_start) = self.line_at(i + 1).map(|line| line.start_ms)
            && next_start > now
        {
            self.seek(next_start, events);
        }
        self.update(events);
    }

    fn edit_line<F>(&mut self, edit: F, events: &mut Vec<BeatEvent>)
    where
        F: FnOnce(&mut RoundState, i64) -> Edit,
    {
        if self.phase != BeatPhase::Active || self.is_locked() {
            return;
        }
        let Some(i) = self.current else {
            return;
        };
        let Some(start_ms) = self.line_at(i).map(|line| line.start_ms) else {
            return;
        };
        let now = self.clock.now_ms();
        if now < start_ms {
            return;
        }
        let Some(state) = self.line.as_mut() else {
            return;
        };
        match edit(state, now) {
            Edit::Rejected { mistakes } => events.push(BeatEvent::Mistake {
                line: i,
                total: mistakes,
            }),
            Edit::Completed(outcome) => {
                debug!("Solved line {} in {} ms", i, outcome.elapsed_ms);
                self.settle(i, LineStatus::Solved, outcome, events);
            }
            Edit::Ignored | Edit::Accepted | Edit::Deleted => {}
        }
    }

    fn finish(&mut self, phase: BeatPhase, events: &mut Vec<BeatEvent>) {
        self.set_phase(phase, events);
        let Some(record) = self.keeper.finish(self.clock.wall_now_ms()) else {
            return;
        };
        if let Some(store) = &self.store
            && let Err(e) = store.append(&record)
        {
            warn!("Failed to save beat-sync record: {}", e);
        }
        self.last_record = Some(record.clone());
        events.push(BeatEvent::SessionFinished(record));
    }
}
