use std::cell::Cell;

use strum::{Display, IntoStaticStr};
use tracing::debug;

use super::{ClockSource, WallClock};

/// A reading further behind the last reported time than this is an external
/// seek (the viewer scrubbed the player), not jitter.
const SEEK_DETECT_MS: i64 = 1000;

/// The external video player, reduced to the operations the clock needs.
pub trait VideoPlayer {
    /// Playback position in seconds, `None` while the player cannot report one
    fn current_time(&self) -> Option<f64>;

    /// Video length in seconds, if known
    fn duration(&self) -> Option<f64>;

    fn seek_to(&mut self, seconds: f64);

    fn play(&mut self);

    fn pause(&mut self);
}

/// Playback state as reported by the player
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Display, IntoStaticStr)]
#[strum(serialize_all = "lowercase")]
pub enum PlayerState {
    #[default]
    Unstarted,
    Playing,
    Paused,
    Ended,
}

/// Notification from the player
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlayerEvent {
    /// The player finished loading and accepts commands
    Ready,
    StateChanged(PlayerState),
}

/// Commands issued before the player was ready, merged into one.
///
/// Later commands overwrite earlier ones: a seek replaces a previous seek and
/// a pause cancels a queued play.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PendingIntent {
    /// Adjusted time to seek to
    pub seek_ms: Option<i64>,
    /// `Some(true)` to play, `Some(false)` to pause
    pub play: Option<bool>,
}

impl PendingIntent {
    pub fn is_empty(&self) -> bool {
        self.seek_ms.is_none() && self.play.is_none()
    }
}

#[derive(Debug, Clone, Copy, Default)]
struct Reading {
    /// Last known raw player position
    position_ms: i64,
    /// Wall time at which `position_ms` was observed
    wall_ms: Option<i64>,
    /// Last adjusted time handed out
    emitted_ms: Option<i64>,
}

/// Clock reading an external player's position plus a calibration offset.
///
/// `now_ms` returns `position * 1000 + offset`. While the player cannot
/// report a position and is playing, the time is extrapolated from the last
/// reading using wall time; the next real reading replaces the estimate.
/// Small backward corrections are held at the last reported value so the
/// clock only goes backward on a seek.
pub struct VideoClockSource<P, W = WallClock> {
    player: P,
    wall: W,
    offset_ms: i64,
    ready: bool,
    state: PlayerState,
    pending: PendingIntent,
    reading: Cell<Reading>,
}

impl<P: VideoPlayer> VideoClockSource<P, WallClock> {
    pub fn new(player: P) -> Self {
        Self::with_wall_clock(player, WallClock::new())
    }
}

impl<P: VideoPlayer, W: ClockSource> VideoClockSource<P, W> {
    pub fn with_wall_clock(player: P, wall: W) -> Self {
        Self {
            player,
            wall,
            offset_ms: 0,
            ready: false,
            state: PlayerState::Unstarted,
            pending: PendingIntent::default(),
            reading: Cell::new(Reading::default()),
        }
    }

    pub fn offset_ms(&self) -> i64 {
        self.offset_ms
    }

    /// Change the calibration offset. Takes effect on the next read.
    pub fn set_offset_ms(&mut self, offset_ms: i64) {
        if offset_ms != self.offset_ms {
            debug!("Calibration offset {} -> {} ms", self.offset_ms, offset_ms);
            self.offset_ms = offset_ms;
            self.reset_emitted();
        }
    }

    pub fn is_ready(&self) -> bool {
        self.ready
    }

    pub fn state(&self) -> PlayerState {
        self.state
    }

    pub fn pending(&self) -> PendingIntent {
        self.pending
    }

    pub fn duration_ms(&self) -> Option<i64> {
        self.player
            .duration()
            .filter(|d| d.is_finite())
            .map(|d| (d * 1000.0).round() as i64)
    }

    pub fn player(&self) -> &P {
        &self.player
    }

    pub fn player_mut(&mut self) -> &mut P {
        &mut self.player
    }

    /// Seek so that adjusted time becomes `adjusted_ms`.
    pub fn seek_to_ms(&mut self, adjusted_ms: i64) {
        let raw_ms = (adjusted_ms - self.offset_ms).max(0);
        if self.ready {
            debug!("Seeking player to {} ms", raw_ms);
            self.player.seek_to(raw_ms as f64 / 1000.0);
        } else {
            self.pending.seek_ms = Some(adjusted_ms);
        }
        self.reading.set(Reading {
            position_ms: raw_ms,
            wall_ms: Some(self.wall.now_ms()),
            emitted_ms: None,
        });
    }

    /// Seek the player back to the start of the video
    pub fn rewind(&mut self) {
        self.seek_to_ms(self.offset_ms);
    }

    /// Wall time, for pacing polls independently of playback
    pub fn wall_now_ms(&self) -> i64 {
        self.wall.now_ms()
    }

    pub fn play(&mut self) {
        if self.ready {
            self.player.play();
        } else {
            self.pending.play = Some(true);
        }
    }

    pub fn pause(&mut self) {
        if self.ready {
            self.player.pause();
        } else {
            self.pending.play = Some(false);
        }
    }

    /// Feed a player notification. Returns the new state on state changes.
    pub fn on_player_event(&mut self, event: PlayerEvent) -> Option<PlayerState> {
        match event {
            PlayerEvent::Ready => {
                self.mark_ready();
                None
            }
            PlayerEvent::StateChanged(state) => {
                // Settle the position under the old state before switching
                self.sample();
                self.state = state;
                debug!("Player state: {}", state);
                Some(state)
            }
        }
    }

    /// Mark the player ready and replay whatever was queued before.
    pub fn mark_ready(&mut self) {
        if self.ready {
            return;
        }
        self.ready = true;
        let pending = std::mem::take(&mut self.pending);
        if pending.is_empty() {
            return;
        }
        debug!("Replaying pending intent: {:?}", pending);
        if let Some(seek_ms) = pending.seek_ms {
            self.seek_to_ms(seek_ms);
        }
        match pending.play {
            Some(true) => self.player.play(),
            Some(false) => self.player.pause(),
            None => {}
        }
    }

    fn reset_emitted(&self) {
        let mut reading = self.reading.get();
        reading.emitted_ms = None;
        self.reading.set(reading);
    }

    /// Raw player position in ms, extrapolated when the player has no reading.
    fn sample(&self) -> i64 {
        let wall_now = self.wall.now_ms();
        let mut reading = self.reading.get();
        let raw = match self.player.current_time().filter(|t| t.is_finite()) {
            Some(seconds) => {
                let position_ms = (seconds * 1000.0).round() as i64;
                reading.position_ms = position_ms;
                reading.wall_ms = Some(wall_now);
                position_ms
            }
            None => {
                let position_ms = match (self.state, reading.wall_ms) {
                    (PlayerState::Playing, Some(wall_ms)) => {
                        reading.position_ms + (wall_now - wall_ms).max(0)
                    }
                    _ => reading.position_ms,
                };
                // Always rebase, so time spent paused is never extrapolated later
                reading.position_ms = position_ms;
                reading.wall_ms = Some(wall_now);
                position_ms
            }
        };
        self.reading.set(reading);
        raw
    }
}

impl<P: VideoPlayer, W: ClockSource> ClockSource for VideoClockSource<P, W> {
    fn now_ms(&self) -> i64 {
        let adjusted = self.sample() + self.offset_ms;
        let mut reading = self.reading.get();
        let now = match reading.emitted_ms {
            Some(last) if adjusted < last && last - adjusted <= SEEK_DETECT_MS => last,
            _ => adjusted,
        };
        reading.emitted_ms = Some(now);
        self.reading.set(reading);
        now
    }

    fn drift_tolerant(&self) -> bool {
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;

    #[derive(Debug, Default)]
    struct FakePlayer {
        time: Option<f64>,
        duration: Option<f64>,
        seeks: Vec<f64>,
        plays: usize,
        pauses: usize,
    }

    impl VideoPlayer for FakePlayer {
        fn current_time(&self) -> Option<f64> {
            self.time
        }

        fn duration(&self) -> Option<f64> {
            self.duration
        }

        fn seek_to(&mut self, seconds: f64) {
            self.seeks.push(seconds);
            self.time = Some(seconds);
        }

        fn play(&mut self) {
            self.plays += 1;
        }

        fn pause(&mut self) {
            self.pauses += 1;
        }
    }

    fn ready_source() -> (VideoClockSource<FakePlayer, ManualClock>, ManualClock) {
        let wall = ManualClock::new();
        let mut source = VideoClockSource::with_wall_clock(FakePlayer::default(), wall.clone());
        source.on_player_event(PlayerEvent::Ready);
        source.on_player_event(PlayerEvent::StateChanged(PlayerState::Playing));
        (source, wall)
    }

    #[test]
    fn test_reports_position_plus_offset() {
        let (mut source, _wall) = ready_source();
        source.player_mut().time = Some(4.2);
        assert_eq!(source.now_ms(), 4200);

        source.set_offset_ms(-150);
        assert_eq!(source.now_ms(), 4050);
        assert!(source.drift_tolerant());
    }

    #[test]
    fn test_extrapolates_while_buffering() {
        let (mut source, wall) = ready_source();
        source.player_mut().time = Some(2.0);
        assert_eq!(source.now_ms(), 2000);

        source.player_mut().time = None;
        wall.advance(250);
        assert_eq!(source.now_ms(), 2250);

        // A fresh reading resets the extrapolation base
        wall.advance(50);
        source.player_mut().time = Some(2.35);
        assert_eq!(source.now_ms(), 2350);

        source.player_mut().time = None;
        wall.advance(100);
        assert_eq!(source.now_ms(), 2450);
    }

    #[test]
    fn test_no_extrapolation_while_paused() {
        let (mut source, wall) = ready_source();
        source.player_mut().time = Some(1.0);
        assert_eq!(source.now_ms(), 1000);

        source.on_player_event(PlayerEvent::StateChanged(PlayerState::Paused));
        source.player_mut().time = None;
        wall.advance(500);
        assert_eq!(source.now_ms(), 1000);
    }

    #[test]
    fn test_never_moves_backward_without_seek() {
        let (mut source, wall) = ready_source();
        source.player_mut().time = Some(2.0);
        source.now_ms();
        source.player_mut().time = None;
        wall.advance(300);
        assert_eq!(source.now_ms(), 2300);

        // Player catches up slightly behind the estimate
        source.player_mut().time = Some(2.1);
        assert_eq!(source.now_ms(), 2300);

        source.player_mut().time = Some(2.4);
        assert_eq!(source.now_ms(), 2400);
    }

    #[test]
    fn test_explicit_seek_moves_backward() {
        let (mut source, _wall) = ready_source();
        source.player_mut().time = Some(9.0);
        assert_eq!(source.now_ms(), 9000);

        source.seek_to_ms(8800);
        assert_eq!(source.player().seeks, vec![8.8]);
        assert_eq!(source.now_ms(), 8800);
    }

    #[test]
    fn test_large_external_jump_is_a_seek() {
        let (mut source, _wall) = ready_source();
        source.player_mut().time = Some(30.0);
        source.now_ms();
        source.player_mut().time = Some(3.0);
        assert_eq!(source.now_ms(), 3000);
    }

    #[test]
    fn test_seek_accounts_for_offset() {
        let (mut source, _wall) = ready_source();
        source.set_offset_ms(200);
        source.seek_to_ms(5000);
        source.seek_to_ms(100);
        assert_eq!(source.player().seeks, vec![4.8, 0.0]);
    }

    #[test]
    fn test_commands_before_ready_are_replayed_once() {
        let wall = ManualClock::new();
        let mut source = VideoClockSource::with_wall_clock(FakePlayer::default(), wall);
        source.seek_to_ms(1000);
        source.play();
        assert!(!source.is_ready());
        assert!(source.player().seeks.is_empty());
        assert_eq!(source.player().plays, 0);
        assert_eq!(
            source.pending(),
            PendingIntent {
                seek_ms: Some(1000),
                play: Some(true)
            }
        );

        source.on_player_event(PlayerEvent::Ready);
        assert_eq!(source.player().seeks, vec![1.0]);
        assert_eq!(source.player().plays, 1);
        assert!(source.pending().is_empty());

        source.on_player_event(PlayerEvent::Ready);
        assert_eq!(source.player().plays, 1);
    }

    #[test]
    fn test_pending_pause_overrides_play() {
        let mut source =
            VideoClockSource::with_wall_clock(FakePlayer::default(), ManualClock::new());
        source.play();
        source.pause();
        assert_eq!(source.pending().play, Some(false));
        source.mark_ready();
        assert_eq!(source.player().plays, 0);
        assert_eq!(source.player().pauses, 1);
    }

    #[test]
    fn test_pause_while_buffering_holds_extrapolated_position() {
        let (mut source, wall) = ready_source();
        source.player_mut().time = Some(2.0);
        assert_eq!(source.now_ms(), 2000);

        source.player_mut().time = None;
        wall.advance(1500);
        assert_eq!(source.now_ms(), 3500);

        source.on_player_event(PlayerEvent::StateChanged(PlayerState::Paused));
        assert_eq!(source.now_ms(), 3500);
        wall.advance(5000);
        assert_eq!(source.now_ms(), 3500);

        source.on_player_event(PlayerEvent::StateChanged(PlayerState::Playing));
        wall.advance(100);
        assert_eq!(source.now_ms(), 3600);
    }

    #[test]
    fn test_resume_does_not_count_time_spent_paused() {
        let (mut source, wall) = ready_source();
        source.player_mut().time = Some(2.0);
        assert_eq!(source.now_ms(), 2000);
        source.player_mut().time = None;

        // Pause lands before any further sample
        source.on_player_event(PlayerEvent::StateChanged(PlayerState::Paused));
        wall.advance(5000);
        source.on_player_event(PlayerEvent::StateChanged(PlayerState::Playing));
        wall.advance(100);
        assert_eq!(source.now_ms(), 2100);
    }

    #[test]
    fn test_duration_ms() {
        let (mut source, _wall) = ready_source();
        assert_eq!(source.duration_ms(), None);
        source.player_mut().duration = Some(212.5);
        assert_eq!(source.duration_ms(), Some(212_500));
    }
}
