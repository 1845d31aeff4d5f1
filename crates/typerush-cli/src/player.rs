use std::collections::VecDeque;

use tracing::debug;
use typerush::{ClockSource, PlayerEvent, PlayerState, VideoPlayer, WallClock};

/// Headless stand-in for an embedded video player.
///
/// Playback position advances with the wall clock while playing. State
/// changes are queued as [`PlayerEvent`]s the way a real player reports them
/// asynchronously; the game loop collects them with
/// [`drain_events`](Self::drain_events).
pub struct SimulatedPlayer<C = WallClock> {
    clock: C,
    duration_ms: i64,
    position_ms: i64,
    playing_since: Option<i64>,
    ended: bool,
    events: VecDeque<PlayerEvent>,
}

impl SimulatedPlayer<WallClock> {
    pub fn new(duration_ms: i64) -> Self {
        Self::with_clock(duration_ms, WallClock::new())
    }
}

impl<C: ClockSource> SimulatedPlayer<C> {
    pub fn with_clock(duration_ms: i64, clock: C) -> Self {
        Self {
            clock,
            duration_ms: duration_ms.max(0),
            position_ms: 0,
            playing_since: None,
            ended: false,
            events: VecDeque::from([PlayerEvent::Ready]),
        }
    }

    fn position_now(&self) -> i64 {
        match self.playing_since {
            Some(since) => (self.position_ms + self.clock.now_ms() - since).min(self.duration_ms),
            None => self.position_ms,
        }
    }

    pub fn is_playing(&self) -> bool {
        self.playing_since.is_some()
    }

    /// Notifications since the last call. Reaching the end is reported once.
    pub fn drain_events(&mut self) -> Vec<PlayerEvent> {
        if !self.ended && self.is_playing() && self.position_now() >= self.duration_ms {
            debug!("Simulated video ended at {}ms", self.duration_ms);
            self.position_ms = self.duration_ms;
            self.playing_since = None;
            self.ended = true;
            self.events
                .push_back(PlayerEvent::StateChanged(PlayerState::Ended));
        }
        self.events.drain(..).collect()
    }
}

impl<C: ClockSource> VideoPlayer for SimulatedPlayer<C> {
    fn current_time(&self) -> Option<f64> {
        Some(self.position_now() as f64 / 1000.0)
    }

    fn duration(&self) -> Option<f64> {
        Some(self.duration_ms as f64 / 1000.0)
    }

    fn seek_to(&mut self, seconds: f64) {
        self.position_ms = ((seconds * 1000.0).round() as i64).clamp(0, self.duration_ms);
        if self.playing_since.is_some() {
            self.playing_since = Some(self.clock.now_ms());
        }
        if self.position_ms < self.duration_ms {
            self.ended = false;
        }
    }

    fn play(&mut self) {
        if self.playing_since.is_none() {
            self.playing_since = Some(self.clock.now_ms());
            self.ended = false;
            self.events
                .push_back(PlayerEvent::StateChanged(PlayerState::Playing));
        }
    }

    fn pause(&mut self) {
        if self.playing_since.is_some() {
            self.position_ms = self.position_now();
            self.playing_since = None;
            self.events
                .push_back(PlayerEvent::StateChanged(PlayerState::Paused));
        }
    }
}
