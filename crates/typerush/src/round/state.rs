use super::{OutcomeKind, OutcomeSource, RoundOutcome};
use crate::romaji::{Highlight, RomajiTarget};

/// Result of offering a new input value to a round.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Edit {
    /// Same as the current input, or the round is not accepting input
    Ignored,
    Accepted,
    Deleted,
    /// Input left unchanged; `mistakes` is the new total
    Rejected { mistakes: u32 },
    Completed(RoundOutcome),
}

/// Typing state of one round: what is being typed, what has been typed.
#[derive(Debug, Clone)]
pub struct RoundState {
    source: OutcomeSource,
    target: RomajiTarget,
    input: String,
    mistake_count: u32,
    typed_chars: usize,
    started_at_ms: i64,
}

impl RoundState {
    pub fn new(source: OutcomeSource, canonical: &str, started_at_ms: i64) -> Self {
        Self {
            source,
            target: RomajiTarget::new(canonical),
            input: String::new(),
            mistake_count: 0,
            typed_chars: 0,
            started_at_ms,
        }
    }

    pub fn source(&self) -> OutcomeSource {
        self.source
    }

    pub fn target(&self) -> &RomajiTarget {
        &self.target
    }

    pub fn input(&self) -> &str {
        &self.input
    }

    pub fn mistake_count(&self) -> u32 {
        self.mistake_count
    }

    pub fn typed_chars(&self) -> usize {
        self.typed_chars
    }

    pub fn started_at_ms(&self) -> i64 {
        self.started_at_ms
    }

    /// Restart the round clock (input going live after a countdown or reveal)
    pub fn set_started_at_ms(&mut self, ms: i64) {
        self.started_at_ms = ms;
    }

    pub fn highlight(&self) -> Highlight {
        self.target.highlight(&self.input)
    }

    pub fn is_complete(&self) -> bool {
        self.target.is_complete(&self.input)
    }

    /// Offer `next` as the new input.
    ///
    /// Shorter inputs are deletions and always accepted. Anything else must
    /// stay a valid prefix of an accepted spelling or it is rejected, the
    /// input is left as it was, and the mistake count goes up by one.
    pub fn edit(&mut self, next: &str, now_ms: i64) -> Edit {
        if next == self.input {
            return Edit::Ignored;
        }
        let current_len = self.input.chars().count();
        let next_len = next.chars().count();

        if next_len < current_len {
            self.input = next.to_string();
            return Edit::Deleted;
        }

        if !self.target.is_prefix_valid(next) {
            self.mistake_count += 1;
            return Edit::Rejected {
                mistakes: self.mistake_count,
            };
        }

        self.typed_chars += next_len - current_len;
        self.input = next.to_string();
        if self.target.is_complete(&self.input) {
            Edit::Completed(self.outcome(OutcomeKind::Solved, now_ms))
        } else {
            Edit::Accepted
        }
    }

    pub fn type_char(&mut self, c: char, now_ms: i64) -> Edit {
        let mut next = self.input.clone();
        next.push(c);
        self.edit(&next, now_ms)
    }

    pub fn backspace(&mut self, now_ms: i64) -> Edit {
        let mut next = self.input.clone();
        if next.pop().is_none() {
            return Edit::Ignored;
        }
        self.edit(&next, now_ms)
    }

    /// Submit the input as it stands
    pub fn submit(&self, now_ms: i64) -> Option<RoundOutcome> {
        self.is_complete()
            .then(|| self.outcome(OutcomeKind::Solved, now_ms))
    }

    pub fn outcome(&self, kind: OutcomeKind, now_ms: i64) -> RoundOutcome {
        RoundOutcome {
            source: self.source,
            kind,
            elapsed_ms: (now_ms - self.started_at_ms).max(0),
            mistakes: self.mistake_count,
            typed_chars: self.typed_chars,
        }
    }
}
