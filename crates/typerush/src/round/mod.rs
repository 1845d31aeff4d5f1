//! The round core shared by every mode.
//!
//! - [`RoundState`]: input buffer, mistakes and the precomputed romaji target
//! - [`RoundMachine`]: countdown, reveal and deadline delays for one round
//! - [`MachineEvent`] / [`RoundOutcome`]: what machine calls report back

mod event;
mod key;
mod machine;
mod phase;
mod state;

pub use event::{MachineEvent, OutcomeKind, OutcomeSource, RoundOutcome};
pub use key::Key;
pub use machine::{RoundMachine, RoundTimings};
pub use phase::RoundPhase;
pub use state::{Edit, RoundState};
