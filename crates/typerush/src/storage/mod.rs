//! Session history on disk and the views built from it.

mod daily;
mod records;

pub use daily::{DailyBest, daily_bests, daily_bests_in};
pub use records::{DEFAULT_RECORD_CAP, RecordStore};
