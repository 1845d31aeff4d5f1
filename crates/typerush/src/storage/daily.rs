use std::cmp::Ordering;
use std::collections::BTreeMap;

use chrono::{Local, NaiveDate, TimeZone};

use crate::score::SessionRecord;

/// Best session of one calendar day
#[derive(Debug, Clone, PartialEq)]
pub struct DailyBest {
    pub date: NaiveDate,
    pub record: SessionRecord,
}

/// More points, then fewer mistakes, then the earlier finish.
fn rank(a: &SessionRecord, b: &SessionRecord) -> Ordering {
    b.points
        .cmp(&a.points)
        .then(a.total_mistakes.cmp(&b.total_mistakes))
        .then(a.ended_at.cmp(&b.ended_at))
}

/// Best record per local calendar day, best day first.
pub fn daily_bests(records: &[SessionRecord]) -> Vec<DailyBest> {
    daily_bests_in(records, &Local)
}

/// [`daily_bests`] with days taken in `tz`
pub fn daily_bests_in<Tz: TimeZone>(records: &[SessionRecord], tz: &Tz) -> Vec<DailyBest> {
    let mut best: BTreeMap<NaiveDate, &SessionRecord> = BTreeMap::new();
    for record in records {
        let date = record.started_at.with_timezone(tz).date_naive();
        best.entry(date)
            .and_modify(|current| {
                if rank(record, current) == Ordering::Less {
                    *current = record;
                }
            })
            .or_insert(record);
    }

    let mut days: Vec<DailyBest> = best
        .into_iter()
        .map(|(date, record)| DailyBest {
            date,
            record: record.clone(),
        })
        .collect();
    days.sort_by(|a, b| rank(&a.record, &b.record));
    days
}
