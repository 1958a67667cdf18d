//! Day-granularity state classification of work items.
//!
//! A snapshot dated `D` counts every lifecycle timestamp whose UTC midnight
//! falls strictly before `UTCMidnight(D) + 24h`. Since both sides of that
//! comparison are midnights, the test reduces to "the timestamp's UTC
//! calendar date is on or before `D`", which is how [`DayCutoff`] evaluates
//! it (no arithmetic, so no overflow at the end of the calendar).
//!
//! Classification is priority ordered: closed beats activated beats todo.
//! Each date is evaluated from scratch; no state carries across dates.

use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::model::{SnapshotCounts, WorkItem};

/// The three burndown buckets a work item can fall into on a given day.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BucketState {
    Todo,
    InProgress,
    Done,
}

impl BucketState {
    const fn as_str(self) -> &'static str {
        match self {
            Self::Todo => "todo",
            Self::InProgress => "in_progress",
            Self::Done => "done",
        }
    }
}

impl fmt::Display for BucketState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// End-of-day boundary for a snapshot date, in UTC.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DayCutoff {
    date: NaiveDate,
}

impl DayCutoff {
    #[must_use]
    pub const fn for_date(date: NaiveDate) -> Self {
        Self { date }
    }

    #[must_use]
    pub const fn date(self) -> NaiveDate {
        self.date
    }

    /// `true` when `UTCMidnight(ts) < UTCMidnight(date) + 24h`.
    #[must_use]
    pub fn includes(self, ts: DateTime<Utc>) -> bool {
        utc_midnight(ts).date_naive() <= self.date
    }
}

/// Truncate a timestamp to 00:00:00 UTC of the same day.
#[must_use]
pub fn utc_midnight(ts: DateTime<Utc>) -> DateTime<Utc> {
    ts.date_naive().and_time(NaiveTime::MIN).and_utc()
}

/// Classify one work item as of the end of the cutoff day.
///
/// `is_removed` is not consulted here; callers decide which items belong in
/// the population.
#[must_use]
pub fn classify(item: &WorkItem, cutoff: DayCutoff) -> BucketState {
    if item.closed_date.is_some_and(|ts| cutoff.includes(ts)) {
        BucketState::Done
    } else if item.activated_date.is_some_and(|ts| cutoff.includes(ts)) {
        BucketState::InProgress
    } else {
        BucketState::Todo
    }
}

/// Count the non-removed `items` into buckets as of `date`.
///
/// The returned counts always have `blocked == 0`.
#[must_use]
pub fn tally<'a, I>(items: I, date: NaiveDate) -> SnapshotCounts
where
    I: IntoIterator<Item = &'a WorkItem>,
{
    let cutoff = DayCutoff::for_date(date);
    let mut counts = SnapshotCounts::default();
    for item in items.into_iter().filter(|item| !item.is_removed) {
        let slot = match classify(item, cutoff) {
            BucketState::Todo => &mut counts.todo,
            BucketState::InProgress => &mut counts.in_progress,
            BucketState::Done => &mut counts.done,
        };
        *slot = slot.saturating_add(1);
    }
    counts
}
