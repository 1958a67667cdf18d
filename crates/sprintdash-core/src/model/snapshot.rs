use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt;

/// The per-state counters stored on a snapshot row.
///
/// `blocked` is carried separately and never contributes to [`total`].
/// Nothing derives it from work item data. A rebuild keeps it as stored; the
/// zero-count backfill resets it.
///
/// [`total`]: SnapshotCounts::total
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct SnapshotCounts {
    pub todo: u32,
    pub in_progress: u32,
    pub done: u32,
    #[serde(default)]
    pub blocked: u32,
}

impl SnapshotCounts {
    #[must_use]
    pub const fn new(todo: u32, in_progress: u32, done: u32) -> Self {
        Self {
            todo,
            in_progress,
            done,
            blocked: 0,
        }
    }

    /// Every item unstarted: the assumed state at sprint start.
    #[must_use]
    pub const fn all_todo(total: u32) -> Self {
        Self::new(total, 0, 0)
    }

    /// `todo + in_progress + done`.
    #[must_use]
    pub fn total(&self) -> u64 {
        u64::from(self.todo) + u64::from(self.in_progress) + u64::from(self.done)
    }

    #[must_use]
    pub fn is_zero(&self) -> bool {
        self.total() == 0
    }

    /// Compare the three state buckets, ignoring `blocked`.
    #[must_use]
    pub const fn same_buckets(&self, other: &Self) -> bool {
        self.todo == other.todo && self.in_progress == other.in_progress && self.done == other.done
    }

    /// Same buckets with `blocked` replaced.
    #[must_use]
    pub const fn with_blocked(mut self, blocked: u32) -> Self {
        self.blocked = blocked;
        self
    }
}

impl fmt::Display for SnapshotCounts {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({},{},{})", self.todo, self.in_progress, self.done)
    }
}

/// A stored daily rollup for one sprint, keyed by `(sprint_id, snapshot_date)`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SprintSnapshot {
    pub id: i64,
    pub sprint_id: String,
    pub snapshot_date: NaiveDate,
    #[serde(flatten)]
    pub counts: SnapshotCounts,
}
