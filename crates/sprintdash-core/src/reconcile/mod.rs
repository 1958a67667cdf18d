//! Batch routines that check and repair sprint snapshot counters.
//!
//! - [`rebuild`] recomputes every snapshot from work item timestamps
//! - [`fix_counts`] backfills all-zero snapshots from the first valid one
//! - [`validate`] reports snapshots whose sum disagrees with the live item count
//! - [`burndown`] derives the remaining-work series from stored snapshots
//!
//! All four are single-pass and single-threaded. Each row update is
//! independent, so an interrupted run can simply be re-run.

pub mod burndown;
pub mod fix_counts;
pub mod rebuild;
pub mod validate;

use chrono::NaiveDate;
use serde::Serialize;
use std::fmt;
use tracing::debug;

use crate::error::ErrorCode;
use crate::model::SnapshotCounts;
use crate::store::{SnapshotStore, StoreError};

/// Why a sprint was left alone by a batch run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SkipReason {
    /// The requested sprint id does not exist in the store.
    SprintNotFound,
    /// No snapshot has positive counts to backfill from.
    NoReferenceSnapshot,
}

impl SkipReason {
    #[must_use]
    pub const fn code(self) -> ErrorCode {
        match self {
            Self::SprintNotFound => ErrorCode::SprintNotFound,
            Self::NoReferenceSnapshot => ErrorCode::NoReferenceSnapshot,
        }
    }
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code().message())
    }
}

/// One snapshot row whose counters were (or, in a dry run, would be) rewritten.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SnapshotChange {
    pub snapshot_id: i64,
    pub snapshot_date: NaiveDate,
    pub before: SnapshotCounts,
    pub after: SnapshotCounts,
}

/// Knobs shared by the repairing routines.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReconcileOptions {
    /// Compute and report changes without writing them.
    pub dry_run: bool,
}

/// Raised when a validation pass finds snapshots that disagree with the
/// live work item count.
#[derive(Debug, thiserror::Error)]
#[error("{mismatched} of {checked} snapshots disagree with the live work item count")]
pub struct MismatchError {
    /// Snapshots whose sum differs from the expected total.
    pub mismatched: usize,
    /// Snapshots examined.
    pub checked: usize,
}

impl MismatchError {
    #[must_use]
    pub const fn code(&self) -> ErrorCode {
        ErrorCode::SnapshotCountMismatch
    }
}

/// Raised when a command addressed a single sprint that does not exist.
#[derive(Debug, thiserror::Error)]
#[error("sprint '{sprint_id}' not found")]
pub struct SprintNotFoundError {
    pub sprint_id: String,
}

impl SprintNotFoundError {
    #[must_use]
    pub const fn code(&self) -> ErrorCode {
        ErrorCode::SprintNotFound
    }
}

/// Raised when a reference total does not fit a single snapshot counter.
#[derive(Debug, thiserror::Error)]
#[error("reference snapshot {snapshot_id} totals {total_items} items, more than one counter can hold")]
pub struct CountOverflowError {
    pub snapshot_id: i64,
    pub total_items: u64,
}

impl CountOverflowError {
    #[must_use]
    pub const fn code(&self) -> ErrorCode {
        ErrorCode::CountOverflow
    }
}

/// The sprints a batch run should visit: the explicit list when one is
/// given, otherwise every sprint in the store. Ids are trimmed and
/// deduplicated; a list holding only blank ids counts as empty.
///
/// # Errors
///
/// Returns an error if the store cannot enumerate sprints.
pub fn resolve_targets<S>(store: &S, requested: &[String]) -> Result<Vec<String>, StoreError>
where
    S: SnapshotStore + ?Sized,
{
    let mut targets: Vec<String> = Vec::with_capacity(requested.len());
    for id in requested {
        let id = id.trim();
        if !id.is_empty() && !targets.iter().any(|seen| seen == id) {
            targets.push(id.to_string());
        }
    }

    if targets.is_empty() {
        if !requested.is_empty() {
            debug!(requested = requested.len(), "only blank sprint ids given, using every sprint");
        }
        return store.sprint_ids();
    }
    Ok(targets)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Sprint;
    use crate::store::MemoryStore;

    #[test]
    fn empty_request_means_every_sprint() {
        let mut store = MemoryStore::new();
        store.insert_sprint(Sprint::new("b", "B", "P"));
        store.insert_sprint(Sprint::new("a", "A", "P"));
        assert_eq!(
            resolve_targets(&store, &[]).unwrap(),
            vec!["a".to_string(), "b".to_string()]
        );
    }

    #[test]
    fn explicit_request_is_trimmed_and_deduplicated() {
        let store = MemoryStore::new();
        let requested = vec![
            " s-2 ".to_string(),
            "s-1".to_string(),
            "s-2".to_string(),
            String::new(),
        ];
        assert_eq!(
            resolve_targets(&store, &requested).unwrap(),
            vec!["s-2".to_string(), "s-1".to_string()]
        );
    }

    #[test]
    fn blank_request_falls_back_to_every_sprint() {
        let mut store = MemoryStore::new();
        store.insert_sprint(Sprint::new("a", "A", "P"));
        let requested = vec!["   ".to_string(), String::new()];
        assert_eq!(
            resolve_targets(&store, &requested).unwrap(),
            vec!["a".to_string()]
        );
    }

    #[test]
    fn skip_reasons_carry_codes() {
        assert_eq!(SkipReason::SprintNotFound.code().code(), "E2001");
        assert_eq!(
            SkipReason::NoReferenceSnapshot.to_string(),
            "No snapshot with positive counts"
        );
    }
}
