//! Recompute every snapshot of a sprint from work item lifecycle timestamps.
//!
//! Each snapshot date is classified from scratch against the sprint's
//! current non-removed work items (see [`crate::classify`]). Rows whose
//! computed todo/in-progress/done triple already matches are not written.
//! The blocked counter is carried through unchanged.

use std::time::Instant;

use anyhow::{Context, Result};
use serde::Serialize;
use tracing::{debug, info, warn};

use super::{ReconcileOptions, SkipReason, SnapshotChange};
use crate::classify::tally;
use crate::store::SnapshotStore;

// ---------------------------------------------------------------------------
// Reports
// ---------------------------------------------------------------------------

/// Outcome of rebuilding one sprint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SprintRebuild {
    pub sprint_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sprint_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub project: Option<String>,
    /// Non-removed work items the counts were derived from.
    pub work_item_count: usize,
    pub snapshots_examined: usize,
    /// Rows rewritten (or that would be, in a dry run).
    pub changes: Vec<SnapshotChange>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub skipped: Option<SkipReason>,
}

impl SprintRebuild {
    fn skipped(sprint_id: &str, reason: SkipReason) -> Self {
        Self {
            sprint_id: sprint_id.to_string(),
            sprint_name: None,
            project: None,
            work_item_count: 0,
            snapshots_examined: 0,
            changes: Vec::new(),
            skipped: Some(reason),
        }
    }
}

/// Report returned after a rebuild batch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RebuildReport {
    pub dry_run: bool,
    pub sprints: Vec<SprintRebuild>,
    /// Wall-clock elapsed time for the batch, in milliseconds.
    pub elapsed_ms: u64,
}

impl RebuildReport {
    /// Total rows rewritten across all sprints.
    #[must_use]
    pub fn snapshots_updated(&self) -> usize {
        self.sprints.iter().map(|s| s.changes.len()).sum()
    }

    /// Total rows examined across all sprints.
    #[must_use]
    pub fn snapshots_examined(&self) -> usize {
        self.sprints.iter().map(|s| s.snapshots_examined).sum()
    }
}

// ---------------------------------------------------------------------------
// rebuild
// ---------------------------------------------------------------------------

/// Rebuild the snapshots of one sprint.
///
/// A missing sprint is reported as skipped, not as an error. A sprint with
/// no snapshots or no work items completes with zero changes.
///
/// # Errors
///
/// Returns an error if any store read or write fails.
pub fn rebuild_sprint<S>(
    store: &mut S,
    sprint_id: &str,
    options: ReconcileOptions,
) -> Result<SprintRebuild>
where
    S: SnapshotStore + ?Sized,
{
    let Some(sprint) = store
        .sprint(sprint_id)
        .with_context(|| format!("look up sprint {sprint_id}"))?
    else {
        warn!(sprint_id, "sprint not found, skipping rebuild");
        return Ok(SprintRebuild::skipped(sprint_id, SkipReason::SprintNotFound));
    };

    let items = store
        .active_work_items(sprint_id)
        .with_context(|| format!("load work items for sprint {sprint_id}"))?;
    let snapshots = store
        .snapshots(sprint_id)
        .with_context(|| format!("load snapshots for sprint {sprint_id}"))?;

    let mut changes = Vec::new();
    for snapshot in &snapshots {
        let computed = tally(&items, snapshot.snapshot_date);
        if computed.same_buckets(&snapshot.counts) {
            continue;
        }

        let after = computed.with_blocked(snapshot.counts.blocked);
        debug!(
            sprint_id,
            snapshot_id = snapshot.id,
            date = %snapshot.snapshot_date,
            before = %snapshot.counts,
            after = %after,
            "snapshot counts differ"
        );

        if !options.dry_run {
            store
                .update_snapshot_counts(snapshot.id, after)
                .with_context(|| {
                    format!(
                        "update snapshot {} ({}) of sprint {sprint_id}",
                        snapshot.id, snapshot.snapshot_date
                    )
                })?;
        }

        changes.push(SnapshotChange {
            snapshot_id: snapshot.id,
            snapshot_date: snapshot.snapshot_date,
            before: snapshot.counts,
            after,
        });
    }

    info!(
        sprint_id,
        work_items = items.len(),
        snapshots = snapshots.len(),
        updated = changes.len(),
        dry_run = options.dry_run,
        "sprint snapshots rebuilt"
    );

    Ok(SprintRebuild {
        sprint_id: sprint.id,
        sprint_name: Some(sprint.name),
        project: Some(sprint.project),
        work_item_count: items.len(),
        snapshots_examined: snapshots.len(),
        changes,
        skipped: None,
    })
}

/// Rebuild the snapshots of every sprint in `sprint_ids`, in order.
///
/// Missing sprints are skipped; the first store error aborts the batch.
///
/// # Errors
///
/// Returns an error if any store read or write fails.
pub fn rebuild_snapshots<S>(
    store: &mut S,
    sprint_ids: &[String],
    options: ReconcileOptions,
) -> Result<RebuildReport>
where
    S: SnapshotStore + ?Sized,
{
    let start = Instant::now();
    let mut sprints = Vec::with_capacity(sprint_ids.len());
    for sprint_id in sprint_ids {
        sprints.push(rebuild_sprint(store, sprint_id, options)?);
    }

    let report = RebuildReport {
        dry_run: options.dry_run,
        sprints,
        elapsed_ms: u64::try_from(start.elapsed().as_millis()).unwrap_or(u64::MAX),
    };

    info!(
        sprints = report.sprints.len(),
        examined = report.snapshots_examined(),
        updated = report.snapshots_updated(),
        elapsed_ms = report.elapsed_ms,
        "snapshot rebuild complete"
    );

    Ok(report)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{SnapshotCounts, Sprint, WorkItem};
    use crate::store::MemoryStore;
    use chrono::{DateTime, NaiveDate, TimeZone, Utc};

    fn date(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 3, d).unwrap()
    }

    fn at(d: u32, h: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 3, d, h, 0, 0).unwrap()
    }

    fn sprint_store() -> MemoryStore {
        let mut store = MemoryStore::new();
        store.insert_sprint(Sprint::new("s-1", "Sprint 1", "Apollo"));
        store.insert_work_item(WorkItem::new(1, "s-1", at(1, 9)));
        store.insert_work_item(WorkItem::new(2, "s-1", at(1, 9)).activated_at(at(3, 10)));
        store.insert_work_item(
            WorkItem::new(3, "s-1", at(1, 9))
                .activated_at(at(2, 10))
                .closed_at(at(4, 18)),
        );
        store.insert_work_item(WorkItem::new(4, "s-1", at(1, 9)).closed_at(at(2, 8)).removed());
        store
    }

    #[test]
    fn rebuild_recomputes_each_date_independently() {
        let mut store = sprint_store();
        let d1 = store.insert_snapshot("s-1", date(1), SnapshotCounts::default());
        let d3 = store.insert_snapshot("s-1", date(3), SnapshotCounts::default());
        let d5 = store.insert_snapshot("s-1", date(5), SnapshotCounts::default());

        let report = rebuild_sprint(&mut store, "s-1", ReconcileOptions::default()).unwrap();

        assert_eq!(report.work_item_count, 3);
        assert_eq!(report.changes.len(), 3);
        assert_eq!(store.snapshot_counts(d1), Some(SnapshotCounts::new(3, 0, 0)));
        assert_eq!(store.snapshot_counts(d3), Some(SnapshotCounts::new(1, 2, 0)));
        assert_eq!(store.snapshot_counts(d5), Some(SnapshotCounts::new(1, 1, 1)));
    }

    #[test]
    fn matching_snapshots_are_not_rewritten() {
        let mut store = sprint_store();
        store.insert_snapshot("s-1", date(1), SnapshotCounts::new(3, 0, 0));
        let stale = store.insert_snapshot("s-1", date(5), SnapshotCounts::new(3, 0, 0));

        let report = rebuild_sprint(&mut store, "s-1", ReconcileOptions::default()).unwrap();

        assert_eq!(report.snapshots_examined, 2);
        assert_eq!(report.changes.len(), 1);
        assert_eq!(report.changes[0].snapshot_id, stale);
        assert_eq!(store.writes(), 1);
    }

    #[test]
    fn blocked_counter_is_preserved() {
        let mut store = sprint_store();
        let id = store.insert_snapshot("s-1", date(5), SnapshotCounts::new(0, 0, 0).with_blocked(2));

        rebuild_sprint(&mut store, "s-1", ReconcileOptions::default()).unwrap();

        assert_eq!(
            store.snapshot_counts(id),
            Some(SnapshotCounts::new(1, 1, 1).with_blocked(2))
        );
    }

    #[test]
    fn dry_run_reports_without_writing() {
        let mut store = sprint_store();
        let id = store.insert_snapshot("s-1", date(5), SnapshotCounts::default());

        let report =
            rebuild_sprint(&mut store, "s-1", ReconcileOptions { dry_run: true }).unwrap();

        assert_eq!(report.changes.len(), 1);
        assert_eq!(report.changes[0].after, SnapshotCounts::new(1, 1, 1));
        assert_eq!(store.snapshot_counts(id), Some(SnapshotCounts::default()));
        assert_eq!(store.writes(), 0);
    }

    #[test]
    fn missing_sprint_is_skipped() {
        let mut store = MemoryStore::new();
        let report = rebuild_sprint(&mut store, "ghost", ReconcileOptions::default()).unwrap();
        assert_eq!(report.skipped, Some(SkipReason::SprintNotFound));
        assert!(report.changes.is_empty());
    }

    #[test]
    fn sprint_without_snapshots_or_items_is_a_no_op() {
        let mut store = MemoryStore::new();
        store.insert_sprint(Sprint::new("empty", "Empty", "Apollo"));
        let report = rebuild_sprint(&mut store, "empty", ReconcileOptions::default()).unwrap();
        assert_eq!(report.skipped, None);
        assert_eq!(report.snapshots_examined, 0);
        assert!(report.changes.is_empty());
    }

    #[test]
    fn snapshots_of_empty_sprint_are_zeroed() {
        let mut store = MemoryStore::new();
        store.insert_sprint(Sprint::new("empty", "Empty", "Apollo"));
        let id = store.insert_snapshot("empty", date(2), SnapshotCounts::new(4, 0, 0));

        rebuild_sprint(&mut store, "empty", ReconcileOptions::default()).unwrap();

        assert_eq!(store.snapshot_counts(id), Some(SnapshotCounts::default()));
    }

    #[test]
    fn batch_continues_past_missing_sprints() {
        let mut store = sprint_store();
        store.insert_snapshot("s-1", date(5), SnapshotCounts::default());

        let ids = vec!["ghost".to_string(), "s-1".to_string()];
        let report = rebuild_snapshots(&mut store, &ids, ReconcileOptions::default()).unwrap();

        assert_eq!(report.sprints.len(), 2);
        assert_eq!(report.sprints[0].skipped, Some(SkipReason::SprintNotFound));
        assert_eq!(report.snapshots_updated(), 1);
    }

    #[test]
    fn store_failure_aborts_batch() {
        let mut store = sprint_store();
        store.set_unavailable(true);
        let ids = vec!["s-1".to_string()];
        let err = rebuild_snapshots(&mut store, &ids, ReconcileOptions::default()).unwrap_err();
        assert!(err.to_string().contains("look up sprint s-1"));
    }

    #[test]
    fn rebuild_is_deterministic() {
        let mut store = sprint_store();
        store.insert_snapshot("s-1", date(2), SnapshotCounts::default());
        store.insert_snapshot("s-1", date(4), SnapshotCounts::default());

        let first = rebuild_sprint(&mut store, "s-1", ReconcileOptions::default()).unwrap();
        let second = rebuild_sprint(&mut store, "s-1", ReconcileOptions::default()).unwrap();

        assert_eq!(first.changes.len(), 2);
        assert!(second.changes.is_empty());
    }
}
