//! Backfill snapshots that were written with all-zero counters.
//!
//! An earlier backfill job created the first days of many sprints without
//! populating state counts. The first snapshot whose todo/in-progress/done
//! sum is positive is taken as the reference; every earlier all-zero
//! snapshot is rewritten as "everything still todo" with that total.

use anyhow::{Context, Result};
use chrono::NaiveDate;
use serde::Serialize;
use tracing::{debug, info, warn};

use super::{CountOverflowError, ReconcileOptions, SkipReason, SnapshotChange};
use crate::model::{SnapshotCounts, SprintSnapshot};
use crate::store::SnapshotStore;

/// The snapshot a backfill was anchored on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ReferenceSnapshot {
    pub snapshot_id: i64,
    pub snapshot_date: NaiveDate,
    /// `todo + in_progress + done` of the reference row.
    pub total_items: u64,
}

/// Outcome of fixing one sprint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SprintFix {
    pub sprint_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sprint_name: Option<String>,
    pub snapshots_examined: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reference: Option<ReferenceSnapshot>,
    pub changes: Vec<SnapshotChange>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub skipped: Option<SkipReason>,
}

/// Report returned after a fix batch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FixReport {
    pub dry_run: bool,
    pub sprints: Vec<SprintFix>,
}

impl FixReport {
    /// Total rows rewritten across all sprints.
    #[must_use]
    pub fn snapshots_fixed(&self) -> usize {
        self.sprints.iter().map(|s| s.changes.len()).sum()
    }
}

/// First snapshot (by date) with a positive todo/in-progress/done sum.
#[must_use]
pub fn find_reference(snapshots: &[SprintSnapshot]) -> Option<ReferenceSnapshot> {
    snapshots
        .iter()
        .filter(|snap| !snap.counts.is_zero())
        .min_by_key(|snap| (snap.snapshot_date, snap.id))
        .map(|snap| ReferenceSnapshot {
            snapshot_id: snap.id,
            snapshot_date: snap.snapshot_date,
            total_items: snap.counts.total(),
        })
}

/// Compute the backfill for one sprint's snapshots without touching a store.
///
/// Returns `None` when no reference snapshot exists. Only snapshots dated
/// strictly before the reference and summing to exactly zero are changed;
/// their rewrite is `(total, 0, 0)` with `blocked` reset to zero.
///
/// # Errors
///
/// Returns [`CountOverflowError`] when the reference total cannot be stored
/// in the todo counter.
pub fn plan_backfill(
    snapshots: &[SprintSnapshot],
) -> Result<Option<(ReferenceSnapshot, Vec<SnapshotChange>)>, CountOverflowError> {
    let Some(reference) = find_reference(snapshots) else {
        return Ok(None);
    };
    let total = u32::try_from(reference.total_items).map_err(|_| CountOverflowError {
        snapshot_id: reference.snapshot_id,
        total_items: reference.total_items,
    })?;
    let after = SnapshotCounts::all_todo(total);

    let changes = snapshots
        .iter()
        .filter(|snap| snap.snapshot_date < reference.snapshot_date && snap.counts.is_zero())
        .map(|snap| SnapshotChange {
            snapshot_id: snap.id,
            snapshot_date: snap.snapshot_date,
            before: snap.counts,
            after,
        })
        .collect();

    Ok(Some((reference, changes)))
}

/// Fix the all-zero snapshots of one sprint.
///
/// # Errors
///
/// Returns an error if any store read or write fails, or if the reference
/// total overflows a counter. Nothing is written in the overflow case.
pub fn fix_sprint<S>(store: &mut S, sprint_id: &str, options: ReconcileOptions) -> Result<SprintFix>
where
    S: SnapshotStore + ?Sized,
{
    let Some(sprint) = store
        .sprint(sprint_id)
        .with_context(|| format!("look up sprint {sprint_id}"))?
    else {
        warn!(sprint_id, "sprint not found, skipping count fix");
        return Ok(SprintFix {
            sprint_id: sprint_id.to_string(),
            sprint_name: None,
            snapshots_examined: 0,
            reference: None,
            changes: Vec::new(),
            skipped: Some(SkipReason::SprintNotFound),
        });
    };

    let snapshots = store
        .snapshots(sprint_id)
        .with_context(|| format!("load snapshots for sprint {sprint_id}"))?;

    let plan = plan_backfill(&snapshots)
        .with_context(|| format!("plan backfill for sprint {sprint_id}"))?;
    let Some((reference, changes)) = plan else {
        info!(
            sprint_id,
            snapshots = snapshots.len(),
            "no snapshot with positive counts, nothing to backfill from"
        );
        return Ok(SprintFix {
            sprint_id: sprint.id,
            sprint_name: Some(sprint.name),
            snapshots_examined: snapshots.len(),
            reference: None,
            changes: Vec::new(),
            skipped: Some(SkipReason::NoReferenceSnapshot),
        });
    };

    for change in &changes {
        debug!(
            sprint_id,
            snapshot_id = change.snapshot_id,
            date = %change.snapshot_date,
            after = %change.after,
            "backfilling zero snapshot"
        );
        if !options.dry_run {
            store
                .update_snapshot_counts(change.snapshot_id, change.after)
                .with_context(|| {
                    format!(
                        "update snapshot {} ({}) of sprint {sprint_id}",
                        change.snapshot_id, change.snapshot_date
                    )
                })?;
        }
    }

    info!(
        sprint_id,
        reference_date = %reference.snapshot_date,
        total_items = reference.total_items,
        fixed = changes.len(),
        dry_run = options.dry_run,
        "zero snapshots backfilled"
    );

    Ok(SprintFix {
        sprint_id: sprint.id,
        sprint_name: Some(sprint.name),
        snapshots_examined: snapshots.len(),
        reference: Some(reference),
        changes,
        skipped: None,
    })
}

/// Fix every sprint in `sprint_ids`, in order.
///
/// # Errors
///
/// Returns an error if any store read or write fails.
pub fn fix_snapshot_counts<S>(
    store: &mut S,
    sprint_ids: &[String],
    options: ReconcileOptions,
) -> Result<FixReport>
where
    S: SnapshotStore + ?Sized,
{
    let mut sprints = Vec::with_capacity(sprint_ids.len());
    for sprint_id in sprint_ids {
        sprints.push(fix_sprint(store, sprint_id, options)?);
    }
    let report = FixReport {
        dry_run: options.dry_run,
        sprints,
    };
    info!(
        sprints = report.sprints.len(),
        fixed = report.snapshots_fixed(),
        "snapshot count fix complete"
    );
    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Sprint;
    use crate::store::MemoryStore;

    fn date(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 3, d).unwrap()
    }

    fn store_with(counts: &[(u32, SnapshotCounts)]) -> (MemoryStore, Vec<i64>) {
        let mut store = MemoryStore::new();
        store.insert_sprint(Sprint::new("s-1", "Sprint 1", "Apollo"));
        let ids = counts
            .iter()
            .map(|(day, c)| store.insert_snapshot("s-1", date(*day), *c))
            .collect();
        (store, ids)
    }

    #[test]
    fn backfills_leading_zero_snapshots_from_reference() {
        let (mut store, ids) = store_with(&[
            (1, SnapshotCounts::default()),
            (2, SnapshotCounts::default()),
            (3, SnapshotCounts::new(5, 2, 1)),
            (4, SnapshotCounts::new(3, 4, 1)),
        ]);

        let fix = fix_sprint(&mut store, "s-1", ReconcileOptions::default()).unwrap();

        let reference = fix.reference.unwrap();
        assert_eq!(reference.snapshot_id, ids[2]);
        assert_eq!(reference.total_items, 8);
        assert_eq!(fix.changes.len(), 2);
        assert_eq!(store.snapshot_counts(ids[0]), Some(SnapshotCounts::all_todo(8)));
        assert_eq!(store.snapshot_counts(ids[1]), Some(SnapshotCounts::all_todo(8)));
        assert_eq!(store.snapshot_counts(ids[2]), Some(SnapshotCounts::new(5, 2, 1)));
        assert_eq!(store.snapshot_counts(ids[3]), Some(SnapshotCounts::new(3, 4, 1)));
    }

    #[test]
    fn second_run_changes_nothing() {
        let (mut store, _) = store_with(&[
            (1, SnapshotCounts::default()),
            (3, SnapshotCounts::new(5, 2, 1)),
        ]);

        fix_sprint(&mut store, "s-1", ReconcileOptions::default()).unwrap();
        let writes = store.writes();
        let again = fix_sprint(&mut store, "s-1", ReconcileOptions::default()).unwrap();

        assert!(again.changes.is_empty());
        assert_eq!(store.writes(), writes);
    }

    #[test]
    fn later_zero_snapshots_are_left_alone() {
        let (mut store, ids) = store_with(&[
            (2, SnapshotCounts::new(4, 0, 0)),
            (5, SnapshotCounts::default()),
        ]);

        let fix = fix_sprint(&mut store, "s-1", ReconcileOptions::default()).unwrap();

        assert!(fix.changes.is_empty());
        assert_eq!(store.snapshot_counts(ids[1]), Some(SnapshotCounts::default()));
    }

    #[test]
    fn blocked_only_zero_row_is_reset() {
        let (mut store, ids) = store_with(&[
            (1, SnapshotCounts::default().with_blocked(2)),
            (2, SnapshotCounts::new(1, 1, 1)),
        ]);

        fix_sprint(&mut store, "s-1", ReconcileOptions::default()).unwrap();

        assert_eq!(store.snapshot_counts(ids[0]), Some(SnapshotCounts::all_todo(3)));
    }

    #[test]
    fn empty_and_all_zero_sprints_are_skipped() {
        let (mut empty, _) = store_with(&[]);
        let fix = fix_sprint(&mut empty, "s-1", ReconcileOptions::default()).unwrap();
        assert_eq!(fix.skipped, Some(SkipReason::NoReferenceSnapshot));

        let (mut zeros, _) = store_with(&[
            (1, SnapshotCounts::default()),
            (2, SnapshotCounts::default()),
        ]);
        let fix = fix_sprint(&mut zeros, "s-1", ReconcileOptions::default()).unwrap();
        assert_eq!(fix.skipped, Some(SkipReason::NoReferenceSnapshot));
        assert_eq!(zeros.writes(), 0);
    }

    #[test]
    fn missing_sprint_is_skipped() {
        let mut store = MemoryStore::new();
        let report = fix_snapshot_counts(
            &mut store,
            &["ghost".to_string()],
            ReconcileOptions::default(),
        )
        .unwrap();
        assert_eq!(report.sprints[0].skipped, Some(SkipReason::SprintNotFound));
        assert_eq!(report.snapshots_fixed(), 0);
    }

    #[test]
    fn dry_run_plans_without_writing() {
        let (mut store, ids) = store_with(&[
            (1, SnapshotCounts::default()),
            (2, SnapshotCounts::new(2, 0, 0)),
        ]);

        let fix = fix_sprint(&mut store, "s-1", ReconcileOptions { dry_run: true }).unwrap();

        assert_eq!(fix.changes.len(), 1);
        assert_eq!(store.snapshot_counts(ids[0]), Some(SnapshotCounts::default()));
        assert_eq!(store.writes(), 0);
    }

    #[test]
    fn oversized_reference_total_is_an_error() {
        let (mut store, ids) = store_with(&[
            (1, SnapshotCounts::default()),
            (2, SnapshotCounts::new(u32::MAX, 1, 0)),
        ]);

        let err = fix_sprint(&mut store, "s-1", ReconcileOptions::default()).unwrap_err();

        assert_eq!(
            crate::error::code_of(&err),
            Some(crate::error::ErrorCode::CountOverflow)
        );
        assert_eq!(store.snapshot_counts(ids[0]), Some(SnapshotCounts::default()));
        assert_eq!(store.writes(), 0);
    }

    #[test]
    fn largest_representable_total_is_backfilled_exactly() {
        let (mut store, ids) = store_with(&[
            (1, SnapshotCounts::default()),
            (2, SnapshotCounts::new(u32::MAX - 1, 1, 0)),
        ]);

        fix_sprint(&mut store, "s-1", ReconcileOptions::default()).unwrap();

        let backfilled = store.snapshot_counts(ids[0]).unwrap();
        assert_eq!(backfilled.total(), u64::from(u32::MAX));
    }

    #[test]
    fn reference_ignores_input_order() {
        let snaps = vec![
            SprintSnapshot {
                id: 2,
                sprint_id: "s".into(),
                snapshot_date: date(4),
                counts: SnapshotCounts::new(1, 0, 0),
            },
            SprintSnapshot {
                id: 1,
                sprint_id: "s".into(),
                snapshot_date: date(3),
                counts: SnapshotCounts::new(0, 2, 0),
            },
        ];
        let reference = find_reference(&snaps).unwrap();
        assert_eq!(reference.snapshot_id, 1);
        assert_eq!(reference.total_items, 2);
    }
}
