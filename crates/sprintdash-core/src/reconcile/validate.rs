//! Read-only check that snapshot sums match the live work item count.

use anyhow::{Context, Result};
use chrono::NaiveDate;
use serde::Serialize;
use tracing::{debug, info, warn};

use super::SkipReason;
use crate::model::SnapshotCounts;
use crate::store::SnapshotStore;

/// Verdict for a single snapshot row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SnapshotCheck {
    pub snapshot_id: i64,
    pub snapshot_date: NaiveDate,
    pub counts: SnapshotCounts,
    pub actual_total: u64,
    pub matches: bool,
}

/// Verdicts for one sprint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SprintValidation {
    pub sprint_id: String,
    pub sprint_name: String,
    /// Live count of non-removed work items.
    pub expected_total: u64,
    pub checks: Vec<SnapshotCheck>,
}

impl SprintValidation {
    pub fn mismatches(&self) -> impl Iterator<Item = &SnapshotCheck> {
        self.checks.iter().filter(|check| !check.matches)
    }
}

/// Aggregate validation report.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ValidationReport {
    pub sprints: Vec<SprintValidation>,
    /// Requested sprints that do not exist.
    pub skipped: Vec<(String, SkipReason)>,
}

impl ValidationReport {
    /// Return `true` when every examined snapshot matched.
    #[must_use]
    pub fn is_ok(&self) -> bool {
        self.mismatch_count() == 0
    }

    #[must_use]
    pub fn mismatch_count(&self) -> usize {
        self.sprints.iter().map(|s| s.mismatches().count()).sum()
    }

    #[must_use]
    pub fn checked_count(&self) -> usize {
        self.sprints.iter().map(|s| s.checks.len()).sum()
    }
}

/// Check every snapshot of the given sprints. Never writes.
///
/// Only sprints that have both work items and snapshots are examined; the
/// others are omitted from the report. Removed items make a sprint eligible
/// but never count toward the expected total.
///
/// # Errors
///
/// Returns an error if any store read fails.
pub fn validate_snapshots<S>(store: &S, sprint_ids: &[String]) -> Result<ValidationReport>
where
    S: SnapshotStore + ?Sized,
{
    let mut report = ValidationReport::default();

    for sprint_id in sprint_ids.iter().map(String::as_str) {
        let Some(sprint) = store
            .sprint(sprint_id)
            .with_context(|| format!("look up sprint {sprint_id}"))?
        else {
            warn!(sprint_id, "sprint not found, skipping validation");
            report
                .skipped
                .push((sprint_id.to_string(), SkipReason::SprintNotFound));
            continue;
        };

        let has_items = store
            .has_work_items(sprint_id)
            .with_context(|| format!("check work items for sprint {sprint_id}"))?;
        let snapshots = store
            .snapshots(sprint_id)
            .with_context(|| format!("load snapshots for sprint {sprint_id}"))?;

        if !has_items || snapshots.is_empty() {
            debug!(
                sprint_id,
                has_items,
                snapshots = snapshots.len(),
                "sprint lacks items or snapshots, not validated"
            );
            continue;
        }

        let items = store
            .active_work_items(sprint_id)
            .with_context(|| format!("load work items for sprint {sprint_id}"))?;
        let expected_total = u64::try_from(items.len()).unwrap_or(u64::MAX);
        let checks: Vec<SnapshotCheck> = snapshots
            .iter()
            .map(|snap| {
                let actual_total = snap.counts.total();
                SnapshotCheck {
                    snapshot_id: snap.id,
                    snapshot_date: snap.snapshot_date,
                    counts: snap.counts,
                    actual_total,
                    matches: actual_total == expected_total,
                }
            })
            .collect();

        let validation = SprintValidation {
            sprint_id: sprint.id,
            sprint_name: sprint.name,
            expected_total,
            checks,
        };
        let mismatched = validation.mismatches().count();
        if mismatched > 0 {
            warn!(
                sprint_id,
                expected_total,
                mismatched,
                "snapshot sums disagree with live work item count"
            );
        }
        report.sprints.push(validation);
    }

    info!(
        sprints = report.sprints.len(),
        checked = report.checked_count(),
        mismatched = report.mismatch_count(),
        "snapshot validation complete"
    );

    Ok(report)
}
