//! Burndown series derived from stored snapshots.

use anyhow::{Context, Result};
use chrono::NaiveDate;
use serde::Serialize;

use crate::model::{Sprint, SprintSnapshot};
use crate::store::SnapshotStore;

/// One day of a burndown chart.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct BurndownPoint {
    pub date: NaiveDate,
    /// `todo + in_progress`.
    pub remaining: u64,
    pub done: u64,
    pub total: u64,
}

/// A sprint and its burndown series in date order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Burndown {
    pub sprint: Sprint,
    pub points: Vec<BurndownPoint>,
}

impl Burndown {
    /// Fraction of the final day's total that is done, in `0.0..=1.0`.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn completion(&self) -> Option<f64> {
        let last = self.points.last()?;
        if last.total == 0 {
            return None;
        }
        Some(last.done as f64 / last.total as f64)
    }
}

#[must_use]
pub fn burndown_series(snapshots: &[SprintSnapshot]) -> Vec<BurndownPoint> {
    let mut points: Vec<BurndownPoint> = snapshots
        .iter()
        .map(|snap| BurndownPoint {
            date: snap.snapshot_date,
            remaining: u64::from(snap.counts.todo) + u64::from(snap.counts.in_progress),
            done: u64::from(snap.counts.done),
            total: snap.counts.total(),
        })
        .collect();
    points.sort_by_key(|point| point.date);
    points
}

/// Load a sprint's burndown, or `None` if the sprint does not exist.
///
/// # Errors
///
/// Returns an error if any store read fails.
pub fn load_burndown<S>(store: &S, sprint_id: &str) -> Result<Option<Burndown>>
where
    S: SnapshotStore + ?Sized,
{
    let Some(sprint) = store
        .sprint(sprint_id)
        .with_context(|| format!("look up sprint {sprint_id}"))?
    else {
        return Ok(None);
    };
    let snapshots = store
        .snapshots(sprint_id)
        .with_context(|| format!("load snapshots for sprint {sprint_id}"))?;
    Ok(Some(Burndown {
        sprint,
        points: burndown_series(&snapshots),
    }))
}
