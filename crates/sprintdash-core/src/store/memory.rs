//! In-memory [`SnapshotStore`] used by tests and benchmarks.

use std::collections::BTreeMap;

use chrono::NaiveDate;

use super::{SnapshotStore, StoreError};
use crate::model::{SnapshotCounts, Sprint, SprintSnapshot, WorkItem};

/// A [`SnapshotStore`] held entirely in memory.
///
/// Counts every successful update in [`writes`](MemoryStore::writes) so
/// tests can assert that unchanged rows were not rewritten. A store marked
/// [`unavailable`](MemoryStore::set_unavailable) fails every call, standing
/// in for a database that went away mid-run.
#[derive(Debug, Default, Clone)]
pub struct MemoryStore {
    sprints: BTreeMap<String, Sprint>,
    work_items: Vec<WorkItem>,
    snapshots: Vec<SprintSnapshot>,
    next_snapshot_id: i64,
    writes: usize,
    unavailable: bool,
}

impl MemoryStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert_sprint(&mut self, sprint: Sprint) {
        self.sprints.insert(sprint.id.clone(), sprint);
    }

    pub fn insert_work_item(&mut self, item: WorkItem) {
        self.work_items.push(item);
    }

    /// Insert a snapshot row and return its generated id.
    pub fn insert_snapshot(
        &mut self,
        sprint_id: &str,
        snapshot_date: NaiveDate,
        counts: SnapshotCounts,
    ) -> i64 {
        self.next_snapshot_id += 1;
        let id = self.next_snapshot_id;
        self.snapshots.push(SprintSnapshot {
            id,
            sprint_id: sprint_id.to_string(),
            snapshot_date,
            counts,
        });
        id
    }

    /// Current counters of one snapshot, if it exists.
    #[must_use]
    pub fn snapshot_counts(&self, snapshot_id: i64) -> Option<SnapshotCounts> {
        self.snapshots
            .iter()
            .find(|snap| snap.id == snapshot_id)
            .map(|snap| snap.counts)
    }

    /// Number of successful `update_snapshot_counts` calls so far.
    #[must_use]
    pub const fn writes(&self) -> usize {
        self.writes
    }

    pub const fn set_unavailable(&mut self, unavailable: bool) {
        self.unavailable = unavailable;
    }

    fn check_available(&self) -> Result<(), StoreError> {
        if self.unavailable {
            Err(StoreError::Unavailable("memory store marked unavailable".into()))
        } else {
            Ok(())
        }
    }
}

impl SnapshotStore for MemoryStore {
    fn sprint(&self, sprint_id: &str) -> Result<Option<Sprint>, StoreError> {
        self.check_available()?;
        Ok(self.sprints.get(sprint_id).cloned())
    }

    fn sprint_ids(&self) -> Result<Vec<String>, StoreError> {
        self.check_available()?;
        Ok(self.sprints.keys().cloned().collect())
    }

    fn active_work_items(&self, sprint_id: &str) -> Result<Vec<WorkItem>, StoreError> {
        self.check_available()?;
        Ok(self
            .work_items
            .iter()
            .filter(|item| item.sprint_id == sprint_id && !item.is_removed)
            .cloned()
            .collect())
    }

    fn has_work_items(&self, sprint_id: &str) -> Result<bool, StoreError> {
        self.check_available()?;
        Ok(self.work_items.iter().any(|item| item.sprint_id == sprint_id))
    }

    fn snapshots(&self, sprint_id: &str) -> Result<Vec<SprintSnapshot>, StoreError> {
        self.check_available()?;
        let mut rows: Vec<SprintSnapshot> = self
            .snapshots
            .iter()
            .filter(|snap| snap.sprint_id == sprint_id)
            .cloned()
            .collect();
        rows.sort_by(|a, b| {
            a.snapshot_date
                .cmp(&b.snapshot_date)
                .then_with(|| a.id.cmp(&b.id))
        });
        Ok(rows)
    }

    fn update_snapshot_counts(
        &mut self,
        snapshot_id: i64,
        counts: SnapshotCounts,
    ) -> Result<(), StoreError> {
        self.check_available()?;
        let row = self
            .snapshots
            .iter_mut()
            .find(|snap| snap.id == snapshot_id)
            .ok_or(StoreError::SnapshotNotFound { snapshot_id })?;
        row.counts = counts;
        self.writes += 1;
        Ok(())
    }
}
