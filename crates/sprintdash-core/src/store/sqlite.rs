//! [`SnapshotStore`] backed by the SQLite store database.

use rusqlite::{Connection, OptionalExtension, Row, params};

use super::{SnapshotStore, StoreError};
use crate::model::{SnapshotCounts, Sprint, SprintSnapshot, WorkItem};

/// SQLite-backed store. Each update is its own implicit transaction.
#[derive(Debug)]
pub struct SqliteStore {
    conn: Connection,
}

impl SqliteStore {
    /// Wrap an already-migrated connection (see [`crate::db::open_store`]).
    #[must_use]
    pub const fn new(conn: Connection) -> Self {
        Self { conn }
    }

    #[must_use]
    pub const fn connection(&self) -> &Connection {
        &self.conn
    }

    /// Insert or replace a sprint row.
    ///
    /// # Errors
    ///
    /// Returns an error if the write fails.
    pub fn upsert_sprint(&self, sprint: &Sprint) -> Result<(), StoreError> {
        self.conn.execute(
            "INSERT INTO sprints (sprint_id, name, project, start_date, finish_date)
             VALUES (?1, ?2, ?3, ?4, ?5)
             ON CONFLICT(sprint_id) DO UPDATE SET
                name = excluded.name,
                project = excluded.project,
                start_date = excluded.start_date,
                finish_date = excluded.finish_date",
            params![
                sprint.id,
                sprint.name,
                sprint.project,
                sprint.start_date,
                sprint.finish_date
            ],
        )?;
        Ok(())
    }

    /// Insert or replace a work item row.
    ///
    /// # Errors
    ///
    /// Returns an error if the write fails (including an unknown sprint).
    pub fn upsert_work_item(&self, item: &WorkItem) -> Result<(), StoreError> {
        self.conn.execute(
            "INSERT INTO work_items (
                work_item_id, sprint_id, created_date, activated_date, closed_date, is_removed
             ) VALUES (?1, ?2, ?3, ?4, ?5, ?6)
             ON CONFLICT(work_item_id) DO UPDATE SET
                sprint_id = excluded.sprint_id,
                created_date = excluded.created_date,
                activated_date = excluded.activated_date,
                closed_date = excluded.closed_date,
                is_removed = excluded.is_removed",
            params![
                item.id,
                item.sprint_id,
                item.created_date,
                item.activated_date,
                item.closed_date,
                item.is_removed
            ],
        )?;
        Ok(())
    }

    /// Insert a snapshot, or overwrite the counters of the existing row for
    /// the same `(sprint_id, snapshot_date)`. Returns the row id.
    ///
    /// # Errors
    ///
    /// Returns an error if the write fails (including an unknown sprint).
    pub fn upsert_snapshot(
        &self,
        sprint_id: &str,
        snapshot_date: chrono::NaiveDate,
        counts: SnapshotCounts,
    ) -> Result<i64, StoreError> {
        let id = self.conn.query_row(
            "INSERT INTO sprint_snapshots (
                sprint_id, snapshot_date, todo_count, in_progress_count, done_count, blocked_count
             ) VALUES (?1, ?2, ?3, ?4, ?5, ?6)
             ON CONFLICT(sprint_id, snapshot_date) DO UPDATE SET
                todo_count = excluded.todo_count,
                in_progress_count = excluded.in_progress_count,
                done_count = excluded.done_count,
                blocked_count = excluded.blocked_count
             RETURNING snapshot_id",
            params![
                sprint_id,
                snapshot_date,
                counts.todo,
                counts.in_progress,
                counts.done,
                counts.blocked
            ],
            |row| row.get(0),
        )?;
        Ok(id)
    }
}

fn sprint_from_row(row: &Row<'_>) -> rusqlite::Result<Sprint> {
    Ok(Sprint {
        id: row.get("sprint_id")?,
        name: row.get("name")?,
        project: row.get("project")?,
        start_date: row.get("start_date")?,
        finish_date: row.get("finish_date")?,
    })
}

fn work_item_from_row(row: &Row<'_>) -> rusqlite::Result<WorkItem> {
    Ok(WorkItem {
        id: row.get("work_item_id")?,
        sprint_id: row.get("sprint_id")?,
        created_date: row.get("created_date")?,
        activated_date: row.get("activated_date")?,
        closed_date: row.get("closed_date")?,
        is_removed: row.get("is_removed")?,
    })
}

fn snapshot_from_row(row: &Row<'_>) -> rusqlite::Result<SprintSnapshot> {
    Ok(SprintSnapshot {
        id: row.get("snapshot_id")?,
        sprint_id: row.get("sprint_id")?,
        snapshot_date: row.get("snapshot_date")?,
        counts: SnapshotCounts {
            todo: row.get("todo_count")?,
            in_progress: row.get("in_progress_count")?,
            done: row.get("done_count")?,
            blocked: row.get("blocked_count")?,
        },
    })
}

impl SnapshotStore for SqliteStore {
    fn sprint(&self, sprint_id: &str) -> Result<Option<Sprint>, StoreError> {
        let sprint = self
            .conn
            .query_row(
                "SELECT sprint_id, name, project, start_date, finish_date
                 FROM sprints
                 WHERE sprint_id = ?1",
                [sprint_id],
                sprint_from_row,
            )
            .optional()?;
        Ok(sprint)
    }

    fn sprint_ids(&self) -> Result<Vec<String>, StoreError> {
        let mut stmt = self
            .conn
            .prepare_cached("SELECT sprint_id FROM sprints ORDER BY sprint_id")?;
        let ids = stmt
            .query_map([], |row| row.get(0))?
            .collect::<rusqlite::Result<Vec<String>>>()?;
        Ok(ids)
    }

    fn active_work_items(&self, sprint_id: &str) -> Result<Vec<WorkItem>, StoreError> {
        let mut stmt = self.conn.prepare_cached(
            "SELECT work_item_id, sprint_id, created_date, activated_date, closed_date, is_removed
             FROM work_items
             WHERE sprint_id = ?1 AND is_removed = 0
             ORDER BY work_item_id",
        )?;
        let items = stmt
            .query_map([sprint_id], work_item_from_row)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(items)
    }

    fn has_work_items(&self, sprint_id: &str) -> Result<bool, StoreError> {
        let exists = self.conn.query_row(
            "SELECT EXISTS(SELECT 1 FROM work_items WHERE sprint_id = ?1)",
            [sprint_id],
            |row| row.get(0),
        )?;
        Ok(exists)
    }

    fn snapshots(&self, sprint_id: &str) -> Result<Vec<SprintSnapshot>, StoreError> {
        let mut stmt = self.conn.prepare_cached(
            "SELECT snapshot_id, sprint_id, snapshot_date,
                    todo_count, in_progress_count, done_count, blocked_count
             FROM sprint_snapshots
             WHERE sprint_id = ?1
             ORDER BY snapshot_date ASC, snapshot_id ASC",
        )?;
        let rows = stmt
            .query_map([sprint_id], snapshot_from_row)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
    }

    fn update_snapshot_counts(
        &mut self,
        snapshot_id: i64,
        counts: SnapshotCounts,
    ) -> Result<(), StoreError> {
        let changed = self.conn.execute(
            "UPDATE sprint_snapshots
             SET todo_count = ?1, in_progress_count = ?2, done_count = ?3, blocked_count = ?4
             WHERE snapshot_id = ?5",
            params![
                counts.todo,
                counts.in_progress,
                counts.done,
                counts.blocked,
                snapshot_id
            ],
        )?;
        if changed == 0 {
            return Err(StoreError::SnapshotNotFound { snapshot_id });
        }
        Ok(())
    }
}
