//! The narrow storage interface the reconciliation routines run against.
//!
//! Routines receive a [`SnapshotStore`] explicitly; there is no shared
//! connection. [`SqliteStore`] backs the CLI and [`MemoryStore`] backs tests.

pub mod memory;
pub mod sqlite;

use std::path::PathBuf;

use crate::error::ErrorCode;
use crate::model::{SnapshotCounts, Sprint, SprintSnapshot, WorkItem};

pub use memory::MemoryStore;
pub use sqlite::SqliteStore;

/// Errors surfaced by a [`SnapshotStore`] implementation.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// The underlying SQLite call failed.
    #[error("sqlite error")]
    Sqlite(#[from] rusqlite::Error),

    /// An update targeted a snapshot id that does not exist.
    #[error("snapshot {snapshot_id} not found")]
    SnapshotNotFound {
        /// The id passed to the update.
        snapshot_id: i64,
    },

    /// The store file does not exist and creation was not requested.
    #[error("store {} does not exist", path.display())]
    NotInitialized {
        /// Expected location of the store file.
        path: PathBuf,
    },

    /// The store schema was written by a newer binary.
    #[error("store schema version {found} is newer than supported version {supported}")]
    SchemaTooNew {
        /// `user_version` found on disk.
        found: u32,
        /// Latest version this binary understands.
        supported: u32,
    },

    /// The backend refused the call for a reason other than the above.
    #[error("store unavailable: {0}")]
    Unavailable(String),
}

impl StoreError {
    /// Return the machine-readable error code for this error.
    #[must_use]
    pub fn code(&self) -> ErrorCode {
        match self {
            Self::Sqlite(rusqlite::Error::SqliteFailure(failure, _))
                if matches!(
                    failure.code,
                    rusqlite::ErrorCode::DatabaseCorrupt | rusqlite::ErrorCode::NotADatabase
                ) =>
            {
                ErrorCode::CorruptStore
            }
            Self::SchemaTooNew { .. } => ErrorCode::CorruptStore,
            Self::Sqlite(_) | Self::Unavailable(_) => ErrorCode::StoreUnavailable,
            Self::SnapshotNotFound { .. } => ErrorCode::SnapshotNotFound,
            Self::NotInitialized { .. } => ErrorCode::NotInitialized,
        }
    }
}

/// Read/write operations the reconciliation routines need, and nothing more.
pub trait SnapshotStore {
    /// Look up a sprint by id.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend cannot be queried.
    fn sprint(&self, sprint_id: &str) -> Result<Option<Sprint>, StoreError>;

    /// Ids of every sprint in the store, in a stable order.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend cannot be queried.
    fn sprint_ids(&self) -> Result<Vec<String>, StoreError>;

    /// Work items of `sprint_id` with `is_removed = false`.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend cannot be queried.
    fn active_work_items(&self, sprint_id: &str) -> Result<Vec<WorkItem>, StoreError>;

    /// Whether `sprint_id` has any work item at all, removed ones included.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend cannot be queried.
    fn has_work_items(&self, sprint_id: &str) -> Result<bool, StoreError>;

    /// Snapshots of `sprint_id`, ordered by `snapshot_date` ascending.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend cannot be queried.
    fn snapshots(&self, sprint_id: &str) -> Result<Vec<SprintSnapshot>, StoreError>;

    /// Overwrite all four counters of one snapshot row.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::SnapshotNotFound`] for an unknown id, or a
    /// backend error if the write fails.
    fn update_snapshot_counts(
        &mut self,
        snapshot_id: i64,
        counts: SnapshotCounts,
    ) -> Result<(), StoreError>;
}
