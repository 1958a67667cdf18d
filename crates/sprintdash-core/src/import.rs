//! Load a JSON dump of mirrored sprint data into a SQLite store.
//!
//! The dump is a single object:
//!
//! ```json
//! {
//!   "sprints":    [{ "id": "s-1", "name": "Sprint 1", "project": "Apollo" }],
//!   "work_items": [{ "id": 7, "sprint_id": "s-1", "created_date": "2024-03-01T09:00:00Z" }],
//!   "snapshots":  [{ "sprint_id": "s-1", "snapshot_date": "2024-03-01",
//!                    "todo": 0, "in_progress": 0, "done": 0 }]
//! }
//! ```
//!
//! Every section is optional. Rows are upserted, so importing the same dump
//! twice leaves the store unchanged.

use std::io::Read;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::error::ErrorCode;
use crate::model::{SnapshotCounts, Sprint, WorkItem};
use crate::store::SqliteStore;

#[derive(Debug, thiserror::Error)]
pub enum ImportError {
    #[error("failed to read import file {}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid import data")]
    Parse(#[from] serde_json::Error),
}

impl ImportError {
    #[must_use]
    pub const fn code(&self) -> ErrorCode {
        match self {
            Self::Read { .. } => ErrorCode::InputReadError,
            Self::Parse(_) => ErrorCode::ImportParseError,
        }
    }
}

/// One snapshot row as it appears in a dump. Row ids are assigned by the store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SnapshotRecord {
    pub sprint_id: String,
    pub snapshot_date: NaiveDate,
    #[serde(flatten)]
    pub counts: SnapshotCounts,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SprintDump {
    #[serde(default)]
    pub sprints: Vec<Sprint>,
    #[serde(default)]
    pub work_items: Vec<WorkItem>,
    #[serde(default)]
    pub snapshots: Vec<SnapshotRecord>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ImportReport {
    pub sprints: usize,
    pub work_items: usize,
    pub snapshots: usize,
    /// Items whose lifecycle timestamps are out of order. They are imported as-is.
    pub unordered_lifecycles: usize,
}

/// Parse a dump from any reader.
///
/// # Errors
///
/// Returns [`ImportError::Parse`] if the input is not a valid dump.
pub fn parse_dump<R: Read>(reader: R) -> Result<SprintDump, ImportError> {
    Ok(serde_json::from_reader(reader)?)
}

/// Read and parse a dump file.
///
/// # Errors
///
/// Returns [`ImportError`] if the file cannot be read or parsed.
pub fn load_dump(path: &Path) -> Result<SprintDump, ImportError> {
    let file = std::fs::File::open(path).map_err(|source| ImportError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    parse_dump(std::io::BufReader::new(file))
}

/// Upsert every row of `dump` in a single transaction.
///
/// Sprints are written first so that items and snapshots referencing a
/// sprint from the same dump satisfy the foreign keys.
///
/// # Errors
///
/// Returns an error if any write fails; nothing from the dump is kept then.
pub fn import_dump(store: &SqliteStore, dump: &SprintDump) -> Result<ImportReport> {
    let tx = store
        .connection()
        .unchecked_transaction()
        .context("begin import transaction")?;

    let mut report = ImportReport::default();

    for sprint in &dump.sprints {
        store
            .upsert_sprint(sprint)
            .with_context(|| format!("import sprint {}", sprint.id))?;
        report.sprints += 1;
    }

    for item in &dump.work_items {
        if !item.lifecycle_is_ordered() {
            warn!(
                work_item_id = item.id,
                sprint_id = %item.sprint_id,
                "work item lifecycle timestamps are out of order"
            );
            report.unordered_lifecycles += 1;
        }
        store
            .upsert_work_item(item)
            .with_context(|| format!("import work item {} of sprint {}", item.id, item.sprint_id))?;
        report.work_items += 1;
    }

    for snap in &dump.snapshots {
        store
            .upsert_snapshot(&snap.sprint_id, snap.snapshot_date, snap.counts)
            .with_context(|| {
                format!(
                    "import snapshot {} of sprint {}",
                    snap.snapshot_date, snap.sprint_id
                )
            })?;
        report.snapshots += 1;
    }

    tx.commit().context("commit import transaction")?;

    info!(
        sprints = report.sprints,
        work_items = report.work_items,
        snapshots = report.snapshots,
        "import complete"
    );

    Ok(report)
}
