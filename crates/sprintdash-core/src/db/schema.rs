//! Canonical SQLite schema for the mirrored sprint data.
//!
//! - `sprints` holds one row per iteration
//! - `work_items` keeps lifecycle timestamps and the soft-delete flag
//! - `sprint_snapshots` holds the daily rollups, unique per `(sprint, date)`
//! - `store_meta` tracks the schema version alongside `PRAGMA user_version`

/// Migration v1: core tables plus store metadata.
pub const MIGRATION_V1_SQL: &str = r"
CREATE TABLE IF NOT EXISTS sprints (
    sprint_id TEXT PRIMARY KEY CHECK (length(trim(sprint_id)) > 0),
    name TEXT NOT NULL,
    project TEXT NOT NULL,
    start_date TEXT,
    finish_date TEXT
);

CREATE TABLE IF NOT EXISTS work_items (
    work_item_id INTEGER PRIMARY KEY,
    sprint_id TEXT NOT NULL REFERENCES sprints(sprint_id) ON DELETE CASCADE,
    created_date TEXT NOT NULL,
    activated_date TEXT,
    closed_date TEXT,
    is_removed INTEGER NOT NULL DEFAULT 0 CHECK (is_removed IN (0, 1))
);

CREATE TABLE IF NOT EXISTS sprint_snapshots (
    snapshot_id INTEGER PRIMARY KEY AUTOINCREMENT,
    sprint_id TEXT NOT NULL REFERENCES sprints(sprint_id) ON DELETE CASCADE,
    snapshot_date TEXT NOT NULL,
    todo_count INTEGER NOT NULL DEFAULT 0 CHECK (todo_count >= 0),
    in_progress_count INTEGER NOT NULL DEFAULT 0 CHECK (in_progress_count >= 0),
    done_count INTEGER NOT NULL DEFAULT 0 CHECK (done_count >= 0),
    blocked_count INTEGER NOT NULL DEFAULT 0 CHECK (blocked_count >= 0),
    UNIQUE (sprint_id, snapshot_date)
);

CREATE TABLE IF NOT EXISTS store_meta (
    id INTEGER PRIMARY KEY CHECK (id = 1),
    schema_version INTEGER NOT NULL
);

INSERT OR IGNORE INTO store_meta (id, schema_version) VALUES (1, 1);
";

/// Migration v2: read-path indexes for per-sprint lookups.
pub const MIGRATION_V2_SQL: &str = r"
CREATE INDEX IF NOT EXISTS idx_work_items_sprint_removed
    ON work_items(sprint_id, is_removed);

CREATE INDEX IF NOT EXISTS idx_sprint_snapshots_sprint_date
    ON sprint_snapshots(sprint_id, snapshot_date);

UPDATE store_meta
SET schema_version = 2
WHERE id = 1;
";

/// Indexes expected by the reconciliation query paths.
pub const REQUIRED_INDEXES: &[&str] = &[
    "idx_work_items_sprint_removed",
    "idx_sprint_snapshots_sprint_date",
];
