//! SQLite store utilities.
//!
//! Runtime defaults:
//! - `journal_mode = WAL` so the dashboard can read while a batch writes
//! - `busy_timeout = 5s` to ride out transient lock failures
//! - `foreign_keys = ON` to protect sprint ownership of items and snapshots

pub mod migrations;
pub mod schema;

use anyhow::{Context, Result};
use rusqlite::Connection;
use std::{path::Path, time::Duration};

use crate::store::StoreError;

/// Busy timeout used for store connections.
pub const DEFAULT_BUSY_TIMEOUT: Duration = Duration::from_secs(5);

/// Open (or create) the store database, apply runtime pragmas, and migrate
/// the schema to the latest version.
///
/// # Errors
///
/// Returns an error if opening/configuring/migrating the database fails.
pub fn create_store(path: &Path) -> Result<Connection> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("create store directory {}", parent.display()))?;
    }

    open_connection(path)
}

/// Open an existing store database. Never creates a file.
///
/// # Errors
///
/// Returns [`StoreError::NotInitialized`] when `path` does not exist,
/// [`StoreError::SchemaTooNew`] when a newer binary wrote the schema, or the
/// underlying SQLite error.
pub fn open_store(path: &Path) -> Result<Connection> {
    if !path.exists() {
        return Err(StoreError::NotInitialized {
            path: path.to_path_buf(),
        })
        .context("open sprint store");
    }

    open_connection(path)
}

fn open_connection(path: &Path) -> Result<Connection> {
    let mut conn = Connection::open(path)
        .map_err(StoreError::from)
        .with_context(|| format!("open store database {}", path.display()))?;

    configure_connection(&conn)
        .map_err(StoreError::from)
        .context("configure sqlite pragmas")?;

    migrations::migrate(&mut conn)
        .with_context(|| format!("migrate store database {}", path.display()))?;

    Ok(conn)
}

fn configure_connection(conn: &Connection) -> rusqlite::Result<()> {
    conn.pragma_update(None, "foreign_keys", "ON")?;
    conn.pragma_update(None, "synchronous", "NORMAL")?;
    let _journal_mode: String =
        conn.query_row("PRAGMA journal_mode = WAL", [], |row| row.get(0))?;
    conn.busy_timeout(DEFAULT_BUSY_TIMEOUT)?;
    Ok(())
}
