//! SQLite schema migrations for the sprint store.
//!
//! `PRAGMA user_version` is authoritative; `store_meta.schema_version`
//! mirrors it so the dashboard can read the version with plain SQL.

use super::schema;
use rusqlite::{Connection, types::Type};
use tracing::{debug, info};

use crate::store::StoreError;

/// Latest schema version understood by this binary.
pub const LATEST_SCHEMA_VERSION: u32 = 2;

const MIGRATIONS: &[(u32, &str)] = &[(1, schema::MIGRATION_V1_SQL), (2, schema::MIGRATION_V2_SQL)];

/// Read the store's `user_version`.
///
/// # Errors
///
/// Returns an error if querying SQLite fails or the stored value is negative
/// or too large.
pub fn current_schema_version(conn: &Connection) -> rusqlite::Result<u32> {
    let version: i64 = conn.pragma_query_value(None, "user_version", |row| row.get(0))?;
    u32::try_from(version).map_err(|error| {
        rusqlite::Error::FromSqlConversionFailure(0, Type::Integer, Box::new(error))
    })
}

/// Bring the store schema up to [`LATEST_SCHEMA_VERSION`].
///
/// A store already at the latest version is left untouched. Each pending
/// step runs in its own transaction together with the `user_version` and
/// `store_meta` bumps.
///
/// # Errors
///
/// Returns [`StoreError::SchemaTooNew`] if a newer binary wrote the store,
/// or the SQLite error of the failing step.
pub fn migrate(conn: &mut Connection) -> Result<u32, StoreError> {
    let found = current_schema_version(conn)?;
    if found > LATEST_SCHEMA_VERSION {
        return Err(StoreError::SchemaTooNew {
            found,
            supported: LATEST_SCHEMA_VERSION,
        });
    }

    let mut current = found;
    for &(version, sql) in MIGRATIONS.iter().filter(|(v, _)| *v > found) {
        let tx = conn.transaction()?;
        tx.execute_batch(sql)?;
        tx.pragma_update(None, "user_version", i64::from(version))?;
        tx.execute(
            "UPDATE store_meta SET schema_version = ?1 WHERE id = 1",
            [i64::from(version)],
        )?;
        tx.commit()?;
        debug!(version, "applied store migration");
        current = version;
    }

    if current != found {
        info!(from = found, to = current, "store schema migrated");
    }
    Ok(current)
}
