//! SQLite warehouse database utilities.
//!
//! Runtime defaults:
//! - `journal_mode = WAL` so readers are not blocked by a running loader
//! - `busy_timeout` (5s unless configured) to ride out concurrent loader runs
//! - `foreign_keys = ON` so links and satellites only reference stored hubs

pub mod counters;
pub mod migrations;
pub mod query;
pub mod schema;
pub mod writer;

use anyhow::{Context, Result};
use rusqlite::Connection;
use std::{path::Path, time::Duration};

/// Busy timeout used for warehouse connections when none is configured.
pub const DEFAULT_BUSY_TIMEOUT: Duration = Duration::from_secs(5);

/// Open (or create) the warehouse database, apply runtime pragmas, and
/// migrate the schema to the latest version.
///
/// The connection is released when the returned value is dropped.
///
/// # Errors
///
/// Returns an error if opening/configuring/migrating the database fails.
pub fn open_warehouse(path: &Path, busy_timeout: Duration) -> Result<Connection> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("create warehouse directory {}", parent.display()))?;
    }

    let mut conn = Connection::open(path)
        .with_context(|| format!("open warehouse database {}", path.display()))?;

    configure_connection(&conn, busy_timeout).context("configure sqlite pragmas")?;
    migrations::migrate(&mut conn).context("apply warehouse migrations")?;

    Ok(conn)
}

/// Open a migrated in-memory warehouse.
///
/// # Errors
///
/// Returns an error if configuring or migrating the database fails.
pub fn open_in_memory() -> Result<Connection> {
    let mut conn = Connection::open_in_memory().context("open in-memory warehouse")?;
    conn.pragma_update(None, "foreign_keys", "ON")
        .context("enable foreign keys")?;
    migrations::migrate(&mut conn).context("apply warehouse migrations")?;
    Ok(conn)
}

fn configure_connection(conn: &Connection, busy_timeout: Duration) -> rusqlite::Result<()> {
    conn.pragma_update(None, "foreign_keys", "ON")?;
    conn.pragma_update(None, "synchronous", "NORMAL")?;
    let _journal_mode: String =
        conn.query_row("PRAGMA journal_mode = WAL", [], |row| row.get(0))?;
    conn.busy_timeout(busy_timeout)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::{DEFAULT_BUSY_TIMEOUT, open_warehouse};
    use crate::db::migrations;
    use tempfile::TempDir;

    fn temp_db_path() -> (TempDir, std::path::PathBuf) {
        let dir = tempfile::tempdir().expect("create temp dir");
        let path = dir.path().join("nested/warehouse.db");
        (dir, path)
    }

    #[test]
    fn open_warehouse_sets_wal_busy_timeout_and_fk() {
        let (_dir, path) = temp_db_path();
        let conn = open_warehouse(&path, DEFAULT_BUSY_TIMEOUT).expect("open warehouse db");

        let journal_mode: String = conn
            .pragma_query_value(None, "journal_mode", |row| row.get(0))
            .expect("query journal_mode");
        assert_eq!(journal_mode.to_ascii_lowercase(), "wal");

        let busy_timeout_ms: u64 = conn
            .pragma_query_value(None, "busy_timeout", |row| row.get(0))
            .expect("query busy_timeout");
        assert_eq!(
            u128::from(busy_timeout_ms),
            DEFAULT_BUSY_TIMEOUT.as_millis()
        );

        let foreign_keys: i64 = conn
            .pragma_query_value(None, "foreign_keys", |row| row.get(0))
            .expect("query foreign_keys");
        assert_eq!(foreign_keys, 1);
    }

    #[test]
    fn open_warehouse_runs_migrations() {
        let (_dir, path) = temp_db_path();
        let conn = open_warehouse(&path, DEFAULT_BUSY_TIMEOUT).expect("open warehouse db");

        let version = migrations::current_schema_version(&conn).expect("schema version query");
        assert_eq!(version, migrations::LATEST_SCHEMA_VERSION);
    }

    #[test]
    fn reopening_keeps_schema_version() {
        let (_dir, path) = temp_db_path();
        drop(open_warehouse(&path, DEFAULT_BUSY_TIMEOUT).expect("first open"));
        let conn = open_warehouse(&path, DEFAULT_BUSY_TIMEOUT).expect("second open");

        let version = migrations::current_schema_version(&conn).expect("schema version query");
        assert_eq!(version, migrations::LATEST_SCHEMA_VERSION);
    }
}
