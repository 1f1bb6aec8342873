//! Catalog schema definitions and connection setup
//!
//! The catalog is a single SQLite relation keyed by relative path. New
//! catalogs are switched to WAL mode so classifier read connections never
//! wait on the reconciler's long-running write transaction.

use crate::error::{CatalogError, CatalogResult};
use rusqlite::{Connection, OpenFlags};
use std::path::Path;
use std::time::Duration;
use tracing::{debug, info};

/// Name of the catalog relation
pub const FILES_TABLE: &str = "files";

/// SQL to create the catalog relation
const CREATE_FILES_TABLE: &str = r#"
CREATE TABLE IF NOT EXISTS files (
    path TEXT NOT NULL PRIMARY KEY,
    size INTEGER NOT NULL,
    checksum TEXT NULL,           -- absent in size-only mode
    visited INTEGER NOT NULL      -- transient per-run marker
)
"#;

/// How long a connection waits on a locked database before failing
const BUSY_TIMEOUT: Duration = Duration::from_secs(30);

/// Open the catalog for writing, creating the relation if it is missing
pub fn open_catalog(path: &Path) -> CatalogResult<Connection> {
    let conn = Connection::open(path).map_err(|e| CatalogError::OpenFailed {
        path: path.to_path_buf(),
        reason: e.to_string(),
    })?;
    conn.busy_timeout(BUSY_TIMEOUT)?;

    if !table_exists(&conn)? {
        let mode: String =
            conn.pragma_update_and_check(None, "journal_mode", "WAL", |row| row.get(0))?;
        debug!(journal_mode = %mode, "Creating catalog");
        create_schema(&conn)?;
        info!(path = %path.display(), "Created new catalog");
    }

    Ok(conn)
}

/// Open a read-only connection for classifier lookups
pub fn open_reader(path: &Path) -> CatalogResult<Connection> {
    let flags = OpenFlags::SQLITE_OPEN_READ_ONLY | OpenFlags::SQLITE_OPEN_NO_MUTEX;
    let conn = Connection::open_with_flags(path, flags).map_err(|e| CatalogError::OpenFailed {
        path: path.to_path_buf(),
        reason: e.to_string(),
    })?;
    conn.busy_timeout(BUSY_TIMEOUT)?;
    Ok(conn)
}

/// Create the catalog relation in its own transaction
pub fn create_schema(conn: &Connection) -> CatalogResult<()> {
    let tx = conn.unchecked_transaction()?;
    tx.execute(CREATE_FILES_TABLE, [])?;
    tx.commit()?;
    Ok(())
}

/// Check whether the catalog relation exists
pub fn table_exists(conn: &Connection) -> CatalogResult<bool> {
    let count: i64 = conn.query_row(
        "SELECT COUNT(*) FROM sqlite_master WHERE type = 'table' AND name = ?1",
        [FILES_TABLE],
        |row| row.get(0),
    )?;
    Ok(count > 0)
}
