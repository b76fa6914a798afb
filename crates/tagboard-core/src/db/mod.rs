//! SQLite document store utilities.
//!
//! Runtime defaults:
//! - `journal_mode = WAL` so scans keep reading while registry writers append
//! - `busy_timeout = 5s` so concurrent slug resolution waits instead of failing
//! - `foreign_keys = ON` for the relational side tables

pub mod assets;
pub mod colors;
pub mod documents;
pub mod migrations;
pub mod schema;

use anyhow::{Context, Result};
use chrono::{SecondsFormat, Utc};
use rusqlite::Connection;

use crate::error::TagboardError;
use std::{
    path::{Path, PathBuf},
    time::Duration,
};

/// Busy timeout used for store connections.
pub const DEFAULT_BUSY_TIMEOUT: Duration = Duration::from_secs(5);

/// Directory holding the store and config, relative to the project root.
pub const STORE_DIR: &str = ".tagboard";

/// File name of the SQLite store inside [`STORE_DIR`].
pub const STORE_FILE: &str = "tagboard.db";

/// Path of the store database for a project root.
#[must_use]
pub fn store_path(project_root: &Path) -> PathBuf {
    project_root.join(STORE_DIR).join(STORE_FILE)
}

/// Current UTC time as ISO-8601 with millisecond precision.
#[must_use]
pub fn timestamp_now() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true)
}

/// Open (or create) the store database, apply runtime pragmas, and migrate
/// the schema to the latest version.
///
/// # Errors
///
/// Returns an error if opening/configuring/migrating the database fails.
pub fn open_store(path: &Path) -> Result<Connection> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("create store directory {}", parent.display()))?;
    }

    let mut conn =
        Connection::open(path).with_context(|| format!("open store database {}", path.display()))?;

    configure_connection(&conn).context("configure sqlite pragmas")?;
    migrations::migrate(&mut conn).context("apply store migrations")?;

    Ok(conn)
}

/// Open an existing store, returning `Ok(None)` when it is missing or corrupt.
///
/// # Errors
///
/// Never fails today; the `Result` leaves room for unexpected I/O errors.
pub fn try_open_store(path: &Path) -> Result<Option<Connection>> {
    if !path.exists() {
        return Ok(None);
    }

    match open_store(path) {
        Ok(conn) => {
            let readable = conn
                .query_row("SELECT schema_version FROM store_meta WHERE id = 1", [], |row| {
                    row.get::<_, i64>(0)
                })
                .is_ok();
            if readable {
                Ok(Some(conn))
            } else {
                tracing::warn!(path = %path.display(), "store metadata unreadable, treating as corrupt");
                Ok(None)
            }
        }
        Err(e) => {
            tracing::warn!(
                path = %path.display(),
                error = %e,
                "failed to open store database"
            );
            Ok(None)
        }
    }
}

/// Open the store of an initialized project.
///
/// # Errors
///
/// Returns [`TagboardError::NotInitialized`] when no store file exists and
/// [`TagboardError::CorruptStore`] when it cannot be opened.
pub fn open_project_store(project_root: &Path) -> Result<Connection, TagboardError> {
    let path = store_path(project_root);
    if !path.exists() {
        return Err(TagboardError::NotInitialized(path));
    }
    match try_open_store(&path) {
        Ok(Some(conn)) => Ok(conn),
        Ok(None) | Err(_) => Err(TagboardError::CorruptStore(path)),
    }
}

fn configure_connection(conn: &Connection) -> rusqlite::Result<()> {
    conn.pragma_update(None, "foreign_keys", "ON")?;
    conn.pragma_update(None, "synchronous", "NORMAL")?;
    let _journal_mode: String =
        conn.query_row("PRAGMA journal_mode = WAL", [], |row| row.get(0))?;
    conn.busy_timeout(DEFAULT_BUSY_TIMEOUT)?;
    Ok(())
}

/// In-memory migrated store for unit tests.
#[cfg(test)]
pub(crate) fn test_store() -> Connection {
    let mut conn = Connection::open_in_memory().expect("open in-memory db");
    migrations::migrate(&mut conn).expect("migrate");
    conn
}

#[cfg(test)]
mod tests {
    use super::{
        DEFAULT_BUSY_TIMEOUT, open_project_store, open_store, store_path, timestamp_now,
        try_open_store,
    };
    use crate::db::migrations;
    use crate::error::TagboardError;
    use tempfile::TempDir;

    #[test]
    fn open_store_sets_wal_and_busy_timeout() {
        let dir = TempDir::new().expect("create temp dir");
        let conn = open_store(&store_path(dir.path())).expect("open store");

        let journal_mode: String = conn
            .pragma_query_value(None, "journal_mode", |row| row.get(0))
            .expect("query journal_mode");
        assert_eq!(journal_mode.to_ascii_lowercase(), "wal");

        let busy_timeout_ms: u64 = conn
            .pragma_query_value(None, "busy_timeout", |row| row.get(0))
            .expect("query busy_timeout");
        assert_eq!(u128::from(busy_timeout_ms), DEFAULT_BUSY_TIMEOUT.as_millis());

        assert_eq!(
            migrations::current_schema_version(&conn).expect("version"),
            migrations::LATEST_SCHEMA_VERSION
        );
    }

    #[test]
    fn try_open_store_missing_returns_none() {
        let dir = TempDir::new().expect("create temp dir");
        let opened = try_open_store(&store_path(dir.path())).expect("no io error");
        assert!(opened.is_none());
    }

    #[test]
    fn try_open_store_garbage_file_returns_none() {
        let dir = TempDir::new().expect("create temp dir");
        let path = store_path(dir.path());
        std::fs::create_dir_all(path.parent().expect("parent")).expect("mkdir");
        std::fs::write(&path, b"definitely not sqlite").expect("write garbage");

        let opened = try_open_store(&path).expect("no io error");
        assert!(opened.is_none());
    }

    #[test]
    fn open_project_store_distinguishes_missing_and_corrupt() {
        let dir = TempDir::new().expect("create temp dir");
        assert!(matches!(
            open_project_store(dir.path()),
            Err(TagboardError::NotInitialized(_))
        ));

        let path = store_path(dir.path());
        std::fs::create_dir_all(path.parent().expect("parent")).expect("mkdir");
        std::fs::write(&path, b"definitely not sqlite").expect("write garbage");
        assert!(matches!(
            open_project_store(dir.path()),
            Err(TagboardError::CorruptStore(_))
        ));
    }

    #[test]
    fn timestamps_are_iso8601_with_millis() {
        let ts = timestamp_now();
        // 2024-05-01T12:34:56.789Z
        assert_eq!(ts.len(), 24, "unexpected timestamp shape: {ts}");
        assert!(ts.ends_with('Z'));
        assert_eq!(&ts[19..20], ".");
    }
}
