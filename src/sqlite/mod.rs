// ABOUTME: SQLite database access for table export and import
// ABOUTME: Provides secure file path validation and read-only or writable connections

pub mod converter;
pub mod reader;
pub mod writer;

use anyhow::{bail, Context, Result};
use std::path::PathBuf;

/// File extensions accepted for SQLite databases
pub const SQLITE_EXTENSIONS: &[&str] = &["db", "sqlite", "sqlite3"];

/// Validate a SQLite file path to prevent path traversal attacks
///
/// Security checks:
/// - Canonicalizes path to resolve symlinks and relative paths
/// - Verifies file exists and is a regular file (not directory)
/// - Checks file extension is .db, .sqlite, or .sqlite3
///
/// # Arguments
///
/// * `path` - Path to SQLite file (can be relative or absolute)
///
/// # Returns
///
/// Canonicalized absolute path if valid, error otherwise
///
/// # Examples
///
/// ```no_run
/// # use fam_db_migrator::sqlite::validate_sqlite_path;
/// // Valid paths (when files exist)
/// assert!(validate_sqlite_path("fam.sqlite").is_ok());
///
/// // Invalid paths
/// assert!(validate_sqlite_path("../../../etc/passwd").is_err());
/// assert!(validate_sqlite_path("/nonexistent.db").is_err());
/// ```
pub fn validate_sqlite_path(path: &str) -> Result<PathBuf> {
    if path.is_empty() {
        bail!("SQLite file path cannot be empty");
    }

    let path_buf = PathBuf::from(path);

    // Canonicalize to resolve symlinks and relative paths
    // This also validates that the file exists
    let canonical = path_buf.canonicalize().with_context(|| {
        format!(
            "Failed to resolve SQLite file path '{}'. \
             File may not exist or may not be readable.",
            path
        )
    })?;

    if !canonical.is_file() {
        bail!("Path '{}' is not a regular file (may be a directory)", path);
    }

    if let Some(ext) = canonical.extension() {
        let ext_str = ext.to_str().unwrap_or("").to_lowercase();
        if !SQLITE_EXTENSIONS.contains(&ext_str.as_str()) {
            bail!(
                "Invalid SQLite file extension '{}'. \
                 Must be .db, .sqlite, or .sqlite3",
                ext_str
            );
        }
    } else {
        bail!(
            "SQLite file '{}' has no extension. \
             Must be .db, .sqlite, or .sqlite3",
            path
        );
    }

    tracing::debug!("Validated SQLite path: {}", canonical.display());

    Ok(canonical)
}

/// Open a SQLite database in read-only mode
///
/// Used for export sources. The database file must exist and be readable.
///
/// # Examples
///
/// ```no_run
/// # use fam_db_migrator::sqlite::open_sqlite;
/// # fn example() -> anyhow::Result<()> {
/// let conn = open_sqlite("fam.sqlite")?;
/// # Ok(())
/// # }
/// ```
pub fn open_sqlite(path: &str) -> Result<rusqlite::Connection> {
    open_with_flags(path, rusqlite::OpenFlags::SQLITE_OPEN_READ_ONLY)
}

/// Open an existing SQLite database for writing
///
/// Used for import targets. The file must already exist and hold the
/// destination schema; it is never created here.
pub fn open_sqlite_writable(path: &str) -> Result<rusqlite::Connection> {
    open_with_flags(path, rusqlite::OpenFlags::SQLITE_OPEN_READ_WRITE)
}

fn open_with_flags(path: &str, flags: rusqlite::OpenFlags) -> Result<rusqlite::Connection> {
    let canonical = validate_sqlite_path(path)?;

    tracing::debug!("Opening SQLite database: {}", canonical.display());

    let conn = rusqlite::Connection::open_with_flags(&canonical, flags)
        .with_context(|| format!("Failed to open SQLite database: {}", canonical.display()))?;

    // Verify we can query the database
    let _version: String = conn
        .query_row("SELECT sqlite_version()", [], |row| row.get(0))
        .context("Failed to query SQLite version (database may be corrupted)")?;

    Ok(conn)
}
