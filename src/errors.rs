// ABOUTME: Structured error type carrying a tracking code and debug key/value pairs
// ABOUTME: Wrapped inside anyhow errors so the CLI can print query and connection context

use std::fmt;

/// Query failed while writing a table in one shot
pub const EXPORT_QUERY_FAILED: &str = "FDM-EXPORT-QUERY";
/// Row count query failed before paging a table
pub const EXPORT_COUNT_FAILED: &str = "FDM-EXPORT-COUNT";
/// A single paged batch failed
pub const EXPORT_BATCH_FAILED: &str = "FDM-EXPORT-BATCH";
/// Serialized rows could not be written to the output
pub const EXPORT_WRITE_FAILED: &str = "FDM-EXPORT-WRITE";
/// Clearing a destination table failed
pub const IMPORT_CLEAR_FAILED: &str = "FDM-IMPORT-CLEAR";
/// Inserting a batch of rows failed
pub const IMPORT_INSERT_FAILED: &str = "FDM-IMPORT-INSERT";
/// An exported table file did not match the manifest
pub const IMPORT_FILE_MISMATCH: &str = "FDM-IMPORT-FILE";

/// An error tagged with a stable tracking code and debug data
///
/// The debug pairs typically hold the failing SQL text and the (redacted)
/// connection string. They are not part of `Display` so that log lines stay
/// short; callers that want them walk the anyhow chain with
/// [`TrackedError::find`].
#[derive(Debug, thiserror::Error)]
#[error("{message} [{code}]")]
pub struct TrackedError {
    code: &'static str,
    message: String,
    debug: Vec<(String, String)>,
}

impl TrackedError {
    pub fn new(code: &'static str, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            debug: Vec::new(),
        }
    }

    /// Attach a debug key/value pair
    pub fn with_debug(mut self, key: &str, value: impl fmt::Display) -> Self {
        self.debug.push((key.to_string(), value.to_string()));
        self
    }

    pub fn code(&self) -> &'static str {
        self.code
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn debug_data(&self) -> &[(String, String)] {
        &self.debug
    }

    /// Look up a debug value by key
    pub fn debug_value(&self, key: &str) -> Option<&str> {
        self.debug
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    /// Find the tracked error attached anywhere in an anyhow context chain
    pub fn find(error: &anyhow::Error) -> Option<&TrackedError> {
        error.downcast_ref::<TrackedError>()
    }
}

/// Extension for wrapping a failed result into a [`TrackedError`]
///
/// The original error is kept as the source of the returned anyhow error,
/// so `{:#}` formatting still shows the database's own message.
pub trait TrackResult<T> {
    fn track<F>(self, f: F) -> anyhow::Result<T>
    where
        F: FnOnce() -> TrackedError;
}

impl<T, E> TrackResult<T> for Result<T, E>
where
    E: Into<anyhow::Error>,
{
    fn track<F>(self, f: F) -> anyhow::Result<T>
    where
        F: FnOnce() -> TrackedError,
    {
        self.map_err(|e| e.into().context(f()))
    }
}
