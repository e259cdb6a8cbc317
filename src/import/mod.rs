// ABOUTME: Imports an export directory back into a database
// ABOUTME: Verifies checksums, optionally clears tables, and inserts each table in one transaction

use crate::database::{Connection, DatabaseUrl, JsonRow};
use crate::errors::{
    TrackResult, TrackedError, IMPORT_CLEAR_FAILED, IMPORT_FILE_MISMATCH, IMPORT_INSERT_FAILED,
};
use crate::filters::TableFilter;
use crate::manifest::{file_sha256, ExportManifest, TableEntry};
use crate::progress::{ProgressEvent, ProgressSink};
use crate::utils::validate_identifier;
use anyhow::{bail, Context, Result};
use serde_json::de::IoRead;
use serde_json::StreamDeserializer;
use std::fs::File;
use std::io::{BufReader, Read};
use std::path::{Path, PathBuf};
use std::time::Instant;

/// Default number of rows per INSERT round trip
pub const DEFAULT_IMPORT_BATCH_SIZE: u64 = 500;

#[derive(Debug, Clone)]
pub struct ImportOptions {
    pub target: DatabaseUrl,
    pub input_dir: PathBuf,
    /// Delete existing rows of every imported table first
    pub clear_existing: bool,
    /// Rows per insert call
    pub batch_size: u64,
    /// Applied to serializer names from the manifest
    pub filter: TableFilter,
}

impl ImportOptions {
    pub fn new(target: DatabaseUrl, input_dir: impl Into<PathBuf>) -> Self {
        Self {
            target,
            input_dir: input_dir.into(),
            clear_existing: false,
            batch_size: DEFAULT_IMPORT_BATCH_SIZE,
            filter: TableFilter::empty(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ImportSummary {
    pub tables: usize,
    pub rows: u64,
    pub skipped: Vec<String>,
}

/// Read a table file: a stream of JSON array documents, one per batch
///
/// Whitespace between documents is ignored, so both the one-per-line layout
/// and hand-concatenated files load. An empty file yields no batches.
pub fn read_table_file(path: &Path) -> Result<Vec<Vec<JsonRow>>> {
    let mut batches = Vec::new();
    for (index, document) in open_documents(path)?.enumerate() {
        batches.push(document.with_context(|| invalid_document(path, index))?);
    }
    Ok(batches)
}

type DocumentStream<R> = StreamDeserializer<'static, IoRead<R>, Vec<JsonRow>>;

fn open_documents(path: &Path) -> Result<DocumentStream<BufReader<File>>> {
    let file = File::open(path).with_context(|| format!("Failed to open {}", path.display()))?;
    Ok(document_stream(BufReader::new(file)))
}

/// Lazily parse concatenated JSON array documents, one batch per item
fn document_stream<R: Read>(reader: R) -> DocumentStream<R> {
    serde_json::Deserializer::from_reader(reader).into_iter::<Vec<JsonRow>>()
}

fn invalid_document(path: &Path, index: usize) -> String {
    format!(
        "Invalid JSON in {} (document {}); expected an array of row objects",
        path.display(),
        index + 1
    )
}

/// Import every table of an export directory, in manifest order
///
/// All files are checked against the manifest's checksums before the target
/// is touched. With `clear_existing` the selected tables are emptied in
/// reverse manifest order, so rows referencing a parent go first. Each table
/// is then inserted inside its own transaction; a failure rolls that table
/// back and aborts the import, leaving tables already committed in place.
pub async fn import_database(options: &ImportOptions, progress: &ProgressSink) -> Result<ImportSummary> {
    if options.batch_size == 0 {
        bail!("Batch size must be greater than zero");
    }

    let manifest = ExportManifest::load(&options.input_dir)?;
    let started = Instant::now();
    let mut summary = ImportSummary::default();

    let mut selected: Vec<&TableEntry> = Vec::new();
    for entry in &manifest.tables {
        // Manifest entries carry no group, so only name lists apply.
        if options.filter.should_include_name(&entry.name) {
            selected.push(entry);
        } else {
            tracing::info!("  Skipping {} (filtered)", entry.name);
            progress.report(ProgressEvent::TableSkipped {
                name: entry.name.clone(),
                reason: "filtered".to_string(),
            });
            summary.skipped.push(entry.name.clone());
        }
    }

    if selected.is_empty() {
        bail!("No tables selected for import. Check your filters.");
    }

    for entry in &selected {
        verify_file(&options.input_dir, entry)?;
    }
    tracing::info!("✓ Verified {} table file(s)", selected.len());

    if options.clear_existing {
        let mut conn = options.target.connect_target().await?;
        for entry in selected.iter().rev() {
            let deleted = conn.clear_table(&entry.table).await.track(|| {
                TrackedError::new(IMPORT_CLEAR_FAILED, "Failed to clear destination table")
                    .with_debug("table", &entry.table)
                    .with_debug("connection", options.target.redacted())
            })?;
            tracing::info!("  Cleared {} ({} rows)", entry.table, deleted);
        }
    }

    let total = selected.len();
    for (index, entry) in selected.iter().enumerate() {
        progress.report(ProgressEvent::TableStarted {
            name: entry.name.clone(),
            index,
            total,
        });

        let mut conn = options.target.connect_target().await?;
        let rows = import_table(&mut conn, options, entry, progress).await?;

        tracing::info!("  ✓ {} ({} rows)", entry.name, rows);
        progress.report(ProgressEvent::TableFinished {
            name: entry.name.clone(),
            rows,
        });
        summary.tables += 1;
        summary.rows += rows;
    }

    tracing::info!(
        "✓ Imported {} table(s), {} rows in {}",
        summary.tables,
        summary.rows,
        crate::utils::format_duration(started.elapsed())
    );
    progress.report(ProgressEvent::Finished {
        tables: summary.tables,
        rows: summary.rows,
    });

    Ok(summary)
}

/// Reject manifest entries whose file is not `<name>.json` next to the manifest
fn check_entry(entry: &TableEntry) -> Result<()> {
    validate_identifier(&entry.name).track(|| {
        TrackedError::new(IMPORT_FILE_MISMATCH, "Manifest entry has an invalid name")
            .with_debug("name", &entry.name)
    })?;
    validate_identifier(&entry.table).track(|| {
        TrackedError::new(IMPORT_FILE_MISMATCH, "Manifest entry has an invalid table name")
            .with_debug("name", &entry.name)
            .with_debug("table", &entry.table)
    })?;

    let expected = format!("{}.json", entry.name);
    if entry.file != expected {
        return Err(TrackedError::new(IMPORT_FILE_MISMATCH, "Manifest entry names an unexpected file")
            .with_debug("name", &entry.name)
            .with_debug("file", &entry.file)
            .with_debug("expected", expected)
            .into());
    }
    Ok(())
}

fn verify_file(dir: &Path, entry: &TableEntry) -> Result<()> {
    check_entry(entry)?;

    let path = dir.join(&entry.file);
    if !path.is_file() {
        return Err(TrackedError::new(IMPORT_FILE_MISMATCH, "Table file listed in manifest is missing")
            .with_debug("file", path.display())
            .into());
    }

    let actual = file_sha256(&path)?;
    if actual != entry.sha256 {
        return Err(TrackedError::new(IMPORT_FILE_MISMATCH, "Table file does not match its checksum")
            .with_debug("file", path.display())
            .with_debug("expected", &entry.sha256)
            .with_debug("actual", actual)
            .into());
    }
    Ok(())
}

/// Insert one table file inside a transaction
///
/// The file is streamed one document at a time and rows are inserted in
/// `batch_size` chunks, so memory stays bounded by the largest batch. The
/// transaction only commits once the number of rows read matches the
/// manifest.
async fn import_table(
    conn: &mut Connection,
    options: &ImportOptions,
    entry: &TableEntry,
    progress: &ProgressSink,
) -> Result<u64> {
    let path = options.input_dir.join(&entry.file);
    let documents = open_documents(&path)?;

    conn.begin().await?;
    match insert_documents(conn, options, entry, &path, documents, progress).await {
        Ok(inserted) => {
            conn.commit().await?;
            Ok(inserted)
        }
        Err(e) => {
            if let Err(rollback_err) = conn.rollback().await {
                tracing::warn!("Rollback of {} failed: {:#}", entry.table, rollback_err);
            }
            Err(e)
        }
    }
}

async fn insert_documents<I>(
    conn: &mut Connection,
    options: &ImportOptions,
    entry: &TableEntry,
    path: &Path,
    documents: I,
    progress: &ProgressSink,
) -> Result<u64>
where
    I: Iterator<Item = serde_json::Result<Vec<JsonRow>>>,
{
    let batch_size = options.batch_size as usize;
    let mut pending: Vec<JsonRow> = Vec::new();
    let mut read = 0u64;
    let mut done = 0u64;

    for (index, document) in documents.enumerate() {
        let rows = document.with_context(|| invalid_document(path, index))?;
        read += rows.len() as u64;
        if read > entry.rows {
            return Err(row_count_mismatch(path, entry, read));
        }
        pending.extend(rows);

        while pending.len() >= batch_size {
            let chunk: Vec<JsonRow> = pending.drain(..batch_size).collect();
            done += insert_chunk(conn, options, entry, &chunk, done, progress).await?;
        }
    }

    if read != entry.rows {
        return Err(row_count_mismatch(path, entry, read));
    }
    if !pending.is_empty() {
        done += insert_chunk(conn, options, entry, &pending, done, progress).await?;
    }

    Ok(done)
}

async fn insert_chunk(
    conn: &mut Connection,
    options: &ImportOptions,
    entry: &TableEntry,
    chunk: &[JsonRow],
    first_row: u64,
    progress: &ProgressSink,
) -> Result<u64> {
    let inserted = conn.insert_rows(&entry.table, chunk).await.track(|| {
        TrackedError::new(IMPORT_INSERT_FAILED, "Failed to insert rows")
            .with_debug("table", &entry.table)
            .with_debug("file", &entry.file)
            .with_debug("first_row", first_row)
            .with_debug("connection", options.target.redacted())
    })?;
    progress.report(ProgressEvent::BatchWritten {
        name: entry.name.clone(),
        rows_done: first_row + inserted,
        rows_total: entry.rows,
    });
    Ok(inserted)
}

fn row_count_mismatch(path: &Path, entry: &TableEntry, read: u64) -> anyhow::Error {
    TrackedError::new(IMPORT_FILE_MISMATCH, "Row count differs from manifest")
        .with_debug("file", path.display())
        .with_debug("expected", entry.rows)
        .with_debug("actual", read)
        .into()
}
