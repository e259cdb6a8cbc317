// ABOUTME: Exports a database's configuration tables into a directory of JSON files
// ABOUTME: Runs each selected serializer on its own connection and records a manifest

pub mod helper;

use crate::database::DatabaseUrl;
use crate::filters::TableFilter;
use crate::manifest::{file_sha256, ExportManifest, TableEntry};
use crate::progress::{ProgressEvent, ProgressSink};
use crate::serializers::{validate_registry, TableSerializer};
use anyhow::{bail, Context, Result};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use std::time::Instant;

/// Default number of rows per batch for batched tables
pub const DEFAULT_EXPORT_BATCH_SIZE: u64 = 10_000;

/// Everything an export needs besides the serializers themselves
#[derive(Debug, Clone)]
pub struct ExportOptions {
    pub source: DatabaseUrl,
    pub output_dir: PathBuf,
    pub batch_size: u64,
    pub filter: TableFilter,
}

impl ExportOptions {
    pub fn new(source: DatabaseUrl, output_dir: impl Into<PathBuf>) -> Self {
        Self {
            source,
            output_dir: output_dir.into(),
            batch_size: DEFAULT_EXPORT_BATCH_SIZE,
            filter: TableFilter::empty(),
        }
    }
}

/// Result of a finished export
#[derive(Debug, Clone)]
pub struct ExportSummary {
    pub manifest: ExportManifest,
    pub manifest_path: PathBuf,
}

impl ExportSummary {
    pub fn tables(&self) -> usize {
        self.manifest.tables.len()
    }

    pub fn rows(&self) -> u64 {
        self.manifest.total_rows()
    }
}

/// Export every serializer selected by the options' filter
///
/// Each table gets a fresh connection and is written into a temp file inside
/// `output_dir`, which is renamed to `<name>.json` only once the table has
/// been fully written. The first failing table aborts the export; files
/// already written for earlier tables stay, but no manifest is saved.
pub async fn export_database(
    options: &ExportOptions,
    serializers: &[TableSerializer],
    progress: &ProgressSink,
) -> Result<ExportSummary> {
    if options.batch_size == 0 {
        bail!("Batch size must be greater than zero");
    }
    validate_registry(serializers)?;
    let selected = options.filter.apply(serializers)?;

    std::fs::create_dir_all(&options.output_dir).with_context(|| {
        format!(
            "Failed to create output directory {}",
            options.output_dir.display()
        )
    })?;

    tracing::info!(
        "Exporting {} table(s) from {} to {}",
        selected.len(),
        options.source.redacted(),
        options.output_dir.display()
    );

    let started = Instant::now();
    let mut manifest = ExportManifest::new(options.source.redacted(), options.batch_size);
    let total = selected.len();

    for (index, serializer) in selected.iter().enumerate() {
        progress.report(ProgressEvent::TableStarted {
            name: serializer.name.clone(),
            index,
            total,
        });

        let entry = export_table(options, serializer, progress)
            .await
            .with_context(|| format!("Failed to export table '{}'", serializer.name))?;

        tracing::info!(
            "  ✓ {} ({} rows, {} batch(es))",
            entry.name,
            entry.rows,
            entry.batches
        );
        progress.report(ProgressEvent::TableFinished {
            name: entry.name.clone(),
            rows: entry.rows,
        });
        manifest.push(entry);
    }

    manifest.save(&options.output_dir)?;
    let rows = manifest.total_rows();

    tracing::info!(
        "✓ Exported {} table(s), {} rows in {}",
        manifest.tables.len(),
        rows,
        crate::utils::format_duration(started.elapsed())
    );
    progress.report(ProgressEvent::Finished {
        tables: manifest.tables.len(),
        rows,
    });

    Ok(ExportSummary {
        manifest,
        manifest_path: options.output_dir.join(crate::manifest::MANIFEST_FILE_NAME),
    })
}

async fn export_table(
    options: &ExportOptions,
    serializer: &TableSerializer,
    progress: &ProgressSink,
) -> Result<TableEntry> {
    let mut source = options.source.connect_source().await?;

    let final_path = options.output_dir.join(serializer.file_name());
    let mut tmp = tempfile::NamedTempFile::new_in(&options.output_dir).with_context(|| {
        format!(
            "Failed to create temp file in {}",
            options.output_dir.display()
        )
    })?;

    let summary = {
        let mut writer = BufWriter::new(tmp.as_file_mut());
        let name = serializer.name.clone();
        let summary = serializer
            .serialize(&mut source, &mut writer, options.batch_size, |rows_done, rows_total| {
                progress.report(ProgressEvent::BatchWritten {
                    name: name.clone(),
                    rows_done,
                    rows_total,
                });
            })
            .await?;
        writer
            .flush()
            .with_context(|| format!("Failed to flush {}", final_path.display()))?;
        summary
    };

    tmp.as_file()
        .sync_all()
        .with_context(|| format!("Failed to sync {}", final_path.display()))?;
    tmp.persist(&final_path)
        .with_context(|| format!("Failed to write {}", final_path.display()))?;

    Ok(TableEntry {
        name: serializer.name.clone(),
        table: serializer.table.clone(),
        file: serializer.file_name(),
        rows: summary.rows,
        batches: summary.batches,
        sha256: file_sha256(&final_path)?,
    })
}

/// Whether `dir` already holds an export manifest
pub fn has_export(dir: &Path) -> bool {
    dir.join(crate::manifest::MANIFEST_FILE_NAME).is_file()
}
