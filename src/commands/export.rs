// ABOUTME: Export command: resolves config, filters, and interactive selection
// ABOUTME: Then runs the export on a background task while drawing progress

use super::render::run_with_progress;
use crate::config::{self, MigratorConfig};
use crate::database::DatabaseUrl;
use crate::export::{export_database, ExportOptions, DEFAULT_EXPORT_BATCH_SIZE};
use crate::filters::TableFilter;
use anyhow::{bail, Result};
use std::path::PathBuf;

/// Arguments of the `export` subcommand
#[derive(Debug, Clone, Default)]
pub struct ExportArgs {
    pub source: String,
    pub output: PathBuf,
    pub batch_size: Option<u64>,
    pub config: Option<PathBuf>,
    pub include_tables: Option<Vec<String>>,
    pub exclude_tables: Option<Vec<String>>,
    pub include_groups: Option<Vec<String>>,
    pub exclude_groups: Option<Vec<String>>,
    pub interactive: bool,
}

/// Build export options from CLI arguments and an optional config file
///
/// CLI values win over the file; the file wins over defaults.
pub fn resolve_options(args: &ExportArgs, config: Option<&MigratorConfig>) -> Result<ExportOptions> {
    let source = DatabaseUrl::parse(&args.source)?;

    let file = config.map(|c| &c.export);
    let batch_size = args
        .batch_size
        .or(file.and_then(|f| f.batch_size))
        .unwrap_or(DEFAULT_EXPORT_BATCH_SIZE);
    if batch_size == 0 {
        bail!("--batch-size must be greater than zero");
    }

    // Group lists from the file only apply when the CLI gives none.
    let (include_groups, exclude_groups) =
        if args.include_groups.is_some() || args.exclude_groups.is_some() {
            (args.include_groups.clone(), args.exclude_groups.clone())
        } else {
            (
                file.and_then(|f| f.include_groups.clone()),
                file.and_then(|f| f.exclude_groups.clone()),
            )
        };

    let filter = TableFilter::new(
        args.include_tables.clone(),
        args.exclude_tables.clone(),
        include_groups,
        exclude_groups,
    )?;

    Ok(ExportOptions {
        source,
        output_dir: args.output.clone(),
        batch_size,
        filter,
    })
}

pub async fn export(args: ExportArgs) -> Result<()> {
    let config = args
        .config
        .as_deref()
        .map(config::load_config_from_file)
        .transpose()?;
    let mut options = resolve_options(&args, config.as_ref())?;
    let mut serializers = config::registry(config.as_ref())?;

    if args.interactive {
        let candidates = options.filter.apply(&serializers)?;
        serializers = crate::interactive::select_serializers(&candidates)?;
        if serializers.is_empty() {
            bail!("No tables selected; nothing to export");
        }
        options.filter = TableFilter::empty();
    }

    if crate::export::has_export(&options.output_dir) {
        tracing::warn!(
            "⚠ {} already contains an export; matching files will be overwritten",
            options.output_dir.display()
        );
    }

    let summary = run_with_progress("Exporting", move |sink| async move {
        export_database(&options, &serializers, &sink).await
    })
    .await?;

    println!(
        "Exported {} table(s), {} rows. Manifest: {}",
        summary.tables(),
        summary.rows(),
        summary.manifest_path.display()
    );
    Ok(())
}
