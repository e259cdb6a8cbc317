// ABOUTME: Parses migrator configuration files
// ABOUTME: Converts TOML into export/import settings and custom table serializers

use crate::serializers::{TableGroup, TableSerializer};
use crate::utils::validate_identifier;
use anyhow::{bail, Context, Result};
use serde::Deserialize;
use std::fs;
use std::path::Path;

#[derive(Debug, Deserialize, Default)]
#[serde(deny_unknown_fields)]
pub struct MigratorConfig {
    #[serde(default)]
    pub export: ExportConfig,
    #[serde(default)]
    pub import: ImportConfig,
    #[serde(default)]
    tables: Vec<CustomTableConfig>,
}

#[derive(Debug, Deserialize, Default)]
#[serde(deny_unknown_fields)]
pub struct ExportConfig {
    pub batch_size: Option<u64>,
    pub include_groups: Option<Vec<String>>,
    pub exclude_groups: Option<Vec<String>>,
}

#[derive(Debug, Deserialize, Default)]
#[serde(deny_unknown_fields)]
pub struct ImportConfig {
    pub batch_size: Option<u64>,
    pub clear_existing: Option<bool>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct CustomTableConfig {
    name: String,
    table: String,
    query: String,
    count_query: Option<String>,
}

impl MigratorConfig {
    /// Serializers declared under `[[tables]]`, all in the custom group
    ///
    /// A table with a `count_query` is exported in batches.
    pub fn custom_serializers(&self) -> Result<Vec<TableSerializer>> {
        self.tables
            .iter()
            .map(|t| -> Result<TableSerializer> {
                validate_identifier(&t.name)
                    .with_context(|| format!("Invalid custom table name '{}'", t.name))?;
                validate_identifier(&t.table)
                    .with_context(|| format!("Invalid destination table for '{}'", t.name))?;
                if t.query.trim().is_empty() {
                    bail!("Custom table '{}' has an empty query", t.name);
                }

                Ok(match &t.count_query {
                    Some(count) if !count.trim().is_empty() => TableSerializer::batched(
                        &t.name,
                        TableGroup::Custom,
                        &t.table,
                        &t.query,
                        count,
                    ),
                    Some(_) => bail!("Custom table '{}' has an empty count_query", t.name),
                    None => TableSerializer::bulk(&t.name, TableGroup::Custom, &t.table, &t.query),
                })
            })
            .collect()
    }
}

pub fn load_config_from_file(path: &Path) -> Result<MigratorConfig> {
    let raw = fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file at {}", path.display()))?;
    let parsed: MigratorConfig = toml::from_str(&raw)
        .with_context(|| format!("Failed to parse TOML config at {}", path.display()))?;

    if parsed.export.batch_size == Some(0) || parsed.import.batch_size == Some(0) {
        bail!("batch_size in {} must be greater than zero", path.display());
    }

    tracing::debug!(
        "Loaded config from {} ({} custom table(s))",
        path.display(),
        parsed.tables.len()
    );
    Ok(parsed)
}

/// Built-in serializers followed by any declared in the config
pub fn registry(config: Option<&MigratorConfig>) -> Result<Vec<TableSerializer>> {
    let mut serializers = crate::serializers::builtin_serializers();
    if let Some(config) = config {
        serializers.extend(config.custom_serializers()?);
    }
    crate::serializers::validate_registry(&serializers)?;
    Ok(serializers)
}
