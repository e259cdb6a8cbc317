// ABOUTME: Table serializers describing how to read each exported table
// ABOUTME: Holds the serializer type, table groups, and the registry of all known serializers

mod builtin;

pub use builtin::builtin_serializers;

use crate::database::RowSource;
use crate::export::helper::{write_table_in_batches, write_table_in_bulk, TableWriteSummary};
use crate::utils::validate_identifier;
use anyhow::{bail, Result};
use std::collections::HashSet;
use std::fmt;
use std::io::Write;
use std::str::FromStr;

/// Group of related tables, used to include or exclude tables in bulk
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum TableGroup {
    /// Database settings, actions, workflows, tags, file handlers
    Core,
    /// Users, logins and roles
    Users,
    /// Attribute set and metadata definitions
    Attributes,
    /// Dashboards and database services
    Dashboards,
    /// Lab data entry: patients, orders, encounters, providers
    LabDe,
    /// Web application configuration and counters
    Web,
    /// Tables declared in the configuration file
    Custom,
}

impl TableGroup {
    pub const ALL: [TableGroup; 7] = [
        TableGroup::Core,
        TableGroup::Users,
        TableGroup::Attributes,
        TableGroup::Dashboards,
        TableGroup::LabDe,
        TableGroup::Web,
        TableGroup::Custom,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            TableGroup::Core => "core",
            TableGroup::Users => "users",
            TableGroup::Attributes => "attributes",
            TableGroup::Dashboards => "dashboards",
            TableGroup::LabDe => "labde",
            TableGroup::Web => "web",
            TableGroup::Custom => "custom",
        }
    }
}

impl fmt::Display for TableGroup {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TableGroup {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        let wanted = s.trim().to_lowercase();
        TableGroup::ALL
            .into_iter()
            .find(|g| g.as_str() == wanted)
            .ok_or_else(|| {
                anyhow::anyhow!(
                    "Unknown table group '{}'. Valid groups: {}",
                    s,
                    TableGroup::ALL
                        .iter()
                        .map(|g| g.as_str())
                        .collect::<Vec<_>>()
                        .join(", ")
                )
            })
    }
}

/// How a serializer writes its result
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WriteMode {
    /// Load the whole result and write it as one JSON document
    Bulk,
    /// Page through the result, one JSON document per batch
    Batched {
        /// Query returning the total number of rows the SELECT produces
        row_count_sql: String,
    },
}

/// Describes how to export one database table
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableSerializer {
    /// Unique name; the export file is `<name>.json`
    pub name: String,
    pub group: TableGroup,
    /// Destination table on import
    pub table: String,
    /// Fixed SELECT, ordered by a unique key when batched
    pub select_sql: String,
    pub mode: WriteMode,
}

impl TableSerializer {
    pub fn bulk(
        name: impl Into<String>,
        group: TableGroup,
        table: impl Into<String>,
        select_sql: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            group,
            table: table.into(),
            select_sql: select_sql.into(),
            mode: WriteMode::Bulk,
        }
    }

    pub fn batched(
        name: impl Into<String>,
        group: TableGroup,
        table: impl Into<String>,
        select_sql: impl Into<String>,
        row_count_sql: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            group,
            table: table.into(),
            select_sql: select_sql.into(),
            mode: WriteMode::Batched {
                row_count_sql: row_count_sql.into(),
            },
        }
    }

    /// File name of this serializer's output within an export directory
    pub fn file_name(&self) -> String {
        format!("{}.json", self.name)
    }

    pub fn is_batched(&self) -> bool {
        matches!(self.mode, WriteMode::Batched { .. })
    }

    /// Execute this serializer's SQL and write the result to `writer`
    pub async fn serialize<S, W>(
        &self,
        source: &mut S,
        writer: &mut W,
        batch_size: u64,
        on_batch: impl FnMut(u64, u64),
    ) -> Result<TableWriteSummary>
    where
        S: RowSource,
        W: Write,
    {
        match &self.mode {
            WriteMode::Bulk => write_table_in_bulk(&self.select_sql, writer, source).await,
            WriteMode::Batched { row_count_sql } => {
                write_table_in_batches(
                    &self.select_sql,
                    writer,
                    source,
                    row_count_sql,
                    batch_size,
                    on_batch,
                )
                .await
            }
        }
    }
}

/// Check a set of serializers before running them
///
/// Names must be unique (they become file names) and both names and table
/// names must be plain identifiers.
pub fn validate_registry(serializers: &[TableSerializer]) -> Result<()> {
    let mut seen = HashSet::new();
    for serializer in serializers {
        validate_identifier(&serializer.name)
            .map_err(|e| e.context(format!("Invalid serializer name '{}'", serializer.name)))?;
        validate_identifier(&serializer.table).map_err(|e| {
            e.context(format!(
                "Invalid table name for serializer '{}'",
                serializer.name
            ))
        })?;
        if serializer.select_sql.trim().is_empty() {
            bail!("Serializer '{}' has an empty query", serializer.name);
        }
        if !seen.insert(serializer.name.to_lowercase()) {
            bail!("Duplicate serializer name '{}'", serializer.name);
        }
    }
    Ok(())
}
