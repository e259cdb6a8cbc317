// ABOUTME: Write exported rows back into SQLite tables
// ABOUTME: Handles table clearing and parameterized row inserts

use crate::database::JsonRow;
use crate::utils::{quote_ident, validate_identifier};
use anyhow::{Context, Result};
use rusqlite::Connection;

/// Delete every row of a table
///
/// # Security
///
/// The table name is validated before it is interpolated into SQL.
pub fn clear_table(conn: &Connection, table: &str) -> Result<usize> {
    validate_identifier(table).context("Invalid table name for clear")?;

    let sql = format!("DELETE FROM {}", quote_ident(table));
    let deleted = conn
        .execute(&sql, [])
        .with_context(|| format!("Failed to clear SQLite table '{}'", table))?;

    tracing::debug!("Deleted {} rows from '{}'", deleted, table);

    Ok(deleted)
}

/// Insert rows into a table, one parameterized statement per row
///
/// Column names come from each row's keys and are validated. Rows with
/// identical column lists reuse the cached prepared statement.
pub fn insert_rows(conn: &Connection, table: &str, rows: &[JsonRow]) -> Result<usize> {
    validate_identifier(table).context("Invalid table name for insert")?;

    for (idx, row) in rows.iter().enumerate() {
        let mut columns = Vec::with_capacity(row.len());
        let mut values = Vec::with_capacity(row.len());
        for (column, value) in row {
            validate_identifier(column)
                .with_context(|| format!("Invalid column name in row {}", idx + 1))?;
            columns.push(quote_ident(column));
            values.push(
                super::converter::json_to_sqlite_value(value)
                    .with_context(|| format!("Invalid value for column '{}'", column))?,
            );
        }

        let sql = if columns.is_empty() {
            format!("INSERT INTO {} DEFAULT VALUES", quote_ident(table))
        } else {
            let placeholders: Vec<String> = (1..=columns.len()).map(|i| format!("?{}", i)).collect();
            format!(
                "INSERT INTO {} ({}) VALUES ({})",
                quote_ident(table),
                columns.join(", "),
                placeholders.join(", ")
            )
        };

        let mut stmt = conn
            .prepare_cached(&sql)
            .with_context(|| format!("Failed to prepare insert into '{}'", table))?;
        stmt.execute(rusqlite::params_from_iter(values.iter()))
            .with_context(|| format!("Failed to insert row {} into '{}'", idx + 1, table))?;
    }

    Ok(rows.len())
}
