// ABOUTME: SQLite query execution for table export
// ABOUTME: Runs serializer SQL and count queries, returning rows as ordered JSON objects

use crate::database::JsonRow;
use anyhow::{bail, Context, Result};
use rusqlite::Connection;

/// Run a SELECT and return every row as an ordered JSON object
///
/// Column order follows the SELECT list. Each value is converted with
/// [`sqlite_value_to_json`](super::converter::sqlite_value_to_json).
///
/// # Examples
///
/// ```no_run
/// # use fam_db_migrator::sqlite::{open_sqlite, reader::query_rows};
/// # fn example() -> anyhow::Result<()> {
/// let conn = open_sqlite("fam.sqlite")?;
/// let rows = query_rows(&conn, "SELECT \"TagName\" FROM \"Tag\" ORDER BY \"TagName\"")?;
/// println!("Read {} rows", rows.len());
/// # Ok(())
/// # }
/// ```
pub fn query_rows(conn: &Connection, sql: &str) -> Result<Vec<JsonRow>> {
    let mut stmt = conn
        .prepare(sql)
        .context("Failed to prepare SQLite statement")?;

    let column_names: Vec<String> = stmt.column_names().iter().map(|s| s.to_string()).collect();

    let rows = stmt
        .query_map([], |row| {
            let mut values = Vec::with_capacity(column_names.len());
            for idx in 0..column_names.len() {
                values.push(row.get::<_, rusqlite::types::Value>(idx)?);
            }
            Ok(values)
        })
        .context("Failed to execute SQLite query")?
        .collect::<Result<Vec<_>, _>>()
        .context("Failed to read SQLite rows")?;

    let mut result = Vec::with_capacity(rows.len());
    for values in rows {
        let mut row = JsonRow::new();
        for (name, value) in column_names.iter().zip(values.iter()) {
            let json = super::converter::sqlite_value_to_json(value)
                .with_context(|| format!("Failed to convert column '{}' to JSON", name))?;
            row.insert(name.clone(), json);
        }
        result.push(row);
    }

    Ok(result)
}

/// Run a row count query and return its single integer result
pub fn query_count(conn: &Connection, sql: &str) -> Result<u64> {
    let count: i64 = conn
        .query_row(sql, [], |row| row.get(0))
        .context("Failed to execute SQLite count query")?;

    if count < 0 {
        bail!("Row count query returned a negative count ({})", count);
    }

    Ok(count as u64)
}
