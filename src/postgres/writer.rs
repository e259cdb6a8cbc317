// ABOUTME: Write exported rows back into PostgreSQL tables
// ABOUTME: Handles table clearing and batch inserts through json_populate_recordset

use crate::database::JsonRow;
use crate::utils::{quote_ident, validate_identifier};
use anyhow::{Context, Result};
use serde_json::Value as JsonValue;
use tokio_postgres::Client;

/// Delete every row of a table
///
/// `DELETE` rather than `TRUNCATE`, so foreign keys from tables that are
/// cleared later in the same run do not block it.
pub async fn clear_table(client: &Client, table: &str) -> Result<u64> {
    validate_identifier(table).context("Invalid table name for clear")?;

    let sql = format!("DELETE FROM {}", quote_ident(table));
    let deleted = client
        .execute(sql.as_str(), &[])
        .await
        .with_context(|| format!("Failed to clear PostgreSQL table '{}'", table))?;

    tracing::debug!("Deleted {} rows from '{}'", deleted, table);

    Ok(deleted)
}

/// Build the batch insert statement for a set of columns
///
/// The rows travel as one JSON array parameter; the server converts every
/// field to the destination column type, which keeps dates and numerics
/// exactly as they were exported.
pub fn build_insert_sql(table: &str, columns: &[String]) -> Result<String> {
    validate_identifier(table).context("Invalid table name for insert")?;
    for column in columns {
        validate_identifier(column).context("Invalid column name for insert")?;
    }

    let column_list = columns
        .iter()
        .map(|c| quote_ident(c))
        .collect::<Vec<_>>()
        .join(", ");

    Ok(format!(
        "INSERT INTO {table} ({cols}) SELECT {cols} FROM json_populate_recordset(NULL::{table}, $1::json)",
        table = quote_ident(table),
        cols = column_list
    ))
}

/// Insert a batch of rows with a single statement
///
/// The column list is taken from the first row; rows exported by one query
/// share the same columns.
pub async fn insert_rows(client: &Client, table: &str, rows: &[JsonRow]) -> Result<u64> {
    let Some(first) = rows.first() else {
        return Ok(0);
    };

    let columns: Vec<String> = first.keys().cloned().collect();
    let sql = build_insert_sql(table, &columns)?;

    let payload = JsonValue::Array(rows.iter().cloned().map(JsonValue::Object).collect());

    let inserted = client
        .execute(sql.as_str(), &[&payload])
        .await
        .with_context(|| format!("Failed to insert {} rows into '{}'", rows.len(), table))?;

    Ok(inserted)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_build_insert_sql() {
        let sql = build_insert_sql("Tag", &["TagName".to_string(), "TagDescription".to_string()])
            .unwrap();
        assert_eq!(
            sql,
            "INSERT INTO \"Tag\" (\"TagName\", \"TagDescription\") SELECT \"TagName\", \"TagDescription\" \
             FROM json_populate_recordset(NULL::\"Tag\", $1::json)"
        );
    }

    #[test]
    fn test_build_insert_sql_rejects_injection() {
        assert!(build_insert_sql("Tag\"; DROP TABLE x; --", &[]).is_err());
        assert!(build_insert_sql("Tag", &["a) VALUES (1); --".to_string()]).is_err());
    }

    // NOTE: This test requires a real PostgreSQL instance
    #[tokio::test]
    #[ignore]
    async fn test_insert_rows_and_clear() {
        let url = std::env::var("TEST_DATABASE_URL")
            .expect("TEST_DATABASE_URL must be set for integration tests");
        let client = crate::postgres::connect(&url).await.unwrap();

        client
            .batch_execute(
                "DROP TABLE IF EXISTS \"WriterTest\";
                 CREATE TABLE \"WriterTest\" (\"Name\" TEXT, \"Created\" TIMESTAMP, \"Count\" INTEGER);",
            )
            .await
            .unwrap();

        let rows: Vec<JsonRow> = vec![
            serde_json::json!({"Name": "a", "Created": "2020-01-02T03:04:05", "Count": 1}),
            serde_json::json!({"Name": "b", "Created": null, "Count": 2}),
        ]
        .into_iter()
        .map(|v| v.as_object().unwrap().clone())
        .collect();

        assert_eq!(insert_rows(&client, "WriterTest", &rows).await.unwrap(), 2);
        assert_eq!(clear_table(&client, "WriterTest").await.unwrap(), 2);

        client
            .batch_execute("DROP TABLE \"WriterTest\"")
            .await
            .unwrap();
    }
}
