// ABOUTME: PostgreSQL query execution for table export
// ABOUTME: Converts rows to ordered JSON objects server-side with row_to_json

use crate::database::JsonRow;
use anyhow::{bail, Context, Result};
use serde_json::Value as JsonValue;
use tokio_postgres::Client;

/// Wrap a SELECT so that each result row comes back as one JSON object
///
/// PostgreSQL renders every column with its own text formatting (ISO dates,
/// exact numerics, `\x` hex for bytea), so the JSON matches what the server
/// would accept back on import. Rows are numbered as they leave the inner
/// query and the outer query orders by that number, so the inner `ORDER BY`
/// is what decides row order. The inner query sits on its own lines so a
/// trailing `--` comment ends there.
pub fn wrap_row_to_json(sql: &str) -> String {
    format!(
        "SELECT q.j FROM (SELECT row_to_json(s) AS j, row_number() OVER () AS n FROM (\n{}\n) AS s) AS q ORDER BY q.n",
        sql.trim().trim_end_matches(';').trim_end()
    )
}

/// Run a SELECT and return every row as an ordered JSON object
pub async fn query_rows(client: &Client, sql: &str) -> Result<Vec<JsonRow>> {
    let wrapped = wrap_row_to_json(sql);

    let rows = client
        .query(wrapped.as_str(), &[])
        .await
        .context("Failed to execute PostgreSQL query")?;

    let mut result = Vec::with_capacity(rows.len());
    for (idx, row) in rows.iter().enumerate() {
        let value: JsonValue = row
            .try_get(0)
            .with_context(|| format!("Failed to decode row {} as JSON", idx + 1))?;
        match value {
            JsonValue::Object(map) => result.push(map),
            other => bail!("row_to_json returned a non-object value: {}", other),
        }
    }

    Ok(result)
}

/// Run a row count query and return its single integer result
///
/// Accepts both `bigint` (what `COUNT(*)` returns) and `integer` results.
pub async fn query_count(client: &Client, sql: &str) -> Result<u64> {
    let row = client
        .query_one(sql, &[])
        .await
        .context("Failed to execute PostgreSQL count query")?;

    let count = match row.try_get::<_, i64>(0) {
        Ok(count) => count,
        Err(_) => i64::from(
            row.try_get::<_, i32>(0)
                .context("Row count query must return a single integer column")?,
        ),
    };

    if count < 0 {
        bail!("Row count query returned a negative count ({})", count);
    }

    Ok(count as u64)
}
