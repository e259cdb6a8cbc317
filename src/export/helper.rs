// ABOUTME: Writes a single table's query result as JSON, in one shot or in paged batches
// ABOUTME: Failures carry a tracking code plus the failing SQL and redacted connection string

use crate::database::{JsonRow, RowSource};
use crate::errors::{
    TrackResult, TrackedError, EXPORT_BATCH_FAILED, EXPORT_COUNT_FAILED, EXPORT_QUERY_FAILED,
    EXPORT_WRITE_FAILED,
};
use anyhow::{bail, Result};
use std::io::Write;

/// Outcome of writing one table
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TableWriteSummary {
    pub rows: u64,
    /// JSON documents written
    pub batches: u64,
}

/// One page of a batched export
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BatchRange {
    pub offset: u64,
    pub limit: u64,
}

/// Plan the pages covering `[0, row_count)` without gaps or overlap
///
/// Produces `ceil(row_count / batch_size)` ranges; the last one may be
/// shorter than `batch_size`.
///
/// ```
/// # use fam_db_migrator::export::helper::batch_ranges;
/// let ranges = batch_ranges(25, 10).unwrap();
/// assert_eq!(ranges.len(), 3);
/// assert_eq!((ranges[2].offset, ranges[2].limit), (20, 5));
/// assert!(batch_ranges(0, 10).unwrap().is_empty());
/// ```
pub fn batch_ranges(row_count: u64, batch_size: u64) -> Result<Vec<BatchRange>> {
    if batch_size == 0 {
        bail!("Batch size must be greater than zero");
    }

    let mut ranges = Vec::with_capacity(row_count.div_ceil(batch_size) as usize);
    let mut offset = 0;
    while offset < row_count {
        let limit = batch_size.min(row_count - offset);
        ranges.push(BatchRange { offset, limit });
        offset += limit;
    }
    Ok(ranges)
}

/// Whether a query contains an ORDER BY clause (case-insensitive)
fn has_order_by(sql: &str) -> bool {
    sql.split_whitespace()
        .collect::<Vec<_>>()
        .windows(2)
        .any(|w| w[0].eq_ignore_ascii_case("order") && w[1].eq_ignore_ascii_case("by"))
}

fn write_document<W: Write>(writer: &mut W, rows: &[JsonRow]) -> std::io::Result<()> {
    serde_json::to_writer(&mut *writer, rows)?;
    writer.write_all(b"\n")
}

/// Execute a query, load the entire result, and write it as one JSON array
///
/// An empty result is written as `[]`. No retry is attempted; any failure
/// aborts the table.
pub async fn write_table_in_bulk<S, W>(sql: &str, writer: &mut W, source: &mut S) -> Result<TableWriteSummary>
where
    S: RowSource,
    W: Write,
{
    let rows = source.query_rows(sql).await.track(|| {
        TrackedError::new(EXPORT_QUERY_FAILED, "Failed to query table for export")
            .with_debug("sql", sql)
            .with_debug("connection", source.describe())
    })?;

    write_document(writer, &rows).track(|| {
        TrackedError::new(EXPORT_WRITE_FAILED, "Failed to write exported rows")
            .with_debug("rows", rows.len())
    })?;

    tracing::debug!("Wrote {} rows in one document", rows.len());

    Ok(TableWriteSummary {
        rows: rows.len() as u64,
        batches: 1,
    })
}

/// Page through an ordered query and write each page as its own JSON array
///
/// The total is read with `row_count_sql` first. A count of zero writes
/// nothing and never issues a paged SELECT. Otherwise pages of
/// `batch_size` rows are fetched with the source's dialect and each is
/// written as one line. `on_batch(rows_done, rows_total)` is called after
/// every page.
///
/// Paging is only deterministic when `order_by_sql` has a stable ORDER BY;
/// a query without one is exported with a warning. Pages are not isolated
/// from concurrent writes to the source table.
pub async fn write_table_in_batches<S, W>(
    order_by_sql: &str,
    writer: &mut W,
    source: &mut S,
    row_count_sql: &str,
    batch_size: u64,
    mut on_batch: impl FnMut(u64, u64),
) -> Result<TableWriteSummary>
where
    S: RowSource,
    W: Write,
{
    let row_count = source.query_count(row_count_sql).await.track(|| {
        TrackedError::new(EXPORT_COUNT_FAILED, "Failed to count rows for batched export")
            .with_debug("sql", row_count_sql)
            .with_debug("connection", source.describe())
    })?;

    let ranges = batch_ranges(row_count, batch_size)?;
    if ranges.is_empty() {
        tracing::debug!("Row count is 0, nothing to page");
        return Ok(TableWriteSummary::default());
    }

    if !has_order_by(order_by_sql) {
        tracing::warn!(
            "Query has no ORDER BY; batch contents are undefined: {}",
            order_by_sql
        );
    }

    let dialect = source.dialect();
    let mut summary = TableWriteSummary::default();

    for range in ranges {
        let paged_sql = dialect.paginate(order_by_sql, range.offset, range.limit);
        let rows = source.query_rows(&paged_sql).await.track(|| {
            TrackedError::new(EXPORT_BATCH_FAILED, "Failed to read batch for export")
                .with_debug("sql", &paged_sql)
                .with_debug("offset", range.offset)
                .with_debug("limit", range.limit)
                .with_debug("connection", source.describe())
        })?;

        if rows.len() as u64 != range.limit {
            tracing::warn!(
                "Batch at offset {} returned {} rows, expected {}; table changed during export?",
                range.offset,
                rows.len(),
                range.limit
            );
        }

        write_document(writer, &rows).track(|| {
            TrackedError::new(EXPORT_WRITE_FAILED, "Failed to write exported batch")
                .with_debug("offset", range.offset)
        })?;

        summary.rows += rows.len() as u64;
        summary.batches += 1;
        on_batch(summary.rows, row_count);
    }

    Ok(summary)
}
