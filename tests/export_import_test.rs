// ABOUTME: Integration tests for the export/import workflow
// ABOUTME: Exports real SQLite files to a directory and imports them back into a fresh database

use fam_db_migrator::database::DatabaseUrl;
use fam_db_migrator::errors::{TrackedError, IMPORT_FILE_MISMATCH, IMPORT_INSERT_FAILED};
use fam_db_migrator::export::{export_database, ExportOptions};
use fam_db_migrator::filters::TableFilter;
use fam_db_migrator::import::{import_database, read_table_file, ImportOptions};
use fam_db_migrator::manifest::ExportManifest;
use fam_db_migrator::progress::{ProgressEvent, ProgressSink};
use fam_db_migrator::serializers::{TableGroup, TableSerializer};
use rusqlite::Connection;
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

const SCHEMA: &str = "
    CREATE TABLE \"Workflow\" (
        \"ID\" INTEGER PRIMARY KEY,
        \"Name\" TEXT NOT NULL UNIQUE,
        \"LoadBalanceWeight\" REAL,
        \"CreatedDate\" TEXT,
        \"Icon\" BLOB
    );
    CREATE TABLE \"WorkflowFile\" (
        \"WorkflowID\" INTEGER NOT NULL REFERENCES \"Workflow\"(\"ID\"),
        \"FileID\" INTEGER NOT NULL,
        \"Priority\" INTEGER,
        PRIMARY KEY (\"WorkflowID\", \"FileID\")
    );
    CREATE TABLE \"Holiday\" (
        \"Date\" TEXT PRIMARY KEY,
        \"Description\" TEXT
    );
";

fn create_db(path: &Path) {
    let conn = Connection::open(path).unwrap();
    conn.execute_batch(SCHEMA).unwrap();
}

/// Source database with 3 workflows, 25 workflow files, and no holidays
fn create_source(dir: &Path) -> PathBuf {
    let path = dir.join("source.sqlite");
    create_db(&path);
    let conn = Connection::open(&path).unwrap();
    conn.execute_batch(
        "
        INSERT INTO \"Workflow\" VALUES
            (1, 'Indexing', 1.5, '2024-01-31 08:00:00', X'89504E47'),
            (2, 'Redaction', NULL, '2024-02-29 17:30:00', NULL),
            (3, 'Verify ''quotes''', 0.25, NULL, X'');
    ",
    )
    .unwrap();
    for i in 0..25 {
        conn.execute(
            "INSERT INTO \"WorkflowFile\" VALUES (?1, ?2, ?3)",
            rusqlite::params![1 + i % 3, 100 + i, if i % 5 == 0 { None } else { Some(i) }],
        )
        .unwrap();
    }
    path
}

fn serializers() -> Vec<TableSerializer> {
    vec![
        TableSerializer::bulk(
            "Workflow",
            TableGroup::Core,
            "Workflow",
            "SELECT * FROM \"Workflow\" ORDER BY \"ID\"",
        ),
        TableSerializer::batched(
            "WorkflowFile",
            TableGroup::Core,
            "WorkflowFile",
            "SELECT * FROM \"WorkflowFile\" ORDER BY \"WorkflowID\", \"FileID\"",
            "SELECT COUNT(*) FROM \"WorkflowFile\"",
        ),
        TableSerializer::batched(
            "Holiday",
            TableGroup::Custom,
            "Holiday",
            "SELECT * FROM \"Holiday\" ORDER BY \"Date\"",
            "SELECT COUNT(*) FROM \"Holiday\"",
        ),
    ]
}

fn url(path: &Path) -> DatabaseUrl {
    DatabaseUrl::parse(path.to_str().unwrap()).unwrap()
}

/// Export the source into `<dir>/export` with batch size 10
async fn export(dir: &TempDir, source: &Path) -> PathBuf {
    let out = dir.path().join("export");
    let mut options = ExportOptions::new(url(source), &out);
    options.batch_size = 10;
    export_database(&options, &serializers(), &ProgressSink::disabled())
        .await
        .unwrap();
    out
}

fn dump(path: &Path, sql: &str) -> Vec<Vec<rusqlite::types::Value>> {
    let conn = Connection::open(path).unwrap();
    let mut stmt = conn.prepare(sql).unwrap();
    let columns = stmt.column_count();
    stmt.query_map([], |row| {
        (0..columns)
            .map(|i| row.get::<_, rusqlite::types::Value>(i))
            .collect::<rusqlite::Result<Vec<_>>>()
    })
    .unwrap()
    .collect::<rusqlite::Result<Vec<_>>>()
    .unwrap()
}

#[tokio::test]
async fn test_export_file_layout() {
    let dir = TempDir::new().unwrap();
    let source = create_source(dir.path());
    let out = export(&dir, &source).await;

    // 25 rows at batch size 10: three documents of 10, 10 and 5 rows
    let batches = read_table_file(&out.join("WorkflowFile.json")).unwrap();
    let sizes: Vec<usize> = batches.iter().map(|b| b.len()).collect();
    assert_eq!(sizes, vec![10, 10, 5]);

    // Concatenated batches follow the ORDER BY with no gaps or repeats
    let keys: Vec<(i64, i64)> = batches
        .iter()
        .flatten()
        .map(|row| {
            (
                row["WorkflowID"].as_i64().unwrap(),
                row["FileID"].as_i64().unwrap(),
            )
        })
        .collect();
    let mut sorted = keys.clone();
    sorted.sort();
    sorted.dedup();
    assert_eq!(keys, sorted);
    assert_eq!(keys.len(), 25);

    // Bulk table: a single document with columns in SELECT order
    let workflow = fs::read_to_string(out.join("Workflow.json")).unwrap();
    assert_eq!(workflow.lines().count(), 1);
    assert!(workflow.starts_with("[{\"ID\":1,\"Name\":\"Indexing\""));
    assert!(workflow.contains("{\"_type\":\"blob\",\"data\":\"iVBORw==\"}"));

    // Empty batched table: file exists with no documents
    assert_eq!(fs::read_to_string(out.join("Holiday.json")).unwrap(), "");

    let manifest = ExportManifest::load(&out).unwrap();
    let names: Vec<&str> = manifest.tables.iter().map(|t| t.name.as_str()).collect();
    assert_eq!(names, vec!["Workflow", "WorkflowFile", "Holiday"]);
    assert_eq!(manifest.table("WorkflowFile").unwrap().batches, 3);
    assert_eq!(manifest.table("Holiday").unwrap().batches, 0);
    assert_eq!(manifest.total_rows(), 28);
}

#[tokio::test]
async fn test_roundtrip_into_fresh_database() {
    let dir = TempDir::new().unwrap();
    let source = create_source(dir.path());
    let out = export(&dir, &source).await;

    let target = dir.path().join("target.sqlite");
    create_db(&target);

    let mut options = ImportOptions::new(url(&target), &out);
    options.batch_size = 7;
    let (sink, mut events) = ProgressSink::channel();
    let summary = import_database(&options, &sink).await.unwrap();
    assert_eq!(summary.tables, 3);
    assert_eq!(summary.rows, 28);

    for sql in [
        "SELECT * FROM \"Workflow\" ORDER BY \"ID\"",
        "SELECT * FROM \"WorkflowFile\" ORDER BY \"WorkflowID\", \"FileID\"",
        "SELECT * FROM \"Holiday\"",
    ] {
        assert_eq!(dump(&source, sql), dump(&target, sql), "mismatch for {}", sql);
    }

    let mut started = Vec::new();
    while let Ok(event) = events.try_recv() {
        if let ProgressEvent::TableStarted { name, .. } = event {
            started.push(name);
        }
    }
    assert_eq!(started, vec!["Workflow", "WorkflowFile", "Holiday"]);
}

#[tokio::test]
async fn test_clear_existing_replaces_rows() {
    let dir = TempDir::new().unwrap();
    let source = create_source(dir.path());
    let out = export(&dir, &source).await;

    let target = dir.path().join("target.sqlite");
    create_db(&target);
    {
        let conn = Connection::open(&target).unwrap();
        conn.execute_batch(
            "INSERT INTO \"Workflow\" (\"ID\", \"Name\") VALUES (9, 'Stale');
             INSERT INTO \"WorkflowFile\" VALUES (9, 1, NULL);
             INSERT INTO \"Holiday\" VALUES ('2024-12-25', 'Christmas');",
        )
        .unwrap();
    }

    // Stale rows do not collide with the export, so only clearing removes them
    let mut options = ImportOptions::new(url(&target), &out);
    options.clear_existing = true;
    import_database(&options, &ProgressSink::disabled())
        .await
        .unwrap();

    assert_eq!(
        dump(&target, "SELECT COUNT(*) FROM \"Workflow\" WHERE \"ID\" = 9"),
        vec![vec![rusqlite::types::Value::Integer(0)]]
    );
    assert_eq!(
        dump(&target, "SELECT COUNT(*) FROM \"Holiday\""),
        vec![vec![rusqlite::types::Value::Integer(0)]]
    );
    assert_eq!(
        dump(&target, "SELECT COUNT(*) FROM \"WorkflowFile\""),
        vec![vec![rusqlite::types::Value::Integer(25)]]
    );
}

#[tokio::test]
async fn test_failed_table_is_rolled_back() {
    let dir = TempDir::new().unwrap();
    let source = create_source(dir.path());
    let out = export(&dir, &source).await;

    let target = dir.path().join("target.sqlite");
    create_db(&target);
    {
        // Row 3 of WorkflowFile's sort order collides with this one
        let conn = Connection::open(&target).unwrap();
        conn.execute("INSERT INTO \"WorkflowFile\" VALUES (1, 106, NULL)", [])
            .unwrap();
    }

    let mut options = ImportOptions::new(url(&target), &out);
    options.batch_size = 2;
    let err = import_database(&options, &ProgressSink::disabled())
        .await
        .unwrap_err();

    let tracked = TrackedError::find(&err).expect("tracked error");
    assert_eq!(tracked.code(), IMPORT_INSERT_FAILED);
    assert_eq!(tracked.debug_value("table"), Some("WorkflowFile"));

    // Workflow committed before the failure; WorkflowFile kept only the pre-existing row
    assert_eq!(
        dump(&target, "SELECT COUNT(*) FROM \"Workflow\""),
        vec![vec![rusqlite::types::Value::Integer(3)]]
    );
    assert_eq!(
        dump(&target, "SELECT COUNT(*) FROM \"WorkflowFile\""),
        vec![vec![rusqlite::types::Value::Integer(1)]]
    );
}

#[tokio::test]
async fn test_row_count_mismatch_rolls_back_table() {
    let dir = TempDir::new().unwrap();
    let source = create_source(dir.path());
    let out = export(&dir, &source).await;

    // File and checksum stay intact; only the recorded count is wrong
    let mut manifest = ExportManifest::load(&out).unwrap();
    for entry in manifest.tables.iter_mut() {
        if entry.name == "WorkflowFile" {
            entry.rows = 30;
        }
    }
    manifest.save(&out).unwrap();

    let target = dir.path().join("target.sqlite");
    create_db(&target);

    let mut options = ImportOptions::new(url(&target), &out);
    options.batch_size = 4;
    let err = import_database(&options, &ProgressSink::disabled())
        .await
        .unwrap_err();

    let tracked = TrackedError::find(&err).expect("tracked error");
    assert_eq!(tracked.code(), IMPORT_FILE_MISMATCH);
    assert_eq!(tracked.debug_value("expected"), Some("30"));
    assert_eq!(tracked.debug_value("actual"), Some("25"));

    // Chunks inserted before the count check were rolled back
    assert_eq!(
        dump(&target, "SELECT COUNT(*) FROM \"Workflow\""),
        vec![vec![rusqlite::types::Value::Integer(3)]]
    );
    assert_eq!(
        dump(&target, "SELECT COUNT(*) FROM \"WorkflowFile\""),
        vec![vec![rusqlite::types::Value::Integer(0)]]
    );
}

#[tokio::test]
async fn test_manifest_entry_cannot_point_outside_export() {
    let dir = TempDir::new().unwrap();
    let source = create_source(dir.path());
    let out = export(&dir, &source).await;

    let outside = dir.path().join("Holiday.json");
    fs::copy(out.join("Holiday.json"), &outside).unwrap();
    let mut manifest = ExportManifest::load(&out).unwrap();
    for entry in manifest.tables.iter_mut() {
        if entry.name == "Holiday" {
            entry.file = "../Holiday.json".to_string();
        }
    }
    manifest.save(&out).unwrap();

    let target = dir.path().join("target.sqlite");
    create_db(&target);

    let err = import_database(&ImportOptions::new(url(&target), &out), &ProgressSink::disabled())
        .await
        .unwrap_err();
    let tracked = TrackedError::find(&err).expect("tracked error");
    assert_eq!(tracked.code(), IMPORT_FILE_MISMATCH);
    assert_eq!(tracked.debug_value("file"), Some("../Holiday.json"));
    assert_eq!(
        dump(&target, "SELECT COUNT(*) FROM \"Workflow\""),
        vec![vec![rusqlite::types::Value::Integer(0)]]
    );
}

#[tokio::test]
async fn test_filtered_tables_are_skipped() {
    let dir = TempDir::new().unwrap();
    let source = create_source(dir.path());
    let out = export(&dir, &source).await;

    let target = dir.path().join("target.sqlite");
    create_db(&target);

    let mut options = ImportOptions::new(url(&target), &out);
    options.filter = TableFilter::new(None, Some(vec!["workflowfile".to_string()]), None, None).unwrap();
    let summary = import_database(&options, &ProgressSink::disabled())
        .await
        .unwrap();

    assert_eq!(summary.tables, 2);
    assert_eq!(summary.skipped, vec!["WorkflowFile".to_string()]);
    assert_eq!(
        dump(&target, "SELECT COUNT(*) FROM \"WorkflowFile\""),
        vec![vec![rusqlite::types::Value::Integer(0)]]
    );
}

#[tokio::test]
async fn test_tampered_file_blocks_import() {
    let dir = TempDir::new().unwrap();
    let source = create_source(dir.path());
    let out = export(&dir, &source).await;

    fs::write(out.join("Holiday.json"), "[{\"Date\":\"2024-07-04\",\"Description\":\"x\"}]\n").unwrap();

    let target = dir.path().join("target.sqlite");
    create_db(&target);

    let err = import_database(&ImportOptions::new(url(&target), &out), &ProgressSink::disabled())
        .await
        .unwrap_err();
    assert_eq!(
        TrackedError::find(&err).map(|t| t.code()),
        Some(IMPORT_FILE_MISMATCH)
    );

    // Nothing was imported, not even the untouched tables
    assert_eq!(
        dump(&target, "SELECT COUNT(*) FROM \"Workflow\""),
        vec![vec![rusqlite::types::Value::Integer(0)]]
    );
}

#[tokio::test]
async fn test_import_without_manifest_fails() {
    let dir = TempDir::new().unwrap();
    let target = dir.path().join("target.sqlite");
    create_db(&target);

    let result = import_database(
        &ImportOptions::new(url(&target), dir.path().join("nowhere")),
        &ProgressSink::disabled(),
    )
    .await;
    assert!(result.is_err());
}
