//! Integration tests for the Register Store lifecycle
//!
//! Covers open/append/save/close semantics, blank-row skipping, the optional
//! Milestones sheet and refusal to touch registers that were never provisioned.

use riskreg_common::register::{next_task_id, CellValue, ProjectRegistry, RegisterStore, Sheet};
use riskreg_common::Error;
use sqlx::{ConnectOptions, Connection};
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode};
use std::path::Path;

async fn provisioned(dir: &Path, code: &str) -> ProjectRegistry {
    let registry = ProjectRegistry::new(dir);
    registry.provision(code).await.expect("Should provision register");
    registry
}

/// Run raw SQL against a register outside the store (simulates manual edits)
async fn raw_execute(path: &Path, sql: &str) {
    let mut conn = SqliteConnectOptions::new()
        .filename(path)
        .journal_mode(SqliteJournalMode::Delete)
        .connect()
        .await
        .unwrap();
    sqlx::query(sql).execute(&mut conn).await.unwrap();
    conn.close().await.unwrap();
}

fn task_values(id: &str, text: &str) -> Vec<(&'static str, CellValue)> {
    vec![
        ("Task ID", CellValue::from(id)),
        ("Task", CellValue::from(text)),
        ("Owner", CellValue::from("TBD")),
        ("Status", CellValue::from("Open")),
    ]
}

#[tokio::test]
async fn test_open_missing_register_fails() {
    let dir = tempfile::tempdir().unwrap();
    let registry = ProjectRegistry::new(dir.path());

    let result = registry.open("HB").await;
    assert!(matches!(result, Err(Error::RegisterNotFound(_))));
    assert!(!registry.register_dir().exists(), "Open must never create files");
}

#[tokio::test]
async fn test_saved_rows_are_visible_after_reopen() {
    let dir = tempfile::tempdir().unwrap();
    let registry = provisioned(dir.path(), "HB").await;

    let mut handle = registry.open("HB").await.unwrap();
    handle.append_row(Sheet::Tasks, &task_values("T-001", "Fix inverter wiring")).await.unwrap();
    handle.append_row(Sheet::Tasks, &task_values("T-002", "Call utility")).await.unwrap();
    handle.save().await.unwrap();

    let mut reader = registry.open_read_only("HB").await.unwrap();
    let rows = reader.rows(Sheet::Tasks).await.unwrap();
    assert_eq!(rows.len(), 2);
    assert_eq!(rows[0].text("Task ID").as_deref(), Some("T-001"));
    assert_eq!(rows[0].text("Task").as_deref(), Some("Fix inverter wiring"));
    assert_eq!(rows[1].text("Task ID").as_deref(), Some("T-002"));
    assert_eq!(rows[1].text("Completed Date"), None);
    reader.close().await.unwrap();
}

#[tokio::test]
async fn test_close_without_save_discards_rows() {
    let dir = tempfile::tempdir().unwrap();
    let registry = provisioned(dir.path(), "HB").await;

    let mut handle = registry.open("HB").await.unwrap();
    handle.append_row(Sheet::Tasks, &task_values("T-001", "Draft")).await.unwrap();
    handle.close().await.unwrap();

    let mut reader = registry.open_read_only("HB").await.unwrap();
    assert!(reader.rows(Sheet::Tasks).await.unwrap().is_empty());
}

#[tokio::test]
async fn test_dropped_handle_discards_rows() {
    let dir = tempfile::tempdir().unwrap();
    let registry = provisioned(dir.path(), "HB").await;

    {
        let mut handle = registry.open("HB").await.unwrap();
        handle.append_row(Sheet::Tasks, &task_values("T-001", "Draft")).await.unwrap();
    }

    let mut reader = registry.open_read_only("HB").await.unwrap();
    assert!(reader.rows(Sheet::Tasks).await.unwrap().is_empty());
}

#[tokio::test]
async fn test_appends_visible_inside_open_handle() {
    let dir = tempfile::tempdir().unwrap();
    let registry = provisioned(dir.path(), "HB").await;

    let mut handle = registry.open("HB").await.unwrap();
    for _ in 0..3 {
        let keys = handle.key_column(Sheet::Tasks).await.unwrap();
        let id = next_task_id(keys.iter().map(String::as_str));
        handle.append_row(Sheet::Tasks, &task_values(&id, "Item")).await.unwrap();
    }
    let keys = handle.key_column(Sheet::Tasks).await.unwrap();
    assert_eq!(keys, vec!["T-001", "T-002", "T-003"]);
    handle.save().await.unwrap();
}

#[tokio::test]
async fn test_rows_skip_blank_primary_keys() {
    let dir = tempfile::tempdir().unwrap();
    let registry = provisioned(dir.path(), "HB").await;
    let path = registry.locate("HB").unwrap();

    raw_execute(&path, "INSERT INTO tasks (task_id, task) VALUES ('T-001', 'Real')").await;
    raw_execute(&path, "INSERT INTO tasks (task_id, task) VALUES (NULL, 'Reserved')").await;
    raw_execute(&path, "INSERT INTO tasks (task_id, task) VALUES ('   ', 'Blank')").await;

    let mut reader = RegisterStore::open_read_only(&path).await.unwrap();
    let rows = reader.rows(Sheet::Tasks).await.unwrap();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].text("Task").as_deref(), Some("Real"));
    assert_eq!(reader.key_column(Sheet::Tasks).await.unwrap(), vec!["T-001"]);
}

#[tokio::test]
async fn test_integer_cells_round_trip_as_numbers() {
    let dir = tempfile::tempdir().unwrap();
    let registry = provisioned(dir.path(), "HB").await;

    let mut handle = registry.open("HB").await.unwrap();
    handle
        .append_row(
            Sheet::RiskRegister,
            &[
                ("Risk ID", CellValue::from("R-2025-001")),
                ("Risk Score", CellValue::from(9_i64)),
                ("Closed Date", CellValue::Empty),
            ],
        )
        .await
        .unwrap();
    handle.save().await.unwrap();

    let mut reader = registry.open_read_only("HB").await.unwrap();
    let rows = reader.rows(Sheet::RiskRegister).await.unwrap();
    assert_eq!(rows[0].get("Risk Score"), Some(&serde_json::json!(9)));
    assert_eq!(rows[0].get("Closed Date"), Some(&serde_json::Value::Null));
}

#[tokio::test]
async fn test_append_rejects_unknown_column_and_milestones() {
    let dir = tempfile::tempdir().unwrap();
    let registry = provisioned(dir.path(), "HB").await;

    let mut handle = registry.open("HB").await.unwrap();
    let unknown = handle
        .append_row(Sheet::Tasks, &[("Priority", CellValue::from("High"))])
        .await;
    assert!(matches!(unknown, Err(Error::InvalidInput(_))));

    let milestone = handle
        .append_row(Sheet::Milestones, &[("Milestone ID", CellValue::from("M-1"))])
        .await;
    assert!(matches!(milestone, Err(Error::InvalidInput(_))));
    handle.close().await.unwrap();
}

#[tokio::test]
async fn test_read_only_handle_cannot_append_or_save() {
    let dir = tempfile::tempdir().unwrap();
    let registry = provisioned(dir.path(), "HB").await;

    let mut reader = registry.open_read_only("HB").await.unwrap();
    let result = reader.append_row(Sheet::Tasks, &task_values("T-001", "x")).await;
    assert!(matches!(result, Err(Error::InvalidInput(_))));
    assert!(reader.save().await.is_err());
}

#[tokio::test]
async fn test_duplicate_task_id_rejected_by_store() {
    let dir = tempfile::tempdir().unwrap();
    let registry = provisioned(dir.path(), "HB").await;

    let mut handle = registry.open("HB").await.unwrap();
    handle.append_row(Sheet::Tasks, &task_values("T-001", "a")).await.unwrap();
    let duplicate = handle.append_row(Sheet::Tasks, &task_values("T-001", "b")).await;
    assert!(matches!(duplicate, Err(Error::Database(_))));
}

#[tokio::test]
async fn test_missing_milestones_sheet_reads_empty() {
    let dir = tempfile::tempdir().unwrap();
    let registry = provisioned(dir.path(), "HB").await;
    let path = registry.locate("HB").unwrap();
    raw_execute(&path, "DROP TABLE milestones").await;

    let mut reader = registry.open_read_only("HB").await.unwrap();
    assert!(reader.rows(Sheet::Milestones).await.unwrap().is_empty());
}

#[tokio::test]
async fn test_milestones_are_readable() {
    let dir = tempfile::tempdir().unwrap();
    let registry = provisioned(dir.path(), "HB").await;
    let path = registry.locate("HB").unwrap();
    raw_execute(
        &path,
        "INSERT INTO milestones (milestone_id, milestone, baseline_date, status, variance_days) \
         VALUES ('M-01', 'Mechanical completion', '2025-06-30', 'At Risk', 14)",
    )
    .await;

    let mut reader = registry.open_read_only("HB").await.unwrap();
    let rows = reader.rows(Sheet::Milestones).await.unwrap();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].text("Status").as_deref(), Some("At Risk"));
    assert_eq!(rows[0].text("Variance Days").as_deref(), Some("14"));
}

#[tokio::test]
async fn test_register_missing_required_sheet_fails_to_open() {
    let dir = tempfile::tempdir().unwrap();
    let registry = provisioned(dir.path(), "HB").await;
    let path = registry.locate("HB").unwrap();
    raw_execute(&path, "DROP TABLE update_log").await;

    let result = registry.open("HB").await;
    assert!(matches!(result, Err(Error::Internal(_))));
}
