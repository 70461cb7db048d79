//! Transcript Watcher Integration Tests
//!
//! Drives single polls against a temporary folder; the settle delay is
//! shortened so tests do not sleep.

mod helpers;

use std::io::Write;
use std::sync::Arc;
use std::time::Duration;

use helpers::{read_rows, reconciler_for, temp_registry, FakeExtractor};
use riskreg_common::Sheet;
use riskreg_ingest::watcher::TranscriptWatcher;
use serde_json::json;
use tempfile::TempDir;

fn watcher(dir: &TempDir) -> TranscriptWatcher {
    TranscriptWatcher::new(dir.path(), "HB").with_settle_delay(Duration::from_millis(10))
}

fn minimal_docx(paragraph: &str) -> Vec<u8> {
    let xml = format!(
        "<?xml version=\"1.0\"?><w:document><w:body><w:p><w:r><w:t>{}</w:t></w:r></w:p></w:body></w:document>",
        paragraph
    );
    let mut writer = zip::ZipWriter::new(std::io::Cursor::new(Vec::new()));
    writer
        .start_file("word/document.xml", zip::write::SimpleFileOptions::default())
        .unwrap();
    writer.write_all(xml.as_bytes()).unwrap();
    writer.finish().unwrap().into_inner()
}

#[tokio::test]
async fn test_existing_files_are_ignored() {
    let (_root, registry) = temp_registry(&["HB"]).await;
    let folder = TempDir::new().unwrap();
    std::fs::write(folder.path().join("old.txt"), "Earlier meeting notes").unwrap();

    let extractor = Arc::new(FakeExtractor::responding_json(json!({})));
    let reconciler = reconciler_for(&registry, extractor.clone());
    let watcher = watcher(&folder);

    let mut seen = watcher.snapshot().await;
    let outcomes = watcher.poll_once(&mut seen, &reconciler).await;

    assert!(outcomes.is_empty());
    assert_eq!(extractor.calls(), 0);
}

#[tokio::test]
async fn test_new_transcript_processed_as_meeting() {
    let (_root, registry) = temp_registry(&["HB"]).await;
    let folder = TempDir::new().unwrap();
    let extractor = Arc::new(FakeExtractor::responding_json(json!({
        "tasks": [{"task": "Send updated single-line diagram", "owner": "Ana"}]
    })));
    let reconciler = reconciler_for(&registry, extractor.clone());
    let watcher = watcher(&folder);

    let mut seen = watcher.snapshot().await;
    std::fs::write(folder.path().join("2025-06-14 standup.txt"), "Ana to send the SLD").unwrap();

    let outcomes = watcher.poll_once(&mut seen, &reconciler).await;

    assert_eq!(outcomes.len(), 1);
    assert_eq!(outcomes[0].0, "2025-06-14 standup.txt");
    assert!(outcomes[0].1.success);
    assert_eq!(extractor.contents(), vec!["Ana to send the SLD".to_string()]);

    let log = read_rows(&registry, "HB", Sheet::UpdateLog).await;
    assert_eq!(log[0].text("Source Type").as_deref(), Some("meeting"));
    assert_eq!(log[0].text("Source").as_deref(), Some("2025-06-14 standup.txt"));

    // Second poll finds nothing new
    assert!(watcher.poll_once(&mut seen, &reconciler).await.is_empty());
    assert_eq!(extractor.calls(), 1);
}

#[tokio::test]
async fn test_docx_transcript_is_read() {
    let (_root, registry) = temp_registry(&["HB"]).await;
    let folder = TempDir::new().unwrap();
    let extractor = Arc::new(FakeExtractor::responding_json(json!({})));
    let reconciler = reconciler_for(&registry, extractor.clone());
    let watcher = watcher(&folder);

    let mut seen = watcher.snapshot().await;
    std::fs::write(
        folder.path().join("minutes.docx"),
        minimal_docx("Racking delivery confirmed for Tuesday"),
    )
    .unwrap();

    let outcomes = watcher.poll_once(&mut seen, &reconciler).await;

    assert_eq!(outcomes.len(), 1);
    assert_eq!(
        extractor.contents(),
        vec!["Racking delivery confirmed for Tuesday".to_string()]
    );
}

#[tokio::test]
async fn test_empty_and_unwatched_files_skipped() {
    let (_root, registry) = temp_registry(&["HB"]).await;
    let folder = TempDir::new().unwrap();
    let extractor = Arc::new(FakeExtractor::responding_json(json!({})));
    let reconciler = reconciler_for(&registry, extractor.clone());
    let watcher = watcher(&folder);

    let mut seen = watcher.snapshot().await;
    std::fs::write(folder.path().join("blank.txt"), "   \n").unwrap();
    std::fs::write(folder.path().join("budget.xlsx"), "PK").unwrap();
    std::fs::write(folder.path().join("~$minutes.docx"), "lock").unwrap();

    let outcomes = watcher.poll_once(&mut seen, &reconciler).await;

    assert!(outcomes.is_empty());
    assert_eq!(extractor.calls(), 0);
}

#[tokio::test]
async fn test_failed_file_is_not_retried() {
    let (_root, registry) = temp_registry(&["HB"]).await;
    let folder = TempDir::new().unwrap();
    let extractor = Arc::new(FakeExtractor::failing("Model request timed out"));
    let reconciler = reconciler_for(&registry, extractor.clone());
    let watcher = watcher(&folder);

    let mut seen = watcher.snapshot().await;
    let path = folder.path().join("notes.md");
    std::fs::write(&path, "# Weekly\nInverter firmware issue").unwrap();

    let outcomes = watcher.poll_once(&mut seen, &reconciler).await;
    assert_eq!(outcomes.len(), 1);
    assert!(!outcomes[0].1.success);

    assert!(watcher.poll_once(&mut seen, &reconciler).await.is_empty());
    assert_eq!(extractor.calls(), 1);
    assert!(path.exists(), "failed transcript stays in place");
}

#[tokio::test]
async fn test_missing_register_reported_per_file() {
    let (_root, registry) = temp_registry(&[]).await;
    let folder = TempDir::new().unwrap();
    let extractor = Arc::new(FakeExtractor::responding_json(json!({})));
    let reconciler = reconciler_for(&registry, extractor.clone());
    let watcher = watcher(&folder);

    let mut seen = watcher.snapshot().await;
    std::fs::write(folder.path().join("a.txt"), "notes").unwrap();

    let outcomes = watcher.poll_once(&mut seen, &reconciler).await;

    assert_eq!(outcomes.len(), 1);
    assert!(outcomes[0]
        .1
        .error
        .as_deref()
        .unwrap()
        .contains("Risk Register not found"));
    assert_eq!(extractor.calls(), 0);
}
