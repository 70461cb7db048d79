//! Register Test Utilities

use std::sync::Arc;

use axum::Router;
use riskreg_common::time::FixedClock;
use riskreg_common::{ProjectRegistry, RegisterRow, Sheet};
use riskreg_ingest::{build_router, AppState, Reconciler};
use tempfile::TempDir;

use super::FakeExtractor;

/// Temporary root with an empty register provisioned per project code
///
/// TempDir must be kept alive for the duration of the test.
pub async fn temp_registry(projects: &[&str]) -> (TempDir, ProjectRegistry) {
    let temp_dir = TempDir::new().unwrap();
    let registry = ProjectRegistry::new(temp_dir.path());
    for code in projects {
        registry.provision(code).await.unwrap();
    }
    (temp_dir, registry)
}

/// Reconciler pinned to 2025-06-15
pub fn reconciler_for(registry: &ProjectRegistry, extractor: Arc<FakeExtractor>) -> Reconciler {
    Reconciler::new(registry.clone(), extractor)
        .with_clock(Arc::new(FixedClock::on_date(2025, 6, 15).unwrap()))
}

/// Router over a fresh reconciler
pub fn test_app(registry: &ProjectRegistry, extractor: Arc<FakeExtractor>) -> Router {
    build_router(AppState::new(Arc::new(reconciler_for(registry, extractor))))
}

/// All data rows of one sheet
pub async fn read_rows(registry: &ProjectRegistry, project: &str, sheet: Sheet) -> Vec<RegisterRow> {
    let mut handle = registry.open_read_only(project).await.unwrap();
    let rows = handle.rows(sheet).await.unwrap();
    handle.close().await.unwrap();
    rows
}
