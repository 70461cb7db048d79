//! riskreg-ingest library interface
//!
//! Extraction pipeline, register reconciliation and the front doors that
//! feed it (HTTP API, transcript watcher, email attachments, CLI).

pub mod api;
pub mod attachments;
pub mod config;
pub mod dashboard;
pub mod documents;
pub mod error;
pub mod extraction;
pub mod mail;
pub mod reconciler;
pub mod watcher;

pub use crate::error::{ApiError, ApiResult};
pub use crate::reconciler::{ErrorKind, ProcessResult, ProcessSummary, Reconciler};

use std::sync::Arc;

use axum::Router;
use chrono::{DateTime, Utc};
use riskreg_common::ProjectRegistry;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    /// Register discovery (same root as the reconciler's)
    pub registry: ProjectRegistry,
    pub reconciler: Arc<Reconciler>,
    /// Service startup timestamp for uptime tracking
    pub startup_time: DateTime<Utc>,
}

impl AppState {
    pub fn new(reconciler: Arc<Reconciler>) -> Self {
        Self {
            registry: reconciler.registry().clone(),
            reconciler,
            startup_time: Utc::now(),
        }
    }
}

/// Build application router
pub fn build_router(state: AppState) -> Router {
    Router::new()
        .merge(api::health_routes())
        .merge(api::process_routes())
        .merge(api::dashboard_routes())
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}
