//! Health check endpoint

use axum::{extract::State, routing::get, Json, Router};
use chrono::Utc;
use serde::Serialize;

use crate::AppState;

/// Health check response
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    /// Service status ("ok")
    pub status: String,
    /// Module name ("riskreg-ingest")
    pub module: String,
    /// Crate version from Cargo.toml
    pub version: String,
    /// Seconds since service started
    pub uptime_seconds: u64,
    pub build: BuildInfo,
}

/// Build stamp recorded by the build script
#[derive(Debug, Clone, Copy, Serialize)]
pub struct BuildInfo {
    /// Short git commit, or "unknown" outside a checkout
    pub commit: &'static str,
    pub built_at: &'static str,
    pub profile: &'static str,
}

impl BuildInfo {
    pub const CURRENT: BuildInfo = BuildInfo {
        commit: env!("RISKREG_BUILD_COMMIT"),
        built_at: env!("RISKREG_BUILD_TIME"),
        profile: env!("RISKREG_BUILD_PROFILE"),
    };
}

/// GET /health
pub async fn health_check(State(state): State<AppState>) -> Json<HealthResponse> {
    let uptime = Utc::now().signed_duration_since(state.startup_time);
    let uptime_seconds = uptime.num_seconds().max(0) as u64;

    Json(HealthResponse {
        status: "ok".to_string(),
        module: "riskreg-ingest".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        uptime_seconds,
        build: BuildInfo::CURRENT,
    })
}

/// Build health check routes
pub fn health_routes() -> Router<AppState> {
    Router::new().route("/health", get(health_check))
}
