//! HTTP API handlers for riskreg-ingest

pub mod dashboard;
pub mod health;
pub mod process;

pub use dashboard::dashboard_routes;
pub use health::health_routes;
pub use process::process_routes;
