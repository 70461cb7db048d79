//! Per-project risk register
//!
//! A register is one SQLite file per project code holding four sheets:
//! Risk Register, Tasks, Update Log and (optionally) Milestones. Callers
//! open it for a single read-modify-write cycle and either save or close.

pub mod ids;
pub mod models;
pub mod registry;
pub mod schema;
pub mod store;

pub use ids::{next_risk_id, next_task_id};
pub use models::{risk_score, CellValue, Level, RegisterRow, RiskCategory};
pub use registry::ProjectRegistry;
pub use schema::{ColumnDefinition, Sheet};
pub use store::{RegisterHandle, RegisterStore};

/// Longest text the Update Log keeps for a raw extraction payload
pub const MAX_CELL_CHARS: usize = 32_000;

/// Truncate to at most `max_chars` characters, respecting char boundaries
pub fn truncate_chars(text: &str, max_chars: usize) -> &str {
    match text.char_indices().nth(max_chars) {
        Some((idx, _)) => &text[..idx],
        None => text,
    }
}
