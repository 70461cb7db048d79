//! # Risk Register Common Library
//!
//! Shared code for the risk register services including:
//! - Register Store (per-project SQLite register with fixed sheets)
//! - Project Registry (register discovery and provisioning)
//! - Identifier allocation for risks and tasks
//! - Configuration loading
//! - Clock abstraction for date-dependent logic

pub mod config;
pub mod error;
pub mod register;
pub mod time;

pub use error::{Error, Result};
pub use register::{
    CellValue, Level, ProjectRegistry, RegisterHandle, RegisterRow, RegisterStore, RiskCategory,
    Sheet,
};
