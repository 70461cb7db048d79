//! Common error types for the risk register services

use std::path::PathBuf;
use thiserror::Error;

/// Common result type for register operations
pub type Result<T> = std::result::Result<T, Error>;

/// Common error types across the risk register crates
#[derive(Error, Debug)]
pub enum Error {
    /// Database operation error (wraps sqlx::Error)
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// I/O operation error (wraps std::io::Error)
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Configuration loading or validation error
    #[error("Configuration error: {0}")]
    Config(String),

    /// No register has been provisioned for the project
    #[error("Risk Register not found at {}", .0.display())]
    RegisterNotFound(PathBuf),

    /// Invalid user input or request parameter
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Internal error
    #[error("Internal error: {0}")]
    Internal(String),
}
