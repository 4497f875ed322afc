//! Error types for the oneframe library.
//!
//! Storage, configuration and runtime failures are collected into a single
//! `thiserror` enum. Chat-completion failures are deliberately absent: they are
//! recovered into [`crate::report::AnalysisOutcome`] instead of propagated.

use thiserror::Error;

/// Errors that can occur in the oneframe application.
#[derive(Error, Debug)]
pub enum DiaryError {
    /// SQLite errors
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    /// Connection pool errors
    #[error("Connection pool error: {0}")]
    Pool(#[from] r2d2::Error),

    /// File I/O errors
    #[error("File I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization/deserialization errors
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Errors raised while reading configuration sources
    #[error("Configuration error: {0}")]
    Config(#[from] config::ConfigError),

    /// Configuration that loaded but failed validation
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// HTTP client construction errors
    #[error("HTTP client error: {0}")]
    Http(#[from] reqwest::Error),

    /// A blocking or background task panicked
    #[error("Background task failed: {0}")]
    Task(#[from] tokio::task::JoinError),

    /// Logging could not be initialized
    #[error("Logging error: {0}")]
    Logging(String),
}

/// Convenience type alias for Result with DiaryError
pub type Result<T> = std::result::Result<T, DiaryError>;
