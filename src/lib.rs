//! OneFrame - Diary Storage and Emotion Reports
//!
//! The core of the OneFrame journal: a local SQLite diary store, the emotion
//! distribution behind the donut chart, and AI-written emotion reports from a
//! chat-completion endpoint.
//!
//! # Features
//!
//! - Save, list, inspect and delete diary entries
//! - Atomic "undo last save"
//! - Emotion distribution with fixed chart colors
//! - Monday–Sunday week calendar helpers
//! - Weekly and per-entry emotion reports, cancellable in the background

/// Configuration management
pub mod config;
/// Database operations and connection pooling
pub mod db;
/// Emotion aggregation
pub mod emotion;
/// Error types
pub mod error;
/// Logging setup and utilities
pub mod logging;
/// Metrics collection
pub mod metrics;
/// Data models and structures
pub mod models;
/// Prompt building and the chat-completion client
pub mod report;
/// Repository pattern for data access
pub mod repository;
/// Database schema definitions
pub mod schema;
/// Service layer composing storage and reports
pub mod service;
/// Calendar-week helpers
pub mod week;

// Re-export key components for easier access
pub use db::Database;
pub use error::{DiaryError, Result};
pub use models::{Color, DiaryEntry, Emotion, EmotionEntry, NewDiaryEntry};
pub use report::{AnalysisKind, AnalysisOutcome, ChatCompletionClient, EmotionAnalyst, ReportTask};
pub use service::DiaryService;
