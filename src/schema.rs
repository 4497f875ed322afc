//! Database schema definitions
//!
//! Table and column names used with rusqlite, plus the DDL for the single
//! diary table. The schema is versioned through SQLite's `user_version`
//! pragma; a mismatch resets the table (see [`crate::db::Database::new`]).

/// Current schema version, stored in `PRAGMA user_version`.
pub const SCHEMA_VERSION: i32 = 1;

/// Diary entries table schema
pub mod diary_entries {
    /// Table name
    pub const TABLE: &str = "diary_entries";
    /// Primary key column
    pub const ID: &str = "id";
    /// Entry title column
    pub const TITLE: &str = "title";
    /// Free-text body column
    pub const CONTENT: &str = "content";
    /// Emotion tag column
    pub const SELECTED_EMOTION: &str = "selected_emotion";
    /// Image reference column
    pub const IMAGE_URI: &str = "image_uri";
    /// Creation timestamp column (ms since epoch)
    pub const CREATED_AT: &str = "created_at";
    /// Update timestamp column (ms since epoch)
    pub const UPDATED_AT: &str = "updated_at";

    /// Create statement for the table.
    pub const CREATE: &str = "CREATE TABLE IF NOT EXISTS diary_entries (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        title TEXT NOT NULL,
        content TEXT NOT NULL,
        selected_emotion TEXT NOT NULL,
        image_uri TEXT NOT NULL,
        created_at INTEGER NOT NULL,
        updated_at INTEGER NOT NULL
    )";

    /// Drop statement used by the destructive reset.
    pub const DROP: &str = "DROP TABLE IF EXISTS diary_entries";
}
