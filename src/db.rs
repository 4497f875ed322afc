use std::fs;
use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use r2d2::Pool;
use r2d2_sqlite::SqliteConnectionManager;
use rusqlite::{params, Connection, OptionalExtension, Row, TransactionBehavior};
use tracing::{debug, info, warn};

use crate::config::DatabaseConfig;
use crate::error::Result;
use crate::logging::OperationTimer;
use crate::metrics;
use crate::models::{DiaryEntry, NewDiaryEntry};
use crate::schema::{diary_entries, SCHEMA_VERSION};

/// Pool of SQLite connections
pub type DbPool = Pool<SqliteConnectionManager>;
/// A connection checked out of the pool
pub type DbConnection = r2d2::PooledConnection<SqliteConnectionManager>;

const SELECT_COLUMNS: &str = "id, title, content, selected_emotion, image_uri, created_at, updated_at";

/// Diary store backed by a pooled SQLite file
///
/// Cloning is cheap and shares the pool and the writer lock, so one handle
/// can be built at startup and passed to every consumer.
#[derive(Clone)]
pub struct Database {
    pool: DbPool,
    write_lock: Arc<Mutex<()>>,
}

impl Database {
    /// Open (or create) the database at `path` with default pool settings
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let config = DatabaseConfig {
            path: path.as_ref().to_string_lossy().into_owned(),
            ..DatabaseConfig::default()
        };
        Self::new(&config)
    }

    /// Create a new database connection pool and bring the schema up to date
    ///
    /// A file written with a different schema version is wiped: the table is
    /// dropped and recreated. There is no migration path.
    pub fn new(config: &DatabaseConfig) -> Result<Self> {
        let path = Path::new(&config.path);
        // Create parent directory if it doesn't exist
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }

        let busy_timeout = Duration::from_millis(config.busy_timeout_ms);
        let manager = SqliteConnectionManager::file(path).with_init(move |conn| {
            conn.busy_timeout(busy_timeout)?;
            conn.execute_batch("PRAGMA journal_mode = WAL; PRAGMA foreign_keys = ON;")
        });
        let pool = Pool::builder().max_size(config.max_connections).build(manager)?;

        let db = Self {
            pool,
            write_lock: Arc::new(Mutex::new(())),
        };

        let mut conn = db.get_connection()?;
        Self::run_migrations(&mut conn)?;
        info!(path = %config.path, version = SCHEMA_VERSION, "Diary database ready");

        Ok(db)
    }

    /// Create the table, resetting it when the stored version is stale
    ///
    /// The version check happens inside the write transaction so that two
    /// processes opening a stale file cannot both reset it.
    fn run_migrations(conn: &mut Connection) -> Result<()> {
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;

        let version: i32 = tx.pragma_query_value(None, "user_version", |row| row.get(0))?;
        let table_exists: bool = tx.query_row(
            "SELECT EXISTS(SELECT 1 FROM sqlite_master WHERE type = 'table' AND name = ?1)",
            params![diary_entries::TABLE],
            |row| row.get(0),
        )?;

        if table_exists && version != SCHEMA_VERSION {
            warn!(
                found = version,
                expected = SCHEMA_VERSION,
                "Schema version mismatch, discarding existing diary entries"
            );
            tx.execute_batch(diary_entries::DROP)?;
        }
        tx.execute_batch(diary_entries::CREATE)?;
        tx.pragma_update(None, "user_version", SCHEMA_VERSION)?;
        tx.commit()?;

        Ok(())
    }

    /// Get a connection from the pool
    pub fn get_connection(&self) -> Result<DbConnection> {
        Ok(self.pool.get()?)
    }

    fn lock_writes(&self) -> MutexGuard<'_, ()> {
        // The guarded value is `()`, so a poisoned lock carries no broken state.
        self.write_lock.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Persist a new entry and return it with its assigned id
    pub fn insert(&self, entry: NewDiaryEntry) -> Result<DiaryEntry> {
        let timer = OperationTimer::new("insert");
        let _guard = self.lock_writes();
        let conn = self.get_connection()?;

        let result = conn.execute(
            &format!(
                "INSERT INTO {} ({}, {}, {}, {}, {}, {}) VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
                diary_entries::TABLE,
                diary_entries::TITLE,
                diary_entries::CONTENT,
                diary_entries::SELECTED_EMOTION,
                diary_entries::IMAGE_URI,
                diary_entries::CREATED_AT,
                diary_entries::UPDATED_AT
            ),
            params![
                entry.title,
                entry.content,
                entry.selected_emotion,
                entry.image_uri,
                entry.created_at,
                entry.updated_at
            ],
        );
        metrics::record_db_operation("insert", timer.elapsed(), result.is_ok());
        result?;

        let id = conn.last_insert_rowid();
        debug!(id, "Inserted diary entry");
        Ok(entry.into_entry(id))
    }

    /// All entries, oldest id first
    pub fn get_all(&self) -> Result<Vec<DiaryEntry>> {
        let timer = OperationTimer::new("get_all");
        let conn = self.get_connection()?;

        let result = Self::query_all(&conn);
        metrics::record_db_operation("get_all", timer.elapsed(), result.is_ok());
        result
    }

    fn query_all(conn: &Connection) -> Result<Vec<DiaryEntry>> {
        let mut stmt = conn.prepare(&format!(
            "SELECT {SELECT_COLUMNS} FROM {} ORDER BY {} ASC",
            diary_entries::TABLE,
            diary_entries::ID
        ))?;
        let entry_iter = stmt.query_map([], map_diary_entry)?;

        let mut results = Vec::new();
        for entry in entry_iter {
            results.push(entry?);
        }

        Ok(results)
    }

    /// Get an entry by ID
    pub fn get_by_id(&self, id: i64) -> Result<Option<DiaryEntry>> {
        let timer = OperationTimer::new("get_by_id");
        let conn = self.get_connection()?;

        let result = conn
            .query_row(
                &format!(
                    "SELECT {SELECT_COLUMNS} FROM {} WHERE {} = ?1",
                    diary_entries::TABLE,
                    diary_entries::ID
                ),
                params![id],
                map_diary_entry,
            )
            .optional();
        metrics::record_db_operation("get_by_id", timer.elapsed(), result.is_ok());

        Ok(result?)
    }

    /// The entry with the highest id, if any
    pub fn latest(&self) -> Result<Option<DiaryEntry>> {
        let timer = OperationTimer::new("latest");
        let conn = self.get_connection()?;

        let result = Self::query_latest(&conn);
        metrics::record_db_operation("latest", timer.elapsed(), result.is_ok());
        result
    }

    fn query_latest(conn: &Connection) -> Result<Option<DiaryEntry>> {
        let entry = conn
            .query_row(
                &format!(
                    "SELECT {SELECT_COLUMNS} FROM {} ORDER BY {} DESC LIMIT 1",
                    diary_entries::TABLE,
                    diary_entries::ID
                ),
                [],
                map_diary_entry,
            )
            .optional()?;

        Ok(entry)
    }

    /// Delete an entry by ID. Returns whether a row was removed; a missing id
    /// is not an error.
    pub fn delete_by_id(&self, id: i64) -> Result<bool> {
        let timer = OperationTimer::new("delete_by_id");
        let _guard = self.lock_writes();
        let conn = self.get_connection()?;

        let result = conn.execute(
            &format!("DELETE FROM {} WHERE {} = ?1", diary_entries::TABLE, diary_entries::ID),
            params![id],
        );
        metrics::record_db_operation("delete_by_id", timer.elapsed(), result.is_ok());

        let removed = result? > 0;
        debug!(id, removed, "Deleted diary entry");
        Ok(removed)
    }

    /// Remove the most recently inserted entry and return it
    ///
    /// The lookup and the delete run in one immediate transaction under the
    /// writer lock, so overlapping calls never target the same row.
    pub fn delete_latest(&self) -> Result<Option<DiaryEntry>> {
        let timer = OperationTimer::new("delete_latest");
        let _guard = self.lock_writes();
        let mut conn = self.get_connection()?;

        let result = Self::delete_latest_in(&mut conn);
        metrics::record_db_operation("delete_latest", timer.elapsed(), result.is_ok());

        if let Ok(Some(entry)) = &result {
            info!(id = entry.id, "Removed most recent diary entry");
        }
        result
    }

    fn delete_latest_in(conn: &mut Connection) -> Result<Option<DiaryEntry>> {
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;

        let Some(entry) = Self::query_latest(&tx)? else {
            return Ok(None);
        };
        tx.execute(
            &format!("DELETE FROM {} WHERE {} = ?1", diary_entries::TABLE, diary_entries::ID),
            params![entry.id],
        )?;
        tx.commit()?;

        Ok(Some(entry))
    }

    /// Number of stored entries
    pub fn count(&self) -> Result<usize> {
        let timer = OperationTimer::new("count");
        let conn = self.get_connection()?;

        let result: rusqlite::Result<i64> =
            conn.query_row(&format!("SELECT COUNT(*) FROM {}", diary_entries::TABLE), [], |row| row.get(0));
        metrics::record_db_operation("count", timer.elapsed(), result.is_ok());

        Ok(usize::try_from(result?).unwrap_or_default())
    }
}

/// Map a database row to a DiaryEntry
fn map_diary_entry(row: &Row) -> rusqlite::Result<DiaryEntry> {
    Ok(DiaryEntry {
        id: row.get(diary_entries::ID)?,
        title: row.get(diary_entries::TITLE)?,
        content: row.get(diary_entries::CONTENT)?,
        selected_emotion: row.get(diary_entries::SELECTED_EMOTION)?,
        image_uri: row.get(diary_entries::IMAGE_URI)?,
        created_at: row.get(diary_entries::CREATED_AT)?,
        updated_at: row.get(diary_entries::UPDATED_AT)?,
    })
}

/// Open the database described by the application configuration
pub fn establish_connection(config: &DatabaseConfig) -> Result<Database> {
    Database::new(config)
}
