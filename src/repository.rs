use async_trait::async_trait;
use tokio::task;

use crate::db::Database;
use crate::error::Result;
use crate::models::{DiaryEntry, NewDiaryEntry};

/// Async access to stored diary entries
///
/// Every method completes only after the store has confirmed the operation,
/// so callers can reset their own state afterwards.
#[async_trait]
pub trait DiaryRepository: Send + Sync {
    /// Persist an entry and return it with its id
    async fn insert(&self, entry: NewDiaryEntry) -> Result<DiaryEntry>;
    /// All entries, oldest id first
    async fn get_all(&self) -> Result<Vec<DiaryEntry>>;
    /// One entry, if present
    async fn get_by_id(&self, id: i64) -> Result<Option<DiaryEntry>>;
    /// Delete one entry; `false` when nothing matched
    async fn delete_by_id(&self, id: i64) -> Result<bool>;
    /// Atomically remove and return the most recent entry
    async fn delete_latest(&self) -> Result<Option<DiaryEntry>>;
}

/// [`DiaryRepository`] over the SQLite [`Database`]
///
/// rusqlite is synchronous, so each call runs on tokio's blocking pool.
#[derive(Clone)]
pub struct SqliteDiaryRepository {
    database: Database,
}

impl SqliteDiaryRepository {
    /// Wrap an opened database
    pub const fn new(database: Database) -> Self {
        Self { database }
    }

    async fn run<T, F>(&self, operation: F) -> Result<T>
    where
        T: Send + 'static,
        F: FnOnce(&Database) -> Result<T> + Send + 'static,
    {
        let database = self.database.clone();
        task::spawn_blocking(move || operation(&database)).await?
    }
}

#[async_trait]
impl DiaryRepository for SqliteDiaryRepository {
    async fn insert(&self, entry: NewDiaryEntry) -> Result<DiaryEntry> {
        self.run(move |db| db.insert(entry)).await
    }

    async fn get_all(&self) -> Result<Vec<DiaryEntry>> {
        self.run(Database::get_all).await
    }

    async fn get_by_id(&self, id: i64) -> Result<Option<DiaryEntry>> {
        self.run(move |db| db.get_by_id(id)).await
    }

    async fn delete_by_id(&self, id: i64) -> Result<bool> {
        self.run(move |db| db.delete_by_id(id)).await
    }

    async fn delete_latest(&self) -> Result<Option<DiaryEntry>> {
        self.run(Database::delete_latest).await
    }
}
