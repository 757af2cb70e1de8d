//! Storage module for persisting articles
//!
//! The store is the persistence boundary for the whole crate: the Persist
//! pipeline stage writes through `insert_if_absent`, the retention sweep
//! calls `delete_older_than`, and the read-only query API consumes the
//! listing methods. Uniqueness on `url` is the dedup mechanism.

mod schema;
mod sqlite;

pub use schema::initialize_schema;
pub use sqlite::SqliteStore;

use chrono::{DateTime, SecondsFormat, Utc};
use thiserror::Error;

use crate::item::NewsItem;

/// Errors that can occur during storage operations
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("Store unavailable: {0}")]
    Unavailable(String),

    #[error("Item is missing required fields")]
    IncompleteItem,

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type for storage operations
pub type StorageResult<T> = Result<T, StorageError>;

/// Outcome of an insert-if-absent attempt
///
/// A duplicate is a routine, expected outcome, never an error; transient
/// store failures surface as `Err(StorageError)` instead.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InsertOutcome {
    /// A new row was written
    Inserted,
    /// A row with this URL already exists; nothing was written
    Duplicate,
}

/// A persisted article row
#[derive(Debug, Clone)]
pub struct ArticleRecord {
    pub id: i64,
    pub title: String,
    pub url: String,
    pub content: Option<String>,
    pub author: Option<String>,
    pub published_date: Option<String>,
    pub source: String,
    pub scraped_at: DateTime<Utc>,
}

/// Formats a timestamp for storage
///
/// Fixed-width RFC 3339 with microsecond precision, so lexicographic order
/// on the stored text equals temporal order. Both inserts and the retention
/// cutoff must go through this.
pub fn fmt_timestamp(ts: DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Micros, true)
}

/// Trait for article storage backends
///
/// All writes are per-item and transactional: a reader never observes a
/// partially written article.
pub trait ArticleStore: Send {
    /// Inserts an article unless a row with the same URL already exists
    ///
    /// # Returns
    ///
    /// * `Ok(InsertOutcome::Inserted)` - New article stored
    /// * `Ok(InsertOutcome::Duplicate)` - URL already present, nothing written
    /// * `Err(StorageError)` - Transient store failure; the item is lost but
    ///   the run continues
    fn insert_if_absent(&mut self, item: &NewsItem) -> StorageResult<InsertOutcome>;

    /// Deletes all rows with `scraped_at` strictly older than `cutoff`
    ///
    /// A row at exactly the cutoff is retained.
    ///
    /// # Returns
    ///
    /// The number of rows removed
    fn delete_older_than(&mut self, cutoff: DateTime<Utc>) -> StorageResult<u64>;

    // ===== Read interface consumed by the external query API =====

    /// Lists articles ordered by `scraped_at` descending, optionally
    /// filtered by source
    fn list_articles(
        &self,
        source: Option<&str>,
        limit: u32,
        offset: u32,
    ) -> StorageResult<Vec<ArticleRecord>>;

    /// Gets a single article by its surrogate key
    fn get_article(&self, id: i64) -> StorageResult<Option<ArticleRecord>>;

    /// Lists the distinct sources present in the store
    fn sources(&self) -> StorageResult<Vec<String>>;

    /// Counts stored articles per source
    fn count_by_source(&self) -> StorageResult<Vec<(String, u64)>>;

    /// Counts all stored articles
    fn count_articles(&self) -> StorageResult<u64>;
}
