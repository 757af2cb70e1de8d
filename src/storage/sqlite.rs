//! SQLite article store

use crate::item::NewsItem;
use crate::storage::schema::initialize_schema;
use crate::storage::{
    fmt_timestamp, ArticleRecord, ArticleStore, InsertOutcome, StorageError, StorageResult,
};
use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, ErrorCode, OptionalExtension, Row};
use std::path::Path;
use std::time::Duration;

/// SQLite storage backend
pub struct SqliteStore {
    conn: Connection,
}

impl SqliteStore {
    /// Opens (or creates) the article database at the given path
    ///
    /// The connection carries a busy timeout so every store operation has a
    /// bounded wait; expiry surfaces as `StorageError::Unavailable`.
    ///
    /// # Arguments
    ///
    /// * `path` - Path to the SQLite database file
    pub fn open(path: &Path) -> StorageResult<Self> {
        let conn = Connection::open(path)?;

        conn.execute_batch(
            "
            PRAGMA journal_mode = WAL;
            PRAGMA synchronous = NORMAL;
            PRAGMA foreign_keys = ON;
        ",
        )?;
        conn.busy_timeout(Duration::from_secs(5))?;

        initialize_schema(&conn)?;

        Ok(Self { conn })
    }

    /// Creates an in-memory store (for testing)
    pub fn open_in_memory() -> StorageResult<Self> {
        let conn = Connection::open_in_memory()?;
        initialize_schema(&conn)?;
        Ok(Self { conn })
    }

    fn row_to_record(row: &Row<'_>) -> rusqlite::Result<ArticleRecord> {
        let scraped_at: String = row.get(7)?;
        let scraped_at = DateTime::parse_from_rfc3339(&scraped_at)
            .map(|dt| dt.with_timezone(&Utc))
            .unwrap_or_default();

        Ok(ArticleRecord {
            id: row.get(0)?,
            title: row.get(1)?,
            url: row.get(2)?,
            content: row.get(3)?,
            author: row.get(4)?,
            published_date: row.get(5)?,
            source: row.get(6)?,
            scraped_at,
        })
    }

    /// Maps lock contention and I/O failures to the unavailable class so the
    /// Persist stage can count them without inspecting SQLite internals
    fn classify(err: rusqlite::Error) -> StorageError {
        match &err {
            rusqlite::Error::SqliteFailure(e, _)
                if matches!(
                    e.code,
                    ErrorCode::DatabaseBusy
                        | ErrorCode::DatabaseLocked
                        | ErrorCode::DiskFull
                        | ErrorCode::CannotOpen
                ) =>
            {
                StorageError::Unavailable(err.to_string())
            }
            _ => StorageError::Sqlite(err),
        }
    }
}

impl ArticleStore for SqliteStore {
    fn insert_if_absent(&mut self, item: &NewsItem) -> StorageResult<InsertOutcome> {
        let (title, url) = match (&item.title, &item.url) {
            (Some(t), Some(u)) => (t, u),
            _ => return Err(StorageError::IncompleteItem),
        };

        // A single INSERT OR IGNORE is its own transaction; readers see
        // either the complete row or nothing.
        let changed = self
            .conn
            .execute(
                "INSERT OR IGNORE INTO articles
                 (title, url, content, author, published_date, source, scraped_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
                params![
                    title,
                    url,
                    item.content,
                    item.author,
                    item.published_date,
                    item.source,
                    fmt_timestamp(item.scraped_at),
                ],
            )
            .map_err(Self::classify)?;

        if changed == 0 {
            Ok(InsertOutcome::Duplicate)
        } else {
            Ok(InsertOutcome::Inserted)
        }
    }

    fn delete_older_than(&mut self, cutoff: DateTime<Utc>) -> StorageResult<u64> {
        let removed = self
            .conn
            .execute(
                "DELETE FROM articles WHERE scraped_at < ?1",
                params![fmt_timestamp(cutoff)],
            )
            .map_err(Self::classify)?;

        Ok(removed as u64)
    }

    fn list_articles(
        &self,
        source: Option<&str>,
        limit: u32,
        offset: u32,
    ) -> StorageResult<Vec<ArticleRecord>> {
        let mut stmt;
        let rows = match source {
            Some(source) => {
                stmt = self.conn.prepare(
                    "SELECT id, title, url, content, author, published_date, source, scraped_at
                     FROM articles WHERE source = ?1
                     ORDER BY scraped_at DESC LIMIT ?2 OFFSET ?3",
                )?;
                stmt.query_map(params![source, limit, offset], Self::row_to_record)?
                    .collect::<rusqlite::Result<Vec<_>>>()?
            }
            None => {
                stmt = self.conn.prepare(
                    "SELECT id, title, url, content, author, published_date, source, scraped_at
                     FROM articles
                     ORDER BY scraped_at DESC LIMIT ?1 OFFSET ?2",
                )?;
                stmt.query_map(params![limit, offset], Self::row_to_record)?
                    .collect::<rusqlite::Result<Vec<_>>>()?
            }
        };

        Ok(rows)
    }

    fn get_article(&self, id: i64) -> StorageResult<Option<ArticleRecord>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, title, url, content, author, published_date, source, scraped_at
             FROM articles WHERE id = ?1",
        )?;

        let record = stmt
            .query_row(params![id], Self::row_to_record)
            .optional()?;

        Ok(record)
    }

    fn sources(&self) -> StorageResult<Vec<String>> {
        let mut stmt = self
            .conn
            .prepare("SELECT DISTINCT source FROM articles ORDER BY source")?;

        let sources = stmt
            .query_map([], |row| row.get(0))?
            .collect::<rusqlite::Result<Vec<String>>>()?;

        Ok(sources)
    }

    fn count_by_source(&self) -> StorageResult<Vec<(String, u64)>> {
        let mut stmt = self.conn.prepare(
            "SELECT source, COUNT(*) FROM articles GROUP BY source ORDER BY source",
        )?;

        let counts = stmt
            .query_map([], |row| Ok((row.get(0)?, row.get::<_, i64>(1)? as u64)))?
            .collect::<rusqlite::Result<Vec<_>>>()?;

        Ok(counts)
    }

    fn count_articles(&self) -> StorageResult<u64> {
        let count: i64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM articles", [], |row| row.get(0))?;
        Ok(count as u64)
    }
}
