//! SQLite storage implementation
//!
//! This module provides the SQLite-backed implementation of both store
//! traits. The handle is cheaply cloneable; clones share one connection, and
//! every mutation is a single atomic upsert against the row's natural unique
//! key, which keeps per-key operations idempotent and safe to retry.

use crate::storage::schema::initialize_schema;
use crate::storage::traits::{ProgressStore, ResultStore, StorageResult};
use crate::storage::ResultRecord;
use crate::SweepError;
use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension};
use std::path::Path;
use std::sync::{Arc, Mutex};

/// SQLite storage backend for progress and result records
#[derive(Clone)]
pub struct SqliteStore {
    conn: Arc<Mutex<Connection>>,
}

impl SqliteStore {
    /// Opens (or creates) the database at the given path
    pub fn new(path: &Path) -> Result<Self, SweepError> {
        let conn = Connection::open(path)?;

        // Configure SQLite for better durability/performance balance
        conn.execute_batch(
            "
            PRAGMA journal_mode = WAL;
            PRAGMA synchronous = NORMAL;
            PRAGMA foreign_keys = ON;
            PRAGMA temp_store = MEMORY;
        ",
        )?;

        // Initialize schema
        initialize_schema(&conn)?;

        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// Creates an in-memory database (for testing)
    pub fn new_in_memory() -> Result<Self, SweepError> {
        let conn = Connection::open_in_memory()?;
        conn.execute_batch("PRAGMA foreign_keys = ON;")?;
        initialize_schema(&conn)?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    fn lookup_result(
        &self,
        sql: &str,
        params: &[&dyn rusqlite::ToSql],
    ) -> StorageResult<Option<ResultRecord>> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn.prepare(sql)?;

        let record = stmt
            .query_row(params, |row| {
                Ok(ResultRecord {
                    keyword: row.get(0)?,
                    provider: row.get(1)?,
                    url: row.get(2)?,
                    title: row.get(3)?,
                    is_expired: row.get::<_, i64>(4)? != 0,
                    last_updated: row
                        .get::<_, String>(5)?
                        .parse::<DateTime<Utc>>()
                        .unwrap_or_else(|_| Utc::now()),
                })
            })
            .optional()?;

        Ok(record)
    }

    /// Counts settled results, optionally restricted to expired ones
    pub fn count_results(&self, expired_only: bool) -> StorageResult<u64> {
        let conn = self.conn.lock().unwrap();
        let sql = if expired_only {
            "SELECT COUNT(*) FROM results WHERE is_expired = 1"
        } else {
            "SELECT COUNT(*) FROM results"
        };
        let count: i64 = conn.query_row(sql, [], |row| row.get(0))?;
        Ok(count as u64)
    }

    /// Counts settled results per provider (provider, total, expired)
    pub fn results_by_provider(&self) -> StorageResult<Vec<(String, u64, u64)>> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn.prepare(
            "SELECT provider, COUNT(*), SUM(is_expired) FROM results
             GROUP BY provider ORDER BY provider",
        )?;

        let rows = stmt
            .query_map([], |row| {
                Ok((
                    row.get::<_, String>(0)?,
                    row.get::<_, i64>(1)? as u64,
                    row.get::<_, Option<i64>>(2)?.unwrap_or(0) as u64,
                ))
            })?
            .collect::<Result<Vec<_>, _>>()?;

        Ok(rows)
    }

    /// Counts completed (keyword, provider) pairs
    pub fn count_done_pairs(&self) -> StorageResult<u64> {
        let conn = self.conn.lock().unwrap();
        let count: i64 = conn.query_row(
            "SELECT COUNT(*) FROM progress WHERE is_done = 1",
            [],
            |row| row.get(0),
        )?;
        Ok(count as u64)
    }
}

impl ProgressStore for SqliteStore {
    fn is_done(&self, keyword: &str, provider: &str) -> bool {
        let conn = self.conn.lock().unwrap();
        let lookup: Result<Option<i64>, rusqlite::Error> = conn
            .query_row(
                "SELECT is_done FROM progress WHERE keyword = ?1 AND provider = ?2",
                params![keyword, provider],
                |row| row.get(0),
            )
            .optional();

        match lookup {
            Ok(value) => value.map(|v| v != 0).unwrap_or(false),
            Err(e) => {
                // Fail open: re-process rather than silently abandon the pair
                tracing::warn!(keyword, provider, error = %e, "progress read failed, treating as not done");
                false
            }
        }
    }

    fn mark_done(&self, keyword: &str, provider: &str, done: bool) -> StorageResult<()> {
        let now = Utc::now().to_rfc3339();
        let conn = self.conn.lock().unwrap();
        conn.execute(
            "INSERT INTO progress (keyword, provider, is_done, last_updated)
             VALUES (?1, ?2, ?3, ?4)
             ON CONFLICT(keyword, provider)
             DO UPDATE SET is_done = excluded.is_done, last_updated = excluded.last_updated",
            params![keyword, provider, done as i64, now],
        )?;
        Ok(())
    }
}

impl ResultStore for SqliteStore {
    fn find_settled(&self, provider: &str, url: &str) -> Option<ResultRecord> {
        match self.lookup_result(
            "SELECT keyword, provider, url, title, is_expired, last_updated
             FROM results WHERE provider = ?1 AND url = ?2",
            &[&provider, &url],
        ) {
            Ok(record) => record,
            Err(e) => {
                tracing::warn!(provider, url, error = %e, "result lookup failed, treating as unsettled");
                None
            }
        }
    }

    fn find_by_keyword_title(
        &self,
        keyword: &str,
        provider: &str,
        title: &str,
    ) -> Option<ResultRecord> {
        match self.lookup_result(
            "SELECT keyword, provider, url, title, is_expired, last_updated
             FROM results WHERE provider = ?1 AND keyword = ?2 AND title = ?3",
            &[&provider, &keyword, &title],
        ) {
            Ok(record) => record,
            Err(e) => {
                tracing::warn!(provider, keyword, title, error = %e, "title lookup failed, treating as unsettled");
                None
            }
        }
    }

    fn save(&self, record: &ResultRecord) -> StorageResult<()> {
        let conn = self.conn.lock().unwrap();
        conn.execute(
            "INSERT INTO results (keyword, provider, url, title, is_expired, last_updated)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)
             ON CONFLICT(provider, url)
             DO UPDATE SET keyword = excluded.keyword,
                           title = excluded.title,
                           is_expired = excluded.is_expired,
                           last_updated = excluded.last_updated",
            params![
                record.keyword,
                record.provider,
                record.url,
                record.title,
                record.is_expired as i64,
                record.last_updated.to_rfc3339(),
            ],
        )?;
        Ok(())
    }
}
