//! Storage traits and error types
//!
//! The orchestrator consumes the stores through these traits so tests can
//! substitute in-memory implementations.

use crate::storage::ResultRecord;
use thiserror::Error;

/// Errors that can occur during storage operations
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Database error: {0}")]
    Database(String),

    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Constraint violation: {0}")]
    ConstraintViolation(String),
}

/// Result type for storage operations
pub type StorageResult<T> = Result<T, StorageError>;

/// Durable completion state per (keyword, provider) pair
///
/// Reads are fail-open: a storage error is reported as "not done" so work is
/// re-processed rather than silently abandoned. Writes propagate errors
/// because durability is required for correctness.
pub trait ProgressStore {
    /// Returns whether the pair has been completed
    ///
    /// Storage errors are logged and reported as `false`.
    fn is_done(&self, keyword: &str, provider: &str) -> bool;

    /// Records the completion state for the pair
    ///
    /// Idempotent upsert against the unique (keyword, provider) key; safe to
    /// retry and safe to interleave across independent keys.
    fn mark_done(&self, keyword: &str, provider: &str, done: bool) -> StorageResult<()>;
}

/// Durable, deduplicated record of every (provider, url) observed
pub trait ResultStore {
    /// Returns the existing verdict for this (provider, url), if any
    ///
    /// This is the dedup gate, consulted before the expensive liveness probe.
    /// Storage errors are logged and reported as `None`.
    fn find_settled(&self, provider: &str, url: &str) -> Option<ResultRecord>;

    /// Secondary lookup by (keyword, provider, title)
    ///
    /// Used to correlate mirrored listings whose URLs differ but whose titles
    /// match an already-settled record.
    fn find_by_keyword_title(
        &self,
        keyword: &str,
        provider: &str,
        title: &str,
    ) -> Option<ResultRecord>;

    /// Upserts a verdict keyed by (provider, url)
    ///
    /// Always called regardless of feedback success, so a failed remediation
    /// is still remembered and never retried forever.
    fn save(&self, record: &ResultRecord) -> StorageResult<()>;
}
