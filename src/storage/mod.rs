//! Storage module for persisting sweep state
//!
//! This module holds the two durable stores the orchestrator relies on:
//! - progress: completion state per (keyword, provider) pair
//! - results: one liveness verdict per (provider, url), never deleted
//!
//! The stores are the only source of truth across restarts; neither the
//! orchestrator nor the adapters keep authoritative in-memory state.

mod schema;
mod sqlite;
mod traits;

pub use sqlite::SqliteStore;
pub use traits::{ProgressStore, ResultStore, StorageError, StorageResult};

use chrono::{DateTime, Utc};
use std::path::Path;

use crate::SweepError;

/// Initializes or opens the sweep database
pub fn open_store(path: &Path) -> Result<SqliteStore, SweepError> {
    SqliteStore::new(path)
}

/// One settled liveness verdict, keyed by (provider, url)
///
/// Once a record exists the pair is settled: the URL is never probed again
/// and feedback is never re-attempted for it. Records are kept forever as an
/// audit trail.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResultRecord {
    pub keyword: String,
    pub provider: String,
    pub url: String,
    pub title: String,
    pub is_expired: bool,
    pub last_updated: DateTime<Utc>,
}

impl ResultRecord {
    /// Builds a record with the verdict timestamped now
    pub fn new(
        keyword: impl Into<String>,
        provider: impl Into<String>,
        url: impl Into<String>,
        title: impl Into<String>,
        is_expired: bool,
    ) -> Self {
        Self {
            keyword: keyword.into(),
            provider: provider.into(),
            url: url.into(),
            title: title.into(),
            is_expired,
            last_updated: Utc::now(),
        }
    }
}
