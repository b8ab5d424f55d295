//! Stalesweep: a resumable search-listing liveness auditor
//!
//! This crate re-visits a configured set of keywords across external content
//! providers, checks whether listed result pages are still reachable, and for
//! expired results drives the provider's removal-feedback workflow. Progress
//! and verdicts are durable, so runs resume exactly where they left off.

pub mod config;
pub mod output;
pub mod provider;
pub mod storage;
pub mod supervisor;
pub mod sweep;

use thiserror::Error;

/// Main error type for stalesweep operations
#[derive(Debug, Error)]
pub enum SweepError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("Storage error: {0}")]
    Storage(#[from] storage::StorageError),

    #[error("Unknown provider in config: {0}")]
    UnknownProvider(String),

    #[error("HTTP client error: {0}")]
    Reqwest(#[from] reqwest::Error),

    #[error("Supervisor error: {0}")]
    Supervisor(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Configuration-specific errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Invalid URL in config: {0}")]
    InvalidUrl(String),
}

/// Result type alias for stalesweep operations
pub type Result<T> = std::result::Result<T, SweepError>;

/// Result type alias for configuration operations
pub type ConfigResult<T> = std::result::Result<T, ConfigError>;

// Re-export commonly used types
pub use config::Config;
pub use provider::{AdapterError, ProviderAdapter, ResultItem};
pub use storage::{ProgressStore, ResultRecord, ResultStore, SqliteStore};
pub use sweep::{Orchestrator, RunOutcome, RunSummary};
