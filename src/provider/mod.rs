//! Provider adapter boundary
//!
//! Each external content provider is driven through the `ProviderAdapter`
//! trait. The orchestrator never sees provider-specific mechanics; it only
//! consumes item lists and yes/no answers. Adapters own their transient-error
//! retries and surface only session and fatal failures.

mod http;
mod poll;

pub use http::HttpProvider;
pub use poll::{poll_until, Clock, ManualClock, SystemClock};

use async_trait::async_trait;
use thiserror::Error;

/// Errors surfaced at the adapter boundary
#[derive(Debug, Error)]
pub enum AdapterError {
    /// Session could not be established within the login wait bound.
    /// Recovered locally: the pair is skipped for this run and retried on the
    /// next invocation.
    #[error("session unavailable: {0}")]
    Session(String),

    /// Short-lived failure (timeout, connection hiccup). Retried inside the
    /// adapter; never surfaces to the orchestrator directly.
    #[error("transient failure: {0}")]
    Transient(String),

    /// Unexpected failure after the adapter's own retries are exhausted
    #[error("fatal failure: {0}")]
    Fatal(String),
}

impl AdapterError {
    pub fn is_fatal(&self) -> bool {
        matches!(self, Self::Fatal(_))
    }

    pub fn is_session(&self) -> bool {
        matches!(self, Self::Session(_))
    }
}

/// One entry from a provider's result listing
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResultItem {
    pub title: String,
    pub url: String,
}

/// Capability set one provider exposes to the orchestrator
///
/// Implementations hide all provider mechanics (sessions, pagination state,
/// form workflows) behind these operations. Any of them may take a long time:
/// `ensure_session` in particular may wait minutes for a human to complete a
/// login or verification step.
#[async_trait]
pub trait ProviderAdapter: Send {
    /// Opaque provider identifier, matching the configuration
    fn id(&self) -> &str;

    /// Establishes a usable session, waiting up to the configured login bound
    async fn ensure_session(&mut self) -> Result<(), AdapterError>;

    /// Issues the initial query for a keyword and resets pagination
    async fn search(&mut self, keyword: &str) -> Result<(), AdapterError>;

    /// Returns the current page's items
    ///
    /// Pure read. Duplicate titles within one call are filtered before
    /// returning, since provider listings may repeat entries.
    async fn list_results(&mut self) -> Vec<ResultItem>;

    /// Probes a result URL; returns `true` when the page is expired
    async fn check_live(&mut self, url: &str) -> Result<bool, AdapterError>;

    /// Drives the provider's removal workflow for one expired item
    ///
    /// Returns `Ok(false)` on a recognized non-retryable provider rejection
    /// (for example a daily quota); `Err(Fatal)` on unexpected failure.
    async fn submit_feedback(&mut self, item: &ResultItem) -> Result<bool, AdapterError>;

    /// Advances pagination; `Ok(false)` when no further page exists
    ///
    /// A failure while fetching the next page is an error, never an
    /// end-of-listing signal: only an explicit empty or absent page may end
    /// the walk.
    async fn next_page(&mut self) -> Result<bool, AdapterError>;

    /// Best-effort page index for diagnostics only; resume state lives in the
    /// progress store, not in page counters
    fn current_page(&self) -> u32;
}

/// Runs an operation with a bounded retry loop over transient failures
///
/// Session and fatal errors pass through untouched; a transient error that
/// survives `attempts` tries is promoted to `Fatal`.
pub async fn retrying<T, F, Fut>(attempts: u32, mut op: F) -> Result<T, AdapterError>
where
    F: FnMut() -> Fut,
    Fut: std::future::Future<Output = Result<T, AdapterError>>,
{
    let mut last = String::new();
    for attempt in 1..=attempts {
        match op().await {
            Ok(value) => return Ok(value),
            Err(AdapterError::Transient(reason)) => {
                tracing::debug!(attempt, attempts, %reason, "transient failure, retrying");
                last = reason;
            }
            Err(other) => return Err(other),
        }
    }
    Err(AdapterError::Fatal(format!(
        "transient failure persisted after {} attempts: {}",
        attempts, last
    )))
}
