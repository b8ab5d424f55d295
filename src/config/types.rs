use serde::Deserialize;
use std::time::Duration;

/// Main configuration structure for stalesweep
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub sweep: SweepConfig,
    #[serde(default)]
    pub timeouts: TimeoutConfig,
    pub storage: StorageConfig,
    pub feedback: FeedbackConfig,
    #[serde(default, rename = "provider")]
    pub providers: Vec<ProviderConfig>,
}

impl Config {
    /// Looks up a provider definition by its id
    pub fn provider(&self, id: &str) -> Option<&ProviderConfig> {
        self.providers.iter().find(|p| p.id == id)
    }
}

/// Sweep behavior configuration
#[derive(Debug, Clone, Deserialize)]
pub struct SweepConfig {
    /// Keywords to sweep, in processing order
    pub keywords: Vec<String>,

    /// Enabled provider ids, in processing order
    pub providers: Vec<String>,

    /// Maximum result pages to visit per (keyword, provider) pair
    #[serde(rename = "max-pages")]
    pub max_pages: u32,

    /// Fatal failures tolerated per pair before it is force-completed
    #[serde(rename = "max-failures")]
    pub max_failures: u32,
}

/// Upper bounds on the slow adapter operations
#[derive(Debug, Clone, Deserialize)]
pub struct TimeoutConfig {
    /// Liveness probe bound (seconds)
    #[serde(rename = "liveness-secs")]
    pub liveness_secs: u64,

    /// Feedback verification wait bound (seconds)
    #[serde(rename = "feedback-secs")]
    pub feedback_secs: u64,

    /// Session login wait bound (seconds); deliberately long, a human may
    /// need to complete the login
    #[serde(rename = "session-login-secs")]
    pub session_login_secs: u64,

    /// Interval between polls while waiting on human-timescale steps
    #[serde(rename = "poll-interval-ms")]
    pub poll_interval_ms: u64,
}

impl TimeoutConfig {
    pub fn liveness(&self) -> Duration {
        Duration::from_secs(self.liveness_secs)
    }

    pub fn feedback(&self) -> Duration {
        Duration::from_secs(self.feedback_secs)
    }

    pub fn session_login(&self) -> Duration {
        Duration::from_secs(self.session_login_secs)
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self {
            liveness_secs: 10,
            feedback_secs: 120,
            session_login_secs: 300,
            poll_interval_ms: 1000,
        }
    }
}

/// Storage configuration
#[derive(Debug, Clone, Deserialize)]
pub struct StorageConfig {
    /// Path to the SQLite database file
    #[serde(rename = "database-path")]
    pub database_path: String,
}

/// Content filled into provider removal-feedback forms
#[derive(Debug, Clone, Deserialize)]
pub struct FeedbackConfig {
    /// Free-text reason submitted with each report
    pub description: String,

    /// Contact email submitted with each report
    #[serde(rename = "contact-email")]
    pub contact_email: String,
}

/// One external content provider
#[derive(Debug, Clone, Deserialize)]
pub struct ProviderConfig {
    /// Opaque provider identifier, referenced from `sweep.providers`
    pub id: String,

    /// Search listing URL template with `{keyword}` and `{page}` placeholders
    #[serde(rename = "search-url")]
    pub search_url: String,

    /// Removal-feedback submission endpoint
    #[serde(rename = "feedback-url")]
    pub feedback_url: String,

    /// Session readiness endpoint; omit for providers without login
    #[serde(rename = "session-url")]
    pub session_url: Option<String>,

    /// Body substrings that mark a result page as expired (matched
    /// case-insensitively)
    #[serde(default, rename = "expired-markers")]
    pub expired_markers: Vec<String>,
}
