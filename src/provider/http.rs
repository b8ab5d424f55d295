//! HTTP provider adapter
//!
//! Config-driven implementation of the adapter contract over plain HTTP:
//! search listings are JSON, liveness is probed with bounded manual redirect
//! handling plus expired-marker matching, and the removal-feedback workflow
//! is a form POST with an optional verification poll. Session readiness is
//! polled against a provider endpoint, bounded by the login timeout, since a
//! human may need to finish the login in the meantime.

use crate::config::{FeedbackConfig, ProviderConfig, TimeoutConfig};
use crate::provider::poll::{poll_until, Clock, SystemClock};
use crate::provider::{retrying, AdapterError, ProviderAdapter, ResultItem};
use async_trait::async_trait;
use reqwest::{redirect::Policy, Client, StatusCode};
use serde::Deserialize;
use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;
use url::Url;

/// Retries for short-lived network failures before they become fatal
const TRANSIENT_ATTEMPTS: u32 = 3;

/// Redirect hops followed before a probe is treated as bounced
const MAX_REDIRECT_HOPS: u32 = 5;

/// One page of a provider's listing response
#[derive(Debug, Deserialize)]
struct ListingPage {
    #[serde(default)]
    items: Vec<ListingItem>,
    #[serde(default)]
    has_next: bool,
}

#[derive(Debug, Deserialize)]
struct ListingItem {
    title: String,
    url: String,
}

/// HTTP-backed provider adapter
pub struct HttpProvider {
    cfg: ProviderConfig,
    feedback: FeedbackConfig,
    timeouts: TimeoutConfig,
    client: Client,
    clock: Arc<dyn Clock>,
    keyword: Option<String>,
    page: u32,
    items: Vec<ResultItem>,
    has_next: bool,
}

impl HttpProvider {
    pub fn new(
        cfg: ProviderConfig,
        feedback: FeedbackConfig,
        timeouts: TimeoutConfig,
    ) -> Result<Self, reqwest::Error> {
        let client = build_http_client(&timeouts)?;
        Ok(Self {
            cfg,
            feedback,
            timeouts,
            client,
            clock: Arc::new(SystemClock),
            keyword: None,
            page: 1,
            items: Vec::new(),
            has_next: false,
        })
    }

    /// Substitutes the clock, for tests that simulate long waits
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    fn listing_url(&self, keyword: &str, page: u32) -> String {
        let encoded: String = url::form_urlencoded::byte_serialize(keyword.as_bytes()).collect();
        self.cfg
            .search_url
            .replace("{keyword}", &encoded)
            .replace("{page}", &page.to_string())
    }

    /// Fetches one listing page, filtering duplicate titles
    async fn fetch_listing(&mut self, page: u32) -> Result<(), AdapterError> {
        let keyword = self
            .keyword
            .clone()
            .ok_or_else(|| AdapterError::Fatal("listing fetched before search".to_string()))?;
        let url = self.listing_url(&keyword, page);

        let listing: ListingPage = retrying(TRANSIENT_ATTEMPTS, || {
            let client = self.client.clone();
            let url = url.clone();
            async move {
                let response = client.get(&url).send().await.map_err(classify_request_error)?;

                let status = response.status();
                if status.is_server_error() || status == StatusCode::TOO_MANY_REQUESTS {
                    return Err(AdapterError::Transient(format!("listing HTTP {}", status)));
                }
                if !status.is_success() {
                    return Err(AdapterError::Fatal(format!("listing HTTP {}", status)));
                }

                response
                    .json::<ListingPage>()
                    .await
                    .map_err(|e| AdapterError::Fatal(format!("malformed listing: {}", e)))
            }
        })
        .await?;

        // Provider listings may repeat entries; keep the first of each title
        let mut seen = HashSet::new();
        self.items = listing
            .items
            .into_iter()
            .filter(|item| seen.insert(item.title.clone()))
            .map(|item| ResultItem {
                title: item.title,
                url: item.url,
            })
            .collect();
        self.has_next = listing.has_next;
        self.page = page;

        tracing::debug!(
            provider = %self.cfg.id,
            page,
            items = self.items.len(),
            has_next = self.has_next,
            "fetched listing page"
        );

        Ok(())
    }

    /// Matches the page body against the configured expiry signatures
    fn body_is_expired(&self, body: &str) -> bool {
        let body_lower = body.to_lowercase();
        self.cfg
            .expired_markers
            .iter()
            .any(|marker| body_lower.contains(&marker.trim().to_lowercase()))
    }

    /// Probes one URL, following same-host redirects manually
    async fn probe_expired(&self, url: &str) -> Result<bool, AdapterError> {
        let origin = Url::parse(url)
            .map_err(|e| AdapterError::Fatal(format!("unparseable result URL {}: {}", url, e)))?;
        let origin_host = origin.host_str().unwrap_or_default().to_string();

        let mut current = origin;
        for _hop in 0..MAX_REDIRECT_HOPS {
            let response = self
                .client
                .get(current.clone())
                .send()
                .await
                .map_err(classify_request_error)?;

            let status = response.status();

            if status.is_redirection() {
                let location = response
                    .headers()
                    .get("location")
                    .and_then(|v| v.to_str().ok())
                    .ok_or_else(|| {
                        AdapterError::Fatal(format!("redirect without location from {}", current))
                    })?;
                let next = current.join(location).map_err(|e| {
                    AdapterError::Fatal(format!("bad redirect target {}: {}", location, e))
                })?;

                // Dead links get bounced off their host to a provider or
                // portal landing page
                if next.host_str().unwrap_or_default() != origin_host {
                    tracing::debug!(url, target = %next, "redirected off origin host");
                    return Ok(true);
                }

                current = next;
                continue;
            }

            if status == StatusCode::NOT_FOUND || status == StatusCode::GONE {
                return Ok(true);
            }

            if status.is_server_error() {
                return Err(AdapterError::Transient(format!("probe HTTP {}", status)));
            }

            let body = response
                .text()
                .await
                .map_err(|e| AdapterError::Transient(format!("probe body read: {}", e)))?;

            return Ok(self.body_is_expired(&body));
        }

        // A chain this long is bounce behavior, not a live page
        tracing::debug!(url, hops = MAX_REDIRECT_HOPS, "redirect chain exhausted");
        Ok(true)
    }

    /// Polls a verification status endpoint until it reports completion
    async fn await_verification(&self, status_url: Url) -> Result<bool, AdapterError> {
        let client = self.client.clone();
        poll_until(
            self.clock.as_ref(),
            self.timeouts.poll_interval(),
            self.timeouts.feedback(),
            || {
                let client = client.clone();
                let status_url = status_url.clone();
                async move {
                    match client.get(status_url).send().await {
                        Ok(response) => Ok(response.status() == StatusCode::OK),
                        // Keep waiting through hiccups; the outer bound holds
                        Err(e) => {
                            tracing::debug!(error = %e, "verification poll failed");
                            Ok(false)
                        }
                    }
                }
            },
        )
        .await
    }
}

#[async_trait]
impl ProviderAdapter for HttpProvider {
    fn id(&self) -> &str {
        &self.cfg.id
    }

    async fn ensure_session(&mut self) -> Result<(), AdapterError> {
        let Some(session_url) = self.cfg.session_url.clone() else {
            return Ok(());
        };

        let client = self.client.clone();
        let ready = poll_until(
            self.clock.as_ref(),
            self.timeouts.poll_interval(),
            self.timeouts.session_login(),
            || {
                let client = client.clone();
                let session_url = session_url.clone();
                async move {
                    match client.get(&session_url).send().await {
                        Ok(response) => Ok(response.status() == StatusCode::OK),
                        Err(e) => {
                            tracing::debug!(error = %e, "session poll failed");
                            Ok(false)
                        }
                    }
                }
            },
        )
        .await?;

        if ready {
            Ok(())
        } else {
            Err(AdapterError::Session(format!(
                "login not completed within {:?}",
                self.timeouts.session_login()
            )))
        }
    }

    async fn search(&mut self, keyword: &str) -> Result<(), AdapterError> {
        self.keyword = Some(keyword.to_string());
        self.fetch_listing(1).await
    }

    async fn list_results(&mut self) -> Vec<ResultItem> {
        self.items.clone()
    }

    async fn check_live(&mut self, url: &str) -> Result<bool, AdapterError> {
        let mut last = String::new();
        for attempt in 1..=TRANSIENT_ATTEMPTS {
            match self.probe_expired(url).await {
                Ok(expired) => return Ok(expired),
                Err(AdapterError::Transient(reason)) => {
                    tracing::debug!(attempt, url, %reason, "transient probe failure, retrying");
                    last = reason;
                }
                Err(other) => return Err(other),
            }
        }
        Err(AdapterError::Fatal(format!(
            "liveness probe failed after {} attempts: {}",
            TRANSIENT_ATTEMPTS, last
        )))
    }

    async fn submit_feedback(&mut self, item: &ResultItem) -> Result<bool, AdapterError> {
        let form = [
            ("url", item.url.as_str()),
            ("title", item.title.as_str()),
            ("reason", self.feedback.description.as_str()),
            ("contact", self.feedback.contact_email.as_str()),
        ];

        let response = retrying(TRANSIENT_ATTEMPTS, || {
            let client = self.client.clone();
            let feedback_url = self.cfg.feedback_url.clone();
            async move {
                let response = client
                    .post(&feedback_url)
                    .form(&form)
                    .send()
                    .await
                    .map_err(classify_request_error)?;

                if response.status().is_server_error() {
                    return Err(AdapterError::Transient(format!(
                        "feedback HTTP {}",
                        response.status()
                    )));
                }
                Ok(response)
            }
        })
        .await?;

        match response.status() {
            StatusCode::OK | StatusCode::CREATED | StatusCode::NO_CONTENT => Ok(true),

            // Submission accepted, verification pending: wait on the status
            // endpoint the provider points us at
            StatusCode::ACCEPTED => {
                let base = Url::parse(&self.cfg.feedback_url)
                    .map_err(|e| AdapterError::Fatal(format!("bad feedback-url: {}", e)))?;
                let status_url = match response
                    .headers()
                    .get("location")
                    .and_then(|v| v.to_str().ok())
                {
                    Some(location) => base.join(location).map_err(|e| {
                        AdapterError::Fatal(format!("bad verification target: {}", e))
                    })?,
                    // No pointer to a verification step; take the acceptance
                    None => return Ok(true),
                };

                if self.await_verification(status_url).await? {
                    Ok(true)
                } else {
                    Err(AdapterError::Fatal(format!(
                        "feedback verification not completed within {:?}",
                        self.timeouts.feedback()
                    )))
                }
            }

            // Recognized non-retryable rejection (daily quota and the like)
            StatusCode::TOO_MANY_REQUESTS => {
                tracing::warn!(provider = %self.cfg.id, url = %item.url, "feedback rejected by provider quota");
                Ok(false)
            }

            other => Err(AdapterError::Fatal(format!("feedback HTTP {}", other))),
        }
    }

    async fn next_page(&mut self) -> Result<bool, AdapterError> {
        if !self.has_next {
            return Ok(false);
        }

        let next = self.page + 1;
        self.fetch_listing(next).await?;
        Ok(true)
    }

    fn current_page(&self) -> u32 {
        self.page
    }
}

/// Builds the HTTP client all adapter operations share
pub fn build_http_client(timeouts: &TimeoutConfig) -> Result<Client, reqwest::Error> {
    Client::builder()
        .user_agent(concat!("stalesweep/", env!("CARGO_PKG_VERSION")))
        .timeout(timeouts.liveness())
        .connect_timeout(Duration::from_secs(10))
        .redirect(Policy::none()) // Handle redirects manually
        .gzip(true)
        .brotli(true)
        .build()
}

/// Maps low-level client errors into the adapter taxonomy
fn classify_request_error(e: reqwest::Error) -> AdapterError {
    if e.is_timeout() || e.is_connect() {
        AdapterError::Transient(e.to_string())
    } else {
        AdapterError::Fatal(e.to_string())
    }
}
