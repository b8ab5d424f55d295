//! Sweep orchestrator - main control loop
//!
//! Walks every enabled (keyword, provider) pair in configured order and
//! drives it through one sweep pass:
//! - skip pairs the progress store already marks done
//! - establish the provider session (may wait on a human login)
//! - page through listings up to the configured page budget
//! - dedup each item against the result store before probing liveness
//! - file removal feedback for expired items and persist every verdict
//! - contain failures per pair, force-completing poisoned pairs
//!
//! The orchestrator keeps no authoritative state of its own: after a crash or
//! restart the stores alone determine where work resumes.

use crate::config::{Config, SweepConfig};
use crate::provider::{HttpProvider, ProviderAdapter};
use crate::storage::{ProgressStore, ResultRecord, ResultStore};
use crate::sweep::failure::FailureTracker;
use crate::SweepError;
use url::Url;

/// Counters reported at the end of a sweep pass
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunSummary {
    pub pairs_completed: u64,
    pub pairs_skipped: u64,
    pub pairs_deferred: u64,
    pub pairs_failed: u64,
    pub pairs_poisoned: u64,
    pub items_deduped: u64,
    pub items_checked: u64,
    pub expired_found: u64,
    pub feedback_submitted: u64,
    pub feedback_rejected: u64,
}

/// Result of one full sweep pass
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunOutcome {
    /// Every pair was visited; pairs left pending are retried next run
    Completed(RunSummary),

    /// A feedback submission failed fatally. The verdict was persisted
    /// best-effort; the process must be restarted so the next pass resumes
    /// from durable state and skips the settled URL.
    RestartNeeded {
        keyword: String,
        provider: String,
        url: String,
    },
}

/// Result of processing one (keyword, provider) pair
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PairOutcome {
    /// Progress store already marks the pair done
    AlreadyDone,

    /// Listings exhausted or page budget spent; pair marked done
    Completed,

    /// Session could not be established; pair left pending for the next run
    SessionUnavailable,

    /// Fatal failure below the poison bound; pair left pending
    Failed,

    /// Fatal failure count reached the bound; pair force-completed
    Poisoned,

    /// Fatal feedback failure; escalate a process restart
    RestartNeeded { url: String },
}

/// The sweep control loop over one store and a set of provider adapters
pub struct Orchestrator<S> {
    store: S,
    adapters: Vec<Box<dyn ProviderAdapter>>,
    keywords: Vec<String>,
    max_pages: u32,
    max_failures: u32,
    failures: FailureTracker,
}

impl<S> Orchestrator<S>
where
    S: ProgressStore + ResultStore,
{
    pub fn new(store: S, adapters: Vec<Box<dyn ProviderAdapter>>, sweep: &SweepConfig) -> Self {
        Self {
            store,
            adapters,
            keywords: sweep.keywords.clone(),
            max_pages: sweep.max_pages,
            max_failures: sweep.max_failures,
            failures: FailureTracker::new(),
        }
    }

    /// Runs one full sweep pass over all (keyword, provider) pairs
    pub async fn run(&mut self) -> Result<RunOutcome, SweepError> {
        let mut summary = RunSummary::default();

        for adapter_idx in 0..self.adapters.len() {
            let provider = self.adapters[adapter_idx].id().to_string();

            for keyword_idx in 0..self.keywords.len() {
                let keyword = self.keywords[keyword_idx].clone();

                match self
                    .process_pair(adapter_idx, &keyword, &mut summary)
                    .await?
                {
                    PairOutcome::AlreadyDone => summary.pairs_skipped += 1,
                    PairOutcome::Completed => summary.pairs_completed += 1,
                    PairOutcome::SessionUnavailable => summary.pairs_deferred += 1,
                    PairOutcome::Failed => summary.pairs_failed += 1,
                    PairOutcome::Poisoned => summary.pairs_poisoned += 1,
                    PairOutcome::RestartNeeded { url } => {
                        return Ok(RunOutcome::RestartNeeded {
                            keyword,
                            provider,
                            url,
                        });
                    }
                }
            }
        }

        tracing::info!(
            completed = summary.pairs_completed,
            skipped = summary.pairs_skipped,
            deferred = summary.pairs_deferred,
            failed = summary.pairs_failed,
            poisoned = summary.pairs_poisoned,
            expired = summary.expired_found,
            "sweep pass finished"
        );

        Ok(RunOutcome::Completed(summary))
    }

    /// Drives one (keyword, provider) pair through a sweep pass
    async fn process_pair(
        &mut self,
        adapter_idx: usize,
        keyword: &str,
        summary: &mut RunSummary,
    ) -> Result<PairOutcome, SweepError> {
        let provider = self.adapters[adapter_idx].id().to_string();

        if self.store.is_done(keyword, &provider) {
            tracing::debug!(keyword, provider, "pair already done, skipping");
            return Ok(PairOutcome::AlreadyDone);
        }

        tracing::info!(keyword, provider, "processing pair");

        if let Err(e) = self.adapters[adapter_idx].ensure_session().await {
            if e.is_session() {
                // Deferred, not failed: retried on the next invocation
                // without touching the failure counter
                tracing::warn!(keyword, provider, error = %e, "session unavailable, pair deferred");
                return Ok(PairOutcome::SessionUnavailable);
            }
            return self.note_failure(keyword, &provider, &e.to_string());
        }

        if let Err(e) = self.adapters[adapter_idx].search(keyword).await {
            return self.note_failure(keyword, &provider, &e.to_string());
        }

        let mut page = 1u32;
        loop {
            let items = self.adapters[adapter_idx].list_results().await;
            tracing::debug!(
                keyword,
                provider,
                page = self.adapters[adapter_idx].current_page(),
                items = items.len(),
                "listing page"
            );

            if items.is_empty() {
                // No results left: the pair is exhausted
                break;
            }

            for item in items {
                // Dedup gate, checked before the expensive liveness probe.
                // The (provider, url) key is authoritative; the title lookup
                // stands in only when the listed URL is unusable as a key.
                // Distinct URLs sharing a title each get their own verdict.
                let settled = if url_is_usable_key(&item.url) {
                    self.store.find_settled(&provider, &item.url).is_some()
                } else {
                    self.store
                        .find_by_keyword_title(keyword, &provider, &item.title)
                        .is_some()
                };
                if settled {
                    tracing::debug!(keyword, provider, url = %item.url, "already settled, skipping");
                    summary.items_deduped += 1;
                    continue;
                }

                let is_expired = match self.adapters[adapter_idx].check_live(&item.url).await {
                    Ok(verdict) => verdict,
                    Err(e) => return self.note_failure(keyword, &provider, &e.to_string()),
                };
                summary.items_checked += 1;
                tracing::info!(
                    keyword,
                    provider,
                    url = %item.url,
                    expired = is_expired,
                    "liveness verdict"
                );

                if is_expired {
                    summary.expired_found += 1;
                    match self.adapters[adapter_idx].submit_feedback(&item).await {
                        Ok(true) => summary.feedback_submitted += 1,
                        Ok(false) => {
                            // Recognized provider rejection (quota). The
                            // record below settles the URL, so the submission
                            // is never retried for it.
                            tracing::warn!(keyword, provider, url = %item.url, "feedback rejected, recording verdict anyway");
                            summary.feedback_rejected += 1;
                        }
                        Err(e) => {
                            // Settle the verdict before escalating so the
                            // restarted process skips this exact URL
                            let record =
                                ResultRecord::new(keyword, &provider, &item.url, &item.title, true);
                            if let Err(save_err) = self.store.save(&record) {
                                tracing::error!(
                                    keyword, provider, url = %item.url, error = %save_err,
                                    "failed to persist verdict before restart"
                                );
                            }
                            tracing::error!(
                                keyword, provider, url = %item.url, error = %e,
                                "fatal feedback failure, escalating restart"
                            );
                            return Ok(PairOutcome::RestartNeeded {
                                url: item.url.clone(),
                            });
                        }
                    }
                }

                let record =
                    ResultRecord::new(keyword, &provider, &item.url, &item.title, is_expired);
                if let Err(e) = self.store.save(&record) {
                    // Write failures cannot be swallowed: the verdict would
                    // be lost and the probe repeated forever
                    return self.note_failure(keyword, &provider, &e.to_string());
                }
            }

            if page >= self.max_pages {
                // Page budget spent: treat the pair as exhausted even if more
                // pages nominally exist
                tracing::debug!(keyword, provider, max_pages = self.max_pages, "page budget exhausted");
                break;
            }

            match self.adapters[adapter_idx].next_page().await {
                Ok(true) => page += 1,
                Ok(false) => break,
                // A failed page advance is not exhaustion: the pair stays
                // pending so the remaining pages are retried next run
                Err(e) => return self.note_failure(keyword, &provider, &e.to_string()),
            }
        }

        self.store.mark_done(keyword, &provider, true)?;
        tracing::info!(keyword, provider, "pair completed");
        Ok(PairOutcome::Completed)
    }

    /// Records a fatal failure; force-completes the pair at the bound
    fn note_failure(
        &mut self,
        keyword: &str,
        provider: &str,
        reason: &str,
    ) -> Result<PairOutcome, SweepError> {
        let count = self.failures.record(keyword, provider);

        if count >= self.max_failures {
            tracing::warn!(
                keyword,
                provider,
                failures = count,
                reason,
                "pair poisoned, forcing completion; operator review required"
            );
            self.store.mark_done(keyword, provider, true)?;
            Ok(PairOutcome::Poisoned)
        } else {
            tracing::warn!(
                keyword,
                provider,
                failures = count,
                max_failures = self.max_failures,
                reason,
                "pair failed, left pending for next run"
            );
            Ok(PairOutcome::Failed)
        }
    }
}

/// Whether a listed URL can serve as the settlement key
fn url_is_usable_key(url: &str) -> bool {
    !url.trim().is_empty() && Url::parse(url).is_ok()
}

/// Builds one HTTP adapter per enabled provider, in configured order
pub fn build_adapters(config: &Config) -> Result<Vec<Box<dyn ProviderAdapter>>, SweepError> {
    let mut adapters: Vec<Box<dyn ProviderAdapter>> = Vec::new();

    for id in &config.sweep.providers {
        let provider_cfg = config
            .provider(id)
            .ok_or_else(|| SweepError::UnknownProvider(id.clone()))?;
        let adapter = HttpProvider::new(
            provider_cfg.clone(),
            config.feedback.clone(),
            config.timeouts.clone(),
        )?;
        adapters.push(Box::new(adapter));
    }

    Ok(adapters)
}
