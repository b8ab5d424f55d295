//! Integration tests for the sweep orchestrator
//!
//! These tests drive the full control loop against an in-memory store and a
//! scripted mock provider, checking the durable-resume and dedup behavior
//! end-to-end.

use async_trait::async_trait;
use stalesweep::config::SweepConfig;
use stalesweep::provider::{AdapterError, ProviderAdapter, ResultItem};
use stalesweep::storage::{ProgressStore, ResultRecord, ResultStore, SqliteStore};
use stalesweep::sweep::{Orchestrator, RunOutcome};
use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex};

/// What the mock should do when feedback is submitted for a URL
#[derive(Clone, Copy)]
enum FeedbackScript {
    Accept,
    Reject,
    Fail,
}

/// Shared record of every adapter call the orchestrator made
#[derive(Default)]
struct CallLog {
    ensure_session: u32,
    search: Vec<String>,
    list_results: u32,
    check_live: Vec<String>,
    submit_feedback: Vec<String>,
}

/// Scripted provider adapter for orchestrator tests
struct MockProvider {
    id: String,
    pages: Vec<Vec<ResultItem>>,
    page: usize,
    expired: HashSet<String>,
    feedback: HashMap<String, FeedbackScript>,
    session_failures: u32,
    fail_search: bool,
    fail_next_page: bool,
    log: Arc<Mutex<CallLog>>,
}

impl MockProvider {
    fn new(id: &str, pages: Vec<Vec<ResultItem>>) -> (Self, Arc<Mutex<CallLog>>) {
        let log = Arc::new(Mutex::new(CallLog::default()));
        let provider = Self {
            id: id.to_string(),
            pages,
            page: 0,
            expired: HashSet::new(),
            feedback: HashMap::new(),
            session_failures: 0,
            fail_search: false,
            fail_next_page: false,
            log: Arc::clone(&log),
        };
        (provider, log)
    }

    fn with_expired(mut self, url: &str) -> Self {
        self.expired.insert(url.to_string());
        self
    }

    fn with_feedback(mut self, url: &str, script: FeedbackScript) -> Self {
        self.feedback.insert(url.to_string(), script);
        self
    }

    fn with_session_failures(mut self, count: u32) -> Self {
        self.session_failures = count;
        self
    }

    fn with_failing_search(mut self) -> Self {
        self.fail_search = true;
        self
    }

    fn with_failing_next_page(mut self) -> Self {
        self.fail_next_page = true;
        self
    }
}

#[async_trait]
impl ProviderAdapter for MockProvider {
    fn id(&self) -> &str {
        &self.id
    }

    async fn ensure_session(&mut self) -> Result<(), AdapterError> {
        self.log.lock().unwrap().ensure_session += 1;
        if self.session_failures > 0 {
            self.session_failures -= 1;
            return Err(AdapterError::Session("login wait expired".to_string()));
        }
        Ok(())
    }

    async fn search(&mut self, keyword: &str) -> Result<(), AdapterError> {
        self.log.lock().unwrap().search.push(keyword.to_string());
        if self.fail_search {
            return Err(AdapterError::Fatal("search endpoint broken".to_string()));
        }
        self.page = 0;
        Ok(())
    }

    async fn list_results(&mut self) -> Vec<ResultItem> {
        self.log.lock().unwrap().list_results += 1;
        self.pages.get(self.page).cloned().unwrap_or_default()
    }

    async fn check_live(&mut self, url: &str) -> Result<bool, AdapterError> {
        self.log.lock().unwrap().check_live.push(url.to_string());
        Ok(self.expired.contains(url))
    }

    async fn submit_feedback(&mut self, item: &ResultItem) -> Result<bool, AdapterError> {
        self.log
            .lock()
            .unwrap()
            .submit_feedback
            .push(item.url.clone());
        match self
            .feedback
            .get(&item.url)
            .copied()
            .unwrap_or(FeedbackScript::Accept)
        {
            FeedbackScript::Accept => Ok(true),
            FeedbackScript::Reject => Ok(false),
            FeedbackScript::Fail => Err(AdapterError::Fatal("form workflow broke".to_string())),
        }
    }

    async fn next_page(&mut self) -> Result<bool, AdapterError> {
        if self.fail_next_page {
            return Err(AdapterError::Fatal("listing endpoint broke".to_string()));
        }
        if self.page + 1 < self.pages.len() {
            self.page += 1;
            Ok(true)
        } else {
            Ok(false)
        }
    }

    fn current_page(&self) -> u32 {
        self.page as u32 + 1
    }
}

fn item(title: &str, url: &str) -> ResultItem {
    ResultItem {
        title: title.to_string(),
        url: url.to_string(),
    }
}

fn sweep_config(keywords: &[&str], providers: &[&str], max_pages: u32) -> SweepConfig {
    SweepConfig {
        keywords: keywords.iter().map(|s| s.to_string()).collect(),
        providers: providers.iter().map(|s| s.to_string()).collect(),
        max_pages,
        max_failures: 3,
    }
}

fn test_store() -> SqliteStore {
    SqliteStore::new_in_memory().expect("Failed to create in-memory store")
}

#[tokio::test]
async fn test_single_pair_completes_and_persists_verdicts() {
    let store = test_store();
    let pages = vec![
        vec![item("Live page", "http://site.test/a"), item("Gone page", "http://site.test/b")],
        vec![],
    ];
    let (provider, log) = MockProvider::new("p1", pages);
    let provider = provider.with_expired("http://site.test/b");

    let sweep = sweep_config(&["foo"], &["p1"], 2);
    let mut orchestrator = Orchestrator::new(store.clone(), vec![Box::new(provider)], &sweep);

    let outcome = orchestrator.run().await.expect("run failed");
    let summary = match outcome {
        RunOutcome::Completed(summary) => summary,
        other => panic!("Expected completion, got {:?}", other),
    };

    assert_eq!(summary.pairs_completed, 1);
    assert_eq!(summary.items_checked, 2);
    assert_eq!(summary.expired_found, 1);
    assert_eq!(summary.feedback_submitted, 1);

    // Page 1 listed, page 2 empty: two listings total, feedback only for b
    let log = log.lock().unwrap();
    assert_eq!(log.list_results, 2);
    assert_eq!(log.submit_feedback, vec!["http://site.test/b".to_string()]);

    assert!(store.is_done("foo", "p1"));
    let live = store
        .find_settled("p1", "http://site.test/a")
        .expect("live record missing");
    assert!(!live.is_expired);
    let gone = store
        .find_settled("p1", "http://site.test/b")
        .expect("expired record missing");
    assert!(gone.is_expired);
}

#[tokio::test]
async fn test_settled_urls_are_never_probed_again() {
    let store = test_store();
    store
        .save(&ResultRecord::new(
            "foo",
            "p1",
            "http://site.test/a",
            "Old verdict",
            false,
        ))
        .expect("seed failed");

    let pages = vec![
        vec![item("Old verdict", "http://site.test/a"), item("New page", "http://site.test/c")],
        vec![],
    ];
    let (provider, log) = MockProvider::new("p1", pages);

    let sweep = sweep_config(&["foo"], &["p1"], 2);
    let mut orchestrator = Orchestrator::new(store.clone(), vec![Box::new(provider)], &sweep);

    let outcome = orchestrator.run().await.expect("run failed");
    let summary = match outcome {
        RunOutcome::Completed(summary) => summary,
        other => panic!("Expected completion, got {:?}", other),
    };

    assert_eq!(summary.items_deduped, 1);
    assert_eq!(summary.items_checked, 1);

    // Only the new URL was probed
    let log = log.lock().unwrap();
    assert_eq!(log.check_live, vec!["http://site.test/c".to_string()]);
    assert!(log.submit_feedback.is_empty());
}

#[tokio::test]
async fn test_dedup_is_scoped_per_provider() {
    let store = test_store();
    // Settled under provider A only
    store
        .save(&ResultRecord::new(
            "foo",
            "pa",
            "http://shared.test/x",
            "Shared page",
            false,
        ))
        .expect("seed failed");

    let pages = vec![vec![item("Shared page", "http://shared.test/x")], vec![]];
    let (provider, log) = MockProvider::new("pb", pages);

    let sweep = sweep_config(&["foo"], &["pb"], 2);
    let mut orchestrator = Orchestrator::new(store.clone(), vec![Box::new(provider)], &sweep);

    orchestrator.run().await.expect("run failed");

    // Provider B still has to settle the URL itself
    let log = log.lock().unwrap();
    assert_eq!(log.check_live, vec!["http://shared.test/x".to_string()]);
    assert!(store.find_settled("pb", "http://shared.test/x").is_some());
}

#[tokio::test]
async fn test_distinct_urls_with_shared_title_each_get_a_verdict() {
    let store = test_store();
    // Same keyword, provider, and title as a settled record, but a new URL
    store
        .save(&ResultRecord::new(
            "foo",
            "p1",
            "http://site.test/old",
            "Common Title",
            true,
        ))
        .expect("seed failed");

    let pages = vec![
        vec![item("Common Title", "http://other-site.test/new")],
        vec![],
    ];
    let (provider, log) = MockProvider::new("p1", pages);

    let sweep = sweep_config(&["foo"], &["p1"], 2);
    let mut orchestrator = Orchestrator::new(store.clone(), vec![Box::new(provider)], &sweep);

    let outcome = orchestrator.run().await.expect("run failed");
    let summary = match outcome {
        RunOutcome::Completed(summary) => summary,
        other => panic!("Expected completion, got {:?}", other),
    };

    // The unseen URL is probed and settled in its own right
    assert_eq!(summary.items_deduped, 0);
    assert_eq!(
        log.lock().unwrap().check_live,
        vec!["http://other-site.test/new".to_string()]
    );
    assert!(store
        .find_settled("p1", "http://other-site.test/new")
        .is_some());
}

#[tokio::test]
async fn test_title_lookup_covers_items_without_usable_urls() {
    let store = test_store();
    store
        .save(&ResultRecord::new("foo", "p1", "", "Orphan Doc", true))
        .expect("seed failed");

    let pages = vec![vec![item("Orphan Doc", "")], vec![]];
    let (provider, log) = MockProvider::new("p1", pages);

    let sweep = sweep_config(&["foo"], &["p1"], 2);
    let mut orchestrator = Orchestrator::new(store.clone(), vec![Box::new(provider)], &sweep);

    let outcome = orchestrator.run().await.expect("run failed");
    let summary = match outcome {
        RunOutcome::Completed(summary) => summary,
        other => panic!("Expected completion, got {:?}", other),
    };

    // No URL to key on, so the settled title is the dedup evidence
    assert_eq!(summary.items_deduped, 1);
    assert!(log.lock().unwrap().check_live.is_empty());
}

#[tokio::test]
async fn test_completion_requires_exhausted_listings() {
    let store = test_store();
    let pages = vec![
        vec![item("One", "http://site.test/1")],
        vec![item("Two", "http://site.test/2")],
        vec![item("Three", "http://site.test/3")],
        vec![],
    ];
    let (provider, log) = MockProvider::new("p1", pages);

    let sweep = sweep_config(&["foo"], &["p1"], 10);
    let mut orchestrator = Orchestrator::new(store.clone(), vec![Box::new(provider)], &sweep);

    orchestrator.run().await.expect("run failed");

    // Three populated pages plus the empty one that proves exhaustion
    let log = log.lock().unwrap();
    assert_eq!(log.list_results, 4);
    assert_eq!(log.check_live.len(), 3);
    assert!(store.is_done("foo", "p1"));
}

#[tokio::test]
async fn test_page_budget_bounds_the_walk() {
    let store = test_store();
    // Endless listings: the budget has to cut the pair off
    let pages = vec![
        vec![item("One", "http://site.test/1")],
        vec![item("Two", "http://site.test/2")],
        vec![item("Three", "http://site.test/3")],
        vec![item("Four", "http://site.test/4")],
    ];
    let (provider, log) = MockProvider::new("p1", pages);

    let sweep = sweep_config(&["foo"], &["p1"], 2);
    let mut orchestrator = Orchestrator::new(store.clone(), vec![Box::new(provider)], &sweep);

    let outcome = orchestrator.run().await.expect("run failed");
    assert!(matches!(outcome, RunOutcome::Completed(_)));

    let log = log.lock().unwrap();
    assert_eq!(log.list_results, 2);
    assert!(store.is_done("foo", "p1"));
}

#[tokio::test]
async fn test_failed_page_advance_leaves_pair_pending() {
    let store = test_store();
    // More listings exist, but advancing to them fails
    let pages = vec![
        vec![item("One", "http://site.test/1")],
        vec![item("Two", "http://site.test/2")],
    ];
    let (provider, log) = MockProvider::new("p1", pages);
    let provider = provider.with_failing_next_page();

    let sweep = sweep_config(&["foo"], &["p1"], 5);
    let mut orchestrator = Orchestrator::new(store.clone(), vec![Box::new(provider)], &sweep);

    let outcome = orchestrator.run().await.expect("run failed");
    match outcome {
        RunOutcome::Completed(summary) => {
            assert_eq!(summary.pairs_failed, 1);
            assert_eq!(summary.pairs_completed, 0);
        }
        other => panic!("Expected completion, got {:?}", other),
    }

    // A broken page advance is not exhaustion: the pair stays pending so the
    // unreached pages are retried, while page-1 verdicts are already durable
    assert!(!store.is_done("foo", "p1"));
    assert!(store.find_settled("p1", "http://site.test/1").is_some());
    assert_eq!(log.lock().unwrap().list_results, 1);
}

#[tokio::test]
async fn test_fatal_feedback_persists_verdict_then_escalates() {
    let store = test_store();
    let pages = vec![
        vec![
            item("One", "http://site.test/1"),
            item("Two", "http://site.test/2"),
            item("Three", "http://site.test/3"),
        ],
        vec![],
    ];
    let (provider, _log) = MockProvider::new("p1", pages.clone());
    let provider = provider
        .with_expired("http://site.test/2")
        .with_feedback("http://site.test/2", FeedbackScript::Fail);

    let sweep = sweep_config(&["foo"], &["p1"], 2);
    let mut orchestrator = Orchestrator::new(store.clone(), vec![Box::new(provider)], &sweep);

    let outcome = orchestrator.run().await.expect("run failed");
    match outcome {
        RunOutcome::RestartNeeded { keyword, provider, url } => {
            assert_eq!(keyword, "foo");
            assert_eq!(provider, "p1");
            assert_eq!(url, "http://site.test/2");
        }
        other => panic!("Expected restart escalation, got {:?}", other),
    }

    // The verdict was settled before escalating, and the pair stays pending
    let record = store
        .find_settled("p1", "http://site.test/2")
        .expect("verdict not persisted");
    assert!(record.is_expired);
    assert!(!store.is_done("foo", "p1"));

    // Simulated restart: a fresh orchestrator over the same store resumes,
    // skips the settled URL, and finishes the pair
    let (provider, log) = MockProvider::new("p1", pages);
    let provider = provider.with_expired("http://site.test/2");
    let mut orchestrator = Orchestrator::new(store.clone(), vec![Box::new(provider)], &sweep);

    let outcome = orchestrator.run().await.expect("resumed run failed");
    assert!(matches!(outcome, RunOutcome::Completed(_)));

    let log = log.lock().unwrap();
    assert!(!log.check_live.contains(&"http://site.test/2".to_string()));
    assert!(log.check_live.contains(&"http://site.test/3".to_string()));
    assert!(log.submit_feedback.is_empty());
    assert!(store.is_done("foo", "p1"));
}

#[tokio::test]
async fn test_quota_rejection_settles_and_continues() {
    let store = test_store();
    let pages = vec![
        vec![
            item("Gone", "http://site.test/gone"),
            item("Live", "http://site.test/live"),
        ],
        vec![],
    ];
    let (provider, log) = MockProvider::new("p1", pages);
    let provider = provider
        .with_expired("http://site.test/gone")
        .with_feedback("http://site.test/gone", FeedbackScript::Reject);

    let sweep = sweep_config(&["foo"], &["p1"], 2);
    let mut orchestrator = Orchestrator::new(store.clone(), vec![Box::new(provider)], &sweep);

    let outcome = orchestrator.run().await.expect("run failed");
    let summary = match outcome {
        RunOutcome::Completed(summary) => summary,
        other => panic!("Expected completion, got {:?}", other),
    };

    assert_eq!(summary.feedback_rejected, 1);
    assert_eq!(summary.feedback_submitted, 0);

    // The rejected item is still settled so the quota is never burned on it
    // again, and the sweep moved on to the rest of the page
    let record = store
        .find_settled("p1", "http://site.test/gone")
        .expect("verdict not persisted");
    assert!(record.is_expired);
    assert_eq!(log.lock().unwrap().check_live.len(), 2);
    assert!(store.is_done("foo", "p1"));
}

#[tokio::test]
async fn test_session_unavailable_defers_without_counting() {
    let store = test_store();
    let pages = vec![vec![item("One", "http://site.test/1")], vec![]];
    let (provider, log) = MockProvider::new("p1", pages);
    let provider = provider.with_session_failures(1);

    let sweep = sweep_config(&["foo"], &["p1"], 2);
    let mut orchestrator = Orchestrator::new(store.clone(), vec![Box::new(provider)], &sweep);

    // First pass: session never comes up, pair deferred untouched
    let outcome = orchestrator.run().await.expect("run failed");
    match outcome {
        RunOutcome::Completed(summary) => {
            assert_eq!(summary.pairs_deferred, 1);
            assert_eq!(summary.pairs_failed, 0);
            assert_eq!(summary.pairs_poisoned, 0);
        }
        other => panic!("Expected completion, got {:?}", other),
    }
    assert!(!store.is_done("foo", "p1"));
    assert!(log.lock().unwrap().search.is_empty());

    // Second pass on the same orchestrator: session is up now
    let outcome = orchestrator.run().await.expect("second run failed");
    match outcome {
        RunOutcome::Completed(summary) => assert_eq!(summary.pairs_completed, 1),
        other => panic!("Expected completion, got {:?}", other),
    }
    assert!(store.is_done("foo", "p1"));
}

#[tokio::test]
async fn test_repeated_failures_poison_the_pair() {
    let store = test_store();
    let (provider, log) = MockProvider::new("p1", vec![]);
    let provider = provider.with_failing_search();

    let sweep = sweep_config(&["foo"], &["p1"], 2);
    let mut orchestrator = Orchestrator::new(store.clone(), vec![Box::new(provider)], &sweep);

    // max_failures is 3: two failed passes leave the pair pending
    for attempt in 1..=2 {
        let outcome = orchestrator.run().await.expect("run failed");
        match outcome {
            RunOutcome::Completed(summary) => {
                assert_eq!(summary.pairs_failed, 1, "attempt {}", attempt);
                assert_eq!(summary.pairs_poisoned, 0, "attempt {}", attempt);
            }
            other => panic!("Expected completion, got {:?}", other),
        }
        assert!(!store.is_done("foo", "p1"));
    }

    // Third failure hits the bound: force-completed so it can never stall
    // every future run
    let outcome = orchestrator.run().await.expect("run failed");
    match outcome {
        RunOutcome::Completed(summary) => {
            assert_eq!(summary.pairs_poisoned, 1);
            assert_eq!(summary.pairs_failed, 0);
        }
        other => panic!("Expected completion, got {:?}", other),
    }
    assert!(store.is_done("foo", "p1"));

    // A fourth pass skips the poisoned pair entirely
    let search_calls_before = log.lock().unwrap().search.len();
    let outcome = orchestrator.run().await.expect("run failed");
    match outcome {
        RunOutcome::Completed(summary) => assert_eq!(summary.pairs_skipped, 1),
        other => panic!("Expected completion, got {:?}", other),
    }
    assert_eq!(log.lock().unwrap().search.len(), search_calls_before);
}

#[tokio::test]
async fn test_pairs_iterate_providers_then_keywords() {
    let store = test_store();
    let (pa, log_a) = MockProvider::new("pa", vec![vec![]]);
    let (pb, log_b) = MockProvider::new("pb", vec![vec![]]);

    let sweep = sweep_config(&["k1", "k2"], &["pa", "pb"], 2);
    let mut orchestrator =
        Orchestrator::new(store.clone(), vec![Box::new(pa), Box::new(pb)], &sweep);

    let outcome = orchestrator.run().await.expect("run failed");
    match outcome {
        RunOutcome::Completed(summary) => assert_eq!(summary.pairs_completed, 4),
        other => panic!("Expected completion, got {:?}", other),
    }

    // Each provider saw both keywords, in configured order
    assert_eq!(log_a.lock().unwrap().search, vec!["k1", "k2"]);
    assert_eq!(log_b.lock().unwrap().search, vec!["k1", "k2"]);
    for (keyword, provider) in [("k1", "pa"), ("k2", "pa"), ("k1", "pb"), ("k2", "pb")] {
        assert!(store.is_done(keyword, provider));
    }
}
