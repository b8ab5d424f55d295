//! Bounded polling for human-timescale waits
//!
//! Login and verification steps can take minutes and complete at an
//! unpredictable moment. Adapters wait for them with a bounded poll loop over
//! an injectable clock, so tests can simulate "never completes" and
//! "completes after N polls" without real delays.

use crate::provider::AdapterError;
use async_trait::async_trait;
use std::future::Future;
use std::sync::Mutex;
use std::time::{Duration, Instant};

/// Time source for poll loops
#[async_trait]
pub trait Clock: Send + Sync {
    fn now(&self) -> Instant;
    async fn sleep(&self, duration: Duration);
}

/// Wall-clock implementation backed by tokio timers
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

#[async_trait]
impl Clock for SystemClock {
    fn now(&self) -> Instant {
        Instant::now()
    }

    async fn sleep(&self, duration: Duration) {
        tokio::time::sleep(duration).await;
    }
}

/// Polls `probe` every `interval` until it reports completion or `timeout`
/// elapses
///
/// Returns `Ok(true)` on completion within the bound, `Ok(false)` on timeout.
/// Probe errors abort the wait immediately.
pub async fn poll_until<C, F, Fut>(
    clock: &C,
    interval: Duration,
    timeout: Duration,
    mut probe: F,
) -> Result<bool, AdapterError>
where
    C: Clock + ?Sized,
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<bool, AdapterError>>,
{
    let start = clock.now();

    loop {
        if probe().await? {
            return Ok(true);
        }

        if clock.now().duration_since(start) + interval > timeout {
            return Ok(false);
        }

        clock.sleep(interval).await;
    }
}

/// Deterministic clock for tests: `sleep` advances simulated time instantly
#[derive(Debug)]
pub struct ManualClock {
    origin: Instant,
    elapsed: Mutex<Duration>,
}

impl ManualClock {
    pub fn new() -> Self {
        Self {
            origin: Instant::now(),
            elapsed: Mutex::new(Duration::ZERO),
        }
    }
}

impl Default for ManualClock {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Clock for ManualClock {
    fn now(&self) -> Instant {
        self.origin + *self.elapsed.lock().unwrap()
    }

    async fn sleep(&self, duration: Duration) {
        *self.elapsed.lock().unwrap() += duration;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    #[tokio::test]
    async fn test_completes_after_n_polls() {
        let clock = ManualClock::new();
        let polls = AtomicU32::new(0);

        let done = poll_until(
            &clock,
            Duration::from_secs(1),
            Duration::from_secs(60),
            || {
                let n = polls.fetch_add(1, Ordering::SeqCst);
                async move { Ok(n >= 4) }
            },
        )
        .await
        .unwrap();

        assert!(done);
        assert_eq!(polls.load(Ordering::SeqCst), 5);
    }

    #[tokio::test]
    async fn test_never_completes_times_out() {
        let clock = ManualClock::new();
        let polls = AtomicU32::new(0);

        let done = poll_until(
            &clock,
            Duration::from_secs(1),
            Duration::from_secs(10),
            || {
                polls.fetch_add(1, Ordering::SeqCst);
                async { Ok(false) }
            },
        )
        .await
        .unwrap();

        assert!(!done);
        // 10s bound with 1s interval: bounded number of probes, no spin
        assert!(polls.load(Ordering::SeqCst) <= 11);
    }

    #[tokio::test]
    async fn test_probe_error_aborts_wait() {
        let clock = ManualClock::new();

        let result = poll_until(
            &clock,
            Duration::from_secs(1),
            Duration::from_secs(10),
            || async { Err(AdapterError::Fatal("probe broke".to_string())) },
        )
        .await;

        assert!(matches!(result.unwrap_err(), AdapterError::Fatal(_)));
    }

    #[tokio::test]
    async fn test_polls_through_trait_object() {
        // Adapters hold their clock as Arc<dyn Clock> and poll through the
        // unsized reference
        let clock: &dyn Clock = &ManualClock::new();
        let polls = AtomicU32::new(0);

        let done = poll_until(
            clock,
            Duration::from_secs(1),
            Duration::from_secs(10),
            || {
                let n = polls.fetch_add(1, Ordering::SeqCst);
                async move { Ok(n >= 1) }
            },
        )
        .await
        .unwrap();

        assert!(done);
        assert_eq!(polls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_immediate_completion_skips_sleep() {
        let clock = ManualClock::new();
        let before = clock.now();

        let done = poll_until(
            &clock,
            Duration::from_secs(1),
            Duration::from_secs(10),
            || async { Ok(true) },
        )
        .await
        .unwrap();

        assert!(done);
        assert_eq!(clock.now(), before);
    }
}
