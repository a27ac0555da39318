//! Per-session search debouncing.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use moka::sync::Cache;

/// Minimum time an idle session's counter is remembered.
const MIN_IDLE: Duration = Duration::from_secs(60);

/// Outcome of waiting out the debounce delay.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Debounced {
    /// No newer request arrived; go ahead and search.
    Ready,
    /// A newer request from the same session took over.
    Superseded,
}

/// Collapses bursts of search requests into the last one.
///
/// Each session key owns a generation counter. A request bumps it, sleeps for
/// the configured delay and proceeds only if the counter is unchanged.
#[derive(Clone)]
pub struct SearchDebouncer {
    delay: Duration,
    generations: Cache<String, Arc<AtomicU64>>,
}

impl SearchDebouncer {
    #[must_use]
    pub fn new(delay: Duration) -> Self {
        Self {
            delay,
            generations: Cache::builder()
                .max_capacity(10_000)
                .time_to_idle(MIN_IDLE.max(delay * 4))
                .build(),
        }
    }

    /// Wait out the delay for `key` and report whether this request is still
    /// the latest one.
    pub async fn settle(&self, key: &str) -> Debounced {
        let counter = self
            .generations
            .get_with_by_ref(key, || Arc::new(AtomicU64::new(0)));
        let ticket = counter.fetch_add(1, Ordering::SeqCst) + 1;

        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }

        if counter.load(Ordering::SeqCst) == ticket {
            Debounced::Ready
        } else {
            tracing::debug!(key, "Search superseded");
            Debounced::Superseded
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    const DELAY: Duration = Duration::from_millis(500);

    #[tokio::test(start_paused = true)]
    async fn test_single_request_is_ready() {
        let debouncer = SearchDebouncer::new(DELAY);
        let started = tokio::time::Instant::now();

        assert_eq!(debouncer.settle("session").await, Debounced::Ready);
        assert!(started.elapsed() >= DELAY);
    }

    #[tokio::test(start_paused = true)]
    async fn test_burst_keeps_only_last() {
        let debouncer = SearchDebouncer::new(DELAY);

        let mut handles = Vec::new();
        for _ in 0..3 {
            let debouncer = debouncer.clone();
            handles.push(tokio::spawn(async move { debouncer.settle("s").await }));
            tokio::time::sleep(Duration::from_millis(100)).await;
        }

        let mut outcomes = Vec::new();
        for handle in handles {
            outcomes.push(handle.await.unwrap());
        }

        assert_eq!(
            outcomes,
            vec![Debounced::Superseded, Debounced::Superseded, Debounced::Ready]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_quiet_period_lets_each_through() {
        let debouncer = SearchDebouncer::new(DELAY);

        assert_eq!(debouncer.settle("s").await, Debounced::Ready);
        tokio::time::sleep(Duration::from_millis(600)).await;
        assert_eq!(debouncer.settle("s").await, Debounced::Ready);
    }

    #[tokio::test(start_paused = true)]
    async fn test_sessions_are_independent() {
        let debouncer = SearchDebouncer::new(DELAY);

        let (a, b) = tokio::join!(debouncer.settle("a"), debouncer.settle("b"));
        assert_eq!(a, Debounced::Ready);
        assert_eq!(b, Debounced::Ready);
    }

    #[tokio::test]
    async fn test_zero_delay_does_not_sleep() {
        let debouncer = SearchDebouncer::new(Duration::ZERO);
        assert_eq!(debouncer.settle("s").await, Debounced::Ready);
    }
}
