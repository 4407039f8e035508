//! Bounded fan-out of per-item operations

use futures::stream::{self, Stream, StreamExt};
use std::future::Future;

/// Default number of operations in flight per phase
pub const DEFAULT_CONCURRENCY: usize = 300;

/// Runs one operation per item with at most `ceiling` running at once.
///
/// Operations are driven on the calling task, so borrowed state (the run
/// context, a prefetched index) can be shared without `'static` bounds.
/// Results arrive in completion order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConcurrencyLimiter {
    ceiling: usize,
}

impl ConcurrencyLimiter {
    /// A ceiling of zero is raised to one.
    pub fn new(ceiling: usize) -> Self {
        Self {
            ceiling: ceiling.max(1),
        }
    }

    pub fn ceiling(&self) -> usize {
        self.ceiling
    }

    /// Lazily start operations as earlier ones finish. Dropping the stream
    /// abandons everything still pending.
    pub fn fan_out<I, F, Fut>(&self, items: I, op: F) -> impl Stream<Item = Fut::Output>
    where
        I: IntoIterator,
        F: FnMut(I::Item) -> Fut,
        Fut: Future,
    {
        stream::iter(items).map(op).buffer_unordered(self.ceiling)
    }

    /// Run every operation and wait for all of them.
    pub async fn run_all<I, F, Fut>(&self, items: I, op: F) -> Vec<Fut::Output>
    where
        I: IntoIterator,
        F: FnMut(I::Item) -> Fut,
        Fut: Future,
    {
        self.fan_out(items, op).collect().await
    }
}

impl Default for ConcurrencyLimiter {
    fn default() -> Self {
        Self::new(DEFAULT_CONCURRENCY)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    #[tokio::test]
    async fn test_never_exceeds_ceiling() {
        let limiter = ConcurrencyLimiter::new(3);
        let active = AtomicUsize::new(0);
        let peak = AtomicUsize::new(0);

        let results = limiter
            .run_all(0..20, |i| {
                let active = &active;
                let peak = &peak;
                async move {
                    let now = active.fetch_add(1, Ordering::SeqCst) + 1;
                    peak.fetch_max(now, Ordering::SeqCst);
                    tokio::time::sleep(Duration::from_millis(2)).await;
                    active.fetch_sub(1, Ordering::SeqCst);
                    i
                }
            })
            .await;

        assert_eq!(results.len(), 20);
        assert_eq!(peak.load(Ordering::SeqCst), 3);
        assert_eq!(active.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_every_item_runs_exactly_once() {
        let limiter = ConcurrencyLimiter::new(7);
        let mut results = limiter
            .run_all(0..100, |i| async move {
                tokio::time::sleep(Duration::from_micros((100 - i) as u64)).await;
                i
            })
            .await;
        results.sort_unstable();
        assert_eq!(results, (0..100).collect::<Vec<_>>());
    }

    #[tokio::test]
    async fn test_fan_in_waits_for_slow_items() {
        let limiter = ConcurrencyLimiter::new(2);
        let done = AtomicUsize::new(0);
        limiter
            .run_all([30u64, 1, 1, 1], |ms| {
                let done = &done;
                async move {
                    tokio::time::sleep(Duration::from_millis(ms)).await;
                    done.fetch_add(1, Ordering::SeqCst);
                }
            })
            .await;
        assert_eq!(done.load(Ordering::SeqCst), 4);
    }

    #[tokio::test]
    async fn test_empty_input() {
        let limiter = ConcurrencyLimiter::default();
        let results: Vec<()> = limiter.run_all(Vec::<u8>::new(), |_| async {}).await;
        assert!(results.is_empty());
    }

    #[test]
    fn test_zero_ceiling_is_raised() {
        assert_eq!(ConcurrencyLimiter::new(0).ceiling(), 1);
        assert_eq!(ConcurrencyLimiter::default().ceiling(), 300);
    }
}
