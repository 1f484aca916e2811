// SPDX-License-Identifier: Apache-2.0

//! TTL-based in-memory caching for external content.
//!
//! [`TtlCache`] is a single-slot cache: one instance guards one logical
//! resource (the merged news feed, the KEV catalog). Entries carry a fetch
//! timestamp and are replaced wholesale on refresh so a failed or cancelled
//! refresh never leaves a half-written value behind.
//!
//! Failure semantics favor degraded answers over errors: a failing fetcher
//! yields the stale entry if one exists, or `T::default()` otherwise.

use std::future::Future;
use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use tokio::sync::Mutex;

use crate::clock::Clock;

/// A cached value with its fetch timestamp.
#[derive(Debug, Clone)]
pub struct CacheEntry<T> {
    /// The cached data.
    pub value: T,
    /// When the entry was fetched.
    pub fetched_at: DateTime<Utc>,
}

impl<T> CacheEntry<T> {
    /// Check if this entry is still valid based on TTL.
    ///
    /// # Arguments
    ///
    /// * `now` - The current instant
    /// * `ttl` - Time-to-live duration
    ///
    /// # Returns
    ///
    /// `true` if the entry is within its TTL, `false` if expired.
    #[must_use]
    pub fn is_valid(&self, now: DateTime<Utc>, ttl: Duration) -> bool {
        now.signed_duration_since(self.fetched_at) < ttl
    }
}

/// Single-slot cache holding one value with a freshness bound.
pub struct TtlCache<T> {
    entry: Mutex<Option<CacheEntry<T>>>,
    clock: Arc<dyn Clock>,
}

impl<T> TtlCache<T>
where
    T: Clone + Default + Send,
{
    /// Create an empty cache driven by the given clock.
    #[must_use]
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self {
            entry: Mutex::new(None),
            clock,
        }
    }

    /// Return the cached value, refreshing through `fetcher` when needed.
    ///
    /// * Fresh entry and `force_refresh` false: cached clone, fetcher not
    ///   invoked.
    /// * Stale, missing, or forced: `fetcher` runs; on success the entry is
    ///   swapped atomically with a new timestamp.
    /// * Fetcher failure: the stale value is served as a degraded response;
    ///   with no prior entry, `T::default()`.
    ///
    /// The lock is held only to snapshot and to swap, never across the fetch,
    /// so concurrent callers hitting a stale slot may each invoke `fetcher`
    /// (no single-flight deduplication).
    pub async fn get_with<F, Fut>(&self, ttl: Duration, force_refresh: bool, fetcher: F) -> T
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = anyhow::Result<T>>,
    {
        let now = self.clock.now();
        let stale = {
            let guard = self.entry.lock().await;
            match guard.as_ref() {
                Some(entry) if !force_refresh && entry.is_valid(now, ttl) => {
                    return entry.value.clone();
                }
                Some(entry) => Some(entry.value.clone()),
                None => None,
            }
        };

        match fetcher().await {
            Ok(value) => {
                let entry = CacheEntry {
                    value: value.clone(),
                    fetched_at: self.clock.now(),
                };
                *self.entry.lock().await = Some(entry);
                value
            }
            Err(err) => {
                tracing::warn!("cache refresh failed, serving stale data: {err:#}");
                stale.unwrap_or_default()
            }
        }
    }

    /// Snapshot of the current entry, if any.
    pub async fn peek(&self) -> Option<CacheEntry<T>> {
        self.entry.lock().await.clone()
    }

    /// Timestamp of the last successful refresh, if any.
    pub async fn fetched_at(&self) -> Option<DateTime<Utc>> {
        self.entry.lock().await.as_ref().map(|e| e.fetched_at)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::sync::atomic::{AtomicU32, Ordering};

    use super::*;
    use crate::clock::testing::ManualClock;

    fn cache_with_clock() -> (TtlCache<Vec<String>>, Arc<ManualClock>) {
        let clock = Arc::new(ManualClock::new(Utc::now()));
        (TtlCache::new(clock.clone()), clock)
    }

    async fn fill(cache: &TtlCache<Vec<String>>, calls: &AtomicU32, value: &str) -> Vec<String> {
        let value = value.to_string();
        cache
            .get_with(Duration::hours(1), false, move || async move {
                calls.fetch_add(1, Ordering::SeqCst);
                Ok(vec![value])
            })
            .await
    }

    #[tokio::test]
    async fn test_fresh_entry_skips_fetcher() {
        let (cache, clock) = cache_with_clock();
        let calls = AtomicU32::new(0);

        assert_eq!(fill(&cache, &calls, "first").await, vec!["first"]);
        clock.advance(Duration::minutes(59));
        assert_eq!(fill(&cache, &calls, "second").await, vec!["first"]);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_expired_entry_invokes_fetcher() {
        let (cache, clock) = cache_with_clock();
        let calls = AtomicU32::new(0);

        fill(&cache, &calls, "first").await;
        clock.advance(Duration::minutes(61));
        assert_eq!(fill(&cache, &calls, "second").await, vec!["second"]);
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_entry_exactly_at_ttl_is_stale() {
        let (cache, clock) = cache_with_clock();
        let calls = AtomicU32::new(0);

        fill(&cache, &calls, "first").await;
        clock.advance(Duration::hours(1));
        assert_eq!(fill(&cache, &calls, "second").await, vec!["second"]);
    }

    #[tokio::test]
    async fn test_force_refresh_always_fetches() {
        let (cache, _clock) = cache_with_clock();
        let calls = AtomicU32::new(0);

        fill(&cache, &calls, "first").await;
        let calls = &calls;
        let refreshed = cache
            .get_with(Duration::hours(1), true, move || async move {
                calls.fetch_add(1, Ordering::SeqCst);
                Ok(vec!["forced".to_string()])
            })
            .await;

        assert_eq!(refreshed, vec!["forced"]);
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_failed_refresh_serves_stale_value() {
        let (cache, clock) = cache_with_clock();
        let calls = AtomicU32::new(0);

        fill(&cache, &calls, "first").await;
        clock.advance(Duration::hours(2));

        let degraded = cache
            .get_with(Duration::hours(1), false, || async {
                anyhow::bail!("upstream down")
            })
            .await;

        assert_eq!(degraded, vec!["first"]);
        // Stale entry is preserved for the next caller too.
        assert_eq!(cache.peek().await.expect("entry").value, vec!["first"]);
    }

    #[tokio::test]
    async fn test_failed_refresh_without_entry_yields_default() {
        let (cache, _clock) = cache_with_clock();

        let empty = cache
            .get_with(Duration::hours(1), false, || async {
                anyhow::bail!("upstream down")
            })
            .await;

        assert!(empty.is_empty());
        assert!(cache.peek().await.is_none());
    }

    #[tokio::test]
    async fn test_fetched_at_tracks_last_success() {
        let (cache, clock) = cache_with_clock();
        let calls = AtomicU32::new(0);

        assert!(cache.fetched_at().await.is_none());
        fill(&cache, &calls, "first").await;
        let first = cache.fetched_at().await.expect("timestamp");

        clock.advance(Duration::hours(2));
        fill(&cache, &calls, "second").await;
        let second = cache.fetched_at().await.expect("timestamp");

        assert!(second > first);
    }
}
