//! Cache-first request path shared by the forecast and geocoding services.
//!
//! A lookup goes: canonical key → cache hit, or → join the in-flight call for
//! that key, or → start one network call through the concurrency limiter.
//! Only successful results are stored. The network call itself runs on a
//! spawned task, so a caller that gives up does not strand it.

use crate::cache::CacheStore;
use crate::cache_key::canonicalize;
use crate::limiter::ConcurrencyLimiter;
use common::errors::AppError;
use futures::FutureExt;
use futures::future::{BoxFuture, Shared};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, instrument};

type InFlight<V> = Shared<BoxFuture<'static, Result<V, AppError>>>;

pub struct RequestCoordinator<V> {
    cache: Arc<CacheStore<V>>,
    limiter: Arc<ConcurrencyLimiter>,
    in_flight: Arc<Mutex<HashMap<String, InFlight<V>>>>,
}

impl<V> RequestCoordinator<V>
where
    V: Clone + Send + Sync + 'static,
{
    pub fn new(cache: Arc<CacheStore<V>>, limiter: Arc<ConcurrencyLimiter>) -> Self {
        Self {
            cache,
            limiter,
            in_flight: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    pub fn cache(&self) -> &Arc<CacheStore<V>> {
        &self.cache
    }

    pub fn limiter(&self) -> &Arc<ConcurrencyLimiter> {
        &self.limiter
    }

    /// Number of keys with a network call currently outstanding.
    pub fn in_flight(&self) -> usize {
        self.in_flight.lock().len()
    }

    /// Serve `endpoint` + `params` from the cache if younger than `ttl`,
    /// otherwise through `network_fn`.
    ///
    /// `network_fn` receives the canonical key, which is also a valid request
    /// URL. It is only invoked on a miss, and concurrent misses for the same
    /// key share a single invocation and its result.
    #[instrument(skip(self, params, network_fn), fields(endpoint = %endpoint))]
    pub async fn fetch_with_cache<I, K, P, F, Fut>(
        &self,
        endpoint: &str,
        params: I,
        ttl: Duration,
        network_fn: F,
    ) -> Result<V, AppError>
    where
        I: IntoIterator<Item = (K, P)>,
        K: AsRef<str>,
        P: AsRef<str>,
        F: FnOnce(String) -> Fut,
        Fut: Future<Output = Result<V, AppError>> + Send + 'static,
    {
        let key = canonicalize(endpoint, params);

        if let Some(hit) = self.cache.get(&key, ttl) {
            debug!(key = %key, "Cache hit");
            return Ok(hit);
        }

        let call = {
            let mut in_flight = self.in_flight.lock();
            match in_flight.get(&key).cloned() {
                Some(existing) => {
                    debug!(key = %key, "Joining in-flight request");
                    existing
                }
                None => {
                    // A call for this key may have finished since the first lookup.
                    if let Some(hit) = self.cache.get(&key, ttl) {
                        return Ok(hit);
                    }
                    debug!(key = %key, "Cache miss");
                    let call = self.start_call(key.clone(), network_fn(key.clone()));
                    in_flight.insert(key, call.clone());
                    call
                }
            }
        };

        call.await
    }

    fn start_call<Fut>(&self, key: String, request: Fut) -> InFlight<V>
    where
        Fut: Future<Output = Result<V, AppError>> + Send + 'static,
    {
        let cache = self.cache.clone();
        let limiter = self.limiter.clone();
        let in_flight = self.in_flight.clone();

        // The call runs on its own task so it completes, caches and leaves the
        // in-flight map even when every caller has stopped waiting.
        let task = tokio::spawn(async move {
            let result = limiter.run(request).await;
            if let Ok(payload) = &result {
                cache.set(key.clone(), payload.clone());
            }
            // After the cache write so a late caller finds either the entry or this call.
            in_flight.lock().remove(&key);
            result
        });

        async move {
            task.await.unwrap_or_else(|e| {
                Err(AppError::internal(format!("Request task failed: {}", e)))
            })
        }
        .boxed()
        .shared()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::future::join_all;
    use std::sync::atomic::{AtomicUsize, Ordering};

    const ENDPOINT: &str = "https://api.open-meteo.com/v1/forecast";
    const TTL: Duration = Duration::from_secs(15 * 60);

    fn coordinator(max_concurrent: usize) -> RequestCoordinator<String> {
        RequestCoordinator::new(
            Arc::new(CacheStore::new()),
            Arc::new(ConcurrencyLimiter::new(max_concurrent)),
        )
    }

    fn counting_fetch(
        calls: &Arc<AtomicUsize>,
        body: &'static str,
    ) -> impl FnOnce(String) -> BoxFuture<'static, Result<String, AppError>> {
        let calls = calls.clone();
        move |_url| {
            async move {
                calls.fetch_add(1, Ordering::SeqCst);
                tokio::time::sleep(Duration::from_millis(20)).await;
                Ok::<_, AppError>(body.to_string())
            }
            .boxed()
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_cache_hit_skips_network() {
        let coordinator = coordinator(3);
        let calls = Arc::new(AtomicUsize::new(0));
        let params = [("latitude", "52.52"), ("longitude", "13.405")];

        let first = coordinator
            .fetch_with_cache(ENDPOINT, params, TTL, counting_fetch(&calls, "sunny"))
            .await
            .unwrap();
        let second = coordinator
            .fetch_with_cache(ENDPOINT, params, TTL, |_url: String| async {
                Err::<String, _>(AppError::internal("network must not be called"))
            })
            .await
            .unwrap();

        assert_eq!(first, "sunny");
        assert_eq!(second, "sunny");
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_reordered_params_share_an_entry() {
        let coordinator = coordinator(3);
        let calls = Arc::new(AtomicUsize::new(0));

        coordinator
            .fetch_with_cache(
                ENDPOINT,
                [("latitude", "1"), ("longitude", "2")],
                TTL,
                counting_fetch(&calls, "a"),
            )
            .await
            .unwrap();
        let reordered = coordinator
            .fetch_with_cache(
                ENDPOINT,
                [("longitude", "2"), ("latitude", "1")],
                TTL,
                counting_fetch(&calls, "b"),
            )
            .await
            .unwrap();

        assert_eq!(reordered, "a");
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_expired_entry_falls_through_to_network() {
        let coordinator = coordinator(3);
        let calls = Arc::new(AtomicUsize::new(0));
        let params = [("name", "Berlin")];

        coordinator
            .fetch_with_cache(ENDPOINT, params, TTL, counting_fetch(&calls, "old"))
            .await
            .unwrap();

        tokio::time::advance(TTL - Duration::from_millis(1)).await;
        let hit = coordinator
            .fetch_with_cache(ENDPOINT, params, TTL, counting_fetch(&calls, "new"))
            .await
            .unwrap();
        assert_eq!(hit, "old");

        tokio::time::advance(Duration::from_millis(2)).await;
        let miss = coordinator
            .fetch_with_cache(ENDPOINT, params, TTL, counting_fetch(&calls, "new"))
            .await
            .unwrap();
        assert_eq!(miss, "new");
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_failures_are_not_cached() {
        let coordinator = coordinator(3);
        let params = [("name", "Atlantis")];

        let failed = coordinator
            .fetch_with_cache(ENDPOINT, params, TTL, |_url: String| async {
                Err::<String, _>(AppError::http(500, "HTTP error: 500"))
            })
            .await;
        assert_eq!(failed, Err(AppError::http(500, "HTTP error: 500")));
        assert!(coordinator.cache().is_empty());
        assert_eq!(coordinator.in_flight(), 0);

        let calls = Arc::new(AtomicUsize::new(0));
        let retried = coordinator
            .fetch_with_cache(ENDPOINT, params, TTL, counting_fetch(&calls, "found"))
            .await;
        assert_eq!(retried, Ok("found".to_string()));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_concurrent_misses_share_one_call() {
        let coordinator = coordinator(3);
        let calls = Arc::new(AtomicUsize::new(0));

        let requests = (0..8).map(|_| {
            coordinator.fetch_with_cache(
                ENDPOINT,
                [("latitude", "52.52"), ("longitude", "13.405")],
                TTL,
                counting_fetch(&calls, "shared"),
            )
        });
        let results = join_all(requests).await;

        assert!(results.iter().all(|r| r.as_deref() == Ok("shared")));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(coordinator.in_flight(), 0);
        assert_eq!(coordinator.cache().len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_abandoned_caller_does_not_block_other_keys() {
        let coordinator = coordinator(1);
        let calls = Arc::new(AtomicUsize::new(0));

        let slow = {
            let calls = calls.clone();
            move |_url: String| async move {
                calls.fetch_add(1, Ordering::SeqCst);
                tokio::time::sleep(Duration::from_millis(100)).await;
                Ok::<_, AppError>("slow".to_string())
            }
        };
        let abandoned = tokio::time::timeout(
            Duration::from_millis(10),
            coordinator.fetch_with_cache(ENDPOINT, [("name", "a")], TTL, slow),
        )
        .await;
        assert!(abandoned.is_err());

        let other = tokio::time::timeout(
            Duration::from_secs(30),
            coordinator.fetch_with_cache(ENDPOINT, [("name", "b")], TTL, |_url: String| async {
                Ok::<_, AppError>("other".to_string())
            }),
        )
        .await;
        assert_eq!(other, Ok(Ok("other".to_string())));
        assert_eq!(coordinator.in_flight(), 0);
        assert_eq!(coordinator.limiter().running(), 0);

        // The abandoned call still finished and filled the cache.
        let cached = coordinator
            .fetch_with_cache(ENDPOINT, [("name", "a")], TTL, counting_fetch(&calls, "again"))
            .await;
        assert_eq!(cached, Ok("slow".to_string()));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_dropped_waiters_release_in_flight_and_limiter() {
        let coordinator = coordinator(2);
        let calls = Arc::new(AtomicUsize::new(0));

        let waiters = (0..3).map(|_| {
            tokio::time::timeout(
                Duration::from_millis(5),
                coordinator.fetch_with_cache(
                    ENDPOINT,
                    [("latitude", "1"), ("longitude", "2")],
                    TTL,
                    counting_fetch(&calls, "late"),
                ),
            )
        });
        let results = join_all(waiters).await;
        assert!(results.iter().all(|r| r.is_err()));
        assert_eq!(coordinator.in_flight(), 1);

        tokio::time::sleep(Duration::from_millis(50)).await;

        assert_eq!(coordinator.in_flight(), 0);
        assert_eq!(coordinator.limiter().running(), 0);
        assert_eq!(coordinator.cache().len(), 1);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_concurrent_failure_reaches_every_waiter() {
        let coordinator = coordinator(3);
        let calls = Arc::new(AtomicUsize::new(0));

        let requests = (0..4).map(|_| {
            let calls = calls.clone();
            coordinator.fetch_with_cache(ENDPOINT, [("name", "x")], TTL, move |_url: String| {
                async move {
                    calls.fetch_add(1, Ordering::SeqCst);
                    tokio::time::sleep(Duration::from_millis(5)).await;
                    Err::<String, _>(AppError::timeout("slow"))
                }
            })
        });
        let results = join_all(requests).await;

        assert!(results.iter().all(|r| *r == Err(AppError::timeout("slow"))));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert!(coordinator.cache().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_distinct_keys_respect_limiter() {
        let coordinator = coordinator(2);
        let live = Arc::new(AtomicUsize::new(0));
        let peak = Arc::new(AtomicUsize::new(0));

        let requests = (0..6).map(|i| {
            let live = live.clone();
            let peak = peak.clone();
            coordinator.fetch_with_cache(
                ENDPOINT,
                [("city".to_string(), i.to_string())],
                TTL,
                move |_url: String| async move {
                    let now = live.fetch_add(1, Ordering::SeqCst) + 1;
                    peak.fetch_max(now, Ordering::SeqCst);
                    tokio::time::sleep(Duration::from_millis(10)).await;
                    live.fetch_sub(1, Ordering::SeqCst);
                    Ok::<_, AppError>(format!("city-{}", i))
                },
            )
        });
        let results = join_all(requests).await;

        assert_eq!(results.len(), 6);
        assert!(results.iter().all(|r| r.is_ok()));
        assert_eq!(peak.load(Ordering::SeqCst), 2);
        assert_eq!(coordinator.cache().len(), 6);
    }

    #[tokio::test(start_paused = true)]
    async fn test_network_fn_receives_canonical_url() {
        let coordinator = coordinator(1);
        let url = coordinator
            .fetch_with_cache(ENDPOINT, [("b", "2"), ("a", "1")], TTL, |url: String| async move {
                Ok::<_, AppError>(url)
            })
            .await
            .unwrap();
        assert_eq!(url, format!("{}?a=1&b=2", ENDPOINT));
    }
}
