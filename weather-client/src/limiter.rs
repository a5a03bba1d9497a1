//! Bounds the number of simultaneous network calls issued by this layer.
//!
//! Work waits on a fair `tokio::sync::Semaphore`, so queued units are
//! admitted strictly in arrival order as permits free up. A unit that is
//! dropped while queued leaves the queue; nothing else is ever dropped.

use common::errors::AppError;
use std::future::Future;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use tokio::sync::Semaphore;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

#[derive(Debug)]
pub struct ConcurrencyLimiter {
    semaphore: Arc<Semaphore>,
    max_concurrent: usize,
    max_queue_depth: Option<usize>,
    queued: AtomicUsize,
    running: AtomicUsize,
}

/// Decrements a counter when the owning stage ends, however it ends.
struct CounterGuard<'a>(&'a AtomicUsize);

impl<'a> CounterGuard<'a> {
    fn enter(counter: &'a AtomicUsize) -> Self {
        counter.fetch_add(1, Ordering::SeqCst);
        Self(counter)
    }
}

impl Drop for CounterGuard<'_> {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

impl ConcurrencyLimiter {
    pub fn new(max_concurrent: usize) -> Self {
        Self::with_queue_depth(max_concurrent, None)
    }

    /// `max_queue_depth` caps how many units may wait for a permit; `None`
    /// leaves the queue unbounded.
    pub fn with_queue_depth(max_concurrent: usize, max_queue_depth: Option<usize>) -> Self {
        let max_concurrent = max_concurrent.max(1);
        Self {
            semaphore: Arc::new(Semaphore::new(max_concurrent)),
            max_concurrent,
            max_queue_depth,
            queued: AtomicUsize::new(0),
            running: AtomicUsize::new(0),
        }
    }

    pub fn max_concurrent(&self) -> usize {
        self.max_concurrent
    }

    pub fn running(&self) -> usize {
        self.running.load(Ordering::SeqCst)
    }

    pub fn queued(&self) -> usize {
        self.queued.load(Ordering::SeqCst)
    }

    /// Wait for a slot, then drive `work` to completion.
    ///
    /// Fails fast with [`AppError::QueueFull`] when every slot is busy and the
    /// queue is at its ceiling. A failure from `work` is returned untouched.
    pub async fn run<F, T>(&self, work: F) -> Result<T, AppError>
    where
        F: Future<Output = Result<T, AppError>>,
    {
        if let Some(depth) = self.max_queue_depth
            && self.semaphore.available_permits() == 0
            && self.queued() >= depth
        {
            warn!(queued = self.queued(), depth, "Request queue full, rejecting");
            return Err(AppError::QueueFull { depth });
        }

        let permit = {
            let _waiting = CounterGuard::enter(&self.queued);
            self.semaphore
                .acquire()
                .await
                .map_err(|e| AppError::internal(format!("Concurrency limiter closed: {}", e)))?
        };

        let _running = CounterGuard::enter(&self.running);
        debug!(
            running = self.running(),
            queued = self.queued(),
            "Admitted request"
        );

        let result = work.await;
        drop(permit);
        result
    }

    /// Like [`run`](Self::run), resolving to [`AppError::Cancelled`] if `token`
    /// fires before the work finishes, whether it is still queued or running.
    pub async fn run_cancellable<F, T>(
        &self,
        work: F,
        token: &CancellationToken,
    ) -> Result<T, AppError>
    where
        F: Future<Output = Result<T, AppError>>,
    {
        tokio::select! {
            biased;
            _ = token.cancelled() => {
                debug!("Queued request cancelled");
                Err(AppError::Cancelled)
            }
            result = self.run(work) => result,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::future::join_all;
    use parking_lot::Mutex;
    use std::time::Duration;

    #[tokio::test(start_paused = true)]
    async fn test_never_more_than_max_running() {
        let limiter = Arc::new(ConcurrencyLimiter::new(3));
        let peak = Arc::new(AtomicUsize::new(0));

        let tasks = (0..10).map(|i| {
            let limiter = limiter.clone();
            let peak = peak.clone();
            tokio::spawn(async move {
                limiter
                    .run(async {
                        peak.fetch_max(limiter.running(), Ordering::SeqCst);
                        tokio::time::sleep(Duration::from_millis(50 + i * 10)).await;
                        Ok::<_, AppError>(i)
                    })
                    .await
            })
        });

        let results = join_all(tasks).await;
        assert_eq!(results.len(), 10);
        for (i, joined) in results.into_iter().enumerate() {
            assert_eq!(joined.unwrap().unwrap(), i as u64);
        }
        assert_eq!(peak.load(Ordering::SeqCst), 3);
        assert_eq!(limiter.running(), 0);
        assert_eq!(limiter.queued(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_admission_is_fifo() {
        let limiter = ConcurrencyLimiter::new(1);
        let order = Mutex::new(Vec::new());

        let units = (0..6).map(|i| {
            let limiter = &limiter;
            let order = &order;
            async move {
                limiter
                    .run(async move {
                        order.lock().push(i);
                        tokio::time::sleep(Duration::from_millis(5)).await;
                        Ok::<_, AppError>(())
                    })
                    .await
            }
        });
        join_all(units).await;

        assert_eq!(*order.lock(), vec![0, 1, 2, 3, 4, 5]);
    }

    #[tokio::test]
    async fn test_failure_propagates_and_frees_slot() {
        let limiter = ConcurrencyLimiter::new(1);

        let failed: Result<(), _> = limiter
            .run(async { Err::<(), _>(AppError::http(502, "bad gateway")) })
            .await;
        assert_eq!(failed, Err(AppError::http(502, "bad gateway")));

        let ok = limiter.run(async { Ok::<_, AppError>(5) }).await;
        assert_eq!(ok, Ok(5));
        assert_eq!(limiter.running(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_queue_ceiling_rejects_fast() {
        let limiter = Arc::new(ConcurrencyLimiter::with_queue_depth(1, Some(1)));

        let busy = {
            let limiter = limiter.clone();
            tokio::spawn(async move {
                limiter
                    .run(async {
                        tokio::time::sleep(Duration::from_secs(1)).await;
                        Ok::<_, AppError>(())
                    })
                    .await
            })
        };
        while limiter.running() < 1 {
            tokio::task::yield_now().await;
        }
        let waiting = {
            let limiter = limiter.clone();
            tokio::spawn(async move { limiter.run(async { Ok::<_, AppError>(()) }).await })
        };
        while limiter.queued() < 1 {
            tokio::task::yield_now().await;
        }

        let rejected = limiter.run(async { Ok::<_, AppError>(()) }).await;
        assert_eq!(rejected, Err(AppError::QueueFull { depth: 1 }));

        assert!(busy.await.unwrap().is_ok());
        assert!(waiting.await.unwrap().is_ok());
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancel_while_queued() {
        let limiter = Arc::new(ConcurrencyLimiter::new(1));
        let token = CancellationToken::new();

        let busy = {
            let limiter = limiter.clone();
            tokio::spawn(async move {
                limiter
                    .run(async {
                        tokio::time::sleep(Duration::from_secs(60)).await;
                        Ok::<_, AppError>(())
                    })
                    .await
            })
        };
        while limiter.running() < 1 {
            tokio::task::yield_now().await;
        }
        let queued = {
            let limiter = limiter.clone();
            let token = token.clone();
            tokio::spawn(async move {
                limiter
                    .run_cancellable(async { Ok::<_, AppError>(()) }, &token)
                    .await
            })
        };
        while limiter.queued() < 1 {
            tokio::task::yield_now().await;
        }

        token.cancel();
        assert_eq!(queued.await.unwrap(), Err(AppError::Cancelled));
        assert_eq!(limiter.queued(), 0);
        assert!(busy.await.unwrap().is_ok());
    }

    #[test]
    fn test_zero_capacity_is_clamped() {
        assert_eq!(ConcurrencyLimiter::new(0).max_concurrent(), 1);
    }
}
