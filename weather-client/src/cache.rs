use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::{Arc, Weak};
use tokio::time::{Duration, Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

struct CacheEntry<V> {
    payload: V,
    stored_at: Instant,
}

/// In-memory response cache keyed by canonical request key
///
/// Entries carry only their insertion time; freshness is decided per read
/// by the caller's TTL, so a stale entry for one reader may still be fresh
/// for a reader with a longer TTL. Memory is reclaimed by [`CacheStore::sweep`].
pub struct CacheStore<V> {
    entries: RwLock<HashMap<String, CacheEntry<V>>>,
}

impl<V: Clone> CacheStore<V> {
    pub fn new() -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
        }
    }

    /// Returns the payload only if it was stored less than `ttl` ago.
    pub fn get(&self, key: &str, ttl: Duration) -> Option<V> {
        let entries = self.entries.read();
        let entry = entries.get(key)?;
        if entry.stored_at.elapsed() < ttl {
            Some(entry.payload.clone())
        } else {
            None
        }
    }

    pub fn set(&self, key: String, payload: V) {
        self.entries.write().insert(
            key,
            CacheEntry {
                payload,
                stored_at: Instant::now(),
            },
        );
    }

    /// Removes every entry at least `max_age` old and returns how many went.
    pub fn sweep(&self, max_age: Duration) -> usize {
        let mut entries = self.entries.write();
        let before = entries.len();
        entries.retain(|_, entry| entry.stored_at.elapsed() < max_age);
        before - entries.len()
    }

    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }

    pub fn clear(&self) {
        self.entries.write().clear();
    }
}

impl<V: Clone> Default for CacheStore<V> {
    fn default() -> Self {
        Self::new()
    }
}

impl<V: Clone + Send + Sync + 'static> CacheStore<V> {
    /// Start the periodic sweep on the current tokio runtime.
    ///
    /// The task runs until the returned handle is dropped or the store itself
    /// is gone.
    pub fn spawn_sweeper(self: &Arc<Self>, every: Duration, max_age: Duration) -> SweepHandle {
        let store: Weak<Self> = Arc::downgrade(self);
        let token = CancellationToken::new();
        let cancelled = token.clone();

        tokio::spawn(async move {
            let mut ticker = tokio::time::interval_at(Instant::now() + every, every);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

            loop {
                tokio::select! {
                    _ = cancelled.cancelled() => break,
                    _ = ticker.tick() => {
                        let Some(store) = store.upgrade() else { break };
                        let removed = store.sweep(max_age);
                        if removed > 0 {
                            info!(removed, remaining = store.len(), "Swept stale cache entries");
                        } else {
                            debug!(remaining = store.len(), "Cache sweep found nothing to evict");
                        }
                    }
                }
            }
            debug!("Cache sweeper stopped");
        });

        SweepHandle { token }
    }
}

/// Keeps the background sweep alive; dropping it stops the task.
#[derive(Debug)]
pub struct SweepHandle {
    token: CancellationToken,
}

impl SweepHandle {
    /// Stops the background sweep now instead of at drop.
    pub fn stop(self) {
        self.token.cancel();
    }

    pub fn is_stopped(&self) -> bool {
        self.token.is_cancelled()
    }
}

impl Drop for SweepHandle {
    fn drop(&mut self) {
        self.token.cancel();
    }
}
