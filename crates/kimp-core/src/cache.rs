//! Short-lived cache for calculation snapshots.

use std::future::Future;
use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio::sync::Mutex;

use crate::ResultSet;

#[derive(Debug)]
struct CachedSnapshot {
    snapshot: Arc<ResultSet>,
    expires_at: Instant,
}

/// Shares one [`ResultSet`] between callers for `ttl`.
///
/// Refreshes are single-flight: the lock is held across the recomputation, so
/// concurrent callers wait for the in-flight cycle and then read its result.
/// A zero TTL disables caching entirely.
#[derive(Debug, Clone)]
pub struct SnapshotCache {
    ttl: Duration,
    slot: Arc<Mutex<Option<CachedSnapshot>>>,
}

impl SnapshotCache {
    pub fn new(ttl: Duration) -> Self {
        Self {
            ttl,
            slot: Arc::new(Mutex::new(None)),
        }
    }

    pub fn disabled() -> Self {
        Self::new(Duration::ZERO)
    }

    pub fn is_disabled(&self) -> bool {
        self.ttl.is_zero()
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Returns the cached snapshot while fresh, otherwise awaits `refresh`.
    ///
    /// Empty snapshots are returned but never stored.
    pub async fn get_or_refresh<F, Fut>(&self, refresh: F) -> Arc<ResultSet>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = ResultSet>,
    {
        if self.is_disabled() {
            return Arc::new(refresh().await);
        }

        let mut slot = self.slot.lock().await;
        if let Some(cached) = slot.as_ref() {
            if Instant::now() < cached.expires_at {
                return cached.snapshot.clone();
            }
        }

        let snapshot = Arc::new(refresh().await);
        *slot = if snapshot.is_empty() {
            None
        } else {
            Some(CachedSnapshot {
                snapshot: snapshot.clone(),
                expires_at: Instant::now() + self.ttl,
            })
        };
        snapshot
    }

    pub async fn invalidate(&self) {
        self.slot.lock().await.take();
    }
}
