use std::{sync::Arc, time::Duration};

use dashmap::DashMap;
use tokio::sync::{Mutex, OwnedMutexGuard};
use tokio::time::timeout;

/// Registry of named asynchronous mutexes, created on first use and retained
/// for the life of the process. Keys are low-cardinality (game and challenge
/// ids), so entries are never evicted.
#[derive(Default)]
pub struct LockRegistry {
    locks: DashMap<String, Arc<Mutex<()>>>,
}

impl LockRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Acquire the lock for `key`, waiting as long as it takes. The returned
    /// owned guard releases the lock when dropped, whatever the code path.
    pub async fn acquire(&self, key: &str) -> OwnedMutexGuard<()> {
        let lock = self
            .locks
            .entry(key.to_string())
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone();
        lock.lock_owned().await
    }

    /// Acquire the lock for `key`, giving up after `limit`.
    pub async fn acquire_timeout(
        &self,
        key: &str,
        limit: Duration,
    ) -> Option<OwnedMutexGuard<()>> {
        timeout(limit, self.acquire(key)).await.ok()
    }
}
