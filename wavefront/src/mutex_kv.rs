//! Named lock registry
//!
//! Cloud integrations share backend state, so their create and update calls
//! are serialised on a common key.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};

/// Key shared by every cloud integration resource
pub const CLOUD_INTEGRATION_KEY: &str = "cloudintegration";

#[derive(Debug, Default)]
pub struct MutexKv {
    locks: Mutex<HashMap<String, Arc<AsyncMutex<()>>>>,
}

impl MutexKv {
    pub fn new() -> Self {
        Self::default()
    }

    /// Waits for the lock named by key. Dropping the guard releases it, from
    /// any task.
    pub async fn lock(&self, key: &str) -> OwnedMutexGuard<()> {
        tracing::debug!("locking {:?}", key);
        let guard = self.get(key).lock_owned().await;
        tracing::debug!("locked {:?}", key);
        guard
    }

    /// The mutex for key, created on first use and retained afterwards
    fn get(&self, key: &str) -> Arc<AsyncMutex<()>> {
        let mut locks = self
            .locks
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        locks
            .entry(key.to_string())
            .or_insert_with(|| Arc::new(AsyncMutex::new(())))
            .clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    #[tokio::test]
    async fn guard_can_be_released_on_another_task() {
        let kv = Arc::new(MutexKv::new());
        let guard = kv.lock("x").await;

        tokio::spawn(async move { drop(guard) }).await.unwrap();

        let relock = tokio::time::timeout(Duration::from_secs(1), kv.lock("x")).await;
        assert!(relock.is_ok());
    }

    #[tokio::test]
    async fn identical_keys_are_exclusive() {
        let kv = Arc::new(MutexKv::new());
        let active = Arc::new(AtomicUsize::new(0));
        let max_seen = Arc::new(AtomicUsize::new(0));

        let tasks = (0..8).map(|_| {
            let kv = kv.clone();
            let active = active.clone();
            let max_seen = max_seen.clone();
            tokio::spawn(async move {
                let _guard = kv.lock(CLOUD_INTEGRATION_KEY).await;
                let now = active.fetch_add(1, Ordering::SeqCst) + 1;
                max_seen.fetch_max(now, Ordering::SeqCst);
                tokio::time::sleep(Duration::from_millis(5)).await;
                active.fetch_sub(1, Ordering::SeqCst);
            })
        });

        for result in futures::future::join_all(tasks).await {
            result.unwrap();
        }
        assert_eq!(max_seen.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn distinct_keys_do_not_block() {
        let kv = MutexKv::new();
        let _a = kv.lock("a").await;

        let b = tokio::time::timeout(Duration::from_secs(1), kv.lock("b")).await;
        assert!(b.is_ok());
    }

    #[tokio::test]
    async fn held_key_blocks_second_locker() {
        let kv = MutexKv::new();
        let _a = kv.lock("a").await;

        let again = tokio::time::timeout(Duration::from_millis(50), kv.lock("a")).await;
        assert!(again.is_err());
    }
}
