use std::future::Future;
use std::hash::Hash;
use std::sync::Arc;

use dashmap::DashMap;
use tokio::sync::OnceCell;

use crate::error::Error;

/// The get-or-factory cache spec.md §5 calls "the sole coordination
/// primitive": concurrent callers for the same key await the same
/// in-flight factory rather than issuing redundant registry calls, and a
/// factory rejection clears the slot so a later retry can repopulate it.
/// Grounded in the teacher's `manifest_cache.rs`, which layers the same
/// `DashMap<Key, Arc<OnceCell<...>>>` shape over its on-disk cache.
pub struct ManifestCache<K, V> {
    entries: DashMap<K, Arc<OnceCell<Result<V, Error>>>>,
}

impl<K, V> ManifestCache<K, V>
where
    K: Eq + Hash + Clone,
    V: Clone,
{
    pub fn new() -> ManifestCache<K, V> {
        ManifestCache { entries: DashMap::new() }
    }

    pub async fn get_or_fetch<F, Fut>(&self, key: K, factory: F) -> Result<V, Error>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<V, Error>>,
    {
        let cell = self.entries.entry(key.clone()).or_insert_with(|| Arc::new(OnceCell::new())).clone();

        let result = cell.get_or_init(factory).await.clone();

        if result.is_err() {
            self.entries.remove(&key);
        }

        result
    }
}

impl<K, V> Default for ManifestCache<K, V>
where
    K: Eq + Hash + Clone,
    V: Clone,
{
    fn default() -> Self {
        ManifestCache::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[tokio::test]
    async fn concurrent_callers_share_the_in_flight_factory() {
        let cache: Arc<ManifestCache<String, u32>> = Arc::new(ManifestCache::new());
        let call_count = Arc::new(AtomicUsize::new(0));

        let mut handles = Vec::new();
        for _ in 0..8 {
            let cache = cache.clone();
            let call_count = call_count.clone();

            handles.push(tokio::spawn(async move {
                cache
                    .get_or_fetch("a".to_string(), || async move {
                        call_count.fetch_add(1, Ordering::SeqCst);
                        tokio::time::sleep(std::time::Duration::from_millis(10)).await;
                        Ok(42)
                    })
                    .await
            }));
        }

        for handle in handles {
            assert_eq!(handle.await.unwrap().unwrap(), 42);
        }

        assert_eq!(call_count.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn a_failed_factory_clears_the_slot_for_retry() {
        let cache: ManifestCache<String, u32> = ManifestCache::new();

        let first = cache.get_or_fetch("a".to_string(), || async { Err(Error::UserError("boom".to_string())) }).await;
        assert!(first.is_err());

        let second = cache.get_or_fetch("a".to_string(), || async { Ok(7) }).await;
        assert_eq!(second.unwrap(), 7);
    }
}
