//! Two bounded LRU caches, one for simple fingerprints (5 MiB) and one for
//! tiled fingerprints (32 MiB), keyed by opaque file identity.

use std::collections::HashMap;
use std::hash::Hash;
use std::sync::Arc;
use std::time::Instant;

use parking_lot::Mutex;
use tracing::trace;

use crate::error::{Error, Result};

pub const SIMPLE_CACHE_CAPACITY_BYTES: usize = 5 * 1024 * 1024;
pub const TILED_CACHE_CAPACITY_BYTES: usize = 32 * 1024 * 1024;

struct Entry<V> {
    value: Arc<V>,
    size_bytes: usize,
    last_touched: Instant,
}

struct Inner<K, V> {
    entries: HashMap<K, Entry<V>>,
    total_bytes: usize,
    capacity_bytes: usize,
}

/// A bounded, thread-safe LRU cache keyed by opaque file identity.
pub struct VisualDataCache<K, V> {
    inner: Mutex<Inner<K, V>>,
}

impl<K: Eq + Hash + Clone, V> VisualDataCache<K, V> {
    pub fn new(capacity_bytes: usize) -> Self {
        VisualDataCache {
            inner: Mutex::new(Inner {
                entries: HashMap::new(),
                total_bytes: 0,
                capacity_bytes,
            }),
        }
    }

    /// Insert a fingerprint. If a single value alone exceeds capacity, the
    /// insert is rejected with `CapacityExceeded` but the caller keeps the
    /// value they computed — it's simply not cached.
    pub fn insert(&self, key: K, value: V, size_bytes: usize) -> Result<Arc<V>> {
        let mut inner = self.inner.lock();
        if size_bytes > inner.capacity_bytes {
            return Err(Error::CapacityExceeded {
                size: size_bytes,
                capacity: inner.capacity_bytes,
            });
        }

        if let Some(old) = inner.entries.remove(&key) {
            inner.total_bytes -= old.size_bytes;
        }

        while inner.total_bytes + size_bytes > inner.capacity_bytes {
            let evict_key = inner
                .entries
                .iter()
                .min_by_key(|(_, e)| e.last_touched)
                .map(|(k, _)| k.clone());
            match evict_key {
                Some(k) => {
                    if let Some(evicted) = inner.entries.remove(&k) {
                        inner.total_bytes -= evicted.size_bytes;
                        trace!(bytes = evicted.size_bytes, "evicting cache entry");
                    }
                }
                None => break,
            }
        }

        let arc = Arc::new(value);
        inner.entries.insert(
            key,
            Entry {
                value: arc.clone(),
                size_bytes,
                last_touched: Instant::now(),
            },
        );
        inner.total_bytes += size_bytes;
        Ok(arc)
    }

    /// Look up a value, bumping its last-touched timestamp.
    pub fn get(&self, key: &K) -> Option<Arc<V>> {
        let mut inner = self.inner.lock();
        if let Some(entry) = inner.entries.get_mut(key) {
            entry.last_touched = Instant::now();
            Some(entry.value.clone())
        } else {
            None
        }
    }

    pub fn total_bytes(&self) -> usize {
        self.inner.lock().total_bytes
    }

    pub fn len(&self) -> usize {
        self.inner.lock().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn insert_and_get_roundtrip() {
        let cache: VisualDataCache<u64, String> = VisualDataCache::new(1024);
        cache.insert(1, "hello".to_string(), 16).unwrap();
        assert_eq!(cache.get(&1).map(|v| (*v).clone()), Some("hello".to_string()));
    }

    #[test]
    fn oversized_value_is_rejected() {
        let cache: VisualDataCache<u64, Vec<u8>> = VisualDataCache::new(100);
        let err = cache.insert(1, vec![0u8; 200], 200).unwrap_err();
        assert!(matches!(err, Error::CapacityExceeded { .. }));
    }

    #[test]
    fn capacity_invariant_holds_after_eviction() {
        let cache: VisualDataCache<u64, Vec<u8>> = VisualDataCache::new(100);
        for i in 0..10u64 {
            let _ = cache.insert(i, vec![0u8; 30], 30);
            assert!(cache.total_bytes() <= 100);
        }
    }

    #[test]
    fn eviction_picks_least_recently_touched() {
        let cache: VisualDataCache<u64, Vec<u8>> = VisualDataCache::new(100);
        cache.insert(1, vec![0u8; 40], 40).unwrap();
        std::thread::sleep(std::time::Duration::from_millis(2));
        cache.insert(2, vec![0u8; 40], 40).unwrap();
        std::thread::sleep(std::time::Duration::from_millis(2));
        // touch key 1 so key 2 becomes the least-recently-touched
        cache.get(&1);
        std::thread::sleep(std::time::Duration::from_millis(2));
        // this insert forces an eviction (40 + 40 + 40 > 100)
        cache.insert(3, vec![0u8; 40], 40).unwrap();
        assert!(cache.get(&2).is_none());
        assert!(cache.get(&1).is_some());
        assert!(cache.get(&3).is_some());
    }
}
