//! In-memory TTL/LRU cache tier (§4.5). Grounded on
//! `dashflow-registry::cache::InMemoryCacheStore`, generalized to hold a
//! typed value directly rather than serialized bytes, since this tier never
//! crosses a process boundary. Recency bookkeeping is delegated to
//! `lru::LruCache` rather than hand-tracked, with a TTL stamped onto each
//! entry checked on read.

use std::num::NonZeroUsize;
use std::time::{Duration, Instant};

use lru::LruCache;
use parking_lot::Mutex;

struct Entry<T> {
    value: T,
    created_at: Instant,
    ttl: Duration,
}

impl<T> Entry<T> {
    fn is_expired(&self) -> bool {
        self.created_at.elapsed() > self.ttl
    }
}

/// Bounded, TTL-expiring, LRU-evicting cache of typed values. `capacity ==
/// 0` disables the entry cap (TTL expiry still applies).
pub struct InMemoryCacheStore<T> {
    entries: Mutex<LruCache<String, Entry<T>>>,
}

impl<T: Clone> InMemoryCacheStore<T> {
    pub fn new(capacity: usize) -> Self {
        let cache = match NonZeroUsize::new(capacity) {
            Some(cap) => LruCache::new(cap),
            None => LruCache::unbounded(),
        };
        Self {
            entries: Mutex::new(cache),
        }
    }

    pub fn get(&self, key: &str) -> Option<T> {
        let mut entries = self.entries.lock();
        match entries.get(key) {
            Some(entry) if !entry.is_expired() => Some(entry.value.clone()),
            Some(_) => {
                entries.pop(key);
                None
            }
            None => None,
        }
    }

    pub fn set(&self, key: String, value: T, ttl: Duration) {
        let mut entries = self.entries.lock();
        entries.put(
            key,
            Entry {
                value,
                created_at: Instant::now(),
                ttl,
            },
        );
    }

    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn clear(&self) {
        self.entries.lock().clear();
    }
}
