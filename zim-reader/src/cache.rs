//! Bounded concurrent entry cache
//!
//! Parsed entry records are tiny, so the cache is bounded by entry count
//! rather than bytes. Eviction is LRU-style, scored by last access.
//! Correctness never depends on cache contents: a capacity of zero
//! disables caching and every lookup yields identical results.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Instant;

use dashmap::DashMap;
use tracing::trace;

use crate::entry::EntryData;
use crate::namespace::Namespace;

pub(crate) struct EntryCache {
    map: DashMap<String, CacheSlot>,
    capacity: usize,
    hits: AtomicUsize,
    misses: AtomicUsize,
}

struct CacheSlot {
    data: EntryData,
    last_access: Instant,
}

pub(crate) fn url_key(full_url: &str) -> String {
    format!("url:{full_url}")
}

pub(crate) fn title_key(namespace: Namespace, title: &str) -> String {
    format!("title:{namespace}/{title}")
}

impl EntryCache {
    pub fn new(capacity: usize) -> Self {
        Self {
            map: DashMap::new(),
            capacity,
            hits: AtomicUsize::new(0),
            misses: AtomicUsize::new(0),
        }
    }

    pub fn get(&self, key: &str) -> Option<EntryData> {
        if self.capacity == 0 {
            return None;
        }

        if let Some(mut slot) = self.map.get_mut(key) {
            slot.last_access = Instant::now();
            self.hits.fetch_add(1, Ordering::Relaxed);
            Some(slot.data.clone())
        } else {
            self.misses.fetch_add(1, Ordering::Relaxed);
            None
        }
    }

    /// Check for a key without touching access metadata or counters.
    pub fn contains(&self, key: &str) -> bool {
        self.capacity != 0 && self.map.contains_key(key)
    }

    pub fn insert(&self, key: String, data: EntryData) {
        if self.capacity == 0 {
            return;
        }

        while self.map.len() >= self.capacity {
            self.evict_one();
        }

        self.map.insert(
            key,
            CacheSlot {
                data,
                last_access: Instant::now(),
            },
        );
    }

    /// Drop the least recently accessed slot.
    fn evict_one(&self) {
        let oldest = self
            .map
            .iter()
            .min_by_key(|slot| slot.last_access)
            .map(|slot| slot.key().clone());

        if let Some(key) = oldest {
            self.map.remove(&key);
            trace!(key = %key, "evicted cached entry");
        }
    }

    pub fn stats(&self) -> CacheStats {
        CacheStats {
            len: self.map.len(),
            capacity: self.capacity,
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
        }
    }
}

/// Cache statistics
#[derive(Debug, Clone)]
pub struct CacheStats {
    pub len: usize,
    pub capacity: usize,
    pub hits: usize,
    pub misses: usize,
}
