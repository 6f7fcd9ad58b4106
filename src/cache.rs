//! Keyed caches with hit/miss accounting.
//!
//! The loader keeps parsed documents by location and the resolver keeps
//! effective templates by resolution key. Both use [`StatCache`], which counts
//! lookups so callers can observe whether repeated resolves were served from
//! memory.

use serde::Serialize;
use std::collections::HashMap;
use std::hash::Hash;

/// Snapshot of a cache's counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct CacheStats {
    pub hits: usize,
    pub misses: usize,
    pub entries: usize,
}

impl CacheStats {
    /// Hit rate as a percentage of all lookups.
    #[must_use]
    pub fn hit_rate(&self) -> f64 {
        let total = self.hits + self.misses;
        if total == 0 {
            0.0
        } else {
            (self.hits as f64 / total as f64) * 100.0
        }
    }
}

/// Cache that lives as long as the engine instance and is only emptied by an
/// explicit [`StatCache::clear`].
#[derive(Debug)]
pub(crate) struct StatCache<K, V> {
    entries: HashMap<K, V>,
    hits: usize,
    misses: usize,
}

impl<K: Eq + Hash, V> Default for StatCache<K, V> {
    fn default() -> Self {
        Self {
            entries: HashMap::new(),
            hits: 0,
            misses: 0,
        }
    }
}

impl<K: Eq + Hash, V> StatCache<K, V> {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Get a cached entry, recording a hit or a miss.
    pub(crate) fn get(&mut self, key: &K) -> Option<&V> {
        if let Some(value) = self.entries.get(key) {
            self.hits += 1;
            Some(value)
        } else {
            self.misses += 1;
            None
        }
    }

    pub(crate) fn insert(&mut self, key: K, value: V) {
        self.entries.insert(key, value);
    }

    /// Drop every entry and reset the counters.
    pub(crate) fn clear(&mut self) {
        self.entries.clear();
        self.hits = 0;
        self.misses = 0;
    }

    pub(crate) fn stats(&self) -> CacheStats {
        CacheStats {
            hits: self.hits,
            misses: self.misses,
            entries: self.entries.len(),
        }
    }
}
