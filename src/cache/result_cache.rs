//! Result Cache - LRU memo of SELECT results keyed by literal query text
//!
//! Only exact text equality hits: `SELECT * FROM s.t` and `select * from s.t`
//! are different entries. Any successful mutation clears the whole cache.
//!
//! **Generation tagging**: a reader captures `generation()` before it takes
//! its table lock and passes it back to `store()`. If a mutation invalidated
//! the cache in between, the generation has moved on and the store is
//! dropped, so a result computed from pre-mutation data never lands in the
//! cache after the invalidation.

use crate::types::Row;
use lru::LruCache;
use parking_lot::{Mutex, RwLock};
use serde::Serialize;
use std::num::NonZeroUsize;
use std::sync::Arc;
use tracing::debug;

/// Memoized SELECT payload
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CachedResult {
    /// Declared column set of the table
    pub columns: Vec<String>,
    /// Rows, already projected
    pub rows: Vec<Row>,
}

/// Cache statistics
#[derive(Debug, Default, Clone, Serialize)]
pub struct CacheStats {
    pub hits: u64,
    pub misses: u64,
    /// Stores discarded because the cache was invalidated meanwhile
    pub stale_stores: u64,
    pub invalidations: u64,
    pub size: usize,
    pub capacity: usize,
}

impl CacheStats {
    pub fn hit_rate(&self) -> f64 {
        let total = self.hits + self.misses;
        if total == 0 {
            0.0
        } else {
            self.hits as f64 / total as f64
        }
    }
}

struct Inner {
    entries: LruCache<String, Arc<CachedResult>>,
    generation: u64,
}

/// Process-wide SELECT result cache
pub struct ResultCache {
    inner: Mutex<Inner>,
    stats: RwLock<CacheStats>,
}

impl ResultCache {
    /// Create a cache holding at most `capacity` results (minimum 1)
    pub fn new(capacity: usize) -> Self {
        let capacity = NonZeroUsize::new(capacity).unwrap_or(NonZeroUsize::MIN);
        Self {
            inner: Mutex::new(Inner {
                entries: LruCache::new(capacity),
                generation: 0,
            }),
            stats: RwLock::new(CacheStats {
                capacity: capacity.get(),
                ..Default::default()
            }),
        }
    }

    /// Look up a query by its literal text
    pub fn lookup(&self, query: &str) -> Option<Arc<CachedResult>> {
        let hit = self.inner.lock().entries.get(query).cloned();
        let mut stats = self.stats.write();
        if hit.is_some() {
            stats.hits += 1;
            debug!(query, "result cache hit");
        } else {
            stats.misses += 1;
            debug!(query, "result cache miss");
        }
        hit
    }

    /// Current generation; capture before reading the table
    pub fn generation(&self) -> u64 {
        self.inner.lock().generation
    }

    /// Store a result computed under `generation`
    ///
    /// Returns false (and stores nothing) if the cache was invalidated since.
    pub fn store(&self, query: &str, generation: u64, result: CachedResult) -> bool {
        let mut inner = self.inner.lock();
        if inner.generation != generation {
            drop(inner);
            self.stats.write().stale_stores += 1;
            debug!(query, "discarding stale result");
            return false;
        }
        inner.entries.put(query.to_string(), Arc::new(result));
        true
    }

    /// Drop every entry and advance the generation
    pub fn invalidate_all(&self) {
        let mut inner = self.inner.lock();
        inner.entries.clear();
        inner.generation = inner.generation.wrapping_add(1);
        drop(inner);
        self.stats.write().invalidations += 1;
    }

    pub fn len(&self) -> usize {
        self.inner.lock().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn stats(&self) -> CacheStats {
        let mut stats = self.stats.read().clone();
        stats.size = self.len();
        stats
    }
}
