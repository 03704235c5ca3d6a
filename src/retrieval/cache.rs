//! Caller-owned query result cache
//!
//! The cache is an explicit object handed to [`CachedRetriever`]s, never a
//! process-wide singleton. Entries are keyed by retriever name, query text
//! and `k`, and the least recently used entry is evicted when full.

use crate::config::CacheSettings;
use crate::retrieval::{RankedItem, RetrievalError, Retriever};
use lru::LruCache;
use std::num::NonZeroUsize;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct CacheKey {
    retriever: String,
    query: String,
    k: usize,
}

impl CacheKey {
    fn new(retriever: &str, query: &str, k: usize) -> Self {
        Self {
            retriever: retriever.to_string(),
            query: query.to_string(),
            k,
        }
    }
}

/// Bounded LRU cache of retrieval results
pub struct QueryCache {
    /// `None` when caching is disabled (capacity 0)
    entries: Option<Mutex<LruCache<CacheKey, Vec<RankedItem>>>>,
}

impl QueryCache {
    /// Create a cache holding at most `capacity` queries (0 disables caching)
    pub fn new(capacity: usize) -> Self {
        Self {
            entries: NonZeroUsize::new(capacity).map(|cap| Mutex::new(LruCache::new(cap))),
        }
    }

    pub fn from_settings(settings: &CacheSettings) -> Self {
        Self::new(settings.capacity)
    }

    fn lock(&self) -> Option<MutexGuard<'_, LruCache<CacheKey, Vec<RankedItem>>>> {
        // The LRU stays consistent even if a holder panicked
        self.entries
            .as_ref()
            .map(|entries| entries.lock().unwrap_or_else(PoisonError::into_inner))
    }

    pub fn get(&self, retriever: &str, query: &str, k: usize) -> Option<Vec<RankedItem>> {
        let key = CacheKey::new(retriever, query, k);
        self.lock()?.get(&key).cloned()
    }

    pub fn insert(&self, retriever: &str, query: &str, k: usize, items: Vec<RankedItem>) {
        if let Some(mut entries) = self.lock() {
            entries.put(CacheKey::new(retriever, query, k), items);
        }
    }

    /// Drop every entry produced by one retriever
    pub fn invalidate_retriever(&self, retriever: &str) -> usize {
        let Some(mut entries) = self.lock() else {
            return 0;
        };

        let stale: Vec<CacheKey> = entries
            .iter()
            .filter(|(key, _)| key.retriever == retriever)
            .map(|(key, _)| key.clone())
            .collect();
        for key in &stale {
            entries.pop(key);
        }
        stale.len()
    }

    /// Evict the least recently used entry, returning whether one existed
    pub fn evict_oldest(&self) -> bool {
        self.lock()
            .and_then(|mut entries| entries.pop_lru())
            .is_some()
    }

    pub fn clear(&self) {
        if let Some(mut entries) = self.lock() {
            entries.clear();
        }
    }

    pub fn len(&self) -> usize {
        self.lock().map_or(0, |entries| entries.len())
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn capacity(&self) -> usize {
        self.lock().map_or(0, |entries| entries.cap().get())
    }
}

/// Retriever that consults a shared [`QueryCache`] before its inner retriever
///
/// Failed retrievals are not cached.
pub struct CachedRetriever<R> {
    inner: R,
    cache: Arc<QueryCache>,
}

impl<R: Retriever> CachedRetriever<R> {
    pub fn new(inner: R, cache: Arc<QueryCache>) -> Self {
        Self { inner, cache }
    }

    pub fn cache(&self) -> &Arc<QueryCache> {
        &self.cache
    }
}

impl<R: Retriever> Retriever for CachedRetriever<R> {
    fn name(&self) -> &str {
        self.inner.name()
    }

    fn retrieve(&self, query: &str, k: usize) -> Result<Vec<RankedItem>, RetrievalError> {
        if let Some(items) = self.cache.get(self.name(), query, k) {
            tracing::debug!("Cache hit for '{}' on {}", query, self.name());
            return Ok(items);
        }

        let items = self.inner.retrieve(query, k)?;
        self.cache.insert(self.name(), query, k, items.clone());
        Ok(items)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct CountingRetriever {
        calls: AtomicUsize,
        fail: bool,
    }

    impl Retriever for CountingRetriever {
        fn name(&self) -> &str {
            "counting"
        }

        fn retrieve(&self, query: &str, _k: usize) -> Result<Vec<RankedItem>, RetrievalError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if self.fail {
                return Err(RetrievalError::Unavailable("down".to_string()));
            }
            Ok(vec![RankedItem::new(query, 1.0, query)])
        }
    }

    fn counting(fail: bool) -> CountingRetriever {
        CountingRetriever {
            calls: AtomicUsize::new(0),
            fail,
        }
    }

    #[test]
    fn test_hit_skips_inner() {
        let cache = Arc::new(QueryCache::new(8));
        let retriever = CachedRetriever::new(counting(false), cache.clone());

        let first = retriever.retrieve("alpha", 3).unwrap();
        let second = retriever.retrieve("alpha", 3).unwrap();

        assert_eq!(first, second);
        assert_eq!(retriever.inner.calls.load(Ordering::SeqCst), 1);

        // Different k is a different entry
        retriever.retrieve("alpha", 4).unwrap();
        assert_eq!(retriever.inner.calls.load(Ordering::SeqCst), 2);
        assert_eq!(cache.len(), 2);
    }

    #[test]
    fn test_errors_not_cached() {
        let cache = Arc::new(QueryCache::new(8));
        let retriever = CachedRetriever::new(counting(true), cache.clone());

        assert!(retriever.retrieve("alpha", 3).is_err());
        assert!(retriever.retrieve("alpha", 3).is_err());
        assert_eq!(retriever.inner.calls.load(Ordering::SeqCst), 2);
        assert!(cache.is_empty());
    }

    #[test]
    fn test_lru_eviction() {
        let cache = QueryCache::new(2);
        cache.insert("r", "a", 1, vec![]);
        cache.insert("r", "b", 1, vec![]);

        // Touch "a" so "b" becomes least recently used
        assert!(cache.get("r", "a", 1).is_some());
        cache.insert("r", "c", 1, vec![]);

        assert_eq!(cache.len(), 2);
        assert!(cache.get("r", "a", 1).is_some());
        assert!(cache.get("r", "b", 1).is_none());
        assert!(cache.get("r", "c", 1).is_some());
    }

    #[test]
    fn test_zero_capacity_disables() {
        let cache = QueryCache::new(0);
        cache.insert("r", "a", 1, vec![]);
        assert!(cache.is_empty());
        assert!(cache.get("r", "a", 1).is_none());
        assert_eq!(cache.capacity(), 0);
        assert_eq!(cache.invalidate_retriever("r"), 0);
        assert!(!cache.evict_oldest());
    }

    #[test]
    fn test_evict_oldest_and_reinsert() {
        let cache = QueryCache::new(3);
        cache.insert("r", "a", 1, vec![]);
        cache.insert("r", "b", 1, vec![]);

        // Overwriting an existing key refreshes it without growing the cache
        cache.insert("r", "a", 1, vec![RankedItem::new("x", 1.0, "x")]);
        assert_eq!(cache.len(), 2);

        assert!(cache.evict_oldest());
        assert!(cache.get("r", "b", 1).is_none());
        assert_eq!(cache.get("r", "a", 1).map(|items| items.len()), Some(1));
    }

    #[test]
    fn test_from_settings() {
        let cache = QueryCache::from_settings(&CacheSettings { capacity: 5 });
        assert_eq!(cache.capacity(), 5);
        assert_eq!(QueryCache::from_settings(&CacheSettings { capacity: 0 }).capacity(), 0);
    }

    #[test]
    fn test_invalidate_and_clear() {
        let cache = QueryCache::new(8);
        cache.insert("bm25", "a", 1, vec![]);
        cache.insert("bm25", "b", 1, vec![]);
        cache.insert("vector", "a", 1, vec![]);

        assert_eq!(cache.invalidate_retriever("bm25"), 2);
        assert_eq!(cache.len(), 1);

        cache.clear();
        assert!(cache.is_empty());
    }
}
