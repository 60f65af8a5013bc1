//! Proxy identity caches
//!
//! [`ClassCache`] keeps the most recently used class handles by name.
//! [`InstanceCache`] guarantees that wrapping the same native object twice
//! yields the same instance handle for as long as that handle is alive.
//! It holds weak references only, so it never keeps a handle (or the
//! object behind it) alive.

use std::hash::Hash;
use std::sync::{Arc, Weak};

use hyperbridge_types::ObjectRef;
use parking_lot::{Mutex, RwLock};
use rustc_hash::FxHashMap;

use crate::proxy::{ClassHandle, InstanceHandle};

// ============================================================================
// LRU
// ============================================================================

/// Least-recently-used map with an access clock
#[derive(Debug)]
struct LruCache<K: Hash + Eq + Clone, V: Clone> {
    capacity: usize,
    map: FxHashMap<K, (V, u64)>,
    clock: u64,
}

impl<K: Hash + Eq + Clone, V: Clone> LruCache<K, V> {
    fn new(capacity: usize) -> Self {
        Self {
            capacity: capacity.max(1),
            map: FxHashMap::default(),
            clock: 0,
        }
    }

    fn get(&mut self, key: &K) -> Option<V> {
        let (value, access) = self.map.get_mut(key)?;
        self.clock += 1;
        *access = self.clock;
        Some(value.clone())
    }

    fn put(&mut self, key: K, value: V) -> Option<K> {
        self.clock += 1;
        let mut evicted = None;
        if self.map.len() >= self.capacity && !self.map.contains_key(&key) {
            if let Some(lru) = self
                .map
                .iter()
                .min_by_key(|(_, (_, access))| *access)
                .map(|(k, _)| k.clone())
            {
                self.map.remove(&lru);
                evicted = Some(lru);
            }
        }
        self.map.insert(key, (value, self.clock));
        evicted
    }

    fn len(&self) -> usize {
        self.map.len()
    }

    fn clear(&mut self) {
        self.map.clear();
        self.clock = 0;
    }
}

// ============================================================================
// ClassCache
// ============================================================================

/// Bounded cache of class handles keyed by class name
#[derive(Debug)]
pub struct ClassCache {
    inner: Mutex<LruCache<String, Arc<ClassHandle>>>,
}

impl ClassCache {
    /// Create a cache holding at most `capacity` handles
    pub fn new(capacity: usize) -> Self {
        Self {
            inner: Mutex::new(LruCache::new(capacity)),
        }
    }

    /// Cached handle for `name`, refreshing its recency
    pub fn get(&self, name: &str) -> Option<Arc<ClassHandle>> {
        self.inner.lock().get(&name.to_string())
    }

    /// Cached handle for `name`, or the one `make` builds.
    ///
    /// The lock is held across `make`, so concurrent misses on one name
    /// share a single handle. A failed `make` caches nothing.
    pub fn get_or_insert_with<E, F>(&self, name: &str, make: F) -> Result<Arc<ClassHandle>, E>
    where
        F: FnOnce() -> Result<Arc<ClassHandle>, E>,
    {
        let key = name.to_string();
        let mut inner = self.inner.lock();
        if let Some(cached) = inner.get(&key) {
            tracing::trace!(class = %name, "class cache hit");
            return Ok(cached);
        }
        let handle = make()?;
        tracing::trace!(class = %name, "class cache miss");
        if let Some(evicted) = inner.put(key, handle.clone()) {
            tracing::trace!(class = %evicted, "evicted class handle");
        }
        Ok(handle)
    }

    /// Number of cached handles
    pub fn len(&self) -> usize {
        self.inner.lock().len()
    }

    /// Whether the cache is empty
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Maximum number of cached handles
    pub fn capacity(&self) -> usize {
        self.inner.lock().capacity
    }

    /// Drop every cached handle
    pub fn clear(&self) {
        self.inner.lock().clear();
    }
}

// ============================================================================
// InstanceCache
// ============================================================================

/// Identity map from native objects to their live instance handles
#[derive(Debug, Default)]
pub struct InstanceCache {
    entries: RwLock<FxHashMap<usize, Weak<InstanceHandle>>>,
}

impl InstanceCache {
    /// Create an empty cache
    pub fn new() -> Self {
        Self::default()
    }

    /// Live handle for `object`, if any
    pub fn lookup(&self, object: &ObjectRef) -> Option<Arc<InstanceHandle>> {
        self.entries.read().get(&object.identity()).and_then(Weak::upgrade)
    }

    /// Live handle for `object`, creating one with `make` on a miss.
    ///
    /// When two threads race, both may build a handle but only the first
    /// to register wins; the other is discarded and the winner returned.
    pub fn get_or_insert_with<F>(&self, object: &ObjectRef, make: F) -> Arc<InstanceHandle>
    where
        F: FnOnce() -> InstanceHandle,
    {
        if let Some(existing) = self.lookup(object) {
            return existing;
        }
        let candidate = Arc::new(make());
        let mut discarded = None;
        let winner = {
            let mut entries = self.entries.write();
            match entries.get(&object.identity()).and_then(Weak::upgrade) {
                Some(existing) => {
                    discarded = Some(candidate);
                    existing
                }
                None => {
                    entries.insert(object.identity(), Arc::downgrade(&candidate));
                    candidate
                }
            }
        };
        // discarded handles unregister themselves on drop, which needs the lock
        drop(discarded);
        winner
    }

    /// Remove the entry for `identity` if it belongs to `handle` or is dead
    pub(crate) fn forget(&self, identity: usize, handle: *const InstanceHandle) {
        let mut entries = self.entries.write();
        let stale = entries
            .get(&identity)
            .map(|entry| std::ptr::eq(entry.as_ptr(), handle) || entry.strong_count() == 0)
            .unwrap_or(false);
        if stale {
            entries.remove(&identity);
        }
    }

    /// Number of entries whose handle is still alive
    pub fn len(&self) -> usize {
        self.entries
            .read()
            .values()
            .filter(|entry| entry.strong_count() > 0)
            .count()
    }

    /// Whether no live handle is cached
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Drop entries whose handle has been collected
    pub fn purge(&self) -> usize {
        let mut entries = self.entries.write();
        let before = entries.len();
        entries.retain(|_, entry| entry.strong_count() > 0);
        before - entries.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::BridgeContext;
    use hyperbridge_types::TypeRegistry;

    #[test]
    fn test_lru_evicts_least_recently_used() {
        let mut cache = LruCache::new(2);
        cache.put("a", 1);
        cache.put("b", 2);
        assert_eq!(cache.get(&"a"), Some(1));
        assert_eq!(cache.put("c", 3), Some("b"));
        assert_eq!(cache.len(), 2);
        assert_eq!(cache.get(&"a"), Some(1));
        assert_eq!(cache.get(&"c"), Some(3));
        assert_eq!(cache.get(&"b"), None);
    }

    #[test]
    fn test_lru_replacing_existing_key_does_not_evict() {
        let mut cache = LruCache::new(2);
        cache.put("a", 1);
        cache.put("b", 2);
        assert_eq!(cache.put("a", 10), None);
        assert_eq!(cache.get(&"a"), Some(10));
        assert_eq!(cache.get(&"b"), Some(2));
    }

    #[test]
    fn test_lru_zero_capacity_holds_one() {
        let mut cache = LruCache::new(0);
        cache.put(1, "x");
        cache.put(2, "y");
        assert_eq!(cache.len(), 1);
        cache.clear();
        assert_eq!(cache.len(), 0);
    }

    #[test]
    fn test_class_cache_builds_once_per_name() {
        let registry = Arc::new(TypeRegistry::new());
        let object = registry.object_type();
        let ctx = BridgeContext::new(registry, &Default::default());
        let cache = ClassCache::new(4);
        let make = || Ok::<_, ()>(Arc::new(ClassHandle::new(ctx.clone(), object)));

        let first = cache.get_or_insert_with("core.Object", make).unwrap();
        let second = cache
            .get_or_insert_with("core.Object", || -> Result<Arc<ClassHandle>, ()> {
                panic!("cached handle should be reused")
            })
            .unwrap();
        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn test_class_cache_failed_build_caches_nothing() {
        let cache = ClassCache::new(4);
        let err = cache.get_or_insert_with("demo.Missing", || Err("missing")).unwrap_err();
        assert_eq!(err, "missing");
        assert!(cache.is_empty());
        assert!(cache.get("demo.Missing").is_none());
    }
}
