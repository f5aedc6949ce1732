//! Typed cache wrapper around Moka.

use std::hash::Hash;
use std::sync::Arc;

use moka::sync::Cache;

use super::CacheConfig;

/// A typed cache wrapper that provides a clean API over Moka.
///
/// This cache is:
/// - Thread-safe (uses Arc internally)
/// - LRU-based with optional TTL/TTI
/// - Clone-friendly (cloning is cheap, shares the same underlying cache)
///
/// Values are cloned out on read, so a concurrent `insert` replaces the
/// whole value and readers never observe a half-written entry.
pub struct TypedCache<K, V>
where
    K: Hash + Eq + Send + Sync + 'static,
    V: Clone + Send + Sync + 'static,
{
    inner: Arc<Cache<K, V>>,
    name: Arc<str>,
}

// Manual Clone implementation that doesn't require K: Clone, V: Clone
impl<K, V> Clone for TypedCache<K, V>
where
    K: Hash + Eq + Send + Sync + 'static,
    V: Clone + Send + Sync + 'static,
{
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
            name: Arc::clone(&self.name),
        }
    }
}

impl<K, V> TypedCache<K, V>
where
    K: Hash + Eq + Send + Sync + 'static,
    V: Clone + Send + Sync + 'static,
{
    /// Create a new typed cache with the given name and config.
    pub fn new(name: impl Into<Arc<str>>, config: CacheConfig) -> Self {
        let mut builder = Cache::builder().max_capacity(config.max_capacity);

        if let Some(ttl) = config.ttl {
            builder = builder.time_to_live(ttl);
        }

        if let Some(tti) = config.tti {
            builder = builder.time_to_idle(tti);
        }

        Self {
            inner: Arc::new(builder.build()),
            name: name.into(),
        }
    }

    /// Get the name of this cache.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Insert or replace a value. Revives a previously invalidated key.
    pub fn insert(&self, key: K, value: V) {
        self.inner.insert(key, value);
    }

    /// Get a value from the cache.
    ///
    /// Returns `Some(value)` if the key exists, was not invalidated and
    /// hasn't expired.
    pub fn get(&self, key: &K) -> Option<V> {
        self.inner.get(key)
    }

    /// Remove a key from the cache.
    ///
    /// Returns `true` when a live entry was dropped. An expired entry
    /// that has not been evicted yet counts as absent.
    pub fn invalidate(&self, key: &K) -> bool {
        let live = self.inner.contains_key(key);
        self.inner.invalidate(key);
        live
    }

    /// Remove all entries from the cache.
    pub fn invalidate_all(&self) {
        self.inner.invalidate_all();
    }

    /// Get the number of entries in the cache.
    ///
    /// Note: This may not be perfectly accurate until pending
    /// maintenance has run.
    pub fn entry_count(&self) -> u64 {
        self.inner.entry_count()
    }

    /// Drop expired and invalidated entries now.
    pub fn run_pending_tasks(&self) {
        self.inner.run_pending_tasks();
    }
}

impl<K, V> std::fmt::Debug for TypedCache<K, V>
where
    K: Hash + Eq + Send + Sync + 'static,
    V: Clone + Send + Sync + 'static,
{
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TypedCache")
            .field("name", &self.name)
            .field("entry_count", &self.inner.entry_count())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[derive(Debug, Clone, PartialEq)]
    struct Guild {
        name: &'static str,
    }

    #[test]
    fn test_update_invalidate_revive() {
        let cache: TypedCache<String, Guild> = TypedCache::new("guilds", CacheConfig::default());
        let key = "42".to_string();

        cache.insert(key.clone(), Guild { name: "g1" });
        assert_eq!(cache.get(&key), Some(Guild { name: "g1" }));

        assert!(cache.invalidate(&key));
        assert_eq!(cache.get(&key), None);
        assert!(!cache.invalidate(&key));

        cache.insert(key.clone(), Guild { name: "g2" });
        assert_eq!(cache.get(&key), Some(Guild { name: "g2" }));
    }

    #[test]
    fn test_expired_entries_are_absent() {
        let cache: TypedCache<String, u32> = TypedCache::new(
            "short",
            CacheConfig::with_capacity(10).ttl(Duration::from_millis(20)),
        );

        cache.insert("a".to_string(), 1);
        std::thread::sleep(Duration::from_millis(60));

        assert_eq!(cache.get(&"a".to_string()), None);
    }

    #[test]
    fn test_invalidate_ignores_expired_entries() {
        let cache: TypedCache<String, u32> = TypedCache::new(
            "short",
            CacheConfig::with_capacity(10).ttl(Duration::from_millis(20)),
        );

        cache.insert("a".to_string(), 1);
        std::thread::sleep(Duration::from_millis(60));

        assert!(!cache.invalidate(&"a".to_string()));

        cache.insert("a".to_string(), 2);
        assert_eq!(cache.get(&"a".to_string()), Some(2));
    }

    #[test]
    fn test_zero_ttl_keeps_entries() {
        let cache: TypedCache<String, u32> =
            TypedCache::new("forever", CacheConfig::with_capacity(10).ttl(Duration::ZERO));

        cache.insert("a".to_string(), 1);
        std::thread::sleep(Duration::from_millis(20));

        assert_eq!(cache.get(&"a".to_string()), Some(1));
    }
}
