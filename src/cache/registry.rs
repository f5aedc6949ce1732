//! Cache registry - Central management for all caches.

use std::any::{Any, TypeId};
use std::collections::HashMap;
use std::hash::Hash;
use std::sync::Arc;
use std::time::Duration;

use parking_lot::{Mutex, RwLock};
use tokio::task::JoinHandle;
use tracing::{debug, info};

use super::{CacheConfig, CacheError, TypedCache};

/// Maintenance hook the sweeper runs on every registered cache.
trait Sweep: Send + Sync {
    fn sweep(&self);
}

impl<K, V> Sweep for TypedCache<K, V>
where
    K: Hash + Eq + Send + Sync + 'static,
    V: Clone + Send + Sync + 'static,
{
    fn sweep(&self) {
        self.run_pending_tasks();
    }
}

/// Central registry for managing multiple typed caches.
///
/// Each entity kind gets its own named cache, so writers on one kind
/// never contend with readers of another.
///
/// ## Example
///
/// ```rust,ignore
/// let registry = CacheRegistry::new();
///
/// // Create a cache for guild rows
/// let guilds: TypedCache<String, Guild> = registry.get_or_create("guilds", CacheConfig::default())?;
/// ```
#[derive(Clone)]
pub struct CacheRegistry {
    caches: Arc<RwLock<HashMap<String, CacheEntry>>>,
    sweeper: Arc<Mutex<Option<JoinHandle<()>>>>,
}

/// Internal cache entry storing type-erased cache.
struct CacheEntry {
    cache: Box<dyn Any + Send + Sync>,
    sweep: Arc<dyn Sweep>,
    type_id: TypeId,
    type_name: &'static str,
}

impl CacheEntry {
    fn downcast<K, V>(&self, name: &str) -> Result<TypedCache<K, V>, CacheError>
    where
        K: Hash + Eq + Send + Sync + 'static,
        V: Clone + Send + Sync + 'static,
    {
        if self.type_id != TypeId::of::<TypedCache<K, V>>() {
            return Err(CacheError::TypeMismatch {
                name: name.to_string(),
                expected: std::any::type_name::<TypedCache<K, V>>(),
                found: self.type_name,
            });
        }

        self.cache
            .downcast_ref::<TypedCache<K, V>>()
            .cloned()
            .ok_or_else(|| CacheError::TypeMismatch {
                name: name.to_string(),
                expected: std::any::type_name::<TypedCache<K, V>>(),
                found: self.type_name,
            })
    }
}

impl CacheRegistry {
    /// Create a new empty cache registry.
    pub fn new() -> Self {
        info!("Cache registry initialized");
        Self {
            caches: Arc::new(RwLock::new(HashMap::new())),
            sweeper: Arc::new(Mutex::new(None)),
        }
    }

    /// Get an existing cache by name.
    ///
    /// Returns `Ok(None)` if the cache doesn't exist and an error if it
    /// exists with different types.
    pub fn get<K, V>(&self, name: &str) -> Result<Option<TypedCache<K, V>>, CacheError>
    where
        K: Hash + Eq + Send + Sync + 'static,
        V: Clone + Send + Sync + 'static,
    {
        self.caches
            .read()
            .get(name)
            .map(|entry| entry.downcast(name))
            .transpose()
    }

    /// Get an existing cache or create a new one if it doesn't exist.
    ///
    /// This is the recommended way to access caches from repositories.
    pub fn get_or_create<K, V>(
        &self,
        name: &str,
        config: CacheConfig,
    ) -> Result<TypedCache<K, V>, CacheError>
    where
        K: Hash + Eq + Send + Sync + 'static,
        V: Clone + Send + Sync + 'static,
    {
        if let Some(cache) = self.get(name)? {
            return Ok(cache);
        }

        let mut caches = self.caches.write();

        // Another caller may have won the race between the two locks.
        if let Some(existing) = caches.get(name) {
            return existing.downcast(name);
        }

        debug!("Creating cache: {}", name);
        let cache = TypedCache::<K, V>::new(name, config);

        caches.insert(
            name.to_string(),
            CacheEntry {
                cache: Box::new(cache.clone()),
                sweep: Arc::new(cache.clone()),
                type_id: TypeId::of::<TypedCache<K, V>>(),
                type_name: std::any::type_name::<TypedCache<K, V>>(),
            },
        );

        Ok(cache)
    }

    /// Check if a cache with the given name exists.
    pub fn contains(&self, name: &str) -> bool {
        self.caches.read().contains_key(name)
    }

    /// Get the number of registered caches.
    pub fn len(&self) -> usize {
        self.caches.read().len()
    }

    /// Get a list of all registered cache names.
    pub fn cache_names(&self) -> Vec<String> {
        self.caches.read().keys().cloned().collect()
    }

    /// Run pending eviction on every registered cache.
    pub fn sweep(&self) {
        let targets: Vec<Arc<dyn Sweep>> = self
            .caches
            .read()
            .values()
            .map(|entry| Arc::clone(&entry.sweep))
            .collect();

        for target in targets {
            target.sweep();
        }
    }

    /// Spawn the background sweeper.
    ///
    /// Only one sweeper may run per registry. Must be called from within
    /// a tokio runtime.
    pub fn enable_auto_cleanup(&self, interval: Duration) -> Result<(), CacheError> {
        let mut sweeper = self.sweeper.lock();
        if sweeper.is_some() {
            return Err(CacheError::SweeperAlreadyRunning);
        }

        let registry = self.clone();
        *sweeper = Some(tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.tick().await;

            loop {
                ticker.tick().await;
                registry.sweep();
                debug!("Cache sweep finished for {} caches", registry.len());
            }
        }));

        info!("Cache sweeper started with interval {:?}", interval);
        Ok(())
    }

    /// Stop the background sweeper if it is running.
    pub fn disable_auto_cleanup(&self) -> bool {
        match self.sweeper.lock().take() {
            Some(handle) => {
                handle.abort();
                true
            }
            None => false,
        }
    }
}

impl Default for CacheRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for CacheRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let caches = self.caches.read();
        f.debug_struct("CacheRegistry")
            .field("cache_count", &caches.len())
            .field("cache_names", &caches.keys().collect::<Vec<_>>())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_get_or_create_returns_shared_cache() {
        let registry = CacheRegistry::new();

        let first: TypedCache<String, u32> =
            registry.get_or_create("numbers", CacheConfig::default()).unwrap();
        first.insert("a".to_string(), 1);

        let second: TypedCache<String, u32> =
            registry.get_or_create("numbers", CacheConfig::default()).unwrap();
        assert_eq!(second.get(&"a".to_string()), Some(1));
        assert_eq!(registry.len(), 1);
        assert!(registry.contains("numbers"));
    }

    #[test]
    fn test_type_mismatch_is_an_error() {
        let registry = CacheRegistry::new();
        let _: TypedCache<String, u32> =
            registry.get_or_create("numbers", CacheConfig::default()).unwrap();

        let result: Result<TypedCache<String, String>, _> =
            registry.get_or_create("numbers", CacheConfig::default());
        assert!(matches!(result, Err(CacheError::TypeMismatch { .. })));
    }

    #[tokio::test]
    async fn test_second_sweeper_is_rejected() {
        let registry = CacheRegistry::new();

        registry.enable_auto_cleanup(Duration::from_secs(60)).unwrap();
        assert!(matches!(
            registry.enable_auto_cleanup(Duration::from_secs(60)),
            Err(CacheError::SweeperAlreadyRunning)
        ));

        assert!(registry.disable_auto_cleanup());
        assert!(!registry.disable_auto_cleanup());
        registry.enable_auto_cleanup(Duration::from_secs(60)).unwrap();
        registry.disable_auto_cleanup();
    }
}
