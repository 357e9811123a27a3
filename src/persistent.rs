pub mod directory;

use crate::caching_store::CachingStore;
use crate::config::MemoryCachingConfig;
use crate::error::{CacheError, Result};
use crate::marker::{ExpirationMarker, FileMarker};
use crate::phase::{ExclusiveAccess, LockPhaseCoordinator};
use crate::registry::CacheRegistry;
use crate::store::{IndexedStore, StoreHandle};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Values a persistent store can hold.
pub trait StoreValue: Serialize + DeserializeOwned + Clone + Send + Sync + 'static {}

impl<T> StoreValue for T where T: Serialize + DeserializeOwned + Clone + Send + Sync + 'static {}

/// A directory of stores sharing one cross-process lock.
pub trait PersistentCache: ExclusiveAccess {
    type Store<Value>: IndexedStore<Value>
    where
        Value: StoreValue;

    type Error: std::error::Error + Send + Sync + 'static;

    fn base_dir(&self) -> &Path;

    /// Opens the store kept at `store_file`, resolved against [`PersistentCache::base_dir`] when
    /// relative. Wrappers pass `store_file` through unresolved so it is joined exactly once.
    fn create_store<Value: StoreValue>(
        &self,
        store_file: &Path,
    ) -> std::result::Result<Self::Store<Value>, Self::Error>;

    fn store_path(&self, store_file: &Path) -> PathBuf {
        self.base_dir().join(store_file)
    }
}

/// Puts an in-memory layer in front of every store a [`PersistentCache`] creates.
///
/// Stores are registered under their resolved path, so creating the same store twice yields two
/// facades over one shared mapping. Lock edges of the target are wrapped with the lock-phase
/// hooks: entries survive as long as the markers say nobody else wrote the stores.
pub struct CachingPersistentCache<Target> {
    target: Target,
    coordinator: LockPhaseCoordinator,
    config: MemoryCachingConfig,
}

impl<Target: PersistentCache> CachingPersistentCache<Target> {
    pub fn with_memory_caching(target: Target, config: MemoryCachingConfig) -> Self {
        let registry = Arc::new(CacheRegistry::with_initial_capacity(
            config.initial_capacity,
        ));
        Self::with_registry(target, registry, config)
    }

    pub fn with_registry(
        target: Target,
        registry: Arc<CacheRegistry>,
        config: MemoryCachingConfig,
    ) -> Self {
        CachingPersistentCache {
            target,
            coordinator: LockPhaseCoordinator::new(registry),
            config,
        }
    }

    pub fn target(&self) -> &Target {
        &self.target
    }

    pub fn coordinator(&self) -> &LockPhaseCoordinator {
        &self.coordinator
    }

    fn marker_for(&self, store_path: &Path) -> Arc<dyn ExpirationMarker> {
        match &self.config.master_cache_name {
            Some(master) => Arc::new(FileMarker::new(self.target.base_dir().join(master))),
            None => Arc::new(FileMarker::new(store_path)),
        }
    }
}

impl<Target: PersistentCache> ExclusiveAccess for CachingPersistentCache<Target> {
    fn use_cache<T, F: FnOnce() -> T>(&self, operation: &str, action: F) -> T {
        self.coordinator.use_store(&self.target, operation, action)
    }

    fn long_running_operation<T, F: FnOnce() -> T>(&self, operation: &str, action: F) -> T {
        self.coordinator
            .long_running_operation(&self.target, operation, action)
    }
}

impl<Target: PersistentCache> PersistentCache for CachingPersistentCache<Target> {
    type Store<Value> = CachingStore<Target::Store<Value>, Value>
    where
        Value: StoreValue;

    type Error = CacheError;

    fn base_dir(&self) -> &Path {
        self.target.base_dir()
    }

    fn create_store<Value: StoreValue>(&self, store_file: &Path) -> Result<Self::Store<Value>> {
        let store_path = self.store_path(store_file);
        let handle = StoreHandle::new(&store_path);

        let store = self
            .target
            .create_store::<Value>(store_file)
            .map_err(|err| CacheError::CreateStore {
                handle: handle.clone(),
                source: Box::new(err),
            })?;
        let data = self
            .coordinator
            .registry()
            .acquire::<Value, _>(&handle, || self.marker_for(&store_path))?;

        Ok(CachingStore::new(store, data))
    }
}
