use crate::cache_data::CacheData;
use crate::error::{CacheError, Result};
use crate::marker::ExpirationMarker;
use crate::store::StoreHandle;
use parking_lot::Mutex;
use std::any::{type_name, Any};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::debug;

/// Lock-phase hooks of one cached store, independent of its value type.
pub trait PhasedCache: Send + Sync {
    fn handle(&self) -> &StoreHandle;

    fn record_marker(&self);

    fn invalidate_if_stale(&self) -> bool;
}

impl<Value: Clone + Send + Sync> PhasedCache for CacheData<Value> {
    fn handle(&self) -> &StoreHandle {
        CacheData::handle(self)
    }

    fn record_marker(&self) {
        CacheData::record_marker(self)
    }

    fn invalidate_if_stale(&self) -> bool {
        CacheData::invalidate_if_stale(self)
    }
}

struct Registered {
    phased: Arc<dyn PhasedCache>,
    typed: Arc<dyn Any + Send + Sync>,
}

/// Owns the in-memory data of every store opened through it, one [`CacheData`] per handle.
///
/// Entries are never removed: the set of stores a build touches is small and fixed. Tests and
/// embedders needing isolation construct their own registry.
#[derive(Default)]
pub struct CacheRegistry {
    caches: Mutex<HashMap<StoreHandle, Registered>>,
    initial_capacity: usize,
}

impl CacheRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_initial_capacity(initial_capacity: usize) -> Self {
        CacheRegistry {
            caches: Mutex::default(),
            initial_capacity,
        }
    }

    /// Returns the cache data for `handle`, creating it on first use.
    ///
    /// The existence check and the insertion happen under one lock, so concurrent callers for
    /// the same handle always share one instance. `marker` is only consulted on creation; the
    /// baseline signal is captured then.
    pub fn acquire<Value, Marker>(
        &self,
        handle: &StoreHandle,
        marker: Marker,
    ) -> Result<Arc<CacheData<Value>>>
    where
        Value: Clone + Send + Sync + 'static,
        Marker: FnOnce() -> Arc<dyn ExpirationMarker>,
    {
        let mut caches = self.caches.lock();

        let value_type = type_name::<Value>();
        let registered = caches.entry(handle.clone()).or_insert_with(|| {
            let data = Arc::new(CacheData::<Value>::with_capacity(
                handle.clone(),
                marker(),
                self.initial_capacity,
            ));
            debug!(store = %handle, value_type, "registered store for memory caching");
            Registered {
                phased: data.clone(),
                typed: data,
            }
        });

        registered
            .typed
            .clone()
            .downcast::<CacheData<Value>>()
            .map_err(|_| CacheError::ValueTypeMismatch {
                handle: handle.clone(),
                expected: value_type,
            })
    }

    pub fn contains(&self, handle: &StoreHandle) -> bool {
        self.caches.lock().contains_key(handle)
    }

    pub fn len(&self) -> usize {
        self.caches.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.caches.lock().is_empty()
    }

    /// Snapshot of every registered cache, taken so hooks run without holding the registry lock.
    pub fn caches(&self) -> Vec<Arc<dyn PhasedCache>> {
        self.caches
            .lock()
            .values()
            .map(|registered| registered.phased.clone())
            .collect()
    }
}
