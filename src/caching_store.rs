use crate::cache_data::{CacheData, Probe};
use crate::entry::{CacheEntry, CacheLookup};
use crate::key::CacheKey;
use crate::store::IndexedStore;
use std::any::Any;
use std::sync::Arc;
use tracing::trace;

/// Read-through, write-through wrapper handed out in place of a store.
///
/// The facade owns nothing but its two references: every facade over the same store handle
/// shares one [`CacheData`], which the registry guarantees. Store failures come back exactly as
/// the store raised them.
pub struct CachingStore<Store, Value> {
    store: Store,
    data: Arc<CacheData<Value>>,
}

impl<Store, Value> CachingStore<Store, Value>
where
    Store: IndexedStore<Value>,
    Value: Clone,
{
    pub fn new(store: Store, data: Arc<CacheData<Value>>) -> Self {
        CachingStore { store, data }
    }

    pub fn data(&self) -> &Arc<CacheData<Value>> {
        &self.data
    }

    pub fn store(&self) -> &Store {
        &self.store
    }

    pub fn get(&self, key: impl Into<CacheKey>) -> Result<Option<Value>, Store::Error> {
        self.lookup(&key.into()).map(CacheLookup::into_value)
    }

    /// Like [`CachingStore::get`], also telling whether the store had to be consulted.
    pub fn lookup(&self, key: &CacheKey) -> Result<CacheLookup<Value>, Store::Error> {
        let epoch = match self.data.probe(key) {
            Probe::Cached(entry) => {
                self.data.stats().record_hit();
                trace!(store = %self.data.handle(), %key, "cache hit");
                return Ok(CacheLookup::Hit(entry.into_value()));
            }
            Probe::Vacant { epoch } => epoch,
        };

        self.data.stats().record_miss();
        let fetched = self.store.get(key)?;
        let kept = self
            .data
            .fill(key.clone(), CacheEntry::from(fetched.clone()), epoch);
        trace!(store = %self.data.handle(), %key, kept, "cache miss");

        Ok(CacheLookup::Miss(fetched))
    }

    /// Writes `value` to the store and the in-memory entry as one update. When the store write
    /// fails the entry is dropped, since the store's content for the key is then unknown.
    pub fn put(&self, key: impl Into<CacheKey>, value: Value) -> Result<(), Store::Error> {
        let key = key.into();
        let _writes = self.data.lock_writes();

        if let Err(err) = self.store.put(&key, &value) {
            self.data.remove(&key);
            return Err(err);
        }
        self.data.put(key, CacheEntry::Present(value));
        Ok(())
    }

    /// Removes `key` from the store, then from memory. The entry is dropped even when the store
    /// fails, and only after the store call returns, so a miss racing the removal cannot keep the
    /// old value.
    pub fn remove(&self, key: impl Into<CacheKey>) -> Result<(), Store::Error> {
        let key = key.into();
        let _writes = self.data.lock_writes();

        let removed = self.store.remove(&key);
        self.data.remove(&key);
        removed
    }

    /// Lookup for callers holding a dynamically typed key.
    ///
    /// # Panics
    ///
    /// Panics before the store is touched when `key` is not one of the representations
    /// [`CacheKey::from_any`] accepts. Passing such a key is a programming error.
    pub fn get_any<K: Any>(&self, key: &K) -> Result<Option<Value>, Store::Error> {
        self.get(checked_key(key))
    }

    /// # Panics
    ///
    /// Same key contract as [`CachingStore::get_any`].
    pub fn put_any<K: Any>(&self, key: &K, value: Value) -> Result<(), Store::Error> {
        self.put(checked_key(key), value)
    }

    /// # Panics
    ///
    /// Same key contract as [`CachingStore::get_any`].
    pub fn remove_any<K: Any>(&self, key: &K) -> Result<(), Store::Error> {
        self.remove(checked_key(key))
    }
}

fn checked_key<K: Any>(key: &K) -> CacheKey {
    match CacheKey::from_any(key) {
        Ok(key) => key,
        Err(err) => panic!("{err}"),
    }
}

impl<Store, Value> IndexedStore<Value> for CachingStore<Store, Value>
where
    Store: IndexedStore<Value>,
    Value: Clone,
{
    type Error = Store::Error;

    fn get(&self, key: &CacheKey) -> Result<Option<Value>, Self::Error> {
        CachingStore::get(self, key)
    }

    fn put(&self, key: &CacheKey, value: &Value) -> Result<(), Self::Error> {
        CachingStore::put(self, key, value.clone())
    }

    fn remove(&self, key: &CacheKey) -> Result<(), Self::Error> {
        CachingStore::remove(self, key)
    }
}
