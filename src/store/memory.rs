use crate::key::CacheKey;
use crate::store::IndexedStore;
use parking_lot::RwLock;
use std::collections::HashMap;
use std::convert::Infallible;

/// A store held entirely in memory. Useful as the backing store in tests and for caches whose
/// lifetime never exceeds the process.
#[derive(Debug)]
pub struct MemoryStore<Value> {
    data: RwLock<HashMap<CacheKey, Value>>,
}

impl<Value> Default for MemoryStore<Value> {
    fn default() -> Self {
        Self::new()
    }
}

impl<Value> MemoryStore<Value> {
    pub fn new() -> Self {
        MemoryStore {
            data: RwLock::new(HashMap::new()),
        }
    }

    pub fn len(&self) -> usize {
        self.data.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.read().is_empty()
    }

    pub fn contains(&self, key: &CacheKey) -> bool {
        self.data.read().contains_key(key)
    }
}

impl<Value: Clone> IndexedStore<Value> for MemoryStore<Value> {
    type Error = Infallible;

    fn get(&self, key: &CacheKey) -> Result<Option<Value>, Infallible> {
        Ok(self.data.read().get(key).cloned())
    }

    fn put(&self, key: &CacheKey, value: &Value) -> Result<(), Infallible> {
        self.data.write().insert(key.clone(), value.clone());
        Ok(())
    }

    fn remove(&self, key: &CacheKey) -> Result<(), Infallible> {
        self.data.write().remove(key);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn put_get_remove() {
        let store = MemoryStore::new();
        let key = CacheKey::from("taskArtifacts");

        assert_eq!(store.get(&key).unwrap(), None);
        store.put(&key, &3u32).unwrap();
        assert_eq!(store.get(&key).unwrap(), Some(3));
        assert!(store.contains(&key));

        store.remove(&key).unwrap();
        assert!(store.is_empty());
    }
}
