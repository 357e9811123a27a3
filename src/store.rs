pub mod discrete_files;
pub mod memory;

use crate::key::CacheKey;
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Stable identity of a persistent store. Two handles are the same store when their paths are
/// equal; the content behind the path plays no part.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct StoreHandle(PathBuf);

impl StoreHandle {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        StoreHandle(path.into())
    }

    pub fn path(&self) -> &Path {
        &self.0
    }
}

impl fmt::Display for StoreHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.display())
    }
}

impl From<&Path> for StoreHandle {
    fn from(value: &Path) -> Self {
        StoreHandle::new(value)
    }
}

impl From<PathBuf> for StoreHandle {
    fn from(value: PathBuf) -> Self {
        StoreHandle(value)
    }
}

/// A persistent keyed store: the slow, authoritative source the in-memory layer sits in front of.
///
/// Stores are shared between worker threads, so every operation takes `&self` and the
/// implementation synchronizes internally. Calls may block for as long as the disk needs.
pub trait IndexedStore<Value> {
    type Error;

    fn get(&self, key: &CacheKey) -> Result<Option<Value>, Self::Error>;

    fn put(&self, key: &CacheKey, value: &Value) -> Result<(), Self::Error>;

    fn remove(&self, key: &CacheKey) -> Result<(), Self::Error>;
}

impl<Value, Store> IndexedStore<Value> for Arc<Store>
where
    Store: IndexedStore<Value> + ?Sized,
{
    type Error = Store::Error;

    fn get(&self, key: &CacheKey) -> Result<Option<Value>, Self::Error> {
        (**self).get(key)
    }

    fn put(&self, key: &CacheKey, value: &Value) -> Result<(), Self::Error> {
        (**self).put(key, value)
    }

    fn remove(&self, key: &CacheKey) -> Result<(), Self::Error> {
        (**self).remove(key)
    }
}
