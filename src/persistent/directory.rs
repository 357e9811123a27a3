use crate::error::StoreError;
use crate::persistent::{PersistentCache, StoreValue};
use crate::phase::ExclusiveAccess;
use crate::store::discrete_files::{FileStore, JsonCodec, StoreCodec};
use std::fs;
use std::marker::PhantomData;
use std::path::{Path, PathBuf};
use tracing::debug_span;

/// A [`PersistentCache`] keeping each store as a [`FileStore`] directory under a base directory.
///
/// The owner is expected to hold the base directory's cross-process lock for as long as the
/// cache is open, so lock edges here only delimit the operations for tracing.
pub struct DirectoryCache<Codec = JsonCodec> {
    base_dir: PathBuf,
    phantom: PhantomData<fn() -> Codec>,
}

impl<Codec> DirectoryCache<Codec> {
    pub fn open(base_dir: impl Into<PathBuf>) -> Result<Self, StoreError> {
        let base_dir = base_dir.into();
        fs::create_dir_all(&base_dir)?;

        Ok(DirectoryCache {
            base_dir,
            phantom: PhantomData,
        })
    }
}

impl<Codec> ExclusiveAccess for DirectoryCache<Codec> {
    fn use_cache<T, F: FnOnce() -> T>(&self, operation: &str, action: F) -> T {
        debug_span!("use_cache", operation, base_dir = %self.base_dir.display()).in_scope(action)
    }

    fn long_running_operation<T, F: FnOnce() -> T>(&self, operation: &str, action: F) -> T {
        debug_span!("long_running_operation", operation, base_dir = %self.base_dir.display())
            .in_scope(action)
    }
}

impl<Codec: StoreCodec> PersistentCache for DirectoryCache<Codec> {
    type Store<Value> = FileStore<Value, Codec>
    where
        Value: StoreValue;

    type Error = StoreError;

    fn base_dir(&self) -> &Path {
        &self.base_dir
    }

    fn create_store<Value: StoreValue>(
        &self,
        store_file: &Path,
    ) -> Result<Self::Store<Value>, StoreError> {
        FileStore::open(self.store_path(store_file))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::key::CacheKey;
    use crate::store::discrete_files::BincodeCodec;
    use crate::store::IndexedStore;

    #[test]
    fn stores_live_under_the_base_directory() {
        let dir = tempfile::tempdir().unwrap();
        let cache: DirectoryCache<BincodeCodec> = DirectoryCache::open(dir.path()).unwrap();

        let store = cache
            .create_store::<u64>(Path::new("fileHashes"))
            .unwrap();
        store.put(&CacheKey::from("a"), &9).unwrap();

        assert_eq!(store.directory(), dir.path().join("fileHashes"));
        assert!(dir.path().join("fileHashes").is_dir());
    }

    #[test]
    fn lock_edges_run_the_action() {
        let dir = tempfile::tempdir().unwrap();
        let cache: DirectoryCache = DirectoryCache::open(dir.path()).unwrap();

        let value = cache.use_cache("outer", || cache.long_running_operation("inner", || 5));
        assert_eq!(value, 5);
    }
}
