//! In-memory caching for persistent keyed stores that one process at a time holds under a
//! cross-process lock.
//!
//! A build keeps many small stores on disk (file hashes, task history, compiled script
//! metadata). Reading them through [`CachingStore`] serves repeated lookups, including negative
//! ones, from memory. The memory is only trusted while this process owns the stores: the
//! [`LockPhaseCoordinator`] records each store's [`ExpirationMarker`] before the lock is given up
//! and drops the in-memory entries of any store whose marker moved by the time it comes back.
//!
//! ```
//! use phased_cache::{CacheRegistry, CachingStore, ExclusiveAccess, LockPhaseCoordinator};
//! use phased_cache::{ExpirationMarker, ManualMarker, MemoryStore, StoreHandle};
//! use std::sync::Arc;
//!
//! struct HeldLock;
//!
//! impl ExclusiveAccess for HeldLock {
//!     fn use_cache<T, F: FnOnce() -> T>(&self, _operation: &str, action: F) -> T {
//!         action()
//!     }
//!
//!     fn long_running_operation<T, F: FnOnce() -> T>(&self, _operation: &str, action: F) -> T {
//!         action()
//!     }
//! }
//!
//! let registry = Arc::new(CacheRegistry::new());
//! let coordinator = LockPhaseCoordinator::new(registry.clone());
//! let marker: Arc<dyn ExpirationMarker> = Arc::new(ManualMarker::new());
//!
//! let data = registry
//!     .acquire::<String, _>(&StoreHandle::new("/caches/fileHashes.bin"), || marker)
//!     .unwrap();
//! let hashes = CachingStore::new(MemoryStore::new(), data);
//!
//! coordinator.use_store(&HeldLock, "snapshot inputs", || {
//!     hashes.put("src/Main.java", "9f86d08".to_owned()).unwrap();
//!     assert_eq!(hashes.get("src/Main.java").unwrap().as_deref(), Some("9f86d08"));
//! });
//! ```

pub mod cache_data;
pub mod caching_store;
pub mod config;
pub mod entry;
pub mod error;
pub mod key;
pub mod marker;
pub mod persistent;
pub mod phase;
pub mod registry;
pub mod store;

pub use cache_data::{CacheData, CacheStats};
pub use caching_store::CachingStore;
pub use config::MemoryCachingConfig;
pub use entry::{CacheEntry, CacheLookup};
pub use error::{CacheError, StoreError};
pub use key::CacheKey;
pub use marker::{ExpirationMarker, FileMarker, ManualMarker, MarkerSignal};
pub use persistent::directory::DirectoryCache;
pub use persistent::{CachingPersistentCache, PersistentCache, StoreValue};
pub use phase::{ExclusiveAccess, LockPhaseCoordinator, Phase, PhaseGuard};
pub use registry::{CacheRegistry, PhasedCache};
pub use store::discrete_files::{
    BincodeCodec, BincodeFileStore, FileStore, JsonCodec, JsonFileStore, StoreCodec,
};
pub use store::memory::MemoryStore;
pub use store::{IndexedStore, StoreHandle};
