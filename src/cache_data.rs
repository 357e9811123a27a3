use crate::entry::CacheEntry;
use crate::key::CacheKey;
use crate::marker::{ExpirationMarker, MarkerSignal};
use crate::store::StoreHandle;
use parking_lot::{Mutex, MutexGuard, RwLock};
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tracing::{debug, trace, warn};

/// The in-memory half of one cached store: every entry learned since the last invalidation, and
/// the marker signal the entries are known to be coherent with.
///
/// The mapping is only trusted between [`CacheData::record_marker`] (taken just before this
/// process gives up exclusive access) and the next [`CacheData::invalidate_if_stale`] (run when
/// exclusive access comes back). When the marker moved in between, another process may have
/// written the store and the whole mapping is dropped at once.
pub struct CacheData<Value> {
    handle: StoreHandle,
    marker: Arc<dyn ExpirationMarker>,
    observed: Mutex<Option<MarkerSignal>>,
    mapping: RwLock<Mapping<Value>>,
    writes: Mutex<()>,
    stats: CacheStats,
}

struct Mapping<Value> {
    /// Bumped by every write, removal and clear. A cache-miss fill is only kept when the epoch
    /// did not move while the store was being read.
    epoch: u64,
    entries: HashMap<CacheKey, CacheEntry<Value>>,
}

/// Result of probing the mapping for a key.
pub(crate) enum Probe<Value> {
    Cached(CacheEntry<Value>),
    Vacant { epoch: u64 },
}

impl<Value: Clone> CacheData<Value> {
    pub fn new(handle: StoreHandle, marker: Arc<dyn ExpirationMarker>) -> Self {
        Self::with_capacity(handle, marker, 0)
    }

    pub fn with_capacity(
        handle: StoreHandle,
        marker: Arc<dyn ExpirationMarker>,
        capacity: usize,
    ) -> Self {
        let observed = read_signal(&handle, marker.as_ref());
        debug!(store = %handle, ?observed, "created in-memory cache data");

        CacheData {
            handle,
            marker,
            observed: Mutex::new(observed),
            mapping: RwLock::new(Mapping {
                epoch: 0,
                entries: HashMap::with_capacity(capacity),
            }),
            writes: Mutex::new(()),
            stats: CacheStats::default(),
        }
    }

    pub fn handle(&self) -> &StoreHandle {
        &self.handle
    }

    /// Snapshots the marker. Called just before exclusive access to the store is released.
    pub fn record_marker(&self) {
        let current = read_signal(&self.handle, self.marker.as_ref());
        trace!(store = %self.handle, ?current, "recorded expiration marker");
        *self.observed.lock() = current;
    }

    /// Drops every entry when the marker no longer matches the recorded snapshot, or when either
    /// side of the comparison is unknown. Returns whether the mapping was cleared.
    pub fn invalidate_if_stale(&self) -> bool {
        let current = read_signal(&self.handle, self.marker.as_ref());
        let mut observed = self.observed.lock();

        let fresh = matches!((*observed, current), (Some(seen), Some(now)) if seen == now);
        if fresh {
            return false;
        }

        let dropped = self.clear();
        self.stats.invalidations.fetch_add(1, Ordering::Relaxed);
        debug!(
            store = %self.handle,
            previous = ?*observed,
            ?current,
            dropped,
            "expiration marker changed, dropped in-memory entries"
        );
        *observed = current;
        true
    }

    pub fn get(&self, key: &CacheKey) -> Option<CacheEntry<Value>> {
        self.mapping.read().entries.get(key).cloned()
    }

    /// Replaces the entry for `key` wholesale.
    pub fn put(&self, key: CacheKey, entry: CacheEntry<Value>) {
        let mut mapping = self.mapping.write();
        mapping.epoch += 1;
        mapping.entries.insert(key, entry);
    }

    pub fn remove(&self, key: &CacheKey) -> Option<CacheEntry<Value>> {
        let mut mapping = self.mapping.write();
        mapping.epoch += 1;
        mapping.entries.remove(key)
    }

    /// Swaps in an empty mapping in one step and returns how many entries were dropped.
    pub fn clear(&self) -> usize {
        let mut mapping = self.mapping.write();
        mapping.epoch += 1;
        std::mem::take(&mut mapping.entries).len()
    }

    pub fn len(&self) -> usize {
        self.mapping.read().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.mapping.read().entries.is_empty()
    }

    pub fn stats(&self) -> &CacheStats {
        &self.stats
    }

    pub(crate) fn probe(&self, key: &CacheKey) -> Probe<Value> {
        let mapping = self.mapping.read();
        match mapping.entries.get(key) {
            Some(entry) => Probe::Cached(entry.clone()),
            None => Probe::Vacant {
                epoch: mapping.epoch,
            },
        }
    }

    /// Records what the store answered for a cache miss, unless the mapping was written or
    /// cleared since `epoch` was probed. Returns whether the entry was kept.
    pub(crate) fn fill(&self, key: CacheKey, entry: CacheEntry<Value>, epoch: u64) -> bool {
        let mut mapping = self.mapping.write();
        if mapping.epoch != epoch {
            return false;
        }
        mapping.entries.entry(key).or_insert(entry);
        true
    }

    /// Serializes store writes through this cache so the store and the mapping are updated as
    /// one step with respect to other writers.
    pub(crate) fn lock_writes(&self) -> MutexGuard<'_, ()> {
        self.writes.lock()
    }
}

fn read_signal(handle: &StoreHandle, marker: &dyn ExpirationMarker) -> Option<MarkerSignal> {
    match marker.signal() {
        Ok(signal) => Some(signal),
        Err(err) => {
            warn!(store = %handle, ?marker, error = %err, "expiration marker is unreadable");
            None
        }
    }
}

#[derive(Debug, Default)]
pub struct CacheStats {
    hits: AtomicU64,
    misses: AtomicU64,
    invalidations: AtomicU64,
}

impl CacheStats {
    pub fn hits(&self) -> u64 {
        self.hits.load(Ordering::Relaxed)
    }

    pub fn misses(&self) -> u64 {
        self.misses.load(Ordering::Relaxed)
    }

    pub fn invalidations(&self) -> u64 {
        self.invalidations.load(Ordering::Relaxed)
    }

    pub(crate) fn record_hit(&self) {
        self.hits.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_miss(&self) {
        self.misses.fetch_add(1, Ordering::Relaxed);
    }
}
