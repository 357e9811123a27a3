use crate::registry::CacheRegistry;
use std::sync::atomic::{AtomicIsize, Ordering};
use std::sync::Arc;
use tracing::trace;

/// The cross-process lock guarding a set of stores. Implemented by whatever owns the on-disk
/// lock files; this crate only hooks into its edges.
///
/// `use_cache` runs `action` while this process holds exclusive access. `long_running_operation`
/// runs `action` with exclusive access given up, so other processes may use the stores
/// meanwhile, and takes it back before returning.
pub trait ExclusiveAccess {
    fn use_cache<T, F: FnOnce() -> T>(&self, operation: &str, action: F) -> T;

    fn long_running_operation<T, F: FnOnce() -> T>(&self, operation: &str, action: F) -> T;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Unlocked,
    Locked,
}

/// Runs the lock-phase hooks of every cache in a registry.
///
/// Every acquisition checks every store's marker and every release records it, even when no
/// key was touched in between, and even when the action in between panicked.
pub struct LockPhaseCoordinator {
    registry: Arc<CacheRegistry>,
    /// Net number of acquisitions over releases. Nested `use_store` calls push it above one,
    /// a long-running operation at top level takes it below zero for its duration.
    depth: AtomicIsize,
}

impl LockPhaseCoordinator {
    pub fn new(registry: Arc<CacheRegistry>) -> Self {
        LockPhaseCoordinator {
            registry,
            depth: AtomicIsize::new(0),
        }
    }

    pub fn registry(&self) -> &Arc<CacheRegistry> {
        &self.registry
    }

    pub fn phase(&self) -> Phase {
        if self.depth.load(Ordering::Acquire) > 0 {
            Phase::Locked
        } else {
            Phase::Unlocked
        }
    }

    /// Exclusive access is about to be given up: snapshot every store's marker.
    pub fn before_exclusive_access_released(&self) {
        for cache in self.registry.caches() {
            cache.record_marker();
        }
        let depth = self.depth.fetch_sub(1, Ordering::AcqRel) - 1;
        trace!(depth, "released exclusive store access");
    }

    /// Exclusive access was just obtained: drop the entries of every store whose marker moved.
    pub fn before_exclusive_access_acquired(&self) {
        let depth = self.depth.fetch_add(1, Ordering::AcqRel) + 1;
        let invalidated = self
            .registry
            .caches()
            .iter()
            .filter(|cache| cache.invalidate_if_stale())
            .count();
        trace!(depth, invalidated, "acquired exclusive store access");
    }

    /// Enters the locked phase now and leaves it when the guard drops.
    pub fn locked(&self) -> PhaseGuard<'_> {
        self.before_exclusive_access_acquired();
        PhaseGuard {
            coordinator: self,
            on_drop: Phase::Unlocked,
        }
    }

    /// Leaves the locked phase now and re-enters it when the guard drops.
    pub fn unlocked(&self) -> PhaseGuard<'_> {
        self.before_exclusive_access_released();
        PhaseGuard {
            coordinator: self,
            on_drop: Phase::Locked,
        }
    }

    /// Runs `action` inside `access.use_cache` with the locked-phase hooks at its edges.
    pub fn use_store<A, T, F>(&self, access: &A, operation: &str, action: F) -> T
    where
        A: ExclusiveAccess + ?Sized,
        F: FnOnce() -> T,
    {
        access.use_cache(operation, || {
            let _locked = self.locked();
            action()
        })
    }

    /// Hands `action` to `access.long_running_operation`, recording markers before the lock is
    /// given up and checking them once it is back.
    pub fn long_running_operation<A, T, F>(&self, access: &A, operation: &str, action: F) -> T
    where
        A: ExclusiveAccess + ?Sized,
        F: FnOnce() -> T,
    {
        let _unlocked = self.unlocked();
        access.long_running_operation(operation, action)
    }
}

/// Runs the closing hook of a lock phase when dropped, including during unwinding.
#[must_use = "the phase ends as soon as the guard is dropped"]
pub struct PhaseGuard<'a> {
    coordinator: &'a LockPhaseCoordinator,
    on_drop: Phase,
}

impl Drop for PhaseGuard<'_> {
    fn drop(&mut self) {
        match self.on_drop {
            Phase::Unlocked => self.coordinator.before_exclusive_access_released(),
            Phase::Locked => self.coordinator.before_exclusive_access_acquired(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entry::CacheEntry;
    use crate::key::CacheKey;
    use crate::marker::{ExpirationMarker, ManualMarker};
    use crate::store::StoreHandle;
    use std::panic::{catch_unwind, AssertUnwindSafe};

    struct Unguarded;

    impl ExclusiveAccess for Unguarded {
        fn use_cache<T, F: FnOnce() -> T>(&self, _operation: &str, action: F) -> T {
            action()
        }

        fn long_running_operation<T, F: FnOnce() -> T>(&self, _operation: &str, action: F) -> T {
            action()
        }
    }

    fn setup() -> (LockPhaseCoordinator, Arc<ManualMarker>, Arc<crate::CacheData<u32>>) {
        let registry = Arc::new(CacheRegistry::new());
        let marker = Arc::new(ManualMarker::new());
        let shared: Arc<dyn ExpirationMarker> = marker.clone();
        let data = registry
            .acquire::<u32, _>(&StoreHandle::new("/caches/fileHashes.bin"), || shared)
            .unwrap();
        (LockPhaseCoordinator::new(registry), marker, data)
    }

    #[test]
    fn phases_follow_guards() {
        let (coordinator, _, _) = setup();
        assert_eq!(coordinator.phase(), Phase::Unlocked);

        {
            let _locked = coordinator.locked();
            assert_eq!(coordinator.phase(), Phase::Locked);
            {
                let _unlocked = coordinator.unlocked();
                assert_eq!(coordinator.phase(), Phase::Unlocked);
            }
            assert_eq!(coordinator.phase(), Phase::Locked);
        }

        assert_eq!(coordinator.phase(), Phase::Unlocked);
    }

    #[test]
    fn marker_change_while_unlocked_invalidates_on_acquire() {
        let (coordinator, marker, data) = setup();

        coordinator.use_store(&Unguarded, "populate", || {
            data.put(CacheKey::from("a"), CacheEntry::Present(1));
        });
        marker.advance();
        coordinator.use_store(&Unguarded, "read", || {
            assert!(data.is_empty());
        });
    }

    #[test]
    fn cycles_without_marker_change_keep_entries() {
        let (coordinator, _, data) = setup();

        coordinator.use_store(&Unguarded, "populate", || {
            data.put(CacheKey::from("a"), CacheEntry::Present(1));
        });
        for _ in 0..5 {
            coordinator.use_store(&Unguarded, "noop", || {});
        }

        assert_eq!(data.len(), 1);
        assert_eq!(data.stats().invalidations(), 0);
    }

    #[test]
    fn long_running_operation_rechecks_markers() {
        let (coordinator, marker, data) = setup();

        coordinator.use_store(&Unguarded, "build", || {
            data.put(CacheKey::from("a"), CacheEntry::Present(1));

            coordinator.long_running_operation(&Unguarded, "compile", || {
                assert_eq!(coordinator.phase(), Phase::Unlocked);
                // another process writes the store meanwhile
                marker.advance();
            });

            assert_eq!(coordinator.phase(), Phase::Locked);
            assert!(data.is_empty());
        });
    }

    #[test]
    fn hooks_run_when_the_action_panics() {
        let (coordinator, marker, data) = setup();

        let result = catch_unwind(AssertUnwindSafe(|| {
            coordinator.use_store(&Unguarded, "failing", || {
                data.put(CacheKey::from("a"), CacheEntry::Present(1));
                marker.advance();
                panic!("task failed");
            })
        }));

        assert!(result.is_err());
        assert_eq!(coordinator.phase(), Phase::Unlocked);
        // the write made while locked was recorded on the way out
        coordinator.use_store(&Unguarded, "after", || assert_eq!(data.len(), 1));
    }
}
