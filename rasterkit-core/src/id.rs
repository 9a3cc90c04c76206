//! # IDs
//! Layers and groups are referenced by identity rather than by position, so that history entries can find
//! their target again after the document has been reordered. This is implemented via `RasterID<T>`,
//! which hands out IDs that are unique within this execution of the program, namespaced by the type T.
//!
//! IDs are never recycled. Dropping the last reference to a layer does *not* make its ID available again,
//! so a stale ID stored in the history can never alias a newer layer.

use std::sync::atomic::{AtomicU64, Ordering};

// Next free value per namespace. Written only the first time a namespace allocates.
static ID_SERVER: parking_lot::RwLock<std::collections::BTreeMap<std::any::TypeId, AtomicU64>> =
    parking_lot::const_rwlock(std::collections::BTreeMap::new());

/// ID that is guaranteed unique within this execution of the program.
/// IDs of different namespaces may share a numeric value but never compare equal, as they're different types.
pub struct RasterID<T: std::any::Any> {
    id: std::num::NonZeroU64,
    _namespace: std::marker::PhantomData<fn() -> T>,
}
impl<T: std::any::Any> Clone for RasterID<T> {
    fn clone(&self) -> Self {
        *self
    }
}
impl<T: std::any::Any> Copy for RasterID<T> {}
impl<T: std::any::Any> PartialEq for RasterID<T> {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}
impl<T: std::any::Any> Eq for RasterID<T> {}
impl<T: std::any::Any> std::hash::Hash for RasterID<T> {
    /// Hashes only the numeric value. The namespace is part of the type, so two IDs that may be
    /// compared always share it.
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}
impl<T: std::any::Any> PartialOrd for RasterID<T> {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}
impl<T: std::any::Any> Ord for RasterID<T> {
    /// Allocation order within one namespace. Handy for deterministic iteration, carries no other meaning.
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        self.id.cmp(&other.id)
    }
}

impl<T: std::any::Any> RasterID<T> {
    /// Allocate a fresh ID.
    #[must_use]
    pub fn new() -> Self {
        let ty = std::any::TypeId::of::<T>();
        let value = {
            let read = ID_SERVER.upgradable_read();
            if let Some(counter) = read.get(&ty) {
                counter.fetch_add(1, Ordering::Relaxed)
            } else {
                // First allocation of this namespace, needs exclusive access once.
                let mut write = parking_lot::RwLockUpgradableReadGuard::upgrade(read);
                write
                    .entry(ty)
                    .or_insert_with(|| AtomicU64::new(1))
                    .fetch_add(1, Ordering::Relaxed)
            }
        };

        // 2^64 allocations in one process isn't something we can recover from.
        let Some(id) = std::num::NonZeroU64::new(value) else {
            log::error!("{} ID overflow! Aborting!", std::any::type_name::<T>());
            log::logger().flush();
            std::process::abort();
        };
        Self {
            id,
            _namespace: std::marker::PhantomData,
        }
    }
    /// Get the raw numeric value of this ID.
    /// IDs from differing namespaces may share the same numeric ID!
    #[must_use]
    pub fn get(&self) -> u64 {
        self.id.get()
    }
}
impl<T: std::any::Any> Default for RasterID<T> {
    fn default() -> Self {
        Self::new()
    }
}
impl<T: std::any::Any> std::fmt::Display for RasterID<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let full = std::any::type_name::<T>();
        // rsplit always yields at least one item, even for an empty name.
        let short = full.rsplit("::").next().unwrap_or(full);
        write!(f, "{short}#{}", self.id)
    }
}
impl<T: std::any::Any> std::fmt::Debug for RasterID<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        <Self as std::fmt::Display>::fmt(self, f)
    }
}
