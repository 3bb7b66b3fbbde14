//! Handle pools and pooled containers.
//!
//! This module provides the object pools every renderer subsystem stores its
//! records in:
//!
//! - [`Handle<T>`] - a copyable `(index, generation)` reference into a pool slot
//! - [`HandlePool<T>`] - fixed-capacity pool with LIFO id reuse
//! - [`SyncHandlePool<T>`] - the same pool behind a mutex, shared between threads
//! - [`Pooled<T>`] - a container that keeps its allocation while inactive
//!
//! # Id reuse and generations
//!
//! A released slot id goes on a free stack and is handed out again by the very
//! next allocation. Every release bumps the slot's generation, and every handle
//! remembers the generation it was created with, so a handle kept across a
//! release/realloc cycle no longer resolves:
//!
//! ```
//! use relay_core::pool::HandlePool;
//!
//! let mut pool = HandlePool::new("strings", 4);
//! let a = pool.insert(String::from("a"));
//! assert!(pool.release(a));
//!
//! let b = pool.insert(String::from("b"));
//! assert_eq!(a.index(), b.index()); // id reused immediately
//! assert!(pool.get(a).is_none()); // but the stale handle is rejected
//! assert_eq!(pool.get(b).map(String::as_str), Some("b"));
//! ```

use std::fmt;
use std::hash::{Hash, Hasher};
use std::marker::PhantomData;

use parking_lot::{MappedMutexGuard, Mutex, MutexGuard};

// ============================================================================
// Handle
// ============================================================================

/// Typed reference to a slot in a [`HandlePool`].
///
/// Handles are plain data: copying one does not keep the slot alive.
pub struct Handle<T> {
    index: u32,
    generation: u32,
    _marker: PhantomData<fn() -> T>,
}

impl<T> Handle<T> {
    fn new(index: u32, generation: u32) -> Self {
        Self {
            index,
            generation,
            _marker: PhantomData,
        }
    }

    /// Rebuild a handle from its parts. The result is only meaningful for the
    /// pool that produced them.
    pub fn from_raw(index: u32, generation: u32) -> Self {
        Self::new(index, generation)
    }

    /// Slot index inside the owning pool.
    pub fn index(&self) -> u32 {
        self.index
    }

    /// Generation of the slot at the time this handle was allocated.
    pub fn generation(&self) -> u32 {
        self.generation
    }
}

impl<T> Clone for Handle<T> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<T> Copy for Handle<T> {}

impl<T> PartialEq for Handle<T> {
    fn eq(&self, other: &Self) -> bool {
        self.index == other.index && self.generation == other.generation
    }
}

impl<T> Eq for Handle<T> {}

impl<T> Hash for Handle<T> {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.index.hash(state);
        self.generation.hash(state);
    }
}

impl<T> fmt::Debug for Handle<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Handle({}v{})", self.index, self.generation)
    }
}

// ============================================================================
// HandlePool
// ============================================================================

#[derive(Debug)]
struct Slot<T> {
    value: T,
    generation: u32,
    in_use: bool,
}

/// Fixed-capacity object pool addressed by [`Handle`]s.
///
/// Allocation takes an id from the free stack (most recently released first)
/// and only grows the slot array when the stack is empty. Running out of
/// capacity is an engine bug and panics.
#[derive(Debug)]
pub struct HandlePool<T> {
    label: &'static str,
    slots: Vec<Slot<T>>,
    free: Vec<u32>,
    capacity: usize,
    live: usize,
}

impl<T> HandlePool<T> {
    /// Create an empty pool that can hold at most `capacity` live objects.
    ///
    /// # Panics
    ///
    /// Panics if `capacity` is zero or does not fit a `u32` index.
    pub fn new(label: &'static str, capacity: usize) -> Self {
        assert!(capacity > 0, "{label} pool capacity must be at least 1");
        assert!(
            capacity <= u32::MAX as usize,
            "{label} pool capacity {capacity} exceeds u32 index range"
        );
        Self {
            label,
            slots: Vec::new(),
            free: Vec::new(),
            capacity,
            live: 0,
        }
    }

    /// Debug label used in diagnostics.
    pub fn label(&self) -> &'static str {
        self.label
    }

    /// Maximum number of live objects.
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Number of live objects.
    pub fn len(&self) -> usize {
        self.live
    }

    /// Whether no object is live.
    pub fn is_empty(&self) -> bool {
        self.live == 0
    }

    /// Allocate a slot holding `value`.
    ///
    /// # Panics
    ///
    /// Panics if the pool is at capacity.
    pub fn insert(&mut self, value: T) -> Handle<T> {
        if let Some(index) = self.free.pop() {
            let slot = &mut self.slots[index as usize];
            slot.value = value;
            slot.in_use = true;
            self.live += 1;
            return Handle::new(index, slot.generation);
        }
        let index = self.grow();
        self.slots.push(Slot {
            value,
            generation: 0,
            in_use: true,
        });
        self.live += 1;
        Handle::new(index, 0)
    }

    fn grow(&self) -> u32 {
        assert!(
            self.slots.len() < self.capacity,
            "{} pool exhausted (capacity {})",
            self.label,
            self.capacity
        );
        self.slots.len() as u32
    }

    /// Release the slot behind `handle`, making its id available again.
    ///
    /// Returns `false` (and changes nothing) if the handle is stale or was
    /// never allocated.
    pub fn release(&mut self, handle: Handle<T>) -> bool {
        match self.slots.get_mut(handle.index as usize) {
            Some(slot) if slot.in_use && slot.generation == handle.generation => {
                slot.in_use = false;
                slot.generation = slot.generation.wrapping_add(1);
                self.free.push(handle.index);
                self.live -= 1;
                true
            }
            _ => {
                log::warn!(
                    "{} pool: release of stale or unallocated {:?}",
                    self.label,
                    handle
                );
                false
            }
        }
    }

    /// Whether `handle` refers to a live slot.
    pub fn contains(&self, handle: Handle<T>) -> bool {
        self.get(handle).is_some()
    }

    /// Get the object behind `handle`.
    ///
    /// Returns `None` for released slots and for handles from an older
    /// generation of the slot.
    pub fn get(&self, handle: Handle<T>) -> Option<&T> {
        self.slots
            .get(handle.index as usize)
            .filter(|slot| slot.in_use && slot.generation == handle.generation)
            .map(|slot| &slot.value)
    }

    /// Get the object behind `handle` mutably.
    pub fn get_mut(&mut self, handle: Handle<T>) -> Option<&mut T> {
        self.slots
            .get_mut(handle.index as usize)
            .filter(|slot| slot.in_use && slot.generation == handle.generation)
            .map(|slot| &mut slot.value)
    }

    /// Iterate over all live objects with their handles.
    pub fn iter(&self) -> impl Iterator<Item = (Handle<T>, &T)> + '_ {
        self.slots.iter().enumerate().filter_map(|(index, slot)| {
            slot.in_use
                .then(|| (Handle::new(index as u32, slot.generation), &slot.value))
        })
    }

    /// Release every live slot.
    pub fn release_all(&mut self) {
        for (index, slot) in self.slots.iter_mut().enumerate() {
            if slot.in_use {
                slot.in_use = false;
                slot.generation = slot.generation.wrapping_add(1);
                self.free.push(index as u32);
            }
        }
        self.live = 0;
    }
}

impl<T: Poolable> HandlePool<T> {
    /// Allocate a slot reset to its empty state.
    ///
    /// Reused slots keep their storage (e.g. `Vec` capacity) and are cleared
    /// with [`Poolable::reset`].
    ///
    /// # Panics
    ///
    /// Panics if the pool is at capacity.
    pub fn alloc(&mut self) -> Handle<T> {
        if let Some(index) = self.free.pop() {
            let slot = &mut self.slots[index as usize];
            slot.value.reset();
            slot.in_use = true;
            self.live += 1;
            return Handle::new(index, slot.generation);
        }
        self.insert(T::new_empty())
    }
}

// ============================================================================
// SyncHandlePool
// ============================================================================

/// A [`HandlePool`] that can be shared between the producer and render threads.
///
/// Allocation and release are serialized by a mutex. Lookups take the same
/// mutex for as long as the returned guard lives, so keep guards short.
#[derive(Debug)]
pub struct SyncHandlePool<T> {
    inner: Mutex<HandlePool<T>>,
}

impl<T> SyncHandlePool<T> {
    /// Create an empty shared pool.
    pub fn new(label: &'static str, capacity: usize) -> Self {
        Self {
            inner: Mutex::new(HandlePool::new(label, capacity)),
        }
    }

    /// Allocate a slot holding `value`.
    pub fn insert(&self, value: T) -> Handle<T> {
        self.inner.lock().insert(value)
    }

    /// Release the slot behind `handle`. See [`HandlePool::release`].
    pub fn release(&self, handle: Handle<T>) -> bool {
        self.inner.lock().release(handle)
    }

    /// Whether `handle` refers to a live slot.
    pub fn contains(&self, handle: Handle<T>) -> bool {
        self.inner.lock().contains(handle)
    }

    /// Number of live objects.
    pub fn len(&self) -> usize {
        self.inner.lock().len()
    }

    /// Whether no object is live.
    pub fn is_empty(&self) -> bool {
        self.inner.lock().is_empty()
    }

    /// Lock the pool and map the guard to the object behind `handle`.
    pub fn get(&self, handle: Handle<T>) -> Option<MappedMutexGuard<'_, T>> {
        MutexGuard::try_map(self.inner.lock(), |pool| pool.get_mut(handle)).ok()
    }

    /// Run `f` on the object behind `handle` while holding the lock.
    pub fn with<R>(&self, handle: Handle<T>, f: impl FnOnce(&T) -> R) -> Option<R> {
        self.inner.lock().get(handle).map(f)
    }

    /// Run `f` on the object behind `handle` mutably while holding the lock.
    pub fn with_mut<R>(&self, handle: Handle<T>, f: impl FnOnce(&mut T) -> R) -> Option<R> {
        self.inner.lock().get_mut(handle).map(f)
    }

    /// Lock the whole pool, e.g. to scan it.
    pub fn lock(&self) -> MutexGuard<'_, HandlePool<T>> {
        self.inner.lock()
    }
}

impl<T: Poolable> SyncHandlePool<T> {
    /// Allocate a slot reset to its empty state.
    pub fn alloc(&self) -> Handle<T> {
        self.inner.lock().alloc()
    }
}

// ============================================================================
// Pooled
// ============================================================================

/// Types that can be reset and reused instead of reallocated.
pub trait Poolable {
    /// Create a new empty instance.
    fn new_empty() -> Self;

    /// Reset to the empty state, preserving allocated capacity.
    fn reset(&mut self);
}

/// A value that is either active or parked with its allocation preserved.
///
/// Used for per-frame records that are rebuilt every frame: releasing clears
/// the contents but keeps `Vec` capacity for the next activation.
#[derive(Debug)]
pub enum Pooled<T: Poolable> {
    /// The value is in use.
    Active(T),
    /// The value is cleared and waiting for reuse.
    Pooled(T),
}

impl<T: Poolable> Pooled<T> {
    /// Check if the value is active.
    pub fn is_active(&self) -> bool {
        matches!(self, Self::Active(_))
    }

    /// Get the active value.
    pub fn get(&self) -> Option<&T> {
        match self {
            Self::Active(t) => Some(t),
            Self::Pooled(_) => None,
        }
    }

    /// Get the active value mutably.
    pub fn get_mut(&mut self) -> Option<&mut T> {
        match self {
            Self::Active(t) => Some(t),
            Self::Pooled(_) => None,
        }
    }

    /// Reset the value and park it. No-op if already parked.
    pub fn release(&mut self) {
        if let Self::Active(t) = self {
            t.reset();
            let taken = std::mem::replace(t, T::new_empty());
            *self = Self::Pooled(taken);
        }
    }

    /// Activate the parked value and return it for filling in.
    ///
    /// If already active, returns the existing value.
    pub fn activate(&mut self) -> &mut T {
        if let Self::Pooled(t) = self {
            let taken = std::mem::replace(t, T::new_empty());
            *self = Self::Active(taken);
        }
        match self {
            Self::Active(t) | Self::Pooled(t) => t,
        }
    }
}

impl<T: Poolable> Default for Pooled<T> {
    fn default() -> Self {
        Self::Pooled(T::new_empty())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Default, PartialEq)]
    struct Record {
        values: Vec<u32>,
    }

    impl Poolable for Record {
        fn new_empty() -> Self {
            Self::default()
        }
        fn reset(&mut self) {
            self.values.clear();
        }
    }

    #[test]
    fn test_get_is_stable_until_release() {
        let mut pool = HandlePool::new("test", 8);
        let handles: Vec<_> = (0..8).map(|i| pool.insert(i * 10)).collect();

        for _ in 0..3 {
            for (i, handle) in handles.iter().enumerate() {
                assert_eq!(pool.get(*handle), Some(&(i as i32 * 10)));
            }
        }

        assert!(pool.release(handles[3]));
        assert!(pool.get(handles[3]).is_none());
        assert_eq!(pool.get(handles[4]), Some(&40));
    }

    #[test]
    fn test_ids_reused_lifo() {
        let mut pool = HandlePool::new("test", 8);
        let a = pool.insert('a');
        let b = pool.insert('b');
        let c = pool.insert('c');

        pool.release(a);
        pool.release(c);

        assert_eq!(pool.insert('d').index(), c.index());
        assert_eq!(pool.insert('e').index(), a.index());
        assert_eq!(pool.insert('f').index(), 3);
        assert!(pool.contains(b));
    }

    #[test]
    fn test_stale_handle_rejected() {
        let mut pool = HandlePool::new("test", 2);
        let first = pool.insert(1);
        pool.release(first);
        let second = pool.insert(2);

        assert_eq!(first.index(), second.index());
        assert_ne!(first, second);
        assert!(pool.get(first).is_none());
        assert!(!pool.release(first));
        assert_eq!(pool.get(second), Some(&2));
    }

    #[test]
    #[should_panic(expected = "pool exhausted")]
    fn test_capacity_exhaustion_panics() {
        let mut pool = HandlePool::new("tiny", 2);
        pool.insert(0);
        pool.insert(1);
        pool.insert(2);
    }

    #[test]
    fn test_capacity_counts_live_objects() {
        let mut pool = HandlePool::new("tiny", 2);
        let a = pool.insert(0);
        pool.insert(1);
        pool.release(a);
        pool.insert(2);
        assert_eq!(pool.len(), 2);
    }

    #[test]
    fn test_alloc_resets_reused_slot() {
        let mut pool = HandlePool::<Record>::new("records", 4);
        let handle = pool.alloc();
        pool.get_mut(handle).unwrap().values.extend([1, 2, 3]);
        pool.release(handle);

        let reused = pool.alloc();
        assert_eq!(reused.index(), handle.index());
        let record = pool.get(reused).unwrap();
        assert!(record.values.is_empty());
        assert!(record.values.capacity() >= 3);
    }

    #[test]
    fn test_release_all() {
        let mut pool = HandlePool::new("test", 4);
        let handles: Vec<_> = (0..4).map(|i| pool.insert(i)).collect();
        pool.release_all();
        assert!(pool.is_empty());
        assert!(handles.iter().all(|h| !pool.contains(*h)));
        assert_eq!(pool.iter().count(), 0);
    }

    #[test]
    fn test_iter_yields_live_handles() {
        let mut pool = HandlePool::new("test", 4);
        let a = pool.insert("a");
        let b = pool.insert("b");
        pool.release(a);
        let live: Vec<_> = pool.iter().collect();
        assert_eq!(live, vec![(b, &"b")]);
    }

    #[test]
    fn test_sync_pool_across_threads() {
        let pool = std::sync::Arc::new(SyncHandlePool::new("shared", 1024));
        let workers: Vec<_> = (0..4)
            .map(|t| {
                let pool = pool.clone();
                std::thread::spawn(move || {
                    (0..100)
                        .map(|i| pool.insert(t * 1000 + i))
                        .collect::<Vec<_>>()
                })
            })
            .collect();

        let handles: Vec<_> = workers
            .into_iter()
            .flat_map(|w| w.join().unwrap())
            .collect();
        assert_eq!(pool.len(), 400);
        for handle in &handles {
            assert!(pool.get(*handle).is_some());
        }
    }

    #[test]
    fn test_sync_pool_with_mut() {
        let pool = SyncHandlePool::<Record>::new("records", 4);
        let handle = pool.alloc();
        pool.with_mut(handle, |r| r.values.push(7));
        assert_eq!(pool.with(handle, |r| r.values.clone()), Some(vec![7]));
        assert_eq!(pool.get(handle).unwrap().values, vec![7]);
        assert!(pool.release(handle));
        assert!(pool.with(handle, |_| ()).is_none());
    }

    #[test]
    fn test_pooled_round_trip_keeps_capacity() {
        let mut pooled = Pooled::<Record>::default();
        assert!(!pooled.is_active());

        for i in 0..3 {
            pooled.activate().values.extend(0..10 + i);
            assert!(pooled.is_active());
            pooled.release();
            assert!(pooled.get().is_none());
        }

        let record = pooled.activate();
        assert!(record.values.is_empty());
        assert!(record.values.capacity() >= 12);
    }
}
