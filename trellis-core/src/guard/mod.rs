//! Guard trait for memory reclamation strategies.
//!
//! A node that has been unlinked from a concurrent map may still be reachable
//! through a traversal that started before the unlink. Freeing it immediately
//! would hand those readers a dangling pointer, so maps never deallocate a
//! removed node directly: they schedule it on their guard, and the guard
//! decides when deallocation is safe.
//!
//! ```text
//! LazySkipMap<K, V, G: Guard>
//!     │
//!     ├── LazySkipMap<K, V, DeferredGuard>   (testing: freed on map drop)
//!     └── LazySkipMap<K, V, EpochGuard>      (production: crossbeam-epoch,
//!                                             in trellis-crossbeam)
//! ```

mod deferred_guard;

pub use deferred_guard::DeferredGuard;

/// A memory reclamation strategy for unlinked nodes.
///
/// # Safety Contract
///
/// Implementations must ensure that a node passed to `defer_destroy` is not
/// deallocated while any thread holding a live [`Guard::pin`] token from
/// before the call can still reach it.
///
/// The guard value stored in a map schedules destruction; actual read-side
/// protection is per-operation via [`Guard::pin`].
pub trait Guard: Sized + Default + Send + Sync {
    /// Token that protects all node reads for its lifetime.
    ///
    /// For epoch-based guards this holds a pinned epoch; for
    /// [`DeferredGuard`] it is `()` because the map's stored guard already
    /// keeps every scheduled node alive.
    type ReadGuard: Sized;

    /// Pin the current thread for a read-side critical section.
    fn pin() -> Self::ReadGuard;

    /// Schedule a node for destruction once no reader can reach it.
    ///
    /// # Safety
    ///
    /// - `node` must have been allocated by the scheduling collection
    /// - `node` must already be unlinked (unreachable by new traversals)
    /// - `dealloc` must be the matching deallocation function for `node`
    /// - `node` must not be scheduled twice
    unsafe fn defer_destroy<N>(&self, node: *mut N, dealloc: unsafe fn(*mut N));
}
