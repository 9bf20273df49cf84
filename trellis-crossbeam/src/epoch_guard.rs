//! Epoch-based guard implementation using crossbeam-epoch.

use crossbeam_epoch::{self as epoch, Guard as CrossbeamGuard};
use trellis_core::Guard;

/// Epoch-based memory reclamation guard.
///
/// A zero-sized handle onto the global epoch collector. Read-side operations
/// pin the current thread; an unlinked node scheduled with `defer_destroy`
/// is deallocated only after every thread pinned at scheduling time has
/// moved on, so a reader that snapshotted a pointer before the unlink can
/// never touch freed memory.
///
/// Reclamation is batched and amortized; memory may linger briefly under
/// read-heavy load, unlike the deferred guard which holds it for the life of
/// the map.
#[derive(Clone, Copy, Default)]
pub struct EpochGuard;

impl EpochGuard {
    pub fn new() -> Self {
        EpochGuard
    }
}

impl Guard for EpochGuard {
    /// An actual pinned epoch; dropping it lets collection proceed.
    type ReadGuard = CrossbeamGuard;

    fn pin() -> Self::ReadGuard {
        epoch::pin()
    }

    unsafe fn defer_destroy<N>(&self, node: *mut N, dealloc: unsafe fn(*mut N)) {
        let guard = epoch::pin();
        unsafe {
            guard.defer_unchecked(move || {
                dealloc(node);
            });
        }
        // Unpinned here; the destruction runs once all pinned threads advance.
    }
}
