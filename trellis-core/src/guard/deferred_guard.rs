//! Deferred guard implementation for testing.

use std::sync::Mutex;

#[cfg(debug_assertions)]
use std::collections::HashSet;

use super::Guard;

/// A guard that defers all node destruction until it is dropped.
///
/// Removed nodes stay allocated for the lifetime of the owning map, which
/// makes destruction timing predictable in tests. Not suitable for
/// long-running workloads with many removals: memory only comes back when
/// the map drops.
///
/// Nodes are collected under a `Mutex` so removers on any thread can
/// schedule destruction safely.
pub struct DeferredGuard {
    deferred: Mutex<Vec<DeferredNode>>,
    #[cfg(debug_assertions)]
    seen: Mutex<HashSet<usize>>,
}

struct DeferredNode {
    ptr: *mut (),
    dealloc: unsafe fn(*mut ()),
}

// Safety: the raw pointer is only touched at drop time, and scheduling is
// serialized through the Mutex.
unsafe impl Send for DeferredNode {}

impl DeferredGuard {
    pub fn new() -> Self {
        DeferredGuard {
            deferred: Mutex::new(Vec::new()),
            #[cfg(debug_assertions)]
            seen: Mutex::new(HashSet::new()),
        }
    }
}

impl Default for DeferredGuard {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for DeferredGuard {
    fn drop(&mut self) {
        for node in self.deferred.get_mut().unwrap().drain(..) {
            unsafe {
                (node.dealloc)(node.ptr);
            }
        }
    }
}

impl Guard for DeferredGuard {
    /// No per-operation pinning: every scheduled node outlives the map.
    type ReadGuard = ();

    fn pin() -> Self::ReadGuard {}

    unsafe fn defer_destroy<N>(&self, node: *mut N, dealloc: unsafe fn(*mut N)) {
        #[cfg(debug_assertions)]
        {
            let mut seen = self.seen.lock().unwrap();
            assert!(
                seen.insert(node as usize),
                "node {:#x} scheduled for destruction twice",
                node as usize
            );
        }

        let node = DeferredNode {
            ptr: node as *mut (),
            dealloc: unsafe {
                std::mem::transmute::<unsafe fn(*mut N), unsafe fn(*mut ())>(dealloc)
            },
        };
        self.deferred.lock().unwrap().push(node);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn frees_scheduled_nodes_on_drop() {
        let guard = DeferredGuard::default();

        for i in 0..10 {
            let ptr = Box::into_raw(Box::new(i));
            unsafe {
                guard.defer_destroy(ptr, |p| {
                    drop(Box::from_raw(p));
                });
            }
        }
        // All 10 nodes freed when guard drops.
    }

    #[test]
    #[cfg(debug_assertions)]
    #[should_panic(expected = "scheduled for destruction twice")]
    fn double_schedule_is_caught() {
        let guard = DeferredGuard::default();
        let ptr = Box::into_raw(Box::new(7));

        unsafe {
            guard.defer_destroy(ptr, |p| drop(Box::from_raw(p)));
            guard.defer_destroy(ptr, |p| drop(Box::from_raw(p)));
        }
    }
}
