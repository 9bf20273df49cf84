use std::alloc::{Layout, alloc, dealloc};
use std::fmt::Debug;
use std::ptr;
use std::sync::atomic::{AtomicBool, AtomicPtr, Ordering};
use std::sync::{Mutex, MutexGuard};
use std::thread;

use crate::guard::{DeferredGuard, Guard};
use crate::maps::OrderedMap;
use crate::maps::level_generator::{DEFAULT_MAX_LEVEL, DEFAULT_PROBABILITY, LevelSampler};

type NodePtr<K, V> = *mut LazyNode<K, V>;

// =============================================================================
// LAZY SKIP MAP - per-node locks, optimistic traversal
// =============================================================================
//
// Structure (sorted ascending, TAIL is a real sentinel node of height 0):
//
// level 2:  HEAD ──────────────────────► 30 ─────────────────────► TAIL
// level 1:  HEAD ──────────► 10 ──────► 30 ─────────────────────► TAIL
// level 0:  HEAD ──────────► 10 ──────► 20 ──────► 30 ──────► 40 ─► TAIL
//
// Each node carries a mutex and two monotone flags:
//
//   fully_linked   set once, after the node is spliced in at ALL of its
//                  levels; only then does a lookup treat it as present
//   marked         set once, under the node's own lock; the node is
//                  logically gone from that instant, unlinking follows
//
// Node states:  INSERTING ──► LIVE ──► DYING ──► (reclaimed by guard)
//               (¬linked)     (linked)  (marked)
//
// TRAVERSAL is lock-free: `find` walks the towers top-down with plain
// acquire loads and records a predecessor/successor pair per level. That
// output is a HYPOTHESIS: the structure may have shifted by the time a
// writer acts on it, so every mutation re-checks it after locking:
//
//   insert   locks preds[0..=h], requires  ¬pred.marked ∧ ¬succ.marked
//            ∧ pred.forward[level] == succ  at every level, then splices
//            bottom-up and publishes with fully_linked
//   remove   locks the victim, marks it, then locks preds[0..=h] and
//            requires  ¬pred.marked ∧ pred.forward[level] == victim;
//            on failure it re-finds and retries while keeping the mark
//
// A validation failure means another writer moved a predecessor or killed a
// successor in the window between the optimistic walk and the lock
// acquisition; dropping the locks and retrying with a fresh hypothesis is
// always safe because no pointer has been written yet.
//
// MARK-THEN-UNLINK: a lookup that reaches the victim after the mark but
// before the unlink observes `marked` and reports absent; an inserter that
// adopted the victim as a successor fails validation and retries. Readers
// that already hold a pointer to an unlinked node are protected by the
// reclamation guard; destruction is scheduled, never immediate.
//
// LOCK ORDER: every acquisition sequence (victim, then predecessors in
// rising level order, duplicates skipped) walks strictly DESCENDING keys, so
// any wait chain descends through distinct keys and can never close a cycle.
//
// =============================================================================

/// A tower node.
///
/// Single-allocation layout with the forward tower inline after the struct
/// fields (`[forward[0], ..., forward[top_level]]`), so a node costs one
/// allocation regardless of height.
#[repr(C)]
struct LazyNode<K, V> {
    /// `None` only for the head and tail sentinels.
    entry: Option<(K, V)>,
    /// Highest level this node occupies; the tower has `top_level + 1` slots.
    top_level: usize,
    marked: AtomicBool,
    fully_linked: AtomicBool,
    lock: Mutex<()>,
    // Flexible array: successor pointers live inline after this struct.
    tower: [AtomicPtr<LazyNode<K, V>>; 0],
}

impl<K, V> LazyNode<K, V> {
    fn layout(top_level: usize) -> Layout {
        Layout::new::<Self>()
            .extend(Layout::array::<AtomicPtr<Self>>(top_level + 1).unwrap())
            .unwrap()
            .0
            .pad_to_align()
    }

    fn alloc_raw(entry: Option<(K, V)>, top_level: usize) -> NodePtr<K, V> {
        unsafe {
            let layout = Self::layout(top_level);
            let node = alloc(layout) as NodePtr<K, V>;
            if node.is_null() {
                std::alloc::handle_alloc_error(layout);
            }

            ptr::write(&raw mut (*node).entry, entry);
            ptr::write(&raw mut (*node).top_level, top_level);
            ptr::write(&raw mut (*node).marked, AtomicBool::new(false));
            ptr::write(&raw mut (*node).fully_linked, AtomicBool::new(false));
            ptr::write(&raw mut (*node).lock, Mutex::new(()));

            let tower = (*node).tower.as_ptr() as *mut AtomicPtr<Self>;
            for slot in 0..=top_level {
                ptr::write(tower.add(slot), AtomicPtr::new(ptr::null_mut()));
            }

            node
        }
    }

    fn alloc_entry(key: K, value: V, top_level: usize) -> NodePtr<K, V> {
        Self::alloc_raw(Some((key, value)), top_level)
    }

    fn alloc_sentinel(top_level: usize) -> NodePtr<K, V> {
        Self::alloc_raw(None, top_level)
    }

    /// Deallocate a node created by `alloc_raw`.
    ///
    /// # Safety
    /// The node must be unreachable and must not be deallocated twice.
    unsafe fn dealloc_node(node: NodePtr<K, V>) {
        unsafe {
            let layout = Self::layout((*node).top_level);
            ptr::drop_in_place(node);
            dealloc(node as *mut u8, layout);
        }
    }

    fn key(&self) -> &K {
        let (key, _) = self.entry.as_ref().expect("sentinel has no entry");
        key
    }

    fn value(&self) -> &V {
        let (_, value) = self.entry.as_ref().expect("sentinel has no entry");
        value
    }

    #[inline]
    fn tower_slot(&self, level: usize) -> &AtomicPtr<Self> {
        debug_assert!(level <= self.top_level);
        unsafe { &*self.tower.as_ptr().add(level) }
    }

    /// Load the successor at `level`.
    #[inline]
    fn forward(&self, level: usize) -> NodePtr<K, V> {
        self.tower_slot(level).load(Ordering::Acquire)
    }

    /// Publish a successor at `level`. Callers hold the lock of whichever
    /// node owns the slot.
    #[inline]
    fn set_forward(&self, level: usize, succ: NodePtr<K, V>) {
        self.tower_slot(level).store(succ, Ordering::Release);
    }

    #[inline]
    fn is_marked(&self) -> bool {
        self.marked.load(Ordering::Acquire)
    }

    #[inline]
    fn is_fully_linked(&self) -> bool {
        self.fully_linked.load(Ordering::Acquire)
    }
}

/// Per-level mutex guards held during a splice, deduplicated: a node that is
/// predecessor at several adjacent levels is locked exactly once.
struct LockedPreds<'a, K, V> {
    guards: Vec<(NodePtr<K, V>, MutexGuard<'a, ()>)>,
}

impl<'a, K, V> LockedPreds<'a, K, V> {
    fn with_capacity(levels: usize) -> Self {
        LockedPreds {
            guards: Vec::with_capacity(levels),
        }
    }

    /// Lock `pred` unless it is already held.
    fn acquire(&mut self, pred: NodePtr<K, V>) {
        if !self.guards.iter().any(|(held, _)| *held == pred) {
            let guard = unsafe { (*pred).lock.lock().unwrap() };
            self.guards.push((pred, guard));
        }
    }
}

/// Concurrent skip-list map with per-node locking.
///
/// Lookups and traversal are lock-free; `insert` and `remove` lock only the
/// handful of nodes adjacent to the affected tower, after validating an
/// optimistically collected search path. Disjoint keys proceed in parallel.
///
/// Removed nodes are reclaimed through the map's [`Guard`]; the default
/// [`DeferredGuard`] holds them until the map drops.
pub struct LazySkipMap<K, V, G: Guard = DeferredGuard> {
    head: NodePtr<K, V>,
    tail: NodePtr<K, V>,
    sampler: LevelSampler,
    guard: G,
}

// Safety: the map owns every node; entries cross threads by move (reclaimed
// on whichever thread the guard runs) and are handed out by shared reference
// to visitors on any thread.
unsafe impl<K: Send, V: Send, G: Guard> Send for LazySkipMap<K, V, G> {}
unsafe impl<K: Send + Sync, V: Send + Sync, G: Guard> Sync for LazySkipMap<K, V, G> {}

impl<K: Ord, V, G: Guard> LazySkipMap<K, V, G> {
    /// Create a map with the default tower cap (16) and probability (0.5).
    pub fn new() -> Self {
        Self::with_params(DEFAULT_MAX_LEVEL, DEFAULT_PROBABILITY)
    }

    /// Create a map whose towers are sampled with `probability` and capped at
    /// `max_level` (inclusive).
    pub fn with_params(max_level: usize, probability: f64) -> Self {
        let head = LazyNode::alloc_sentinel(max_level);
        let tail = LazyNode::alloc_sentinel(0);
        unsafe {
            for level in 0..=max_level {
                (*head).set_forward(level, tail);
            }
        }
        LazySkipMap {
            head,
            tail,
            sampler: LevelSampler::new(max_level, probability),
            guard: G::default(),
        }
    }

    #[inline]
    fn max_level(&self) -> usize {
        self.sampler.max_level()
    }

    fn level_buffers(&self) -> (Vec<NodePtr<K, V>>, Vec<NodePtr<K, V>>) {
        let slots = self.max_level() + 1;
        (vec![ptr::null_mut(); slots], vec![ptr::null_mut(); slots])
    }

    /// Lock-free top-down walk producing the predecessor/successor hypothesis
    /// for `key` at every level, and the highest level at which the key was
    /// seen. The status flags are deliberately not consulted here; writers
    /// validate the hypothesis under locks before acting on it.
    fn find(
        &self,
        key: &K,
        preds: &mut [NodePtr<K, V>],
        succs: &mut [NodePtr<K, V>],
    ) -> Option<usize> {
        let mut pred = self.head;
        let mut found = None;
        for level in (0..=self.max_level()).rev() {
            unsafe {
                let mut curr = (*pred).forward(level);
                while curr != self.tail && key > (*curr).key() {
                    pred = curr;
                    curr = (*curr).forward(level);
                }
                if found.is_none() && curr != self.tail && key == (*curr).key() {
                    found = Some(level);
                }
                preds[level] = pred;
                succs[level] = curr;
            }
        }
        found
    }

    /// Find the live node for `key`, if any. The caller must hold a read pin.
    fn lookup(&self, key: &K) -> Option<NodePtr<K, V>> {
        let (mut preds, mut succs) = self.level_buffers();
        let found = self.find(key, &mut preds, &mut succs)?;
        let node = succs[found];
        unsafe {
            if (*node).is_fully_linked() && !(*node).is_marked() {
                Some(node)
            } else {
                None
            }
        }
    }
}

impl<K: Ord, V, G: Guard> Default for LazySkipMap<K, V, G> {
    fn default() -> Self {
        Self::new()
    }
}

impl<K: Ord, V, G: Guard> OrderedMap<K, V> for LazySkipMap<K, V, G> {
    fn insert(&self, key: K, value: V) -> bool {
        let _pin = G::pin();
        let top_level = self.sampler.sample();
        let (mut preds, mut succs) = self.level_buffers();

        loop {
            if let Some(found) = self.find(&key, &mut preds, &mut succs) {
                let existing = succs[found];
                unsafe {
                    if !(*existing).is_marked() {
                        // A live node owns this key. It may still be
                        // mid-insert; wait out its publication so a caller
                        // that sees `false` can immediately observe the
                        // winner.
                        while !(*existing).is_fully_linked() {
                            thread::yield_now();
                        }
                        return false;
                    }
                }
                // The previous owner is on its way out; take a fresh look.
                continue;
            }

            let mut locked = LockedPreds::with_capacity(top_level + 1);
            let mut valid = true;
            for level in 0..=top_level {
                let pred = preds[level];
                let succ = succs[level];
                locked.acquire(pred);
                let unchanged = unsafe {
                    !(*pred).is_marked()
                        && !(*succ).is_marked()
                        && (*pred).forward(level) == succ
                };
                if !unchanged {
                    valid = false;
                    break;
                }
            }
            if !valid {
                drop(locked);
                continue;
            }

            // The hypothesis held at every level and the predecessors are
            // pinned by their locks: splice bottom-up, then publish. A
            // traversal that meets the node at level L descends through
            // tower slots written before the level-L splice.
            unsafe {
                let node = LazyNode::alloc_entry(key, value, top_level);
                for level in 0..=top_level {
                    (*node).set_forward(level, succs[level]);
                    (*preds[level]).set_forward(level, node);
                }
                (*node).fully_linked.store(true, Ordering::Release);
            }
            return true;
        }
    }

    fn remove(&self, key: &K) -> bool {
        let _pin = G::pin();
        let (mut preds, mut succs) = self.level_buffers();
        let mut victim: NodePtr<K, V> = ptr::null_mut();
        let mut victim_guard: Option<MutexGuard<'_, ()>> = None;
        let mut top_level = 0;

        loop {
            let found = self.find(key, &mut preds, &mut succs);

            if victim_guard.is_none() {
                let Some(level) = found else {
                    return false;
                };
                let candidate = succs[level];
                unsafe {
                    // A hit below the node's own top level means the walk
                    // raced a partially observed tower; restart until the
                    // view is coherent.
                    let eligible = (*candidate).is_fully_linked()
                        && (*candidate).top_level == level
                        && !(*candidate).is_marked();
                    if !eligible {
                        thread::yield_now();
                        continue;
                    }

                    let guard = (*candidate).lock.lock().unwrap();
                    if (*candidate).is_marked() {
                        // Lost the race to a concurrent remover.
                        return false;
                    }
                    (*candidate).marked.store(true, Ordering::Release);
                    top_level = (*candidate).top_level;
                    victim = candidate;
                    victim_guard = Some(guard);
                }
            }

            let mut locked = LockedPreds::with_capacity(top_level + 1);
            let mut valid = true;
            for level in 0..=top_level {
                let pred = preds[level];
                locked.acquire(pred);
                let unchanged =
                    unsafe { !(*pred).is_marked() && (*pred).forward(level) == victim };
                if !unchanged {
                    valid = false;
                    break;
                }
            }
            if !valid {
                // A predecessor moved under us. The mark stays set (the
                // node is already logically gone) and the next find produces
                // a fresh unlink path.
                drop(locked);
                continue;
            }

            unsafe {
                for level in (0..=top_level).rev() {
                    (*preds[level]).set_forward(level, (*victim).forward(level));
                }
            }

            drop(victim_guard);
            drop(locked);
            // Unreachable by new traversals; readers that still hold a
            // pointer are covered by the guard.
            unsafe {
                self.guard.defer_destroy(victim, LazyNode::dealloc_node);
            }
            return true;
        }
    }

    fn get(&self, key: &K) -> Option<V>
    where
        V: Clone,
    {
        let _pin = G::pin();
        self.lookup(key).map(|node| unsafe { (*node).value().clone() })
    }

    fn contains(&self, key: &K) -> bool {
        let _pin = G::pin();
        self.lookup(key).is_some()
    }

    fn for_each<F>(&self, mut visit: F)
    where
        F: FnMut(&K, &V),
    {
        let _pin = G::pin();
        unsafe {
            let mut curr = (*self.head).forward(0);
            while curr != self.tail {
                visit((*curr).key(), (*curr).value());
                curr = (*curr).forward(0);
            }
        }
    }

    fn dump(&self)
    where
        K: Debug,
        V: Debug,
    {
        let _pin = G::pin();
        for level in (0..=self.max_level()).rev() {
            print!("level {level:>2}:");
            unsafe {
                let mut curr = (*self.head).forward(level);
                while curr != self.tail {
                    print!(" ({:?}, {:?})", (*curr).key(), (*curr).value());
                    curr = (*curr).forward(level);
                }
            }
            println!();
        }
    }
}

impl<K, V, G: Guard> Drop for LazySkipMap<K, V, G> {
    fn drop(&mut self) {
        // Only linked nodes are on the level-0 chain; removed ones belong to
        // the guard, which drops after this body.
        unsafe {
            let mut curr = (*self.head).forward(0);
            while curr != self.tail {
                let next = (*curr).forward(0);
                LazyNode::dealloc_node(curr);
                curr = next;
            }
            LazyNode::dealloc_node(self.head);
            LazyNode::dealloc_node(self.tail);
        }
    }
}
