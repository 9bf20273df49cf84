use std::fmt::Debug;
use std::ptr;
use std::sync::Mutex;

use crate::maps::OrderedMap;
use crate::maps::level_generator::{DEFAULT_MAX_LEVEL, DEFAULT_PROBABILITY, LevelSampler};

type NodePtr<K, V> = *mut CoarseNode<K, V>;

// =============================================================================
// COARSE SKIP MAP
// =============================================================================
//
// Classical skip list with one mutex around the whole structure:
//
// level 2:  HEAD ──────────────────────► 30 ────────────────► NULL
// level 1:  HEAD ──────────► 10 ──────► 30 ────────────────► NULL
// level 0:  HEAD ──────────► 10 ──────► 20 ──────► 30 ──────► 40 ──► NULL
//
// Levels are null-terminated; `level` tracks the highest level that holds at
// least one node and shrinks back when its chain empties. Every operation
// runs under the global lock, so nodes are plain `Box` allocations freed
// immediately on removal: nothing can observe a node without the lock.
//
// This variant exists as the semantic oracle for `LazySkipMap`, which must be
// externally indistinguishable from it under any interleaving.
//
// =============================================================================

struct CoarseNode<K, V> {
    /// `None` only for the head sentinel.
    entry: Option<(K, V)>,
    /// Successor per level, `entry.top_level + 1` slots, null-terminated.
    forward: Box<[NodePtr<K, V>]>,
}

impl<K, V> CoarseNode<K, V> {
    fn new(key: K, value: V, top_level: usize) -> NodePtr<K, V> {
        Box::into_raw(Box::new(CoarseNode {
            entry: Some((key, value)),
            forward: vec![ptr::null_mut(); top_level + 1].into_boxed_slice(),
        }))
    }

    fn new_sentinel(top_level: usize) -> NodePtr<K, V> {
        Box::into_raw(Box::new(CoarseNode {
            entry: None,
            forward: vec![ptr::null_mut(); top_level + 1].into_boxed_slice(),
        }))
    }

    fn key(&self) -> &K {
        let (key, _) = self.entry.as_ref().expect("sentinel has no entry");
        key
    }

    fn value(&self) -> &V {
        let (_, value) = self.entry.as_ref().expect("sentinel has no entry");
        value
    }
}

struct CoarseInner<K, V> {
    head: NodePtr<K, V>,
    /// Highest level currently holding at least one node.
    level: usize,
}

impl<K: Ord, V> CoarseInner<K, V> {
    /// Walk down from the live top level, recording at every level the
    /// rightmost node with a smaller key. Returns the level-0 successor of
    /// the final predecessor: the only node that can match `key`.
    fn find_node(&self, key: &K, mut update: Option<&mut [NodePtr<K, V>]>) -> NodePtr<K, V> {
        let mut node = self.head;
        for level in (0..=self.level).rev() {
            unsafe {
                while !(*node).forward[level].is_null() && (*(*node).forward[level]).key() < key {
                    node = (*node).forward[level];
                }
            }
            if let Some(update) = update.as_deref_mut() {
                update[level] = node;
            }
        }
        unsafe { (*node).forward[0] }
    }
}

/// Skip-list map guarded by a single mutex.
///
/// Expected `O(log n)` insert, remove, and lookup, with all concurrency
/// handled by one lock. See the module header for the role this variant
/// plays next to [`LazySkipMap`](crate::LazySkipMap).
pub struct CoarseSkipMap<K, V> {
    inner: Mutex<CoarseInner<K, V>>,
    sampler: LevelSampler,
}

// Safety: all node access goes through the mutex, which owns the structure;
// entries only cross threads by move or clone.
unsafe impl<K: Send, V: Send> Send for CoarseSkipMap<K, V> {}
unsafe impl<K: Send, V: Send> Sync for CoarseSkipMap<K, V> {}

impl<K: Ord, V> CoarseSkipMap<K, V> {
    /// Create a map with the default tower cap (16) and probability (0.5).
    pub fn new() -> Self {
        Self::with_params(DEFAULT_MAX_LEVEL, DEFAULT_PROBABILITY)
    }

    /// Create a map whose towers are sampled with `probability` and capped at
    /// `max_level` (inclusive).
    pub fn with_params(max_level: usize, probability: f64) -> Self {
        CoarseSkipMap {
            inner: Mutex::new(CoarseInner {
                head: CoarseNode::new_sentinel(max_level),
                level: 0,
            }),
            sampler: LevelSampler::new(max_level, probability),
        }
    }
}

impl<K: Ord, V> Default for CoarseSkipMap<K, V> {
    fn default() -> Self {
        Self::new()
    }
}

impl<K: Ord, V> OrderedMap<K, V> for CoarseSkipMap<K, V> {
    fn insert(&self, key: K, value: V) -> bool {
        let mut inner = self.inner.lock().unwrap();
        let mut update = vec![ptr::null_mut(); self.sampler.max_level() + 1];
        let node = inner.find_node(&key, Some(&mut update));
        unsafe {
            if !node.is_null() && (*node).key() == &key {
                // First writer wins; the stored value is left untouched.
                return false;
            }
        }

        let top_level = self.sampler.sample();
        if top_level > inner.level {
            // Fresh levels have no predecessor yet but the head.
            for slot in update.iter_mut().take(top_level + 1).skip(inner.level + 1) {
                *slot = inner.head;
            }
            inner.level = top_level;
        }

        let new_node = CoarseNode::new(key, value, top_level);
        unsafe {
            for level in 0..=top_level {
                (*new_node).forward[level] = (*update[level]).forward[level];
                (*update[level]).forward[level] = new_node;
            }
        }
        true
    }

    fn remove(&self, key: &K) -> bool {
        let mut inner = self.inner.lock().unwrap();
        let mut update = vec![ptr::null_mut(); self.sampler.max_level() + 1];
        let node = inner.find_node(key, Some(&mut update));
        unsafe {
            if node.is_null() || (*node).key() != key {
                return false;
            }

            for level in 0..=inner.level {
                if (*update[level]).forward[level] != node {
                    // The node's tower stops below this level.
                    break;
                }
                (*update[level]).forward[level] = (*node).forward[level];
            }
            drop(Box::from_raw(node));

            while inner.level > 0 && (*inner.head).forward[inner.level].is_null() {
                inner.level -= 1;
            }
        }
        true
    }

    fn get(&self, key: &K) -> Option<V>
    where
        V: Clone,
    {
        let inner = self.inner.lock().unwrap();
        let node = inner.find_node(key, None);
        unsafe {
            if !node.is_null() && (*node).key() == key {
                Some((*node).value().clone())
            } else {
                None
            }
        }
    }

    fn contains(&self, key: &K) -> bool {
        let inner = self.inner.lock().unwrap();
        let node = inner.find_node(key, None);
        unsafe { !node.is_null() && (*node).key() == key }
    }

    fn for_each<F>(&self, mut visit: F)
    where
        F: FnMut(&K, &V),
    {
        let inner = self.inner.lock().unwrap();
        unsafe {
            let mut node = (*inner.head).forward[0];
            while !node.is_null() {
                visit((*node).key(), (*node).value());
                node = (*node).forward[0];
            }
        }
    }

    fn dump(&self)
    where
        K: Debug,
        V: Debug,
    {
        let inner = self.inner.lock().unwrap();
        for level in (0..=inner.level).rev() {
            print!("level {level:>2}:");
            unsafe {
                let mut node = (*inner.head).forward[level];
                while !node.is_null() {
                    print!(" ({:?}, {:?})", (*node).key(), (*node).value());
                    node = (*node).forward[level];
                }
            }
            println!();
        }
    }
}

impl<K, V> Drop for CoarseSkipMap<K, V> {
    fn drop(&mut self) {
        let inner = self.inner.get_mut().unwrap();
        let mut node = inner.head;
        while !node.is_null() {
            unsafe {
                let next = (*node).forward[0];
                drop(Box::from_raw(node));
                node = next;
            }
        }
    }
}
