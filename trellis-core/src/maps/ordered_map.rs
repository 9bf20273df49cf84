use std::fmt::Debug;

/// Shared contract of the skip-list map variants.
///
/// Keys are totally ordered and immutable once inserted; values leave the map
/// only as clones. Duplicate insertion never overwrites the stored value:
/// the first writer wins and later inserts report `false`.
///
/// All operations take `&self`: implementations synchronize internally, so a
/// map behind an `Arc` can be driven from any number of threads.
pub trait OrderedMap<K: Ord, V> {
    /// Insert `key` → `value`.
    ///
    /// Returns `true` if the key was absent and is now present; `false` if it
    /// was already present (the stored value is left untouched).
    fn insert(&self, key: K, value: V) -> bool;

    /// Remove `key`.
    ///
    /// Returns `true` iff this call removed the key; `false` when the key is
    /// absent or another thread removed it first.
    fn remove(&self, key: &K) -> bool;

    /// Look up `key` and return a clone of its value.
    fn get(&self, key: &K) -> Option<V>
    where
        V: Clone;

    /// Whether `key` is currently present.
    fn contains(&self, key: &K) -> bool;

    /// Visit every entry in ascending key order.
    ///
    /// Not atomic with respect to concurrent mutation: the coarse variant
    /// holds its global lock for the whole walk, the concurrent variant
    /// provides no isolation and may hand the visitor entries that are being
    /// removed. The visitor must not call back into the map.
    fn for_each<F>(&self, visit: F)
    where
        F: FnMut(&K, &V);

    /// Print the per-level structure to stdout. Diagnostic only.
    fn dump(&self)
    where
        K: Debug,
        V: Debug;

    /// Number of entries, counted by a level-0 walk.
    fn len(&self) -> usize {
        let mut count = 0;
        self.for_each(|_, _| count += 1);
        count
    }

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Collect all entries, in key order, as clones.
    fn to_vec(&self) -> Vec<(K, V)>
    where
        K: Clone,
        V: Clone,
    {
        let mut entries = Vec::new();
        self.for_each(|key, value| entries.push((key.clone(), value.clone())));
        entries
    }
}
