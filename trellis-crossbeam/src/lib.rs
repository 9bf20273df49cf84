//! Crossbeam-based memory reclamation for trellis maps.
//!
//! This crate provides [`EpochGuard`], an implementation of the
//! [`Guard`](trellis_core::Guard) trait over crossbeam-epoch. Pair it with
//! the concurrent map for production use, where the deferred guard's
//! free-on-drop policy would pile up memory:
//!
//! ```ignore
//! use trellis_core::{LazySkipMap, OrderedMap};
//! use trellis_crossbeam::EpochGuard;
//!
//! let map: LazySkipMap<i64, String, EpochGuard> = LazySkipMap::new();
//! map.insert(42, "forty-two".to_owned());
//! ```

pub mod epoch_guard;

pub use epoch_guard::EpochGuard;

/// The production configuration of the concurrent map.
pub type EpochSkipMap<K, V> = trellis_core::LazySkipMap<K, V, EpochGuard>;
