//! Concurrent ordered key-value maps built on probabilistic skip lists.
//!
//! Two implementations of the same [`OrderedMap`] contract:
//!
//! - [`CoarseSkipMap`] - a classical skip list behind a single mutex.
//!   Simple, and the reference oracle for the concurrent variant.
//! - [`LazySkipMap`] - per-node locking with optimistic, lock-free lookups.
//!   Writers lock only the predecessors of the affected tower; readers take
//!   no locks at all.
//!
//! The concurrent map is generic over its [`Guard`] memory-reclamation
//! strategy. [`DeferredGuard`] frees removed nodes when the map drops
//! (deterministic, test-friendly); `trellis-crossbeam` provides an
//! epoch-based guard for production use.

pub mod common_tests;
pub mod guard;
pub mod maps;

pub use guard::{DeferredGuard, Guard};
pub use maps::{CoarseSkipMap, LazySkipMap, OrderedMap};
