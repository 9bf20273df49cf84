//! Ordered map implementations.
//!
//! # Organization
//!
//! - [`coarse_skip_map`] - skip list behind a single mutex
//! - [`lazy_skip_map`] - per-node locks, optimistic lock-free traversal
//! - [`level_generator`] - geometric tower-height sampling
//!
//! Both maps expose the same [`OrderedMap`] contract; tests drive the
//! concurrent variant against the coarse one as a semantic oracle.

pub mod coarse_skip_map;
pub mod lazy_skip_map;
pub(crate) mod level_generator;
pub mod ordered_map;

pub use coarse_skip_map::CoarseSkipMap;
pub use lazy_skip_map::LazySkipMap;
pub use ordered_map::OrderedMap;
