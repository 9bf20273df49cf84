//! Reusable test suites shared by every map variant.
//!
//! The functions here are generic over [`OrderedMap`](crate::OrderedMap) so
//! the same assertions run against the coarse map, the lazy map with the
//! deferred guard, and the lazy map with the epoch guard (from
//! `trellis-crossbeam`). Integration tests under `tests/` instantiate them
//! per variant.
