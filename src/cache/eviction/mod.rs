//! Eviction ordering for capacity enforcement

pub mod selector;

pub use selector::{EvictionCandidate, EvictionSelector};
