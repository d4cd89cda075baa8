//! Retained-subtree cache.
//!
//! This module contains the core cache data structures and policies:
//! - [`entry`]: CacheEntry, Lifecycle, EntryPatch
//! - [`store`]: Ordered store with insertion-order keys and owner-based removal
//! - [`lifecycle`]: Per-pass render decision and lifecycle transitions
//! - [`evictor`]: FIFO capacity bound

pub mod entry;
pub mod evictor;
pub mod lifecycle;
pub mod store;

pub use entry::{new_identification, CacheEntry, EntryPatch, Identification, Lifecycle};
pub use store::{CacheStore, RemoveTarget};
