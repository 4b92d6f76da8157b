//! Synchronization Module
//!
//! Request de-duplication primitives shared by the cache tiers.

mod group;

pub use group::Group;
