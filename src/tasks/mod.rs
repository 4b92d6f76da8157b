//! Background Tasks Module
//!
//! Contains background tasks owned by a cache instance.
//!
//! # Tasks
//! - Expiry Sweeper: Removes idle memory entries at the configured interval

mod sweeper;

pub use sweeper::{spawn_sweeper, Sweeper};
