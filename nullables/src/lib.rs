//! Nullable infrastructure for deterministic testing.
//!
//! The registry core only sees storage through traits and time through block
//! heights. This crate provides in-memory stand-ins that never touch the
//! filesystem and only move forward when a test says so.

pub mod clock;
pub mod store;

pub use clock::NullClock;
pub use store::NullRegistryStore;
