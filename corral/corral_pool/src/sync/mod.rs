//! Synchronization primitives the pool is built on.
//!
//! - One-shot flags for dispose-exactly-once semantics
//! - A bounded poll helper for drain waits

pub mod atomic;

// Re-export key types from atomic
pub use atomic::{wait_until, OnceFlag};
