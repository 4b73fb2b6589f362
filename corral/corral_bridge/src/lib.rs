//! # Corral Bridge
//!
//! `corral_bridge` adapts the legacy begin/end asynchronous call pattern
//! (an operation started by a function that takes a completion callback and
//! returns a cancel-capable handle, and finished by a function that extracts
//! the result from that handle) into a single awaitable value with
//! first-class cancellation.
//!
//! The bridge is independent of `corral_pool`: any begin/end pair can be
//! run through it, pooled client handle or not.

pub mod adapter;

// Re-export key types for easier access
pub use adapter::{run, run_cancelable, CancelableHandle, CompletionCallback, OperationOutcome};
