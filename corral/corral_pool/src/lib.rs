#![deny(warnings)]
#![warn(missing_docs)]
#![warn(rust_2018_idioms)]

//! # Corral Pool
//!
//! Bounded, thread-safe pooling of expensive client handles.
//!
//! A [`ResourcePool`] owns a small, resizable set of resources created by a
//! caller-supplied [`ResourceFactory`] and brokers exclusive access to them:
//! each successful [`ResourcePool::acquire`] yields a [`Lease`] that is the
//! only holder of its resource until it is released. Acquisition never
//! blocks; callers needing backpressure layer their own retry policy on top.
//!
//! ## Integration with Other Corral Crates
//!
//! - **corral_core**: Error taxonomy and the connection configuration
//!   consumed by resource factories
//! - **corral_bridge**: Bridge the legacy begin/end calls of a leased client
//!   handle into awaitable operations

/// Resource pooling and leased access to expensive client handles
pub mod pool;

/// Synchronization primitives the pool is built on
pub mod sync;

// Re-export key types for easier access
pub use pool::{Lease, ResourceFactory, ResourceId, ResourcePool};
