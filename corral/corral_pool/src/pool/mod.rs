//! Leased access to pooled resources.
//!
//! This module provides the pooling mechanism itself:
//!
//! - A registry of resources, each tagged leased or available
//! - Leases granting exclusive, scoped use of one resource

pub mod lease;
pub mod resource;

// Re-export key types from lease
pub use lease::Lease;

// Re-export key types from resource
pub use resource::{ResourceFactory, ResourceId, ResourcePool};
