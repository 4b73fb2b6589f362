//! # Corral Core
//!
//! `corral_core` provides the building blocks shared by the corral crates:
//! the error taxonomy and the connection configuration handed to resource
//! factories.
//!
//! ## Crate Structure
//!
//! - **error**: Error types for all corral components
//! - **config**: Connection configuration consumed by resource factories

pub mod config;
pub mod error;

// Re-export key types for easier access
pub use config::ConnectionConfig;
pub use error::{Error, OperationError, PoolError, Result};
