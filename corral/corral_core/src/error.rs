//! Error types for the corral crates.
//!
//! Errors are organized by subsystem, each with its own type. The root
//! `Error` can wrap any of the subsystem errors, allowing uniform handling
//! at the top level. Note that an exhausted pool is not an error at all:
//! acquisition reports it as an empty result.

use thiserror::Error;

/// Convenience result alias over the root [`Error`].
pub type Result<T> = std::result::Result<T, Error>;

/// Root error type for the corral crates.
#[derive(Debug, Error)]
pub enum Error {
    /// Resource pool errors
    #[error("Pool error: {0}")]
    Pool(#[from] PoolError),

    /// Bridged legacy operation errors
    #[error("Operation error: {0}")]
    Operation(#[from] OperationError),

    /// I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Errors related to resource pool operations.
#[derive(Debug, Error)]
pub enum PoolError {
    /// The pool was constructed with an unusable configuration
    #[error("Invalid pool configuration: {0}")]
    InvalidConfiguration(String),

    /// A pool operation was given an unusable argument
    #[error("Invalid pool argument: {0}")]
    InvalidArgument(String),

    /// The resource factory failed to create a resource
    #[error("Failed to create resource: {0}")]
    CreationFailed(String),

    /// The pool has begun disposing and accepts no further changes
    #[error("Pool is disposed")]
    Disposed,
}

/// Errors related to bridged begin/end operations.
#[derive(Debug, Error)]
pub enum OperationError {
    /// The operation was canceled before it completed
    #[error("Operation was canceled")]
    Canceled,

    /// The legacy system dropped the completion callback without invoking it
    #[error("Operation was abandoned before completion")]
    NeverCompleted,
}
