//! Connection configuration.
//!
//! The pool treats resource construction as opaque: a factory turns one of
//! these configurations into a live client handle. The configuration itself
//! is plain data so it can be loaded from whatever settings source the
//! embedding application uses.

use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::error::PoolError;

/// Configuration for connecting to the external service whose client
/// handles are pooled.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConnectionConfig {
    /// Endpoint URL of the external service.
    pub endpoint: String,

    /// Optional bearer token presented when connecting.
    pub auth_token: Option<String>,

    /// Maximum time to wait when establishing a connection.
    pub connect_timeout: Duration,
}

impl Default for ConnectionConfig {
    fn default() -> Self {
        Self {
            endpoint: String::new(),
            auth_token: None,
            connect_timeout: Duration::from_secs(30),
        }
    }
}

impl ConnectionConfig {
    /// Create a configuration for the given endpoint with default timeouts.
    pub fn new(endpoint: impl Into<String>) -> Self {
        Self {
            endpoint: endpoint.into(),
            ..Self::default()
        }
    }

    /// Set the bearer token presented when connecting.
    pub fn with_auth_token(mut self, token: impl Into<String>) -> Self {
        self.auth_token = Some(token.into());
        self
    }

    /// Set the connect timeout.
    pub fn with_connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    /// Check that this configuration can be handed to a factory.
    ///
    /// # Errors
    ///
    /// Returns [`PoolError::InvalidConfiguration`] if the endpoint is empty.
    pub fn validate(&self) -> Result<(), PoolError> {
        if self.endpoint.trim().is_empty() {
            return Err(PoolError::InvalidConfiguration(
                "endpoint must not be empty".to_string(),
            ));
        }

        Ok(())
    }
}
