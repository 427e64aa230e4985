use registry::RegistryConfig;
use resilient::{ClientConfig, ResilientError};
use serde::Deserialize;

use crate::cache::CacheConfig;

#[derive(thiserror::Error, Debug)]
pub enum ValidationError {
    #[error("Port cannot be 0")]
    InvalidPort,

    #[error("Remote service name cannot be empty")]
    EmptyServiceName,

    #[error("Remote join path cannot be empty")]
    EmptyJoinPath,

    #[error("Invalid client configuration: {0}")]
    InvalidClient(#[from] ResilientError),
}

fn default_join_path() -> String {
    "/users/join/id".into()
}

/// Where courier profiles are fetched from.
#[derive(Clone, Debug, Deserialize, PartialEq)]
pub struct RemoteConfig {
    /// Logical name of the users service, as known to the registry.
    pub service: String,
    /// Batch lookup endpoint, relative to the client base path.
    #[serde(default = "default_join_path")]
    pub join_path: String,
}

/// Network listener configuration
#[derive(Clone, Debug, Deserialize, PartialEq)]
pub struct Listener {
    pub host: String,
    pub port: u16,
}

impl Listener {
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.port == 0 {
            return Err(ValidationError::InvalidPort);
        }
        Ok(())
    }
}

#[derive(Clone, Debug, Deserialize, PartialEq)]
pub struct Config {
    /// Serves the enrichment endpoint
    pub listener: Listener,
    /// Serves health and readiness probes
    pub admin_listener: Listener,
    pub registry: RegistryConfig,
    #[serde(default)]
    pub resilient: ClientConfig,
    pub remote: RemoteConfig,
    #[serde(default)]
    pub cache: CacheConfig,
}

impl Config {
    pub fn validate(&self) -> Result<(), ValidationError> {
        self.listener.validate()?;
        self.admin_listener.validate()?;

        if self.remote.service.trim().is_empty() {
            return Err(ValidationError::EmptyServiceName);
        }

        if self.remote.join_path.trim_matches('/').is_empty() {
            return Err(ValidationError::EmptyJoinPath);
        }

        self.resilient.validate()?;

        Ok(())
    }
}
