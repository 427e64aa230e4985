//! Resolution of logical service names to the addresses of their live instances.
//!
//! A registry never fails a lookup: a directory that cannot be reached, or a
//! service without any instance that is up, both resolve to an empty list, and
//! callers treat that as "no live servers".

pub mod config;
mod eureka;
mod types;

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;

pub use config::RegistryConfig;
pub use eureka::EurekaRegistry;
pub use types::ServerAddress;

#[derive(thiserror::Error, Debug)]
pub enum RegistryError {
    #[error("HTTP client error: {0}")]
    ReqwestError(#[from] reqwest::Error),
    #[error("invalid URL: {0}")]
    InvalidUrl(String),
    #[error("invalid server address: {0}")]
    InvalidAddress(String),
    #[error("directory responded with status {0}")]
    UnexpectedStatus(reqwest::StatusCode),
}

#[async_trait]
pub trait ServerRegistry: Send + Sync {
    /// Returns the addresses currently registered for `service`, in directory order.
    async fn resolve(&self, service: &str) -> Vec<ServerAddress>;
}

/// Registry backed by a fixed, configured list of addresses per service.
pub struct StaticRegistry {
    services: HashMap<String, Vec<ServerAddress>>,
}

impl StaticRegistry {
    pub fn new(services: HashMap<String, Vec<ServerAddress>>) -> Self {
        // Service names are case-insensitive, as in the discovery directory
        let services = services
            .into_iter()
            .map(|(name, addresses)| (name.to_ascii_lowercase(), addresses))
            .collect();

        StaticRegistry { services }
    }
}

#[async_trait]
impl ServerRegistry for StaticRegistry {
    async fn resolve(&self, service: &str) -> Vec<ServerAddress> {
        self.services
            .get(&service.to_ascii_lowercase())
            .cloned()
            .unwrap_or_default()
    }
}

pub fn from_config(config: RegistryConfig) -> Result<Arc<dyn ServerRegistry>, RegistryError> {
    match config {
        RegistryConfig::Static { services } => Ok(Arc::new(StaticRegistry::new(services))),
        RegistryConfig::Eureka { url, timeout_ms } => {
            Ok(Arc::new(EurekaRegistry::new(&url, timeout_ms)?))
        }
    }
}
