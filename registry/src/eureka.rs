use async_trait::async_trait;
use reqwest::StatusCode;
use reqwest::header::ACCEPT;
use serde::Deserialize;
use std::time::Duration;
use url::Url;

use crate::{RegistryError, ServerAddress, ServerRegistry};

const STATUS_UP: &str = "UP";

#[derive(Deserialize)]
struct ApplicationEnvelope {
    application: Application,
}

#[derive(Deserialize)]
struct Application {
    #[serde(default)]
    instance: OneOrMany<Instance>,
}

// The directory encodes a single instance as an object rather than a one element array.
#[derive(Deserialize)]
#[serde(untagged)]
enum OneOrMany<T> {
    Many(Vec<T>),
    One(T),
}

impl<T> Default for OneOrMany<T> {
    fn default() -> Self {
        OneOrMany::Many(Vec::new())
    }
}

impl<T> OneOrMany<T> {
    fn into_vec(self) -> Vec<T> {
        match self {
            OneOrMany::Many(items) => items,
            OneOrMany::One(item) => vec![item],
        }
    }
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct Instance {
    vip_address: String,
    status: String,
    port: InstancePort,
}

#[derive(Deserialize)]
struct InstancePort {
    #[serde(rename = "$")]
    number: PortNumber,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum PortNumber {
    Number(u16),
    Text(String),
}

impl PortNumber {
    fn value(&self) -> Option<u16> {
        match self {
            PortNumber::Number(n) => Some(*n),
            PortNumber::Text(s) => s.parse().ok(),
        }
    }
}

/// Looks services up in a Eureka-style discovery directory on every call.
pub struct EurekaRegistry {
    client: reqwest::Client,
    base_url: String,
}

impl EurekaRegistry {
    pub fn new(base_url: &str, timeout_ms: u64) -> Result<Self, RegistryError> {
        let base_url = format!("{}/{}/", base_url.trim_end_matches('/'), "apps");
        Url::parse(&base_url).map_err(|e| RegistryError::InvalidUrl(e.to_string()))?;

        let client = reqwest::Client::builder()
            .timeout(Duration::from_millis(timeout_ms))
            .build()?;

        Ok(EurekaRegistry { client, base_url })
    }

    async fn fetch_instances(&self, service: &str) -> Result<Vec<ServerAddress>, RegistryError> {
        let url = Url::parse(&self.base_url)
            .and_then(|base| base.join(&service.to_ascii_uppercase()))
            .map_err(|e| RegistryError::InvalidUrl(e.to_string()))?;

        let response = self
            .client
            .get(url)
            .header(ACCEPT, "application/json")
            .send()
            .await?;

        match response.status() {
            status if status.is_success() => {}
            StatusCode::NOT_FOUND => return Ok(Vec::new()),
            status => return Err(RegistryError::UnexpectedStatus(status)),
        }

        let envelope = response.json::<ApplicationEnvelope>().await?;

        let addresses = envelope
            .application
            .instance
            .into_vec()
            .into_iter()
            .filter(|instance| instance.status.eq_ignore_ascii_case(STATUS_UP))
            .filter_map(|instance| {
                let port = instance.port.number.value()?;
                Some(ServerAddress::new(instance.vip_address, port))
            })
            .collect();

        Ok(addresses)
    }
}

#[async_trait]
impl ServerRegistry for EurekaRegistry {
    async fn resolve(&self, service: &str) -> Vec<ServerAddress> {
        match self.fetch_instances(service).await {
            Ok(addresses) => {
                if addresses.is_empty() {
                    tracing::warn!(service, "no live instances registered");
                } else {
                    tracing::debug!(service, count = addresses.len(), "resolved instances");
                }
                addresses
            }
            Err(err) => {
                tracing::error!(service, error = %err, "service discovery lookup failed");
                Vec::new()
            }
        }
    }
}
