use serde::Deserialize;
use std::collections::HashMap;

use crate::ServerAddress;

fn default_timeout_ms() -> u64 {
    2000
}

#[derive(Clone, Deserialize, Debug, PartialEq)]
#[serde(rename_all = "lowercase")]
#[serde(tag = "type")]
pub enum RegistryConfig {
    /// Fixed addresses per service name.
    Static {
        services: HashMap<String, Vec<ServerAddress>>,
    },
    /// Eureka-style discovery directory, e.g. `http://discovery:8761/eureka`.
    Eureka {
        url: String,
        #[serde(default = "default_timeout_ms")]
        timeout_ms: u64,
    },
}
