use reqwest::header::{AUTHORIZATION, HeaderMap, HeaderName, HeaderValue};
use serde::Deserialize;
use std::collections::HashMap;
use std::time::Duration;

use crate::errors::ResilientError;

fn default_timeout_ms() -> u64 {
    5000
}

fn default_retry() -> u32 {
    2
}

fn default_wait_before_retry_ms() -> u64 {
    200
}

fn default_true() -> bool {
    true
}

/// Server selection flags. See [`crate::balancer::BalanceMode`] for how they combine.
#[derive(Clone, Copy, Deserialize, Debug, PartialEq)]
pub struct BalancerConfig {
    #[serde(default = "default_true")]
    pub random: bool,
    #[serde(default = "default_true")]
    pub round_robin: bool,
}

impl Default for BalancerConfig {
    fn default() -> Self {
        BalancerConfig {
            random: true,
            round_robin: true,
        }
    }
}

#[derive(Clone, Deserialize, Debug, PartialEq)]
pub struct ClientConfig {
    /// Prefix prepended to every request path, e.g. `/api`.
    #[serde(default)]
    pub base_path: String,
    /// Upper bound for a single attempt, including reading the body.
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,
    /// Number of retries after the first attempt.
    #[serde(default = "default_retry")]
    pub retry: u32,
    #[serde(default = "default_wait_before_retry_ms")]
    pub wait_before_retry_ms: u64,
    /// Sent as a bearer credential on every request.
    #[serde(default)]
    pub server_key: Option<String>,
    #[serde(default)]
    pub headers: HashMap<String, String>,
    #[serde(default)]
    pub balancer: BalancerConfig,
}

impl Default for ClientConfig {
    fn default() -> Self {
        ClientConfig {
            base_path: String::new(),
            timeout_ms: default_timeout_ms(),
            retry: default_retry(),
            wait_before_retry_ms: default_wait_before_retry_ms(),
            server_key: None,
            headers: HashMap::new(),
            balancer: BalancerConfig::default(),
        }
    }
}

impl ClientConfig {
    pub fn validate(&self) -> Result<(), ResilientError> {
        if self.timeout_ms == 0 {
            return Err(ResilientError::InvalidConfig(
                "timeout_ms must be greater than 0".into(),
            ));
        }
        self.header_map()?;
        Ok(())
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    pub fn wait_before_retry(&self) -> Duration {
        Duration::from_millis(self.wait_before_retry_ms)
    }

    /// Configured headers plus the authorization header, if a server key is set.
    pub fn header_map(&self) -> Result<HeaderMap, ResilientError> {
        let mut headers = HeaderMap::new();

        for (name, value) in &self.headers {
            let name = HeaderName::try_from(name.as_str())
                .map_err(|_| ResilientError::InvalidHeader(name.clone()))?;
            let value = HeaderValue::try_from(value.as_str())
                .map_err(|_| ResilientError::InvalidHeader(name.to_string()))?;
            headers.insert(name, value);
        }

        if let Some(key) = &self.server_key {
            let mut value = HeaderValue::try_from(format!("Bearer {key}"))
                .map_err(|_| ResilientError::InvalidHeader(AUTHORIZATION.to_string()))?;
            value.set_sensitive(true);
            headers.insert(AUTHORIZATION, value);
        }

        Ok(headers)
    }

    /// Joins the base path and a request path with exactly one slash between them.
    pub fn full_path(&self, path: &str) -> String {
        let base = self.base_path.trim_matches('/');
        let path = path.trim_start_matches('/');
        if base.is_empty() {
            format!("/{path}")
        } else {
            format!("/{base}/{path}")
        }
    }
}
