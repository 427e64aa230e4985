use serde::Deserialize;
use std::fmt;
use std::str::FromStr;

use crate::RegistryError;

/// A single live instance of a service.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Deserialize)]
#[serde(try_from = "String")]
pub struct ServerAddress {
    pub host: String,
    pub port: u16,
}

impl ServerAddress {
    pub fn new<H>(host: H, port: u16) -> Self
    where
        H: Into<String>,
    {
        ServerAddress {
            host: host.into(),
            port,
        }
    }

    /// Base URL of the instance, without a trailing slash.
    pub fn base_url(&self) -> String {
        format!("http://{}:{}", self.host, self.port)
    }
}

impl fmt::Display for ServerAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.host, self.port)
    }
}

impl FromStr for ServerAddress {
    type Err = RegistryError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (host, port) = s
            .trim()
            .rsplit_once(':')
            .ok_or_else(|| RegistryError::InvalidAddress(s.to_string()))?;

        if host.is_empty() {
            return Err(RegistryError::InvalidAddress(s.to_string()));
        }

        let port = port
            .parse::<u16>()
            .map_err(|_| RegistryError::InvalidAddress(s.to_string()))?;

        Ok(ServerAddress::new(host, port))
    }
}

impl TryFrom<String> for ServerAddress {
    type Error = RegistryError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}
