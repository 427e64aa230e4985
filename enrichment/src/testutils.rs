use async_trait::async_trait;
use bytes::Bytes;
use registry::{ServerAddress, StaticRegistry};
use resilient::{BalancerConfig, ClientConfig, ClientFactory, ClientHooks};
use serde_json::{Map, json};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use wiremock::MockServer;

use crate::cache::{CacheError, CacheStore};
use crate::config::RemoteConfig;
use crate::enricher::Enricher;
use crate::types::{CourierId, Vehicle};

pub const USERS_SERVICE: &str = "users";

pub fn address(server: &MockServer) -> ServerAddress {
    let addr = server.address();
    ServerAddress::new(addr.ip().to_string(), addr.port())
}

/// Client settings with short timings and ordered balancing, so tests know
/// which server each attempt goes to.
pub fn client_config(retry: u32) -> ClientConfig {
    ClientConfig {
        base_path: "/api".into(),
        timeout_ms: 200,
        retry,
        wait_before_retry_ms: 10,
        server_key: Some("server-key".into()),
        headers: HashMap::new(),
        balancer: BalancerConfig {
            random: false,
            round_robin: false,
        },
    }
}

pub fn enricher_with(
    servers: Vec<ServerAddress>,
    cache: Arc<dyn CacheStore>,
    retry: u32,
) -> Enricher {
    let registry = StaticRegistry::new(HashMap::from([(USERS_SERVICE.to_string(), servers)]));
    let clients = ClientFactory::new(
        Arc::new(registry),
        client_config(retry),
        ClientHooks::default(),
    )
    .unwrap();

    Enricher::new(
        clients,
        cache,
        RemoteConfig {
            service: USERS_SERVICE.into(),
            join_path: "/users/join/id".into(),
        },
    )
}

pub fn vehicle(id: &str, courier_id: Option<CourierId>) -> Vehicle {
    Vehicle {
        id: id.into(),
        name: format!("vehicle {id}"),
        courier_id,
        vehicle_type: None,
        extra: Map::new(),
    }
}

pub fn profile_json(id: CourierId, user_name: &str) -> Bytes {
    Bytes::from(json!({"id": id, "userName": user_name}).to_string())
}

/// Polls until the background write-through lands in the cache.
pub async fn wait_for_key(cache: &dyn CacheStore, key: &str) -> Option<Bytes> {
    for _ in 0..50 {
        if let Ok(Some(value)) = cache.get(key).await {
            return Some(value);
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    None
}

/// A cache store that misbehaves in a fixed way.
pub struct TestCache {
    fail: bool,
}

impl TestCache {
    /// Every operation errors.
    pub fn failing() -> Self {
        TestCache { fail: true }
    }

    /// Multi-gets return fewer values than keys.
    pub fn truncating() -> Self {
        TestCache { fail: false }
    }
}

#[async_trait]
impl CacheStore for TestCache {
    async fn get(&self, _key: &str) -> Result<Option<Bytes>, CacheError> {
        if self.fail {
            return Err(CacheError::Unavailable("connection refused".into()));
        }
        Ok(None)
    }

    async fn mget(&self, _keys: &[String]) -> Result<Vec<Option<Bytes>>, CacheError> {
        if self.fail {
            return Err(CacheError::Unavailable("connection refused".into()));
        }
        Ok(Vec::new())
    }

    async fn set_with_expiry(
        &self,
        _key: &str,
        _ttl: Duration,
        _value: Bytes,
    ) -> Result<(), CacheError> {
        if self.fail {
            return Err(CacheError::Unavailable("connection refused".into()));
        }
        Ok(())
    }
}
