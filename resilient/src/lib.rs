//! HTTP client bound to the live instances of one remote service.
//!
//! Every request is tried against up to `retry + 1` servers chosen by the
//! [`balancer::Balancer`]. An attempt fails when the transport fails, when it
//! exceeds the configured timeout, or when the fail predicate rejects the
//! response. The normalizer runs on every response before it is classified.

pub mod balancer;
pub mod config;
pub mod errors;
pub mod hooks;
pub mod metrics_defs;
mod response;

use bytes::Bytes;
use registry::{ServerAddress, ServerRegistry};
use reqwest::Method;
use reqwest::header::HeaderMap;
use serde::Serialize;
use shared::{counter, gauge, histogram};
use std::sync::Arc;
use std::time::Instant;
use tokio::time::{sleep, timeout};

use crate::balancer::{BalanceMode, Balancer};
use crate::metrics_defs::{
    REMOTE_ATTEMPTS, REMOTE_NO_SERVERS, REMOTE_REQUEST_DURATION, REMOTE_RETRIES_EXHAUSTED,
    REMOTE_SERVERS,
};

pub use config::{BalancerConfig, ClientConfig};
pub use errors::{AttemptFailure, ResilientError};
pub use hooks::ClientHooks;
pub use response::Response;

/// State shared by every client built from the same configuration.
struct ClientShared {
    http: reqwest::Client,
    config: ClientConfig,
    headers: HeaderMap,
    hooks: ClientHooks,
    balancer: Balancer,
}

impl ClientShared {
    fn new(config: ClientConfig, hooks: ClientHooks) -> Result<Self, ResilientError> {
        config.validate()?;
        let headers = config.header_map()?;
        let balancer = Balancer::new(BalanceMode::from(config.balancer));

        Ok(ClientShared {
            http: reqwest::Client::new(),
            config,
            headers,
            hooks,
            balancer,
        })
    }
}

#[derive(Clone)]
pub struct ResilientClient {
    service: String,
    servers: Arc<[ServerAddress]>,
    shared: Arc<ClientShared>,
}

impl ResilientClient {
    /// Builds a client over an already resolved server pool. An empty pool is
    /// accepted; every request made through it fails without any attempt.
    pub fn new(
        service: &str,
        servers: Vec<ServerAddress>,
        config: ClientConfig,
        hooks: ClientHooks,
    ) -> Result<Self, ResilientError> {
        Ok(ResilientClient {
            service: service.to_string(),
            servers: servers.into(),
            shared: Arc::new(ClientShared::new(config, hooks)?),
        })
    }

    pub fn service(&self) -> &str {
        &self.service
    }

    pub fn servers(&self) -> &[ServerAddress] {
        &self.servers
    }

    pub async fn post_json<B: Serialize + ?Sized>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<Response, ResilientError> {
        let body = Bytes::from(serde_json::to_vec(body)?);
        self.request(Method::POST, path, Some(body)).await
    }

    pub async fn get(&self, path: &str) -> Result<Response, ResilientError> {
        self.request(Method::GET, path, None).await
    }

    /// Sends the request, retrying on failed attempts. `body` is sent as JSON.
    pub async fn request(
        &self,
        method: Method,
        path: &str,
        body: Option<Bytes>,
    ) -> Result<Response, ResilientError> {
        if self.servers.is_empty() {
            counter!(REMOTE_NO_SERVERS).increment(1);
            return Err(ResilientError::NoServersAvailable(self.service.clone()));
        }

        let shared = &self.shared;
        let full_path = shared.config.full_path(path);
        let started = Instant::now();
        let mut attempt: u32 = 0;

        let result = loop {
            let Some(server) = shared.balancer.select(&self.servers, attempt as usize) else {
                break Err(ResilientError::NoServersAvailable(self.service.clone()));
            };
            attempt += 1;

            let failure = match self.attempt(server, &method, &full_path, body.clone()).await {
                Ok(mut response) => {
                    (shared.hooks.normalizer)(&mut response);
                    if !(shared.hooks.fail_predicate)(&response) {
                        counter!(REMOTE_ATTEMPTS, "outcome" => "success").increment(1);
                        break Ok(response);
                    }
                    AttemptFailure::Rejected(response.status())
                }
                Err(failure) => failure,
            };

            counter!(REMOTE_ATTEMPTS, "outcome" => "failure").increment(1);
            tracing::debug!(
                service = %self.service,
                server = %server,
                path = %full_path,
                attempt,
                error = %failure,
                "attempt failed"
            );

            if attempt > shared.config.retry {
                counter!(REMOTE_RETRIES_EXHAUSTED).increment(1);
                tracing::warn!(
                    service = %self.service,
                    path = %full_path,
                    attempts = attempt,
                    error = %failure,
                    "retries exhausted"
                );
                break Err(ResilientError::RetriesExhausted {
                    attempts: attempt,
                    last: failure,
                });
            }

            sleep(shared.config.wait_before_retry()).await;
        };

        histogram!(REMOTE_REQUEST_DURATION).record(started.elapsed().as_secs_f64());
        result
    }

    /// A single attempt against one server. The timeout covers reading the body.
    async fn attempt(
        &self,
        server: &ServerAddress,
        method: &Method,
        path: &str,
        body: Option<Bytes>,
    ) -> Result<Response, AttemptFailure> {
        let shared = &self.shared;
        let url = format!("{}{}", server.base_url(), path);

        let mut builder = shared
            .http
            .request(method.clone(), url)
            .headers(shared.headers.clone());

        if let Some(body) = body {
            builder = builder
                .header(reqwest::header::CONTENT_TYPE, "application/json")
                .body(body);
        }

        let exchange = async {
            let response = builder.send().await?;
            let status = response.status();
            let headers = response.headers().clone();
            let bytes = response.bytes().await?;
            Ok::<_, reqwest::Error>((status, headers, bytes))
        };

        let (status, headers, bytes) = timeout(shared.config.timeout(), exchange)
            .await
            // Elapsed
            .map_err(|_| AttemptFailure::Timeout)?
            .map_err(AttemptFailure::Transport)?;

        Ok(Response::new(status, headers, path.to_string(), bytes))
    }
}

/// Builds clients for a service, resolving its servers afresh on every call.
///
/// Clients built by one factory share their HTTP connection pool and the
/// round-robin cursor, so load keeps rotating across orchestration calls.
#[derive(Clone)]
pub struct ClientFactory {
    registry: Arc<dyn ServerRegistry>,
    shared: Arc<ClientShared>,
}

impl ClientFactory {
    pub fn new(
        registry: Arc<dyn ServerRegistry>,
        config: ClientConfig,
        hooks: ClientHooks,
    ) -> Result<Self, ResilientError> {
        Ok(ClientFactory {
            registry,
            shared: Arc::new(ClientShared::new(config, hooks)?),
        })
    }

    pub async fn client(&self, service: &str) -> ResilientClient {
        let servers = self.registry.resolve(service).await;
        gauge!(REMOTE_SERVERS, "service" => service.to_string()).set(servers.len() as f64);

        ResilientClient {
            service: service.to_string(),
            servers: servers.into(),
            shared: self.shared.clone(),
        }
    }
}
