pub mod cache;
pub mod config;
pub mod enricher;
pub mod errors;
pub mod keys;
pub mod merge;
pub mod metrics_defs;
pub mod service;
pub mod types;

#[cfg(test)]
mod testutils;

use resilient::{ClientFactory, ClientHooks};
use shared::admin_service::AdminService;
use shared::http::{bind, run_http_service, serve};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

pub use enricher::{Enricher, PROFILE_TTL};
pub use errors::{EnrichError, EnrichmentError};

use crate::service::EnrichmentService;

/// Builds the enrichment pipeline from `config` and serves it until a listener fails.
pub async fn run(config: config::Config) -> Result<(), EnrichmentError> {
    config.validate()?;

    let registry = registry::from_config(config.registry.clone())?;
    let clients = ClientFactory::new(registry, config.resilient.clone(), ClientHooks::default())?;
    let cache = cache::from_config(&config.cache);
    let enricher = Arc::new(Enricher::new(clients, cache, config.remote.clone()));

    let ready = Arc::new(AtomicBool::new(false));
    let admin_ready = ready.clone();

    let admin_task = run_http_service(
        &config.admin_listener.host,
        config.admin_listener.port,
        AdminService::<_, EnrichmentError>::new(move || admin_ready.load(Ordering::Relaxed)),
    );

    let enrich_listener = bind(&config.listener.host, config.listener.port).await?;
    let enrich_task = serve(enrich_listener, EnrichmentService::new(enricher));

    // Ready once the enrichment endpoint accepts connections
    ready.store(true, Ordering::Relaxed);
    tracing::info!(service = %config.remote.service, "enrichment service started");

    tokio::try_join!(enrich_task, admin_task)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpStream;

    fn free_port() -> u16 {
        std::net::TcpListener::bind("127.0.0.1:0")
            .unwrap()
            .local_addr()
            .unwrap()
            .port()
    }

    async fn get_status(port: u16, path: &str) -> Option<String> {
        let mut stream = TcpStream::connect(("127.0.0.1", port)).await.ok()?;
        let request = format!("GET {path} HTTP/1.1\r\nHost: localhost\r\nConnection: close\r\n\r\n");
        stream.write_all(request.as_bytes()).await.ok()?;
        let mut raw = String::new();
        stream.read_to_string(&mut raw).await.ok()?;
        raw.lines().next().map(str::to_string)
    }

    #[tokio::test]
    async fn test_ready_after_enrich_listener_is_bound() {
        let (port, admin_port) = (free_port(), free_port());
        let config: config::Config = serde_yaml::from_str(&format!(
            r#"
listener:
    host: 127.0.0.1
    port: {port}
admin_listener:
    host: 127.0.0.1
    port: {admin_port}
registry:
    type: static
    services: {{}}
remote:
    service: users
"#
        ))
        .unwrap();

        tokio::spawn(run(config));

        let mut ready = false;
        for _ in 0..100 {
            if get_status(admin_port, "/ready").await.as_deref() == Some("HTTP/1.1 200 OK") {
                ready = true;
                break;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        assert!(ready);

        // Readiness implies the enrichment endpoint already accepts connections
        assert_eq!(
            get_status(port, "/unknown").await.as_deref(),
            Some("HTTP/1.1 404 Not Found")
        );
    }
}
