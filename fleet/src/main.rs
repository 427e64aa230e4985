mod config;

use clap::{Args, Parser};
use metrics_exporter_statsd::StatsdBuilder;
use shared::metrics_defs::describe_all;
use std::path::PathBuf;
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::prelude::*;

use crate::config::{CommonConfig, Config, ConfigError, MetricsConfig};

#[derive(Parser)]
enum CliCommand {
    /// Serve the vehicle enrichment endpoint and the admin probes.
    Run(ConfigArgs),
    /// Load and validate the configuration, then exit.
    CheckConfig(ConfigArgs),
}

#[derive(Args)]
struct ConfigArgs {
    #[arg(long, default_value = "fleet.yaml")]
    config: PathBuf,
}

#[derive(thiserror::Error, Debug)]
enum FleetError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error("invalid configuration: {0}")]
    Validation(#[from] enrichment::config::ValidationError),
    #[error(transparent)]
    Enrichment(#[from] enrichment::EnrichmentError),
    #[error("invalid sentry dsn: {0}")]
    InvalidDsn(#[from] sentry::types::ParseDsnError),
    #[error("could not install metrics recorder: {0}")]
    Metrics(String),
    #[error("could not start runtime: {0}")]
    Runtime(#[from] std::io::Error),
}

fn main() -> ExitCode {
    let cli = CliCommand::parse();

    let result = match cli {
        CliCommand::Run(args) => run(&args.config),
        CliCommand::CheckConfig(args) => check_config(&args.config),
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!(error = %e, "fleet exited with an error");
            eprintln!("error: {e}");
            ExitCode::FAILURE
        }
    }
}

fn check_config(path: &std::path::Path) -> Result<(), FleetError> {
    let config = Config::from_file(path)?;
    config.enrichment.validate()?;
    println!("{} is valid", path.display());
    Ok(())
}

fn run(path: &std::path::Path) -> Result<(), FleetError> {
    let config = Config::from_file(path)?;
    config.enrichment.validate()?;

    // Flushes pending events when dropped
    let _sentry = init_logging(&config.common)?;

    if let Some(metrics) = &config.common.metrics {
        init_metrics(metrics)?;
    }
    describe_all(resilient::metrics_defs::ALL_METRICS);
    describe_all(enrichment::metrics_defs::ALL_METRICS);

    let rt = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()?;

    tracing::info!(config = %path.display(), "starting fleet");
    rt.block_on(enrichment::run(config.enrichment))?;
    Ok(())
}

fn init_logging(common: &CommonConfig) -> Result<Option<sentry::ClientInitGuard>, FleetError> {
    let guard = match &common.logging {
        Some(logging) => {
            let dsn = logging.sentry_dsn.parse::<sentry::types::Dsn>()?;
            Some(sentry::init(sentry::ClientOptions {
                dsn: Some(dsn),
                release: sentry::release_name!(),
                ..Default::default()
            }))
        }
        None => None,
    };

    let sentry_layer = guard
        .as_ref()
        .map(|_| sentry::integrations::tracing::layer());

    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with(tracing_subscriber::fmt::layer())
        .with(sentry_layer)
        .init();

    Ok(guard)
}

fn init_metrics(config: &MetricsConfig) -> Result<(), FleetError> {
    let recorder = StatsdBuilder::from(config.statsd_host.clone(), config.statsd_port)
        .build(Some("fleet"))
        .map_err(|e| FleetError::Metrics(e.to_string()))?;
    metrics::set_global_recorder(recorder).map_err(|e| FleetError::Metrics(e.to_string()))?;

    tracing::info!(
        host = %config.statsd_host,
        port = config.statsd_port,
        "sending metrics to statsd"
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn check_config_validates() {
        let mut tmp = tempfile::NamedTempFile::new().expect("create temp file");
        write!(
            tmp,
            r#"
            listener:
                host: 0.0.0.0
                port: 0
            admin_listener:
                host: 0.0.0.0
                port: 8081
            registry:
                type: static
                services: {{}}
            remote:
                service: users
            "#
        )
        .expect("write yaml");

        let err = check_config(tmp.path()).unwrap_err();
        assert!(matches!(err, FleetError::Validation(_)));
    }

    #[test]
    fn cli_defaults() {
        let cli = CliCommand::parse_from(["fleet", "run"]);
        let CliCommand::Run(args) = cli else {
            panic!("expected run");
        };
        assert_eq!(args.config, PathBuf::from("fleet.yaml"));

        let cli =
            CliCommand::parse_from(["fleet", "check-config", "--config", "/etc/fleet.yaml"]);
        let CliCommand::CheckConfig(args) = cli else {
            panic!("expected check-config");
        };
        assert_eq!(args.config, PathBuf::from("/etc/fleet.yaml"));
    }
}
