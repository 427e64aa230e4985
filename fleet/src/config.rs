use enrichment::config::Config as EnrichmentConfig;
use serde::Deserialize;
use std::fs::File;

#[derive(Clone, Debug, Deserialize, PartialEq)]
pub struct MetricsConfig {
    pub statsd_host: String,
    pub statsd_port: u16,
}

#[derive(Clone, Debug, Deserialize, PartialEq)]
pub struct LoggingConfig {
    pub sentry_dsn: String,
}

#[derive(Clone, Debug, Deserialize, PartialEq)]
pub struct CommonConfig {
    pub metrics: Option<MetricsConfig>,
    pub logging: Option<LoggingConfig>,
}

#[derive(Clone, Debug, Deserialize, PartialEq)]
pub struct Config {
    #[serde(flatten)]
    pub common: CommonConfig,
    #[serde(flatten)]
    pub enrichment: EnrichmentConfig,
}

impl Config {
    pub fn from_file(path: &std::path::Path) -> Result<Self, ConfigError> {
        let file = File::open(path)?;
        let data = serde_yaml::from_reader(file)?;

        Ok(data)
    }
}

#[derive(thiserror::Error, Debug)]
pub enum ConfigError {
    #[error("could not load config from file: {0}")]
    LoadError(#[from] std::io::Error),
    #[error("could not parse config: {0}")]
    ParseError(#[from] serde_yaml::Error),
}

#[cfg(test)]
mod tests {
    use super::*;
    use enrichment::cache::CacheConfig;
    use registry::RegistryConfig;
    use std::io::Write;

    fn write_tmp_file(s: &str) -> tempfile::NamedTempFile {
        let mut tmp = tempfile::NamedTempFile::new().expect("create temp file");
        write!(tmp, "{}", s).expect("write yaml");

        tmp
    }

    #[test]
    fn full_config() {
        let yaml = r#"
            listener:
                host: 0.0.0.0
                port: 8080
            admin_listener:
                host: 127.0.0.1
                port: 8081
            logging:
                sentry_dsn: https://key@sentry.example.com/1
            metrics:
                statsd_host: 127.0.0.1
                statsd_port: 8125
            registry:
                type: eureka
                url: http://eureka.internal:8761/eureka
            resilient:
                base_path: /api
                retry: 3
                server_key: secret
                balancer:
                    random: false
            remote:
                service: users
            cache:
                type: memory
                max_capacity: 500
            "#;
        let tmp = write_tmp_file(yaml);
        let config = Config::from_file(tmp.path()).expect("load config");

        assert_eq!(
            config.common.metrics,
            Some(MetricsConfig {
                statsd_host: "127.0.0.1".into(),
                statsd_port: 8125,
            })
        );
        assert_eq!(
            config.common.logging.unwrap().sentry_dsn,
            "https://key@sentry.example.com/1"
        );

        let enrichment = config.enrichment;
        assert_eq!(enrichment.listener.port, 8080);
        assert_eq!(enrichment.admin_listener.host, "127.0.0.1");
        assert!(matches!(
            enrichment.registry,
            RegistryConfig::Eureka { timeout_ms: 2000, .. }
        ));
        assert_eq!(enrichment.resilient.retry, 3);
        assert!(!enrichment.resilient.balancer.random);
        assert!(enrichment.resilient.balancer.round_robin);
        assert_eq!(enrichment.remote.join_path, "/users/join/id");
        assert_eq!(enrichment.cache, CacheConfig::Memory { max_capacity: 500 });
        enrichment.validate().expect("valid config");
    }

    #[test]
    fn minimal_config() {
        let yaml = r#"
            listener:
                host: 0.0.0.0
                port: 8080
            admin_listener:
                host: 0.0.0.0
                port: 8081
            registry:
                type: static
                services:
                    users: ["10.0.0.1:8080", "10.0.0.2:8080"]
            remote:
                service: users
            "#;
        let tmp = write_tmp_file(yaml);
        let config = Config::from_file(tmp.path()).expect("load config");

        assert_eq!(config.common.metrics, None);
        assert_eq!(config.common.logging, None);
        assert_eq!(config.enrichment.resilient, resilient::ClientConfig::default());
        assert_eq!(config.enrichment.cache, CacheConfig::default());
    }

    #[test]
    fn invalid_config() {
        let missing = Config::from_file(std::path::Path::new("/nonexistent/fleet.yaml"));
        assert!(matches!(missing, Err(ConfigError::LoadError(_))));

        let tmp = write_tmp_file("listener: [not, a, listener]\n");
        let garbled = Config::from_file(tmp.path());
        assert!(matches!(garbled, Err(ConfigError::ParseError(_))));
    }
}
