use proxy::config::Config as GatewayConfig;
use serde::Deserialize;
use std::fs::File;

#[derive(Debug, Deserialize)]
pub struct MetricsConfig {
    pub statsd_host: String,
    pub statsd_port: u16,
}

#[derive(Debug, Deserialize)]
pub struct LoggingConfig {
    pub sentry_dsn: String,
}

#[derive(Debug, Deserialize, Default)]
pub struct CommonConfig {
    pub metrics: Option<MetricsConfig>,
    pub logging: Option<LoggingConfig>,
}

#[derive(Debug, Deserialize)]
pub struct Config {
    #[serde(flatten)]
    pub common: CommonConfig,
    pub gateway: GatewayConfig,
}

impl Config {
    pub fn from_file(path: &std::path::Path) -> Result<Self, ConfigError> {
        let file = File::open(path)?;
        let config: Config = serde_yaml::from_reader(file)?;
        config.gateway.validate()?;

        Ok(config)
    }
}

#[derive(thiserror::Error, Debug)]
pub enum ConfigError {
    #[error("could not load config from file: {0}")]
    LoadError(#[from] std::io::Error),
    #[error("could not parse config: {0}")]
    ParseError(#[from] serde_yaml::Error),
    #[error("invalid config: {0}")]
    InvalidConfig(#[from] proxy::config::ValidationError),
}

#[cfg(test)]
mod tests {
    use super::*;
    use proxy::backend::BackendKind;
    use std::io::Write;

    fn write_tmp_file(s: &str) -> tempfile::NamedTempFile {
        let mut tmp = tempfile::NamedTempFile::new().expect("create temp file");
        write!(tmp, "{}", s).expect("write yaml");

        tmp
    }

    #[test]
    fn gateway_config() {
        let yaml = r#"
            metrics:
                statsd_host: 127.0.0.1
                statsd_port: 8125
            gateway:
                listener:
                    host: 0.0.0.0
                    port: 8080
                identity_url: http://lms.internal/api/identity/v1/anonymous_ids
                crm:
                    backend: varkey
                    token_url: https://test.salesforce.com/services/oauth2/token
                    client_id: client
                    client_secret: secret
                    username: author@example.com
                    password: hunter2
                    security_token: XYZ
            "#;
        let tmp = write_tmp_file(yaml);
        let config = Config::from_file(tmp.path()).expect("load config");

        assert_eq!(config.gateway.crm.backend, BackendKind::Varkey);
        assert_eq!(config.gateway.listener.port, 8080);
        assert_eq!(
            config.common.metrics.expect("metrics config").statsd_port,
            8125
        );
        assert!(config.common.logging.is_none());
    }

    #[test]
    fn rejects_empty_credentials() {
        let yaml = r#"
            gateway:
                listener:
                    host: 0.0.0.0
                    port: 8080
                identity_url: http://lms.internal/api/identity/v1/anonymous_ids
                crm:
                    backend: generic
                    token_url: https://test.salesforce.com/services/oauth2/token
                    client_id: ""
                    client_secret: secret
                    username: author@example.com
                    password: hunter2
                    security_token: XYZ
            "#;
        let tmp = write_tmp_file(yaml);

        assert!(matches!(
            Config::from_file(tmp.path()).unwrap_err(),
            ConfigError::InvalidConfig(_)
        ));
    }
}
