// src/config/models.rs
use serde::Deserialize;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

#[derive(Debug, thiserror::Error, PartialEq)]
pub enum ConfigError {
    #[error("endpoint must start with '/', got {0:?}")]
    InvalidEndpoint(String),

    #[error("invalid listen address {0:?}")]
    InvalidListenAddr(String),

    #[error("cache_ms must be greater than zero")]
    ZeroCache,

    #[error("sweep_interval_secs must be greater than zero")]
    ZeroSweepInterval,

    #[error("max_concurrent must be at least 1")]
    ZeroConcurrency,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    /// Path to the check-set file.
    pub gossfile: PathBuf,
    #[serde(default)]
    pub server: ServerConfig,
}

impl Config {
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.server.validate()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    #[default]
    Documentation,
    Json,
    Prometheus,
}

impl OutputFormat {
    /// Content-Type to advertise; `None` for the default format.
    pub fn content_type(&self) -> Option<&'static str> {
        match self {
            OutputFormat::Documentation => None,
            OutputFormat::Json => Some("application/json"),
            OutputFormat::Prometheus => Some(prometheus::TEXT_FORMAT),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_listen_addr")]
    pub listen_addr: String,
    #[serde(default = "default_endpoint")]
    pub endpoint: String,
    #[serde(default = "default_cache_ms")]
    pub cache_ms: u64,
    #[serde(default = "default_sweep_interval")]
    pub sweep_interval_secs: u64,
    #[serde(default)]
    pub format: OutputFormat,
    #[serde(default)]
    pub format_options: Vec<String>,
    #[serde(default = "default_max_concurrent")]
    pub max_concurrent: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            listen_addr: default_listen_addr(),
            endpoint: default_endpoint(),
            cache_ms: default_cache_ms(),
            sweep_interval_secs: default_sweep_interval(),
            format: OutputFormat::default(),
            format_options: Vec::new(),
            max_concurrent: default_max_concurrent(),
        }
    }
}

impl ServerConfig {
    pub fn cache_ttl(&self) -> Duration {
        Duration::from_millis(self.cache_ms)
    }

    pub fn sweep_interval(&self) -> Duration {
        Duration::from_secs(self.sweep_interval_secs)
    }

    /// Resolves the listen address. A bare `:port` binds every interface.
    pub fn socket_addr(&self) -> Result<SocketAddr, ConfigError> {
        let raw = self.listen_addr.trim();
        let candidate = if raw.starts_with(':') {
            format!("0.0.0.0{}", raw)
        } else {
            raw.to_string()
        };
        candidate
            .parse()
            .map_err(|_| ConfigError::InvalidListenAddr(self.listen_addr.clone()))
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if !self.endpoint.starts_with('/') {
            return Err(ConfigError::InvalidEndpoint(self.endpoint.clone()));
        }
        if self.cache_ms == 0 {
            return Err(ConfigError::ZeroCache);
        }
        if self.sweep_interval_secs == 0 {
            return Err(ConfigError::ZeroSweepInterval);
        }
        if self.max_concurrent == 0 {
            return Err(ConfigError::ZeroConcurrency);
        }
        self.socket_addr()?;
        Ok(())
    }
}

fn default_listen_addr() -> String {
    ":8080".to_string()
}

fn default_endpoint() -> String {
    "/healthz".to_string()
}

fn default_cache_ms() -> u64 {
    5_000
}

fn default_sweep_interval() -> u64 {
    30
}

fn default_max_concurrent() -> usize {
    50
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bare_port_binds_all_interfaces() {
        let server = ServerConfig {
            listen_addr: ":9100".into(),
            ..Default::default()
        };
        assert_eq!(server.socket_addr().unwrap(), "0.0.0.0:9100".parse().unwrap());
    }

    #[test]
    fn rejects_relative_endpoint() {
        let server = ServerConfig {
            endpoint: "healthz".into(),
            ..Default::default()
        };
        assert_eq!(
            server.validate(),
            Err(ConfigError::InvalidEndpoint("healthz".into()))
        );
    }

    #[test]
    fn rejects_zero_cache_and_concurrency() {
        let zero_cache = ServerConfig {
            cache_ms: 0,
            ..Default::default()
        };
        assert_eq!(zero_cache.validate(), Err(ConfigError::ZeroCache));

        let zero_workers = ServerConfig {
            max_concurrent: 0,
            ..Default::default()
        };
        assert_eq!(zero_workers.validate(), Err(ConfigError::ZeroConcurrency));
    }

    #[test]
    fn defaults_are_valid() {
        let server = ServerConfig::default();
        assert!(server.validate().is_ok());
        assert_eq!(server.cache_ttl(), Duration::from_secs(5));
        assert_eq!(server.format.content_type(), None);
    }

    #[test]
    fn only_non_default_formats_carry_content_type() {
        assert_eq!(OutputFormat::Json.content_type(), Some("application/json"));
        assert!(OutputFormat::Prometheus
            .content_type()
            .unwrap()
            .starts_with("text/plain"));
    }
}
