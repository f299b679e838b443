//! Application configuration.
//!
//! Layered, later layers win:
//! 1) built-in defaults
//! 2) YAML file (`--config`)
//! 3) environment, `APP__` prefix with `__` as the nesting separator,
//!    e.g. `APP__GATEWAY__BACKEND__API_KEY`
//! 4) CLI overrides (`--port`)

use std::net::SocketAddr;
use std::path::Path;

use anyhow::{Context, Result};
use figment::Figment;
use figment::providers::{Env, Format, Serialized, Yaml};
use odata_gateway::GatewayConfig;
use serde::{Deserialize, Serialize};

pub const ENV_PREFIX: &str = "APP__";

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub logging: LoggingConfig,
    pub gateway: GatewayConfig,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct ServerConfig {
    pub bind_addr: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: "0.0.0.0:8000".to_owned(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct LoggingConfig {
    /// `EnvFilter` directive used when neither `-v` nor `RUST_LOG` is given.
    pub level: String,
    pub format: LogFormat,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_owned(),
            format: LogFormat::Text,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Text,
    Json,
}

impl AppConfig {
    /// Defaults, then the YAML file if given, then `APP__*` environment variables.
    #[must_use]
    pub fn figment(path: Option<&Path>) -> Figment {
        let mut figment = Figment::from(Serialized::defaults(Self::default()));
        if let Some(path) = path {
            figment = figment.merge(Yaml::file_exact(path));
        }
        figment.merge(Env::prefixed(ENV_PREFIX).split("__"))
    }

    /// # Errors
    /// Fails if the file cannot be read or any layer does not match the schema.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        Self::figment(path)
            .extract()
            .context("failed to load configuration")
    }

    /// # Errors
    /// Fails if `server.bind_addr` is not a socket address.
    pub fn apply_cli_overrides(&mut self, port: Option<u16>) -> Result<()> {
        if let Some(port) = port {
            let mut addr = self.bind_addr()?;
            addr.set_port(port);
            self.server.bind_addr = addr.to_string();
        }
        Ok(())
    }

    /// # Errors
    /// Fails if `server.bind_addr` is not a socket address.
    pub fn bind_addr(&self) -> Result<SocketAddr> {
        self.server
            .bind_addr
            .parse()
            .with_context(|| format!("invalid server.bind_addr '{}'", self.server.bind_addr))
    }

    /// # Errors
    /// Returns the first invalid setting.
    pub fn validate(&self) -> Result<()> {
        self.bind_addr()?;
        self.gateway
            .validate()
            .context("invalid gateway configuration")?;
        Ok(())
    }

    /// Effective configuration as pretty JSON. Secrets print as `[REDACTED]`.
    ///
    /// # Errors
    /// Fails if serialization fails.
    pub fn to_json_pretty(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use super::*;

    #[test]
    fn port_override_keeps_host() {
        let mut cfg = AppConfig::default();
        cfg.server.bind_addr = "127.0.0.1:8000".to_owned();
        cfg.apply_cli_overrides(Some(9001)).unwrap();
        assert_eq!(cfg.server.bind_addr, "127.0.0.1:9001");

        cfg.apply_cli_overrides(None).unwrap();
        assert_eq!(cfg.server.bind_addr, "127.0.0.1:9001");
    }

    #[test]
    fn bad_bind_addr_is_reported() {
        let mut cfg = AppConfig::default();
        cfg.server.bind_addr = "localhost".to_owned();
        assert!(cfg.apply_cli_overrides(Some(1)).is_err());
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn log_format_is_lowercase() {
        let json = serde_json::to_value(LoggingConfig::default()).unwrap();
        assert_eq!(json["format"], "text");
    }
}
