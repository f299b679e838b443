//! Runtime support for the `odata-gateway-server` binary: layered
//! configuration, logging setup and shutdown signals.

pub mod config;
pub mod logging;
pub mod signals;

pub use config::{AppConfig, LogFormat, LoggingConfig, ServerConfig};
