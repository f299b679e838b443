//! OData gateway module.
//!
//! Exposes a PostgREST-style backend as a read-only OData service:
//!
//! - `GET /odata/{entity_set}` proxies one query and returns `{"@odata.context", "value"}`
//! - `POST /odata/{entity_set}/$batch` runs every embedded GET and answers with
//!   one `multipart/mixed` response
//! - `GET /odata/{entity_set}/$metadata` serves the EDMX schema
//!
//! ## Architecture
//!
//! ```text
//!      REST API (/odata/...)
//!              │
//!              ▼
//!       Domain Service ──► BatchDispatcher
//!              │                 │
//!              ▼                 ▼
//!        dyn EntityFetcher (port)
//!              │
//!              ▼
//!     BackendEntityFetcher (reqwest)
//! ```

use std::sync::Arc;

use axum::Router;

pub mod api;
pub mod config;
pub mod cors;
pub mod domain;
pub mod infra;
pub mod secret;

pub use config::{ConfigError, GatewayConfig};
pub use domain::error::DomainError;
pub use domain::model::{EntitySetName, EntitySetPayload};
pub use domain::ports::EntityFetcher;
pub use secret::SecretString;

use domain::service::Service;
use infra::BackendEntityFetcher;

/// Validate `cfg` and build the router against the configured backend.
///
/// # Errors
/// Fails on invalid configuration or if the HTTP client cannot be built.
pub fn build_router(cfg: &GatewayConfig) -> anyhow::Result<Router> {
    cfg.validate()?;
    let fetcher = Arc::new(BackendEntityFetcher::new(&cfg.backend)?);
    tracing::info!(
        base_url = %cfg.backend.base_url,
        timeout_secs = cfg.backend.timeout_secs,
        "OData gateway backend configured"
    );
    build_router_with_fetcher(cfg, fetcher)
}

/// Build the router around an arbitrary [`EntityFetcher`].
///
/// Backend settings in `cfg` are not used.
///
/// # Errors
/// Fails if the CORS settings are inconsistent.
pub fn build_router_with_fetcher(
    cfg: &GatewayConfig,
    fetcher: Arc<dyn EntityFetcher>,
) -> anyhow::Result<Router> {
    let svc = Arc::new(Service::new(fetcher, cfg.metadata.clone()));
    Ok(api::rest::routes::router(svc, cfg)?)
}
