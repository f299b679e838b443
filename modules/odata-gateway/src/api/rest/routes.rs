//! REST route registration.

use std::sync::Arc;

use axum::extract::DefaultBodyLimit;
use axum::middleware::{from_fn, from_fn_with_state};
use axum::routing::{get, post};
use axum::{Extension, Router};
use tower_http::request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer};
use tower_http::trace::TraceLayer;
use tracing::field::Empty;

use super::auth::{BasicAuthState, require_basic_auth};
use super::handlers;
use super::request_id::scope_request_id;
use crate::config::{ConfigError, GatewayConfig};
use crate::cors::build_cors_layer;
use crate::domain::service::Service;

/// Build the HTTP router.
///
/// Layer order, outermost first: set and propagate `x-request-id`, Trace, CORS,
/// request id scope, then (on `/odata` routes only) basic auth and, for
/// `$batch`, the body limit.
///
/// # Errors
/// Returns [`ConfigError`] if the CORS settings are inconsistent.
pub fn router(svc: Arc<Service>, cfg: &GatewayConfig) -> Result<Router, ConfigError> {
    let mut odata = Router::new()
        .route("/odata/{entity_set}", get(handlers::get_entity_set))
        .route(
            "/odata/{entity_set}/$metadata",
            get(handlers::get_metadata),
        )
        .route(
            "/odata/{entity_set}/$batch",
            post(handlers::post_batch).layer(DefaultBodyLimit::max(cfg.max_batch_body_bytes)),
        );

    if let Some(auth) = &cfg.basic_auth {
        tracing::info!(user = %auth.username, "basic auth enabled for /odata routes");
        odata = odata.route_layer(from_fn_with_state(
            BasicAuthState::new(auth.clone()),
            require_basic_auth,
        ));
    }

    let router = Router::new()
        .route("/", get(handlers::root))
        .merge(odata)
        .layer(Extension(svc))
        .layer(from_fn(scope_request_id))
        .layer(build_cors_layer(&cfg.cors)?);

    Ok(apply_trace_layer(router)
        .layer(PropagateRequestIdLayer::x_request_id())
        .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid)))
}

fn apply_trace_layer(router: Router) -> Router {
    router.layer(
        TraceLayer::new_for_http()
            .make_span_with(|req: &axum::http::Request<axum::body::Body>| {
                let rid = req
                    .headers()
                    .get("x-request-id")
                    .and_then(|v| v.to_str().ok())
                    .unwrap_or("n/a");
                tracing::info_span!(
                    "http_request",
                    method = %req.method(),
                    uri = %req.uri().path(),
                    request_id = %rid,
                    status = Empty,
                    latency_ms = Empty,
                )
            })
            .on_response(
                |res: &axum::http::Response<axum::body::Body>,
                 latency: std::time::Duration,
                 span: &tracing::Span| {
                    span.record("status", res.status().as_u16());
                    span.record("latency_ms", latency.as_millis());
                },
            ),
    )
}
