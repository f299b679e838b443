//! REST handlers.
//!
//! Handlers are thin: extract input, call the domain service, map errors to Problem.

use std::sync::Arc;

use axum::Json;
use axum::body::Bytes;
use axum::extract::{Extension, Path, RawQuery};
use axum::http::{HeaderMap, HeaderValue, header};
use axum::response::{IntoResponse, Response};
use odata_batch::RESPONSE_CONTENT_TYPE;
use serde::Serialize;

use super::ApiResult;
use crate::domain::model::EntitySetPayload;
use crate::domain::service::Service;

const APPLICATION_XML: &str = "application/xml";

#[derive(Debug, Serialize)]
pub struct StatusResponse {
    pub status: &'static str,
}

/// GET / - liveness, no auth.
#[allow(clippy::unused_async)]
pub async fn root() -> Json<StatusResponse> {
    Json(StatusResponse {
        status: "OData batch gateway is running",
    })
}

/// GET /odata/{entity_set}
#[tracing::instrument(skip(svc, query))]
pub async fn get_entity_set(
    Extension(svc): Extension<Arc<Service>>,
    Path(entity_set): Path<String>,
    RawQuery(query): RawQuery,
) -> ApiResult<Json<EntitySetPayload>> {
    let payload = svc.read_entity_set(&entity_set, query.as_deref()).await?;
    Ok(Json(payload))
}

/// GET /odata/{entity_set}/$metadata
#[allow(clippy::unused_async)]
#[tracing::instrument(skip(svc))]
pub async fn get_metadata(
    Extension(svc): Extension<Arc<Service>>,
    Path(entity_set): Path<String>,
) -> ApiResult<Response> {
    let xml = svc.metadata_document(&entity_set)?;
    Ok((
        [(header::CONTENT_TYPE, HeaderValue::from_static(APPLICATION_XML))],
        xml,
    )
        .into_response())
}

/// POST /odata/{entity_set}/$batch
#[tracing::instrument(skip(svc, headers, body), fields(body_size = body.len()))]
pub async fn post_batch(
    Extension(svc): Extension<Arc<Service>>,
    Path(entity_set): Path<String>,
    headers: HeaderMap,
    body: Bytes,
) -> ApiResult<Response> {
    let content_type = headers
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default();

    let multipart = svc.execute_batch(&entity_set, content_type, &body).await?;
    Ok((
        [(
            header::CONTENT_TYPE,
            HeaderValue::from_static(RESPONSE_CONTENT_TYPE),
        )],
        multipart,
    )
        .into_response())
}
