//! REST error mapping.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use odata_batch::BatchError;

use super::problem::Problem;
use super::request_id;
use crate::domain::error::DomainError;

const ERROR_TYPE_BASE: &str = "https://errors.odata-gateway.dev";

impl From<DomainError> for Problem {
    fn from(e: DomainError) -> Self {
        let trace_id = request_id::current();

        let (status, code, title, detail) = match &e {
            DomainError::Batch(BatchError::InvalidEnvelope(msg)) => (
                StatusCode::BAD_REQUEST,
                "ODATA_INVALID_ENVELOPE",
                "Invalid batch envelope",
                msg.clone(),
            ),
            DomainError::Batch(err @ BatchError::UnsupportedMethod { .. }) => (
                StatusCode::BAD_REQUEST,
                "ODATA_UNSUPPORTED_METHOD",
                "Unsupported batch method",
                err.to_string(),
            ),
            DomainError::InvalidEntitySet { name } => (
                StatusCode::BAD_REQUEST,
                "ODATA_INVALID_ENTITY_SET",
                "Invalid entity set",
                format!("'{name}' is not a valid entity set name"),
            ),
            DomainError::Upstream { status, body } => {
                tracing::warn!(upstream_status = status, "backend request failed");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "ODATA_UPSTREAM_ERROR",
                    "Upstream error",
                    body.clone(),
                )
            }
            DomainError::UpstreamShape { reason } => {
                tracing::warn!(reason = %reason, "backend returned an unexpected payload");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "ODATA_UPSTREAM_SHAPE",
                    "Unexpected upstream payload",
                    reason.clone(),
                )
            }
            DomainError::UpstreamTimeout => (
                StatusCode::GATEWAY_TIMEOUT,
                "ODATA_UPSTREAM_TIMEOUT",
                "Upstream timeout",
                "Request to the backend timed out".to_owned(),
            ),
            DomainError::UpstreamTransport(msg) => {
                tracing::error!(error = %msg, "backend unreachable");
                (
                    StatusCode::BAD_GATEWAY,
                    "ODATA_UPSTREAM_TRANSPORT",
                    "Upstream unreachable",
                    msg.clone(),
                )
            }
            DomainError::Encode(err) => {
                tracing::error!(error = %err, "failed to encode response");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "ODATA_INTERNAL",
                    "Internal Server Error",
                    "An internal error occurred".to_owned(),
                )
            }
        };

        let mut problem = Problem::new(status, title, detail)
            .with_type(format!("{ERROR_TYPE_BASE}/{code}"))
            .with_code(code);

        if let Some(id) = trace_id {
            problem = problem.with_trace_id(id);
        }

        problem
    }
}

impl IntoResponse for DomainError {
    fn into_response(self) -> Response {
        Problem::from(self).into_response()
    }
}
