//! Per-request `x-request-id`, exposed to error mapping.
//!
//! [`SetRequestIdLayer`](tower_http::request_id::SetRequestIdLayer) assigns the id
//! (or keeps the one the client sent); [`scope_request_id`] makes it readable via
//! [`current`] for the rest of the request so Problem bodies can carry it.

use axum::extract::Request;
use axum::middleware::Next;
use axum::response::Response;
use tower_http::request_id::RequestId;

tokio::task_local! {
    static REQUEST_ID: String;
}

/// Request id of the request being handled on this task, if any.
#[must_use]
pub fn current() -> Option<String> {
    REQUEST_ID.try_with(Clone::clone).ok()
}

pub async fn scope_request_id(req: Request, next: Next) -> Response {
    let id = req
        .extensions()
        .get::<RequestId>()
        .and_then(|rid| rid.header_value().to_str().ok())
        .map(ToOwned::to_owned);

    match id {
        Some(id) => REQUEST_ID.scope(id, next.run(req)).await,
        None => next.run(req).await,
    }
}
