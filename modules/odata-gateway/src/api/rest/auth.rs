//! Optional HTTP Basic authentication for the `/odata` routes.
//!
//! # Behavior
//!
//! - `OPTIONS` requests pass through so CORS preflight keeps working
//! - Missing, malformed or non-matching credentials: 401 with a
//!   `WWW-Authenticate: Basic realm="odata"` challenge

use std::sync::Arc;

use axum::extract::{Request, State};
use axum::http::{HeaderMap, HeaderValue, Method, StatusCode, header};
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use base64::Engine as _;
use base64::engine::general_purpose::STANDARD;

use super::problem::Problem;
use super::request_id;
use crate::config::BasicAuthConfig;

const CHALLENGE: &str = r#"Basic realm="odata""#;

/// Middleware state; cheap to clone.
#[derive(Clone)]
pub struct BasicAuthState {
    cfg: Arc<BasicAuthConfig>,
}

impl BasicAuthState {
    #[must_use]
    pub fn new(cfg: BasicAuthConfig) -> Self {
        Self { cfg: Arc::new(cfg) }
    }

    fn accepts(&self, headers: &HeaderMap) -> bool {
        credentials(headers).is_some_and(|(user, password)| {
            user == self.cfg.username
                && constant_time_eq(password.as_bytes(), self.cfg.password.expose().as_bytes())
        })
    }
}

pub async fn require_basic_auth(
    State(state): State<BasicAuthState>,
    req: Request,
    next: Next,
) -> Response {
    if req.method() == Method::OPTIONS || state.accepts(req.headers()) {
        return next.run(req).await;
    }

    tracing::warn!(
        method = %req.method(),
        path = %req.uri().path(),
        "rejected request without valid basic auth credentials"
    );
    unauthorized()
}

fn unauthorized() -> Response {
    let problem = Problem::new(
        StatusCode::UNAUTHORIZED,
        "Unauthorized",
        "Valid basic auth credentials are required",
    )
    .with_code("ODATA_UNAUTHORIZED");
    let problem = match request_id::current() {
        Some(id) => problem.with_trace_id(id),
        None => problem,
    };
    let mut resp = problem.into_response();
    resp.headers_mut()
        .insert(header::WWW_AUTHENTICATE, HeaderValue::from_static(CHALLENGE));
    resp
}

/// Decoded `(user, password)` from an `Authorization: Basic` header.
fn credentials(headers: &HeaderMap) -> Option<(String, String)> {
    let value = headers.get(header::AUTHORIZATION)?.to_str().ok()?;
    let (scheme, encoded) = value.trim().split_once(' ')?;
    if !scheme.eq_ignore_ascii_case("basic") {
        return None;
    }
    let decoded = STANDARD.decode(encoded.trim()).ok()?;
    let decoded = String::from_utf8(decoded).ok()?;
    let (user, password) = decoded.split_once(':')?;
    Some((user.to_owned(), password.to_owned()))
}

fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    a.len() == b.len() && a.iter().zip(b).fold(0u8, |acc, (x, y)| acc | (x ^ y)) == 0
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use super::*;
    use crate::secret::SecretString;

    fn state() -> BasicAuthState {
        BasicAuthState::new(BasicAuthConfig {
            username: "sac".to_owned(),
            password: SecretString::new("s3cret:with-colon"),
        })
    }

    fn headers(value: &str) -> HeaderMap {
        let mut h = HeaderMap::new();
        h.insert(header::AUTHORIZATION, HeaderValue::from_str(value).unwrap());
        h
    }

    fn basic(user_pass: &str) -> HeaderMap {
        headers(&format!("Basic {}", STANDARD.encode(user_pass)))
    }

    #[test]
    fn accepts_matching_credentials() {
        assert!(state().accepts(&basic("sac:s3cret:with-colon")));
        assert!(state().accepts(&headers(&format!(
            "basic {}",
            STANDARD.encode("sac:s3cret:with-colon")
        ))));
    }

    #[test]
    fn rejects_everything_else() {
        let s = state();
        assert!(!s.accepts(&HeaderMap::new()));
        assert!(!s.accepts(&basic("sac:wrong")));
        assert!(!s.accepts(&basic("other:s3cret:with-colon")));
        assert!(!s.accepts(&basic("no-colon")));
        assert!(!s.accepts(&headers("Bearer abc")));
        assert!(!s.accepts(&headers("Basic !!!not-base64")));
    }

    #[test]
    fn unauthorized_carries_challenge() {
        let resp = unauthorized();
        assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(
            resp.headers().get(header::WWW_AUTHENTICATE).unwrap(),
            CHALLENGE
        );
    }
}
