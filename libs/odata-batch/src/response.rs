//! `$batch` response assembly.
//!
//! Each result becomes one `application/http` section carrying an embedded
//! status line, a JSON content type and the body:
//!
//! ```text
//! --batch_response_boundary
//! Content-Type: application/http
//! Content-Transfer-Encoding: binary
//!
//! HTTP/1.1 200 OK
//! Content-Type: application/json
//!
//! {"@odata.context":"$metadata#Flights","value":[...]}
//! --batch_response_boundary--
//! ```
//!
//! The response boundary is a fixed literal, independent of the request
//! boundary; clients match on it verbatim.

use bytes::{BufMut, Bytes, BytesMut};
use http::StatusCode;

pub const RESPONSE_BOUNDARY: &str = "batch_response_boundary";

/// `Content-Type` of an assembled batch response.
pub const RESPONSE_CONTENT_TYPE: &str = "multipart/mixed; boundary=batch_response_boundary";

const CRLF: &[u8] = b"\r\n";

/// Outcome of one embedded request, index-aligned with its envelope part.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BatchResult {
    pub status: StatusCode,
    pub body: Bytes,
}

impl BatchResult {
    pub fn ok(body: impl Into<Bytes>) -> Self {
        Self {
            status: StatusCode::OK,
            body: body.into(),
        }
    }
}

/// Ordered batch results, rendered with [`BatchResponse::into_body`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BatchResponse {
    results: Vec<BatchResult>,
}

impl BatchResponse {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_capacity(n: usize) -> Self {
        Self {
            results: Vec::with_capacity(n),
        }
    }

    pub fn push(&mut self, result: BatchResult) {
        self.results.push(result);
    }

    #[must_use]
    pub fn results(&self) -> &[BatchResult] {
        &self.results
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.results.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.results.is_empty()
    }

    /// Render the `multipart/mixed` body (see [`RESPONSE_CONTENT_TYPE`]).
    #[must_use]
    pub fn into_body(self) -> Bytes {
        let payload: usize = self.results.iter().map(|r| r.body.len() + 160).sum();
        let mut out = BytesMut::with_capacity(payload + 32);

        for result in self.results {
            put_line(&mut out, &format!("--{RESPONSE_BOUNDARY}"));
            put_line(&mut out, "Content-Type: application/http");
            put_line(&mut out, "Content-Transfer-Encoding: binary");
            out.put_slice(CRLF);
            put_line(&mut out, &status_line(result.status));
            put_line(&mut out, "Content-Type: application/json");
            out.put_slice(CRLF);
            out.put_slice(&result.body);
            out.put_slice(CRLF);
        }
        out.put_slice(format!("--{RESPONSE_BOUNDARY}--").as_bytes());

        out.freeze()
    }
}

impl FromIterator<BatchResult> for BatchResponse {
    fn from_iter<I: IntoIterator<Item = BatchResult>>(iter: I) -> Self {
        Self {
            results: iter.into_iter().collect(),
        }
    }
}

fn put_line(out: &mut BytesMut, line: &str) {
    out.put_slice(line.as_bytes());
    out.put_slice(CRLF);
}

fn status_line(status: StatusCode) -> String {
    format!(
        "HTTP/1.1 {} {}",
        status.as_u16(),
        status.canonical_reason().unwrap_or_default()
    )
}
