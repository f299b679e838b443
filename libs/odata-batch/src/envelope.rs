//! `$batch` request envelope.
//!
//! A batch body is `multipart/mixed`; every part carries one embedded HTTP
//! request (`Content-Type: application/http`), e.g.
//!
//! ```text
//! --batch_36522ad7
//! Content-Type: application/http
//! Content-Transfer-Encoding: binary
//!
//! GET Flights?$select=Year,Origin&$filter=Year eq 2008 HTTP/1.1
//! Accept: application/json
//!
//! --batch_36522ad7--
//! ```
//!
//! Only the request line of each part is significant. Embedded headers and
//! bodies are ignored.

use http::Method;

use crate::error::BatchError;
use crate::multipart::{self, BodyPart};
use crate::query::QueryParams;

/// Transfer encodings whose payload is the raw request text.
const IDENTITY_ENCODINGS: [&str; 3] = ["binary", "8bit", "7bit"];

/// One embedded request, decoded from its request line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BatchPart {
    method: Method,
    path: String,
    query: Option<String>,
}

impl BatchPart {
    /// Parse `METHOD SP request-target SP HTTP-version`.
    ///
    /// `index` is the zero-based part position, used for error reporting.
    ///
    /// # Errors
    /// - [`BatchError::InvalidEnvelope`] if the line is not three tokens or the
    ///   version is not `HTTP/*`.
    /// - [`BatchError::UnsupportedMethod`] if the method is not exactly `GET`.
    pub fn from_request_line(index: usize, line: &str) -> Result<Self, BatchError> {
        let mut tokens = line.split_whitespace();
        let (Some(method), Some(target), Some(version), None) =
            (tokens.next(), tokens.next(), tokens.next(), tokens.next())
        else {
            return Err(BatchError::invalid(format!(
                "part {index}: malformed request line '{line}'"
            )));
        };

        if !version.starts_with("HTTP/") {
            return Err(BatchError::invalid(format!(
                "part {index}: unsupported protocol version '{version}'"
            )));
        }

        if method != Method::GET.as_str() {
            return Err(BatchError::UnsupportedMethod {
                index,
                method: method.to_owned(),
            });
        }

        let (path, query) = match target.split_once('?') {
            Some((path, query)) => (path, Some(query.to_owned())),
            None => (target, None),
        };

        Ok(Self {
            method: Method::GET,
            path: path.to_owned(),
            query,
        })
    }

    #[must_use]
    pub fn method(&self) -> &Method {
        &self.method
    }

    /// Request target up to (not including) the first `?`.
    #[must_use]
    pub fn path(&self) -> &str {
        &self.path
    }

    /// Raw query string after the first `?`, if the target had one.
    #[must_use]
    pub fn query(&self) -> Option<&str> {
        self.query.as_deref()
    }

    /// Decoded query parameters; empty when the target had no query.
    #[must_use]
    pub fn query_params(&self) -> QueryParams {
        self.query.as_deref().map(QueryParams::parse).unwrap_or_default()
    }

    #[must_use]
    pub fn path_and_query(&self) -> String {
        match &self.query {
            Some(q) => format!("{}?{q}", self.path),
            None => self.path.clone(),
        }
    }
}

/// Ordered embedded requests of one `$batch` call.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BatchEnvelope {
    parts: Vec<BatchPart>,
}

impl BatchEnvelope {
    /// Decode a `$batch` request body.
    ///
    /// Parts without any non-empty line are skipped. Any other malformed part
    /// or any non-GET request rejects the whole envelope.
    ///
    /// # Errors
    /// - [`BatchError::InvalidEnvelope`] for a wrong content type, a missing
    ///   boundary, a non-UTF-8 or non-identity-encoded part, a nested change
    ///   set or a malformed request line.
    /// - [`BatchError::UnsupportedMethod`] for an embedded request that is not `GET`.
    pub fn parse(content_type: &str, body: &[u8]) -> Result<Self, BatchError> {
        let boundary = multipart::mixed_boundary(content_type)?;
        let raw_parts = multipart::read_parts(&boundary, body)?;

        let mut parts = Vec::with_capacity(raw_parts.len());
        for (index, raw) in raw_parts.iter().enumerate() {
            if let Some(part) = decode_part(index, raw)? {
                parts.push(part);
            }
        }

        tracing::debug!(parts = parts.len(), boundary = %boundary, "parsed batch envelope");
        Ok(Self { parts })
    }

    #[must_use]
    pub fn parts(&self) -> &[BatchPart] {
        &self.parts
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.parts.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.parts.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, BatchPart> {
        self.parts.iter()
    }
}

impl From<Vec<BatchPart>> for BatchEnvelope {
    fn from(parts: Vec<BatchPart>) -> Self {
        Self { parts }
    }
}

impl IntoIterator for BatchEnvelope {
    type Item = BatchPart;
    type IntoIter = std::vec::IntoIter<BatchPart>;

    fn into_iter(self) -> Self::IntoIter {
        self.parts.into_iter()
    }
}

impl<'a> IntoIterator for &'a BatchEnvelope {
    type Item = &'a BatchPart;
    type IntoIter = std::slice::Iter<'a, BatchPart>;

    fn into_iter(self) -> Self::IntoIter {
        self.parts.iter()
    }
}

fn decode_part(index: usize, raw: &BodyPart) -> Result<Option<BatchPart>, BatchError> {
    if let Some(ct) = raw.header("Content-Type") {
        if ct.trim_start().to_ascii_lowercase().starts_with("multipart/") {
            return Err(BatchError::invalid(format!(
                "part {index}: change sets are not supported"
            )));
        }
    }

    if let Some(encoding) = raw.header("Content-Transfer-Encoding") {
        let encoding = encoding.trim();
        if !IDENTITY_ENCODINGS
            .iter()
            .any(|e| e.eq_ignore_ascii_case(encoding))
        {
            return Err(BatchError::invalid(format!(
                "part {index}: unsupported Content-Transfer-Encoding '{encoding}'"
            )));
        }
    }

    let text = std::str::from_utf8(&raw.body)
        .map_err(|e| BatchError::invalid(format!("part {index}: payload is not UTF-8: {e}")))?;

    match text.lines().map(str::trim).find(|line| !line.is_empty()) {
        Some(request_line) => BatchPart::from_request_line(index, request_line).map(Some),
        None => Ok(None),
    }
}
