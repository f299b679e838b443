//! Domain errors for the gateway.

use odata_batch::BatchError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum DomainError {
    /// The `$batch` envelope could not be decoded.
    #[error(transparent)]
    Batch(#[from] BatchError),

    #[error("invalid entity set name '{name}'")]
    InvalidEntitySet { name: String },

    /// Backend answered with a non-success status. `body` is the raw response text.
    #[error("backend returned status {status}")]
    Upstream { status: u16, body: String },

    /// Backend answered 2xx with a body that is not a JSON array of objects.
    #[error("unexpected backend payload: {reason}")]
    UpstreamShape { reason: String },

    #[error("backend request timed out")]
    UpstreamTimeout,

    #[error("backend unreachable: {0}")]
    UpstreamTransport(String),

    #[error("failed to encode response: {0}")]
    Encode(#[from] serde_json::Error),
}

impl DomainError {
    #[must_use]
    pub fn shape(reason: impl Into<String>) -> Self {
        Self::UpstreamShape {
            reason: reason.into(),
        }
    }
}
