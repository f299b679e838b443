use thiserror::Error;

/// Errors raised while decoding a `$batch` request envelope.
///
/// Both kinds reject the whole batch; no part of an envelope that fails to
/// parse is ever dispatched.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum BatchError {
    /// Wrong content type, missing boundary or a malformed body part.
    #[error("invalid batch envelope: {0}")]
    InvalidEnvelope(String),

    /// An embedded request used a method other than `GET`.
    #[error("unsupported method '{method}' in batch part {index}; only GET is supported")]
    UnsupportedMethod { index: usize, method: String },
}

impl BatchError {
    pub(crate) fn invalid(msg: impl Into<String>) -> Self {
        Self::InvalidEnvelope(msg.into())
    }
}
