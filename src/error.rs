use std::path::PathBuf;

use crate::{Envelope, ErrorCode};

/// Error type returned by this crate.
#[derive(Debug, thiserror::Error)]
pub enum MarketoError {
    /// Network or request execution error from `reqwest`, kept unchanged
    /// after the retry budget is spent.
    #[error("transport error: {0}")]
    Transport(#[source] reqwest::Error),
    /// Non-transient error reported inside a `success: false` envelope.
    #[error("api error {code}: {message}")]
    Api {
        code: ErrorCode,
        message: String,
        /// Full response envelope as returned by the remote service.
        envelope: Envelope,
    },
    /// A transient API error (rate limiter, concurrency limit, timeout)
    /// was still reported on the final attempt.
    #[error("api error {code} ({description}) persisted after {attempts} attempts")]
    RetriesExhausted {
        attempts: usize,
        code: ErrorCode,
        description: &'static str,
        envelope: Envelope,
    },
    /// The file attached to a multipart upload could not be read.
    #[error("could not read upload file {}: {source}", path.display())]
    File {
        path: PathBuf,
        source: std::io::Error,
    },
    /// Endpoint is not a valid absolute URL.
    #[error("invalid endpoint url: {0}")]
    InvalidUrl(String),
    /// Request body could not be encoded.
    #[error("encode error: {0}")]
    Encode(String),
}

impl MarketoError {
    /// Returns the API envelope carried by API-level errors.
    pub fn envelope(&self) -> Option<&Envelope> {
        match self {
            Self::Api { envelope, .. } | Self::RetriesExhausted { envelope, .. } => Some(envelope),
            _ => None,
        }
    }

    /// Returns the error code carried by API-level errors.
    pub fn code(&self) -> Option<&ErrorCode> {
        match self {
            Self::Api { code, .. } | Self::RetriesExhausted { code, .. } => Some(code),
            _ => None,
        }
    }
}
