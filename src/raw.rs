//! Response passthrough types for [`crate::Mode::NoJsonParse`].

use bytes::Bytes;
use reqwest::{header::HeaderMap, StatusCode};

use crate::Envelope;

/// Transport response handed back without JSON decoding.
#[derive(Debug)]
pub enum RawResponse {
    /// Body read fully into memory.
    Buffered {
        status: StatusCode,
        headers: HeaderMap,
        body: Bytes,
    },
    /// Body left unread. Consume it with `chunk()` or `bytes_stream()`.
    Streaming(reqwest::Response),
}

impl RawResponse {
    pub fn status(&self) -> StatusCode {
        match self {
            Self::Buffered { status, .. } => *status,
            Self::Streaming(response) => response.status(),
        }
    }

    pub fn headers(&self) -> &HeaderMap {
        match self {
            Self::Buffered { headers, .. } => headers,
            Self::Streaming(response) => response.headers(),
        }
    }

    /// Reads the remaining body, draining a streaming response.
    pub async fn bytes(self) -> reqwest::Result<Bytes> {
        match self {
            Self::Buffered { body, .. } => Ok(body),
            Self::Streaming(response) => response.bytes().await,
        }
    }
}

/// Final result of a dispatch.
#[derive(Debug)]
pub enum Reply {
    /// Returned in [`crate::Mode::NoJsonParse`].
    Raw(RawResponse),
    /// Decoded envelope, either from the service or synthesized after a
    /// body that was not JSON.
    Decoded(Envelope),
}

impl Reply {
    pub fn into_envelope(self) -> Option<Envelope> {
        match self {
            Self::Decoded(envelope) => Some(envelope),
            Self::Raw(_) => None,
        }
    }

    pub fn into_raw(self) -> Option<RawResponse> {
        match self {
            Self::Raw(raw) => Some(raw),
            Self::Decoded(_) => None,
        }
    }
}
