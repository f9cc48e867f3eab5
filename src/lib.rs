//! `marketo-http` is an async HTTP transport for the Marketo REST API.
//!
//! [`MarketoHttpClient`] issues GET/POST/DELETE requests and hides transient
//! failures behind a retry loop:
//! - [`MarketoHttpClient::get`]
//! - [`MarketoHttpClient::post`]
//! - [`MarketoHttpClient::delete`]
//! - [`MarketoHttpClient::dispatch`]
//!
//! Responses come back as a typed [`Envelope`]; errors that survive the
//! retry budget surface as [`MarketoError`].

mod client;
mod decode;
mod envelope;
mod error;
mod logger;
mod options;
mod params;
mod raw;
mod request;
mod wire;

pub use client::MarketoHttpClient;
pub use envelope::{ApiErrorEntry, Envelope, ErrorCode, RecoverableCode, UNAVAILABLE_MESSAGE};
pub use error::MarketoError;
#[cfg(feature = "tracing")]
pub use logger::TracingLog;
pub use logger::{ErrorLog, StdoutLog};
pub use options::ClientOptions;
pub use params::{ArgValue, QueryArgs};
pub use raw::{RawResponse, Reply};
pub use request::{Method, Mode, RequestDescriptor, Upload};
pub use wire::{MAX_GET_URL_LEN, METHOD_OVERRIDE_FIELD};

pub type Result<T> = std::result::Result<T, MarketoError>;
