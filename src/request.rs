use std::fmt;
use std::path::PathBuf;
use std::time::Duration;

use serde_json::Value as JsonValue;

use crate::QueryArgs;

/// HTTP verbs used by the Marketo REST API.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Method {
    Get,
    Post,
    Delete,
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Get => "GET",
            Self::Post => "POST",
            Self::Delete => "DELETE",
        })
    }
}

/// How a request body is encoded and how its response is handled.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Mode {
    /// JSON body, decoded response envelope, full error classification.
    #[default]
    Json,
    /// Response is returned untouched as a [`crate::RawResponse`].
    NoJsonParse,
    /// POST body is sent as `application/x-www-form-urlencoded`.
    FormEncoded,
    /// Response is decoded but never classified. Token endpoints answer
    /// without the `success` convention.
    AccessToken,
}

/// File attached to a multipart POST.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Upload {
    /// Local file to send. Its extension decides the part's content type.
    pub path: PathBuf,
    /// Multipart field name the file is stored under.
    pub field_name: String,
}

impl Upload {
    pub fn new(path: impl Into<PathBuf>, field_name: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            field_name: field_name.into(),
        }
    }
}

/// Everything needed to dispatch one logical request.
#[derive(Clone, Debug, PartialEq)]
pub struct RequestDescriptor {
    pub method: Method,
    pub endpoint: String,
    pub args: QueryArgs,
    pub data: Option<JsonValue>,
    pub upload: Option<Upload>,
    pub mode: Mode,
    /// Overrides [`crate::ClientOptions::timeout_ms`] for this request.
    pub timeout: Option<Duration>,
    /// Leave the body unread so the caller can consume it incrementally.
    pub stream: bool,
}

impl RequestDescriptor {
    pub fn new(method: Method, endpoint: impl Into<String>) -> Self {
        Self {
            method,
            endpoint: endpoint.into(),
            args: QueryArgs::default(),
            data: None,
            upload: None,
            mode: Mode::default(),
            timeout: None,
            stream: false,
        }
    }

    pub fn get(endpoint: impl Into<String>) -> Self {
        Self::new(Method::Get, endpoint)
    }

    pub fn post(endpoint: impl Into<String>) -> Self {
        Self::new(Method::Post, endpoint)
    }

    pub fn delete(endpoint: impl Into<String>) -> Self {
        Self::new(Method::Delete, endpoint)
    }

    pub fn args(mut self, args: impl Into<QueryArgs>) -> Self {
        self.args = args.into();
        self
    }

    pub fn data(mut self, data: JsonValue) -> Self {
        self.data = Some(data);
        self
    }

    pub fn upload(mut self, upload: Upload) -> Self {
        self.upload = Some(upload);
        self
    }

    pub fn mode(mut self, mode: Mode) -> Self {
        self.mode = mode;
        self
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn stream(mut self, stream: bool) -> Self {
        self.stream = stream;
        self
    }
}
