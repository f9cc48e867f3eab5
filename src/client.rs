use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use serde_json::Value as JsonValue;
use tokio::time::sleep;

use crate::{
    decode::{classify, decode_envelope, Decoded, Verdict},
    wire, ClientOptions, Envelope, ErrorLog, MarketoError, Mode, QueryArgs, RawResponse, Reply,
    RequestDescriptor, Result, StdoutLog, Upload,
};

/// Resilient HTTP transport for the Marketo REST API.
///
/// Every call runs its own retry loop. Rate limiter (606), concurrent call
/// limit (615) and timeout (604) errors as well as network failures are
/// retried with an escalating backoff. Any other API error is returned
/// right away.
#[derive(Clone)]
pub struct MarketoHttpClient {
    http: reqwest::Client,
    options: ClientOptions,
    logger: Option<Arc<dyn ErrorLog>>,
}

impl fmt::Debug for MarketoHttpClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let logger = if self.logger.is_some() {
            "<custom>"
        } else {
            "<stdout>"
        };
        f.debug_struct("MarketoHttpClient")
            .field("options", &self.options)
            .field("logger", &logger)
            .finish()
    }
}

impl Default for MarketoHttpClient {
    fn default() -> Self {
        Self::new()
    }
}

/// What a single attempt brought back from the network.
enum Received {
    Raw(RawResponse),
    Body { status: u16, body: bytes::Bytes },
}

impl MarketoHttpClient {
    /// Creates a client with default options, logging to standard output.
    pub fn new() -> Self {
        Self {
            http: reqwest::Client::new(),
            options: ClientOptions::default(),
            logger: None,
        }
    }

    /// Applies timeout and retry options.
    pub fn with_options(mut self, opts: ClientOptions) -> Self {
        self.options = opts;
        self
    }

    /// Uses a preconfigured `reqwest` client (proxies, TLS roots, pooling).
    pub fn with_http_client(mut self, http: reqwest::Client) -> Self {
        self.http = http;
        self
    }

    /// Routes diagnostics to `logger` instead of standard output.
    pub fn with_logger(mut self, logger: Arc<dyn ErrorLog>) -> Self {
        self.logger = Some(logger);
        self
    }

    pub fn options(&self) -> &ClientOptions {
        &self.options
    }

    /// Sends a GET request.
    ///
    /// Arguments go into the query string unless the resulting URL would
    /// exceed [`crate::MAX_GET_URL_LEN`], in which case they are posted as a
    /// form with `_method=GET`.
    pub async fn get(
        &self,
        endpoint: &str,
        args: impl Into<QueryArgs>,
        mode: Mode,
        timeout: Option<Duration>,
        stream: bool,
    ) -> Result<Reply> {
        let mut request = RequestDescriptor::get(endpoint)
            .args(args)
            .mode(mode)
            .stream(stream);
        request.timeout = timeout;
        self.dispatch(request).await
    }

    /// Sends a POST request with a JSON, form-encoded or multipart body.
    #[allow(clippy::too_many_arguments)]
    pub async fn post(
        &self,
        endpoint: &str,
        args: impl Into<QueryArgs>,
        data: Option<JsonValue>,
        upload: Option<Upload>,
        mode: Mode,
        timeout: Option<Duration>,
        stream: bool,
    ) -> Result<Reply> {
        let mut request = RequestDescriptor::post(endpoint)
            .args(args)
            .mode(mode)
            .stream(stream);
        request.data = data;
        request.upload = upload;
        request.timeout = timeout;
        self.dispatch(request).await
    }

    /// Sends a DELETE request with a JSON body.
    pub async fn delete(
        &self,
        endpoint: &str,
        args: impl Into<QueryArgs>,
        data: Option<JsonValue>,
        timeout: Option<Duration>,
    ) -> Result<Reply> {
        let mut request = RequestDescriptor::delete(endpoint).args(args);
        request.data = data;
        request.timeout = timeout;
        self.dispatch(request).await
    }

    /// Runs `request` through the retry loop.
    ///
    /// Exactly one HTTP call is issued per attempt and at most
    /// [`ClientOptions::attempts`] attempts are made. Backoff only happens
    /// between attempts.
    ///
    /// # Errors
    ///
    /// - [`MarketoError::Api`] for a non-transient API error, on first sight.
    /// - [`MarketoError::RetriesExhausted`] when a transient API error is
    ///   still reported on the last attempt.
    /// - [`MarketoError::Transport`] with the last network error once
    ///   attempts run out.
    /// - [`MarketoError::File`], [`MarketoError::InvalidUrl`] and
    ///   [`MarketoError::Encode`] before any request is sent.
    pub async fn dispatch(&self, request: RequestDescriptor) -> Result<Reply> {
        let max_attempts = self.options.attempts();
        let timeout = self.request_timeout(&request);
        let mut attempt = 1usize;

        loop {
            let builder = wire::build_request(&self.http, &request, timeout).await?;

            let received = match Self::receive(builder, &request).await {
                Ok(received) => received,
                Err(err) => {
                    if attempt < max_attempts {
                        self.log_error(&format!(
                            "Retrying after exception: {}: {err}",
                            transport_kind(&err)
                        ));
                        self.wait_before_retry(attempt).await;
                        attempt += 1;
                        continue;
                    }
                    return Err(MarketoError::Transport(err));
                }
            };

            let (status, body) = match received {
                Received::Raw(raw) => {
                    if let RawResponse::Buffered { status, body, .. } = &raw {
                        self.log_content(status.as_u16(), body);
                    }
                    return Ok(Reply::Raw(raw));
                }
                Received::Body { status, body } => (status, body),
            };

            self.log_content(status, &body);

            let envelope = match decode_envelope(status, &body) {
                Decoded::Malformed(envelope) => return Ok(Reply::Decoded(envelope)),
                Decoded::Parsed(envelope) if request.mode == Mode::AccessToken => {
                    return Ok(Reply::Decoded(envelope))
                }
                Decoded::Parsed(envelope) => envelope,
            };

            match classify(&envelope) {
                Verdict::Done => return Ok(Reply::Decoded(envelope)),
                Verdict::Fatal { code, message } => {
                    self.log_api_error(&envelope);
                    return Err(MarketoError::Api {
                        code,
                        message,
                        envelope,
                    });
                }
                Verdict::Recoverable { code, kind } => {
                    self.log_api_error(&envelope);
                    let (number, description) = (kind.code(), kind.description());
                    if attempt < max_attempts {
                        self.log_error(&format!(
                            "Attempt {attempt}. Error {number}, {description}. Pausing, then trying again."
                        ));
                        self.wait_before_retry(attempt).await;
                        attempt += 1;
                        continue;
                    }
                    self.log_error(&format!(
                        "Attempt {attempt}. Error {number}, {description}. This was the final attempt."
                    ));
                    return Err(MarketoError::RetriesExhausted {
                        attempts: attempt,
                        code,
                        description,
                        envelope,
                    });
                }
            }
        }
    }

    /// Timeout applied to one attempt.
    ///
    /// reqwest's request timeout keeps running until the body is fully read.
    /// A streamed raw body is read by the caller after `dispatch` returns, so
    /// it only gets a timeout when the request names one explicitly.
    fn request_timeout(&self, request: &RequestDescriptor) -> Option<Duration> {
        if request.timeout.is_some() {
            return request.timeout;
        }
        if request.stream && request.mode == Mode::NoJsonParse {
            return None;
        }
        Some(self.options.timeout())
    }

    /// Sends the request and collects the response body.
    ///
    /// Reading the body counts as part of the attempt, so a connection
    /// dropped mid-body is retried like any other transport failure.
    async fn receive(
        builder: reqwest::RequestBuilder,
        request: &RequestDescriptor,
    ) -> reqwest::Result<Received> {
        let response = builder.send().await?;

        if request.mode == Mode::NoJsonParse {
            if request.stream {
                return Ok(Received::Raw(RawResponse::Streaming(response)));
            }
            let status = response.status();
            let headers = response.headers().clone();
            let body = response.bytes().await?;
            return Ok(Received::Raw(RawResponse::Buffered {
                status,
                headers,
                body,
            }));
        }

        let status = response.status().as_u16();
        let body = response.bytes().await?;
        Ok(Received::Body { status, body })
    }

    fn log_api_error(&self, envelope: &Envelope) {
        match envelope.first_error() {
            Some(error) => self.log_error(&format!("error from http dispatch: {error}")),
            None => self.log_error("error from http dispatch: success was false without errors"),
        }
    }

    fn log_content(&self, status: u16, body: &[u8]) {
        self.log_debug(&format!(
            "content ({status}): {}",
            String::from_utf8_lossy(body)
        ));
    }

    fn log_debug(&self, message: &str) {
        match &self.logger {
            Some(logger) => logger.debug(message),
            #[cfg(feature = "tracing")]
            None => tracing::debug!("{}", message),
            #[cfg(not(feature = "tracing"))]
            None => {}
        }
    }

    fn log_error(&self, message: &str) {
        match &self.logger {
            Some(logger) => logger.error(message),
            None => StdoutLog.error(message),
        }
    }

    /// Sleeps `sleep_duration * (attempt * 6 - 5)` before the next attempt.
    async fn wait_before_retry(&self, attempt: usize) {
        let delay = self.options.backoff_delay(attempt);

        #[cfg(feature = "tracing")]
        tracing::debug!("retrying marketo request after {} ms", delay.as_millis());

        sleep(delay).await;
    }
}

fn transport_kind(err: &reqwest::Error) -> &'static str {
    if err.is_timeout() {
        "timeout"
    } else if err.is_connect() {
        "connect"
    } else if err.is_body() {
        "body"
    } else if err.is_decode() {
        "decode"
    } else if err.is_request() {
        "request"
    } else {
        "other"
    }
}

#[cfg(test)]
mod tests {
    use std::sync::{Arc, Mutex};
    use std::time::Duration;

    use super::MarketoHttpClient;
    use crate::{ClientOptions, ErrorLog, Mode, RequestDescriptor};

    #[derive(Default)]
    struct Captured(Mutex<Vec<String>>);

    impl ErrorLog for Captured {
        fn error(&self, message: &str) {
            self.0
                .lock()
                .expect("log mutex must not be poisoned")
                .push(message.to_owned());
        }
    }

    #[test]
    fn debug_reports_logger_kind() {
        let client = MarketoHttpClient::new();
        assert!(format!("{client:?}").contains("<stdout>"));

        let client = client.with_logger(Arc::new(Captured::default()));
        assert!(format!("{client:?}").contains("<custom>"));
    }

    #[test]
    fn options_are_per_client() {
        let tuned = MarketoHttpClient::new().with_options(ClientOptions {
            max_retries: 5,
            ..ClientOptions::default()
        });
        let untouched = MarketoHttpClient::default();

        assert_eq!(tuned.options().max_retries, 5);
        assert_eq!(untouched.options().max_retries, 3);
    }

    #[test]
    fn streamed_raw_requests_only_use_explicit_timeout() {
        let client = MarketoHttpClient::new().with_options(ClientOptions {
            timeout_ms: 300,
            ..ClientOptions::default()
        });
        let endpoint = "https://123-abc-456.mktorest.com/bulk/v1/leads/export/x/file.json";

        let streamed = RequestDescriptor::get(endpoint)
            .mode(Mode::NoJsonParse)
            .stream(true);
        assert_eq!(client.request_timeout(&streamed), None);

        let bounded = streamed.clone().timeout(Duration::from_secs(60));
        assert_eq!(
            client.request_timeout(&bounded),
            Some(Duration::from_secs(60))
        );

        let buffered = RequestDescriptor::get(endpoint).mode(Mode::NoJsonParse);
        assert_eq!(
            client.request_timeout(&buffered),
            Some(Duration::from_millis(300))
        );

        let decoded = RequestDescriptor::get(endpoint).stream(true);
        assert_eq!(
            client.request_timeout(&decoded),
            Some(Duration::from_millis(300))
        );
    }

    #[test]
    fn injected_logger_receives_messages() {
        let captured = Arc::new(Captured::default());
        let client = MarketoHttpClient::new().with_logger(captured.clone());

        client.log_error("Attempt 1. Error 606, rate limiter. Pausing, then trying again.");

        let lines = captured.0.lock().expect("log mutex must not be poisoned");
        assert_eq!(lines.len(), 1);
        assert!(lines[0].contains("rate limiter"));
    }
}
