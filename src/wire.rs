//! Translates a [`RequestDescriptor`] into a `reqwest` request.

use std::path::Path;
use std::time::Duration;

use reqwest::{header, multipart, RequestBuilder, Url};

use crate::{
    params::form_fields, MarketoError, Method, Mode, QueryArgs, RequestDescriptor, Result, Upload,
};

/// Longest GET URL sent as-is. Longer ones are tunnelled through POST.
pub const MAX_GET_URL_LEN: usize = 7000;

/// Form field telling Marketo to treat a POST as the GET it stands for.
pub const METHOD_OVERRIDE_FIELD: &str = "_method";

pub(crate) const JSON_CONTENT_TYPE: &str = "application/json; charset=utf-8";
pub(crate) const FORM_CONTENT_TYPE: &str = "application/x-www-form-urlencoded; charset=utf-8";

/// Builds the endpoint URL with `args` appended as query parameters.
pub(crate) fn prepared_url(endpoint: &str, args: &QueryArgs) -> Result<Url> {
    let mut url = Url::parse(endpoint)
        .map_err(|err| MarketoError::InvalidUrl(format!("{endpoint}: {err}")))?;
    if !args.is_empty() {
        url.query_pairs_mut().extend_pairs(args.pairs());
    }
    Ok(url)
}

/// Builds the request for a single attempt.
///
/// Called once per attempt so that upload files are re-read and a retried
/// request always carries a complete body. `timeout` of `None` leaves the
/// request unbounded.
pub(crate) async fn build_request(
    http: &reqwest::Client,
    request: &RequestDescriptor,
    timeout: Option<Duration>,
) -> Result<RequestBuilder> {
    let builder = match request.method {
        Method::Get => build_get(http, request)?,
        Method::Post => build_post(http, request).await?,
        Method::Delete => {
            let url = prepared_url(&request.endpoint, &request.args)?;
            let builder = http
                .delete(url)
                .header(header::CONTENT_TYPE, JSON_CONTENT_TYPE);
            match &request.data {
                Some(data) => builder.json(data),
                None => builder,
            }
        }
    };

    let builder = builder.header(header::ACCEPT_ENCODING, "gzip");
    Ok(match timeout {
        Some(timeout) => builder.timeout(timeout),
        None => builder,
    })
}

fn build_get(http: &reqwest::Client, request: &RequestDescriptor) -> Result<RequestBuilder> {
    let url = prepared_url(&request.endpoint, &request.args)?;
    if url.as_str().len() <= MAX_GET_URL_LEN {
        return Ok(http.get(url));
    }

    let mut args = request.args.clone();
    args.insert(METHOD_OVERRIDE_FIELD, "GET");
    let bare = prepared_url(&request.endpoint, &QueryArgs::default())?;
    Ok(http
        .post(bare)
        .header(header::CONTENT_TYPE, FORM_CONTENT_TYPE)
        .form(&args.pairs()))
}

async fn build_post(http: &reqwest::Client, request: &RequestDescriptor) -> Result<RequestBuilder> {
    let url = prepared_url(&request.endpoint, &request.args)?;

    if request.mode == Mode::FormEncoded {
        return Ok(http
            .post(url)
            .header(header::CONTENT_TYPE, FORM_CONTENT_TYPE)
            .form(&form_fields(request.data.as_ref())));
    }

    if let Some(upload) = &request.upload {
        let form = multipart_form(upload, request).await?;
        return Ok(http.post(url).multipart(form));
    }

    let builder = http
        .post(url)
        .header(header::CONTENT_TYPE, JSON_CONTENT_TYPE);
    Ok(match &request.data {
        Some(data) => builder.json(data),
        None => builder,
    })
}

async fn multipart_form(upload: &Upload, request: &RequestDescriptor) -> Result<multipart::Form> {
    let contents = tokio::fs::read(&upload.path)
        .await
        .map_err(|source| MarketoError::File {
            path: upload.path.clone(),
            source,
        })?;

    let part = multipart::Part::bytes(contents)
        .file_name(file_name(&upload.path))
        .mime_str(&content_type_for(&upload.path))
        .map_err(|err| MarketoError::Encode(format!("invalid upload content type: {err}")))?;

    let mut form = multipart::Form::new();
    for (name, value) in form_fields(request.data.as_ref()) {
        form = form.text(name, value);
    }
    Ok(form.part(upload.field_name.clone(), part))
}

/// Content type guessed from the file extension.
pub(crate) fn content_type_for(path: &Path) -> String {
    mime_guess::from_path(path)
        .first_or_octet_stream()
        .essence_str()
        .to_owned()
}

fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| "upload".to_owned())
}
