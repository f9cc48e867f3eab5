//! Response envelope shared by every Marketo REST endpoint.
//!
//! Both remote responses and locally synthesized error responses use the
//! shape `{success, errors: [{code, message}], ...}`.

use std::borrow::Cow;
use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value as JsonValue};

/// Message used in place of the body when the service answers 502 with a
/// non-JSON page.
pub const UNAVAILABLE_MESSAGE: &str = "Marketo instance is unavailable";

/// Decoded response envelope.
///
/// `success` and `errors` are typed; every other top-level field of the
/// response is kept in `extra`.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Envelope {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub success: Option<bool>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub errors: Vec<ApiErrorEntry>,
    #[serde(flatten)]
    pub extra: Map<String, JsonValue>,
}

impl Envelope {
    /// Builds the envelope returned when a response body is not JSON.
    pub fn synthetic(status: u16, body: &str) -> Self {
        let message = if status == 502 {
            UNAVAILABLE_MESSAGE.to_owned()
        } else {
            body.to_owned()
        };
        Self {
            success: Some(false),
            errors: vec![ApiErrorEntry {
                code: ErrorCode::Number(i64::from(status)),
                message,
            }],
            extra: Map::new(),
        }
    }

    /// `true` unless the payload explicitly says `success: false`.
    pub fn is_success(&self) -> bool {
        self.success != Some(false)
    }

    pub fn first_error(&self) -> Option<&ApiErrorEntry> {
        self.errors.first()
    }

    /// Looks up a payload field other than `success`/`errors`.
    pub fn get(&self, field: &str) -> Option<&JsonValue> {
        self.extra.get(field)
    }

    /// Converts the envelope back into a plain JSON value.
    pub fn into_json(self) -> JsonValue {
        serde_json::to_value(self).unwrap_or(JsonValue::Null)
    }

    /// Builds an envelope from any JSON object without rejecting it.
    ///
    /// `errors: null` reads as no errors. A `success` or `errors` value of
    /// an unexpected type stays in `extra`, as does every other field.
    pub fn from_object(mut object: Map<String, JsonValue>) -> Self {
        let success = match object.remove("success") {
            Some(JsonValue::Bool(flag)) => Some(flag),
            Some(JsonValue::Null) | None => None,
            Some(other) => {
                object.insert("success".to_owned(), other);
                None
            }
        };
        let errors = match object.remove("errors") {
            Some(JsonValue::Array(items)) => {
                items.into_iter().map(ApiErrorEntry::from_value).collect()
            }
            Some(JsonValue::Null) | None => Vec::new(),
            Some(other) => {
                object.insert("errors".to_owned(), other);
                Vec::new()
            }
        };
        Self {
            success,
            errors,
            extra: object,
        }
    }
}

/// One entry of the `errors` list.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApiErrorEntry {
    #[serde(default)]
    pub code: ErrorCode,
    #[serde(default)]
    pub message: String,
}

impl ApiErrorEntry {
    /// Reads one `errors` item, whatever its shape.
    pub fn from_value(value: JsonValue) -> Self {
        let JsonValue::Object(mut item) = value else {
            return Self {
                code: ErrorCode::default(),
                message: text_of(value),
            };
        };
        Self {
            code: item
                .remove("code")
                .map(ErrorCode::from_value)
                .unwrap_or_default(),
            message: item.remove("message").map(text_of).unwrap_or_default(),
        }
    }
}

fn text_of(value: JsonValue) -> String {
    match value {
        JsonValue::String(text) => text,
        JsonValue::Null => String::new(),
        other => other.to_string(),
    }
}

impl fmt::Display for ApiErrorEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.code, self.message)
    }
}

/// Error code as it appeared on the wire.
///
/// Marketo sends codes as strings (`"606"`), synthesized envelopes use the
/// numeric HTTP status. Equality compares the textual form, so
/// `Text("606") == Number(606)`.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ErrorCode {
    Number(i64),
    Text(String),
}

impl ErrorCode {
    pub fn as_text(&self) -> Cow<'_, str> {
        match self {
            Self::Number(code) => Cow::Owned(code.to_string()),
            Self::Text(code) => Cow::Borrowed(code.trim()),
        }
    }

    /// Reads a code of any JSON shape. Integral floats such as `606.0`
    /// become numbers, anything else falls back to its JSON text.
    pub fn from_value(value: JsonValue) -> Self {
        match value {
            JsonValue::String(text) => Self::Text(text),
            JsonValue::Number(number) => match number.as_i64() {
                Some(code) => Self::Number(code),
                None => match number.as_f64() {
                    Some(code) if code.fract() == 0.0 && code.abs() < 1e15 => {
                        Self::Number(code as i64)
                    }
                    _ => Self::Text(number.to_string()),
                },
            },
            JsonValue::Null => Self::default(),
            other => Self::Text(other.to_string()),
        }
    }

    /// Returns the transient condition this code stands for, if any.
    pub fn recoverable(&self) -> Option<RecoverableCode> {
        RecoverableCode::from_code(self)
    }
}

impl Default for ErrorCode {
    fn default() -> Self {
        Self::Text(String::new())
    }
}

impl PartialEq for ErrorCode {
    fn eq(&self, other: &Self) -> bool {
        self.as_text() == other.as_text()
    }
}

impl Eq for ErrorCode {}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.as_text())
    }
}

impl From<&str> for ErrorCode {
    fn from(code: &str) -> Self {
        Self::Text(code.to_owned())
    }
}

impl From<i64> for ErrorCode {
    fn from(code: i64) -> Self {
        Self::Number(code)
    }
}

/// Error codes that signal a transient condition worth retrying.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RecoverableCode {
    /// 606: too many calls within the rate window.
    RateLimiter,
    /// 615: too many calls in flight at once.
    ConcurrentCallLimit,
    /// 604: the request timed out on the Marketo side.
    Timeout,
}

impl RecoverableCode {
    pub fn from_code(code: &ErrorCode) -> Option<Self> {
        match code.as_text().as_ref() {
            "606" => Some(Self::RateLimiter),
            "615" => Some(Self::ConcurrentCallLimit),
            "604" => Some(Self::Timeout),
            _ => None,
        }
    }

    pub fn code(self) -> u16 {
        match self {
            Self::RateLimiter => 606,
            Self::ConcurrentCallLimit => 615,
            Self::Timeout => 604,
        }
    }

    /// Human readable name of the limit that was hit.
    pub fn description(self) -> &'static str {
        match self {
            Self::RateLimiter => "rate limiter",
            Self::ConcurrentCallLimit => "concurrent call limit",
            Self::Timeout => "timeout",
        }
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::{ApiErrorEntry, Envelope, ErrorCode, RecoverableCode, UNAVAILABLE_MESSAGE};

    #[test]
    fn envelope_keeps_payload_fields() {
        let envelope: Envelope = serde_json::from_value(json!({
            "requestId": "e42b#14272d07d78",
            "success": true,
            "result": [1, 2, 3]
        }))
        .expect("envelope must decode");

        assert!(envelope.is_success());
        assert!(envelope.errors.is_empty());
        assert_eq!(envelope.get("result"), Some(&json!([1, 2, 3])));
        assert_eq!(
            envelope.into_json(),
            json!({"requestId": "e42b#14272d07d78", "success": true, "result": [1, 2, 3]})
        );
    }

    #[test]
    fn missing_success_counts_as_success() {
        let envelope: Envelope =
            serde_json::from_value(json!({"access_token": "abc", "expires_in": 3599}))
                .expect("token payload must decode");
        assert_eq!(envelope.success, None);
        assert!(envelope.is_success());
    }

    #[test]
    fn string_and_numeric_codes_compare_by_text() {
        let envelope: Envelope = serde_json::from_value(json!({
            "success": false,
            "errors": [{"code": "615", "message": "Concurrent access limit reached"}]
        }))
        .expect("error payload must decode");

        let first = envelope.first_error().expect("must have an error");
        assert_eq!(first.code, ErrorCode::Number(615));
        assert_eq!(
            first.code.recoverable(),
            Some(RecoverableCode::ConcurrentCallLimit)
        );
        assert_eq!(first.to_string(), "615: Concurrent access limit reached");
    }

    #[test]
    fn only_transient_codes_are_recoverable() {
        assert_eq!(
            ErrorCode::from("606").recoverable(),
            Some(RecoverableCode::RateLimiter)
        );
        assert_eq!(
            ErrorCode::from(604).recoverable(),
            Some(RecoverableCode::Timeout)
        );
        assert_eq!(ErrorCode::from("601").recoverable(), None);
        assert_eq!(ErrorCode::from("1003").recoverable(), None);
        assert_eq!(RecoverableCode::Timeout.description(), "timeout");
        assert_eq!(RecoverableCode::RateLimiter.code(), 606);
    }

    #[test]
    fn from_object_tolerates_null_errors() {
        let serde_json::Value::Object(object) =
            json!({"success": true, "errors": null, "result": [1]})
        else {
            unreachable!("fixture is an object")
        };
        let envelope = Envelope::from_object(object);

        assert_eq!(envelope.success, Some(true));
        assert!(envelope.errors.is_empty());
        assert!(envelope.is_success());
        assert_eq!(envelope.get("result"), Some(&json!([1])));
    }

    #[test]
    fn from_object_reads_odd_error_codes() {
        let serde_json::Value::Object(object) = json!({
            "success": false,
            "errors": [
                {"code": 606.0, "message": "rate limiter"},
                {"code": {"id": 1}, "message": 7},
                "plain text"
            ],
            "warnings": []
        }) else {
            unreachable!("fixture is an object")
        };
        let envelope = Envelope::from_object(object);

        assert_eq!(envelope.errors.len(), 3);
        assert_eq!(envelope.errors[0].code, ErrorCode::Number(606));
        assert_eq!(
            envelope.errors[0].code.recoverable(),
            Some(RecoverableCode::RateLimiter)
        );
        assert_eq!(envelope.errors[1].code, ErrorCode::Text("{\"id\":1}".to_owned()));
        assert_eq!(envelope.errors[1].message, "7");
        assert_eq!(envelope.errors[2].message, "plain text");
        assert_eq!(envelope.get("warnings"), Some(&json!([])));
    }

    #[test]
    fn from_object_keeps_mistyped_flags_in_extra() {
        let serde_json::Value::Object(object) = json!({"success": "yes", "errors": "none"}) else {
            unreachable!("fixture is an object")
        };
        let envelope = Envelope::from_object(object);

        assert_eq!(envelope.success, None);
        assert!(envelope.errors.is_empty());
        assert_eq!(envelope.get("success"), Some(&json!("yes")));
        assert_eq!(envelope.get("errors"), Some(&json!("none")));
    }

    #[test]
    fn synthetic_envelope_uses_fixed_message_for_502() {
        let envelope = Envelope::synthetic(502, "<html>Bad Gateway</html>");
        assert_eq!(
            envelope.into_json(),
            json!({"success": false, "errors": [{"code": 502, "message": UNAVAILABLE_MESSAGE}]})
        );

        let envelope = Envelope::synthetic(413, "Request Entity Too Large");
        assert_eq!(
            envelope.errors,
            vec![ApiErrorEntry {
                code: ErrorCode::Number(413),
                message: "Request Entity Too Large".to_owned(),
            }]
        );
    }
}
