use crate::{Envelope, ErrorCode, RecoverableCode};

/// Classification of a decoded envelope.
#[derive(Clone, Debug, PartialEq)]
pub(crate) enum Verdict {
    /// Hand the envelope back to the caller.
    Done,
    /// Transient error, eligible for another attempt.
    Recoverable {
        code: ErrorCode,
        kind: RecoverableCode,
    },
    /// Any other `success: false` payload.
    Fatal { code: ErrorCode, message: String },
}

/// Result of decoding a response body.
#[derive(Clone, Debug, PartialEq)]
pub(crate) enum Decoded {
    Parsed(Envelope),
    /// Synthesized locally; terminal, never classified or retried.
    Malformed(Envelope),
}

/// Decodes a response body into an envelope.
///
/// Bodies that are not a JSON object (HTML error pages, plain text, bare
/// arrays) become a synthetic `success: false` envelope carrying the HTTP
/// status. Any JSON object is accepted as the service's own answer.
pub(crate) fn decode_envelope(status: u16, body: &[u8]) -> Decoded {
    match serde_json::from_slice::<serde_json::Value>(body) {
        Ok(serde_json::Value::Object(object)) => Decoded::Parsed(Envelope::from_object(object)),
        _ => Decoded::Malformed(Envelope::synthetic(
            status,
            &String::from_utf8_lossy(body),
        )),
    }
}

pub(crate) fn classify(envelope: &Envelope) -> Verdict {
    if envelope.is_success() {
        return Verdict::Done;
    }

    let Some(first) = envelope.first_error() else {
        return Verdict::Fatal {
            code: ErrorCode::Text("unknown".to_owned()),
            message: "request failed without error details".to_owned(),
        };
    };

    match first.code.recoverable() {
        Some(kind) => Verdict::Recoverable {
            code: first.code.clone(),
            kind,
        },
        None => Verdict::Fatal {
            code: first.code.clone(),
            message: first.message.clone(),
        },
    }
}
