//! Response normalization shared by every transport.
//!
//! Turns a status code and raw body into either the parsed JSON value or a
//! typed [`RawFailure`].

use parley_core::RawFailure;
use serde_json::Value;

/// Maximum number of characters of a body kept for diagnostics.
pub const BODY_EXCERPT_CHARS: usize = 200;

/// Interpret a completed HTTP exchange.
pub fn interpret(status: u16, body: &[u8]) -> Result<Value, RawFailure> {
    if !(200..300).contains(&status) {
        return Err(RawFailure::ServerMessage {
            status_code: status,
            message: server_message(body),
            raw: excerpt(body),
        });
    }

    serde_json::from_slice::<Value>(body).map_err(|e| RawFailure::MalformedResponse {
        raw: format!("{e}; body: {}", excerpt(body)),
    })
}

/// Pull a human-readable explanation out of an error body, if it has one.
///
/// Looks at `detail` first, then `error`. Non-string values (validation
/// error arrays, nested objects) are rendered as compact JSON.
pub fn server_message(body: &[u8]) -> Option<String> {
    let value: Value = serde_json::from_slice(body).ok()?;
    let object = value.as_object()?;

    ["detail", "error"]
        .iter()
        .filter_map(|key| object.get(*key))
        .find_map(|field| match field {
            Value::Null => None,
            Value::String(s) if s.trim().is_empty() => None,
            Value::String(s) => Some(s.clone()),
            other => Some(other.to_string()),
        })
}

/// First [`BODY_EXCERPT_CHARS`] characters of a body, lossily decoded.
pub fn excerpt(body: &[u8]) -> String {
    String::from_utf8_lossy(body)
        .chars()
        .take(BODY_EXCERPT_CHARS)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn success_body_is_returned_unchanged() {
        let value = interpret(200, br#"{"response":"4","extra":[1,2]}"#).unwrap();
        assert_eq!(value["response"], "4");
        assert_eq!(value["extra"][1], 2);
    }

    #[test]
    fn success_with_non_json_body_is_malformed() {
        let err = interpret(200, b"<html>ok</html>").unwrap_err();
        assert!(matches!(err, RawFailure::MalformedResponse { .. }));
    }

    #[test]
    fn empty_success_body_is_malformed() {
        let err = interpret(204, b"").unwrap_err();
        assert!(matches!(err, RawFailure::MalformedResponse { .. }));
    }

    #[test]
    fn error_status_extracts_detail() {
        let err = interpret(500, br#"{"detail":"model overloaded"}"#).unwrap_err();
        assert_eq!(
            err,
            RawFailure::ServerMessage {
                status_code: 500,
                message: Some("model overloaded".into()),
                raw: r#"{"detail":"model overloaded"}"#.into(),
            }
        );
    }

    #[test]
    fn error_status_falls_back_to_error_field() {
        let err = interpret(400, br#"{"error":"invalid url"}"#).unwrap_err();
        match err {
            RawFailure::ServerMessage { message, .. } => {
                assert_eq!(message.as_deref(), Some("invalid url"))
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn structured_detail_is_stringified() {
        let message = server_message(br#"{"detail":[{"loc":["body","age"],"msg":"field required"}]}"#);
        assert_eq!(
            message.as_deref(),
            Some(r#"[{"loc":["body","age"],"msg":"field required"}]"#)
        );
    }

    #[test]
    fn unparseable_error_body_still_fails_with_status() {
        let err = interpret(502, b"Bad Gateway").unwrap_err();
        match err {
            RawFailure::ServerMessage {
                status_code,
                message,
                raw,
            } => {
                assert_eq!(status_code, 502);
                assert!(message.is_none());
                assert_eq!(raw, "Bad Gateway");
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn excerpt_is_bounded() {
        let body = "x".repeat(1000);
        assert_eq!(excerpt(body.as_bytes()).chars().count(), BODY_EXCERPT_CHARS);
    }
}
