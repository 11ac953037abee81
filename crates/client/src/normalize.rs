//! Pure mapping from HTTP outcomes to results.
//!
//! Nothing here does I/O; the executor feeds in a status and the raw body and
//! acts on the [`Outcome`].

use reqwest::StatusCode;
use serde::Deserialize;
use serde_json::{Map, Value};

/// Envelope fields that may carry a collection, in priority order.
const LIST_ENVELOPE_FIELDS: [&str; 3] = ["items", "payload", "data"];

/// What a response means, independent of how it got here.
#[derive(Debug, Clone, PartialEq)]
pub enum Outcome {
    /// 2xx with a body. A body that is not JSON is reported as `{}`.
    Success(Value),
    /// 204.
    NoContent,
    /// 401. The executor decides whether to refresh.
    Unauthorized,
    /// Any other non-success status, with the message to show the user.
    Failure { status: u16, message: String },
}

#[derive(Deserialize)]
struct ErrorPayload {
    message: Option<String>,
}

/// Classify a response.
#[must_use]
pub fn classify(status: StatusCode, body: &[u8]) -> Outcome {
    if status == StatusCode::NO_CONTENT {
        return Outcome::NoContent;
    }
    if status == StatusCode::UNAUTHORIZED {
        return Outcome::Unauthorized;
    }
    if status.is_success() {
        let value = serde_json::from_slice(body).unwrap_or_else(|_| Value::Object(Map::new()));
        return Outcome::Success(value);
    }
    Outcome::Failure {
        status: status.as_u16(),
        message: error_message(status, body),
    }
}

/// User-facing message for a failed response: the server's `message` if the
/// body carries a non-empty one, otherwise `System error (<status>)`.
#[must_use]
pub fn error_message(status: StatusCode, body: &[u8]) -> String {
    serde_json::from_slice::<ErrorPayload>(body)
        .ok()
        .and_then(|p| p.message)
        .filter(|m| !m.trim().is_empty())
        .unwrap_or_else(|| format!("System error ({})", status.as_u16()))
}

/// Pull a collection out of whatever envelope the endpoint used.
///
/// A bare array is used as is; otherwise the first of `items`, `payload`,
/// `data` holding an array wins; anything else yields an empty list.
#[must_use]
pub fn extract_list(payload: Value) -> Vec<Value> {
    match payload {
        Value::Array(items) => items,
        Value::Object(mut fields) => LIST_ENVELOPE_FIELDS
            .iter()
            .find_map(|name| match fields.remove(*name) {
                Some(Value::Array(items)) => Some(items),
                _ => None,
            })
            .unwrap_or_default(),
        _ => Vec::new(),
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn test_extract_list_envelopes() {
        let expected = vec![json!(1), json!(2), json!(3)];
        assert_eq!(extract_list(json!([1, 2, 3])), expected);
        assert_eq!(extract_list(json!({"items": [1, 2, 3]})), expected);
        assert_eq!(extract_list(json!({"payload": [1, 2, 3]})), expected);
        assert_eq!(extract_list(json!({"data": [1, 2, 3]})), expected);
        assert!(extract_list(json!({})).is_empty());
    }

    #[test]
    fn test_extract_list_priority_and_non_arrays() {
        assert_eq!(
            extract_list(json!({"data": [2], "items": [1]})),
            vec![json!(1)]
        );
        assert_eq!(
            extract_list(json!({"items": "nope", "data": [2]})),
            vec![json!(2)]
        );
        assert!(extract_list(json!(true)).is_empty());
        assert!(extract_list(Value::Null).is_empty());
    }

    #[test]
    fn test_classify_success_bodies() {
        assert_eq!(
            classify(StatusCode::OK, br#"{"id":1}"#),
            Outcome::Success(json!({"id": 1}))
        );
        assert_eq!(
            classify(StatusCode::CREATED, b"<html>oops</html>"),
            Outcome::Success(json!({}))
        );
        assert_eq!(classify(StatusCode::OK, b""), Outcome::Success(json!({})));
        assert_eq!(classify(StatusCode::NO_CONTENT, b""), Outcome::NoContent);
    }

    #[test]
    fn test_classify_failures() {
        assert_eq!(
            classify(StatusCode::UNAUTHORIZED, br#"{"message":"expired"}"#),
            Outcome::Unauthorized
        );
        assert_eq!(
            classify(StatusCode::CONFLICT, br#"{"message":"Already in cart"}"#),
            Outcome::Failure {
                status: 409,
                message: "Already in cart".to_string()
            }
        );
        assert_eq!(
            classify(StatusCode::BAD_GATEWAY, b"upstream down"),
            Outcome::Failure {
                status: 502,
                message: "System error (502)".to_string()
            }
        );
    }

    #[test]
    fn test_blank_message_falls_back() {
        assert_eq!(
            error_message(StatusCode::BAD_REQUEST, br#"{"message":"  "}"#),
            "System error (400)"
        );
        assert_eq!(
            error_message(StatusCode::NOT_FOUND, br#"{"message":null}"#),
            "System error (404)"
        );
    }
}
