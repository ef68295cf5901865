//! Status-code classification.
//!
//! The mapping from documented status codes to error variants is a lookup
//! table; codes missing from it become `ApiError::Unhandled`.

use serde::Deserialize;
use serde_json::Value;

use crate::error::ApiError;
use crate::http::HttpResponse;

type ErrorCtor = fn(String) -> ApiError;

/// Documented failure statuses of the service and the variant each maps to.
pub const STATUS_TABLE: &[(u16, ErrorCtor)] = &[
    (400, ApiError::BadRequest),
    (401, ApiError::Unauthorized),
    (403, ApiError::Forbidden),
    (404, ApiError::NotFound),
    (405, ApiError::MethodNotAllowed),
    (409, ApiError::Conflict),
    (422, ApiError::Unprocessable),
    (500, ApiError::ServerError),
];

/// The documented successful outcomes: `200 OK`, `201 Created` and
/// `304 Not Modified`. Any other status outside the table is unhandled.
pub fn is_success(status: u16) -> bool {
    matches!(status, 200 | 201 | 304)
}

/// Map a received response onto `Ok(())` or exactly one taxonomy error.
///
/// A failure body that carries no usable message yields
/// `ApiError::Deserialization` instead of the status error.
pub fn classify(response: &HttpResponse) -> Result<(), ApiError> {
    if is_success(response.status) {
        return Ok(());
    }
    let message = error_message(&response.body)?;
    Err(error_for_status(response.status, message))
}

pub fn error_for_status(status: u16, message: String) -> ApiError {
    match STATUS_TABLE.iter().find(|(code, _)| *code == status) {
        Some((_, ctor)) => ctor(message),
        None => ApiError::Unhandled { status, message },
    }
}

#[derive(Deserialize)]
struct ErrorBody {
    #[serde(default)]
    message: Option<Value>,
    #[serde(default)]
    error: Option<Value>,
}

/// Extract the human-readable message from a failure body.
///
/// The service answers `{"message": "..."}`, validation failures nest an
/// object under `message`, and OAuth failures use `{"error": "..."}`.
pub fn error_message(body: &[u8]) -> Result<String, ApiError> {
    let parsed: ErrorBody =
        serde_json::from_slice(body).map_err(|e| ApiError::Deserialization(e.to_string()))?;
    match parsed.message.or(parsed.error) {
        Some(Value::String(s)) => Ok(s),
        Some(other) => Ok(other.to_string()),
        None => Err(ApiError::Deserialization(
            "error body has no message field".to_string(),
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn response(status: u16, body: &str) -> HttpResponse {
        HttpResponse {
            status,
            headers: Vec::new(),
            body: body.as_bytes().to_vec(),
        }
    }

    #[test]
    fn every_table_entry_keeps_its_status() {
        for (code, ctor) in STATUS_TABLE {
            assert_eq!(ctor(String::new()).status(), Some(*code));
        }
    }

    #[test]
    fn success_codes_pass() {
        for status in [200, 201, 304] {
            assert!(classify(&response(status, "")).is_ok(), "{status}");
        }
    }

    #[test]
    fn undocumented_success_family_codes_are_unhandled() {
        for status in [202, 204, 206, 302] {
            let err = classify(&response(status, r#"{"message":"Accepted"}"#)).unwrap_err();
            assert!(
                matches!(err, ApiError::Unhandled { status: s, .. } if s == status),
                "{status}: {err:?}"
            );
        }
    }

    #[test]
    fn not_found_carries_message() {
        let err = classify(&response(404, r#"{"message":"404 Project Not Found"}"#)).unwrap_err();
        assert!(matches!(err, ApiError::NotFound(ref m) if m == "404 Project Not Found"));
    }

    #[test]
    fn unknown_code_is_unhandled() {
        let err = classify(&response(418, r#"{"message":"teapot"}"#)).unwrap_err();
        assert!(matches!(err, ApiError::Unhandled { status: 418, .. }));
        assert!(err.to_string().contains("418"));
    }

    #[test]
    fn structured_message_is_rendered_as_json() {
        let err = classify(&response(
            400,
            r#"{"message":{"name":["has already been taken"]}}"#,
        ))
        .unwrap_err();
        assert_eq!(err.message(), Some(r#"{"name":["has already been taken"]}"#));
    }

    #[test]
    fn oauth_error_field_is_used() {
        let err = classify(&response(401, r#"{"error":"invalid_token"}"#)).unwrap_err();
        assert!(matches!(err, ApiError::Unauthorized(ref m) if m == "invalid_token"));
    }

    #[test]
    fn unparseable_body_propagates_deserialization_error() {
        let err = classify(&response(500, "<html>oops</html>")).unwrap_err();
        assert!(matches!(err, ApiError::Deserialization(_)));
    }

    #[test]
    fn binary_failure_body_is_deserialization_error() {
        let err = classify(&HttpResponse {
            status: 500,
            headers: Vec::new(),
            body: vec![0xff, 0xfe, 0x00],
        })
        .unwrap_err();
        assert!(matches!(err, ApiError::Deserialization(_)));
    }

    #[test]
    fn body_without_message_propagates_deserialization_error() {
        let err = classify(&response(403, r#"{"detail":"nope"}"#)).unwrap_err();
        assert!(matches!(err, ApiError::Deserialization(_)));
    }
}
