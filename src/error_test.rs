use super::*;

#[derive(Debug)]
struct Flaky;

impl std::fmt::Display for Flaky {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "upstream hiccup")
    }
}

impl ErrorCode for Flaky {
    fn error_code(&self) -> &'static str {
        "E_FLAKY"
    }

    fn retryable(&self) -> bool {
        true
    }
}

#[derive(Debug)]
struct Plain;

impl std::fmt::Display for Plain {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "plain")
    }
}

impl ErrorCode for Plain {
    fn error_code(&self) -> &'static str {
        "E_PLAIN"
    }
}

#[test]
fn api_error_copies_code_message_and_retry_hint() {
    let err = ApiError::new(StatusCode::BAD_GATEWAY, &Flaky);
    assert_eq!(err.status, StatusCode::BAD_GATEWAY);
    assert_eq!(err.code, "E_FLAKY");
    assert_eq!(err.message, "upstream hiccup");
    assert!(err.retryable);
}

#[test]
fn retryable_defaults_to_false() {
    assert!(!ApiError::new(StatusCode::BAD_REQUEST, &Plain).retryable);
}

#[test]
fn body_omits_status() {
    let json = serde_json::to_value(ApiError::new(StatusCode::NOT_FOUND, &Plain)).unwrap();
    assert_eq!(json, serde_json::json!({ "code": "E_PLAIN", "message": "plain", "retryable": false }));
}

#[tokio::test]
async fn into_response_uses_status() {
    let response = ApiError::new(StatusCode::CONFLICT, &Plain).into_response();
    assert_eq!(response.status(), StatusCode::CONFLICT);
}
