use chat_service::error::AppError;
use chat_service::middleware::error_handling::map_error;

#[test]
fn maps_config_error_to_500() {
    let (status, body) = map_error(&AppError::Config("missing".into()));
    assert_eq!(status.as_u16(), 500);
    assert!(body.message.contains("config"));
}

#[test]
fn missing_identity_is_401() {
    let (status, body) = map_error(&AppError::Unauthorized);
    assert_eq!(status.as_u16(), 401);
    assert_eq!(body.code, "MISSING_IDENTITY");
}

#[test]
fn non_participant_is_403() {
    let (status, body) = map_error(&AppError::Forbidden);
    assert_eq!(status.as_u16(), 403);
    assert_eq!(body.code, "NOT_A_PARTICIPANT");
}

#[test]
fn self_conversation_is_a_400_with_stable_code() {
    let (status, body) = map_error(&AppError::InvalidParticipants);
    assert_eq!(status.as_u16(), 400);
    assert_eq!(body.code, "INVALID_PARTICIPANTS");
}

#[test]
fn oversized_upload_carries_the_ceiling_in_the_message() {
    let err = AppError::FileTooLarge {
        kind: "image",
        limit: "5 MiB",
    };
    let (status, body) = map_error(&err);
    assert_eq!(status.as_u16(), 413);
    assert_eq!(body.code, "FILE_TOO_LARGE");
    assert!(body.message.contains("5 MiB"));
}

#[test]
fn storage_failures_are_retryable_503s() {
    let err = AppError::Storage("s3 timeout".into());
    assert!(err.is_retryable());
    let (status, body) = map_error(&err);
    assert_eq!(status.as_u16(), 503);
    assert_eq!(body.code, "STORE_UNAVAILABLE");
}

#[test]
fn validation_failures_are_not_retryable() {
    assert!(!AppError::InvalidMessage("empty".into()).is_retryable());
    assert!(!AppError::Forbidden.is_retryable());
}
