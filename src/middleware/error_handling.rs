use crate::error::AppError;
use axum::{http::StatusCode, response::IntoResponse, Json};
use error_types::{error_codes, ErrorResponse};

/// Map domain errors to HTTP responses with stable codes.
pub fn map_error(err: &AppError) -> (StatusCode, ErrorResponse) {
    let status =
        StatusCode::from_u16(err.status_code()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
    let (error_type, code) = match err {
        AppError::BadRequest(_) => ("validation_error", error_codes::INVALID_REQUEST),
        AppError::Unauthorized => ("authentication_error", error_codes::MISSING_IDENTITY),
        AppError::Forbidden => ("authorization_error", error_codes::NOT_A_PARTICIPANT),
        AppError::NotFound => ("not_found_error", error_codes::NOT_FOUND),
        AppError::InvalidParticipants => ("validation_error", error_codes::INVALID_PARTICIPANTS),
        AppError::InvalidMessage(_) => ("validation_error", error_codes::INVALID_MESSAGE),
        AppError::UnsupportedType(_) => ("validation_error", error_codes::UNSUPPORTED_TYPE),
        AppError::FileTooLarge { .. } => ("validation_error", error_codes::FILE_TOO_LARGE),
        AppError::Database(_) => ("server_error", error_codes::DATABASE_ERROR),
        AppError::Storage(_) => ("server_error", error_codes::STORE_UNAVAILABLE),
        AppError::Config(_) | AppError::StartServer(_) | AppError::Internal => {
            ("server_error", error_codes::INTERNAL_SERVER_ERROR)
        }
    };

    let reason = match status {
        StatusCode::BAD_REQUEST => "Bad Request",
        StatusCode::UNAUTHORIZED => "Unauthorized",
        StatusCode::FORBIDDEN => "Forbidden",
        StatusCode::NOT_FOUND => "Not Found",
        StatusCode::PAYLOAD_TOO_LARGE => "Payload Too Large",
        StatusCode::UNSUPPORTED_MEDIA_TYPE => "Unsupported Media Type",
        StatusCode::SERVICE_UNAVAILABLE => "Service Unavailable",
        StatusCode::INTERNAL_SERVER_ERROR => "Internal Server Error",
        _ => "Error",
    };

    let response = ErrorResponse::new(reason, &err.to_string(), status.as_u16(), error_type, code);

    (status, response)
}

pub fn into_response(err: AppError) -> impl IntoResponse {
    if err.is_retryable() {
        tracing::error!(error = %err, "request failed with retryable error");
    }
    let (status, response) = map_error(&err);
    (status, Json(response))
}
