//! Wire-level error envelope shared between the service and its clients.
//!
//! Every non-2xx response body is an [`ErrorResponse`]. The `code` field is a
//! stable machine-readable identifier; `message` is safe to show to a user.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    /// Short HTTP reason phrase ("Bad Request", "Forbidden", ...)
    pub error: String,
    /// Human-readable description of what went wrong
    pub message: String,
    /// HTTP status code, duplicated in the body for log correlation
    pub status: u16,
    /// Coarse classification ("validation_error", "server_error", ...)
    pub error_type: String,
    /// Stable code from [`error_codes`]
    pub code: String,
}

impl ErrorResponse {
    pub fn new(error: &str, message: &str, status: u16, error_type: &str, code: &str) -> Self {
        Self {
            error: error.to_string(),
            message: message.to_string(),
            status,
            error_type: error_type.to_string(),
            code: code.to_string(),
        }
    }
}

/// Stable error codes for the messaging domain.
pub mod error_codes {
    pub const INVALID_REQUEST: &str = "INVALID_REQUEST";
    pub const MISSING_IDENTITY: &str = "MISSING_IDENTITY";
    pub const NOT_A_PARTICIPANT: &str = "NOT_A_PARTICIPANT";
    pub const INVALID_PARTICIPANTS: &str = "INVALID_PARTICIPANTS";
    pub const INVALID_MESSAGE: &str = "INVALID_MESSAGE";
    pub const UNSUPPORTED_TYPE: &str = "UNSUPPORTED_TYPE";
    pub const FILE_TOO_LARGE: &str = "FILE_TOO_LARGE";
    pub const NOT_FOUND: &str = "NOT_FOUND";
    pub const DATABASE_ERROR: &str = "DATABASE_ERROR";
    pub const STORE_UNAVAILABLE: &str = "STORE_UNAVAILABLE";
    pub const INTERNAL_SERVER_ERROR: &str = "INTERNAL_SERVER_ERROR";
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn carries_status_and_code() {
        let response = ErrorResponse::new(
            "Payload Too Large",
            "file too large: image attachments are limited to 5 MiB",
            413,
            "validation_error",
            error_codes::FILE_TOO_LARGE,
        );
        assert_eq!(response.status, 413);
        assert_eq!(response.code, "FILE_TOO_LARGE");
        assert!(response.message.contains("5 MiB"));
    }
}
