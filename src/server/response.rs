use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;
use serde_json::json;

use crate::error::{Error, Result as StoreResult};

const INTERNAL_MESSAGE: &str = "An internal server error occurred.";

/// Body of a mutation that only reports success.
#[derive(Debug, Serialize)]
pub struct SuccessResponse {
    pub success: bool,
}

impl SuccessResponse {
    #[must_use]
    pub fn ok() -> Self {
        Self { success: true }
    }
}

#[derive(Debug, Serialize)]
pub struct MessageResponse {
    pub message: String,
}

impl MessageResponse {
    #[must_use]
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

/// API error that converts to a proper HTTP response
#[derive(Debug)]
pub struct ApiError {
    pub status: StatusCode,
    pub message: String,
}

impl ApiError {
    #[must_use]
    pub fn bad_request(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::BAD_REQUEST,
            message: message.into(),
        }
    }

    #[must_use]
    pub fn unauthorized(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::UNAUTHORIZED,
            message: message.into(),
        }
    }

    #[must_use]
    pub fn not_found(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::NOT_FOUND,
            message: message.into(),
        }
    }

    #[must_use]
    pub fn conflict(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::CONFLICT,
            message: message.into(),
        }
    }

    #[must_use]
    pub fn payload_too_large(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::PAYLOAD_TOO_LARGE,
            message: message.into(),
        }
    }

    #[must_use]
    pub fn bad_gateway(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::BAD_GATEWAY,
            message: message.into(),
        }
    }

    #[must_use]
    pub fn timed_out() -> Self {
        Self {
            status: StatusCode::GATEWAY_TIMEOUT,
            message: "Request timed out".to_string(),
        }
    }

    #[must_use]
    pub fn internal() -> Self {
        Self {
            status: StatusCode::INTERNAL_SERVER_ERROR,
            message: INTERNAL_MESSAGE.to_string(),
        }
    }
}

impl From<Error> for ApiError {
    fn from(e: Error) -> Self {
        match e {
            Error::InvalidArgument(message) => {
                tracing::warn!("Rejected request: {message}");
                Self::bad_request(message)
            }
            Error::NotLinked => {
                tracing::warn!("Rejected upload: category not linked to user");
                Self::bad_request("Category not linked to user")
            }
            Error::Unauthorized => {
                tracing::warn!("Rejected credentials");
                Self::unauthorized("Incorrect Password")
            }
            Error::NotFound => Self::not_found("Not found"),
            Error::AlreadyExists => Self::conflict("Already exists"),
            Error::UploadFailed(detail) => {
                tracing::error!("Upload failed: {detail}");
                Self::bad_gateway("Image upload failed")
            }
            e @ (Error::Database(_) | Error::Io(_) | Error::Config(_)) => {
                tracing::error!("Internal error: {e}");
                Self::internal()
            }
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = json!({ "success": false, "error": self.message });
        (self.status, Json(body)).into_response()
    }
}

/// Extension trait for giving store errors a resource-specific message.
pub trait StoreResultExt<T> {
    fn or_not_found(self, message: &'static str) -> Result<T, ApiError>;
    fn or_conflict(self, message: &'static str) -> Result<T, ApiError>;
}

impl<T> StoreResultExt<T> for StoreResult<T> {
    fn or_not_found(self, message: &'static str) -> Result<T, ApiError> {
        self.map_err(|e| match e {
            Error::NotFound => ApiError::not_found(message),
            e => ApiError::from(e),
        })
    }

    fn or_conflict(self, message: &'static str) -> Result<T, ApiError> {
        self.map_err(|e| match e {
            Error::AlreadyExists => ApiError::conflict(message),
            e => ApiError::from(e),
        })
    }
}

/// Extension for Option types from store operations.
pub trait StoreOptionExt<T> {
    fn or_not_found(self, message: &'static str) -> Result<T, ApiError>;
}

impl<T> StoreOptionExt<T> for Option<T> {
    fn or_not_found(self, message: &'static str) -> Result<T, ApiError> {
        self.ok_or_else(|| ApiError::not_found(message))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_mapping() {
        let cases = [
            (Error::InvalidArgument("x".into()), StatusCode::BAD_REQUEST),
            (Error::NotLinked, StatusCode::BAD_REQUEST),
            (Error::Unauthorized, StatusCode::UNAUTHORIZED),
            (Error::NotFound, StatusCode::NOT_FOUND),
            (Error::AlreadyExists, StatusCode::CONFLICT),
            (Error::UploadFailed("x".into()), StatusCode::BAD_GATEWAY),
            (Error::Config("x".into()), StatusCode::INTERNAL_SERVER_ERROR),
        ];
        for (error, status) in cases {
            assert_eq!(ApiError::from(error).status, status);
        }
    }

    #[test]
    fn test_storage_errors_do_not_leak() {
        let error = Error::Database(rusqlite::Error::InvalidQuery);
        let api = ApiError::from(error);
        assert_eq!(api.message, INTERNAL_MESSAGE);
        assert_eq!(
            ApiError::from(Error::Unauthorized).message,
            "Incorrect Password"
        );
    }

    #[test]
    fn test_resource_messages() {
        let result: StoreResult<()> = Err(Error::NotFound);
        let api = result.or_not_found("User not found").unwrap_err();
        assert_eq!(api.status, StatusCode::NOT_FOUND);
        assert_eq!(api.message, "User not found");

        let result: StoreResult<()> = Err(Error::NotLinked);
        assert_eq!(
            result.or_not_found("User not found").unwrap_err().status,
            StatusCode::BAD_REQUEST
        );
    }
}
