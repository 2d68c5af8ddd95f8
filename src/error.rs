// HTTP API Error Types
use axum::{extract::rejection::JsonRejection, http::StatusCode, response::IntoResponse, Json};
use serde_json::{json, Value};

use crate::auth::AuthError;
use crate::database::StoreError;
use crate::services::submission::SubmissionError;
use crate::services::validation::ValidationError;

pub const INVALID_CREDENTIALS: &str = "Invalid email or password";
pub const EMAIL_TAKEN: &str = "Email already exists";
pub const ALREADY_SUBMITTED: &str = "User has already completed the questionnaire";

/// HTTP API error with appropriate status codes and client-friendly messages
#[derive(Debug)]
pub enum ApiError {
    // 400 Bad Request
    Validation(String),
    EmailTaken,
    AlreadySubmitted,

    // 401 Unauthorized
    InvalidCredentials,
    Unauthenticated(String),

    // 403 Forbidden
    Unauthorized(String),

    // 404 Not Found
    NotFound(String),

    // 500 Internal Server Error
    Internal(String),

    // 503 Service Unavailable
    ServiceUnavailable(String),
}

impl ApiError {
    /// Get HTTP status code
    pub fn status_code(&self) -> StatusCode {
        match self {
            ApiError::Validation(_) | ApiError::EmailTaken | ApiError::AlreadySubmitted => {
                StatusCode::BAD_REQUEST
            }
            ApiError::InvalidCredentials | ApiError::Unauthenticated(_) => StatusCode::UNAUTHORIZED,
            ApiError::Unauthorized(_) => StatusCode::FORBIDDEN,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
            ApiError::ServiceUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
        }
    }

    /// Get client-safe error message
    pub fn message(&self) -> &str {
        match self {
            ApiError::Validation(msg) => msg,
            ApiError::EmailTaken => EMAIL_TAKEN,
            ApiError::AlreadySubmitted => ALREADY_SUBMITTED,
            ApiError::InvalidCredentials => INVALID_CREDENTIALS,
            ApiError::Unauthenticated(msg) => msg,
            ApiError::Unauthorized(msg) => msg,
            ApiError::NotFound(msg) => msg,
            ApiError::Internal(msg) => msg,
            ApiError::ServiceUnavailable(msg) => msg,
        }
    }

    /// Get error code for client handling
    pub fn error_code(&self) -> &'static str {
        match self {
            ApiError::Validation(_) => "VALIDATION_ERROR",
            ApiError::EmailTaken => "EMAIL_TAKEN",
            ApiError::AlreadySubmitted => "ALREADY_SUBMITTED",
            ApiError::InvalidCredentials => "INVALID_CREDENTIALS",
            ApiError::Unauthenticated(_) => "UNAUTHENTICATED",
            ApiError::Unauthorized(_) => "UNAUTHORIZED",
            ApiError::NotFound(_) => "NOT_FOUND",
            ApiError::Internal(_) => "INTERNAL_ERROR",
            ApiError::ServiceUnavailable(_) => "SERVICE_UNAVAILABLE",
        }
    }

    /// Convert to JSON response body
    pub fn to_json(&self) -> Value {
        json!({
            "success": false,
            "error": self.message(),
            "code": self.error_code()
        })
    }
}

// Static constructor methods
impl ApiError {
    pub fn validation(message: impl Into<String>) -> Self {
        ApiError::Validation(message.into())
    }

    pub fn unauthenticated(message: impl Into<String>) -> Self {
        ApiError::Unauthenticated(message.into())
    }

    pub fn unauthorized(message: impl Into<String>) -> Self {
        ApiError::Unauthorized(message.into())
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        ApiError::NotFound(message.into())
    }

    pub fn internal(message: impl Into<String>) -> Self {
        ApiError::Internal(message.into())
    }

    pub fn service_unavailable(message: impl Into<String>) -> Self {
        ApiError::ServiceUnavailable(message.into())
    }
}

impl From<ValidationError> for ApiError {
    fn from(err: ValidationError) -> Self {
        ApiError::Validation(err.message)
    }
}

impl From<StoreError> for ApiError {
    fn from(err: StoreError) -> Self {
        // Don't expose storage details to clients
        tracing::error!("Storage error: {}", err);
        ApiError::internal("An error occurred while processing your request")
    }
}

impl From<AuthError> for ApiError {
    fn from(err: AuthError) -> Self {
        match err {
            AuthError::Validation(e) => e.into(),
            AuthError::EmailTaken => ApiError::EmailTaken,
            AuthError::InvalidCredentials => ApiError::InvalidCredentials,
            AuthError::TokenInvalid => ApiError::unauthenticated("Invalid token."),
            AuthError::TokenExpired => ApiError::unauthenticated("Token has expired."),
            AuthError::Store(e) => e.into(),
            AuthError::Hashing(msg) | AuthError::TokenGeneration(msg) => {
                tracing::error!("Credential processing error: {}", msg);
                ApiError::internal("An error occurred while processing your request")
            }
        }
    }
}

impl From<SubmissionError> for ApiError {
    fn from(err: SubmissionError) -> Self {
        match err {
            SubmissionError::Validation(e) => e.into(),
            SubmissionError::AlreadySubmitted => ApiError::AlreadySubmitted,
            SubmissionError::NotFound(msg) => ApiError::not_found(msg),
            SubmissionError::Store(e) => e.into(),
        }
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        ApiError::validation(format!("Invalid request body: {}", rejection.body_text()))
    }
}

// Standard error trait implementations
impl std::fmt::Display for ApiError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message())
    }
}

impl std::error::Error for ApiError {}

// Automatic HTTP response conversion for Axum
impl IntoResponse for ApiError {
    fn into_response(self) -> axum::response::Response {
        (self.status_code(), Json(self.to_json())).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn taxonomy_maps_to_statuses() {
        assert_eq!(ApiError::validation("x").status_code(), StatusCode::BAD_REQUEST);
        assert_eq!(ApiError::AlreadySubmitted.status_code(), StatusCode::BAD_REQUEST);
        assert_eq!(ApiError::EmailTaken.status_code(), StatusCode::BAD_REQUEST);
        assert_eq!(ApiError::InvalidCredentials.status_code(), StatusCode::UNAUTHORIZED);
        assert_eq!(ApiError::unauthenticated("x").status_code(), StatusCode::UNAUTHORIZED);
        assert_eq!(ApiError::unauthorized("x").status_code(), StatusCode::FORBIDDEN);
        assert_eq!(ApiError::not_found("x").status_code(), StatusCode::NOT_FOUND);
        assert_eq!(ApiError::internal("x").status_code(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn body_has_success_false_and_message() {
        let body = ApiError::AlreadySubmitted.to_json();
        assert_eq!(body["success"], false);
        assert_eq!(body["error"], ALREADY_SUBMITTED);
        assert_eq!(body["code"], "ALREADY_SUBMITTED");
    }

    #[test]
    fn storage_faults_do_not_leak() {
        let err: ApiError = StoreError::Corrupt("industry 'x' in row 42".to_string()).into();
        assert_eq!(err.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
        assert!(!err.message().contains("row 42"));
    }
}
