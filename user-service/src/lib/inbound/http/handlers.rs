use axum::http::header;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::response::Response;
use axum::Json;
use serde::Serialize;

use crate::user::errors::AuthError;

pub mod email_verification;
pub mod login;
pub mod password_reset;
pub mod refresh;
pub mod register;

#[derive(Debug, Clone)]
pub struct ApiSuccess<T: Serialize + PartialEq>(StatusCode, Json<ApiResponseBody<T>>);

impl<T> PartialEq for ApiSuccess<T>
where
    T: Serialize + PartialEq,
{
    fn eq(&self, other: &Self) -> bool {
        self.0 == other.0 && self.1 .0 == other.1 .0
    }
}

impl<T: Serialize + PartialEq> ApiSuccess<T> {
    pub fn new(status: StatusCode, data: T) -> Self {
        ApiSuccess(status, Json(ApiResponseBody::new(status, data)))
    }
}

impl<T: Serialize + PartialEq> IntoResponse for ApiSuccess<T> {
    fn into_response(self) -> Response {
        (self.0, self.1).into_response()
    }
}

/// API-level error with a stable machine-readable code.
///
/// Clients key on `code`, not on the message, so codes never change once
/// shipped. Internal token-rejection reasons are collapsed into one
/// generic `INVALID_TOKEN` before they reach this type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ApiError {
    UserExists,
    InvalidCredentials,
    InvalidToken,
    UserNotFound,
    SameNewPassword,
    IncorrectOldPassword,
    RateLimitExceeded { retry_after_seconds: i64 },
    ValidationError(String),
    InternalServerError(String),
}

impl ApiError {
    fn status(&self) -> StatusCode {
        match self {
            ApiError::UserExists | ApiError::SameNewPassword => StatusCode::CONFLICT,
            ApiError::InvalidCredentials
            | ApiError::InvalidToken
            | ApiError::IncorrectOldPassword => StatusCode::UNAUTHORIZED,
            ApiError::UserNotFound => StatusCode::NOT_FOUND,
            ApiError::RateLimitExceeded { .. } => StatusCode::TOO_MANY_REQUESTS,
            ApiError::ValidationError(_) => StatusCode::BAD_REQUEST,
            ApiError::InternalServerError(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn code(&self) -> &'static str {
        match self {
            ApiError::UserExists => "USER_EXISTS",
            ApiError::InvalidCredentials => "INVALID_CREDENTIALS",
            ApiError::InvalidToken => "INVALID_TOKEN",
            ApiError::UserNotFound => "USER_NOT_FOUND",
            ApiError::SameNewPassword => "SAME_NEW_PASSWORD",
            ApiError::IncorrectOldPassword => "INCORRECT_OLD_PASSWORD",
            ApiError::RateLimitExceeded { .. } => "RATE_LIMIT_EXCEEDED",
            ApiError::ValidationError(_) => "VALIDATION_ERROR",
            ApiError::InternalServerError(_) => "INTERNAL_SERVER_ERROR",
        }
    }

    fn message(&self) -> String {
        match self {
            ApiError::UserExists => "A user with this username or email already exists".to_string(),
            ApiError::InvalidCredentials => "Invalid credentials".to_string(),
            ApiError::InvalidToken => "Invalid or expired token".to_string(),
            ApiError::UserNotFound => "User not found".to_string(),
            ApiError::SameNewPassword => {
                "New password must differ from the current password".to_string()
            }
            ApiError::IncorrectOldPassword => "Old password is incorrect".to_string(),
            ApiError::RateLimitExceeded {
                retry_after_seconds,
            } => format!("Rate limit exceeded, retry in {}s", retry_after_seconds),
            ApiError::ValidationError(msg) => msg.clone(),
            // Details stay in the logs, never in the response
            ApiError::InternalServerError(_) => "Internal server error".to_string(),
        }
    }
}

impl From<anyhow::Error> for ApiError {
    fn from(e: anyhow::Error) -> Self {
        Self::InternalServerError(e.to_string())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        if let ApiError::InternalServerError(detail) = &self {
            tracing::error!(detail, "Request failed with internal error");
        }

        let status = self.status();
        let body = Json(ApiResponseBody::new_error(
            status,
            self.code(),
            self.message(),
        ));

        match self {
            ApiError::RateLimitExceeded {
                retry_after_seconds,
            } => (
                status,
                [(header::RETRY_AFTER, retry_after_seconds.to_string())],
                body,
            )
                .into_response(),
            _ => (status, body).into_response(),
        }
    }
}

impl From<AuthError> for ApiError {
    fn from(err: AuthError) -> Self {
        match err {
            AuthError::UserAlreadyExists => ApiError::UserExists,
            AuthError::UserNotFound => ApiError::UserNotFound,
            AuthError::InvalidCredentials => ApiError::InvalidCredentials,
            // Rejection reasons are logged at the service layer; clients
            // only ever see the generic code
            AuthError::InvalidToken(_) | AuthError::Unauthorized => ApiError::InvalidToken,
            AuthError::SamePassword => ApiError::SameNewPassword,
            AuthError::IncorrectOldPassword => ApiError::IncorrectOldPassword,
            AuthError::RateLimited {
                retry_after_seconds,
            } => ApiError::RateLimitExceeded {
                retry_after_seconds,
            },
            AuthError::InvalidUserId(_)
            | AuthError::InvalidUsername(_)
            | AuthError::InvalidEmail(_) => ApiError::ValidationError(err.to_string()),
            AuthError::PasswordHashFailure(_)
            | AuthError::DatabaseError(_)
            | AuthError::Unknown(_) => ApiError::InternalServerError(err.to_string()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ApiResponseBody<T: Serialize + PartialEq> {
    status_code: u16,
    data: T,
}

impl<T: Serialize + PartialEq> ApiResponseBody<T> {
    pub fn new(status_code: StatusCode, data: T) -> Self {
        Self {
            status_code: status_code.as_u16(),
            data,
        }
    }
}

impl ApiResponseBody<ApiErrorData> {
    pub fn new_error(status_code: StatusCode, code: &'static str, message: String) -> Self {
        Self {
            status_code: status_code.as_u16(),
            data: ApiErrorData {
                code: code.to_string(),
                message,
            },
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ApiErrorData {
    pub code: String,
    pub message: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::user::errors::TokenRejection;

    #[test]
    fn test_token_rejection_reasons_collapse_to_one_code() {
        for rejection in [
            TokenRejection::Malformed,
            TokenRejection::BadSignature,
            TokenRejection::Expired,
            TokenRejection::WrongKind,
            TokenRejection::NotFound,
            TokenRejection::AlreadyUsed,
        ] {
            let err: ApiError = AuthError::InvalidToken(rejection).into();
            assert_eq!(err, ApiError::InvalidToken);
            assert_eq!(err.code(), "INVALID_TOKEN");
        }
    }

    #[test]
    fn test_internal_errors_do_not_leak_details() {
        let err: ApiError = AuthError::DatabaseError("connection refused".to_string()).into();
        assert!(!err.message().contains("connection refused"));
    }

    #[test]
    fn test_error_codes_are_stable() {
        assert_eq!(ApiError::UserExists.code(), "USER_EXISTS");
        assert_eq!(ApiError::UserExists.status(), StatusCode::CONFLICT);
        assert_eq!(ApiError::SameNewPassword.code(), "SAME_NEW_PASSWORD");
        assert_eq!(
            ApiError::RateLimitExceeded {
                retry_after_seconds: 42
            }
            .status(),
            StatusCode::TOO_MANY_REQUESTS
        );
    }
}
