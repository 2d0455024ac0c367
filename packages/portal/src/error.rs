use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use common::storage::StorageError;
use gateway::GatewayError;
use sea_orm::DbErr;
use serde::Serialize;

/// Structured error response returned by all endpoints on failure.
#[derive(Serialize, utoipa::ToSchema)]
pub struct ErrorBody {
    /// Machine-readable error code. One of: `VALIDATION_ERROR`, `CONTENT_BLOCKED`,
    /// `TOKEN_MISSING`, `TOKEN_INVALID`, `INVALID_CREDENTIALS`, `PERMISSION_DENIED`,
    /// `NOT_FOUND`, `USERNAME_TAKEN`, `PROVIDER_BUSY`, `PROVIDER_QUOTA_EXCEEDED`,
    /// `PROVIDER_ERROR`, `INTERNAL_ERROR`.
    #[schema(example = "CONTENT_BLOCKED")]
    pub code: &'static str,
    /// Human-readable error description.
    #[schema(example = "Content blocked by ethics policy: contains banned term 'sangre'")]
    pub message: String,
}

/// Application-level error type.
#[derive(Debug)]
pub enum AppError {
    Validation(String),
    /// Moderation rejected the input. The message is shown verbatim.
    ContentBlocked(String),
    TokenMissing,
    TokenInvalid,
    InvalidCredentials,
    PermissionDenied,
    /// Role may not request this kind of content.
    Forbidden(String),
    NotFound(String),
    UsernameTaken,
    ProviderBusy,
    ProviderQuotaExceeded,
    Provider(String),
    Internal(String),
}

impl AppError {
    fn status_and_body(self) -> (StatusCode, ErrorBody) {
        match self {
            AppError::Validation(msg) => (
                StatusCode::BAD_REQUEST,
                ErrorBody {
                    code: "VALIDATION_ERROR",
                    message: msg,
                },
            ),
            AppError::ContentBlocked(reason) => (
                StatusCode::BAD_REQUEST,
                ErrorBody {
                    code: "CONTENT_BLOCKED",
                    message: reason,
                },
            ),
            AppError::TokenMissing => (
                StatusCode::UNAUTHORIZED,
                ErrorBody {
                    code: "TOKEN_MISSING",
                    message: "Authentication required".into(),
                },
            ),
            AppError::TokenInvalid => (
                StatusCode::UNAUTHORIZED,
                ErrorBody {
                    code: "TOKEN_INVALID",
                    message: "Invalid or expired token".into(),
                },
            ),
            AppError::InvalidCredentials => (
                StatusCode::UNAUTHORIZED,
                ErrorBody {
                    code: "INVALID_CREDENTIALS",
                    message: "Invalid username or password".into(),
                },
            ),
            AppError::PermissionDenied => (
                StatusCode::FORBIDDEN,
                ErrorBody {
                    code: "PERMISSION_DENIED",
                    message: "Insufficient permissions".into(),
                },
            ),
            AppError::Forbidden(msg) => (
                StatusCode::FORBIDDEN,
                ErrorBody {
                    code: "PERMISSION_DENIED",
                    message: msg,
                },
            ),
            AppError::NotFound(msg) => (
                StatusCode::NOT_FOUND,
                ErrorBody {
                    code: "NOT_FOUND",
                    message: msg,
                },
            ),
            AppError::UsernameTaken => (
                StatusCode::CONFLICT,
                ErrorBody {
                    code: "USERNAME_TAKEN",
                    message: "Username is already taken".into(),
                },
            ),
            AppError::ProviderBusy => (
                StatusCode::INTERNAL_SERVER_ERROR,
                ErrorBody {
                    code: "PROVIDER_BUSY",
                    message: "The generation service is busy, please try again in a moment"
                        .into(),
                },
            ),
            AppError::ProviderQuotaExceeded => (
                StatusCode::INTERNAL_SERVER_ERROR,
                ErrorBody {
                    code: "PROVIDER_QUOTA_EXCEEDED",
                    message: "The provider's usage quota is exhausted, please try again later"
                        .into(),
                },
            ),
            AppError::Provider(msg) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                ErrorBody {
                    code: "PROVIDER_ERROR",
                    message: msg,
                },
            ),
            AppError::Internal(detail) => {
                tracing::error!("Internal error: {}", detail);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    ErrorBody {
                        code: "INTERNAL_ERROR",
                        message: "An unexpected error occurred".into(),
                    },
                )
            }
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, body) = self.status_and_body();
        (status, Json(body)).into_response()
    }
}

impl From<DbErr> for AppError {
    fn from(err: DbErr) -> Self {
        AppError::Internal(err.to_string())
    }
}

impl From<GatewayError> for AppError {
    fn from(err: GatewayError) -> Self {
        match err {
            GatewayError::Forbidden { .. } => AppError::Forbidden(err.to_string()),
            GatewayError::Blocked(verdict) => AppError::ContentBlocked(verdict.reason),
            GatewayError::QuotaExceeded => AppError::ProviderQuotaExceeded,
            GatewayError::Busy { .. } => AppError::ProviderBusy,
            GatewayError::Provider(msg) => AppError::Provider(msg),
            GatewayError::Cancelled | GatewayError::Config(_) => {
                AppError::Internal(err.to_string())
            }
        }
    }
}

impl From<StorageError> for AppError {
    fn from(err: StorageError) -> Self {
        match err {
            StorageError::NotFound(_) | StorageError::InvalidFilename(_) => {
                AppError::NotFound("Image not found".into())
            }
            other => AppError::Internal(other.to_string()),
        }
    }
}
