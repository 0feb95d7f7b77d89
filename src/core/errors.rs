//! Application error type and its HTTP mapping.

use axum::{
    extract::rejection::{JsonRejection, PathRejection, QueryRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

use crate::storage::StorageError;

/// Every failure a request can end in.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("{0}")]
    Validation(String),

    #[error("{0}")]
    BadRequest(String),

    #[error("{0}")]
    Unauthorized(String),

    #[error("Invalid token")]
    InvalidToken,

    #[error("Token expired")]
    TokenExpired,

    #[error("{0}")]
    Forbidden(String),

    #[error("{0}")]
    NotFound(String),

    #[error("{0}")]
    Conflict(String),

    #[error("Too many requests, please try again later")]
    RateLimited { retry_after: u64 },

    #[error("Payment failed: {0}")]
    Payment(String),

    #[error("Upstream service error: {0}")]
    Upstream(String),

    #[error("{0}")]
    Unavailable(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl AppError {
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    pub fn not_found(what: &str) -> Self {
        Self::NotFound(format!("{what} not found"))
    }

    pub fn forbidden(message: impl Into<String>) -> Self {
        Self::Forbidden(message.into())
    }

    /// HTTP status for this error.
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::Validation(_) | Self::BadRequest(_) | Self::Payment(_) => {
                StatusCode::BAD_REQUEST
            }
            Self::Unauthorized(_) | Self::InvalidToken | Self::TokenExpired => {
                StatusCode::UNAUTHORIZED
            }
            Self::Forbidden(_) => StatusCode::FORBIDDEN,
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::Conflict(_) => StatusCode::CONFLICT,
            Self::RateLimited { .. } => StatusCode::TOO_MANY_REQUESTS,
            Self::Upstream(_) => StatusCode::BAD_GATEWAY,
            Self::Unavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
            Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Error category reported to clients in the `type` field.
    pub fn error_type(&self) -> &'static str {
        let status = self.status_code();
        match status {
            StatusCode::BAD_REQUEST => "ValidationError",
            StatusCode::UNAUTHORIZED => "AuthenticationError",
            StatusCode::FORBIDDEN => "AuthorizationError",
            StatusCode::NOT_FOUND => "NotFoundError",
            StatusCode::CONFLICT => "ConflictError",
            StatusCode::TOO_MANY_REQUESTS => "RateLimitError",
            _ => "ServerError",
        }
    }

    /// Message safe to show to clients. Internal details stay in the logs.
    pub fn public_message(&self) -> String {
        match self {
            Self::Internal(_) => "Server Error".to_string(),
            Self::Upstream(_) => "Upstream service unavailable".to_string(),
            other => other.to_string(),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        if status.is_server_error() {
            tracing::error!(status = status.as_u16(), "request failed: {}", self);
        } else {
            tracing::debug!(status = status.as_u16(), "request rejected: {}", self);
        }

        let mut body = json!({
            "success": false,
            "message": self.public_message(),
            "type": self.error_type(),
        });
        if let Self::RateLimited { retry_after } = self {
            body["retryAfter"] = json!(retry_after);
        }

        (status, Json(body)).into_response()
    }
}

impl From<StorageError> for AppError {
    fn from(err: StorageError) -> Self {
        match err {
            StorageError::Duplicate { field, .. } => {
                AppError::Conflict(format!("{field} already exists"))
            }
            StorageError::NotFound { collection, .. } => {
                AppError::NotFound(format!("{} not found", singular(&collection)))
            }
            StorageError::Unavailable(msg) => {
                tracing::error!("database unavailable: {}", msg);
                AppError::Unavailable("Database connection error".to_string())
            }
            StorageError::Serialization(msg) | StorageError::Backend(msg) => {
                AppError::Internal(msg)
            }
        }
    }
}

impl From<jsonwebtoken::errors::Error> for AppError {
    fn from(err: jsonwebtoken::errors::Error) -> Self {
        match err.kind() {
            jsonwebtoken::errors::ErrorKind::ExpiredSignature => AppError::TokenExpired,
            _ => AppError::InvalidToken,
        }
    }
}

impl From<JsonRejection> for AppError {
    fn from(rejection: JsonRejection) -> Self {
        AppError::Validation(rejection.body_text())
    }
}

impl From<QueryRejection> for AppError {
    fn from(rejection: QueryRejection) -> Self {
        AppError::Validation(rejection.body_text())
    }
}

impl From<PathRejection> for AppError {
    fn from(rejection: PathRejection) -> Self {
        AppError::NotFound(format!("Resource not found: {}", rejection.body_text()))
    }
}

impl From<reqwest::Error> for AppError {
    fn from(err: reqwest::Error) -> Self {
        AppError::Upstream(err.to_string())
    }
}

fn singular(collection: &str) -> String {
    let name = collection.strip_suffix('s').unwrap_or(collection);
    let mut chars = name.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}
