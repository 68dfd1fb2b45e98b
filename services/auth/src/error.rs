use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};

/// Auth service domain error variants.
#[derive(Debug, thiserror::Error)]
pub enum AuthServiceError {
    #[error("{0}")]
    Validation(String),
    #[error("user not found")]
    UserNotFound,
    #[error("user inactive")]
    UserInactive,
    #[error("user not found or inactive")]
    UserNotFoundOrInactive,
    #[error("invalid or expired code")]
    InvalidOrExpiredCode,
    #[error("too many invalid attempts, request a new code")]
    TooManyAttempts,
    #[error("invalid session")]
    InvalidSession,
    #[error("session expired")]
    SessionExpired,
    #[error("email already registered")]
    EmailAlreadyRegistered,
    #[error("unauthorized")]
    Unauthorized,
    #[error("not configured: {0}")]
    NotConfigured(&'static str),
    #[error("internal error")]
    Storage(#[from] anyhow::Error),
}

impl AuthServiceError {
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Validation(_) => "VALIDATION_ERROR",
            Self::UserNotFound => "USER_NOT_FOUND",
            Self::UserInactive => "USER_INACTIVE",
            Self::UserNotFoundOrInactive => "USER_NOT_FOUND_OR_INACTIVE",
            Self::InvalidOrExpiredCode => "INVALID_OR_EXPIRED_CODE",
            Self::TooManyAttempts => "TOO_MANY_ATTEMPTS",
            Self::InvalidSession => "INVALID_SESSION",
            Self::SessionExpired => "SESSION_EXPIRED",
            Self::EmailAlreadyRegistered => "EMAIL_ALREADY_REGISTERED",
            Self::Unauthorized => "UNAUTHORIZED",
            Self::NotConfigured(_) => "NOT_CONFIGURED",
            Self::Storage(_) => "STORAGE_ERROR",
        }
    }
}

impl IntoResponse for AuthServiceError {
    fn into_response(self) -> Response {
        let status = match &self {
            Self::Validation(_) => StatusCode::BAD_REQUEST,
            Self::UserNotFound => StatusCode::NOT_FOUND,
            Self::UserInactive | Self::UserNotFoundOrInactive => StatusCode::FORBIDDEN,
            Self::InvalidOrExpiredCode
            | Self::InvalidSession
            | Self::SessionExpired
            | Self::Unauthorized => StatusCode::UNAUTHORIZED,
            Self::TooManyAttempts => StatusCode::TOO_MANY_REQUESTS,
            Self::EmailAlreadyRegistered => StatusCode::CONFLICT,
            Self::NotConfigured(_) => StatusCode::NOT_IMPLEMENTED,
            Self::Storage(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };
        // TraceLayer already records method/uri/status for every request, so only
        // storage failures are logged here, with the full anyhow chain. The body
        // stays opaque.
        if let Self::Storage(ref e) = self {
            tracing::error!(error = ?e, kind = "STORAGE_ERROR", "storage error");
        }
        let body = serde_json::json!({
            "kind": self.kind(),
            "message": self.to_string(),
        });
        (status, axum::Json(body)).into_response()
    }
}
