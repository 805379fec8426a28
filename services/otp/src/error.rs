use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};

/// OTP service error variants. Every variant except `Internal` is a terminal,
/// user-facing outcome.
#[derive(Debug, thiserror::Error)]
pub enum OtpServiceError {
    #[error("an account with this email already exists")]
    AlreadyRegistered,
    #[error("this email is already used by another account")]
    EmailInUse,
    #[error("the new email is the same as the current one")]
    SameAsCurrent,
    #[error("account not found")]
    AccountNotFound,
    #[error("the code could not be delivered, please try again")]
    DeliveryFailed,
    #[error("no pending code, request a new code")]
    RecordNotFound,
    #[error("this code was not requested by the current account")]
    Unauthorized,
    #[error("too many codes requested today, try again tomorrow")]
    RateLimitExceeded,
    #[error("too many failed attempts, try again tomorrow")]
    TooManyFailedAttempts,
    #[error("invalid token")]
    InvalidToken,
    #[error("the code has expired, request a new code")]
    Expired,
    #[error("invalid code")]
    InvalidCode,
    #[error("internal error")]
    Internal(#[from] anyhow::Error),
}

impl OtpServiceError {
    pub fn kind(&self) -> &'static str {
        match self {
            Self::AlreadyRegistered => "ALREADY_REGISTERED",
            Self::EmailInUse => "EMAIL_IN_USE",
            Self::SameAsCurrent => "SAME_AS_CURRENT",
            Self::AccountNotFound => "ACCOUNT_NOT_FOUND",
            Self::DeliveryFailed => "DELIVERY_FAILED",
            Self::RecordNotFound => "RECORD_NOT_FOUND",
            Self::Unauthorized => "UNAUTHORIZED",
            Self::RateLimitExceeded => "RATE_LIMIT_EXCEEDED",
            Self::TooManyFailedAttempts => "TOO_MANY_FAILED_ATTEMPTS",
            Self::InvalidToken => "INVALID_TOKEN",
            Self::Expired => "EXPIRED",
            Self::InvalidCode => "INVALID_CODE",
            Self::Internal(_) => "INTERNAL",
        }
    }
}

impl IntoResponse for OtpServiceError {
    fn into_response(self) -> Response {
        let status = match &self {
            Self::AlreadyRegistered | Self::EmailInUse => StatusCode::CONFLICT,
            Self::SameAsCurrent => StatusCode::BAD_REQUEST,
            Self::AccountNotFound | Self::RecordNotFound => StatusCode::NOT_FOUND,
            Self::DeliveryFailed => StatusCode::BAD_GATEWAY,
            Self::Unauthorized => StatusCode::FORBIDDEN,
            Self::RateLimitExceeded | Self::TooManyFailedAttempts => {
                StatusCode::TOO_MANY_REQUESTS
            }
            Self::InvalidToken | Self::InvalidCode => StatusCode::UNAUTHORIZED,
            Self::Expired => StatusCode::GONE,
            Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };
        // 4xx outcomes are logged where they happen with flow context; only the
        // anyhow chain of a 500 needs to surface here.
        if let Self::Internal(ref e) = self {
            tracing::error!(error = %format!("{e:#}"), kind = "INTERNAL", "internal error");
        }
        let body = serde_json::json!({
            "kind": self.kind(),
            "message": self.to_string(),
        });
        (status, axum::Json(body)).into_response()
    }
}
