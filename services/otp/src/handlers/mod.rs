pub mod email_update;
pub mod health;
pub mod password_reset;
pub mod registration;

use axum_extra::extract::CookieJar;
use chrono::{DateTime, Utc};
use serde::Serialize;

use storefront_auth_types::cookie::otp_token_from;
use storefront_core::serde::to_rfc3339_ms;

use crate::error::OtpServiceError;
use crate::usecase::flow::{Continuation, Issued};

/// Body of every issuance response.
#[derive(Serialize)]
pub struct IssuedResponse {
    pub token: String,
    #[serde(serialize_with = "to_rfc3339_ms")]
    pub expires_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dev_code: Option<String>,
}

impl From<Issued> for IssuedResponse {
    fn from(issued: Issued) -> Self {
        Self {
            token: issued.token,
            expires_at: issued.expires_at,
            dev_code: issued.dev_code,
        }
    }
}

#[derive(Serialize)]
pub struct ContinuationResponse {
    pub token: String,
    #[serde(serialize_with = "to_rfc3339_ms")]
    pub expires_at: DateTime<Utc>,
}

impl From<Continuation> for ContinuationResponse {
    fn from(continuation: Continuation) -> Self {
        Self {
            token: continuation.token,
            expires_at: continuation.expires_at,
        }
    }
}

/// Token from the request body, falling back to the flow cookie.
fn resolve_token(body: Option<String>, jar: &CookieJar) -> Result<String, OtpServiceError> {
    body.filter(|t| !t.is_empty())
        .or_else(|| otp_token_from(jar))
        .ok_or(OtpServiceError::InvalidToken)
}
