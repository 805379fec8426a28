//! Gateway-injected identity header extractor.

use axum::extract::FromRequestParts;
use http::StatusCode;
use http::request::Parts;
use uuid::Uuid;

/// Header the gateway sets to the authenticated account id.
pub const X_STOREFRONT_ACCOUNT_ID: &str = "x-storefront-account-id";

/// Account identity injected by the gateway via `x-storefront-account-id`.
///
/// Returns 401 if the header is absent or is not a UUID.
#[derive(Debug, Clone, Copy)]
pub struct IdentityHeaders {
    pub account_id: Uuid,
}

impl<S> FromRequestParts<S> for IdentityHeaders
where
    S: Send + Sync,
{
    type Rejection = StatusCode;

    // axum-core 0.5 declares `fn -> impl Future + Send`; read the header up front and
    // return a 'static future so no borrow of `parts` is captured.
    fn from_request_parts(
        parts: &mut Parts,
        _state: &S,
    ) -> impl std::future::Future<Output = Result<Self, Self::Rejection>> + Send {
        let account_id = parts
            .headers
            .get(X_STOREFRONT_ACCOUNT_ID)
            .and_then(|v| v.to_str().ok())
            .and_then(|s| s.parse::<Uuid>().ok());

        async move {
            let account_id = account_id.ok_or(StatusCode::UNAUTHORIZED)?;
            Ok(Self { account_id })
        }
    }
}
