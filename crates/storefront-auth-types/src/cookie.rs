//! Cookie carrying a passcode token across a page navigation.
//!
//! Registration and password reset hand the token to the browser at issuance and
//! read it back at the verify step. The cookie is scoped to the flow's path and
//! lives no longer than the flow's validity window.

use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use time::Duration;

/// Cookie name for the passcode token.
pub const OTP_TOKEN_COOKIE: &str = "storefront_otp_token";

/// Store `token` in the passcode-token cookie.
///
/// ```
/// use axum_extra::extract::cookie::CookieJar;
/// use storefront_auth_types::cookie::{set_otp_token_cookie, OTP_TOKEN_COOKIE};
///
/// let jar = CookieJar::new();
/// let jar = set_otp_token_cookie(jar, "tok".to_string(), "example.com".to_string(), "/auth/registration", 300);
/// let cookie = jar.get(OTP_TOKEN_COOKIE).unwrap();
/// assert_eq!(cookie.value(), "tok");
/// assert_eq!(cookie.path(), Some("/auth/registration"));
/// assert_eq!(cookie.domain(), Some("example.com"));
/// assert_eq!(cookie.max_age(), Some(time::Duration::seconds(300)));
/// assert!(cookie.http_only().unwrap_or(false));
/// assert!(cookie.secure().unwrap_or(false));
/// ```
pub fn set_otp_token_cookie(
    jar: CookieJar,
    token: String,
    domain: String,
    path: &'static str,
    max_age_secs: i64,
) -> CookieJar {
    let cookie = Cookie::build((OTP_TOKEN_COOKIE, token))
        .path(path)
        .domain(domain)
        .max_age(Duration::seconds(max_age_secs))
        .http_only(true)
        .secure(true)
        .same_site(SameSite::Lax)
        .build();
    jar.add(cookie)
}

/// Expire the passcode-token cookie once its flow has finished.
///
/// ```
/// use axum_extra::extract::cookie::CookieJar;
/// use storefront_auth_types::cookie::{clear_otp_token_cookie, set_otp_token_cookie, OTP_TOKEN_COOKIE};
///
/// let jar = set_otp_token_cookie(CookieJar::new(), "tok".to_string(), "example.com".to_string(), "/auth/password-reset", 60);
/// let jar = clear_otp_token_cookie(jar, "example.com".to_string(), "/auth/password-reset");
/// let cookie = jar.get(OTP_TOKEN_COOKIE).unwrap();
/// assert_eq!(cookie.value(), "");
/// assert_eq!(cookie.max_age(), Some(time::Duration::ZERO));
/// ```
pub fn clear_otp_token_cookie(jar: CookieJar, domain: String, path: &'static str) -> CookieJar {
    let cookie = Cookie::build((OTP_TOKEN_COOKIE, ""))
        .path(path)
        .domain(domain)
        .max_age(Duration::ZERO)
        .http_only(true)
        .secure(true)
        .same_site(SameSite::Lax)
        .build();
    jar.add(cookie)
}

/// Read the passcode token back from the jar, if the browser sent one.
pub fn otp_token_from(jar: &CookieJar) -> Option<String> {
    jar.get(OTP_TOKEN_COOKIE)
        .map(|c| c.value().to_owned())
        .filter(|v| !v.is_empty())
}
