use std::time::Duration as StdDuration;

use anyhow::{Context as _, bail};
use chrono::Duration;

use crate::domain::types::{
    DELIVERY_TIMEOUT_SECS, EMAIL_UPDATE_CODE_TTL_SECS, Environment, FlowSettings,
    PASSWORD_RESET_CODE_TTL_SECS, PASSWORD_RESET_CONTINUATION_TTL_SECS,
    REGISTRATION_CODE_TTL_SECS,
};

/// Upper bound for every configurable expiry window.
const MAX_WINDOW_SECS: i64 = 24 * 60 * 60;

/// Mail transport settings. Without `MAIL_API_URL` messages are only logged,
/// which is accepted in development only.
#[derive(Debug, Clone)]
pub enum MailerConfig {
    Log,
    Http {
        endpoint: String,
        api_key: String,
        from: String,
    },
}

/// OTP service configuration loaded from environment variables.
#[derive(Debug)]
pub struct OtpConfig {
    /// PostgreSQL connection URL.
    pub database_url: String,
    /// Cookie domain attribute (root domain, e.g. "example.com").
    pub cookie_domain: String,
    /// TCP port to listen on (default 3114). Env var: `OTP_PORT`.
    pub otp_port: u16,
    pub mailer: MailerConfig,
    pub settings: FlowSettings,
}

impl OtpConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> anyhow::Result<Self> {
        let required = |key: &str| lookup(key).with_context(|| format!("{key} is not set"));

        let environment = match lookup("APP_ENV") {
            Some(value) => value.parse()?,
            None => Environment::Production,
        };

        let mailer = match lookup("MAIL_API_URL") {
            Some(endpoint) => MailerConfig::Http {
                endpoint,
                api_key: required("MAIL_API_KEY")?,
                from: required("MAIL_FROM")?,
            },
            None if environment == Environment::Development => MailerConfig::Log,
            None => bail!("MAIL_API_URL is required outside development"),
        };

        let secs = |key: &str, default: i64| -> anyhow::Result<i64> {
            let Some(value) = lookup(key) else {
                return Ok(default);
            };
            let parsed: i64 = value
                .parse()
                .with_context(|| format!("{key} must be a number of seconds"))?;
            if parsed <= 0 {
                bail!("{key} must be positive");
            }
            Ok(parsed)
        };
        let window = |key: &str, default: i64| -> anyhow::Result<Duration> {
            let seconds = secs(key, default)?;
            if seconds > MAX_WINDOW_SECS {
                bail!("{key} must not exceed {MAX_WINDOW_SECS} seconds");
            }
            Duration::try_seconds(seconds).with_context(|| format!("{key} is out of range"))
        };

        let delivery_timeout = secs("MAIL_TIMEOUT_SECS", DELIVERY_TIMEOUT_SECS as i64)?;
        let settings = FlowSettings {
            environment,
            delivery_timeout: StdDuration::from_secs(delivery_timeout.unsigned_abs()),
            registration_code_ttl: window(
                "REGISTRATION_CODE_TTL_SECS",
                REGISTRATION_CODE_TTL_SECS,
            )?,
            email_update_code_ttl: window(
                "EMAIL_UPDATE_CODE_TTL_SECS",
                EMAIL_UPDATE_CODE_TTL_SECS,
            )?,
            password_reset_code_ttl: window(
                "PASSWORD_RESET_CODE_TTL_SECS",
                PASSWORD_RESET_CODE_TTL_SECS,
            )?,
            password_reset_continuation_ttl: window(
                "PASSWORD_RESET_CONTINUATION_TTL_SECS",
                PASSWORD_RESET_CONTINUATION_TTL_SECS,
            )?,
        };

        Ok(Self {
            database_url: required("DATABASE_URL")?,
            cookie_domain: required("COOKIE_DOMAIN")?,
            otp_port: match lookup("OTP_PORT") {
                Some(port) => port.parse().context("OTP_PORT must be a port number")?,
                None => 3114,
            },
            mailer,
            settings,
        })
    }
}
