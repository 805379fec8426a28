use std::fmt;
use std::str::FromStr;
use std::time::Duration as StdDuration;

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Which verification flow a passcode belongs to. The same subject can run
/// several flows at once; each gets its own record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Purpose {
    Registration,
    PasswordReset,
    EmailUpdate,
}

impl Purpose {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Registration => "registration",
            Self::PasswordReset => "password-reset",
            Self::EmailUpdate => "email-update",
        }
    }
}

impl fmt::Display for Purpose {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Purpose {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "registration" => Ok(Self::Registration),
            "password-reset" => Ok(Self::PasswordReset),
            "email-update" => Ok(Self::EmailUpdate),
            other => Err(anyhow::anyhow!("unknown passcode purpose: {other}")),
        }
    }
}

/// Where a record sits in its flow.
///
/// `CodeSent` holds the issuance token and accepts the numeric code.
/// `Verified` holds a rotated continuation token and accepts only the
/// follow-up action (password reset completion).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    CodeSent,
    Verified,
}

impl Stage {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::CodeSent => "code_sent",
            Self::Verified => "verified",
        }
    }
}

impl FromStr for Stage {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "code_sent" => Ok(Self::CodeSent),
            "verified" => Ok(Self::Verified),
            other => Err(anyhow::anyhow!("unknown passcode stage: {other}")),
        }
    }
}

/// Persisted state of one `(subject, purpose)` passcode flow.
#[derive(Debug, Clone)]
pub struct PasscodeRecord {
    pub id: Uuid,
    /// Email address the code was sent to. For email updates this is the new address.
    pub subject: String,
    pub purpose: Purpose,
    pub code_hash: String,
    pub token: String,
    pub stage: Stage,
    /// Account that requested the flow, when the flow is bound to a session.
    pub owner_id: Option<Uuid>,
    /// Issuances on the calendar day of `updated_at`.
    pub request_count: u32,
    /// Failed attempts since the last issuance.
    pub error_count: u32,
    pub revision: i64,
    pub last_failed_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl PasscodeRecord {
    /// Calendar-date equality (UTC) between `now` and the last issuance, not a rolling 24h.
    pub fn is_same_day(&self, now: DateTime<Utc>) -> bool {
        self.updated_at.date_naive() == now.date_naive()
    }

    /// Error count as it applies on `now`'s calendar day.
    pub fn failures_today(&self, now: DateTime<Utc>) -> u32 {
        match self.last_failed_at {
            Some(at) if at.date_naive() == now.date_naive() => self.error_count,
            _ => 0,
        }
    }

    /// Whether the previous failure, if any, happened on an earlier calendar day.
    pub fn last_failure_was_before_today(&self, now: DateTime<Utc>) -> bool {
        self.last_failed_at
            .is_some_and(|at| at.date_naive() != now.date_naive())
    }

    pub fn is_expired(&self, now: DateTime<Utc>, window: Duration) -> bool {
        now - self.updated_at > window
    }
}

/// Storefront account fields touched by the passcode flows.
#[derive(Debug, Clone)]
pub struct Account {
    pub id: Uuid,
    pub email: String,
    pub name: String,
    pub password_hash: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Canonical form of an email address for lookups and storage.
pub fn normalize_email(email: &str) -> String {
    email.trim().to_ascii_lowercase()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Environment {
    Development,
    Production,
}

impl FromStr for Environment {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "development" | "dev" => Ok(Self::Development),
            "production" | "prod" => Ok(Self::Production),
            other => Err(anyhow::anyhow!("unknown APP_ENV: {other}")),
        }
    }
}

/// Tunables shared by every passcode flow.
#[derive(Debug, Clone)]
pub struct FlowSettings {
    pub environment: Environment,
    /// Upper bound on a single mail dispatch.
    pub delivery_timeout: StdDuration,
    pub registration_code_ttl: Duration,
    pub email_update_code_ttl: Duration,
    pub password_reset_code_ttl: Duration,
    /// Window for completing a password reset after the code was confirmed.
    pub password_reset_continuation_ttl: Duration,
}

impl FlowSettings {
    /// How long a freshly issued code stays valid for `purpose`.
    pub fn code_ttl(&self, purpose: Purpose) -> Duration {
        match purpose {
            Purpose::Registration => self.registration_code_ttl,
            Purpose::PasswordReset => self.password_reset_code_ttl,
            Purpose::EmailUpdate => self.email_update_code_ttl,
        }
    }

    /// Plaintext codes go back to the caller only in development debug builds.
    pub fn exposes_dev_code(&self) -> bool {
        cfg!(debug_assertions) && self.environment == Environment::Development
    }
}

impl Default for FlowSettings {
    fn default() -> Self {
        Self {
            environment: Environment::Production,
            delivery_timeout: StdDuration::from_secs(DELIVERY_TIMEOUT_SECS),
            registration_code_ttl: Duration::seconds(REGISTRATION_CODE_TTL_SECS),
            email_update_code_ttl: Duration::seconds(EMAIL_UPDATE_CODE_TTL_SECS),
            password_reset_code_ttl: Duration::seconds(PASSWORD_RESET_CODE_TTL_SECS),
            password_reset_continuation_ttl: Duration::seconds(
                PASSWORD_RESET_CONTINUATION_TTL_SECS,
            ),
        }
    }
}

/// Numeric passcode length in digits.
pub const CODE_LEN: usize = 6;

/// Opaque token length in characters.
pub const TOKEN_LEN: usize = 30;

/// Issuances allowed per subject and purpose per calendar day.
pub const MAX_DAILY_REQUESTS: u32 = 3;

/// Failed attempts after which a record is locked until the next issuance.
pub const MAX_FAILED_ATTEMPTS: u32 = 5;

pub const REGISTRATION_CODE_TTL_SECS: i64 = 300;

pub const EMAIL_UPDATE_CODE_TTL_SECS: i64 = 300;

/// Password-reset confirmation window. Shorter than the other flows; the email
/// copy is rendered from this value so the advertised window always matches.
pub const PASSWORD_RESET_CODE_TTL_SECS: i64 = 60;

pub const PASSWORD_RESET_CONTINUATION_TTL_SECS: i64 = 600;

pub const DELIVERY_TIMEOUT_SECS: u64 = 10;
