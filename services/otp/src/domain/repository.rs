#![allow(async_fn_in_trait)]

use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::domain::types::{Account, PasscodeRecord, Purpose};
use crate::error::OtpServiceError;

/// Store for passcode records, keyed by `(subject, purpose)`.
pub trait PasscodeRepository: Send + Sync {
    async fn find(
        &self,
        subject: &str,
        purpose: Purpose,
    ) -> Result<Option<PasscodeRecord>, OtpServiceError>;

    /// Insert a new record. Returns `false` without writing if a record for the
    /// same `(subject, purpose)` already exists.
    async fn insert(&self, record: &PasscodeRecord) -> Result<bool, OtpServiceError>;

    /// Overwrite code, token, owner, stage and counters of an existing record if its
    /// revision is still `expected_revision`. Bumps the revision. Returns `false` on
    /// a lost race.
    async fn reissue(
        &self,
        record: &PasscodeRecord,
        expected_revision: i64,
    ) -> Result<bool, OtpServiceError>;

    /// Write the failure counter and `last_failed_at` if the record is still at
    /// `expected_revision`, leaving it at `expected_revision + 1`. Returns `false`
    /// on a lost race. Every verification attempt claims its slot through this
    /// before the code is compared.
    async fn set_failures(
        &self,
        id: Uuid,
        expected_revision: i64,
        error_count: u32,
        last_failed_at: Option<DateTime<Utc>>,
    ) -> Result<bool, OtpServiceError>;

    /// Swap `current_token` for `new_token`, move the record to `Stage::Verified`,
    /// clear the error counter and restart its clock. Returns `false` if the token
    /// already changed.
    async fn rotate_token(
        &self,
        id: Uuid,
        current_token: &str,
        new_token: &str,
        now: DateTime<Utc>,
    ) -> Result<bool, OtpServiceError>;

    /// Delete the record if it still carries `token`. Returns whether a row was removed.
    async fn consume(&self, id: Uuid, token: &str) -> Result<bool, OtpServiceError>;

    async fn delete(&self, id: Uuid) -> Result<(), OtpServiceError>;

    /// Give back one issuance (`request_count - 1`, floored at zero).
    async fn release_request(&self, id: Uuid) -> Result<(), OtpServiceError>;
}

/// Account store the flows consult for uniqueness and update on success.
pub trait AccountRepository: Send + Sync {
    async fn find_by_email(&self, email: &str) -> Result<Option<Account>, OtpServiceError>;

    async fn find_by_id(&self, id: Uuid) -> Result<Option<Account>, OtpServiceError>;

    /// Fails with `AlreadyRegistered` if the email is taken.
    async fn create(&self, account: &Account) -> Result<(), OtpServiceError>;

    /// Fails with `EmailInUse` if another account owns `email`.
    async fn update_email(&self, id: Uuid, email: &str) -> Result<(), OtpServiceError>;

    async fn update_password(&self, id: Uuid, password_hash: &str)
    -> Result<(), OtpServiceError>;
}

/// Outbound email delivery. Transport and retries are the implementor's concern.
pub trait Mailer: Send + Sync {
    async fn send(&self, to: &str, subject: &str, html_body: &str) -> anyhow::Result<()>;
}
