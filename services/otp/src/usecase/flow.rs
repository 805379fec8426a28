//! The passcode state machine shared by every verification flow.
//!
//! A flow is issued (code mailed, token returned), then verified with the code
//! and the token, and finally consumed or rotated by the purpose-specific use
//! case. Counters live on the record and change only through revision
//! compare-and-swap writes, so concurrent requests cannot skip a check.

use chrono::{DateTime, Duration, Utc};
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::domain::message::PasscodeMessage;
use crate::domain::repository::{Mailer, PasscodeRepository};
use crate::domain::types::{
    FlowSettings, MAX_FAILED_ATTEMPTS, PasscodeRecord, Purpose, Stage,
};
use crate::error::OtpServiceError;
use crate::usecase::guard;
use crate::usecase::passcode::{Passcode, generate_token, hash_secret, verify_secret};

/// Attempts at winning a compare-and-swap on a record before giving up.
const MAX_WRITE_ATTEMPTS: usize = 3;

/// Result of a successful issuance.
#[derive(Debug)]
pub struct Issued {
    /// Must be echoed back on verify.
    pub token: String,
    pub expires_at: DateTime<Utc>,
    /// Plaintext code, development builds only.
    pub dev_code: Option<String>,
}

/// Continuation capability handed out after a code was confirmed.
#[derive(Debug)]
pub struct Continuation {
    pub token: String,
    pub expires_at: DateTime<Utc>,
}

enum Persisted {
    Created(Uuid),
    Reissued(Uuid),
}

pub struct PasscodeFlow<P, M>
where
    P: PasscodeRepository,
    M: Mailer,
{
    pub passcodes: P,
    pub mailer: M,
    pub settings: FlowSettings,
}

impl<P, M> PasscodeFlow<P, M>
where
    P: PasscodeRepository,
    M: Mailer,
{
    /// Issue a fresh code for `(subject, purpose)` and mail it to `subject`.
    ///
    /// A failed or timed-out delivery undoes the quota consumption and returns
    /// `DeliveryFailed`.
    pub async fn issue(
        &self,
        purpose: Purpose,
        subject: &str,
        owner_id: Option<Uuid>,
    ) -> Result<Issued, OtpServiceError> {
        let now = Utc::now();
        let passcode = Passcode::generate();
        let persisted = self.persist(purpose, subject, owner_id, &passcode, now).await?;

        let ttl = self.settings.code_ttl(purpose);
        let message = PasscodeMessage::render(purpose, &passcode.code, ttl);
        let delivery = tokio::time::timeout(
            self.settings.delivery_timeout,
            self.mailer.send(subject, &message.subject, &message.html_body),
        )
        .await;
        let failure = match delivery {
            Ok(Ok(())) => None,
            Ok(Err(e)) => Some(format!("{e:#}")),
            Err(_) => Some("timed out".to_owned()),
        };
        if let Some(reason) = failure {
            warn!(%purpose, error = %reason, "passcode delivery failed, rolling back");
            self.roll_back(persisted).await?;
            return Err(OtpServiceError::DeliveryFailed);
        }

        info!(%purpose, "passcode issued");
        Ok(Issued {
            token: passcode.token,
            expires_at: now + ttl,
            dev_code: self.settings.exposes_dev_code().then_some(passcode.code),
        })
    }

    /// Check `code` and `token` against the live record. On success the record is
    /// returned untouched; the caller decides whether to consume or rotate it.
    ///
    /// The attempt is counted before the code is compared, through a revision
    /// compare-and-swap, so concurrent guesses can never evaluate more than
    /// `MAX_FAILED_ATTEMPTS` codes. A correct code gives its slot back.
    pub async fn verify(
        &self,
        purpose: Purpose,
        subject: &str,
        code: &str,
        token: &str,
        owner_id: Option<Uuid>,
    ) -> Result<PasscodeRecord, OtpServiceError> {
        let now = Utc::now();
        // Every lost race is caused by another attempt claiming a slot, and there
        // are at most MAX_FAILED_ATTEMPTS of those before `load` locks us out.
        for attempt in 0..=MAX_FAILED_ATTEMPTS {
            let record = self.load(purpose, subject, owner_id).await?;
            if attempt == 0 {
                self.match_token(&record, token, Stage::CodeSent, now).await?;
            } else if record.stage != Stage::CodeSent || !tokens_equal(&record.token, token) {
                debug!(%purpose, "passcode reissued during verification");
                return Err(OtpServiceError::InvalidToken);
            }

            if record.is_expired(now, self.settings.code_ttl(purpose)) {
                debug!(%purpose, "passcode expired");
                return Err(OtpServiceError::Expired);
            }

            let error_count = if record.last_failure_was_before_today(now) {
                1
            } else {
                record.error_count + 1
            };
            let claimed = self
                .passcodes
                .set_failures(record.id, record.revision, error_count, Some(now))
                .await?;
            if !claimed {
                debug!(%purpose, "passcode attempt lost a race, retrying");
                continue;
            }

            if !verify_secret(code, &record.code_hash)? {
                info!(%purpose, error_count, "passcode mismatch");
                return Err(OtpServiceError::InvalidCode);
            }

            // A lost race here means another attempt failed meanwhile; the slot
            // then stays counted.
            self.passcodes
                .set_failures(
                    record.id,
                    record.revision + 1,
                    record.error_count,
                    record.last_failed_at,
                )
                .await?;
            info!(%purpose, "passcode verified");
            return Ok(record);
        }
        Err(anyhow::anyhow!("{purpose} passcode attempts kept racing").into())
    }

    /// Token-only check for the step that follows a confirmed code. Runs the same
    /// ownership, lockout, token and expiry checks as `verify`, against the
    /// rotated token and `window`.
    pub async fn redeem(
        &self,
        purpose: Purpose,
        subject: &str,
        token: &str,
        owner_id: Option<Uuid>,
        window: Duration,
    ) -> Result<PasscodeRecord, OtpServiceError> {
        let now = Utc::now();
        let record = self.load(purpose, subject, owner_id).await?;
        self.match_token(&record, token, Stage::Verified, now).await?;
        if record.is_expired(now, window) {
            debug!(%purpose, "continuation token expired");
            return Err(OtpServiceError::Expired);
        }
        Ok(record)
    }

    /// Replace the record's token with a continuation token valid for `window`.
    pub async fn rotate(
        &self,
        record: &PasscodeRecord,
        window: Duration,
    ) -> Result<Continuation, OtpServiceError> {
        let now = Utc::now();
        let token = generate_token();
        if !self
            .passcodes
            .rotate_token(record.id, &record.token, &token, now)
            .await?
        {
            return Err(OtpServiceError::InvalidToken);
        }
        Ok(Continuation {
            token,
            expires_at: now + window,
        })
    }

    /// Delete a verified record. Only one caller can win; the others see
    /// `RecordNotFound`.
    pub async fn consume(&self, record: &PasscodeRecord) -> Result<(), OtpServiceError> {
        if self.passcodes.consume(record.id, &record.token).await? {
            Ok(())
        } else {
            Err(OtpServiceError::RecordNotFound)
        }
    }

    async fn persist(
        &self,
        purpose: Purpose,
        subject: &str,
        owner_id: Option<Uuid>,
        passcode: &Passcode,
        now: DateTime<Utc>,
    ) -> Result<Persisted, OtpServiceError> {
        // Hashed once, and only after the guard let the request through.
        let mut code_hash: Option<String> = None;
        for _ in 0..MAX_WRITE_ATTEMPTS {
            let existing = self.passcodes.find(subject, purpose).await?;
            if let Some(existing) = &existing {
                if let Err(e) = guard::check_limit(
                    existing.is_same_day(now),
                    existing.failures_today(now),
                    existing.request_count,
                ) {
                    info!(
                        %purpose,
                        request_count = existing.request_count,
                        error_count = existing.error_count,
                        "passcode issuance refused"
                    );
                    return Err(e);
                }
            }
            let hash = match &code_hash {
                Some(hash) => hash.clone(),
                None => hash_secret(&passcode.code)?,
            };
            code_hash = Some(hash.clone());

            match existing {
                None => {
                    let record = PasscodeRecord {
                        id: Uuid::now_v7(),
                        subject: subject.to_owned(),
                        purpose,
                        code_hash: hash,
                        token: passcode.token.clone(),
                        stage: Stage::CodeSent,
                        owner_id,
                        request_count: 1,
                        error_count: 0,
                        revision: 0,
                        last_failed_at: None,
                        created_at: now,
                        updated_at: now,
                    };
                    if self.passcodes.insert(&record).await? {
                        return Ok(Persisted::Created(record.id));
                    }
                }
                Some(existing) => {
                    let same_day = existing.is_same_day(now);
                    let expected_revision = existing.revision;
                    let record = PasscodeRecord {
                        code_hash: hash,
                        token: passcode.token.clone(),
                        stage: Stage::CodeSent,
                        owner_id,
                        request_count: if same_day {
                            existing.request_count + 1
                        } else {
                            1
                        },
                        error_count: 0,
                        revision: expected_revision + 1,
                        last_failed_at: None,
                        updated_at: now,
                        ..existing
                    };
                    if self.passcodes.reissue(&record, expected_revision).await? {
                        return Ok(Persisted::Reissued(record.id));
                    }
                }
            }
            debug!(%purpose, "passcode record changed concurrently, retrying");
        }
        Err(anyhow::anyhow!("{purpose} passcode record kept changing under concurrent writes").into())
    }

    async fn roll_back(&self, persisted: Persisted) -> Result<(), OtpServiceError> {
        match persisted {
            Persisted::Created(id) => self.passcodes.delete(id).await,
            Persisted::Reissued(id) => self.passcodes.release_request(id).await,
        }
    }

    async fn load(
        &self,
        purpose: Purpose,
        subject: &str,
        owner_id: Option<Uuid>,
    ) -> Result<PasscodeRecord, OtpServiceError> {
        let record = self
            .passcodes
            .find(subject, purpose)
            .await?
            .ok_or(OtpServiceError::RecordNotFound)?;
        if record.owner_id.is_some() && record.owner_id != owner_id {
            warn!(%purpose, "passcode presented by a different account");
            return Err(OtpServiceError::Unauthorized);
        }
        guard::check_lockout(record.error_count)?;
        Ok(record)
    }

    /// A mismatched token is treated as forgery or replay: the record is locked
    /// at once instead of counting one failure.
    async fn match_token(
        &self,
        record: &PasscodeRecord,
        token: &str,
        stage: Stage,
        now: DateTime<Utc>,
    ) -> Result<(), OtpServiceError> {
        if record.stage == stage && tokens_equal(&record.token, token) {
            return Ok(());
        }
        warn!(purpose = %record.purpose, "passcode token mismatch, locking record");
        self.lock_out(record, now).await?;
        Err(OtpServiceError::InvalidToken)
    }

    /// Raise the error counter to the ceiling. Retries lost races as long as the
    /// record still carries the token it had when the mismatch was seen; a
    /// reissued code is left alone.
    async fn lock_out(
        &self,
        record: &PasscodeRecord,
        now: DateTime<Utc>,
    ) -> Result<(), OtpServiceError> {
        let mut revision = record.revision;
        for _ in 0..MAX_WRITE_ATTEMPTS {
            if self
                .passcodes
                .set_failures(record.id, revision, MAX_FAILED_ATTEMPTS, Some(now))
                .await?
            {
                return Ok(());
            }
            match self.passcodes.find(&record.subject, record.purpose).await? {
                Some(current)
                    if current.id == record.id
                        && current.token == record.token
                        && current.error_count < MAX_FAILED_ATTEMPTS =>
                {
                    revision = current.revision;
                }
                _ => return Ok(()),
            }
        }
        warn!(purpose = %record.purpose, "passcode lockout lost every race");
        Ok(())
    }
}

/// Exact equality without an early exit on the first differing byte.
fn tokens_equal(expected: &str, presented: &str) -> bool {
    let (a, b) = (expected.as_bytes(), presented.as_bytes());
    a.len() == b.len() && a.iter().zip(b).fold(0u8, |acc, (x, y)| acc | (x ^ y)) == 0
}
