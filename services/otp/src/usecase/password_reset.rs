use tracing::info;

use crate::domain::repository::{AccountRepository, Mailer, PasscodeRepository};
use crate::domain::types::{Purpose, normalize_email};
use crate::error::OtpServiceError;
use crate::usecase::flow::{Continuation, Issued, PasscodeFlow};
use crate::usecase::passcode::hash_secret;

// ── RequestPasswordResetCode ────────────────────────────────────────────────

pub struct RequestPasswordResetCodeUseCase<A, P, M>
where
    A: AccountRepository,
    P: PasscodeRepository,
    M: Mailer,
{
    pub accounts: A,
    pub flow: PasscodeFlow<P, M>,
}

impl<A, P, M> RequestPasswordResetCodeUseCase<A, P, M>
where
    A: AccountRepository,
    P: PasscodeRepository,
    M: Mailer,
{
    pub async fn execute(&self, email: &str) -> Result<Issued, OtpServiceError> {
        let email = normalize_email(email);
        if self.accounts.find_by_email(&email).await?.is_none() {
            return Err(OtpServiceError::AccountNotFound);
        }
        self.flow.issue(Purpose::PasswordReset, &email, None).await
    }
}

// ── VerifyPasswordResetCode ─────────────────────────────────────────────────

pub struct VerifyPasswordResetCodeInput {
    pub email: String,
    pub code: String,
    pub token: String,
}

pub struct VerifyPasswordResetCodeUseCase<P, M>
where
    P: PasscodeRepository,
    M: Mailer,
{
    pub flow: PasscodeFlow<P, M>,
}

impl<P, M> VerifyPasswordResetCodeUseCase<P, M>
where
    P: PasscodeRepository,
    M: Mailer,
{
    /// Confirm the code and trade the issuance token for a continuation token.
    /// The code itself is not needed again.
    pub async fn execute(
        &self,
        input: VerifyPasswordResetCodeInput,
    ) -> Result<Continuation, OtpServiceError> {
        let email = normalize_email(&input.email);
        let record = self
            .flow
            .verify(Purpose::PasswordReset, &email, &input.code, &input.token, None)
            .await?;
        self.flow
            .rotate(&record, self.flow.settings.password_reset_continuation_ttl)
            .await
    }
}

// ── CompletePasswordReset ───────────────────────────────────────────────────

pub struct CompletePasswordResetInput {
    pub email: String,
    pub token: String,
    pub new_password: String,
}

pub struct CompletePasswordResetUseCase<A, P, M>
where
    A: AccountRepository,
    P: PasscodeRepository,
    M: Mailer,
{
    pub accounts: A,
    pub flow: PasscodeFlow<P, M>,
}

impl<A, P, M> CompletePasswordResetUseCase<A, P, M>
where
    A: AccountRepository,
    P: PasscodeRepository,
    M: Mailer,
{
    pub async fn execute(&self, input: CompletePasswordResetInput) -> Result<(), OtpServiceError> {
        let email = normalize_email(&input.email);
        let record = self
            .flow
            .redeem(
                Purpose::PasswordReset,
                &email,
                &input.token,
                None,
                self.flow.settings.password_reset_continuation_ttl,
            )
            .await?;

        let account = self
            .accounts
            .find_by_email(&email)
            .await?
            .ok_or(OtpServiceError::AccountNotFound)?;
        let password_hash = hash_secret(&input.new_password)?;

        self.flow.consume(&record).await?;
        self.accounts
            .update_password(account.id, &password_hash)
            .await?;

        info!(account_id = %account.id, "password reset");
        Ok(())
    }
}
