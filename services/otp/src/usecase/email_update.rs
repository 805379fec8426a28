use tracing::info;
use uuid::Uuid;

use crate::domain::repository::{AccountRepository, Mailer, PasscodeRepository};
use crate::domain::types::{Purpose, normalize_email};
use crate::error::OtpServiceError;
use crate::usecase::flow::{Issued, PasscodeFlow};

// ── RequestEmailUpdateCode ──────────────────────────────────────────────────

pub struct RequestEmailUpdateCodeInput {
    /// Authenticated account asking for the change.
    pub account_id: Uuid,
    pub new_email: String,
}

pub struct RequestEmailUpdateCodeUseCase<A, P, M>
where
    A: AccountRepository,
    P: PasscodeRepository,
    M: Mailer,
{
    pub accounts: A,
    pub flow: PasscodeFlow<P, M>,
}

impl<A, P, M> RequestEmailUpdateCodeUseCase<A, P, M>
where
    A: AccountRepository,
    P: PasscodeRepository,
    M: Mailer,
{
    /// Mail a code to the new address. The record is bound to the requesting
    /// account so only that session can confirm it.
    pub async fn execute(
        &self,
        input: RequestEmailUpdateCodeInput,
    ) -> Result<Issued, OtpServiceError> {
        let new_email = normalize_email(&input.new_email);
        let account = self
            .accounts
            .find_by_id(input.account_id)
            .await?
            .ok_or(OtpServiceError::AccountNotFound)?;
        if normalize_email(&account.email) == new_email {
            return Err(OtpServiceError::SameAsCurrent);
        }
        if self.accounts.find_by_email(&new_email).await?.is_some() {
            return Err(OtpServiceError::EmailInUse);
        }
        self.flow
            .issue(Purpose::EmailUpdate, &new_email, Some(account.id))
            .await
    }
}

// ── ConfirmEmailUpdate ──────────────────────────────────────────────────────

pub struct ConfirmEmailUpdateInput {
    pub account_id: Uuid,
    pub new_email: String,
    pub code: String,
    pub token: String,
}

pub struct ConfirmEmailUpdateUseCase<A, P, M>
where
    A: AccountRepository,
    P: PasscodeRepository,
    M: Mailer,
{
    pub accounts: A,
    pub flow: PasscodeFlow<P, M>,
}

impl<A, P, M> ConfirmEmailUpdateUseCase<A, P, M>
where
    A: AccountRepository,
    P: PasscodeRepository,
    M: Mailer,
{
    pub async fn execute(&self, input: ConfirmEmailUpdateInput) -> Result<(), OtpServiceError> {
        let new_email = normalize_email(&input.new_email);
        let record = self
            .flow
            .verify(
                Purpose::EmailUpdate,
                &new_email,
                &input.code,
                &input.token,
                Some(input.account_id),
            )
            .await?;

        // The address may have been claimed while the code was in flight.
        let taken = self
            .accounts
            .find_by_email(&new_email)
            .await?
            .is_some_and(|other| other.id != input.account_id);
        self.flow.consume(&record).await?;
        if taken {
            return Err(OtpServiceError::EmailInUse);
        }

        self.accounts
            .update_email(input.account_id, &new_email)
            .await?;
        info!(account_id = %input.account_id, "account email updated");
        Ok(())
    }
}
