use chrono::Utc;
use tracing::info;
use uuid::Uuid;

use crate::domain::repository::{AccountRepository, Mailer, PasscodeRepository};
use crate::domain::types::{Account, Purpose, normalize_email};
use crate::error::OtpServiceError;
use crate::usecase::flow::{Issued, PasscodeFlow};
use crate::usecase::passcode::hash_secret;

// ── RequestRegistrationCode ─────────────────────────────────────────────────

pub struct RequestRegistrationCodeUseCase<A, P, M>
where
    A: AccountRepository,
    P: PasscodeRepository,
    M: Mailer,
{
    pub accounts: A,
    pub flow: PasscodeFlow<P, M>,
}

impl<A, P, M> RequestRegistrationCodeUseCase<A, P, M>
where
    A: AccountRepository,
    P: PasscodeRepository,
    M: Mailer,
{
    pub async fn execute(&self, email: &str) -> Result<Issued, OtpServiceError> {
        let email = normalize_email(email);
        if self.accounts.find_by_email(&email).await?.is_some() {
            return Err(OtpServiceError::AlreadyRegistered);
        }
        self.flow.issue(Purpose::Registration, &email, None).await
    }
}

// ── CompleteRegistration ────────────────────────────────────────────────────

pub struct CompleteRegistrationInput {
    pub email: String,
    pub code: String,
    pub token: String,
    pub name: String,
    pub password: String,
}

pub struct CompleteRegistrationUseCase<A, P, M>
where
    A: AccountRepository,
    P: PasscodeRepository,
    M: Mailer,
{
    pub accounts: A,
    pub flow: PasscodeFlow<P, M>,
}

impl<A, P, M> CompleteRegistrationUseCase<A, P, M>
where
    A: AccountRepository,
    P: PasscodeRepository,
    M: Mailer,
{
    /// Verify the emailed code and create the account. The passcode record is
    /// deleted; from here on the account itself keeps the address unique.
    pub async fn execute(
        &self,
        input: CompleteRegistrationInput,
    ) -> Result<Account, OtpServiceError> {
        let email = normalize_email(&input.email);
        let record = self
            .flow
            .verify(Purpose::Registration, &email, &input.code, &input.token, None)
            .await?;

        let password_hash = hash_secret(&input.password)?;
        self.flow.consume(&record).await?;

        if self.accounts.find_by_email(&email).await?.is_some() {
            return Err(OtpServiceError::AlreadyRegistered);
        }
        let now = Utc::now();
        let account = Account {
            id: Uuid::now_v7(),
            email,
            name: input.name,
            password_hash,
            created_at: now,
            updated_at: now,
        };
        self.accounts.create(&account).await?;

        info!(account_id = %account.id, "account registered");
        Ok(account)
    }
}
