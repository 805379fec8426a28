use anyhow::Context as _;
use chrono::{DateTime, Utc};
use sea_orm::sea_query::{Expr, OnConflict, SimpleExpr};
use sea_orm::{
    ActiveModelTrait, ActiveValue::Set, ColumnTrait, DatabaseConnection, DbErr, EntityTrait,
    QueryFilter, SqlErr,
};
use uuid::Uuid;

use storefront_otp_schema::{accounts, passcodes};

use crate::domain::repository::{AccountRepository, PasscodeRepository};
use crate::domain::types::{Account, PasscodeRecord, Purpose, Stage};
use crate::error::OtpServiceError;

// ── Passcode repository ───────────────────────────────────────────────────────

#[derive(Clone)]
pub struct DbPasscodeRepository {
    pub db: DatabaseConnection,
}

impl PasscodeRepository for DbPasscodeRepository {
    async fn find(
        &self,
        subject: &str,
        purpose: Purpose,
    ) -> Result<Option<PasscodeRecord>, OtpServiceError> {
        let model = passcodes::Entity::find()
            .filter(passcodes::Column::Subject.eq(subject))
            .filter(passcodes::Column::Purpose.eq(purpose.as_str()))
            .one(&self.db)
            .await
            .context("find passcode")?;
        model.map(passcode_from_model).transpose()
    }

    async fn insert(&self, record: &PasscodeRecord) -> Result<bool, OtpServiceError> {
        let model = passcodes::ActiveModel {
            id: Set(record.id),
            subject: Set(record.subject.clone()),
            purpose: Set(record.purpose.as_str().to_owned()),
            code_hash: Set(record.code_hash.clone()),
            token: Set(record.token.clone()),
            stage: Set(record.stage.as_str().to_owned()),
            owner_id: Set(record.owner_id),
            request_count: Set(count_to_db(record.request_count)),
            error_count: Set(count_to_db(record.error_count)),
            revision: Set(record.revision),
            last_failed_at: Set(record.last_failed_at),
            created_at: Set(record.created_at),
            updated_at: Set(record.updated_at),
        };
        let inserted = passcodes::Entity::insert(model)
            .on_conflict(
                OnConflict::columns([passcodes::Column::Subject, passcodes::Column::Purpose])
                    .do_nothing()
                    .to_owned(),
            )
            .exec_without_returning(&self.db)
            .await
            .context("insert passcode")?;
        Ok(inserted > 0)
    }

    async fn reissue(
        &self,
        record: &PasscodeRecord,
        expected_revision: i64,
    ) -> Result<bool, OtpServiceError> {
        let result = passcodes::Entity::update_many()
            .set(passcodes::ActiveModel {
                code_hash: Set(record.code_hash.clone()),
                token: Set(record.token.clone()),
                stage: Set(record.stage.as_str().to_owned()),
                owner_id: Set(record.owner_id),
                request_count: Set(count_to_db(record.request_count)),
                error_count: Set(count_to_db(record.error_count)),
                revision: Set(record.revision),
                last_failed_at: Set(record.last_failed_at),
                updated_at: Set(record.updated_at),
                ..Default::default()
            })
            .filter(passcodes::Column::Id.eq(record.id))
            .filter(passcodes::Column::Revision.eq(expected_revision))
            .exec(&self.db)
            .await
            .context("reissue passcode")?;
        Ok(result.rows_affected == 1)
    }

    async fn set_failures(
        &self,
        id: Uuid,
        expected_revision: i64,
        error_count: u32,
        last_failed_at: Option<DateTime<Utc>>,
    ) -> Result<bool, OtpServiceError> {
        let result = passcodes::Entity::update_many()
            .set(passcodes::ActiveModel {
                error_count: Set(count_to_db(error_count)),
                last_failed_at: Set(last_failed_at),
                revision: Set(expected_revision + 1),
                ..Default::default()
            })
            .filter(passcodes::Column::Id.eq(id))
            .filter(passcodes::Column::Revision.eq(expected_revision))
            .exec(&self.db)
            .await
            .context("update passcode failures")?;
        Ok(result.rows_affected == 1)
    }

    async fn rotate_token(
        &self,
        id: Uuid,
        current_token: &str,
        new_token: &str,
        now: DateTime<Utc>,
    ) -> Result<bool, OtpServiceError> {
        let result = passcodes::Entity::update_many()
            .set(passcodes::ActiveModel {
                token: Set(new_token.to_owned()),
                stage: Set(Stage::Verified.as_str().to_owned()),
                error_count: Set(0),
                last_failed_at: Set(None),
                updated_at: Set(now),
                ..Default::default()
            })
            .col_expr(passcodes::Column::Revision, bump_revision())
            .filter(passcodes::Column::Id.eq(id))
            .filter(passcodes::Column::Token.eq(current_token))
            .exec(&self.db)
            .await
            .context("rotate passcode token")?;
        Ok(result.rows_affected == 1)
    }

    async fn consume(&self, id: Uuid, token: &str) -> Result<bool, OtpServiceError> {
        let result = passcodes::Entity::delete_many()
            .filter(passcodes::Column::Id.eq(id))
            .filter(passcodes::Column::Token.eq(token))
            .exec(&self.db)
            .await
            .context("consume passcode")?;
        Ok(result.rows_affected > 0)
    }

    async fn delete(&self, id: Uuid) -> Result<(), OtpServiceError> {
        passcodes::Entity::delete_by_id(id)
            .exec(&self.db)
            .await
            .context("delete passcode")?;
        Ok(())
    }

    async fn release_request(&self, id: Uuid) -> Result<(), OtpServiceError> {
        passcodes::Entity::update_many()
            .col_expr(
                passcodes::Column::RequestCount,
                Expr::col(passcodes::Column::RequestCount).sub(1),
            )
            .col_expr(passcodes::Column::Revision, bump_revision())
            .filter(passcodes::Column::Id.eq(id))
            .filter(passcodes::Column::RequestCount.gt(0))
            .exec(&self.db)
            .await
            .context("release passcode request")?;
        Ok(())
    }
}

fn bump_revision() -> SimpleExpr {
    Expr::col(passcodes::Column::Revision).add(1)
}

fn count_to_db(count: u32) -> i32 {
    i32::try_from(count).unwrap_or(i32::MAX)
}

fn count_from_db(count: i32) -> u32 {
    u32::try_from(count).unwrap_or(0)
}

fn passcode_from_model(model: passcodes::Model) -> Result<PasscodeRecord, OtpServiceError> {
    Ok(PasscodeRecord {
        id: model.id,
        purpose: model.purpose.parse()?,
        stage: model.stage.parse()?,
        subject: model.subject,
        code_hash: model.code_hash,
        token: model.token,
        owner_id: model.owner_id,
        request_count: count_from_db(model.request_count),
        error_count: count_from_db(model.error_count),
        revision: model.revision,
        last_failed_at: model.last_failed_at,
        created_at: model.created_at,
        updated_at: model.updated_at,
    })
}

// ── Account repository ────────────────────────────────────────────────────────

#[derive(Clone)]
pub struct DbAccountRepository {
    pub db: DatabaseConnection,
}

impl AccountRepository for DbAccountRepository {
    async fn find_by_email(&self, email: &str) -> Result<Option<Account>, OtpServiceError> {
        let model = accounts::Entity::find()
            .filter(accounts::Column::Email.eq(email))
            .one(&self.db)
            .await
            .context("find account by email")?;
        Ok(model.map(account_from_model))
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<Account>, OtpServiceError> {
        let model = accounts::Entity::find_by_id(id)
            .one(&self.db)
            .await
            .context("find account by id")?;
        Ok(model.map(account_from_model))
    }

    async fn create(&self, account: &Account) -> Result<(), OtpServiceError> {
        let result = accounts::ActiveModel {
            id: Set(account.id),
            email: Set(account.email.clone()),
            name: Set(account.name.clone()),
            password_hash: Set(account.password_hash.clone()),
            created_at: Set(account.created_at),
            updated_at: Set(account.updated_at),
        }
        .insert(&self.db)
        .await;
        match result {
            Ok(_) => Ok(()),
            Err(e) if is_unique_violation(&e) => Err(OtpServiceError::AlreadyRegistered),
            Err(e) => Err(anyhow::Error::new(e).context("create account").into()),
        }
    }

    async fn update_email(&self, id: Uuid, email: &str) -> Result<(), OtpServiceError> {
        let result = accounts::ActiveModel {
            id: Set(id),
            email: Set(email.to_owned()),
            updated_at: Set(Utc::now()),
            ..Default::default()
        }
        .update(&self.db)
        .await;
        match result {
            Ok(_) => Ok(()),
            Err(e) if is_unique_violation(&e) => Err(OtpServiceError::EmailInUse),
            Err(DbErr::RecordNotUpdated) => Err(OtpServiceError::AccountNotFound),
            Err(e) => Err(anyhow::Error::new(e).context("update account email").into()),
        }
    }

    async fn update_password(
        &self,
        id: Uuid,
        password_hash: &str,
    ) -> Result<(), OtpServiceError> {
        let result = accounts::ActiveModel {
            id: Set(id),
            password_hash: Set(password_hash.to_owned()),
            updated_at: Set(Utc::now()),
            ..Default::default()
        }
        .update(&self.db)
        .await;
        match result {
            Ok(_) => Ok(()),
            Err(DbErr::RecordNotUpdated) => Err(OtpServiceError::AccountNotFound),
            Err(e) => Err(anyhow::Error::new(e).context("update account password").into()),
        }
    }
}

fn is_unique_violation(err: &DbErr) -> bool {
    matches!(err.sql_err(), Some(SqlErr::UniqueConstraintViolation(_)))
}

fn account_from_model(model: accounts::Model) -> Account {
    Account {
        id: model.id,
        email: model.email,
        name: model.name,
        password_hash: model.password_hash,
        created_at: model.created_at,
        updated_at: model.updated_at,
    }
}
