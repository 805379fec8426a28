use sea_orm::DatabaseConnection;

use crate::domain::types::FlowSettings;
use crate::infra::db::{DbAccountRepository, DbPasscodeRepository};
use crate::infra::mailer::AppMailer;
use crate::usecase::flow::PasscodeFlow;

/// Shared application state passed to every handler via axum `State`.
#[derive(Clone)]
pub struct AppState {
    pub db: DatabaseConnection,
    pub cookie_domain: String,
    pub settings: FlowSettings,
    pub mailer: AppMailer,
}

impl AppState {
    pub fn account_repo(&self) -> DbAccountRepository {
        DbAccountRepository {
            db: self.db.clone(),
        }
    }

    pub fn passcode_repo(&self) -> DbPasscodeRepository {
        DbPasscodeRepository {
            db: self.db.clone(),
        }
    }

    pub fn flow(&self) -> PasscodeFlow<DbPasscodeRepository, AppMailer> {
        PasscodeFlow {
            passcodes: self.passcode_repo(),
            mailer: self.mailer.clone(),
            settings: self.settings.clone(),
        }
    }
}
