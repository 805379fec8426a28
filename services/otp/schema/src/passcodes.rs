use sea_orm::entity::prelude::*;

/// One live passcode per `(subject, purpose)`; unique index enforced by migration.
///
/// `code_hash` is an argon2 PHC string; the plaintext code is never stored.
/// `revision` is bumped by every write and guards compare-and-swap updates.
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "passcodes")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub subject: String,
    pub purpose: String,
    pub code_hash: String,
    pub token: String,
    pub stage: String,
    pub owner_id: Option<Uuid>,
    pub request_count: i32,
    pub error_count: i32,
    pub revision: i64,
    pub last_failed_at: Option<chrono::DateTime<chrono::Utc>>,
    pub created_at: chrono::DateTime<chrono::Utc>,
    pub updated_at: chrono::DateTime<chrono::Utc>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
