use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Passcodes::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Passcodes::Id)
                            .uuid()
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(Passcodes::Subject).string().not_null())
                    .col(ColumnDef::new(Passcodes::Purpose).string().not_null())
                    .col(ColumnDef::new(Passcodes::CodeHash).string().not_null())
                    .col(ColumnDef::new(Passcodes::Token).string().not_null())
                    .col(ColumnDef::new(Passcodes::Stage).string().not_null())
                    .col(ColumnDef::new(Passcodes::OwnerId).uuid())
                    .col(
                        ColumnDef::new(Passcodes::RequestCount)
                            .integer()
                            .not_null()
                            .default(0),
                    )
                    .col(
                        ColumnDef::new(Passcodes::ErrorCount)
                            .integer()
                            .not_null()
                            .default(0),
                    )
                    .col(
                        ColumnDef::new(Passcodes::Revision)
                            .big_integer()
                            .not_null()
                            .default(0),
                    )
                    .col(ColumnDef::new(Passcodes::LastFailedAt).timestamp_with_time_zone())
                    .col(
                        ColumnDef::new(Passcodes::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(Passcodes::UpdatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .to_owned(),
            )
            .await?;

        // Upserts rely on this index to keep one live record per subject and purpose.
        manager
            .create_index(
                Index::create()
                    .table(Passcodes::Table)
                    .col(Passcodes::Subject)
                    .col(Passcodes::Purpose)
                    .unique()
                    .name("uq_passcodes_subject_purpose")
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(Passcodes::Table).to_owned())
            .await
    }
}

#[derive(Iden)]
enum Passcodes {
    Table,
    Id,
    Subject,
    Purpose,
    CodeHash,
    Token,
    Stage,
    OwnerId,
    RequestCount,
    ErrorCount,
    Revision,
    LastFailedAt,
    CreatedAt,
    UpdatedAt,
}
