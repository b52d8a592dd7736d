//! Create `company` table with FK to `user` (creator).
//!
//! Soft-deleted through `is_active`.
use sea_orm_migration::{prelude::*, schema::*};

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Company::Table)
                    .if_not_exists()
                    .col(uuid(Company::Id).primary_key())
                    .col(string_len(Company::Name, 255).not_null())
                    .col(ColumnDef::new(Company::Domain).string_len(255).null())
                    .col(ColumnDef::new(Company::Industry).string_len(128).null())
                    .col(ColumnDef::new(Company::Size).string_len(64).null())
                    .col(ColumnDef::new(Company::Website).string_len(512).null())
                    .col(ColumnDef::new(Company::Phone).string_len(64).null())
                    .col(ColumnDef::new(Company::Address).string_len(512).null())
                    .col(ColumnDef::new(Company::City).string_len(128).null())
                    .col(ColumnDef::new(Company::Country).string_len(128).null())
                    .col(ColumnDef::new(Company::Description).text().null())
                    .col(boolean(Company::IsActive).not_null())
                    .col(uuid(Company::CreatedById).not_null())
                    .col(timestamp_with_time_zone(Company::CreatedAt).not_null())
                    .col(timestamp_with_time_zone(Company::UpdatedAt).not_null())
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_company_created_by")
                            .from(Company::Table, Company::CreatedById)
                            .to(User::Table, User::Id)
                            .on_delete(ForeignKeyAction::Restrict)
                            .on_update(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager.drop_table(Table::drop().table(Company::Table).to_owned()).await
    }
}

#[derive(DeriveIden)]
enum Company {
    Table,
    Id,
    Name,
    Domain,
    Industry,
    Size,
    Website,
    Phone,
    Address,
    City,
    Country,
    Description,
    IsActive,
    CreatedById,
    CreatedAt,
    UpdatedAt,
}

#[derive(DeriveIden)]
enum User { Table, Id }
