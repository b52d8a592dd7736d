//! Create `contact` table with FKs to `company` and `user`.
use sea_orm_migration::{prelude::*, schema::*};

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Contact::Table)
                    .if_not_exists()
                    .col(uuid(Contact::Id).primary_key())
                    .col(string_len(Contact::FirstName, 128).not_null())
                    .col(string_len(Contact::LastName, 128).not_null())
                    .col(ColumnDef::new(Contact::Email).string_len(255).null())
                    .col(ColumnDef::new(Contact::Phone).string_len(64).null())
                    .col(ColumnDef::new(Contact::JobTitle).string_len(128).null())
                    .col(ColumnDef::new(Contact::Source).string_len(64).null())
                    .col(ColumnDef::new(Contact::Notes).text().null())
                    .col(boolean(Contact::IsActive).not_null())
                    .col(ColumnDef::new(Contact::CompanyId).uuid().null())
                    .col(ColumnDef::new(Contact::AssignedToId).uuid().null())
                    .col(uuid(Contact::CreatedById).not_null())
                    .col(timestamp_with_time_zone(Contact::CreatedAt).not_null())
                    .col(timestamp_with_time_zone(Contact::UpdatedAt).not_null())
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_contact_company")
                            .from(Contact::Table, Contact::CompanyId)
                            .to(Company::Table, Company::Id)
                            .on_delete(ForeignKeyAction::Restrict)
                            .on_update(ForeignKeyAction::Cascade),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_contact_assigned_to")
                            .from(Contact::Table, Contact::AssignedToId)
                            .to(User::Table, User::Id)
                            .on_delete(ForeignKeyAction::SetNull)
                            .on_update(ForeignKeyAction::Cascade),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_contact_created_by")
                            .from(Contact::Table, Contact::CreatedById)
                            .to(User::Table, User::Id)
                            .on_delete(ForeignKeyAction::Restrict)
                            .on_update(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager.drop_table(Table::drop().table(Contact::Table).to_owned()).await
    }
}

#[derive(DeriveIden)]
enum Contact {
    Table,
    Id,
    FirstName,
    LastName,
    Email,
    Phone,
    JobTitle,
    Source,
    Notes,
    IsActive,
    CompanyId,
    AssignedToId,
    CreatedById,
    CreatedAt,
    UpdatedAt,
}

#[derive(DeriveIden)]
enum Company { Table, Id }

#[derive(DeriveIden)]
enum User { Table, Id }
