//! Create `lead` table.
//!
//! Conversion links (`converted_*_id`) are nulled, never cascaded, when the target goes away.
use sea_orm_migration::{prelude::*, schema::*};

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Lead::Table)
                    .if_not_exists()
                    .col(uuid(Lead::Id).primary_key())
                    .col(ColumnDef::new(Lead::FirstName).string_len(128).null())
                    .col(ColumnDef::new(Lead::LastName).string_len(128).null())
                    .col(ColumnDef::new(Lead::Email).string_len(255).null())
                    .col(ColumnDef::new(Lead::Phone).string_len(64).null())
                    .col(ColumnDef::new(Lead::Company).string_len(255).null())
                    .col(ColumnDef::new(Lead::JobTitle).string_len(128).null())
                    .col(ColumnDef::new(Lead::Website).string_len(512).null())
                    .col(ColumnDef::new(Lead::Source).string_len(64).null())
                    .col(string_len(Lead::Status, 32).not_null())
                    .col(integer(Lead::Score).not_null())
                    .col(ColumnDef::new(Lead::Notes).text().null())
                    .col(ColumnDef::new(Lead::AssignedToId).uuid().null())
                    .col(uuid(Lead::CreatedById).not_null())
                    .col(boolean(Lead::IsConverted).not_null())
                    .col(ColumnDef::new(Lead::ConvertedAt).timestamp_with_time_zone().null())
                    .col(ColumnDef::new(Lead::ConvertedContactId).uuid().null())
                    .col(ColumnDef::new(Lead::ConvertedCompanyId).uuid().null())
                    .col(ColumnDef::new(Lead::ConvertedDealId).uuid().null())
                    .col(timestamp_with_time_zone(Lead::CreatedAt).not_null())
                    .col(timestamp_with_time_zone(Lead::UpdatedAt).not_null())
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_lead_assigned_to")
                            .from(Lead::Table, Lead::AssignedToId)
                            .to(User::Table, User::Id)
                            .on_delete(ForeignKeyAction::SetNull)
                            .on_update(ForeignKeyAction::Cascade),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_lead_created_by")
                            .from(Lead::Table, Lead::CreatedById)
                            .to(User::Table, User::Id)
                            .on_delete(ForeignKeyAction::Restrict)
                            .on_update(ForeignKeyAction::Cascade),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_lead_converted_contact")
                            .from(Lead::Table, Lead::ConvertedContactId)
                            .to(Contact::Table, Contact::Id)
                            .on_delete(ForeignKeyAction::SetNull)
                            .on_update(ForeignKeyAction::Cascade),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_lead_converted_company")
                            .from(Lead::Table, Lead::ConvertedCompanyId)
                            .to(Company::Table, Company::Id)
                            .on_delete(ForeignKeyAction::SetNull)
                            .on_update(ForeignKeyAction::Cascade),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_lead_converted_deal")
                            .from(Lead::Table, Lead::ConvertedDealId)
                            .to(Deal::Table, Deal::Id)
                            .on_delete(ForeignKeyAction::SetNull)
                            .on_update(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager.drop_table(Table::drop().table(Lead::Table).to_owned()).await
    }
}

#[derive(DeriveIden)]
enum Lead {
    Table,
    Id,
    FirstName,
    LastName,
    Email,
    Phone,
    Company,
    JobTitle,
    Website,
    Source,
    Status,
    Score,
    Notes,
    AssignedToId,
    CreatedById,
    IsConverted,
    ConvertedAt,
    ConvertedContactId,
    ConvertedCompanyId,
    ConvertedDealId,
    CreatedAt,
    UpdatedAt,
}

#[derive(DeriveIden)]
enum User { Table, Id }

#[derive(DeriveIden)]
enum Contact { Table, Id }

#[derive(DeriveIden)]
enum Company { Table, Id }

#[derive(DeriveIden)]
enum Deal { Table, Id }
