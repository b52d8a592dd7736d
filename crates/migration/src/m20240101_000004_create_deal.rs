//! Create `deal` table.
//!
//! `stage` stores the SCREAMING_SNAKE_CASE name of the pipeline stage.
use sea_orm_migration::{prelude::*, schema::*};

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Deal::Table)
                    .if_not_exists()
                    .col(uuid(Deal::Id).primary_key())
                    .col(string_len(Deal::Title, 255).not_null())
                    .col(ColumnDef::new(Deal::Value).double().null())
                    .col(string_len(Deal::Currency, 8).not_null())
                    .col(string_len(Deal::Stage, 32).not_null())
                    .col(integer(Deal::Probability).not_null())
                    .col(ColumnDef::new(Deal::ExpectedCloseDate).timestamp_with_time_zone().null())
                    .col(ColumnDef::new(Deal::ActualCloseDate).timestamp_with_time_zone().null())
                    .col(ColumnDef::new(Deal::Description).text().null())
                    .col(ColumnDef::new(Deal::LostReason).string_len(512).null())
                    .col(ColumnDef::new(Deal::CompanyId).uuid().null())
                    .col(ColumnDef::new(Deal::ContactId).uuid().null())
                    .col(uuid(Deal::OwnerId).not_null())
                    .col(timestamp_with_time_zone(Deal::CreatedAt).not_null())
                    .col(timestamp_with_time_zone(Deal::UpdatedAt).not_null())
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_deal_company")
                            .from(Deal::Table, Deal::CompanyId)
                            .to(Company::Table, Company::Id)
                            .on_delete(ForeignKeyAction::Restrict)
                            .on_update(ForeignKeyAction::Cascade),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_deal_contact")
                            .from(Deal::Table, Deal::ContactId)
                            .to(Contact::Table, Contact::Id)
                            .on_delete(ForeignKeyAction::Restrict)
                            .on_update(ForeignKeyAction::Cascade),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_deal_owner")
                            .from(Deal::Table, Deal::OwnerId)
                            .to(User::Table, User::Id)
                            .on_delete(ForeignKeyAction::Restrict)
                            .on_update(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager.drop_table(Table::drop().table(Deal::Table).to_owned()).await
    }
}

#[derive(DeriveIden)]
enum Deal {
    Table,
    Id,
    Title,
    Value,
    Currency,
    Stage,
    Probability,
    ExpectedCloseDate,
    ActualCloseDate,
    Description,
    LostReason,
    CompanyId,
    ContactId,
    OwnerId,
    CreatedAt,
    UpdatedAt,
}

#[derive(DeriveIden)]
enum Company { Table, Id }

#[derive(DeriveIden)]
enum Contact { Table, Id }

#[derive(DeriveIden)]
enum User { Table, Id }
