//! Create `task` table.
use sea_orm_migration::{prelude::*, schema::*};

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Task::Table)
                    .if_not_exists()
                    .col(uuid(Task::Id).primary_key())
                    .col(string_len(Task::Title, 255).not_null())
                    .col(ColumnDef::new(Task::Description).text().null())
                    .col(string_len(Task::Status, 32).not_null())
                    .col(string_len(Task::Priority, 16).not_null())
                    .col(ColumnDef::new(Task::DueDate).timestamp_with_time_zone().null())
                    .col(ColumnDef::new(Task::CompletedAt).timestamp_with_time_zone().null())
                    .col(uuid(Task::AssignedToId).not_null())
                    .col(uuid(Task::CreatedById).not_null())
                    .col(ColumnDef::new(Task::ContactId).uuid().null())
                    .col(ColumnDef::new(Task::CompanyId).uuid().null())
                    .col(ColumnDef::new(Task::DealId).uuid().null())
                    .col(timestamp_with_time_zone(Task::CreatedAt).not_null())
                    .col(timestamp_with_time_zone(Task::UpdatedAt).not_null())
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_task_assigned_to")
                            .from(Task::Table, Task::AssignedToId)
                            .to(User::Table, User::Id)
                            .on_delete(ForeignKeyAction::Restrict)
                            .on_update(ForeignKeyAction::Cascade),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_task_created_by")
                            .from(Task::Table, Task::CreatedById)
                            .to(User::Table, User::Id)
                            .on_delete(ForeignKeyAction::Restrict)
                            .on_update(ForeignKeyAction::Cascade),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_task_contact")
                            .from(Task::Table, Task::ContactId)
                            .to(Contact::Table, Contact::Id)
                            .on_delete(ForeignKeyAction::Restrict)
                            .on_update(ForeignKeyAction::Cascade),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_task_company")
                            .from(Task::Table, Task::CompanyId)
                            .to(Company::Table, Company::Id)
                            .on_delete(ForeignKeyAction::Restrict)
                            .on_update(ForeignKeyAction::Cascade),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_task_deal")
                            .from(Task::Table, Task::DealId)
                            .to(Deal::Table, Deal::Id)
                            .on_delete(ForeignKeyAction::SetNull)
                            .on_update(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager.drop_table(Table::drop().table(Task::Table).to_owned()).await
    }
}

#[derive(DeriveIden)]
enum Task {
    Table,
    Id,
    Title,
    Description,
    Status,
    Priority,
    DueDate,
    CompletedAt,
    AssignedToId,
    CreatedById,
    ContactId,
    CompanyId,
    DealId,
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
