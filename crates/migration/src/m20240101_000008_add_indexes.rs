use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

/// (index name, table, column) for every plain lookup index.
const INDEXES: &[(&str, Tbl, Col)] = &[
    ("idx_contact_company", Tbl::Contact, Col::CompanyId),
    ("idx_contact_assigned_to", Tbl::Contact, Col::AssignedToId),
    ("idx_contact_email", Tbl::Contact, Col::Email),
    ("idx_company_name", Tbl::Company, Col::Name),
    ("idx_deal_stage", Tbl::Deal, Col::Stage),
    ("idx_deal_owner", Tbl::Deal, Col::OwnerId),
    ("idx_deal_contact", Tbl::Deal, Col::ContactId),
    ("idx_deal_company", Tbl::Deal, Col::CompanyId),
    ("idx_lead_status", Tbl::Lead, Col::Status),
    ("idx_lead_assigned_to", Tbl::Lead, Col::AssignedToId),
    ("idx_task_assigned_to", Tbl::Task, Col::AssignedToId),
    ("idx_task_due_date", Tbl::Task, Col::DueDate),
    ("idx_task_contact", Tbl::Task, Col::ContactId),
    ("idx_call_contact", Tbl::Call, Col::ContactId),
    ("idx_note_contact", Tbl::Note, Col::ContactId),
    ("idx_message_contact", Tbl::Message, Col::ContactId),
];

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        for (name, table, col) in INDEXES {
            manager
                .create_index(
                    Index::create()
                        .name(*name)
                        .table(*table)
                        .col(*col)
                        .if_not_exists()
                        .to_owned(),
                )
                .await?;
        }
        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        for (name, table, _) in INDEXES {
            manager
                .drop_index(Index::drop().name(*name).table(*table).to_owned())
                .await?;
        }
        Ok(())
    }
}

#[derive(DeriveIden, Clone, Copy)]
enum Tbl { Contact, Company, Deal, Lead, Task, Call, Note, Message }

#[derive(DeriveIden, Clone, Copy)]
enum Col { CompanyId, AssignedToId, Email, Name, Stage, OwnerId, ContactId, Status, DueDate }
