//! Create the contact activity tables: `call`, `note`, `message`.
//!
//! Together with deals and tasks these are the rows that block a contact's hard delete.
use sea_orm_migration::{prelude::*, schema::*};

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Call::Table)
                    .if_not_exists()
                    .col(uuid(Call::Id).primary_key())
                    .col(uuid(Call::ContactId).not_null())
                    .col(uuid(Call::UserId).not_null())
                    .col(string_len(Call::Direction, 16).not_null())
                    .col(integer(Call::DurationSeconds).not_null())
                    .col(ColumnDef::new(Call::Outcome).string_len(128).null())
                    .col(ColumnDef::new(Call::Notes).text().null())
                    .col(timestamp_with_time_zone(Call::CalledAt).not_null())
                    .col(timestamp_with_time_zone(Call::CreatedAt).not_null())
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_call_contact")
                            .from(Call::Table, Call::ContactId)
                            .to(Contact::Table, Contact::Id)
                            .on_delete(ForeignKeyAction::Restrict)
                            .on_update(ForeignKeyAction::Cascade),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_call_user")
                            .from(Call::Table, Call::UserId)
                            .to(User::Table, User::Id)
                            .on_delete(ForeignKeyAction::Restrict)
                            .on_update(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(Note::Table)
                    .if_not_exists()
                    .col(uuid(Note::Id).primary_key())
                    .col(text(Note::Content).not_null())
                    .col(ColumnDef::new(Note::ContactId).uuid().null())
                    .col(ColumnDef::new(Note::DealId).uuid().null())
                    .col(uuid(Note::AuthorId).not_null())
                    .col(timestamp_with_time_zone(Note::CreatedAt).not_null())
                    .col(timestamp_with_time_zone(Note::UpdatedAt).not_null())
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_note_contact")
                            .from(Note::Table, Note::ContactId)
                            .to(Contact::Table, Contact::Id)
                            .on_delete(ForeignKeyAction::Restrict)
                            .on_update(ForeignKeyAction::Cascade),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_note_deal")
                            .from(Note::Table, Note::DealId)
                            .to(Deal::Table, Deal::Id)
                            .on_delete(ForeignKeyAction::SetNull)
                            .on_update(ForeignKeyAction::Cascade),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_note_author")
                            .from(Note::Table, Note::AuthorId)
                            .to(User::Table, User::Id)
                            .on_delete(ForeignKeyAction::Restrict)
                            .on_update(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(Message::Table)
                    .if_not_exists()
                    .col(uuid(Message::Id).primary_key())
                    .col(uuid(Message::ContactId).not_null())
                    .col(uuid(Message::UserId).not_null())
                    .col(string_len(Message::Channel, 16).not_null())
                    .col(string_len(Message::Direction, 16).not_null())
                    .col(ColumnDef::new(Message::Subject).string_len(255).null())
                    .col(text(Message::Body).not_null())
                    .col(timestamp_with_time_zone(Message::SentAt).not_null())
                    .col(timestamp_with_time_zone(Message::CreatedAt).not_null())
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_message_contact")
                            .from(Message::Table, Message::ContactId)
                            .to(Contact::Table, Contact::Id)
                            .on_delete(ForeignKeyAction::Restrict)
                            .on_update(ForeignKeyAction::Cascade),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_message_user")
                            .from(Message::Table, Message::UserId)
                            .to(User::Table, User::Id)
                            .on_delete(ForeignKeyAction::Restrict)
                            .on_update(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager.drop_table(Table::drop().table(Message::Table).to_owned()).await?;
        manager.drop_table(Table::drop().table(Note::Table).to_owned()).await?;
        manager.drop_table(Table::drop().table(Call::Table).to_owned()).await
    }
}

#[derive(DeriveIden)]
enum Call { Table, Id, ContactId, UserId, Direction, DurationSeconds, Outcome, Notes, CalledAt, CreatedAt }

#[derive(DeriveIden)]
enum Note { Table, Id, Content, ContactId, DealId, AuthorId, CreatedAt, UpdatedAt }

#[derive(DeriveIden)]
enum Message { Table, Id, ContactId, UserId, Channel, Direction, Subject, Body, SentAt, CreatedAt }

#[derive(DeriveIden)]
enum Contact { Table, Id }

#[derive(DeriveIden)]
enum Deal { Table, Id }

#[derive(DeriveIden)]
enum User { Table, Id }
