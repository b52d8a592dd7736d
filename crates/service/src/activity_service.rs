//! Calls, notes and messages logged against a contact.

use chrono::{DateTime, FixedOffset};
use sea_orm::{ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, QueryOrder};
use serde::Deserialize;
use tracing::info;
use uuid::Uuid;

use configs::PaginationConfig;
use models::{call, contact, deal, message, note};

use crate::errors::ServiceError;
use crate::pagination::{Page, Pagination};
use crate::query::{blank_to_none, ensure_exists, fetch_page, find_or_404};

#[derive(Clone, Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LogCall {
    pub direction: String,
    #[serde(default)]
    pub duration_seconds: i32,
    pub outcome: Option<String>,
    pub notes: Option<String>,
    pub called_at: Option<DateTime<FixedOffset>>,
}

#[derive(Clone, Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AddNote {
    pub content: String,
    pub deal_id: Option<Uuid>,
}

#[derive(Clone, Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LogMessage {
    pub channel: String,
    pub direction: String,
    pub subject: Option<String>,
    pub body: String,
    pub sent_at: Option<DateTime<FixedOffset>>,
}

#[derive(Clone)]
pub struct ActivityService {
    db: DatabaseConnection,
    limits: PaginationConfig,
}

impl ActivityService {
    pub fn new(db: DatabaseConnection, limits: PaginationConfig) -> Self { Self { db, limits } }

    async fn contact(&self, id: Uuid) -> Result<contact::Model, ServiceError> {
        find_or_404::<contact::Entity, _>(&self.db, id, "Contact").await
    }

    pub async fn list_calls(&self, contact_id: Uuid, pagination: Pagination) -> Result<Page<call::Model>, ServiceError> {
        self.contact(contact_id).await?;
        let (page, limit) = pagination.normalize(&self.limits);
        let select = call::Entity::find()
            .filter(call::Column::ContactId.eq(contact_id))
            .order_by_desc(call::Column::CalledAt)
            .order_by_asc(call::Column::Id);
        let (data, pagination) = fetch_page(&self.db, select, page, limit).await?;
        Ok(Page { data, pagination })
    }

    pub async fn log_call(&self, contact_id: Uuid, input: LogCall, caller: Uuid) -> Result<call::Model, ServiceError> {
        self.contact(contact_id).await?;
        let created = call::create(
            &self.db,
            call::NewCall {
                contact_id,
                user_id: caller,
                direction: input.direction,
                duration_seconds: input.duration_seconds,
                outcome: blank_to_none(input.outcome),
                notes: blank_to_none(input.notes),
                called_at: input.called_at,
            },
        )
        .await?;
        info!(contact_id = %contact_id, call_id = %created.id, "call_logged");
        Ok(created)
    }

    pub async fn list_notes(&self, contact_id: Uuid, pagination: Pagination) -> Result<Page<note::Model>, ServiceError> {
        self.contact(contact_id).await?;
        let (page, limit) = pagination.normalize(&self.limits);
        let select = note::Entity::find()
            .filter(note::Column::ContactId.eq(contact_id))
            .order_by_desc(note::Column::CreatedAt)
            .order_by_asc(note::Column::Id);
        let (data, pagination) = fetch_page(&self.db, select, page, limit).await?;
        Ok(Page { data, pagination })
    }

    pub async fn add_note(&self, contact_id: Uuid, input: AddNote, caller: Uuid) -> Result<note::Model, ServiceError> {
        self.contact(contact_id).await?;
        ensure_exists::<deal::Entity, _>(&self.db, input.deal_id, "Deal").await?;
        let created = note::create(
            &self.db,
            note::NewNote { content: input.content, contact_id: Some(contact_id), deal_id: input.deal_id, author_id: caller },
        )
        .await?;
        info!(contact_id = %contact_id, note_id = %created.id, "note_added");
        Ok(created)
    }

    pub async fn list_messages(&self, contact_id: Uuid, pagination: Pagination) -> Result<Page<message::Model>, ServiceError> {
        self.contact(contact_id).await?;
        let (page, limit) = pagination.normalize(&self.limits);
        let select = message::Entity::find()
            .filter(message::Column::ContactId.eq(contact_id))
            .order_by_desc(message::Column::SentAt)
            .order_by_asc(message::Column::Id);
        let (data, pagination) = fetch_page(&self.db, select, page, limit).await?;
        Ok(Page { data, pagination })
    }

    pub async fn log_message(&self, contact_id: Uuid, input: LogMessage, caller: Uuid) -> Result<message::Model, ServiceError> {
        self.contact(contact_id).await?;
        let created = message::create(
            &self.db,
            message::NewMessage {
                contact_id,
                user_id: caller,
                channel: input.channel,
                direction: input.direction,
                subject: blank_to_none(input.subject),
                body: input.body,
                sent_at: input.sent_at,
            },
        )
        .await?;
        info!(contact_id = %contact_id, message_id = %created.id, "message_logged");
        Ok(created)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{get_db, limits, seed_user};

    #[tokio::test]
    async fn activities_attach_to_existing_contacts_only() -> Result<(), anyhow::Error> {
        let db = get_db().await?;
        let u = seed_user(&db, "Rep").await?;
        let c = contact::create(&db, contact::NewContact { first_name: "Ada".into(), created_by_id: u.id, ..Default::default() }).await?;
        let svc = ActivityService::new(db, limits());

        let call = svc.log_call(c.id, LogCall { direction: "outbound".into(), duration_seconds: 90, ..Default::default() }, u.id).await?;
        assert_eq!(call.direction, "OUTBOUND");
        assert_eq!(call.user_id, u.id);
        svc.add_note(c.id, AddNote { content: "Prefers email".into(), deal_id: None }, u.id).await?;
        svc.log_message(
            c.id,
            LogMessage { channel: "email".into(), direction: "OUTBOUND".into(), body: "Hi".into(), ..Default::default() },
            u.id,
        )
        .await?;

        assert_eq!(svc.list_calls(c.id, Pagination::default()).await?.pagination.total, 1);
        assert_eq!(svc.list_notes(c.id, Pagination::default()).await?.pagination.total, 1);
        assert_eq!(svc.list_messages(c.id, Pagination::default()).await?.pagination.total, 1);

        let err = svc.add_note(Uuid::new_v4(), AddNote { content: "x".into(), deal_id: None }, u.id).await.unwrap_err();
        assert_eq!(err.to_string(), "Contact not found");
        let bad = svc
            .log_message(c.id, LogMessage { channel: "pigeon".into(), direction: "INBOUND".into(), body: "coo".into(), ..Default::default() }, u.id)
            .await
            .unwrap_err();
        assert!(bad.is_client_error());
        Ok(())
    }
}
