use sea_orm::{entity::prelude::*, Set};
use uuid::Uuid;
use chrono::Utc;
use serde::{Deserialize, Serialize};

use crate::{call, contact, errors, user};

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "message")]
#[serde(rename_all = "camelCase")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub contact_id: Uuid,
    pub user_id: Uuid,
    pub channel: String,
    pub direction: String,
    pub subject: Option<String>,
    pub body: String,
    pub sent_at: DateTimeWithTimeZone,
    pub created_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter)]
pub enum Relation { Contact, User }

impl RelationTrait for Relation {
    fn def(&self) -> RelationDef {
        match self {
            Relation::Contact => Entity::belongs_to(contact::Entity).from(Column::ContactId).to(contact::Column::Id).into(),
            Relation::User => Entity::belongs_to(user::Entity).from(Column::UserId).to(user::Column::Id).into(),
        }
    }
}

impl ActiveModelBehavior for ActiveModel {}

pub const CHANNELS: [&str; 3] = ["EMAIL", "SMS", "WHATSAPP"];

pub fn validate_channel(channel: &str) -> Result<String, errors::ModelError> {
    let up = channel.trim().to_ascii_uppercase();
    if !CHANNELS.contains(&up.as_str()) {
        return Err(errors::ModelError::Validation(format!("channel must be one of {}", CHANNELS.join(", "))));
    }
    Ok(up)
}

#[derive(Clone, Debug)]
pub struct NewMessage {
    pub contact_id: Uuid,
    pub user_id: Uuid,
    pub channel: String,
    pub direction: String,
    pub subject: Option<String>,
    pub body: String,
    pub sent_at: Option<DateTimeWithTimeZone>,
}

pub async fn create<C: ConnectionTrait>(db: &C, new: NewMessage) -> Result<Model, errors::ModelError> {
    let channel = validate_channel(&new.channel)?;
    let direction = call::validate_direction(&new.direction)?;
    if new.body.trim().is_empty() {
        return Err(errors::ModelError::Validation("Message body is required".into()));
    }
    let now: DateTimeWithTimeZone = Utc::now().into();
    let am = ActiveModel {
        id: Set(Uuid::new_v4()),
        contact_id: Set(new.contact_id),
        user_id: Set(new.user_id),
        channel: Set(channel),
        direction: Set(direction),
        subject: Set(new.subject),
        body: Set(new.body),
        sent_at: Set(new.sent_at.unwrap_or(now)),
        created_at: Set(now),
    };
    Ok(am.insert(db).await?)
}
