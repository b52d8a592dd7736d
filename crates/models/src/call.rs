use sea_orm::{entity::prelude::*, Set};
use uuid::Uuid;
use chrono::Utc;
use serde::{Deserialize, Serialize};

use crate::{contact, errors, user};

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "call")]
#[serde(rename_all = "camelCase")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub contact_id: Uuid,
    pub user_id: Uuid,
    pub direction: String,
    pub duration_seconds: i32,
    pub outcome: Option<String>,
    pub notes: Option<String>,
    pub called_at: DateTimeWithTimeZone,
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

impl Related<contact::Entity> for Entity {
    fn to() -> RelationDef { Relation::Contact.def() }
}

impl ActiveModelBehavior for ActiveModel {}

pub const DIRECTIONS: [&str; 2] = ["INBOUND", "OUTBOUND"];

/// Accepts any casing, returns the stored upper-case form.
pub fn validate_direction(direction: &str) -> Result<String, errors::ModelError> {
    let up = direction.trim().to_ascii_uppercase();
    if !DIRECTIONS.contains(&up.as_str()) {
        return Err(errors::ModelError::Validation(format!("direction must be one of {}", DIRECTIONS.join(", "))));
    }
    Ok(up)
}

#[derive(Clone, Debug)]
pub struct NewCall {
    pub contact_id: Uuid,
    pub user_id: Uuid,
    pub direction: String,
    pub duration_seconds: i32,
    pub outcome: Option<String>,
    pub notes: Option<String>,
    pub called_at: Option<DateTimeWithTimeZone>,
}

pub async fn create<C: ConnectionTrait>(db: &C, new: NewCall) -> Result<Model, errors::ModelError> {
    let direction = validate_direction(&new.direction)?;
    if new.duration_seconds < 0 {
        return Err(errors::ModelError::Validation("duration must not be negative".into()));
    }
    let now: DateTimeWithTimeZone = Utc::now().into();
    let am = ActiveModel {
        id: Set(Uuid::new_v4()),
        contact_id: Set(new.contact_id),
        user_id: Set(new.user_id),
        direction: Set(direction),
        duration_seconds: Set(new.duration_seconds),
        outcome: Set(new.outcome),
        notes: Set(new.notes),
        called_at: Set(new.called_at.unwrap_or(now)),
        created_at: Set(now),
    };
    Ok(am.insert(db).await?)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn direction_is_case_insensitive() {
        assert_eq!(validate_direction("outbound").unwrap(), "OUTBOUND");
        assert!(validate_direction("sideways").is_err());
    }
}
