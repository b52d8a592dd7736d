use sea_orm::{entity::prelude::*, Set};
use uuid::Uuid;
use chrono::Utc;
use serde::{Deserialize, Serialize};

use crate::{contact, deal, errors, user};

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "note")]
#[serde(rename_all = "camelCase")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub content: String,
    pub contact_id: Option<Uuid>,
    pub deal_id: Option<Uuid>,
    pub author_id: Uuid,
    pub created_at: DateTimeWithTimeZone,
    pub updated_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter)]
pub enum Relation { Contact, Deal, Author }

impl RelationTrait for Relation {
    fn def(&self) -> RelationDef {
        match self {
            Relation::Contact => Entity::belongs_to(contact::Entity).from(Column::ContactId).to(contact::Column::Id).into(),
            Relation::Deal => Entity::belongs_to(deal::Entity).from(Column::DealId).to(deal::Column::Id).into(),
            Relation::Author => Entity::belongs_to(user::Entity).from(Column::AuthorId).to(user::Column::Id).into(),
        }
    }
}

impl ActiveModelBehavior for ActiveModel {}

#[derive(Clone, Debug)]
pub struct NewNote {
    pub content: String,
    pub contact_id: Option<Uuid>,
    pub deal_id: Option<Uuid>,
    pub author_id: Uuid,
}

pub fn validate(content: &str, contact_id: Option<Uuid>, deal_id: Option<Uuid>) -> Result<(), errors::ModelError> {
    if content.trim().is_empty() {
        return Err(errors::ModelError::Validation("Note content is required".into()));
    }
    if contact_id.is_none() && deal_id.is_none() {
        return Err(errors::ModelError::Validation("Note must belong to a contact or a deal".into()));
    }
    Ok(())
}

pub async fn create<C: ConnectionTrait>(db: &C, new: NewNote) -> Result<Model, errors::ModelError> {
    validate(&new.content, new.contact_id, new.deal_id)?;
    let now = Utc::now().into();
    let am = ActiveModel {
        id: Set(Uuid::new_v4()),
        content: Set(new.content.trim().to_string()),
        contact_id: Set(new.contact_id),
        deal_id: Set(new.deal_id),
        author_id: Set(new.author_id),
        created_at: Set(now),
        updated_at: Set(now),
    };
    Ok(am.insert(db).await?)
}
