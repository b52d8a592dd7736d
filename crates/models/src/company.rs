use sea_orm::{entity::prelude::*, Set};
use uuid::Uuid;
use chrono::Utc;
use serde::{Deserialize, Serialize};

use crate::{contact, deal, errors, user};

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "company")]
#[serde(rename_all = "camelCase")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub name: String,
    pub domain: Option<String>,
    pub industry: Option<String>,
    pub size: Option<String>,
    pub website: Option<String>,
    pub phone: Option<String>,
    pub address: Option<String>,
    pub city: Option<String>,
    pub country: Option<String>,
    pub description: Option<String>,
    pub is_active: bool,
    pub created_by_id: Uuid,
    pub created_at: DateTimeWithTimeZone,
    pub updated_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter)]
pub enum Relation { CreatedBy, Contacts, Deals }

impl RelationTrait for Relation {
    fn def(&self) -> RelationDef {
        match self {
            Relation::CreatedBy => Entity::belongs_to(user::Entity).from(Column::CreatedById).to(user::Column::Id).into(),
            Relation::Contacts => Entity::has_many(contact::Entity).into(),
            Relation::Deals => Entity::has_many(deal::Entity).into(),
        }
    }
}

impl Related<contact::Entity> for Entity {
    fn to() -> RelationDef { Relation::Contacts.def() }
}

impl Related<deal::Entity> for Entity {
    fn to() -> RelationDef { Relation::Deals.def() }
}

impl ActiveModelBehavior for ActiveModel {}

/// Fields accepted when inserting a company. `created_by_id` is stamped by the caller layer.
#[derive(Clone, Debug, Default)]
pub struct NewCompany {
    pub name: String,
    pub domain: Option<String>,
    pub industry: Option<String>,
    pub size: Option<String>,
    pub website: Option<String>,
    pub phone: Option<String>,
    pub address: Option<String>,
    pub city: Option<String>,
    pub country: Option<String>,
    pub description: Option<String>,
    pub created_by_id: Uuid,
}

pub fn validate_name(name: &str) -> Result<(), errors::ModelError> {
    if name.trim().is_empty() {
        return Err(errors::ModelError::Validation("Company name is required".into()));
    }
    if name.trim().chars().count() > 255 {
        return Err(errors::ModelError::Validation("Company name is too long".into()));
    }
    Ok(())
}

pub fn validate_website(url: &str) -> Result<(), errors::ModelError> {
    let lower = url.trim().to_ascii_lowercase();
    if !(lower.starts_with("http://") || lower.starts_with("https://")) {
        return Err(errors::ModelError::Validation("website must start with http(s)".into()));
    }
    Ok(())
}

pub async fn create<C: ConnectionTrait>(db: &C, new: NewCompany) -> Result<Model, errors::ModelError> {
    validate_name(&new.name)?;
    if let Some(w) = new.website.as_deref() { validate_website(w)?; }
    let now = Utc::now().into();
    let am = ActiveModel {
        id: Set(Uuid::new_v4()),
        name: Set(new.name.trim().to_string()),
        domain: Set(new.domain),
        industry: Set(new.industry),
        size: Set(new.size),
        website: Set(new.website),
        phone: Set(new.phone),
        address: Set(new.address),
        city: Set(new.city),
        country: Set(new.country),
        description: Set(new.description),
        is_active: Set(true),
        created_by_id: Set(new.created_by_id),
        created_at: Set(now),
        updated_at: Set(now),
    };
    Ok(am.insert(db).await?)
}
