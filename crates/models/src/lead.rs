use sea_orm::{entity::prelude::*, Set};
use uuid::Uuid;
use chrono::Utc;
use serde::{Deserialize, Serialize};

use crate::{errors, user};

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "lead")]
#[serde(rename_all = "camelCase")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub company: Option<String>,
    pub job_title: Option<String>,
    pub website: Option<String>,
    pub source: Option<String>,
    pub status: LeadStatus,
    pub score: i32,
    pub notes: Option<String>,
    pub assigned_to_id: Option<Uuid>,
    pub created_by_id: Uuid,
    pub is_converted: bool,
    pub converted_at: Option<DateTimeWithTimeZone>,
    pub converted_contact_id: Option<Uuid>,
    pub converted_company_id: Option<Uuid>,
    pub converted_deal_id: Option<Uuid>,
    pub created_at: DateTimeWithTimeZone,
    pub updated_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "Text")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum LeadStatus {
    #[sea_orm(string_value = "NEW")]
    New,
    #[sea_orm(string_value = "CONTACTED")]
    Contacted,
    #[sea_orm(string_value = "QUALIFIED")]
    Qualified,
    #[sea_orm(string_value = "UNQUALIFIED")]
    Unqualified,
    #[sea_orm(string_value = "CONVERTED")]
    Converted,
}

#[derive(Copy, Clone, Debug, EnumIter)]
pub enum Relation { AssignedTo, CreatedBy }

impl RelationTrait for Relation {
    fn def(&self) -> RelationDef {
        match self {
            Relation::AssignedTo => Entity::belongs_to(user::Entity).from(Column::AssignedToId).to(user::Column::Id).into(),
            Relation::CreatedBy => Entity::belongs_to(user::Entity).from(Column::CreatedById).to(user::Column::Id).into(),
        }
    }
}

impl ActiveModelBehavior for ActiveModel {}

impl Model {
    pub fn owner_ids(&self) -> [Option<Uuid>; 2] {
        [Some(self.created_by_id), self.assigned_to_id]
    }

    /// Person name if any part is present.
    pub fn display_name(&self) -> Option<String> {
        let joined = format!(
            "{} {}",
            self.first_name.as_deref().unwrap_or(""),
            self.last_name.as_deref().unwrap_or("")
        );
        let trimmed = joined.trim();
        (!trimmed.is_empty()).then(|| trimmed.to_string())
    }
}

#[derive(Clone, Debug, Default)]
pub struct NewLead {
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub company: Option<String>,
    pub job_title: Option<String>,
    pub website: Option<String>,
    pub source: Option<String>,
    pub notes: Option<String>,
    pub assigned_to_id: Option<Uuid>,
    pub created_by_id: Uuid,
    /// Precomputed by the scoring function.
    pub score: i32,
}

pub(crate) fn present(v: &Option<String>) -> bool {
    v.as_deref().map(|s| !s.trim().is_empty()).unwrap_or(false)
}

/// A lead must be identifiable by a name, an email or a company.
pub fn validate_identity(first_name: &Option<String>, last_name: &Option<String>, email: &Option<String>, company: &Option<String>) -> Result<(), errors::ModelError> {
    if !(present(first_name) || present(last_name) || present(email) || present(company)) {
        return Err(errors::ModelError::Validation("Lead needs a name, email or company".into()));
    }
    if let Some(e) = email.as_deref().filter(|e| !e.trim().is_empty()) {
        user::validate_email(e)?;
    }
    Ok(())
}

pub fn validate_score(score: i32) -> Result<(), errors::ModelError> {
    if !(0..=100).contains(&score) {
        return Err(errors::ModelError::Validation("score must be between 0 and 100".into()));
    }
    Ok(())
}

pub async fn create<C: ConnectionTrait>(db: &C, new: NewLead) -> Result<Model, errors::ModelError> {
    validate_identity(&new.first_name, &new.last_name, &new.email, &new.company)?;
    validate_score(new.score)?;
    let now = Utc::now().into();
    let am = ActiveModel {
        id: Set(Uuid::new_v4()),
        first_name: Set(new.first_name),
        last_name: Set(new.last_name),
        email: Set(new.email.map(|e| e.trim().to_lowercase())),
        phone: Set(new.phone),
        company: Set(new.company),
        job_title: Set(new.job_title),
        website: Set(new.website),
        source: Set(new.source),
        status: Set(LeadStatus::New),
        score: Set(new.score),
        notes: Set(new.notes),
        assigned_to_id: Set(new.assigned_to_id),
        created_by_id: Set(new.created_by_id),
        is_converted: Set(false),
        converted_at: Set(None),
        converted_contact_id: Set(None),
        converted_company_id: Set(None),
        converted_deal_id: Set(None),
        created_at: Set(now),
        updated_at: Set(now),
    };
    Ok(am.insert(db).await?)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn identity_accepts_company_only() {
        assert!(validate_identity(&None, &None, &None, &Some("Acme".into())).is_ok());
    }

    #[test]
    fn identity_rejects_all_blank() {
        assert!(validate_identity(&Some(" ".into()), &None, &Some("".into()), &None).is_err());
    }
}
