use sea_orm::{entity::prelude::*, Set};
use uuid::Uuid;
use chrono::Utc;
use serde::{Deserialize, Serialize};

use crate::{company, errors, user};

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "contact")]
#[serde(rename_all = "camelCase")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub first_name: String,
    pub last_name: String,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub job_title: Option<String>,
    pub source: Option<String>,
    pub notes: Option<String>,
    pub is_active: bool,
    pub company_id: Option<Uuid>,
    pub assigned_to_id: Option<Uuid>,
    pub created_by_id: Uuid,
    pub created_at: DateTimeWithTimeZone,
    pub updated_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter)]
pub enum Relation { Company, AssignedTo, CreatedBy }

impl RelationTrait for Relation {
    fn def(&self) -> RelationDef {
        match self {
            Relation::Company => Entity::belongs_to(company::Entity).from(Column::CompanyId).to(company::Column::Id).into(),
            Relation::AssignedTo => Entity::belongs_to(user::Entity).from(Column::AssignedToId).to(user::Column::Id).into(),
            Relation::CreatedBy => Entity::belongs_to(user::Entity).from(Column::CreatedById).to(user::Column::Id).into(),
        }
    }
}

impl Related<company::Entity> for Entity {
    fn to() -> RelationDef { Relation::Company.def() }
}

impl ActiveModelBehavior for ActiveModel {}

impl Model {
    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name).trim().to_string()
    }

    /// Creator and assignee may both modify the contact.
    pub fn owner_ids(&self) -> [Option<Uuid>; 2] {
        [Some(self.created_by_id), self.assigned_to_id]
    }
}

#[derive(Clone, Debug, Default)]
pub struct NewContact {
    pub first_name: String,
    pub last_name: String,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub job_title: Option<String>,
    pub source: Option<String>,
    pub notes: Option<String>,
    pub company_id: Option<Uuid>,
    pub assigned_to_id: Option<Uuid>,
    pub created_by_id: Uuid,
}

/// A contact needs at least one non-blank name part.
pub fn validate_names(first_name: &str, last_name: &str) -> Result<(), errors::ModelError> {
    if first_name.trim().is_empty() && last_name.trim().is_empty() {
        return Err(errors::ModelError::Validation("Contact first or last name is required".into()));
    }
    Ok(())
}

pub async fn create<C: ConnectionTrait>(db: &C, new: NewContact) -> Result<Model, errors::ModelError> {
    validate_names(&new.first_name, &new.last_name)?;
    let email = match new.email {
        Some(e) if !e.trim().is_empty() => {
            user::validate_email(&e)?;
            Some(e.trim().to_lowercase())
        }
        _ => None,
    };
    let now = Utc::now().into();
    let am = ActiveModel {
        id: Set(Uuid::new_v4()),
        first_name: Set(new.first_name.trim().to_string()),
        last_name: Set(new.last_name.trim().to_string()),
        email: Set(email),
        phone: Set(new.phone),
        job_title: Set(new.job_title),
        source: Set(new.source),
        notes: Set(new.notes),
        is_active: Set(true),
        company_id: Set(new.company_id),
        assigned_to_id: Set(new.assigned_to_id),
        created_by_id: Set(new.created_by_id),
        created_at: Set(now),
        updated_at: Set(now),
    };
    Ok(am.insert(db).await?)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn either_name_part_is_enough() {
        assert!(validate_names("Ada", "").is_ok());
        assert!(validate_names("", "Lovelace").is_ok());
        assert!(validate_names("  ", "\t").is_err());
    }
}
