use sea_orm::{entity::prelude::*, Set};
use uuid::Uuid;
use chrono::Utc;
use serde::{Deserialize, Serialize};

use crate::{company, contact, deal, errors, user};

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "task")]
#[serde(rename_all = "camelCase")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub title: String,
    pub description: Option<String>,
    pub status: TaskStatus,
    pub priority: TaskPriority,
    pub due_date: Option<DateTimeWithTimeZone>,
    pub completed_at: Option<DateTimeWithTimeZone>,
    pub assigned_to_id: Uuid,
    pub created_by_id: Uuid,
    pub contact_id: Option<Uuid>,
    pub company_id: Option<Uuid>,
    pub deal_id: Option<Uuid>,
    pub created_at: DateTimeWithTimeZone,
    pub updated_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "Text")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TaskStatus {
    #[sea_orm(string_value = "PENDING")]
    Pending,
    #[sea_orm(string_value = "IN_PROGRESS")]
    InProgress,
    #[sea_orm(string_value = "COMPLETED")]
    Completed,
    #[sea_orm(string_value = "CANCELLED")]
    Cancelled,
}

impl TaskStatus {
    pub fn is_open(self) -> bool {
        matches!(self, TaskStatus::Pending | TaskStatus::InProgress)
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "Text")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TaskPriority {
    #[sea_orm(string_value = "LOW")]
    Low,
    #[sea_orm(string_value = "MEDIUM")]
    Medium,
    #[sea_orm(string_value = "HIGH")]
    High,
    #[sea_orm(string_value = "URGENT")]
    Urgent,
}

#[derive(Copy, Clone, Debug, EnumIter)]
pub enum Relation { AssignedTo, CreatedBy, Contact, Company, Deal }

impl RelationTrait for Relation {
    fn def(&self) -> RelationDef {
        match self {
            Relation::AssignedTo => Entity::belongs_to(user::Entity).from(Column::AssignedToId).to(user::Column::Id).into(),
            Relation::CreatedBy => Entity::belongs_to(user::Entity).from(Column::CreatedById).to(user::Column::Id).into(),
            Relation::Contact => Entity::belongs_to(contact::Entity).from(Column::ContactId).to(contact::Column::Id).into(),
            Relation::Company => Entity::belongs_to(company::Entity).from(Column::CompanyId).to(company::Column::Id).into(),
            Relation::Deal => Entity::belongs_to(deal::Entity).from(Column::DealId).to(deal::Column::Id).into(),
        }
    }
}

impl Related<contact::Entity> for Entity {
    fn to() -> RelationDef { Relation::Contact.def() }
}

impl ActiveModelBehavior for ActiveModel {}

impl Model {
    pub fn owner_ids(&self) -> [Option<Uuid>; 2] {
        [Some(self.created_by_id), Some(self.assigned_to_id)]
    }
}

#[derive(Clone, Debug)]
pub struct NewTask {
    pub title: String,
    pub description: Option<String>,
    pub status: Option<TaskStatus>,
    pub priority: Option<TaskPriority>,
    pub due_date: Option<DateTimeWithTimeZone>,
    pub assigned_to_id: Uuid,
    pub created_by_id: Uuid,
    pub contact_id: Option<Uuid>,
    pub company_id: Option<Uuid>,
    pub deal_id: Option<Uuid>,
}

pub fn validate_title(title: &str) -> Result<(), errors::ModelError> {
    if title.trim().is_empty() {
        return Err(errors::ModelError::Validation("Task title is required".into()));
    }
    Ok(())
}

pub async fn create<C: ConnectionTrait>(db: &C, new: NewTask) -> Result<Model, errors::ModelError> {
    validate_title(&new.title)?;
    let status = new.status.unwrap_or(TaskStatus::Pending);
    let now = Utc::now().into();
    let am = ActiveModel {
        id: Set(Uuid::new_v4()),
        title: Set(new.title.trim().to_string()),
        description: Set(new.description),
        status: Set(status),
        priority: Set(new.priority.unwrap_or(TaskPriority::Medium)),
        due_date: Set(new.due_date),
        completed_at: Set((status == TaskStatus::Completed).then_some(now)),
        assigned_to_id: Set(new.assigned_to_id),
        created_by_id: Set(new.created_by_id),
        contact_id: Set(new.contact_id),
        company_id: Set(new.company_id),
        deal_id: Set(new.deal_id),
        created_at: Set(now),
        updated_at: Set(now),
    };
    Ok(am.insert(db).await?)
}
