use std::collections::HashMap;

use chrono::{DateTime, FixedOffset, Utc};
use sea_orm::{
    sea_query::{NullOrdering, Order},
    ActiveModelTrait, ColumnTrait, Condition, DatabaseConnection, EntityTrait, IntoActiveModel, QueryFilter,
    QueryOrder, Set,
};
use serde::{Deserialize, Serialize};
use tracing::{info, instrument};
use uuid::Uuid;

use configs::PaginationConfig;
use models::{company, contact, deal, task, user};

use crate::contact_service::{CompanyRef, ContactRef};
use crate::errors::ServiceError;
use crate::pagination::{Page, Pagination};
use crate::query::{blank_to_none, contains_ci, ensure_exists, ensure_owner, fetch_page, find_or_404, search_term, user_summaries};

#[derive(Clone, Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskFilter {
    pub search: Option<String>,
    pub status: Option<task::TaskStatus>,
    pub priority: Option<task::TaskPriority>,
    pub assigned_to: Option<Uuid>,
    pub contact_id: Option<Uuid>,
    pub company_id: Option<Uuid>,
    pub deal_id: Option<Uuid>,
    pub due_from: Option<DateTime<FixedOffset>>,
    pub due_to: Option<DateTime<FixedOffset>>,
    /// Open tasks whose due date has passed.
    #[serde(default)]
    pub overdue: bool,
    #[serde(default)]
    pub include_completed: bool,
}

#[derive(Clone, Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateTask {
    pub title: String,
    pub description: Option<String>,
    pub status: Option<task::TaskStatus>,
    pub priority: Option<task::TaskPriority>,
    pub due_date: Option<DateTime<FixedOffset>>,
    /// Defaults to the caller.
    pub assigned_to_id: Option<Uuid>,
    pub contact_id: Option<Uuid>,
    pub company_id: Option<Uuid>,
    pub deal_id: Option<Uuid>,
}

#[derive(Clone, Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateTask {
    pub title: Option<String>,
    pub description: Option<String>,
    pub status: Option<task::TaskStatus>,
    pub priority: Option<task::TaskPriority>,
    pub due_date: Option<DateTime<FixedOffset>>,
    pub assigned_to_id: Option<Uuid>,
    pub contact_id: Option<Uuid>,
    pub company_id: Option<Uuid>,
    pub deal_id: Option<Uuid>,
}

#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskListItem {
    #[serde(flatten)]
    pub task: task::Model,
    pub assigned_to: Option<user::UserSummary>,
    pub contact: Option<ContactRef>,
}

#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskDetail {
    #[serde(flatten)]
    pub task: task::Model,
    pub assigned_to: Option<user::UserSummary>,
    pub created_by: Option<user::UserSummary>,
    pub contact: Option<ContactRef>,
    pub company: Option<CompanyRef>,
    pub deal: Option<deal::Model>,
}

/// `completed_at` after moving from `old` to `new`.
pub fn completion_stamp(
    old: task::TaskStatus,
    new: task::TaskStatus,
    stamp: Option<DateTime<FixedOffset>>,
    now: DateTime<FixedOffset>,
) -> Option<DateTime<FixedOffset>> {
    match (old == task::TaskStatus::Completed, new == task::TaskStatus::Completed) {
        (false, true) => Some(now),
        (true, true) => stamp.or(Some(now)),
        (_, false) => None,
    }
}

#[derive(Clone)]
pub struct TaskService {
    db: DatabaseConnection,
    limits: PaginationConfig,
}

impl TaskService {
    pub fn new(db: DatabaseConnection, limits: PaginationConfig) -> Self { Self { db, limits } }

    pub async fn list(&self, filter: &TaskFilter, pagination: Pagination) -> Result<Page<TaskListItem>, ServiceError> {
        let (page, limit) = pagination.normalize(&self.limits);
        let mut cond = Condition::all();
        match filter.status {
            Some(status) => cond = cond.add(task::Column::Status.eq(status)),
            None if !filter.include_completed => cond = cond.add(task::Column::Status.ne(task::TaskStatus::Completed)),
            None => {}
        }
        if let Some(p) = filter.priority {
            cond = cond.add(task::Column::Priority.eq(p));
        }
        if let Some(id) = filter.assigned_to {
            cond = cond.add(task::Column::AssignedToId.eq(id));
        }
        if let Some(id) = filter.contact_id {
            cond = cond.add(task::Column::ContactId.eq(id));
        }
        if let Some(id) = filter.company_id {
            cond = cond.add(task::Column::CompanyId.eq(id));
        }
        if let Some(id) = filter.deal_id {
            cond = cond.add(task::Column::DealId.eq(id));
        }
        if let Some(from) = filter.due_from {
            cond = cond.add(task::Column::DueDate.gte(from));
        }
        if let Some(to) = filter.due_to {
            cond = cond.add(task::Column::DueDate.lte(to));
        }
        if filter.overdue {
            let now: DateTime<FixedOffset> = Utc::now().into();
            cond = cond
                .add(task::Column::DueDate.lt(now))
                .add(task::Column::Status.is_in([task::TaskStatus::Pending, task::TaskStatus::InProgress]));
        }
        if let Some(term) = search_term(&filter.search) {
            cond = cond.add(
                Condition::any()
                    .add(contains_ci(task::Entity, task::Column::Title, term))
                    .add(contains_ci(task::Entity, task::Column::Description, term)),
            );
        }
        let select = task::Entity::find()
            .filter(cond)
            .order_by_with_nulls(task::Column::DueDate, Order::Asc, NullOrdering::Last)
            .order_by_desc(task::Column::CreatedAt)
            .order_by_asc(task::Column::Id);
        let (rows, meta) = fetch_page(&self.db, select, page, limit).await?;

        let users = user_summaries(&self.db, rows.iter().map(|t| t.assigned_to_id)).await?;
        let contact_ids: Vec<Uuid> = rows.iter().filter_map(|t| t.contact_id).collect();
        let contacts: HashMap<Uuid, ContactRef> = if contact_ids.is_empty() {
            HashMap::new()
        } else {
            contact::Entity::find()
                .filter(contact::Column::Id.is_in(contact_ids))
                .all(&self.db)
                .await?
                .iter()
                .map(|c| (c.id, ContactRef::from(c)))
                .collect()
        };
        let data = rows
            .into_iter()
            .map(|t| TaskListItem {
                assigned_to: users.get(&t.assigned_to_id).cloned(),
                contact: t.contact_id.and_then(|id| contacts.get(&id).cloned()),
                task: t,
            })
            .collect();
        Ok(Page { data, pagination: meta })
    }

    pub async fn get(&self, id: Uuid) -> Result<TaskDetail, ServiceError> {
        let task = find_or_404::<task::Entity, _>(&self.db, id, "Task").await?;
        let users = user_summaries(&self.db, [task.assigned_to_id, task.created_by_id]).await?;
        let contact = match task.contact_id {
            Some(cid) => contact::Entity::find_by_id(cid).one(&self.db).await?.as_ref().map(ContactRef::from),
            None => None,
        };
        let company = match task.company_id {
            Some(cid) => company::Entity::find_by_id(cid).one(&self.db).await?.as_ref().map(CompanyRef::from),
            None => None,
        };
        let deal = match task.deal_id {
            Some(did) => deal::Entity::find_by_id(did).one(&self.db).await?,
            None => None,
        };
        Ok(TaskDetail {
            assigned_to: users.get(&task.assigned_to_id).cloned(),
            created_by: users.get(&task.created_by_id).cloned(),
            contact,
            company,
            deal,
            task,
        })
    }

    #[instrument(skip(self, input), fields(caller = %caller))]
    pub async fn create(&self, input: CreateTask, caller: Uuid) -> Result<TaskDetail, ServiceError> {
        task::validate_title(&input.title)?;
        let assignee = input.assigned_to_id.unwrap_or(caller);
        ensure_exists::<user::Entity, _>(&self.db, Some(assignee), "Assigned user").await?;
        ensure_exists::<contact::Entity, _>(&self.db, input.contact_id, "Contact").await?;
        ensure_exists::<company::Entity, _>(&self.db, input.company_id, "Company").await?;
        ensure_exists::<deal::Entity, _>(&self.db, input.deal_id, "Deal").await?;
        let created = task::create(
            &self.db,
            task::NewTask {
                title: input.title,
                description: blank_to_none(input.description),
                status: input.status,
                priority: input.priority,
                due_date: input.due_date,
                assigned_to_id: assignee,
                created_by_id: caller,
                contact_id: input.contact_id,
                company_id: input.company_id,
                deal_id: input.deal_id,
            },
        )
        .await?;
        info!(task_id = %created.id, "task_created");
        self.get(created.id).await
    }

    #[instrument(skip(self, patch), fields(task_id = %id, caller = %caller))]
    pub async fn update(&self, id: Uuid, patch: UpdateTask, caller: Uuid) -> Result<TaskDetail, ServiceError> {
        let existing = find_or_404::<task::Entity, _>(&self.db, id, "Task").await?;
        ensure_owner(&existing.owner_ids(), caller, "Task")?;
        ensure_exists::<user::Entity, _>(&self.db, patch.assigned_to_id, "Assigned user").await?;
        ensure_exists::<contact::Entity, _>(&self.db, patch.contact_id, "Contact").await?;
        ensure_exists::<company::Entity, _>(&self.db, patch.company_id, "Company").await?;
        ensure_exists::<deal::Entity, _>(&self.db, patch.deal_id, "Deal").await?;

        let old_status = existing.status;
        let old_stamp = existing.completed_at;
        let mut am = existing.into_active_model();
        if let Some(title) = patch.title {
            task::validate_title(&title)?;
            am.title = Set(title.trim().to_string());
        }
        if let Some(status) = patch.status {
            am.status = Set(status);
            am.completed_at = Set(completion_stamp(old_status, status, old_stamp, Utc::now().into()));
        }
        if let Some(v) = patch.description { am.description = Set(blank_to_none(Some(v))); }
        if let Some(v) = patch.priority { am.priority = Set(v); }
        if let Some(v) = patch.due_date { am.due_date = Set(Some(v)); }
        if let Some(v) = patch.assigned_to_id { am.assigned_to_id = Set(v); }
        if let Some(v) = patch.contact_id { am.contact_id = Set(Some(v)); }
        if let Some(v) = patch.company_id { am.company_id = Set(Some(v)); }
        if let Some(v) = patch.deal_id { am.deal_id = Set(Some(v)); }
        am.updated_at = Set(Utc::now().into());
        am.update(&self.db).await?;
        self.get(id).await
    }

    pub async fn complete(&self, id: Uuid, caller: Uuid) -> Result<TaskDetail, ServiceError> {
        self.update(id, UpdateTask { status: Some(task::TaskStatus::Completed), ..Default::default() }, caller).await
    }

    #[instrument(skip(self), fields(task_id = %id, caller = %caller))]
    pub async fn delete(&self, id: Uuid, caller: Uuid) -> Result<(), ServiceError> {
        let existing = find_or_404::<task::Entity, _>(&self.db, id, "Task").await?;
        ensure_owner(&existing.owner_ids(), caller, "Task")?;
        task::Entity::delete_by_id(id).exec(&self.db).await?;
        info!(task_id = %id, "task_deleted");
        Ok(())
    }
}
