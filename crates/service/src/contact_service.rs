use std::collections::HashMap;

use chrono::{DateTime, FixedOffset, Utc};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, Condition, ConnectionTrait, DatabaseConnection, EntityTrait,
    IntoActiveModel, JoinType, PaginatorTrait, QueryFilter, QueryOrder, QuerySelect, RelationTrait, Set,
};
use serde::{Deserialize, Serialize};
use tracing::{info, instrument, warn};
use uuid::Uuid;

use configs::PaginationConfig;
use models::{call, company, contact, deal, message, note, task, user};

use crate::company_service::RELATED_LIMIT;
use crate::errors::ServiceError;
use crate::pagination::{Page, Pagination};
use crate::query::{
    blank_to_none, contains_ci, count_by, ensure_exists, ensure_owner, fetch_page, find_or_404, search_term,
    user_summaries,
};

#[derive(Clone, Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContactFilter {
    pub search: Option<String>,
    pub company_id: Option<Uuid>,
    pub assigned_to: Option<Uuid>,
    pub source: Option<String>,
    #[serde(default)]
    pub include_inactive: bool,
}

#[derive(Clone, Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateContact {
    #[serde(default)]
    pub first_name: String,
    #[serde(default)]
    pub last_name: String,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub job_title: Option<String>,
    pub source: Option<String>,
    pub notes: Option<String>,
    pub company_id: Option<Uuid>,
    pub assigned_to_id: Option<Uuid>,
}

#[derive(Clone, Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateContact {
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub job_title: Option<String>,
    pub source: Option<String>,
    pub notes: Option<String>,
    pub company_id: Option<Uuid>,
    pub assigned_to_id: Option<Uuid>,
    pub is_active: Option<bool>,
}

#[derive(Clone, Debug, Serialize)]
pub struct CompanyRef {
    pub id: Uuid,
    pub name: String,
}

impl From<&company::Model> for CompanyRef {
    fn from(c: &company::Model) -> Self { Self { id: c.id, name: c.name.clone() } }
}

#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ContactRef {
    pub id: Uuid,
    pub first_name: String,
    pub last_name: String,
    pub email: Option<String>,
}

impl From<&contact::Model> for ContactRef {
    fn from(c: &contact::Model) -> Self {
        Self { id: c.id, first_name: c.first_name.clone(), last_name: c.last_name.clone(), email: c.email.clone() }
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
pub struct ContactListCounts {
    pub deals: u64,
    pub tasks: u64,
}

#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ContactListItem {
    #[serde(flatten)]
    pub contact: contact::Model,
    pub company: Option<CompanyRef>,
    pub assigned_to: Option<user::UserSummary>,
    #[serde(rename = "_count")]
    pub count: ContactListCounts,
}

/// Rows of every kind that reference a contact. Any of them blocks a hard delete.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
pub struct ContactCounts {
    pub deals: u64,
    pub tasks: u64,
    pub calls: u64,
    pub notes: u64,
    pub messages: u64,
}

impl ContactCounts {
    pub fn total(&self) -> u64 { self.deals + self.tasks + self.calls + self.notes + self.messages }
}

#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ContactDetail {
    #[serde(flatten)]
    pub contact: contact::Model,
    pub company: Option<company::Model>,
    pub assigned_to: Option<user::UserSummary>,
    pub deals: Vec<deal::Model>,
    pub tasks: Vec<task::Model>,
    pub calls: Vec<call::Model>,
    pub notes: Vec<note::Model>,
    pub messages: Vec<message::Model>,
    #[serde(rename = "_count")]
    pub count: ContactCounts,
}

/// Per-contact figures computed from the contact's deals and tasks.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ContactStats {
    pub total_deals: u64,
    pub total_deal_value: f64,
    pub open_deals: u64,
    pub won_deals: u64,
    pub won_value: f64,
    pub total_tasks: u64,
    pub pending_tasks: u64,
    pub completed_tasks: u64,
    pub urgent_tasks: u64,
    pub overdue_tasks: u64,
}

impl ContactStats {
    pub fn from_rows(deals: &[deal::Model], tasks: &[task::Model], now: DateTime<FixedOffset>) -> Self {
        let mut s = ContactStats { total_deals: deals.len() as u64, total_tasks: tasks.len() as u64, ..Default::default() };
        for d in deals {
            let v = d.value.unwrap_or(0.0);
            s.total_deal_value += v;
            match d.stage {
                deal::DealStage::ClosedWon => {
                    s.won_deals += 1;
                    s.won_value += v;
                }
                deal::DealStage::ClosedLost => {}
                _ => s.open_deals += 1,
            }
        }
        for t in tasks {
            if t.status.is_open() {
                s.pending_tasks += 1;
                if t.priority == task::TaskPriority::Urgent {
                    s.urgent_tasks += 1;
                }
                if t.due_date.map(|d| d < now).unwrap_or(false) {
                    s.overdue_tasks += 1;
                }
            } else if t.status == task::TaskStatus::Completed {
                s.completed_tasks += 1;
            }
        }
        s
    }
}

pub(crate) async fn contact_counts<C: ConnectionTrait>(db: &C, id: Uuid) -> Result<ContactCounts, ServiceError> {
    Ok(ContactCounts {
        deals: deal::Entity::find().filter(deal::Column::ContactId.eq(id)).count(db).await?,
        tasks: task::Entity::find().filter(task::Column::ContactId.eq(id)).count(db).await?,
        calls: call::Entity::find().filter(call::Column::ContactId.eq(id)).count(db).await?,
        notes: note::Entity::find().filter(note::Column::ContactId.eq(id)).count(db).await?,
        messages: message::Entity::find().filter(message::Column::ContactId.eq(id)).count(db).await?,
    })
}

/// Lower-cased, validated email; `None` for blank input.
fn normalize_email(email: Option<String>) -> Result<Option<String>, ServiceError> {
    match blank_to_none(email) {
        Some(e) => {
            user::validate_email(&e)?;
            Ok(Some(e.to_lowercase()))
        }
        None => Ok(None),
    }
}

#[derive(Clone)]
pub struct ContactService {
    db: DatabaseConnection,
    limits: PaginationConfig,
}

impl ContactService {
    pub fn new(db: DatabaseConnection, limits: PaginationConfig) -> Self { Self { db, limits } }

    pub async fn list(&self, filter: &ContactFilter, pagination: Pagination) -> Result<Page<ContactListItem>, ServiceError> {
        let (page, limit) = pagination.normalize(&self.limits);
        let mut cond = Condition::all();
        if !filter.include_inactive {
            cond = cond.add(contact::Column::IsActive.eq(true));
        }
        if let Some(company_id) = filter.company_id {
            cond = cond.add(contact::Column::CompanyId.eq(company_id));
        }
        if let Some(assignee) = filter.assigned_to {
            cond = cond.add(contact::Column::AssignedToId.eq(assignee));
        }
        if let Some(source) = blank_to_none(filter.source.clone()) {
            cond = cond.add(contact::Column::Source.eq(source));
        }
        let mut select = contact::Entity::find();
        if let Some(term) = search_term(&filter.search) {
            select = select.join(JoinType::LeftJoin, contact::Relation::Company.def());
            cond = cond.add(
                Condition::any()
                    .add(contains_ci(contact::Entity, contact::Column::FirstName, term))
                    .add(contains_ci(contact::Entity, contact::Column::LastName, term))
                    .add(contains_ci(contact::Entity, contact::Column::Email, term))
                    .add(contains_ci(contact::Entity, contact::Column::Phone, term))
                    .add(contains_ci(contact::Entity, contact::Column::JobTitle, term))
                    .add(contains_ci(company::Entity, company::Column::Name, term)),
            );
        }
        let select = select
            .filter(cond)
            .order_by_desc(contact::Column::CreatedAt)
            .order_by_asc(contact::Column::Id);
        let (rows, meta) = fetch_page(&self.db, select, page, limit).await?;

        let ids: Vec<Uuid> = rows.iter().map(|c| c.id).collect();
        let company_ids: Vec<Uuid> = rows.iter().filter_map(|c| c.company_id).collect();
        let companies: HashMap<Uuid, CompanyRef> = if company_ids.is_empty() {
            HashMap::new()
        } else {
            company::Entity::find()
                .filter(company::Column::Id.is_in(company_ids))
                .all(&self.db)
                .await?
                .iter()
                .map(|c| (c.id, CompanyRef::from(c)))
                .collect()
        };
        let users = user_summaries(&self.db, rows.iter().filter_map(|c| c.assigned_to_id)).await?;
        let deals = count_by(&self.db, deal::Entity::find(), deal::Column::ContactId, &ids).await?;
        let tasks = count_by(&self.db, task::Entity::find(), task::Column::ContactId, &ids).await?;

        let data = rows
            .into_iter()
            .map(|c| ContactListItem {
                company: c.company_id.and_then(|id| companies.get(&id).cloned()),
                assigned_to: c.assigned_to_id.and_then(|id| users.get(&id).cloned()),
                count: ContactListCounts {
                    deals: deals.get(&c.id).copied().unwrap_or(0),
                    tasks: tasks.get(&c.id).copied().unwrap_or(0),
                },
                contact: c,
            })
            .collect();
        Ok(Page { data, pagination: meta })
    }

    pub async fn get(&self, id: Uuid) -> Result<ContactDetail, ServiceError> {
        let contact = find_or_404::<contact::Entity, _>(&self.db, id, "Contact").await?;
        let company = match contact.company_id {
            Some(cid) => company::Entity::find_by_id(cid).one(&self.db).await?,
            None => None,
        };
        let assigned_to = match contact.assigned_to_id {
            Some(uid) => user::Entity::find_by_id(uid).one(&self.db).await?.as_ref().map(user::UserSummary::from),
            None => None,
        };
        let deals = deal::Entity::find()
            .filter(deal::Column::ContactId.eq(id))
            .order_by_desc(deal::Column::CreatedAt)
            .limit(RELATED_LIMIT)
            .all(&self.db)
            .await?;
        let tasks = task::Entity::find()
            .filter(task::Column::ContactId.eq(id))
            .order_by_desc(task::Column::CreatedAt)
            .limit(RELATED_LIMIT)
            .all(&self.db)
            .await?;
        let calls = call::Entity::find()
            .filter(call::Column::ContactId.eq(id))
            .order_by_desc(call::Column::CalledAt)
            .limit(RELATED_LIMIT)
            .all(&self.db)
            .await?;
        let notes = note::Entity::find()
            .filter(note::Column::ContactId.eq(id))
            .order_by_desc(note::Column::CreatedAt)
            .limit(RELATED_LIMIT)
            .all(&self.db)
            .await?;
        let messages = message::Entity::find()
            .filter(message::Column::ContactId.eq(id))
            .order_by_desc(message::Column::SentAt)
            .limit(RELATED_LIMIT)
            .all(&self.db)
            .await?;
        let count = contact_counts(&self.db, id).await?;
        Ok(ContactDetail { contact, company, assigned_to, deals, tasks, calls, notes, messages, count })
    }

    async fn ensure_email_free<C: ConnectionTrait>(db: &C, email: &str, except: Option<Uuid>) -> Result<(), ServiceError> {
        let mut q = contact::Entity::find().filter(contact::Column::Email.eq(email));
        if let Some(id) = except {
            q = q.filter(contact::Column::Id.ne(id));
        }
        if q.one(db).await?.is_some() {
            return Err(ServiceError::Conflict("A contact with this email already exists".into()));
        }
        Ok(())
    }

    /// Insert a contact after FK and uniqueness checks. Usable inside a transaction.
    pub(crate) async fn insert<C: ConnectionTrait>(db: &C, input: CreateContact, caller: Uuid) -> Result<contact::Model, ServiceError> {
        contact::validate_names(&input.first_name, &input.last_name)?;
        let email = normalize_email(input.email)?;
        ensure_exists::<company::Entity, _>(db, input.company_id, "Company").await?;
        ensure_exists::<user::Entity, _>(db, input.assigned_to_id, "Assigned user").await?;
        if let Some(e) = email.as_deref() {
            Self::ensure_email_free(db, e, None).await?;
        }
        let created = contact::create(
            db,
            contact::NewContact {
                first_name: input.first_name,
                last_name: input.last_name,
                email,
                phone: blank_to_none(input.phone),
                job_title: blank_to_none(input.job_title),
                source: blank_to_none(input.source),
                notes: blank_to_none(input.notes),
                company_id: input.company_id,
                assigned_to_id: input.assigned_to_id,
                created_by_id: caller,
            },
        )
        .await?;
        Ok(created)
    }

    #[instrument(skip(self, input), fields(caller = %caller))]
    pub async fn create(&self, input: CreateContact, caller: Uuid) -> Result<ContactDetail, ServiceError> {
        let created = Self::insert(&self.db, input, caller).await?;
        info!(contact_id = %created.id, "contact_created");
        self.get(created.id).await
    }

    #[instrument(skip(self, patch), fields(contact_id = %id, caller = %caller))]
    pub async fn update(&self, id: Uuid, patch: UpdateContact, caller: Uuid) -> Result<ContactDetail, ServiceError> {
        let existing = find_or_404::<contact::Entity, _>(&self.db, id, "Contact").await?;
        ensure_owner(&existing.owner_ids(), caller, "Contact")?;
        ensure_exists::<company::Entity, _>(&self.db, patch.company_id, "Company").await?;
        ensure_exists::<user::Entity, _>(&self.db, patch.assigned_to_id, "Assigned user").await?;

        let first = patch.first_name.as_deref().unwrap_or(&existing.first_name).to_string();
        let last = patch.last_name.as_deref().unwrap_or(&existing.last_name).to_string();
        contact::validate_names(&first, &last)?;

        let mut am = existing.into_active_model();
        am.first_name = Set(first.trim().to_string());
        am.last_name = Set(last.trim().to_string());
        if let Some(email) = patch.email {
            let email = normalize_email(Some(email))?;
            if let Some(e) = email.as_deref() {
                Self::ensure_email_free(&self.db, e, Some(id)).await?;
            }
            am.email = Set(email);
        }
        if let Some(v) = patch.phone { am.phone = Set(blank_to_none(Some(v))); }
        if let Some(v) = patch.job_title { am.job_title = Set(blank_to_none(Some(v))); }
        if let Some(v) = patch.source { am.source = Set(blank_to_none(Some(v))); }
        if let Some(v) = patch.notes { am.notes = Set(blank_to_none(Some(v))); }
        if let Some(v) = patch.company_id { am.company_id = Set(Some(v)); }
        if let Some(v) = patch.assigned_to_id { am.assigned_to_id = Set(Some(v)); }
        if let Some(v) = patch.is_active { am.is_active = Set(v); }
        am.updated_at = Set(Utc::now().into());
        am.update(&self.db).await?;
        self.get(id).await
    }

    /// Hard delete, refused while any deal, task, call, note or message references the contact.
    #[instrument(skip(self), fields(contact_id = %id, caller = %caller))]
    pub async fn delete(&self, id: Uuid, caller: Uuid) -> Result<(), ServiceError> {
        let existing = find_or_404::<contact::Entity, _>(&self.db, id, "Contact").await?;
        ensure_owner(&existing.owner_ids(), caller, "Contact")?;
        let counts = contact_counts(&self.db, id).await?;
        if counts.total() > 0 {
            warn!(contact_id = %id, related = counts.total(), "contact_delete_refused");
            return Err(ServiceError::Conflict(format!(
                "Cannot delete contact with related records (deals: {}, tasks: {}, calls: {}, notes: {}, messages: {})",
                counts.deals, counts.tasks, counts.calls, counts.notes, counts.messages
            )));
        }
        contact::Entity::delete_by_id(id).exec(&self.db).await?;
        info!(contact_id = %id, "contact_deleted");
        Ok(())
    }

    /// Soft delete: hide from default listings, keep every reference intact.
    #[instrument(skip(self), fields(contact_id = %id, caller = %caller))]
    pub async fn deactivate(&self, id: Uuid, caller: Uuid) -> Result<contact::Model, ServiceError> {
        let existing = find_or_404::<contact::Entity, _>(&self.db, id, "Contact").await?;
        ensure_owner(&existing.owner_ids(), caller, "Contact")?;
        let mut am = existing.into_active_model();
        am.is_active = Set(false);
        am.updated_at = Set(Utc::now().into());
        Ok(am.update(&self.db).await?)
    }

    pub async fn stats(&self, id: Uuid) -> Result<ContactStats, ServiceError> {
        find_or_404::<contact::Entity, _>(&self.db, id, "Contact").await?;
        let deals = deal::Entity::find().filter(deal::Column::ContactId.eq(id)).all(&self.db).await?;
        let tasks = task::Entity::find().filter(task::Column::ContactId.eq(id)).all(&self.db).await?;
        Ok(ContactStats::from_rows(&deals, &tasks, Utc::now().into()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{get_db, limits, seed_user};
    use chrono::Duration;

    fn named(first: &str, last: &str) -> CreateContact {
        CreateContact { first_name: first.into(), last_name: last.into(), ..Default::default() }
    }

    #[tokio::test]
    async fn pages_partition_the_result_set() -> Result<(), anyhow::Error> {
        let db = get_db().await?;
        let u = seed_user(&db, "Rep").await?;
        let svc = ContactService::new(db, limits());
        for i in 0..7 {
            svc.create(named(&format!("C{}", i), "Same"), u.id).await?;
        }
        let mut seen = Vec::new();
        for page in 1..=3 {
            let p = svc.list(&ContactFilter::default(), Pagination::new(page, 3)).await?;
            assert_eq!(p.pagination.total, 7);
            assert_eq!(p.pagination.total_pages, 3);
            seen.extend(p.data.into_iter().map(|i| i.contact.id));
        }
        assert_eq!(seen.len(), 7);
        seen.sort();
        seen.dedup();
        assert_eq!(seen.len(), 7);
        Ok(())
    }

    #[tokio::test]
    async fn pages_past_the_end_are_empty() -> Result<(), anyhow::Error> {
        let db = get_db().await?;
        let u = seed_user(&db, "Rep").await?;
        let svc = ContactService::new(db, limits());
        svc.create(named("Only", "One"), u.id).await?;

        let p = svc.list(&ContactFilter::default(), Pagination::new(u64::MAX / 2, 20)).await?;
        assert!(p.data.is_empty());
        assert_eq!(p.pagination.total, 1);

        let p = svc.list(&ContactFilter::default(), Pagination::new(2, 20)).await?;
        assert!(p.data.is_empty());
        Ok(())
    }

    #[tokio::test]
    async fn search_is_case_insensitive_and_reaches_company_name() -> Result<(), anyhow::Error> {
        let db = get_db().await?;
        let u = seed_user(&db, "Rep").await?;
        let co = models::company::create(&db, models::company::NewCompany { name: "Globex".into(), created_by_id: u.id, ..Default::default() }).await?;
        let svc = ContactService::new(db, limits());
        let ada = svc.create(CreateContact { email: Some("ADA@Example.com".into()), ..named("Ada", "Lovelace") }, u.id).await?;
        let hank = svc.create(CreateContact { company_id: Some(co.id), ..named("Hank", "Scorpio") }, u.id).await?;

        let by_email = svc.list(&ContactFilter { search: Some("ada@EX".into()), ..Default::default() }, Pagination::default()).await?;
        assert_eq!(by_email.data.len(), 1);
        assert_eq!(by_email.data[0].contact.id, ada.contact.id);

        let by_company = svc.list(&ContactFilter { search: Some("glob".into()), ..Default::default() }, Pagination::default()).await?;
        assert_eq!(by_company.data.len(), 1);
        assert_eq!(by_company.data[0].contact.id, hank.contact.id);
        assert_eq!(by_company.data[0].company.as_ref().map(|c| c.name.as_str()), Some("Globex"));
        Ok(())
    }

    #[tokio::test]
    async fn duplicate_email_conflicts() -> Result<(), anyhow::Error> {
        let db = get_db().await?;
        let u = seed_user(&db, "Rep").await?;
        let svc = ContactService::new(db, limits());
        svc.create(CreateContact { email: Some("dup@example.com".into()), ..named("A", "") }, u.id).await?;
        let err = svc.create(CreateContact { email: Some("Dup@Example.com".into()), ..named("B", "") }, u.id).await.unwrap_err();
        assert!(matches!(err, ServiceError::Conflict(_)));
        Ok(())
    }

    #[tokio::test]
    async fn unknown_company_is_not_found() -> Result<(), anyhow::Error> {
        let db = get_db().await?;
        let u = seed_user(&db, "Rep").await?;
        let svc = ContactService::new(db, limits());
        let err = svc.create(CreateContact { company_id: Some(Uuid::new_v4()), ..named("A", "B") }, u.id).await.unwrap_err();
        assert_eq!(err.to_string(), "Company not found");
        Ok(())
    }

    #[tokio::test]
    async fn delete_is_refused_while_activity_exists() -> Result<(), anyhow::Error> {
        let db = get_db().await?;
        let u = seed_user(&db, "Rep").await?;
        let svc = ContactService::new(db.clone(), limits());
        let c = svc.create(named("Ada", "Lovelace"), u.id).await?;
        models::note::create(&db, models::note::NewNote { content: "met at expo".into(), contact_id: Some(c.contact.id), deal_id: None, author_id: u.id }).await?;

        let err = svc.delete(c.contact.id, u.id).await.unwrap_err();
        assert!(matches!(err, ServiceError::Conflict(_)));
        assert!(svc.get(c.contact.id).await.is_ok());

        let empty = svc.create(named("Solo", ""), u.id).await?;
        svc.delete(empty.contact.id, u.id).await?;
        assert!(matches!(svc.get(empty.contact.id).await.unwrap_err(), ServiceError::NotFound(_)));
        Ok(())
    }

    #[tokio::test]
    async fn non_owner_cannot_modify() -> Result<(), anyhow::Error> {
        let db = get_db().await?;
        let owner = seed_user(&db, "Owner").await?;
        let assignee = seed_user(&db, "Assignee").await?;
        let stranger = seed_user(&db, "Stranger").await?;
        let svc = ContactService::new(db, limits());
        let c = svc.create(CreateContact { assigned_to_id: Some(assignee.id), ..named("Ada", "") }, owner.id).await?;

        let err = svc.update(c.contact.id, UpdateContact { phone: Some("1".into()), ..Default::default() }, stranger.id).await.unwrap_err();
        assert!(matches!(err, ServiceError::Forbidden(_)));
        let updated = svc.update(c.contact.id, UpdateContact { phone: Some("1".into()), ..Default::default() }, assignee.id).await?;
        assert_eq!(updated.contact.phone.as_deref(), Some("1"));
        assert!(matches!(svc.delete(c.contact.id, stranger.id).await.unwrap_err(), ServiceError::Forbidden(_)));
        Ok(())
    }

    #[tokio::test]
    async fn deactivated_contacts_leave_default_listing() -> Result<(), anyhow::Error> {
        let db = get_db().await?;
        let u = seed_user(&db, "Rep").await?;
        let svc = ContactService::new(db, limits());
        let c = svc.create(named("Ada", ""), u.id).await?;
        svc.deactivate(c.contact.id, u.id).await?;
        assert_eq!(svc.list(&ContactFilter::default(), Pagination::default()).await?.pagination.total, 0);
        let all = svc.list(&ContactFilter { include_inactive: true, ..Default::default() }, Pagination::default()).await?;
        assert_eq!(all.pagination.total, 1);
        Ok(())
    }

    #[test]
    fn stats_bucket_deals_and_tasks() {
        let now: DateTime<FixedOffset> = Utc::now().into();
        let owner = Uuid::new_v4();
        let mk_deal = |stage, value| deal::Model {
            id: Uuid::new_v4(),
            title: "d".into(),
            value: Some(value),
            currency: "USD".into(),
            stage,
            probability: 0,
            expected_close_date: None,
            actual_close_date: None,
            description: None,
            lost_reason: None,
            company_id: None,
            contact_id: None,
            owner_id: owner,
            created_at: now,
            updated_at: now,
        };
        let mk_task = |status, priority, due: Option<DateTime<FixedOffset>>| task::Model {
            id: Uuid::new_v4(),
            title: "t".into(),
            description: None,
            status,
            priority,
            due_date: due,
            completed_at: None,
            assigned_to_id: owner,
            created_by_id: owner,
            contact_id: None,
            company_id: None,
            deal_id: None,
            created_at: now,
            updated_at: now,
        };
        let deals = vec![
            mk_deal(deal::DealStage::Proposal, 100.0),
            mk_deal(deal::DealStage::ClosedWon, 250.0),
            mk_deal(deal::DealStage::ClosedLost, 50.0),
        ];
        let tasks = vec![
            mk_task(task::TaskStatus::Pending, task::TaskPriority::Urgent, Some(now - Duration::days(1))),
            mk_task(task::TaskStatus::InProgress, task::TaskPriority::Low, Some(now + Duration::days(1))),
            mk_task(task::TaskStatus::Completed, task::TaskPriority::Urgent, Some(now - Duration::days(3))),
            mk_task(task::TaskStatus::Cancelled, task::TaskPriority::High, None),
        ];
        let s = ContactStats::from_rows(&deals, &tasks, now);
        assert_eq!(s.total_deals, 3);
        assert_eq!(s.total_deal_value, 400.0);
        assert_eq!(s.open_deals, 1);
        assert_eq!(s.won_deals, 1);
        assert_eq!(s.won_value, 250.0);
        assert_eq!(s.total_tasks, 4);
        assert_eq!(s.pending_tasks, 2);
        assert_eq!(s.completed_tasks, 1);
        assert_eq!(s.urgent_tasks, 1);
        assert_eq!(s.overdue_tasks, 1);
    }
}
