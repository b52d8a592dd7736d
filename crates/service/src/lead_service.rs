use std::collections::HashMap;

use chrono::{DateTime, FixedOffset, Utc};
use sea_orm::{
    sea_query::{Expr, Func},
    ActiveModelTrait, ActiveValue, ColumnTrait, Condition, ConnectionTrait, DatabaseConnection, EntityTrait,
    FromQueryResult, IntoActiveModel, QueryFilter, QueryOrder, QuerySelect, QueryTrait, Set, TransactionTrait,
};
use serde::{Deserialize, Serialize};
use tracing::{info, instrument, warn};
use uuid::Uuid;

use configs::PaginationConfig;
use models::{company, contact, deal, lead, user};

use crate::bulk::{BulkItemResult, BulkOutcome};
use crate::contact_service::{CompanyRef, ContactRef, ContactService, CreateContact};
use crate::deal_service::{CreateDeal, DealService};
use crate::errors::ServiceError;
use crate::lead_scoring::{calculate_score, ScoreInput};
use crate::pagination::{Page, Pagination};
use crate::query::{
    blank_to_none, contains_ci, ensure_exists, ensure_owner, fetch_page, find_or_404, search_term, user_summaries,
};

#[derive(Clone, Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LeadFilter {
    pub search: Option<String>,
    pub status: Option<lead::LeadStatus>,
    pub source: Option<String>,
    pub assigned_to: Option<Uuid>,
    pub min_score: Option<i32>,
    pub created_from: Option<DateTime<FixedOffset>>,
    pub created_to: Option<DateTime<FixedOffset>>,
    #[serde(default)]
    pub include_converted: bool,
}

#[derive(Clone, Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateLead {
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
}

#[derive(Clone, Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateLead {
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub company: Option<String>,
    pub job_title: Option<String>,
    pub website: Option<String>,
    pub source: Option<String>,
    pub status: Option<lead::LeadStatus>,
    pub notes: Option<String>,
    pub assigned_to_id: Option<Uuid>,
}

impl UpdateLead {
    fn touches_score(&self) -> bool {
        self.email.is_some()
            || self.phone.is_some()
            || self.company.is_some()
            || self.job_title.is_some()
            || self.website.is_some()
            || self.source.is_some()
    }
}

#[derive(Clone, Debug, Default, Deserialize)]
pub struct BulkUpdateLeads {
    pub ids: Vec<Uuid>,
    #[serde(alias = "data")]
    pub patch: UpdateLead,
}

/// How a lead becomes a contact/company/deal triple.
#[derive(Clone, Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConvertLead {
    /// Link an existing contact instead of creating one.
    pub contact_id: Option<Uuid>,
    /// Link an existing company instead of creating one.
    pub company_id: Option<Uuid>,
    /// Overrides the lead's free-text company when creating the company.
    pub company_name: Option<String>,
    /// A deal is created only when this is present.
    pub conversion_value: Option<f64>,
    pub deal_title: Option<String>,
    pub deal_stage: Option<deal::DealStage>,
    pub notes: Option<String>,
}

#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ConversionResult {
    pub lead: lead::Model,
    pub contact: Option<contact::Model>,
    pub company: Option<company::Model>,
    pub deal: Option<deal::Model>,
}

#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LeadListItem {
    #[serde(flatten)]
    pub lead: lead::Model,
    pub assigned_to: Option<user::UserSummary>,
}

#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LeadDetail {
    #[serde(flatten)]
    pub lead: lead::Model,
    pub assigned_to: Option<user::UserSummary>,
    pub created_by: Option<user::UserSummary>,
    pub converted_contact: Option<ContactRef>,
    pub converted_company: Option<CompanyRef>,
    pub converted_deal: Option<deal::Model>,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusCount {
    pub status: lead::LeadStatus,
    pub count: u64,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LeadStats {
    pub total: u64,
    pub by_status: Vec<StatusCount>,
    pub converted: u64,
    pub average_score: f64,
    /// converted / total, 0 when there are no leads
    pub conversion_rate: f64,
}

#[derive(Debug, FromQueryResult)]
struct StatusRow {
    status: lead::LeadStatus,
    count: i64,
    score_sum: Option<i64>,
}

fn current(v: &ActiveValue<Option<String>>) -> Option<String> {
    match v {
        ActiveValue::Set(x) | ActiveValue::Unchanged(x) => x.clone(),
        ActiveValue::NotSet => None,
    }
}

fn score_of(m: &lead::ActiveModel) -> i32 {
    let (email, phone, company, job_title, website, source) = (
        current(&m.email),
        current(&m.phone),
        current(&m.company),
        current(&m.job_title),
        current(&m.website),
        current(&m.source),
    );
    calculate_score(&ScoreInput {
        email: email.as_deref(),
        phone: phone.as_deref(),
        company: company.as_deref(),
        job_title: job_title.as_deref(),
        website: website.as_deref(),
        source: source.as_deref(),
    })
}

/// Appends `line` to existing notes on a new line.
fn append_note(existing: Option<String>, line: &str) -> String {
    match existing.filter(|n| !n.trim().is_empty()) {
        Some(n) => format!("{}\n{}", n, line),
        None => line.to_string(),
    }
}

#[derive(Clone)]
pub struct LeadService {
    db: DatabaseConnection,
    limits: PaginationConfig,
}

impl LeadService {
    pub fn new(db: DatabaseConnection, limits: PaginationConfig) -> Self { Self { db, limits } }

    pub async fn list(&self, filter: &LeadFilter, pagination: Pagination) -> Result<Page<LeadListItem>, ServiceError> {
        let (page, limit) = pagination.normalize(&self.limits);
        let mut cond = Condition::all();
        let wants_converted = filter.include_converted || filter.status == Some(lead::LeadStatus::Converted);
        if !wants_converted {
            cond = cond.add(lead::Column::IsConverted.eq(false));
        }
        if let Some(status) = filter.status {
            cond = cond.add(lead::Column::Status.eq(status));
        }
        if let Some(source) = blank_to_none(filter.source.clone()) {
            cond = cond.add(Expr::expr(Func::lower(Expr::col((lead::Entity, lead::Column::Source)))).eq(source.to_lowercase()));
        }
        if let Some(assignee) = filter.assigned_to {
            cond = cond.add(lead::Column::AssignedToId.eq(assignee));
        }
        if let Some(min) = filter.min_score {
            cond = cond.add(lead::Column::Score.gte(min));
        }
        if let Some(from) = filter.created_from {
            cond = cond.add(lead::Column::CreatedAt.gte(from));
        }
        if let Some(to) = filter.created_to {
            cond = cond.add(lead::Column::CreatedAt.lte(to));
        }
        if let Some(term) = search_term(&filter.search) {
            cond = cond.add(
                Condition::any()
                    .add(contains_ci(lead::Entity, lead::Column::FirstName, term))
                    .add(contains_ci(lead::Entity, lead::Column::LastName, term))
                    .add(contains_ci(lead::Entity, lead::Column::Email, term))
                    .add(contains_ci(lead::Entity, lead::Column::Company, term))
                    .add(contains_ci(lead::Entity, lead::Column::JobTitle, term)),
            );
        }
        let select = lead::Entity::find()
            .filter(cond)
            .order_by_desc(lead::Column::CreatedAt)
            .order_by_asc(lead::Column::Id);
        let (rows, meta) = fetch_page(&self.db, select, page, limit).await?;
        let users = user_summaries(&self.db, rows.iter().filter_map(|l| l.assigned_to_id)).await?;
        let data = rows
            .into_iter()
            .map(|l| LeadListItem { assigned_to: l.assigned_to_id.and_then(|id| users.get(&id).cloned()), lead: l })
            .collect();
        Ok(Page { data, pagination: meta })
    }

    pub async fn get(&self, id: Uuid) -> Result<LeadDetail, ServiceError> {
        let lead = find_or_404::<lead::Entity, _>(&self.db, id, "Lead").await?;
        let users = user_summaries(&self.db, [Some(lead.created_by_id), lead.assigned_to_id].into_iter().flatten()).await?;
        let converted_contact = match lead.converted_contact_id {
            Some(cid) => contact::Entity::find_by_id(cid).one(&self.db).await?.as_ref().map(ContactRef::from),
            None => None,
        };
        let converted_company = match lead.converted_company_id {
            Some(cid) => company::Entity::find_by_id(cid).one(&self.db).await?.as_ref().map(CompanyRef::from),
            None => None,
        };
        let converted_deal = match lead.converted_deal_id {
            Some(did) => deal::Entity::find_by_id(did).one(&self.db).await?,
            None => None,
        };
        Ok(LeadDetail {
            assigned_to: lead.assigned_to_id.and_then(|id| users.get(&id).cloned()),
            created_by: users.get(&lead.created_by_id).cloned(),
            converted_contact,
            converted_company,
            converted_deal,
            lead,
        })
    }

    #[instrument(skip(self, input), fields(caller = %caller))]
    pub async fn create(&self, input: CreateLead, caller: Uuid) -> Result<LeadDetail, ServiceError> {
        ensure_exists::<user::Entity, _>(&self.db, input.assigned_to_id, "Assigned user").await?;
        let email = blank_to_none(input.email);
        let phone = blank_to_none(input.phone);
        let company = blank_to_none(input.company);
        let job_title = blank_to_none(input.job_title);
        let website = blank_to_none(input.website);
        let source = blank_to_none(input.source);
        let score = calculate_score(&ScoreInput {
            email: email.as_deref(),
            phone: phone.as_deref(),
            company: company.as_deref(),
            job_title: job_title.as_deref(),
            website: website.as_deref(),
            source: source.as_deref(),
        });
        let created = lead::create(
            &self.db,
            lead::NewLead {
                first_name: blank_to_none(input.first_name),
                last_name: blank_to_none(input.last_name),
                email,
                phone,
                company,
                job_title,
                website,
                source,
                notes: blank_to_none(input.notes),
                assigned_to_id: input.assigned_to_id,
                created_by_id: caller,
                score,
            },
        )
        .await?;
        info!(lead_id = %created.id, score = created.score, "lead_created");
        self.get(created.id).await
    }

    async fn apply_update<C: ConnectionTrait>(db: &C, id: Uuid, patch: UpdateLead, caller: Uuid) -> Result<lead::Model, ServiceError> {
        let existing = find_or_404::<lead::Entity, _>(db, id, "Lead").await?;
        ensure_owner(&existing.owner_ids(), caller, "Lead")?;
        ensure_exists::<user::Entity, _>(db, patch.assigned_to_id, "Assigned user").await?;
        if patch.status == Some(lead::LeadStatus::Converted) && !existing.is_converted {
            return Err(ServiceError::Validation("Use the convert operation to convert a lead".into()));
        }

        let rescore = patch.touches_score();
        let mut am = existing.into_active_model();
        if let Some(v) = patch.first_name { am.first_name = Set(blank_to_none(Some(v))); }
        if let Some(v) = patch.last_name { am.last_name = Set(blank_to_none(Some(v))); }
        if let Some(v) = patch.email { am.email = Set(blank_to_none(Some(v)).map(|e| e.to_lowercase())); }
        if let Some(v) = patch.phone { am.phone = Set(blank_to_none(Some(v))); }
        if let Some(v) = patch.company { am.company = Set(blank_to_none(Some(v))); }
        if let Some(v) = patch.job_title { am.job_title = Set(blank_to_none(Some(v))); }
        if let Some(v) = patch.website { am.website = Set(blank_to_none(Some(v))); }
        if let Some(v) = patch.source { am.source = Set(blank_to_none(Some(v))); }
        if let Some(v) = patch.notes { am.notes = Set(blank_to_none(Some(v))); }
        if let Some(v) = patch.status { am.status = Set(v); }
        if let Some(v) = patch.assigned_to_id { am.assigned_to_id = Set(Some(v)); }

        lead::validate_identity(&current(&am.first_name), &current(&am.last_name), &current(&am.email), &current(&am.company))?;
        if rescore {
            am.score = Set(score_of(&am));
        }
        am.updated_at = Set(Utc::now().into());
        Ok(am.update(db).await?)
    }

    #[instrument(skip(self, patch), fields(lead_id = %id, caller = %caller))]
    pub async fn update(&self, id: Uuid, patch: UpdateLead, caller: Uuid) -> Result<LeadDetail, ServiceError> {
        let updated = Self::apply_update(&self.db, id, patch, caller).await?;
        info!(lead_id = %id, score = updated.score, "lead_updated");
        self.get(id).await
    }

    #[instrument(skip(self), fields(lead_id = %id, caller = %caller))]
    pub async fn delete(&self, id: Uuid, caller: Uuid) -> Result<(), ServiceError> {
        let existing = find_or_404::<lead::Entity, _>(&self.db, id, "Lead").await?;
        ensure_owner(&existing.owner_ids(), caller, "Lead")?;
        lead::Entity::delete_by_id(id).exec(&self.db).await?;
        info!(lead_id = %id, "lead_deleted");
        Ok(())
    }

    #[instrument(skip(self, req), fields(caller = %caller, items = req.ids.len()))]
    pub async fn bulk_update(&self, req: BulkUpdateLeads, caller: Uuid) -> Result<BulkOutcome, ServiceError> {
        let txn = self.db.begin().await?;
        let mut results = Vec::with_capacity(req.ids.len());
        for id in req.ids {
            let sp = txn.begin().await?;
            match Self::apply_update(&sp, id, req.patch.clone(), caller).await {
                Ok(_) => {
                    sp.commit().await?;
                    results.push(BulkItemResult::ok(id));
                }
                Err(e) if e.is_client_error() => {
                    sp.rollback().await?;
                    warn!(lead_id = %id, error = %e, "bulk_item_failed");
                    results.push(BulkItemResult::failed(id, &e));
                }
                Err(e) => {
                    sp.rollback().await?;
                    txn.rollback().await?;
                    return Err(e);
                }
            }
        }
        txn.commit().await?;
        let outcome = BulkOutcome::new(results);
        info!(succeeded = outcome.succeeded, failed = outcome.failed, "lead_bulk_update_done");
        Ok(outcome)
    }

    /// Turn a lead into a contact, a company and optionally a deal. All writes share one
    /// transaction; any failure leaves no trace.
    #[instrument(skip(self, plan), fields(lead_id = %id, caller = %caller))]
    pub async fn convert(&self, id: Uuid, plan: ConvertLead, caller: Uuid) -> Result<ConversionResult, ServiceError> {
        let txn = self.db.begin().await?;
        match Self::convert_in(&txn, id, plan, caller).await {
            Ok(result) => {
                txn.commit().await?;
                info!(
                    lead_id = %id,
                    contact_id = ?result.contact.as_ref().map(|c| c.id),
                    company_id = ?result.company.as_ref().map(|c| c.id),
                    deal_id = ?result.deal.as_ref().map(|d| d.id),
                    "lead_converted"
                );
                Ok(result)
            }
            Err(e) => {
                txn.rollback().await?;
                warn!(lead_id = %id, error = %e, "lead_conversion_rolled_back");
                Err(e)
            }
        }
    }

    async fn convert_in<C: ConnectionTrait>(db: &C, id: Uuid, plan: ConvertLead, caller: Uuid) -> Result<ConversionResult, ServiceError> {
        let existing = find_or_404::<lead::Entity, _>(db, id, "Lead").await?;
        ensure_owner(&existing.owner_ids(), caller, "Lead")?;
        if existing.is_converted {
            return Err(ServiceError::Validation("Lead is already converted".into()));
        }

        let company_name = blank_to_none(plan.company_name.clone()).or_else(|| blank_to_none(existing.company.clone()));
        let person = existing.display_name().or_else(|| existing.email.clone());
        let contact_nameable = plan.contact_id.is_some() || person.is_some();
        let company_nameable = plan.company_id.is_some() || company_name.is_some();
        if !contact_nameable && !company_nameable {
            return Err(ServiceError::Validation("Lead has no name or company to convert into".into()));
        }

        let company = match (plan.company_id, company_name.as_deref()) {
            (Some(cid), _) => Some(find_or_404::<company::Entity, _>(db, cid, "Company").await?),
            (None, Some(name)) => {
                let existing_company = company::Entity::find()
                    .filter(company::Column::IsActive.eq(true))
                    .filter(Expr::expr(Func::lower(Expr::col((company::Entity, company::Column::Name)))).eq(name.to_lowercase()))
                    .one(db)
                    .await?;
                match existing_company {
                    Some(c) => Some(c),
                    None => Some(
                        company::create(
                            db,
                            company::NewCompany {
                                name: name.to_string(),
                                website: existing.website.clone(),
                                phone: existing.phone.clone(),
                                created_by_id: caller,
                                ..Default::default()
                            },
                        )
                        .await?,
                    ),
                }
            }
            (None, None) => None,
        };

        let contact = match plan.contact_id {
            Some(cid) => Some(find_or_404::<contact::Entity, _>(db, cid, "Contact").await?),
            None if existing.display_name().is_some() || existing.email.is_some() => {
                let (first_name, last_name) = match (&existing.first_name, &existing.last_name) {
                    (None, None) => {
                        let email = existing.email.clone().unwrap_or_default();
                        (email.split('@').next().unwrap_or_default().to_string(), String::new())
                    }
                    (f, l) => (f.clone().unwrap_or_default(), l.clone().unwrap_or_default()),
                };
                let created = ContactService::insert(
                    db,
                    CreateContact {
                        first_name,
                        last_name,
                        email: existing.email.clone(),
                        phone: existing.phone.clone(),
                        job_title: existing.job_title.clone(),
                        source: existing.source.clone(),
                        notes: None,
                        company_id: company.as_ref().map(|c| c.id),
                        assigned_to_id: existing.assigned_to_id,
                    },
                    caller,
                )
                .await?;
                Some(created)
            }
            None => None,
        };

        let deal = match plan.conversion_value {
            Some(value) => {
                let title = blank_to_none(plan.deal_title.clone()).unwrap_or_else(|| {
                    let base = company.as_ref().map(|c| c.name.clone()).or(person.clone()).unwrap_or_else(|| "Converted lead".into());
                    format!("{} deal", base)
                });
                let created = DealService::insert(
                    db,
                    CreateDeal {
                        title,
                        value: Some(value),
                        stage: plan.deal_stage,
                        company_id: company.as_ref().map(|c| c.id),
                        contact_id: contact.as_ref().map(|c| c.id),
                        ..Default::default()
                    },
                    caller,
                )
                .await?;
                Some(created)
            }
            None => None,
        };

        let now = Utc::now();
        let mut line = format!("Converted on {}", now.format("%Y-%m-%d"));
        if let Some(extra) = blank_to_none(plan.notes) {
            line.push_str(": ");
            line.push_str(&extra);
        }
        let notes = append_note(existing.notes.clone(), &line);
        let mut am = existing.into_active_model();
        am.status = Set(lead::LeadStatus::Converted);
        am.is_converted = Set(true);
        am.converted_at = Set(Some(now.into()));
        am.converted_contact_id = Set(contact.as_ref().map(|c| c.id));
        am.converted_company_id = Set(company.as_ref().map(|c| c.id));
        am.converted_deal_id = Set(deal.as_ref().map(|d| d.id));
        am.notes = Set(Some(notes));
        am.updated_at = Set(now.into());
        let lead = am.update(db).await?;
        Ok(ConversionResult { lead, contact, company, deal })
    }

    pub async fn stats(&self, assigned_to: Option<Uuid>) -> Result<LeadStats, ServiceError> {
        let mut q = lead::Entity::find()
            .select_only()
            .column(lead::Column::Status)
            .column_as(Expr::col(lead::Column::Id).count(), "count")
            .column_as(Expr::col(lead::Column::Score).sum(), "score_sum")
            .group_by(lead::Column::Status);
        if let Some(user) = assigned_to {
            q = q.filter(lead::Column::AssignedToId.eq(user));
        }
        let rows = q.into_model::<StatusRow>().all(&self.db).await?;
        let converted = lead::Entity::find()
            .select_only()
            .column_as(Expr::col(lead::Column::Id).count(), "n")
            .filter(lead::Column::IsConverted.eq(true))
            .apply_if(assigned_to, |q, user| q.filter(lead::Column::AssignedToId.eq(user)))
            .into_tuple::<i64>()
            .one(&self.db)
            .await?
            .unwrap_or(0);
        Ok(summarize_leads(
            rows.into_iter().map(|r| (r.status, r.count.max(0) as u64, r.score_sum.unwrap_or(0))),
            converted.max(0) as u64,
        ))
    }
}

fn summarize_leads(rows: impl IntoIterator<Item = (lead::LeadStatus, u64, i64)>, converted: u64) -> LeadStats {
    use sea_orm::Iterable;

    let by_status: HashMap<lead::LeadStatus, (u64, i64)> = rows.into_iter().map(|(s, c, sum)| (s, (c, sum))).collect();
    let total: u64 = by_status.values().map(|(c, _)| *c).sum();
    let score_sum: i64 = by_status.values().map(|(_, s)| *s).sum();
    let by_status = lead::LeadStatus::iter()
        .map(|status| StatusCount { status, count: by_status.get(&status).map(|(c, _)| *c).unwrap_or(0) })
        .collect();
    let (average_score, conversion_rate) = if total == 0 {
        (0.0, 0.0)
    } else {
        (score_sum as f64 / total as f64, converted as f64 / total as f64)
    };
    LeadStats { total, by_status, converted, average_score, conversion_rate }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{get_db, limits, seed_user};
    use sea_orm::PaginatorTrait;

    fn lead_with(first: &str, email: Option<&str>, source: Option<&str>) -> CreateLead {
        CreateLead {
            first_name: Some(first.into()),
            email: email.map(Into::into),
            source: source.map(Into::into),
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn score_is_computed_on_create_and_update() -> Result<(), anyhow::Error> {
        let db = get_db().await?;
        let u = seed_user(&db, "Rep").await?;
        let svc = LeadService::new(db, limits());
        let l = svc.create(lead_with("Ann", Some("ann@x.io"), Some("referral")), u.id).await?;
        assert_eq!(l.lead.score, 50);
        assert_eq!(l.lead.status, lead::LeadStatus::New);

        let l = svc.update(l.lead.id, UpdateLead { phone: Some("555".into()), ..Default::default() }, u.id).await?;
        assert_eq!(l.lead.score, 65);

        let l = svc.update(l.lead.id, UpdateLead { notes: Some("warm".into()), ..Default::default() }, u.id).await?;
        assert_eq!(l.lead.score, 65);

        let l = svc.update(l.lead.id, UpdateLead { email: Some("".into()), ..Default::default() }, u.id).await?;
        assert_eq!(l.lead.score, 45);
        assert!(l.lead.email.is_none());
        Ok(())
    }

    #[tokio::test]
    async fn list_is_newest_first_not_by_score() -> Result<(), anyhow::Error> {
        let db = get_db().await?;
        let u = seed_user(&db, "Rep").await?;
        let svc = LeadService::new(db, limits());
        let hot = svc.create(lead_with("Hot", Some("hot@x.io"), Some("referral")), u.id).await?;
        std::thread::sleep(std::time::Duration::from_millis(5));
        let cold = svc.create(lead_with("Cold", None, None), u.id).await?;
        assert!(hot.lead.score > cold.lead.score);

        let page = svc.list(&LeadFilter::default(), Pagination::default()).await?;
        let ids: Vec<Uuid> = page.data.iter().map(|l| l.lead.id).collect();
        assert_eq!(ids, vec![cold.lead.id, hot.lead.id]);
        Ok(())
    }

    #[tokio::test]
    async fn lead_needs_some_identity() -> Result<(), anyhow::Error> {
        let db = get_db().await?;
        let u = seed_user(&db, "Rep").await?;
        let svc = LeadService::new(db, limits());
        let err = svc.create(CreateLead { phone: Some("555".into()), ..Default::default() }, u.id).await.unwrap_err();
        assert!(err.is_client_error());
        Ok(())
    }

    #[tokio::test]
    async fn conversion_creates_contact_company_and_deal() -> Result<(), anyhow::Error> {
        let db = get_db().await?;
        let u = seed_user(&db, "Rep").await?;
        let svc = LeadService::new(db.clone(), limits());
        let l = svc.create(lead_with("Ann", Some("ann@x.io"), None), u.id).await?;

        let plan = ConvertLead { company_name: Some("Initech".into()), conversion_value: Some(5000.0), ..Default::default() };
        let res = svc.convert(l.lead.id, plan, u.id).await?;
        let company = res.company.expect("company");
        let contact = res.contact.expect("contact");
        let deal = res.deal.expect("deal");
        assert_eq!(company.name, "Initech");
        assert_eq!(contact.company_id, Some(company.id));
        assert_eq!(deal.title, "Initech deal");
        assert_eq!(deal.value, Some(5000.0));
        assert_eq!(deal.contact_id, Some(contact.id));
        assert!(res.lead.is_converted);
        assert_eq!(res.lead.status, lead::LeadStatus::Converted);
        assert_eq!(res.lead.converted_deal_id, Some(deal.id));
        assert!(res.lead.notes.as_deref().unwrap_or("").starts_with("Converted on"));

        assert_eq!(contact::Entity::find().count(&db).await?, 1);
        assert_eq!(company::Entity::find().count(&db).await?, 1);
        assert_eq!(deal::Entity::find().count(&db).await?, 1);

        let again = svc.convert(l.lead.id, ConvertLead::default(), u.id).await.unwrap_err();
        assert_eq!(again.to_string(), "Lead is already converted");

        let hidden = svc.list(&LeadFilter::default(), Pagination::default()).await?;
        assert_eq!(hidden.pagination.total, 0);
        let shown = svc.list(&LeadFilter { include_converted: true, ..Default::default() }, Pagination::default()).await?;
        assert_eq!(shown.pagination.total, 1);
        Ok(())
    }

    #[tokio::test]
    async fn failed_conversion_leaves_no_side_effects() -> Result<(), anyhow::Error> {
        let db = get_db().await?;
        let u = seed_user(&db, "Rep").await?;
        let svc = LeadService::new(db.clone(), limits());
        let l = svc.create(lead_with("Ann", Some("ann@x.io"), None), u.id).await?;

        // the deal insert fails after contact and company were written
        let plan = ConvertLead { company_name: Some("Initech".into()), conversion_value: Some(-1.0), ..Default::default() };
        assert!(svc.convert(l.lead.id, plan, u.id).await.is_err());

        assert_eq!(contact::Entity::find().count(&db).await?, 0);
        assert_eq!(company::Entity::find().count(&db).await?, 0);
        assert_eq!(deal::Entity::find().count(&db).await?, 0);
        let reread = svc.get(l.lead.id).await?;
        assert!(!reread.lead.is_converted);
        assert_eq!(reread.lead.status, lead::LeadStatus::New);
        Ok(())
    }

    #[tokio::test]
    async fn conversion_without_value_creates_no_deal() -> Result<(), anyhow::Error> {
        let db = get_db().await?;
        let u = seed_user(&db, "Rep").await?;
        let svc = LeadService::new(db, limits());
        let l = svc.create(CreateLead { company: Some("Umbrella".into()), ..Default::default() }, u.id).await?;
        let res = svc.convert(l.lead.id, ConvertLead::default(), u.id).await?;
        assert!(res.deal.is_none());
        assert!(res.contact.is_none());
        assert_eq!(res.company.map(|c| c.name).as_deref(), Some("Umbrella"));
        Ok(())
    }

    #[tokio::test]
    async fn stranger_cannot_touch_a_lead() -> Result<(), anyhow::Error> {
        let db = get_db().await?;
        let owner = seed_user(&db, "Owner").await?;
        let stranger = seed_user(&db, "Stranger").await?;
        let svc = LeadService::new(db, limits());
        let l = svc.create(lead_with("Ann", None, None), owner.id).await?;

        let err = svc.update(l.lead.id, UpdateLead { first_name: Some("Eve".into()), ..Default::default() }, stranger.id).await.unwrap_err();
        assert!(matches!(err, ServiceError::Forbidden(_)));
        assert!(matches!(svc.delete(l.lead.id, stranger.id).await.unwrap_err(), ServiceError::Forbidden(_)));
        assert!(matches!(svc.convert(l.lead.id, ConvertLead::default(), stranger.id).await.unwrap_err(), ServiceError::Forbidden(_)));
        assert_eq!(svc.get(l.lead.id).await?.lead.first_name.as_deref(), Some("Ann"));
        Ok(())
    }

    #[tokio::test]
    async fn bulk_status_update_and_stats() -> Result<(), anyhow::Error> {
        let db = get_db().await?;
        let u = seed_user(&db, "Rep").await?;
        let svc = LeadService::new(db, limits());
        let a = svc.create(lead_with("A", Some("a@x.io"), Some("referral")), u.id).await?;
        let b = svc.create(lead_with("B", None, None), u.id).await?;

        let outcome = svc
            .bulk_update(
                BulkUpdateLeads {
                    ids: vec![a.lead.id, Uuid::new_v4(), b.lead.id],
                    patch: UpdateLead { status: Some(lead::LeadStatus::Qualified), ..Default::default() },
                },
                u.id,
            )
            .await?;
        assert_eq!((outcome.succeeded, outcome.failed), (2, 1));
        assert_eq!(outcome.results[1].error.as_deref(), Some("Lead not found"));

        let stats = svc.stats(None).await?;
        assert_eq!(stats.total, 2);
        assert_eq!(stats.converted, 0);
        assert_eq!(stats.average_score, 27.5);
        let qualified = stats.by_status.iter().find(|s| s.status == lead::LeadStatus::Qualified).map(|s| s.count);
        assert_eq!(qualified, Some(2));
        Ok(())
    }

    #[test]
    fn notes_are_appended_on_a_new_line() {
        assert_eq!(append_note(None, "x"), "x");
        assert_eq!(append_note(Some("a".into()), "x"), "a\nx");
    }
}
