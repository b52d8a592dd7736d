use std::collections::HashMap;

use chrono::{DateTime, FixedOffset, Utc};
use sea_orm::{
    sea_query::Expr, ActiveModelTrait, ColumnTrait, Condition, ConnectionTrait, DatabaseConnection, EntityTrait,
    FromQueryResult, IntoActiveModel, JoinType, QueryFilter, QueryOrder, QuerySelect, RelationTrait, Set,
    TransactionTrait,
};
use serde::{Deserialize, Serialize};
use tracing::{info, instrument, warn};
use uuid::Uuid;

use configs::PaginationConfig;
use models::{company, contact, deal, note, task, user};

use crate::bulk::{BulkItemResult, BulkOutcome};
use crate::company_service::RELATED_LIMIT;
use crate::contact_service::{CompanyRef, ContactRef};
use crate::errors::ServiceError;
use crate::pagination::{Page, Pagination};
use crate::query::{
    blank_to_none, contains_ci, ensure_exists, ensure_owner, fetch_page, find_or_404, search_term, user_summaries,
};

#[derive(Clone, Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DealFilter {
    pub search: Option<String>,
    pub stage: Option<deal::DealStage>,
    pub owner_id: Option<Uuid>,
    pub company_id: Option<Uuid>,
    pub contact_id: Option<Uuid>,
    pub min_value: Option<f64>,
    pub max_value: Option<f64>,
    /// Expected close date window.
    pub close_from: Option<DateTime<FixedOffset>>,
    pub close_to: Option<DateTime<FixedOffset>>,
}

#[derive(Clone, Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateDeal {
    pub title: String,
    pub value: Option<f64>,
    pub currency: Option<String>,
    pub stage: Option<deal::DealStage>,
    pub probability: Option<i32>,
    pub expected_close_date: Option<DateTime<FixedOffset>>,
    pub description: Option<String>,
    pub company_id: Option<Uuid>,
    pub contact_id: Option<Uuid>,
}

#[derive(Clone, Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateDeal {
    pub title: Option<String>,
    pub value: Option<f64>,
    pub currency: Option<String>,
    pub stage: Option<deal::DealStage>,
    pub probability: Option<i32>,
    pub expected_close_date: Option<DateTime<FixedOffset>>,
    pub description: Option<String>,
    pub lost_reason: Option<String>,
    pub company_id: Option<Uuid>,
    pub contact_id: Option<Uuid>,
    pub owner_id: Option<Uuid>,
}

#[derive(Clone, Debug, Default, Deserialize)]
pub struct BulkUpdateDeals {
    pub ids: Vec<Uuid>,
    #[serde(alias = "data")]
    pub patch: UpdateDeal,
}

#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DealListItem {
    #[serde(flatten)]
    pub deal: deal::Model,
    pub company: Option<CompanyRef>,
    pub contact: Option<ContactRef>,
    pub owner: Option<user::UserSummary>,
}

#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DealDetail {
    #[serde(flatten)]
    pub deal: deal::Model,
    pub company: Option<company::Model>,
    pub contact: Option<contact::Model>,
    pub owner: Option<user::UserSummary>,
    pub tasks: Vec<task::Model>,
    pub notes: Vec<note::Model>,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StageSummary {
    pub stage: deal::DealStage,
    pub count: u64,
    pub value: f64,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PipelineSummary {
    /// Every stage in pipeline order, zero-filled.
    pub stages: Vec<StageSummary>,
    pub total_count: u64,
    pub total_value: f64,
    pub open_value: f64,
}

#[derive(Debug, FromQueryResult)]
struct StageRow {
    stage: deal::DealStage,
    count: i64,
    total: Option<f64>,
}

/// Probability and close date implied by moving from `old` to `new`.
/// Entering a closed stage pins the probability and stamps the close date if absent;
/// reopening clears the close date.
pub fn stage_effects(
    old: deal::DealStage,
    new: deal::DealStage,
    close_date: Option<DateTime<FixedOffset>>,
    now: DateTime<FixedOffset>,
) -> (Option<i32>, Option<DateTime<FixedOffset>>) {
    match deal::closing_probability(new) {
        Some(p) => (Some(p), close_date.or(Some(now))),
        None if old.is_closed() => (None, None),
        None => (None, close_date),
    }
}

#[derive(Clone)]
pub struct DealService {
    db: DatabaseConnection,
    limits: PaginationConfig,
}

impl DealService {
    pub fn new(db: DatabaseConnection, limits: PaginationConfig) -> Self { Self { db, limits } }

    pub async fn list(&self, filter: &DealFilter, pagination: Pagination) -> Result<Page<DealListItem>, ServiceError> {
        let (page, limit) = pagination.normalize(&self.limits);
        let mut cond = Condition::all();
        if let Some(stage) = filter.stage {
            cond = cond.add(deal::Column::Stage.eq(stage));
        }
        if let Some(owner) = filter.owner_id {
            cond = cond.add(deal::Column::OwnerId.eq(owner));
        }
        if let Some(id) = filter.company_id {
            cond = cond.add(deal::Column::CompanyId.eq(id));
        }
        if let Some(id) = filter.contact_id {
            cond = cond.add(deal::Column::ContactId.eq(id));
        }
        if let Some(min) = filter.min_value {
            cond = cond.add(deal::Column::Value.gte(min));
        }
        if let Some(max) = filter.max_value {
            cond = cond.add(deal::Column::Value.lte(max));
        }
        if let Some(from) = filter.close_from {
            cond = cond.add(deal::Column::ExpectedCloseDate.gte(from));
        }
        if let Some(to) = filter.close_to {
            cond = cond.add(deal::Column::ExpectedCloseDate.lte(to));
        }
        let mut select = deal::Entity::find();
        if let Some(term) = search_term(&filter.search) {
            select = select.join(JoinType::LeftJoin, deal::Relation::Company.def());
            cond = cond.add(
                Condition::any()
                    .add(contains_ci(deal::Entity, deal::Column::Title, term))
                    .add(contains_ci(deal::Entity, deal::Column::Description, term))
                    .add(contains_ci(company::Entity, company::Column::Name, term)),
            );
        }
        let select = select.filter(cond).order_by_desc(deal::Column::CreatedAt).order_by_asc(deal::Column::Id);
        let (rows, meta) = fetch_page(&self.db, select, page, limit).await?;

        let company_ids: Vec<Uuid> = rows.iter().filter_map(|d| d.company_id).collect();
        let contact_ids: Vec<Uuid> = rows.iter().filter_map(|d| d.contact_id).collect();
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
        let owners = user_summaries(&self.db, rows.iter().map(|d| d.owner_id)).await?;
        let data = rows
            .into_iter()
            .map(|d| DealListItem {
                company: d.company_id.and_then(|id| companies.get(&id).cloned()),
                contact: d.contact_id.and_then(|id| contacts.get(&id).cloned()),
                owner: owners.get(&d.owner_id).cloned(),
                deal: d,
            })
            .collect();
        Ok(Page { data, pagination: meta })
    }

    pub async fn get(&self, id: Uuid) -> Result<DealDetail, ServiceError> {
        let deal = find_or_404::<deal::Entity, _>(&self.db, id, "Deal").await?;
        let company = match deal.company_id {
            Some(cid) => company::Entity::find_by_id(cid).one(&self.db).await?,
            None => None,
        };
        let contact = match deal.contact_id {
            Some(cid) => contact::Entity::find_by_id(cid).one(&self.db).await?,
            None => None,
        };
        let owner = user::Entity::find_by_id(deal.owner_id).one(&self.db).await?.as_ref().map(user::UserSummary::from);
        let tasks = task::Entity::find()
            .filter(task::Column::DealId.eq(id))
            .order_by_desc(task::Column::CreatedAt)
            .limit(RELATED_LIMIT)
            .all(&self.db)
            .await?;
        let notes = note::Entity::find()
            .filter(note::Column::DealId.eq(id))
            .order_by_desc(note::Column::CreatedAt)
            .limit(RELATED_LIMIT)
            .all(&self.db)
            .await?;
        Ok(DealDetail { deal, company, contact, owner, tasks, notes })
    }

    /// Insert a deal owned by `caller`. Usable inside a transaction.
    pub(crate) async fn insert<C: ConnectionTrait>(db: &C, input: CreateDeal, caller: Uuid) -> Result<deal::Model, ServiceError> {
        deal::validate_title(&input.title)?;
        if let Some(v) = input.value {
            deal::validate_value(v)?;
        }
        if let Some(p) = input.probability {
            deal::validate_probability(p)?;
        }
        ensure_exists::<company::Entity, _>(db, input.company_id, "Company").await?;
        ensure_exists::<contact::Entity, _>(db, input.contact_id, "Contact").await?;
        let created = deal::create(
            db,
            deal::NewDeal {
                title: input.title,
                value: input.value,
                currency: input.currency,
                stage: input.stage,
                probability: input.probability,
                expected_close_date: input.expected_close_date,
                description: blank_to_none(input.description),
                company_id: input.company_id,
                contact_id: input.contact_id,
                owner_id: caller,
            },
        )
        .await?;
        Ok(created)
    }

    #[instrument(skip(self, input), fields(caller = %caller))]
    pub async fn create(&self, input: CreateDeal, caller: Uuid) -> Result<DealDetail, ServiceError> {
        let created = Self::insert(&self.db, input, caller).await?;
        info!(deal_id = %created.id, stage = ?created.stage, "deal_created");
        self.get(created.id).await
    }

    /// NotFound, then ownership, then foreign keys, then field validation.
    async fn apply_update<C: ConnectionTrait>(db: &C, id: Uuid, patch: UpdateDeal, caller: Uuid) -> Result<deal::Model, ServiceError> {
        let existing = find_or_404::<deal::Entity, _>(db, id, "Deal").await?;
        ensure_owner(&[Some(existing.owner_id)], caller, "Deal")?;
        ensure_exists::<company::Entity, _>(db, patch.company_id, "Company").await?;
        ensure_exists::<contact::Entity, _>(db, patch.contact_id, "Contact").await?;
        ensure_exists::<user::Entity, _>(db, patch.owner_id, "Owner").await?;

        let old_stage = existing.stage;
        let old_close = existing.actual_close_date;
        let mut am = existing.into_active_model();
        if let Some(title) = patch.title {
            deal::validate_title(&title)?;
            am.title = Set(title.trim().to_string());
        }
        if let Some(v) = patch.value {
            deal::validate_value(v)?;
            am.value = Set(Some(v));
        }
        if let Some(c) = patch.currency {
            am.currency = Set(deal::validate_currency(&c)?);
        }
        if let Some(p) = patch.probability {
            deal::validate_probability(p)?;
            am.probability = Set(p);
        }
        if let Some(stage) = patch.stage {
            let (probability, close_date) = stage_effects(old_stage, stage, old_close, Utc::now().into());
            am.stage = Set(stage);
            if let Some(p) = probability {
                am.probability = Set(p);
            }
            am.actual_close_date = Set(close_date);
        }
        if let Some(d) = patch.expected_close_date { am.expected_close_date = Set(Some(d)); }
        if let Some(v) = patch.description { am.description = Set(blank_to_none(Some(v))); }
        if let Some(v) = patch.lost_reason { am.lost_reason = Set(blank_to_none(Some(v))); }
        if let Some(v) = patch.company_id { am.company_id = Set(Some(v)); }
        if let Some(v) = patch.contact_id { am.contact_id = Set(Some(v)); }
        if let Some(v) = patch.owner_id { am.owner_id = Set(v); }
        am.updated_at = Set(Utc::now().into());
        Ok(am.update(db).await?)
    }

    #[instrument(skip(self, patch), fields(deal_id = %id, caller = %caller))]
    pub async fn update(&self, id: Uuid, patch: UpdateDeal, caller: Uuid) -> Result<DealDetail, ServiceError> {
        let updated = Self::apply_update(&self.db, id, patch, caller).await?;
        info!(deal_id = %id, stage = ?updated.stage, "deal_updated");
        self.get(id).await
    }

    #[instrument(skip(self), fields(deal_id = %id, caller = %caller))]
    pub async fn delete(&self, id: Uuid, caller: Uuid) -> Result<(), ServiceError> {
        let existing = find_or_404::<deal::Entity, _>(&self.db, id, "Deal").await?;
        ensure_owner(&[Some(existing.owner_id)], caller, "Deal")?;
        deal::Entity::delete_by_id(id).exec(&self.db).await?;
        info!(deal_id = %id, "deal_deleted");
        Ok(())
    }

    /// Apply one patch to many deals. Each item runs in its own savepoint: a failing item
    /// is reported and rolled back while the others commit.
    #[instrument(skip(self, req), fields(caller = %caller, items = req.ids.len()))]
    pub async fn bulk_update(&self, req: BulkUpdateDeals, caller: Uuid) -> Result<BulkOutcome, ServiceError> {
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
                    warn!(deal_id = %id, error = %e, "bulk_item_failed");
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
        info!(succeeded = outcome.succeeded, failed = outcome.failed, "deal_bulk_update_done");
        Ok(outcome)
    }

    /// Count and value per stage, optionally for a single owner.
    pub async fn pipeline(&self, owner_id: Option<Uuid>) -> Result<PipelineSummary, ServiceError> {
        let mut q = deal::Entity::find()
            .select_only()
            .column(deal::Column::Stage)
            .column_as(Expr::col(deal::Column::Id).count(), "count")
            .column_as(Expr::col(deal::Column::Value).sum(), "total")
            .group_by(deal::Column::Stage);
        if let Some(owner) = owner_id {
            q = q.filter(deal::Column::OwnerId.eq(owner));
        }
        let rows = q.into_model::<StageRow>().all(&self.db).await?;
        Ok(summarize_pipeline(rows.into_iter().map(|r| (r.stage, r.count.max(0) as u64, r.total.unwrap_or(0.0)))))
    }
}

fn summarize_pipeline(rows: impl IntoIterator<Item = (deal::DealStage, u64, f64)>) -> PipelineSummary {
    use sea_orm::Iterable;

    let by_stage: HashMap<deal::DealStage, (u64, f64)> = rows.into_iter().map(|(s, c, v)| (s, (c, v))).collect();
    let stages: Vec<StageSummary> = deal::DealStage::iter()
        .map(|stage| {
            let (count, value) = by_stage.get(&stage).copied().unwrap_or((0, 0.0));
            StageSummary { stage, count, value }
        })
        .collect();
    PipelineSummary {
        total_count: stages.iter().map(|s| s.count).sum(),
        total_value: stages.iter().map(|s| s.value).sum(),
        open_value: stages.iter().filter(|s| !s.stage.is_closed()).map(|s| s.value).sum(),
        stages,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{get_db, limits, seed_user};

    fn titled(title: &str, value: f64) -> CreateDeal {
        CreateDeal { title: title.into(), value: Some(value), ..Default::default() }
    }

    #[test]
    fn entering_closed_stage_pins_probability() {
        let now: DateTime<FixedOffset> = Utc::now().into();
        let (p, d) = stage_effects(deal::DealStage::Proposal, deal::DealStage::ClosedWon, None, now);
        assert_eq!(p, Some(100));
        assert_eq!(d, Some(now));
        let (p, _) = stage_effects(deal::DealStage::Proposal, deal::DealStage::ClosedLost, None, now);
        assert_eq!(p, Some(0));
        let (p, d) = stage_effects(deal::DealStage::ClosedLost, deal::DealStage::Negotiation, Some(now), now);
        assert_eq!((p, d), (None, None));
    }

    #[tokio::test]
    async fn closing_a_deal_sets_probability_and_date() -> Result<(), anyhow::Error> {
        let db = get_db().await?;
        let u = seed_user(&db, "Rep").await?;
        let svc = DealService::new(db, limits());
        let d = svc.create(CreateDeal { probability: Some(40), ..titled("Pilot", 500.0) }, u.id).await?;
        assert_eq!(d.deal.stage, deal::DealStage::Prospecting);
        assert!(d.deal.actual_close_date.is_none());

        let won = svc.update(d.deal.id, UpdateDeal { stage: Some(deal::DealStage::ClosedWon), ..Default::default() }, u.id).await?;
        assert_eq!(won.deal.probability, 100);
        assert!(won.deal.actual_close_date.is_some());

        let lost = svc.update(d.deal.id, UpdateDeal { stage: Some(deal::DealStage::ClosedLost), ..Default::default() }, u.id).await?;
        assert_eq!(lost.deal.probability, 0);
        assert!(lost.deal.actual_close_date.is_some());
        Ok(())
    }

    #[tokio::test]
    async fn non_owner_cannot_modify_deal() -> Result<(), anyhow::Error> {
        let db = get_db().await?;
        let owner = seed_user(&db, "Owner").await?;
        let other = seed_user(&db, "Other").await?;
        let svc = DealService::new(db, limits());
        let d = svc.create(titled("Mine", 750.0), owner.id).await?;

        let patch = UpdateDeal { title: Some("Taken".into()), stage: Some(deal::DealStage::ClosedWon), ..Default::default() };
        let err = svc.update(d.deal.id, patch, other.id).await.unwrap_err();
        assert!(matches!(err, ServiceError::Forbidden(_)));
        assert_eq!(err.to_string(), "You do not have permission to modify this deal");

        let err = svc.delete(d.deal.id, other.id).await.unwrap_err();
        assert!(matches!(err, ServiceError::Forbidden(_)));

        let reread = svc.get(d.deal.id).await?;
        assert_eq!(reread.deal, d.deal);
        Ok(())
    }

    #[tokio::test]
    async fn negative_value_is_rejected() -> Result<(), anyhow::Error> {
        let db = get_db().await?;
        let u = seed_user(&db, "Rep").await?;
        let svc = DealService::new(db, limits());
        let err = svc.create(titled("Bad", -1.0), u.id).await.unwrap_err();
        assert!(err.is_client_error());
        assert_eq!(err.to_string(), "Deal value must be a non-negative number");
        Ok(())
    }

    #[tokio::test]
    async fn filters_combine_with_and() -> Result<(), anyhow::Error> {
        let db = get_db().await?;
        let u = seed_user(&db, "Rep").await?;
        let svc = DealService::new(db, limits());
        svc.create(titled("Small", 100.0), u.id).await?;
        let big = svc.create(titled("Big", 10_000.0), u.id).await?;
        svc.create(CreateDeal { stage: Some(deal::DealStage::Proposal), ..titled("Big too", 20_000.0) }, u.id).await?;

        let filter = DealFilter { min_value: Some(1_000.0), stage: Some(deal::DealStage::Prospecting), ..Default::default() };
        let page = svc.list(&filter, Pagination::default()).await?;
        assert_eq!(page.pagination.total, 1);
        assert_eq!(page.data[0].deal.id, big.deal.id);
        assert_eq!(page.data[0].owner.as_ref().map(|o| o.id), Some(u.id));

        let searched = svc.list(&DealFilter { search: Some("BIG".into()), ..Default::default() }, Pagination::default()).await?;
        assert_eq!(searched.pagination.total, 2);
        Ok(())
    }

    #[tokio::test]
    async fn bulk_update_reports_each_item() -> Result<(), anyhow::Error> {
        let db = get_db().await?;
        let owner = seed_user(&db, "Owner").await?;
        let other = seed_user(&db, "Other").await?;
        let svc = DealService::new(db, limits());
        let mine = svc.create(titled("Mine", 10.0), owner.id).await?;
        let theirs = svc.create(titled("Theirs", 10.0), other.id).await?;
        let missing = Uuid::new_v4();

        let outcome = svc
            .bulk_update(
                BulkUpdateDeals {
                    ids: vec![mine.deal.id, missing, theirs.deal.id],
                    patch: UpdateDeal { stage: Some(deal::DealStage::Negotiation), ..Default::default() },
                },
                owner.id,
            )
            .await?;
        assert_eq!(outcome.results.len(), 3);
        assert_eq!((outcome.succeeded, outcome.failed), (1, 2));
        assert!(outcome.results[0].success);
        assert_eq!(outcome.results[1].error.as_deref(), Some("Deal not found"));
        assert!(!outcome.results[2].success);

        assert_eq!(svc.get(mine.deal.id).await?.deal.stage, deal::DealStage::Negotiation);
        assert_eq!(svc.get(theirs.deal.id).await?.deal.stage, deal::DealStage::Prospecting);
        Ok(())
    }

    #[tokio::test]
    async fn bulk_item_with_bad_value_leaves_others_committed() -> Result<(), anyhow::Error> {
        let db = get_db().await?;
        let u = seed_user(&db, "Rep").await?;
        let svc = DealService::new(db, limits());
        let a = svc.create(titled("A", 1.0), u.id).await?;
        let outcome = svc
            .bulk_update(BulkUpdateDeals { ids: vec![a.deal.id], patch: UpdateDeal { value: Some(-5.0), ..Default::default() } }, u.id)
            .await?;
        assert_eq!(outcome.failed, 1);
        assert_eq!(svc.get(a.deal.id).await?.deal.value, Some(1.0));
        Ok(())
    }

    #[tokio::test]
    async fn pipeline_groups_by_stage() -> Result<(), anyhow::Error> {
        let db = get_db().await?;
        let u = seed_user(&db, "Rep").await?;
        let other = seed_user(&db, "Other").await?;
        let svc = DealService::new(db, limits());
        svc.create(titled("a", 100.0), u.id).await?;
        svc.create(titled("b", 50.0), u.id).await?;
        svc.create(CreateDeal { stage: Some(deal::DealStage::ClosedWon), ..titled("c", 1000.0) }, u.id).await?;
        svc.create(titled("d", 7.0), other.id).await?;

        let p = svc.pipeline(Some(u.id)).await?;
        assert_eq!(p.stages.len(), 6);
        assert_eq!(p.total_count, 3);
        assert_eq!(p.total_value, 1150.0);
        assert_eq!(p.open_value, 150.0);
        let prospecting = &p.stages[0];
        assert_eq!((prospecting.count, prospecting.value), (2, 150.0));
        assert_eq!(svc.pipeline(None).await?.total_count, 4);
        Ok(())
    }
}
