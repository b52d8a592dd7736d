use chrono::Utc;
use sea_orm::{
    sea_query::{Expr, Func},
    ActiveModelTrait, ColumnTrait, Condition, DatabaseConnection, EntityTrait, IntoActiveModel,
    PaginatorTrait, QueryFilter, QueryOrder, QuerySelect, Set,
};
use serde::{Deserialize, Serialize};
use tracing::{info, instrument};
use uuid::Uuid;

use configs::PaginationConfig;
use models::{company, contact, deal};

use crate::errors::ServiceError;
use crate::pagination::{Page, Pagination};
use crate::query::{blank_to_none, contains_ci, count_by, ensure_owner, fetch_page, find_or_404, search_term};

pub const RELATED_LIMIT: u64 = 5;

#[derive(Clone, Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CompanyFilter {
    pub search: Option<String>,
    pub industry: Option<String>,
    pub size: Option<String>,
    #[serde(default)]
    pub include_inactive: bool,
}

#[derive(Clone, Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateCompany {
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
}

#[derive(Clone, Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateCompany {
    pub name: Option<String>,
    pub domain: Option<String>,
    pub industry: Option<String>,
    pub size: Option<String>,
    pub website: Option<String>,
    pub phone: Option<String>,
    pub address: Option<String>,
    pub city: Option<String>,
    pub country: Option<String>,
    pub description: Option<String>,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
pub struct CompanyCounts {
    pub contacts: u64,
    pub deals: u64,
}

#[derive(Clone, Debug, Serialize)]
pub struct CompanyListItem {
    #[serde(flatten)]
    pub company: company::Model,
    #[serde(rename = "_count")]
    pub count: CompanyCounts,
}

#[derive(Clone, Debug, Serialize)]
pub struct CompanyDetail {
    #[serde(flatten)]
    pub company: company::Model,
    pub contacts: Vec<contact::Model>,
    pub deals: Vec<deal::Model>,
    #[serde(rename = "_count")]
    pub count: CompanyCounts,
}

/// Companies: filtered listing, detail, create/update with a case-insensitive name check,
/// and a guarded soft delete.
#[derive(Clone)]
pub struct CompanyService {
    db: DatabaseConnection,
    limits: PaginationConfig,
}

impl CompanyService {
    pub fn new(db: DatabaseConnection, limits: PaginationConfig) -> Self { Self { db, limits } }

    pub async fn list(&self, filter: &CompanyFilter, pagination: Pagination) -> Result<Page<CompanyListItem>, ServiceError> {
        let (page, limit) = pagination.normalize(&self.limits);
        let mut cond = Condition::all();
        if !filter.include_inactive {
            cond = cond.add(company::Column::IsActive.eq(true));
        }
        if let Some(industry) = blank_to_none(filter.industry.clone()) {
            cond = cond.add(company::Column::Industry.eq(industry));
        }
        if let Some(size) = blank_to_none(filter.size.clone()) {
            cond = cond.add(company::Column::Size.eq(size));
        }
        if let Some(term) = search_term(&filter.search) {
            cond = cond.add(
                Condition::any()
                    .add(contains_ci(company::Entity, company::Column::Name, term))
                    .add(contains_ci(company::Entity, company::Column::Domain, term))
                    .add(contains_ci(company::Entity, company::Column::Industry, term))
                    .add(contains_ci(company::Entity, company::Column::City, term)),
            );
        }
        let select = company::Entity::find()
            .filter(cond)
            .order_by_desc(company::Column::CreatedAt)
            .order_by_asc(company::Column::Id);
        let (rows, meta) = fetch_page(&self.db, select, page, limit).await?;

        let ids: Vec<Uuid> = rows.iter().map(|c| c.id).collect();
        let contacts = count_by(&self.db, contact::Entity::find(), contact::Column::CompanyId, &ids).await?;
        let deals = count_by(&self.db, deal::Entity::find(), deal::Column::CompanyId, &ids).await?;
        let data = rows
            .into_iter()
            .map(|c| {
                let count = CompanyCounts {
                    contacts: contacts.get(&c.id).copied().unwrap_or(0),
                    deals: deals.get(&c.id).copied().unwrap_or(0),
                };
                CompanyListItem { company: c, count }
            })
            .collect();
        Ok(Page { data, pagination: meta })
    }

    pub async fn get(&self, id: Uuid) -> Result<CompanyDetail, ServiceError> {
        let company = find_or_404::<company::Entity, _>(&self.db, id, "Company").await?;
        let contacts = contact::Entity::find()
            .filter(contact::Column::CompanyId.eq(id))
            .order_by_desc(contact::Column::CreatedAt)
            .limit(RELATED_LIMIT)
            .all(&self.db)
            .await?;
        let deals = deal::Entity::find()
            .filter(deal::Column::CompanyId.eq(id))
            .order_by_desc(deal::Column::CreatedAt)
            .limit(RELATED_LIMIT)
            .all(&self.db)
            .await?;
        let count = CompanyCounts {
            contacts: contact::Entity::find().filter(contact::Column::CompanyId.eq(id)).count(&self.db).await?,
            deals: deal::Entity::find().filter(deal::Column::CompanyId.eq(id)).count(&self.db).await?,
        };
        Ok(CompanyDetail { company, contacts, deals, count })
    }

    async fn ensure_name_free(&self, name: &str, except: Option<Uuid>) -> Result<(), ServiceError> {
        let mut q = company::Entity::find()
            .filter(company::Column::IsActive.eq(true))
            .filter(Expr::expr(Func::lower(Expr::col((company::Entity, company::Column::Name)))).eq(name.trim().to_lowercase()));
        if let Some(id) = except {
            q = q.filter(company::Column::Id.ne(id));
        }
        if q.one(&self.db).await?.is_some() {
            return Err(ServiceError::Conflict(format!("A company named '{}' already exists", name.trim())));
        }
        Ok(())
    }

    #[instrument(skip(self, input), fields(caller = %caller))]
    pub async fn create(&self, input: CreateCompany, caller: Uuid) -> Result<CompanyDetail, ServiceError> {
        company::validate_name(&input.name)?;
        self.ensure_name_free(&input.name, None).await?;
        let created = company::create(
            &self.db,
            company::NewCompany {
                name: input.name,
                domain: blank_to_none(input.domain),
                industry: blank_to_none(input.industry),
                size: blank_to_none(input.size),
                website: blank_to_none(input.website),
                phone: blank_to_none(input.phone),
                address: blank_to_none(input.address),
                city: blank_to_none(input.city),
                country: blank_to_none(input.country),
                description: blank_to_none(input.description),
                created_by_id: caller,
            },
        )
        .await?;
        info!(company_id = %created.id, "company_created");
        self.get(created.id).await
    }

    #[instrument(skip(self, patch), fields(company_id = %id, caller = %caller))]
    pub async fn update(&self, id: Uuid, patch: UpdateCompany, caller: Uuid) -> Result<CompanyDetail, ServiceError> {
        let existing = find_or_404::<company::Entity, _>(&self.db, id, "Company").await?;
        ensure_owner(&[Some(existing.created_by_id)], caller, "Company")?;
        let mut am = existing.into_active_model();
        if let Some(name) = patch.name {
            company::validate_name(&name)?;
            self.ensure_name_free(&name, Some(id)).await?;
            am.name = Set(name.trim().to_string());
        }
        if let Some(website) = patch.website {
            let website = blank_to_none(Some(website));
            if let Some(w) = website.as_deref() { company::validate_website(w)?; }
            am.website = Set(website);
        }
        if let Some(v) = patch.domain { am.domain = Set(blank_to_none(Some(v))); }
        if let Some(v) = patch.industry { am.industry = Set(blank_to_none(Some(v))); }
        if let Some(v) = patch.size { am.size = Set(blank_to_none(Some(v))); }
        if let Some(v) = patch.phone { am.phone = Set(blank_to_none(Some(v))); }
        if let Some(v) = patch.address { am.address = Set(blank_to_none(Some(v))); }
        if let Some(v) = patch.city { am.city = Set(blank_to_none(Some(v))); }
        if let Some(v) = patch.country { am.country = Set(blank_to_none(Some(v))); }
        if let Some(v) = patch.description { am.description = Set(blank_to_none(Some(v))); }
        am.updated_at = Set(Utc::now().into());
        am.update(&self.db).await?;
        self.get(id).await
    }

    /// Soft delete. Refused while active contacts or open deals still reference the company.
    #[instrument(skip(self), fields(company_id = %id, caller = %caller))]
    pub async fn delete(&self, id: Uuid, caller: Uuid) -> Result<(), ServiceError> {
        let existing = find_or_404::<company::Entity, _>(&self.db, id, "Company").await?;
        ensure_owner(&[Some(existing.created_by_id)], caller, "Company")?;
        let active_contacts = contact::Entity::find()
            .filter(contact::Column::CompanyId.eq(id))
            .filter(contact::Column::IsActive.eq(true))
            .count(&self.db)
            .await?;
        let open_deals = deal::Entity::find()
            .filter(deal::Column::CompanyId.eq(id))
            .filter(deal::Column::Stage.is_not_in([deal::DealStage::ClosedWon, deal::DealStage::ClosedLost]))
            .count(&self.db)
            .await?;
        if active_contacts > 0 || open_deals > 0 {
            return Err(ServiceError::Conflict(format!(
                "Cannot delete company with {} active contacts and {} open deals",
                active_contacts, open_deals
            )));
        }
        let mut am = existing.into_active_model();
        am.is_active = Set(false);
        am.updated_at = Set(Utc::now().into());
        am.update(&self.db).await?;
        info!(company_id = %id, "company_deactivated");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{get_db, limits, seed_user};

    #[tokio::test]
    async fn duplicate_names_conflict_case_insensitively() -> Result<(), anyhow::Error> {
        let db = get_db().await?;
        let u = seed_user(&db, "Owner").await?;
        let svc = CompanyService::new(db, limits());
        svc.create(CreateCompany { name: "Acme".into(), ..Default::default() }, u.id).await?;
        let err = svc.create(CreateCompany { name: " acme ".into(), ..Default::default() }, u.id).await.unwrap_err();
        assert!(matches!(err, ServiceError::Conflict(_)));
        Ok(())
    }

    #[tokio::test]
    async fn search_matches_city_and_hides_inactive() -> Result<(), anyhow::Error> {
        let db = get_db().await?;
        let u = seed_user(&db, "Owner").await?;
        let svc = CompanyService::new(db, limits());
        let a = svc.create(CreateCompany { name: "Alpha".into(), city: Some("Berlin".into()), ..Default::default() }, u.id).await?;
        svc.create(CreateCompany { name: "Beta".into(), city: Some("Paris".into()), ..Default::default() }, u.id).await?;

        let filter = CompanyFilter { search: Some("BERL".into()), ..Default::default() };
        let page = svc.list(&filter, Pagination::default()).await?;
        assert_eq!(page.pagination.total, 1);
        assert_eq!(page.data[0].company.id, a.company.id);

        svc.delete(a.company.id, u.id).await?;
        let page = svc.list(&CompanyFilter::default(), Pagination::default()).await?;
        assert_eq!(page.pagination.total, 1);
        let all = svc.list(&CompanyFilter { include_inactive: true, ..Default::default() }, Pagination::default()).await?;
        assert_eq!(all.pagination.total, 2);
        Ok(())
    }

    #[tokio::test]
    async fn only_creator_may_update() -> Result<(), anyhow::Error> {
        let db = get_db().await?;
        let owner = seed_user(&db, "Owner").await?;
        let other = seed_user(&db, "Other").await?;
        let svc = CompanyService::new(db, limits());
        let c = svc.create(CreateCompany { name: "Acme".into(), ..Default::default() }, owner.id).await?;
        let err = svc
            .update(c.company.id, UpdateCompany { city: Some("Oslo".into()), ..Default::default() }, other.id)
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::Forbidden(_)));
        let missing = svc.update(Uuid::new_v4(), UpdateCompany::default(), owner.id).await.unwrap_err();
        assert!(matches!(missing, ServiceError::NotFound(_)));
        Ok(())
    }
}
