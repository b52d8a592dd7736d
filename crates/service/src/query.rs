//! Query helpers shared by the per-kind repositories.

use std::collections::HashMap;

use sea_orm::{
    sea_query::{Expr, Func, IntoIden, SimpleExpr},
    ColumnTrait, ConnectionTrait, EntityTrait, FromQueryResult, PaginatorTrait, PrimaryKeyTrait,
    QueryFilter, QuerySelect, Select,
};
use uuid::Uuid;

use crate::errors::ServiceError;
use crate::pagination::PageMeta;

/// Case-insensitive substring match on a table-qualified column: `lower(t.c) LIKE '%term%'`.
pub fn contains_ci<T, C>(table: T, column: C, term: &str) -> SimpleExpr
where
    T: IntoIden + 'static,
    C: IntoIden + 'static,
{
    let pattern = format!("%{}%", term.trim().to_lowercase());
    Expr::expr(Func::lower(Expr::col((table, column)))).like(pattern)
}

/// Trimmed search term, or `None` when blank.
pub fn search_term(search: &Option<String>) -> Option<&str> {
    search.as_deref().map(str::trim).filter(|s| !s.is_empty())
}

/// Count the predicate and fetch one page of it.
pub async fn fetch_page<E, C>(db: &C, select: Select<E>, page: u64, limit: u64) -> Result<(Vec<E::Model>, PageMeta), ServiceError>
where
    E: EntityTrait,
    E::Model: Sync,
    C: ConnectionTrait,
{
    let paginator = select.paginate(db, limit);
    let total = paginator.num_items().await?;
    // past the last row, or an offset that does not fit: nothing to fetch
    let rows = match (page - 1).checked_mul(limit) {
        Some(offset) if offset < total => paginator.fetch_page(page - 1).await?,
        _ => Vec::new(),
    };
    Ok((rows, PageMeta::new(total, page, limit)))
}

#[derive(Debug, FromQueryResult)]
struct KeyCount {
    key: Option<Uuid>,
    n: i64,
}

/// `SELECT fk, COUNT(*) ... WHERE fk IN ids GROUP BY fk` over an already filtered select.
/// Ids without rows are absent from the map.
pub async fn count_by<E, C>(db: &C, select: Select<E>, fk: E::Column, ids: &[Uuid]) -> Result<HashMap<Uuid, u64>, ServiceError>
where
    E: EntityTrait,
    C: ConnectionTrait,
{
    if ids.is_empty() {
        return Ok(HashMap::new());
    }
    let rows = select
        .select_only()
        .column_as(fk, "key")
        .column_as(Expr::col(fk).count(), "n")
        .filter(fk.is_in(ids.iter().copied()))
        .group_by(fk)
        .into_model::<KeyCount>()
        .all(db)
        .await?;
    Ok(rows.into_iter().filter_map(|r| r.key.map(|k| (k, r.n.max(0) as u64))).collect())
}

/// Summaries for the given user ids, keyed by id.
pub async fn user_summaries<C: ConnectionTrait>(db: &C, ids: impl IntoIterator<Item = Uuid>) -> Result<HashMap<Uuid, models::user::UserSummary>, ServiceError> {
    let mut ids: Vec<Uuid> = ids.into_iter().collect();
    ids.sort_unstable();
    ids.dedup();
    if ids.is_empty() {
        return Ok(HashMap::new());
    }
    let rows = models::user::Entity::find()
        .filter(models::user::Column::Id.is_in(ids))
        .all(db)
        .await?;
    Ok(rows.iter().map(|u| (u.id, models::user::UserSummary::from(u))).collect())
}

/// Load by id or fail with `"<label> not found"`.
pub async fn find_or_404<E, C>(db: &C, id: Uuid, label: &str) -> Result<E::Model, ServiceError>
where
    E: EntityTrait,
    C: ConnectionTrait,
    Uuid: Into<<E::PrimaryKey as PrimaryKeyTrait>::ValueType>,
{
    E::find_by_id(id).one(db).await?.ok_or_else(|| ServiceError::not_found(label))
}

/// Validate an optional foreign key.
pub async fn ensure_exists<E, C>(db: &C, id: Option<Uuid>, label: &str) -> Result<(), ServiceError>
where
    E: EntityTrait,
    C: ConnectionTrait,
    Uuid: Into<<E::PrimaryKey as PrimaryKeyTrait>::ValueType>,
{
    if let Some(id) = id {
        find_or_404::<E, C>(db, id, label).await?;
    }
    Ok(())
}

/// Caller must be one of the record's owners (creator, assignee or owner).
pub fn ensure_owner(owners: &[Option<Uuid>], caller: Uuid, label: &str) -> Result<(), ServiceError> {
    if owners.iter().flatten().any(|o| *o == caller) {
        Ok(())
    } else {
        Err(ServiceError::forbidden(label))
    }
}

/// Blank strings in a patch clear the field.
pub fn blank_to_none(v: Option<String>) -> Option<String> {
    v.map(|s| s.trim().to_string()).filter(|s| !s.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn owner_check_accepts_any_listed_owner() {
        let (a, b) = (Uuid::new_v4(), Uuid::new_v4());
        assert!(ensure_owner(&[Some(a), None], a, "Contact").is_ok());
        assert!(ensure_owner(&[Some(a), Some(b)], b, "Contact").is_ok());
        let err = ensure_owner(&[Some(a), None], b, "Contact").unwrap_err();
        assert!(matches!(err, ServiceError::Forbidden(_)));
    }

    #[test]
    fn blank_search_is_ignored() {
        assert_eq!(search_term(&Some("  ".into())), None);
        assert_eq!(search_term(&Some(" acme ".into())), Some("acme"));
    }
}
