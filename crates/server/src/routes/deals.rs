use axum::{
    extract::State,
    http::StatusCode,
    Extension, Json,
};
use serde::Deserialize;
use tracing::info;
use uuid::Uuid;

use common::types::ApiResponse;
use service::bulk::BulkOutcome;
use service::deal_service::{BulkUpdateDeals, CreateDeal, DealDetail, DealFilter, DealListItem, PipelineSummary, UpdateDeal};
use service::{Page, Pagination};

use super::auth::{CurrentUser, ServerState};
use crate::errors::ApiError;
use crate::extract::{ApiJson, ApiPath, ApiQuery};

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PipelineQuery {
    pub owner_id: Option<Uuid>,
}

#[utoipa::path(
    get,
    path = "/deals",
    tag = "deals",
    params(crate::openapi::ListParams, crate::openapi::DealFilterDoc),
    responses((status = 200, description = "Paginated deals"), (status = 400, description = "Unknown stage"))
)]
pub async fn list(
    State(state): State<ServerState>,
    ApiQuery(filter): ApiQuery<DealFilter>,
    ApiQuery(page): ApiQuery<Pagination>,
) -> Result<Json<ApiResponse<Page<DealListItem>>>, ApiError> {
    let page = state.services.deals.list(&filter, page).await?;
    info!(count = page.data.len(), total = page.pagination.total, "list deals");
    Ok(Json(ApiResponse::ok(page)))
}

#[utoipa::path(get, path = "/deals/{id}", tag = "deals", params(("id" = Uuid, Path, description = "Deal ID")), responses((status = 200, description = "Deal with tasks and notes"), (status = 404, description = "Not Found")))]
pub async fn get(State(state): State<ServerState>, ApiPath(id): ApiPath<Uuid>) -> Result<Json<ApiResponse<DealDetail>>, ApiError> {
    Ok(Json(ApiResponse::ok(state.services.deals.get(id).await?)))
}

#[utoipa::path(post, path = "/deals", tag = "deals", request_body = crate::openapi::CreateDealDoc, responses((status = 201, description = "Created"), (status = 400, description = "Bad Request"), (status = 404, description = "Referenced row missing")))]
pub async fn create(
    State(state): State<ServerState>,
    Extension(me): Extension<CurrentUser>,
    ApiJson(input): ApiJson<CreateDeal>,
) -> Result<(StatusCode, Json<ApiResponse<DealDetail>>), ApiError> {
    let created = state.services.deals.create(input, me.id).await?;
    Ok((StatusCode::CREATED, Json(ApiResponse::ok_with_message(created, "Deal created successfully"))))
}

#[utoipa::path(put, path = "/deals/{id}", tag = "deals", params(("id" = Uuid, Path, description = "Deal ID")), request_body = crate::openapi::CreateDealDoc, responses((status = 200, description = "Updated"), (status = 403, description = "Forbidden"), (status = 404, description = "Not Found")))]
pub async fn update(
    State(state): State<ServerState>,
    Extension(me): Extension<CurrentUser>,
    ApiPath(id): ApiPath<Uuid>,
    ApiJson(patch): ApiJson<UpdateDeal>,
) -> Result<Json<ApiResponse<DealDetail>>, ApiError> {
    let updated = state.services.deals.update(id, patch, me.id).await?;
    Ok(Json(ApiResponse::ok_with_message(updated, "Deal updated successfully")))
}

#[utoipa::path(delete, path = "/deals/{id}", tag = "deals", params(("id" = Uuid, Path, description = "Deal ID")), responses((status = 200, description = "Deleted"), (status = 403, description = "Forbidden"), (status = 404, description = "Not Found")))]
pub async fn delete(
    State(state): State<ServerState>,
    Extension(me): Extension<CurrentUser>,
    ApiPath(id): ApiPath<Uuid>,
) -> Result<Json<ApiResponse<()>>, ApiError> {
    state.services.deals.delete(id, me.id).await?;
    Ok(Json(ApiResponse::message("Deal deleted successfully")))
}

/// Applies one patch to many deals; each id succeeds or fails on its own.
#[utoipa::path(put, path = "/deals/bulk", tag = "deals", request_body = crate::openapi::BulkUpdateDoc, responses((status = 200, description = "Per-item results")))]
pub async fn bulk_update(
    State(state): State<ServerState>,
    Extension(me): Extension<CurrentUser>,
    ApiJson(req): ApiJson<BulkUpdateDeals>,
) -> Result<Json<ApiResponse<BulkOutcome>>, ApiError> {
    let outcome = state.services.deals.bulk_update(req, me.id).await?;
    info!(succeeded = outcome.succeeded, failed = outcome.failed, "bulk update deals");
    let message = format!("{} deals updated, {} failed", outcome.succeeded, outcome.failed);
    Ok(Json(ApiResponse::ok_with_message(outcome, message)))
}

#[utoipa::path(get, path = "/deals/pipeline", tag = "deals", params(("ownerId" = Option<Uuid>, Query, description = "Restrict to one owner")), responses((status = 200, description = "Count and value per stage")))]
pub async fn pipeline(
    State(state): State<ServerState>,
    ApiQuery(q): ApiQuery<PipelineQuery>,
) -> Result<Json<ApiResponse<PipelineSummary>>, ApiError> {
    Ok(Json(ApiResponse::ok(state.services.deals.pipeline(q.owner_id).await?)))
}
