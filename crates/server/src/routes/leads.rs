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
use service::lead_service::{
    BulkUpdateLeads, ConversionResult, ConvertLead, CreateLead, LeadDetail, LeadFilter, LeadListItem, LeadStats, UpdateLead,
};
use service::{Page, Pagination};

use super::auth::{CurrentUser, ServerState};
use crate::errors::ApiError;
use crate::extract::{ApiJson, ApiPath, ApiQuery};

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatsQuery {
    pub assigned_to: Option<Uuid>,
}

#[utoipa::path(
    get,
    path = "/leads",
    tag = "leads",
    params(crate::openapi::ListParams, crate::openapi::LeadFilterDoc),
    responses((status = 200, description = "Paginated leads, newest first"), (status = 400, description = "Unknown status"))
)]
pub async fn list(
    State(state): State<ServerState>,
    ApiQuery(filter): ApiQuery<LeadFilter>,
    ApiQuery(page): ApiQuery<Pagination>,
) -> Result<Json<ApiResponse<Page<LeadListItem>>>, ApiError> {
    let page = state.services.leads.list(&filter, page).await?;
    info!(count = page.data.len(), total = page.pagination.total, "list leads");
    Ok(Json(ApiResponse::ok(page)))
}

#[utoipa::path(get, path = "/leads/{id}", tag = "leads", params(("id" = Uuid, Path, description = "Lead ID")), responses((status = 200, description = "Lead"), (status = 404, description = "Not Found")))]
pub async fn get(State(state): State<ServerState>, ApiPath(id): ApiPath<Uuid>) -> Result<Json<ApiResponse<LeadDetail>>, ApiError> {
    Ok(Json(ApiResponse::ok(state.services.leads.get(id).await?)))
}

#[utoipa::path(post, path = "/leads", tag = "leads", request_body = crate::openapi::CreateLeadDoc, responses((status = 201, description = "Created and scored"), (status = 400, description = "Bad Request")))]
pub async fn create(
    State(state): State<ServerState>,
    Extension(me): Extension<CurrentUser>,
    ApiJson(input): ApiJson<CreateLead>,
) -> Result<(StatusCode, Json<ApiResponse<LeadDetail>>), ApiError> {
    let created = state.services.leads.create(input, me.id).await?;
    Ok((StatusCode::CREATED, Json(ApiResponse::ok_with_message(created, "Lead created successfully"))))
}

#[utoipa::path(put, path = "/leads/{id}", tag = "leads", params(("id" = Uuid, Path, description = "Lead ID")), request_body = crate::openapi::CreateLeadDoc, responses((status = 200, description = "Updated and rescored"), (status = 403, description = "Forbidden"), (status = 404, description = "Not Found")))]
pub async fn update(
    State(state): State<ServerState>,
    Extension(me): Extension<CurrentUser>,
    ApiPath(id): ApiPath<Uuid>,
    ApiJson(patch): ApiJson<UpdateLead>,
) -> Result<Json<ApiResponse<LeadDetail>>, ApiError> {
    let updated = state.services.leads.update(id, patch, me.id).await?;
    Ok(Json(ApiResponse::ok_with_message(updated, "Lead updated successfully")))
}

#[utoipa::path(delete, path = "/leads/{id}", tag = "leads", params(("id" = Uuid, Path, description = "Lead ID")), responses((status = 200, description = "Deleted"), (status = 403, description = "Forbidden"), (status = 404, description = "Not Found")))]
pub async fn delete(
    State(state): State<ServerState>,
    Extension(me): Extension<CurrentUser>,
    ApiPath(id): ApiPath<Uuid>,
) -> Result<Json<ApiResponse<()>>, ApiError> {
    state.services.leads.delete(id, me.id).await?;
    Ok(Json(ApiResponse::message("Lead deleted successfully")))
}

#[utoipa::path(put, path = "/leads/bulk", tag = "leads", request_body = crate::openapi::BulkUpdateDoc, responses((status = 200, description = "Per-item results")))]
pub async fn bulk_update(
    State(state): State<ServerState>,
    Extension(me): Extension<CurrentUser>,
    ApiJson(req): ApiJson<BulkUpdateLeads>,
) -> Result<Json<ApiResponse<BulkOutcome>>, ApiError> {
    let outcome = state.services.leads.bulk_update(req, me.id).await?;
    info!(succeeded = outcome.succeeded, failed = outcome.failed, "bulk update leads");
    let message = format!("{} leads updated, {} failed", outcome.succeeded, outcome.failed);
    Ok(Json(ApiResponse::ok_with_message(outcome, message)))
}

/// Turns the lead into a contact, a company and optionally a deal, all or nothing.
#[utoipa::path(post, path = "/leads/{id}/convert", tag = "leads", params(("id" = Uuid, Path, description = "Lead ID")), request_body = crate::openapi::ConvertLeadDoc, responses((status = 200, description = "Converted"), (status = 400, description = "Already converted or invalid"), (status = 403, description = "Forbidden"), (status = 404, description = "Not Found")))]
pub async fn convert(
    State(state): State<ServerState>,
    Extension(me): Extension<CurrentUser>,
    ApiPath(id): ApiPath<Uuid>,
    ApiJson(plan): ApiJson<ConvertLead>,
) -> Result<Json<ApiResponse<ConversionResult>>, ApiError> {
    let result = state.services.leads.convert(id, plan, me.id).await?;
    Ok(Json(ApiResponse::ok_with_message(result, "Lead converted successfully")))
}

#[utoipa::path(get, path = "/leads/stats", tag = "leads", params(("assignedTo" = Option<Uuid>, Query, description = "Restrict to one assignee")), responses((status = 200, description = "Totals per status, average score and conversion rate")))]
pub async fn stats(
    State(state): State<ServerState>,
    ApiQuery(q): ApiQuery<StatsQuery>,
) -> Result<Json<ApiResponse<LeadStats>>, ApiError> {
    Ok(Json(ApiResponse::ok(state.services.leads.stats(q.assigned_to).await?)))
}
