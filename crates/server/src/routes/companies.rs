use axum::{
    extract::State,
    http::StatusCode,
    Extension, Json,
};
use tracing::info;
use uuid::Uuid;

use common::types::ApiResponse;
use service::company_service::{CompanyDetail, CompanyFilter, CompanyListItem, CreateCompany, UpdateCompany};
use service::{Page, Pagination};

use super::auth::{CurrentUser, ServerState};
use crate::errors::ApiError;
use crate::extract::{ApiJson, ApiPath, ApiQuery};

#[utoipa::path(
    get,
    path = "/companies",
    tag = "companies",
    params(crate::openapi::ListParams, crate::openapi::CompanyFilterDoc),
    responses((status = 200, description = "Paginated companies"))
)]
pub async fn list(
    State(state): State<ServerState>,
    ApiQuery(filter): ApiQuery<CompanyFilter>,
    ApiQuery(page): ApiQuery<Pagination>,
) -> Result<Json<ApiResponse<Page<CompanyListItem>>>, ApiError> {
    let page = state.services.companies.list(&filter, page).await?;
    info!(count = page.data.len(), total = page.pagination.total, "list companies");
    Ok(Json(ApiResponse::ok(page)))
}

#[utoipa::path(get, path = "/companies/{id}", tag = "companies", params(("id" = Uuid, Path, description = "Company ID")), responses((status = 200, description = "Company with recent contacts and deals"), (status = 404, description = "Not Found")))]
pub async fn get(State(state): State<ServerState>, ApiPath(id): ApiPath<Uuid>) -> Result<Json<ApiResponse<CompanyDetail>>, ApiError> {
    Ok(Json(ApiResponse::ok(state.services.companies.get(id).await?)))
}

#[utoipa::path(post, path = "/companies", tag = "companies", request_body = crate::openapi::CreateCompanyDoc, responses((status = 201, description = "Created"), (status = 400, description = "Invalid or duplicate name")))]
pub async fn create(
    State(state): State<ServerState>,
    Extension(me): Extension<CurrentUser>,
    ApiJson(input): ApiJson<CreateCompany>,
) -> Result<(StatusCode, Json<ApiResponse<CompanyDetail>>), ApiError> {
    let created = state.services.companies.create(input, me.id).await?;
    Ok((StatusCode::CREATED, Json(ApiResponse::ok_with_message(created, "Company created successfully"))))
}

#[utoipa::path(put, path = "/companies/{id}", tag = "companies", params(("id" = Uuid, Path, description = "Company ID")), request_body = crate::openapi::CreateCompanyDoc, responses((status = 200, description = "Updated"), (status = 403, description = "Forbidden"), (status = 404, description = "Not Found")))]
pub async fn update(
    State(state): State<ServerState>,
    Extension(me): Extension<CurrentUser>,
    ApiPath(id): ApiPath<Uuid>,
    ApiJson(patch): ApiJson<UpdateCompany>,
) -> Result<Json<ApiResponse<CompanyDetail>>, ApiError> {
    let updated = state.services.companies.update(id, patch, me.id).await?;
    Ok(Json(ApiResponse::ok_with_message(updated, "Company updated successfully")))
}

#[utoipa::path(delete, path = "/companies/{id}", tag = "companies", params(("id" = Uuid, Path, description = "Company ID")), responses((status = 200, description = "Deactivated"), (status = 400, description = "Company still has active contacts or open deals"), (status = 403, description = "Forbidden")))]
pub async fn delete(
    State(state): State<ServerState>,
    Extension(me): Extension<CurrentUser>,
    ApiPath(id): ApiPath<Uuid>,
) -> Result<Json<ApiResponse<()>>, ApiError> {
    state.services.companies.delete(id, me.id).await?;
    Ok(Json(ApiResponse::message("Company deleted successfully")))
}
