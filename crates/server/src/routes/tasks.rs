use axum::{
    extract::State,
    http::StatusCode,
    Extension, Json,
};
use tracing::info;
use uuid::Uuid;

use common::types::ApiResponse;
use service::task_service::{CreateTask, TaskDetail, TaskFilter, TaskListItem, UpdateTask};
use service::{Page, Pagination};

use super::auth::{CurrentUser, ServerState};
use crate::errors::ApiError;
use crate::extract::{ApiJson, ApiPath, ApiQuery};

#[utoipa::path(
    get,
    path = "/tasks",
    tag = "tasks",
    params(crate::openapi::ListParams, crate::openapi::TaskFilterDoc),
    responses((status = 200, description = "Paginated tasks, soonest due first"), (status = 400, description = "Unknown status or priority"))
)]
pub async fn list(
    State(state): State<ServerState>,
    ApiQuery(filter): ApiQuery<TaskFilter>,
    ApiQuery(page): ApiQuery<Pagination>,
) -> Result<Json<ApiResponse<Page<TaskListItem>>>, ApiError> {
    let page = state.services.tasks.list(&filter, page).await?;
    info!(count = page.data.len(), total = page.pagination.total, "list tasks");
    Ok(Json(ApiResponse::ok(page)))
}

#[utoipa::path(get, path = "/tasks/{id}", tag = "tasks", params(("id" = Uuid, Path, description = "Task ID")), responses((status = 200, description = "Task"), (status = 404, description = "Not Found")))]
pub async fn get(State(state): State<ServerState>, ApiPath(id): ApiPath<Uuid>) -> Result<Json<ApiResponse<TaskDetail>>, ApiError> {
    Ok(Json(ApiResponse::ok(state.services.tasks.get(id).await?)))
}

#[utoipa::path(post, path = "/tasks", tag = "tasks", request_body = crate::openapi::CreateTaskDoc, responses((status = 201, description = "Created"), (status = 400, description = "Bad Request"), (status = 404, description = "Referenced row missing")))]
pub async fn create(
    State(state): State<ServerState>,
    Extension(me): Extension<CurrentUser>,
    ApiJson(input): ApiJson<CreateTask>,
) -> Result<(StatusCode, Json<ApiResponse<TaskDetail>>), ApiError> {
    let created = state.services.tasks.create(input, me.id).await?;
    Ok((StatusCode::CREATED, Json(ApiResponse::ok_with_message(created, "Task created successfully"))))
}

#[utoipa::path(put, path = "/tasks/{id}", tag = "tasks", params(("id" = Uuid, Path, description = "Task ID")), request_body = crate::openapi::CreateTaskDoc, responses((status = 200, description = "Updated"), (status = 403, description = "Forbidden"), (status = 404, description = "Not Found")))]
pub async fn update(
    State(state): State<ServerState>,
    Extension(me): Extension<CurrentUser>,
    ApiPath(id): ApiPath<Uuid>,
    ApiJson(patch): ApiJson<UpdateTask>,
) -> Result<Json<ApiResponse<TaskDetail>>, ApiError> {
    let updated = state.services.tasks.update(id, patch, me.id).await?;
    Ok(Json(ApiResponse::ok_with_message(updated, "Task updated successfully")))
}

#[utoipa::path(post, path = "/tasks/{id}/complete", tag = "tasks", params(("id" = Uuid, Path, description = "Task ID")), responses((status = 200, description = "Completed"), (status = 403, description = "Forbidden"), (status = 404, description = "Not Found")))]
pub async fn complete(
    State(state): State<ServerState>,
    Extension(me): Extension<CurrentUser>,
    ApiPath(id): ApiPath<Uuid>,
) -> Result<Json<ApiResponse<TaskDetail>>, ApiError> {
    let done = state.services.tasks.complete(id, me.id).await?;
    Ok(Json(ApiResponse::ok_with_message(done, "Task completed")))
}

#[utoipa::path(delete, path = "/tasks/{id}", tag = "tasks", params(("id" = Uuid, Path, description = "Task ID")), responses((status = 200, description = "Deleted"), (status = 403, description = "Forbidden"), (status = 404, description = "Not Found")))]
pub async fn delete(
    State(state): State<ServerState>,
    Extension(me): Extension<CurrentUser>,
    ApiPath(id): ApiPath<Uuid>,
) -> Result<Json<ApiResponse<()>>, ApiError> {
    state.services.tasks.delete(id, me.id).await?;
    Ok(Json(ApiResponse::message("Task deleted successfully")))
}
