use axum::{
    extract::State,
    http::StatusCode,
    Extension, Json,
};
use tracing::info;
use uuid::Uuid;

use common::types::ApiResponse;
use models::{call, contact, message, note};
use service::activity_service::{AddNote, LogCall, LogMessage};
use service::contact_service::{ContactDetail, ContactFilter, ContactListItem, ContactStats, CreateContact, UpdateContact};
use service::{Page, Pagination};

use super::auth::{CurrentUser, ServerState};
use crate::errors::ApiError;
use crate::extract::{ApiJson, ApiPath, ApiQuery};

type ApiResult<T> = Result<Json<ApiResponse<T>>, ApiError>;
type Created<T> = Result<(StatusCode, Json<ApiResponse<T>>), ApiError>;

#[utoipa::path(
    get,
    path = "/contacts",
    tag = "contacts",
    params(crate::openapi::ListParams, crate::openapi::ContactFilterDoc),
    responses((status = 200, description = "Paginated contacts"), (status = 400, description = "Bad filter"))
)]
pub async fn list(
    State(state): State<ServerState>,
    ApiQuery(filter): ApiQuery<ContactFilter>,
    ApiQuery(page): ApiQuery<Pagination>,
) -> ApiResult<Page<ContactListItem>> {
    let page = state.services.contacts.list(&filter, page).await?;
    info!(count = page.data.len(), total = page.pagination.total, "list contacts");
    Ok(Json(ApiResponse::ok(page)))
}

#[utoipa::path(get, path = "/contacts/{id}", tag = "contacts", params(("id" = Uuid, Path, description = "Contact ID")), responses((status = 200, description = "Contact with related records"), (status = 404, description = "Not Found")))]
pub async fn get(State(state): State<ServerState>, ApiPath(id): ApiPath<Uuid>) -> ApiResult<ContactDetail> {
    Ok(Json(ApiResponse::ok(state.services.contacts.get(id).await?)))
}

#[utoipa::path(post, path = "/contacts", tag = "contacts", request_body = crate::openapi::CreateContactDoc, responses((status = 201, description = "Created"), (status = 400, description = "Bad Request"), (status = 404, description = "Referenced row missing")))]
pub async fn create(
    State(state): State<ServerState>,
    Extension(me): Extension<CurrentUser>,
    ApiJson(input): ApiJson<CreateContact>,
) -> Created<ContactDetail> {
    let created = state.services.contacts.create(input, me.id).await?;
    Ok((StatusCode::CREATED, Json(ApiResponse::ok_with_message(created, "Contact created successfully"))))
}

#[utoipa::path(put, path = "/contacts/{id}", tag = "contacts", params(("id" = Uuid, Path, description = "Contact ID")), request_body = crate::openapi::UpdateContactDoc, responses((status = 200, description = "Updated"), (status = 403, description = "Forbidden"), (status = 404, description = "Not Found")))]
pub async fn update(
    State(state): State<ServerState>,
    Extension(me): Extension<CurrentUser>,
    ApiPath(id): ApiPath<Uuid>,
    ApiJson(patch): ApiJson<UpdateContact>,
) -> ApiResult<ContactDetail> {
    let updated = state.services.contacts.update(id, patch, me.id).await?;
    Ok(Json(ApiResponse::ok_with_message(updated, "Contact updated successfully")))
}

#[utoipa::path(delete, path = "/contacts/{id}", tag = "contacts", params(("id" = Uuid, Path, description = "Contact ID")), responses((status = 200, description = "Deleted"), (status = 400, description = "Contact still has related records"), (status = 403, description = "Forbidden"), (status = 404, description = "Not Found")))]
pub async fn delete(State(state): State<ServerState>, Extension(me): Extension<CurrentUser>, ApiPath(id): ApiPath<Uuid>) -> ApiResult<()> {
    state.services.contacts.delete(id, me.id).await?;
    Ok(Json(ApiResponse::message("Contact deleted successfully")))
}

#[utoipa::path(post, path = "/contacts/{id}/deactivate", tag = "contacts", params(("id" = Uuid, Path, description = "Contact ID")), responses((status = 200, description = "Deactivated"), (status = 403, description = "Forbidden"), (status = 404, description = "Not Found")))]
pub async fn deactivate(State(state): State<ServerState>, Extension(me): Extension<CurrentUser>, ApiPath(id): ApiPath<Uuid>) -> ApiResult<contact::Model> {
    let c = state.services.contacts.deactivate(id, me.id).await?;
    Ok(Json(ApiResponse::ok_with_message(c, "Contact deactivated successfully")))
}

#[utoipa::path(get, path = "/contacts/{id}/stats", tag = "contacts", params(("id" = Uuid, Path, description = "Contact ID")), responses((status = 200, description = "Derived counters"), (status = 404, description = "Not Found")))]
pub async fn stats(State(state): State<ServerState>, ApiPath(id): ApiPath<Uuid>) -> ApiResult<ContactStats> {
    Ok(Json(ApiResponse::ok(state.services.contacts.stats(id).await?)))
}

#[utoipa::path(get, path = "/contacts/{id}/calls", tag = "activities", params(("id" = Uuid, Path, description = "Contact ID"), crate::openapi::ListParams), responses((status = 200, description = "Calls, newest first"), (status = 404, description = "Not Found")))]
pub async fn list_calls(State(state): State<ServerState>, ApiPath(id): ApiPath<Uuid>, ApiQuery(page): ApiQuery<Pagination>) -> ApiResult<Page<call::Model>> {
    Ok(Json(ApiResponse::ok(state.services.activities.list_calls(id, page).await?)))
}

#[utoipa::path(post, path = "/contacts/{id}/calls", tag = "activities", params(("id" = Uuid, Path, description = "Contact ID")), request_body = crate::openapi::LogCallDoc, responses((status = 201, description = "Logged"), (status = 400, description = "Bad Request"), (status = 404, description = "Not Found")))]
pub async fn log_call(
    State(state): State<ServerState>,
    Extension(me): Extension<CurrentUser>,
    ApiPath(id): ApiPath<Uuid>,
    ApiJson(input): ApiJson<LogCall>,
) -> Created<call::Model> {
    let created = state.services.activities.log_call(id, input, me.id).await?;
    Ok((StatusCode::CREATED, Json(ApiResponse::ok(created))))
}

#[utoipa::path(get, path = "/contacts/{id}/notes", tag = "activities", params(("id" = Uuid, Path, description = "Contact ID"), crate::openapi::ListParams), responses((status = 200, description = "Notes, newest first"), (status = 404, description = "Not Found")))]
pub async fn list_notes(State(state): State<ServerState>, ApiPath(id): ApiPath<Uuid>, ApiQuery(page): ApiQuery<Pagination>) -> ApiResult<Page<note::Model>> {
    Ok(Json(ApiResponse::ok(state.services.activities.list_notes(id, page).await?)))
}

#[utoipa::path(post, path = "/contacts/{id}/notes", tag = "activities", params(("id" = Uuid, Path, description = "Contact ID")), request_body = crate::openapi::AddNoteDoc, responses((status = 201, description = "Added"), (status = 400, description = "Bad Request"), (status = 404, description = "Not Found")))]
pub async fn add_note(
    State(state): State<ServerState>,
    Extension(me): Extension<CurrentUser>,
    ApiPath(id): ApiPath<Uuid>,
    ApiJson(input): ApiJson<AddNote>,
) -> Created<note::Model> {
    let created = state.services.activities.add_note(id, input, me.id).await?;
    Ok((StatusCode::CREATED, Json(ApiResponse::ok(created))))
}

#[utoipa::path(get, path = "/contacts/{id}/messages", tag = "activities", params(("id" = Uuid, Path, description = "Contact ID"), crate::openapi::ListParams), responses((status = 200, description = "Messages, newest first"), (status = 404, description = "Not Found")))]
pub async fn list_messages(State(state): State<ServerState>, ApiPath(id): ApiPath<Uuid>, ApiQuery(page): ApiQuery<Pagination>) -> ApiResult<Page<message::Model>> {
    Ok(Json(ApiResponse::ok(state.services.activities.list_messages(id, page).await?)))
}

#[utoipa::path(post, path = "/contacts/{id}/messages", tag = "activities", params(("id" = Uuid, Path, description = "Contact ID")), request_body = crate::openapi::LogMessageDoc, responses((status = 201, description = "Logged"), (status = 400, description = "Bad Request"), (status = 404, description = "Not Found")))]
pub async fn log_message(
    State(state): State<ServerState>,
    Extension(me): Extension<CurrentUser>,
    ApiPath(id): ApiPath<Uuid>,
    ApiJson(input): ApiJson<LogMessage>,
) -> Created<message::Model> {
    let created = state.services.activities.log_message(id, input, me.id).await?;
    Ok((StatusCode::CREATED, Json(ApiResponse::ok(created))))
}
