use axum::{extract::State, Extension, Json};

use common::types::ApiResponse;
use models::user;

use super::auth::{CurrentUser, ServerState};
use crate::errors::ApiError;

#[utoipa::path(get, path = "/users", tag = "users", responses((status = 200, description = "Active users")))]
pub async fn list(State(state): State<ServerState>) -> Result<Json<ApiResponse<Vec<user::UserSummary>>>, ApiError> {
    let users = state.services.users.list_active().await?;
    Ok(Json(ApiResponse::ok(users)))
}

#[utoipa::path(get, path = "/users/me", tag = "users", responses((status = 200, description = "The caller"), (status = 401, description = "Unauthorized")))]
pub async fn me(State(state): State<ServerState>, Extension(me): Extension<CurrentUser>) -> Result<Json<ApiResponse<user::Model>>, ApiError> {
    let user = state.services.users.get(me.id).await?;
    Ok(Json(ApiResponse::ok(user)))
}
