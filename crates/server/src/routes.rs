use axum::{
    middleware,
    routing::{get, post, put},
    Json, Router,
};
use tower_http::{
    cors::CorsLayer,
    trace::{DefaultMakeSpan, DefaultOnFailure, DefaultOnRequest, DefaultOnResponse, TraceLayer},
};
use tracing::Level;
use utoipa::OpenApi;

use common::types::Health;

use crate::openapi::ApiDoc;

pub mod auth;
pub mod companies;
pub mod contacts;
pub mod deals;
pub mod leads;
pub mod tasks;
pub mod users;

use auth::ServerState;

#[utoipa::path(get, path = "/health", tag = "health", responses((status = 200, description = "Liveness", body = crate::openapi::HealthResponse)))]
pub async fn health() -> Json<Health> {
    Json(Health { status: "ok" })
}

async fn openapi_json() -> Json<utoipa::openapi::OpenApi> {
    Json(ApiDoc::openapi())
}

/// Build the full application router: public health and docs endpoints plus the bearer-protected CRM API.
pub fn build_router(state: ServerState, cors: CorsLayer) -> Router {
    let public = Router::new()
        .route("/health", get(health))
        .route("/api-docs/openapi.json", get(openapi_json));

    // Static segments (pipeline, bulk, stats) win over `/:id` in the matcher.
    let api = Router::new()
        .route("/users", get(users::list))
        .route("/users/me", get(users::me))
        .route("/contacts", get(contacts::list).post(contacts::create))
        .route("/contacts/:id", get(contacts::get).put(contacts::update).delete(contacts::delete))
        .route("/contacts/:id/deactivate", post(contacts::deactivate))
        .route("/contacts/:id/stats", get(contacts::stats))
        .route("/contacts/:id/calls", get(contacts::list_calls).post(contacts::log_call))
        .route("/contacts/:id/notes", get(contacts::list_notes).post(contacts::add_note))
        .route("/contacts/:id/messages", get(contacts::list_messages).post(contacts::log_message))
        .route("/companies", get(companies::list).post(companies::create))
        .route("/companies/:id", get(companies::get).put(companies::update).delete(companies::delete))
        .route("/deals", get(deals::list).post(deals::create))
        .route("/deals/pipeline", get(deals::pipeline))
        .route("/deals/bulk", put(deals::bulk_update))
        .route("/deals/:id", get(deals::get).put(deals::update).delete(deals::delete))
        .route("/leads", get(leads::list).post(leads::create))
        .route("/leads/stats", get(leads::stats))
        .route("/leads/bulk", put(leads::bulk_update))
        .route("/leads/:id", get(leads::get).put(leads::update).delete(leads::delete))
        .route("/leads/:id/convert", post(leads::convert))
        .route("/tasks", get(tasks::list).post(tasks::create))
        .route("/tasks/:id", get(tasks::get).put(tasks::update).delete(tasks::delete))
        .route("/tasks/:id/complete", post(tasks::complete))
        .route_layer(middleware::from_fn_with_state(state.clone(), auth::require_bearer_token_state));

    public
        .merge(api)
        .with_state(state)
        .layer(cors)
        .layer(
            TraceLayer::new_for_http()
                // one INFO span per request, without headers
                .make_span_with(DefaultMakeSpan::new().level(Level::INFO).include_headers(false))
                .on_request(DefaultOnRequest::new().level(Level::INFO))
                // status and latency
                .on_response(DefaultOnResponse::new().level(Level::INFO).include_headers(false))
                .on_failure(DefaultOnFailure::new().level(Level::ERROR)),
        )
}
