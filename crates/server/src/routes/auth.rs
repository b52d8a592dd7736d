use std::sync::Arc;

use axum::{
    extract::{Request, State},
    http::{header, Method, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use service::{user_service::Claimed, Services};

use crate::errors::ApiError;

pub const AUTH_COOKIE: &str = "auth_token";

#[derive(Clone)]
pub struct ServerAuthConfig {
    pub jwt_secret: String,
}

#[derive(Clone)]
pub struct ServerState {
    pub services: Arc<Services>,
    pub auth: ServerAuthConfig,
}

/// Token claims issued by the identity provider. `uid` is the user's stable id.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String,
    pub uid: Uuid,
    #[serde(default)]
    pub name: Option<String>,
    pub exp: usize,
}

/// The verified caller, available to handlers through `Extension<CurrentUser>`.
#[derive(Debug, Clone, Copy)]
pub struct CurrentUser {
    pub id: Uuid,
}

/// HS256-sign a set of claims. Used by tooling and tests; the server itself only verifies.
pub fn sign_token(secret: &str, claims: &Claims) -> Result<String, jsonwebtoken::errors::Error> {
    encode(&Header::new(Algorithm::HS256), claims, &EncodingKey::from_secret(secret.as_bytes()))
}

fn is_public(path: &str, method: &Method) -> bool {
    path == "/health" || path.starts_with("/api-docs") || method == Method::OPTIONS
}

/// Bearer token from `Authorization`, falling back to the `auth_token` cookie.
/// `Err` carries the status to answer with: 400 when absent, 401 when malformed.
fn extract_token(req: &Request) -> Result<String, StatusCode> {
    if let Some(h) = req.headers().get(header::AUTHORIZATION).and_then(|v| v.to_str().ok()) {
        return match h.strip_prefix("Bearer ") {
            Some(t) if !t.trim().is_empty() => Ok(t.trim().to_string()),
            _ => Err(StatusCode::UNAUTHORIZED),
        };
    }
    let cookie_header = req.headers().get(header::COOKIE).and_then(|v| v.to_str().ok()).unwrap_or("");
    cookie_header
        .split(';')
        .filter_map(|kv| kv.trim().strip_prefix(AUTH_COOKIE).and_then(|rest| rest.strip_prefix('=')))
        .find(|t| !t.is_empty())
        .map(str::to_string)
        .ok_or(StatusCode::BAD_REQUEST)
}

/// Verify the caller's token, provision their user row on first sight and attach
/// `CurrentUser` to the request. Missing token: 400. Invalid or expired: 401.
pub async fn require_bearer_token_state(State(state): State<ServerState>, mut req: Request, next: Next) -> Response {
    let path = req.uri().path().to_string();
    if is_public(&path, req.method()) {
        return next.run(req).await;
    }

    let token = match extract_token(&req) {
        Ok(t) => t,
        Err(status) => {
            tracing::warn!(path = %path, status = status.as_u16(), "missing or malformed bearer token");
            let msg = if status == StatusCode::BAD_REQUEST { "Access token required" } else { "Invalid token" };
            return ApiError::new(status, msg).into_response();
        }
    };

    let key = DecodingKey::from_secret(state.auth.jwt_secret.as_bytes());
    let mut validation = Validation::new(Algorithm::HS256);
    validation.validate_exp = true;
    let claims = match decode::<Claims>(&token, &key, &validation) {
        Ok(data) => data.claims,
        Err(e) => {
            tracing::warn!(path = %path, err = %e, "token validation failed");
            return ApiError::new(StatusCode::UNAUTHORIZED, "Invalid or expired token").into_response();
        }
    };

    let claimed = Claimed { id: claims.uid, email: claims.sub.clone(), name: claims.name.clone().unwrap_or_default() };
    match state.services.users.ensure_user(&claimed).await {
        Ok(user) if user.is_active => {
            req.extensions_mut().insert(CurrentUser { id: user.id });
            next.run(req).await
        }
        Ok(_) => ApiError::new(StatusCode::UNAUTHORIZED, "User is inactive").into_response(),
        Err(e) => ApiError::from(e).into_response(),
    }
}
