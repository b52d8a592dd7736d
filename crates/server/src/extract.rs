//! Extractors whose rejections render the `{success:false, error}` envelope instead of
//! axum's plain-text bodies.

use axum::extract::rejection::{JsonRejection, PathRejection, QueryRejection};
use axum::extract::{FromRequest, FromRequestParts};
use axum::http::StatusCode;

use crate::errors::ApiError;

#[derive(Debug, FromRequestParts)]
#[from_request(via(axum::extract::Query), rejection(ApiError))]
pub struct ApiQuery<T>(pub T);

#[derive(Debug, FromRequestParts)]
#[from_request(via(axum::extract::Path), rejection(ApiError))]
pub struct ApiPath<T>(pub T);

#[derive(Debug, FromRequest)]
#[from_request(via(axum::Json), rejection(ApiError))]
pub struct ApiJson<T>(pub T);

impl From<QueryRejection> for ApiError {
    fn from(r: QueryRejection) -> Self {
        ApiError::new(StatusCode::BAD_REQUEST, r.body_text())
    }
}

impl From<PathRejection> for ApiError {
    fn from(r: PathRejection) -> Self {
        ApiError::new(StatusCode::BAD_REQUEST, r.body_text())
    }
}

// keeps 415 for a missing content type and 422 for well-formed JSON of the wrong shape
impl From<JsonRejection> for ApiError {
    fn from(r: JsonRejection) -> Self {
        ApiError::new(r.status(), r.body_text())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::extract::Query;
    use axum::http::Request;
    use axum::response::IntoResponse;

    #[derive(Debug, serde::Deserialize)]
    #[allow(dead_code)]
    struct Filter {
        stage: models::deal::DealStage,
    }

    #[tokio::test]
    async fn query_rejection_uses_envelope() {
        let req = Request::builder().uri("/deals?stage=WON_ISH").body(Body::empty()).unwrap();
        let (mut parts, _) = req.into_parts();
        let rejection = Query::<Filter>::from_request_parts(&mut parts, &()).await.unwrap_err();
        let err = ApiError::from(rejection);
        assert_eq!(err.status, StatusCode::BAD_REQUEST);
        assert!(err.message.contains("WON_ISH"));
        assert_eq!(err.into_response().status(), StatusCode::BAD_REQUEST);
    }
}
