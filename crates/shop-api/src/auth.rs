//! # Authentication Extractor
//!
//! Authentication itself lives upstream (session service or reverse
//! proxy); by the time a request reaches this API it either carries a
//! verified `x-user-id` header or it doesn't. The extractor turns that
//! into "authenticated, as which user" — handlers that take an
//! [`AuthUser`] reject unauthenticated requests with 401 before running.

use crate::handlers::ErrorResponse;
use axum::extract::FromRequestParts;
use axum::http::{request::Parts, StatusCode};
use axum::Json;

pub const USER_ID_HEADER: &str = "x-user-id";

/// The authenticated user for this request
#[derive(Debug, Clone, Copy)]
pub struct AuthUser {
    pub user_id: i64,
}

impl<S> FromRequestParts<S> for AuthUser
where
    S: Send + Sync,
{
    type Rejection = (StatusCode, Json<ErrorResponse>);

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .headers
            .get(USER_ID_HEADER)
            .and_then(|value| value.to_str().ok())
            .and_then(|value| value.parse::<i64>().ok())
            .map(|user_id| AuthUser { user_id })
            .ok_or_else(|| {
                (
                    StatusCode::UNAUTHORIZED,
                    Json(ErrorResponse::new("Authentication required", 401)),
                )
            })
    }
}
