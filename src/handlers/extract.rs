use std::sync::Arc;

use async_trait::async_trait;
use axum::extract::rejection::JsonRejection;
use axum::extract::{FromRequest, FromRequestParts};
use axum::http::header::AUTHORIZATION;
use axum::http::request::Parts;
use axum::http::HeaderMap;
use chrono::Utc;

use crate::db::queries;
use crate::errors::AppError;
use crate::models::Actor;
use crate::state::AppState;

/// `axum::Json`, but malformed bodies come back in the standard error
/// envelope.
#[derive(FromRequest)]
#[from_request(via(axum::Json), rejection(AppError))]
pub struct ApiJson<T>(pub T);

impl From<JsonRejection> for AppError {
    fn from(rejection: JsonRejection) -> Self {
        AppError::Validation(format!("invalid request body: {}", rejection.body_text()))
    }
}

fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|t| !t.is_empty())
}

/// The caller behind the session token. Rejects with 401 when the token is
/// missing, unknown or expired.
pub struct CurrentUser(pub Actor);

#[async_trait]
impl FromRequestParts<Arc<AppState>> for CurrentUser {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &Arc<AppState>,
    ) -> Result<Self, Self::Rejection> {
        let token = bearer_token(&parts.headers).ok_or(AppError::Unauthorized)?;
        let now = Utc::now().naive_utc();

        let actor = {
            let db = state.conn()?;
            queries::find_actor_by_token(&db, token, &now)?
        };

        actor.map(CurrentUser).ok_or(AppError::Unauthorized)
    }
}

pub fn check_admin(headers: &HeaderMap, expected_token: &str) -> Result<(), AppError> {
    match bearer_token(headers) {
        Some(token) if token == expected_token => Ok(()),
        _ => Err(AppError::Unauthorized),
    }
}
