use std::sync::Arc;

use axum::extract::State;
use axum::http::{HeaderMap, StatusCode};
use axum::Json;
use chrono::Utc;
use serde_json::{json, Value};

use crate::db;
use crate::errors::AppError;
use crate::handlers::extract::{check_admin, ApiJson};
use crate::services::accounts::{self, ProvisionRequest};
use crate::state::AppState;

// POST /api/admin/users
pub async fn provision_user(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    ApiJson(body): ApiJson<ProvisionRequest>,
) -> Result<(StatusCode, Json<Value>), AppError> {
    check_admin(&headers, &state.config.admin_token)?;

    let ttl = state.config.session_ttl_hours;
    let provisioned = {
        let mut conn = state.conn()?;
        db::in_transaction(&mut conn, |tx| {
            accounts::provision_user(tx, body, ttl, Utc::now().naive_utc())
        })?
    };

    Ok((
        StatusCode::CREATED,
        Json(json!({ "success": true, "account": provisioned })),
    ))
}
