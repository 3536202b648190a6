use std::sync::Arc;

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use chrono::Utc;
use serde::Deserialize;
use serde_json::{json, Value};

use crate::db;
use crate::errors::AppError;
use crate::handlers::extract::{ApiJson, CurrentUser};
use crate::models::{NewService, ServicePatch};
use crate::services::catalog;
use crate::state::AppState;

// GET /api/services
pub async fn list_own_services(
    State(state): State<Arc<AppState>>,
    CurrentUser(actor): CurrentUser,
) -> Result<Json<Value>, AppError> {
    let services = {
        let db = state.conn()?;
        catalog::list_own_services(&db, &actor)?
    };

    Ok(Json(json!({ "success": true, "services": services })))
}

// POST /api/services
pub async fn create_service(
    State(state): State<Arc<AppState>>,
    CurrentUser(actor): CurrentUser,
    ApiJson(body): ApiJson<NewService>,
) -> Result<(StatusCode, Json<Value>), AppError> {
    let service = {
        let db = state.conn()?;
        catalog::create_service(&db, &actor, body, Utc::now().naive_utc())?
    };

    Ok((
        StatusCode::CREATED,
        Json(json!({ "success": true, "service": service })),
    ))
}

// PUT /api/services
#[derive(Deserialize)]
pub struct ReplaceServicesRequest {
    pub services: Vec<NewService>,
}

pub async fn replace_services(
    State(state): State<Arc<AppState>>,
    CurrentUser(actor): CurrentUser,
    ApiJson(body): ApiJson<ReplaceServicesRequest>,
) -> Result<Json<Value>, AppError> {
    let services = {
        let mut conn = state.conn()?;
        db::in_transaction(&mut conn, |tx| {
            catalog::replace_services(tx, &actor, body.services, Utc::now().naive_utc())
        })?
    };

    Ok(Json(json!({ "success": true, "services": services })))
}

// PATCH /api/services/:id
pub async fn update_service(
    State(state): State<Arc<AppState>>,
    CurrentUser(actor): CurrentUser,
    Path(id): Path<String>,
    ApiJson(patch): ApiJson<ServicePatch>,
) -> Result<Json<Value>, AppError> {
    let service = {
        let db = state.conn()?;
        catalog::update_service(&db, &actor, &id, patch, Utc::now().naive_utc())?
    };

    Ok(Json(json!({ "success": true, "service": service })))
}

// DELETE /api/services/:id
pub async fn delete_service(
    State(state): State<Arc<AppState>>,
    CurrentUser(actor): CurrentUser,
    Path(id): Path<String>,
) -> Result<Json<Value>, AppError> {
    {
        let db = state.conn()?;
        catalog::delete_service(&db, &actor, &id)?;
    }

    Ok(Json(json!({ "success": true })))
}
