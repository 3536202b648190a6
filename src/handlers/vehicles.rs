use std::sync::Arc;

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use chrono::Utc;
use serde_json::{json, Value};

use crate::errors::AppError;
use crate::handlers::extract::{ApiJson, CurrentUser};
use crate::models::NewVehicle;
use crate::services::garage;
use crate::state::AppState;

// GET /api/vehicles
pub async fn list_vehicles(
    State(state): State<Arc<AppState>>,
    CurrentUser(actor): CurrentUser,
) -> Result<Json<Value>, AppError> {
    let vehicles = {
        let db = state.conn()?;
        garage::list_vehicles(&db, &actor)?
    };

    Ok(Json(json!({ "success": true, "vehicles": vehicles })))
}

// POST /api/vehicles
pub async fn add_vehicle(
    State(state): State<Arc<AppState>>,
    CurrentUser(actor): CurrentUser,
    ApiJson(body): ApiJson<NewVehicle>,
) -> Result<(StatusCode, Json<Value>), AppError> {
    let vehicle = {
        let db = state.conn()?;
        garage::add_vehicle(&db, &actor, body, Utc::now().naive_utc())?
    };

    Ok((
        StatusCode::CREATED,
        Json(json!({ "success": true, "vehicle": vehicle })),
    ))
}

// DELETE /api/vehicles/:id
pub async fn delete_vehicle(
    State(state): State<Arc<AppState>>,
    CurrentUser(actor): CurrentUser,
    Path(id): Path<String>,
) -> Result<Json<Value>, AppError> {
    {
        let db = state.conn()?;
        garage::delete_vehicle(&db, &actor, &id)?;
    }

    Ok(Json(json!({ "success": true })))
}
