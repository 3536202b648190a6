use std::sync::Arc;

use axum::extract::{Path, Query, State};
use axum::Json;
use serde::Deserialize;
use serde_json::{json, Value};

use crate::errors::AppError;
use crate::services::catalog;
use crate::state::AppState;

// GET /api/shops
#[derive(Deserialize)]
pub struct ShopsQuery {
    pub city: Option<String>,
}

pub async fn list_shops(
    State(state): State<Arc<AppState>>,
    Query(query): Query<ShopsQuery>,
) -> Result<Json<Value>, AppError> {
    let shops = {
        let db = state.conn()?;
        catalog::list_shops(&db, query.city.as_deref())?
    };

    Ok(Json(json!({ "success": true, "shops": shops })))
}

// GET /api/shops/:id
pub async fn get_shop(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<Value>, AppError> {
    let shop = {
        let db = state.conn()?;
        catalog::get_shop(&db, &id)?
    };

    Ok(Json(json!({ "success": true, "shop": shop })))
}

// GET /api/shops/:id/services
pub async fn list_shop_services(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<Value>, AppError> {
    let services = {
        let db = state.conn()?;
        catalog::list_shop_services(&db, &id, false)?
    };

    Ok(Json(json!({ "success": true, "services": services })))
}
