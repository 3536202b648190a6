use std::sync::Arc;

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::Json;
use chrono::Utc;
use serde::Deserialize;
use serde_json::{json, Value};

use crate::errors::AppError;
use crate::handlers::extract::{ApiJson, CurrentUser};
use crate::services::reviews::{self, CreateReviewRequest};
use crate::state::AppState;

// POST /api/reviews
pub async fn create_review(
    State(state): State<Arc<AppState>>,
    CurrentUser(actor): CurrentUser,
    ApiJson(body): ApiJson<CreateReviewRequest>,
) -> Result<(StatusCode, Json<Value>), AppError> {
    let review = {
        let db = state.conn()?;
        reviews::create_review(&db, &actor, body, Utc::now().naive_utc())?
    };

    Ok((
        StatusCode::CREATED,
        Json(json!({ "success": true, "review": review })),
    ))
}

// GET /api/shops/:id/reviews
#[derive(Deserialize)]
pub struct ReviewsQuery {
    pub limit: Option<i64>,
}

pub async fn list_shop_reviews(
    State(state): State<Arc<AppState>>,
    Path(shop_id): Path<String>,
    Query(query): Query<ReviewsQuery>,
) -> Result<Json<Value>, AppError> {
    let list = {
        let db = state.conn()?;
        reviews::list_shop_reviews(&db, &shop_id, query.limit)?
    };

    Ok(Json(json!({ "success": true, "reviews": list })))
}
