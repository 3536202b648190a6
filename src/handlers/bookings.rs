use std::sync::Arc;

use axum::body::Bytes;
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::Json;
use chrono::Utc;
use serde::Deserialize;
use serde_json::{json, Value};

use crate::errors::AppError;
use crate::handlers::extract::{ApiJson, CurrentUser};
use crate::models::{BookingStatus, ImageKind};
use crate::services::bookings::{self, BookingPatch, CreateBookingRequest};
use crate::state::AppState;

// POST /api/bookings
pub async fn create_booking(
    State(state): State<Arc<AppState>>,
    CurrentUser(actor): CurrentUser,
    ApiJson(body): ApiJson<CreateBookingRequest>,
) -> Result<(StatusCode, Json<Value>), AppError> {
    let booking = {
        let db = state.conn()?;
        bookings::create_booking(&db, &actor, body, Utc::now().naive_utc())?
    };

    Ok((
        StatusCode::CREATED,
        Json(json!({ "success": true, "booking": booking })),
    ))
}

// GET /api/bookings
#[derive(Deserialize)]
pub struct BookingsQuery {
    pub status: Option<String>,
    pub limit: Option<i64>,
}

pub async fn list_bookings(
    State(state): State<Arc<AppState>>,
    CurrentUser(actor): CurrentUser,
    Query(query): Query<BookingsQuery>,
) -> Result<Json<Value>, AppError> {
    let status = match query.status.as_deref() {
        Some(raw) => Some(
            BookingStatus::parse(raw)
                .ok_or_else(|| AppError::Validation(format!("unknown status '{raw}'")))?,
        ),
        None => None,
    };

    let list = {
        let db = state.conn()?;
        bookings::list_bookings(&db, &actor, status, query.limit)?
    };

    Ok(Json(json!({ "success": true, "bookings": list })))
}

// GET /api/bookings/:id
pub async fn get_booking(
    State(state): State<Arc<AppState>>,
    CurrentUser(actor): CurrentUser,
    Path(id): Path<String>,
) -> Result<Json<Value>, AppError> {
    let booking = {
        let db = state.conn()?;
        bookings::get_booking(&db, &actor, &id)?
    };

    Ok(Json(json!({ "success": true, "booking": booking })))
}

// POST /api/bookings/:id/confirm
pub async fn confirm_booking(
    State(state): State<Arc<AppState>>,
    CurrentUser(actor): CurrentUser,
    Path(id): Path<String>,
) -> Result<Json<Value>, AppError> {
    let booking = {
        let db = state.conn()?;
        bookings::confirm_booking(&db, &actor, &id, Utc::now().naive_utc())?
    };

    Ok(Json(json!({ "success": true, "booking": booking })))
}

// POST /api/bookings/:id/cancel
#[derive(Deserialize, Default)]
pub struct CancelRequest {
    pub reason: Option<String>,
}

pub async fn cancel_booking(
    State(state): State<Arc<AppState>>,
    CurrentUser(actor): CurrentUser,
    Path(id): Path<String>,
    body: Bytes,
) -> Result<Json<Value>, AppError> {
    // The body is optional, but one that is sent must parse.
    let reason = if body.iter().all(u8::is_ascii_whitespace) {
        None
    } else {
        serde_json::from_slice::<CancelRequest>(&body)
            .map_err(|e| AppError::Validation(format!("invalid request body: {e}")))?
            .reason
    };

    let booking = {
        let db = state.conn()?;
        bookings::cancel_booking(&db, &actor, &id, reason.as_deref(), Utc::now().naive_utc())?
    };

    Ok(Json(json!({ "success": true, "booking": booking })))
}

// POST /api/bookings/:id/complete
pub async fn complete_booking(
    State(state): State<Arc<AppState>>,
    CurrentUser(actor): CurrentUser,
    Path(id): Path<String>,
) -> Result<Json<Value>, AppError> {
    let booking = {
        let db = state.conn()?;
        bookings::complete_booking(&db, &actor, &id, Utc::now().naive_utc())?
    };

    Ok(Json(json!({ "success": true, "booking": booking })))
}

// PATCH /api/bookings/:id
pub async fn patch_booking(
    State(state): State<Arc<AppState>>,
    CurrentUser(actor): CurrentUser,
    Path(id): Path<String>,
    ApiJson(patch): ApiJson<BookingPatch>,
) -> Result<Json<Value>, AppError> {
    let booking = {
        let mut db = state.conn()?;
        crate::db::in_transaction(&mut db, |tx| {
            bookings::patch_booking(tx, &actor, &id, patch, Utc::now().naive_utc())
        })?
    };

    Ok(Json(json!({ "success": true, "booking": booking })))
}

// POST /api/bookings/:id/images
#[derive(Deserialize)]
pub struct ImagesRequest {
    #[serde(rename = "type")]
    pub kind: ImageKind,
    pub images: Vec<String>,
}

pub async fn attach_images(
    State(state): State<Arc<AppState>>,
    CurrentUser(actor): CurrentUser,
    Path(id): Path<String>,
    ApiJson(body): ApiJson<ImagesRequest>,
) -> Result<Json<Value>, AppError> {
    let limits = state.image_limits();
    let booking = {
        let db = state.conn()?;
        bookings::attach_images(
            &db,
            &actor,
            &id,
            body.kind,
            body.images,
            limits,
            Utc::now().naive_utc(),
        )?
    };

    Ok(Json(json!({ "success": true, "booking": booking })))
}
