use chrono::NaiveDateTime;
use rusqlite::Connection;
use serde::Deserialize;

use crate::db::queries;
use crate::errors::AppError;
use crate::models::{Actor, Review};
use crate::services::bookings::load_booking;
use crate::services::lifecycle::{self, Action};
use crate::services::non_empty;

const MAX_COMMENT_CHARS: usize = 2000;

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateReviewRequest {
    pub booking_id: String,
    pub rating: i32,
    pub comment: Option<String>,
}

/// One review per completed booking, written by that booking's car owner.
pub fn create_review(
    conn: &Connection,
    actor: &Actor,
    request: CreateReviewRequest,
    now: NaiveDateTime,
) -> Result<Review, AppError> {
    if !(1..=5).contains(&request.rating) {
        return Err(AppError::Validation(
            "rating must be between 1 and 5".to_string(),
        ));
    }

    let comment = non_empty(request.comment);
    if comment
        .as_deref()
        .is_some_and(|c| c.chars().count() > MAX_COMMENT_CHARS)
    {
        return Err(AppError::Validation(format!(
            "comment is limited to {MAX_COMMENT_CHARS} characters"
        )));
    }

    let booking = load_booking(conn, &request.booking_id)?;
    lifecycle::authorize_booking(&booking, Action::Review, actor)?;

    if queries::review_exists_for_booking(conn, &booking.id)? {
        return Err(AppError::Validation(
            "this booking has already been reviewed".to_string(),
        ));
    }

    let review = Review {
        id: uuid::Uuid::new_v4().to_string(),
        booking_id: booking.id,
        car_owner_id: booking.car_owner_id,
        shop_owner_id: booking.shop_owner_id,
        rating: request.rating,
        comment,
        created_at: now,
    };
    queries::insert_review(conn, &review)?;

    tracing::info!(
        review_id = %review.id,
        booking_id = %review.booking_id,
        rating = review.rating,
        "review created"
    );
    Ok(review)
}

pub fn list_shop_reviews(
    conn: &Connection,
    shop_id: &str,
    limit: Option<i64>,
) -> Result<Vec<Review>, AppError> {
    if queries::get_shop(conn, shop_id)?.is_none() {
        return Err(AppError::NotFound("shop".to_string()));
    }
    let limit = limit.unwrap_or(50).clamp(1, 200);
    Ok(queries::list_reviews_for_shop(conn, shop_id, limit)?)
}
