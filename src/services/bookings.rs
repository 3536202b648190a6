use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use rusqlite::Connection;
use serde::Deserialize;

use crate::db::queries;
use crate::errors::AppError;
use crate::models::{Actor, Booking, BookingStatus, ImageKind, Role};
use crate::services::images::{self, ImageLimits};
use crate::services::lifecycle::{self, Action, LifecycleError};
use crate::services::{non_empty, require_role};

pub const DEFAULT_LIST_LIMIT: i64 = 50;
const MAX_LIST_LIMIT: i64 = 200;

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateBookingRequest {
    pub shop_id: String,
    pub service_id: String,
    pub vehicle_id: String,
    /// `YYYY-MM-DD`
    pub date: String,
    /// `HH:MM`, 24-hour
    pub time: String,
    pub notes: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BookingPatch {
    pub status: Option<BookingStatus>,
    pub notes: Option<String>,
}

pub fn parse_schedule(date: &str, time: &str) -> Result<NaiveDateTime, AppError> {
    let date = NaiveDate::parse_from_str(date.trim(), "%Y-%m-%d")
        .map_err(|_| AppError::Validation(format!("invalid date '{date}', expected YYYY-MM-DD")))?;
    let time = NaiveTime::parse_from_str(time.trim(), "%H:%M")
        .or_else(|_| NaiveTime::parse_from_str(time.trim(), "%H:%M:%S"))
        .map_err(|_| AppError::Validation(format!("invalid time '{time}', expected HH:MM")))?;
    Ok(date.and_time(time))
}

pub fn create_booking(
    conn: &Connection,
    actor: &Actor,
    request: CreateBookingRequest,
    now: NaiveDateTime,
) -> Result<Booking, AppError> {
    let car_owner_id = require_role(actor, Role::CarOwner)?;

    let scheduled_at = parse_schedule(&request.date, &request.time)?;
    if scheduled_at < now {
        return Err(AppError::Validation(
            "cannot book an appointment in the past".to_string(),
        ));
    }

    let shop = queries::get_shop(conn, &request.shop_id)?
        .ok_or_else(|| AppError::NotFound("shop".to_string()))?;

    let service = queries::get_service(conn, &request.service_id)?
        .filter(|s| s.shop_owner_id == shop.id)
        .ok_or_else(|| AppError::NotFound("service".to_string()))?;
    if !service.is_active {
        return Err(AppError::Validation(format!(
            "{} is no longer offered",
            service.name
        )));
    }

    let vehicle = queries::get_vehicle(conn, &request.vehicle_id)?
        .filter(|v| v.car_owner_id == car_owner_id)
        .ok_or_else(|| AppError::NotFound("vehicle".to_string()))?;

    let booking = Booking {
        id: uuid::Uuid::new_v4().to_string(),
        car_owner_id: car_owner_id.to_string(),
        shop_owner_id: shop.id,
        service_id: service.id,
        vehicle_id: Some(vehicle.id),
        scheduled_at,
        status: BookingStatus::Pending,
        total_amount: service.price,
        notes: non_empty(request.notes),
        before_images: vec![],
        after_images: vec![],
        completed_at: None,
        created_at: now,
        updated_at: now,
    };
    queries::insert_booking(conn, &booking)?;

    tracing::info!(
        booking_id = %booking.id,
        shop_id = %booking.shop_owner_id,
        scheduled_at = %booking.scheduled_at,
        "booking created"
    );
    Ok(booking)
}

pub fn confirm_booking(
    conn: &Connection,
    actor: &Actor,
    id: &str,
    now: NaiveDateTime,
) -> Result<Booking, AppError> {
    transition(conn, actor, id, Action::Confirm, None, now)
}

pub fn cancel_booking(
    conn: &Connection,
    actor: &Actor,
    id: &str,
    reason: Option<&str>,
    now: NaiveDateTime,
) -> Result<Booking, AppError> {
    transition(conn, actor, id, Action::Cancel, reason, now)
}

pub fn complete_booking(
    conn: &Connection,
    actor: &Actor,
    id: &str,
    now: NaiveDateTime,
) -> Result<Booking, AppError> {
    transition(conn, actor, id, Action::Complete, None, now)
}

fn transition(
    conn: &Connection,
    actor: &Actor,
    id: &str,
    action: Action,
    reason: Option<&str>,
    now: NaiveDateTime,
) -> Result<Booking, AppError> {
    let booking = load_booking(conn, id)?;
    apply_transition(conn, actor, booking, action, reason, now)
}

/// Guards and writes a transition against `booking` as previously read.
/// The write only lands if the stored status still matches it.
fn apply_transition(
    conn: &Connection,
    actor: &Actor,
    booking: Booking,
    action: Action,
    reason: Option<&str>,
    now: NaiveDateTime,
) -> Result<Booking, AppError> {
    let id = booking.id.as_str();
    let next = lifecycle::authorize_booking(&booking, action, actor)?;

    let notes = match reason.map(str::trim).filter(|r| !r.is_empty()) {
        Some(reason) if action == Action::Cancel => {
            Some(append_cancellation_reason(booking.notes.as_deref(), reason))
        }
        _ => booking.notes.clone(),
    };
    let completed_at = (next == BookingStatus::Completed).then_some(now);

    let written = queries::transition_booking_status(
        conn,
        id,
        booking.status,
        next,
        notes.as_deref(),
        completed_at.as_ref(),
        &now,
    )?;

    if !written {
        // Lost a race with another transition; report against the fresh state.
        let current = load_booking(conn, id)?.status;
        return Err(LifecycleError::InvalidTransition {
            action,
            from: current,
            to: next,
        }
        .into());
    }

    tracing::info!(
        booking_id = %id,
        from = %booking.status,
        to = %next,
        "booking status changed"
    );
    load_booking(conn, id)
}

fn append_cancellation_reason(notes: Option<&str>, reason: &str) -> String {
    match notes.filter(|n| !n.is_empty()) {
        Some(existing) => format!("{existing}\nCancellation reason: {reason}"),
        None => format!("Cancellation reason: {reason}"),
    }
}

/// Field patch. A status change goes through the same guard as the
/// dedicated confirm/cancel/complete routes.
pub fn patch_booking(
    conn: &Connection,
    actor: &Actor,
    id: &str,
    patch: BookingPatch,
    now: NaiveDateTime,
) -> Result<Booking, AppError> {
    if patch.status.is_none() && patch.notes.is_none() {
        return Err(AppError::Validation("nothing to update".to_string()));
    }

    let booking = load_booking(conn, id)?;
    if !is_party(&booking, actor) {
        return Err(AppError::Forbidden(
            "booking belongs to another account".to_string(),
        ));
    }
    if patch.notes.is_some() && booking.status.is_terminal() {
        return Err(AppError::Validation(format!(
            "notes cannot be changed once a booking is {}",
            booking.status
        )));
    }

    if let Some(status) = patch.status {
        let action = Action::for_status(status).ok_or(AppError::InvalidTransition {
            action: "move",
            from: booking.status.as_str(),
            to: status.as_str(),
        })?;
        transition(conn, actor, id, action, None, now)?;
    }

    if let Some(notes) = patch.notes {
        queries::update_booking_notes(conn, id, non_empty(Some(notes)).as_deref(), &now)?;
    }

    load_booking(conn, id)
}

pub fn attach_images(
    conn: &Connection,
    actor: &Actor,
    id: &str,
    kind: ImageKind,
    new_images: Vec<String>,
    limits: ImageLimits,
    now: NaiveDateTime,
) -> Result<Booking, AppError> {
    let booking = load_booking(conn, id)?;
    lifecycle::authorize_booking(&booking, Action::AttachImages, actor)?;

    let mut stored = match kind {
        ImageKind::Before => booking.before_images,
        ImageKind::After => booking.after_images,
    };
    images::validate_batch(stored.len(), &new_images, limits)?;

    let added = new_images.len();
    stored.extend(new_images);
    queries::update_booking_images(conn, id, kind, &stored, &now)?;

    tracing::info!(booking_id = %id, kind = ?kind, added, "booking images attached");
    load_booking(conn, id)
}

pub fn list_bookings(
    conn: &Connection,
    actor: &Actor,
    status: Option<BookingStatus>,
    limit: Option<i64>,
) -> Result<Vec<Booking>, AppError> {
    let limit = limit.unwrap_or(DEFAULT_LIST_LIMIT).clamp(1, MAX_LIST_LIMIT);
    Ok(queries::list_bookings(
        conn,
        actor.role,
        &actor.profile_id,
        status,
        limit,
    )?)
}

/// Bookings are only visible to the car owner and shop on them.
pub fn get_booking(conn: &Connection, actor: &Actor, id: &str) -> Result<Booking, AppError> {
    let booking = load_booking(conn, id)?;
    if !is_party(&booking, actor) {
        return Err(AppError::NotFound("booking".to_string()));
    }
    Ok(booking)
}

pub(crate) fn load_booking(conn: &Connection, id: &str) -> Result<Booking, AppError> {
    queries::get_booking_by_id(conn, id)?.ok_or_else(|| AppError::NotFound("booking".to_string()))
}

fn is_party(booking: &Booking, actor: &Actor) -> bool {
    match actor.role {
        Role::CarOwner => booking.car_owner_id == actor.profile_id,
        Role::ShopOwner => booking.shop_owner_id == actor.profile_id,
    }
}

#[cfg(test)]
mod tests {
    use chrono::Duration;

    use super::*;
    use crate::services::fixtures::*;
    use crate::services::{catalog, garage};

    const LIMITS: ImageLimits = ImageLimits {
        max_per_booking: 4,
        max_bytes: 4096,
    };

    struct World {
        conn: Connection,
        shop: Actor,
        car: Actor,
        service_id: String,
        vehicle_id: String,
    }

    fn world() -> World {
        let conn = setup_db();
        let shop = shop_owner(&conn, "a");
        let car = car_owner(&conn, "b");
        let service = catalog::create_service(&conn, &shop, premium_wash(), now()).unwrap();
        let vehicle = garage::add_vehicle(&conn, &car, hatchback(), now()).unwrap();
        World {
            conn,
            shop,
            car,
            service_id: service.id,
            vehicle_id: vehicle.id,
        }
    }

    fn request(w: &World, at: NaiveDateTime) -> CreateBookingRequest {
        CreateBookingRequest {
            shop_id: w.shop.profile_id.clone(),
            service_id: w.service_id.clone(),
            vehicle_id: w.vehicle_id.clone(),
            date: at.format("%Y-%m-%d").to_string(),
            time: at.format("%H:%M").to_string(),
            notes: Some("  please vacuum the boot ".to_string()),
        }
    }

    fn booked(w: &World) -> Booking {
        create_booking(&w.conn, &w.car, request(w, tomorrow()), now()).unwrap()
    }

    #[test]
    fn test_parse_schedule() {
        let dt = parse_schedule("2026-10-20", "14:30").unwrap();
        assert_eq!(dt.format("%Y-%m-%d %H:%M").to_string(), "2026-10-20 14:30");
        assert!(parse_schedule("20/10/2026", "14:30").is_err());
        assert!(parse_schedule("2026-10-20", "2pm").is_err());
    }

    #[test]
    fn test_create_booking_prices_from_service() {
        let w = world();
        let booking = booked(&w);
        assert_eq!(booking.status, BookingStatus::Pending);
        assert_eq!(booking.total_amount, 399.0);
        assert_eq!(booking.notes.as_deref(), Some("please vacuum the boot"));
        assert_eq!(booking.shop_owner_id, w.shop.profile_id);

        let stored = load_booking(&w.conn, &booking.id).unwrap();
        assert_eq!(stored.status, BookingStatus::Pending);
        assert_eq!(stored.vehicle_id.as_deref(), Some(w.vehicle_id.as_str()));
    }

    #[test]
    fn test_create_booking_in_past_fails() {
        let w = world();
        let yesterday = now() - Duration::days(1);
        let err = create_booking(&w.conn, &w.car, request(&w, yesterday), now()).unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));
    }

    #[test]
    fn test_create_booking_requires_car_owner() {
        let w = world();
        let err = create_booking(&w.conn, &w.shop, request(&w, tomorrow()), now()).unwrap_err();
        assert!(matches!(err, AppError::Forbidden(_)));
    }

    #[test]
    fn test_create_booking_with_foreign_service_is_not_found() {
        let w = world();
        let other = shop_owner(&w.conn, "c");
        let mut req = request(&w, tomorrow());
        req.shop_id = other.profile_id;
        let err = create_booking(&w.conn, &w.car, req, now()).unwrap_err();
        assert!(matches!(err, AppError::NotFound(ref what) if what == "service"));
    }

    #[test]
    fn test_create_booking_with_someone_elses_vehicle() {
        let w = world();
        let stranger = car_owner(&w.conn, "d");
        let err = create_booking(&w.conn, &stranger, request(&w, tomorrow()), now()).unwrap_err();
        assert!(matches!(err, AppError::NotFound(ref what) if what == "vehicle"));
    }

    #[test]
    fn test_inactive_service_cannot_be_booked() {
        let w = world();
        let patch = crate::models::ServicePatch {
            is_active: Some(false),
            ..Default::default()
        };
        catalog::update_service(&w.conn, &w.shop, &w.service_id, patch, now()).unwrap();
        let err = create_booking(&w.conn, &w.car, request(&w, tomorrow()), now()).unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));
    }

    #[test]
    fn test_full_lifecycle() {
        let w = world();
        let booking = booked(&w);

        let confirmed = confirm_booking(&w.conn, &w.shop, &booking.id, now()).unwrap();
        assert_eq!(confirmed.status, BookingStatus::Confirmed);

        let completed = complete_booking(&w.conn, &w.shop, &booking.id, now()).unwrap();
        assert_eq!(completed.status, BookingStatus::Completed);
        assert!(completed.completed_at.is_some());

        let err = cancel_booking(&w.conn, &w.shop, &booking.id, None, now()).unwrap_err();
        assert!(matches!(
            err,
            AppError::InvalidTransition {
                from: "COMPLETED",
                to: "CANCELLED",
                ..
            }
        ));
    }

    #[test]
    fn test_complete_from_pending_is_invalid() {
        let w = world();
        let booking = booked(&w);
        let err = complete_booking(&w.conn, &w.shop, &booking.id, now()).unwrap_err();
        assert!(matches!(err, AppError::InvalidTransition { from: "PENDING", .. }));
    }

    #[test]
    fn test_cancel_appends_reason_to_notes() {
        let w = world();
        let booking = booked(&w);
        let cancelled =
            cancel_booking(&w.conn, &w.shop, &booking.id, Some("water outage"), now()).unwrap();
        assert_eq!(cancelled.status, BookingStatus::Cancelled);
        assert_eq!(
            cancelled.notes.as_deref(),
            Some("please vacuum the boot\nCancellation reason: water outage")
        );
    }

    #[test]
    fn test_other_shop_cannot_confirm() {
        let w = world();
        let booking = booked(&w);
        let rival = shop_owner(&w.conn, "e");
        let err = confirm_booking(&w.conn, &rival, &booking.id, now()).unwrap_err();
        assert!(matches!(err, AppError::Forbidden(_)));
        assert_eq!(
            load_booking(&w.conn, &booking.id).unwrap().status,
            BookingStatus::Pending
        );
    }

    #[test]
    fn test_stale_transition_loses_race() {
        let w = world();
        let booking = booked(&w);
        let stale = load_booking(&w.conn, &booking.id).unwrap();

        // Another request cancels between our read and our write.
        cancel_booking(&w.conn, &w.shop, &booking.id, None, now()).unwrap();

        let err = apply_transition(&w.conn, &w.shop, stale, Action::Confirm, None, now())
            .unwrap_err();
        assert!(matches!(
            err,
            AppError::InvalidTransition {
                action: "confirm",
                from: "CANCELLED",
                to: "CONFIRMED",
            }
        ));
        assert_eq!(
            load_booking(&w.conn, &booking.id).unwrap().status,
            BookingStatus::Cancelled
        );
    }

    #[test]
    fn test_notes_frozen_after_cancellation() {
        let w = world();
        let booking = booked(&w);
        cancel_booking(&w.conn, &w.shop, &booking.id, Some("water outage"), now()).unwrap();

        let patch = BookingPatch {
            status: None,
            notes: Some(String::new()),
        };
        let err = patch_booking(&w.conn, &w.car, &booking.id, patch, now()).unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));

        let stored = load_booking(&w.conn, &booking.id).unwrap();
        assert_eq!(
            stored.notes.as_deref(),
            Some("please vacuum the boot\nCancellation reason: water outage")
        );
    }

    #[test]
    fn test_patch_status_uses_guard() {
        let w = world();
        let booking = booked(&w);

        let patch = BookingPatch {
            status: Some(BookingStatus::InProgress),
            notes: None,
        };
        let err = patch_booking(&w.conn, &w.shop, &booking.id, patch, now()).unwrap_err();
        assert!(matches!(err, AppError::InvalidTransition { to: "IN_PROGRESS", .. }));

        let patch = BookingPatch {
            status: Some(BookingStatus::Confirmed),
            notes: Some("bay 2".to_string()),
        };
        let patched = patch_booking(&w.conn, &w.shop, &booking.id, patch, now()).unwrap();
        assert_eq!(patched.status, BookingStatus::Confirmed);
        assert_eq!(patched.notes.as_deref(), Some("bay 2"));
    }

    #[test]
    fn test_car_owner_can_patch_notes_but_not_status() {
        let w = world();
        let booking = booked(&w);

        let patch = BookingPatch {
            status: None,
            notes: Some("gate code 4321".to_string()),
        };
        let patched = patch_booking(&w.conn, &w.car, &booking.id, patch, now()).unwrap();
        assert_eq!(patched.notes.as_deref(), Some("gate code 4321"));

        let patch = BookingPatch {
            status: Some(BookingStatus::Confirmed),
            notes: None,
        };
        let err = patch_booking(&w.conn, &w.car, &booking.id, patch, now()).unwrap_err();
        assert!(matches!(err, AppError::Forbidden(_)));
    }

    #[test]
    fn test_attach_images() {
        let w = world();
        let booking = booked(&w);
        let before = vec!["https://img.test/before-1.jpg".to_string()];

        let updated = attach_images(
            &w.conn,
            &w.shop,
            &booking.id,
            ImageKind::Before,
            before.clone(),
            LIMITS,
            now(),
        )
        .unwrap();
        assert_eq!(updated.before_images, before);
        assert!(updated.after_images.is_empty());

        let err = attach_images(
            &w.conn,
            &w.car,
            &booking.id,
            ImageKind::After,
            before,
            LIMITS,
            now(),
        )
        .unwrap_err();
        assert!(matches!(err, AppError::Forbidden(_)));
    }

    #[test]
    fn test_cannot_attach_images_to_cancelled_booking() {
        let w = world();
        let booking = booked(&w);
        cancel_booking(&w.conn, &w.shop, &booking.id, None, now()).unwrap();
        let err = attach_images(
            &w.conn,
            &w.shop,
            &booking.id,
            ImageKind::After,
            vec!["https://img.test/after.jpg".to_string()],
            LIMITS,
            now(),
        )
        .unwrap_err();
        assert!(matches!(err, AppError::InvalidTransition { .. }));
    }

    #[test]
    fn test_visibility_is_limited_to_parties() {
        let w = world();
        let booking = booked(&w);

        assert!(get_booking(&w.conn, &w.car, &booking.id).is_ok());
        assert!(get_booking(&w.conn, &w.shop, &booking.id).is_ok());

        let stranger = car_owner(&w.conn, "f");
        let err = get_booking(&w.conn, &stranger, &booking.id).unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));

        assert_eq!(list_bookings(&w.conn, &w.car, None, None).unwrap().len(), 1);
        assert_eq!(list_bookings(&w.conn, &w.shop, None, None).unwrap().len(), 1);
        assert!(list_bookings(&w.conn, &stranger, None, None).unwrap().is_empty());
        assert!(list_bookings(&w.conn, &w.shop, Some(BookingStatus::Confirmed), None)
            .unwrap()
            .is_empty());
    }
}
