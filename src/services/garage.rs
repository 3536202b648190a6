use chrono::NaiveDateTime;
use rusqlite::Connection;

use crate::db::queries;
use crate::errors::AppError;
use crate::models::{Actor, NewVehicle, Role, Vehicle};
use crate::services::{non_empty, require_role};

const DEFAULT_VEHICLE_TYPE: &str = "sedan";

pub fn add_vehicle(
    conn: &Connection,
    actor: &Actor,
    new: NewVehicle,
    now: NaiveDateTime,
) -> Result<Vehicle, AppError> {
    let owner_id = require_role(actor, Role::CarOwner)?;

    let make = new.make.trim().to_string();
    let model = new.model.trim().to_string();
    let license_plate = new.license_plate.trim().to_uppercase();
    if make.is_empty() || model.is_empty() || license_plate.is_empty() {
        return Err(AppError::Validation(
            "make, model and license plate are required".to_string(),
        ));
    }

    let vehicle_type = new.vehicle_type.trim().to_lowercase();
    let vehicle = Vehicle {
        id: uuid::Uuid::new_v4().to_string(),
        car_owner_id: owner_id.to_string(),
        make,
        model,
        year: new.year,
        license_plate,
        color: non_empty(new.color),
        vehicle_type: if vehicle_type.is_empty() {
            DEFAULT_VEHICLE_TYPE.to_string()
        } else {
            vehicle_type
        },
        created_at: now,
    };
    queries::insert_vehicle(conn, &vehicle)?;

    tracing::info!(vehicle_id = %vehicle.id, owner_id = %owner_id, "vehicle added");
    Ok(vehicle)
}

pub fn list_vehicles(conn: &Connection, actor: &Actor) -> Result<Vec<Vehicle>, AppError> {
    let owner_id = require_role(actor, Role::CarOwner)?;
    Ok(queries::list_vehicles(conn, owner_id)?)
}

/// Owners keep at least one vehicle, and a vehicle with open bookings stays.
pub fn delete_vehicle(conn: &Connection, actor: &Actor, id: &str) -> Result<(), AppError> {
    let owner_id = require_role(actor, Role::CarOwner)?;

    let vehicle = queries::get_vehicle(conn, id)?
        .ok_or_else(|| AppError::NotFound("vehicle".to_string()))?;
    if vehicle.car_owner_id != owner_id {
        return Err(AppError::Forbidden(
            "vehicle belongs to another account".to_string(),
        ));
    }

    if queries::count_vehicles(conn, owner_id)? <= 1 {
        return Err(AppError::Validation(
            "you must keep at least one vehicle".to_string(),
        ));
    }

    let open = queries::count_open_bookings_for_vehicle(conn, &vehicle.id)?;
    if open > 0 {
        return Err(AppError::Validation(format!(
            "vehicle has {open} upcoming booking(s)"
        )));
    }

    queries::delete_vehicle(conn, &vehicle.id)?;
    tracing::info!(vehicle_id = %vehicle.id, "vehicle deleted");
    Ok(())
}
