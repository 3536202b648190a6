//! Shops and the services they offer.

use chrono::NaiveDateTime;
use rusqlite::Connection;
use serde::Serialize;

use crate::db::queries;
use crate::errors::AppError;
use crate::models::{Actor, NewService, Role, Service, ServicePatch, ShopOwner, ShopRating};
use crate::services::{non_empty, require_role};

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ShopSummary {
    #[serde(flatten)]
    pub shop: ShopOwner,
    pub rating: ShopRating,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ShopDetail {
    #[serde(flatten)]
    pub shop: ShopOwner,
    pub rating: ShopRating,
    pub services: Vec<Service>,
}

pub fn list_shops(conn: &Connection, city: Option<&str>) -> Result<Vec<ShopSummary>, AppError> {
    let city = city.map(str::trim).filter(|c| !c.is_empty());
    queries::list_shops(conn, city)?
        .into_iter()
        .map(|shop| -> Result<ShopSummary, AppError> {
            let rating = queries::shop_rating(conn, &shop.id)?;
            Ok(ShopSummary { shop, rating })
        })
        .collect()
}

pub fn get_shop(conn: &Connection, shop_id: &str) -> Result<ShopDetail, AppError> {
    let shop = load_shop(conn, shop_id)?;
    let rating = queries::shop_rating(conn, &shop.id)?;
    let services = queries::list_services_for_shop(conn, &shop.id, false)?;
    Ok(ShopDetail {
        shop,
        rating,
        services,
    })
}

pub fn list_shop_services(
    conn: &Connection,
    shop_id: &str,
    include_inactive: bool,
) -> Result<Vec<Service>, AppError> {
    let shop = load_shop(conn, shop_id)?;
    Ok(queries::list_services_for_shop(conn, &shop.id, include_inactive)?)
}

/// The caller's own menu, inactive services included.
pub fn list_own_services(conn: &Connection, actor: &Actor) -> Result<Vec<Service>, AppError> {
    let shop_id = require_role(actor, Role::ShopOwner)?;
    Ok(queries::list_services_for_shop(conn, shop_id, true)?)
}

pub fn create_service(
    conn: &Connection,
    actor: &Actor,
    new: NewService,
    now: NaiveDateTime,
) -> Result<Service, AppError> {
    let shop_id = require_role(actor, Role::ShopOwner)?;
    let service = build_service(shop_id, new, now)?;
    queries::insert_service(conn, &service)?;

    tracing::info!(service_id = %service.id, shop_id = %shop_id, "service created");
    Ok(service)
}

pub fn update_service(
    conn: &Connection,
    actor: &Actor,
    id: &str,
    patch: ServicePatch,
    now: NaiveDateTime,
) -> Result<Service, AppError> {
    let mut service = load_own_service(conn, actor, id)?;

    if let Some(name) = patch.name {
        service.name = name.trim().to_string();
    }
    if patch.description.is_some() {
        service.description = non_empty(patch.description);
    }
    if let Some(price) = patch.price {
        service.price = price;
    }
    if let Some(duration) = patch.duration_minutes {
        service.duration_minutes = duration;
    }
    if let Some(category) = patch.category {
        service.category = category.trim().to_string();
    }
    if let Some(active) = patch.is_active {
        service.is_active = active;
    }
    validate_fields(&service.name, service.price, service.duration_minutes)?;
    service.updated_at = now;

    queries::update_service(conn, &service)?;
    tracing::info!(service_id = %service.id, active = service.is_active, "service updated");
    Ok(service)
}

/// Services that have ever been booked stay in place; deactivate them instead.
pub fn delete_service(conn: &Connection, actor: &Actor, id: &str) -> Result<(), AppError> {
    let service = load_own_service(conn, actor, id)?;

    let bookings = queries::count_bookings_for_service(conn, &service.id)?;
    if bookings > 0 {
        return Err(AppError::Validation(format!(
            "{} has {bookings} booking(s); deactivate it instead of deleting",
            service.name
        )));
    }

    queries::delete_service(conn, &service.id)?;
    tracing::info!(service_id = %service.id, "service deleted");
    Ok(())
}

/// Swaps the shop's whole menu for `services`. Booked services are
/// deactivated, the rest deleted. Run inside a transaction.
pub fn replace_services(
    conn: &Connection,
    actor: &Actor,
    services: Vec<NewService>,
    now: NaiveDateTime,
) -> Result<Vec<Service>, AppError> {
    let shop_id = require_role(actor, Role::ShopOwner)?;

    let fresh = services
        .into_iter()
        .map(|new| build_service(shop_id, new, now))
        .collect::<Result<Vec<_>, _>>()?;

    let mut retired = 0;
    for mut existing in queries::list_services_for_shop(conn, shop_id, true)? {
        if queries::count_bookings_for_service(conn, &existing.id)? > 0 {
            if existing.is_active {
                existing.is_active = false;
                existing.updated_at = now;
                queries::update_service(conn, &existing)?;
            }
        } else {
            queries::delete_service(conn, &existing.id)?;
        }
        retired += 1;
    }

    for service in &fresh {
        queries::insert_service(conn, service)?;
    }

    tracing::info!(
        shop_id = %shop_id,
        retired,
        created = fresh.len(),
        "service menu replaced"
    );
    Ok(fresh)
}

fn build_service(shop_id: &str, new: NewService, now: NaiveDateTime) -> Result<Service, AppError> {
    let name = new.name.trim().to_string();
    validate_fields(&name, new.price, new.duration_minutes)?;

    let category = new.category.trim().to_lowercase();
    Ok(Service {
        id: uuid::Uuid::new_v4().to_string(),
        shop_owner_id: shop_id.to_string(),
        name,
        description: non_empty(new.description),
        price: new.price,
        duration_minutes: new.duration_minutes,
        category: if category.is_empty() {
            "general".to_string()
        } else {
            category
        },
        is_active: true,
        created_at: now,
        updated_at: now,
    })
}

fn validate_fields(name: &str, price: f64, duration_minutes: i32) -> Result<(), AppError> {
    if name.is_empty() {
        return Err(AppError::Validation("service name is required".to_string()));
    }
    if !price.is_finite() || price < 0.0 {
        return Err(AppError::Validation(
            "price must be zero or more".to_string(),
        ));
    }
    if duration_minutes <= 0 {
        return Err(AppError::Validation(
            "duration must be at least one minute".to_string(),
        ));
    }
    Ok(())
}

fn load_shop(conn: &Connection, shop_id: &str) -> Result<ShopOwner, AppError> {
    queries::get_shop(conn, shop_id)?.ok_or_else(|| AppError::NotFound("shop".to_string()))
}

fn load_own_service(conn: &Connection, actor: &Actor, id: &str) -> Result<Service, AppError> {
    let shop_id = require_role(actor, Role::ShopOwner)?;
    let service = queries::get_service(conn, id)?
        .ok_or_else(|| AppError::NotFound("service".to_string()))?;
    if service.shop_owner_id != shop_id {
        return Err(AppError::Forbidden(
            "service belongs to another shop".to_string(),
        ));
    }
    Ok(service)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db;
    use crate::services::bookings::{self, CreateBookingRequest};
    use crate::services::fixtures::*;
    use crate::services::garage;

    fn book(conn: &Connection, shop: &Actor, service_id: &str) {
        let car = car_owner(conn, "booker");
        let vehicle = garage::add_vehicle(conn, &car, hatchback(), now()).unwrap();
        let at = tomorrow();
        bookings::create_booking(
            conn,
            &car,
            CreateBookingRequest {
                shop_id: shop.profile_id.clone(),
                service_id: service_id.to_string(),
                vehicle_id: vehicle.id,
                date: at.format("%Y-%m-%d").to_string(),
                time: at.format("%H:%M").to_string(),
                notes: None,
            },
            now(),
        )
        .unwrap();
    }

    #[test]
    fn test_create_service_validates() {
        let conn = setup_db();
        let shop = shop_owner(&conn, "a");

        let mut bad = premium_wash();
        bad.price = -1.0;
        assert!(matches!(
            create_service(&conn, &shop, bad, now()),
            Err(AppError::Validation(_))
        ));

        let mut bad = premium_wash();
        bad.name = "   ".to_string();
        assert!(create_service(&conn, &shop, bad, now()).is_err());

        let car = car_owner(&conn, "b");
        assert!(matches!(
            create_service(&conn, &car, premium_wash(), now()),
            Err(AppError::Forbidden(_))
        ));
    }

    #[test]
    fn test_delete_unbooked_service() {
        let conn = setup_db();
        let shop = shop_owner(&conn, "a");
        let service = create_service(&conn, &shop, premium_wash(), now()).unwrap();

        delete_service(&conn, &shop, &service.id).unwrap();
        assert!(queries::get_service(&conn, &service.id).unwrap().is_none());
    }

    #[test]
    fn test_booked_service_must_be_deactivated() {
        let conn = setup_db();
        let shop = shop_owner(&conn, "a");
        let service = create_service(&conn, &shop, premium_wash(), now()).unwrap();
        book(&conn, &shop, &service.id);

        let err = delete_service(&conn, &shop, &service.id).unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));

        let patch = ServicePatch {
            is_active: Some(false),
            ..Default::default()
        };
        let updated = update_service(&conn, &shop, &service.id, patch, now()).unwrap();
        assert!(!updated.is_active);
        assert!(list_shop_services(&conn, &shop.profile_id, false)
            .unwrap()
            .is_empty());
    }

    #[test]
    fn test_other_shop_cannot_edit() {
        let conn = setup_db();
        let shop = shop_owner(&conn, "a");
        let rival = shop_owner(&conn, "b");
        let service = create_service(&conn, &shop, premium_wash(), now()).unwrap();

        let err = delete_service(&conn, &rival, &service.id).unwrap_err();
        assert!(matches!(err, AppError::Forbidden(_)));
    }

    #[test]
    fn test_replace_services_keeps_booked_rows() {
        let mut conn = setup_db();
        let shop = shop_owner(&conn, "a");
        let booked = create_service(&conn, &shop, premium_wash(), now()).unwrap();
        let mut basic = premium_wash();
        basic.name = "Basic Wash".to_string();
        basic.price = 199.0;
        let unbooked = create_service(&conn, &shop, basic, now()).unwrap();
        book(&conn, &shop, &booked.id);

        let mut interior = premium_wash();
        interior.name = "Interior Detail".to_string();
        let created = db::in_transaction(&mut conn, |tx| {
            replace_services(tx, &shop, vec![interior], now())
        })
        .unwrap();
        assert_eq!(created.len(), 1);

        let all = list_own_services(&conn, &shop).unwrap();
        assert_eq!(all.len(), 2);
        assert!(all.iter().any(|s| s.id == booked.id && !s.is_active));
        assert!(all.iter().all(|s| s.id != unbooked.id));
    }

    #[test]
    fn test_replace_services_rolls_back_on_invalid_entry() {
        let mut conn = setup_db();
        let shop = shop_owner(&conn, "a");
        create_service(&conn, &shop, premium_wash(), now()).unwrap();

        let mut bad = premium_wash();
        bad.duration_minutes = 0;
        let result = db::in_transaction(&mut conn, |tx| {
            replace_services(tx, &shop, vec![premium_wash(), bad], now())
        });
        assert!(result.is_err());
        assert_eq!(list_own_services(&conn, &shop).unwrap().len(), 1);
    }

    #[test]
    fn test_shop_detail_lists_active_services() {
        let conn = setup_db();
        let shop = shop_owner(&conn, "a");
        create_service(&conn, &shop, premium_wash(), now()).unwrap();

        let detail = get_shop(&conn, &shop.profile_id).unwrap();
        assert_eq!(detail.services.len(), 1);
        assert_eq!(detail.rating.count, 0);
        assert!(detail.rating.average.is_none());

        assert!(matches!(
            get_shop(&conn, "missing"),
            Err(AppError::NotFound(_))
        ));
        assert_eq!(list_shops(&conn, Some("pune")).unwrap().len(), 1);
        assert!(list_shops(&conn, Some("Mumbai")).unwrap().is_empty());
    }
}
