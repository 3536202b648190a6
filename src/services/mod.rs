pub mod accounts;
pub mod bookings;
pub mod catalog;
pub mod garage;
pub mod images;
pub mod lifecycle;
pub mod reviews;

use crate::errors::AppError;
use crate::models::{Actor, Role};

/// Rejects callers whose role does not match, returning their profile id.
pub fn require_role(actor: &Actor, role: Role) -> Result<&str, AppError> {
    if actor.role != role {
        return Err(AppError::Forbidden(format!("only a {role} can do this")));
    }
    Ok(&actor.profile_id)
}

pub(crate) fn non_empty(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

#[cfg(test)]
pub(crate) mod fixtures {
    use chrono::{Duration, NaiveDateTime, Utc};
    use rusqlite::Connection;

    use crate::db::{self, queries};
    use crate::models::{Actor, CarOwner, NewService, NewVehicle, Role, ShopOwner, User};

    pub fn setup_db() -> Connection {
        db::init_db(":memory:").unwrap()
    }

    pub fn now() -> NaiveDateTime {
        Utc::now().naive_utc()
    }

    pub fn tomorrow() -> NaiveDateTime {
        now() + Duration::days(1)
    }

    pub fn shop_owner(conn: &Connection, key: &str) -> Actor {
        let user = User {
            id: format!("user-{key}"),
            email: format!("{key}@shops.test"),
            name: format!("Owner {key}"),
            role: Role::ShopOwner,
            created_at: now(),
        };
        queries::insert_user(conn, &user).unwrap();
        let shop = ShopOwner {
            id: format!("shop-{key}"),
            user_id: user.id.clone(),
            shop_name: format!("Sparkle {key}"),
            address: None,
            city: Some("Pune".to_string()),
            phone: None,
            description: None,
        };
        queries::insert_shop_owner(conn, &shop).unwrap();
        Actor::new(user.id, Role::ShopOwner, shop.id)
    }

    pub fn car_owner(conn: &Connection, key: &str) -> Actor {
        let user = User {
            id: format!("user-{key}"),
            email: format!("{key}@cars.test"),
            name: format!("Driver {key}"),
            role: Role::CarOwner,
            created_at: now(),
        };
        queries::insert_user(conn, &user).unwrap();
        let owner = CarOwner {
            id: format!("car-{key}"),
            user_id: user.id.clone(),
            phone: None,
        };
        queries::insert_car_owner(conn, &owner).unwrap();
        Actor::new(user.id, Role::CarOwner, owner.id)
    }

    pub fn premium_wash() -> NewService {
        NewService {
            name: "Premium Wash".to_string(),
            description: Some("Foam wash with wax".to_string()),
            price: 399.0,
            duration_minutes: 45,
            category: "wash".to_string(),
        }
    }

    pub fn hatchback() -> NewVehicle {
        NewVehicle {
            make: "Maruti".to_string(),
            model: "Swift".to_string(),
            year: Some(2021),
            license_plate: "MH12AB1234".to_string(),
            color: Some("red".to_string()),
            vehicle_type: "hatchback".to_string(),
        }
    }
}
