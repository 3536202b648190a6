use chrono::{NaiveDateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension};

use crate::models::{
    Actor, Booking, BookingStatus, CarOwner, ImageKind, Review, Role, Service, ShopOwner,
    ShopRating, User, Vehicle,
};

pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

pub fn format_ts(ts: &NaiveDateTime) -> String {
    ts.format(TIMESTAMP_FORMAT).to_string()
}

fn parse_ts(s: &str) -> NaiveDateTime {
    NaiveDateTime::parse_from_str(s, TIMESTAMP_FORMAT).unwrap_or_else(|_| Utc::now().naive_utc())
}

// ── Users & Sessions ──

pub fn insert_user(conn: &Connection, user: &User) -> anyhow::Result<()> {
    conn.execute(
        "INSERT INTO users (id, email, name, role, created_at) VALUES (?1, ?2, ?3, ?4, ?5)",
        params![
            user.id,
            user.email,
            user.name,
            user.role.as_str(),
            format_ts(&user.created_at),
        ],
    )?;
    Ok(())
}

pub fn email_taken(conn: &Connection, email: &str) -> anyhow::Result<bool> {
    let count: i64 = conn.query_row(
        "SELECT COUNT(*) FROM users WHERE email = ?1",
        params![email],
        |row| row.get(0),
    )?;
    Ok(count > 0)
}

pub fn insert_shop_owner(conn: &Connection, shop: &ShopOwner) -> anyhow::Result<()> {
    conn.execute(
        "INSERT INTO shop_owners (id, user_id, shop_name, address, city, phone, description)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
        params![
            shop.id,
            shop.user_id,
            shop.shop_name,
            shop.address,
            shop.city,
            shop.phone,
            shop.description,
        ],
    )?;
    Ok(())
}

pub fn insert_car_owner(conn: &Connection, owner: &CarOwner) -> anyhow::Result<()> {
    conn.execute(
        "INSERT INTO car_owners (id, user_id, phone) VALUES (?1, ?2, ?3)",
        params![owner.id, owner.user_id, owner.phone],
    )?;
    Ok(())
}

pub fn insert_session(
    conn: &Connection,
    token: &str,
    user_id: &str,
    expires_at: Option<&NaiveDateTime>,
) -> anyhow::Result<()> {
    conn.execute(
        "INSERT INTO sessions (token, user_id, expires_at) VALUES (?1, ?2, ?3)",
        params![token, user_id, expires_at.map(format_ts)],
    )?;
    Ok(())
}

/// Resolves a live session token to the caller and their role profile.
pub fn find_actor_by_token(
    conn: &Connection,
    token: &str,
    now: &NaiveDateTime,
) -> anyhow::Result<Option<Actor>> {
    let row = conn
        .query_row(
            "SELECT u.id, u.role, COALESCE(so.id, co.id)
             FROM sessions s
             JOIN users u ON u.id = s.user_id
             LEFT JOIN shop_owners so ON so.user_id = u.id AND u.role = 'SHOP_OWNER'
             LEFT JOIN car_owners co ON co.user_id = u.id AND u.role = 'CAR_OWNER'
             WHERE s.token = ?1 AND (s.expires_at IS NULL OR s.expires_at > ?2)",
            params![token, format_ts(now)],
            |row| {
                Ok((
                    row.get::<_, String>(0)?,
                    row.get::<_, String>(1)?,
                    row.get::<_, Option<String>>(2)?,
                ))
            },
        )
        .optional()?;

    Ok(row.and_then(|(user_id, role, profile_id)| {
        Some(Actor::new(user_id, Role::parse(&role)?, profile_id?))
    }))
}

// ── Shops ──

const SHOP_COLUMNS: &str = "id, user_id, shop_name, address, city, phone, description";

fn parse_shop_row(row: &rusqlite::Row) -> rusqlite::Result<ShopOwner> {
    Ok(ShopOwner {
        id: row.get(0)?,
        user_id: row.get(1)?,
        shop_name: row.get(2)?,
        address: row.get(3)?,
        city: row.get(4)?,
        phone: row.get(5)?,
        description: row.get(6)?,
    })
}

pub fn get_shop(conn: &Connection, id: &str) -> anyhow::Result<Option<ShopOwner>> {
    let shop = conn
        .query_row(
            &format!("SELECT {SHOP_COLUMNS} FROM shop_owners WHERE id = ?1"),
            params![id],
            parse_shop_row,
        )
        .optional()?;
    Ok(shop)
}

pub fn list_shops(conn: &Connection, city: Option<&str>) -> anyhow::Result<Vec<ShopOwner>> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {SHOP_COLUMNS} FROM shop_owners
         WHERE ?1 IS NULL OR LOWER(city) = LOWER(?1)
         ORDER BY shop_name ASC"
    ))?;
    let rows = stmt.query_map(params![city], parse_shop_row)?;

    let mut shops = vec![];
    for row in rows {
        shops.push(row?);
    }
    Ok(shops)
}

// ── Services ──

const SERVICE_COLUMNS: &str = "id, shop_owner_id, name, description, price, duration_minutes, category, is_active, created_at, updated_at";

fn parse_service_row(row: &rusqlite::Row) -> rusqlite::Result<Service> {
    let created_at: String = row.get(8)?;
    let updated_at: String = row.get(9)?;
    Ok(Service {
        id: row.get(0)?,
        shop_owner_id: row.get(1)?,
        name: row.get(2)?,
        description: row.get(3)?,
        price: row.get(4)?,
        duration_minutes: row.get(5)?,
        category: row.get(6)?,
        is_active: row.get::<_, i32>(7)? != 0,
        created_at: parse_ts(&created_at),
        updated_at: parse_ts(&updated_at),
    })
}

pub fn insert_service(conn: &Connection, service: &Service) -> anyhow::Result<()> {
    conn.execute(
        "INSERT INTO services (id, shop_owner_id, name, description, price, duration_minutes, category, is_active, created_at, updated_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)",
        params![
            service.id,
            service.shop_owner_id,
            service.name,
            service.description,
            service.price,
            service.duration_minutes,
            service.category,
            service.is_active as i32,
            format_ts(&service.created_at),
            format_ts(&service.updated_at),
        ],
    )?;
    Ok(())
}

pub fn get_service(conn: &Connection, id: &str) -> anyhow::Result<Option<Service>> {
    let service = conn
        .query_row(
            &format!("SELECT {SERVICE_COLUMNS} FROM services WHERE id = ?1"),
            params![id],
            parse_service_row,
        )
        .optional()?;
    Ok(service)
}

pub fn list_services_for_shop(
    conn: &Connection,
    shop_owner_id: &str,
    include_inactive: bool,
) -> anyhow::Result<Vec<Service>> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {SERVICE_COLUMNS} FROM services
         WHERE shop_owner_id = ?1 AND (?2 OR is_active = 1)
         ORDER BY price ASC, name ASC"
    ))?;
    let rows = stmt.query_map(params![shop_owner_id, include_inactive], parse_service_row)?;

    let mut services = vec![];
    for row in rows {
        services.push(row?);
    }
    Ok(services)
}

pub fn update_service(conn: &Connection, service: &Service) -> anyhow::Result<bool> {
    let count = conn.execute(
        "UPDATE services SET name = ?1, description = ?2, price = ?3, duration_minutes = ?4,
           category = ?5, is_active = ?6, updated_at = ?7
         WHERE id = ?8",
        params![
            service.name,
            service.description,
            service.price,
            service.duration_minutes,
            service.category,
            service.is_active as i32,
            format_ts(&service.updated_at),
            service.id,
        ],
    )?;
    Ok(count > 0)
}

pub fn delete_service(conn: &Connection, id: &str) -> anyhow::Result<bool> {
    let count = conn.execute("DELETE FROM services WHERE id = ?1", params![id])?;
    Ok(count > 0)
}

pub fn count_bookings_for_service(conn: &Connection, service_id: &str) -> anyhow::Result<i64> {
    let count: i64 = conn.query_row(
        "SELECT COUNT(*) FROM bookings WHERE service_id = ?1",
        params![service_id],
        |row| row.get(0),
    )?;
    Ok(count)
}

// ── Vehicles ──

const VEHICLE_COLUMNS: &str =
    "id, car_owner_id, make, model, year, license_plate, color, vehicle_type, created_at";

fn parse_vehicle_row(row: &rusqlite::Row) -> rusqlite::Result<Vehicle> {
    let created_at: String = row.get(8)?;
    Ok(Vehicle {
        id: row.get(0)?,
        car_owner_id: row.get(1)?,
        make: row.get(2)?,
        model: row.get(3)?,
        year: row.get(4)?,
        license_plate: row.get(5)?,
        color: row.get(6)?,
        vehicle_type: row.get(7)?,
        created_at: parse_ts(&created_at),
    })
}

pub fn insert_vehicle(conn: &Connection, vehicle: &Vehicle) -> anyhow::Result<()> {
    conn.execute(
        "INSERT INTO vehicles (id, car_owner_id, make, model, year, license_plate, color, vehicle_type, created_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
        params![
            vehicle.id,
            vehicle.car_owner_id,
            vehicle.make,
            vehicle.model,
            vehicle.year,
            vehicle.license_plate,
            vehicle.color,
            vehicle.vehicle_type,
            format_ts(&vehicle.created_at),
        ],
    )?;
    Ok(())
}

pub fn get_vehicle(conn: &Connection, id: &str) -> anyhow::Result<Option<Vehicle>> {
    let vehicle = conn
        .query_row(
            &format!("SELECT {VEHICLE_COLUMNS} FROM vehicles WHERE id = ?1"),
            params![id],
            parse_vehicle_row,
        )
        .optional()?;
    Ok(vehicle)
}

pub fn list_vehicles(conn: &Connection, car_owner_id: &str) -> anyhow::Result<Vec<Vehicle>> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {VEHICLE_COLUMNS} FROM vehicles WHERE car_owner_id = ?1 ORDER BY created_at ASC"
    ))?;
    let rows = stmt.query_map(params![car_owner_id], parse_vehicle_row)?;

    let mut vehicles = vec![];
    for row in rows {
        vehicles.push(row?);
    }
    Ok(vehicles)
}

pub fn count_vehicles(conn: &Connection, car_owner_id: &str) -> anyhow::Result<i64> {
    let count: i64 = conn.query_row(
        "SELECT COUNT(*) FROM vehicles WHERE car_owner_id = ?1",
        params![car_owner_id],
        |row| row.get(0),
    )?;
    Ok(count)
}

pub fn count_open_bookings_for_vehicle(conn: &Connection, vehicle_id: &str) -> anyhow::Result<i64> {
    let count: i64 = conn.query_row(
        "SELECT COUNT(*) FROM bookings
         WHERE vehicle_id = ?1 AND status NOT IN ('COMPLETED', 'CANCELLED')",
        params![vehicle_id],
        |row| row.get(0),
    )?;
    Ok(count)
}

pub fn delete_vehicle(conn: &Connection, id: &str) -> anyhow::Result<bool> {
    let count = conn.execute("DELETE FROM vehicles WHERE id = ?1", params![id])?;
    Ok(count > 0)
}

// ── Bookings ──

const BOOKING_COLUMNS: &str = "id, car_owner_id, shop_owner_id, service_id, vehicle_id, scheduled_at, status, total_amount, notes, before_images, after_images, completed_at, created_at, updated_at";

pub fn insert_booking(conn: &Connection, booking: &Booking) -> anyhow::Result<()> {
    conn.execute(
        "INSERT INTO bookings (id, car_owner_id, shop_owner_id, service_id, vehicle_id, scheduled_at, status, total_amount, notes, before_images, after_images, completed_at, created_at, updated_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14)",
        params![
            booking.id,
            booking.car_owner_id,
            booking.shop_owner_id,
            booking.service_id,
            booking.vehicle_id,
            format_ts(&booking.scheduled_at),
            booking.status.as_str(),
            booking.total_amount,
            booking.notes,
            serde_json::to_string(&booking.before_images)?,
            serde_json::to_string(&booking.after_images)?,
            booking.completed_at.as_ref().map(format_ts),
            format_ts(&booking.created_at),
            format_ts(&booking.updated_at),
        ],
    )?;
    Ok(())
}

pub fn get_booking_by_id(conn: &Connection, id: &str) -> anyhow::Result<Option<Booking>> {
    let result = conn
        .query_row(
            &format!("SELECT {BOOKING_COLUMNS} FROM bookings WHERE id = ?1"),
            params![id],
            |row| Ok(parse_booking_row(row)),
        )
        .optional()?;

    result.transpose()
}

/// Bookings where the given profile is the car owner or the shop, newest
/// appointment first.
pub fn list_bookings(
    conn: &Connection,
    role: Role,
    profile_id: &str,
    status_filter: Option<BookingStatus>,
    limit: i64,
) -> anyhow::Result<Vec<Booking>> {
    let owner_column = match role {
        Role::CarOwner => "car_owner_id",
        Role::ShopOwner => "shop_owner_id",
    };

    let mut stmt = conn.prepare(&format!(
        "SELECT {BOOKING_COLUMNS} FROM bookings
         WHERE {owner_column} = ?1 AND (?2 IS NULL OR status = ?2)
         ORDER BY scheduled_at DESC LIMIT ?3"
    ))?;
    let rows = stmt.query_map(
        params![profile_id, status_filter.map(|s| s.as_str()), limit],
        |row| Ok(parse_booking_row(row)),
    )?;

    let mut bookings = vec![];
    for row in rows {
        bookings.push(row??);
    }
    Ok(bookings)
}

/// Writes a new status only if the row still holds `expected`. Returns false
/// when another request changed it first.
pub fn transition_booking_status(
    conn: &Connection,
    id: &str,
    expected: BookingStatus,
    next: BookingStatus,
    notes: Option<&str>,
    completed_at: Option<&NaiveDateTime>,
    now: &NaiveDateTime,
) -> anyhow::Result<bool> {
    let count = conn.execute(
        "UPDATE bookings
         SET status = ?1, notes = ?2, completed_at = COALESCE(?3, completed_at), updated_at = ?4
         WHERE id = ?5 AND status = ?6",
        params![
            next.as_str(),
            notes,
            completed_at.map(format_ts),
            format_ts(now),
            id,
            expected.as_str(),
        ],
    )?;
    Ok(count > 0)
}

pub fn update_booking_notes(
    conn: &Connection,
    id: &str,
    notes: Option<&str>,
    now: &NaiveDateTime,
) -> anyhow::Result<bool> {
    let count = conn.execute(
        "UPDATE bookings SET notes = ?1, updated_at = ?2 WHERE id = ?3",
        params![notes, format_ts(now), id],
    )?;
    Ok(count > 0)
}

pub fn update_booking_images(
    conn: &Connection,
    id: &str,
    kind: ImageKind,
    images: &[String],
    now: &NaiveDateTime,
) -> anyhow::Result<bool> {
    let column = kind.column();
    let count = conn.execute(
        &format!("UPDATE bookings SET {column} = ?1, updated_at = ?2 WHERE id = ?3"),
        params![serde_json::to_string(images)?, format_ts(now), id],
    )?;
    Ok(count > 0)
}

fn parse_booking_row(row: &rusqlite::Row) -> anyhow::Result<Booking> {
    let scheduled_at_str: String = row.get(5)?;
    let status_str: String = row.get(6)?;
    let before_json: String = row.get(9)?;
    let after_json: String = row.get(10)?;
    let completed_at_str: Option<String> = row.get(11)?;
    let created_at_str: String = row.get(12)?;
    let updated_at_str: String = row.get(13)?;

    let status = BookingStatus::parse(&status_str)
        .ok_or_else(|| anyhow::anyhow!("unknown booking status in database: {status_str}"))?;

    Ok(Booking {
        id: row.get(0)?,
        car_owner_id: row.get(1)?,
        shop_owner_id: row.get(2)?,
        service_id: row.get(3)?,
        vehicle_id: row.get(4)?,
        scheduled_at: parse_ts(&scheduled_at_str),
        status,
        total_amount: row.get(7)?,
        notes: row.get(8)?,
        before_images: serde_json::from_str(&before_json).unwrap_or_default(),
        after_images: serde_json::from_str(&after_json).unwrap_or_default(),
        completed_at: completed_at_str.as_deref().map(parse_ts),
        created_at: parse_ts(&created_at_str),
        updated_at: parse_ts(&updated_at_str),
    })
}

// ── Reviews ──

pub fn insert_review(conn: &Connection, review: &Review) -> anyhow::Result<()> {
    conn.execute(
        "INSERT INTO reviews (id, booking_id, car_owner_id, shop_owner_id, rating, comment, created_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
        params![
            review.id,
            review.booking_id,
            review.car_owner_id,
            review.shop_owner_id,
            review.rating,
            review.comment,
            format_ts(&review.created_at),
        ],
    )?;
    Ok(())
}

pub fn review_exists_for_booking(conn: &Connection, booking_id: &str) -> anyhow::Result<bool> {
    let count: i64 = conn.query_row(
        "SELECT COUNT(*) FROM reviews WHERE booking_id = ?1",
        params![booking_id],
        |row| row.get(0),
    )?;
    Ok(count > 0)
}

pub fn list_reviews_for_shop(
    conn: &Connection,
    shop_owner_id: &str,
    limit: i64,
) -> anyhow::Result<Vec<Review>> {
    let mut stmt = conn.prepare(
        "SELECT id, booking_id, car_owner_id, shop_owner_id, rating, comment, created_at
         FROM reviews WHERE shop_owner_id = ?1 ORDER BY created_at DESC LIMIT ?2",
    )?;
    let rows = stmt.query_map(params![shop_owner_id, limit], |row| {
        let created_at: String = row.get(6)?;
        Ok(Review {
            id: row.get(0)?,
            booking_id: row.get(1)?,
            car_owner_id: row.get(2)?,
            shop_owner_id: row.get(3)?,
            rating: row.get(4)?,
            comment: row.get(5)?,
            created_at: parse_ts(&created_at),
        })
    })?;

    let mut reviews = vec![];
    for row in rows {
        reviews.push(row?);
    }
    Ok(reviews)
}

pub fn shop_rating(conn: &Connection, shop_owner_id: &str) -> anyhow::Result<ShopRating> {
    let rating = conn.query_row(
        "SELECT AVG(rating), COUNT(*) FROM reviews WHERE shop_owner_id = ?1",
        params![shop_owner_id],
        |row| {
            Ok(ShopRating {
                average: row.get(0)?,
                count: row.get(1)?,
            })
        },
    )?;
    Ok(rating)
}
