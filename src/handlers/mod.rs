pub mod admin;
pub mod bookings;
pub mod extract;
pub mod health;
pub mod reviews;
pub mod services;
pub mod shops;
pub mod vehicles;
