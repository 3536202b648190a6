pub mod booking;
pub mod review;
pub mod service;
pub mod user;
pub mod vehicle;

pub use booking::{Booking, BookingStatus, ImageKind};
pub use review::{Review, ShopRating};
pub use service::{NewService, Service, ServicePatch};
pub use user::{Actor, CarOwner, Role, ShopOwner, User};
pub use vehicle::{NewVehicle, Vehicle};
