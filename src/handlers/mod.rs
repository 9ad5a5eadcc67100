pub mod analytics;
pub mod auth;
pub mod bookings;
pub mod districts;
pub mod parks;
pub mod payments;
pub mod uploads;
pub mod users;
