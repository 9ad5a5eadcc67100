pub mod access;
pub mod analytics;
pub mod bookings;
