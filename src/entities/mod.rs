pub mod booking;
pub mod district;
pub mod issued_ticket;
pub mod park;
pub mod park_assignment;
pub mod user;
