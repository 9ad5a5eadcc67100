pub mod auth;
pub mod rate_limit;
pub mod staff_rate_limit;
