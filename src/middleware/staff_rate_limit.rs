use axum::http::Request;
use std::sync::Arc;
use tower_governor::{
    governor::GovernorConfigBuilder, key_extractor::KeyExtractor, GovernorError, GovernorLayer,
};
use uuid::Uuid;

use crate::middleware::rate_limit::rate_limit_error_handler;
use crate::services::access::CurrentUser;

/// Keys requests by the authenticated user inserted by `auth_middleware`.
#[derive(Debug, Clone, Copy)]
pub struct UserIdExtractor;

impl KeyExtractor for UserIdExtractor {
    type Key = Uuid;

    fn extract<T>(&self, req: &Request<T>) -> Result<Self::Key, GovernorError> {
        req.extensions()
            .get::<CurrentUser>()
            .map(|user| user.id)
            .ok_or(GovernorError::UnableToExtractKey)
    }
}

pub type StaffGovernorLayer = GovernorLayer<
    UserIdExtractor,
    governor::middleware::NoOpMiddleware<governor::clock::QuantaInstant>,
    axum::body::Body,
>;

/// Per-user limit for staff routes: 500 requests per minute. Ticket checkers
/// scanning at a busy gate stay well under it.
pub fn create_staff_governor() -> StaffGovernorLayer {
    let config = Arc::new(
        GovernorConfigBuilder::default()
            .per_millisecond(120)
            .burst_size(500)
            .key_extractor(UserIdExtractor)
            .finish()
            .expect("staff governor config is valid"),
    );

    GovernorLayer::new(config).error_handler(rate_limit_error_handler)
}
