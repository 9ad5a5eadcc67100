use axum::{
    extract::DefaultBodyLimit,
    middleware,
    routing::{get, post, put},
    Json, Router,
};
use serde_json::{json, Value};
use tower_http::services::ServeDir;

use crate::handlers::{analytics, auth, bookings, districts, parks, payments, uploads, users};
use crate::middleware::auth::{
    auth_middleware, require_park_manager, require_staff, require_super_admin,
};
use crate::middleware::rate_limit::create_public_governor;
use crate::middleware::staff_rate_limit::create_staff_governor;
use crate::AppState;

const MAX_UPLOAD_BYTES: usize = 5 * 1024 * 1024;

async fn health() -> Json<Value> {
    Json(json!({ "success": true, "message": "ParkPass API is running" }))
}

pub fn create_router(state: AppState) -> Router {
    // Per-IP limit for anonymous traffic, per-user limit for staff
    let public_governor = create_public_governor();
    let staff_governor = create_staff_governor();

    // Public auth routes
    let auth_public = Router::new()
        .route("/login", post(auth::login))
        .route("/forgotpassword", post(auth::forgot_password))
        .route("/verify-otp", post(auth::verify_otp))
        .route("/reset-password-with-otp", post(auth::reset_password_with_otp))
        .layer(public_governor.clone());

    // Own account (any role)
    let auth_private = Router::new()
        .route("/me", get(auth::me))
        .route("/updatedetails", put(auth::update_details))
        .route("/updatepassword", put(auth::update_password))
        .layer(staff_governor.clone())
        .layer(middleware::from_fn(require_staff))
        .layer(middleware::from_fn_with_state(state.clone(), auth_middleware));

    // Staff account management (super-admin)
    let user_routes = Router::new()
        .route("/users", get(users::list_users).post(users::create_user))
        .route(
            "/users/{id}",
            get(users::get_user)
                .put(users::update_user)
                .delete(users::delete_user),
        )
        .layer(staff_governor.clone())
        .layer(middleware::from_fn(require_super_admin))
        .layer(middleware::from_fn_with_state(state.clone(), auth_middleware));

    // Districts: public reads, super-admin writes
    let district_public = Router::new()
        .route("/", get(districts::list_districts))
        .route("/{id}", get(districts::get_district))
        .route("/{id}/parks", get(districts::district_parks))
        .layer(public_governor.clone());

    let district_admin = Router::new()
        .route("/", post(districts::create_district))
        .route(
            "/{id}",
            put(districts::update_district).delete(districts::delete_district),
        )
        .layer(staff_governor.clone())
        .layer(middleware::from_fn(require_super_admin))
        .layer(middleware::from_fn_with_state(state.clone(), auth_middleware));

    // Parks: public reads, managers write
    let park_public = Router::new()
        .route("/", get(parks::list_parks))
        .route("/{id}", get(parks::get_park))
        .layer(public_governor.clone());

    let park_admin = Router::new()
        .route("/", post(parks::create_park))
        .route("/{id}", put(parks::update_park).delete(parks::delete_park))
        .layer(staff_governor.clone())
        .layer(middleware::from_fn(require_park_manager))
        .layer(middleware::from_fn_with_state(state.clone(), auth_middleware));

    // Visitor side of the booking flow
    let booking_public = Router::new()
        .route("/", post(bookings::create_booking))
        .route("/{id}/payment", put(bookings::update_payment))
        .route("/{id}/ticket", get(bookings::generate_ticket))
        .route("/{id}/print", put(bookings::mark_printed))
        .layer(public_governor.clone());

    // Staff side: listing, status changes, gate validation
    let booking_staff = Router::new()
        .route("/", get(bookings::list_bookings))
        .route("/{id}", get(bookings::get_booking))
        .route("/{id}/status", put(bookings::update_status))
        .route(
            "/ticket/{ticket_no}",
            get(bookings::get_ticket_by_number).delete(bookings::delete_ticket),
        )
        .route(
            "/ticket/{ticket_no}/use",
            get(bookings::mark_used).put(bookings::mark_used),
        )
        .layer(staff_governor.clone())
        .layer(middleware::from_fn(require_staff))
        .layer(middleware::from_fn_with_state(state.clone(), auth_middleware));

    let ticket_public = Router::new()
        .route("/{id}", get(bookings::generate_ticket))
        .route("/{id}/print", put(bookings::mark_printed))
        .layer(public_governor.clone());

    let ticket_staff = Router::new()
        .route("/check/{ticket_no}", get(bookings::get_ticket_by_number))
        .layer(staff_governor.clone())
        .layer(middleware::from_fn(require_staff))
        .layer(middleware::from_fn_with_state(state.clone(), auth_middleware));

    let payment_routes = Router::new()
        .route("/process", post(payments::process_payment))
        .route("/methods", get(payments::payment_methods))
        .route("/{booking_id}", get(payments::payment_status))
        .layer(public_governor);

    let upload_routes = Router::new()
        .route("/", post(uploads::upload_image))
        .layer(DefaultBodyLimit::max(MAX_UPLOAD_BYTES))
        .layer(staff_governor.clone())
        .layer(middleware::from_fn(require_park_manager))
        .layer(middleware::from_fn_with_state(state.clone(), auth_middleware));

    let analytics_routes = Router::new()
        .route("/sales", get(analytics::sales))
        .route("/visitors", get(analytics::visitors))
        .route("/popularity", get(analytics::popularity))
        .route("/export/sales", get(analytics::export_sales))
        .layer(staff_governor)
        .layer(middleware::from_fn(require_park_manager))
        .layer(middleware::from_fn_with_state(state.clone(), auth_middleware));

    let upload_dir = ServeDir::new(&state.config.upload_dir);

    // Combine all routes
    Router::new()
        .route("/health", get(health))
        .nest("/api/auth", auth_public.merge(auth_private).merge(user_routes))
        .nest("/api/districts", district_public.merge(district_admin))
        .nest("/api/parks", park_public.merge(park_admin))
        .nest("/api/bookings", booking_public.merge(booking_staff))
        .nest("/api/tickets", ticket_public.merge(ticket_staff))
        .nest("/api/payments", payment_routes)
        .nest("/api/upload", upload_routes)
        .nest("/api/analytics", analytics_routes)
        .nest_service("/uploads", upload_dir)
        .with_state(state)
}
