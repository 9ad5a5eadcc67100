mod common;

use std::net::SocketAddr;

use axum::{
    body::{to_bytes, Body},
    extract::ConnectInfo,
    http::{header, Request, StatusCode},
    Router,
};
use sea_orm::{DatabaseBackend, MockDatabase};
use serde_json::Value;
use tower::ServiceExt;

use parkpass_backend::entities::{park_assignment, user::UserRole};
use parkpass_backend::routes::create_router;
use parkpass_backend::utils::jwt::create_token;

fn app(db: MockDatabase) -> Router {
    create_router(common::state(db.into_connection()))
}

fn request(method: &str, uri: &str, body: Body) -> Request<Body> {
    let mut request = Request::builder()
        .method(method)
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .body(body)
        .unwrap();
    request
        .extensions_mut()
        .insert(ConnectInfo(SocketAddr::from(([127, 0, 0, 1], 40000))));
    request
}

async fn json_body(response: axum::response::Response) -> Value {
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

#[tokio::test]
async fn health_check_responds() {
    let response = app(MockDatabase::new(DatabaseBackend::Postgres))
        .oneshot(request("GET", "/health", Body::empty()))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn payment_methods_are_public() {
    let response = app(MockDatabase::new(DatabaseBackend::Postgres))
        .oneshot(request("GET", "/api/payments/methods", Body::empty()))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = json_body(response).await;
    assert_eq!(body["success"], true);
    assert_eq!(body["data"].as_array().unwrap().len(), 2);
}

#[tokio::test]
async fn analytics_require_a_token() {
    let response = app(MockDatabase::new(DatabaseBackend::Postgres))
        .oneshot(request("GET", "/api/analytics/sales", Body::empty()))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    let body = json_body(response).await;
    assert_eq!(body["success"], false);
    assert_eq!(body["message"], "Not authorized to access this route");
}

#[tokio::test]
async fn ticket_checkers_cannot_read_analytics() {
    let checker = common::user_row(UserRole::TicketChecker);
    let token = create_token(checker.id, checker.role, common::JWT_SECRET, 1).unwrap();

    let db = MockDatabase::new(DatabaseBackend::Postgres)
        .append_query_results([vec![checker]])
        .append_query_results([Vec::<park_assignment::Model>::new()]);

    let mut req = request("GET", "/api/analytics/sales?period=weekly", Body::empty());
    req.headers_mut().insert(
        header::AUTHORIZATION,
        format!("Bearer {}", token).parse().unwrap(),
    );

    let response = app(db).oneshot(req).await.unwrap();
    assert_eq!(response.status(), StatusCode::FORBIDDEN);

    let body = json_body(response).await;
    assert_eq!(
        body["message"],
        "User role ticket-checker is not authorized to access this route"
    );
}

#[tokio::test]
async fn invalid_booking_body_is_rejected_before_the_database() {
    let payload = serde_json::json!({
        "park": uuid::Uuid::new_v4(),
        "adults": -2,
        "children": 0,
        "visitorName": "Asha",
        "visitorEmail": "asha@example.com",
        "visitorPhone": "0771234567",
        "visitDate": "2026-07-04"
    });

    let response = app(MockDatabase::new(DatabaseBackend::Postgres))
        .oneshot(request("POST", "/api/bookings", Body::from(payload.to_string())))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}
