mod common;

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use axum::{extract::State, response::IntoResponse};
use sea_orm::{DatabaseBackend, DatabaseConnection, MockDatabase, MockExecResult};

use parkpass_backend::entities::user::{self, UserRole};
use parkpass_backend::extractors::ValidatedJson;
use parkpass_backend::handlers::auth::{forgot_password, ForgotPasswordRequest};
use parkpass_backend::mail::{Email, Mailer};
use parkpass_backend::{AppError, AppResult};

/// Refuses every message, as an unreachable relay would.
#[derive(Default)]
struct DownMailer {
    attempts: AtomicUsize,
}

#[async_trait]
impl Mailer for DownMailer {
    async fn send(&self, _email: Email) -> AppResult<()> {
        self.attempts.fetch_add(1, Ordering::SeqCst);
        Err(AppError::Internal("connection refused".to_string()))
    }
}

async fn request_reset(
    db: DatabaseConnection,
    mailer: Arc<DownMailer>,
    email: &str,
) -> (axum::http::StatusCode, serde_json::Value, DatabaseConnection) {
    let state = common::state_with_mailer(db, mailer);
    let db = state.db.clone();

    let response = forgot_password(
        State(state),
        ValidatedJson(ForgotPasswordRequest {
            email: email.to_string(),
        }),
    )
    .await
    .map(IntoResponse::into_response)
    .unwrap_or_else(IntoResponse::into_response);

    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let body: serde_json::Value = serde_json::from_slice(&bytes).unwrap();

    let db = Arc::try_unwrap(db).ok().expect("state still shared");
    (status, body, db)
}

fn with_otp(mut row: user::Model) -> user::Model {
    row.reset_otp_hash = Some("hashed".to_string());
    row.reset_otp_expires_at = Some(chrono::Utc::now().into());
    row
}

#[tokio::test]
async fn failed_otp_email_answers_like_unknown_account() {
    let account = common::user_row(UserRole::Visitor);
    let mailer = Arc::new(DownMailer::default());

    let known = MockDatabase::new(DatabaseBackend::Postgres)
        .append_query_results([vec![account.clone()]])
        .append_query_results([vec![with_otp(account.clone())]])
        .append_exec_results([MockExecResult {
            last_insert_id: 0,
            rows_affected: 1,
        }])
        .into_connection();
    let (known_status, known_body, known_db) =
        request_reset(known, mailer.clone(), &account.email).await;

    let unknown = MockDatabase::new(DatabaseBackend::Postgres)
        .append_query_results([Vec::<user::Model>::new()])
        .into_connection();
    let (unknown_status, unknown_body, _) =
        request_reset(unknown, mailer.clone(), "nobody@parkpass.local").await;

    assert_eq!(mailer.attempts.load(Ordering::SeqCst), 1);
    assert_eq!(known_status, axum::http::StatusCode::OK);
    assert_eq!(known_status, unknown_status);
    assert_eq!(known_body["success"], unknown_body["success"]);
    assert_eq!(known_body["message"], unknown_body["message"]);

    // The stored code is wiped after the send fails
    let log = known_db.into_transaction_log();
    assert_eq!(log.len(), 3);
    let cleared = format!("{:?}", log[2]);
    assert!(cleared.contains("UPDATE"));
    assert!(cleared.contains("\"reset_otp_hash\" = $1"));
    assert!(cleared.contains("\"reset_otp_expires_at\" = $2"));
}
