mod common;

use chrono::{NaiveDate, Utc};
use sea_orm::{DatabaseBackend, MockDatabase, MockExecResult};
use uuid::Uuid;

use parkpass_backend::entities::booking::{BookingStatus, PaymentStatus};
use parkpass_backend::entities::{issued_ticket, user::UserRole};
use parkpass_backend::handlers::payments::complete_payment;
use parkpass_backend::services::bookings::{self, NewBooking};
use parkpass_backend::AppError;

fn new_booking(park_id: Uuid) -> NewBooking {
    NewBooking {
        park_id,
        adults: 2,
        children: 1,
        visitor_name: "Asha Perera".to_string(),
        visitor_email: "asha@example.com".to_string(),
        visitor_phone: "0771234567".to_string(),
        visit_date: NaiveDate::from_ymd_opt(2026, 7, 4).unwrap(),
    }
}

fn issued(ticket_no: &str) -> issued_ticket::Model {
    issued_ticket::Model {
        ticket_no: ticket_no.to_string(),
        issued_at: Utc::now().into(),
    }
}

/// Hands out `numbers` in order, then repeats the last one.
fn ticket_numbers(numbers: &'static [&'static str]) -> impl FnMut() -> String {
    let mut next = 0;
    move || {
        let ticket_no = numbers[next.min(numbers.len() - 1)];
        next += 1;
        ticket_no.to_string()
    }
}

fn updated(rows: u64) -> MockExecResult {
    MockExecResult {
        last_insert_id: 0,
        rows_affected: rows,
    }
}

#[tokio::test]
async fn create_booking_registers_ticket_and_prices_party() {
    let park = common::park(100.0, 50.0);
    let mut created = common::booking(park.id, "A1B2C3D4", BookingStatus::Active);
    created.payment_status = PaymentStatus::Pending;
    created.payment_id = None;

    let db = MockDatabase::new(DatabaseBackend::Postgres)
        .append_query_results([vec![park.clone()]])
        .append_query_results([Vec::<issued_ticket::Model>::new()])
        .append_query_results([vec![issued("A1B2C3D4")]])
        .append_query_results([vec![created.clone()]])
        .into_connection();

    let booking = bookings::create_booking(&db, new_booking(park.id)).await.unwrap();
    assert_eq!(booking.status, BookingStatus::Active);
    assert_eq!(booking.payment_status, PaymentStatus::Pending);
    assert_eq!(booking.ticket_no.len(), 8);

    let log = format!("{:?}", db.into_transaction_log());
    assert!(log.contains("issued_ticket"));
    assert!(log.contains("250.0"));
}

#[tokio::test]
async fn create_booking_for_unknown_park_is_not_found() {
    let db = MockDatabase::new(DatabaseBackend::Postgres)
        .append_query_results([Vec::<parkpass_backend::entities::park::Model>::new()])
        .into_connection();

    let err = bookings::create_booking(&db, new_booking(Uuid::new_v4()))
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::NotFound(_)));
}

#[tokio::test]
async fn issued_ticket_number_is_redrawn() {
    let park = common::park(100.0, 50.0);
    let mut created = common::booking(park.id, "FRESH002", BookingStatus::Active);
    created.payment_status = PaymentStatus::Pending;

    let db = MockDatabase::new(DatabaseBackend::Postgres)
        .append_query_results([vec![park.clone()]])
        .append_query_results([vec![issued("TAKEN001")]])
        .append_query_results([Vec::<issued_ticket::Model>::new()])
        .append_query_results([vec![issued("FRESH002")]])
        .append_query_results([vec![created.clone()]])
        .into_connection();

    let booking = bookings::create_booking_with(
        &db,
        new_booking(park.id),
        ticket_numbers(&["TAKEN001", "FRESH002"]),
    )
    .await
    .unwrap();
    assert_eq!(booking.ticket_no, "FRESH002");

    let log = db.into_transaction_log();
    let statements = format!("{:?}", log);
    assert!(statements.contains("TAKEN001"));
    assert!(statements.contains("ROLLBACK"));
    assert!(statements.contains("COMMIT"));
    assert!(!format!("{:?}", log.last()).contains("TAKEN001"));
}

#[tokio::test]
async fn exhausted_ticket_numbers_fail_without_inserting() {
    let park = common::park(100.0, 50.0);

    let mut mock = MockDatabase::new(DatabaseBackend::Postgres)
        .append_query_results([vec![park.clone()]]);
    for _ in 0..5 {
        mock = mock.append_query_results([vec![issued("TAKEN001")]]);
    }
    let db = mock.into_connection();

    let err = bookings::create_booking_with(&db, new_booking(park.id), ticket_numbers(&["TAKEN001"]))
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::Internal(ref m) if m.contains("unique ticket number")));

    let statements = format!("{:?}", db.into_transaction_log());
    assert!(!statements.contains("INSERT"));
    assert_eq!(statements.matches("ROLLBACK").count(), 5);
}

#[tokio::test]
async fn payment_update_leaves_booking_status_alone() {
    let park_id = Uuid::new_v4();
    let mut pending = common::booking(park_id, "PAY00001", BookingStatus::Active);
    pending.payment_status = PaymentStatus::Pending;
    pending.payment_id = None;
    let mut paid = pending.clone();
    paid.payment_status = PaymentStatus::Completed;
    paid.payment_id = Some("pm_test".to_string());

    let db = MockDatabase::new(DatabaseBackend::Postgres)
        .append_query_results([vec![pending.clone()]])
        .append_query_results([vec![paid]])
        .into_connection();

    let result = bookings::update_payment_status(
        &db,
        pending.id,
        PaymentStatus::Completed,
        Some("pm_test".to_string()),
    )
    .await
    .unwrap();
    assert_eq!(result.payment_status, PaymentStatus::Completed);
    assert_eq!(result.status, BookingStatus::Active);
}

#[tokio::test]
async fn mark_used_sets_status_and_actor() {
    let park_id = Uuid::new_v4();
    let checker = common::staff(UserRole::TicketChecker, vec![park_id]);
    let active = common::booking(park_id, "GATE0001", BookingStatus::Active);
    let mut used = active.clone();
    used.status = BookingStatus::Used;
    used.used_at = Some(Utc::now().into());
    used.used_by = Some(checker.id);

    let db = MockDatabase::new(DatabaseBackend::Postgres)
        .append_query_results([vec![active]])
        .append_exec_results([updated(1)])
        .append_query_results([vec![used]])
        .into_connection();

    let result = bookings::mark_ticket_as_used(&db, "GATE0001", &checker)
        .await
        .unwrap();
    assert_eq!(result.status, BookingStatus::Used);
    assert_eq!(result.used_by, Some(checker.id));
    assert!(result.used_at.is_some());
}

#[tokio::test]
async fn second_validation_is_a_conflict_with_the_record() {
    let park_id = Uuid::new_v4();
    let checker = common::staff(UserRole::TicketChecker, vec![park_id]);
    let mut used = common::booking(park_id, "GATE0002", BookingStatus::Used);
    let first_use = Utc::now();
    used.used_at = Some(first_use.into());

    let db = MockDatabase::new(DatabaseBackend::Postgres)
        .append_query_results([vec![used]])
        .into_connection();

    match bookings::mark_ticket_as_used(&db, "GATE0002", &checker).await {
        Err(AppError::StateConflict { message, record }) => {
            assert_eq!(message, "This ticket has already been used");
            assert_eq!(record["ticketNo"], "GATE0002");
            assert_eq!(record["status"], "used");
        }
        other => panic!("expected conflict, got {other:?}"),
    }
}

#[tokio::test]
async fn cancelled_ticket_is_rejected() {
    let park_id = Uuid::new_v4();
    let admin = common::staff(UserRole::SuperAdmin, vec![]);
    let cancelled = common::booking(park_id, "GATE0003", BookingStatus::Cancelled);

    let db = MockDatabase::new(DatabaseBackend::Postgres)
        .append_query_results([vec![cancelled]])
        .into_connection();

    match bookings::mark_ticket_as_used(&db, "GATE0003", &admin).await {
        Err(AppError::StateConflict { message, .. }) => {
            assert_eq!(message, "This ticket has been cancelled and cannot be used");
        }
        other => panic!("expected conflict, got {other:?}"),
    }
}

#[tokio::test]
async fn foreign_park_is_forbidden_before_status_is_checked() {
    let checker = common::staff(UserRole::TicketChecker, vec![Uuid::new_v4()]);
    let cancelled = common::booking(Uuid::new_v4(), "GATE0004", BookingStatus::Cancelled);

    let db = MockDatabase::new(DatabaseBackend::Postgres)
        .append_query_results([vec![cancelled]])
        .into_connection();

    let err = bookings::mark_ticket_as_used(&db, "GATE0004", &checker)
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::Forbidden(_)));
}

#[tokio::test]
async fn losing_a_concurrent_validation_reports_already_used() {
    let park_id = Uuid::new_v4();
    let checker = common::staff(UserRole::ParkAdmin, vec![park_id]);
    let active = common::booking(park_id, "GATE0005", BookingStatus::Active);
    let mut used = active.clone();
    used.status = BookingStatus::Used;

    let db = MockDatabase::new(DatabaseBackend::Postgres)
        .append_query_results([vec![active]])
        .append_exec_results([updated(0)])
        .append_query_results([vec![used]])
        .into_connection();

    match bookings::mark_ticket_as_used(&db, "GATE0005", &checker).await {
        Err(AppError::StateConflict { message, .. }) => {
            assert_eq!(message, "This ticket has already been used");
        }
        other => panic!("expected conflict, got {other:?}"),
    }
}

#[tokio::test]
async fn unknown_ticket_is_not_found() {
    let checker = common::staff(UserRole::SuperAdmin, vec![]);
    let db = MockDatabase::new(DatabaseBackend::Postgres)
        .append_query_results([Vec::<parkpass_backend::entities::booking::Model>::new()])
        .into_connection();

    let err = bookings::mark_ticket_as_used(&db, "NOPE0000", &checker)
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::NotFound(_)));
}

#[tokio::test]
async fn delete_ticket_returns_removed_booking() {
    let park_id = Uuid::new_v4();
    let admin = common::staff(UserRole::ParkAdmin, vec![park_id]);
    let existing = common::booking(park_id, "DEL00001", BookingStatus::Active);

    let db = MockDatabase::new(DatabaseBackend::Postgres)
        .append_query_results([vec![existing.clone()]])
        .append_exec_results([updated(1)])
        .into_connection();

    let deleted = bookings::delete_ticket_by_number(&db, "DEL00001", &admin)
        .await
        .unwrap();
    assert_eq!(deleted.id, existing.id);

    // Only the booking row goes; the issued ticket number is kept
    let log = format!("{:?}", db.into_transaction_log());
    assert!(!log.contains("issued_ticket"));
}

#[tokio::test]
async fn unpaid_booking_has_no_ticket() {
    let mut pending = common::booking(Uuid::new_v4(), "PDF00001", BookingStatus::Active);
    pending.payment_status = PaymentStatus::Pending;

    let db = MockDatabase::new(DatabaseBackend::Postgres)
        .append_query_results([vec![pending.clone()]])
        .into_connection();

    match bookings::render_ticket(&db, pending.id).await {
        Err(AppError::Validation(message)) => {
            assert_eq!(message, "Payment not completed for this booking");
        }
        other => panic!("expected validation error, got {:?}", other.map(|(name, _)| name)),
    }
}

#[tokio::test]
async fn completed_payment_cannot_be_processed_twice() {
    let paid = common::booking(Uuid::new_v4(), "PAY00002", BookingStatus::Active);

    let db = MockDatabase::new(DatabaseBackend::Postgres)
        .append_query_results([vec![paid.clone()]])
        .into_connection();

    let err = complete_payment(&db, paid.id).await.unwrap_err();
    assert!(matches!(err, AppError::Conflict(_)));
}
