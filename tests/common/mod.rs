#![allow(dead_code)]

use std::sync::Arc;

use chrono::{NaiveDate, Utc};
use sea_orm::DatabaseConnection;
use uuid::Uuid;

use parkpass_backend::config::Config;
use parkpass_backend::entities::booking::{self, BookingStatus, PaymentStatus};
use parkpass_backend::entities::{park, user, user::UserRole};
use parkpass_backend::mail::{LogMailer, Mailer};
use parkpass_backend::services::access::CurrentUser;
use parkpass_backend::AppState;

pub const JWT_SECRET: &str = "test-secret";

pub fn config() -> Config {
    Config {
        database_url: "postgres://localhost/parkpass_test".to_string(),
        jwt_secret: JWT_SECRET.to_string(),
        jwt_expiration_hours: 1,
        server_host: "127.0.0.1".to_string(),
        server_port: 0,
        upload_dir: std::env::temp_dir()
            .join("parkpass-test-uploads")
            .to_string_lossy()
            .into_owned(),
        otp_ttl_minutes: 10,
        mail_from: "ParkPass <no-reply@parkpass.local>".to_string(),
        smtp: None,
        admin_email: "admin@parkpass.local".to_string(),
        admin_password: "admin123".to_string(),
    }
}

pub fn state(db: DatabaseConnection) -> AppState {
    state_with_mailer(db, Arc::new(LogMailer))
}

pub fn state_with_mailer(db: DatabaseConnection, mailer: Arc<dyn Mailer>) -> AppState {
    AppState {
        db: Arc::new(db),
        config: config(),
        mailer,
    }
}

pub fn park(adult_price: f64, child_price: f64) -> park::Model {
    park::Model {
        id: Uuid::new_v4(),
        name: "Yala".to_string(),
        description: None,
        district_id: Uuid::new_v4(),
        location: "Tissamaharama".to_string(),
        picture: "no-photo.jpg".to_string(),
        capacity: 200,
        adult_price,
        child_price,
        features: vec!["Safari".to_string()],
        opening_hours: "6:00 AM - 6:00 PM".to_string(),
        is_active: true,
        created_at: Utc::now().into(),
    }
}

pub fn booking(park_id: Uuid, ticket_no: &str, status: BookingStatus) -> booking::Model {
    booking::Model {
        id: Uuid::new_v4(),
        ticket_no: ticket_no.to_string(),
        park_id,
        visitor_name: "Asha Perera".to_string(),
        visitor_email: "asha@example.com".to_string(),
        visitor_phone: "0771234567".to_string(),
        adults: 2,
        children: 1,
        total_amount: 250.0,
        visit_date: NaiveDate::from_ymd_opt(2026, 7, 4).unwrap(),
        status,
        payment_status: PaymentStatus::Completed,
        payment_id: Some("pm_abc".to_string()),
        is_printed: false,
        is_downloaded: false,
        used_at: None,
        used_by: None,
        created_at: Utc::now().into(),
    }
}

pub fn staff(role: UserRole, assigned_parks: Vec<Uuid>) -> CurrentUser {
    CurrentUser {
        id: Uuid::new_v4(),
        name: "Gate".to_string(),
        email: "gate@parkpass.local".to_string(),
        role,
        assigned_parks,
    }
}

pub fn user_row(role: UserRole) -> user::Model {
    let now = Utc::now();
    user::Model {
        id: Uuid::new_v4(),
        name: "Checker".to_string(),
        email: "checker@parkpass.local".to_string(),
        password_hash: "unused".to_string(),
        role,
        reset_otp_hash: None,
        reset_otp_expires_at: None,
        created_at: now.into(),
        updated_at: now.into(),
    }
}
