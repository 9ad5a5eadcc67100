use axum::{
    extract::{Path, State},
    Json,
};
use rand::Rng;
use sea_orm::{ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, Set};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::entities::booking::{self, PaymentStatus};
use crate::error::{AppError, AppResult};
use crate::response::ApiResponse;
use crate::services::bookings::find_booking;
use crate::AppState;

const PAYMENT_ID_CHARS: &[u8] = b"abcdefghijklmnopqrstuvwxyz0123456789";
const PAYMENT_ID_LEN: usize = 13;

/// Simulated gateway reference, e.g. `pm_k3x9q0v1c7m2a`.
pub fn generate_payment_id() -> String {
    let mut rng = rand::thread_rng();
    let suffix: String = (0..PAYMENT_ID_LEN)
        .map(|_| PAYMENT_ID_CHARS[rng.gen_range(0..PAYMENT_ID_CHARS.len())] as char)
        .collect();
    format!("pm_{}", suffix)
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProcessPaymentRequest {
    pub booking_id: Uuid,
    pub payment_method: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentReceipt {
    pub booking: booking::Model,
    pub payment_id: String,
    pub message: String,
}

/// Completes a pending payment. The write only applies while the booking is
/// not yet paid, so a double submit cannot issue two payment ids.
pub async fn complete_payment(
    db: &DatabaseConnection,
    booking_id: Uuid,
) -> AppResult<(booking::Model, String)> {
    let existing = find_booking(db, booking_id).await?;
    let already_paid =
        || AppError::Conflict("Payment has already been completed for this booking".to_string());
    if existing.payment_status == PaymentStatus::Completed {
        return Err(already_paid());
    }

    let payment_id = generate_payment_id();
    let result = booking::Entity::update_many()
        .set(booking::ActiveModel {
            payment_status: Set(PaymentStatus::Completed),
            payment_id: Set(Some(payment_id.clone())),
            ..Default::default()
        })
        .filter(booking::Column::Id.eq(booking_id))
        .filter(booking::Column::PaymentStatus.ne(PaymentStatus::Completed))
        .exec(db)
        .await?;
    if result.rows_affected == 0 {
        return Err(already_paid());
    }

    let updated = find_booking(db, booking_id).await?;
    Ok((updated, payment_id))
}

pub async fn process_payment(
    State(state): State<AppState>,
    Json(payload): Json<ProcessPaymentRequest>,
) -> AppResult<Json<ApiResponse<PaymentReceipt>>> {
    let (booking, payment_id) = complete_payment(&*state.db, payload.booking_id).await?;

    tracing::info!(
        booking_id = %booking.id,
        payment_id = %payment_id,
        method = payload.payment_method.as_deref().unwrap_or("credit_card"),
        "Payment processed"
    );

    Ok(Json(ApiResponse::success(PaymentReceipt {
        booking,
        payment_id,
        message: "Payment processed successfully".to_string(),
    })))
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentState {
    pub payment_status: PaymentStatus,
    pub payment_id: Option<String>,
}

pub async fn payment_status(
    State(state): State<AppState>,
    Path(booking_id): Path<Uuid>,
) -> AppResult<Json<ApiResponse<PaymentState>>> {
    let booking = find_booking(&*state.db, booking_id).await?;
    Ok(Json(ApiResponse::success(PaymentState {
        payment_status: booking.payment_status,
        payment_id: booking.payment_id,
    })))
}

#[derive(Debug, Clone, Serialize)]
pub struct PaymentMethod {
    pub id: &'static str,
    pub name: &'static str,
    pub description: &'static str,
    pub enabled: bool,
}

pub fn available_methods() -> Vec<PaymentMethod> {
    vec![
        PaymentMethod {
            id: "credit_card",
            name: "Credit Card",
            description: "Pay with Visa, Mastercard, or American Express",
            enabled: true,
        },
        PaymentMethod {
            id: "paypal",
            name: "PayPal",
            description: "Pay with your PayPal account",
            enabled: false,
        },
    ]
}

pub async fn payment_methods() -> Json<ApiResponse<Vec<PaymentMethod>>> {
    Json(ApiResponse::success(available_methods()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_payment_id_shape() {
        let id = generate_payment_id();
        let suffix = id.strip_prefix("pm_").unwrap();
        assert_eq!(suffix.len(), PAYMENT_ID_LEN);
        assert!(suffix
            .chars()
            .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit()));
    }

    #[test]
    fn test_only_card_payments_are_enabled() {
        let enabled: Vec<_> = available_methods()
            .into_iter()
            .filter(|m| m.enabled)
            .map(|m| m.id)
            .collect();
        assert_eq!(enabled, vec!["credit_card"]);
    }
}
