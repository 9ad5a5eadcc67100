use axum::{
    extract::{Path, Query, State},
    http::{header, StatusCode},
    response::IntoResponse,
    Extension, Json,
};
use chrono::{DateTime, NaiveDate};
use serde::{Deserialize, Deserializer};
use uuid::Uuid;
use validator::Validate;

use crate::entities::booking::{self, BookingStatus, PaymentStatus};
use crate::error::{AppError, AppResult};
use crate::extractors::ValidatedJson;
use crate::response::{ApiResponse, PageQuery};
use crate::services::access::CurrentUser;
use crate::services::bookings::{self as service, BookingFilter, BookingView, NewBooking};
use crate::AppState;

/// Accepts a plain `YYYY-MM-DD` date or a full RFC 3339 timestamp, of which
/// only the calendar date is kept.
pub fn parse_visit_date(value: &str) -> Option<NaiveDate> {
    let value = value.trim();
    NaiveDate::parse_from_str(value, "%Y-%m-%d")
        .ok()
        .or_else(|| DateTime::parse_from_rfc3339(value).ok().map(|d| d.date_naive()))
}

fn deserialize_visit_date<'de, D>(deserializer: D) -> Result<NaiveDate, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = String::deserialize(deserializer)?;
    parse_visit_date(&raw)
        .ok_or_else(|| serde::de::Error::custom(format!("Invalid visit date: {}", raw)))
}

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateBookingRequest {
    pub park: Uuid,
    #[validate(range(min = 0, message = "Adults cannot be negative"))]
    pub adults: i32,
    #[validate(range(min = 0, message = "Children cannot be negative"))]
    pub children: i32,
    #[validate(length(min = 1, message = "Please add visitor name"))]
    pub visitor_name: String,
    #[validate(email(message = "Please add a valid email"))]
    pub visitor_email: String,
    #[validate(length(min = 1, message = "Please add visitor phone number"))]
    pub visitor_phone: String,
    #[serde(deserialize_with = "deserialize_visit_date")]
    pub visit_date: NaiveDate,
}

/// Public booking entry point
pub async fn create_booking(
    State(state): State<AppState>,
    ValidatedJson(payload): ValidatedJson<CreateBookingRequest>,
) -> AppResult<(StatusCode, Json<ApiResponse<booking::Model>>)> {
    let created = service::create_booking(
        &*state.db,
        NewBooking {
            park_id: payload.park,
            adults: payload.adults,
            children: payload.children,
            visitor_name: payload.visitor_name.trim().to_string(),
            visitor_email: payload.visitor_email.trim().to_string(),
            visitor_phone: payload.visitor_phone.trim().to_string(),
            visit_date: payload.visit_date,
        },
    )
    .await?;

    Ok((StatusCode::CREATED, Json(ApiResponse::success(created))))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdatePaymentRequest {
    pub payment_status: String,
    pub payment_id: Option<String>,
}

pub async fn update_payment(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdatePaymentRequest>,
) -> AppResult<Json<ApiResponse<booking::Model>>> {
    let status = PaymentStatus::parse(&payload.payment_status)
        .ok_or_else(|| AppError::Validation("Invalid payment status value".to_string()))?;

    let updated = service::update_payment_status(&*state.db, id, status, payload.payment_id).await?;
    Ok(Json(ApiResponse::success(updated)))
}

#[derive(Debug, Deserialize)]
pub struct UpdateStatusRequest {
    pub status: String,
}

pub async fn update_status(
    State(state): State<AppState>,
    Extension(current): Extension<CurrentUser>,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdateStatusRequest>,
) -> AppResult<Json<ApiResponse<booking::Model>>> {
    let status = BookingStatus::parse(&payload.status)
        .ok_or_else(|| AppError::Validation("Invalid status value".to_string()))?;

    let updated = service::update_booking_status(&*state.db, id, status, &current).await?;
    Ok(Json(ApiResponse::success(updated)))
}

/// PDF ticket of a paid booking, sent as an attachment
pub async fn generate_ticket(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> AppResult<impl IntoResponse> {
    let (file_name, bytes) = service::render_ticket(&*state.db, id).await?;

    Ok((
        [
            (header::CONTENT_TYPE, "application/pdf".to_string()),
            (
                header::CONTENT_DISPOSITION,
                format!("attachment; filename={}", file_name),
            ),
        ],
        bytes,
    ))
}

pub async fn mark_printed(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> AppResult<Json<ApiResponse<booking::Model>>> {
    let updated = service::mark_ticket_as_printed(&*state.db, id).await?;
    Ok(Json(ApiResponse::success(updated)))
}

// ============ Staff ============

#[derive(Debug, Deserialize)]
pub struct BookingListQuery {
    pub park: Option<Uuid>,
    pub status: Option<String>,
    pub date: Option<String>,
    pub page: Option<u64>,
    pub limit: Option<u64>,
}

impl BookingListQuery {
    fn filter(&self) -> AppResult<BookingFilter> {
        let status = match self.status.as_deref() {
            Some(raw) => Some(
                BookingStatus::parse(raw)
                    .ok_or_else(|| AppError::Validation("Invalid status value".to_string()))?,
            ),
            None => None,
        };
        let visit_date = match self.date.as_deref() {
            Some(raw) => Some(
                parse_visit_date(raw)
                    .ok_or_else(|| AppError::Validation(format!("Invalid date: {}", raw)))?,
            ),
            None => None,
        };

        Ok(BookingFilter {
            park: self.park,
            status,
            visit_date,
        })
    }
}

/// Bookings of the caller's parks, newest first
pub async fn list_bookings(
    State(state): State<AppState>,
    Extension(current): Extension<CurrentUser>,
    Query(query): Query<BookingListQuery>,
) -> AppResult<Json<ApiResponse<Vec<BookingView>>>> {
    let filter = query.filter()?;
    let (page, limit) = PageQuery {
        page: query.page,
        limit: query.limit,
    }
    .resolve();

    let (bookings, pagination) =
        service::list_bookings(&*state.db, &current, filter, page, limit).await?;
    Ok(Json(ApiResponse::page(bookings, pagination)))
}

pub async fn get_booking(
    State(state): State<AppState>,
    Extension(current): Extension<CurrentUser>,
    Path(id): Path<Uuid>,
) -> AppResult<Json<ApiResponse<BookingView>>> {
    Ok(Json(ApiResponse::success(
        service::get_booking(&*state.db, id, &current).await?,
    )))
}

pub async fn get_ticket_by_number(
    State(state): State<AppState>,
    Extension(current): Extension<CurrentUser>,
    Path(ticket_no): Path<String>,
) -> AppResult<Json<ApiResponse<BookingView>>> {
    Ok(Json(ApiResponse::success(
        service::get_ticket_by_number(&*state.db, &ticket_no, &current).await?,
    )))
}

/// Gate validation: an active ticket becomes used exactly once
pub async fn mark_used(
    State(state): State<AppState>,
    Extension(current): Extension<CurrentUser>,
    Path(ticket_no): Path<String>,
) -> AppResult<Json<ApiResponse<booking::Model>>> {
    let updated = service::mark_ticket_as_used(&*state.db, &ticket_no, &current).await?;
    Ok(Json(ApiResponse::with_message(
        updated,
        format!("Ticket {} marked as used successfully", ticket_no),
    )))
}

pub async fn delete_ticket(
    State(state): State<AppState>,
    Extension(current): Extension<CurrentUser>,
    Path(ticket_no): Path<String>,
) -> AppResult<Json<ApiResponse<booking::Model>>> {
    let deleted = service::delete_ticket_by_number(&*state.db, &ticket_no, &current).await?;
    Ok(Json(ApiResponse::with_message(
        deleted,
        format!(
            "Ticket {} deleted successfully - this ticket number can no longer be used",
            ticket_no
        ),
    )))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_visit_date_accepts_date_and_timestamp() {
        let expected = NaiveDate::from_ymd_opt(2026, 7, 4).unwrap();
        assert_eq!(parse_visit_date("2026-07-04"), Some(expected));
        assert_eq!(parse_visit_date("2026-07-04T10:30:00+05:30"), Some(expected));
        assert_eq!(parse_visit_date("2026-07-04T00:00:00.000Z"), Some(expected));
        assert_eq!(parse_visit_date("04/07/2026"), None);
    }

    #[test]
    fn test_create_request_deserializes_camel_case() {
        let request: CreateBookingRequest = serde_json::from_value(serde_json::json!({
            "park": Uuid::nil(),
            "adults": 2,
            "children": 1,
            "visitorName": "Asha",
            "visitorEmail": "asha@example.com",
            "visitorPhone": "0771234567",
            "visitDate": "2026-07-04"
        }))
        .unwrap();

        assert_eq!(request.adults, 2);
        assert!(request.validate().is_ok());
    }

    #[test]
    fn test_negative_party_is_rejected() {
        let request = CreateBookingRequest {
            park: Uuid::nil(),
            adults: -1,
            children: 0,
            visitor_name: "Asha".to_string(),
            visitor_email: "asha@example.com".to_string(),
            visitor_phone: "0771234567".to_string(),
            visit_date: NaiveDate::from_ymd_opt(2026, 7, 4).unwrap(),
        };
        let errors = request.validate().unwrap_err();
        assert!(errors.field_errors().contains_key("adults"));
    }

    #[test]
    fn test_list_filter_rejects_unknown_status() {
        let query = BookingListQuery {
            park: None,
            status: Some("lost".to_string()),
            date: None,
            page: None,
            limit: None,
        };
        assert!(matches!(query.filter(), Err(AppError::Validation(_))));
    }
}
