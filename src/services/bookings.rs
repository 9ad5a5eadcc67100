use std::collections::HashMap;

use chrono::{NaiveDate, Utc};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, DatabaseTransaction, DbErr, EntityTrait,
    PaginatorTrait, QueryFilter, QueryOrder, QuerySelect, Set, SqlErr, TransactionTrait,
};
use serde::Serialize;
use uuid::Uuid;

use crate::entities::booking::{self, BookingStatus, PaymentStatus, TicketRejection};
use crate::entities::{district, issued_ticket, park};
use crate::error::{AppError, AppResult};
use crate::response::{offset, Pagination};
use crate::services::access::{scope_filter, CurrentUser};
use crate::utils::{ticket_no, ticket_pdf};

/// Fresh ticket numbers drawn before giving up on a booking.
const MAX_TICKET_ATTEMPTS: u32 = 5;

#[derive(Debug, Clone)]
pub struct NewBooking {
    pub park_id: Uuid,
    pub adults: i32,
    pub children: i32,
    pub visitor_name: String,
    pub visitor_email: String,
    pub visitor_phone: String,
    pub visit_date: NaiveDate,
}

#[derive(Debug, Clone, Default)]
pub struct BookingFilter {
    pub park: Option<Uuid>,
    pub status: Option<BookingStatus>,
    pub visit_date: Option<NaiveDate>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ParkView {
    #[serde(flatten)]
    pub park: park::Model,
    pub district: Option<district::Model>,
}

/// Booking with its park and district joined in.
#[derive(Debug, Clone, Serialize)]
pub struct BookingView {
    #[serde(flatten)]
    pub booking: booking::Model,
    pub park: Option<ParkView>,
}

pub async fn create_booking(db: &DatabaseConnection, input: NewBooking) -> AppResult<booking::Model> {
    create_booking_with(db, input, ticket_no::generate).await
}

/// [`create_booking`] drawing ticket numbers from `next_ticket_no`.
pub async fn create_booking_with(
    db: &DatabaseConnection,
    input: NewBooking,
    mut next_ticket_no: impl FnMut() -> String,
) -> AppResult<booking::Model> {
    let park = park::Entity::find_by_id(input.park_id)
        .one(db)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("No park found with id {}", input.park_id)))?;

    let total_amount = park.price_for(input.adults, input.children);

    for attempt in 1..=MAX_TICKET_ATTEMPTS {
        let ticket_no = next_ticket_no();
        let txn = db.begin().await?;

        let outcome = match insert_with_ticket(&txn, &input, total_amount, &ticket_no).await {
            // A concurrent booking won the same number between lookup and insert
            Err(e) if is_unique_violation(&e) => Ok(None),
            other => other,
        };

        match outcome {
            Ok(Some(created)) => {
                txn.commit().await?;
                tracing::info!(
                    booking_id = %created.id,
                    ticket_no = %created.ticket_no,
                    park_id = %created.park_id,
                    "Booking created"
                );
                return Ok(created);
            }
            Ok(None) => {
                txn.rollback().await?;
                tracing::warn!(attempt, ticket_no = %ticket_no, "Ticket number already issued, retrying");
            }
            Err(e) => {
                txn.rollback().await?;
                return Err(e.into());
            }
        }
    }

    Err(AppError::Internal(
        "Could not allocate a unique ticket number".to_string(),
    ))
}

/// Registers the ticket number and inserts the booking inside `txn`.
/// `None` when the number has been issued before.
async fn insert_with_ticket(
    txn: &DatabaseTransaction,
    input: &NewBooking,
    total_amount: f64,
    ticket_no: &str,
) -> Result<Option<booking::Model>, DbErr> {
    if issued_ticket::Entity::find_by_id(ticket_no.to_string())
        .one(txn)
        .await?
        .is_some()
    {
        return Ok(None);
    }

    let now = Utc::now();

    issued_ticket::ActiveModel {
        ticket_no: Set(ticket_no.to_string()),
        issued_at: Set(now.into()),
    }
    .insert(txn)
    .await?;

    booking::ActiveModel {
        id: Set(Uuid::new_v4()),
        ticket_no: Set(ticket_no.to_string()),
        park_id: Set(input.park_id),
        visitor_name: Set(input.visitor_name.clone()),
        visitor_email: Set(input.visitor_email.clone()),
        visitor_phone: Set(input.visitor_phone.clone()),
        adults: Set(input.adults),
        children: Set(input.children),
        total_amount: Set(total_amount),
        visit_date: Set(input.visit_date),
        status: Set(BookingStatus::Active),
        payment_status: Set(PaymentStatus::Pending),
        payment_id: Set(None),
        is_printed: Set(false),
        is_downloaded: Set(false),
        used_at: Set(None),
        used_by: Set(None),
        created_at: Set(now.into()),
    }
    .insert(txn)
    .await
    .map(Some)
}

fn is_unique_violation(e: &DbErr) -> bool {
    matches!(e.sql_err(), Some(SqlErr::UniqueConstraintViolation(_)))
}

pub async fn find_booking(db: &DatabaseConnection, id: Uuid) -> AppResult<booking::Model> {
    booking::Entity::find_by_id(id)
        .one(db)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("No booking found with id {}", id)))
}

pub async fn find_by_ticket_no(
    db: &DatabaseConnection,
    ticket_no: &str,
) -> AppResult<booking::Model> {
    booking::Entity::find()
        .filter(booking::Column::TicketNo.eq(ticket_no))
        .one(db)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("No ticket found with number {}", ticket_no)))
}

pub async fn update_payment_status(
    db: &DatabaseConnection,
    id: Uuid,
    payment_status: PaymentStatus,
    payment_id: Option<String>,
) -> AppResult<booking::Model> {
    let booking = find_booking(db, id).await?;

    let mut active: booking::ActiveModel = booking.into();
    active.payment_status = Set(payment_status);
    if let Some(payment_id) = payment_id.filter(|p| !p.is_empty()) {
        active.payment_id = Set(Some(payment_id));
    }

    Ok(active.update(db).await?)
}

/// Unguarded status setter for staff corrections. Entry validation goes
/// through [`mark_ticket_as_used`] instead.
pub async fn update_booking_status(
    db: &DatabaseConnection,
    id: Uuid,
    status: BookingStatus,
    user: &CurrentUser,
) -> AppResult<booking::Model> {
    let booking = find_booking(db, id).await?;
    user.authorize_park(booking.park_id, "Not authorized to update this booking")?;

    let previous = booking.status;
    let mut active: booking::ActiveModel = booking.into();
    active.status = Set(status);
    let updated = active.update(db).await?;

    tracing::info!(
        booking_id = %updated.id,
        from = previous.as_str(),
        to = status.as_str(),
        user_id = %user.id,
        "Booking status changed"
    );
    Ok(updated)
}

/// Strict entry validation: only an active ticket becomes used, exactly once.
pub async fn mark_ticket_as_used(
    db: &DatabaseConnection,
    ticket_no: &str,
    user: &CurrentUser,
) -> AppResult<booking::Model> {
    let booking = find_by_ticket_no(db, ticket_no).await?;
    user.authorize_park(booking.park_id, "Not authorized to validate this ticket")?;

    if let Err(rejection) = booking.status.check_usable() {
        return Err(AppError::state_conflict(rejection.message(), &booking));
    }

    let result = booking::Entity::update_many()
        .set(booking::ActiveModel {
            status: Set(BookingStatus::Used),
            used_at: Set(Some(Utc::now().into())),
            used_by: Set(Some(user.id)),
            ..Default::default()
        })
        .filter(booking::Column::TicketNo.eq(ticket_no))
        .filter(booking::Column::Status.eq(BookingStatus::Active))
        .exec(db)
        .await?;

    if result.rows_affected == 0 {
        // Lost the race against another validation
        let current = find_by_ticket_no(db, ticket_no).await?;
        let rejection = current
            .status
            .check_usable()
            .err()
            .unwrap_or(TicketRejection::AlreadyUsed);
        return Err(AppError::state_conflict(rejection.message(), &current));
    }

    let updated = find_by_ticket_no(db, ticket_no).await?;
    tracing::info!(
        ticket_no = %updated.ticket_no,
        park_id = %updated.park_id,
        user_id = %user.id,
        "Ticket validated"
    );
    Ok(updated)
}

/// Removes the booking. The number stays in the issued-ticket registry.
pub async fn delete_ticket_by_number(
    db: &DatabaseConnection,
    ticket_no: &str,
    user: &CurrentUser,
) -> AppResult<booking::Model> {
    let booking = find_by_ticket_no(db, ticket_no).await?;
    user.authorize_park(booking.park_id, "Not authorized to delete this ticket")?;

    booking::Entity::delete_by_id(booking.id).exec(db).await?;

    tracing::info!(
        ticket_no = %booking.ticket_no,
        park_id = %booking.park_id,
        user_id = %user.id,
        "Ticket deleted"
    );
    Ok(booking)
}

pub async fn mark_ticket_as_printed(db: &DatabaseConnection, id: Uuid) -> AppResult<booking::Model> {
    let booking = find_booking(db, id).await?;

    let mut active: booking::ActiveModel = booking.into();
    active.is_printed = Set(true);
    Ok(active.update(db).await?)
}

/// Renders the PDF ticket of a paid booking and flags it as downloaded.
/// Returns the attachment file name with the document bytes.
pub async fn render_ticket(db: &DatabaseConnection, id: Uuid) -> AppResult<(String, Vec<u8>)> {
    let booking = find_booking(db, id).await?;
    if booking.payment_status != PaymentStatus::Completed {
        return Err(AppError::Validation(
            "Payment not completed for this booking".to_string(),
        ));
    }

    let view = load_view(db, booking).await?;
    let booking = &view.booking;

    let park = view.park.as_ref();
    let bytes = ticket_pdf::render(&ticket_pdf::TicketDetails {
        ticket_no: &booking.ticket_no,
        park: park.map(|p| p.park.name.as_str()).unwrap_or_default(),
        district: park
            .and_then(|p| p.district.as_ref())
            .map(|d| d.name.as_str())
            .unwrap_or_default(),
        visit_date: booking.visit_date,
        adults: booking.adults,
        children: booking.children,
        total_amount: booking.total_amount,
        visitor_name: &booking.visitor_name,
        status: booking.status.as_str(),
    })?;

    if !booking.is_downloaded {
        let mut active: booking::ActiveModel = booking.clone().into();
        active.is_downloaded = Set(true);
        active.update(db).await?;
    }

    Ok((ticket_pdf::file_name(&booking.ticket_no), bytes))
}

pub async fn get_booking(
    db: &DatabaseConnection,
    id: Uuid,
    user: &CurrentUser,
) -> AppResult<BookingView> {
    let booking = find_booking(db, id).await?;
    user.authorize_park(booking.park_id, "Not authorized to access this booking")?;
    load_view(db, booking).await
}

pub async fn get_ticket_by_number(
    db: &DatabaseConnection,
    ticket_no: &str,
    user: &CurrentUser,
) -> AppResult<BookingView> {
    let booking = find_by_ticket_no(db, ticket_no).await?;
    user.authorize_park(booking.park_id, "Not authorized to access this ticket")?;
    load_view(db, booking).await
}

/// Newest first, restricted to the caller's parks.
pub async fn list_bookings(
    db: &DatabaseConnection,
    user: &CurrentUser,
    filter: BookingFilter,
    page: u64,
    limit: u64,
) -> AppResult<(Vec<BookingView>, Pagination)> {
    let mut query = booking::Entity::find().filter(scope_filter(user, None).condition());

    if let Some(park_id) = filter.park {
        query = query.filter(booking::Column::ParkId.eq(park_id));
    }
    if let Some(status) = filter.status {
        query = query.filter(booking::Column::Status.eq(status));
    }
    if let Some(visit_date) = filter.visit_date {
        query = query.filter(booking::Column::VisitDate.eq(visit_date));
    }

    let total = query.clone().count(db).await?;
    let bookings = query
        .order_by_desc(booking::Column::CreatedAt)
        .offset(offset(page, limit))
        .limit(limit)
        .all(db)
        .await?;

    let views = load_views(db, bookings).await?;
    Ok((views, Pagination::around(page, limit, total)))
}

async fn load_view(db: &DatabaseConnection, booking: booking::Model) -> AppResult<BookingView> {
    let mut views = load_views(db, vec![booking]).await?;
    views
        .pop()
        .ok_or_else(|| AppError::Internal("Booking lost while joining its park".to_string()))
}

/// Joins parks and districts with one query each.
async fn load_views(
    db: &DatabaseConnection,
    bookings: Vec<booking::Model>,
) -> AppResult<Vec<BookingView>> {
    if bookings.is_empty() {
        return Ok(Vec::new());
    }

    let park_ids: Vec<Uuid> = bookings.iter().map(|b| b.park_id).collect();
    let parks = park::Entity::find()
        .filter(park::Column::Id.is_in(park_ids))
        .all(db)
        .await?;

    let district_ids: Vec<Uuid> = parks.iter().map(|p| p.district_id).collect();
    let districts: HashMap<Uuid, district::Model> = district::Entity::find()
        .filter(district::Column::Id.is_in(district_ids))
        .all(db)
        .await?
        .into_iter()
        .map(|d| (d.id, d))
        .collect();

    let parks: HashMap<Uuid, ParkView> = parks
        .into_iter()
        .map(|p| {
            let district = districts.get(&p.district_id).cloned();
            (p.id, ParkView { park: p, district })
        })
        .collect();

    Ok(bookings
        .into_iter()
        .map(|booking| BookingView {
            park: parks.get(&booking.park_id).cloned(),
            booking,
        })
        .collect())
}
