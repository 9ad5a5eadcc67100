use sea_orm::{ColumnTrait, Condition};
use uuid::Uuid;

use crate::entities::{booking, user::UserRole};
use crate::error::{AppError, AppResult};

/// Authenticated caller, loaded by the auth middleware with its park assignments.
#[derive(Debug, Clone)]
pub struct CurrentUser {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub role: UserRole,
    pub assigned_parks: Vec<Uuid>,
}

impl CurrentUser {
    pub fn is_super_admin(&self) -> bool {
        self.role == UserRole::SuperAdmin
    }

    pub fn can_access_park(&self, park_id: Uuid) -> bool {
        self.is_super_admin() || self.assigned_parks.contains(&park_id)
    }

    /// Forbidden with `message` unless the caller may act on `park_id`.
    pub fn authorize_park(&self, park_id: Uuid, message: &str) -> AppResult<()> {
        if self.can_access_park(park_id) {
            Ok(())
        } else {
            tracing::debug!(user_id = %self.id, park_id = %park_id, "Park access denied");
            Err(AppError::Forbidden(message.to_string()))
        }
    }
}

/// Parks whose bookings a query may see.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParkScope {
    All,
    Only(Vec<Uuid>),
}

impl ParkScope {
    pub fn contains(&self, park_id: Uuid) -> bool {
        match self {
            ParkScope::All => true,
            ParkScope::Only(ids) => ids.contains(&park_id),
        }
    }

    /// Row filter on `booking.park_id`. An empty set matches nothing.
    pub fn condition(&self) -> Condition {
        match self {
            ParkScope::All => Condition::all(),
            ParkScope::Only(ids) => {
                Condition::all().add(booking::Column::ParkId.is_in(ids.iter().copied()))
            }
        }
    }
}

/// Single scoping rule shared by every booking and analytics query: an
/// explicit park id wins, otherwise super-admins see everything and everyone
/// else sees their assigned parks.
pub fn scope_filter(user: &CurrentUser, explicit_park_id: Option<Uuid>) -> ParkScope {
    match explicit_park_id {
        Some(park_id) => ParkScope::Only(vec![park_id]),
        None if user.is_super_admin() => ParkScope::All,
        None => ParkScope::Only(user.assigned_parks.clone()),
    }
}
