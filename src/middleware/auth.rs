use axum::{
    extract::{Request, State},
    middleware::Next,
    response::Response,
};
use axum_extra::{
    headers::{authorization::Bearer, Authorization},
    TypedHeader,
};
use sea_orm::{ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter};
use uuid::Uuid;

use crate::entities::{park_assignment, user, user::UserRole};
use crate::error::{AppError, AppResult};
use crate::services::access::CurrentUser;
use crate::utils::jwt::verify_token;
use crate::AppState;

fn not_authorized() -> AppError {
    AppError::Unauthorized("Not authorized to access this route".to_string())
}

/// Validate the bearer token and attach the caller, reloaded from the
/// database with its park assignments.
pub async fn auth_middleware(
    State(state): State<AppState>,
    auth: Option<TypedHeader<Authorization<Bearer>>>,
    mut request: Request,
    next: Next,
) -> AppResult<Response> {
    let TypedHeader(auth) = auth.ok_or_else(not_authorized)?;
    let claims = verify_token(auth.token(), &state.config.jwt_secret)?;

    let current = load_current_user(&*state.db, claims.sub)
        .await?
        .ok_or_else(not_authorized)?;

    request.extensions_mut().insert(current);
    Ok(next.run(request).await)
}

pub async fn load_current_user(
    db: &DatabaseConnection,
    user_id: Uuid,
) -> AppResult<Option<CurrentUser>> {
    let Some(found) = user::Entity::find_by_id(user_id).one(db).await? else {
        return Ok(None);
    };

    let assigned_parks = park_assignment::Entity::find()
        .filter(park_assignment::Column::UserId.eq(found.id))
        .all(db)
        .await?
        .into_iter()
        .map(|a| a.park_id)
        .collect();

    Ok(Some(CurrentUser {
        id: found.id,
        name: found.name,
        email: found.email,
        role: found.role,
        assigned_parks,
    }))
}

fn require_roles(request: &Request, allowed: &[UserRole]) -> AppResult<()> {
    let current = request
        .extensions()
        .get::<CurrentUser>()
        .ok_or_else(|| AppError::Unauthorized("No authentication found".to_string()))?;

    if !allowed.contains(&current.role) {
        return Err(AppError::Forbidden(format!(
            "User role {} is not authorized to access this route",
            current.role.as_str()
        )));
    }

    Ok(())
}

/// Require super-admin role
pub async fn require_super_admin(request: Request, next: Next) -> AppResult<Response> {
    require_roles(&request, &[UserRole::SuperAdmin])?;
    Ok(next.run(request).await)
}

/// Require super-admin or park-admin role
pub async fn require_park_manager(request: Request, next: Next) -> AppResult<Response> {
    require_roles(&request, &[UserRole::SuperAdmin, UserRole::ParkAdmin])?;
    Ok(next.run(request).await)
}

/// Require any staff role
pub async fn require_staff(request: Request, next: Next) -> AppResult<Response> {
    require_roles(
        &request,
        &[UserRole::SuperAdmin, UserRole::ParkAdmin, UserRole::TicketChecker],
    )?;
    Ok(next.run(request).await)
}
