use std::collections::HashMap;

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DatabaseConnection, EntityTrait, QueryFilter,
    QueryOrder, Set, TransactionTrait,
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use crate::entities::{park, park_assignment, user, user::UserRole};
use crate::error::{AppError, AppResult};
use crate::extractors::ValidatedJson;
use crate::response::ApiResponse;
use crate::utils::password::hash_secret;
use crate::AppState;

#[derive(Debug, Clone, Serialize)]
pub struct AssignedPark {
    pub id: Uuid,
    pub name: String,
}

/// User as returned by the API: secrets stripped, assigned parks joined.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UserView {
    #[serde(flatten)]
    pub user: user::Model,
    pub assigned_parks: Vec<AssignedPark>,
}

pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

pub async fn user_views(
    db: &DatabaseConnection,
    users: Vec<user::Model>,
) -> AppResult<Vec<UserView>> {
    let ids: Vec<Uuid> = users.iter().map(|u| u.id).collect();
    let mut parks_by_user: HashMap<Uuid, Vec<AssignedPark>> = HashMap::new();

    if !ids.is_empty() {
        let rows = park_assignment::Entity::find()
            .filter(park_assignment::Column::UserId.is_in(ids))
            .find_also_related(park::Entity)
            .all(db)
            .await?;

        for (assignment, park) in rows {
            if let Some(park) = park {
                parks_by_user
                    .entry(assignment.user_id)
                    .or_default()
                    .push(AssignedPark {
                        id: park.id,
                        name: park.name,
                    });
            }
        }
    }

    Ok(users
        .into_iter()
        .map(|user| UserView {
            assigned_parks: parks_by_user.remove(&user.id).unwrap_or_default(),
            user,
        })
        .collect())
}

pub async fn user_view(db: &DatabaseConnection, user: user::Model) -> AppResult<UserView> {
    let mut views = user_views(db, vec![user]).await?;
    views
        .pop()
        .ok_or_else(|| AppError::Internal("User lost while joining parks".to_string()))
}

async fn find_user(db: &DatabaseConnection, id: Uuid) -> AppResult<user::Model> {
    user::Entity::find_by_id(id)
        .one(db)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("No user found with id {}", id)))
}

/// Assignments are given by park name; every name must exist.
async fn resolve_park_names<C: ConnectionTrait>(db: &C, names: &[String]) -> AppResult<Vec<Uuid>> {
    if names.is_empty() {
        return Ok(Vec::new());
    }

    let parks = park::Entity::find()
        .filter(park::Column::Name.is_in(names.iter().cloned()))
        .all(db)
        .await?;

    let mut wanted: Vec<&String> = names.iter().collect();
    wanted.sort();
    wanted.dedup();
    if parks.len() != wanted.len() {
        return Err(AppError::Validation(
            "One or more assigned parks were not found.".to_string(),
        ));
    }

    Ok(parks.into_iter().map(|p| p.id).collect())
}

async fn replace_assignments<C: ConnectionTrait>(
    db: &C,
    user_id: Uuid,
    park_ids: &[Uuid],
) -> AppResult<()> {
    park_assignment::Entity::delete_many()
        .filter(park_assignment::Column::UserId.eq(user_id))
        .exec(db)
        .await?;

    if !park_ids.is_empty() {
        park_assignment::Entity::insert_many(park_ids.iter().map(|park_id| {
            park_assignment::ActiveModel {
                user_id: Set(user_id),
                park_id: Set(*park_id),
            }
        }))
        .exec(db)
        .await?;
    }

    Ok(())
}

async fn ensure_email_free(
    db: &DatabaseConnection,
    email: &str,
    except: Option<Uuid>,
) -> AppResult<()> {
    let existing = user::Entity::find()
        .filter(user::Column::Email.eq(email))
        .one(db)
        .await?;

    match existing {
        Some(other) if Some(other.id) != except => {
            Err(AppError::Conflict("User already exists".to_string()))
        }
        _ => Ok(()),
    }
}

// ============ Handlers ============

/// List all staff accounts
pub async fn list_users(
    State(state): State<AppState>,
) -> AppResult<Json<ApiResponse<Vec<UserView>>>> {
    let users = user::Entity::find()
        .order_by_asc(user::Column::Name)
        .all(&*state.db)
        .await?;

    Ok(Json(ApiResponse::list(user_views(&*state.db, users).await?)))
}

pub async fn get_user(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> AppResult<Json<ApiResponse<UserView>>> {
    let user = find_user(&*state.db, id).await?;
    Ok(Json(ApiResponse::success(user_view(&*state.db, user).await?)))
}

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateUserRequest {
    #[validate(length(min = 1, max = 50, message = "Name must be 1 to 50 characters"))]
    pub name: String,
    #[validate(email(message = "Please add a valid email"))]
    pub email: String,
    #[validate(length(min = 6, message = "Password must be at least 6 characters long"))]
    pub password: String,
    pub role: Option<UserRole>,
    #[serde(default)]
    pub assigned_parks: Vec<String>,
}

/// Create a staff account
pub async fn create_user(
    State(state): State<AppState>,
    ValidatedJson(payload): ValidatedJson<CreateUserRequest>,
) -> AppResult<(StatusCode, Json<ApiResponse<UserView>>)> {
    let email = normalize_email(&payload.email);
    ensure_email_free(&*state.db, &email, None).await?;

    let password_hash = hash_secret(&payload.password)?;
    let now = Utc::now();

    let txn = state.db.begin().await?;
    let park_ids = resolve_park_names(&txn, &payload.assigned_parks).await?;

    let created = user::ActiveModel {
        id: Set(Uuid::new_v4()),
        name: Set(payload.name.trim().to_string()),
        email: Set(email),
        password_hash: Set(password_hash),
        role: Set(payload.role.unwrap_or(UserRole::TicketChecker)),
        reset_otp_hash: Set(None),
        reset_otp_expires_at: Set(None),
        created_at: Set(now.into()),
        updated_at: Set(now.into()),
    }
    .insert(&txn)
    .await?;

    replace_assignments(&txn, created.id, &park_ids).await?;
    txn.commit().await?;

    tracing::info!(
        user_id = %created.id,
        role = created.role.as_str(),
        "Staff account created"
    );

    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::success(user_view(&*state.db, created).await?)),
    ))
}

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct UpdateUserRequest {
    #[validate(length(min = 1, max = 50, message = "Name must be 1 to 50 characters"))]
    pub name: Option<String>,
    #[validate(email(message = "Please add a valid email"))]
    pub email: Option<String>,
    pub role: Option<UserRole>,
    /// Replaces the current assignments when present.
    pub assigned_parks: Option<Vec<String>>,
}

pub async fn update_user(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    ValidatedJson(payload): ValidatedJson<UpdateUserRequest>,
) -> AppResult<Json<ApiResponse<UserView>>> {
    let existing = find_user(&*state.db, id).await?;

    let email = payload.email.as_deref().map(normalize_email);
    if let Some(email) = &email {
        ensure_email_free(&*state.db, email, Some(id)).await?;
    }

    let txn = state.db.begin().await?;

    let mut active: user::ActiveModel = existing.into();
    if let Some(name) = payload.name {
        active.name = Set(name.trim().to_string());
    }
    if let Some(email) = email {
        active.email = Set(email);
    }
    if let Some(role) = payload.role {
        active.role = Set(role);
    }
    active.updated_at = Set(Utc::now().into());
    let updated = active.update(&txn).await?;

    if let Some(names) = &payload.assigned_parks {
        let park_ids = resolve_park_names(&txn, names).await?;
        replace_assignments(&txn, id, &park_ids).await?;
    }
    txn.commit().await?;

    Ok(Json(ApiResponse::success(user_view(&*state.db, updated).await?)))
}

pub async fn delete_user(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> AppResult<Json<ApiResponse<()>>> {
    let result = user::Entity::delete_by_id(id).exec(&*state.db).await?;
    if result.rows_affected == 0 {
        return Err(AppError::NotFound(format!("No user found with id {}", id)));
    }

    tracing::info!(user_id = %id, "Staff account deleted");
    Ok(Json(ApiResponse::message("User deleted successfully")))
}
