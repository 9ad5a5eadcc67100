use axum::{extract::State, Extension, Json};
use chrono::{DateTime, Duration, FixedOffset, Utc};
use sea_orm::{ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, Set};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use crate::entities::user;
use crate::error::{AppError, AppResult};
use crate::extractors::ValidatedJson;
use crate::handlers::users::{normalize_email, user_view, UserView};
use crate::mail::templates;
use crate::response::ApiResponse;
use crate::services::access::CurrentUser;
use crate::utils::jwt::create_token;
use crate::utils::password::{generate_otp, hash_secret, verify_secret, MIN_PASSWORD_LENGTH};
use crate::AppState;

#[derive(Debug, Deserialize, Validate)]
pub struct LoginRequest {
    #[validate(length(min = 1, message = "Please provide an email and password"))]
    pub email: String,
    #[validate(length(min = 1, message = "Please provide a password"))]
    pub password: String,
}

/// Envelope for responses that hand out a fresh token.
#[derive(Debug, Serialize)]
pub struct TokenResponse {
    pub success: bool,
    pub token: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<UserView>,
}

fn issue_token(state: &AppState, user: &user::Model) -> AppResult<String> {
    create_token(
        user.id,
        user.role,
        &state.config.jwt_secret,
        state.config.jwt_expiration_hours,
    )
}

async fn load_user(db: &DatabaseConnection, id: Uuid) -> AppResult<user::Model> {
    user::Entity::find_by_id(id)
        .one(db)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("No user found with id {}", id)))
}

async fn find_by_email(db: &DatabaseConnection, email: &str) -> AppResult<Option<user::Model>> {
    Ok(user::Entity::find()
        .filter(user::Column::Email.eq(normalize_email(email)))
        .one(db)
        .await?)
}

/// Login with email and password
pub async fn login(
    State(state): State<AppState>,
    ValidatedJson(payload): ValidatedJson<LoginRequest>,
) -> AppResult<Json<TokenResponse>> {
    let invalid = || AppError::Unauthorized("Invalid credentials".to_string());

    let user = find_by_email(&*state.db, &payload.email)
        .await?
        .ok_or_else(invalid)?;

    if !verify_secret(&payload.password, &user.password_hash)? {
        return Err(invalid());
    }

    let token = issue_token(&state, &user)?;
    tracing::info!(user_id = %user.id, role = user.role.as_str(), "User logged in");

    Ok(Json(TokenResponse {
        success: true,
        token,
        data: Some(user_view(&*state.db, user).await?),
    }))
}

/// Current user with assigned parks
pub async fn me(
    State(state): State<AppState>,
    Extension(current): Extension<CurrentUser>,
) -> AppResult<Json<ApiResponse<UserView>>> {
    let user = load_user(&*state.db, current.id).await?;
    Ok(Json(ApiResponse::success(user_view(&*state.db, user).await?)))
}

#[derive(Debug, Deserialize, Validate)]
pub struct UpdateDetailsRequest {
    #[validate(length(min = 1, max = 50, message = "Name must be 1 to 50 characters"))]
    pub name: Option<String>,
    #[validate(email(message = "Please add a valid email"))]
    pub email: Option<String>,
}

pub async fn update_details(
    State(state): State<AppState>,
    Extension(current): Extension<CurrentUser>,
    ValidatedJson(payload): ValidatedJson<UpdateDetailsRequest>,
) -> AppResult<Json<ApiResponse<UserView>>> {
    let user = load_user(&*state.db, current.id).await?;
    let mut active: user::ActiveModel = user.into();

    if let Some(name) = payload.name {
        active.name = Set(name.trim().to_string());
    }
    if let Some(email) = payload.email {
        let email = normalize_email(&email);
        if let Some(other) = find_by_email(&*state.db, &email).await? {
            if other.id != current.id {
                return Err(AppError::Conflict("Email already registered".to_string()));
            }
        }
        active.email = Set(email);
    }
    active.updated_at = Set(Utc::now().into());

    let updated = active.update(&*state.db).await?;
    Ok(Json(ApiResponse::success(user_view(&*state.db, updated).await?)))
}

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct UpdatePasswordRequest {
    pub current_password: String,
    #[validate(length(min = 6, message = "Password must be at least 6 characters long"))]
    pub new_password: String,
}

/// Change own password; returns a new token
pub async fn update_password(
    State(state): State<AppState>,
    Extension(current): Extension<CurrentUser>,
    ValidatedJson(payload): ValidatedJson<UpdatePasswordRequest>,
) -> AppResult<Json<TokenResponse>> {
    let user = load_user(&*state.db, current.id).await?;

    if !verify_secret(&payload.current_password, &user.password_hash)? {
        return Err(AppError::Unauthorized(
            "Current password is incorrect".to_string(),
        ));
    }

    let mut active: user::ActiveModel = user.into();
    active.password_hash = Set(hash_secret(&payload.new_password)?);
    active.updated_at = Set(Utc::now().into());
    let updated = active.update(&*state.db).await?;

    tracing::info!(user_id = %updated.id, "Password changed");
    Ok(Json(TokenResponse {
        success: true,
        token: issue_token(&state, &updated)?,
        data: None,
    }))
}

// ============ Password reset ============

#[derive(Debug, Deserialize, Validate)]
pub struct ForgotPasswordRequest {
    #[validate(email(message = "Please add a valid email"))]
    pub email: String,
}

#[derive(Debug, Serialize)]
pub struct ResetEmail {
    pub email: String,
}

/// Same answer whether or not the account exists.
fn reset_requested(email: String) -> Json<ApiResponse<ResetEmail>> {
    Json(ApiResponse::with_message(
        ResetEmail { email },
        "If that email exists, an OTP has been sent.",
    ))
}

/// Whether `otp` matches the stored code and has not expired at `now`.
pub fn otp_is_valid(
    user: &user::Model,
    otp: &str,
    now: DateTime<FixedOffset>,
) -> AppResult<bool> {
    match (&user.reset_otp_hash, user.reset_otp_expires_at) {
        (Some(hash), Some(expires_at)) if expires_at > now => verify_secret(otp.trim(), hash),
        _ => Ok(false),
    }
}

async fn clear_otp(db: &DatabaseConnection, user_id: Uuid) -> AppResult<()> {
    user::Entity::update_many()
        .set(user::ActiveModel {
            reset_otp_hash: Set(None),
            reset_otp_expires_at: Set(None),
            ..Default::default()
        })
        .filter(user::Column::Id.eq(user_id))
        .exec(db)
        .await?;
    Ok(())
}

/// Issue a reset code by email
pub async fn forgot_password(
    State(state): State<AppState>,
    ValidatedJson(payload): ValidatedJson<ForgotPasswordRequest>,
) -> AppResult<Json<ApiResponse<ResetEmail>>> {
    let email = normalize_email(&payload.email);
    let Some(user) = find_by_email(&*state.db, &email).await? else {
        tracing::debug!("Password reset requested for unknown email");
        return Ok(reset_requested(email));
    };

    let otp = generate_otp();
    let ttl = state.config.otp_ttl_minutes;
    let expires_at = Utc::now() + Duration::minutes(ttl);

    let mut active: user::ActiveModel = user.clone().into();
    active.reset_otp_hash = Set(Some(hash_secret(&otp)?));
    active.reset_otp_expires_at = Set(Some(expires_at.into()));
    active.update(&*state.db).await?;

    let message = templates::password_reset_otp(&user.email, &user.name, &otp, ttl);
    if let Err(e) = state.mailer.send(message).await {
        // Answer as for an unknown email; only the log tells the difference
        tracing::error!(user_id = %user.id, error = %e, "OTP email failed, discarding code");
        clear_otp(&*state.db, user.id).await?;
        return Ok(reset_requested(email));
    }

    tracing::info!(user_id = %user.id, expires_at = %expires_at, "Password reset OTP issued");
    Ok(reset_requested(email))
}

#[derive(Debug, Deserialize, Validate)]
pub struct VerifyOtpRequest {
    #[validate(length(min = 1, message = "Email and OTP are required"))]
    pub email: String,
    #[validate(length(min = 1, message = "Email and OTP are required"))]
    pub otp: String,
}

pub async fn verify_otp(
    State(state): State<AppState>,
    ValidatedJson(payload): ValidatedJson<VerifyOtpRequest>,
) -> AppResult<Json<ApiResponse<ResetEmail>>> {
    let invalid = || AppError::Validation("Invalid or expired OTP".to_string());

    let user = find_by_email(&*state.db, &payload.email)
        .await?
        .ok_or_else(invalid)?;
    if !otp_is_valid(&user, &payload.otp, Utc::now().into())? {
        return Err(invalid());
    }

    Ok(Json(ApiResponse::with_message(
        ResetEmail { email: user.email },
        "OTP verified successfully",
    )))
}

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct ResetPasswordRequest {
    #[validate(length(min = 1, message = "All fields are required"))]
    pub email: String,
    #[validate(length(min = 1, message = "All fields are required"))]
    pub otp: String,
    pub password: String,
    pub confirm_password: String,
}

pub async fn reset_password_with_otp(
    State(state): State<AppState>,
    ValidatedJson(payload): ValidatedJson<ResetPasswordRequest>,
) -> AppResult<Json<ApiResponse<()>>> {
    if payload.password != payload.confirm_password {
        return Err(AppError::Validation("Passwords do not match".to_string()));
    }
    if payload.password.chars().count() < MIN_PASSWORD_LENGTH {
        return Err(AppError::Validation(format!(
            "Password must be at least {} characters long",
            MIN_PASSWORD_LENGTH
        )));
    }

    let invalid = || AppError::Validation("Invalid or expired OTP".to_string());
    let user = find_by_email(&*state.db, &payload.email)
        .await?
        .ok_or_else(invalid)?;
    if !otp_is_valid(&user, &payload.otp, Utc::now().into())? {
        return Err(invalid());
    }

    let mut active: user::ActiveModel = user.into();
    active.password_hash = Set(hash_secret(&payload.password)?);
    active.reset_otp_hash = Set(None);
    active.reset_otp_expires_at = Set(None);
    active.updated_at = Set(Utc::now().into());
    let updated = active.update(&*state.db).await?;

    tracing::info!(user_id = %updated.id, "Password reset with OTP");
    Ok(Json(ApiResponse::message("Password updated successfully")))
}
