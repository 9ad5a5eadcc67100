use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, PaginatorTrait, QueryFilter,
    QueryOrder, Set,
};
use serde::Deserialize;
use uuid::Uuid;
use validator::Validate;

use crate::entities::{district, park};
use crate::error::{AppError, AppResult};
use crate::extractors::ValidatedJson;
use crate::handlers::parks::park_views;
use crate::response::ApiResponse;
use crate::services::bookings::ParkView;
use crate::AppState;

const DEFAULT_IMAGE: &str = "no-photo.jpg";

async fn find_district(db: &DatabaseConnection, id: Uuid) -> AppResult<district::Model> {
    district::Entity::find_by_id(id)
        .one(db)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("No district found with id {}", id)))
}

async fn ensure_name_free(db: &DatabaseConnection, name: &str, except: Option<Uuid>) -> AppResult<()> {
    let existing = district::Entity::find()
        .filter(district::Column::Name.eq(name))
        .one(db)
        .await?;

    match existing {
        Some(other) if Some(other.id) != except => Err(AppError::Conflict(format!(
            "A district named {} already exists",
            name
        ))),
        _ => Ok(()),
    }
}

/// List all districts
pub async fn list_districts(
    State(state): State<AppState>,
) -> AppResult<Json<ApiResponse<Vec<district::Model>>>> {
    let districts = district::Entity::find()
        .order_by_asc(district::Column::Name)
        .all(&*state.db)
        .await?;

    Ok(Json(ApiResponse::list(districts)))
}

pub async fn get_district(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> AppResult<Json<ApiResponse<district::Model>>> {
    Ok(Json(ApiResponse::success(find_district(&*state.db, id).await?)))
}

/// Parks of one district
pub async fn district_parks(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> AppResult<Json<ApiResponse<Vec<ParkView>>>> {
    let parks = park::Entity::find()
        .filter(park::Column::DistrictId.eq(id))
        .order_by_asc(park::Column::Name)
        .all(&*state.db)
        .await?;

    Ok(Json(ApiResponse::list(park_views(&*state.db, parks).await?)))
}

#[derive(Debug, Deserialize, Validate)]
pub struct CreateDistrictRequest {
    #[validate(length(min = 1, max = 50, message = "Name must be 1 to 50 characters"))]
    pub name: String,
    #[validate(length(max = 500, message = "Description cannot be more than 500 characters"))]
    pub description: Option<String>,
    /// Path returned by the upload endpoint.
    pub image: Option<String>,
}

pub async fn create_district(
    State(state): State<AppState>,
    ValidatedJson(payload): ValidatedJson<CreateDistrictRequest>,
) -> AppResult<(StatusCode, Json<ApiResponse<district::Model>>)> {
    let name = payload.name.trim().to_string();
    ensure_name_free(&*state.db, &name, None).await?;

    let created = district::ActiveModel {
        id: Set(Uuid::new_v4()),
        name: Set(name),
        description: Set(payload.description),
        image: Set(payload
            .image
            .filter(|i| !i.is_empty())
            .unwrap_or_else(|| DEFAULT_IMAGE.to_string())),
        created_at: Set(Utc::now().into()),
    }
    .insert(&*state.db)
    .await?;

    tracing::info!(district_id = %created.id, name = %created.name, "District created");
    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::with_message(created, "District created successfully")),
    ))
}

#[derive(Debug, Deserialize, Validate)]
pub struct UpdateDistrictRequest {
    #[validate(length(min = 1, max = 50, message = "Name must be 1 to 50 characters"))]
    pub name: Option<String>,
    #[validate(length(max = 500, message = "Description cannot be more than 500 characters"))]
    pub description: Option<String>,
    pub image: Option<String>,
}

pub async fn update_district(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    ValidatedJson(payload): ValidatedJson<UpdateDistrictRequest>,
) -> AppResult<Json<ApiResponse<district::Model>>> {
    let existing = find_district(&*state.db, id).await?;
    let mut active: district::ActiveModel = existing.into();

    if let Some(name) = payload.name {
        let name = name.trim().to_string();
        ensure_name_free(&*state.db, &name, Some(id)).await?;
        active.name = Set(name);
    }
    if let Some(description) = payload.description {
        active.description = Set(Some(description));
    }
    if let Some(image) = payload.image.filter(|i| !i.is_empty()) {
        active.image = Set(image);
    }

    Ok(Json(ApiResponse::success(active.update(&*state.db).await?)))
}

/// Districts that still hold parks are kept
pub async fn delete_district(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> AppResult<Json<ApiResponse<()>>> {
    let existing = find_district(&*state.db, id).await?;

    let parks = park::Entity::find()
        .filter(park::Column::DistrictId.eq(existing.id))
        .count(&*state.db)
        .await?;
    if parks > 0 {
        return Err(AppError::Conflict(format!(
            "District {} still has {} park(s)",
            existing.name, parks
        )));
    }

    district::Entity::delete_by_id(existing.id)
        .exec(&*state.db)
        .await?;

    tracing::info!(district_id = %existing.id, "District deleted");
    Ok(Json(ApiResponse::message("District deleted successfully")))
}
