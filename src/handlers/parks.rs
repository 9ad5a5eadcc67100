use std::collections::HashMap;

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Extension, Json,
};
use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, Order, PaginatorTrait,
    QueryFilter, QueryOrder, QuerySelect, Set,
};
use serde::Deserialize;
use uuid::Uuid;
use validator::Validate;

use crate::entities::{booking, district, park};
use crate::error::{AppError, AppResult};
use crate::extractors::ValidatedJson;
use crate::response::{offset, ApiResponse, PageQuery, Pagination};
use crate::services::access::CurrentUser;
use crate::services::bookings::ParkView;
use crate::AppState;

const DEFAULT_PICTURE: &str = "https://via.placeholder.com/100x100?text=No+Photo";
const DEFAULT_OPENING_HOURS: &str = "9:00 AM - 5:00 PM";

/// Joins each park's district with a single query.
pub async fn park_views(db: &DatabaseConnection, parks: Vec<park::Model>) -> AppResult<Vec<ParkView>> {
    let district_ids: Vec<Uuid> = parks.iter().map(|p| p.district_id).collect();
    let districts: HashMap<Uuid, district::Model> = if district_ids.is_empty() {
        HashMap::new()
    } else {
        district::Entity::find()
            .filter(district::Column::Id.is_in(district_ids))
            .all(db)
            .await?
            .into_iter()
            .map(|d| (d.id, d))
            .collect()
    };

    Ok(parks
        .into_iter()
        .map(|park| ParkView {
            district: districts.get(&park.district_id).cloned(),
            park,
        })
        .collect())
}

async fn find_park(db: &DatabaseConnection, id: Uuid) -> AppResult<park::Model> {
    park::Entity::find_by_id(id)
        .one(db)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("No park found with id {}", id)))
}

async fn ensure_district(db: &DatabaseConnection, id: Uuid) -> AppResult<()> {
    district::Entity::find_by_id(id)
        .one(db)
        .await?
        .map(|_| ())
        .ok_or_else(|| AppError::NotFound(format!("No district found with id {}", id)))
}

async fn ensure_name_free(db: &DatabaseConnection, name: &str, except: Option<Uuid>) -> AppResult<()> {
    let existing = park::Entity::find()
        .filter(park::Column::Name.eq(name))
        .one(db)
        .await?;

    match existing {
        Some(other) if Some(other.id) != except => Err(AppError::Conflict(format!(
            "A park named {} already exists",
            name
        ))),
        _ => Ok(()),
    }
}

/// Parse `sort=name,-adultPrice` into order clauses. Unknown fields are
/// ignored; no usable field means newest first.
pub fn sort_columns(sort: Option<&str>) -> Vec<(park::Column, Order)> {
    let columns: Vec<(park::Column, Order)> = sort
        .unwrap_or_default()
        .split(',')
        .filter_map(|field| {
            let field = field.trim();
            let (name, order) = match field.strip_prefix('-') {
                Some(name) => (name, Order::Desc),
                None => (field, Order::Asc),
            };
            let column = match name {
                "name" => park::Column::Name,
                "createdAt" => park::Column::CreatedAt,
                "adultPrice" => park::Column::AdultPrice,
                "childPrice" => park::Column::ChildPrice,
                "capacity" => park::Column::Capacity,
                "location" => park::Column::Location,
                _ => return None,
            };
            Some((column, order))
        })
        .collect();

    if columns.is_empty() {
        vec![(park::Column::CreatedAt, Order::Desc)]
    } else {
        columns
    }
}

#[derive(Debug, Deserialize)]
pub struct ParkListQuery {
    pub district: Option<Uuid>,
    pub active: Option<bool>,
    pub sort: Option<String>,
    pub page: Option<u64>,
    pub limit: Option<u64>,
}

/// Paginated park listing
pub async fn list_parks(
    State(state): State<AppState>,
    Query(query): Query<ParkListQuery>,
) -> AppResult<Json<ApiResponse<Vec<ParkView>>>> {
    let (page, limit) = PageQuery {
        page: query.page,
        limit: query.limit,
    }
    .resolve();

    let mut select = park::Entity::find();
    if let Some(district_id) = query.district {
        select = select.filter(park::Column::DistrictId.eq(district_id));
    }
    if let Some(active) = query.active {
        select = select.filter(park::Column::IsActive.eq(active));
    }

    let total = select.clone().count(&*state.db).await?;
    for (column, order) in sort_columns(query.sort.as_deref()) {
        select = select.order_by(column, order);
    }
    let parks = select
        .offset(offset(page, limit))
        .limit(limit)
        .all(&*state.db)
        .await?;

    Ok(Json(ApiResponse::page(
        park_views(&*state.db, parks).await?,
        Pagination::around(page, limit, total),
    )))
}

pub async fn get_park(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> AppResult<Json<ApiResponse<ParkView>>> {
    let park = find_park(&*state.db, id).await?;
    let mut views = park_views(&*state.db, vec![park]).await?;
    let view = views
        .pop()
        .ok_or_else(|| AppError::Internal("Park lost while joining its district".to_string()))?;
    Ok(Json(ApiResponse::success(view)))
}

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateParkRequest {
    #[validate(length(min = 1, max = 100, message = "Name must be 1 to 100 characters"))]
    pub name: String,
    #[validate(length(max = 1000, message = "Description cannot be more than 1000 characters"))]
    pub description: Option<String>,
    pub district: Uuid,
    #[validate(length(min = 1, message = "Please add a location"))]
    pub location: String,
    pub picture: Option<String>,
    #[validate(range(min = 0, message = "Capacity cannot be negative"))]
    pub capacity: i32,
    #[validate(range(min = 0.0, message = "Adult price cannot be negative"))]
    pub adult_price: f64,
    #[validate(range(min = 0.0, message = "Child price cannot be negative"))]
    pub child_price: f64,
    #[serde(default)]
    pub features: Vec<String>,
    pub opening_hours: Option<String>,
    pub is_active: Option<bool>,
}

pub async fn create_park(
    State(state): State<AppState>,
    ValidatedJson(payload): ValidatedJson<CreateParkRequest>,
) -> AppResult<(StatusCode, Json<ApiResponse<park::Model>>)> {
    let name = payload.name.trim().to_string();
    ensure_name_free(&*state.db, &name, None).await?;
    ensure_district(&*state.db, payload.district).await?;

    let created = park::ActiveModel {
        id: Set(Uuid::new_v4()),
        name: Set(name),
        description: Set(payload.description),
        district_id: Set(payload.district),
        location: Set(payload.location),
        picture: Set(payload
            .picture
            .filter(|p| !p.is_empty())
            .unwrap_or_else(|| DEFAULT_PICTURE.to_string())),
        capacity: Set(payload.capacity),
        adult_price: Set(payload.adult_price),
        child_price: Set(payload.child_price),
        features: Set(payload.features),
        opening_hours: Set(payload
            .opening_hours
            .unwrap_or_else(|| DEFAULT_OPENING_HOURS.to_string())),
        is_active: Set(payload.is_active.unwrap_or(true)),
        created_at: Set(Utc::now().into()),
    }
    .insert(&*state.db)
    .await?;

    tracing::info!(park_id = %created.id, name = %created.name, "Park created");
    Ok((StatusCode::CREATED, Json(ApiResponse::success(created))))
}

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct UpdateParkRequest {
    #[validate(length(min = 1, max = 100, message = "Name must be 1 to 100 characters"))]
    pub name: Option<String>,
    #[validate(length(max = 1000, message = "Description cannot be more than 1000 characters"))]
    pub description: Option<String>,
    pub district: Option<Uuid>,
    #[validate(length(min = 1, message = "Please add a location"))]
    pub location: Option<String>,
    pub picture: Option<String>,
    #[validate(range(min = 0, message = "Capacity cannot be negative"))]
    pub capacity: Option<i32>,
    #[validate(range(min = 0.0, message = "Adult price cannot be negative"))]
    pub adult_price: Option<f64>,
    #[validate(range(min = 0.0, message = "Child price cannot be negative"))]
    pub child_price: Option<f64>,
    pub features: Option<Vec<String>>,
    pub opening_hours: Option<String>,
    pub is_active: Option<bool>,
}

/// Park-admins may only edit their assigned parks
pub async fn update_park(
    State(state): State<AppState>,
    Extension(current): Extension<CurrentUser>,
    Path(id): Path<Uuid>,
    ValidatedJson(payload): ValidatedJson<UpdateParkRequest>,
) -> AppResult<Json<ApiResponse<park::Model>>> {
    let existing = find_park(&*state.db, id).await?;
    current.authorize_park(existing.id, "Not authorized to access this park")?;

    let mut active: park::ActiveModel = existing.into();
    if let Some(name) = payload.name {
        let name = name.trim().to_string();
        ensure_name_free(&*state.db, &name, Some(id)).await?;
        active.name = Set(name);
    }
    if let Some(district_id) = payload.district {
        ensure_district(&*state.db, district_id).await?;
        active.district_id = Set(district_id);
    }
    if let Some(description) = payload.description {
        active.description = Set(Some(description));
    }
    if let Some(location) = payload.location {
        active.location = Set(location);
    }
    if let Some(picture) = payload.picture.filter(|p| !p.is_empty()) {
        active.picture = Set(picture);
    }
    if let Some(capacity) = payload.capacity {
        active.capacity = Set(capacity);
    }
    if let Some(adult_price) = payload.adult_price {
        active.adult_price = Set(adult_price);
    }
    if let Some(child_price) = payload.child_price {
        active.child_price = Set(child_price);
    }
    if let Some(features) = payload.features {
        active.features = Set(features);
    }
    if let Some(opening_hours) = payload.opening_hours {
        active.opening_hours = Set(opening_hours);
    }
    if let Some(is_active) = payload.is_active {
        active.is_active = Set(is_active);
    }

    let updated = active.update(&*state.db).await?;
    tracing::info!(park_id = %updated.id, user_id = %current.id, "Park updated");
    Ok(Json(ApiResponse::success(updated)))
}

/// Parks with bookings on record are kept
pub async fn delete_park(
    State(state): State<AppState>,
    Extension(current): Extension<CurrentUser>,
    Path(id): Path<Uuid>,
) -> AppResult<Json<ApiResponse<()>>> {
    let existing = find_park(&*state.db, id).await?;
    current.authorize_park(existing.id, "Not authorized to access this park")?;

    let bookings = booking::Entity::find()
        .filter(booking::Column::ParkId.eq(existing.id))
        .count(&*state.db)
        .await?;
    if bookings > 0 {
        return Err(AppError::Conflict(format!(
            "Park {} has {} booking(s) and cannot be deleted",
            existing.name, bookings
        )));
    }

    park::Entity::delete_by_id(existing.id).exec(&*state.db).await?;

    tracing::info!(park_id = %existing.id, user_id = %current.id, "Park deleted");
    Ok(Json(ApiResponse::message("Park deleted successfully")))
}
