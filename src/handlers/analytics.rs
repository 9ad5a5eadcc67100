use axum::{
    extract::{Query, State},
    http::header,
    response::IntoResponse,
    Extension, Json,
};
use serde::Deserialize;
use uuid::Uuid;

use crate::error::AppResult;
use crate::response::ApiResponse;
use crate::services::access::CurrentUser;
use crate::services::analytics::{self, ParkPopularity, SalesReport, VisitorReport};
use crate::AppState;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalyticsQuery {
    pub period: Option<String>,
    pub park_id: Option<Uuid>,
}

impl AnalyticsQuery {
    fn period_or<'a>(&'a self, default: &'a str) -> &'a str {
        self.period.as_deref().unwrap_or(default)
    }
}

/// Revenue of completed bookings in the current period
pub async fn sales(
    State(state): State<AppState>,
    Extension(current): Extension<CurrentUser>,
    Query(query): Query<AnalyticsQuery>,
) -> AppResult<Json<ApiResponse<SalesReport>>> {
    let report =
        analytics::sales_report(&*state.db, &current, query.period_or("daily"), query.park_id)
            .await?;
    Ok(Json(ApiResponse::success(report)))
}

pub async fn visitors(
    State(state): State<AppState>,
    Extension(current): Extension<CurrentUser>,
    Query(query): Query<AnalyticsQuery>,
) -> AppResult<Json<ApiResponse<VisitorReport>>> {
    let report =
        analytics::visitor_report(&*state.db, &current, query.period_or("daily"), query.park_id)
            .await?;
    Ok(Json(ApiResponse::success(report)))
}

pub async fn popularity(
    State(state): State<AppState>,
    Extension(current): Extension<CurrentUser>,
) -> AppResult<Json<ApiResponse<Vec<ParkPopularity>>>> {
    Ok(Json(ApiResponse::list(
        analytics::park_popularity(&*state.db, &current).await?,
    )))
}

/// CSV download; defaults to the current month
pub async fn export_sales(
    State(state): State<AppState>,
    Extension(current): Extension<CurrentUser>,
    Query(query): Query<AnalyticsQuery>,
) -> AppResult<impl IntoResponse> {
    let (file_name, csv) =
        analytics::export_sales(&*state.db, &current, query.period_or("monthly"), query.park_id)
            .await?;

    Ok((
        [
            (header::CONTENT_TYPE, "text/csv".to_string()),
            (
                header::CONTENT_DISPOSITION,
                format!("attachment; filename={}", file_name),
            ),
        ],
        csv,
    ))
}
