use std::path::Path;

use axum::{
    extract::{Multipart, State},
    Json,
};
use chrono::Utc;
use serde::Serialize;

use crate::error::{AppError, AppResult};
use crate::AppState;

const FIELD_NAME: &str = "image";

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadResponse {
    pub success: bool,
    pub file_path: String,
}

/// Extensions served back from the uploads directory.
const IMAGE_EXTENSIONS: [&str; 5] = ["jpg", "jpeg", "png", "gif", "webp"];

/// Stored name: field name, upload time in milliseconds, original extension.
/// Only raster image extensions are accepted.
pub fn stored_file_name(original: Option<&str>, millis: i64) -> AppResult<String> {
    let extension = original
        .and_then(|name| Path::new(name).extension())
        .and_then(|ext| ext.to_str())
        .map(str::to_lowercase)
        .filter(|ext| IMAGE_EXTENSIONS.contains(&ext.as_str()))
        .ok_or_else(|| AppError::Validation("Only image files are allowed!".to_string()))?;
    Ok(format!("{}-{}.{}", FIELD_NAME, millis, extension))
}

/// Single image upload from the `image` multipart field
pub async fn upload_image(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> AppResult<Json<UploadResponse>> {
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::Validation(e.body_text()))?
    {
        if field.name() != Some(FIELD_NAME) {
            continue;
        }

        let is_image = field
            .content_type()
            .is_some_and(|mime| mime.starts_with("image/"));
        if !is_image {
            return Err(AppError::Validation("Only image files are allowed!".to_string()));
        }

        let file_name = stored_file_name(field.file_name(), Utc::now().timestamp_millis())?;
        let bytes = field
            .bytes()
            .await
            .map_err(|e| AppError::Validation(e.body_text()))?;

        tokio::fs::create_dir_all(&state.config.upload_dir)
            .await
            .map_err(|e| AppError::Internal(format!("Failed to create upload dir: {}", e)))?;
        let target = Path::new(&state.config.upload_dir).join(&file_name);
        tokio::fs::write(&target, &bytes)
            .await
            .map_err(|e| AppError::Internal(format!("Failed to store upload: {}", e)))?;

        tracing::info!(file = %file_name, size = bytes.len(), "Image uploaded");
        return Ok(Json(UploadResponse {
            success: true,
            file_path: format!("/uploads/{}", file_name),
        }));
    }

    Err(AppError::Validation("No file uploaded.".to_string()))
}
