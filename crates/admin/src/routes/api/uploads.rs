//! Image uploads for store catalogs and themes.
//!
//! The request is `multipart/form-data` with one `file` field. Each file is
//! stored at a fresh path under the store's or theme's prefix, which is what
//! store and theme deletion clean up.

use axum::{
    Json, Router,
    extract::{DefaultBodyLimit, Multipart, Path, State, multipart::Field},
    http::StatusCode,
    routing::post,
};
use serde::Serialize;

use vitrine_core::ThemeId;

use crate::error::AppError;
use crate::middleware::{RequireStoreAccess, RequireUser};
use crate::services::cleanup::{store_prefix, theme_prefix};
use crate::services::themes::developer_id;
use crate::services::ThemeService;
use crate::state::AppState;
use crate::storage::{ObjectStorage, image_extension, upload_path};

/// Multipart field carrying the file.
const FILE_FIELD: &str = "file";

/// Build the upload router.
///
/// The default body limit is lifted here; uploads enforce
/// `MAX_UPLOAD_BYTES` while reading.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/api/stores/{id}/uploads", post(upload_store_image))
        .route("/api/themes/{theme_id}/uploads", post(upload_theme_image))
        .layer(DefaultBodyLimit::disable())
}

/// A stored upload.
#[derive(Debug, Serialize)]
pub struct UploadResponse {
    /// Public URL to save on the product, variant, category or theme.
    pub url: String,
    /// Object path within the bucket.
    pub path: String,
}

/// An accepted image read from the request.
#[derive(Debug)]
struct ImageUpload {
    bytes: Vec<u8>,
    extension: &'static str,
}

/// Read the `file` field, checking type and size.
async fn read_image(multipart: &mut Multipart, max_bytes: usize) -> Result<ImageUpload, AppError> {
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::Upload(e.body_text()))?
    {
        if field.name() == Some(FILE_FIELD) {
            return read_field(field, max_bytes).await;
        }
    }
    Err(AppError::Upload(format!("missing '{FILE_FIELD}' field")))
}

async fn read_field(mut field: Field<'_>, max_bytes: usize) -> Result<ImageUpload, AppError> {
    let content_type = field.content_type().unwrap_or_default().to_owned();
    let extension = image_extension(&content_type)
        .ok_or_else(|| AppError::Upload(format!("unsupported file type '{content_type}'")))?;

    let mut bytes = Vec::new();
    while let Some(chunk) = field
        .chunk()
        .await
        .map_err(|e| AppError::Upload(e.body_text()))?
    {
        check_size(bytes.len() + chunk.len(), max_bytes)?;
        bytes.extend_from_slice(&chunk);
    }
    if bytes.is_empty() {
        return Err(AppError::Upload("file is empty".to_owned()));
    }

    Ok(ImageUpload { bytes, extension })
}

fn check_size(size: usize, max_bytes: usize) -> Result<(), AppError> {
    if size > max_bytes {
        return Err(AppError::Upload(format!(
            "file exceeds the {max_bytes} byte limit"
        )));
    }
    Ok(())
}

async fn store_image(
    state: &AppState,
    bucket: &str,
    prefix: &str,
    image: ImageUpload,
) -> Result<UploadResponse, AppError> {
    let path = upload_path(prefix, image.extension);
    let content_type = mime_for(image.extension);
    let size = image.bytes.len();
    let url = state
        .storage()
        .upload(bucket, &path, image.bytes, content_type)
        .await?;
    tracing::info!(bucket = %bucket, path = %path, size, "Image uploaded");
    Ok(UploadResponse { url, path })
}

const fn mime_for(extension: &str) -> &'static str {
    match extension.as_bytes() {
        b"png" => "image/png",
        b"jpg" => "image/jpeg",
        b"webp" => "image/webp",
        b"gif" => "image/gif",
        b"avif" => "image/avif",
        _ => "application/octet-stream",
    }
}

/// POST /api/stores/{id}/uploads
///
/// # Errors
///
/// Returns an upload error for a missing field, unsupported type or oversize
/// file.
pub async fn upload_store_image(
    RequireStoreAccess { store, .. }: RequireStoreAccess,
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> Result<(StatusCode, Json<UploadResponse>), AppError> {
    let image = read_image(&mut multipart, state.config().storage.max_upload_bytes).await?;
    let bucket = state.product_bucket().to_owned();
    let stored = store_image(&state, &bucket, &store_prefix(store.id), image).await?;
    Ok((StatusCode::CREATED, Json(stored)))
}

/// POST /api/themes/{theme_id}/uploads
///
/// # Errors
///
/// Returns `NotFound` unless the theme belongs to the current developer.
pub async fn upload_theme_image(
    RequireUser(user): RequireUser,
    State(state): State<AppState>,
    Path(theme_id): Path<ThemeId>,
    mut multipart: Multipart,
) -> Result<(StatusCode, Json<UploadResponse>), AppError> {
    ThemeService::new(state.pool())
        .theme(developer_id(user.id), theme_id)
        .await?;
    let image = read_image(&mut multipart, state.config().storage.max_upload_bytes).await?;
    let bucket = state.theme_bucket().to_owned();
    let stored = store_image(&state, &bucket, &theme_prefix(theme_id), image).await?;
    Ok((StatusCode::CREATED, Json(stored)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_size_limit_is_inclusive() {
        assert!(check_size(1024, 1024).is_ok());
        assert!(matches!(check_size(1025, 1024), Err(AppError::Upload(_))));
    }

    #[test]
    fn test_mime_matches_accepted_extensions() {
        for content_type in ["image/png", "image/jpeg", "image/webp", "image/gif", "image/avif"] {
            let extension = image_extension(content_type);
            assert!(extension.is_some());
            assert_eq!(extension.map(mime_for), Some(content_type));
        }
    }
}
