//! Theme developer API: profile, themes, mock data and preview.
//!
//! The developer id is the signed-in user's id, so every theme lookup is
//! scoped to its developer and another developer's theme reads as not found.

use axum::{
    Json, Router,
    extract::{Path, State},
    http::StatusCode,
    routing::{get, post, put},
};
use serde::{Deserialize, Serialize};

use vitrine_core::theme::MockSettings;
use vitrine_core::{ThemeCategoryId, ThemeId, ThemeProductId, ThemeStatus};

use crate::error::AppError;
use crate::middleware::RequireUser;
use crate::models::{Theme, ThemeCategory, ThemeDeveloper, ThemeProduct};
use crate::services::themes::{
    DeveloperInput, MockCategoryInput, MockProductInput, PreviewCategory, ThemeInput,
    ThemePreview, developer_id,
};
use crate::services::{CleanupReport, ThemeService, cleanup};
use crate::state::AppState;
use crate::storage::ObjectStorage;

/// Build the theme router.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/api/developer", get(get_developer).put(save_developer))
        .route("/api/themes", get(list_themes).post(create_theme))
        .route(
            "/api/themes/{theme_id}",
            get(get_theme).put(update_theme).delete(delete_theme),
        )
        .route("/api/themes/{theme_id}/status", post(set_status))
        .route(
            "/api/themes/{theme_id}/mock/categories",
            get(list_mock_categories).post(create_mock_category),
        )
        .route(
            "/api/themes/{theme_id}/mock/categories/{category_id}",
            put(update_mock_category).delete(delete_mock_category),
        )
        .route(
            "/api/themes/{theme_id}/mock/products",
            get(list_mock_products).post(create_mock_product),
        )
        .route(
            "/api/themes/{theme_id}/mock/products/{product_id}",
            put(update_mock_product).delete(delete_mock_product),
        )
        .route(
            "/api/themes/{theme_id}/mock/settings",
            get(get_settings).put(update_settings),
        )
        .route("/api/themes/{theme_id}/preview", get(preview))
}

// =============================================================================
// Developer profile
// =============================================================================

/// GET /api/developer
///
/// Returns `null` until the profile is created.
///
/// # Errors
///
/// Returns an error if the query fails.
pub async fn get_developer(
    RequireUser(user): RequireUser,
    State(state): State<AppState>,
) -> Result<Json<Option<ThemeDeveloper>>, AppError> {
    Ok(Json(
        ThemeService::new(state.pool())
            .developer(developer_id(user.id))
            .await?,
    ))
}

/// PUT /api/developer
///
/// # Errors
///
/// Returns a validation error for a blank name or bad website URL.
pub async fn save_developer(
    RequireUser(user): RequireUser,
    State(state): State<AppState>,
    Json(input): Json<DeveloperInput>,
) -> Result<Json<ThemeDeveloper>, AppError> {
    Ok(Json(
        ThemeService::new(state.pool())
            .save_developer(developer_id(user.id), input)
            .await?,
    ))
}

// =============================================================================
// Themes
// =============================================================================

/// GET /api/themes
///
/// # Errors
///
/// Returns an error if the query fails.
pub async fn list_themes(
    RequireUser(user): RequireUser,
    State(state): State<AppState>,
) -> Result<Json<Vec<Theme>>, AppError> {
    Ok(Json(
        ThemeService::new(state.pool())
            .themes(developer_id(user.id))
            .await?,
    ))
}

/// POST /api/themes
///
/// # Errors
///
/// Returns a validation error if the developer has no profile yet.
pub async fn create_theme(
    RequireUser(user): RequireUser,
    State(state): State<AppState>,
    Json(input): Json<ThemeInput>,
) -> Result<(StatusCode, Json<Theme>), AppError> {
    let theme = ThemeService::new(state.pool())
        .create_theme(developer_id(user.id), input)
        .await?;
    Ok((StatusCode::CREATED, Json(theme)))
}

/// GET /api/themes/{theme_id}
///
/// # Errors
///
/// Returns `NotFound` unless the theme belongs to the developer.
pub async fn get_theme(
    RequireUser(user): RequireUser,
    State(state): State<AppState>,
    Path(theme_id): Path<ThemeId>,
) -> Result<Json<Theme>, AppError> {
    Ok(Json(
        ThemeService::new(state.pool())
            .theme(developer_id(user.id), theme_id)
            .await?,
    ))
}

/// PUT /api/themes/{theme_id}
///
/// # Errors
///
/// Returns a validation error; a published theme must stay publishable.
pub async fn update_theme(
    RequireUser(user): RequireUser,
    State(state): State<AppState>,
    Path(theme_id): Path<ThemeId>,
    Json(input): Json<ThemeInput>,
) -> Result<Json<Theme>, AppError> {
    Ok(Json(
        ThemeService::new(state.pool())
            .update_theme(developer_id(user.id), theme_id, input)
            .await?,
    ))
}

/// Result of a theme deletion.
#[derive(Debug, Serialize)]
pub struct DeleteThemeResponse {
    pub deleted: ThemeId,
    pub cleanup: CleanupReport,
}

/// DELETE /api/themes/{theme_id}
///
/// # Errors
///
/// Returns `NotFound` unless the theme belongs to the developer.
pub async fn delete_theme(
    RequireUser(user): RequireUser,
    State(state): State<AppState>,
    Path(theme_id): Path<ThemeId>,
) -> Result<Json<DeleteThemeResponse>, AppError> {
    let cleanup = cleanup::delete_theme(
        state.pool(),
        state.storage(),
        state.theme_bucket(),
        developer_id(user.id),
        theme_id,
    )
    .await?;
    Ok(Json(DeleteThemeResponse {
        deleted: theme_id,
        cleanup,
    }))
}

/// Requested status.
#[derive(Debug, Deserialize)]
pub struct StatusRequest {
    pub status: ThemeStatus,
}

/// POST /api/themes/{theme_id}/status
///
/// # Errors
///
/// Returns a validation error if the theme cannot be published yet.
pub async fn set_status(
    RequireUser(user): RequireUser,
    State(state): State<AppState>,
    Path(theme_id): Path<ThemeId>,
    Json(request): Json<StatusRequest>,
) -> Result<Json<Theme>, AppError> {
    Ok(Json(
        ThemeService::new(state.pool())
            .set_status(developer_id(user.id), theme_id, request.status)
            .await?,
    ))
}

// =============================================================================
// Mock categories
// =============================================================================

/// GET /api/themes/{theme_id}/mock/categories
///
/// # Errors
///
/// Returns `NotFound` unless the theme belongs to the developer.
pub async fn list_mock_categories(
    RequireUser(user): RequireUser,
    State(state): State<AppState>,
    Path(theme_id): Path<ThemeId>,
) -> Result<Json<Vec<PreviewCategory>>, AppError> {
    Ok(Json(
        ThemeService::new(state.pool())
            .mock_categories(developer_id(user.id), theme_id)
            .await?,
    ))
}

/// POST /api/themes/{theme_id}/mock/categories
///
/// # Errors
///
/// Returns a validation error for a bad name or parent.
pub async fn create_mock_category(
    RequireUser(user): RequireUser,
    State(state): State<AppState>,
    Path(theme_id): Path<ThemeId>,
    Json(input): Json<MockCategoryInput>,
) -> Result<(StatusCode, Json<ThemeCategory>), AppError> {
    let category = ThemeService::new(state.pool())
        .create_mock_category(developer_id(user.id), theme_id, input)
        .await?;
    Ok((StatusCode::CREATED, Json(category)))
}

/// PUT /api/themes/{theme_id}/mock/categories/{category_id}
///
/// # Errors
///
/// Returns a validation error if the new parent would form a cycle.
pub async fn update_mock_category(
    RequireUser(user): RequireUser,
    State(state): State<AppState>,
    Path((theme_id, category_id)): Path<(ThemeId, ThemeCategoryId)>,
    Json(input): Json<MockCategoryInput>,
) -> Result<Json<ThemeCategory>, AppError> {
    Ok(Json(
        ThemeService::new(state.pool())
            .update_mock_category(developer_id(user.id), theme_id, category_id, input)
            .await?,
    ))
}

/// DELETE /api/themes/{theme_id}/mock/categories/{category_id}
///
/// # Errors
///
/// Returns `NotFound` if the theme has no such category.
pub async fn delete_mock_category(
    RequireUser(user): RequireUser,
    State(state): State<AppState>,
    Path((theme_id, category_id)): Path<(ThemeId, ThemeCategoryId)>,
) -> Result<StatusCode, AppError> {
    ThemeService::new(state.pool())
        .delete_mock_category(developer_id(user.id), theme_id, category_id)
        .await?;
    Ok(StatusCode::NO_CONTENT)
}

// =============================================================================
// Mock products
// =============================================================================

/// GET /api/themes/{theme_id}/mock/products
///
/// # Errors
///
/// Returns `NotFound` unless the theme belongs to the developer.
pub async fn list_mock_products(
    RequireUser(user): RequireUser,
    State(state): State<AppState>,
    Path(theme_id): Path<ThemeId>,
) -> Result<Json<Vec<ThemeProduct>>, AppError> {
    Ok(Json(
        ThemeService::new(state.pool())
            .mock_products(developer_id(user.id), theme_id)
            .await?,
    ))
}

/// POST /api/themes/{theme_id}/mock/products
///
/// # Errors
///
/// Returns a validation error for bad fields or a foreign category.
pub async fn create_mock_product(
    RequireUser(user): RequireUser,
    State(state): State<AppState>,
    Path(theme_id): Path<ThemeId>,
    Json(input): Json<MockProductInput>,
) -> Result<(StatusCode, Json<ThemeProduct>), AppError> {
    let product = ThemeService::new(state.pool())
        .create_mock_product(developer_id(user.id), theme_id, input)
        .await?;
    Ok((StatusCode::CREATED, Json(product)))
}

/// PUT /api/themes/{theme_id}/mock/products/{product_id}
///
/// # Errors
///
/// Returns a validation error for bad fields, or `NotFound`.
pub async fn update_mock_product(
    RequireUser(user): RequireUser,
    State(state): State<AppState>,
    Path((theme_id, product_id)): Path<(ThemeId, ThemeProductId)>,
    Json(input): Json<MockProductInput>,
) -> Result<Json<ThemeProduct>, AppError> {
    Ok(Json(
        ThemeService::new(state.pool())
            .update_mock_product(developer_id(user.id), theme_id, product_id, input)
            .await?,
    ))
}

/// Result of a mock product deletion.
#[derive(Debug, Serialize)]
pub struct DeleteMockProductResponse {
    pub deleted: ThemeProductId,
    pub cleanup: CleanupReport,
}

/// DELETE /api/themes/{theme_id}/mock/products/{product_id}
///
/// The product's uploaded images are removed afterwards, best effort, unless
/// the theme still uses them elsewhere.
///
/// # Errors
///
/// Returns `NotFound` if the theme has no such product.
pub async fn delete_mock_product(
    RequireUser(user): RequireUser,
    State(state): State<AppState>,
    Path((theme_id, product_id)): Path<(ThemeId, ThemeProductId)>,
) -> Result<Json<DeleteMockProductResponse>, AppError> {
    let (product, in_use) = ThemeService::new(state.pool())
        .delete_mock_product(developer_id(user.id), theme_id, product_id)
        .await?;

    let bucket = state.theme_bucket();
    let owned: Vec<String> = product
        .images
        .iter()
        .filter_map(|url| state.storage().object_path(bucket, url))
        .collect();
    let paths = cleanup::unshared_paths(state.storage(), bucket, owned, &in_use);
    let cleanup = cleanup::remove_best_effort(state.storage(), bucket, &paths).await;

    Ok(Json(DeleteMockProductResponse {
        deleted: product_id,
        cleanup,
    }))
}

// =============================================================================
// Mock settings and preview
// =============================================================================

/// GET /api/themes/{theme_id}/mock/settings
///
/// # Errors
///
/// Returns `NotFound` unless the theme belongs to the developer.
pub async fn get_settings(
    RequireUser(user): RequireUser,
    State(state): State<AppState>,
    Path(theme_id): Path<ThemeId>,
) -> Result<Json<MockSettings>, AppError> {
    let theme = ThemeService::new(state.pool())
        .theme(developer_id(user.id), theme_id)
        .await?;
    Ok(Json(theme.settings))
}

/// PUT /api/themes/{theme_id}/mock/settings
///
/// # Errors
///
/// Returns a validation error for out-of-range discount or rating values.
pub async fn update_settings(
    RequireUser(user): RequireUser,
    State(state): State<AppState>,
    Path(theme_id): Path<ThemeId>,
    Json(settings): Json<MockSettings>,
) -> Result<Json<MockSettings>, AppError> {
    Ok(Json(
        ThemeService::new(state.pool())
            .update_settings(developer_id(user.id), theme_id, settings)
            .await?,
    ))
}

/// GET /api/themes/{theme_id}/preview
///
/// # Errors
///
/// Returns `NotFound` unless the theme belongs to the developer.
pub async fn preview(
    RequireUser(user): RequireUser,
    State(state): State<AppState>,
    Path(theme_id): Path<ThemeId>,
) -> Result<Json<ThemePreview>, AppError> {
    Ok(Json(
        ThemeService::new(state.pool())
            .preview(developer_id(user.id), theme_id)
            .await?,
    ))
}
