//! Store catalog API: attributes, categories and products.
//!
//! All handlers accept the store owner or a session that unlocked the store.

use axum::{
    Json, Router,
    extract::{Path, State},
    http::StatusCode,
    routing::{get, put},
};
use serde::{Deserialize, Serialize};

use vitrine_core::{CategoryId, ProductId, StoreId};

use crate::error::AppError;
use crate::middleware::RequireStoreAccess;
use crate::models::{Attribute, Product, ProductCategory, ProductWithVariants};
use crate::services::catalog::{AttributeList, CategoryEntry, CategoryInput, ProductInput};
use crate::services::{CatalogService, CleanupReport, cleanup};
use crate::state::AppState;

/// Build the catalog router.
pub fn router() -> Router<AppState> {
    Router::new()
        .route(
            "/api/stores/{id}/attributes",
            get(list_attributes).post(create_attribute),
        )
        .route(
            "/api/stores/{id}/categories",
            get(list_categories).post(create_category),
        )
        .route(
            "/api/stores/{id}/categories/{category_id}",
            put(update_category).delete(delete_category),
        )
        .route(
            "/api/stores/{id}/products",
            get(list_products).post(create_product),
        )
        .route(
            "/api/stores/{id}/products/{product_id}",
            get(get_product).put(update_product).delete(delete_product),
        )
}

// =============================================================================
// Attributes
// =============================================================================

/// GET /api/stores/{id}/attributes
///
/// # Errors
///
/// Returns an error if the query fails.
pub async fn list_attributes(
    RequireStoreAccess { store, .. }: RequireStoreAccess,
    State(state): State<AppState>,
) -> Result<Json<AttributeList>, AppError> {
    Ok(Json(CatalogService::new(state.pool()).attributes(store.id).await?))
}

/// New custom attribute.
#[derive(Debug, Deserialize)]
pub struct NewAttribute {
    pub name: String,
}

/// POST /api/stores/{id}/attributes
///
/// # Errors
///
/// Returns a validation error for a blank, built-in or duplicate name.
pub async fn create_attribute(
    RequireStoreAccess { store, .. }: RequireStoreAccess,
    State(state): State<AppState>,
    Json(body): Json<NewAttribute>,
) -> Result<(StatusCode, Json<Attribute>), AppError> {
    let attribute = CatalogService::new(state.pool())
        .create_attribute(store.id, &body.name)
        .await?;
    Ok((StatusCode::CREATED, Json(attribute)))
}

// =============================================================================
// Categories
// =============================================================================

/// GET /api/stores/{id}/categories
///
/// # Errors
///
/// Returns an error if the stored tree is inconsistent.
pub async fn list_categories(
    RequireStoreAccess { store, .. }: RequireStoreAccess,
    State(state): State<AppState>,
) -> Result<Json<Vec<CategoryEntry>>, AppError> {
    Ok(Json(CatalogService::new(state.pool()).categories(store.id).await?))
}

/// POST /api/stores/{id}/categories
///
/// # Errors
///
/// Returns a validation error for a bad name or parent.
pub async fn create_category(
    RequireStoreAccess { store, .. }: RequireStoreAccess,
    State(state): State<AppState>,
    Json(input): Json<CategoryInput>,
) -> Result<(StatusCode, Json<ProductCategory>), AppError> {
    let category = CatalogService::new(state.pool())
        .create_category(store.id, input)
        .await?;
    Ok((StatusCode::CREATED, Json(category)))
}

/// PUT /api/stores/{id}/categories/{category_id}
///
/// # Errors
///
/// Returns a validation error if the new parent would form a cycle.
pub async fn update_category(
    RequireStoreAccess { store, .. }: RequireStoreAccess,
    State(state): State<AppState>,
    Path((_, category_id)): Path<(StoreId, CategoryId)>,
    Json(input): Json<CategoryInput>,
) -> Result<Json<ProductCategory>, AppError> {
    Ok(Json(
        CatalogService::new(state.pool())
            .update_category(store.id, category_id, input)
            .await?,
    ))
}

/// DELETE /api/stores/{id}/categories/{category_id}
///
/// # Errors
///
/// Returns `NotFound` if the store has no such category.
pub async fn delete_category(
    RequireStoreAccess { store, .. }: RequireStoreAccess,
    State(state): State<AppState>,
    Path((_, category_id)): Path<(StoreId, CategoryId)>,
) -> Result<StatusCode, AppError> {
    CatalogService::new(state.pool())
        .delete_category(store.id, category_id)
        .await?;
    Ok(StatusCode::NO_CONTENT)
}

// =============================================================================
// Products
// =============================================================================

/// GET /api/stores/{id}/products
///
/// # Errors
///
/// Returns an error if the query fails.
pub async fn list_products(
    RequireStoreAccess { store, .. }: RequireStoreAccess,
    State(state): State<AppState>,
) -> Result<Json<Vec<Product>>, AppError> {
    Ok(Json(CatalogService::new(state.pool()).products(store.id).await?))
}

/// POST /api/stores/{id}/products
///
/// # Errors
///
/// Returns a validation error for bad fields or variants.
pub async fn create_product(
    RequireStoreAccess { store, .. }: RequireStoreAccess,
    State(state): State<AppState>,
    Json(input): Json<ProductInput>,
) -> Result<(StatusCode, Json<ProductWithVariants>), AppError> {
    let product = CatalogService::new(state.pool())
        .create_product(store.id, input)
        .await?;
    Ok((StatusCode::CREATED, Json(product)))
}

/// GET /api/stores/{id}/products/{product_id}
///
/// # Errors
///
/// Returns `NotFound` if the store has no such product.
pub async fn get_product(
    RequireStoreAccess { store, .. }: RequireStoreAccess,
    State(state): State<AppState>,
    Path((_, product_id)): Path<(StoreId, ProductId)>,
) -> Result<Json<ProductWithVariants>, AppError> {
    Ok(Json(
        CatalogService::new(state.pool())
            .product(store.id, product_id)
            .await?,
    ))
}

/// PUT /api/stores/{id}/products/{product_id}
///
/// Variants are synchronized in one transaction: matching combinations are
/// updated, new ones inserted and the rest deleted.
///
/// # Errors
///
/// Returns a validation error for bad fields or variants, or `NotFound`.
pub async fn update_product(
    RequireStoreAccess { store, .. }: RequireStoreAccess,
    State(state): State<AppState>,
    Path((_, product_id)): Path<(StoreId, ProductId)>,
    Json(input): Json<ProductInput>,
) -> Result<Json<ProductWithVariants>, AppError> {
    Ok(Json(
        CatalogService::new(state.pool())
            .update_product(store.id, product_id, input)
            .await?,
    ))
}

/// Result of a product deletion.
#[derive(Debug, Serialize)]
pub struct DeleteProductResponse {
    pub deleted: ProductId,
    pub cleanup: CleanupReport,
}

/// DELETE /api/stores/{id}/products/{product_id}
///
/// # Errors
///
/// Returns `NotFound` if the store has no such product.
pub async fn delete_product(
    RequireStoreAccess { store, .. }: RequireStoreAccess,
    State(state): State<AppState>,
    Path((_, product_id)): Path<(StoreId, ProductId)>,
) -> Result<Json<DeleteProductResponse>, AppError> {
    let cleanup = cleanup::delete_product(
        state.pool(),
        state.storage(),
        state.product_bucket(),
        store.id,
        product_id,
    )
    .await?;
    Ok(Json(DeleteProductResponse {
        deleted: product_id,
        cleanup,
    }))
}
