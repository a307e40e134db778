//! Store management API.
//!
//! Creation goes through the credit guard; deletion needs the store name
//! typed back and cleans up the store's uploads.

use axum::{
    Json, Router,
    extract::{Path, State},
    http::StatusCode,
    routing::{get, post, put},
};
use serde::{Deserialize, Serialize};
use tower_sessions::Session;

use vitrine_core::{Email, StoreId};

use crate::db::{PgStoreLedger, StoreRepository, stores::StoreUpdate};
use crate::error::AppError;
use crate::middleware::{RequireStoreOwner, RequireUser};
use crate::models::Store;
use crate::services::store_provisioning::MAX_STORE_NAME_LENGTH;
use crate::services::{
    CleanupReport, NewStoreRequest, StoreProvisioner, cleanup, store_access,
};
use crate::state::AppState;

/// Build the store router.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/api/stores", get(list_stores).post(create_store))
        .route("/api/stores/{id}", get(get_store).put(update_store))
        .route("/api/stores/{id}/delete", post(delete_store))
        .route("/api/stores/{id}/access-credentials", put(set_access_credentials))
        .route("/api/stores/{id}/access", post(unlock_store))
}

/// GET /api/stores
///
/// # Errors
///
/// Returns an error if the query fails.
pub async fn list_stores(
    RequireUser(user): RequireUser,
    State(state): State<AppState>,
) -> Result<Json<Vec<Store>>, AppError> {
    Ok(Json(
        StoreRepository::new(state.pool())
            .list_by_owner(user.id)
            .await?,
    ))
}

/// POST /api/stores
///
/// # Errors
///
/// Returns `DuplicateSlug`, `InsufficientCredits` (402) or a validation
/// error; nothing is charged in those cases.
pub async fn create_store(
    RequireUser(user): RequireUser,
    State(state): State<AppState>,
    Json(request): Json<NewStoreRequest>,
) -> Result<(StatusCode, Json<Store>), AppError> {
    let provisioner = StoreProvisioner::new(PgStoreLedger::new(state.pool()));
    let store = provisioner.create_store(user.id, request).await?;
    Ok((StatusCode::CREATED, Json(store)))
}

/// GET /api/stores/{id}
pub async fn get_store(RequireStoreOwner { store, .. }: RequireStoreOwner) -> Json<Store> {
    Json(store)
}

/// Editable store fields.
#[derive(Debug, Deserialize)]
pub struct UpdateStoreRequest {
    pub name: String,
    pub contact_email: String,
    pub is_active: bool,
}

fn store_update(request: UpdateStoreRequest) -> Result<StoreUpdate, AppError> {
    let name = request.name.trim().to_owned();
    if name.is_empty() {
        return Err(AppError::Validation("store name is required".to_owned()));
    }
    if name.chars().count() > MAX_STORE_NAME_LENGTH {
        return Err(AppError::Validation(format!(
            "store name must be at most {MAX_STORE_NAME_LENGTH} characters"
        )));
    }
    let contact_email = Email::parse(request.contact_email.trim())
        .map_err(|e| AppError::Validation(format!("invalid contact email: {e}")))?;

    Ok(StoreUpdate {
        name,
        contact_email,
        is_active: request.is_active,
    })
}

/// PUT /api/stores/{id}
///
/// # Errors
///
/// Returns a validation error for a blank name or bad email.
pub async fn update_store(
    RequireStoreOwner { store, .. }: RequireStoreOwner,
    State(state): State<AppState>,
    Json(request): Json<UpdateStoreRequest>,
) -> Result<Json<Store>, AppError> {
    let update = store_update(request)?;
    let store = StoreRepository::new(state.pool())
        .update(store.id, &update)
        .await?;
    tracing::info!(store_id = %store.id, "Store updated");
    Ok(Json(store))
}

/// Second confirmation for store deletion.
#[derive(Debug, Deserialize)]
pub struct DeleteStoreRequest {
    pub confirm_name: String,
}

/// Result of a store deletion.
#[derive(Debug, Serialize)]
pub struct DeleteStoreResponse {
    pub deleted: StoreId,
    pub cleanup: CleanupReport,
}

/// POST /api/stores/{id}/delete
///
/// # Errors
///
/// Returns a validation error unless `confirm_name` matches the store name
/// exactly.
pub async fn delete_store(
    RequireStoreOwner { store, .. }: RequireStoreOwner,
    State(state): State<AppState>,
    Json(request): Json<DeleteStoreRequest>,
) -> Result<Json<DeleteStoreResponse>, AppError> {
    cleanup::confirm_store_deletion(&store.name, &request.confirm_name)?;
    let cleanup =
        cleanup::delete_store(state.pool(), state.storage(), state.product_bucket(), store.id)
            .await?;
    Ok(Json(DeleteStoreResponse {
        deleted: store.id,
        cleanup,
    }))
}

/// Store admin username and password.
#[derive(Debug, Deserialize)]
pub struct AccessCredentials {
    pub username: String,
    pub password: String,
}

/// PUT /api/stores/{id}/access-credentials
///
/// # Errors
///
/// Returns a validation error for a blank username or short password.
pub async fn set_access_credentials(
    RequireStoreOwner { store, .. }: RequireStoreOwner,
    State(state): State<AppState>,
    Json(credentials): Json<AccessCredentials>,
) -> Result<StatusCode, AppError> {
    store_access::set_credentials(
        state.pool(),
        store.id,
        &credentials.username,
        &credentials.password,
    )
    .await?;
    Ok(StatusCode::NO_CONTENT)
}

/// Whether the store is unlocked for this session.
#[derive(Debug, Serialize)]
pub struct AccessResponse {
    pub store_id: StoreId,
    pub granted: bool,
}

/// POST /api/stores/{id}/access
///
/// Any signed-in user with the store's admin credentials may unlock it.
///
/// # Errors
///
/// Returns `Forbidden` for wrong credentials.
pub async fn unlock_store(
    RequireUser(_user): RequireUser,
    State(state): State<AppState>,
    session: Session,
    Path(id): Path<StoreId>,
    Json(credentials): Json<AccessCredentials>,
) -> Result<Json<AccessResponse>, AppError> {
    let store = StoreRepository::new(state.pool())
        .get(id)
        .await?
        .ok_or(AppError::NotFound)?;

    store_access::unlock(&session, &store, &credentials.username, &credentials.password).await?;
    Ok(Json(AccessResponse {
        store_id: id,
        granted: true,
    }))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn request(name: &str, email: &str) -> UpdateStoreRequest {
        UpdateStoreRequest {
            name: name.to_owned(),
            contact_email: email.to_owned(),
            is_active: false,
        }
    }

    #[test]
    fn test_store_update_trims_and_validates() {
        let update = store_update(request("  Corner Shop ", "hi@corner.test")).unwrap();
        assert_eq!(update.name, "Corner Shop");
        assert!(!update.is_active);

        assert!(matches!(
            store_update(request("   ", "hi@corner.test")),
            Err(AppError::Validation(_))
        ));
        assert!(matches!(
            store_update(request("Corner Shop", "not-an-email")),
            Err(AppError::Validation(_))
        ));
        assert!(store_update(request(&"x".repeat(MAX_STORE_NAME_LENGTH + 1), "hi@corner.test")).is_err());
    }
}
