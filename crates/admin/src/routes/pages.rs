//! Server-rendered pages: dashboard and the store confirmation flows.

use askama::Template;
use axum::{
    Form, Router,
    extract::{Path, State},
    response::{Html, IntoResponse, Redirect, Response},
    routing::get,
};
use serde::Deserialize;
use tower_sessions::Session;

use vitrine_core::{Credits, STORE_CREATION_COST, StoreId};

use crate::db::{OwnerRepository, StoreRepository};
use crate::error::AppError;
use crate::middleware::{RequireStoreOwner, RequireUser};
use crate::models::Store;
use crate::services::{StoreAccessError, cleanup, store_access};
use crate::state::AppState;

/// Build the pages router.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(dashboard))
        .route("/stores/{id}/delete", get(delete_page).post(delete_store))
        .route("/stores/{id}/access", get(access_page).post(unlock_store))
}

fn render(template: &impl Template) -> Html<String> {
    Html(template.render().unwrap_or_else(|e| {
        tracing::error!("Template render error: {}", e);
        String::from("Error rendering template")
    }))
}

// =============================================================================
// Dashboard
// =============================================================================

/// Dashboard template.
#[derive(Template)]
#[template(path = "dashboard.html")]
struct DashboardTemplate {
    display_name: String,
    credits: Credits,
    store_cost: Credits,
    stores: Vec<Store>,
}

impl DashboardTemplate {
    fn can_afford_store(&self) -> bool {
        self.credits.covers(self.store_cost)
    }
}

/// Stores and credit balance of the current user.
///
/// GET /
async fn dashboard(
    RequireUser(user): RequireUser,
    State(state): State<AppState>,
) -> Result<Html<String>, AppError> {
    let owners = OwnerRepository::new(state.pool());
    let stores = StoreRepository::new(state.pool());
    let (profile, stores) = tokio::try_join!(owners.get(user.id), stores.list_by_owner(user.id))?;

    Ok(render(&DashboardTemplate {
        display_name: user.display_name,
        credits: profile.map_or(Credits::ZERO, |p| p.credits),
        store_cost: STORE_CREATION_COST,
        stores,
    }))
}

// =============================================================================
// Store deletion
// =============================================================================

/// Type-to-confirm deletion form.
#[derive(Template)]
#[template(path = "stores/delete.html")]
struct DeleteStoreTemplate {
    store: Store,
    error: Option<String>,
}

/// GET /stores/{id}/delete
async fn delete_page(RequireStoreOwner { store, .. }: RequireStoreOwner) -> Html<String> {
    render(&DeleteStoreTemplate { store, error: None })
}

/// Deletion form fields.
#[derive(Deserialize)]
pub struct DeleteStoreForm {
    pub confirm_name: String,
}

/// POST /stores/{id}/delete
async fn delete_store(
    RequireStoreOwner { store, .. }: RequireStoreOwner,
    State(state): State<AppState>,
    Form(form): Form<DeleteStoreForm>,
) -> Result<Response, AppError> {
    if let Err(e) = cleanup::confirm_store_deletion(&store.name, &form.confirm_name) {
        let error = Some(e.to_string());
        return Ok(render(&DeleteStoreTemplate { store, error }).into_response());
    }

    cleanup::delete_store(state.pool(), state.storage(), state.product_bucket(), store.id).await?;
    Ok(Redirect::to("/").into_response())
}

// =============================================================================
// Store admin access
// =============================================================================

/// Store admin login form.
#[derive(Template)]
#[template(path = "stores/access.html")]
struct StoreAccessTemplate {
    store: Store,
    unlocked: bool,
    username: String,
    error: Option<String>,
}

async fn load_store(state: &AppState, id: StoreId) -> Result<Store, AppError> {
    StoreRepository::new(state.pool())
        .get(id)
        .await?
        .ok_or(AppError::NotFound)
}

/// GET /stores/{id}/access
async fn access_page(
    RequireUser(user): RequireUser,
    State(state): State<AppState>,
    session: Session,
    Path(id): Path<StoreId>,
) -> Result<Html<String>, AppError> {
    let store = load_store(&state, id).await?;
    let unlocked = store.owner_id == user.id || store_access::has_access(&session, id).await?;

    Ok(render(&StoreAccessTemplate {
        store,
        unlocked,
        username: String::new(),
        error: None,
    }))
}

/// Store admin login fields.
#[derive(Deserialize)]
pub struct StoreLoginForm {
    pub username: String,
    pub password: String,
}

/// POST /stores/{id}/access
async fn unlock_store(
    RequireUser(_user): RequireUser,
    State(state): State<AppState>,
    session: Session,
    Path(id): Path<StoreId>,
    Form(form): Form<StoreLoginForm>,
) -> Result<Response, AppError> {
    let store = load_store(&state, id).await?;

    match store_access::unlock(&session, &store, &form.username, &form.password).await {
        Ok(()) => Ok(Redirect::to(&format!("/stores/{id}/access")).into_response()),
        Err(StoreAccessError::InvalidCredentials) => Ok(render(&StoreAccessTemplate {
            store,
            unlocked: false,
            username: form.username,
            error: Some("Invalid username or password.".to_owned()),
        })
        .into_response()),
        Err(e) => Err(e.into()),
    }
}
