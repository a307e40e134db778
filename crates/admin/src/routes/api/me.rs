//! Current user endpoint.

use axum::{Json, Router, extract::State, routing::get};
use serde::Serialize;

use vitrine_core::{Credits, STORE_CREATION_COST};

use crate::db::OwnerRepository;
use crate::error::AppError;
use crate::middleware::RequireUser;
use crate::models::CurrentUser;
use crate::state::AppState;

/// Build the `/api/me` router.
pub fn router() -> Router<AppState> {
    Router::new().route("/api/me", get(me))
}

/// The signed-in user with their credit balance.
#[derive(Debug, Serialize)]
pub struct MeResponse {
    #[serde(flatten)]
    pub user: CurrentUser,
    pub credits: Credits,
    pub store_creation_cost: Credits,
}

/// GET /api/me
///
/// # Errors
///
/// Returns an error if the profile lookup fails.
pub async fn me(
    RequireUser(user): RequireUser,
    State(state): State<AppState>,
) -> Result<Json<MeResponse>, AppError> {
    let credits = OwnerRepository::new(state.pool())
        .get(user.id)
        .await?
        .map_or(Credits::ZERO, |profile| profile.credits);

    Ok(Json(MeResponse {
        user,
        credits,
        store_creation_cost: STORE_CREATION_COST,
    }))
}
