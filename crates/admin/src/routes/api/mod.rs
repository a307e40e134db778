//! JSON API handlers.
//!
//! Every endpoint requires a user (session or bearer token). Errors render
//! as `{"error": <kind>, "message": <text>}`.

pub mod catalog;
pub mod me;
pub mod stores;
pub mod themes;
pub mod uploads;
pub mod variants;

use axum::Router;

use crate::state::AppState;

/// Build the complete API router.
pub fn router() -> Router<AppState> {
    Router::new()
        .merge(me::router())
        .merge(stores::router())
        .merge(catalog::router())
        .merge(uploads::router())
        .merge(variants::router())
        .merge(themes::router())
}
