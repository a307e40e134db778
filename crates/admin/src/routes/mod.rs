//! HTTP route handlers for the dashboard.
//!
//! # Route Structure
//!
//! ```text
//! # Pages
//! GET  /                                  - Dashboard (stores + credits)
//! GET  /login                             - Login page
//! POST /login                             - Email/password sign-in
//! GET  /stores/{id}/delete                - Type-to-confirm deletion form
//! POST /stores/{id}/delete                - Delete after confirmation
//! GET  /stores/{id}/access                - Store admin login form
//! POST /stores/{id}/access                - Unlock the store for this session
//!
//! # Auth
//! POST /auth/session                      - Exchange a bearer token for a session
//! POST /auth/logout                       - Clear the session
//!
//! # JSON API (see `api`)
//! /api/me, /api/stores/..., /api/variants/preview,
//! /api/developer, /api/themes/...
//! ```

pub mod api;
pub mod auth;
pub mod pages;

use axum::Router;

use crate::state::AppState;

/// Create all routes for the dashboard.
pub fn routes() -> Router<AppState> {
    Router::new()
        .merge(pages::router())
        .merge(auth::router())
        .merge(api::router())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use axum::body::Body;
    use axum::http::{Request, StatusCode, header};
    use sqlx::postgres::PgPoolOptions;
    use tower::ServiceExt;

    use super::*;
    use crate::config::test_config;

    /// Router over state whose pool never connects; these requests are
    /// answered before any query runs.
    fn app() -> Router {
        let pool = PgPoolOptions::new()
            .connect_lazy("postgres://localhost/vitrine")
            .unwrap();
        routes().with_state(AppState::new(test_config(), pool).unwrap())
    }

    async fn get(uri: &str) -> axum::response::Response {
        app()
            .oneshot(Request::get(uri).body(Body::empty()).unwrap())
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn test_api_without_credentials_is_unauthorized() {
        for uri in [
            "/api/me",
            "/api/stores",
            "/api/stores/00000000-0000-0000-0000-000000000000/products",
            "/api/themes",
        ] {
            assert_eq!(get(uri).await.status(), StatusCode::UNAUTHORIZED, "{uri}");
        }
    }

    #[tokio::test]
    async fn test_pages_without_session_redirect_to_login() {
        let response = get("/").await;
        assert!(response.status().is_redirection());
        assert_eq!(response.headers()[header::LOCATION], "/login");
    }

    #[tokio::test]
    async fn test_login_page_renders() {
        let response = get("/login").await;
        assert_eq!(response.status(), StatusCode::OK);
        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let html = String::from_utf8(body.to_vec()).unwrap();
        assert!(html.contains("name=\"password\""));
    }

    #[tokio::test]
    async fn test_malformed_bearer_is_ignored() {
        let response = app()
            .oneshot(
                Request::get("/api/stores")
                    .header(header::AUTHORIZATION, "Basic dXNlcjpwYXNz")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }
}
