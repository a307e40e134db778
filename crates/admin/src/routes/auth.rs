//! Authentication route handlers.
//!
//! Users sign in with the external identity service. The login form posts
//! email and password here; API clients that already hold an access token
//! exchange it for a session cookie with `POST /auth/session`.

use askama::Template;
use axum::{
    Form, Json, Router,
    extract::State,
    http::HeaderMap,
    response::{Html, IntoResponse, Redirect, Response},
    routing::{get, post},
};
use secrecy::SecretString;
use serde::Deserialize;
use tower_sessions::Session;

use crate::error::AppError;
use crate::middleware::auth::bearer_token;
use crate::middleware::{OptionalUser, clear_current_user, set_current_user};
use crate::models::CurrentUser;
use crate::services::IdentityError;
use crate::state::AppState;

/// Login page template.
#[derive(Template)]
#[template(path = "login.html")]
struct LoginPageTemplate {
    email: String,
    error: Option<String>,
}

impl LoginPageTemplate {
    fn render_html(&self) -> Html<String> {
        Html(self.render().unwrap_or_else(|e| {
            tracing::error!("Template render error: {}", e);
            String::from("Error rendering template")
        }))
    }
}

/// Build the auth router.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/login", get(login_page).post(login))
        .route("/auth/session", post(create_session))
        .route("/auth/logout", post(logout))
}

/// Render the login page.
///
/// GET /login
async fn login_page(OptionalUser(user): OptionalUser) -> Response {
    if user.is_some() {
        return Redirect::to("/").into_response();
    }
    LoginPageTemplate {
        email: String::new(),
        error: None,
    }
    .render_html()
    .into_response()
}

/// Login form fields.
#[derive(Deserialize)]
pub struct LoginForm {
    pub email: String,
    pub password: String,
}

/// Sign in with email and password.
///
/// POST /login
async fn login(
    State(state): State<AppState>,
    session: Session,
    Form(form): Form<LoginForm>,
) -> Result<Response, AppError> {
    let password = SecretString::from(form.password);
    match state.identity().sign_in(&form.email, &password).await {
        Ok(signed_in) => {
            let user = CurrentUser::from(signed_in.user);
            set_current_user(&session, &user).await?;
            tracing::info!(user_id = %user.id, "User logged in");
            Ok(Redirect::to("/").into_response())
        }
        Err(IdentityError::InvalidCredentials) => Ok(LoginPageTemplate {
            email: form.email,
            error: Some("Invalid email or password.".to_owned()),
        }
        .render_html()
        .into_response()),
        Err(e) => Err(e.into()),
    }
}

/// Exchange a bearer token for a session cookie.
///
/// POST /auth/session
async fn create_session(
    State(state): State<AppState>,
    session: Session,
    headers: HeaderMap,
) -> Result<Json<CurrentUser>, AppError> {
    let token = bearer_token(&headers).ok_or(AppError::AuthRequired)?;
    let user = CurrentUser::from(state.identity().current_user(token).await?);
    set_current_user(&session, &user).await?;
    tracing::info!(user_id = %user.id, "Session created from access token");
    Ok(Json(user))
}

/// Logout and clear session.
///
/// POST /auth/logout
async fn logout(State(state): State<AppState>, session: Session, headers: HeaderMap) -> Redirect {
    if let Some(token) = bearer_token(&headers) {
        state.identity().forget(token).await;
    }
    if let Err(e) = clear_current_user(&session).await {
        tracing::warn!(error = %e, "Failed to clear session on logout");
    }
    Redirect::to("/login")
}
