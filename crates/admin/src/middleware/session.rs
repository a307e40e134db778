//! Session middleware configuration.
//!
//! `PostgreSQL`-backed sessions using tower-sessions: `SameSite=Strict`,
//! `HttpOnly`, 24h inactivity expiry, `Secure` when served over HTTPS.

use sqlx::PgPool;
use thiserror::Error;
use tower_sessions::{Expiry, SessionManagerLayer};
use tower_sessions_sqlx_store::PostgresStore;

use crate::config::AdminConfig;

/// Session cookie name.
pub const SESSION_COOKIE_NAME: &str = "vitrine_session";

const SESSION_SCHEMA: &str = "vitrine";
const SESSION_TABLE: &str = "session";

/// Session expiry time in seconds (24 hours).
const SESSION_EXPIRY_SECONDS: i64 = 24 * 60 * 60;

/// The session store could not be configured.
#[derive(Debug, Error)]
#[error("invalid session store identifier: {0}")]
pub struct SessionLayerError(String);

/// Create the session layer with a `PostgreSQL` store.
///
/// The session table is created by migration, not at start-up.
///
/// # Errors
///
/// Returns `SessionLayerError` if the schema or table name is rejected.
pub fn create_session_layer(
    pool: &PgPool,
    config: &AdminConfig,
) -> Result<SessionManagerLayer<PostgresStore>, SessionLayerError> {
    let store = PostgresStore::new(pool.clone())
        .with_schema_name(SESSION_SCHEMA)
        .map_err(|e| SessionLayerError(e.to_string()))?
        .with_table_name(SESSION_TABLE)
        .map_err(|e| SessionLayerError(e.to_string()))?;

    Ok(SessionManagerLayer::new(store)
        .with_name(SESSION_COOKIE_NAME)
        .with_expiry(Expiry::OnInactivity(
            tower_sessions::cookie::time::Duration::seconds(SESSION_EXPIRY_SECONDS),
        ))
        .with_secure(config.secure_cookies())
        .with_same_site(tower_sessions::cookie::SameSite::Strict)
        .with_http_only(true)
        .with_path("/"))
}
