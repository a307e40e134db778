//! Store admin access: hashed credentials and the per-session access flag.
//!
//! A store owner may set a username and password for the store's admin
//! area. Passwords are stored as argon2id PHC strings with a per-record salt.
//! A successful login sets a flag in the session for that store id; store
//! sub-pages check the flag instead of prompting again.

use argon2::password_hash::rand_core::OsRng;
use argon2::password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString};
use argon2::Argon2;
use sqlx::PgPool;
use thiserror::Error;
use tower_sessions::Session;
use tracing::instrument;

use vitrine_core::StoreId;

use crate::db::{RepositoryError, StoreRepository};
use crate::models::{Store, StoreAccessGrants, session_keys};

/// Minimum accepted password length.
pub const MIN_PASSWORD_LENGTH: usize = 8;
/// Maximum accepted username length.
pub const MAX_USERNAME_LENGTH: usize = 64;

/// Errors from store access operations.
#[derive(Debug, Error)]
pub enum StoreAccessError {
    #[error("{0}")]
    Validation(String),

    #[error("invalid username or password")]
    InvalidCredentials,

    #[error("password hashing failed: {0}")]
    Hash(String),

    #[error("session error: {0}")]
    Session(#[from] tower_sessions::session::Error),

    #[error(transparent)]
    Repository(#[from] RepositoryError),
}

/// Hash a password with argon2id and a fresh salt.
///
/// # Errors
///
/// Returns `StoreAccessError::Hash` if hashing fails.
pub fn hash_password(password: &str) -> Result<String, StoreAccessError> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|e| StoreAccessError::Hash(e.to_string()))
}

/// Check `password` against a stored PHC string.
///
/// An unparseable hash never verifies.
#[must_use]
pub fn verify_password(password: &str, stored: &str) -> bool {
    let Ok(parsed) = PasswordHash::new(stored) else {
        return false;
    };
    Argon2::default()
        .verify_password(password.as_bytes(), &parsed)
        .is_ok()
}

/// Validate a username/password pair before it is hashed.
///
/// Returns the trimmed username.
///
/// # Errors
///
/// Returns `StoreAccessError::Validation` describing the first problem found.
pub fn validate_credentials(username: &str, password: &str) -> Result<String, StoreAccessError> {
    let username = username.trim();
    if username.is_empty() {
        return Err(StoreAccessError::Validation("username is required".to_owned()));
    }
    if username.chars().count() > MAX_USERNAME_LENGTH {
        return Err(StoreAccessError::Validation(format!(
            "username must be at most {MAX_USERNAME_LENGTH} characters"
        )));
    }
    if password.chars().count() < MIN_PASSWORD_LENGTH {
        return Err(StoreAccessError::Validation(format!(
            "password must be at least {MIN_PASSWORD_LENGTH} characters"
        )));
    }
    Ok(username.to_owned())
}

/// Set (or replace) a store's admin credentials.
///
/// # Errors
///
/// Returns `StoreAccessError::Validation` for a bad username or password.
/// Returns `StoreAccessError::Repository` if the store cannot be updated.
#[instrument(skip(pool, password), fields(store_id = %store))]
pub async fn set_credentials(
    pool: &PgPool,
    store: StoreId,
    username: &str,
    password: &str,
) -> Result<(), StoreAccessError> {
    let username = validate_credentials(username, password)?;
    let hash = hash_password(password)?;
    StoreRepository::new(pool)
        .set_access_credentials(store, &username, &hash)
        .await?;
    tracing::info!(store_id = %store, "Store access credentials updated");
    Ok(())
}

/// Check submitted credentials against the store's stored ones.
///
/// Stores without credentials reject every attempt.
#[must_use]
pub fn credentials_match(
    stored_username: Option<&str>,
    stored_hash: Option<&str>,
    username: &str,
    password: &str,
) -> bool {
    match (stored_username, stored_hash) {
        (Some(expected), Some(hash)) => {
            // Always run the hash check so timing does not reveal the username.
            let password_ok = verify_password(password, hash);
            expected == username.trim() && password_ok
        }
        _ => false,
    }
}

/// Record in the session that `store` was unlocked.
///
/// # Errors
///
/// Returns `StoreAccessError::Session` if the session cannot be written.
pub async fn grant(session: &Session, store: StoreId) -> Result<(), StoreAccessError> {
    let mut grants: StoreAccessGrants = session
        .get(session_keys::STORE_ACCESS)
        .await?
        .unwrap_or_default();
    if !grants.0.contains(&store) {
        grants.0.push(store);
    }
    session.insert(session_keys::STORE_ACCESS, grants).await?;
    Ok(())
}

/// Whether `store` was unlocked in this session.
///
/// # Errors
///
/// Returns `StoreAccessError::Session` if the session cannot be read.
pub async fn has_access(session: &Session, store: StoreId) -> Result<bool, StoreAccessError> {
    let grants: Option<StoreAccessGrants> = session.get(session_keys::STORE_ACCESS).await?;
    Ok(grants.is_some_and(|g| g.0.contains(&store)))
}

/// Check submitted credentials and, on success, unlock the store for this
/// session.
///
/// # Errors
///
/// Returns `StoreAccessError::InvalidCredentials` on a mismatch or when the
/// store has no credentials configured.
#[instrument(skip(session, store, password), fields(store_id = %store.id))]
pub async fn unlock(
    session: &Session,
    store: &Store,
    username: &str,
    password: &str,
) -> Result<(), StoreAccessError> {
    if !credentials_match(
        store.access_username.as_deref(),
        store.access_password_hash.as_deref(),
        username,
        password,
    ) {
        tracing::warn!(store_id = %store.id, "Store admin login failed");
        return Err(StoreAccessError::InvalidCredentials);
    }
    grant(session, store.id).await?;
    tracing::info!(store_id = %store.id, "Store admin access granted");
    Ok(())
}

/// Drop the flag for `store`, e.g. after its credentials change.
///
/// # Errors
///
/// Returns `StoreAccessError::Session` if the session cannot be written.
pub async fn revoke(session: &Session, store: StoreId) -> Result<(), StoreAccessError> {
    let grants: Option<StoreAccessGrants> = session.get(session_keys::STORE_ACCESS).await?;
    if let Some(mut grants) = grants {
        grants.0.retain(|id| *id != store);
        session.insert(session_keys::STORE_ACCESS, grants).await?;
    }
    Ok(())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::sync::Arc;

    use tower_sessions::MemoryStore;

    use super::*;

    fn session() -> Session {
        Session::new(None, Arc::new(MemoryStore::default()), None)
    }

    #[test]
    fn test_hash_and_verify() {
        let hash = hash_password("correct horse").unwrap();
        assert!(hash.starts_with("$argon2id$"));
        assert!(verify_password("correct horse", &hash));
        assert!(!verify_password("wrong horse", &hash));
    }

    #[test]
    fn test_hashes_are_salted() {
        let a = hash_password("same-password").unwrap();
        let b = hash_password("same-password").unwrap();
        assert_ne!(a, b);
    }

    #[test]
    fn test_garbage_hash_never_verifies() {
        assert!(!verify_password("anything", "plaintext"));
    }

    #[test]
    fn test_validate_credentials() {
        assert_eq!(validate_credentials("  manager ", "longenough").unwrap(), "manager");
        assert!(matches!(
            validate_credentials("", "longenough"),
            Err(StoreAccessError::Validation(_))
        ));
        assert!(matches!(
            validate_credentials("manager", "short"),
            Err(StoreAccessError::Validation(_))
        ));
    }

    #[test]
    fn test_credentials_match() {
        let hash = hash_password("open sesame").unwrap();
        assert!(credentials_match(Some("manager"), Some(&hash), "manager", "open sesame"));
        assert!(!credentials_match(Some("manager"), Some(&hash), "Manager", "open sesame"));
        assert!(!credentials_match(Some("manager"), Some(&hash), "manager", "open sesamE"));
        assert!(!credentials_match(None, None, "manager", "open sesame"));
    }

    #[tokio::test]
    async fn test_grant_is_per_store() {
        let session = session();
        let unlocked = StoreId::generate();
        let other = StoreId::generate();

        assert!(!has_access(&session, unlocked).await.unwrap());
        grant(&session, unlocked).await.unwrap();
        grant(&session, unlocked).await.unwrap();

        assert!(has_access(&session, unlocked).await.unwrap());
        assert!(!has_access(&session, other).await.unwrap());

        let grants: StoreAccessGrants = session
            .get(session_keys::STORE_ACCESS)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(grants.0.len(), 1);

        revoke(&session, unlocked).await.unwrap();
        assert!(!has_access(&session, unlocked).await.unwrap());
    }

    fn store_with(username: Option<&str>, hash: Option<String>) -> Store {
        Store {
            id: StoreId::generate(),
            owner_id: vitrine_core::OwnerId::generate(),
            slug: vitrine_core::StoreSlug::parse("corner-shop").unwrap(),
            name: "Corner Shop".to_owned(),
            contact_email: vitrine_core::Email::parse("hi@corner.test").unwrap(),
            access_username: username.map(str::to_owned),
            access_password_hash: hash,
            is_active: true,
            created_at: chrono::Utc::now(),
            updated_at: chrono::Utc::now(),
        }
    }

    #[tokio::test]
    async fn test_unlock_grants_only_on_match() {
        let session = session();
        let store = store_with(Some("manager"), Some(hash_password("open sesame").unwrap()));

        let err = unlock(&session, &store, "manager", "wrong").await.unwrap_err();
        assert!(matches!(err, StoreAccessError::InvalidCredentials));
        assert!(!has_access(&session, store.id).await.unwrap());

        unlock(&session, &store, " manager ", "open sesame").await.unwrap();
        assert!(has_access(&session, store.id).await.unwrap());
    }

    #[tokio::test]
    async fn test_unlock_without_credentials_is_refused() {
        let session = session();
        let store = store_with(None, None);
        assert!(unlock(&session, &store, "", "").await.is_err());
    }
}
