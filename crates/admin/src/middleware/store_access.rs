//! Store-scoped extractors.
//!
//! Both extractors read the `{id}` path segment, load the store and check
//! the signed-in user against it. [`RequireStoreOwner`] admits only the
//! owner; [`RequireStoreAccess`] also admits a session that unlocked the
//! store with its admin credentials.

use axum::{
    extract::{FromRequestParts, Path},
    http::request::Parts,
    response::{IntoResponse, Response},
};
use serde::Deserialize;
use tower_sessions::Session;

use vitrine_core::StoreId;

use super::auth::{AuthRejection, RequireUser};
use crate::db::StoreRepository;
use crate::error::AppError;
use crate::models::{CurrentUser, Store};
use crate::services::store_access;
use crate::state::AppState;

/// The store named by the path, owned by the current user.
pub struct RequireStoreOwner {
    pub user: CurrentUser,
    pub store: Store,
}

/// The store named by the path, owned by or unlocked for the current user.
pub struct RequireStoreAccess {
    pub user: CurrentUser,
    pub store: Store,
}

/// Rejection for the store extractors.
#[derive(Debug)]
pub enum StoreRejection {
    Auth(AuthRejection),
    Denied(AppError),
}

impl IntoResponse for StoreRejection {
    fn into_response(self) -> Response {
        match self {
            Self::Auth(rejection) => rejection.into_response(),
            Self::Denied(err) => err.into_response(),
        }
    }
}

impl From<AppError> for StoreRejection {
    fn from(err: AppError) -> Self {
        Self::Denied(err)
    }
}

#[derive(Deserialize)]
struct StorePath {
    id: StoreId,
}

/// How a user relates to a store.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreRelation {
    Owner,
    Unlocked,
    None,
}

impl StoreRelation {
    /// Work out the relation from ownership and the session flag.
    #[must_use]
    pub fn of(user: &CurrentUser, store: &Store, unlocked: bool) -> Self {
        if store.owner_id == user.id {
            Self::Owner
        } else if unlocked {
            Self::Unlocked
        } else {
            Self::None
        }
    }
}

/// Authenticate, then load the store named by the path.
async fn user_and_store(
    parts: &mut Parts,
    state: &AppState,
) -> Result<(CurrentUser, Store), StoreRejection> {
    let RequireUser(user) = RequireUser::from_request_parts(parts, state)
        .await
        .map_err(StoreRejection::Auth)?;

    let Path(StorePath { id }) = Path::<StorePath>::from_request_parts(parts, state)
        .await
        .map_err(|_| AppError::NotFound)?;

    let store = StoreRepository::new(state.pool())
        .get(id)
        .await
        .map_err(AppError::from)?
        .ok_or(AppError::NotFound)?;

    Ok((user, store))
}

impl FromRequestParts<AppState> for RequireStoreOwner {
    type Rejection = StoreRejection;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let (user, store) = user_and_store(parts, state).await?;
        match StoreRelation::of(&user, &store, false) {
            StoreRelation::Owner => Ok(Self { user, store }),
            _ => {
                tracing::warn!(user_id = %user.id, store_id = %store.id, "Store owner check failed");
                Err(AppError::Forbidden.into())
            }
        }
    }
}

impl FromRequestParts<AppState> for RequireStoreAccess {
    type Rejection = StoreRejection;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let (user, store) = user_and_store(parts, state).await?;

        let unlocked = match parts.extensions.get::<Session>() {
            Some(session) if store.owner_id != user.id => {
                store_access::has_access(session, store.id)
                    .await
                    .map_err(AppError::from)?
            }
            _ => false,
        };

        match StoreRelation::of(&user, &store, unlocked) {
            StoreRelation::Owner | StoreRelation::Unlocked => Ok(Self { user, store }),
            StoreRelation::None => {
                tracing::warn!(user_id = %user.id, store_id = %store.id, "Store access denied");
                Err(AppError::Forbidden.into())
            }
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use chrono::Utc;
    use vitrine_core::{Email, OwnerId, StoreSlug};

    use super::*;

    fn user(id: OwnerId) -> CurrentUser {
        CurrentUser {
            id,
            email: None,
            display_name: "Someone".to_owned(),
        }
    }

    fn store(owner: OwnerId) -> Store {
        Store {
            id: StoreId::generate(),
            owner_id: owner,
            slug: StoreSlug::parse("corner-shop").unwrap(),
            name: "Corner Shop".to_owned(),
            contact_email: Email::parse("hi@corner.test").unwrap(),
            access_username: None,
            access_password_hash: None,
            is_active: true,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn test_owner_needs_no_flag() {
        let owner = OwnerId::generate();
        assert_eq!(
            StoreRelation::of(&user(owner), &store(owner), false),
            StoreRelation::Owner
        );
    }

    #[test]
    fn test_other_user_needs_flag() {
        let shop = store(OwnerId::generate());
        let visitor = user(OwnerId::generate());
        assert_eq!(StoreRelation::of(&visitor, &shop, false), StoreRelation::None);
        assert_eq!(StoreRelation::of(&visitor, &shop, true), StoreRelation::Unlocked);
    }
}
