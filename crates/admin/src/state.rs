//! Application state shared across handlers.

use std::sync::Arc;

use sqlx::PgPool;
use thiserror::Error;

use crate::config::AdminConfig;
use crate::services::identity::{IdentityClient, IdentityError};
use crate::storage::{Storage, StorageError};

/// Errors building the application state.
#[derive(Debug, Error)]
pub enum StateError {
    #[error("identity client: {0}")]
    Identity(#[from] IdentityError),

    #[error("storage backend: {0}")]
    Storage(#[from] StorageError),
}

/// Application state shared across all handlers.
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    config: AdminConfig,
    pool: PgPool,
    storage: Storage,
    identity: IdentityClient,
}

impl AppState {
    /// Build state from configuration and a connected pool.
    ///
    /// # Errors
    ///
    /// Returns `StateError` if the identity or storage client cannot be built.
    pub fn new(config: AdminConfig, pool: PgPool) -> Result<Self, StateError> {
        let storage = Storage::from_config(&config.storage)?;
        let identity = IdentityClient::new(&config.identity)?;
        Ok(Self::from_parts(config, pool, storage, identity))
    }

    /// Assemble state from already built parts.
    #[must_use]
    pub fn from_parts(
        config: AdminConfig,
        pool: PgPool,
        storage: Storage,
        identity: IdentityClient,
    ) -> Self {
        Self {
            inner: Arc::new(AppStateInner {
                config,
                pool,
                storage,
                identity,
            }),
        }
    }

    #[must_use]
    pub fn config(&self) -> &AdminConfig {
        &self.inner.config
    }

    #[must_use]
    pub fn pool(&self) -> &PgPool {
        &self.inner.pool
    }

    #[must_use]
    pub fn storage(&self) -> &Storage {
        &self.inner.storage
    }

    #[must_use]
    pub fn identity(&self) -> &IdentityClient {
        &self.inner.identity
    }

    /// Bucket for product, variant and category images.
    #[must_use]
    pub fn product_bucket(&self) -> &str {
        &self.inner.config.storage.product_bucket
    }

    /// Bucket for theme previews and mock images.
    #[must_use]
    pub fn theme_bucket(&self) -> &str {
        &self.inner.config.storage.theme_bucket
    }
}
