//! Database operations for the dashboard.
//!
//! # Schema: `vitrine`
//!
//! ## Tables
//!
//! - `owner_profile` - Store owners and their credit balance
//! - `store` - Stores (unique `slug`), optional hashed admin credentials
//! - `attribute` - Custom per-store attributes (unique per store)
//! - `product_category` - Store categories with optional `parent_id`
//! - `product` / `product_variant` - Catalog; variants keyed by `combination` JSONB
//! - `theme_developer` / `theme` - Theme marketplace
//! - `theme_category` / `theme_product` - Theme preview mock data
//! - `session` - tower-sessions storage
//!
//! Child tables cascade from their parent row, so deleting a store or a theme
//! removes everything beneath it.
//!
//! # Migrations
//!
//! Migrations are stored in `crates/admin/migrations/` and run via:
//! ```bash
//! cargo run -p vitrine-cli -- migrate
//! ```
//!
//! Queries are checked at runtime (`query_as::<_, Row>`) so the workspace
//! builds without a live database.

pub mod attributes;
pub mod categories;
pub mod owners;
pub mod products;
pub mod stores;
pub mod themes;

use std::time::Duration;

use secrecy::ExposeSecret;
use sqlx::PgPool;
use sqlx::postgres::PgPoolOptions;
use thiserror::Error;

pub use attributes::AttributeRepository;
pub use categories::CategoryRepository;
pub use owners::OwnerRepository;
pub use products::ProductRepository;
pub use stores::{PgStoreLedger, StoreRepository};
pub use themes::ThemeRepository;

/// Errors that can occur during repository operations.
#[derive(Debug, Error)]
pub enum RepositoryError {
    /// Database error from sqlx.
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Data in the database is corrupted or invalid.
    #[error("data corruption: {0}")]
    DataCorruption(String),

    /// Requested entity was not found.
    #[error("not found")]
    NotFound,

    /// Constraint violation (e.g., unique slug).
    #[error("constraint violation: {0}")]
    Conflict(String),
}

impl RepositoryError {
    /// Map a sqlx error, turning unique violations into `Conflict(message)`.
    pub(crate) fn from_write(err: sqlx::Error, message: &str) -> Self {
        if let sqlx::Error::Database(ref db_err) = err
            && db_err.is_unique_violation()
        {
            return Self::Conflict(message.to_owned());
        }
        Self::Database(err)
    }
}

/// Create a `PostgreSQL` connection pool with sensible defaults.
///
/// # Errors
///
/// Returns `sqlx::Error` if the connection cannot be established.
pub async fn create_pool(database_url: &secrecy::SecretString) -> Result<PgPool, sqlx::Error> {
    PgPoolOptions::new()
        .max_connections(10)
        .min_connections(2)
        .acquire_timeout(Duration::from_secs(10))
        .connect(database_url.expose_secret())
        .await
}
