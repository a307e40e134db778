//! Store repository and the Postgres-backed store ledger.

use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use vitrine_core::{Credits, Email, OwnerId, StoreId, StoreSlug};

use super::{OwnerRepository, RepositoryError};
use crate::models::{NewStore, Store};
use crate::services::store_provisioning::StoreLedger;

const STORE_COLUMNS: &str = "id, owner_id, slug, name, contact_email, access_username, \
     access_password_hash, is_active, created_at, updated_at";

// =============================================================================
// Internal Row Types
// =============================================================================

#[derive(Debug, sqlx::FromRow)]
struct StoreRow {
    id: Uuid,
    owner_id: Uuid,
    slug: String,
    name: String,
    contact_email: String,
    access_username: Option<String>,
    access_password_hash: Option<String>,
    is_active: bool,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<StoreRow> for Store {
    type Error = RepositoryError;

    fn try_from(row: StoreRow) -> Result<Self, Self::Error> {
        let slug = StoreSlug::parse(&row.slug).map_err(|e| {
            RepositoryError::DataCorruption(format!("invalid slug in database: {e}"))
        })?;
        let contact_email = Email::parse(&row.contact_email).map_err(|e| {
            RepositoryError::DataCorruption(format!("invalid email in database: {e}"))
        })?;

        Ok(Self {
            id: StoreId::new(row.id),
            owner_id: OwnerId::new(row.owner_id),
            slug,
            name: row.name,
            contact_email,
            access_username: row.access_username,
            access_password_hash: row.access_password_hash,
            is_active: row.is_active,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

/// Editable store fields.
#[derive(Debug, Clone)]
pub struct StoreUpdate {
    pub name: String,
    pub contact_email: Email,
    pub is_active: bool,
}

// =============================================================================
// Repository
// =============================================================================

/// Repository for store rows.
pub struct StoreRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> StoreRepository<'a> {
    /// Create a new store repository.
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// List an owner's stores, newest first.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    /// Returns `RepositoryError::DataCorruption` if a row is invalid.
    pub async fn list_by_owner(&self, owner: OwnerId) -> Result<Vec<Store>, RepositoryError> {
        let rows = sqlx::query_as::<_, StoreRow>(&format!(
            "SELECT {STORE_COLUMNS} FROM vitrine.store WHERE owner_id = $1 ORDER BY created_at DESC"
        ))
        .bind(owner.as_uuid())
        .fetch_all(self.pool)
        .await?;

        rows.into_iter().map(TryInto::try_into).collect()
    }

    /// Get a store by id.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get(&self, id: StoreId) -> Result<Option<Store>, RepositoryError> {
        let row = sqlx::query_as::<_, StoreRow>(&format!(
            "SELECT {STORE_COLUMNS} FROM vitrine.store WHERE id = $1"
        ))
        .bind(id.as_uuid())
        .fetch_optional(self.pool)
        .await?;

        row.map(TryInto::try_into).transpose()
    }

    /// Whether any store uses `slug`.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn slug_exists(&self, slug: &StoreSlug) -> Result<bool, RepositoryError> {
        let exists: bool =
            sqlx::query_scalar("SELECT EXISTS (SELECT 1 FROM vitrine.store WHERE slug = $1)")
                .bind(slug.as_str())
                .fetch_one(self.pool)
                .await?;
        Ok(exists)
    }

    /// Insert a store.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Conflict` if the slug is taken.
    /// Returns `RepositoryError::Database` for other database errors.
    pub async fn insert(&self, store: &NewStore) -> Result<Store, RepositoryError> {
        let row = sqlx::query_as::<_, StoreRow>(&format!(
            r"
            INSERT INTO vitrine.store
                (id, owner_id, slug, name, contact_email, access_username, access_password_hash)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            RETURNING {STORE_COLUMNS}
            "
        ))
        .bind(StoreId::generate().as_uuid())
        .bind(store.owner_id.as_uuid())
        .bind(store.slug.as_str())
        .bind(&store.name)
        .bind(store.contact_email.as_str())
        .bind(store.access_username.as_deref())
        .bind(store.access_password_hash.as_deref())
        .fetch_one(self.pool)
        .await
        .map_err(|e| RepositoryError::from_write(e, "slug already exists"))?;

        row.try_into()
    }

    /// Update name, contact email and active flag.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the store does not exist.
    pub async fn update(&self, id: StoreId, update: &StoreUpdate) -> Result<Store, RepositoryError> {
        let row = sqlx::query_as::<_, StoreRow>(&format!(
            r"
            UPDATE vitrine.store
            SET name = $2, contact_email = $3, is_active = $4, updated_at = now()
            WHERE id = $1
            RETURNING {STORE_COLUMNS}
            "
        ))
        .bind(id.as_uuid())
        .bind(&update.name)
        .bind(update.contact_email.as_str())
        .bind(update.is_active)
        .fetch_optional(self.pool)
        .await?
        .ok_or(RepositoryError::NotFound)?;

        row.try_into()
    }

    /// Replace the store's admin username and password hash.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the store does not exist.
    pub async fn set_access_credentials(
        &self,
        id: StoreId,
        username: &str,
        password_hash: &str,
    ) -> Result<(), RepositoryError> {
        let result = sqlx::query(
            r"
            UPDATE vitrine.store
            SET access_username = $2, access_password_hash = $3, updated_at = now()
            WHERE id = $1
            ",
        )
        .bind(id.as_uuid())
        .bind(username)
        .bind(password_hash)
        .execute(self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }
        Ok(())
    }

    /// Delete a store; its catalog cascades.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the store does not exist.
    pub async fn delete(&self, id: StoreId) -> Result<(), RepositoryError> {
        let result = sqlx::query("DELETE FROM vitrine.store WHERE id = $1")
            .bind(id.as_uuid())
            .execute(self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }
        Ok(())
    }
}

// =============================================================================
// Ledger
// =============================================================================

/// [`StoreLedger`] over the owner profile and store tables.
pub struct PgStoreLedger<'a> {
    pool: &'a PgPool,
}

impl<'a> PgStoreLedger<'a> {
    /// Create a ledger over `pool`.
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }
}

impl StoreLedger for PgStoreLedger<'_> {
    async fn slug_exists(&self, slug: &StoreSlug) -> Result<bool, RepositoryError> {
        StoreRepository::new(self.pool).slug_exists(slug).await
    }

    async fn ensure_owner_profile(&self, owner: OwnerId) -> Result<Credits, RepositoryError> {
        Ok(OwnerRepository::new(self.pool).ensure(owner).await?.credits)
    }

    async fn try_debit(
        &self,
        owner: OwnerId,
        amount: Credits,
    ) -> Result<Option<Credits>, RepositoryError> {
        OwnerRepository::new(self.pool).try_debit(owner, amount).await
    }

    async fn credit(&self, owner: OwnerId, amount: Credits) -> Result<Credits, RepositoryError> {
        OwnerRepository::new(self.pool).credit(owner, amount).await
    }

    async fn insert_store(&self, store: &NewStore) -> Result<Store, RepositoryError> {
        StoreRepository::new(self.pool).insert(store).await
    }
}
