//! Custom attribute repository.

use chrono::{DateTime, Utc};
use sqlx::{PgConnection, PgPool};
use uuid::Uuid;

use vitrine_core::{AttributeId, StoreId};

use super::RepositoryError;
use crate::models::Attribute;

#[derive(Debug, sqlx::FromRow)]
struct AttributeRow {
    id: Uuid,
    store_id: Uuid,
    name: String,
    created_at: DateTime<Utc>,
}

impl From<AttributeRow> for Attribute {
    fn from(row: AttributeRow) -> Self {
        Self {
            id: AttributeId::new(row.id),
            store_id: StoreId::new(row.store_id),
            name: row.name,
            created_at: row.created_at,
        }
    }
}

/// Repository for store-defined attributes.
pub struct AttributeRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> AttributeRepository<'a> {
    /// Create a new attribute repository.
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// List a store's custom attributes by name.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn list(&self, store: StoreId) -> Result<Vec<Attribute>, RepositoryError> {
        let rows = sqlx::query_as::<_, AttributeRow>(
            r"
            SELECT id, store_id, name, created_at
            FROM vitrine.attribute
            WHERE store_id = $1
            ORDER BY name
            ",
        )
        .bind(store.as_uuid())
        .fetch_all(self.pool)
        .await?;

        Ok(rows.into_iter().map(Into::into).collect())
    }

    /// Create one attribute.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Conflict` if the store already has it.
    pub async fn create(&self, store: StoreId, name: &str) -> Result<Attribute, RepositoryError> {
        let row = sqlx::query_as::<_, AttributeRow>(
            r"
            INSERT INTO vitrine.attribute (id, store_id, name)
            VALUES ($1, $2, $3)
            RETURNING id, store_id, name, created_at
            ",
        )
        .bind(AttributeId::generate().as_uuid())
        .bind(store.as_uuid())
        .bind(name)
        .fetch_one(self.pool)
        .await
        .map_err(|e| RepositoryError::from_write(e, "attribute already exists"))?;

        Ok(row.into())
    }
}

/// Insert any of `names` the store does not have yet, on `conn`.
///
/// Runs on the caller's connection so product saves can create attributes in
/// their own transaction. Returns how many were created.
///
/// # Errors
///
/// Returns `RepositoryError::Database` if the insert fails.
pub async fn insert_missing(
    conn: &mut PgConnection,
    store: StoreId,
    names: &[String],
) -> Result<u64, RepositoryError> {
    if names.is_empty() {
        return Ok(0);
    }
    let ids: Vec<Uuid> = names
        .iter()
        .map(|_| AttributeId::generate().as_uuid())
        .collect();

    let result = sqlx::query(
        r"
        INSERT INTO vitrine.attribute (id, store_id, name)
        SELECT id, $1, name FROM UNNEST($2::uuid[], $3::text[]) AS t(id, name)
        ON CONFLICT (store_id, name) DO NOTHING
        ",
    )
    .bind(store.as_uuid())
    .bind(&ids)
    .bind(names)
    .execute(conn)
    .await?;

    Ok(result.rows_affected())
}
