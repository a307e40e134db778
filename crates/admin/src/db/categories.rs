//! Store category repository.
//!
//! Hierarchy rules (no cycles, one level of nesting) are checked by
//! `services::catalog` before writes reach this layer.

use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use vitrine_core::{CategoryId, StoreId};

use super::RepositoryError;
use crate::models::ProductCategory;

const CATEGORY_COLUMNS: &str =
    "id, store_id, name, parent_id, is_active, thumbnail_url, created_at";

#[derive(Debug, sqlx::FromRow)]
struct CategoryRow {
    id: Uuid,
    store_id: Uuid,
    name: String,
    parent_id: Option<Uuid>,
    is_active: bool,
    thumbnail_url: Option<String>,
    created_at: DateTime<Utc>,
}

impl From<CategoryRow> for ProductCategory {
    fn from(row: CategoryRow) -> Self {
        Self {
            id: CategoryId::new(row.id),
            store_id: StoreId::new(row.store_id),
            name: row.name,
            parent_id: row.parent_id.map(CategoryId::new),
            is_active: row.is_active,
            thumbnail_url: row.thumbnail_url,
            created_at: row.created_at,
        }
    }
}

/// Fields written on create and update.
#[derive(Debug, Clone)]
pub struct CategoryFields {
    pub name: String,
    pub parent_id: Option<CategoryId>,
    pub is_active: bool,
    pub thumbnail_url: Option<String>,
}

/// Repository for store categories.
pub struct CategoryRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> CategoryRepository<'a> {
    /// Create a new category repository.
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// All of a store's categories in creation order.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn list(&self, store: StoreId) -> Result<Vec<ProductCategory>, RepositoryError> {
        let rows = sqlx::query_as::<_, CategoryRow>(&format!(
            "SELECT {CATEGORY_COLUMNS} FROM vitrine.product_category \
             WHERE store_id = $1 ORDER BY created_at, name"
        ))
        .bind(store.as_uuid())
        .fetch_all(self.pool)
        .await?;

        Ok(rows.into_iter().map(Into::into).collect())
    }

    /// Create a category.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the insert fails.
    pub async fn create(
        &self,
        store: StoreId,
        fields: &CategoryFields,
    ) -> Result<ProductCategory, RepositoryError> {
        let row = sqlx::query_as::<_, CategoryRow>(&format!(
            r"
            INSERT INTO vitrine.product_category
                (id, store_id, name, parent_id, is_active, thumbnail_url)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING {CATEGORY_COLUMNS}
            "
        ))
        .bind(CategoryId::generate().as_uuid())
        .bind(store.as_uuid())
        .bind(&fields.name)
        .bind(fields.parent_id.map(|p| p.as_uuid()))
        .bind(fields.is_active)
        .bind(fields.thumbnail_url.as_deref())
        .fetch_one(self.pool)
        .await?;

        Ok(row.into())
    }

    /// Update a category within `store`.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if no such category exists in the store.
    pub async fn update(
        &self,
        store: StoreId,
        id: CategoryId,
        fields: &CategoryFields,
    ) -> Result<ProductCategory, RepositoryError> {
        let row = sqlx::query_as::<_, CategoryRow>(&format!(
            r"
            UPDATE vitrine.product_category
            SET name = $3, parent_id = $4, is_active = $5, thumbnail_url = $6
            WHERE id = $1 AND store_id = $2
            RETURNING {CATEGORY_COLUMNS}
            "
        ))
        .bind(id.as_uuid())
        .bind(store.as_uuid())
        .bind(&fields.name)
        .bind(fields.parent_id.map(|p| p.as_uuid()))
        .bind(fields.is_active)
        .bind(fields.thumbnail_url.as_deref())
        .fetch_optional(self.pool)
        .await?
        .ok_or(RepositoryError::NotFound)?;

        Ok(row.into())
    }

    /// Delete a category. Children become roots; products lose the category.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if no such category exists in the store.
    pub async fn delete(&self, store: StoreId, id: CategoryId) -> Result<(), RepositoryError> {
        let result =
            sqlx::query("DELETE FROM vitrine.product_category WHERE id = $1 AND store_id = $2")
                .bind(id.as_uuid())
                .bind(store.as_uuid())
                .execute(self.pool)
                .await?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }
        Ok(())
    }
}
