//! Product and variant repository.
//!
//! A product's variant set is always written together with the product row in
//! one transaction. Updates diff the stored variants against the desired set
//! (see [`plan_variant_sync`]) so unchanged combinations keep their ids and a
//! failure part-way leaves the previous set intact.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::types::Json;
use sqlx::{PgPool, Postgres, Transaction};
use tracing::instrument;
use uuid::Uuid;

use vitrine_core::catalog::{Combination, VariantDraft, plan_variant_sync, total_quantity};
use vitrine_core::{CategoryId, ProductId, StoreId, VariantId, VariantPrice};

use super::RepositoryError;
use super::attributes::insert_missing;
use crate::models::{Product, ProductVariant, ProductWithVariants};

const PRODUCT_COLUMNS: &str = "id, store_id, category_id, name, description, images, \
     base_price, quantity, is_active, created_at, updated_at";

const VARIANT_COLUMNS: &str =
    "id, product_id, combination, use_base_price, price, quantity, images, is_active";

// =============================================================================
// Internal Row Types
// =============================================================================

#[derive(Debug, sqlx::FromRow)]
struct ProductRow {
    id: Uuid,
    store_id: Uuid,
    category_id: Option<Uuid>,
    name: String,
    description: String,
    images: Vec<String>,
    base_price: Decimal,
    quantity: i64,
    is_active: bool,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl From<ProductRow> for Product {
    fn from(row: ProductRow) -> Self {
        Self {
            id: ProductId::new(row.id),
            store_id: StoreId::new(row.store_id),
            category_id: row.category_id.map(CategoryId::new),
            name: row.name,
            description: row.description,
            images: row.images,
            base_price: row.base_price,
            quantity: row.quantity,
            is_active: row.is_active,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

#[derive(Debug, sqlx::FromRow)]
struct VariantRow {
    id: Uuid,
    product_id: Uuid,
    combination: Json<Combination>,
    use_base_price: bool,
    price: Option<Decimal>,
    quantity: i32,
    images: Vec<String>,
    is_active: bool,
}

impl From<VariantRow> for ProductVariant {
    fn from(row: VariantRow) -> Self {
        Self {
            id: VariantId::new(row.id),
            product_id: ProductId::new(row.product_id),
            combination: row.combination.0,
            price: VariantPrice::from_columns(row.use_base_price, row.price),
            quantity: row.quantity,
            images: row.images,
            is_active: row.is_active,
        }
    }
}

/// Product fields written on create and update.
#[derive(Debug, Clone)]
pub struct ProductFields {
    pub category_id: Option<CategoryId>,
    pub name: String,
    pub description: String,
    pub images: Vec<String>,
    pub base_price: Decimal,
    pub is_active: bool,
}

// =============================================================================
// Repository
// =============================================================================

/// Repository for products and their variants.
pub struct ProductRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> ProductRepository<'a> {
    /// Create a new product repository.
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// A store's products, newest first.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn list(&self, store: StoreId) -> Result<Vec<Product>, RepositoryError> {
        let rows = sqlx::query_as::<_, ProductRow>(&format!(
            "SELECT {PRODUCT_COLUMNS} FROM vitrine.product \
             WHERE store_id = $1 ORDER BY created_at DESC"
        ))
        .bind(store.as_uuid())
        .fetch_all(self.pool)
        .await?;

        Ok(rows.into_iter().map(Into::into).collect())
    }

    /// A product of `store` with its variants.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if a query fails.
    pub async fn get(
        &self,
        store: StoreId,
        id: ProductId,
    ) -> Result<Option<ProductWithVariants>, RepositoryError> {
        let row = sqlx::query_as::<_, ProductRow>(&format!(
            "SELECT {PRODUCT_COLUMNS} FROM vitrine.product WHERE id = $1 AND store_id = $2"
        ))
        .bind(id.as_uuid())
        .bind(store.as_uuid())
        .fetch_optional(self.pool)
        .await?;

        let Some(row) = row else {
            return Ok(None);
        };
        let variants = self.variants(id).await?;

        Ok(Some(ProductWithVariants {
            product: row.into(),
            variants,
        }))
    }

    /// A product's variants in display order.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn variants(&self, product: ProductId) -> Result<Vec<ProductVariant>, RepositoryError> {
        let rows = sqlx::query_as::<_, VariantRow>(&format!(
            "SELECT {VARIANT_COLUMNS} FROM vitrine.product_variant \
             WHERE product_id = $1 ORDER BY position, created_at"
        ))
        .bind(product.as_uuid())
        .fetch_all(self.pool)
        .await?;

        Ok(rows.into_iter().map(Into::into).collect())
    }

    /// Insert a product with its variants in one transaction.
    ///
    /// `new_attributes` are store attributes first used by this product; they
    /// are created in the same transaction. `drafts` must already be
    /// validated.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if any write fails; nothing is kept.
    #[instrument(skip(self, fields, drafts), fields(variants = drafts.len()))]
    pub async fn create(
        &self,
        store: StoreId,
        fields: &ProductFields,
        new_attributes: &[String],
        drafts: &[VariantDraft],
    ) -> Result<ProductWithVariants, RepositoryError> {
        let mut tx = self.pool.begin().await?;
        create_attributes(&mut tx, store, new_attributes).await?;
        let id = ProductId::generate();

        let row = sqlx::query_as::<_, ProductRow>(&format!(
            r"
            INSERT INTO vitrine.product
                (id, store_id, category_id, name, description, images, base_price, quantity, is_active)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            RETURNING {PRODUCT_COLUMNS}
            "
        ))
        .bind(id.as_uuid())
        .bind(store.as_uuid())
        .bind(fields.category_id.map(|c| c.as_uuid()))
        .bind(&fields.name)
        .bind(&fields.description)
        .bind(&fields.images)
        .bind(fields.base_price)
        .bind(total_quantity(drafts))
        .bind(fields.is_active)
        .fetch_one(&mut *tx)
        .await?;

        let mut variants = Vec::with_capacity(drafts.len());
        for (position, draft) in drafts.iter().enumerate() {
            variants.push(insert_variant(&mut tx, id, draft, position).await?);
        }

        tx.commit().await?;

        Ok(ProductWithVariants {
            product: row.into(),
            variants,
        })
    }

    /// Update a product and reconcile its variants in one transaction.
    ///
    /// Variants whose combination is still wanted are updated in place, new
    /// combinations are inserted and the rest are deleted. The product's
    /// quantity is recomputed from the new set. `new_attributes` are created
    /// in the same transaction. `drafts` must already be validated.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the product is not in `store`.
    /// Returns `RepositoryError::Database` if any write fails; nothing is kept.
    #[instrument(skip(self, fields, drafts), fields(variants = drafts.len()))]
    pub async fn update(
        &self,
        store: StoreId,
        id: ProductId,
        fields: &ProductFields,
        new_attributes: &[String],
        drafts: Vec<VariantDraft>,
    ) -> Result<ProductWithVariants, RepositoryError> {
        let mut tx = self.pool.begin().await?;
        create_attributes(&mut tx, store, new_attributes).await?;

        let row = sqlx::query_as::<_, ProductRow>(&format!(
            r"
            UPDATE vitrine.product
            SET category_id = $3, name = $4, description = $5, images = $6,
                base_price = $7, quantity = $8, is_active = $9, updated_at = now()
            WHERE id = $1 AND store_id = $2
            RETURNING {PRODUCT_COLUMNS}
            "
        ))
        .bind(id.as_uuid())
        .bind(store.as_uuid())
        .bind(fields.category_id.map(|c| c.as_uuid()))
        .bind(&fields.name)
        .bind(&fields.description)
        .bind(&fields.images)
        .bind(fields.base_price)
        .bind(total_quantity(&drafts))
        .bind(fields.is_active)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or(RepositoryError::NotFound)?;

        let existing: Vec<(Uuid, Json<Combination>)> = sqlx::query_as(
            "SELECT id, combination FROM vitrine.product_variant WHERE product_id = $1 FOR UPDATE",
        )
        .bind(id.as_uuid())
        .fetch_all(&mut *tx)
        .await?;
        let existing: Vec<(VariantId, Combination)> = existing
            .into_iter()
            .map(|(vid, combination)| (VariantId::new(vid), combination.0))
            .collect();

        let order: Vec<Combination> = drafts.iter().map(|d| d.combination.clone()).collect();
        let position_of = |c: &Combination| order.iter().position(|o| o == c).unwrap_or(0);

        let plan = plan_variant_sync(&existing, drafts);
        tracing::debug!(
            product_id = %id,
            updates = plan.updates.len(),
            inserts = plan.inserts.len(),
            deletes = plan.deletes.len(),
            "Syncing variants"
        );

        if !plan.deletes.is_empty() {
            let ids: Vec<Uuid> = plan.deletes.iter().map(VariantId::as_uuid).collect();
            sqlx::query("DELETE FROM vitrine.product_variant WHERE id = ANY($1)")
                .bind(&ids)
                .execute(&mut *tx)
                .await?;
        }

        for (variant_id, draft) in &plan.updates {
            let (use_base_price, price) = draft.price.to_columns();
            sqlx::query(
                r"
                UPDATE vitrine.product_variant
                SET combination = $2, use_base_price = $3, price = $4, quantity = $5,
                    images = $6, is_active = $7, position = $8
                WHERE id = $1
                ",
            )
            .bind(variant_id.as_uuid())
            .bind(Json(&draft.combination))
            .bind(use_base_price)
            .bind(price)
            .bind(draft.quantity)
            .bind(&draft.images)
            .bind(draft.is_active)
            .bind(position_column(position_of(&draft.combination)))
            .execute(&mut *tx)
            .await?;
        }

        for draft in &plan.inserts {
            insert_variant(&mut tx, id, draft, position_of(&draft.combination)).await?;
        }

        let variants = sqlx::query_as::<_, VariantRow>(&format!(
            "SELECT {VARIANT_COLUMNS} FROM vitrine.product_variant \
             WHERE product_id = $1 ORDER BY position, created_at"
        ))
        .bind(id.as_uuid())
        .fetch_all(&mut *tx)
        .await?;

        tx.commit().await?;

        Ok(ProductWithVariants {
            product: row.into(),
            variants: variants.into_iter().map(Into::into).collect(),
        })
    }

    /// Image URLs referenced anywhere in `store` outside product `except`.
    ///
    /// Covers other products, their variants and category thumbnails.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn image_urls_in_use(
        &self,
        store: StoreId,
        except: ProductId,
    ) -> Result<Vec<String>, RepositoryError> {
        let urls = sqlx::query_scalar::<_, String>(
            r"
            SELECT unnest(images) FROM vitrine.product
            WHERE store_id = $1 AND id <> $2
            UNION
            SELECT unnest(v.images) FROM vitrine.product_variant v
            JOIN vitrine.product p ON p.id = v.product_id
            WHERE p.store_id = $1 AND p.id <> $2
            UNION
            SELECT thumbnail_url FROM vitrine.product_category
            WHERE store_id = $1 AND thumbnail_url IS NOT NULL
            ",
        )
        .bind(store.as_uuid())
        .bind(except.as_uuid())
        .fetch_all(self.pool)
        .await?;

        Ok(urls)
    }

    /// Delete a product; its variants cascade.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the product is not in `store`.
    pub async fn delete(&self, store: StoreId, id: ProductId) -> Result<(), RepositoryError> {
        let result = sqlx::query("DELETE FROM vitrine.product WHERE id = $1 AND store_id = $2")
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

async fn create_attributes(
    tx: &mut Transaction<'_, Postgres>,
    store: StoreId,
    names: &[String],
) -> Result<(), RepositoryError> {
    let created = insert_missing(&mut **tx, store, names).await?;
    if created > 0 {
        tracing::info!(store_id = %store, created, "Created custom attributes on first use");
    }
    Ok(())
}

fn position_column(position: usize) -> i32 {
    i32::try_from(position).unwrap_or(i32::MAX)
}

async fn insert_variant(
    tx: &mut Transaction<'_, Postgres>,
    product: ProductId,
    draft: &VariantDraft,
    position: usize,
) -> Result<ProductVariant, RepositoryError> {
    let (use_base_price, price) = draft.price.to_columns();
    let row = sqlx::query_as::<_, VariantRow>(&format!(
        r"
        INSERT INTO vitrine.product_variant
            (id, product_id, combination, use_base_price, price, quantity, images, is_active, position)
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
        RETURNING {VARIANT_COLUMNS}
        "
    ))
    .bind(VariantId::generate().as_uuid())
    .bind(product.as_uuid())
    .bind(Json(&draft.combination))
    .bind(use_base_price)
    .bind(price)
    .bind(draft.quantity)
    .bind(&draft.images)
    .bind(draft.is_active)
    .bind(position_column(position))
    .fetch_one(&mut **tx)
    .await?;

    Ok(row.into())
}
