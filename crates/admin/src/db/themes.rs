//! Theme marketplace repository: developers, themes and preview mock data.
//!
//! Every theme query is scoped by developer id so one developer can never
//! read or change another's themes.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::types::Json;
use sqlx::PgPool;
use tracing::instrument;
use uuid::Uuid;

use vitrine_core::theme::MockSettings;
use vitrine_core::{ThemeCategoryId, ThemeDeveloperId, ThemeId, ThemeProductId, ThemeStatus};

use super::RepositoryError;
use crate::models::{Theme, ThemeCategory, ThemeDeveloper, ThemeProduct};

const THEME_COLUMNS: &str = "id, developer_id, name, description, price, preview_image_url, \
     status, settings, created_at, updated_at";
const MOCK_CATEGORY_COLUMNS: &str = "id, theme_id, name, parent_id, is_active";
const MOCK_PRODUCT_COLUMNS: &str =
    "id, theme_id, category_id, name, description, images, price, is_active";

// =============================================================================
// Internal Row Types
// =============================================================================

#[derive(Debug, sqlx::FromRow)]
struct DeveloperRow {
    id: Uuid,
    display_name: String,
    website: Option<String>,
    created_at: DateTime<Utc>,
}

impl From<DeveloperRow> for ThemeDeveloper {
    fn from(row: DeveloperRow) -> Self {
        Self {
            id: ThemeDeveloperId::new(row.id),
            display_name: row.display_name,
            website: row.website,
            created_at: row.created_at,
        }
    }
}

#[derive(Debug, sqlx::FromRow)]
struct ThemeRow {
    id: Uuid,
    developer_id: Uuid,
    name: String,
    description: String,
    price: Decimal,
    preview_image_url: Option<String>,
    status: ThemeStatus,
    settings: Json<serde_json::Value>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<ThemeRow> for Theme {
    type Error = RepositoryError;

    fn try_from(row: ThemeRow) -> Result<Self, Self::Error> {
        let settings: MockSettings = serde_json::from_value(row.settings.0).map_err(|e| {
            RepositoryError::DataCorruption(format!("invalid theme settings: {e}"))
        })?;

        Ok(Self {
            id: ThemeId::new(row.id),
            developer_id: ThemeDeveloperId::new(row.developer_id),
            name: row.name,
            description: row.description,
            price: row.price,
            preview_image_url: row.preview_image_url,
            status: row.status,
            settings,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

#[derive(Debug, sqlx::FromRow)]
struct MockCategoryRow {
    id: Uuid,
    theme_id: Uuid,
    name: String,
    parent_id: Option<Uuid>,
    is_active: bool,
}

impl From<MockCategoryRow> for ThemeCategory {
    fn from(row: MockCategoryRow) -> Self {
        Self {
            id: ThemeCategoryId::new(row.id),
            theme_id: ThemeId::new(row.theme_id),
            name: row.name,
            parent_id: row.parent_id.map(ThemeCategoryId::new),
            is_active: row.is_active,
        }
    }
}

#[derive(Debug, sqlx::FromRow)]
struct MockProductRow {
    id: Uuid,
    theme_id: Uuid,
    category_id: Option<Uuid>,
    name: String,
    description: String,
    images: Vec<String>,
    price: Decimal,
    is_active: bool,
}

impl From<MockProductRow> for ThemeProduct {
    fn from(row: MockProductRow) -> Self {
        Self {
            id: ThemeProductId::new(row.id),
            theme_id: ThemeId::new(row.theme_id),
            category_id: row.category_id.map(ThemeCategoryId::new),
            name: row.name,
            description: row.description,
            images: row.images,
            price: row.price,
            is_active: row.is_active,
        }
    }
}

// =============================================================================
// Field Types
// =============================================================================

/// Editable theme listing fields.
#[derive(Debug, Clone)]
pub struct ThemeFields {
    pub name: String,
    pub description: String,
    pub price: Decimal,
    pub preview_image_url: Option<String>,
}

/// Fields of a mock category.
#[derive(Debug, Clone)]
pub struct MockCategoryFields {
    pub name: String,
    pub parent_id: Option<ThemeCategoryId>,
    pub is_active: bool,
}

/// Fields of a mock product.
#[derive(Debug, Clone)]
pub struct MockProductFields {
    pub category_id: Option<ThemeCategoryId>,
    pub name: String,
    pub description: String,
    pub images: Vec<String>,
    pub price: Decimal,
    pub is_active: bool,
}

// =============================================================================
// Repository
// =============================================================================

/// Repository for the theme marketplace tables.
pub struct ThemeRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> ThemeRepository<'a> {
    /// Create a new theme repository.
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    // -------------------------------------------------------------------------
    // Developers
    // -------------------------------------------------------------------------

    /// Get a developer profile.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get_developer(
        &self,
        id: ThemeDeveloperId,
    ) -> Result<Option<ThemeDeveloper>, RepositoryError> {
        let row = sqlx::query_as::<_, DeveloperRow>(
            "SELECT id, display_name, website, created_at FROM vitrine.theme_developer WHERE id = $1",
        )
        .bind(id.as_uuid())
        .fetch_optional(self.pool)
        .await?;

        Ok(row.map(Into::into))
    }

    /// Create or update a developer profile.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the write fails.
    pub async fn upsert_developer(
        &self,
        id: ThemeDeveloperId,
        display_name: &str,
        website: Option<&str>,
    ) -> Result<ThemeDeveloper, RepositoryError> {
        let row = sqlx::query_as::<_, DeveloperRow>(
            r"
            INSERT INTO vitrine.theme_developer (id, display_name, website)
            VALUES ($1, $2, $3)
            ON CONFLICT (id) DO UPDATE
                SET display_name = EXCLUDED.display_name, website = EXCLUDED.website
            RETURNING id, display_name, website, created_at
            ",
        )
        .bind(id.as_uuid())
        .bind(display_name)
        .bind(website)
        .fetch_one(self.pool)
        .await?;

        Ok(row.into())
    }

    // -------------------------------------------------------------------------
    // Themes
    // -------------------------------------------------------------------------

    /// A developer's themes, most recently updated first.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn list_themes(
        &self,
        developer: ThemeDeveloperId,
    ) -> Result<Vec<Theme>, RepositoryError> {
        let rows = sqlx::query_as::<_, ThemeRow>(&format!(
            "SELECT {THEME_COLUMNS} FROM vitrine.theme \
             WHERE developer_id = $1 ORDER BY updated_at DESC"
        ))
        .bind(developer.as_uuid())
        .fetch_all(self.pool)
        .await?;

        rows.into_iter().map(TryInto::try_into).collect()
    }

    /// Get any theme by id, regardless of developer.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn find_theme(&self, id: ThemeId) -> Result<Option<Theme>, RepositoryError> {
        let row = sqlx::query_as::<_, ThemeRow>(&format!(
            "SELECT {THEME_COLUMNS} FROM vitrine.theme WHERE id = $1"
        ))
        .bind(id.as_uuid())
        .fetch_optional(self.pool)
        .await?;

        row.map(TryInto::try_into).transpose()
    }

    /// Get one of a developer's themes.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get_theme(
        &self,
        developer: ThemeDeveloperId,
        id: ThemeId,
    ) -> Result<Option<Theme>, RepositoryError> {
        let row = sqlx::query_as::<_, ThemeRow>(&format!(
            "SELECT {THEME_COLUMNS} FROM vitrine.theme WHERE id = $1 AND developer_id = $2"
        ))
        .bind(id.as_uuid())
        .bind(developer.as_uuid())
        .fetch_optional(self.pool)
        .await?;

        row.map(TryInto::try_into).transpose()
    }

    /// Create a draft theme with default mock settings.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the insert fails.
    pub async fn create_theme(
        &self,
        developer: ThemeDeveloperId,
        fields: &ThemeFields,
    ) -> Result<Theme, RepositoryError> {
        let settings = serde_json::to_value(MockSettings::default()).map_err(|e| {
            RepositoryError::DataCorruption(format!("cannot encode theme settings: {e}"))
        })?;

        let row = sqlx::query_as::<_, ThemeRow>(&format!(
            r"
            INSERT INTO vitrine.theme
                (id, developer_id, name, description, price, preview_image_url, settings)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            RETURNING {THEME_COLUMNS}
            "
        ))
        .bind(ThemeId::generate().as_uuid())
        .bind(developer.as_uuid())
        .bind(&fields.name)
        .bind(&fields.description)
        .bind(fields.price)
        .bind(fields.preview_image_url.as_deref())
        .bind(Json(settings))
        .fetch_one(self.pool)
        .await?;

        row.try_into()
    }

    /// Update a theme's listing fields.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the developer has no such theme.
    pub async fn update_theme(
        &self,
        developer: ThemeDeveloperId,
        id: ThemeId,
        fields: &ThemeFields,
    ) -> Result<Theme, RepositoryError> {
        let row = sqlx::query_as::<_, ThemeRow>(&format!(
            r"
            UPDATE vitrine.theme
            SET name = $3, description = $4, price = $5, preview_image_url = $6,
                updated_at = now()
            WHERE id = $1 AND developer_id = $2
            RETURNING {THEME_COLUMNS}
            "
        ))
        .bind(id.as_uuid())
        .bind(developer.as_uuid())
        .bind(&fields.name)
        .bind(&fields.description)
        .bind(fields.price)
        .bind(fields.preview_image_url.as_deref())
        .fetch_optional(self.pool)
        .await?
        .ok_or(RepositoryError::NotFound)?;

        row.try_into()
    }

    /// Change a theme's publication status.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the developer has no such theme.
    pub async fn set_status(
        &self,
        developer: ThemeDeveloperId,
        id: ThemeId,
        status: ThemeStatus,
    ) -> Result<Theme, RepositoryError> {
        let row = sqlx::query_as::<_, ThemeRow>(&format!(
            r"
            UPDATE vitrine.theme
            SET status = $3, updated_at = now()
            WHERE id = $1 AND developer_id = $2
            RETURNING {THEME_COLUMNS}
            "
        ))
        .bind(id.as_uuid())
        .bind(developer.as_uuid())
        .bind(status)
        .fetch_optional(self.pool)
        .await?
        .ok_or(RepositoryError::NotFound)?;

        row.try_into()
    }

    /// Replace a theme's mock settings.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the theme does not exist.
    pub async fn update_settings(
        &self,
        id: ThemeId,
        settings: &MockSettings,
    ) -> Result<(), RepositoryError> {
        let result = sqlx::query(
            "UPDATE vitrine.theme SET settings = $2, updated_at = now() WHERE id = $1",
        )
        .bind(id.as_uuid())
        .bind(Json(settings))
        .execute(self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }
        Ok(())
    }

    /// Delete a developer's theme; mock data cascades.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the developer has no such theme.
    pub async fn delete_theme(
        &self,
        developer: ThemeDeveloperId,
        id: ThemeId,
    ) -> Result<(), RepositoryError> {
        let result = sqlx::query("DELETE FROM vitrine.theme WHERE id = $1 AND developer_id = $2")
            .bind(id.as_uuid())
            .bind(developer.as_uuid())
            .execute(self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }
        Ok(())
    }

    // -------------------------------------------------------------------------
    // Mock categories
    // -------------------------------------------------------------------------

    /// A theme's mock categories in creation order.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn list_mock_categories(
        &self,
        theme: ThemeId,
    ) -> Result<Vec<ThemeCategory>, RepositoryError> {
        let rows = sqlx::query_as::<_, MockCategoryRow>(&format!(
            "SELECT {MOCK_CATEGORY_COLUMNS} FROM vitrine.theme_category \
             WHERE theme_id = $1 ORDER BY created_at, name"
        ))
        .bind(theme.as_uuid())
        .fetch_all(self.pool)
        .await?;

        Ok(rows.into_iter().map(Into::into).collect())
    }

    /// Create a mock category.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the insert fails.
    pub async fn create_mock_category(
        &self,
        theme: ThemeId,
        fields: &MockCategoryFields,
    ) -> Result<ThemeCategory, RepositoryError> {
        let row = sqlx::query_as::<_, MockCategoryRow>(&format!(
            r"
            INSERT INTO vitrine.theme_category (id, theme_id, name, parent_id, is_active)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING {MOCK_CATEGORY_COLUMNS}
            "
        ))
        .bind(ThemeCategoryId::generate().as_uuid())
        .bind(theme.as_uuid())
        .bind(&fields.name)
        .bind(fields.parent_id.map(|p| p.as_uuid()))
        .bind(fields.is_active)
        .fetch_one(self.pool)
        .await?;

        Ok(row.into())
    }

    /// Update a mock category.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the theme has no such category.
    pub async fn update_mock_category(
        &self,
        theme: ThemeId,
        id: ThemeCategoryId,
        fields: &MockCategoryFields,
    ) -> Result<ThemeCategory, RepositoryError> {
        let row = sqlx::query_as::<_, MockCategoryRow>(&format!(
            r"
            UPDATE vitrine.theme_category
            SET name = $3, parent_id = $4, is_active = $5
            WHERE id = $1 AND theme_id = $2
            RETURNING {MOCK_CATEGORY_COLUMNS}
            "
        ))
        .bind(id.as_uuid())
        .bind(theme.as_uuid())
        .bind(&fields.name)
        .bind(fields.parent_id.map(|p| p.as_uuid()))
        .bind(fields.is_active)
        .fetch_optional(self.pool)
        .await?
        .ok_or(RepositoryError::NotFound)?;

        Ok(row.into())
    }

    /// Delete a mock category.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the theme has no such category.
    pub async fn delete_mock_category(
        &self,
        theme: ThemeId,
        id: ThemeCategoryId,
    ) -> Result<(), RepositoryError> {
        let result =
            sqlx::query("DELETE FROM vitrine.theme_category WHERE id = $1 AND theme_id = $2")
                .bind(id.as_uuid())
                .bind(theme.as_uuid())
                .execute(self.pool)
                .await?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }
        Ok(())
    }

    // -------------------------------------------------------------------------
    // Mock products
    // -------------------------------------------------------------------------

    /// A theme's mock products in creation order.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn list_mock_products(
        &self,
        theme: ThemeId,
    ) -> Result<Vec<ThemeProduct>, RepositoryError> {
        let rows = sqlx::query_as::<_, MockProductRow>(&format!(
            "SELECT {MOCK_PRODUCT_COLUMNS} FROM vitrine.theme_product \
             WHERE theme_id = $1 ORDER BY created_at, name"
        ))
        .bind(theme.as_uuid())
        .fetch_all(self.pool)
        .await?;

        Ok(rows.into_iter().map(Into::into).collect())
    }

    /// Get one mock product.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get_mock_product(
        &self,
        theme: ThemeId,
        id: ThemeProductId,
    ) -> Result<Option<ThemeProduct>, RepositoryError> {
        let row = sqlx::query_as::<_, MockProductRow>(&format!(
            "SELECT {MOCK_PRODUCT_COLUMNS} FROM vitrine.theme_product \
             WHERE id = $1 AND theme_id = $2"
        ))
        .bind(id.as_uuid())
        .bind(theme.as_uuid())
        .fetch_optional(self.pool)
        .await?;

        Ok(row.map(Into::into))
    }

    /// Create a mock product.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the insert fails.
    pub async fn create_mock_product(
        &self,
        theme: ThemeId,
        fields: &MockProductFields,
    ) -> Result<ThemeProduct, RepositoryError> {
        let row = sqlx::query_as::<_, MockProductRow>(&format!(
            r"
            INSERT INTO vitrine.theme_product
                (id, theme_id, category_id, name, description, images, price, is_active)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            RETURNING {MOCK_PRODUCT_COLUMNS}
            "
        ))
        .bind(ThemeProductId::generate().as_uuid())
        .bind(theme.as_uuid())
        .bind(fields.category_id.map(|c| c.as_uuid()))
        .bind(&fields.name)
        .bind(&fields.description)
        .bind(&fields.images)
        .bind(fields.price)
        .bind(fields.is_active)
        .fetch_one(self.pool)
        .await?;

        Ok(row.into())
    }

    /// Update a mock product.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the theme has no such product.
    pub async fn update_mock_product(
        &self,
        theme: ThemeId,
        id: ThemeProductId,
        fields: &MockProductFields,
    ) -> Result<ThemeProduct, RepositoryError> {
        let row = sqlx::query_as::<_, MockProductRow>(&format!(
            r"
            UPDATE vitrine.theme_product
            SET category_id = $3, name = $4, description = $5, images = $6,
                price = $7, is_active = $8
            WHERE id = $1 AND theme_id = $2
            RETURNING {MOCK_PRODUCT_COLUMNS}
            "
        ))
        .bind(id.as_uuid())
        .bind(theme.as_uuid())
        .bind(fields.category_id.map(|c| c.as_uuid()))
        .bind(&fields.name)
        .bind(&fields.description)
        .bind(&fields.images)
        .bind(fields.price)
        .bind(fields.is_active)
        .fetch_optional(self.pool)
        .await?
        .ok_or(RepositoryError::NotFound)?;

        Ok(row.into())
    }

    /// Image URLs a theme still references: mock products and its preview.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn image_urls_in_use(&self, theme: ThemeId) -> Result<Vec<String>, RepositoryError> {
        let urls = sqlx::query_scalar::<_, String>(
            r"
            SELECT unnest(images) FROM vitrine.theme_product WHERE theme_id = $1
            UNION
            SELECT preview_image_url FROM vitrine.theme
            WHERE id = $1 AND preview_image_url IS NOT NULL
            ",
        )
        .bind(theme.as_uuid())
        .fetch_all(self.pool)
        .await?;

        Ok(urls)
    }

    /// Delete a mock product.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the theme has no such product.
    pub async fn delete_mock_product(
        &self,
        theme: ThemeId,
        id: ThemeProductId,
    ) -> Result<(), RepositoryError> {
        let result =
            sqlx::query("DELETE FROM vitrine.theme_product WHERE id = $1 AND theme_id = $2")
                .bind(id.as_uuid())
                .bind(theme.as_uuid())
                .execute(self.pool)
                .await?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }
        Ok(())
    }

    /// Replace all mock data and settings of a theme in one transaction.
    ///
    /// `categories` must list parents before their children.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if any write fails; nothing is kept.
    #[instrument(skip(self, categories, products, settings), fields(
        categories = categories.len(),
        products = products.len(),
    ))]
    pub async fn replace_mock_data(
        &self,
        theme: ThemeId,
        categories: &[(ThemeCategoryId, MockCategoryFields)],
        products: &[MockProductFields],
        settings: &MockSettings,
    ) -> Result<(), RepositoryError> {
        let mut tx = self.pool.begin().await?;

        let updated = sqlx::query(
            "UPDATE vitrine.theme SET settings = $2, updated_at = now() WHERE id = $1",
        )
        .bind(theme.as_uuid())
        .bind(Json(settings))
        .execute(&mut *tx)
        .await?;
        if updated.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }

        sqlx::query("DELETE FROM vitrine.theme_product WHERE theme_id = $1")
            .bind(theme.as_uuid())
            .execute(&mut *tx)
            .await?;
        sqlx::query("DELETE FROM vitrine.theme_category WHERE theme_id = $1")
            .bind(theme.as_uuid())
            .execute(&mut *tx)
            .await?;

        for (id, fields) in categories {
            sqlx::query(
                r"
                INSERT INTO vitrine.theme_category (id, theme_id, name, parent_id, is_active)
                VALUES ($1, $2, $3, $4, $5)
                ",
            )
            .bind(id.as_uuid())
            .bind(theme.as_uuid())
            .bind(&fields.name)
            .bind(fields.parent_id.map(|p| p.as_uuid()))
            .bind(fields.is_active)
            .execute(&mut *tx)
            .await?;
        }

        for fields in products {
            sqlx::query(
                r"
                INSERT INTO vitrine.theme_product
                    (id, theme_id, category_id, name, description, images, price, is_active)
                VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
                ",
            )
            .bind(ThemeProductId::generate().as_uuid())
            .bind(theme.as_uuid())
            .bind(fields.category_id.map(|c| c.as_uuid()))
            .bind(&fields.name)
            .bind(&fields.description)
            .bind(&fields.images)
            .bind(fields.price)
            .bind(fields.is_active)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;
        Ok(())
    }
}
