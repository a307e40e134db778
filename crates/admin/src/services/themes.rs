//! Theme marketplace: developer profiles, themes and preview mock data.
//!
//! The current user is the developer; every theme operation first checks
//! that the theme belongs to them. Mock categories follow the same
//! hierarchy rules as store categories.

use std::collections::HashMap;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use thiserror::Error;
use tracing::instrument;

use vitrine_core::catalog::{
    CategoryNode, CategoryTreeError, MAX_CATEGORY_DEPTH, flatten, validate_parent,
};
use vitrine_core::theme::{
    MockDisplay, MockSettings, MockSettingsError, PublishError, check_publishable,
    simulate_display,
};
use vitrine_core::{
    CategoryId, OwnerId, ThemeCategoryId, ThemeDeveloperId, ThemeId, ThemeProductId, ThemeStatus,
};

use crate::db::themes::{MockCategoryFields, MockProductFields, ThemeFields};
use crate::db::{RepositoryError, ThemeRepository};
use crate::models::{Theme, ThemeCategory, ThemeDeveloper, ThemeProduct};

/// Maximum theme, category or product name length.
pub const MAX_NAME_LENGTH: usize = 200;

/// Theme operation failures.
#[derive(Debug, Error)]
pub enum ThemeError {
    #[error("{0}")]
    Validation(String),

    #[error("create a developer profile before adding themes")]
    NoDeveloperProfile,

    #[error(transparent)]
    Publish(#[from] PublishError),

    #[error(transparent)]
    Settings(#[from] MockSettingsError),

    #[error(transparent)]
    Categories(#[from] CategoryTreeError),

    #[error(transparent)]
    Repository(#[from] RepositoryError),
}

/// The developer id of a signed-in user.
#[must_use]
pub const fn developer_id(user: OwnerId) -> ThemeDeveloperId {
    ThemeDeveloperId::new(user.as_uuid())
}

/// Developer profile fields as submitted.
#[derive(Debug, Clone, Deserialize)]
pub struct DeveloperInput {
    pub display_name: String,
    #[serde(default)]
    pub website: Option<String>,
}

/// Theme listing fields as submitted.
#[derive(Debug, Clone, Deserialize)]
pub struct ThemeInput {
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub price: Decimal,
    #[serde(default)]
    pub preview_image_url: Option<String>,
}

/// Mock category fields as submitted.
#[derive(Debug, Clone, Deserialize)]
pub struct MockCategoryInput {
    pub name: String,
    #[serde(default)]
    pub parent_id: Option<ThemeCategoryId>,
    #[serde(default = "default_true")]
    pub is_active: bool,
}

/// Mock product fields as submitted.
#[derive(Debug, Clone, Deserialize)]
pub struct MockProductInput {
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub category_id: Option<ThemeCategoryId>,
    #[serde(default)]
    pub images: Vec<String>,
    pub price: Decimal,
    #[serde(default = "default_true")]
    pub is_active: bool,
}

const fn default_true() -> bool {
    true
}

/// A mock category with its depth in the tree.
#[derive(Debug, Serialize)]
pub struct PreviewCategory {
    #[serde(flatten)]
    pub category: ThemeCategory,
    pub depth: usize,
}

/// A mock product as the preview renders it.
#[derive(Debug, Serialize)]
pub struct PreviewProduct {
    #[serde(flatten)]
    pub product: ThemeProduct,
    pub display: MockDisplay,
}

/// Everything the preview builder needs for one theme.
#[derive(Debug, Serialize)]
pub struct ThemePreview {
    pub theme: Theme,
    pub categories: Vec<PreviewCategory>,
    pub products: Vec<PreviewProduct>,
}

/// Theme service for one database pool.
pub struct ThemeService<'a> {
    repo: ThemeRepository<'a>,
}

impl<'a> ThemeService<'a> {
    /// Create a theme service.
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self {
            repo: ThemeRepository::new(pool),
        }
    }

    // =========================================================================
    // Developer profile
    // =========================================================================

    /// The developer's profile, if created.
    ///
    /// # Errors
    ///
    /// Returns `ThemeError::Repository` if the query fails.
    pub async fn developer(
        &self,
        developer: ThemeDeveloperId,
    ) -> Result<Option<ThemeDeveloper>, ThemeError> {
        Ok(self.repo.get_developer(developer).await?)
    }

    /// Create or update the developer's profile.
    ///
    /// # Errors
    ///
    /// Returns `ThemeError::Validation` for a blank display name.
    pub async fn save_developer(
        &self,
        developer: ThemeDeveloperId,
        input: DeveloperInput,
    ) -> Result<ThemeDeveloper, ThemeError> {
        let display_name = validate_name(&input.display_name, "display")?;
        let website = input
            .website
            .map(|w| w.trim().to_owned())
            .filter(|w| !w.is_empty());
        if let Some(site) = &website
            && url::Url::parse(site).is_err()
        {
            return Err(ThemeError::Validation(format!("'{site}' is not a valid URL")));
        }

        Ok(self
            .repo
            .upsert_developer(developer, &display_name, website.as_deref())
            .await?)
    }

    // =========================================================================
    // Themes
    // =========================================================================

    /// The developer's themes.
    ///
    /// # Errors
    ///
    /// Returns `ThemeError::Repository` if the query fails.
    pub async fn themes(&self, developer: ThemeDeveloperId) -> Result<Vec<Theme>, ThemeError> {
        Ok(self.repo.list_themes(developer).await?)
    }

    /// One of the developer's themes.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the developer has no such theme.
    pub async fn theme(
        &self,
        developer: ThemeDeveloperId,
        id: ThemeId,
    ) -> Result<Theme, ThemeError> {
        self.repo
            .get_theme(developer, id)
            .await?
            .ok_or_else(|| RepositoryError::NotFound.into())
    }

    /// Create a draft theme.
    ///
    /// # Errors
    ///
    /// Returns `ThemeError::NoDeveloperProfile` if the profile is missing.
    #[instrument(skip(self, input), fields(developer_id = %developer))]
    pub async fn create_theme(
        &self,
        developer: ThemeDeveloperId,
        input: ThemeInput,
    ) -> Result<Theme, ThemeError> {
        if self.repo.get_developer(developer).await?.is_none() {
            return Err(ThemeError::NoDeveloperProfile);
        }
        let fields = theme_fields(input)?;
        let theme = self.repo.create_theme(developer, &fields).await?;
        tracing::info!(developer_id = %developer, theme_id = %theme.id, "Theme created");
        Ok(theme)
    }

    /// Update a theme's listing fields.
    ///
    /// A published theme must stay publishable.
    ///
    /// # Errors
    ///
    /// Returns a validation error, or `NotFound`.
    pub async fn update_theme(
        &self,
        developer: ThemeDeveloperId,
        id: ThemeId,
        input: ThemeInput,
    ) -> Result<Theme, ThemeError> {
        let current = self.theme(developer, id).await?;
        let fields = theme_fields(input)?;
        if current.status == ThemeStatus::Published {
            check_publishable(&fields.name, fields.price, fields.preview_image_url.as_deref())?;
        }
        Ok(self.repo.update_theme(developer, id, &fields).await?)
    }

    /// Move a theme between draft and published.
    ///
    /// # Errors
    ///
    /// Returns `ThemeError::Publish` if the theme is not ready to publish.
    #[instrument(skip(self), fields(developer_id = %developer, theme_id = %id))]
    pub async fn set_status(
        &self,
        developer: ThemeDeveloperId,
        id: ThemeId,
        status: ThemeStatus,
    ) -> Result<Theme, ThemeError> {
        let current = self.theme(developer, id).await?;
        if status == ThemeStatus::Published {
            check_publishable(
                &current.name,
                current.price,
                current.preview_image_url.as_deref(),
            )?;
        }
        let theme = self.repo.set_status(developer, id, status).await?;
        tracing::info!(theme_id = %id, status = %status, "Theme status changed");
        Ok(theme)
    }

    // =========================================================================
    // Mock settings
    // =========================================================================

    /// Validate and store new mock settings.
    ///
    /// # Errors
    ///
    /// Returns `ThemeError::Settings` for out-of-range values.
    pub async fn update_settings(
        &self,
        developer: ThemeDeveloperId,
        id: ThemeId,
        settings: MockSettings,
    ) -> Result<MockSettings, ThemeError> {
        self.theme(developer, id).await?;
        settings.validate()?;
        self.repo.update_settings(id, &settings).await?;
        Ok(settings)
    }

    // =========================================================================
    // Mock categories
    // =========================================================================

    /// The theme's mock categories, depth-first.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` if the developer has no such theme.
    pub async fn mock_categories(
        &self,
        developer: ThemeDeveloperId,
        theme: ThemeId,
    ) -> Result<Vec<PreviewCategory>, ThemeError> {
        self.theme(developer, theme).await?;
        let categories = self.repo.list_mock_categories(theme).await?;
        Ok(ordered_categories(categories)?)
    }

    /// Create a mock category.
    ///
    /// # Errors
    ///
    /// Returns a validation or hierarchy error, or `NotFound`.
    pub async fn create_mock_category(
        &self,
        developer: ThemeDeveloperId,
        theme: ThemeId,
        input: MockCategoryInput,
    ) -> Result<ThemeCategory, ThemeError> {
        self.theme(developer, theme).await?;
        let fields = mock_category_fields(input)?;
        let nodes = category_nodes(&self.repo.list_mock_categories(theme).await?);
        validate_parent(None, fields.parent_id.map(as_category), &nodes, MAX_CATEGORY_DEPTH)?;
        Ok(self.repo.create_mock_category(theme, &fields).await?)
    }

    /// Update a mock category.
    ///
    /// # Errors
    ///
    /// Returns a validation or hierarchy error, or `NotFound`.
    pub async fn update_mock_category(
        &self,
        developer: ThemeDeveloperId,
        theme: ThemeId,
        id: ThemeCategoryId,
        input: MockCategoryInput,
    ) -> Result<ThemeCategory, ThemeError> {
        self.theme(developer, theme).await?;
        let fields = mock_category_fields(input)?;
        let existing = self.repo.list_mock_categories(theme).await?;
        if !existing.iter().any(|c| c.id == id) {
            return Err(RepositoryError::NotFound.into());
        }
        validate_parent(
            Some(as_category(id)),
            fields.parent_id.map(as_category),
            &category_nodes(&existing),
            MAX_CATEGORY_DEPTH,
        )?;
        Ok(self.repo.update_mock_category(theme, id, &fields).await?)
    }

    /// Delete a mock category.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` if the theme or category does not exist.
    pub async fn delete_mock_category(
        &self,
        developer: ThemeDeveloperId,
        theme: ThemeId,
        id: ThemeCategoryId,
    ) -> Result<(), ThemeError> {
        self.theme(developer, theme).await?;
        Ok(self.repo.delete_mock_category(theme, id).await?)
    }

    // =========================================================================
    // Mock products
    // =========================================================================

    /// The theme's mock products.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` if the developer has no such theme.
    pub async fn mock_products(
        &self,
        developer: ThemeDeveloperId,
        theme: ThemeId,
    ) -> Result<Vec<ThemeProduct>, ThemeError> {
        self.theme(developer, theme).await?;
        Ok(self.repo.list_mock_products(theme).await?)
    }

    /// Create a mock product.
    ///
    /// # Errors
    ///
    /// Returns a validation error, or `NotFound`.
    pub async fn create_mock_product(
        &self,
        developer: ThemeDeveloperId,
        theme: ThemeId,
        input: MockProductInput,
    ) -> Result<ThemeProduct, ThemeError> {
        self.theme(developer, theme).await?;
        let fields = self.mock_product_fields(theme, input).await?;
        Ok(self.repo.create_mock_product(theme, &fields).await?)
    }

    /// Update a mock product.
    ///
    /// # Errors
    ///
    /// Returns a validation error, or `NotFound`.
    pub async fn update_mock_product(
        &self,
        developer: ThemeDeveloperId,
        theme: ThemeId,
        id: ThemeProductId,
        input: MockProductInput,
    ) -> Result<ThemeProduct, ThemeError> {
        self.theme(developer, theme).await?;
        let fields = self.mock_product_fields(theme, input).await?;
        Ok(self.repo.update_mock_product(theme, id, &fields).await?)
    }

    /// Delete a mock product.
    ///
    /// Returns the deleted product together with the image URLs the theme
    /// still references afterwards.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` if the theme or product does not exist.
    pub async fn delete_mock_product(
        &self,
        developer: ThemeDeveloperId,
        theme: ThemeId,
        id: ThemeProductId,
    ) -> Result<(ThemeProduct, Vec<String>), ThemeError> {
        self.theme(developer, theme).await?;
        let product = self
            .repo
            .get_mock_product(theme, id)
            .await?
            .ok_or(RepositoryError::NotFound)?;
        self.repo.delete_mock_product(theme, id).await?;
        let in_use = self.repo.image_urls_in_use(theme).await?;
        Ok((product, in_use))
    }

    async fn mock_product_fields(
        &self,
        theme: ThemeId,
        input: MockProductInput,
    ) -> Result<MockProductFields, ThemeError> {
        if let Some(category) = input.category_id {
            let categories = self.repo.list_mock_categories(theme).await?;
            if !categories.iter().any(|c| c.id == category) {
                return Err(ThemeError::Validation(
                    "category does not belong to this theme".to_owned(),
                ));
            }
        }
        mock_product_fields(input)
    }

    // =========================================================================
    // Preview
    // =========================================================================

    /// Theme, categories and products with simulated display values.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` if the developer has no such theme.
    #[instrument(skip(self), fields(theme_id = %id))]
    pub async fn preview(
        &self,
        developer: ThemeDeveloperId,
        id: ThemeId,
    ) -> Result<ThemePreview, ThemeError> {
        let (theme, categories, products) = tokio::try_join!(
            self.theme(developer, id),
            async { Ok::<_, ThemeError>(self.repo.list_mock_categories(id).await?) },
            async { Ok::<_, ThemeError>(self.repo.list_mock_products(id).await?) },
        )?;

        Ok(build_preview(theme, categories, products)?)
    }
}

/// Assemble a preview from already loaded rows.
///
/// Inactive products are left out.
///
/// # Errors
///
/// Returns `CategoryTreeError` if the stored categories are inconsistent.
pub fn build_preview(
    theme: Theme,
    categories: Vec<ThemeCategory>,
    products: Vec<ThemeProduct>,
) -> Result<ThemePreview, CategoryTreeError> {
    let categories = ordered_categories(categories)?;
    let products = products
        .into_iter()
        .filter(|p| p.is_active)
        .map(|product| PreviewProduct {
            display: simulate_display(product.id, product.price, &theme.settings),
            product,
        })
        .collect();

    Ok(ThemePreview {
        theme,
        categories,
        products,
    })
}

fn ordered_categories(
    categories: Vec<ThemeCategory>,
) -> Result<Vec<PreviewCategory>, CategoryTreeError> {
    let flat = flatten(&category_nodes(&categories))?;
    let mut by_id: HashMap<CategoryId, ThemeCategory> = categories
        .into_iter()
        .map(|c| (as_category(c.id), c))
        .collect();

    Ok(flat
        .into_iter()
        .filter_map(|f| {
            by_id.remove(&f.id).map(|category| PreviewCategory {
                category,
                depth: f.depth,
            })
        })
        .collect())
}

const fn as_category(id: ThemeCategoryId) -> CategoryId {
    CategoryId::new(id.as_uuid())
}

fn category_nodes(categories: &[ThemeCategory]) -> Vec<CategoryNode> {
    categories.iter().map(ThemeCategory::node).collect()
}

fn validate_name(name: &str, what: &str) -> Result<String, ThemeError> {
    let name = name.trim();
    if name.is_empty() {
        return Err(ThemeError::Validation(format!("{what} name is required")));
    }
    if name.chars().count() > MAX_NAME_LENGTH {
        return Err(ThemeError::Validation(format!(
            "{what} name must be at most {MAX_NAME_LENGTH} characters"
        )));
    }
    Ok(name.to_owned())
}

fn validate_price(price: Decimal) -> Result<Decimal, ThemeError> {
    if price < Decimal::ZERO {
        return Err(ThemeError::Validation("price cannot be negative".to_owned()));
    }
    Ok(price)
}

fn theme_fields(input: ThemeInput) -> Result<ThemeFields, ThemeError> {
    Ok(ThemeFields {
        name: validate_name(&input.name, "theme")?,
        description: input.description.trim().to_owned(),
        price: validate_price(input.price)?,
        preview_image_url: input
            .preview_image_url
            .map(|u| u.trim().to_owned())
            .filter(|u| !u.is_empty()),
    })
}

fn mock_category_fields(input: MockCategoryInput) -> Result<MockCategoryFields, ThemeError> {
    Ok(MockCategoryFields {
        name: validate_name(&input.name, "category")?,
        parent_id: input.parent_id,
        is_active: input.is_active,
    })
}

fn mock_product_fields(input: MockProductInput) -> Result<MockProductFields, ThemeError> {
    Ok(MockProductFields {
        category_id: input.category_id,
        name: validate_name(&input.name, "product")?,
        description: input.description.trim().to_owned(),
        images: input.images,
        price: validate_price(input.price)?,
        is_active: input.is_active,
    })
}

// =============================================================================
// Seed files
// =============================================================================

/// Mock data loaded from a seed file (`vt-cli theme seed-mock`).
///
/// Categories reference their parent by name and products their category by
/// name.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct MockSeed {
    pub settings: MockSettings,
    pub categories: Vec<SeedCategory>,
    pub products: Vec<SeedProduct>,
}

/// A category entry in a seed file.
#[derive(Debug, Clone, Deserialize)]
pub struct SeedCategory {
    pub name: String,
    #[serde(default)]
    pub parent: Option<String>,
    #[serde(default = "default_true")]
    pub active: bool,
}

/// A product entry in a seed file.
#[derive(Debug, Clone, Deserialize)]
pub struct SeedProduct {
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub images: Vec<String>,
    pub price: Decimal,
    #[serde(default = "default_true")]
    pub active: bool,
}

/// Validated rows ready for [`ThemeRepository::replace_mock_data`].
#[derive(Debug)]
pub struct SeedPlan {
    /// Parents precede their children.
    pub categories: Vec<(ThemeCategoryId, MockCategoryFields)>,
    pub products: Vec<MockProductFields>,
    pub settings: MockSettings,
}

impl MockSeed {
    /// Validate the seed and resolve names to fresh ids.
    ///
    /// # Errors
    ///
    /// Returns the first validation, settings or hierarchy problem found.
    pub fn plan(self) -> Result<SeedPlan, ThemeError> {
        self.settings.validate()?;

        let mut ids: HashMap<String, ThemeCategoryId> = HashMap::new();
        for category in &self.categories {
            let name = validate_name(&category.name, "category")?;
            if ids.insert(name.clone(), ThemeCategoryId::generate()).is_some() {
                return Err(ThemeError::Validation(format!(
                    "category '{name}' is listed twice"
                )));
            }
        }
        let lookup = |name: &str, what: &str| {
            ids.get(name.trim()).copied().ok_or_else(|| {
                ThemeError::Validation(format!("{what} refers to unknown category '{name}'"))
            })
        };

        let mut rows = Vec::with_capacity(self.categories.len());
        for category in &self.categories {
            let name = category.name.trim().to_owned();
            let id = lookup(&name, "category")?;
            let parent_id = category
                .parent
                .as_deref()
                .map(|p| lookup(p, &format!("category '{name}'")))
                .transpose()?;
            rows.push((
                id,
                MockCategoryFields {
                    name,
                    parent_id,
                    is_active: category.active,
                },
            ));
        }

        let nodes: Vec<CategoryNode> = rows
            .iter()
            .map(|(id, fields)| CategoryNode {
                id: as_category(*id),
                name: fields.name.clone(),
                parent_id: fields.parent_id.map(as_category),
                is_active: fields.is_active,
            })
            .collect();
        let ordered = flatten(&nodes)?;
        if ordered.iter().any(|c| c.depth > MAX_CATEGORY_DEPTH) {
            return Err(CategoryTreeError::TooDeep {
                max: MAX_CATEGORY_DEPTH,
            }
            .into());
        }
        let mut by_id: HashMap<CategoryId, (ThemeCategoryId, MockCategoryFields)> = rows
            .into_iter()
            .map(|(id, fields)| (as_category(id), (id, fields)))
            .collect();
        let categories = ordered
            .iter()
            .filter_map(|c| by_id.remove(&c.id))
            .collect();

        let mut products = Vec::with_capacity(self.products.len());
        for product in self.products {
            let category_id = product
                .category
                .as_deref()
                .map(|c| lookup(c, &format!("product '{}'", product.name.trim())))
                .transpose()?;
            products.push(mock_product_fields(MockProductInput {
                name: product.name,
                description: product.description,
                category_id,
                images: product.images,
                price: product.price,
                is_active: product.active,
            })?);
        }

        Ok(SeedPlan {
            categories,
            products,
            settings: self.settings,
        })
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use chrono::Utc;

    use super::*;

    fn theme(settings: MockSettings) -> Theme {
        Theme {
            id: ThemeId::generate(),
            developer_id: ThemeDeveloperId::generate(),
            name: "Aurora".to_owned(),
            description: String::new(),
            price: Decimal::new(4900, 2),
            preview_image_url: None,
            status: ThemeStatus::Draft,
            settings,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    fn mock_product(theme: ThemeId, active: bool) -> ThemeProduct {
        ThemeProduct {
            id: ThemeProductId::generate(),
            theme_id: theme,
            category_id: None,
            name: "Sample".to_owned(),
            description: String::new(),
            images: Vec::new(),
            price: Decimal::new(2000, 2),
            is_active: active,
        }
    }

    #[test]
    fn test_preview_skips_inactive_and_is_deterministic() {
        let mut settings = MockSettings::default();
        settings.discount.enabled = true;
        settings.discount.share = 1.0;
        let theme = theme(settings);
        let active = mock_product(theme.id, true);
        let products = vec![active.clone(), mock_product(theme.id, false)];

        let first = build_preview(theme.clone(), Vec::new(), products.clone()).unwrap();
        let second = build_preview(theme, Vec::new(), products).unwrap();

        assert_eq!(first.products.len(), 1);
        assert_eq!(first.products[0].product.id, active.id);
        assert_eq!(first.products[0].display, second.products[0].display);
        assert!(first.products[0].display.compare_at_price.is_some());
    }

    #[test]
    fn test_preview_orders_categories_depth_first() {
        let theme = theme(MockSettings::default());
        let parent = ThemeCategory {
            id: ThemeCategoryId::generate(),
            theme_id: theme.id,
            name: "Clothing".to_owned(),
            parent_id: None,
            is_active: true,
        };
        let child = ThemeCategory {
            id: ThemeCategoryId::generate(),
            theme_id: theme.id,
            name: "Shirts".to_owned(),
            parent_id: Some(parent.id),
            is_active: true,
        };

        let preview = build_preview(theme, vec![child.clone(), parent.clone()], Vec::new()).unwrap();

        let order: Vec<_> = preview.categories.iter().map(|c| (c.category.id, c.depth)).collect();
        assert_eq!(order, vec![(parent.id, 0), (child.id, 1)]);
    }

    #[test]
    fn test_seed_plan_resolves_names() {
        let seed: MockSeed = serde_json::from_value(serde_json::json!({
            "settings": {"discount": {"enabled": true, "percent": 15}},
            "categories": [
                {"name": "Shirts", "parent": "Clothing"},
                {"name": "Clothing"}
            ],
            "products": [
                {"name": "Tee", "category": "Shirts", "price": "19.99"},
                {"name": "Gift card", "price": "25"}
            ]
        }))
        .unwrap();

        let plan = seed.plan().unwrap();

        assert_eq!(plan.categories.len(), 2);
        assert_eq!(plan.categories[0].1.name, "Clothing");
        assert_eq!(plan.categories[1].1.parent_id, Some(plan.categories[0].0));
        assert_eq!(plan.products[0].category_id, Some(plan.categories[1].0));
        assert_eq!(plan.products[1].category_id, None);
        assert_eq!(plan.settings.discount.percent, 15);
    }

    #[test]
    fn test_seed_rejects_unknown_category() {
        let seed = MockSeed {
            products: vec![SeedProduct {
                name: "Tee".to_owned(),
                description: String::new(),
                category: Some("Nope".to_owned()),
                images: Vec::new(),
                price: Decimal::ONE,
                active: true,
            }],
            ..MockSeed::default()
        };
        assert!(matches!(seed.plan(), Err(ThemeError::Validation(_))));
    }

    #[test]
    fn test_seed_rejects_cycles_and_depth() {
        let cycle = MockSeed {
            categories: vec![
                SeedCategory {
                    name: "A".to_owned(),
                    parent: Some("B".to_owned()),
                    active: true,
                },
                SeedCategory {
                    name: "B".to_owned(),
                    parent: Some("A".to_owned()),
                    active: true,
                },
            ],
            ..MockSeed::default()
        };
        assert!(matches!(cycle.plan(), Err(ThemeError::Categories(_))));

        let deep = MockSeed {
            categories: ["A", "B", "C"]
                .iter()
                .zip([None, Some("A"), Some("B")])
                .map(|(name, parent)| SeedCategory {
                    name: (*name).to_owned(),
                    parent: parent.map(str::to_owned),
                    active: true,
                })
                .collect(),
            ..MockSeed::default()
        };
        assert!(matches!(
            deep.plan(),
            Err(ThemeError::Categories(CategoryTreeError::TooDeep { .. }))
        ));
    }

    #[test]
    fn test_seed_rejects_bad_settings() {
        let mut seed = MockSeed::default();
        seed.settings.discount.percent = 95;
        assert!(matches!(seed.plan(), Err(ThemeError::Settings(_))));
    }

    #[test]
    fn test_theme_fields_validation() {
        assert!(
            theme_fields(ThemeInput {
                name: " ".to_owned(),
                description: String::new(),
                price: Decimal::ONE,
                preview_image_url: None,
            })
            .is_err()
        );
        assert!(
            theme_fields(ThemeInput {
                name: "Aurora".to_owned(),
                description: String::new(),
                price: Decimal::NEGATIVE_ONE,
                preview_image_url: None,
            })
            .is_err()
        );
    }
}
