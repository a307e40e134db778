//! Store catalog: attributes, categories and products with variants.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use thiserror::Error;
use tracing::instrument;

use vitrine_core::catalog::variants::{MAX_VARIANTS, combination_count};
use vitrine_core::catalog::{
    AttributeSelection, COMMON_ATTRIBUTES, CategoryNode, CategoryTreeError, MAX_CATEGORY_DEPTH,
    VariantDefaults, VariantDraft, VariantError, active_attributes, flatten,
    generate_variants, missing_attributes, validate_drafts, validate_parent,
};
use vitrine_core::{CategoryId, ProductId, StoreId};

use crate::db::categories::CategoryFields;
use crate::db::products::ProductFields;
use crate::db::{AttributeRepository, CategoryRepository, ProductRepository, RepositoryError};
use crate::models::{Attribute, Product, ProductCategory, ProductWithVariants};

/// Maximum attribute name length.
pub const MAX_ATTRIBUTE_NAME_LENGTH: usize = 50;
/// Maximum product or category name length.
pub const MAX_NAME_LENGTH: usize = 200;

/// Catalog operation failures.
#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("{0}")]
    Validation(String),

    #[error(transparent)]
    Variants(#[from] VariantError),

    #[error(transparent)]
    Categories(#[from] CategoryTreeError),

    #[error(transparent)]
    Repository(#[from] RepositoryError),
}

/// Built-in and custom attribute names for a store.
#[derive(Debug, Serialize)]
pub struct AttributeList {
    pub common: Vec<&'static str>,
    pub custom: Vec<Attribute>,
}

/// A category with its depth in the tree.
#[derive(Debug, Serialize)]
pub struct CategoryEntry {
    #[serde(flatten)]
    pub category: ProductCategory,
    pub depth: usize,
}

/// Category fields as submitted.
#[derive(Debug, Clone, Deserialize)]
pub struct CategoryInput {
    pub name: String,
    #[serde(default)]
    pub parent_id: Option<CategoryId>,
    #[serde(default = "default_true")]
    pub is_active: bool,
    #[serde(default)]
    pub thumbnail_url: Option<String>,
}

/// Product fields and variants as submitted.
///
/// When `variants` is absent they are generated from `attributes`, seeded
/// with `defaults`.
#[derive(Debug, Clone, Deserialize)]
pub struct ProductInput {
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub category_id: Option<CategoryId>,
    #[serde(default)]
    pub images: Vec<String>,
    pub base_price: Decimal,
    #[serde(default = "default_true")]
    pub is_active: bool,
    #[serde(default)]
    pub attributes: Vec<AttributeSelection>,
    #[serde(default)]
    pub defaults: VariantDefaults,
    #[serde(default)]
    pub variants: Option<Vec<VariantDraft>>,
}

const fn default_true() -> bool {
    true
}

/// Catalog service for one database pool.
pub struct CatalogService<'a> {
    pool: &'a PgPool,
}

impl<'a> CatalogService<'a> {
    /// Create a catalog service.
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    // =========================================================================
    // Attributes
    // =========================================================================

    /// Common defaults plus the store's custom attributes.
    ///
    /// # Errors
    ///
    /// Returns `CatalogError::Repository` if the query fails.
    pub async fn attributes(&self, store: StoreId) -> Result<AttributeList, CatalogError> {
        Ok(AttributeList {
            common: COMMON_ATTRIBUTES.to_vec(),
            custom: AttributeRepository::new(self.pool).list(store).await?,
        })
    }

    /// Create a custom attribute.
    ///
    /// # Errors
    ///
    /// Returns `CatalogError::Validation` for a blank, overlong or built-in
    /// name, or one the store already has.
    pub async fn create_attribute(
        &self,
        store: StoreId,
        name: &str,
    ) -> Result<Attribute, CatalogError> {
        let name = validate_attribute_name(name)?;
        AttributeRepository::new(self.pool)
            .create(store, name)
            .await
            .map_err(|e| match e {
                RepositoryError::Conflict(_) => {
                    CatalogError::Validation(format!("attribute '{name}' already exists"))
                }
                other => other.into(),
            })
    }

    /// Create any custom attribute used by `selections` that does not exist.
    /// Validated names of selected attributes the store does not have yet.
    ///
    /// Nothing is written; the product save creates them in its transaction.
    async fn new_attributes(
        &self,
        store: StoreId,
        selections: &[AttributeSelection],
    ) -> Result<Vec<String>, CatalogError> {
        let selected: Vec<&str> = selections.iter().map(|s| s.name.as_str()).collect();
        if selected.is_empty() {
            return Ok(Vec::new());
        }
        let existing = AttributeRepository::new(self.pool).list(store).await?;
        let existing: Vec<&str> = existing.iter().map(|a| a.name.as_str()).collect();
        let missing = missing_attributes(&selected, &existing);
        for name in &missing {
            validate_attribute_name(name)?;
        }
        Ok(missing.into_iter().map(str::to_owned).collect())
    }

    // =========================================================================
    // Categories
    // =========================================================================

    /// The store's categories, depth-first with depths.
    ///
    /// # Errors
    ///
    /// Returns `CatalogError::Categories` if the stored tree is inconsistent.
    pub async fn categories(&self, store: StoreId) -> Result<Vec<CategoryEntry>, CatalogError> {
        let mut categories = CategoryRepository::new(self.pool).list(store).await?;
        let nodes: Vec<CategoryNode> = categories.iter().map(ProductCategory::node).collect();

        let mut entries = Vec::with_capacity(categories.len());
        for flat in flatten(&nodes)? {
            if let Some(index) = categories.iter().position(|c| c.id == flat.id) {
                entries.push(CategoryEntry {
                    category: categories.swap_remove(index),
                    depth: flat.depth,
                });
            }
        }
        Ok(entries)
    }

    /// Create a category.
    ///
    /// # Errors
    ///
    /// Returns `CatalogError::Validation` or `CatalogError::Categories` for
    /// invalid input.
    #[instrument(skip(self, input), fields(store_id = %store))]
    pub async fn create_category(
        &self,
        store: StoreId,
        input: CategoryInput,
    ) -> Result<ProductCategory, CatalogError> {
        let repo = CategoryRepository::new(self.pool);
        let fields = category_fields(input)?;
        let nodes = category_nodes(&repo.list(store).await?);
        validate_parent(None, fields.parent_id, &nodes, MAX_CATEGORY_DEPTH)?;
        Ok(repo.create(store, &fields).await?)
    }

    /// Update a category, re-checking the hierarchy.
    ///
    /// # Errors
    ///
    /// Returns `CatalogError::Categories` if the new parent would create a
    /// cycle or nest too deeply.
    #[instrument(skip(self, input), fields(store_id = %store, category_id = %id))]
    pub async fn update_category(
        &self,
        store: StoreId,
        id: CategoryId,
        input: CategoryInput,
    ) -> Result<ProductCategory, CatalogError> {
        let repo = CategoryRepository::new(self.pool);
        let fields = category_fields(input)?;
        let existing = repo.list(store).await?;
        if !existing.iter().any(|c| c.id == id) {
            return Err(RepositoryError::NotFound.into());
        }
        validate_parent(
            Some(id),
            fields.parent_id,
            &category_nodes(&existing),
            MAX_CATEGORY_DEPTH,
        )?;
        Ok(repo.update(store, id, &fields).await?)
    }

    /// Delete a category.
    ///
    /// # Errors
    ///
    /// Returns `CatalogError::Repository` with `NotFound` if it does not exist.
    pub async fn delete_category(&self, store: StoreId, id: CategoryId) -> Result<(), CatalogError> {
        Ok(CategoryRepository::new(self.pool).delete(store, id).await?)
    }

    // =========================================================================
    // Products
    // =========================================================================

    /// The store's products.
    ///
    /// # Errors
    ///
    /// Returns `CatalogError::Repository` if the query fails.
    pub async fn products(&self, store: StoreId) -> Result<Vec<Product>, CatalogError> {
        Ok(ProductRepository::new(self.pool).list(store).await?)
    }

    /// A product with its variants.
    ///
    /// # Errors
    ///
    /// Returns `CatalogError::Repository` with `NotFound` if it does not exist.
    pub async fn product(
        &self,
        store: StoreId,
        id: ProductId,
    ) -> Result<ProductWithVariants, CatalogError> {
        ProductRepository::new(self.pool)
            .get(store, id)
            .await?
            .ok_or_else(|| RepositoryError::NotFound.into())
    }

    /// Create a product and its variants.
    ///
    /// # Errors
    ///
    /// Returns a validation error for bad fields or variants.
    #[instrument(skip(self, input), fields(store_id = %store))]
    pub async fn create_product(
        &self,
        store: StoreId,
        input: ProductInput,
    ) -> Result<ProductWithVariants, CatalogError> {
        let (fields, drafts, selections) = self.prepare_product(store, input).await?;
        let new_attributes = self.new_attributes(store, &selections).await?;
        let created = ProductRepository::new(self.pool)
            .create(store, &fields, &new_attributes, &drafts)
            .await?;
        tracing::info!(
            store_id = %store,
            product_id = %created.product.id,
            variants = created.variants.len(),
            "Product created"
        );
        Ok(created)
    }

    /// Update a product and synchronize its variants.
    ///
    /// # Errors
    ///
    /// Returns a validation error for bad fields or variants, or `NotFound`.
    #[instrument(skip(self, input), fields(store_id = %store, product_id = %id))]
    pub async fn update_product(
        &self,
        store: StoreId,
        id: ProductId,
        input: ProductInput,
    ) -> Result<ProductWithVariants, CatalogError> {
        let (fields, drafts, selections) = self.prepare_product(store, input).await?;
        let new_attributes = self.new_attributes(store, &selections).await?;
        Ok(ProductRepository::new(self.pool)
            .update(store, id, &fields, &new_attributes, drafts)
            .await?)
    }

    async fn prepare_product(
        &self,
        store: StoreId,
        input: ProductInput,
    ) -> Result<(ProductFields, Vec<VariantDraft>, Vec<AttributeSelection>), CatalogError> {
        if let Some(category) = input.category_id {
            let categories = CategoryRepository::new(self.pool).list(store).await?;
            if !categories.iter().any(|c| c.id == category) {
                return Err(CatalogError::Validation(
                    "category does not belong to this store".to_owned(),
                ));
            }
        }
        prepare_product_input(input)
    }
}

/// Validate product input and resolve its variant set.
///
/// # Errors
///
/// Returns `CatalogError::Validation` or `CatalogError::Variants`.
pub fn prepare_product_input(
    input: ProductInput,
) -> Result<(ProductFields, Vec<VariantDraft>, Vec<AttributeSelection>), CatalogError> {
    let name = validate_name(&input.name, "product")?;
    if input.base_price < Decimal::ZERO {
        return Err(CatalogError::Validation(
            "base price cannot be negative".to_owned(),
        ));
    }

    let selections = active_attributes(&input.attributes);
    let drafts = match input.variants {
        Some(drafts) => drafts,
        None => {
            let count = combination_count(&selections);
            if count > MAX_VARIANTS {
                return Err(VariantError::TooMany {
                    count,
                    max: MAX_VARIANTS,
                }
                .into());
            }
            generate_variants(&selections, &input.defaults)
        }
    };
    validate_drafts(&drafts)?;

    let selections = if selections.is_empty() {
        drafts
            .first()
            .map(|d| {
                d.combination
                    .attribute_names()
                    .map(|n| AttributeSelection::new(n, Vec::<String>::new()))
                    .collect()
            })
            .unwrap_or_default()
    } else {
        selections
    };

    Ok((
        ProductFields {
            category_id: input.category_id,
            name,
            description: input.description.trim().to_owned(),
            images: input.images,
            base_price: input.base_price,
            is_active: input.is_active,
        },
        drafts,
        selections,
    ))
}

fn validate_name(name: &str, what: &str) -> Result<String, CatalogError> {
    let name = name.trim();
    if name.is_empty() {
        return Err(CatalogError::Validation(format!("{what} name is required")));
    }
    if name.chars().count() > MAX_NAME_LENGTH {
        return Err(CatalogError::Validation(format!(
            "{what} name must be at most {MAX_NAME_LENGTH} characters"
        )));
    }
    Ok(name.to_owned())
}

fn validate_attribute_name(name: &str) -> Result<&str, CatalogError> {
    let name = name.trim();
    if name.is_empty() {
        return Err(CatalogError::Validation("attribute name is required".to_owned()));
    }
    if name.chars().count() > MAX_ATTRIBUTE_NAME_LENGTH {
        return Err(CatalogError::Validation(format!(
            "attribute name must be at most {MAX_ATTRIBUTE_NAME_LENGTH} characters"
        )));
    }
    if COMMON_ATTRIBUTES.contains(&name) {
        return Err(CatalogError::Validation(format!(
            "'{name}' is a built-in attribute"
        )));
    }
    Ok(name)
}

fn category_fields(input: CategoryInput) -> Result<CategoryFields, CatalogError> {
    Ok(CategoryFields {
        name: validate_name(&input.name, "category")?,
        parent_id: input.parent_id,
        is_active: input.is_active,
        thumbnail_url: input
            .thumbnail_url
            .map(|u| u.trim().to_owned())
            .filter(|u| !u.is_empty()),
    })
}

fn category_nodes(categories: &[ProductCategory]) -> Vec<CategoryNode> {
    categories.iter().map(ProductCategory::node).collect()
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use vitrine_core::VariantPrice;
    use vitrine_core::catalog::Combination;

    use super::*;

    fn input(attributes: Vec<AttributeSelection>) -> ProductInput {
        ProductInput {
            name: "  Linen Shirt ".to_owned(),
            description: String::new(),
            category_id: None,
            images: Vec::new(),
            base_price: Decimal::new(4500, 2),
            is_active: true,
            attributes,
            defaults: VariantDefaults {
                price: VariantPrice::UseBase,
                quantity: 3,
            },
            variants: None,
        }
    }

    #[test]
    fn test_generates_variants_from_attributes() {
        let (fields, drafts, selections) = prepare_product_input(input(vec![
            AttributeSelection::new("Size", ["S", "M"]),
            AttributeSelection::new("Fit", ["Slim", "Relaxed", ""]),
        ]))
        .unwrap();

        assert_eq!(fields.name, "Linen Shirt");
        assert_eq!(drafts.len(), 4);
        assert!(drafts.iter().all(|d| d.quantity == 3));
        assert_eq!(selections.len(), 2);
    }

    #[test]
    fn test_no_attributes_gives_single_base_variant() {
        let (_, drafts, selections) = prepare_product_input(input(Vec::new())).unwrap();
        assert_eq!(drafts.len(), 1);
        assert!(drafts[0].combination.is_empty());
        assert!(selections.is_empty());
    }

    #[test]
    fn test_explicit_variants_name_their_attributes() {
        let mut product = input(Vec::new());
        let mut combination = Combination::new();
        combination.insert("Scent", "Cedar");
        product.variants = Some(vec![VariantDraft::seeded(
            combination,
            &VariantDefaults::default(),
        )]);

        let (_, _, selections) = prepare_product_input(product).unwrap();
        assert_eq!(selections.len(), 1);
        assert_eq!(selections[0].name, "Scent");
    }

    #[test]
    fn test_rejects_negative_base_price() {
        let mut product = input(Vec::new());
        product.base_price = Decimal::new(-1, 0);
        assert!(matches!(
            prepare_product_input(product),
            Err(CatalogError::Validation(_))
        ));
    }

    #[test]
    fn test_rejects_too_many_combinations() {
        let values: Vec<String> = (0..20).map(|i| format!("v{i}")).collect();
        let product = input(vec![
            AttributeSelection::new("A", values.clone()),
            AttributeSelection::new("B", values),
        ]);
        assert!(matches!(
            prepare_product_input(product),
            Err(CatalogError::Variants(VariantError::TooMany { count: 400, .. }))
        ));
    }

    #[test]
    fn test_attribute_name_rules() {
        assert_eq!(validate_attribute_name(" Scent ").unwrap(), "Scent");
        assert!(validate_attribute_name("Size").is_err());
        assert!(validate_attribute_name("  ").is_err());
    }

    #[test]
    fn test_category_fields_drop_blank_thumbnail() {
        let fields = category_fields(CategoryInput {
            name: "Shirts".to_owned(),
            parent_id: None,
            is_active: true,
            thumbnail_url: Some("  ".to_owned()),
        })
        .unwrap();
        assert!(fields.thumbnail_url.is_none());
    }
}
