//! Catalog domain types: attributes, categories, products and variants.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Serialize;

use vitrine_core::catalog::{CategoryNode, Combination, VariantDraft};
use vitrine_core::{AttributeId, CategoryId, ProductId, StoreId, VariantId, VariantPrice};

/// A custom attribute defined by a store.
#[derive(Debug, Clone, Serialize)]
pub struct Attribute {
    pub id: AttributeId,
    pub store_id: StoreId,
    pub name: String,
    pub created_at: DateTime<Utc>,
}

/// A store category.
#[derive(Debug, Clone, Serialize)]
pub struct ProductCategory {
    pub id: CategoryId,
    pub store_id: StoreId,
    pub name: String,
    pub parent_id: Option<CategoryId>,
    pub is_active: bool,
    pub thumbnail_url: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl ProductCategory {
    /// The hierarchy view of this category.
    #[must_use]
    pub fn node(&self) -> CategoryNode {
        CategoryNode {
            id: self.id,
            name: self.name.clone(),
            parent_id: self.parent_id,
            is_active: self.is_active,
        }
    }
}

/// A product. `quantity` is the sum of its variants' stock.
#[derive(Debug, Clone, Serialize)]
pub struct Product {
    pub id: ProductId,
    pub store_id: StoreId,
    pub category_id: Option<CategoryId>,
    pub name: String,
    pub description: String,
    pub images: Vec<String>,
    pub base_price: Decimal,
    pub quantity: i64,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// A sellable variant of a product.
#[derive(Debug, Clone, Serialize)]
pub struct ProductVariant {
    pub id: VariantId,
    pub product_id: ProductId,
    pub combination: Combination,
    pub price: VariantPrice,
    pub quantity: i32,
    pub images: Vec<String>,
    pub is_active: bool,
}

impl ProductVariant {
    /// The editable part of this variant.
    #[must_use]
    pub fn draft(&self) -> VariantDraft {
        VariantDraft {
            combination: self.combination.clone(),
            price: self.price,
            quantity: self.quantity,
            images: self.images.clone(),
            is_active: self.is_active,
        }
    }
}

/// A product together with its variants.
#[derive(Debug, Clone, Serialize)]
pub struct ProductWithVariants {
    #[serde(flatten)]
    pub product: Product,
    pub variants: Vec<ProductVariant>,
}
