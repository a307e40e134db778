//! Catalog logic shared by real stores and theme mock data.
//!
//! - [`attributes`] - Built-in attribute names and first-use creation
//! - [`variants`] - Cartesian variant generation and upsert-and-prune planning
//! - [`categories`] - Parent/child category trees with cycle detection

pub mod attributes;
pub mod categories;
pub mod variants;

pub use attributes::{COMMON_ATTRIBUTES, missing_attributes};
pub use categories::{
    CategoryNode, CategoryTreeError, FlatCategory, MAX_CATEGORY_DEPTH, flatten, select_options,
    validate_parent, validate_tree,
};
pub use variants::{
    AttributeSelection, Combination, VariantDefaults, VariantDraft, VariantError, VariantSyncPlan,
    active_attributes, generate_combinations, generate_variants, plan_variant_sync,
    regenerate_variants, total_quantity, validate_drafts,
};
