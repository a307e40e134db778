//! Domain models for the dashboard.
//!
//! These are validated domain objects built from database rows by the
//! repositories in [`crate::db`]. Pure catalog logic lives in
//! `vitrine_core::catalog`; the types here add ownership and timestamps.

pub mod catalog;
pub mod session;
pub mod store;
pub mod theme;

pub use catalog::{Attribute, Product, ProductCategory, ProductVariant, ProductWithVariants};
pub use session::{AuthUser, CurrentUser, StoreAccessGrants, keys as session_keys};
pub use store::{NewStore, OwnerProfile, Store};
pub use theme::{Theme, ThemeCategory, ThemeDeveloper, ThemeProduct};
