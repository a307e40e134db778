//! Business logic services for the dashboard.
//!
//! # Services
//!
//! - `catalog` - Attributes, categories, products and variant sync
//! - `cleanup` - Cascading deletes with best-effort storage cleanup
//! - `identity` - Auth service client (bearer token to user)
//! - `store_access` - Hashed store admin credentials and session flags
//! - `store_provisioning` - Store creation behind the credit guard
//! - `themes` - Developer themes, mock catalog data and previews

pub mod catalog;
pub mod cleanup;
pub mod identity;
pub mod store_access;
pub mod store_provisioning;
pub mod themes;

pub use catalog::{CatalogError, CatalogService};
pub use cleanup::{CleanupReport, ConfirmationMismatch};
pub use identity::{IdentityClient, IdentityError};
pub use store_access::StoreAccessError;
pub use store_provisioning::{
    NewStoreRequest, StoreCreationError, StoreLedger, StoreProvisioner,
};
pub use themes::{MockSeed, ThemeError, ThemeService};
