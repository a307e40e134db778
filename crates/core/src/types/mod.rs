//! Core types for Vitrine.
//!
//! This module provides type-safe wrappers for common domain concepts.

pub mod credits;
pub mod email;
pub mod id;
pub mod price;
pub mod slug;
pub mod status;

pub use credits::{Credits, CreditsError, STORE_CREATION_COST};
pub use email::{Email, EmailError};
pub use id::*;
pub use price::VariantPrice;
pub use slug::{SlugError, StoreSlug};
pub use status::*;
