//! Vitrine Core - Shared types and catalog logic.
//!
//! This crate provides the types and pure domain logic used across all
//! Vitrine components:
//! - `admin` - Store owner and theme developer dashboard service
//! - `cli` - Command-line tools for migrations and management
//!
//! # Architecture
//!
//! The core crate contains only types, traits and pure functions - no I/O, no
//! database access, no HTTP clients. Everything here is deterministic and can
//! be tested without a running backend.
//!
//! # Modules
//!
//! - [`types`] - Newtype wrappers for IDs, slugs, emails, credits and statuses
//! - [`catalog`] - Variant combination generation and category trees
//! - [`theme`] - Mock display settings for theme previews

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod catalog;
pub mod theme;
pub mod types;

pub use types::*;
