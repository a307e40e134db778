//! Vitrine dashboard library.
//!
//! The dashboard service for store owners and theme developers, provided as
//! a library so the binary, the CLI and the integration tests share it.
//!
//! # Collaborators
//!
//! - `PostgreSQL` for stores, catalogs, themes and sessions
//! - The identity service for user accounts ([`services::identity`])
//! - Object storage for uploaded images ([`storage`])

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod config;
pub mod db;
pub mod error;
pub mod middleware;
pub mod models;
pub mod routes;
pub mod services;
pub mod state;
pub mod storage;
