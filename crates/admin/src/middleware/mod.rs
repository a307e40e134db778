//! HTTP middleware and extractors for the dashboard.
//!
//! # Layer order (outermost first)
//!
//! 1. Sentry layers (hub per request, HTTP transaction)
//! 2. `TraceLayer` (request span with status and latency)
//! 3. Session layer (tower-sessions with `PostgreSQL` store)
//!
//! Authentication is done per handler with the [`RequireUser`] extractor;
//! store-scoped handlers use [`RequireStoreOwner`] or [`RequireStoreAccess`].

pub mod auth;
pub mod session;
pub mod store_access;

pub use auth::{OptionalUser, RequireUser, clear_current_user, set_current_user};
pub use session::{SESSION_COOKIE_NAME, create_session_layer};
pub use store_access::{RequireStoreAccess, RequireStoreOwner};
