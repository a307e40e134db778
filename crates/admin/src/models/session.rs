//! Session-related types for dashboard authentication.
//!
//! Types stored in the session for authentication state.

use serde::{Deserialize, Serialize};

use vitrine_core::{Email, OwnerId, StoreId};

/// A user as reported by the auth service.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuthUser {
    /// Auth user id; doubles as the owner id and developer id.
    pub id: uuid::Uuid,
    pub email: Option<String>,
    /// Free-form profile metadata from sign-up.
    #[serde(default, rename = "user_metadata")]
    pub metadata: serde_json::Value,
}

/// Session-stored identity.
///
/// Minimal data stored in the session to identify the logged-in user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CurrentUser {
    /// Auth user id.
    pub id: OwnerId,
    /// Email address, when the auth service reports a valid one.
    pub email: Option<Email>,
    /// Name shown in the dashboard header.
    pub display_name: String,
}

impl From<AuthUser> for CurrentUser {
    fn from(user: AuthUser) -> Self {
        let email = user.email.as_deref().and_then(|e| Email::parse(e).ok());
        let display_name = user
            .metadata
            .get("full_name")
            .or_else(|| user.metadata.get("name"))
            .and_then(serde_json::Value::as_str)
            .map(str::to_owned)
            .or_else(|| email.as_ref().map(ToString::to_string))
            .unwrap_or_else(|| "Store owner".to_owned());

        Self {
            id: OwnerId::new(user.id),
            email,
            display_name,
        }
    }
}

/// Stores whose admin credentials were accepted in this session.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoreAccessGrants(pub Vec<StoreId>);

/// Session keys for authentication data.
pub mod keys {
    /// Key for storing the current logged-in user.
    pub const CURRENT_USER: &str = "current_user";

    /// Key for the per-store admin access flags.
    pub const STORE_ACCESS: &str = "store_access";
}
