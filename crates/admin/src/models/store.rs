//! Store and owner domain types.

use chrono::{DateTime, Utc};
use serde::Serialize;

use vitrine_core::{Credits, Email, OwnerId, StoreId, StoreSlug};

/// A store owner's profile (domain type).
#[derive(Debug, Clone, Serialize)]
pub struct OwnerProfile {
    /// Auth user id.
    pub id: OwnerId,
    /// Credit balance.
    pub credits: Credits,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// A store (domain type).
#[derive(Debug, Clone, Serialize)]
pub struct Store {
    pub id: StoreId,
    pub owner_id: OwnerId,
    pub slug: StoreSlug,
    pub name: String,
    pub contact_email: Email,
    /// Username for the store's admin area, if credentials were set.
    pub access_username: Option<String>,
    /// Argon2 PHC string. Never serialized.
    #[serde(skip)]
    pub access_password_hash: Option<String>,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Store {
    /// Whether a username and password have been configured.
    #[must_use]
    pub const fn has_access_credentials(&self) -> bool {
        self.access_username.is_some() && self.access_password_hash.is_some()
    }
}

/// Fields for a store about to be inserted.
#[derive(Debug, Clone)]
pub struct NewStore {
    pub owner_id: OwnerId,
    pub slug: StoreSlug,
    pub name: String,
    pub contact_email: Email,
    pub access_username: Option<String>,
    pub access_password_hash: Option<String>,
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_password_hash_is_never_serialized() {
        let store = Store {
            id: StoreId::generate(),
            owner_id: OwnerId::generate(),
            slug: StoreSlug::parse("corner-shop").unwrap(),
            name: "Corner Shop".to_owned(),
            contact_email: Email::parse("hi@corner.test").unwrap(),
            access_username: Some("manager".to_owned()),
            access_password_hash: Some("$argon2id$v=19$m=19456,t=2,p=1$abc$def".to_owned()),
            is_active: true,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        };

        let json = serde_json::to_string(&store).unwrap();
        assert!(json.contains("manager"));
        assert!(!json.contains("argon2"));
        assert!(store.has_access_credentials());
    }
}
