//! Theme marketplace domain types.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Serialize;

use vitrine_core::catalog::CategoryNode;
use vitrine_core::theme::MockSettings;
use vitrine_core::{
    CategoryId, ThemeCategoryId, ThemeDeveloperId, ThemeId, ThemeProductId, ThemeStatus,
};

/// A theme developer's public profile.
#[derive(Debug, Clone, Serialize)]
pub struct ThemeDeveloper {
    pub id: ThemeDeveloperId,
    pub display_name: String,
    pub website: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// A sellable theme.
#[derive(Debug, Clone, Serialize)]
pub struct Theme {
    pub id: ThemeId,
    pub developer_id: ThemeDeveloperId,
    pub name: String,
    pub description: String,
    pub price: Decimal,
    pub preview_image_url: Option<String>,
    pub status: ThemeStatus,
    pub settings: MockSettings,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// A placeholder category shown in a theme preview.
#[derive(Debug, Clone, Serialize)]
pub struct ThemeCategory {
    pub id: ThemeCategoryId,
    pub theme_id: ThemeId,
    pub name: String,
    pub parent_id: Option<ThemeCategoryId>,
    pub is_active: bool,
}

impl ThemeCategory {
    /// The hierarchy view of this category.
    #[must_use]
    pub fn node(&self) -> CategoryNode {
        CategoryNode {
            id: CategoryId::new(self.id.as_uuid()),
            name: self.name.clone(),
            parent_id: self.parent_id.map(|p| CategoryId::new(p.as_uuid())),
            is_active: self.is_active,
        }
    }
}

/// A placeholder product shown in a theme preview.
#[derive(Debug, Clone, Serialize)]
pub struct ThemeProduct {
    pub id: ThemeProductId,
    pub theme_id: ThemeId,
    pub category_id: Option<ThemeCategoryId>,
    pub name: String,
    pub description: String,
    pub images: Vec<String>,
    pub price: Decimal,
    pub is_active: bool,
}
