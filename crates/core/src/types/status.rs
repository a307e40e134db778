//! Status enums for various entities.

use serde::{Deserialize, Serialize};

/// Publication status of a marketplace theme.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[cfg_attr(feature = "postgres", derive(sqlx::Type))]
#[cfg_attr(
    feature = "postgres",
    sqlx(type_name = "vitrine.theme_status", rename_all = "snake_case")
)]
#[serde(rename_all = "snake_case")]
pub enum ThemeStatus {
    /// Visible only to its developer.
    #[default]
    Draft,
    /// Listed in the marketplace.
    Published,
}

impl std::fmt::Display for ThemeStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Draft => write!(f, "draft"),
            Self::Published => write!(f, "published"),
        }
    }
}

impl std::str::FromStr for ThemeStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "draft" => Ok(Self::Draft),
            "published" => Ok(Self::Published),
            _ => Err(format!("invalid theme status: {s}")),
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_theme_status_roundtrip_str() {
        for status in [ThemeStatus::Draft, ThemeStatus::Published] {
            assert_eq!(status.to_string().parse::<ThemeStatus>().unwrap(), status);
        }
        assert!("archived".parse::<ThemeStatus>().is_err());
    }
}
