//! Theme mock data seeding.
//!
//! The seed file is YAML:
//!
//! ```yaml
//! settings:
//!   discount: { enabled: true, percent: 20, share: 0.5 }
//!   rating: { enabled: true, min: 3.5, max: 5.0, max_reviews: 120 }
//! categories:
//!   - name: Apparel
//!   - name: T-Shirts
//!     parent: Apparel
//! products:
//!   - name: Basic Tee
//!     category: T-Shirts
//!     price: "19.99"
//! ```
//!
//! The whole file is validated before the database is touched, and the
//! theme's existing mock data is replaced in one transaction.

use std::path::Path;

use uuid::Uuid;

use vitrine_admin::db::ThemeRepository;
use vitrine_admin::services::MockSeed;
use vitrine_admin::services::themes::SeedPlan;
use vitrine_core::ThemeId;

use super::{CliError, connect};

/// Parse and validate a seed file.
///
/// # Errors
///
/// Returns `CliError::Yaml` for malformed YAML and `CliError::Seed` for
/// invalid data.
pub fn load_plan(content: &str) -> Result<SeedPlan, CliError> {
    let seed: MockSeed = serde_yaml::from_str(content)?;
    Ok(seed.plan()?)
}

/// Replace a theme's mock data with the contents of `file`.
///
/// # Errors
///
/// Returns an error if the file is invalid, the theme does not exist or the
/// database write fails.
pub async fn seed_mock(theme: Uuid, file: &str) -> Result<(), CliError> {
    let content = tokio::fs::read_to_string(Path::new(file))
        .await
        .map_err(|source| CliError::Io {
            path: file.to_owned(),
            source,
        })?;
    let plan = load_plan(&content)?;
    tracing::info!(
        categories = plan.categories.len(),
        products = plan.products.len(),
        "Seed file validated"
    );

    let theme = ThemeId::new(theme);
    let pool = connect().await?;
    let repo = ThemeRepository::new(&pool);
    if repo.find_theme(theme).await?.is_none() {
        return Err(CliError::NotFound(format!("theme {theme} does not exist")));
    }

    repo.replace_mock_data(theme, &plan.categories, &plan.products, &plan.settings)
        .await?;

    tracing::info!(theme_id = %theme, "Mock data replaced");
    Ok(())
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::indexing_slicing)]
mod tests {
    use super::*;

    #[test]
    fn test_load_plan_orders_parents_first() {
        let plan = load_plan(
            r#"
categories:
  - name: T-Shirts
    parent: Apparel
  - name: Apparel
products:
  - name: Basic Tee
    category: T-Shirts
    price: "19.99"
"#,
        )
        .unwrap();

        assert_eq!(plan.categories.len(), 2);
        assert_eq!(plan.categories[0].1.name, "Apparel");
        assert_eq!(plan.categories[1].1.parent_id, Some(plan.categories[0].0));
        assert_eq!(plan.products[0].category_id, Some(plan.categories[1].0));
    }

    #[test]
    fn test_load_plan_rejects_unknown_keys() {
        let err = load_plan("colours: [red]\n").unwrap_err();
        assert!(matches!(err, CliError::Yaml(_)));
    }

    #[test]
    fn test_load_plan_rejects_unknown_category() {
        let err = load_plan(
            r#"
products:
  - name: Basic Tee
    category: Missing
    price: "5"
"#,
        )
        .unwrap_err();
        assert!(matches!(err, CliError::Seed(_)));
    }
}
