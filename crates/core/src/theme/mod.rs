//! Theme preview mock data.
//!
//! A theme's settings blob controls how placeholder products look in the
//! preview builder: a share of products shown on sale and simulated star
//! ratings. The simulation is seeded from the product id so a given product
//! always previews the same way.

use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::types::ThemeProductId;

/// Simulated "on sale" pricing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DiscountSimulation {
    pub enabled: bool,
    /// Discount applied to products that are on sale, 1-90.
    pub percent: u8,
    /// Fraction of products shown on sale, 0.0-1.0.
    pub share: f64,
}

impl Default for DiscountSimulation {
    fn default() -> Self {
        Self {
            enabled: false,
            percent: 20,
            share: 0.3,
        }
    }
}

/// Simulated customer ratings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RatingSimulation {
    pub enabled: bool,
    pub min: f64,
    pub max: f64,
    pub max_reviews: u32,
}

impl Default for RatingSimulation {
    fn default() -> Self {
        Self {
            enabled: false,
            min: 3.5,
            max: 5.0,
            max_reviews: 250,
        }
    }
}

/// Mock display settings stored on a theme.
///
/// Unknown keys are preserved so theme-specific options survive a round trip.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MockSettings {
    pub discount: DiscountSimulation,
    pub rating: RatingSimulation,
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

/// Invalid mock settings.
#[derive(thiserror::Error, Debug, Clone, PartialEq)]
pub enum MockSettingsError {
    #[error("discount percent must be between {min} and {max} (got {value})")]
    DiscountPercent { value: u8, min: u8, max: u8 },
    #[error("discount share must be between 0 and 1 (got {0})")]
    DiscountShare(f64),
    #[error("ratings must be between 0 and {max} (got {value})")]
    RatingOutOfRange { value: f64, max: f64 },
    #[error("minimum rating {min} exceeds maximum {max}")]
    RatingOrder { min: f64, max: f64 },
}

impl MockSettings {
    /// Smallest allowed discount percent.
    pub const MIN_DISCOUNT: u8 = 1;
    /// Largest allowed discount percent.
    pub const MAX_DISCOUNT: u8 = 90;
    /// Top of the rating scale.
    pub const MAX_RATING: f64 = 5.0;

    /// Check ranges. Disabled simulations are still validated so toggling
    /// them on later cannot surface bad values.
    ///
    /// # Errors
    ///
    /// Returns the first [`MockSettingsError`] found.
    pub fn validate(&self) -> Result<(), MockSettingsError> {
        let d = &self.discount;
        if !(Self::MIN_DISCOUNT..=Self::MAX_DISCOUNT).contains(&d.percent) {
            return Err(MockSettingsError::DiscountPercent {
                value: d.percent,
                min: Self::MIN_DISCOUNT,
                max: Self::MAX_DISCOUNT,
            });
        }
        if !(0.0..=1.0).contains(&d.share) {
            return Err(MockSettingsError::DiscountShare(d.share));
        }

        let r = &self.rating;
        for value in [r.min, r.max] {
            if !(0.0..=Self::MAX_RATING).contains(&value) {
                return Err(MockSettingsError::RatingOutOfRange {
                    value,
                    max: Self::MAX_RATING,
                });
            }
        }
        if r.min > r.max {
            return Err(MockSettingsError::RatingOrder {
                min: r.min,
                max: r.max,
            });
        }
        Ok(())
    }
}

/// How a placeholder product renders in the preview.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MockDisplay {
    /// Original price shown struck through, when on sale.
    pub compare_at_price: Option<Decimal>,
    /// Price the customer would pay.
    pub sale_price: Decimal,
    /// Star rating rounded to one decimal, when ratings are simulated.
    pub rating: Option<f64>,
    pub review_count: Option<u32>,
}

/// Deterministically simulate the display of one mock product.
#[must_use]
pub fn simulate_display(
    product_id: ThemeProductId,
    price: Decimal,
    settings: &MockSettings,
) -> MockDisplay {
    let digest = Sha256::digest(product_id.as_uuid().as_bytes());
    let fraction = |i: usize| -> f64 {
        let hi = digest.get(i).copied().unwrap_or(0);
        let lo = digest.get(i + 1).copied().unwrap_or(0);
        f64::from(u16::from_be_bytes([hi, lo])) / f64::from(u16::MAX)
    };

    let discount = &settings.discount;
    let on_sale = discount.enabled && discount.share > 0.0 && fraction(0) < discount.share;
    let (compare_at_price, sale_price) = if on_sale {
        let keep = Decimal::from(100 - u32::from(discount.percent.min(100)));
        let discounted = (price * keep / Decimal::ONE_HUNDRED)
            .round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero);
        (Some(price), discounted)
    } else {
        (None, price)
    };

    let rating_settings = &settings.rating;
    let (rating, review_count) = if rating_settings.enabled {
        let raw = (rating_settings.max - rating_settings.min)
            .mul_add(fraction(2), rating_settings.min);
        let rating = (raw * 10.0).round() / 10.0;
        let scaled = u64::from(u16::from_be_bytes([
            digest.get(4).copied().unwrap_or(0),
            digest.get(5).copied().unwrap_or(0),
        ])) * u64::from(rating_settings.max_reviews)
            / u64::from(u16::MAX);
        let reviews = u32::try_from(scaled).unwrap_or(rating_settings.max_reviews);
        (Some(rating), Some(reviews))
    } else {
        (None, None)
    };

    MockDisplay {
        compare_at_price,
        sale_price,
        rating,
        review_count,
    }
}

/// Reasons a theme cannot be published yet.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum PublishError {
    #[error("a published theme needs a name")]
    MissingName,
    #[error("theme price cannot be negative")]
    NegativePrice,
    #[error("a published theme needs a preview image")]
    MissingPreview,
}

/// Check that a theme has what the marketplace listing requires.
///
/// # Errors
///
/// Returns the first missing requirement.
pub fn check_publishable(
    name: &str,
    price: Decimal,
    preview_image_url: Option<&str>,
) -> Result<(), PublishError> {
    if name.trim().is_empty() {
        return Err(PublishError::MissingName);
    }
    if price < Decimal::ZERO {
        return Err(PublishError::NegativePrice);
    }
    if preview_image_url.is_none_or(|u| u.trim().is_empty()) {
        return Err(PublishError::MissingPreview);
    }
    Ok(())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn enabled() -> MockSettings {
        MockSettings {
            discount: DiscountSimulation {
                enabled: true,
                percent: 25,
                share: 1.0,
            },
            rating: RatingSimulation {
                enabled: true,
                min: 4.0,
                max: 5.0,
                max_reviews: 100,
            },
            extra: serde_json::Map::new(),
        }
    }

    #[test]
    fn test_defaults_validate() {
        assert!(MockSettings::default().validate().is_ok());
    }

    #[test]
    fn test_validate_ranges() {
        let mut s = enabled();
        s.discount.percent = 0;
        assert!(matches!(
            s.validate(),
            Err(MockSettingsError::DiscountPercent { value: 0, .. })
        ));

        let mut s = enabled();
        s.discount.share = 1.5;
        assert_eq!(s.validate(), Err(MockSettingsError::DiscountShare(1.5)));

        let mut s = enabled();
        s.rating.max = 6.0;
        assert!(matches!(
            s.validate(),
            Err(MockSettingsError::RatingOutOfRange { .. })
        ));

        let mut s = enabled();
        s.rating.min = 5.0;
        s.rating.max = 4.0;
        assert!(matches!(s.validate(), Err(MockSettingsError::RatingOrder { .. })));
    }

    #[test]
    fn test_simulation_is_deterministic() {
        let id = ThemeProductId::generate();
        let price = Decimal::new(4000, 2);
        let settings = enabled();
        assert_eq!(
            simulate_display(id, price, &settings),
            simulate_display(id, price, &settings)
        );
    }

    #[test]
    fn test_full_share_puts_everything_on_sale() {
        let display = simulate_display(ThemeProductId::generate(), Decimal::new(4000, 2), &enabled());
        assert_eq!(display.compare_at_price, Some(Decimal::new(4000, 2)));
        assert_eq!(display.sale_price, Decimal::new(3000, 2));

        let rating = display.rating.unwrap();
        assert!((4.0..=5.0).contains(&rating));
        assert!(display.review_count.unwrap() <= 100);
    }

    #[test]
    fn test_disabled_simulation_shows_plain_price() {
        let display = simulate_display(
            ThemeProductId::generate(),
            Decimal::new(1999, 2),
            &MockSettings::default(),
        );
        assert_eq!(display.compare_at_price, None);
        assert_eq!(display.sale_price, Decimal::new(1999, 2));
        assert_eq!(display.rating, None);
    }

    #[test]
    fn test_unknown_keys_survive_round_trip() {
        let json = r#"{"discount":{"enabled":true,"percent":10,"share":0.5},"hero_layout":"split"}"#;
        let settings: MockSettings = serde_json::from_str(json).unwrap();
        assert_eq!(settings.discount.percent, 10);
        assert!(!settings.rating.enabled);
        let back = serde_json::to_value(&settings).unwrap();
        assert_eq!(back["hero_layout"], "split");
    }

    #[test]
    fn test_publish_requirements() {
        assert_eq!(
            check_publishable(" ", Decimal::ONE, Some("x")),
            Err(PublishError::MissingName)
        );
        assert_eq!(
            check_publishable("Aurora", Decimal::NEGATIVE_ONE, Some("x")),
            Err(PublishError::NegativePrice)
        );
        assert_eq!(
            check_publishable("Aurora", Decimal::ZERO, None),
            Err(PublishError::MissingPreview)
        );
        assert!(check_publishable("Aurora", Decimal::ZERO, Some("https://cdn/x.png")).is_ok());
    }
}
