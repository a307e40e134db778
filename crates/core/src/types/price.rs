//! Variant pricing.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// How a variant is priced relative to its product.
///
/// Serialized as `{"mode": "use_base"}` or
/// `{"mode": "override", "amount": "12.50"}`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(tag = "mode", content = "amount", rename_all = "snake_case")]
pub enum VariantPrice {
    /// Follow the product's base price, including later changes to it.
    #[default]
    UseBase,
    /// A fixed price for this variant only.
    Override(Decimal),
}

impl VariantPrice {
    /// Resolve the price a customer pays given the product's base price.
    #[must_use]
    pub const fn effective(self, base_price: Decimal) -> Decimal {
        match self {
            Self::UseBase => base_price,
            Self::Override(amount) => amount,
        }
    }

    /// Split into the `(use_base_price, price)` column pair used in storage.
    #[must_use]
    pub const fn to_columns(self) -> (bool, Option<Decimal>) {
        match self {
            Self::UseBase => (true, None),
            Self::Override(amount) => (false, Some(amount)),
        }
    }

    /// Rebuild from the storage column pair. A row flagged as an override but
    /// missing its amount falls back to the base price.
    #[must_use]
    pub const fn from_columns(use_base_price: bool, price: Option<Decimal>) -> Self {
        match (use_base_price, price) {
            (false, Some(amount)) => Self::Override(amount),
            _ => Self::UseBase,
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_effective_price() {
        let base = Decimal::new(1999, 2);
        assert_eq!(VariantPrice::UseBase.effective(base), base);
        assert_eq!(
            VariantPrice::Override(Decimal::new(2499, 2)).effective(base),
            Decimal::new(2499, 2)
        );
    }

    #[test]
    fn test_columns() {
        let price = VariantPrice::Override(Decimal::new(500, 2));
        let (use_base, amount) = price.to_columns();
        assert_eq!(VariantPrice::from_columns(use_base, amount), price);
        assert_eq!(VariantPrice::from_columns(false, None), VariantPrice::UseBase);
    }

    #[test]
    fn test_json_shape() {
        let json = serde_json::to_value(VariantPrice::UseBase).unwrap();
        assert_eq!(json, serde_json::json!({"mode": "use_base"}));

        let parsed: VariantPrice =
            serde_json::from_str(r#"{"mode":"override","amount":"12.50"}"#).unwrap();
        assert_eq!(parsed, VariantPrice::Override(Decimal::new(1250, 2)));
    }
}
