//! Variant combination generation.
//!
//! An operator picks attributes (e.g. Size, Color) and enters values for each.
//! Every combination of values becomes one sellable variant. With no
//! attributes a product still has exactly one variant with an empty
//! combination (the "standard SKU").
//!
//! Persisting a new variant set is planned as a diff against what is already
//! stored ([`plan_variant_sync`]) so that unchanged variants keep their IDs
//! and the product never passes through a state with zero variants.

use std::collections::BTreeMap;

use indexmap::IndexMap;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::types::{VariantId, VariantPrice};

/// Upper bound on the number of variants a single product may carry.
pub const MAX_VARIANTS: usize = 250;

/// An attribute chosen for a product together with the values entered for it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttributeSelection {
    /// Attribute name, e.g. "Size".
    pub name: String,
    /// Values in entry order, e.g. `["S", "M", "L"]`.
    #[serde(default)]
    pub values: Vec<String>,
}

impl AttributeSelection {
    /// Convenience constructor.
    #[must_use]
    pub fn new<N, I, V>(name: N, values: I) -> Self
    where
        N: Into<String>,
        I: IntoIterator<Item = V>,
        V: Into<String>,
    {
        Self {
            name: name.into(),
            values: values.into_iter().map(Into::into).collect(),
        }
    }
}

/// Attribute name → chosen value for one variant.
///
/// Keys keep selection order for display, but equality ignores order:
/// `{Size: S, Color: Red}` equals `{Color: Red, Size: S}`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Combination(IndexMap<String, String>);

impl Combination {
    /// An empty combination (the single base variant).
    #[must_use]
    pub fn new() -> Self {
        Self(IndexMap::new())
    }

    /// Set the value for an attribute.
    pub fn insert(&mut self, attribute: impl Into<String>, value: impl Into<String>) {
        self.0.insert(attribute.into(), value.into());
    }

    /// The value chosen for `attribute`, if any.
    #[must_use]
    pub fn get(&self, attribute: &str) -> Option<&str> {
        self.0.get(attribute).map(String::as_str)
    }

    /// Number of attributes in this combination.
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Whether this is the base (attribute-less) combination.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Attribute/value pairs in selection order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// Attribute names in selection order.
    pub fn attribute_names(&self) -> impl Iterator<Item = &str> {
        self.0.keys().map(String::as_str)
    }

    /// Human-readable label, e.g. "S / Red". The base variant is "Default".
    #[must_use]
    pub fn label(&self) -> String {
        if self.0.is_empty() {
            return "Default".to_owned();
        }
        self.0
            .values()
            .map(String::as_str)
            .collect::<Vec<_>>()
            .join(" / ")
    }

    /// Order-independent key, used to match combinations across edits.
    fn canonical_key(&self) -> Vec<(String, String)> {
        let mut pairs: Vec<(String, String)> = self
            .0
            .iter()
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect();
        pairs.sort();
        pairs
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for Combination {
    fn from_iter<T: IntoIterator<Item = (K, V)>>(iter: T) -> Self {
        Self(
            iter.into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        )
    }
}

const fn default_true() -> bool {
    true
}

/// A variant as configured by the operator, before or after persistence.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VariantDraft {
    /// The attribute values identifying this variant.
    #[serde(default)]
    pub combination: Combination,
    /// Explicit price or "use base price".
    #[serde(default)]
    pub price: VariantPrice,
    /// Units in stock.
    #[serde(default)]
    pub quantity: i32,
    /// Public image URLs.
    #[serde(default)]
    pub images: Vec<String>,
    /// Whether the variant can be sold.
    #[serde(default = "default_true")]
    pub is_active: bool,
}

impl VariantDraft {
    /// A fresh draft for `combination`, seeded from `defaults`.
    #[must_use]
    pub fn seeded(combination: Combination, defaults: &VariantDefaults) -> Self {
        Self {
            combination,
            price: defaults.price,
            quantity: defaults.quantity,
            images: Vec::new(),
            is_active: true,
        }
    }

    /// The price a customer pays given the product's base price.
    #[must_use]
    pub const fn effective_price(&self, base_price: Decimal) -> Decimal {
        self.price.effective(base_price)
    }
}

/// The most recently entered base values, used to seed new variants.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct VariantDefaults {
    /// Price applied to freshly generated variants.
    #[serde(default)]
    pub price: VariantPrice,
    /// Stock applied to freshly generated variants.
    #[serde(default)]
    pub quantity: i32,
}

/// Errors found when validating a variant set.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum VariantError {
    /// A product must have at least one variant.
    #[error("a product must have at least one variant")]
    Empty,
    /// More variants than [`MAX_VARIANTS`].
    #[error("{count} variants exceeds the limit of {max}")]
    TooMany {
        /// Number of variants requested.
        count: usize,
        /// Allowed maximum.
        max: usize,
    },
    /// An override price below zero.
    #[error("variant {label:?} has a negative price")]
    NegativePrice {
        /// Label of the offending variant.
        label: String,
    },
    /// A stock count below zero.
    #[error("variant {label:?} has a negative quantity")]
    NegativeQuantity {
        /// Label of the offending variant.
        label: String,
    },
    /// Two variants share a combination.
    #[error("duplicate variant {label:?}")]
    DuplicateCombination {
        /// Label of the duplicated combination.
        label: String,
    },
    /// Variants do not all use the same attribute names.
    #[error("variant {label:?} does not use the same attributes as the others")]
    MismatchedAttributes {
        /// Label of the offending variant.
        label: String,
    },
}

/// Normalize attribute selections into the set that takes part in generation.
///
/// Names and values are trimmed. Empty values and repeated values are dropped
/// (first occurrence wins), selections with a blank name or no values left are
/// skipped, and a repeated attribute name is merged into its first occurrence.
#[must_use]
pub fn active_attributes(selections: &[AttributeSelection]) -> Vec<AttributeSelection> {
    let mut active: Vec<AttributeSelection> = Vec::new();

    for selection in selections {
        let name = selection.name.trim();
        if name.is_empty() {
            continue;
        }

        let position = active.iter().position(|a| a.name == name);
        let target = if let Some(i) = position {
            i
        } else {
            active.push(AttributeSelection {
                name: name.to_owned(),
                values: Vec::new(),
            });
            active.len() - 1
        };

        let Some(entry) = active.get_mut(target) else {
            continue;
        };
        for value in &selection.values {
            let value = value.trim();
            if !value.is_empty() && !entry.values.iter().any(|v| v == value) {
                entry.values.push(value.to_owned());
            }
        }
    }

    active.retain(|a| !a.values.is_empty());
    active
}

/// Number of combinations `selections` would produce, saturating on overflow.
#[must_use]
pub fn combination_count(selections: &[AttributeSelection]) -> usize {
    active_attributes(selections)
        .iter()
        .fold(1_usize, |acc, a| acc.saturating_mul(a.values.len()))
}

/// Every combination of the active attributes' values.
///
/// Attributes vary slowest-first in selection order, values in entry order:
/// `{Size: [S, M], Color: [Red, Blue]}` yields S/Red, S/Blue, M/Red, M/Blue.
/// With no active attributes the result is a single empty combination.
#[must_use]
pub fn generate_combinations(selections: &[AttributeSelection]) -> Vec<Combination> {
    let mut combinations = vec![Combination::new()];

    for attribute in active_attributes(selections) {
        let mut extended = Vec::with_capacity(combinations.len() * attribute.values.len());
        for partial in &combinations {
            for value in &attribute.values {
                let mut next = partial.clone();
                next.insert(attribute.name.clone(), value.clone());
                extended.push(next);
            }
        }
        combinations = extended;
    }

    combinations
}

/// One seeded draft per combination.
#[must_use]
pub fn generate_variants(
    selections: &[AttributeSelection],
    defaults: &VariantDefaults,
) -> Vec<VariantDraft> {
    generate_combinations(selections)
        .into_iter()
        .map(|combination| VariantDraft::seeded(combination, defaults))
        .collect()
}

/// Regenerate after the attributes changed, keeping operator input.
///
/// A combination that already existed in `previous` keeps that draft's price,
/// quantity, images and active flag; new combinations are seeded from
/// `defaults`. Clearing every attribute collapses back to one base variant.
#[must_use]
pub fn regenerate_variants(
    previous: &[VariantDraft],
    selections: &[AttributeSelection],
    defaults: &VariantDefaults,
) -> Vec<VariantDraft> {
    let mut by_key: BTreeMap<Vec<(String, String)>, &VariantDraft> = BTreeMap::new();
    for draft in previous {
        by_key.entry(draft.combination.canonical_key()).or_insert(draft);
    }

    generate_combinations(selections)
        .into_iter()
        .map(|combination| match by_key.get(&combination.canonical_key()) {
            Some(existing) => VariantDraft {
                combination,
                ..(*existing).clone()
            },
            None => VariantDraft::seeded(combination, defaults),
        })
        .collect()
}

/// Sum of stock across variants; the product's aggregate quantity.
#[must_use]
pub fn total_quantity(drafts: &[VariantDraft]) -> i64 {
    drafts.iter().map(|d| i64::from(d.quantity.max(0))).sum()
}

/// Check a variant set before it is persisted.
///
/// # Errors
///
/// Returns the first [`VariantError`] found.
pub fn validate_drafts(drafts: &[VariantDraft]) -> Result<(), VariantError> {
    let Some(first) = drafts.first() else {
        return Err(VariantError::Empty);
    };
    if drafts.len() > MAX_VARIANTS {
        return Err(VariantError::TooMany {
            count: drafts.len(),
            max: MAX_VARIANTS,
        });
    }

    let mut expected: Vec<&str> = first.combination.attribute_names().collect();
    expected.sort_unstable();

    let mut seen: BTreeMap<Vec<(String, String)>, ()> = BTreeMap::new();
    for draft in drafts {
        let label = draft.combination.label();

        let mut names: Vec<&str> = draft.combination.attribute_names().collect();
        names.sort_unstable();
        if names != expected {
            return Err(VariantError::MismatchedAttributes { label });
        }
        if matches!(draft.price, VariantPrice::Override(amount) if amount < Decimal::ZERO) {
            return Err(VariantError::NegativePrice { label });
        }
        if draft.quantity < 0 {
            return Err(VariantError::NegativeQuantity { label });
        }
        if seen
            .insert(draft.combination.canonical_key(), ())
            .is_some()
        {
            return Err(VariantError::DuplicateCombination { label });
        }
    }

    Ok(())
}

/// Changes needed to turn the stored variant set into the desired one.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct VariantSyncPlan {
    /// Stored variants whose combination is still wanted, with new values.
    pub updates: Vec<(VariantId, VariantDraft)>,
    /// Combinations that do not exist yet.
    pub inserts: Vec<VariantDraft>,
    /// Stored variants no longer wanted.
    pub deletes: Vec<VariantId>,
}

impl VariantSyncPlan {
    /// Whether applying the plan would change nothing structurally.
    #[must_use]
    pub fn is_noop(&self) -> bool {
        self.inserts.is_empty() && self.deletes.is_empty() && self.updates.is_empty()
    }
}

/// Diff stored variants against the desired set (upsert-and-prune).
///
/// Matching is by combination. If storage holds several rows with the same
/// combination, the first is updated and the rest are pruned.
#[must_use]
pub fn plan_variant_sync(
    existing: &[(VariantId, Combination)],
    desired: Vec<VariantDraft>,
) -> VariantSyncPlan {
    let mut stored: BTreeMap<Vec<(String, String)>, VariantId> = BTreeMap::new();
    let mut plan = VariantSyncPlan::default();

    for (id, combination) in existing {
        if stored.contains_key(&combination.canonical_key()) {
            plan.deletes.push(*id);
        } else {
            stored.insert(combination.canonical_key(), *id);
        }
    }

    for draft in desired {
        match stored.remove(&draft.combination.canonical_key()) {
            Some(id) => plan.updates.push((id, draft)),
            None => plan.inserts.push(draft),
        }
    }

    plan.deletes.extend(stored.into_values());
    plan
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::indexing_slicing)]
mod tests {
    use super::*;

    fn combo(pairs: &[(&str, &str)]) -> Combination {
        pairs.iter().copied().collect()
    }

    #[test]
    fn test_no_attributes_gives_single_base_variant() {
        let combos = generate_combinations(&[]);
        assert_eq!(combos.len(), 1);
        assert!(combos[0].is_empty());
        assert_eq!(combos[0].label(), "Default");
    }

    #[test]
    fn test_attributes_without_values_do_not_participate() {
        let selections = vec![
            AttributeSelection::new("Size", ["S", "M"]),
            AttributeSelection::new("Color", Vec::<String>::new()),
            AttributeSelection::new("Material", ["", "  "]),
        ];
        let combos = generate_combinations(&selections);
        assert_eq!(combos.len(), 2);
        assert!(combos.iter().all(|c| c.len() == 1));
    }

    #[test]
    fn test_count_is_product_of_value_counts() {
        let selections = vec![
            AttributeSelection::new("Size", ["S", "M", "L"]),
            AttributeSelection::new("Color", ["Red", "Blue"]),
            AttributeSelection::new("Material", ["Cotton", "Linen", "Wool", "Silk"]),
        ];
        let combos = generate_combinations(&selections);
        assert_eq!(combos.len(), 3 * 2 * 4);
        assert_eq!(combination_count(&selections), 24);

        for (i, a) in combos.iter().enumerate() {
            assert_eq!(a.len(), 3);
            for b in combos.iter().skip(i + 1) {
                assert_ne!(a, b);
            }
        }
    }

    #[test]
    fn test_order_follows_selection_then_entry() {
        let selections = vec![
            AttributeSelection::new("Size", ["S", "M"]),
            AttributeSelection::new("Color", ["Red", "Blue"]),
        ];
        let labels: Vec<String> = generate_combinations(&selections)
            .iter()
            .map(Combination::label)
            .collect();
        assert_eq!(labels, ["S / Red", "S / Blue", "M / Red", "M / Blue"]);
    }

    #[test]
    fn test_duplicate_values_are_deduplicated() {
        let selections = vec![AttributeSelection::new("Size", ["S", " S", "M", "S"])];
        let active = active_attributes(&selections);
        assert_eq!(active[0].values, ["S", "M"]);
        assert_eq!(generate_combinations(&selections).len(), 2);
    }

    #[test]
    fn test_repeated_attribute_names_merge() {
        let selections = vec![
            AttributeSelection::new("Size", ["S"]),
            AttributeSelection::new("Size ", ["M", "S"]),
        ];
        let active = active_attributes(&selections);
        assert_eq!(active.len(), 1);
        assert_eq!(active[0].values, ["S", "M"]);
    }

    #[test]
    fn test_size_color_scenario_inherits_base_price() {
        let selections = vec![
            AttributeSelection::new("Size", ["S", "M"]),
            AttributeSelection::new("Color", ["Red"]),
        ];
        let defaults = VariantDefaults {
            price: VariantPrice::UseBase,
            quantity: 5,
        };
        let variants = generate_variants(&selections, &defaults);

        assert_eq!(variants.len(), 2);
        assert_eq!(variants[0].combination, combo(&[("Size", "S"), ("Color", "Red")]));
        assert_eq!(variants[1].combination, combo(&[("Size", "M"), ("Color", "Red")]));

        let base = Decimal::new(2500, 2);
        for v in &variants {
            assert_eq!(v.effective_price(base), base);
            assert_eq!(v.quantity, 5);
        }
        assert_eq!(total_quantity(&variants), 10);
    }

    #[test]
    fn test_combination_equality_ignores_order() {
        assert_eq!(
            combo(&[("Size", "S"), ("Color", "Red")]),
            combo(&[("Color", "Red"), ("Size", "S")])
        );
    }

    #[test]
    fn test_regenerate_keeps_operator_input() {
        let defaults = VariantDefaults {
            price: VariantPrice::UseBase,
            quantity: 1,
        };
        let mut previous = generate_variants(&[AttributeSelection::new("Size", ["S", "M"])], &defaults);
        previous[1].quantity = 42;
        previous[1].price = VariantPrice::Override(Decimal::new(1500, 2));
        previous[1].images = vec!["https://cdn.example/m.png".to_owned()];

        let new_defaults = VariantDefaults {
            price: VariantPrice::UseBase,
            quantity: 7,
        };
        let regenerated = regenerate_variants(
            &previous,
            &[AttributeSelection::new("Size", ["S", "M", "L"])],
            &new_defaults,
        );

        assert_eq!(regenerated.len(), 3);
        assert_eq!(regenerated[0].quantity, 1);
        assert_eq!(regenerated[1].quantity, 42);
        assert_eq!(regenerated[1].price, VariantPrice::Override(Decimal::new(1500, 2)));
        assert_eq!(regenerated[1].images.len(), 1);
        assert_eq!(regenerated[2].quantity, 7);
    }

    #[test]
    fn test_clearing_attributes_collapses_to_base_variant() {
        let defaults = VariantDefaults::default();
        let previous = generate_variants(
            &[AttributeSelection::new("Color", ["Red", "Blue"])],
            &defaults,
        );
        let regenerated = regenerate_variants(&previous, &[], &defaults);
        assert_eq!(regenerated.len(), 1);
        assert!(regenerated[0].combination.is_empty());
    }

    #[test]
    fn test_validate_rejects_bad_sets() {
        assert_eq!(validate_drafts(&[]), Err(VariantError::Empty));

        let defaults = VariantDefaults::default();
        let mut drafts = generate_variants(&[AttributeSelection::new("Size", ["S"])], &defaults);
        drafts.push(drafts[0].clone());
        assert!(matches!(
            validate_drafts(&drafts),
            Err(VariantError::DuplicateCombination { .. })
        ));

        let mut drafts = generate_variants(&[AttributeSelection::new("Size", ["S"])], &defaults);
        drafts[0].quantity = -1;
        assert!(matches!(
            validate_drafts(&drafts),
            Err(VariantError::NegativeQuantity { .. })
        ));

        let mut drafts = generate_variants(&[AttributeSelection::new("Size", ["S"])], &defaults);
        drafts[0].price = VariantPrice::Override(Decimal::new(-1, 0));
        assert!(matches!(
            validate_drafts(&drafts),
            Err(VariantError::NegativePrice { .. })
        ));

        let drafts = vec![
            VariantDraft::seeded(combo(&[("Size", "S")]), &defaults),
            VariantDraft::seeded(combo(&[("Color", "Red")]), &defaults),
        ];
        assert!(matches!(
            validate_drafts(&drafts),
            Err(VariantError::MismatchedAttributes { .. })
        ));
    }

    #[test]
    fn test_sync_plan_updates_inserts_and_prunes() {
        let s = VariantId::generate();
        let m = VariantId::generate();
        let existing = vec![
            (s, combo(&[("Size", "S")])),
            (m, combo(&[("Size", "M")])),
        ];
        let defaults = VariantDefaults::default();
        let desired = generate_variants(&[AttributeSelection::new("Size", ["S", "L"])], &defaults);

        let plan = plan_variant_sync(&existing, desired);

        assert_eq!(plan.updates.len(), 1);
        assert_eq!(plan.updates[0].0, s);
        assert_eq!(plan.inserts.len(), 1);
        assert_eq!(plan.inserts[0].combination, combo(&[("Size", "L")]));
        assert_eq!(plan.deletes, vec![m]);
    }

    #[test]
    fn test_sync_plan_prunes_duplicate_stored_rows() {
        let first = VariantId::generate();
        let second = VariantId::generate();
        let existing = vec![(first, Combination::new()), (second, Combination::new())];
        let plan = plan_variant_sync(&existing, generate_variants(&[], &VariantDefaults::default()));

        assert_eq!(plan.updates.len(), 1);
        assert_eq!(plan.updates[0].0, first);
        assert_eq!(plan.deletes, vec![second]);
        assert!(plan.inserts.is_empty());
    }

    #[test]
    fn test_draft_deserializes_with_defaults() {
        let draft: VariantDraft =
            serde_json::from_str(r#"{"combination":{"Size":"S"},"quantity":3}"#).unwrap();
        assert!(draft.is_active);
        assert_eq!(draft.price, VariantPrice::UseBase);
        assert_eq!(draft.combination.get("Size"), Some("S"));
    }
}
