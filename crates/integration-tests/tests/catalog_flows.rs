//! Variant editing and category trees as the product form drives them.

#![allow(clippy::unwrap_used, clippy::indexing_slicing)]

use rust_decimal::Decimal;

use vitrine_admin::routes::api::variants::{PreviewRequest, preview_variants};
use vitrine_core::catalog::{
    AttributeSelection, CategoryNode, CategoryTreeError, MAX_CATEGORY_DEPTH, VariantDefaults,
    VariantDraft, flatten, plan_variant_sync, select_options, total_quantity, validate_drafts,
    validate_parent,
};
use vitrine_core::{CategoryId, VariantId, VariantPrice};

fn preview(
    attributes: Vec<AttributeSelection>,
    previous: Option<Vec<VariantDraft>>,
) -> Vec<VariantDraft> {
    preview_variants(&PreviewRequest {
        attributes,
        defaults: VariantDefaults {
            price: VariantPrice::UseBase,
            quantity: 5,
        },
        previous,
    })
    .unwrap()
}

#[test]
fn test_edit_session_keeps_operator_input_and_prunes_on_save() {
    // First save: Size x Color.
    let mut drafts = preview(
        vec![
            AttributeSelection::new("Size", ["S", "M"]),
            AttributeSelection::new("Color", ["Red", "Blue"]),
        ],
        None,
    );
    assert_eq!(drafts.len(), 4);
    assert_eq!(drafts[0].combination.label(), "S / Red");
    drafts[0].quantity = 12;
    drafts[0].price = VariantPrice::Override(Decimal::new(2499, 2));
    validate_drafts(&drafts).unwrap();

    let stored: Vec<(VariantId, _)> = drafts
        .iter()
        .map(|d| (VariantId::generate(), d.combination.clone()))
        .collect();

    // The operator drops Blue and adds L.
    let edited = preview(
        vec![
            AttributeSelection::new("Size", ["S", "M", "L"]),
            AttributeSelection::new("Color", ["Red"]),
        ],
        Some(drafts),
    );
    assert_eq!(edited.len(), 3);
    assert_eq!(edited[0].quantity, 12);
    assert_eq!(edited[0].effective_price(Decimal::TEN), Decimal::new(2499, 2));
    assert_eq!(edited[2].quantity, 5);
    assert_eq!(total_quantity(&edited), 12 + 5 + 5);

    let plan = plan_variant_sync(&stored, edited);
    assert_eq!(plan.updates.len(), 2);
    assert_eq!(plan.inserts.len(), 1);
    assert_eq!(plan.deletes.len(), 2);
    assert_eq!(plan.updates[0].0, stored[0].0);
}

#[test]
fn test_clearing_attributes_collapses_to_base_variant() {
    let drafts = preview(vec![AttributeSelection::new("Size", ["S", "M"])], None);
    let stored: Vec<(VariantId, _)> = drafts
        .iter()
        .map(|d| (VariantId::generate(), d.combination.clone()))
        .collect();

    let base = preview(Vec::new(), Some(drafts));
    assert_eq!(base.len(), 1);
    assert!(base[0].combination.is_empty());

    let plan = plan_variant_sync(&stored, base);
    assert!(plan.updates.is_empty());
    assert_eq!(plan.inserts.len(), 1);
    assert_eq!(plan.deletes.len(), 2);
}

fn node(id: CategoryId, name: &str, parent: Option<CategoryId>) -> CategoryNode {
    CategoryNode {
        id,
        name: name.to_owned(),
        parent_id: parent,
        is_active: true,
    }
}

#[test]
fn test_category_picker_lists_parents_before_children() {
    let apparel = CategoryId::generate();
    let shirts = CategoryId::generate();
    let home = CategoryId::generate();
    let nodes = vec![
        node(shirts, "Shirts", Some(apparel)),
        node(home, "Home", None),
        node(apparel, "Apparel", None),
    ];

    let options = select_options(&flatten(&nodes).unwrap());
    let labels: Vec<&str> = options.iter().map(|(_, l)| l.as_str()).collect();
    assert_eq!(labels, ["Home", "Apparel", "— Shirts"]);
}

#[test]
fn test_reparenting_rules() {
    let apparel = CategoryId::generate();
    let shirts = CategoryId::generate();
    let home = CategoryId::generate();
    let nodes = vec![
        node(apparel, "Apparel", None),
        node(shirts, "Shirts", Some(apparel)),
        node(home, "Home", None),
    ];

    // A parent may not move under its own child.
    assert_eq!(
        validate_parent(Some(apparel), Some(shirts), &nodes, MAX_CATEGORY_DEPTH),
        Err(CategoryTreeError::Cycle(apparel))
    );
    // A root may become a child of another root.
    assert!(validate_parent(Some(home), Some(apparel), &nodes, MAX_CATEGORY_DEPTH).is_ok());
    // A new category under a child would be a third level.
    assert_eq!(
        validate_parent(None, Some(shirts), &nodes, MAX_CATEGORY_DEPTH),
        Err(CategoryTreeError::TooDeep {
            max: MAX_CATEGORY_DEPTH
        })
    );
}
