//! Category hierarchy.
//!
//! Categories are stored flat with an optional `parent_id`. For display they
//! are flattened depth-first into an indented list. Storage does not prevent
//! cycles, so every traversal validates the parent chains first.

use std::collections::{HashMap, HashSet};

use serde::{Deserialize, Serialize};

use crate::types::CategoryId;

/// Deepest allowed nesting below a root (parent → child).
pub const MAX_CATEGORY_DEPTH: usize = 1;

/// A category as stored.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CategoryNode {
    pub id: CategoryId,
    pub name: String,
    pub parent_id: Option<CategoryId>,
    pub is_active: bool,
}

/// A category positioned in the flattened hierarchy.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FlatCategory {
    pub id: CategoryId,
    pub name: String,
    pub parent_id: Option<CategoryId>,
    /// 0 for roots.
    pub depth: usize,
    pub is_active: bool,
}

/// Problems with a category set or a proposed parent assignment.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum CategoryTreeError {
    #[error("category {0} cannot be its own parent")]
    SelfParent(CategoryId),
    #[error("category {0} is part of a parent cycle")]
    Cycle(CategoryId),
    #[error("category {child} refers to unknown parent {parent}")]
    UnknownParent {
        child: CategoryId,
        parent: CategoryId,
    },
    #[error("category {0} appears more than once")]
    DuplicateId(CategoryId),
    #[error("nesting deeper than {max} level(s) is not allowed")]
    TooDeep { max: usize },
}

/// Check that every parent chain ends at a root.
///
/// # Errors
///
/// Returns the first self-parent, unknown parent, duplicate id or cycle found.
pub fn validate_tree(nodes: &[CategoryNode]) -> Result<(), CategoryTreeError> {
    let parents = parent_map(nodes)?;

    for node in nodes {
        if node.parent_id == Some(node.id) {
            return Err(CategoryTreeError::SelfParent(node.id));
        }
        walk_to_root(node.id, &parents)?;
    }
    Ok(())
}

/// Depth-first flattening from the roots, children in input order.
///
/// # Errors
///
/// Returns a [`CategoryTreeError`] if the set fails [`validate_tree`].
pub fn flatten(nodes: &[CategoryNode]) -> Result<Vec<FlatCategory>, CategoryTreeError> {
    validate_tree(nodes)?;

    let mut children: HashMap<Option<CategoryId>, Vec<&CategoryNode>> = HashMap::new();
    for node in nodes {
        children.entry(node.parent_id).or_default().push(node);
    }

    let mut out = Vec::with_capacity(nodes.len());
    // Explicit stack; pushed in reverse so input order is preserved.
    let mut stack: Vec<(&CategoryNode, usize)> = children
        .get(&None)
        .map(|roots| roots.iter().rev().map(|n| (*n, 0)).collect())
        .unwrap_or_default();

    while let Some((node, depth)) = stack.pop() {
        out.push(FlatCategory {
            id: node.id,
            name: node.name.clone(),
            parent_id: node.parent_id,
            depth,
            is_active: node.is_active,
        });
        if let Some(kids) = children.get(&Some(node.id)) {
            stack.extend(kids.iter().rev().map(|n| (*n, depth + 1)));
        }
    }

    Ok(out)
}

/// `(id, label)` pairs for a parent picker, labels prefixed by depth.
#[must_use]
pub fn select_options(flat: &[FlatCategory]) -> Vec<(CategoryId, String)> {
    flat.iter()
        .map(|c| (c.id, format!("{}{}", "— ".repeat(c.depth), c.name)))
        .collect()
}

/// Check that `category` (new when `None`) may be placed under `new_parent`.
///
/// `nodes` is the current stored set. The move is rejected when it would
/// parent a category to itself or to one of its descendants, when the parent
/// is unknown, or when any part of the resulting subtree would sit deeper
/// than `max_depth`.
///
/// # Errors
///
/// Returns the violated [`CategoryTreeError`].
pub fn validate_parent(
    category: Option<CategoryId>,
    new_parent: Option<CategoryId>,
    nodes: &[CategoryNode],
    max_depth: usize,
) -> Result<(), CategoryTreeError> {
    let Some(parent) = new_parent else {
        return Ok(());
    };
    if category == Some(parent) {
        return Err(CategoryTreeError::SelfParent(parent));
    }

    let mut parents = parent_map(nodes)?;
    if !parents.contains_key(&parent) {
        let child = category.unwrap_or(parent);
        return Err(CategoryTreeError::UnknownParent { child, parent });
    }

    let Some(id) = category else {
        let depth = walk_to_root(parent, &parents)? + 1;
        return if depth > max_depth {
            Err(CategoryTreeError::TooDeep { max: max_depth })
        } else {
            Ok(())
        };
    };

    parents.insert(id, Some(parent));
    let depth = walk_to_root(id, &parents).map_err(|e| match e {
        CategoryTreeError::Cycle(_) => CategoryTreeError::Cycle(id),
        other => other,
    })?;

    let below = subtree_height(id, nodes);
    if depth + below > max_depth {
        return Err(CategoryTreeError::TooDeep { max: max_depth });
    }
    Ok(())
}

fn parent_map(
    nodes: &[CategoryNode],
) -> Result<HashMap<CategoryId, Option<CategoryId>>, CategoryTreeError> {
    let mut parents = HashMap::with_capacity(nodes.len());
    for node in nodes {
        if parents.insert(node.id, node.parent_id).is_some() {
            return Err(CategoryTreeError::DuplicateId(node.id));
        }
    }
    Ok(parents)
}

/// Depth of `start`, walking parent links with a visited set.
fn walk_to_root(
    start: CategoryId,
    parents: &HashMap<CategoryId, Option<CategoryId>>,
) -> Result<usize, CategoryTreeError> {
    let mut visited = HashSet::new();
    let mut current = start;
    let mut depth = 0;

    loop {
        if !visited.insert(current) {
            return Err(CategoryTreeError::Cycle(start));
        }
        match parents.get(&current) {
            Some(Some(parent)) => {
                if !parents.contains_key(parent) {
                    return Err(CategoryTreeError::UnknownParent {
                        child: current,
                        parent: *parent,
                    });
                }
                current = *parent;
                depth += 1;
            }
            Some(None) | None => return Ok(depth),
        }
    }
}

/// Levels below `id` in the stored set (0 for a leaf). Assumes no cycles.
fn subtree_height(id: CategoryId, nodes: &[CategoryNode]) -> usize {
    let mut height = 0;
    let mut frontier = vec![id];
    let mut seen: HashSet<CategoryId> = HashSet::from([id]);

    loop {
        let next: Vec<CategoryId> = nodes
            .iter()
            .filter(|n| n.parent_id.is_some_and(|p| frontier.contains(&p)))
            .map(|n| n.id)
            .filter(|child| seen.insert(*child))
            .collect();
        if next.is_empty() {
            return height;
        }
        height += 1;
        frontier = next;
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::indexing_slicing)]
mod tests {
    use super::*;

    fn node(name: &str, id: CategoryId, parent: Option<CategoryId>) -> CategoryNode {
        CategoryNode {
            id,
            name: name.to_owned(),
            parent_id: parent,
            is_active: true,
        }
    }

    #[test]
    fn test_flatten_depth_first_in_input_order() {
        let clothing = CategoryId::generate();
        let shoes = CategoryId::generate();
        let shirts = CategoryId::generate();
        let pants = CategoryId::generate();
        let nodes = vec![
            node("Clothing", clothing, None),
            node("Shirts", shirts, Some(clothing)),
            node("Shoes", shoes, None),
            node("Pants", pants, Some(clothing)),
        ];

        let flat = flatten(&nodes).unwrap();
        let names: Vec<(&str, usize)> = flat.iter().map(|c| (c.name.as_str(), c.depth)).collect();
        assert_eq!(
            names,
            [("Clothing", 0), ("Shirts", 1), ("Pants", 1), ("Shoes", 0)]
        );
    }

    #[test]
    fn test_two_node_cycle_is_rejected() {
        let a = CategoryId::generate();
        let b = CategoryId::generate();
        let nodes = vec![node("A", a, Some(b)), node("B", b, Some(a))];

        assert!(matches!(validate_tree(&nodes), Err(CategoryTreeError::Cycle(_))));
        assert!(flatten(&nodes).is_err());
    }

    #[test]
    fn test_cycle_below_valid_root_is_rejected() {
        let root = CategoryId::generate();
        let a = CategoryId::generate();
        let b = CategoryId::generate();
        let c = CategoryId::generate();
        let nodes = vec![
            node("Root", root, None),
            node("A", a, Some(c)),
            node("B", b, Some(a)),
            node("C", c, Some(b)),
        ];
        assert!(matches!(validate_tree(&nodes), Err(CategoryTreeError::Cycle(_))));
    }

    #[test]
    fn test_self_parent_and_unknown_parent() {
        let a = CategoryId::generate();
        assert_eq!(
            validate_tree(&[node("A", a, Some(a))]),
            Err(CategoryTreeError::SelfParent(a))
        );

        let missing = CategoryId::generate();
        assert_eq!(
            validate_tree(&[node("A", a, Some(missing))]),
            Err(CategoryTreeError::UnknownParent {
                child: a,
                parent: missing
            })
        );
    }

    #[test]
    fn test_select_options_prefix_depth() {
        let parent = CategoryId::generate();
        let child = CategoryId::generate();
        let flat = flatten(&[
            node("Clothing", parent, None),
            node("Shirts", child, Some(parent)),
        ])
        .unwrap();
        let options = select_options(&flat);
        assert_eq!(options[0].1, "Clothing");
        assert_eq!(options[1].1, "— Shirts");
    }

    #[test]
    fn test_validate_parent_rejects_moves_creating_cycles() {
        let a = CategoryId::generate();
        let b = CategoryId::generate();
        let nodes = vec![node("A", a, None), node("B", b, Some(a))];

        assert!(matches!(
            validate_parent(Some(a), Some(b), &nodes, 5),
            Err(CategoryTreeError::Cycle(_))
        ));
        assert_eq!(
            validate_parent(Some(a), Some(a), &nodes, 5),
            Err(CategoryTreeError::SelfParent(a))
        );
    }

    #[test]
    fn test_validate_parent_enforces_depth() {
        let a = CategoryId::generate();
        let b = CategoryId::generate();
        let c = CategoryId::generate();
        let nodes = vec![node("A", a, None), node("B", b, Some(a)), node("C", c, None)];

        // New child under a root is fine, under a child is one level too deep.
        assert!(validate_parent(None, Some(a), &nodes, MAX_CATEGORY_DEPTH).is_ok());
        assert_eq!(
            validate_parent(None, Some(b), &nodes, MAX_CATEGORY_DEPTH),
            Err(CategoryTreeError::TooDeep { max: 1 })
        );
        // Moving a parent with children under another root would make depth 2.
        assert_eq!(
            validate_parent(Some(a), Some(c), &nodes, MAX_CATEGORY_DEPTH),
            Err(CategoryTreeError::TooDeep { max: 1 })
        );
        assert!(validate_parent(Some(b), None, &nodes, MAX_CATEGORY_DEPTH).is_ok());
    }

    #[test]
    fn test_validate_parent_unknown() {
        let missing = CategoryId::generate();
        assert!(matches!(
            validate_parent(None, Some(missing), &[], MAX_CATEGORY_DEPTH),
            Err(CategoryTreeError::UnknownParent { .. })
        ));
    }
}
