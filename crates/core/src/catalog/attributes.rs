//! Variant attribute names.

/// Attribute names every store can use without creating them first.
pub const COMMON_ATTRIBUTES: &[&str] = &["Size", "Color", "Material", "Style"];

/// Names from `selected` that are neither common defaults nor among the
/// store's `existing` custom attributes, in selection order and without
/// repeats.
///
/// Matching is case-sensitive: "color" is a different attribute from "Color".
#[must_use]
pub fn missing_attributes<'a>(selected: &[&'a str], existing: &[&str]) -> Vec<&'a str> {
    let mut missing: Vec<&'a str> = Vec::new();
    for &name in selected {
        let name_trimmed = name.trim();
        if name_trimmed.is_empty()
            || COMMON_ATTRIBUTES.contains(&name_trimmed)
            || existing.contains(&name_trimmed)
            || missing.contains(&name_trimmed)
        {
            continue;
        }
        missing.push(name_trimmed);
    }
    missing
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_never_missing() {
        assert!(missing_attributes(&["Size", "Color"], &[]).is_empty());
    }

    #[test]
    fn test_new_names_in_order_once() {
        let missing = missing_attributes(&["Scent", "Size", "Finish", "Scent"], &["Finish"]);
        assert_eq!(missing, vec!["Scent"]);
    }

    #[test]
    fn test_case_sensitive() {
        let missing = missing_attributes(&["color"], &[]);
        assert_eq!(missing, vec!["color"]);
    }

    #[test]
    fn test_blank_names_skipped() {
        assert!(missing_attributes(&["  ", ""], &[]).is_empty());
    }
}
