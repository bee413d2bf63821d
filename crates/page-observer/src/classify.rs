//! Interactive-surface classification rules.

/// ARIA roles treated as interactive regardless of tag.
pub const INTERACTIVE_ROLES: &[&str] = &[
    "button",
    "link",
    "checkbox",
    "radio",
    "tab",
    "menuitem",
    "option",
    "switch",
    "searchbox",
    "textbox",
    "combobox",
];

/// Attributes copied onto element descriptors. Everything else stays on the
/// page side of the boundary.
pub const ALLOWED_ATTRIBUTES: &[&str] = &[
    "id",
    "name",
    "class",
    "href",
    "placeholder",
    "aria-label",
    "title",
    "alt",
    "value",
    "type",
    "role",
    "data-testid",
];

/// Whether an element belongs to the interactive surface: native controls,
/// interactive ARIA roles, or an explicit positive tabindex.
pub fn is_interactive(tag: &str, has_href: bool, role: Option<&str>, tabindex: Option<&str>) -> bool {
    match tag {
        "a" => has_href,
        "button" | "input" | "select" | "textarea" | "summary" => true,
        _ => {
            if let Some(role) = role {
                if INTERACTIVE_ROLES.contains(&role.to_ascii_lowercase().as_str()) {
                    return true;
                }
            }
            tabindex
                .and_then(|t| t.trim().parse::<i32>().ok())
                .map(|t| t > 0)
                .unwrap_or(false)
        }
    }
}

/// Descriptor kind from tag plus role or input subtype.
pub fn descriptor_kind(tag: &str, role: Option<&str>, input_type: Option<&str>) -> String {
    match tag {
        "a" => "link".to_string(),
        "input" => {
            let subtype = input_type
                .map(|t| t.to_ascii_lowercase())
                .filter(|t| !t.is_empty())
                .unwrap_or_else(|| "text".to_string());
            format!("input-{subtype}")
        }
        "button" | "select" | "textarea" | "summary" => tag.to_string(),
        _ => role
            .map(|r| r.to_ascii_lowercase())
            .unwrap_or_else(|| tag.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn native_controls_are_interactive() {
        assert!(is_interactive("button", false, None, None));
        assert!(is_interactive("a", true, None, None));
        assert!(!is_interactive("a", false, None, None));
        assert!(!is_interactive("div", false, None, None));
    }

    #[test]
    fn aria_roles_and_tabindex_extend_the_surface() {
        assert!(is_interactive("div", false, Some("button"), None));
        assert!(is_interactive("span", false, None, Some("2")));
        assert!(!is_interactive("span", false, None, Some("0")));
        assert!(!is_interactive("span", false, None, Some("-1")));
        assert!(!is_interactive("div", false, Some("presentation"), None));
    }

    #[test]
    fn kinds_carry_input_subtypes() {
        assert_eq!(descriptor_kind("input", None, Some("search")), "input-search");
        assert_eq!(descriptor_kind("input", None, None), "input-text");
        assert_eq!(descriptor_kind("a", None, None), "link");
        assert_eq!(descriptor_kind("div", Some("button"), None), "button");
    }
}
