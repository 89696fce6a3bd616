//! Per-attribute cleaning strategies.
//!
//! Each strategy is a total function: it either returns the value to keep
//! (possibly normalised) or `None`, which tells the walker to drop the
//! attribute.  Rejection is a normal outcome, never an error.

use std::collections::HashMap;

use html_policy::AttributePolicy;
use indexmap::IndexMap;
use tracing::trace;

/// A cleaning strategy for one category of attribute.
pub trait AttributeCleaner {
    /// The slice of the policy this strategy is configured with.
    type Rule: ?Sized;

    /// Decide whether `value` survives on `element`/`attribute` and in what
    /// form.
    fn clean(element: &str, attribute: &str, value: &str, rule: &Self::Rule) -> Option<String>;
}

// ---------------------------------------------------------------------------
// Exact match
// ---------------------------------------------------------------------------

/// Keeps the value only if it equals the configured literal (case-sensitive,
/// untrimmed).
pub struct DefaultAttributeCleaner;

impl AttributeCleaner for DefaultAttributeCleaner {
    type Rule = str;

    fn clean(_element: &str, _attribute: &str, value: &str, expected: &str) -> Option<String> {
        (value == expected).then(|| value.to_string())
    }
}

// ---------------------------------------------------------------------------
// Class tokens
// ---------------------------------------------------------------------------

/// Intersects whitespace-separated tokens with an allowed list.  The output
/// follows the allowed list's order, not the input's.
pub struct ClassAttributeCleaner;

impl AttributeCleaner for ClassAttributeCleaner {
    type Rule = [String];

    fn clean(_element: &str, _attribute: &str, value: &str, allowed: &[String]) -> Option<String> {
        let present: Vec<&str> = value.split_ascii_whitespace().collect();

        let mut kept: Vec<&str> = Vec::new();
        for token in allowed {
            if present.contains(&token.as_str()) && !kept.contains(&token.as_str()) {
                kept.push(token.as_str());
            }
        }

        if kept.is_empty() {
            return None;
        }
        Some(kept.join(" "))
    }
}

// ---------------------------------------------------------------------------
// Inline style
// ---------------------------------------------------------------------------

/// Filters flat `property:value` declarations against a per-property rule.
pub struct StyleAttributeCleaner;

impl StyleAttributeCleaner {
    /// Split a `style` value into declarations.  Segments without a colon or
    /// with an empty side are dropped; a repeated property keeps its last
    /// value.
    pub fn parse_declarations(value: &str) -> HashMap<&str, &str> {
        let mut declarations = HashMap::new();
        for segment in value.split(';') {
            let Some((property, val)) = segment.split_once(':') else {
                continue;
            };
            let (property, val) = (property.trim(), val.trim());
            if property.is_empty() || val.is_empty() {
                continue;
            }
            declarations.insert(property, val);
        }
        declarations
    }
}

impl AttributeCleaner for StyleAttributeCleaner {
    type Rule = IndexMap<String, Option<String>>;

    fn clean(
        _element: &str,
        _attribute: &str,
        value: &str,
        properties: &IndexMap<String, Option<String>>,
    ) -> Option<String> {
        let declared = Self::parse_declarations(value);

        let mut cleaned = String::new();
        for (property, required) in properties {
            let Some(&actual) = declared.get(property.as_str()) else {
                continue;
            };
            if required.as_deref().is_some_and(|r| r != actual) {
                continue;
            }
            cleaned.push_str(property);
            cleaned.push(':');
            cleaned.push_str(actual);
            cleaned.push(';');
        }

        if cleaned.is_empty() {
            return None;
        }
        Some(cleaned)
    }
}

// ---------------------------------------------------------------------------
// Dispatch
// ---------------------------------------------------------------------------

/// Run the strategy matching `policy`'s variant.
pub fn clean_attribute(
    element: &str,
    attribute: &str,
    value: &str,
    policy: &AttributePolicy,
) -> Option<String> {
    let cleaned = match policy {
        AttributePolicy::ExactMatch { value: expected } => {
            DefaultAttributeCleaner::clean(element, attribute, value, expected)
        }
        AttributePolicy::EnumeratedSet { allowed } => {
            ClassAttributeCleaner::clean(element, attribute, value, allowed)
        }
        AttributePolicy::StyleConstraint { properties } => {
            StyleAttributeCleaner::clean(element, attribute, value, properties)
        }
    };

    trace!(
        element,
        attribute,
        rule = policy.kind(),
        kept = cleaned.is_some(),
        "attribute checked"
    );
    cleaned
}

#[cfg(test)]
mod tests {
    use super::*;

    fn style(properties: &[(&str, Option<&str>)]) -> IndexMap<String, Option<String>> {
        properties
            .iter()
            .map(|(k, v)| (k.to_string(), v.map(str::to_string)))
            .collect()
    }

    fn classes(allowed: &[&str]) -> Vec<String> {
        allowed.iter().map(|s| s.to_string()).collect()
    }

    // -- exact match ------------------------------------------------------

    #[test]
    fn exact_match_keeps_identical_value() {
        assert_eq!(
            DefaultAttributeCleaner::clean("span", "id", "test", "test"),
            Some("test".to_string())
        );
    }

    #[test]
    fn exact_match_is_case_sensitive_and_untrimmed() {
        assert_eq!(DefaultAttributeCleaner::clean("span", "id", "Test", "test"), None);
        assert_eq!(DefaultAttributeCleaner::clean("span", "id", " test", "test"), None);
        assert_eq!(DefaultAttributeCleaner::clean("span", "id", "test ", "test"), None);
    }

    // -- class ------------------------------------------------------------

    #[test]
    fn class_output_follows_policy_order() {
        let allowed = classes(&["a", "b"]);
        assert_eq!(
            ClassAttributeCleaner::clean("p", "class", "b c a", &allowed),
            Some("a b".to_string())
        );
    }

    #[test]
    fn class_without_allowed_tokens_is_dropped() {
        let allowed = classes(&["a", "b"]);
        assert_eq!(ClassAttributeCleaner::clean("p", "class", "c d", &allowed), None);
        assert_eq!(ClassAttributeCleaner::clean("p", "class", "", &allowed), None);
    }

    #[test]
    fn class_tolerates_irregular_whitespace() {
        let allowed = classes(&["a", "b"]);
        assert_eq!(
            ClassAttributeCleaner::clean("p", "class", "  b\t\na  b ", &allowed),
            Some("a b".to_string())
        );
    }

    #[test]
    fn class_tokens_must_match_exactly() {
        let allowed = classes(&["a"]);
        assert_eq!(ClassAttributeCleaner::clean("p", "class", "ab A", &allowed), None);
    }

    #[test]
    fn class_duplicate_allowed_tokens_emit_once() {
        let allowed = classes(&["a", "a", "b"]);
        assert_eq!(
            ClassAttributeCleaner::clean("p", "class", "a b", &allowed),
            Some("a b".to_string())
        );
    }

    // -- style ------------------------------------------------------------

    #[test]
    fn style_keeps_matching_property_only() {
        let rule = style(&[("line-height", Some("1.42857"))]);
        assert_eq!(
            StyleAttributeCleaner::clean("span", "style", "line-height:1.42857;color:red;", &rule),
            Some("line-height:1.42857;".to_string())
        );
    }

    #[test]
    fn style_without_surviving_properties_is_dropped() {
        let rule = style(&[("line-height", Some("1.42857"))]);
        assert_eq!(StyleAttributeCleaner::clean("span", "style", "color:red;", &rule), None);
        assert_eq!(
            StyleAttributeCleaner::clean("span", "style", "line-height:2;", &rule),
            None
        );
    }

    #[test]
    fn style_unconstrained_property_keeps_any_value() {
        let rule = style(&[("color", None)]);
        assert_eq!(
            StyleAttributeCleaner::clean("span", "style", "  color :  #ff0000 ; margin: 0", &rule),
            Some("color:#ff0000;".to_string())
        );
    }

    #[test]
    fn style_output_follows_policy_order() {
        let rule = style(&[("font-weight", None), ("color", None)]);
        assert_eq!(
            StyleAttributeCleaner::clean("span", "style", "color:red;font-weight:bold", &rule),
            Some("font-weight:bold;color:red;".to_string())
        );
    }

    #[test]
    fn style_last_duplicate_wins() {
        let rule = style(&[("color", Some("blue"))]);
        assert_eq!(
            StyleAttributeCleaner::clean("span", "style", "color:blue;color:red", &rule),
            None
        );
        assert_eq!(
            StyleAttributeCleaner::clean("span", "style", "color:red;color:blue", &rule),
            Some("color:blue;".to_string())
        );
    }

    #[test]
    fn style_malformed_segments_are_ignored() {
        let rule = style(&[("color", None), ("margin", None)]);
        assert_eq!(
            StyleAttributeCleaner::clean("span", "style", "color;:red;margin:;;color:green", &rule),
            Some("color:green;".to_string())
        );
    }

    #[test]
    fn style_splits_on_first_colon() {
        let declarations =
            StyleAttributeCleaner::parse_declarations("background:url(http://x/y.png)");
        assert_eq!(declarations.get("background"), Some(&"url(http://x/y.png)"));
    }

    #[test]
    fn style_property_names_are_matched_exactly() {
        let rule = style(&[("color", None)]);
        assert_eq!(StyleAttributeCleaner::clean("span", "style", "COLOR:red", &rule), None);
    }

    // -- dispatch ---------------------------------------------------------

    #[test]
    fn dispatch_follows_policy_variant() {
        assert_eq!(
            clean_attribute("span", "id", "x", &AttributePolicy::exact("x")),
            Some("x".to_string())
        );
        assert_eq!(
            clean_attribute("span", "rel", "noopener evil", &AttributePolicy::one_of(["noopener"])),
            Some("noopener".to_string())
        );
        assert_eq!(
            clean_attribute(
                "span",
                "style",
                "color:red",
                &AttributePolicy::style([("line-height", None)])
            ),
            None
        );
    }
}
