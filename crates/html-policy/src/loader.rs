use std::collections::HashSet;
use std::path::{Path, PathBuf};

use crate::schema::{AttributePolicy, PolicyConfig};

/// Errors raised while loading or validating a policy.  All of them are
/// configuration errors detected before any markup is cleaned.
#[derive(Debug, thiserror::Error)]
pub enum PolicyError {
    #[error("failed to read policy file {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("YAML deserialization failed: {0}")]
    Parse(#[from] serde_yml::Error),

    #[error("unsupported policy version '{0}'; only '1.0' is supported")]
    UnsupportedVersion(String),

    #[error("invalid element name: '{0}'")]
    InvalidElementName(String),

    #[error("invalid attribute name '{attribute}' on element '{element}'")]
    InvalidAttributeName { element: String, attribute: String },

    #[error("duplicate element name: '{0}'")]
    DuplicateElement(String),

    #[error("duplicate attribute '{attribute}' on element '{element}'")]
    DuplicateAttribute { element: String, attribute: String },

    #[error("element '{0}' is both allowed and listed in delete_with_content")]
    ConflictingElement(String),

    #[error("attribute '{attribute}' on element '{element}' cannot use a {found} rule; expected {expected}")]
    MismatchedRule {
        element: String,
        attribute: String,
        found: &'static str,
        expected: &'static str,
    },
}

/// Load a [`PolicyConfig`] from a YAML file on disk.
///
/// Validates the config after deserialization.
pub fn load_policy(path: impl AsRef<Path>) -> Result<PolicyConfig, PolicyError> {
    let path = path.as_ref();
    let contents = std::fs::read_to_string(path).map_err(|source| PolicyError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    load_policy_from_str(&contents)
}

/// Parse and validate a [`PolicyConfig`] from a YAML string.
pub fn load_policy_from_str(yaml: &str) -> Result<PolicyConfig, PolicyError> {
    let config: PolicyConfig = serde_yml::from_str(yaml)?;
    validate(&config)?;
    Ok(config)
}

/// Returns `true` for names that are safe to splice into a tag pattern:
/// an ASCII letter followed by letters, digits or `-`.
pub fn is_valid_element_name(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(first) if first.is_ascii_alphabetic() => {
            chars.all(|c| c.is_ascii_alphanumeric() || c == '-')
        }
        _ => false,
    }
}

fn is_valid_attribute_name(name: &str) -> bool {
    !name.is_empty()
        && !name.chars().any(|c| {
            c.is_whitespace() || c.is_control() || matches!(c, '"' | '\'' | '<' | '>' | '/' | '=')
        })
}

/// Run post-deserialization validation checks.
pub(crate) fn validate(config: &PolicyConfig) -> Result<(), PolicyError> {
    if config.version != "1.0" {
        return Err(PolicyError::UnsupportedVersion(config.version.clone()));
    }

    let mut elements = HashSet::new();
    for (name, rules) in &config.elements {
        if !is_valid_element_name(name) {
            return Err(PolicyError::InvalidElementName(name.clone()));
        }
        let element = name.to_ascii_lowercase();
        if !elements.insert(element.clone()) {
            return Err(PolicyError::DuplicateElement(element));
        }

        let Some(rules) = rules else { continue };

        let mut attributes = HashSet::new();
        for (attribute, policy) in &rules.attributes {
            if !is_valid_attribute_name(attribute) {
                return Err(PolicyError::InvalidAttributeName {
                    element,
                    attribute: attribute.clone(),
                });
            }
            let attribute = attribute.to_ascii_lowercase();
            if !attributes.insert(attribute.clone()) {
                return Err(PolicyError::DuplicateAttribute { element, attribute });
            }
            check_rule_kind(&element, &attribute, policy)?;
        }
    }

    for name in &config.delete_with_content {
        if !is_valid_element_name(name) {
            return Err(PolicyError::InvalidElementName(name.clone()));
        }
        if elements.contains(&name.to_ascii_lowercase()) {
            return Err(PolicyError::ConflictingElement(name.to_ascii_lowercase()));
        }
    }

    Ok(())
}

/// `style` and `class` must never be compared as whole values, and the CSS
/// rule only makes sense on `style`.
fn check_rule_kind(
    element: &str,
    attribute: &str,
    policy: &AttributePolicy,
) -> Result<(), PolicyError> {
    let expected = match (attribute, policy) {
        ("style", AttributePolicy::StyleConstraint { .. }) => return Ok(()),
        ("style", _) => "style_constraint",
        ("class", AttributePolicy::EnumeratedSet { .. }) => return Ok(()),
        ("class", _) => "enumerated_set",
        (_, AttributePolicy::StyleConstraint { .. }) => "exact_match or enumerated_set",
        _ => return Ok(()),
    };

    Err(PolicyError::MismatchedRule {
        element: element.to_string(),
        attribute: attribute.to_string(),
        found: policy.kind(),
        expected,
    })
}
