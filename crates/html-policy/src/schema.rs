use indexmap::IndexMap;
use serde::{Deserialize, Deserializer, Serialize};

/// Top-level whitelist policy as written in a YAML policy file.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PolicyConfig {
    /// Schema version; currently must be "1.0".
    pub version: String,
    /// Allowed elements in declaration order.  A `null` value means the
    /// element is allowed but every attribute on it is stripped.
    #[serde(default)]
    pub elements: IndexMap<String, Option<ElementRules>>,
    /// Elements removed together with everything inside them.
    #[serde(default = "default_delete_with_content")]
    pub delete_with_content: Vec<String>,
}

impl Default for PolicyConfig {
    fn default() -> Self {
        Self {
            version: "1.0".to_string(),
            elements: IndexMap::new(),
            delete_with_content: default_delete_with_content(),
        }
    }
}

fn default_delete_with_content() -> Vec<String> {
    vec!["script".to_string()]
}

/// Attribute rules for a single allowed element.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct ElementRules {
    /// Attributes that may survive on this element, keyed by attribute name.
    /// Anything not listed here is always removed.
    #[serde(default)]
    pub attributes: IndexMap<String, AttributePolicy>,
}

/// How the value of a whitelisted attribute is checked.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum AttributePolicy {
    /// Keep the attribute only when its value equals `value` byte for byte.
    ExactMatch {
        #[serde(deserialize_with = "scalar_string")]
        value: String,
    },
    /// Keep only the whitespace-separated tokens that appear in `allowed`,
    /// re-emitted in the order of `allowed`.
    EnumeratedSet { allowed: Vec<String> },
    /// Keep only the listed CSS properties.  A property mapped to `null`
    /// accepts any value; otherwise the value must match exactly.
    StyleConstraint {
        #[serde(default, deserialize_with = "style_properties")]
        properties: IndexMap<String, Option<String>>,
    },
}

impl AttributePolicy {
    /// Shorthand for [`AttributePolicy::ExactMatch`].
    pub fn exact(value: impl Into<String>) -> Self {
        Self::ExactMatch {
            value: value.into(),
        }
    }

    /// Shorthand for [`AttributePolicy::EnumeratedSet`].
    pub fn one_of<I, S>(allowed: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::EnumeratedSet {
            allowed: allowed.into_iter().map(Into::into).collect(),
        }
    }

    /// Shorthand for [`AttributePolicy::StyleConstraint`].
    pub fn style<I, K>(properties: I) -> Self
    where
        I: IntoIterator<Item = (K, Option<&'static str>)>,
        K: Into<String>,
    {
        Self::StyleConstraint {
            properties: properties
                .into_iter()
                .map(|(k, v)| (k.into(), v.map(str::to_string)))
                .collect(),
        }
    }

    /// Name of the variant as it appears in YAML, used in error messages.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::ExactMatch { .. } => "exact_match",
            Self::EnumeratedSet { .. } => "enumerated_set",
            Self::StyleConstraint { .. } => "style_constraint",
        }
    }
}

// ---------------------------------------------------------------------------
// Scalar coercion
// ---------------------------------------------------------------------------

/// YAML happily types `1.42857` as a float; policy values are always compared
/// as text, so every scalar is accepted and stored in its string form.
#[derive(Deserialize)]
#[serde(untagged)]
enum ScalarValue {
    Text(String),
    Integer(i64),
    Float(f64),
    Bool(bool),
}

impl ScalarValue {
    fn into_string(self) -> String {
        match self {
            Self::Text(s) => s,
            Self::Integer(i) => i.to_string(),
            Self::Float(f) => f.to_string(),
            Self::Bool(b) => b.to_string(),
        }
    }
}

fn scalar_string<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    ScalarValue::deserialize(deserializer).map(ScalarValue::into_string)
}

fn style_properties<'de, D>(deserializer: D) -> Result<IndexMap<String, Option<String>>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw: IndexMap<String, Option<ScalarValue>> = IndexMap::deserialize(deserializer)?;
    Ok(raw
        .into_iter()
        .map(|(property, value)| (property, value.map(ScalarValue::into_string)))
        .collect())
}
