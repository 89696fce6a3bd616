use std::path::Path;

use indexmap::IndexMap;
use tracing::debug;

use crate::loader::{self, PolicyError};
use crate::schema::{AttributePolicy, PolicyConfig};

const BASELINE_POLICY: &str = include_str!("../policies/baseline.yaml");
const LEGACY_MARKUP_POLICY: &str = include_str!("../policies/legacy-markup.yaml");

// ---------------------------------------------------------------------------
// ElementPolicy
// ---------------------------------------------------------------------------

/// The attribute rules of one allowed element, with names lower-cased.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ElementPolicy {
    attributes: IndexMap<String, AttributePolicy>,
}

impl ElementPolicy {
    /// Rule for `attribute`, or `None` when the attribute must be stripped.
    pub fn attribute(&self, attribute: &str) -> Option<&AttributePolicy> {
        self.attributes.get(attribute)
    }

    /// Attribute names in policy order.
    pub fn attribute_names(&self) -> impl Iterator<Item = &str> {
        self.attributes.keys().map(String::as_str)
    }
}

// ---------------------------------------------------------------------------
// Policy
// ---------------------------------------------------------------------------

/// A validated, immutable whitelist.
///
/// Construct via [`Policy::new`] (or one of the loaders).  Element and
/// attribute names are normalised to ASCII lower case and class lists are
/// deduplicated, so lookups are plain map hits.
#[derive(Debug, Clone, PartialEq)]
pub struct Policy {
    elements: IndexMap<String, ElementPolicy>,
    delete_with_content: Vec<String>,
}

impl Policy {
    /// Validate and compile a [`PolicyConfig`].
    pub fn new(config: PolicyConfig) -> Result<Self, PolicyError> {
        loader::validate(&config)?;

        let elements = config
            .elements
            .into_iter()
            .map(|(name, rules)| {
                let attributes = rules
                    .map(|r| r.attributes)
                    .unwrap_or_default()
                    .into_iter()
                    .map(|(attribute, policy)| (attribute.to_ascii_lowercase(), normalize(policy)))
                    .collect();
                (name.to_ascii_lowercase(), ElementPolicy { attributes })
            })
            .collect::<IndexMap<_, _>>();

        let mut delete_with_content: Vec<String> = Vec::new();
        for name in config.delete_with_content {
            let name = name.to_ascii_lowercase();
            if !delete_with_content.contains(&name) {
                delete_with_content.push(name);
            }
        }

        debug!(
            elements = elements.len(),
            delete_with_content = delete_with_content.len(),
            "compiled html policy"
        );

        Ok(Self {
            elements,
            delete_with_content,
        })
    }

    /// Parse, validate and compile a YAML policy document.
    pub fn from_yaml(yaml: &str) -> Result<Self, PolicyError> {
        Self::new(loader::load_policy_from_str(yaml)?)
    }

    /// Load a YAML policy document from disk.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, PolicyError> {
        Self::new(loader::load_policy(path)?)
    }

    /// The stock allow-list: simple inline formatting, lists, `div`/`br`, and
    /// `span` with a fixed `line-height`.  `script` is deleted with content.
    ///
    /// # Panics
    ///
    /// Panics if the bundled policy document fails to load (should never
    /// happen; it is covered by tests).
    pub fn baseline() -> Self {
        Self::from_yaml(BASELINE_POLICY).expect("bundled baseline policy must load")
    }

    /// Variant of the stock list that prefers `b` over `strong` and keeps
    /// `id="test"` markers on `span` and `strike`.
    ///
    /// # Panics
    ///
    /// Panics if the bundled policy document fails to load.
    pub fn legacy_markup() -> Self {
        Self::from_yaml(LEGACY_MARKUP_POLICY).expect("bundled legacy-markup policy must load")
    }

    /// Whether elements named `element` are kept in the output.
    pub fn allows_element(&self, element: &str) -> bool {
        self.elements.contains_key(&element.to_ascii_lowercase())
    }

    /// Rules for an allowed element.
    pub fn element(&self, element: &str) -> Option<&ElementPolicy> {
        self.elements.get(&element.to_ascii_lowercase())
    }

    /// Rule for `attribute` on `element`; `None` means strip the attribute.
    pub fn attribute_policy(&self, element: &str, attribute: &str) -> Option<&AttributePolicy> {
        self.element(element)?
            .attribute(&attribute.to_ascii_lowercase())
    }

    /// Allowed element names in policy order.
    pub fn element_names(&self) -> impl Iterator<Item = &str> {
        self.elements.keys().map(String::as_str)
    }

    /// Elements removed together with their content.
    pub fn delete_with_content(&self) -> &[String] {
        &self.delete_with_content
    }
}

impl Default for Policy {
    fn default() -> Self {
        Self::baseline()
    }
}

/// Drop repeated class tokens, keeping the first occurrence's position.
fn normalize(policy: AttributePolicy) -> AttributePolicy {
    match policy {
        AttributePolicy::EnumeratedSet { allowed } => {
            let mut unique: Vec<String> = Vec::with_capacity(allowed.len());
            for token in allowed {
                if !unique.contains(&token) {
                    unique.push(token);
                }
            }
            AttributePolicy::EnumeratedSet { allowed: unique }
        }
        other => other,
    }
}
