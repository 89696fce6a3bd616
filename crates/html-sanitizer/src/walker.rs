//! Applies the attribute policy to every element of a parsed fragment.

use std::collections::HashSet;

use html_policy::Policy;
use serde::{Deserialize, Serialize};
use tracing::trace;

use crate::markup::{ElementNode, MarkupBackend, MarkupError};
use crate::strategy::clean_attribute;

/// Counters collected while walking one fragment.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct WalkStats {
    pub elements_visited: usize,
    pub attributes_removed: usize,
    pub attributes_rewritten: usize,
}

/// Cleans attributes element by element.  Element structure is never touched:
/// nodes are neither inserted nor removed.
pub struct AttributeWalker<'p> {
    policy: &'p Policy,
    stats: WalkStats,
}

impl<'p> AttributeWalker<'p> {
    pub fn new(policy: &'p Policy) -> Self {
        Self {
            policy,
            stats: WalkStats::default(),
        }
    }

    /// Counters accumulated so far.
    pub fn stats(&self) -> WalkStats {
        self.stats
    }

    /// Clean the attributes of a single element.
    ///
    /// Every attribute is decided against the snapshot taken before any edit;
    /// removals are applied only after the whole scan.  When the source
    /// repeats an attribute name, the first occurrence decides (as HTML
    /// parsers do) and every copy is removed before the kept value, if any,
    /// is written back.
    pub fn clean_element(&mut self, node: &mut dyn ElementNode) -> Result<(), MarkupError> {
        let element = node.tag_name();
        let attributes = node.attributes();
        self.stats.elements_visited += 1;

        let mut seen: HashSet<&str> = HashSet::new();
        let mut removals: Vec<(&str, usize)> = Vec::new();
        let mut reinstated: Vec<(&str, usize, String)> = Vec::new();

        for (name, value) in &attributes {
            if !seen.insert(name.as_str()) {
                continue;
            }
            let occurrences = attributes.iter().filter(|(n, _)| n == name).count();

            let cleaned = self
                .policy
                .attribute_policy(&element, name)
                .and_then(|rule| clean_attribute(&element, name, value, rule));

            match cleaned {
                Some(kept) if occurrences == 1 => {
                    if kept != *value {
                        node.set_attribute(name, &kept)?;
                        self.stats.attributes_rewritten += 1;
                    }
                }
                Some(kept) => reinstated.push((name.as_str(), occurrences, kept)),
                None => removals.push((name.as_str(), occurrences)),
            }
        }

        for (name, occurrences) in removals {
            for _ in 0..occurrences {
                node.remove_attribute(name);
            }
            self.stats.attributes_removed += occurrences;
            trace!(element = %element, attribute = name, "attribute removed");
        }

        // Repeated attributes whose first value survived: the extra copies
        // count as removed, the surviving value as rewritten.
        for (name, occurrences, value) in reinstated {
            for _ in 0..occurrences {
                node.remove_attribute(name);
            }
            node.set_attribute(name, &value)?;
            self.stats.attributes_removed += occurrences - 1;
            self.stats.attributes_rewritten += 1;
        }

        Ok(())
    }
}

/// Parse `html` with `backend`, clean every element against `policy`, and
/// return the serialized fragment with the walk counters.
pub fn walk<B>(policy: &Policy, backend: &B, html: &str) -> Result<(String, WalkStats), MarkupError>
where
    B: MarkupBackend + ?Sized,
{
    let mut walker = AttributeWalker::new(policy);
    let serialized = backend.rewrite_elements(html, &mut |node| walker.clean_element(node))?;
    Ok((serialized, walker.stats()))
}
