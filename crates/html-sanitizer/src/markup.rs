//! The parser/serializer seam.
//!
//! The cleaner never builds markup itself.  A [`MarkupBackend`] parses a
//! fragment, hands every element to a visitor in document order, and returns
//! the re-serialized fragment.  [`LolHtmlBackend`] is the production
//! implementation.

use std::borrow::Cow;

use htmlize::{escape_attribute, unescape_attribute};
use lol_html::errors::RewritingError;
use lol_html::html_content::Element;
use lol_html::{rewrite_str, ElementContentHandlers, RewriteStrSettings, Selector};

type HandlerResult = Result<(), Box<dyn std::error::Error + Send + Sync>>;

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

/// Failures reported by a [`MarkupBackend`].
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum MarkupError {
    /// The backend could not turn the input into elements.
    #[error("failed to parse markup: {0}")]
    Parse(String),

    /// The element set could not be enumerated or updated.
    #[error("failed to enumerate elements: {0}")]
    Extraction(String),
}

impl From<RewritingError> for MarkupError {
    fn from(err: RewritingError) -> Self {
        match err {
            RewritingError::ContentHandlerError(inner) => match inner.downcast::<MarkupError>() {
                Ok(markup) => *markup,
                Err(other) => MarkupError::Extraction(other.to_string()),
            },
            other => MarkupError::Parse(other.to_string()),
        }
    }
}

// ---------------------------------------------------------------------------
// Traits
// ---------------------------------------------------------------------------

/// One element of a parsed fragment, as seen by the attribute walker.
pub trait ElementNode {
    /// Lower-case tag name.
    fn tag_name(&self) -> String;

    /// Current attributes as `(name, value)` pairs in source order.  Names
    /// are lower-case; a name may repeat if the source repeated it.  Values
    /// are decoded: character references are already resolved, so they are
    /// exactly what a browser would see.
    fn attributes(&self) -> Vec<(String, String)>;

    /// Set (or overwrite) an attribute value.  `value` is plain text; the
    /// backend escapes it for serialization.
    fn set_attribute(&mut self, name: &str, value: &str) -> Result<(), MarkupError>;

    /// Remove an attribute if present.
    fn remove_attribute(&mut self, name: &str);
}

/// Visitor invoked once per element.
pub type ElementVisitor<'a> = dyn FnMut(&mut dyn ElementNode) -> Result<(), MarkupError> + 'a;

/// Parses a fragment, visits each element and serializes the result.
///
/// The trait is synchronous; implementations must not perform I/O and must
/// treat the input as a bare fragment (no implied `html`/`head`/`body`
/// wrapper, no doctype).
pub trait MarkupBackend: Send + Sync {
    /// Visit every element of `html` in document order (pre-order) and return
    /// the serialized fragment including any changes made by `visit`.
    fn rewrite_elements(
        &self,
        html: &str,
        visit: &mut ElementVisitor<'_>,
    ) -> Result<String, MarkupError>;
}

// ---------------------------------------------------------------------------
// lol_html backend
// ---------------------------------------------------------------------------

/// Streaming backend built on `lol_html`.
///
/// Untouched markup is passed through byte for byte; only attribute edits
/// made by the visitor change the output.  `lol_html` exposes attribute
/// values as written in the source, so the adapter resolves character
/// references on read and escapes `&` and `"` on write.
#[derive(Debug, Clone)]
pub struct LolHtmlBackend {
    strict: bool,
}

impl LolHtmlBackend {
    /// Create a backend.  In strict mode markup that leaves the tokenizer in
    /// an ambiguous state is reported as a parse failure instead of being
    /// rewritten on a best-effort basis.
    pub fn new(strict: bool) -> Self {
        Self { strict }
    }

    /// Whether ambiguous markup is rejected.
    pub fn is_strict(&self) -> bool {
        self.strict
    }
}

impl Default for LolHtmlBackend {
    fn default() -> Self {
        Self::new(true)
    }
}

impl MarkupBackend for LolHtmlBackend {
    fn rewrite_elements(
        &self,
        html: &str,
        visit: &mut ElementVisitor<'_>,
    ) -> Result<String, MarkupError> {
        let selector: Selector = "*"
            .parse()
            .map_err(|e: lol_html::errors::SelectorError| MarkupError::Extraction(e.to_string()))?;

        let handlers = ElementContentHandlers::default().element(
            |el: &mut Element<'_, '_>| -> HandlerResult {
                visit(&mut LolElement(el))?;
                Ok(())
            },
        );

        let settings = RewriteStrSettings {
            element_content_handlers: vec![(Cow::Owned(selector), handlers)],
            strict: self.strict,
            ..RewriteStrSettings::new()
        };

        Ok(rewrite_str(html, settings)?)
    }
}

/// Adapts a `lol_html` element to [`ElementNode`].
struct LolElement<'a, 'r, 't>(&'a mut Element<'r, 't>);

impl ElementNode for LolElement<'_, '_, '_> {
    fn tag_name(&self) -> String {
        self.0.tag_name()
    }

    fn attributes(&self) -> Vec<(String, String)> {
        self.0
            .attributes()
            .iter()
            .map(|attr| (attr.name(), unescape_attribute(attr.value()).into_owned()))
            .collect()
    }

    fn set_attribute(&mut self, name: &str, value: &str) -> Result<(), MarkupError> {
        self.0
            .set_attribute(name, &escape_attribute(value))
            .map_err(|e| MarkupError::Extraction(e.to_string()))
    }

    fn remove_attribute(&mut self, name: &str) {
        self.0.remove_attribute(name);
    }
}
