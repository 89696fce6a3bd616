//! High-level cleaner that runs the full pipeline:
//! tag filter, parse + attribute walk + serialize, tag filter again.

use html_policy::Policy;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::markup::{LolHtmlBackend, MarkupBackend, MarkupError};
use crate::tag_filter::{TagFilter, TagFilterError};
use crate::walker::{self, WalkStats};

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

/// Errors raised while building an [`HtmlCleaner`].
#[derive(Debug, thiserror::Error)]
pub enum CleanerError {
    #[error("failed to build tag filter: {0}")]
    TagFilter(#[from] TagFilterError),
}

/// Why a fragment could not be cleaned.  [`HtmlCleaner::clean`] collapses
/// all of these into `None`.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CleanError {
    #[error("input is empty")]
    EmptyInput,

    #[error("parse failure: {0}")]
    ParseFailure(String),

    #[error("element extraction failure: {0}")]
    ExtractionFailure(String),
}

impl From<MarkupError> for CleanError {
    fn from(err: MarkupError) -> Self {
        match err {
            MarkupError::Parse(msg) => CleanError::ParseFailure(msg),
            MarkupError::Extraction(msg) => CleanError::ExtractionFailure(msg),
        }
    }
}

// ---------------------------------------------------------------------------
// Result
// ---------------------------------------------------------------------------

/// A successfully cleaned fragment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Cleaned {
    pub html: String,
    pub stats: WalkStats,
}

// ---------------------------------------------------------------------------
// HtmlCleaner
// ---------------------------------------------------------------------------

/// Main entry point for whitelist sanitization.
///
/// The policy and the compiled tag filter are fixed at construction, so a
/// single cleaner can be shared across threads and reused for any number of
/// fragments.
///
/// # Example
///
/// ```rust
/// use html_policy::Policy;
/// use html_sanitizer::HtmlCleaner;
///
/// let cleaner = HtmlCleaner::new(Policy::baseline()).unwrap();
/// let out = cleaner.clean(r#"<div onclick="x()">hi<script>alert(1)</script></div>"#);
/// assert_eq!(out.as_deref(), Some("<div>hi</div>"));
/// ```
pub struct HtmlCleaner<B = LolHtmlBackend> {
    policy: Policy,
    filter: TagFilter,
    backend: B,
}

impl<B> std::fmt::Debug for HtmlCleaner<B> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HtmlCleaner")
            .field("elements", &self.policy.element_names().count())
            .field("delete_with_content", &self.policy.delete_with_content())
            .field("backend", &std::any::type_name::<B>())
            .finish()
    }
}

impl HtmlCleaner<LolHtmlBackend> {
    /// Create a cleaner for `policy` using the default `lol_html` backend.
    pub fn new(policy: Policy) -> Result<Self, CleanerError> {
        Self::with_backend(policy, LolHtmlBackend::default())
    }
}

impl<B: MarkupBackend> HtmlCleaner<B> {
    /// Create a cleaner for `policy` using a custom parser/serializer.
    pub fn with_backend(policy: Policy, backend: B) -> Result<Self, CleanerError> {
        let filter = TagFilter::from_policy(&policy)?;
        Ok(Self {
            policy,
            filter,
            backend,
        })
    }

    /// The policy this cleaner enforces.
    pub fn policy(&self) -> &Policy {
        &self.policy
    }

    /// Clean `html`, returning `None` when the input is empty or cannot be
    /// parsed.  `None` is distinct from a successful result; a successful
    /// result always carries the surviving markup.
    pub fn clean(&self, html: &str) -> Option<String> {
        match self.try_clean(html) {
            Ok(cleaned) => Some(cleaned.html),
            Err(e) => {
                debug!(error = %e, "html fragment could not be cleaned");
                None
            }
        }
    }

    /// Same pipeline as [`clean`](Self::clean) but reports why a fragment
    /// was rejected, along with walk counters on success.
    pub fn try_clean(&self, html: &str) -> Result<Cleaned, CleanError> {
        if html.trim().is_empty() {
            return Err(CleanError::EmptyInput);
        }

        // Coarse strip before parsing.
        let prefiltered = self.filter.filter(html);
        if prefiltered.trim().is_empty() {
            return Err(CleanError::EmptyInput);
        }

        let (serialized, stats) = walker::walk(&self.policy, &self.backend, &prefiltered)?;

        // The serializer may have produced tag shapes the first pass could
        // not see.
        let html = self.filter.filter(&serialized);

        debug!(
            input_len = prefiltered.len(),
            output_len = html.len(),
            elements = stats.elements_visited,
            attributes_removed = stats.attributes_removed,
            attributes_rewritten = stats.attributes_rewritten,
            "html fragment cleaned"
        );

        Ok(Cleaned { html, stats })
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
