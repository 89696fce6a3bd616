//! # html-sanitizer
//!
//! Whitelist-based cleaning of untrusted HTML fragments.
//!
//! The crate is organised around four layers:
//!
//! 1. **[`strategy`]** -- per-attribute cleaners (exact match, class tokens,
//!    inline style) selected by the [`AttributePolicy`](html_policy::AttributePolicy)
//!    variant.
//! 2. **[`tag_filter`]** -- regex pass that deletes delete-with-content blocks
//!    and strips every tag marker outside the whitelist.
//! 3. **[`markup`]** -- the parser/serializer seam ([`MarkupBackend`]) and its
//!    `lol_html` implementation.
//! 4. **[`walker`]** and **[`cleaner`]** -- the attribute walk over every
//!    element and the [`HtmlCleaner`] pipeline wrapping it all.
//!
//! ## Quick start
//!
//! ```rust
//! use html_policy::Policy;
//! use html_sanitizer::HtmlCleaner;
//!
//! let cleaner = HtmlCleaner::new(Policy::baseline()).unwrap();
//! let out = cleaner.clean(r#"<span style="line-height:1.42857;color:red">hi</span>"#);
//! assert_eq!(out.as_deref(), Some(r#"<span style="line-height:1.42857;">hi</span>"#));
//! assert_eq!(cleaner.clean("   "), None);
//! ```

pub mod cleaner;
pub mod markup;
pub mod strategy;
pub mod tag_filter;
pub mod walker;

// Re-export the most commonly used types at the crate root for ergonomic
// imports (`use html_sanitizer::HtmlCleaner`).
pub use cleaner::{CleanError, Cleaned, CleanerError, HtmlCleaner};
pub use markup::{ElementNode, ElementVisitor, LolHtmlBackend, MarkupBackend, MarkupError};
pub use strategy::{
    clean_attribute, AttributeCleaner, ClassAttributeCleaner, DefaultAttributeCleaner,
    StyleAttributeCleaner,
};
pub use tag_filter::{TagFilter, TagFilterError};
pub use walker::{AttributeWalker, WalkStats};
