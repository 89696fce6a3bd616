//! # html-policy
//!
//! The whitelist model for the HTML cleaner.  This crate loads YAML policy
//! files, validates them, and compiles them into an immutable [`Policy`] that
//! answers "is this element allowed?" and "how is this attribute checked?".
//!
//! ## Quick start
//!
//! ```rust
//! use html_policy::{AttributePolicy, Policy};
//!
//! let policy = Policy::baseline();
//! assert!(policy.allows_element("strong"));
//! assert!(matches!(
//!     policy.attribute_policy("span", "style"),
//!     Some(AttributePolicy::StyleConstraint { .. })
//! ));
//! ```

pub mod loader;
mod policy;
mod schema;

// Re-export primary public API at crate root.
pub use loader::{is_valid_element_name, PolicyError};
pub use policy::{ElementPolicy, Policy};
pub use schema::{AttributePolicy, ElementRules, PolicyConfig};
