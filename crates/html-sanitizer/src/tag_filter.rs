//! Regex-driven removal of disallowed tags from raw or serialized markup.
//!
//! This pass knows nothing about attributes.  It deletes delete-with-content
//! blocks wholesale and strips the markers of every other tag that is not on
//! the element whitelist, leaving the text between them in place.

use std::collections::HashSet;

use html_policy::{is_valid_element_name, Policy};
use regex::{Captures, Regex};
use tracing::debug;

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

/// Errors that can occur while constructing a [`TagFilter`].
#[derive(Debug, thiserror::Error)]
pub enum TagFilterError {
    #[error("invalid element name: '{0}'")]
    InvalidElementName(String),

    #[error("failed to compile tag pattern: {0}")]
    RegexCompile(#[from] regex::Error),
}

// ---------------------------------------------------------------------------
// Patterns
// ---------------------------------------------------------------------------

/// Any tag-like construct.  Group 1 captures the element name of open, close
/// and self-closing tags; comments, `<!...>` declarations, `<?...?>`
/// instructions and bogus end tags match without it.  Quoted attribute
/// values may contain `>`, and an unterminated construct runs to the end of
/// the input.  A run of `<` directly before a tag belongs to that tag, so
/// `<<<em>em>em>` is consumed in one pass instead of one layer per pass.
const TAG_PATTERN: &str = r#"(?s)<!--.*?(?:-->|\z)|<![^>]*(?:>|\z)|<\?[^>]*(?:>|\z)|</[^A-Za-z][^>]*(?:>|\z)|<+/?([A-Za-z][A-Za-z0-9:_-]*)(?:[^>"']|"[^"]*(?:"|\z)|'[^']*(?:'|\z))*(?:>|\z)"#;

/// Upper bound on filter rounds, and on delete passes within one round.
/// Input that has not settled by then loses every remaining `<`.
const MAX_ROUNDS: usize = 16;

/// Build the pattern matching a whole `<name ...>...</name>` block.  The
/// shortest span wins; a block with no end tag extends to the end of input.
fn delete_block_pattern(name: &str) -> String {
    format!(r"(?is)<{name}(?:[\s/][^>]*)?>.*?(?:</{name}(?:[\s/][^>]*)?(?:>|\z)|\z)")
}

// ---------------------------------------------------------------------------
// TagFilter
// ---------------------------------------------------------------------------

/// Compiled tag filter for one whitelist.
#[derive(Debug, Clone)]
pub struct TagFilter {
    allowed: HashSet<String>,
    tag_regex: Regex,
    /// One pattern per delete-with-content element, in configuration order.
    delete_regexes: Vec<Regex>,
}

impl TagFilter {
    /// Compile a filter that keeps `allowed` elements and deletes
    /// `delete_with_content` elements together with their content.
    ///
    /// Element names are matched case-insensitively.  A name that is not a
    /// plain tag name is rejected here rather than at filtering time.
    pub fn new<A, D>(allowed: A, delete_with_content: D) -> Result<Self, TagFilterError>
    where
        A: IntoIterator,
        A::Item: AsRef<str>,
        D: IntoIterator,
        D::Item: AsRef<str>,
    {
        let allowed = allowed
            .into_iter()
            .map(|name| checked_name(name.as_ref()))
            .collect::<Result<HashSet<_>, _>>()?;

        let delete_regexes = delete_with_content
            .into_iter()
            .map(|name| -> Result<Regex, TagFilterError> {
                let name = checked_name(name.as_ref())?;
                Ok(Regex::new(&delete_block_pattern(&name))?)
            })
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self {
            allowed,
            tag_regex: Regex::new(TAG_PATTERN)?,
            delete_regexes,
        })
    }

    /// Compile the filter described by `policy`.
    pub fn from_policy(policy: &Policy) -> Result<Self, TagFilterError> {
        Self::new(policy.element_names(), policy.delete_with_content())
    }

    /// Remove delete-with-content blocks, then strip every disallowed tag
    /// marker, repeating until the text no longer changes.
    ///
    /// Each round is linear in the input and the number of rounds is capped,
    /// so the cost stays linear however deeply markers are nested.  If the
    /// cap is reached the result keeps no `<` at all.
    pub fn filter(&self, html: &str) -> String {
        self.filter_rounds(html, MAX_ROUNDS)
    }

    fn filter_rounds(&self, html: &str, max_rounds: usize) -> String {
        let mut current = html.to_string();
        for _ in 0..max_rounds {
            let next = self.strip_tags(&self.delete_blocks(&current, max_rounds));
            if next == current {
                return next;
            }
            current = next;
        }
        debug!(
            rounds = max_rounds,
            len = current.len(),
            "tag filter did not settle; removing all remaining tag openers"
        );
        current.replace('<', "")
    }

    /// Delete blocks until none are left or `max_passes` is reached.
    /// Removing one block can join the text around it into a new opening
    /// tag, so a single pass is not enough.
    fn delete_blocks(&self, html: &str, max_passes: usize) -> String {
        let mut out = html.to_string();
        for _ in 0..max_passes {
            let Some(re) = self.delete_regexes.iter().find(|re| re.is_match(&out)) else {
                break;
            };
            out = re.replace_all(&out, "").into_owned();
        }
        out
    }

    fn strip_tags(&self, html: &str) -> String {
        self.tag_regex
            .replace_all(html, |caps: &Captures| match caps.get(1) {
                Some(name) if self.allowed.contains(&name.as_str().to_ascii_lowercase()) => {
                    caps[0].to_string()
                }
                _ => String::new(),
            })
            .into_owned()
    }

    /// Whether `name` survives the filter.
    pub fn allows(&self, name: &str) -> bool {
        self.allowed.contains(&name.to_ascii_lowercase())
    }
}

fn checked_name(name: &str) -> Result<String, TagFilterError> {
    if !is_valid_element_name(name) {
        return Err(TagFilterError::InvalidElementName(name.to_string()));
    }
    Ok(name.to_ascii_lowercase())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn filter() -> TagFilter {
        TagFilter::new(["div", "span", "br", "strong"], ["script"])
            .expect("filter should compile")
    }

    #[test]
    fn keeps_allowed_tags_verbatim() {
        let f = filter();
        assert_eq!(
            f.filter(r#"<div class="x"><span>hi</span><br/></div>"#),
            r#"<div class="x"><span>hi</span><br/></div>"#
        );
    }

    #[test]
    fn strips_disallowed_markers_but_keeps_text() {
        let f = filter();
        assert_eq!(
            f.filter("<p>one <em>two</em></p><a href='x'>three</a>"),
            "one twothree"
        );
    }

    #[test]
    fn deletes_script_block_with_content() {
        let f = filter();
        assert_eq!(
            f.filter(r#"<div>a<script type="text/javascript">alert("<b>")</script>b</div>"#),
            "<div>ab</div>"
        );
    }

    #[test]
    fn delete_is_case_insensitive_and_spans_lines() {
        let f = filter();
        assert_eq!(f.filter("x<SCRIPT>\nalert(1);\n</ScRiPt >y"), "xy");
    }

    #[test]
    fn delete_uses_shortest_span() {
        let f = filter();
        assert_eq!(
            f.filter("<script>a</script>keep<script>b</script>"),
            "keep"
        );
    }

    #[test]
    fn unterminated_script_runs_to_end() {
        let f = filter();
        assert_eq!(f.filter("<div>ok</div><script>alert(1)"), "<div>ok</div>");
    }

    #[test]
    fn script_prefix_names_are_not_deleted_blocks() {
        let f = filter();
        assert_eq!(f.filter("<scripts>text</scripts>"), "text");
    }

    #[test]
    fn nested_marker_cannot_reassemble() {
        let f = filter();
        let out = f.filter("<<script>script>alert(1)<</script>/script>");
        assert!(!out.to_ascii_lowercase().contains("<script"), "got {out}");
        assert!(!out.contains("alert(1)"), "got {out}");
    }

    #[test]
    fn deleted_block_cannot_splice_a_new_one() {
        let f = filter();
        assert_eq!(f.filter("<scr<script>x</script>ipt>alert(1)</script>ok"), "ok");
    }

    #[test]
    fn stripped_marker_cannot_splice_a_new_block() {
        let f = filter();
        assert_eq!(f.filter("<<em>script>alert(1)<</em>/script>ok"), "ok");
    }

    #[test]
    fn stray_openers_before_a_tag_are_removed_with_it() {
        let f = filter();
        assert_eq!(f.filter("<<<em>em>em>"), "em>em>");
        assert_eq!(f.filter("a<<div>b</div>"), "a<<div>b</div>");
    }

    #[test]
    fn deeply_nested_markers_settle_quickly() {
        let f = filter();
        let depth = 50_000;
        let input = format!("{}em>{}", "<".repeat(depth), "em>".repeat(depth - 1));
        assert_eq!(f.filter(&input), "em>".repeat(depth - 1));

        let layers = 10_000;
        let layered = format!(
            "{}<script>x</script>{}",
            "<scr".repeat(layers),
            "ipt>y</script>".repeat(layers)
        );
        let out = f.filter(&layered);
        assert!(!out.contains('<'), "tag opener survived");
        assert!(!out.contains('x'), "deleted content survived");
    }

    #[test]
    fn unsettled_input_loses_every_opener() {
        let f = filter();
        let out = f.filter_rounds("<p>a</p><div>b</div><<em>em>", 1);
        assert!(!out.contains('<'), "got {out}");
        assert!(out.contains('a') && out.contains('b'), "got {out}");
    }

    #[test]
    fn quoted_gt_does_not_end_tag() {
        let f = filter();
        assert_eq!(f.filter(r#"<img alt="a>b" src=x>after"#), "after");
    }

    #[test]
    fn unterminated_disallowed_tag_is_removed_to_end() {
        let f = filter();
        assert_eq!(f.filter(r#"before<img src="x onerror=alert(1)>"#), "before");
        assert_eq!(f.filter("before<iframe"), "before");
    }

    #[test]
    fn comments_and_declarations_are_removed() {
        let f = filter();
        assert_eq!(
            f.filter("<!DOCTYPE html><!-- <script>x</script> --><?xml version='1.0'?>text</ >"),
            "text"
        );
    }

    #[test]
    fn allowed_names_match_case_insensitively() {
        let f = filter();
        assert_eq!(f.filter("<DIV>x</Div>"), "<DIV>x</Div>");
        assert!(f.allows("STRONG"));
        assert!(!f.allows("p"));
    }

    #[test]
    fn lone_angle_brackets_are_text() {
        let f = filter();
        assert_eq!(f.filter("1 < 2 and 3 > 2"), "1 < 2 and 3 > 2");
    }

    #[test]
    fn rejects_names_with_metacharacters() {
        let err = TagFilter::new(["div"], ["scr(ipt"]).unwrap_err();
        assert!(matches!(err, TagFilterError::InvalidElementName(ref n) if n == "scr(ipt"));

        let err = TagFilter::new(["d.v"], Vec::<String>::new()).unwrap_err();
        assert!(matches!(err, TagFilterError::InvalidElementName(_)));
    }

    #[test]
    fn from_policy_uses_whitelist() {
        let f = TagFilter::from_policy(&Policy::baseline()).unwrap();
        assert_eq!(
            f.filter("<strong>a</strong><b>b</b><script>c</script>"),
            "<strong>a</strong>b"
        );
    }

    #[test]
    fn filtering_is_idempotent() {
        let f = filter();
        let once = f.filter("<p><div onclick='x'>a<script>b</script></div><iframe>c</iframe>");
        assert_eq!(f.filter(&once), once);
    }
}
