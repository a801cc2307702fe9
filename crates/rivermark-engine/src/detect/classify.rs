//! Line-level predicates for block boundary detection.
//!
//! Each predicate looks at a single line in isolation; context-sensitive
//! decisions (is this `\`\`\`` opening or closing a fence?) live in
//! [`super::context`].

use std::sync::LazyLock;

use regex::Regex;

use crate::detect::context::BlockContext;
use crate::types::ContainerOptions;

static RE_HEADING: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^#{1,6}\s").expect("valid heading regex"));
static RE_THEMATIC_BREAK: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(\*{3,}|-{3,}|_{3,})\s*$").expect("valid break regex"));
static RE_UNORDERED_ITEM: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(\s*)[-*+](\s+|$)").expect("valid list regex"));
static RE_ORDERED_ITEM: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(\s*)\d{1,9}[.)](\s+|$)").expect("valid list regex"));
static RE_BLOCKQUOTE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\s{0,3}>").expect("valid blockquote regex"));
static RE_HTML_CONDITION: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)^\s{0,3}<(script|pre|style|textarea|!--|!DOCTYPE|\?|!\[CDATA\[)")
        .expect("valid html regex")
});
static RE_HTML_TAG: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\s{0,3}</?[a-zA-Z][a-zA-Z0-9-]*(\s|>|$)").expect("valid html regex")
});
static RE_TABLE_DELIMITER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\|?\s*:?-{3,}:?\s*(\|\s*:?-{3,}:?\s*)*\|?$").expect("valid table regex")
});
static RE_FOOTNOTE_DEF: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\[\^([^\]\s]+)\]:").expect("valid footnote regex"));

/// Blank or whitespace-only line.
pub fn is_blank(line: &str) -> bool {
    line.trim().is_empty()
}

/// ATX heading (`#` to `######` followed by whitespace).
pub fn is_heading(line: &str) -> bool {
    RE_HEADING.is_match(line)
}

/// Thematic break (`***`, `---`, `___`).
pub fn is_thematic_break(line: &str) -> bool {
    RE_THEMATIC_BREAK.is_match(line.trim())
}

/// Blockquote opener (`>` with up to 3 spaces of indentation).
pub fn is_blockquote_start(line: &str) -> bool {
    RE_BLOCKQUOTE.is_match(line)
}

/// Start of an HTML block, either a conditional section (script/pre/style/
/// comment/doctype/cdata) or a plain open/close tag.
pub fn is_html_block_start(line: &str) -> bool {
    RE_HTML_CONDITION.is_match(line) || RE_HTML_TAG.is_match(line)
}

/// GFM table delimiter row (`| --- | :---: |`).
pub fn is_table_delimiter(line: &str) -> bool {
    RE_TABLE_DELIMITER.is_match(line.trim())
}

/// Footnote definition opener (`[^id]:`); returns the identifier.
pub fn footnote_start(line: &str) -> Option<String> {
    RE_FOOTNOTE_DEF
        .captures(line)
        .map(|c| c[1].to_string())
}

/// A detected list item opener.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ListItemStart {
    pub ordered: bool,
    /// Visual indent width of the marker (tabs count as 4).
    pub indent: usize,
}

/// List item opener. A marker followed only by whitespace also counts,
/// so that lazily indented nested content keeps the list open.
pub fn list_item_start(line: &str) -> Option<ListItemStart> {
    if let Some(c) = RE_UNORDERED_ITEM.captures(line) {
        return Some(ListItemStart {
            ordered: false,
            indent: indent_width(&c[1]),
        });
    }
    if let Some(c) = RE_ORDERED_ITEM.captures(line) {
        return Some(ListItemStart {
            ordered: true,
            indent: indent_width(&c[1]),
        });
    }
    None
}

/// List item opener with content after the marker. Unlike
/// [`list_item_start`] this rejects a bare marker: `"-"` alone may still
/// grow into anything (or be a setext underline), and an empty item
/// cannot interrupt a paragraph.
pub fn list_item_with_text(line: &str) -> bool {
    if list_item_start(line).is_none() {
        return false;
    }
    let rest = line
        .trim_start()
        .trim_start_matches(|c: char| c.is_ascii_digit())
        .trim_start_matches(['-', '*', '+', '.', ')']);
    rest.starts_with(char::is_whitespace) && !rest.trim().is_empty()
}

/// Visual width of a line's leading whitespace (tab = 4 columns).
pub fn leading_indent_width(line: &str) -> usize {
    indent_width(line)
}

fn indent_width(s: &str) -> usize {
    let mut width = 0;
    for ch in s.chars() {
        match ch {
            ' ' => width += 1,
            '\t' => width += 4,
            _ => break,
        }
    }
    width
}

/// A detected code fence opener.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FenceSig {
    /// Fence character, `` ` `` or `~`.
    pub ch: char,
    /// Marker run length (at least 3).
    pub length: usize,
}

/// Code fence opener: three or more backticks or tildes after optional
/// leading whitespace.
pub fn fence_start(line: &str) -> Option<FenceSig> {
    let rest = line.trim_start();
    let ch = rest.chars().next()?;
    if ch != '`' && ch != '~' {
        return None;
    }
    let length = rest.chars().take_while(|&c| c == ch).count();
    if length >= 3 { Some(FenceSig { ch, length }) } else { None }
}

/// Fence closer for the fence currently open in `context`: a run of the
/// same character at least as long as the opener, nothing else on the line,
/// at most 3 spaces of indentation.
pub fn fence_end(line: &str, context: &BlockContext) -> bool {
    let (Some(ch), Some(min_len)) = (context.fence_char, context.fence_length) else {
        return false;
    };
    if !context.in_fenced_code {
        return false;
    }
    let spaces = line.len() - line.trim_start_matches(' ').len();
    if spaces > 3 {
        return false;
    }
    let rest = &line[spaces..];
    let run = rest.chars().take_while(|&c| c == ch).count();
    run >= min_len && rest[run * ch.len_utf8()..].trim().is_empty()
}

/// A recognized container marker line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContainerMatch {
    /// Container name; empty for close markers.
    pub name: String,
    /// Marker run length.
    pub marker_length: usize,
    /// Bare marker with no name or attributes.
    pub is_end: bool,
}

/// Container open/close marker (`::: name attrs` / `:::`).
///
/// A marker character directly followed by non-whitespace (`:::note`) is
/// not a marker line; the name must be separated by whitespace.
pub fn container_marker(line: &str, opts: &ContainerOptions) -> Option<ContainerMatch> {
    let rest = line.trim_start();
    let marker_length = rest.chars().take_while(|&c| c == opts.marker).count();
    if marker_length < opts.min_marker_length {
        return None;
    }
    let after = &rest[marker_length * opts.marker.len_utf8()..];
    if !after.is_empty() && !after.starts_with(char::is_whitespace) {
        return None;
    }
    let after = after.trim();

    let name: String = after
        .chars()
        .take_while(|c| c.is_alphanumeric() || *c == '_' || *c == '-')
        .collect();
    if !name.is_empty() && !name.starts_with(|c: char| c.is_alphanumeric() || c == '_') {
        return None;
    }
    let attrs = after[name.len()..].trim();
    let is_end = name.is_empty() && attrs.is_empty();

    if !is_end
        && let Some(allowed) = &opts.allowed_names
        && !allowed.iter().any(|n| n == &name)
    {
        return None;
    }

    Some(ContainerMatch {
        name,
        marker_length,
        is_end,
    })
}

/// Container closer for the container currently open in `context`: a bare
/// marker run at least as long as the opener.
pub fn container_end(line: &str, context: &BlockContext, opts: &ContainerOptions) -> bool {
    let Some(open_len) = context.container_marker_length else {
        return false;
    };
    if !context.in_container {
        return false;
    }
    match container_marker(line, opts) {
        Some(m) => m.is_end && m.marker_length >= open_len,
        None => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("# Title", true)]
    #[case("###### deep", true)]
    #[case("####### too deep", false)]
    #[case("#no space", false)]
    #[case("  # indented", false)]
    fn heading_detection(#[case] line: &str, #[case] expected: bool) {
        assert_eq!(is_heading(line), expected);
    }

    #[rstest]
    #[case("---", true)]
    #[case("*****", true)]
    #[case("___", true)]
    #[case("--", false)]
    #[case("- - -", false)]
    fn thematic_break_detection(#[case] line: &str, #[case] expected: bool) {
        assert_eq!(is_thematic_break(line), expected);
    }

    #[test]
    fn list_item_markers() {
        assert_eq!(
            list_item_start("- item"),
            Some(ListItemStart {
                ordered: false,
                indent: 0
            })
        );
        assert_eq!(
            list_item_start("  3) item"),
            Some(ListItemStart {
                ordered: true,
                indent: 2
            })
        );
        assert_eq!(list_item_start("-not a list"), None);
        assert_eq!(list_item_start("10000000000. overflow"), None);
    }

    #[test]
    fn bare_marker_counts_as_item() {
        // Lazy continuation: "- " or even "-" alone keeps the list open.
        assert!(list_item_start("- ").is_some());
        assert!(list_item_start("-").is_some());
    }

    #[test]
    fn item_with_text_rejects_bare_markers() {
        assert!(list_item_with_text("- item"));
        assert!(list_item_with_text("  2) item"));
        assert!(!list_item_with_text("-"));
        assert!(!list_item_with_text("- "));
        assert!(!list_item_with_text("1."));
        assert!(!list_item_with_text("plain text"));
    }

    #[test]
    fn fence_start_detection() {
        assert_eq!(fence_start("```rust"), Some(FenceSig { ch: '`', length: 3 }));
        assert_eq!(fence_start("  ~~~~"), Some(FenceSig { ch: '~', length: 4 }));
        assert_eq!(fence_start("``"), None);
        assert_eq!(fence_start("plain"), None);
    }

    #[test]
    fn fence_end_requires_matching_run() {
        let ctx = BlockContext {
            in_fenced_code: true,
            fence_char: Some('`'),
            fence_length: Some(4),
            ..Default::default()
        };
        assert!(fence_end("````", &ctx));
        assert!(fence_end("`````  ", &ctx));
        assert!(!fence_end("```", &ctx));
        assert!(!fence_end("~~~~", &ctx));
        assert!(!fence_end("```` trailing", &ctx));
    }

    #[test]
    fn footnote_marker_extracts_identifier() {
        assert_eq!(footnote_start("[^1]: note"), Some("1".to_string()));
        assert_eq!(footnote_start("[^long-id]:"), Some("long-id".to_string()));
        assert_eq!(footnote_start("[^]: empty"), None);
        assert_eq!(footnote_start("[1]: not a footnote"), None);
    }

    #[test]
    fn container_markers() {
        let opts = ContainerOptions::default();
        let open = container_marker("::: warning", &opts).unwrap();
        assert_eq!(open.name, "warning");
        assert_eq!(open.marker_length, 3);
        assert!(!open.is_end);

        let close = container_marker(":::", &opts).unwrap();
        assert!(close.is_end);

        let nested = container_marker(":::::: outer", &opts).unwrap();
        assert_eq!(nested.marker_length, 6);

        assert!(container_marker(":::note-without-space", &opts).is_none());
        assert!(container_marker("::", &opts).is_none());
    }

    #[test]
    fn container_allowed_names_filter() {
        let opts = ContainerOptions {
            allowed_names: Some(vec!["info".into()]),
            ..Default::default()
        };
        assert!(container_marker("::: info", &opts).is_some());
        assert!(container_marker("::: other", &opts).is_none());
        // Close markers are never filtered by name.
        assert!(container_marker(":::", &opts).is_some());
    }

    #[test]
    fn table_delimiter_rows() {
        assert!(is_table_delimiter("| --- | :---: |"));
        assert!(is_table_delimiter("---|---"));
        assert!(!is_table_delimiter("| a | b |"));
    }

    #[test]
    fn html_block_start_lines() {
        assert!(is_html_block_start("<div class=\"x\">"));
        assert!(is_html_block_start("<!-- comment"));
        assert!(is_html_block_start("</span>"));
        assert!(!is_html_block_start("a < b"));
    }

    #[test]
    fn indent_width_counts_tabs_as_four() {
        assert_eq!(leading_indent_width("    x"), 4);
        assert_eq!(leading_indent_width("\tx"), 4);
        assert_eq!(leading_indent_width("  \tx"), 6);
        assert_eq!(leading_indent_width("x"), 0);
    }
}
