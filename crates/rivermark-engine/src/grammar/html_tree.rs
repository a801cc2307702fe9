//! Optional expansion of raw html leaves into structured element trees.
//!
//! The grammar engine hands html through as opaque text. When enabled,
//! this pass re-parses each raw html leaf with a small forgiving tokenizer
//! so renderers can walk elements instead of re-parsing strings. This is
//! not a conforming html parser: unclosed elements auto-close at the end
//! of the leaf, and unknown syntax degrades to text.

use serde::{Deserialize, Serialize};

use crate::ast::{AstNode, NodeKind};

/// Elements that never take a closing tag.
const VOID_ELEMENTS: &[&str] = &[
    "area", "base", "br", "col", "embed", "hr", "img", "input", "link", "meta", "param", "source",
    "track", "wbr",
];

/// Configuration for html tree expansion.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HtmlTreeOptions {
    /// Tags dropped entirely, children included.
    pub blocked_tags: Vec<String>,
}

impl Default for HtmlTreeOptions {
    fn default() -> Self {
        Self {
            blocked_tags: vec!["script".to_string(), "style".to_string()],
        }
    }
}

/// Replaces every raw html leaf under `root` with parsed element nodes.
pub fn expand_html(root: &mut AstNode, opts: &HtmlTreeOptions) {
    let mut i = 0;
    while i < root.children.len() {
        let child = &mut root.children[i];
        if child.kind == NodeKind::Html {
            let raw = child.value.clone().unwrap_or_default();
            let span = child.span;
            let mut parsed = parse_html(&raw, opts);
            for node in &mut parsed {
                if node.span.is_none() {
                    node.span = span;
                }
            }
            let count = parsed.len();
            root.children.splice(i..=i, parsed);
            i += count;
        } else {
            expand_html(child, opts);
            i += 1;
        }
    }
}

/// Parses a raw html string into a forest of element and text nodes.
pub fn parse_html(raw: &str, opts: &HtmlTreeOptions) -> Vec<AstNode> {
    let mut roots: Vec<AstNode> = Vec::new();
    // Open elements, innermost last. A depth counter per blocked subtree
    // would also work; instead blocked elements are simply never pushed to
    // output when they close.
    let mut stack: Vec<(String, AstNode, bool)> = Vec::new();
    let mut rest = raw;

    let mut emit = |stack: &mut Vec<(String, AstNode, bool)>, roots: &mut Vec<AstNode>, node: AstNode, blocked: bool| {
        if blocked {
            return;
        }
        match stack.last_mut() {
            Some((_, parent, _)) => parent.children.push(node),
            None => roots.push(node),
        }
    };

    while !rest.is_empty() {
        let in_blocked = stack.iter().any(|(_, _, b)| *b);

        if let Some(comment_len) = comment_len(rest) {
            rest = &rest[comment_len..];
            continue;
        }

        if rest.starts_with("</") {
            if let Some((name, consumed)) = close_tag(rest) {
                rest = &rest[consumed..];
                // Pop to the matching open element, auto-closing inner ones.
                if let Some(pos) = stack.iter().rposition(|(n, _, _)| *n == name) {
                    while stack.len() > pos {
                        if let Some((_, node, blocked)) = stack.pop() {
                            emit(&mut stack, &mut roots, node, blocked);
                        }
                    }
                }
                continue;
            }
        }

        if rest.starts_with('<') {
            if let Some((tag, attrs, self_closing, consumed)) = open_tag(rest) {
                rest = &rest[consumed..];
                let blocked = in_blocked || opts.blocked_tags.iter().any(|t| t == &tag);
                let node = AstNode::new(NodeKind::HtmlElement {
                    tag: tag.clone(),
                    attrs,
                });
                if self_closing || VOID_ELEMENTS.contains(&tag.as_str()) {
                    emit(&mut stack, &mut roots, node, blocked);
                } else {
                    stack.push((tag, node, blocked));
                }
                continue;
            }
        }

        // Text run up to the next angle bracket (or a lone `<`).
        let next = rest[1..].find('<').map_or(rest.len(), |p| p + 1);
        let text = &rest[..next];
        if !text.trim().is_empty() {
            emit(&mut stack, &mut roots, AstNode::text(text), in_blocked);
        }
        rest = &rest[next..];
    }

    // Auto-close whatever is still open.
    while let Some((_, node, blocked)) = stack.pop() {
        emit(&mut stack, &mut roots, node, blocked);
    }
    roots
}

fn comment_len(rest: &str) -> Option<usize> {
    if !rest.starts_with("<!--") {
        return None;
    }
    match rest.find("-->") {
        Some(p) => Some(p + 3),
        None => Some(rest.len()),
    }
}

/// `</name>`; returns the lowercased name and bytes consumed.
fn close_tag(rest: &str) -> Option<(String, usize)> {
    let end = rest.find('>')?;
    let name: String = rest[2..end].trim().to_ascii_lowercase();
    if name.is_empty() || !name.chars().all(|c| c.is_ascii_alphanumeric() || c == '-') {
        return None;
    }
    Some((name, end + 1))
}

/// `<name attr="v" ...>` or `<name ... />`; returns tag, attributes,
/// self-closing flag and bytes consumed.
fn open_tag(rest: &str) -> Option<(String, Vec<(String, String)>, bool, usize)> {
    let end = rest.find('>')?;
    let inner = &rest[1..end];
    let self_closing = inner.ends_with('/');
    let inner = inner.strip_suffix('/').unwrap_or(inner);

    if !inner.chars().next()?.is_ascii_alphabetic() {
        return None;
    }
    let name_end = inner
        .find(|c: char| !(c.is_ascii_alphanumeric() || c == '-'))
        .unwrap_or(inner.len());
    let tag = inner[..name_end].to_ascii_lowercase();
    let attrs = parse_attrs(&inner[name_end..]);
    Some((tag, attrs, self_closing, end + 1))
}

fn parse_attrs(mut rest: &str) -> Vec<(String, String)> {
    let mut attrs = Vec::new();
    loop {
        rest = rest.trim_start();
        if rest.is_empty() {
            break;
        }
        let name_end = rest
            .find(|c: char| c == '=' || c.is_whitespace())
            .unwrap_or(rest.len());
        let name = rest[..name_end].to_ascii_lowercase();
        rest = &rest[name_end..];
        if name.is_empty() {
            // Skip a stray character rather than loop forever.
            rest = &rest[rest.chars().next().map_or(0, char::len_utf8)..];
            continue;
        }

        rest = rest.trim_start();
        let value = if let Some(after_eq) = rest.strip_prefix('=') {
            let after_eq = after_eq.trim_start();
            if let Some(q) = after_eq.strip_prefix('"') {
                let end = q.find('"').unwrap_or(q.len());
                rest = &q[(end + 1).min(q.len())..];
                q[..end].to_string()
            } else if let Some(q) = after_eq.strip_prefix('\'') {
                let end = q.find('\'').unwrap_or(q.len());
                rest = &q[(end + 1).min(q.len())..];
                q[..end].to_string()
            } else {
                let end = after_eq
                    .find(char::is_whitespace)
                    .unwrap_or(after_eq.len());
                rest = &after_eq[end..];
                after_eq[..end].to_string()
            }
        } else {
            String::new()
        };
        attrs.push((name, value));
    }
    attrs
}
