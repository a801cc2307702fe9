//! Adapter from the pulldown-cmark event stream to [`AstNode`] trees.
//!
//! The grammar engine is only ever handed complete block spans, so this
//! module has no notion of stability. Byte ranges from the event stream are
//! rebased onto the full-stream offset of the fragment being parsed.

pub mod html_tree;

use std::collections::BTreeMap;

use pulldown_cmark::{Alignment, CodeBlockKind, Event, Options, Parser, Tag};

use crate::ast::{AstNode, ColumnAlign, NodeKind, Span};
use crate::types::{Definition, DefinitionMap, ParserOptions};

pub use html_tree::HtmlTreeOptions;

/// Resolved grammar configuration, derived once from [`ParserOptions`].
#[derive(Debug, Clone)]
pub struct GrammarOptions {
    options: Options,
    html_tree: Option<HtmlTreeOptions>,
}

impl GrammarOptions {
    pub fn from_parser_options(opts: &ParserOptions) -> Self {
        let mut options = opts.extra_options;
        if opts.gfm {
            options |= Options::ENABLE_TABLES
                | Options::ENABLE_STRIKETHROUGH
                | Options::ENABLE_TASKLISTS
                | Options::ENABLE_FOOTNOTES;
        }
        if opts.math {
            options |= Options::ENABLE_MATH;
        }
        Self {
            options,
            html_tree: opts.html_tree.clone(),
        }
    }
}

/// A parsed fragment: the tree plus the link reference definitions the
/// grammar engine collected from it.
#[derive(Debug, Clone, PartialEq)]
pub struct Fragment {
    pub root: AstNode,
    pub definitions: DefinitionMap,
}

/// Parses one fragment of source text. `base` is the byte offset of the
/// fragment's first character in the full stream; all spans in the result
/// are expressed in full-stream coordinates.
pub fn parse_fragment(text: &str, base: usize, opts: &GrammarOptions) -> Fragment {
    let parser = Parser::new_ext(text, opts.options);

    let mut definitions = BTreeMap::new();
    for (label, def) in parser.reference_definitions().iter() {
        definitions.insert(
            label.to_string(),
            Definition {
                identifier: label.to_string(),
                url: def.dest.to_string(),
                title: def.title.as_ref().map(|t| t.to_string()),
            },
        );
    }

    let mut stack = vec![AstNode::new(NodeKind::Root).with_span(Span {
        start: base,
        end: base + text.len(),
    })];

    for (event, range) in parser.into_offset_iter() {
        let span = Span {
            start: base + range.start,
            end: base + range.end,
        };
        match event {
            Event::Start(tag) => {
                stack.push(map_tag(tag).with_span(span));
            }
            Event::End(_) => fold_top(&mut stack),
            Event::Text(t) => {
                push_leaf(&mut stack, AstNode::text(t.into_string()).with_span(span));
            }
            Event::Code(t) => {
                push_leaf(
                    &mut stack,
                    AstNode::leaf(NodeKind::InlineCode, t.into_string()).with_span(span),
                );
            }
            Event::InlineMath(t) => {
                push_leaf(
                    &mut stack,
                    AstNode::leaf(NodeKind::Math { display: false }, t.into_string())
                        .with_span(span),
                );
            }
            Event::DisplayMath(t) => {
                push_leaf(
                    &mut stack,
                    AstNode::leaf(NodeKind::Math { display: true }, t.into_string())
                        .with_span(span),
                );
            }
            Event::Html(t) | Event::InlineHtml(t) => {
                push_leaf(
                    &mut stack,
                    AstNode::leaf(NodeKind::Html, t.into_string()).with_span(span),
                );
            }
            Event::FootnoteReference(id) => {
                push_leaf(
                    &mut stack,
                    AstNode::new(NodeKind::FootnoteReference {
                        identifier: id.into_string(),
                    })
                    .with_span(span),
                );
            }
            Event::SoftBreak => {
                push_leaf(&mut stack, AstNode::text("\n").with_span(span));
            }
            Event::HardBreak => {
                push_leaf(&mut stack, AstNode::new(NodeKind::Break).with_span(span));
            }
            Event::Rule => {
                push_leaf(
                    &mut stack,
                    AstNode::new(NodeKind::ThematicBreak).with_span(span),
                );
            }
            Event::TaskListMarker(checked) => {
                if let Some(item) = stack
                    .iter_mut()
                    .rev()
                    .find(|n| matches!(n.kind, NodeKind::ListItem { .. }))
                {
                    item.kind = NodeKind::ListItem {
                        checked: Some(checked),
                    };
                }
            }
        }
    }

    // Unbalanced events should not happen for complete fragments, but a
    // truncated tail must still fold up into a tree rather than panic.
    while stack.len() > 1 {
        fold_top(&mut stack);
    }
    let mut root = stack.pop().unwrap_or_else(|| AstNode::new(NodeKind::Root));

    if let Some(html_opts) = &opts.html_tree {
        html_tree::expand_html(&mut root, html_opts);
    }

    Fragment { root, definitions }
}

fn push_leaf(stack: &mut Vec<AstNode>, leaf: AstNode) {
    if let Some(parent) = stack.last_mut() {
        parent.push(leaf);
    }
}

/// Pops the top node, finishes it, and attaches it to its parent. The root
/// is never popped.
fn fold_top(stack: &mut Vec<AstNode>) {
    if stack.len() > 1
        && let Some(node) = stack.pop()
    {
        let node = close_node(node);
        if let Some(parent) = stack.last_mut() {
            parent.push(node);
        }
    }
}

fn map_tag(tag: Tag<'_>) -> AstNode {
    match tag {
        Tag::Paragraph => AstNode::new(NodeKind::Paragraph),
        Tag::Heading { level, .. } => AstNode::new(NodeKind::Heading {
            depth: level as u8,
        }),
        Tag::BlockQuote(_) => AstNode::new(NodeKind::BlockQuote),
        Tag::CodeBlock(kind) => {
            let lang = match kind {
                CodeBlockKind::Fenced(info) => {
                    let lang = info.split_whitespace().next().unwrap_or("");
                    if lang.is_empty() {
                        None
                    } else {
                        Some(lang.to_string())
                    }
                }
                CodeBlockKind::Indented => None,
            };
            AstNode::new(NodeKind::Code { lang })
        }
        Tag::HtmlBlock => AstNode::new(NodeKind::Html),
        Tag::List(start) => AstNode::new(NodeKind::List {
            ordered: start.is_some(),
            start,
        }),
        Tag::Item => AstNode::new(NodeKind::ListItem { checked: None }),
        Tag::FootnoteDefinition(id) => AstNode::new(NodeKind::FootnoteDefinition {
            identifier: id.into_string(),
        }),
        Tag::Table(alignments) => AstNode::new(NodeKind::Table {
            align: alignments.into_iter().map(map_alignment).collect(),
        }),
        Tag::TableHead => AstNode::new(NodeKind::TableRow { header: true }),
        Tag::TableRow => AstNode::new(NodeKind::TableRow { header: false }),
        Tag::TableCell => AstNode::new(NodeKind::TableCell),
        Tag::Emphasis => AstNode::new(NodeKind::Emphasis),
        Tag::Strong => AstNode::new(NodeKind::Strong),
        Tag::Strikethrough => AstNode::new(NodeKind::Delete),
        Tag::Link {
            dest_url, title, ..
        } => AstNode::new(NodeKind::Link {
            url: dest_url.into_string(),
            title: if title.is_empty() {
                None
            } else {
                Some(title.into_string())
            },
        }),
        Tag::Image {
            dest_url, title, ..
        } => AstNode::new(NodeKind::Image {
            url: dest_url.into_string(),
            alt: String::new(),
            title: if title.is_empty() {
                None
            } else {
                Some(title.into_string())
            },
        }),
        // Extensions with no tree representation of their own degrade to
        // paragraphs so the event stream stays balanced.
        _ => AstNode::new(NodeKind::Paragraph),
    }
}

/// Finishes a popped node: code and raw-html containers fold their text
/// children into `value`, images fold theirs into the alt text.
fn close_node(mut node: AstNode) -> AstNode {
    match &mut node.kind {
        NodeKind::Code { .. } | NodeKind::Html => {
            let mut text = String::new();
            for child in &node.children {
                child.collect_text(&mut text);
            }
            // Block code events carry a trailing newline the source had.
            node.value = Some(text);
            node.children.clear();
        }
        NodeKind::Image { alt, .. } => {
            let mut text = String::new();
            for child in &node.children {
                child.collect_text(&mut text);
            }
            *alt = text;
            node.children.clear();
        }
        _ => {}
    }
    node
}

fn map_alignment(a: Alignment) -> ColumnAlign {
    match a {
        Alignment::None => ColumnAlign::None,
        Alignment::Left => ColumnAlign::Left,
        Alignment::Center => ColumnAlign::Center,
        Alignment::Right => ColumnAlign::Right,
    }
}
