use serde::{Deserialize, Serialize};

/// A byte range `[start, end)` into the stream buffer.
///
/// All parsed blocks store spans into the original stream, so slicing the
/// buffer with any span reproduces the exact source text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Span {
    /// Inclusive start byte offset.
    pub start: usize,
    /// Exclusive end byte offset.
    pub end: usize,
}

impl Span {
    #[must_use]
    pub fn len(self) -> usize {
        self.end.saturating_sub(self.start)
    }

    #[must_use]
    pub fn is_empty(self) -> bool {
        self.len() == 0
    }
}

/// Column alignment of a table cell, from the delimiter row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ColumnAlign {
    None,
    Left,
    Center,
    Right,
}

/// The kind of an [`AstNode`], with per-kind metadata.
///
/// Text-bearing leaves carry their text in [`AstNode::value`]; kinds here
/// only hold structural attributes (heading depth, link target, ...).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum NodeKind {
    Root,
    Paragraph,
    Heading { depth: u8 },
    ThematicBreak,
    BlockQuote,
    List { ordered: bool, start: Option<u64> },
    ListItem { checked: Option<bool> },
    Code { lang: Option<String> },
    Html,
    HtmlElement { tag: String, attrs: Vec<(String, String)> },
    Table { align: Vec<ColumnAlign> },
    TableRow { header: bool },
    TableCell,
    Text,
    Emphasis,
    Strong,
    Delete,
    InlineCode,
    Link { url: String, title: Option<String> },
    Image { url: String, alt: String, title: Option<String> },
    Break,
    Math { display: bool },
    FootnoteDefinition { identifier: String },
    FootnoteReference { identifier: String },
}

/// A node in the parsed document tree.
///
/// Deliberately uniform: every node has the same shape so that budget
/// counting, slicing and merging can traverse without knowing each kind.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AstNode {
    pub kind: NodeKind,
    /// Text content for leaf nodes (text, inline code, code blocks, math, raw html).
    pub value: Option<String>,
    pub children: Vec<AstNode>,
    /// Byte span in the original stream, when known.
    pub span: Option<Span>,
}

impl AstNode {
    pub fn new(kind: NodeKind) -> Self {
        Self {
            kind,
            value: None,
            children: Vec::new(),
            span: None,
        }
    }

    pub fn leaf(kind: NodeKind, value: impl Into<String>) -> Self {
        Self {
            kind,
            value: Some(value.into()),
            children: Vec::new(),
            span: None,
        }
    }

    pub fn text(value: impl Into<String>) -> Self {
        Self::leaf(NodeKind::Text, value)
    }

    #[must_use]
    pub fn with_span(mut self, span: Span) -> Self {
        self.span = Some(span);
        self
    }

    /// Appends a child, merging adjacent text and raw-html leaves.
    ///
    /// Soft breaks arrive as separate `"\n"` text events from the grammar
    /// engine; merging keeps one text leaf per run, which the transformer's
    /// incremental merge path relies on.
    pub fn push(&mut self, child: AstNode) {
        if matches!(child.kind, NodeKind::Text | NodeKind::Html)
            && let Some(last) = self.children.last_mut()
            && last.kind == child.kind
            && let (Some(existing), Some(added)) = (last.value.as_mut(), child.value.as_ref())
        {
            existing.push_str(added);
            if let (Some(a), Some(b)) = (last.span, child.span) {
                last.span = Some(Span {
                    start: a.start,
                    end: b.end,
                });
            }
            return;
        }
        self.children.push(child);
    }

    /// True for nodes that carry no children (text leaves and marker leaves
    /// like images or thematic breaks).
    pub fn is_leaf(&self) -> bool {
        self.children.is_empty()
    }

    /// Appends the concatenated text content of this subtree to `out`.
    pub fn collect_text(&self, out: &mut String) {
        if let Some(v) = &self.value {
            out.push_str(v);
            return;
        }
        for child in &self.children {
            child.collect_text(out);
        }
    }

    /// The concatenated text content of this subtree.
    pub fn plain_text(&self) -> String {
        let mut out = String::new();
        self.collect_text(&mut out);
        out
    }

    /// Depth-first pre-order visit.
    pub fn visit(&self, f: &mut impl FnMut(&AstNode)) {
        f(self);
        for child in &self.children {
            child.visit(f);
        }
    }
}
