//! Per-block-kind overrides for counting and slicing.
//!
//! Some blocks should not reveal character by character: a diagram is
//! meaningless half-drawn, an image either shows or it doesn't. Plugins
//! intercept the budget machinery for the blocks they match. They are
//! consulted in registration order against the block's root node only, and
//! the first definitive answer wins.

use crate::ast::{AstNode, NodeKind};
use crate::transform::budget;

/// A plugin's answer when asked to slice a block it matches.
#[derive(Debug, Clone, PartialEq)]
pub enum SliceOutcome {
    /// Defer to later plugins or the default slicer.
    Unhandled,
    /// Show nothing for this block at this progress.
    Hidden,
    /// Show exactly this tree.
    Sliced(AstNode),
}

/// Overrides reveal behavior for matching blocks.
pub trait TransformerPlugin {
    fn name(&self) -> &str;

    /// Whether this plugin handles the given block root.
    fn matches(&self, node: &AstNode) -> bool;

    /// Reveal cost override; `None` defers to the default model.
    fn count_chars(&self, _node: &AstNode) -> Option<usize> {
        None
    }

    /// Display tree for a matched block at `shown` of `total` characters.
    fn slice_node(&self, _node: &AstNode, _shown: usize, _total: usize) -> SliceOutcome {
        SliceOutcome::Unhandled
    }

    /// Called once when a matched block finishes revealing.
    fn on_complete(&mut self, _node: &AstNode) {}
}

/// Code blocks appear whole: half a program is noise.
pub struct CodeBlockPlugin;

impl TransformerPlugin for CodeBlockPlugin {
    fn name(&self) -> &str {
        "code-block"
    }

    fn matches(&self, node: &AstNode) -> bool {
        matches!(node.kind, NodeKind::Code { .. })
    }

    fn count_chars(&self, _node: &AstNode) -> Option<usize> {
        Some(1)
    }

    fn slice_node(&self, node: &AstNode, shown: usize, _total: usize) -> SliceOutcome {
        if shown > 0 {
            SliceOutcome::Sliced(node.clone())
        } else {
            SliceOutcome::Hidden
        }
    }
}

/// Mermaid diagrams appear whole. Must be registered before the generic
/// code plugin, which matches the same nodes.
pub struct MermaidPlugin;

impl TransformerPlugin for MermaidPlugin {
    fn name(&self) -> &str {
        "mermaid"
    }

    fn matches(&self, node: &AstNode) -> bool {
        matches!(&node.kind, NodeKind::Code { lang: Some(lang) } if lang == "mermaid")
    }

    fn count_chars(&self, _node: &AstNode) -> Option<usize> {
        Some(1)
    }

    fn slice_node(&self, node: &AstNode, shown: usize, _total: usize) -> SliceOutcome {
        if shown > 0 {
            SliceOutcome::Sliced(node.clone())
        } else {
            SliceOutcome::Hidden
        }
    }
}

/// Images cost nothing and appear immediately.
pub struct ImagePlugin;

impl TransformerPlugin for ImagePlugin {
    fn name(&self) -> &str {
        "image"
    }

    fn matches(&self, node: &AstNode) -> bool {
        match &node.kind {
            NodeKind::Image { .. } => true,
            NodeKind::Paragraph => {
                node.children.len() == 1
                    && matches!(node.children[0].kind, NodeKind::Image { .. })
            }
            _ => false,
        }
    }

    fn count_chars(&self, _node: &AstNode) -> Option<usize> {
        Some(0)
    }

    fn slice_node(&self, node: &AstNode, _shown: usize, _total: usize) -> SliceOutcome {
        SliceOutcome::Sliced(node.clone())
    }
}

/// Math blocks appear whole.
pub struct MathPlugin;

impl TransformerPlugin for MathPlugin {
    fn name(&self) -> &str {
        "math"
    }

    fn matches(&self, node: &AstNode) -> bool {
        match &node.kind {
            NodeKind::Math { .. } => true,
            NodeKind::Paragraph => {
                node.children.len() == 1
                    && matches!(node.children[0].kind, NodeKind::Math { .. })
            }
            _ => false,
        }
    }

    fn count_chars(&self, _node: &AstNode) -> Option<usize> {
        Some(1)
    }

    fn slice_node(&self, node: &AstNode, shown: usize, _total: usize) -> SliceOutcome {
        if shown > 0 {
            SliceOutcome::Sliced(node.clone())
        } else {
            SliceOutcome::Hidden
        }
    }
}

/// Thematic breaks cost nothing and appear immediately.
pub struct ThematicBreakPlugin;

impl TransformerPlugin for ThematicBreakPlugin {
    fn name(&self) -> &str {
        "thematic-break"
    }

    fn matches(&self, node: &AstNode) -> bool {
        matches!(node.kind, NodeKind::ThematicBreak)
    }

    fn count_chars(&self, _node: &AstNode) -> Option<usize> {
        Some(0)
    }

    fn slice_node(&self, node: &AstNode, _shown: usize, _total: usize) -> SliceOutcome {
        SliceOutcome::Sliced(node.clone())
    }
}

/// The zero-cost structural plugins most callers want.
pub fn default_plugins() -> Vec<Box<dyn TransformerPlugin>> {
    vec![Box::new(ImagePlugin), Box::new(ThematicBreakPlugin)]
}

/// Every builtin, ordered so specific plugins win over general ones.
pub fn all_plugins() -> Vec<Box<dyn TransformerPlugin>> {
    vec![
        Box::new(MermaidPlugin),
        Box::new(CodeBlockPlugin),
        Box::new(ImagePlugin),
        Box::new(MathPlugin),
        Box::new(ThematicBreakPlugin),
    ]
}

/// Reveal cost of a block, honoring the first matching plugin override.
pub fn count_with_plugins(plugins: &[Box<dyn TransformerPlugin>], node: &AstNode) -> usize {
    for plugin in plugins {
        if plugin.matches(node)
            && let Some(count) = plugin.count_chars(node)
        {
            return count;
        }
    }
    budget::count_chars(node)
}

/// Display tree for a block, honoring the first definitive plugin answer.
pub fn slice_with_plugins(
    plugins: &[Box<dyn TransformerPlugin>],
    node: &AstNode,
    shown: usize,
    total: usize,
) -> Option<SliceOutcome> {
    for plugin in plugins {
        if plugin.matches(node) {
            match plugin.slice_node(node, shown, total) {
                SliceOutcome::Unhandled => {}
                outcome => return Some(outcome),
            }
        }
    }
    None
}
