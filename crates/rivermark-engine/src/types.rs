use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::ast::AstNode;
use crate::error::OptionsError;
use crate::grammar::HtmlTreeOptions;

/// Lifecycle status of a parsed block.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BlockStatus {
    /// Still receiving input; re-derived on every append, no stable identity.
    Pending,
    /// Looks complete, but the next chunk may still revise it.
    Stable,
    /// Proven final. Terminal: a completed block is never mutated again.
    Completed,
}

/// A top-level block cut from the stream.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParsedBlock {
    /// Monotonically increasing id, never reused within a parser instance.
    pub id: u64,
    pub status: BlockStatus,
    pub node: AstNode,
    /// Byte offset of the block's first character in the full stream.
    pub start_offset: usize,
    /// Byte offset one past the block's last character.
    pub end_offset: usize,
    /// Exact source text of the block.
    pub raw_text: String,
}

/// A link/image reference definition (`[label]: url "title"`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Definition {
    pub identifier: String,
    pub url: String,
    pub title: Option<String>,
}

pub type DefinitionMap = BTreeMap<String, Definition>;
pub type FootnoteDefinitionMap = BTreeMap<String, AstNode>;

/// Result of one mutating parser call (`append`, `finalize`, `render`).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct IncrementalUpdate {
    /// Blocks newly proven final by this call.
    pub completed: Vec<ParsedBlock>,
    /// Reserved for in-place revisions; currently always empty because
    /// completed blocks are frozen and pending blocks carry no identity.
    pub updated: Vec<ParsedBlock>,
    /// The unstable tail, re-parsed from scratch on every call.
    pub pending: Vec<ParsedBlock>,
    /// Full tree over everything parsed so far (completed + pending).
    pub ast: Option<AstNode>,
    /// Link reference definitions seen so far.
    pub definitions: DefinitionMap,
    /// Footnote definitions seen so far, by identifier.
    pub footnote_definitions: FootnoteDefinitionMap,
    /// Footnote identifiers in first-reference order, for rendering.
    pub footnote_reference_order: Vec<String>,
}

/// Snapshot handed to the parser's change callback.
#[derive(Debug, Clone)]
pub struct ParserState {
    pub completed_blocks: Vec<ParsedBlock>,
    pub pending_blocks: Vec<ParsedBlock>,
    /// The raw stream received so far.
    pub markdown: String,
    pub ast: AstNode,
    pub definitions: DefinitionMap,
    pub footnote_definitions: FootnoteDefinitionMap,
}

pub type OnChange = Box<dyn FnMut(&ParserState)>;

/// `:::`-fenced custom container syntax, for boundary tracking.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContainerOptions {
    /// Marker character, `:` by default.
    pub marker: char,
    /// Minimum marker run length, 3 by default. Longer runs open outer
    /// containers so that shorter runs can nest inside.
    pub min_marker_length: usize,
    /// Container names to recognize; `None` accepts any name.
    pub allowed_names: Option<Vec<String>>,
}

impl Default for ContainerOptions {
    fn default() -> Self {
        Self {
            marker: ':',
            min_marker_length: 3,
            allowed_names: None,
        }
    }
}

impl ContainerOptions {
    pub fn validate(&self) -> Result<(), OptionsError> {
        if self.marker.is_whitespace() || self.marker.is_alphanumeric() {
            return Err(OptionsError::BlankContainerMarker);
        }
        if self.min_marker_length == 0 {
            return Err(OptionsError::ZeroMarkerLength);
        }
        Ok(())
    }
}

/// Parser configuration.
#[derive(Debug, Clone)]
pub struct ParserOptions {
    /// GFM extensions: tables, strikethrough, task lists, footnotes. On by default.
    pub gfm: bool,
    /// `$..$` / `$$..$$` math support.
    pub math: bool,
    /// Custom container syntax; `None` disables container tracking.
    pub containers: Option<ContainerOptions>,
    /// Convert raw html blocks into structured element trees.
    pub html_tree: Option<HtmlTreeOptions>,
    /// Extra grammar-engine options, OR-ed into the computed set. This is
    /// the pass-through for callers who want additional pulldown-cmark
    /// extensions beyond the flags above.
    pub extra_options: pulldown_cmark::Options,
}

impl Default for ParserOptions {
    fn default() -> Self {
        Self {
            gfm: true,
            math: false,
            containers: None,
            html_tree: None,
            extra_options: pulldown_cmark::Options::empty(),
        }
    }
}

impl ParserOptions {
    pub fn validate(&self) -> Result<(), OptionsError> {
        if let Some(containers) = &self.containers {
            containers.validate()?;
        }
        Ok(())
    }
}
