//! Streaming markdown parsing and progressive reveal.
//!
//! Two engines, usable together or alone:
//!
//! - [`StreamParser`] accepts markdown in arbitrary chunks and proves, line
//!   by line, which blocks can no longer change. Stable prefixes are parsed
//!   once and frozen; only the unstable tail is re-parsed per chunk.
//! - [`BlockTransformer`] takes parsed blocks and reveals them a character
//!   budget at a time, driven by frames from the embedder.

pub mod ast;
pub mod boundary;
pub mod buffer;
pub mod detect;
pub mod error;
pub mod grammar;
pub mod parser;
pub mod transform;
pub mod types;

pub use ast::{AstNode, ColumnAlign, NodeKind, Span};
pub use error::OptionsError;
pub use grammar::HtmlTreeOptions;
pub use parser::StreamParser;
pub use transform::{
    AnimationEffect, BlockTransformer, CharsPerTick, DisplayBlock, ManualClock, SourceBlock,
    SystemClock, TickClock, TransformerOptions, TransformerPlugin, all_plugins, default_plugins,
};
pub use types::{
    BlockStatus, ContainerOptions, Definition, DefinitionMap, FootnoteDefinitionMap,
    IncrementalUpdate, OnChange, ParsedBlock, ParserOptions, ParserState,
};
