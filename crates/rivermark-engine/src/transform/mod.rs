//! Progressive reveal of parsed blocks.
//!
//! The parser side decides *what* the document is; this side decides *how
//! much of it* is visible at a given moment. [`BlockTransformer`] is the
//! entry point; the other modules supply its cost model, plugins, timing
//! and types.

pub mod budget;
pub mod clock;
pub mod plugins;
pub mod transformer;
pub mod types;

pub use budget::{count_chars, merge_growth, slice_node, slice_window};
pub use clock::{ManualClock, SystemClock, TickClock};
pub use plugins::{
    CodeBlockPlugin, ImagePlugin, MathPlugin, MermaidPlugin, SliceOutcome, ThematicBreakPlugin,
    TransformerPlugin, all_plugins, default_plugins,
};
pub use transformer::BlockTransformer;
pub use types::{
    AccumulatedChunks, AnimationEffect, CharsPerTick, DisplayBlock, SourceBlock, TextChunk,
    TransformerOptions, TransformerState,
};
