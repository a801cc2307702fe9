//! Line classification and block context tracking.
//!
//! Everything here works on single lines of text, without consulting the
//! grammar engine. The boundary finder combines these classifiers with the
//! [`BlockContext`] state machine to decide which prefix of the stream can
//! no longer be revised by future input.

pub mod classify;
pub mod context;

pub use classify::{
    ContainerMatch, FenceSig, ListItemStart, container_end, container_marker, fence_end,
    fence_start, footnote_start, is_blank, is_blockquote_start, is_heading, is_html_block_start,
    is_table_delimiter, is_thematic_break, leading_indent_width, list_item_start,
    list_item_with_text,
};
pub use context::{BlockContext, update_context};
