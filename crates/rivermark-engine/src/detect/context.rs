//! Line-level block context tracking.
//!
//! [`update_context`] is the pure `(line, context) -> context` transition
//! at the heart of boundary detection. Exactly one machine dominates per
//! line, in fixed priority order: fenced code > container > footnote
//! definition > list. Interleavings the priority order cannot fully
//! disambiguate are resolved by that order, never specially cased.

use serde::{Deserialize, Serialize};

use crate::detect::classify::{
    container_end, container_marker, fence_end, fence_start, footnote_start, is_blank,
    is_blockquote_start, is_heading, leading_indent_width, list_item_start,
};
use crate::types::ContainerOptions;

/// Multi-line construct state carried across lines of the stream.
///
/// Immutable value: transitions copy and return a new context. One context
/// is owned per parser instance and wholesale-replaced on reset.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BlockContext {
    pub in_fenced_code: bool,
    pub fence_char: Option<char>,
    pub fence_length: Option<usize>,

    pub in_container: bool,
    pub container_depth: u32,
    pub container_marker_length: Option<usize>,
    pub container_name: Option<String>,

    pub in_footnote: bool,
    pub footnote_identifier: Option<String>,

    pub in_list: bool,
    pub list_ordered: Option<bool>,
    /// Indent width of the list's first item marker.
    pub list_indent: Option<usize>,
    /// A blank line was seen; the next line decides whether the list ends.
    pub list_may_end: bool,
}

impl BlockContext {
    fn clear_fence(&mut self) {
        self.in_fenced_code = false;
        self.fence_char = None;
        self.fence_length = None;
    }

    fn clear_footnote(&mut self) {
        self.in_footnote = false;
        self.footnote_identifier = None;
    }

    fn clear_list(&mut self) {
        self.in_list = false;
        self.list_ordered = None;
        self.list_indent = None;
        self.list_may_end = false;
    }
}

/// Advances the context over one line.
pub fn update_context(
    line: &str,
    context: &BlockContext,
    containers: Option<&ContainerOptions>,
) -> BlockContext {
    let mut next = context.clone();

    // Fenced code dominates everything: only the closing fence matters.
    if context.in_fenced_code {
        if fence_end(line, context) {
            next.clear_fence();
        }
        return next;
    }
    if let Some(sig) = fence_start(line) {
        next.in_fenced_code = true;
        next.fence_char = Some(sig.ch);
        next.fence_length = Some(sig.length);
        // A fence opener is one of the constructs that ends a footnote.
        next.clear_footnote();
        return next;
    }

    // Container machine: inside a container only markers matter; the
    // footnote and list machines are suppressed until it closes.
    if let Some(opts) = containers {
        if context.in_container {
            if container_end(line, context, opts) {
                next.container_depth = context.container_depth.saturating_sub(1);
                if next.container_depth == 0 {
                    next.in_container = false;
                    next.container_marker_length = None;
                    next.container_name = None;
                }
                return next;
            }
            if let Some(m) = container_marker(line, opts)
                && !m.is_end
            {
                next.container_depth = context.container_depth + 1;
                return next;
            }
            return next;
        }
        if let Some(m) = container_marker(line, opts)
            && !m.is_end
        {
            next.in_container = true;
            next.container_depth = 1;
            next.container_marker_length = Some(m.marker_length);
            next.container_name = Some(m.name);
            return next;
        }
    }

    // Footnote definition machine.
    if context.in_footnote {
        if let Some(id) = footnote_start(line) {
            // Back-to-back definitions stay in footnote mode.
            next.footnote_identifier = Some(id);
            return next;
        }
        if is_heading(line) || is_blockquote_start(line) {
            next.clear_footnote();
            // Fall through: the terminating line may also affect list state.
        } else {
            // Blank lines, >=4-space/tab indented continuations and lazy
            // unindented text all keep the definition open.
            return next;
        }
    } else if let Some(id) = footnote_start(line) {
        next.in_footnote = true;
        next.footnote_identifier = Some(id);
        // A top-level definition is not list content.
        next.clear_list();
        return next;
    }

    // List machine.
    if let Some(item) = list_item_start(line) {
        if next.in_list {
            next.list_may_end = false;
        } else {
            next.in_list = true;
            next.list_ordered = Some(item.ordered);
            next.list_indent = Some(item.indent);
            next.list_may_end = false;
        }
        return next;
    }
    if is_blank(line) {
        if next.in_list {
            next.list_may_end = true;
        }
        return next;
    }
    if next.in_list {
        let indent = leading_indent_width(line);
        let base = next.list_indent.unwrap_or(0);
        if is_heading(line) || is_blockquote_start(line) || indent <= base {
            // Under-indented non-list content ends the list immediately.
            next.clear_list();
        } else {
            next.list_may_end = false;
        }
    }

    next
}

#[cfg(test)]
mod tests {
    use super::*;

    fn advance(lines: &[&str], containers: Option<&ContainerOptions>) -> BlockContext {
        let mut ctx = BlockContext::default();
        for line in lines {
            ctx = update_context(line, &ctx, containers);
        }
        ctx
    }

    #[test]
    fn fence_opens_and_closes() {
        let ctx = advance(&["```rust"], None);
        assert!(ctx.in_fenced_code);
        assert_eq!(ctx.fence_char, Some('`'));
        assert_eq!(ctx.fence_length, Some(3));

        let ctx = advance(&["```rust", "let x = 1;", "```"], None);
        assert!(!ctx.in_fenced_code);
    }

    #[test]
    fn fence_ignores_everything_inside() {
        // Markdown-looking lines inside a fence must not change state.
        let ctx = advance(&["```", "# not a heading", "- not a list", "~~~"], None);
        assert!(ctx.in_fenced_code);
        assert!(!ctx.in_list);
    }

    #[test]
    fn longer_close_run_closes_fence() {
        let ctx = advance(&["````", "code", "`````"], None);
        assert!(!ctx.in_fenced_code);
    }

    #[test]
    fn short_close_run_keeps_fence_open() {
        let ctx = advance(&["````", "```"], None);
        assert!(ctx.in_fenced_code);
    }

    #[test]
    fn containers_nest_and_unwind() {
        let opts = ContainerOptions::default();
        let ctx = advance(&["::: outer", "::: inner"], Some(&opts));
        assert!(ctx.in_container);
        assert_eq!(ctx.container_depth, 2);

        let ctx = advance(&["::: outer", "::: inner", ":::"], Some(&opts));
        assert_eq!(ctx.container_depth, 1);

        let ctx = advance(&["::: outer", "::: inner", ":::", ":::"], Some(&opts));
        assert!(!ctx.in_container);
        assert_eq!(ctx.container_name, None);
    }

    #[test]
    fn container_suppresses_list_tracking() {
        let opts = ContainerOptions::default();
        let ctx = advance(&["::: note", "- looks like a list"], Some(&opts));
        assert!(ctx.in_container);
        assert!(!ctx.in_list);
    }

    #[test]
    fn containers_disabled_without_options() {
        let ctx = advance(&["::: note"], None);
        assert!(!ctx.in_container);
    }

    #[test]
    fn footnote_continuation_and_termination() {
        let ctx = advance(&["[^1]: note"], None);
        assert!(ctx.in_footnote);
        assert_eq!(ctx.footnote_identifier.as_deref(), Some("1"));

        // Indented continuation and interior blank lines keep it open.
        let ctx = advance(&["[^1]: note", "    more", "", "    even more"], None);
        assert!(ctx.in_footnote);

        // A heading ends it.
        let ctx = advance(&["[^1]: note", "    more", "# Heading"], None);
        assert!(!ctx.in_footnote);
        assert_eq!(ctx.footnote_identifier, None);
    }

    #[test]
    fn fence_start_terminates_footnote() {
        let ctx = advance(&["[^1]: note", "```"], None);
        assert!(!ctx.in_footnote);
        assert!(ctx.in_fenced_code);
    }

    #[test]
    fn new_definition_replaces_identifier() {
        let ctx = advance(&["[^1]: one", "[^2]: two"], None);
        assert!(ctx.in_footnote);
        assert_eq!(ctx.footnote_identifier.as_deref(), Some("2"));
    }

    #[test]
    fn list_blank_line_sets_may_end() {
        let ctx = advance(&["- a", ""], None);
        assert!(ctx.in_list);
        assert!(ctx.list_may_end);

        // Another item of the same list resolves the doubt.
        let ctx = advance(&["- a", "", "- b"], None);
        assert!(ctx.in_list);
        assert!(!ctx.list_may_end);
    }

    #[test]
    fn under_indented_content_ends_list() {
        let ctx = advance(&["- a", "paragraph"], None);
        assert!(!ctx.in_list);

        let ctx = advance(&["- a", "", "paragraph"], None);
        assert!(!ctx.in_list);
    }

    #[test]
    fn indented_content_continues_list() {
        let ctx = advance(&["- a", "  continuation"], None);
        assert!(ctx.in_list);

        let ctx = advance(&["- a", "", "  loose paragraph"], None);
        assert!(ctx.in_list);
        assert!(!ctx.list_may_end);
    }

    #[test]
    fn list_tracks_order_and_indent() {
        let ctx = advance(&["  2. item"], None);
        assert_eq!(ctx.list_ordered, Some(true));
        assert_eq!(ctx.list_indent, Some(2));
    }

    #[test]
    fn heading_ends_list_regardless_of_blank() {
        let ctx = advance(&["- a", "# Heading"], None);
        assert!(!ctx.in_list);
    }

    #[test]
    fn footnote_start_ends_open_list() {
        let ctx = advance(&["- a", "[^1]: note"], None);
        assert!(!ctx.in_list);
        assert!(ctx.in_footnote);
    }
}
