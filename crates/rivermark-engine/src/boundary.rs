//! Stable boundary detection over the pending line window.
//!
//! A line index `b` is a stable boundary when no future input can change
//! how lines `..=b` parse. The finder walks the pending window once per
//! append, advancing a [`BlockContext`] and applying two families of rules:
//! construct-exit rules while a multi-line construct is open, and pairwise
//! line rules otherwise. The last line of the buffer is never stable: the
//! next chunk may still extend it.

use log::debug;

use crate::detect::classify::{
    container_marker, fence_start, footnote_start, is_blank, is_blockquote_start, is_heading,
    is_thematic_break, list_item_start, list_item_with_text,
};
use crate::detect::context::{BlockContext, update_context};
use crate::types::ContainerOptions;

/// Outcome of one scan over the pending window.
#[derive(Debug, Clone, PartialEq)]
pub struct BoundaryScan {
    /// Last stable line index, if any line in the window qualified.
    pub boundary: Option<usize>,
    /// Context snapshot taken exactly at the boundary line, suitable for
    /// seeding the next scan. When no boundary was found this is the
    /// caller's input context, unchanged.
    pub context: BlockContext,
}

/// Finds the greatest stable line index within `lines[pending_start..]`.
///
/// `context` must be the snapshot taken at the previous boundary (or the
/// default context on a fresh stream); the scan replays pending lines
/// through it without mutating the caller's copy.
pub fn find_stable_boundary(
    lines: &[String],
    pending_start: usize,
    context: &BlockContext,
    containers: Option<&ContainerOptions>,
) -> BoundaryScan {
    let mut cur = context.clone();
    let mut stable: Option<(usize, BlockContext)> = None;

    for i in pending_start..lines.len() {
        let line = lines[i].as_str();
        let prev_state = cur.clone();
        cur = update_context(line, &prev_state, containers);
        let last = i + 1 == lines.len();

        // While a construct is open, only its exit can produce a boundary;
        // pairwise rules would misread construct-interior lines.
        if prev_state.in_fenced_code {
            if !cur.in_fenced_code && !last {
                // The closing fence itself is part of the block.
                stable = Some((i, cur.clone()));
            }
            continue;
        }
        if prev_state.in_container {
            if !cur.in_container && prev_state.container_depth == 1 && !last {
                stable = Some((i, cur.clone()));
            }
            continue;
        }
        if prev_state.in_footnote {
            // Line `i` starts new material, so the definition ended at
            // `i-1`. A partial last line classifies unreliably, though.
            if !cur.in_footnote && !last {
                stable = Some((i - 1, prev_state));
            }
            continue;
        }
        if prev_state.in_list {
            if !cur.in_list && !last {
                stable = Some((i - 1, prev_state));
            }
            continue;
        }

        if let Some(b) = pairwise_boundary(lines, i, last, containers) {
            let snapshot = if b == i { cur.clone() } else { prev_state };
            stable = Some((b, snapshot));
        }
    }

    match stable {
        Some((boundary, context)) if boundary >= pending_start => {
            debug!("stable boundary at line {boundary}");
            BoundaryScan {
                boundary: Some(boundary),
                context,
            }
        }
        _ => BoundaryScan {
            boundary: None,
            context: context.clone(),
        },
    }
}

/// Two-line rules applied between `lines[i-1]` and `lines[i]` when no
/// multi-line construct is open.
fn pairwise_boundary(
    lines: &[String],
    i: usize,
    last: bool,
    containers: Option<&ContainerOptions>,
) -> Option<usize> {
    if i == 0 {
        return None;
    }
    let line = lines[i].as_str();
    let prev = lines[i - 1].as_str();

    // Single-line blocks complete themselves, even at a window edge where
    // the current line is still growing.
    if is_heading(prev) || is_thematic_break(prev) {
        return Some(i - 1);
    }
    if last {
        return None;
    }

    if !is_blank(prev) {
        // A construct opener right after flowing text closes the text block.
        let opens_new = is_heading(line)
            || fence_start(line).is_some()
            || footnote_start(line).is_some()
            || (is_blockquote_start(line) && !is_blockquote_start(prev))
            || (list_item_with_text(line) && list_item_start(prev).is_none())
            || containers
                .and_then(|o| container_marker(line, o))
                .is_some_and(|m| !m.is_end);
        if opens_new {
            return Some(i - 1);
        }
        if is_blank(line) {
            // The blank line belongs to the finished block above it.
            return Some(i);
        }
    }
    None
}
