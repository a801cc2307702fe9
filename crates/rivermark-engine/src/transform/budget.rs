//! Character budgets over trees: counting, prefix slicing, and growth
//! merging.
//!
//! Reveal progress is measured in characters. Text-bearing leaves cost
//! their character count; leaves without text (images, breaks, footnote
//! references) cost one, so progress still advances across them; containers
//! cost the sum of their children. Slicing by the same cost model keeps
//! `count` and `slice` consistent: a budget of `count_chars(n)` always
//! yields the whole tree.

use crate::ast::AstNode;

/// Reveal cost of a subtree.
pub fn count_chars(node: &AstNode) -> usize {
    if let Some(value) = &node.value {
        return value.chars().count();
    }
    if node.children.is_empty() {
        return 1;
    }
    node.children.iter().map(count_chars).sum()
}

/// The prefix of `node` costing at most `budget` characters, or `None`
/// when the budget reveals nothing.
pub fn slice_node(node: &AstNode, budget: usize) -> Option<AstNode> {
    slice_window(node, 0, budget)
}

/// The part of `node` after skipping `skip` characters and taking at most
/// `take`. `slice_window(n, 0, b)` is the plain prefix slice; non-zero
/// `skip` extracts just the newly revealed window for incremental updates.
pub fn slice_window(node: &AstNode, skip: usize, take: usize) -> Option<AstNode> {
    let (sliced, _, _) = slice_rec(node, skip, take);
    sliced
}

/// Returns the sliced subtree plus how much of `skip` and `take` it
/// consumed.
fn slice_rec(node: &AstNode, skip: usize, take: usize) -> (Option<AstNode>, usize, usize) {
    if let Some(value) = &node.value {
        let total = value.chars().count();
        let skipped = skip.min(total);
        let taken = take.min(total - skipped);
        if taken == 0 {
            return (None, skipped, 0);
        }
        let text: String = value.chars().skip(skipped).take(taken).collect();
        let mut out = node.clone();
        out.value = Some(text);
        return (Some(out), skipped, taken);
    }

    if node.children.is_empty() {
        // Valueless leaf, cost 1: either skipped whole or taken whole.
        if skip > 0 {
            return (None, 1, 0);
        }
        if take == 0 {
            return (None, 0, 0);
        }
        return (Some(node.clone()), 0, 1);
    }

    let mut out = node.clone();
    out.children.clear();
    let mut skipped = 0;
    let mut taken = 0;
    for child in &node.children {
        if taken == take {
            break;
        }
        let (sliced, s, t) = slice_rec(child, skip - skipped, take - taken);
        skipped += s;
        taken += t;
        if let Some(sliced) = sliced {
            out.children.push(sliced);
        }
    }
    if out.children.is_empty() {
        (None, skipped, taken)
    } else {
        (Some(out), skipped, taken)
    }
}

/// Grafts a freshly revealed window onto an existing display tree.
///
/// `addition` must be the window immediately following what `base` already
/// shows. Same-kind text leaves at the seam concatenate; same-kind
/// containers merge recursively; anything else appends as a sibling. The
/// result is text-identical to re-slicing from scratch at the larger
/// budget.
pub fn merge_growth(base: &mut AstNode, addition: AstNode) {
    if base.kind == addition.kind
        && let (Some(existing), Some(added)) = (base.value.as_mut(), addition.value.as_ref())
    {
        existing.push_str(added);
        return;
    }
    merge_children(base, addition);
}

fn merge_children(base: &mut AstNode, addition: AstNode) {
    let mut incoming = addition.children.into_iter();
    if let Some(first) = incoming.next() {
        match base.children.last_mut() {
            Some(last)
                if last.kind == first.kind
                    && (last.value.is_some() || !last.children.is_empty()) =>
            {
                merge_growth(last, first);
            }
            _ => base.children.push(first),
        }
    }
    base.children.extend(incoming);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::NodeKind;
    use pretty_assertions::assert_eq;

    fn paragraph(parts: Vec<AstNode>) -> AstNode {
        let mut p = AstNode::new(NodeKind::Paragraph);
        p.children = parts;
        p
    }

    fn styled(kind: NodeKind, text: &str) -> AstNode {
        let mut n = AstNode::new(kind);
        n.children.push(AstNode::text(text));
        n
    }

    #[test]
    fn counts_text_and_markers() {
        let para = paragraph(vec![
            AstNode::text("hëllo"),
            AstNode::new(NodeKind::Break),
            styled(NodeKind::Strong, "bold"),
        ]);
        // 5 chars + 1 marker + 4 chars.
        assert_eq!(count_chars(&para), 10);
    }

    #[test]
    fn empty_container_costs_one() {
        assert_eq!(count_chars(&AstNode::new(NodeKind::Image {
            url: "x".into(),
            alt: String::new(),
            title: None,
        })), 1);
    }

    #[test]
    fn full_budget_yields_whole_tree() {
        let para = paragraph(vec![
            AstNode::text("abc"),
            styled(NodeKind::Emphasis, "def"),
        ]);
        let total = count_chars(&para);
        assert_eq!(slice_node(&para, total).as_ref(), Some(&para));
        assert_eq!(slice_node(&para, total + 100).as_ref(), Some(&para));
    }

    #[test]
    fn zero_budget_yields_nothing() {
        let para = paragraph(vec![AstNode::text("abc")]);
        assert_eq!(slice_node(&para, 0), None);
    }

    #[test]
    fn partial_slice_cuts_inside_text() {
        let para = paragraph(vec![
            AstNode::text("abc"),
            styled(NodeKind::Strong, "def"),
        ]);
        let sliced = slice_node(&para, 4).unwrap();
        assert_eq!(sliced.plain_text(), "abcd");
        assert_eq!(sliced.children.len(), 2);
        assert_eq!(sliced.children[1].kind, NodeKind::Strong);
    }

    #[test]
    fn slice_respects_char_boundaries() {
        let para = paragraph(vec![AstNode::text("日本語です")]);
        let sliced = slice_node(&para, 2).unwrap();
        assert_eq!(sliced.plain_text(), "日本");
    }

    #[test]
    fn valueless_leaf_consumes_one_char_of_budget() {
        let para = paragraph(vec![
            AstNode::text("ab"),
            AstNode::new(NodeKind::Break),
            AstNode::text("cd"),
        ]);
        assert_eq!(slice_node(&para, 2).unwrap().children.len(), 1);
        let with_break = slice_node(&para, 3).unwrap();
        assert_eq!(with_break.children.len(), 2);
        assert_eq!(with_break.children[1].kind, NodeKind::Break);
        assert_eq!(slice_node(&para, 4).unwrap().plain_text(), "abc");
    }

    #[test]
    fn window_extracts_middle() {
        let para = paragraph(vec![
            AstNode::text("abc"),
            styled(NodeKind::Strong, "def"),
        ]);
        let window = slice_window(&para, 2, 3).unwrap();
        assert_eq!(window.plain_text(), "cde");
    }

    #[test]
    fn merged_windows_match_full_slice() {
        let para = paragraph(vec![
            AstNode::text("hello "),
            styled(NodeKind::Emphasis, "world"),
            AstNode::text(" again"),
        ]);
        let total = count_chars(&para);
        for split in 1..total {
            for upto in split..=total {
                let mut grown = slice_node(&para, split).unwrap();
                if let Some(window) = slice_window(&para, split, upto - split) {
                    merge_growth(&mut grown, window);
                }
                let full = slice_node(&para, upto).unwrap();
                assert_eq!(
                    grown.plain_text(),
                    full.plain_text(),
                    "grow {split} to {upto}"
                );
            }
        }
    }

    #[test]
    fn merge_descends_into_nested_containers() {
        let para = paragraph(vec![styled(NodeKind::Strong, "bold text")]);
        let mut grown = slice_node(&para, 4).unwrap();
        let window = slice_window(&para, 4, 5).unwrap();
        merge_growth(&mut grown, window);
        // One strong child, one text leaf inside it.
        assert_eq!(grown.children.len(), 1);
        assert_eq!(grown.children[0].children.len(), 1);
        assert_eq!(grown.plain_text(), "bold text");
    }
}
