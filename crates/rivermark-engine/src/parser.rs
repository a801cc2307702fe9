//! Incremental block-level markdown parsing.
//!
//! [`StreamParser`] accepts arbitrarily chunked text. Each append runs the
//! boundary finder over the pending window; lines proven stable are parsed
//! exactly once and frozen as completed blocks, while the unstable tail is
//! re-parsed from scratch every call. Work per append is proportional to
//! the pending tail, not the whole document.

use log::debug;

use crate::ast::{AstNode, NodeKind, Span};
use crate::boundary::find_stable_boundary;
use crate::buffer::LineBuffer;
use crate::detect::context::BlockContext;
use crate::grammar::{GrammarOptions, parse_fragment};
use crate::types::{
    BlockStatus, DefinitionMap, FootnoteDefinitionMap, IncrementalUpdate, OnChange, ParsedBlock,
    ParserOptions, ParserState,
};

pub struct StreamParser {
    options: ParserOptions,
    grammar: GrammarOptions,
    buffer: LineBuffer,
    /// Context snapshot at the last stable boundary.
    context: BlockContext,
    completed: Vec<ParsedBlock>,
    /// First line index not yet proven stable.
    pending_start_line: usize,
    next_block_id: u64,
    /// Pending blocks from the most recent append, kept so `ast` and the
    /// change callback can see them without re-parsing.
    last_pending: Vec<ParsedBlock>,
    definitions: DefinitionMap,
    footnote_definitions: FootnoteDefinitionMap,
    footnote_order: Vec<String>,
    on_change: Option<OnChange>,
}

impl StreamParser {
    pub fn new(options: ParserOptions) -> Result<Self, crate::error::OptionsError> {
        options.validate()?;
        let grammar = GrammarOptions::from_parser_options(&options);
        Ok(Self {
            options,
            grammar,
            buffer: LineBuffer::new(),
            context: BlockContext::default(),
            completed: Vec::new(),
            pending_start_line: 0,
            next_block_id: 0,
            last_pending: Vec::new(),
            definitions: DefinitionMap::new(),
            footnote_definitions: FootnoteDefinitionMap::new(),
            footnote_order: Vec::new(),
            on_change: None,
        })
    }

    /// Feeds the next chunk of the stream.
    pub fn append(&mut self, chunk: &str) -> IncrementalUpdate {
        self.buffer.append(chunk);

        let scan = find_stable_boundary(
            self.buffer.lines(),
            self.pending_start_line,
            &self.context,
            self.options.containers.as_ref(),
        );

        let mut newly_completed = Vec::new();
        if let Some(boundary) = scan.boundary {
            let blocks = self.parse_window(
                self.pending_start_line,
                boundary + 1,
                BlockStatus::Completed,
            );
            debug!(
                "completed {} block(s) through line {boundary}",
                blocks.len()
            );
            for block in &blocks {
                self.absorb_block(block);
            }
            self.completed.extend(blocks.iter().cloned());
            newly_completed = blocks;
            self.context = scan.context;
            self.pending_start_line = boundary + 1;
        }

        self.reparse_tail();
        let update = self.build_update(newly_completed);
        self.emit_change();
        update
    }

    /// Declares the stream over: whatever is pending is parsed one last
    /// time and frozen, unstable or not.
    pub fn finalize(&mut self) -> IncrementalUpdate {
        let blocks = self.parse_window(
            self.pending_start_line,
            self.buffer.line_count(),
            BlockStatus::Completed,
        );
        for block in &blocks {
            self.absorb_block(block);
        }
        self.completed.extend(blocks.iter().cloned());
        self.pending_start_line = self.buffer.line_count();
        self.last_pending.clear();
        self.context = BlockContext::default();

        let update = self.build_update(blocks);
        self.emit_change();
        update
    }

    /// Stops a stream early. The partial tail is completed as-is rather
    /// than discarded, so everything received remains visible.
    pub fn abort(&mut self) -> IncrementalUpdate {
        self.finalize()
    }

    /// One-shot convenience: parse a whole document through the same path
    /// a stream would take.
    pub fn render(&mut self, text: &str) -> IncrementalUpdate {
        self.reset();
        self.append(text);
        self.finalize()
    }

    /// Discards all state; options are kept.
    pub fn reset(&mut self) {
        self.buffer.reset();
        self.context = BlockContext::default();
        self.completed.clear();
        self.pending_start_line = 0;
        self.next_block_id = 0;
        self.last_pending.clear();
        self.definitions.clear();
        self.footnote_definitions.clear();
        self.footnote_order.clear();
    }

    /// Tree over everything parsed so far, completed and pending.
    pub fn ast(&self) -> AstNode {
        let mut root = AstNode::new(NodeKind::Root);
        for block in self.completed.iter().chain(&self.last_pending) {
            root.children.push(block.node.clone());
        }
        root
    }

    pub fn completed_blocks(&self) -> &[ParsedBlock] {
        &self.completed
    }

    pub fn pending_blocks(&self) -> &[ParsedBlock] {
        &self.last_pending
    }

    pub fn definitions(&self) -> &DefinitionMap {
        &self.definitions
    }

    pub fn buffer_text(&self) -> String {
        self.buffer.text()
    }

    pub fn set_on_change(&mut self, callback: OnChange) {
        self.on_change = Some(callback);
    }

    /// Parses lines `[start, end)` into blocks with the given status.
    fn parse_window(&mut self, start: usize, end: usize, status: BlockStatus) -> Vec<ParsedBlock> {
        if start >= end {
            return Vec::new();
        }
        let lines = &self.buffer.lines()[start..end];
        let text = lines.join("\n");
        if text.trim().is_empty() {
            return Vec::new();
        }
        let base = self.buffer.line_offset(start);
        let fragment = parse_fragment(&text, base, &self.grammar);

        if status == BlockStatus::Completed {
            for (id, def) in fragment.definitions {
                self.definitions.insert(id, def);
            }
        }

        let mut blocks = Vec::with_capacity(fragment.root.children.len());
        for node in fragment.root.children {
            let span = node.span.unwrap_or(Span {
                start: base,
                end: base + text.len(),
            });
            blocks.push(ParsedBlock {
                id: self.next_id(),
                status,
                raw_text: self.buffer.slice(span),
                start_offset: span.start,
                end_offset: span.end,
                node,
            });
        }
        blocks
    }

    /// Re-derives the pending tail. Pending blocks carry no identity: each
    /// call assigns fresh ids and the previous set is discarded.
    fn reparse_tail(&mut self) {
        self.last_pending = self.parse_window(
            self.pending_start_line,
            self.buffer.line_count(),
            BlockStatus::Pending,
        );
    }

    /// Folds a completed block's footnote content into accumulated state.
    fn absorb_block(&mut self, block: &ParsedBlock) {
        let mut order = std::mem::take(&mut self.footnote_order);
        block.node.visit(&mut |n| match &n.kind {
            NodeKind::FootnoteDefinition { identifier } => {
                self.footnote_definitions
                    .insert(identifier.clone(), n.clone());
            }
            NodeKind::FootnoteReference { identifier } => {
                if !order.iter().any(|id| id == identifier) {
                    order.push(identifier.clone());
                }
            }
            _ => {}
        });
        self.footnote_order = order;
    }

    fn next_id(&mut self) -> u64 {
        let id = self.next_block_id;
        self.next_block_id += 1;
        id
    }

    fn build_update(&self, completed: Vec<ParsedBlock>) -> IncrementalUpdate {
        // Footnotes and definitions inside the pending tail are reported
        // but not accumulated; they re-derive on the next call.
        let mut definitions = self.definitions.clone();
        let mut footnote_definitions = self.footnote_definitions.clone();
        let mut footnote_reference_order = self.footnote_order.clone();
        for block in &self.last_pending {
            block.node.visit(&mut |n| match &n.kind {
                NodeKind::FootnoteDefinition { identifier } => {
                    footnote_definitions.insert(identifier.clone(), n.clone());
                }
                NodeKind::FootnoteReference { identifier } => {
                    if !footnote_reference_order.iter().any(|id| id == identifier) {
                        footnote_reference_order.push(identifier.clone());
                    }
                }
                _ => {}
            });
        }
        IncrementalUpdate {
            completed,
            updated: Vec::new(),
            pending: self.last_pending.clone(),
            ast: Some(self.ast()),
            definitions,
            footnote_definitions,
            footnote_reference_order,
        }
    }

    fn emit_change(&mut self) {
        if self.on_change.is_none() {
            return;
        }
        let state = ParserState {
            completed_blocks: self.completed.clone(),
            pending_blocks: self.last_pending.clone(),
            markdown: self.buffer.text(),
            ast: self.ast(),
            definitions: self.definitions.clone(),
            footnote_definitions: self.footnote_definitions.clone(),
        };
        if let Some(callback) = self.on_change.as_mut() {
            callback(&state);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::cell::RefCell;
    use std::rc::Rc;

    fn parser() -> StreamParser {
        StreamParser::new(ParserOptions::default()).unwrap()
    }

    #[test]
    fn single_append_keeps_everything_pending() {
        let mut p = parser();
        let update = p.append("# Title");
        assert!(update.completed.is_empty());
        assert_eq!(update.pending.len(), 1);
        assert_eq!(update.pending[0].status, BlockStatus::Pending);
    }

    #[test]
    fn heading_completes_once_next_line_starts() {
        let mut p = parser();
        let first = p.append("# Title\n");
        assert_eq!(first.completed.len(), 1);
        assert_eq!(
            first.completed[0].node.kind,
            NodeKind::Heading { depth: 1 }
        );
        assert_eq!(first.completed[0].raw_text, "# Title");

        let second = p.append("\nBody text");
        assert!(second.completed.is_empty());
        assert_eq!(second.pending.len(), 1);
        assert_eq!(second.pending[0].node.kind, NodeKind::Paragraph);
    }

    #[test]
    fn finalize_completes_the_tail() {
        let mut p = parser();
        p.append("# Title\n\nBody text");
        let update = p.finalize();
        assert_eq!(update.completed.len(), 1);
        assert_eq!(update.completed[0].node.kind, NodeKind::Paragraph);
        assert!(update.pending.is_empty());
        assert_eq!(p.completed_blocks().len(), 2);
    }

    #[test]
    fn block_ids_are_monotonic() {
        let mut p = parser();
        p.append("one\n\ntwo\n\nthree\n\n");
        p.finalize();
        let ids: Vec<u64> = p.completed_blocks().iter().map(|b| b.id).collect();
        for pair in ids.windows(2) {
            assert!(pair[0] < pair[1]);
        }
    }

    #[test]
    fn completed_blocks_never_change() {
        let mut p = parser();
        p.append("first paragraph\n\n");
        let frozen = p.completed_blocks().to_vec();
        p.append("second\n\nthird\n\n");
        p.finalize();
        assert_eq!(&p.completed_blocks()[..frozen.len()], &frozen[..]);
    }

    #[test]
    fn chunked_stream_matches_one_shot_render() {
        let text = "# Doc\n\nPara *one*.\n\n- a\n- b\n\n```rust\nfn x() {}\n```\n\n> quote\n";
        let mut whole = parser();
        let whole_update = whole.render(text);

        let mut chunked = parser();
        for ch in text.chars() {
            chunked.append(&ch.to_string());
        }
        chunked.finalize();

        assert_eq!(whole_update.ast, Some(chunked.ast()));
        assert_eq!(whole.completed_blocks().len(), chunked.completed_blocks().len());
    }

    #[test]
    fn unterminated_fence_stays_pending() {
        let mut p = parser();
        let update = p.append("```rust\nlet x = 1;\n");
        assert!(update.completed.is_empty());
        assert_eq!(update.pending.len(), 1);
        assert!(matches!(
            update.pending[0].node.kind,
            NodeKind::Code { .. }
        ));
    }

    #[test]
    fn list_with_interior_blank_parses_as_one_block() {
        let mut p = parser();
        p.render("- a\n- b\n\n- c\n");
        let root = p.ast();
        assert_eq!(root.children.len(), 1);
        assert!(matches!(root.children[0].kind, NodeKind::List { .. }));
        assert_eq!(root.children[0].children.len(), 3);
    }

    #[test]
    fn offsets_and_raw_text_match_source() {
        let text = "# Title\n\nSecond block here.\n";
        let mut p = parser();
        p.render(text);
        for block in p.completed_blocks() {
            assert_eq!(
                &text[block.start_offset..block.end_offset],
                block.raw_text
            );
        }
    }

    #[test]
    fn definitions_accumulate_across_appends() {
        let mut p = parser();
        p.append("[a]: https://a.example\n\ntext\n\n");
        let update = p.append("[b]: https://b.example\n\nmore\n\n");
        assert!(update.definitions.contains_key("a"));
        assert!(update.definitions.contains_key("b"));
    }

    #[test]
    fn footnote_order_follows_first_reference() {
        let mut p = parser();
        let update = p.render("uses[^b] then[^a] then[^b] again\n\n[^a]: A\n\n[^b]: B\n");
        assert_eq!(update.footnote_reference_order, vec!["b", "a"]);
        assert!(update.footnote_definitions.contains_key("a"));
        assert!(update.footnote_definitions.contains_key("b"));
    }

    #[test]
    fn on_change_sees_full_state() {
        let seen: Rc<RefCell<Vec<usize>>> = Rc::default();
        let sink = Rc::clone(&seen);
        let mut p = parser();
        p.set_on_change(Box::new(move |state: &ParserState| {
            sink.borrow_mut().push(state.completed_blocks.len());
        }));
        p.append("a\n\n");
        p.append("b\n\n");
        p.finalize();
        assert_eq!(*seen.borrow(), vec![1, 2, 2]);
    }

    #[test]
    fn reset_clears_state_but_keeps_options() {
        let mut p = parser();
        p.append("# Title\n\ntext\n\n");
        p.reset();
        assert!(p.completed_blocks().is_empty());
        assert!(p.buffer_text().is_empty());
        let update = p.append("fresh\n\n");
        assert_eq!(update.completed[0].id, 0);
    }

    #[test]
    fn abort_behaves_like_finalize() {
        let mut a = parser();
        a.append("text in flight");
        let aborted = a.abort();
        assert_eq!(aborted.completed.len(), 1);
        assert_eq!(aborted.completed[0].raw_text, "text in flight");
    }

    #[test]
    fn blank_input_produces_no_blocks() {
        let mut p = parser();
        let update = p.render("\n\n\n");
        assert!(update.completed.is_empty());
        assert!(update.pending.is_empty());
        assert!(p.ast().children.is_empty());
    }
}
