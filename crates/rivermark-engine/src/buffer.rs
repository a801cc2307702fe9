//! Append-only stream buffer with line bookkeeping.
//!
//! The buffer keeps the full stream in a rope plus a parallel line table
//! and prefix-sum offsets. Appends only re-split the trailing line, so the
//! cost per chunk is proportional to the chunk, not the document.

use xi_rope::Rope;

use crate::ast::Span;

pub struct LineBuffer {
    rope: Rope,
    lines: Vec<String>,
    /// Byte offset of each line start, as prefix sums of line length plus
    /// the newline. One extra sentinel slot, so `offsets.len() == lines.len() + 1`.
    offsets: Vec<usize>,
}

impl Default for LineBuffer {
    fn default() -> Self {
        Self::new()
    }
}

impl LineBuffer {
    pub fn new() -> Self {
        Self {
            rope: Rope::from(""),
            lines: Vec::new(),
            offsets: vec![0],
        }
    }

    /// Appends a chunk and re-derives line bookkeeping for the affected tail.
    pub fn append(&mut self, chunk: &str) {
        if chunk.is_empty() {
            return;
        }
        let end = self.rope.len();
        self.rope.edit(end..end, chunk);

        // Only the last line can have been extended; re-split from its start.
        let tail_start = if self.lines.is_empty() {
            0
        } else {
            self.offsets[self.lines.len() - 1]
        };
        if !self.lines.is_empty() {
            self.lines.pop();
            self.offsets.pop();
        }
        let tail = self.rope.slice_to_cow(tail_start..self.rope.len());
        let mut start = tail_start;
        for part in tail.split('\n') {
            self.lines.push(part.to_string());
            start += part.len() + 1;
            self.offsets.push(start);
        }
    }

    pub fn lines(&self) -> &[String] {
        &self.lines
    }

    pub fn line_count(&self) -> usize {
        self.lines.len()
    }

    /// Byte offset of line `i`'s first character in the stream.
    pub fn line_offset(&self, i: usize) -> usize {
        self.offsets.get(i).copied().unwrap_or(0)
    }

    pub fn len(&self) -> usize {
        self.rope.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rope.len() == 0
    }

    /// Extracts the exact source text for a span, clamped to the buffer.
    pub fn slice(&self, span: Span) -> String {
        let end = span.end.min(self.rope.len());
        let start = span.start.min(end);
        self.rope.slice_to_cow(start..end).into_owned()
    }

    pub fn text(&self) -> String {
        String::from(&self.rope)
    }

    pub fn reset(&mut self) {
        self.rope = Rope::from("");
        self.lines.clear();
        self.offsets.clear();
        self.offsets.push(0);
    }
}
