//! Progressive block reveal.
//!
//! [`BlockTransformer`] consumes parsed blocks and meters them out one at a
//! time, a budget of characters per tick. Frames arrive from the embedder
//! (a render loop, a timer, a test harness); the transformer decides on
//! each frame whether enough time has passed to tick.

use std::collections::VecDeque;

use log::trace;

use crate::ast::{AstNode, NodeKind};
use crate::error::OptionsError;
use crate::transform::budget::{merge_growth, slice_node, slice_window};
use crate::transform::clock::{SystemClock, TickClock};
use crate::transform::plugins::{
    SliceOutcome, TransformerPlugin, count_with_plugins, slice_with_plugins,
};
use crate::transform::types::{
    AccumulatedChunks, AnimationEffect, CharsPerTick, DisplayBlock, SourceBlock, TextChunk,
    TransformerOptions, TransformerState,
};

/// Incremental slice cache for the current block. Valid only while the
/// block's tree is unchanged; any rebind drops it.
struct DisplayCache {
    block_id: u64,
    progress: usize,
    node: AstNode,
}

pub struct BlockTransformer<T = ()>
where
    T: Clone,
{
    state: TransformerState<T>,
    options: TransformerOptions,
    plugins: Vec<Box<dyn TransformerPlugin>>,
    clock: Box<dyn TickClock>,
    /// Timestamp of the last tick, `None` until the first frame after
    /// start or resume.
    last_tick: Option<u64>,
    running: bool,
    paused: bool,
    visible: bool,
    destroyed: bool,
    cache: Option<DisplayCache>,
    /// Present while the fade-in effect is active.
    chunks: Option<AccumulatedChunks>,
    on_change: Option<Box<dyn FnMut(&[DisplayBlock<T>])>>,
}

impl<T: Clone> BlockTransformer<T> {
    pub fn new(options: TransformerOptions) -> Result<Self, OptionsError> {
        options.validate()?;
        let chunks = match options.effect {
            AnimationEffect::FadeIn => Some(AccumulatedChunks::default()),
            _ => None,
        };
        Ok(Self {
            state: TransformerState::default(),
            options,
            plugins: Vec::new(),
            clock: Box::new(SystemClock::new()),
            last_tick: None,
            running: false,
            paused: false,
            visible: true,
            destroyed: false,
            cache: None,
            chunks,
            on_change: None,
        })
    }

    #[must_use]
    pub fn with_plugins(mut self, plugins: Vec<Box<dyn TransformerPlugin>>) -> Self {
        self.plugins = plugins;
        self
    }

    #[must_use]
    pub fn with_clock(mut self, clock: impl TickClock + 'static) -> Self {
        self.clock = Box::new(clock);
        self
    }

    /// Feeds blocks in. New ids queue up behind the current block; known
    /// ids update in place, rebinding the current block if it changed.
    pub fn push(&mut self, blocks: &[SourceBlock<T>]) {
        if self.destroyed {
            return;
        }
        for block in blocks {
            if let Some(current) = &mut self.state.current_block
                && current.id == block.id
            {
                let node_changed = current.node != block.node;
                *current = block.clone();
                if node_changed {
                    // Progress carries over, clamped to the new extent.
                    let total = count_with_plugins(&self.plugins, &block.node);
                    self.state.current_progress = self.state.current_progress.min(total);
                    self.cache = None;
                }
                continue;
            }
            if let Some(queued) = self
                .state
                .pending_blocks
                .iter_mut()
                .find(|b| b.id == block.id)
            {
                *queued = block.clone();
                continue;
            }
            if self
                .state
                .completed_blocks
                .iter()
                .any(|b| b.id == block.id)
            {
                // Completed reveals are frozen.
                continue;
            }
            self.state.pending_blocks.push_back(block.clone());
        }
        if self.state.current_block.is_none() {
            self.advance_queue();
        }
        if self.state.current_block.is_some() {
            self.running = true;
        }
    }

    /// Convenience for feeding a single block.
    pub fn update(&mut self, block: SourceBlock<T>) {
        self.push(std::slice::from_ref(&block));
    }

    /// Drives the reveal. Call once per frame; ticks happen only when the
    /// configured interval has elapsed.
    pub fn on_frame(&mut self) {
        if self.destroyed || self.paused || !self.running {
            return;
        }
        if !self.visible && self.options.pause_on_hidden {
            return;
        }
        let now = self.clock.now();
        let last = *self.last_tick.get_or_insert(now);
        if now.saturating_sub(last) >= self.options.tick_interval {
            self.last_tick = Some(now);
            self.tick(now);
        }
    }

    fn tick(&mut self, now: u64) {
        let Some(current) = &self.state.current_block else {
            self.advance_queue();
            if self.state.current_block.is_none() {
                self.running = false;
            }
            return;
        };

        let total = count_with_plugins(&self.plugins, &current.node);
        let old = self.state.current_progress;
        let step = self.options.chars_per_tick.sample(&mut rand::rng());
        let new = (old + step).min(total);
        self.state.current_progress = new;
        trace!("tick: block {} at {new}/{total}", current.id);

        if new > old
            && let Some(chunks) = &mut self.chunks
            && let Some(window) = slice_window(&current.node, old, new - old)
        {
            chunks.chunks.push(TextChunk {
                text: window.plain_text(),
                created_at: now,
            });
        }

        if new >= total {
            self.complete_current();
        }
        self.emit_change();
    }

    /// Finishes the current block and lines up the next one.
    fn complete_current(&mut self) {
        let Some(current) = self.state.current_block.take() else {
            return;
        };
        for plugin in &mut self.plugins {
            if plugin.matches(&current.node) {
                plugin.on_complete(&current.node);
            }
        }
        let display = DisplayBlock {
            id: current.id,
            status: current.status,
            display_node: current.node.clone(),
            node: current.node,
            progress: 1.0,
            is_display_complete: true,
            meta: current.meta,
        };
        self.state.completed_blocks.push(display);
        self.state.current_progress = 0;
        self.cache = None;
        if let Some(chunks) = &mut self.chunks {
            *chunks = AccumulatedChunks::default();
        }
        self.advance_queue();
        if self.state.current_block.is_none() {
            self.running = false;
        }
    }

    fn advance_queue(&mut self) {
        if self.state.current_block.is_none()
            && let Some(next) = self.state.pending_blocks.pop_front()
        {
            self.state.current_block = Some(next);
            self.state.current_progress = 0;
            self.cache = None;
        }
    }

    /// Everything that should currently be drawn: finished blocks plus the
    /// partially revealed current block. Queued blocks are not shown.
    pub fn display_blocks(&mut self) -> Vec<DisplayBlock<T>> {
        let mut out = self.state.completed_blocks.clone();
        if let Some(current) = &self.state.current_block {
            let shown = self.state.current_progress;
            let total = count_with_plugins(&self.plugins, &current.node);
            let display_node =
                Self::current_display_node(&self.plugins, &mut self.cache, current, shown, total);
            out.push(DisplayBlock {
                id: current.id,
                status: current.status,
                node: current.node.clone(),
                display_node,
                progress: if total == 0 {
                    1.0
                } else {
                    shown as f64 / total as f64
                },
                is_display_complete: shown >= total,
                meta: current.meta.clone(),
            });
        }
        out
    }

    fn current_display_node(
        plugins: &[Box<dyn TransformerPlugin>],
        cache: &mut Option<DisplayCache>,
        current: &SourceBlock<T>,
        shown: usize,
        total: usize,
    ) -> AstNode {
        if let Some(outcome) = slice_with_plugins(plugins, &current.node, shown, total) {
            return match outcome {
                SliceOutcome::Sliced(node) => node,
                SliceOutcome::Hidden | SliceOutcome::Unhandled => {
                    AstNode::new(NodeKind::Paragraph)
                }
            };
        }
        if shown == 0 {
            return AstNode::new(NodeKind::Paragraph);
        }

        // Incremental path: extend the cached slice by just the window
        // revealed since it was taken.
        if let Some(cached) = cache
            && cached.block_id == current.id
            && cached.progress <= shown
        {
            if let Some(window) =
                slice_window(&current.node, cached.progress, shown - cached.progress)
            {
                merge_growth(&mut cached.node, window);
            }
            cached.progress = shown;
            return cached.node.clone();
        }

        let node =
            slice_node(&current.node, shown).unwrap_or_else(|| AstNode::new(NodeKind::Paragraph));
        *cache = Some(DisplayCache {
            block_id: current.id,
            progress: shown,
            node: node.clone(),
        });
        node
    }

    /// Reveals the current block and everything queued immediately.
    pub fn skip(&mut self) {
        if self.destroyed {
            return;
        }
        while self.state.current_block.is_some() {
            let total = self
                .state
                .current_block
                .as_ref()
                .map(|b| count_with_plugins(&self.plugins, &b.node))
                .unwrap_or(0);
            self.state.current_progress = total;
            self.complete_current();
        }
        self.running = false;
        self.emit_change();
    }

    /// Drops all blocks and reveal progress; options and plugins stay.
    pub fn reset(&mut self) {
        self.state = TransformerState::default();
        self.cache = None;
        self.last_tick = None;
        self.running = false;
        self.paused = false;
        if let Some(chunks) = &mut self.chunks {
            *chunks = AccumulatedChunks::default();
        }
    }

    pub fn pause(&mut self) {
        self.paused = true;
    }

    pub fn resume(&mut self) {
        self.paused = false;
        // Re-baseline so the pause gap does not count toward the interval.
        self.last_tick = None;
    }

    /// Permanently stops the transformer. Every call after this is a no-op.
    pub fn destroy(&mut self) {
        self.destroyed = true;
        self.running = false;
        self.state.pending_blocks = VecDeque::new();
        self.on_change = None;
    }

    /// Reports embedder visibility. Hidden transformers stop ticking when
    /// `pause_on_hidden` is set.
    pub fn set_visible(&mut self, visible: bool) {
        if visible && !self.visible {
            self.last_tick = None;
        }
        self.visible = visible;
    }

    pub fn set_chars_per_tick(
        &mut self,
        chars_per_tick: impl Into<CharsPerTick>,
    ) -> Result<(), OptionsError> {
        let chars_per_tick = chars_per_tick.into();
        chars_per_tick.validate()?;
        self.options.chars_per_tick = chars_per_tick;
        Ok(())
    }

    pub fn set_tick_interval(&mut self, ms: u64) {
        self.options.tick_interval = ms;
    }

    /// Switches the effect mid-stream. Turning fade-in on while a block is
    /// partially revealed marks the already shown prefix as stable so it
    /// does not re-animate.
    pub fn set_effect(&mut self, effect: AnimationEffect) {
        self.options.effect = effect;
        self.chunks = match effect {
            AnimationEffect::FadeIn => Some(AccumulatedChunks {
                stable_chars: self.state.current_progress,
                chunks: Vec::new(),
            }),
            _ => None,
        };
    }

    pub fn set_pause_on_hidden(&mut self, pause_on_hidden: bool) {
        self.options.pause_on_hidden = pause_on_hidden;
    }

    pub fn set_on_change(&mut self, callback: Box<dyn FnMut(&[DisplayBlock<T>])>) {
        self.on_change = Some(callback);
    }

    /// True while there is anything left to reveal.
    pub fn is_processing(&self) -> bool {
        self.running
            || self.state.current_block.is_some()
            || !self.state.pending_blocks.is_empty()
    }

    pub fn is_paused(&self) -> bool {
        self.paused
    }

    /// Fade-in chunk state for the current block, when that effect is on.
    pub fn current_chunks(&self) -> Option<&AccumulatedChunks> {
        self.chunks.as_ref()
    }

    pub fn state(&self) -> &TransformerState<T> {
        &self.state
    }

    /// Current configuration, reflecting any runtime `set_*` changes.
    pub fn options(&self) -> &TransformerOptions {
        &self.options
    }

    fn emit_change(&mut self) {
        if self.on_change.is_none() {
            return;
        }
        let blocks = self.display_blocks();
        if let Some(callback) = self.on_change.as_mut() {
            callback(&blocks);
        }
    }
}
