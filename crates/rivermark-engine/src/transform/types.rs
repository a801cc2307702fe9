//! Types for the progressive reveal pipeline.

use std::collections::VecDeque;

use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::ast::AstNode;
use crate::error::OptionsError;
use crate::types::BlockStatus;

/// Visual treatment hint carried on display output. The engine tracks the
/// data a renderer needs for each effect; drawing is the renderer's job.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum AnimationEffect {
    /// Reveal without any per-chunk bookkeeping.
    #[default]
    None,
    /// Newly revealed text is grouped into timed chunks for fading.
    FadeIn,
    /// Classic typewriter; chunk bookkeeping is not needed.
    Typing,
}

/// How many characters each tick reveals.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CharsPerTick {
    Fixed(usize),
    /// Uniformly random per tick, inclusive on both ends.
    Range(usize, usize),
}

impl CharsPerTick {
    pub fn validate(&self) -> Result<(), OptionsError> {
        if let Self::Range(min, max) = *self
            && min > max
        {
            return Err(OptionsError::InvertedStepRange { min, max });
        }
        Ok(())
    }

    /// Step size for one tick.
    pub fn sample(&self, rng: &mut impl Rng) -> usize {
        match *self {
            Self::Fixed(n) => n,
            Self::Range(min, max) => rng.random_range(min..=max),
        }
    }
}

impl From<usize> for CharsPerTick {
    fn from(n: usize) -> Self {
        Self::Fixed(n)
    }
}

impl From<(usize, usize)> for CharsPerTick {
    fn from((min, max): (usize, usize)) -> Self {
        Self::Range(min, max)
    }
}

impl From<[usize; 2]> for CharsPerTick {
    fn from([min, max]: [usize; 2]) -> Self {
        Self::Range(min, max)
    }
}

/// Reveal pacing and effect configuration.
#[derive(Debug, Clone, PartialEq)]
pub struct TransformerOptions {
    pub chars_per_tick: CharsPerTick,
    /// Minimum milliseconds between ticks. Zero ticks on every frame.
    pub tick_interval: u64,
    pub effect: AnimationEffect,
    /// Honor visibility changes reported via `set_visible`.
    pub pause_on_hidden: bool,
}

impl Default for TransformerOptions {
    fn default() -> Self {
        Self {
            chars_per_tick: CharsPerTick::Fixed(1),
            tick_interval: 20,
            effect: AnimationEffect::None,
            pause_on_hidden: true,
        }
    }
}

impl TransformerOptions {
    pub fn validate(&self) -> Result<(), OptionsError> {
        self.chars_per_tick.validate()
    }
}

/// A block fed into the transformer, with optional caller metadata that is
/// passed through to the matching display block untouched.
#[derive(Debug, Clone, PartialEq)]
pub struct SourceBlock<T = ()> {
    pub id: u64,
    pub status: BlockStatus,
    pub node: AstNode,
    pub meta: Option<T>,
}

/// A block as it should currently be drawn.
#[derive(Debug, Clone, PartialEq)]
pub struct DisplayBlock<T = ()> {
    pub id: u64,
    pub status: BlockStatus,
    /// The full source tree for the block.
    pub node: AstNode,
    /// The tree truncated to the revealed budget.
    pub display_node: AstNode,
    /// Revealed fraction in `[0, 1]`.
    pub progress: f64,
    pub is_display_complete: bool,
    pub meta: Option<T>,
}

/// Queue state of the reveal pipeline.
#[derive(Debug, Clone)]
pub struct TransformerState<T = ()> {
    /// Fully revealed blocks, in reveal order.
    pub completed_blocks: Vec<DisplayBlock<T>>,
    /// The block currently being revealed.
    pub current_block: Option<SourceBlock<T>>,
    /// Characters of the current block already revealed.
    pub current_progress: usize,
    /// Blocks waiting their turn.
    pub pending_blocks: VecDeque<SourceBlock<T>>,
}

impl<T> Default for TransformerState<T> {
    fn default() -> Self {
        Self {
            completed_blocks: Vec::new(),
            current_block: None,
            current_progress: 0,
            pending_blocks: VecDeque::new(),
        }
    }
}

/// One batch of text revealed by a single tick, for fade-in rendering.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TextChunk {
    pub text: String,
    /// Clock timestamp of the tick that revealed this chunk.
    pub created_at: u64,
}

/// Fade-in bookkeeping for the current block.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AccumulatedChunks {
    /// Characters revealed before chunk tracking started; rendered without
    /// animation.
    pub stable_chars: usize,
    pub chunks: Vec<TextChunk>,
}
