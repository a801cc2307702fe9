//! Pipeline tests: parser output driven through the transformer with a
//! manual clock, checking reveal pacing and budget conservation.

use pretty_assertions::assert_eq;

use rivermark_engine::transform::count_chars;
use rivermark_engine::{
    AnimationEffect, BlockTransformer, CharsPerTick, ManualClock, ParserOptions, SourceBlock,
    StreamParser, TransformerOptions, all_plugins,
};

fn immediate(chars_per_tick: CharsPerTick) -> TransformerOptions {
    TransformerOptions {
        chars_per_tick,
        tick_interval: 0,
        ..Default::default()
    }
}

fn source_blocks(parser: &StreamParser) -> Vec<SourceBlock> {
    parser
        .completed_blocks()
        .iter()
        .map(|b| SourceBlock {
            id: b.id,
            status: b.status,
            node: b.node.clone(),
            meta: None,
        })
        .collect()
}

fn pipeline(text: &str) -> Vec<SourceBlock> {
    let mut parser = StreamParser::new(ParserOptions::default()).unwrap();
    parser.render(text);
    source_blocks(&parser)
}

#[test]
fn every_character_eventually_appears() {
    let blocks = pipeline("# Title\n\nHello *world*, this is a stream.\n");
    let expected: String = blocks.iter().map(|b| b.node.plain_text()).collect();

    let clock = ManualClock::new();
    let mut t = BlockTransformer::new(immediate(CharsPerTick::Fixed(1)))
        .unwrap()
        .with_clock(clock);
    t.push(&blocks);
    let mut frames = 0;
    while t.is_processing() {
        t.on_frame();
        frames += 1;
        assert!(frames < 10_000, "reveal did not terminate");
    }
    let revealed: String = t
        .display_blocks()
        .iter()
        .map(|b| b.display_node.plain_text())
        .collect();
    assert_eq!(revealed, expected);
}

#[test]
fn tick_count_matches_character_budget() {
    let blocks = pipeline("0123456789\n");
    assert_eq!(blocks.len(), 1);
    assert_eq!(count_chars(&blocks[0].node), 10);

    let clock = ManualClock::new();
    let mut t = BlockTransformer::new(immediate(CharsPerTick::Fixed(1)))
        .unwrap()
        .with_clock(clock);
    t.push(&blocks);
    for _ in 0..9 {
        t.on_frame();
        assert!(t.is_processing());
    }
    t.on_frame();
    assert!(!t.is_processing());
}

#[test]
fn budget_is_conserved_across_chunking() {
    let text = "# H\n\npara one\n\n- a\n- b\n\n```\ncode\n```\n\nlast\n";
    let whole: usize = pipeline(text).iter().map(|b| count_chars(&b.node)).sum();

    let mut parser = StreamParser::new(ParserOptions::default()).unwrap();
    for ch in text.chars() {
        parser.append(&ch.to_string());
    }
    parser.finalize();
    let chunked: usize = source_blocks(&parser)
        .iter()
        .map(|b| count_chars(&b.node))
        .sum();
    assert_eq!(whole, chunked);
}

#[test]
fn reveal_follows_the_stream_as_blocks_complete() {
    let clock = ManualClock::new();
    let mut parser = StreamParser::new(ParserOptions::default()).unwrap();
    let mut t = BlockTransformer::new(immediate(CharsPerTick::Fixed(50)))
        .unwrap()
        .with_clock(clock);

    let update = parser.append("first block\n\nsecond ");
    t.push(&source_blocks(&parser));
    assert_eq!(update.completed.len(), 1);
    t.on_frame();
    let shown = t.display_blocks();
    assert_eq!(shown.len(), 1);
    assert_eq!(shown[0].display_node.plain_text(), "first block");

    parser.append("block\n\n");
    parser.finalize();
    t.push(&source_blocks(&parser));
    t.on_frame();
    let shown = t.display_blocks();
    assert_eq!(shown.len(), 2);
    assert_eq!(shown[1].display_node.plain_text(), "second block");
}

#[test]
fn code_blocks_pop_in_whole_through_the_pipeline() {
    let blocks = pipeline("intro\n\n```rust\nfn f() -> u8 { 0 }\n```\n");
    let clock = ManualClock::new();
    let mut t = BlockTransformer::new(immediate(CharsPerTick::Fixed(1)))
        .unwrap()
        .with_clock(clock)
        .with_plugins(all_plugins());
    t.push(&blocks);

    // 5 ticks for "intro", then one tick for the whole code block.
    for _ in 0..5 {
        t.on_frame();
    }
    let shown = t.display_blocks();
    assert!(shown[0].is_display_complete);
    assert_eq!(shown.last().unwrap().display_node.plain_text(), "");

    t.on_frame();
    let shown = t.display_blocks();
    assert!(shown.iter().all(|b| b.is_display_complete));
    assert!(!t.is_processing());
}

#[test]
fn fade_in_chunks_cover_the_block_text() {
    let blocks = pipeline("abcdefgh\n");
    let clock = ManualClock::new();
    let mut t = BlockTransformer::new(TransformerOptions {
        chars_per_tick: CharsPerTick::Fixed(3),
        tick_interval: 0,
        effect: AnimationEffect::FadeIn,
        ..Default::default()
    })
    .unwrap()
    .with_clock(clock.clone());
    t.push(&blocks);

    t.on_frame();
    clock.advance(1);
    t.on_frame();
    let joined: String = t
        .current_chunks()
        .unwrap()
        .chunks
        .iter()
        .map(|c| c.text.as_str())
        .collect();
    assert_eq!(joined, "abcdef");
}

#[test]
fn paused_pipeline_is_inert() {
    let blocks = pipeline("some text\n");
    let clock = ManualClock::new();
    let mut t = BlockTransformer::new(immediate(CharsPerTick::Fixed(1)))
        .unwrap()
        .with_clock(clock.clone());
    t.push(&blocks);
    t.on_frame();
    let before = t.display_blocks();

    t.pause();
    for _ in 0..20 {
        clock.advance(100);
        t.on_frame();
    }
    assert_eq!(t.display_blocks(), before);
    t.resume();
    t.on_frame();
    assert_ne!(t.display_blocks(), before);
}

#[test]
fn random_step_still_terminates_and_covers_everything() {
    let blocks = pipeline("The quick brown fox jumps over the lazy dog.\n");
    let expected: String = blocks.iter().map(|b| b.node.plain_text()).collect();
    let clock = ManualClock::new();
    let mut t = BlockTransformer::new(immediate(CharsPerTick::Range(1, 4)))
        .unwrap()
        .with_clock(clock);
    t.push(&blocks);
    let mut frames = 0;
    while t.is_processing() {
        t.on_frame();
        frames += 1;
        assert!(frames < 10_000);
    }
    let revealed: String = t
        .display_blocks()
        .iter()
        .map(|b| b.display_node.plain_text())
        .collect();
    assert_eq!(revealed, expected);
}
