use anyhow::{Context, Result};
use log::debug;
use rivermark_engine::{
    BlockTransformer, CharsPerTick, ParserOptions, SourceBlock, StreamParser, TransformerOptions,
    all_plugins,
};
use std::io::Write;
use std::{env, fs, process, thread, time::Duration};

struct Args {
    path: String,
    chunk_size: usize,
    tick_interval: u64,
    chars_per_tick: usize,
    no_animate: bool,
}

fn parse_args() -> Result<Args> {
    let argv: Vec<String> = env::args().collect();
    let mut args = Args {
        path: String::new(),
        chunk_size: 64,
        tick_interval: 20,
        chars_per_tick: 2,
        no_animate: false,
    };

    let mut it = argv.iter().skip(1);
    while let Some(arg) = it.next() {
        match arg.as_str() {
            "--chunk-size" => {
                args.chunk_size = it
                    .next()
                    .context("--chunk-size needs a value")?
                    .parse()
                    .context("--chunk-size must be a number")?;
            }
            "--interval" => {
                args.tick_interval = it
                    .next()
                    .context("--interval needs a value")?
                    .parse()
                    .context("--interval must be milliseconds")?;
            }
            "--cps" => {
                args.chars_per_tick = it
                    .next()
                    .context("--cps needs a value")?
                    .parse()
                    .context("--cps must be a number")?;
            }
            "--no-animate" => args.no_animate = true,
            other if args.path.is_empty() && !other.starts_with('-') => {
                args.path = other.to_string();
            }
            other => anyhow::bail!("unknown argument: {other}"),
        }
    }
    if args.path.is_empty() {
        eprintln!(
            "Usage: {} <markdown-file> [--chunk-size N] [--interval MS] [--cps N] [--no-animate]",
            argv.first().map(String::as_str).unwrap_or("rivermark")
        );
        process::exit(1);
    }
    Ok(args)
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

/// Concatenated text of everything currently revealed.
fn revealed_text(transformer: &mut BlockTransformer) -> String {
    let mut out = String::new();
    for block in transformer.display_blocks() {
        out.push_str(&block.display_node.plain_text());
        if block.is_display_complete {
            out.push_str("\n\n");
        }
    }
    out
}

fn main() -> Result<()> {
    env_logger::init();
    let args = parse_args()?;

    let text = fs::read_to_string(&args.path)
        .with_context(|| format!("failed to read {}", args.path))?;

    let mut parser = StreamParser::new(ParserOptions::default())?;

    if args.no_animate {
        // Parse-only mode: stream in chunks and report the block structure.
        let chars: Vec<char> = text.chars().collect();
        for chunk in chars.chunks(args.chunk_size.max(1)) {
            let piece: String = chunk.iter().collect();
            parser.append(&piece);
        }
        parser.finalize();
        for block in parser.completed_blocks() {
            println!(
                "#{:<4} {:?} [{}..{}]",
                block.id, block.node.kind, block.start_offset, block.end_offset
            );
        }
        return Ok(());
    }

    let mut transformer = BlockTransformer::new(TransformerOptions {
        chars_per_tick: CharsPerTick::Fixed(args.chars_per_tick.max(1)),
        tick_interval: args.tick_interval,
        ..Default::default()
    })?
    .with_plugins(all_plugins());

    let mut stdout = std::io::stdout().lock();
    let mut printed = 0usize;
    let chars: Vec<char> = text.chars().collect();
    let mut chunks = chars.chunks(args.chunk_size.max(1));
    let mut stream_done = false;

    loop {
        // Interleave feeding and revealing, the way a network stream and a
        // render loop would overlap.
        if !stream_done {
            match chunks.next() {
                Some(chunk) => {
                    let piece: String = chunk.iter().collect();
                    parser.append(&piece);
                }
                None => {
                    parser.finalize();
                    stream_done = true;
                    debug!(
                        "stream complete, {} blocks parsed",
                        parser.completed_blocks().len()
                    );
                }
            }
            transformer.push(&source_blocks(&parser));
        }

        transformer.on_frame();
        let revealed = revealed_text(&mut transformer);
        if revealed.len() > printed {
            write!(stdout, "{}", &revealed[printed..])?;
            stdout.flush()?;
            printed = revealed.len();
        }

        if stream_done && !transformer.is_processing() {
            break;
        }
        thread::sleep(Duration::from_millis(args.tick_interval.clamp(1, 50)));
    }
    writeln!(stdout)?;
    Ok(())
}
