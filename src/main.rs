//! rift-text: load a file into a block list buffer and report on it

use anyhow::{Context, Result};
use clap::Parser;
use rift_text::buffer::Buffer;
use rift_text::settings::{create_buffer_settings_registry, BufferOptions};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "rift-text")]
#[command(about = "Inspect how a file is stored as blocks and lines", long_about = None)]
#[command(version)]
struct Args {
    /// File to load
    #[arg(value_name = "FILE")]
    file: PathBuf,

    /// Print this line (0-based)
    #[arg(long, value_name = "N")]
    line: Option<usize>,

    /// Buffer option assignment (e.g. ts=4, enc=bytes, ro)
    #[arg(long = "set", value_name = "NAME=VALUE")]
    settings: Vec<String>,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();

    let registry = create_buffer_settings_registry();
    let mut options = BufferOptions::default();
    for assignment in &args.settings {
        registry
            .apply_assignment(&mut options, assignment)
            .with_context(|| format!("invalid option '{assignment}'"))?;
    }

    let buffer = Buffer::load(&args.file, options)
        .with_context(|| format!("failed to load {}", args.file.display()))?;

    println!("file:        {}", buffer.display_name());
    println!("bytes:       {}", buffer.len());
    println!("blocks:      {}", buffer.blocks().block_count());
    println!("lines:       {}", buffer.line_count());
    println!("line ending: {}", buffer.line_ending().as_str());
    println!("modified:    {}", buffer.is_modified());

    if let Some(n) = args.line {
        let mut iter = buffer.blocks().iter(buffer.options().decoding);
        if !iter.goto_line(n) {
            anyhow::bail!("line {} is past the end ({} lines)", n, buffer.line_count());
        }
        let line = iter.fill_line_ref();
        println!("{:>6} | {}", n, String::from_utf8_lossy(&line));
    }

    Ok(())
}
