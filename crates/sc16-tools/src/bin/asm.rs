use anyhow::Result;
use clap::Parser;
use std::fs;
use std::path::PathBuf;
use tracing::info;
use tracing_subscriber::EnvFilter;

use sc16_rs::assemble;
use sc16_tools::{read_source, symbol_list};

#[derive(Parser, Debug)]
#[command(author, version, about = "SC16 assembler")]
struct Opts {
    /// Input assembly file
    #[arg(short, long)]
    input: PathBuf,
    /// Output hex file
    #[arg(short, long)]
    output: PathBuf,
    /// Write an annotated one-word-per-line listing instead of the bare hex stream
    #[arg(long)]
    listing: bool,
    /// Also write the expanded intermediate source
    #[arg(long, value_name = "FILE")]
    intermediate: Option<PathBuf>,
    /// Export symbols to JSON (Vec<{ addr, name }>)
    #[arg(long, value_name = "FILE")]
    symbols_out: Option<PathBuf>,
    /// Write the whole assembly result as JSON
    #[arg(long, value_name = "FILE")]
    json: Option<PathBuf>,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let opts = Opts::parse();
    let src = read_source(&opts.input)?;
    let out = assemble(&src)?;
    info!(words = out.len(), symbols = out.symbols.len(), "assembled {}", opts.input.display());

    if opts.listing {
        fs::write(&opts.output, out.listing() + "\n")?;
    } else {
        fs::write(&opts.output, &out.hex)?;
    }
    if let Some(path) = &opts.intermediate {
        fs::write(path, &out.intermediate)?;
    }
    if let Some(path) = &opts.symbols_out {
        fs::write(path, serde_json::to_string_pretty(&symbol_list(&out.symbols))?)?;
    }
    if let Some(path) = &opts.json {
        fs::write(path, serde_json::to_string_pretty(&out)?)?;
    }
    Ok(())
}
