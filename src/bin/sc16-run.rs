use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use tracing::info;
use tracing_subscriber::EnvFilter;

use sc16_rs::{assemble, DataMemory, Machine, Program, Step};

#[derive(Debug, Clone, Copy, ValueEnum)]
enum Format {
    Text,
    Json,
}

#[derive(Parser, Debug)]
#[command(author, version, about = "Run an SC16 program on the sc16-rs interpreter")]
struct Opts {
    /// Program: hex words, or assembly source with --asm
    #[arg(value_name = "PROGRAM")]
    input: String,
    /// Treat the input as assembly source
    #[arg(long)]
    asm: bool,
    /// Data memory image to load before running
    #[arg(long, value_name = "FILE")]
    data: Option<String>,
    /// Stop after this many instructions
    #[arg(long, default_value_t = 10_000_000u64)]
    max_steps: u64,
    /// Print every executed instruction
    #[arg(long)]
    trace: bool,
    /// Final state format
    #[arg(long, value_enum, default_value_t = Format::Text)]
    format: Format,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let opts = Opts::parse();
    let text = std::fs::read_to_string(&opts.input)
        .with_context(|| format!("reading {}", opts.input))?;
    let program = if opts.asm {
        assemble(&text)?.program()
    } else {
        Program::from_listing(&text)
    };
    let data = match &opts.data {
        Some(path) => {
            let img = std::fs::read_to_string(path).with_context(|| format!("reading {path}"))?;
            DataMemory::from_image(&img)?
        }
        None => DataMemory::new(),
    };
    info!(words = program.len(), "program loaded");

    let mut m = Machine::with_data(program, data);
    let mut steps = 0u64;
    let mut trapped = None;
    while steps < opts.max_steps {
        let step = match m.step() {
            Ok(s) => s,
            Err(trap) => {
                eprintln!("TRAP: {trap}");
                trapped = Some(trap);
                break;
            }
        };
        if let Some(t) = step.trace() {
            steps += 1;
            if opts.trace {
                println!("{t}");
            }
        }
        if !step.continues() {
            if let Step::Halted(t) = &step {
                info!(pc = t.pc, "halted");
            }
            break;
        }
    }

    match opts.format {
        Format::Text => {
            println!("steps: {steps}");
            println!("pc: {:04X}", m.cpu.pc);
            for (i, r) in m.regs().iter().enumerate() {
                println!("r{i}: {r:04X}");
            }
            println!("flags: {:?}", m.cpu.flags);
        }
        Format::Json => println!("{}", serde_json::to_string_pretty(&m.cpu)?),
    }
    match trapped {
        Some(trap) => Err(trap.into()),
        None => Ok(()),
    }
}
