use anyhow::Result;
use clap::{Parser, ValueEnum};
use std::fmt::Write as _;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

use sc16_rs::disassemble_program;
use sc16_tools::load_program;

#[derive(Parser, Debug)]
#[command(author, version, about = "SC16 disassembler CLI", long_about = None)]
struct Cli {
    /// Hex program or assembler listing
    #[arg(value_name = "HEXFILE")]
    input: PathBuf,
    /// Prefix each line with its address and raw word
    #[arg(long)]
    show_words: bool,
    /// Output format: text or json
    #[arg(long, value_enum, default_value_t = OutputFormat::Text)]
    format: OutputFormat,
    /// Write output to file instead of stdout
    #[arg(long, value_name = "FILE")]
    out: Option<PathBuf>,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum OutputFormat {
    Text,
    Json,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();
    let program = load_program(&cli.input)?;
    let dis = disassemble_program(&program);

    let buf = match cli.format {
        OutputFormat::Json => serde_json::to_string_pretty(&dis)?,
        OutputFormat::Text => {
            let mut buf = String::from("// Disassembled with sc16-disasm\n");
            for l in &dis.lines {
                if cli.show_words {
                    let _ = write!(buf, "{:04X}: {:04X}  ", l.addr, l.word);
                }
                let _ = writeln!(buf, "{}", l.text);
            }
            if let Some((addr, opcode)) = dis.stopped_at {
                let _ = writeln!(buf, "// HALT: bad opcode {opcode:02X} at {addr:04X}");
            }
            buf
        }
    };

    if let Some(path) = cli.out {
        std::fs::write(path, buf)?;
    } else {
        print!("{buf}");
    }
    Ok(())
}
