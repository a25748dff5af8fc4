use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::decoder::{Decoded, Decoder};
use crate::instructions::{Kind, Slot};
use crate::isa::sc16::{self, Sc16Decoder};
use crate::program::Program;

/// Operands in assembly order: `rN` for registers, decimal for immediates and offsets.
pub fn operands(d: &Decoded) -> Vec<String> {
    d.op.desc()
        .operands
        .iter()
        .map(|o| {
            let field = match o.slot {
                Slot::Da => d.da,
                Slot::Aa => d.aa,
                Slot::Ba => d.ba,
                Slot::DaBa => return d.offset().to_string(),
            };
            match o.kind {
                Kind::Reg => format!("r{field}"),
                Kind::Imm | Kind::Off => field.to_string(),
            }
        })
        .collect()
}

pub fn fmt_decoded(d: &Decoded) -> String {
    format!("{:<4} {}", d.op.mnemonic(), operands(d).join(","))
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DisasmLine {
    pub addr: u16,
    pub word: u16,
    pub text: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Disassembly {
    pub lines: Vec<DisasmLine>,
    /// `(address, opcode)` of the word that stopped disassembly
    pub stopped_at: Option<(u16, u8)>,
}

impl Disassembly {
    pub fn text(&self) -> String {
        self.lines.iter().map(|l| format!("{}\n", l.text)).collect()
    }
}

/// Decodes a program front to back. Branches are shown, never followed.
pub fn disassemble_program(program: &Program) -> Disassembly {
    let dec = Sc16Decoder::new();
    let mut out = Disassembly::default();
    for (addr, &word) in program.words().iter().enumerate() {
        let addr = addr as u16;
        let Some(d) = dec.decode(word) else {
            let opcode = sc16::decode(word).op;
            warn!("disassembly stopped: bad opcode {opcode:02X} at {addr:04X}");
            out.stopped_at = Some((addr, opcode));
            break;
        };
        out.lines.push(DisasmLine {
            addr,
            word,
            text: fmt_decoded(&d),
        });
    }
    out
}

/// Hex text in, one mnemonic line per word out. `//` lines are ignored.
pub fn disassemble(text: &str) -> String {
    disassemble_program(&Program::from_listing(text)).text()
}
