use serde::{Deserialize, Serialize};

use crate::instructions::{InstrDesc, TABLE};
use crate::isa::sc16::branch_offset;

/// Every SC16 opcode. Declaration order matches [`TABLE`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Op {
    Mova,
    Inc,
    Add,
    Sub,
    Dec,
    And,
    Or,
    Xor,
    Not,
    Movb,
    Shr,
    Shl,
    Ld,
    St,
    Adi,
    Ldi,
    Brz,
    Brn,
    Jmp,
}

impl Op {
    pub const COUNT: usize = 19;

    pub fn desc(self) -> &'static InstrDesc {
        &TABLE[self as usize]
    }

    /// Numeric 7-bit opcode.
    pub fn code(self) -> u8 {
        self.desc().code
    }

    pub fn mnemonic(self) -> &'static str {
        self.desc().mnemonic
    }

    pub fn from_code(code: u8) -> Option<Op> {
        TABLE.iter().find(|d| d.code == code).map(|d| d.op)
    }

    pub fn is_branch(self) -> bool {
        matches!(self, Op::Brz | Op::Brn | Op::Jmp)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Decoded {
    pub op: Op,
    pub word: u16,
    pub da: u8,
    pub aa: u8,
    pub ba: u8,
}

impl Decoded {
    /// Relative displacement held in `da:ba`; only meaningful for `brz`/`brn`.
    pub fn offset(&self) -> i8 {
        branch_offset(self.da, self.ba)
    }
}

pub trait Decoder {
    fn decode(&self, word: u16) -> Option<Decoded>;
}
