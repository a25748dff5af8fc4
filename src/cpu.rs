use anyhow::Error;
use bitflags::bitflags;
use serde::{Deserialize, Serialize};

use crate::decoder::{Decoded, Decoder};
use crate::exec::Executor;
use crate::isa::sc16;
use crate::memory::Bus;
use crate::program::Program;

pub const NUM_REGS: usize = 8;
/// Call-stack pointer used by the `ISTK`/`CALL`/`RET` macros.
pub const STACK_REG: u8 = 7;
/// Link register used by the `CALL`/`RET` macros.
pub const LINK_REG: u8 = 6;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Cpu {
    pub pc: u16,
    pub flags: Flags,
    pub regs: [u16; NUM_REGS],
}

bitflags! {
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Flags: u8 {
const V = 1 << 0; // Overflow, never set
const C = 1 << 1; // Carry, never set
const N = 1 << 2; // Negative
const Z = 1 << 3; // Zero
}
}

impl Flags {
    /// N/Z for a written result; V and C stay clear.
    pub fn from_result(v: u16) -> Self {
        let mut f = Flags::empty();
        f.set(Flags::N, v & 0x8000 != 0);
        f.set(Flags::Z, v == 0);
        f
    }
}

#[derive(thiserror::Error, Debug)]
pub enum Trap {
    #[error("HALT: bad opcode {opcode:02X} at {pc:04X}")]
    InvalidOpcode { pc: u16, opcode: u8 },
    #[error("Bus error at {addr:#06x}: {source}")]
    Bus { addr: u16, #[source] source: Error },
}

/// One retired instruction as seen by [`Cpu::step`].
#[derive(Debug, Clone, Copy)]
pub struct Retired {
    pub pc: u16,
    pub insn: Decoded,
    /// Taken branch or jump target
    pub target: Option<u16>,
    pub halted: bool,
}

impl Default for Cpu {
    fn default() -> Self {
        Self::new()
    }
}

impl Cpu {
    pub fn new() -> Self {
        Self {
            pc: 0,
            flags: Flags::empty(),
            regs: [0; NUM_REGS],
        }
    }

    pub fn reset(&mut self) {
        *self = Self::new();
    }

    pub fn reg(&self, r: u8) -> u16 {
        self.regs[usize::from(r & 0x7)]
    }

    pub fn set_reg(&mut self, r: u8, v: u16) {
        self.regs[usize::from(r & 0x7)] = v;
    }

    /// Executes the instruction at `pc`. Returns `Ok(None)` once `pc` has run past the program.
    pub fn step<B: Bus, D: Decoder, X: Executor>(
        &mut self,
        program: &Program,
        bus: &mut B,
        dec: &D,
        exec: &X,
    ) -> Result<Option<Retired>, Trap> {
        let pc = self.pc;
        let Some(word) = program.fetch(pc) else {
            return Ok(None);
        };
        let insn = dec.decode(word).ok_or(Trap::InvalidOpcode {
            pc,
            opcode: sc16::decode(word).op,
        })?;
        let target = exec.exec(self, bus, insn)?;
        let halted = match target {
            // a branch onto itself is the program's way of stopping
            Some(t) if t == pc => true,
            Some(t) => {
                self.pc = t;
                false
            }
            None => match pc.checked_add(1) {
                Some(next) => {
                    self.pc = next;
                    false
                }
                None => true,
            },
        };
        Ok(Some(Retired {
            pc,
            insn,
            target,
            halted,
        }))
    }
}
