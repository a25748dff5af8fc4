use std::fmt;

use serde::{Deserialize, Serialize};
use tracing::{debug, trace};

use crate::cpu::{Cpu, Flags, Trap, NUM_REGS};
use crate::decoder::Decoded;
use crate::disasm;
use crate::exec::IntExecutor;
use crate::isa::sc16::Sc16Decoder;
use crate::memory::DataMemory;
use crate::program::Program;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RunState {
    Idle,
    Running,
    Halted,
}

/// Snapshot of one executed instruction and the state it left behind.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Trace {
    pub pc: u16,
    pub insn: Decoded,
    pub operands: Vec<String>,
    pub regs: [u16; NUM_REGS],
    pub flags: Flags,
    pub next_pc: u16,
}

impl Trace {
    pub fn mnemonic(&self) -> &'static str {
        self.insn.op.mnemonic()
    }
}

impl fmt::Display for Trace {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{:04X}: {:04X} {:<4} {:<8}",
            self.pc,
            self.insn.word,
            self.mnemonic(),
            self.operands.join(",")
        )?;
        for (i, r) in self.regs.iter().enumerate() {
            write!(f, " r{i}: {r:04X}")?;
        }
        let flag = |bit: Flags, c: char| if self.flags.contains(bit) { c } else { ' ' };
        write!(
            f,
            " {}{}{}{}",
            flag(Flags::V, 'V'),
            flag(Flags::C, 'C'),
            flag(Flags::N, 'N'),
            flag(Flags::Z, 'Z')
        )
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Step {
    /// The program counter was already past the program; nothing ran.
    End,
    /// An instruction ran and execution may continue.
    Retired(Trace),
    /// An instruction ran and stopped the machine (self-branch, or pc ran off the address space).
    Halted(Trace),
}

impl Step {
    pub fn continues(&self) -> bool {
        matches!(self, Step::Retired(_))
    }

    pub fn trace(&self) -> Option<&Trace> {
        match self {
            Step::End => None,
            Step::Retired(t) | Step::Halted(t) => Some(t),
        }
    }
}

/// The interpreter: CPU state plus program and data memory.
pub struct Machine {
    pub cpu: Cpu,
    program: Program,
    data: DataMemory,
    state: RunState,
    dec: Sc16Decoder,
    exec: IntExecutor,
}

impl Machine {
    pub fn new(program: Program) -> Self {
        Self::with_data(program, DataMemory::new())
    }

    pub fn with_data(program: Program, data: DataMemory) -> Self {
        Self {
            cpu: Cpu::new(),
            program,
            data,
            state: RunState::Idle,
            dec: Sc16Decoder::new(),
            exec: IntExecutor,
        }
    }

    /// Zeroes registers, flags and pc. Program and data memory are kept.
    pub fn reset(&mut self) {
        self.cpu.reset();
        self.state = RunState::Idle;
    }

    pub fn load(&mut self, program: Program) {
        self.program = program;
        self.reset();
    }

    pub fn program(&self) -> &Program {
        &self.program
    }

    pub fn data(&self) -> &DataMemory {
        &self.data
    }

    /// Data memory may be edited freely between steps.
    pub fn data_mut(&mut self) -> &mut DataMemory {
        &mut self.data
    }

    pub fn state(&self) -> RunState {
        self.state
    }

    pub fn regs(&self) -> &[u16; NUM_REGS] {
        &self.cpu.regs
    }

    pub fn step(&mut self) -> Result<Step, Trap> {
        let retired = match self
            .cpu
            .step(&self.program, &mut self.data, &self.dec, &self.exec)
        {
            Ok(Some(r)) => r,
            Ok(None) => {
                self.state = RunState::Halted;
                return Ok(Step::End);
            }
            Err(trap) => {
                debug!(%trap, "execution stopped");
                self.state = RunState::Halted;
                return Err(trap);
            }
        };

        let t = Trace {
            pc: retired.pc,
            insn: retired.insn,
            operands: disasm::operands(&retired.insn),
            regs: self.cpu.regs,
            flags: self.cpu.flags,
            next_pc: self.cpu.pc,
        };
        trace!("{t}");

        if retired.halted {
            debug!(pc = retired.pc, "halted");
            self.state = RunState::Halted;
            Ok(Step::Halted(t))
        } else {
            self.state = RunState::Running;
            Ok(Step::Retired(t))
        }
    }

    /// Steps until the machine stops or `max_steps` instructions have run.
    /// Returns the number of instructions executed.
    pub fn run(&mut self, max_steps: u64) -> Result<u64, Trap> {
        let mut n = 0;
        while n < max_steps {
            let step = self.step()?;
            if step.trace().is_some() {
                n += 1;
            }
            if !step.continues() {
                break;
            }
        }
        Ok(n)
    }
}
