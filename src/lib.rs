pub mod asm;
pub mod cpu;
pub mod decoder;
pub mod disasm;
pub mod exec;
pub mod instructions;
pub mod machine;
pub mod memory;
pub mod program;

pub mod isa {
    pub mod sc16;
}

pub use asm::{assemble, AsmError, Assembly, SymbolTable};
pub use cpu::{Cpu, Flags, Trap};
pub use disasm::{disassemble, disassemble_program, Disassembly};
pub use machine::{Machine, RunState, Step, Trace};
pub use memory::{Bus, DataMemory};
pub use program::Program;
