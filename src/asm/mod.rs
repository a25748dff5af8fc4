//! Two-pass SC16 assembler.
//!
//! Source goes through four fixed stages: literal normalization, macro
//! expansion into a flat list of logical lines, layout (address assignment and
//! resolution of deferred loads) and encoding. Each stage consumes the previous
//! stage's output and never edits it in place.

mod encode;
mod layout;
mod listing;
pub mod literal;
mod macros;

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::program::Program;

pub use macros::sldi;

/// Label name (without the leading `.`) to instruction address.
pub type SymbolTable = BTreeMap<String, u16>;

/// Assembly-time failures. `line` is the 1-based source line; instructions
/// produced by a macro report the macro's line.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum AsmError {
    #[error("line {line}: invalid label name `{label}`")]
    InvalidLabel { line: usize, label: String },
    #[error("line {line}: duplicate symbol definition .{name}")]
    DuplicateSymbol { line: usize, name: String },
    #[error("line {line}: undefined symbol .{name}")]
    UndefinedSymbol { line: usize, name: String },
    #[error("line {line}: unknown argument `{operand}`")]
    UnknownOperand { line: usize, operand: String },
    #[error("line {line}: unknown instruction `{mnemonic}`")]
    UnknownMnemonic { line: usize, mnemonic: String },
    #[error("line {line}: invalid args for {mnemonic}")]
    SchemaMismatch { line: usize, mnemonic: String },
    #[error("line {line}: branch too far (tried to branch {offset})")]
    BranchTooFar { line: usize, offset: i32 },
    #[error("line {line}: malformed macro `{text}`")]
    BadMacro { line: usize, text: String },
    #[error("line {line}: value {value} does not fit in 16 bits")]
    ValueOutOfRange { line: usize, value: String },
    #[error("line {line}: program does not fit in 65536 words")]
    ProgramTooLarge { line: usize },
}

impl AsmError {
    pub fn line(&self) -> usize {
        match self {
            AsmError::InvalidLabel { line, .. }
            | AsmError::DuplicateSymbol { line, .. }
            | AsmError::UndefinedSymbol { line, .. }
            | AsmError::UnknownOperand { line, .. }
            | AsmError::UnknownMnemonic { line, .. }
            | AsmError::SchemaMismatch { line, .. }
            | AsmError::BranchTooFar { line, .. }
            | AsmError::BadMacro { line, .. }
            | AsmError::ValueOutOfRange { line, .. }
            | AsmError::ProgramTooLarge { line } => *line,
        }
    }
}

/// Result of a successful assembly.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Assembly {
    /// Concatenated 4-digit uppercase hex words, no separators
    pub hex: String,
    pub symbols: SymbolTable,
    /// Fully expanded source, for display only
    pub intermediate: String,
    /// 1-based source line of every emitted instruction, in program order
    pub line_map: Vec<usize>,
}

impl Assembly {
    pub fn program(&self) -> Program {
        Program::from_hex(&self.hex)
    }

    pub fn len(&self) -> usize {
        self.line_map.len()
    }

    pub fn is_empty(&self) -> bool {
        self.line_map.is_empty()
    }

    /// Source line that produced the instruction at `pc`.
    pub fn source_line(&self, pc: u16) -> Option<usize> {
        self.line_map.get(usize::from(pc)).copied()
    }

    /// Hex image with a symbol summary in comments, one word per line.
    pub fn listing(&self) -> String {
        listing::pretty_hex(&self.hex, &self.symbols)
    }
}

pub fn assemble(source: &str) -> Result<Assembly, AsmError> {
    let source = literal::normalize_literals(source);
    let lines = macros::expand(&source)?;
    debug!(lines = lines.len(), "macros expanded");

    let laid = layout::layout(&lines)?;
    debug!(
        lines = laid.lines.len(),
        symbols = laid.symbols.len(),
        "addresses assigned"
    );

    let enc = encode::encode(&laid.lines, &laid.symbols)?;
    let intermediate = listing::intermediate(&laid.lines, &laid.symbols);
    let hex: String = enc.words.iter().map(|w| format!("{w:04X}")).collect();
    debug!(words = enc.words.len(), "assembled");

    Ok(Assembly {
        hex,
        symbols: laid.symbols,
        intermediate,
        line_map: enc.line_map,
    })
}

/// One logical line after macro expansion.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct Line {
    /// 1-based source line this came from
    pub src: usize,
    pub kind: LineKind,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum LineKind {
    /// Blank line, comment or macro marker
    Text(String),
    /// `.name:` as written; checked during layout
    Label(String),
    /// A machine instruction, possibly with a trailing comment
    Insn(String),
    /// `SLDI` whose value is only known once addresses are assigned
    Deferred { reg: u8, target: Deferred },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum Deferred {
    Symbol(String),
    /// Address of the instruction `tail` words after the load
    ReturnAddress { tail: usize },
}

impl Line {
    pub(crate) fn new(src: usize, kind: LineKind) -> Self {
        Self { src, kind }
    }
}

/// Everything before `//`, trimmed.
pub(crate) fn strip_comment(line: &str) -> &str {
    match line.find("//") {
        Some(p) => line[..p].trim(),
        None => line.trim(),
    }
}

/// `r0`..`r7`, either case.
pub(crate) fn parse_reg(tok: &str) -> Option<u8> {
    let digits = tok.strip_prefix(['r', 'R'])?;
    match digits.as_bytes() {
        [d @ b'0'..=b'7'] => Some(d - b'0'),
        _ => None,
    }
}

pub(crate) fn is_ident(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn registers() {
        assert_eq!(parse_reg("r0"), Some(0));
        assert_eq!(parse_reg("R7"), Some(7));
        assert_eq!(parse_reg("r8"), None);
        assert_eq!(parse_reg("r10"), None);
        assert_eq!(parse_reg("x1"), None);
    }

    #[test]
    fn identifiers() {
        assert!(is_ident("loop"));
        assert!(is_ident("_a1"));
        assert!(!is_ident("1a"));
        assert!(!is_ident(""));
        assert!(!is_ident("a-b"));
    }

    #[test]
    fn comments_are_stripped() {
        assert_eq!(strip_comment("  add r0,r1,r2 // sum "), "add r0,r1,r2");
        assert_eq!(strip_comment("// only"), "");
    }
}
