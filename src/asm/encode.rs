use crate::instructions::{lookup, InstrDesc, Kind, Slot};
use crate::isa::sc16::{self, Fields, OFFSET_MAX, OFFSET_MIN};

use super::{parse_reg, strip_comment, AsmError, Line, LineKind, SymbolTable};

#[derive(Debug)]
pub(crate) struct Encoded {
    pub words: Vec<u16>,
    pub line_map: Vec<usize>,
}

/// A classified operand token.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Arg {
    Reg(u8),
    /// `.name`, already resolved
    Addr(u16),
    /// 0..=7
    Imm(u8),
    /// any other integer
    Off(i32),
}

fn classify(line: usize, tok: &str, symbols: &SymbolTable) -> Result<Arg, AsmError> {
    if let Some(r) = parse_reg(tok) {
        return Ok(Arg::Reg(r));
    }
    if let Some(name) = tok.strip_prefix('.') {
        return symbols
            .get(name)
            .map(|a| Arg::Addr(*a))
            .ok_or_else(|| AsmError::UndefinedSymbol {
                line,
                name: name.to_string(),
            });
    }
    match tok.parse::<i32>() {
        Ok(v @ 0..=7) => Ok(Arg::Imm(v as u8)),
        Ok(v) => Ok(Arg::Off(v)),
        Err(_) => Err(AsmError::UnknownOperand {
            line,
            operand: tok.to_string(),
        }),
    }
}

/// Splits `mnem a, b ,c` into the mnemonic and whitespace-free operand tokens.
pub(crate) fn split_insn(code: &str) -> (&str, Vec<String>) {
    let (mnem, rest) = match code.split_once(char::is_whitespace) {
        Some((m, rest)) => (m, rest),
        None => (code, ""),
    };
    let rest: String = rest.chars().filter(|c| !c.is_whitespace()).collect();
    let args = if rest.is_empty() {
        Vec::new()
    } else {
        rest.split(',').map(str::to_string).collect()
    };
    (mnem, args)
}

fn encode_insn(
    line: usize,
    pc: u16,
    code: &str,
    symbols: &SymbolTable,
) -> Result<u16, AsmError> {
    let (mnem, toks) = split_insn(code);
    let desc: &InstrDesc = lookup(mnem).ok_or_else(|| AsmError::UnknownMnemonic {
        line,
        mnemonic: mnem.to_string(),
    })?;

    let args = toks
        .iter()
        .map(|t| classify(line, t, symbols))
        .collect::<Result<Vec<_>, _>>()?;
    let mismatch = || AsmError::SchemaMismatch {
        line,
        mnemonic: desc.mnemonic.to_string(),
    };
    if args.len() != desc.operands.len() {
        return Err(mismatch());
    }

    let mut f = Fields {
        op: desc.code,
        ..Fields::default()
    };
    for (arg, opnd) in args.iter().zip(desc.operands) {
        let field = match (opnd.kind, *arg) {
            (Kind::Reg, Arg::Reg(r)) => r,
            // symbol addresses in an immediate slot wrap to the field width
            (Kind::Imm, Arg::Imm(v)) => v,
            (Kind::Imm, Arg::Addr(a)) => (a & 0x7) as u8,
            (Kind::Off, Arg::Imm(v)) => {
                set_offset(&mut f, line, i32::from(v))?;
                continue;
            }
            (Kind::Off, Arg::Off(v)) => {
                set_offset(&mut f, line, v)?;
                continue;
            }
            (Kind::Off, Arg::Addr(a)) => {
                set_offset(&mut f, line, i32::from(a) - i32::from(pc))?;
                continue;
            }
            _ => return Err(mismatch()),
        };
        match opnd.slot {
            Slot::Da => f.da = field,
            Slot::Aa => f.aa = field,
            Slot::Ba => f.ba = field,
            Slot::DaBa => return Err(mismatch()),
        }
    }
    Ok(sc16::encode(f))
}

fn set_offset(f: &mut Fields, line: usize, offset: i32) -> Result<(), AsmError> {
    if !(OFFSET_MIN..=OFFSET_MAX).contains(&offset) {
        return Err(AsmError::BranchTooFar { line, offset });
    }
    (f.da, f.ba) = sc16::offset_fields(offset);
    Ok(())
}

/// Pass 2: one word and one line-map entry per instruction line.
pub(crate) fn encode(lines: &[Line], symbols: &SymbolTable) -> Result<Encoded, AsmError> {
    let mut out = Encoded {
        words: Vec::new(),
        line_map: Vec::new(),
    };
    for line in lines {
        let LineKind::Insn(text) = &line.kind else {
            continue;
        };
        let pc = u16::try_from(out.words.len())
            .map_err(|_| AsmError::ProgramTooLarge { line: line.src })?;
        out.words
            .push(encode_insn(line.src, pc, strip_comment(text), symbols)?);
        out.line_map.push(line.src);
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn one(code: &str) -> Result<u16, AsmError> {
        encode_insn(1, 0, code, &SymbolTable::new())
    }

    #[test]
    fn splits_operands_ignoring_whitespace() {
        let (m, args) = split_insn("add  r0, r1 ,\tr2");
        assert_eq!(m, "add");
        assert_eq!(args, vec!["r0", "r1", "r2"]);
        assert_eq!(split_insn("jmp r3").1, vec!["r3"]);
    }

    #[test]
    fn encodes_against_schema() {
        assert_eq!(one("ldi r1,4").unwrap(), 0x9844);
        assert_eq!(one("LDI R0,3").unwrap(), 0x9803);
        assert_eq!(one("brz r0,-1").unwrap(), 0xC000 | (7 << 6) | 7);
        assert_eq!(one("jmp r5").unwrap(), 0xE000 | (5 << 3));
    }

    #[test]
    fn operand_errors() {
        assert!(matches!(one("ldi r8,1"), Err(AsmError::UnknownOperand { .. })));
        assert!(matches!(one("ldi r1,9"), Err(AsmError::SchemaMismatch { .. })));
        assert!(matches!(one("add r1,r2"), Err(AsmError::SchemaMismatch { .. })));
        assert!(matches!(one("jmp 3"), Err(AsmError::SchemaMismatch { .. })));
        assert!(matches!(one("nop"), Err(AsmError::UnknownMnemonic { .. })));
        assert!(matches!(one("ldi r0,.x"), Err(AsmError::UndefinedSymbol { .. })));
    }

    #[test]
    fn offset_bounds() {
        assert!(one("brn r1,31").is_ok());
        assert!(one("brn r1,-32").is_ok());
        assert_eq!(one("brn r1,32"), Err(AsmError::BranchTooFar { line: 1, offset: 32 }));
        assert_eq!(one("brn r1,-33"), Err(AsmError::BranchTooFar { line: 1, offset: -33 }));
    }

    #[test]
    fn symbolic_branch_is_pc_relative() {
        let symbols = SymbolTable::from([("top".to_string(), 2)]);
        let w = encode_insn(1, 5, "brz r0,.top", &symbols).unwrap();
        assert_eq!(sc16::branch_offset(((w >> 6) & 7) as u8, (w & 7) as u8), -3);
    }
}
