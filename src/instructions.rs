use crate::decoder::Op;

/// What an operand position accepts in assembly source.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Kind {
    /// `r0`..`r7`
    Reg,
    /// 3-bit unsigned immediate
    Imm,
    /// 6-bit signed pc-relative displacement
    Off,
}

/// Instruction field an operand is packed into.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Slot {
    Da,
    Aa,
    Ba,
    /// `da:ba` together
    DaBa,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Operand {
    pub kind: Kind,
    pub slot: Slot,
}

/// How an instruction rewrites the flags.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlagRule {
    /// N and Z from the written value, V and C cleared
    Result,
    /// all four cleared
    Clear,
}

#[derive(Debug, Clone, Copy)]
pub struct InstrDesc {
    pub op: Op,
    pub code: u8,
    pub mnemonic: &'static str,
    pub operands: &'static [Operand],
    pub flags: FlagRule,
}

const fn opnd(kind: Kind, slot: Slot) -> Operand {
    Operand { kind, slot }
}

const RD: Operand = opnd(Kind::Reg, Slot::Da);
const RA: Operand = opnd(Kind::Reg, Slot::Aa);
const RB: Operand = opnd(Kind::Reg, Slot::Ba);
const IMM: Operand = opnd(Kind::Imm, Slot::Ba);
const OFF: Operand = opnd(Kind::Off, Slot::DaBa);

const fn desc(
    op: Op,
    code: u8,
    mnemonic: &'static str,
    operands: &'static [Operand],
    flags: FlagRule,
) -> InstrDesc {
    InstrDesc {
        op,
        code,
        mnemonic,
        operands,
        flags,
    }
}

/// Shared by the assembler, the decoder and the disassembler. Indexed by `Op as usize`.
pub static TABLE: [InstrDesc; Op::COUNT] = [
    desc(Op::Mova, 0x00, "mova", &[RD, RA], FlagRule::Result),
    desc(Op::Inc, 0x01, "inc", &[RD, RA], FlagRule::Result),
    desc(Op::Add, 0x02, "add", &[RD, RA, RB], FlagRule::Result),
    desc(Op::Sub, 0x05, "sub", &[RD, RA, RB], FlagRule::Result),
    desc(Op::Dec, 0x06, "dec", &[RD, RA], FlagRule::Result),
    desc(Op::And, 0x08, "and", &[RD, RA, RB], FlagRule::Result),
    desc(Op::Or, 0x09, "or", &[RD, RA, RB], FlagRule::Result),
    desc(Op::Xor, 0x0A, "xor", &[RD, RA, RB], FlagRule::Result),
    desc(Op::Not, 0x0B, "not", &[RD, RA], FlagRule::Result),
    desc(Op::Movb, 0x0C, "movb", &[RD, RB], FlagRule::Result),
    desc(Op::Shr, 0x0D, "shr", &[RD, RB], FlagRule::Clear),
    desc(Op::Shl, 0x0E, "shl", &[RD, RB], FlagRule::Clear),
    desc(Op::Ld, 0x10, "ld", &[RD, RA], FlagRule::Clear),
    desc(Op::St, 0x20, "st", &[RA, RB], FlagRule::Clear),
    desc(Op::Adi, 0x42, "adi", &[RD, RA, IMM], FlagRule::Result),
    desc(Op::Ldi, 0x4C, "ldi", &[RD, IMM], FlagRule::Clear),
    desc(Op::Brz, 0x60, "brz", &[RA, OFF], FlagRule::Clear),
    desc(Op::Brn, 0x61, "brn", &[RA, OFF], FlagRule::Clear),
    desc(Op::Jmp, 0x70, "jmp", &[RA], FlagRule::Clear),
];

/// Case-insensitive mnemonic lookup.
pub fn lookup(mnemonic: &str) -> Option<&'static InstrDesc> {
    TABLE
        .iter()
        .find(|d| d.mnemonic.eq_ignore_ascii_case(mnemonic))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn table_is_indexed_by_op() {
        for (i, d) in TABLE.iter().enumerate() {
            assert_eq!(d.op as usize, i, "{} out of place", d.mnemonic);
            assert_eq!(d.op.desc().mnemonic, d.mnemonic);
        }
    }

    #[test]
    fn codes_are_unique_and_fit_seven_bits() {
        for d in &TABLE {
            assert!(d.code <= 0x7F);
            assert_eq!(Op::from_code(d.code), Some(d.op));
        }
    }

    #[test]
    fn lookup_ignores_case() {
        assert_eq!(lookup("ADD").map(|d| d.op), Some(Op::Add));
        assert_eq!(lookup("Ldi").map(|d| d.op), Some(Op::Ldi));
        assert!(lookup("nop").is_none());
    }
}
