use serde::{Deserialize, Serialize};

use crate::decoder::{Decoded, Decoder, Op};

/// SC16 instruction word layout:
///
/// ```text
///  15      9 8   6 5   3 2   0
/// +---------+-----+-----+-----+
/// |   op    | da  | aa  | ba  |
/// +---------+-----+-----+-----+
/// ```
///
/// Branches reuse `da:ba` as a 6-bit two's-complement offset.
pub const OP_SHIFT: u32 = 9;
pub const DA_SHIFT: u32 = 6;
pub const AA_SHIFT: u32 = 3;
pub const BA_SHIFT: u32 = 0;

pub const OP_MASK: u16 = 0x7F;
pub const REG_MASK: u16 = 0x7;

pub const OFFSET_MIN: i32 = -32;
pub const OFFSET_MAX: i32 = 31;

/// Raw instruction fields, before the opcode is interpreted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Fields {
    pub op: u8,
    pub da: u8,
    pub aa: u8,
    pub ba: u8,
}

/// Packs the four fields into one word. Each field is masked to its width.
pub fn encode(f: Fields) -> u16 {
    ((u16::from(f.op) & OP_MASK) << OP_SHIFT)
        | ((u16::from(f.da) & REG_MASK) << DA_SHIFT)
        | ((u16::from(f.aa) & REG_MASK) << AA_SHIFT)
        | ((u16::from(f.ba) & REG_MASK) << BA_SHIFT)
}

pub fn decode(word: u16) -> Fields {
    Fields {
        op: ((word >> OP_SHIFT) & OP_MASK) as u8,
        da: ((word >> DA_SHIFT) & REG_MASK) as u8,
        aa: ((word >> AA_SHIFT) & REG_MASK) as u8,
        ba: ((word >> BA_SHIFT) & REG_MASK) as u8,
    }
}

/// Rebuilds the signed branch displacement from `da` (high bits) and `ba`.
pub fn branch_offset(da: u8, ba: u8) -> i8 {
    let raw = ((da & 0x7) << 3) | (ba & 0x7);
    // sign-extend from bit 5
    ((raw << 2) as i8) >> 2
}

/// Splits a displacement into `(da, ba)`. Out-of-range values are truncated to 6 bits.
pub fn offset_fields(offset: i32) -> (u8, u8) {
    let bits = (offset as u32 & 0x3F) as u8;
    ((bits >> 3) & 0x7, bits & 0x7)
}

/// Decoder for the SC16 opcode table.
#[derive(Debug, Clone, Copy, Default)]
pub struct Sc16Decoder;

impl Sc16Decoder {
    pub fn new() -> Self {
        Self
    }
}

impl Decoder for Sc16Decoder {
    fn decode(&self, word: u16) -> Option<Decoded> {
        let f = decode(word);
        let op = Op::from_code(f.op)?;
        Some(Decoded {
            op,
            word,
            da: f.da,
            aa: f.aa,
            ba: f.ba,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fields_are_masked() {
        let w = encode(Fields { op: 0xFF, da: 9, aa: 8, ba: 15 });
        assert_eq!(decode(w), Fields { op: 0x7F, da: 1, aa: 0, ba: 7 });
    }

    #[test]
    fn ldi_word_layout() {
        // ldi r1,4
        let w = encode(Fields { op: 0x4C, da: 1, aa: 0, ba: 4 });
        assert_eq!(w, 0x9844);
    }

    #[test]
    fn branch_offset_sign_extends() {
        assert_eq!(branch_offset(0, 0), 0);
        assert_eq!(branch_offset(3, 7), 31);
        assert_eq!(branch_offset(4, 0), -32);
        assert_eq!(branch_offset(7, 7), -1);
        for off in OFFSET_MIN..=OFFSET_MAX {
            let (da, ba) = offset_fields(off);
            assert_eq!(i32::from(branch_offset(da, ba)), off);
        }
    }

    #[test]
    fn unknown_opcode_does_not_decode() {
        let dec = Sc16Decoder::new();
        assert!(dec.decode(encode(Fields { op: 0x03, ..Fields::default() })).is_none());
        assert!(dec.decode(encode(Fields { op: 0x7F, ..Fields::default() })).is_none());
        assert!(dec.decode(0x0000).is_some());
    }
}
