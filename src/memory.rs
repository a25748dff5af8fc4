use anyhow::{bail, Result};
use serde::{Deserialize, Serialize};

/// Number of addressable data words.
pub const DATA_WORDS: usize = 0x1_0000;

/// Word-addressed data port used by `ld`/`st`.
pub trait Bus {
    fn read_u16(&mut self, addr: u16) -> Result<u16>;
    fn write_u16(&mut self, addr: u16, val: u16) -> Result<()>;
}

/// Flat data memory kept as a big-endian byte image: word `n` lives at bytes
/// `2n` (high) and `2n + 1` (low), whatever the host byte order.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DataMemory {
    pub mem: Vec<u8>,
}

impl Default for DataMemory {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for DataMemory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let used = self.mem.iter().filter(|b| **b != 0).count();
        f.debug_struct("DataMemory")
            .field("bytes", &self.mem.len())
            .field("nonzero", &used)
            .finish()
    }
}

impl DataMemory {
    pub fn new() -> Self {
        Self {
            mem: vec![0; DATA_WORDS * 2],
        }
    }

    /// Raw byte image, as a byte-level inspector sees it.
    pub fn bytes(&self) -> &[u8] {
        &self.mem
    }

    pub fn bytes_mut(&mut self) -> &mut [u8] {
        &mut self.mem
    }

    pub fn clear(&mut self) {
        self.mem.fill(0);
    }

    fn load_be_u16(&self, off: usize) -> u16 {
        u16::from_be_bytes([self.mem[off], self.mem[off + 1]])
    }

    fn store_be_u16(&mut self, off: usize, v: u16) {
        self.mem[off..off + 2].copy_from_slice(&v.to_be_bytes());
    }

    pub fn word(&self, addr: u16) -> u16 {
        self.load_be_u16(usize::from(addr) * 2)
    }

    pub fn set_word(&mut self, addr: u16, v: u16) {
        self.store_be_u16(usize::from(addr) * 2, v);
    }

    /// Replaces the contents with a data image.
    ///
    /// `//` lines are comments. `@<hex>` moves the cursor to that word address.
    /// Any other line stores its first two hex byte pairs at the cursor (high
    /// byte first; a missing low byte is stored as zero) and advances it by
    /// one word. Lines without a byte pair are skipped.
    pub fn load_image(&mut self, text: &str) -> Result<()> {
        self.clear();
        let mut cursor = 0usize;
        for (idx, line) in text.lines().enumerate() {
            let line = line.trim();
            if line.starts_with("//") {
                continue;
            }
            if let Some(addr) = line.strip_prefix('@') {
                let Ok(addr) = u16::from_str_radix(addr.trim(), 16) else {
                    bail!("line {}: bad address `{}`", idx + 1, line);
                };
                cursor = usize::from(addr) * 2;
                continue;
            }
            let pairs = byte_pairs(line);
            let Some(&hi) = pairs.first() else {
                continue;
            };
            let lo = pairs.get(1).copied().unwrap_or(0);
            if cursor + 1 >= self.mem.len() {
                bail!("line {}: data image runs past the end of memory", idx + 1);
            }
            self.mem[cursor] = hi;
            self.mem[cursor + 1] = lo;
            cursor += 2;
        }
        Ok(())
    }

    pub fn from_image(text: &str) -> Result<Self> {
        let mut mem = Self::new();
        mem.load_image(text)?;
        Ok(mem)
    }
}

/// Every aligned pair of hex digits inside runs of hex digits.
fn byte_pairs(line: &str) -> Vec<u8> {
    let mut out = Vec::new();
    let mut pending: Option<u8> = None;
    for c in line.chars() {
        match c.to_digit(16) {
            Some(d) => {
                let d = d as u8;
                match pending.take() {
                    Some(hi) => out.push((hi << 4) | d),
                    None => pending = Some(d),
                }
            }
            None => pending = None,
        }
    }
    out
}

impl Bus for DataMemory {
    fn read_u16(&mut self, addr: u16) -> Result<u16> {
        Ok(self.word(addr))
    }
    fn write_u16(&mut self, addr: u16, val: u16) -> Result<()> {
        self.set_word(addr, val);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn words_are_big_endian_bytes() {
        let mut mem = DataMemory::new();
        mem.write_u16(0, 0x1234).unwrap();
        mem.write_u16(0xFFFF, 0xBEEF).unwrap();
        assert_eq!(&mem.bytes()[0..2], &[0x12, 0x34]);
        assert_eq!(&mem.bytes()[0x1FFFE..], &[0xBE, 0xEF]);
        mem.bytes_mut()[3] = 0x7F;
        assert_eq!(mem.read_u16(1).unwrap(), 0x007F);
    }

    #[test]
    fn image_seeks_and_fills() {
        let img = "// header\n1234\n@10\nAB CD\nEF\n@2\n0001\n";
        let mem = DataMemory::from_image(img).unwrap();
        assert_eq!(mem.word(0), 0x1234);
        assert_eq!(mem.word(0x10), 0xABCD);
        assert_eq!(mem.word(0x11), 0xEF00);
        assert_eq!(mem.word(2), 0x0001);
        assert_eq!(mem.word(1), 0);
    }

    #[test]
    fn image_rejects_bad_address() {
        assert!(DataMemory::from_image("@zz\n").is_err());
    }

    #[test]
    fn image_rejects_overflow() {
        assert!(DataMemory::from_image("@FFFF\n0102\n0304\n").is_err());
    }

    #[test]
    fn load_image_clears_previous_contents() {
        let mut mem = DataMemory::new();
        mem.set_word(5, 0x5555);
        mem.load_image("0001").unwrap();
        assert_eq!(mem.word(5), 0);
        assert_eq!(mem.word(0), 1);
    }
}
