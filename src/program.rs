use serde::{Deserialize, Serialize};
use tracing::warn;

/// Largest program the 16-bit program counter can address.
pub const MAX_WORDS: usize = 0x1_0000;

/// Program memory, read-only while the machine runs.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Program {
    words: Vec<u16>,
}

impl Program {
    pub fn from_words(mut words: Vec<u16>) -> Self {
        if words.len() > MAX_WORDS {
            warn!(len = words.len(), "program truncated to {MAX_WORDS} words");
            words.truncate(MAX_WORDS);
        }
        Self { words }
    }

    /// Loads a hex stream. Anything that is not a hex digit separates words and
    /// every run of four hex digits is one word; leftover digits of a run are dropped.
    pub fn from_hex(text: &str) -> Self {
        let mut words = Vec::new();
        let mut acc = 0u16;
        let mut digits = 0;
        for c in text.chars() {
            match c.to_digit(16) {
                Some(d) => {
                    acc = (acc << 4) | d as u16;
                    digits += 1;
                    if digits == 4 {
                        words.push(acc);
                        acc = 0;
                        digits = 0;
                    }
                }
                None => {
                    acc = 0;
                    digits = 0;
                }
            }
        }
        Self::from_words(words)
    }

    /// Like [`Program::from_hex`], but skips `//` comment lines first, so an
    /// assembler listing can be loaded directly.
    pub fn from_listing(text: &str) -> Self {
        let body: Vec<&str> = text
            .lines()
            .filter(|l| !l.trim_start().starts_with("//"))
            .collect();
        Self::from_hex(&body.join("\n"))
    }

    pub fn words(&self) -> &[u16] {
        &self.words
    }

    pub fn len(&self) -> usize {
        self.words.len()
    }

    pub fn is_empty(&self) -> bool {
        self.words.is_empty()
    }

    pub fn fetch(&self, pc: u16) -> Option<u16> {
        self.words.get(usize::from(pc)).copied()
    }

    /// Concatenated 4-digit uppercase hex words.
    pub fn to_hex(&self) -> String {
        self.words.iter().map(|w| format!("{w:04X}")).collect()
    }
}
