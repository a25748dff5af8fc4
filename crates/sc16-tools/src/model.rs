use anyhow::{Context, Result};
use std::path::Path;

use sc16_rs::{DataMemory, Program, SymbolTable};

/// One symbol as written to and read from JSON.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct SymbolKV {
    pub addr: u16,
    pub name: String,
}

pub fn read_source(path: &Path) -> Result<String> {
    std::fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))
}

/// Loads hex words from a file; assembler listings are accepted as-is.
pub fn load_program(path: &Path) -> Result<Program> {
    let text = read_source(path)?;
    let program = Program::from_listing(&text);
    anyhow::ensure!(!program.is_empty(), "{}: no program words found", path.display());
    Ok(program)
}

pub fn load_data(path: &Path) -> Result<DataMemory> {
    let text = read_source(path)?;
    DataMemory::from_image(&text).with_context(|| format!("loading {}", path.display()))
}

/// Symbols ordered by address, then name.
pub fn symbol_list(symbols: &SymbolTable) -> Vec<SymbolKV> {
    let mut v: Vec<SymbolKV> = symbols
        .iter()
        .map(|(name, addr)| SymbolKV { addr: *addr, name: name.clone() })
        .collect();
    v.sort_by(|a, b| a.addr.cmp(&b.addr).then_with(|| a.name.cmp(&b.name)));
    v
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn loader_reads_listing_files() {
        let cwd = std::env::current_dir().unwrap();
        let path = cwd.join("_test_prog.hex");
        std::fs::write(&path, "// Symbols:\n//    0: .x at 0001\n@0\n9803\n9844\n").unwrap();
        let p = load_program(&path).unwrap();
        assert_eq!(p.words(), &[0x9803, 0x9844]);
        let _ = std::fs::remove_file(&path);
    }

    #[test]
    fn loader_rejects_empty_program() {
        let cwd = std::env::current_dir().unwrap();
        let path = cwd.join("_test_empty.hex");
        std::fs::write(&path, "// nothing\n").unwrap();
        assert!(load_program(&path).is_err());
        let _ = std::fs::remove_file(&path);
    }

    #[test]
    fn data_loader_reads_image() {
        let cwd = std::env::current_dir().unwrap();
        let path = cwd.join("_test_data.img");
        std::fs::write(&path, "@4\nBEEF\n").unwrap();
        let mem = load_data(&path).unwrap();
        assert_eq!(mem.word(4), 0xBEEF);
        let _ = std::fs::remove_file(&path);
    }

    #[test]
    fn symbols_sort_by_address() {
        let table = SymbolTable::from([("b".to_string(), 1), ("a".to_string(), 9), ("c".to_string(), 1)]);
        let names: Vec<_> = symbol_list(&table).into_iter().map(|kv| kv.name).collect();
        assert_eq!(names, vec!["b", "c", "a"]);
    }
}
