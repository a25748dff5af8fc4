use super::encode::split_insn;
use super::{strip_comment, Line, LineKind, SymbolTable};

/// Expanded source for display. Labels become comments and symbolic branch
/// targets are shown as the offset that was encoded.
pub(crate) fn intermediate(lines: &[Line], symbols: &SymbolTable) -> String {
    let mut out = Vec::with_capacity(lines.len());
    let mut pc: i32 = 0;
    for line in lines {
        match &line.kind {
            LineKind::Text(t) => out.push(t.trim().to_string()),
            LineKind::Label(code) => out.push(format!("//{}", code.trim())),
            LineKind::Insn(text) => {
                out.push(branch_with_offset(text, pc, symbols).unwrap_or_else(|| text.trim().to_string()));
                pc += 1;
            }
            // never survive layout
            LineKind::Deferred { .. } => {}
        }
    }
    out.join("\n")
}

fn branch_with_offset(text: &str, pc: i32, symbols: &SymbolTable) -> Option<String> {
    let (mnem, args) = split_insn(strip_comment(text));
    let mnem = mnem.to_ascii_lowercase();
    if mnem != "brz" && mnem != "brn" {
        return None;
    }
    let [reg, target] = args.as_slice() else {
        return None;
    };
    let addr = symbols.get(target.strip_prefix('.')?)?;
    let off = i32::from(*addr) - pc;
    Some(format!("{mnem} {reg},{off} //{}", text.trim()))
}

/// Hex image annotated with the symbol table, one word per line.
pub(crate) fn pretty_hex(hex: &str, symbols: &SymbolTable) -> String {
    let mut out = vec!["// Assembled with sc16-asm".to_string()];
    if symbols.is_empty() {
        out.push("// No symbols used".to_string());
    } else {
        out.push("// Symbols:".to_string());
        for (i, (name, addr)) in symbols.iter().enumerate() {
            out.push(format!("//  {i:>3}: .{name} at {addr:04X}"));
        }
    }
    out.push("@0".to_string());
    let chars: Vec<char> = hex.chars().collect();
    out.extend(chars.chunks(4).map(|c| c.iter().collect::<String>()));
    out.join("\n")
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn pretty_hex_lists_symbols_then_words() {
        let symbols = SymbolTable::from([("end".to_string(), 0x12), ("start".to_string(), 0)]);
        assert_eq!(
            pretty_hex("98039844", &symbols),
            "// Assembled with sc16-asm\n\
             // Symbols:\n\
             //    0: .end at 0012\n\
             //    1: .start at 0000\n\
             @0\n\
             9803\n\
             9844"
        );
        assert_eq!(
            pretty_hex("", &SymbolTable::new()),
            "// Assembled with sc16-asm\n// No symbols used\n@0"
        );
    }

    #[test]
    fn symbolic_branches_show_offsets() {
        let symbols = SymbolTable::from([("top".to_string(), 1)]);
        let lines = vec![
            Line::new(1, LineKind::Insn("inc r0,r0".into())),
            Line::new(2, LineKind::Label(".top:".into())),
            Line::new(3, LineKind::Insn("  dec r1,r1".into())),
            Line::new(4, LineKind::Insn("brz r1, .top // loop".into())),
        ];
        assert_eq!(
            intermediate(&lines, &symbols),
            "inc r0,r0\n//.top:\ndec r1,r1\nbrz r1,-1 //brz r1, .top // loop"
        );
    }
}
