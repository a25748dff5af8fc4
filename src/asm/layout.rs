use std::collections::btree_map::Entry;

use tracing::trace;

use super::macros::{sldi, MACRO_END};
use super::{is_ident, AsmError, Deferred, Line, LineKind, SymbolTable};

/// Words addressable by the program counter.
const ADDR_SPACE: usize = 0x1_0000;

/// Address-resolved lines: no [`LineKind::Deferred`] left, every label bound.
#[derive(Debug)]
pub(crate) struct Layout {
    pub lines: Vec<Line>,
    pub symbols: SymbolTable,
}

/// `.name:` → `name`.
pub(crate) fn label_name(code: &str) -> Option<&str> {
    let name = code.strip_prefix('.')?.strip_suffix(':')?;
    is_ident(name).then_some(name)
}

pub(crate) fn layout(lines: &[Line]) -> Result<Layout, AsmError> {
    for line in lines {
        if let LineKind::Label(code) = &line.kind {
            if label_name(code).is_none() {
                return Err(AsmError::InvalidLabel {
                    line: line.src,
                    label: code.clone(),
                });
            }
        }
    }

    let deferred = lines
        .iter()
        .filter(|l| matches!(l.kind, LineKind::Deferred { .. }))
        .count();
    let mut sizes = vec![1usize; deferred];

    // Slots only grow and are bounded by the longest SLDI expansion, so this
    // settles after a handful of rounds.
    let mut round = 0;
    let (symbols, values) = loop {
        round += 1;
        let symbols = assign(lines, &sizes)?;
        let values = resolve(lines, &sizes, &symbols)?;

        let mut grown = false;
        for (i, (reg, value)) in values.iter().enumerate() {
            let need = sldi(*reg, *value).len();
            if need > sizes[i] {
                sizes[i] = need;
                grown = true;
            }
        }
        trace!(round, slots = deferred, grown, "layout relaxation");
        if !grown {
            break (symbols, values);
        }
    };

    let mut out = Vec::with_capacity(lines.len());
    let mut slot = 0;
    for line in lines {
        let LineKind::Deferred { reg, target } = &line.kind else {
            out.push(line.clone());
            continue;
        };
        let (_, value) = values[slot];
        let body = sldi(*reg, value);
        let marker = match target {
            Deferred::Symbol(name) => format!("//%M SLDI r{reg},.{name}"),
            Deferred::ReturnAddress { .. } => format!("//%M PLDI r{reg},{value}"),
        };
        out.push(Line::new(line.src, LineKind::Text(marker)));
        for _ in body.len()..sizes[slot] {
            out.push(Line::new(line.src, LineKind::Insn(format!("mova r{reg},r{reg}"))));
        }
        out.extend(body.into_iter().map(|s| Line::new(line.src, LineKind::Insn(s))));
        out.push(Line::new(line.src, LineKind::Text(MACRO_END.to_string())));
        slot += 1;
    }

    Ok(Layout { lines: out, symbols })
}

/// Binds every label for the given slot sizes.
fn assign(lines: &[Line], sizes: &[usize]) -> Result<SymbolTable, AsmError> {
    let mut symbols = SymbolTable::new();
    let mut pc = 0usize;
    let mut slot = 0;
    for line in lines {
        match &line.kind {
            LineKind::Text(_) => {}
            LineKind::Label(code) => {
                let name = label_name(code).unwrap_or_default();
                let addr = u16::try_from(pc)
                    .map_err(|_| AsmError::ProgramTooLarge { line: line.src })?;
                match symbols.entry(name.to_string()) {
                    Entry::Occupied(_) => {
                        return Err(AsmError::DuplicateSymbol {
                            line: line.src,
                            name: name.to_string(),
                        })
                    }
                    Entry::Vacant(v) => {
                        v.insert(addr);
                    }
                }
            }
            LineKind::Insn(_) => pc += 1,
            LineKind::Deferred { .. } => {
                pc += sizes[slot];
                slot += 1;
            }
        }
        if pc > ADDR_SPACE {
            return Err(AsmError::ProgramTooLarge { line: line.src });
        }
    }
    Ok(symbols)
}

/// Value each deferred load must produce, in line order, as `(reg, value)`.
fn resolve(
    lines: &[Line],
    sizes: &[usize],
    symbols: &SymbolTable,
) -> Result<Vec<(u8, u16)>, AsmError> {
    let mut values = Vec::with_capacity(sizes.len());
    let mut pc = 0usize;
    for line in lines {
        match &line.kind {
            LineKind::Insn(_) => pc += 1,
            LineKind::Deferred { reg, target } => {
                let size = sizes[values.len()];
                let value = match target {
                    Deferred::Symbol(name) => {
                        *symbols.get(name).ok_or_else(|| AsmError::UndefinedSymbol {
                            line: line.src,
                            name: name.clone(),
                        })?
                    }
                    Deferred::ReturnAddress { tail } => u16::try_from(pc + size + tail)
                        .map_err(|_| AsmError::ProgramTooLarge { line: line.src })?,
                };
                values.push((*reg, value));
                pc += size;
            }
            LineKind::Text(_) | LineKind::Label(_) => {}
        }
    }
    Ok(values)
}

#[cfg(test)]
mod tests {
    use super::super::macros::expand;
    use super::*;

    fn insn_count(lines: &[Line]) -> usize {
        lines
            .iter()
            .filter(|l| matches!(l.kind, LineKind::Insn(_)))
            .count()
    }

    #[test]
    fn labels_take_the_next_address() {
        let laid = layout(&expand(".a:\ninc r0,r0\n.b:\n// note\ninc r1,r1\n.c:").unwrap()).unwrap();
        assert_eq!(laid.symbols["a"], 0);
        assert_eq!(laid.symbols["b"], 1);
        assert_eq!(laid.symbols["c"], 2);
    }

    #[test]
    fn label_syntax_is_strict() {
        for bad in [".1a:", ".a", ".a: inc r0,r0", ".a-b:"] {
            let err = layout(&expand(bad).unwrap()).unwrap_err();
            assert!(matches!(err, AsmError::InvalidLabel { line: 1, .. }), "{bad}: {err}");
        }
    }

    #[test]
    fn duplicate_labels_fail_on_second_definition() {
        let err = layout(&expand(".x:\ninc r0,r0\n.x:").unwrap()).unwrap_err();
        assert_eq!(err, AsmError::DuplicateSymbol { line: 3, name: "x".into() });
    }

    #[test]
    fn forward_symbolic_load_is_sized_to_fit() {
        // the target moves as the load grows; the final slot must still hold it
        let mut src = String::from("%SLDI r0,.far\n");
        for _ in 0..20 {
            src.push_str("inc r1,r1\n");
        }
        src.push_str(".far:\n");
        let laid = layout(&expand(&src).unwrap()).unwrap();
        let far = laid.symbols["far"];
        assert_eq!(usize::from(far), insn_count(&laid.lines));
        let load = insn_count(&laid.lines) - 20;
        assert!(load >= sldi(0, far).len());
    }

    #[test]
    fn return_address_follows_call_expansion() {
        let laid = layout(&expand("%CALL r0\n.after:").unwrap()).unwrap();
        let after = laid.symbols["after"];
        let marker = laid
            .lines
            .iter()
            .find_map(|l| match &l.kind {
                LineKind::Text(t) if t.starts_with("//%M PLDI") => Some(t.clone()),
                _ => None,
            })
            .unwrap();
        assert_eq!(marker, format!("//%M PLDI r6,{after}"));
    }

    #[test]
    fn undefined_symbolic_load_fails() {
        let err = layout(&expand("inc r0,r0\n%SLDI r0,.nowhere").unwrap()).unwrap_err();
        assert_eq!(err, AsmError::UndefinedSymbol { line: 2, name: "nowhere".into() });
    }

    #[test]
    fn oversized_program_is_rejected() {
        let src = "inc r0,r0\n".repeat(ADDR_SPACE + 1);
        let err = layout(&expand(&src).unwrap()).unwrap_err();
        assert_eq!(err, AsmError::ProgramTooLarge { line: ADDR_SPACE + 1 });
    }
}
