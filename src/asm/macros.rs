use crate::cpu::{LINK_REG, STACK_REG};

use super::{is_ident, parse_reg, strip_comment, AsmError, Deferred, Line, LineKind};

pub(crate) const MACRO_END: &str = "//%ENDM";

/// Instructions that leave `value` in `r{reg}` using only 3-bit immediates.
pub fn sldi(reg: u8, value: u16) -> Vec<String> {
    let r = format!("r{reg}");
    match value {
        0 => return vec![format!("xor {r},{r},{r}")],
        0xFFFF => return vec![format!("xor {r},{r},{r}"), format!("not {r},{r}")],
        1..=7 => return vec![format!("ldi {r},{value}")],
        _ => {}
    }

    // bits 15..1 in 3-bit windows, leading empty windows dropped
    let windows: Vec<u16> = [13, 10, 7, 4, 1]
        .iter()
        .map(|shift| (value >> shift) & 0x7)
        .skip_while(|w| *w == 0)
        .collect();

    let mut out = Vec::new();
    for (i, w) in windows.iter().enumerate() {
        if i == 0 {
            out.push(format!("ldi {r},{w}"));
        } else {
            for _ in 0..3 {
                out.push(format!("shl {r},{r}"));
            }
            if *w > 0 {
                out.push(format!("adi {r},{r},{w}"));
            }
        }
    }
    out.push(format!("shl {r},{r}"));
    if value & 1 == 1 {
        out.push(format!("inc {r},{r}"));
    }
    out
}

/// Splits source into logical lines, expanding `%` macros. Loads whose value
/// depends on addresses are left as [`LineKind::Deferred`].
pub(crate) fn expand(source: &str) -> Result<Vec<Line>, AsmError> {
    let mut lines = Vec::new();
    for (idx, raw) in source.lines().enumerate() {
        let src = idx + 1;
        let text = raw.trim();
        let code = strip_comment(text);
        if code.is_empty() {
            lines.push(Line::new(src, LineKind::Text(text.to_string())));
        } else if let Some(body) = code.strip_prefix('%') {
            expand_macro(src, body, &mut lines)?;
        } else if code.starts_with('.') {
            lines.push(Line::new(src, LineKind::Label(code.to_string())));
        } else {
            lines.push(Line::new(src, LineKind::Insn(text.to_string())));
        }
    }
    Ok(lines)
}

fn expand_macro(src: usize, body: &str, out: &mut Vec<Line>) -> Result<(), AsmError> {
    let bad = || AsmError::BadMacro {
        line: src,
        text: format!("%{body}"),
    };
    let (name, args) = match body.split_once(char::is_whitespace) {
        Some((name, args)) => (name, args.trim()),
        None => (body, ""),
    };
    let text = |s: String| Line::new(src, LineKind::Text(s));
    let insn = |s: String| Line::new(src, LineKind::Insn(s));

    match name.to_ascii_uppercase().as_str() {
        "SLDI" => {
            let (reg, value) = args.split_once(',').ok_or_else(bad)?;
            let reg = parse_reg(reg.trim()).ok_or_else(bad)?;
            let value = value.trim();
            if let Some(sym) = value.strip_prefix('.') {
                if !is_ident(sym) {
                    return Err(bad());
                }
                out.push(Line::new(
                    src,
                    LineKind::Deferred {
                        reg,
                        target: Deferred::Symbol(sym.to_string()),
                    },
                ));
                return Ok(());
            }
            let wide: u32 = value.parse().map_err(|_| bad())?;
            let value = u16::try_from(wide).map_err(|_| AsmError::ValueOutOfRange {
                line: src,
                value: value.to_string(),
            })?;
            out.push(text(format!("//%M SLDI r{reg},{value}")));
            out.extend(sldi(reg, value).into_iter().map(insn));
            out.push(text(MACRO_END.to_string()));
        }
        "ISTK" => {
            if !args.is_empty() {
                return Err(bad());
            }
            out.push(text("//%M ISTK".to_string()));
            out.push(insn(format!("xor r{STACK_REG},r{STACK_REG},r{STACK_REG}")));
            out.push(text(MACRO_END.to_string()));
        }
        "CALL" => {
            let target = parse_reg(args).ok_or_else(bad)?;
            out.push(text(format!("//%M CALL r{target}")));
            out.push(Line::new(
                src,
                LineKind::Deferred {
                    reg: LINK_REG,
                    target: Deferred::ReturnAddress { tail: 3 },
                },
            ));
            out.push(insn(format!("inc r{STACK_REG},r{STACK_REG}")));
            out.push(insn(format!("st r{STACK_REG},r{LINK_REG}")));
            out.push(insn(format!("jmp r{target}")));
            out.push(text(MACRO_END.to_string()));
        }
        "RET" => {
            if !args.is_empty() {
                return Err(bad());
            }
            out.push(text("//%M RET".to_string()));
            out.push(insn(format!("ld r{LINK_REG},r{STACK_REG}")));
            out.push(insn(format!("dec r{STACK_REG},r{STACK_REG}")));
            out.push(insn(format!("jmp r{LINK_REG}")));
            out.push(text(MACRO_END.to_string()));
        }
        _ => return Err(bad()),
    }
    Ok(())
}
