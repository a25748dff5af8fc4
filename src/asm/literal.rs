//! Rewrites `0b`, `0o` and `0x` literals to decimal so later stages only see
//! one number syntax. Comments are left untouched.

pub fn normalize_literals(source: &str) -> String {
    let source = source.replace('\r', "");
    let mut out = String::with_capacity(source.len());
    for (i, line) in source.split('\n').enumerate() {
        if i > 0 {
            out.push('\n');
        }
        let (code, comment) = match line.find("//") {
            Some(p) => line.split_at(p),
            None => (line, ""),
        };
        out.push_str(&rewrite(code));
        out.push_str(comment);
    }
    out
}

fn is_word_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_' || c == '.'
}

fn radix_of(c: char) -> Option<u32> {
    match c {
        'b' | 'B' => Some(2),
        'o' | 'O' => Some(8),
        'x' | 'X' => Some(16),
        _ => None,
    }
}

fn rewrite(code: &str) -> String {
    let chars: Vec<char> = code.chars().collect();
    let mut out = String::with_capacity(code.len());
    let mut i = 0;
    while i < chars.len() {
        let at_boundary = i == 0 || !is_word_char(chars[i - 1]);
        if at_boundary && chars[i] == '0' {
            if let Some(radix) = chars.get(i + 1).copied().and_then(radix_of) {
                let start = i + 2;
                let mut end = start;
                while end < chars.len() && chars[end].is_digit(radix) {
                    end += 1;
                }
                let clean_end = end == chars.len() || !is_word_char(chars[end]);
                if end > start && clean_end {
                    let digits: String = chars[start..end].iter().collect();
                    if let Ok(v) = u32::from_str_radix(&digits, radix) {
                        out.push_str(&v.to_string());
                        i = end;
                        continue;
                    }
                }
            }
        }
        out.push(chars[i]);
        i += 1;
    }
    out
}
