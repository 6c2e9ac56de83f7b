//! Normalize ECMA 262-flavored regex patterns (the dialect Draft-7 `pattern`
//! is written against) into something Rust's `regex` crate accepts.
//!
//! Grounded on the teacher's `jsonschema_migrate::regex::normalize_ecma_regex`:
//! the same two incompatibilities show up in Draft-7 schemas pulled from real
//! catalogs, so the fix is reused wholesale rather than re-derived.

/// Escape bare, non-quantifier `{`/`}` and expand `\d` inside character
/// classes to `0-9`, so the result parses with `regex::Regex`.
pub fn normalize_ecma_regex(pattern: &str) -> String {
    let b = pattern.as_bytes();
    let valid_braces = find_valid_quantifier_braces(b);
    let mut out = Vec::with_capacity(b.len() + 16);
    let mut i = 0;
    let mut in_class = false;

    while i < b.len() {
        if b[i] == b'\\' && i + 1 < b.len() {
            let next = b[i + 1];
            if in_class && next == b'd' {
                out.extend_from_slice(b"0-9");
                i += 2;
                continue;
            }
            out.push(b[i]);
            out.push(next);
            i += 2;
            continue;
        }

        if b[i] == b'[' && !in_class {
            in_class = true;
            out.push(b'[');
            i += 1;
            if i < b.len() && b[i] == b'^' {
                out.push(b'^');
                i += 1;
            }
            if i < b.len() && b[i] == b']' {
                out.push(b']');
                i += 1;
            }
            continue;
        }
        if b[i] == b']' && in_class {
            in_class = false;
            out.push(b']');
            i += 1;
            continue;
        }
        if in_class {
            out.push(b[i]);
            i += 1;
            continue;
        }

        if b[i] == b'{' && !valid_braces[i] {
            out.extend_from_slice(b"\\{");
            i += 1;
            continue;
        }
        if b[i] == b'}' && !valid_braces[i] {
            out.extend_from_slice(b"\\}");
            i += 1;
            continue;
        }

        out.push(b[i]);
        i += 1;
    }

    String::from_utf8(out).expect("normalization preserves UTF-8 (ASCII-only rewrites)")
}

fn find_valid_quantifier_braces(b: &[u8]) -> Vec<bool> {
    let mut valid = vec![false; b.len()];
    let mut i = 0;
    let mut in_class = false;

    while i < b.len() {
        if b[i] == b'\\' && i + 1 < b.len() {
            i += 2;
            continue;
        }
        if b[i] == b'[' && !in_class {
            in_class = true;
            i += 1;
            continue;
        }
        if b[i] == b']' && in_class {
            in_class = false;
            i += 1;
            continue;
        }
        if b[i] == b'{' && !in_class && let Some(end) = parse_quantifier(b, i) {
            valid[i] = true;
            valid[end] = true;
            i = end + 1;
            continue;
        }
        i += 1;
    }

    valid
}

fn parse_quantifier(b: &[u8], start: usize) -> Option<usize> {
    let mut i = start + 1;
    let n_start = i;
    while i < b.len() && b[i].is_ascii_digit() {
        i += 1;
    }
    if i == n_start || i >= b.len() {
        return None;
    }
    if b[i] == b'}' {
        return Some(i);
    }
    if b[i] != b',' {
        return None;
    }
    i += 1;
    if i >= b.len() {
        return None;
    }
    if b[i] == b'}' {
        return Some(i);
    }
    let n_start = i;
    while i < b.len() && b[i].is_ascii_digit() {
        i += 1;
    }
    if i == n_start || i >= b.len() {
        return None;
    }
    if b[i] == b'}' { Some(i) } else { None }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bare_braces_escaped() {
        assert_eq!(normalize_ecma_regex(r"^{?[a-z]+}?$"), r"^\{?[a-z]+\}?$");
    }

    #[test]
    fn valid_quantifier_preserved() {
        assert_eq!(normalize_ecma_regex(r"^[0-9a-f]{40}$"), r"^[0-9a-f]{40}$");
    }

    #[test]
    fn backslash_d_expanded_in_class() {
        assert_eq!(normalize_ecma_regex(r"[a-z\d-\.]"), r"[a-z0-9-\.]");
    }

    #[test]
    fn backslash_d_preserved_outside_class() {
        assert_eq!(normalize_ecma_regex(r"^\d+$"), r"^\d+$");
    }
}
