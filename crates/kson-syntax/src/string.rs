//! String content transformer (spec §4.4): decodes a quoted string's raw
//! body into its decoded content, while recording enough information to map
//! any offset in the decoded string back to the raw source.

use kson_diagnostics::DiagnosticKind;

/// One escape sequence found while decoding a string body.
///
/// `raw_start`/`raw_len` are byte offsets/lengths into the *raw* body (the
/// text between the quotes, not the whole token); `decoded_len` is the
/// UTF-8 byte length of what that escape produced in the *decoded* string.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EscapeSpan {
    pub raw_start: usize,
    pub raw_len: usize,
    pub decoded_len: usize,
}

/// The result of decoding a quoted string body.
#[derive(Debug, Clone, PartialEq)]
pub struct DecodedString {
    pub decoded: String,
    /// Escape spans in increasing `raw_start` order — monotone, per spec.
    escapes: Vec<EscapeSpan>,
    pub diagnostics: Vec<(DiagnosticKind, usize, usize)>,
}

impl DecodedString {
    /// Map an offset into `decoded` back to the corresponding offset into
    /// the raw body this was decoded from.
    ///
    /// Walks the escape list accumulating how much each escape shifted the
    /// raw stream relative to the decoded stream, stopping once an escape's
    /// decoded-side start is at or past `decoded_offset`.
    pub fn map_offset_to_raw(&self, decoded_offset: usize) -> usize {
        let mut shift: isize = 0;
        for escape in &self.escapes {
            // The decoded-side position where this escape's output begins,
            // given the shift accumulated from escapes before it.
            let decoded_pos = escape.raw_start as isize - shift;
            if decoded_pos < decoded_offset as isize {
                shift += escape.raw_len as isize - escape.decoded_len as isize;
            } else {
                break;
            }
        }
        (decoded_offset as isize + shift).max(0) as usize
    }

    pub fn escapes(&self) -> &[EscapeSpan] {
        &self.escapes
    }
}

/// Decode the raw text between a string's quotes (not including the quotes
/// themselves). Both `\"` and `\'` are recognized regardless of which
/// quote character actually closed the string, per spec §4.4.
pub fn decode(raw_body: &str) -> DecodedString {
    let mut decoded = String::with_capacity(raw_body.len());
    let mut escapes = Vec::new();
    let mut diagnostics = Vec::new();

    let bytes = raw_body.as_bytes();
    let mut i = 0usize;
    while i < bytes.len() {
        let ch = raw_body[i..].chars().next().expect("valid utf-8 boundary");
        if ch != '\\' {
            if (ch as u32) < 0x20 && ch != '\n' && ch != '\r' && ch != '\t' {
                diagnostics.push((DiagnosticKind::StringIllegalControlCharacter, i, ch.len_utf8()));
            }
            decoded.push(ch);
            i += ch.len_utf8();
            continue;
        }

        // `ch` is the backslash; look at what follows it.
        let esc_start = i;
        let after_backslash = i + 1;
        let Some(escaped) = raw_body[after_backslash..].chars().next() else {
            // Trailing lone backslash: treat as a literal backslash.
            decoded.push('\\');
            i += 1;
            continue;
        };

        let mut raw_len = 1 + escaped.len_utf8();
        let simple = match escaped {
            '"' => Some('"'),
            '\'' => Some('\''),
            '\\' => Some('\\'),
            '/' => Some('/'),
            'b' => Some('\u{08}'),
            'f' => Some('\u{0C}'),
            'n' => Some('\n'),
            'r' => Some('\r'),
            't' => Some('\t'),
            _ => None,
        };

        if let Some(c) = simple {
            decoded.push(c);
            escapes.push(EscapeSpan {
                raw_start: esc_start,
                raw_len,
                decoded_len: c.len_utf8(),
            });
            i += raw_len;
            continue;
        }

        if escaped == 'u' {
            let hex_start = after_backslash + 1;
            let hex = raw_body.get(hex_start..hex_start + 4.min(raw_body.len().saturating_sub(hex_start)));
            let hex = hex.filter(|h| h.len() == 4 && h.chars().all(|c| c.is_ascii_hexdigit()));
            let Some(hex) = hex else {
                diagnostics.push((DiagnosticKind::StringBadUnicodeEscape, esc_start, raw_len + 1));
                decoded.push_str(&raw_body[esc_start..(hex_start + 4).min(raw_body.len())]);
                i = (hex_start + 4).min(raw_body.len());
                continue;
            };
            raw_len = hex_start + 4 - esc_start;
            let code = u32::from_str_radix(hex, 16).expect("validated hex digits");

            // Try to combine with an immediately following low surrogate.
            if (0xD800..=0xDBFF).contains(&code) {
                let next_escape_prefix = &raw_body[esc_start + raw_len..];
                if let Some(rest) = next_escape_prefix.strip_prefix("\\u")
                    && rest.len() >= 4
                    && rest[..4].chars().all(|c| c.is_ascii_hexdigit())
                {
                    let low = u32::from_str_radix(&rest[..4], 16).expect("validated hex digits");
                    if (0xDC00..=0xDFFF).contains(&low) {
                        let combined =
                            0x10000 + ((code - 0xD800) << 10) + (low - 0xDC00);
                        if let Some(c) = char::from_u32(combined) {
                            let total_raw = raw_len + 6;
                            decoded.push(c);
                            escapes.push(EscapeSpan {
                                raw_start: esc_start,
                                raw_len: total_raw,
                                decoded_len: c.len_utf8(),
                            });
                            i += total_raw;
                            continue;
                        }
                    }
                }
            }

            match char::from_u32(code) {
                Some(c) => {
                    decoded.push(c);
                    escapes.push(EscapeSpan {
                        raw_start: esc_start,
                        raw_len,
                        decoded_len: c.len_utf8(),
                    });
                }
                None => {
                    // Lone surrogate half: not representable as a `char`;
                    // substitute the replacement character but still map
                    // the offset so downstream tooling doesn't panic.
                    let c = char::REPLACEMENT_CHARACTER;
                    decoded.push(c);
                    escapes.push(EscapeSpan {
                        raw_start: esc_start,
                        raw_len,
                        decoded_len: c.len_utf8(),
                    });
                }
            }
            i += raw_len;
            continue;
        }

        // Unrecognized escape: keep both characters literally and diagnose.
        diagnostics.push((DiagnosticKind::StringBadEscape(escaped), esc_start, raw_len));
        decoded.push('\\');
        decoded.push(escaped);
        escapes.push(EscapeSpan {
            raw_start: esc_start,
            raw_len,
            decoded_len: 1 + escaped.len_utf8(),
        });
        i += raw_len;
    }

    DecodedString {
        decoded,
        escapes,
        diagnostics,
    }
}

/// Re-encode a decoded string into a quoted-string raw body, escaping
/// control characters and the given quote character. Used by the formatter
/// and JSON/YAML renderers (which have their own, slightly different
/// escaping policies layered on top of this base).
pub fn encode_basic(decoded: &str, quote: char) -> String {
    let mut out = String::with_capacity(decoded.len());
    for ch in decoded.chars() {
        match ch {
            c if c == quote => {
                out.push('\\');
                out.push(c);
            }
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            '\u{08}' => out.push_str("\\b"),
            '\u{0C}' => out.push_str("\\f"),
            c if (c as u32) < 0x20 => {
                out.push_str(&format!("\\u{:04x}", c as u32));
            }
            c => out.push(c),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decodes_simple_escapes() {
        let d = decode(r#"a\nb"#);
        assert_eq!(d.decoded, "a\nb");
    }

    #[test]
    fn raw_newline_preserved_verbatim() {
        let d = decode("a\nb");
        assert_eq!(d.decoded, "a\nb");
        assert!(d.escapes().is_empty());
    }

    #[test]
    fn encode_decode_roundtrip() {
        let original = "hello \"world\"\n\ttab";
        let encoded = encode_basic(original, '"');
        let decoded = decode(&encoded);
        assert_eq!(decoded.decoded, original);
    }

    #[test]
    fn surrogate_pair_decodes_to_single_char() {
        // U+1F600 GRINNING FACE = D83D DE00
        let d = decode(r"😀");
        assert_eq!(d.decoded.chars().count(), 1);
        assert_eq!(d.decoded, "\u{1F600}");
    }

    #[test]
    fn offset_map_accounts_for_escape_shrinkage() {
        // `k: "a\nb"` body is `a\nb` (raw len 4), decoded is `a`,`\n`,`b` (len 3).
        let d = decode(r"a\nb");
        assert_eq!(d.decoded, "a\nb");
        // decoded offset 2 is right after the real \n char, i.e. at 'b'.
        // raw offset of 'b' is 3 (a=0, \=1, n=2, b=3).
        assert_eq!(d.map_offset_to_raw(2), 3);
    }

    #[test]
    fn bad_escape_is_diagnosed_and_kept_literal() {
        let d = decode(r"\q");
        assert_eq!(d.decoded, "\\q");
        assert_eq!(d.diagnostics.len(), 1);
    }

    #[test]
    fn short_unicode_escape_is_diagnosed() {
        let d = decode(r"\u12");
        assert_eq!(d.diagnostics.len(), 1);
        assert!(matches!(
            d.diagnostics[0].0,
            DiagnosticKind::StringBadUnicodeEscape
        ));
    }

    #[test]
    fn illegal_control_character_is_diagnosed_but_kept() {
        let d = decode("a\u{0001}b");
        assert_eq!(d.decoded, "a\u{0001}b");
        assert_eq!(d.diagnostics.len(), 1);
    }

    proptest::proptest! {
        /// Encoding then decoding any string returns the original: the
        /// escape-span bookkeeping that made this possible is exercised
        /// here, not just hand-picked samples.
        #[test]
        fn encode_decode_roundtrips_for_any_string(s in ".*") {
            let encoded = encode_basic(&s, '"');
            let decoded = decode(&encoded);
            proptest::prop_assert_eq!(decoded.decoded, s);
        }

        /// The offset map is total: walking it to the end of the decoded
        /// string always lands exactly at the end of the raw body, since
        /// every byte of shrinkage/growth the escapes introduced is
        /// accounted for by the time the decoded string is exhausted.
        #[test]
        fn offset_map_accounts_for_every_escape(s in ".*") {
            let raw = encode_basic(&s, '"');
            let d = decode(&raw);
            proptest::prop_assert_eq!(d.map_offset_to_raw(d.decoded.len()), raw.len());
        }
    }
}
