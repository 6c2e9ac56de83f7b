//! Source locations and the closed diagnostic catalogue shared by every
//! stage of the KSON engine (lexer, parser, string transformer, schema
//! compiler, schema validator).
//!
//! Diagnostics are data, never exceptions: every stage accumulates a
//! `Vec<Diagnostic>` alongside whatever partial artifact it produced.

pub mod diagnostic;
pub mod location;
pub mod report;

pub use diagnostic::{Diagnostic, DiagnosticKind, Severity, has_errors};
pub use location::{Location, Position};
pub use report::SourceDiagnostic;

/// Convert a byte offset into a 0-based `(line, column)` pair, with `column`
/// counted in UTF-16 code units per the KSON location model.
///
/// Returns `(0, 0)` for an offset at or before the start of `content`.
pub fn offset_to_line_col(content: &str, offset: usize) -> (u32, u32) {
    let offset = offset.min(content.len());
    let mut line = 0u32;
    let mut column = 0u32;
    for (i, ch) in content.char_indices() {
        if i >= offset {
            break;
        }
        if ch == '\n' {
            line += 1;
            column = 0;
        } else {
            column += ch.len_utf16() as u32;
        }
    }
    (line, column)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn offset_zero_is_origin() {
        assert_eq!(offset_to_line_col("hello", 0), (0, 0));
    }

    #[test]
    fn offset_within_first_line() {
        assert_eq!(offset_to_line_col("hello world", 6), (0, 6));
    }

    #[test]
    fn offset_after_newline_resets_column() {
        assert_eq!(offset_to_line_col("ab\ncd\nef", 3), (1, 0));
        assert_eq!(offset_to_line_col("ab\ncd\nef", 6), (2, 0));
    }

    #[test]
    fn column_counts_utf16_units() {
        // U+1F600 (grinning face) is one UTF-16 *code unit* short of two surrogate
        // units; astral characters count as 2 columns, matching editor conventions.
        let s = "a😀b";
        let after_emoji = "a".len() + "😀".len();
        assert_eq!(offset_to_line_col(s, after_emoji), (0, 3));
    }

    #[test]
    fn offset_past_end_clamps() {
        assert_eq!(offset_to_line_col("ab\ncd", 100), (1, 2));
    }
}
