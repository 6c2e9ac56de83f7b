//! Embed-block content codec (spec §4.5): escaping/unescaping of interior
//! delimiter runs and minimum-indent computation/stripping for the raw text
//! carried inside `%%…%%` / `$$…$$` fences.

/// The delimiter character an embed block was opened and closed with.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EmbedDelim {
    Percent,
    Dollar,
}

impl EmbedDelim {
    pub fn char(self) -> char {
        match self {
            EmbedDelim::Percent => '%',
            EmbedDelim::Dollar => '$',
        }
    }
}

/// Escape any line-leading run of `delim` repeated `n` or more times by
/// prefixing it with one backslash, so the run can never be mistaken for a
/// closing delimiter when the content is re-embedded at fence length `n`.
///
/// Per spec §4.5/SPEC_FULL §5, only runs at the very start of a line are
/// candidates for a closer, so only those are escaped; a run in the middle
/// of a line is left untouched. The delimiter run is looked for *after* any
/// backslashes the line already starts with, not at the very first
/// character: a line already starting with its own literal backslash(es)
/// must still be protected if what follows is a long-enough delimiter run,
/// otherwise [`unescape`] would mistake that pre-existing backslash for an
/// escape marker and strip it, corrupting content that never needed
/// escaping in the first place.
pub fn escape(content: &str, delim: char, n: usize) -> String {
    let mut out = String::with_capacity(content.len());
    for line in split_lines_keep_ends(content) {
        let (body, ending) = split_line_ending(line);
        let leading_backslashes = body.chars().take_while(|&c| c == '\\').count();
        let rest = &body[leading_backslashes..];
        let run_len = rest.chars().take_while(|&c| c == delim).count();
        if run_len >= n {
            out.push('\\');
        }
        out.push_str(body);
        out.push_str(ending);
    }
    out
}

/// Reverse of [`escape`]: remove exactly one leading backslash from any
/// line whose backslashes are followed by a run of `delim` repeated `n` or
/// more times. Counts *all* leading backslashes (not just one) so a line
/// with its own literal backslash(es) ahead of the run is only ever
/// relieved of the single backslash [`escape`] added.
pub fn unescape(content: &str, delim: char, n: usize) -> String {
    let mut out = String::with_capacity(content.len());
    for line in split_lines_keep_ends(content) {
        let (body, ending) = split_line_ending(line);
        let leading_backslashes = body.chars().take_while(|&c| c == '\\').count();
        if leading_backslashes >= 1 {
            let rest = &body[leading_backslashes..];
            let run_len = rest.chars().take_while(|&c| c == delim).count();
            if run_len >= n {
                out.push_str(&body[1..]);
                out.push_str(ending);
                continue;
            }
        }
        out.push_str(body);
        out.push_str(ending);
    }
    out
}

/// The smallest leading-whitespace run over non-blank lines of `content`.
/// A block whose content is entirely blank lines has a minimum indent of 0.
pub fn minimum_indent(content: &str) -> usize {
    content
        .lines()
        .filter(|line| !line.trim().is_empty())
        .map(|line| line.len() - line.trim_start_matches([' ', '\t']).len())
        .min()
        .unwrap_or(0)
}

/// Strip `indent` columns of leading whitespace from every line that has
/// that much (shorter, blank lines are left as-is).
pub fn strip_indent(content: &str, indent: usize) -> String {
    if indent == 0 {
        return content.to_string();
    }
    let mut out = String::with_capacity(content.len());
    for (i, line) in content.split('\n').enumerate() {
        if i > 0 {
            out.push('\n');
        }
        let leading = line.len() - line.trim_start_matches([' ', '\t']).len();
        let drop = leading.min(indent);
        out.push_str(&line[drop..]);
    }
    out
}

/// Re-apply `indent` columns of leading whitespace to every non-blank line.
pub fn restore_indent(content: &str, indent: usize) -> String {
    if indent == 0 {
        return content.to_string();
    }
    let pad = " ".repeat(indent);
    let mut out = String::with_capacity(content.len() + indent * content.lines().count());
    for (i, line) in content.split('\n').enumerate() {
        if i > 0 {
            out.push('\n');
        }
        if line.is_empty() {
            continue;
        }
        out.push_str(&pad);
        out.push_str(line);
    }
    out
}

/// Split `s` into lines, each slice retaining its trailing `\n` (or `\r\n`)
/// if present, so concatenating all slices reproduces `s` exactly.
fn split_lines_keep_ends(s: &str) -> impl Iterator<Item = &str> {
    let mut rest = s;
    std::iter::from_fn(move || {
        if rest.is_empty() {
            return None;
        }
        match rest.find('\n') {
            Some(idx) => {
                let (line, tail) = rest.split_at(idx + 1);
                rest = tail;
                Some(line)
            }
            None => {
                let line = rest;
                rest = "";
                Some(line)
            }
        }
    })
}

/// Split a line-with-ending into `(body, ending)` where `ending` is `"\n"`,
/// `"\r\n"`, or `""`.
fn split_line_ending(line: &str) -> (&str, &str) {
    if let Some(body) = line.strip_suffix("\r\n") {
        (body, &line[body.len()..])
    } else if let Some(body) = line.strip_suffix('\n') {
        (body, &line[body.len()..])
    } else {
        (line, "")
    }
}

/// The longest run of `delim` found anywhere in `content`, used by the
/// formatter to pick a fence length long enough to round-trip (spec §4.6).
pub fn longest_run(content: &str, delim: char) -> usize {
    let mut best = 0usize;
    let mut current = 0usize;
    for ch in content.chars() {
        if ch == delim {
            current += 1;
            best = best.max(current);
        } else {
            current = 0;
        }
    }
    best
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn escape_unescape_roundtrip_for_arbitrary_content() {
        let samples = ["plain text", "%%\nnested %%% run\n", "no delim here at all", ""];
        for s in samples {
            let escaped = escape(s, '%', 2);
            assert_eq!(unescape(&escaped, '%', 2), s);
        }
    }

    #[test]
    fn escape_only_touches_line_leading_runs() {
        let content = "echo \"%% not a close\"\n";
        let escaped = escape(content, '%', 2);
        assert_eq!(escaped, content, "interior run is never escaped");
    }

    #[test]
    fn escape_adds_backslash_to_leading_run_at_or_above_n() {
        let content = "%%\nrest\n";
        let escaped = escape(content, '%', 2);
        assert_eq!(escaped, "\\%%\nrest\n");
    }

    #[test]
    fn escape_leaves_leading_run_shorter_than_n() {
        let content = "%\nrest\n";
        assert_eq!(escape(content, '%', 2), content);
    }

    #[test]
    fn minimum_indent_ignores_blank_lines() {
        let content = "  a\n\n    b\n   \n";
        assert_eq!(minimum_indent(content), 2);
    }

    #[test]
    fn minimum_indent_of_all_blank_is_zero() {
        assert_eq!(minimum_indent("\n   \n\t\n"), 0);
    }

    #[test]
    fn strip_and_restore_indent_roundtrip() {
        let content = "  a\n    b\n\n  c\n";
        let stripped = strip_indent(content, 2);
        assert_eq!(stripped, "a\n  b\n\nc\n");
        assert_eq!(restore_indent(&stripped, 2), content);
    }

    #[test]
    fn longest_run_finds_max_consecutive_delim() {
        assert_eq!(longest_run("a %% b %%% c", '%'), 3);
        assert_eq!(longest_run("no delim", '%'), 0);
    }

    #[test]
    fn escape_protects_a_line_already_starting_with_a_literal_backslash() {
        let content = "\\%%\n";
        let escaped = escape(content, '%', 2);
        assert_eq!(unescape(&escaped, '%', 2), content);
    }

    proptest::proptest! {
        /// `unescape(escape(content, delim, n), delim, n) == content` for any
        /// content and any fence length. The delimiter alphabet alone isn't
        /// enough to exercise this: lines that already start with a literal
        /// backslash (ahead of a long-enough delimiter run) must round-trip
        /// too, so the generator includes `\`.
        #[test]
        fn escape_unescape_is_a_roundtrip(
            content in "[a-z%$\\\\\n]{0,64}",
            n in 1usize..5,
        ) {
            let escaped = escape(&content, '%', n);
            proptest::prop_assert_eq!(unescape(&escaped, '%', n), content);
        }
    }
}
