//! Lexer (spec §4.1): source text → token stream with precise locations.
//! Never aborts; malformed input yields a diagnostic and a best-effort
//! token, then scanning resumes at the next whitespace or structural
//! character.

use kson_diagnostics::{Diagnostic, DiagnosticKind, Location, Position};

use crate::token::{Token, TokenKind};

/// Run the lexer over `source`, returning every token (including trivia)
/// and any diagnostics collected along the way. Always ends in `Eof`.
pub fn lex(source: &str) -> (Vec<Token>, Vec<Diagnostic>) {
    let mut lexer = Lexer::new(source);
    lexer.run();
    (lexer.tokens, lexer.diagnostics)
}

struct Lexer<'a> {
    src: &'a str,
    pos: usize,
    line: u32,
    column: u32,
    tokens: Vec<Token>,
    diagnostics: Vec<Diagnostic>,
}

impl<'a> Lexer<'a> {
    fn new(src: &'a str) -> Self {
        // A leading UTF-8 BOM is invisible to every downstream consumer.
        let src = src.strip_prefix('\u{FEFF}').unwrap_or(src);
        Self {
            src,
            pos: 0,
            line: 0,
            column: 0,
            tokens: Vec::new(),
            diagnostics: Vec::new(),
        }
    }

    fn here(&self) -> Position {
        Position::new(self.line, self.column, self.pos as u32)
    }

    fn remaining(&self) -> &'a str {
        &self.src[self.pos..]
    }

    fn peek(&self) -> Option<char> {
        self.remaining().chars().next()
    }

    fn peek_nth(&self, n: usize) -> Option<char> {
        self.remaining().chars().nth(n)
    }

    fn bump(&mut self) -> Option<char> {
        let ch = self.peek()?;
        self.pos += ch.len_utf8();
        if ch == '\n' {
            self.line += 1;
            self.column = 0;
        } else {
            self.column += ch.len_utf16() as u32;
        }
        Some(ch)
    }

    fn push(&mut self, kind: TokenKind, start: Position, lexeme: &str) {
        let end = self.here();
        self.tokens.push(Token::new(kind, lexeme, Location::new(start, end)));
    }

    fn diagnose(&mut self, kind: DiagnosticKind, start: Position) {
        let end = self.here();
        self.diagnostics.push(Diagnostic::new(kind, Location::new(start, end)));
    }

    fn run(&mut self) {
        loop {
            let Some(ch) = self.peek() else { break };
            let start = self.here();

            match ch {
                ' ' | '\t' | '\r' | '\n' => self.lex_whitespace(start),
                '#' => self.lex_comment(start),
                '{' => self.single(TokenKind::CurlyBraceL, start),
                '}' => self.single(TokenKind::CurlyBraceR, start),
                '[' => self.single(TokenKind::SquareBracketL, start),
                ']' => self.single(TokenKind::SquareBracketR, start),
                '<' => self.single(TokenKind::AngleBracketL, start),
                '>' => self.single(TokenKind::AngleBracketR, start),
                ':' => self.single(TokenKind::Colon, start),
                ',' => self.single(TokenKind::Comma, start),
                '"' => self.lex_string(start, '"'),
                '\'' => self.lex_string(start, '\''),
                '%' | '$' if self.is_embed_open(ch) => self.lex_embed(start, ch),
                '-' => self.lex_dash_or_number(start),
                '.' => self.lex_dot(start),
                c if c.is_ascii_digit() => self.lex_number(start),
                c if is_ident_start(c) => self.lex_identifier(start),
                _ => {
                    self.bump();
                    let lexeme = &self.src[start.offset as usize..self.pos];
                    self.diagnose(DiagnosticKind::IllegalChar(ch), start);
                    self.push(TokenKind::IllegalChar, start, lexeme);
                }
            }
        }

        let eof = self.here();
        self.tokens.push(Token::new(TokenKind::Eof, "", Location::point(eof)));
    }

    fn single(&mut self, kind: TokenKind, start: Position) {
        self.bump();
        let lexeme = &self.src[start.offset as usize..self.pos];
        self.push(kind, start, lexeme);
    }

    fn lex_whitespace(&mut self, start: Position) {
        while matches!(self.peek(), Some(' ' | '\t' | '\r' | '\n')) {
            self.bump();
        }
        let lexeme = self.src[start.offset as usize..self.pos].to_string();
        self.push(TokenKind::Whitespace, start, &lexeme);
    }

    fn lex_comment(&mut self, start: Position) {
        while let Some(c) = self.peek() {
            if c == '\n' {
                break;
            }
            self.bump();
        }
        let lexeme = self.src[start.offset as usize..self.pos].to_string();
        self.push(TokenKind::Comment, start, &lexeme);
    }

    /// `-` starts either `LIST_DASH` (a dash followed by whitespace) or a
    /// negative number (a dash followed by a digit).
    fn lex_dash_or_number(&mut self, start: Position) {
        if matches!(self.peek_nth(1), Some(c) if c.is_ascii_digit()) {
            self.lex_number(start);
        } else {
            self.bump();
            self.push(TokenKind::ListDash, start, "-");
        }
    }

    /// A lone `.` surrounded by whitespace (or source boundaries) closes a
    /// dash list (`END_DASH`); any other standalone `.` is a bare `Dot`.
    fn lex_dot(&mut self, start: Position) {
        let prev_is_boundary = self.pos == 0
            || self.src[..self.pos]
                .chars()
                .next_back()
                .is_some_and(|c| c.is_whitespace());
        let next = self.peek_nth(1);
        let next_is_boundary = matches!(next, None | Some(c) if c.is_whitespace());
        self.bump();
        if prev_is_boundary && next_is_boundary {
            self.push(TokenKind::EndDash, start, ".");
        } else {
            self.push(TokenKind::Dot, start, ".");
        }
    }

    fn lex_number(&mut self, start: Position) {
        let mut seen_dot = false;
        let mut seen_exp = false;

        if self.peek() == Some('-') {
            self.bump();
        }
        let digits_start = self.here();
        while matches!(self.peek(), Some(c) if c.is_ascii_digit()) {
            self.bump();
        }
        let digits = &self.src[digits_start.offset as usize..self.pos];
        if digits.len() > 1 && digits.starts_with('0') {
            self.diagnose(DiagnosticKind::NumberLeadingZero, digits_start);
        }

        loop {
            match self.peek() {
                Some('.') if !seen_dot && !seen_exp => {
                    seen_dot = true;
                    self.bump();
                    while matches!(self.peek(), Some(c) if c.is_ascii_digit()) {
                        self.bump();
                    }
                }
                Some('.') => {
                    let bad_start = self.here();
                    let bad = self.peek().expect("checked Some above");
                    self.diagnose(DiagnosticKind::NumberBadChar(bad), bad_start);
                    break;
                }
                Some('e' | 'E') if !seen_exp => {
                    seen_exp = true;
                    self.bump();
                    if matches!(self.peek(), Some('+' | '-')) {
                        self.bump();
                    }
                    while matches!(self.peek(), Some(c) if c.is_ascii_digit()) {
                        self.bump();
                    }
                }
                _ => break,
            }
        }

        let lexeme = self.src[start.offset as usize..self.pos].to_string();
        self.push(TokenKind::Number, start, &lexeme);
    }

    fn lex_identifier(&mut self, start: Position) {
        while matches!(self.peek(), Some(c) if is_ident_continue(c)) {
            self.bump();
        }
        let lexeme = self.src[start.offset as usize..self.pos].to_string();
        let kind = match lexeme.as_str() {
            "true" => TokenKind::True,
            "false" => TokenKind::False,
            "null" => TokenKind::Null,
            _ => TokenKind::UnquotedString,
        };
        self.push(kind, start, &lexeme);
    }

    fn lex_string(&mut self, start: Position, quote: char) {
        self.bump();
        self.push(TokenKind::StringOpenQuote, start, &quote.to_string());

        loop {
            let Some(c) = self.peek() else {
                self.diagnose(DiagnosticKind::StringUnterminated, start);
                return;
            };

            if c == quote {
                let close_start = self.here();
                self.bump();
                self.push(TokenKind::StringCloseQuote, close_start, &quote.to_string());
                return;
            }

            if c == '\n' {
                // Raw newlines are legal content; KSON strings may span lines.
                let content_start = self.here();
                self.bump();
                let lexeme = self.src[content_start.offset as usize..self.pos].to_string();
                self.push(TokenKind::StringContent, content_start, &lexeme);
                continue;
            }

            if c == '\\' {
                self.lex_string_escape();
                continue;
            }

            if (c as u32) < 0x20 {
                let bad_start = self.here();
                self.bump();
                self.diagnose(DiagnosticKind::StringIllegalControlCharacter, bad_start);
                self.push(TokenKind::StringIllegalControlCharacter, bad_start, &c.to_string());
                continue;
            }

            let content_start = self.here();
            while let Some(c) = self.peek() {
                if c == quote || c == '\\' || c == '\n' || (c as u32) < 0x20 {
                    break;
                }
                self.bump();
            }
            let lexeme = self.src[content_start.offset as usize..self.pos].to_string();
            self.push(TokenKind::StringContent, content_start, &lexeme);
        }
    }

    fn lex_string_escape(&mut self) {
        let start = self.here();
        self.bump(); // backslash
        match self.peek() {
            Some('u') => {
                self.bump();
                let mut hex_len = 0;
                while hex_len < 4 && matches!(self.peek(), Some(c) if c.is_ascii_hexdigit()) {
                    self.bump();
                    hex_len += 1;
                }
                let lexeme = self.src[start.offset as usize..self.pos].to_string();
                if hex_len < 4 {
                    self.diagnose(DiagnosticKind::StringBadUnicodeEscape, start);
                }
                self.push(TokenKind::StringUnicodeEscape, start, &lexeme);
            }
            Some(_) => {
                self.bump();
                let lexeme = self.src[start.offset as usize..self.pos].to_string();
                self.push(TokenKind::StringEscape, start, &lexeme);
            }
            None => {
                let lexeme = self.src[start.offset as usize..self.pos].to_string();
                self.push(TokenKind::StringEscape, start, &lexeme);
            }
        }
    }

    /// Whether the run of `ch` starting here has length >= 2, i.e. is a
    /// legal embed-block opener rather than a stray `%`/`$`.
    fn is_embed_open(&self, ch: char) -> bool {
        self.peek_nth(1) == Some(ch)
    }

    fn lex_embed(&mut self, start: Position, delim: char) {
        let mut n = 0usize;
        while self.peek() == Some(delim) {
            self.bump();
            n += 1;
        }
        let open_lexeme = delim.to_string().repeat(n);
        self.push(TokenKind::EmbedOpenDelim, start, &open_lexeme);

        // Optional tag: identifier-ish run on the same line.
        while matches!(self.peek(), Some(' ' | '\t')) {
            self.bump();
        }
        if matches!(self.peek(), Some(c) if is_ident_start(c)) {
            let tag_start = self.here();
            while matches!(self.peek(), Some(c) if is_ident_continue(c)) {
                self.bump();
            }
            let lexeme = self.src[tag_start.offset as usize..self.pos].to_string();
            self.push(TokenKind::EmbedTag, tag_start, &lexeme);
        }
        while matches!(self.peek(), Some(' ' | '\t')) {
            self.bump();
        }

        let newline_start = self.here();
        if self.peek() == Some('\n') {
            self.bump();
            self.push(TokenKind::EmbedPreambleNewline, newline_start, "\n");
        } else {
            // No newline before EOF/other content: still proceed, the
            // content scan below simply starts immediately.
        }

        let content_start = self.here();
        loop {
            if self.peek().is_none() {
                self.diagnose(DiagnosticKind::EmbedUnterminated, start);
                let lexeme = self.src[content_start.offset as usize..self.pos].to_string();
                if !lexeme.is_empty() {
                    self.push(TokenKind::EmbedContent, content_start, &lexeme);
                }
                return;
            }
            if let Some(close_len) = self.match_embed_close(delim, n) {
                let lexeme = self.src[content_start.offset as usize..self.pos].to_string();
                if !lexeme.is_empty() {
                    self.push(TokenKind::EmbedContent, content_start, &lexeme);
                }
                let close_start = self.here();
                for _ in 0..close_len {
                    self.bump();
                }
                let close_lexeme = delim.to_string().repeat(close_len);
                self.push(TokenKind::EmbedCloseDelim, close_start, &close_lexeme);
                return;
            }
            self.bump();
        }
    }

    /// At the start of a content line (we are positioned right after a
    /// `\n`, or at `content_start`), check whether an unescaped run of
    /// exactly `n` copies of `delim` begins here, optionally preceded by
    /// leading whitespace. Interior escaped runs (`\` + run) are content,
    /// never a closer.
    fn match_embed_close(&self, delim: char, n: usize) -> Option<usize> {
        let at_line_start = self.pos == 0
            || self.src[..self.pos].ends_with('\n');
        if !at_line_start {
            return None;
        }
        let mut scan = self.remaining();
        let mut skipped_ws = String::new();
        while let Some(c) = scan.chars().next() {
            if c == ' ' || c == '\t' {
                skipped_ws.push(c);
                scan = &scan[c.len_utf8()..];
            } else {
                break;
            }
        }
        if scan.starts_with('\\') {
            return None;
        }
        let run_len = scan.chars().take_while(|&c| c == delim).count();
        if run_len == n {
            Some(skipped_ws.len() + n)
        } else {
            None
        }
    }
}

fn is_ident_start(c: char) -> bool {
    c.is_ascii_alphabetic() || c == '_'
}

fn is_ident_continue(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_' || c == '-'
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kinds(source: &str) -> Vec<TokenKind> {
        lex(source).0.into_iter().map(|t| t.kind).collect()
    }

    #[test]
    fn ends_with_eof() {
        assert_eq!(kinds("").last(), Some(&TokenKind::Eof));
    }

    #[test]
    fn lexes_structural_tokens() {
        assert_eq!(
            kinds("{}[]<>:,"),
            vec![
                TokenKind::CurlyBraceL,
                TokenKind::CurlyBraceR,
                TokenKind::SquareBracketL,
                TokenKind::SquareBracketR,
                TokenKind::AngleBracketL,
                TokenKind::AngleBracketR,
                TokenKind::Colon,
                TokenKind::Comma,
                TokenKind::Eof,
            ]
        );
    }

    #[test]
    fn negative_number_is_one_token() {
        let ks = kinds("-7");
        assert_eq!(ks[0], TokenKind::Number);
    }

    #[test]
    fn dash_followed_by_space_is_list_dash() {
        let ks = kinds("- 1");
        assert_eq!(ks[0], TokenKind::ListDash);
    }

    #[test]
    fn keywords_get_dedicated_tokens() {
        assert_eq!(kinds("true")[0], TokenKind::True);
        assert_eq!(kinds("false")[0], TokenKind::False);
        assert_eq!(kinds("null")[0], TokenKind::Null);
    }

    #[test]
    fn bare_identifier_is_unquoted_string() {
        assert_eq!(kinds("hello")[0], TokenKind::UnquotedString);
    }

    #[test]
    fn comment_runs_to_end_of_line() {
        let (tokens, _) = lex("# hi\n1");
        assert_eq!(tokens[0].kind, TokenKind::Comment);
        assert_eq!(tokens[0].lexeme, "# hi");
    }

    #[test]
    fn second_decimal_point_is_diagnosed() {
        let (_, diags) = lex("1.2.3");
        assert!(diags.iter().any(|d| matches!(d.kind, DiagnosticKind::NumberBadChar('.'))));
    }

    #[test]
    fn leading_zero_is_diagnosed() {
        let (tokens, diags) = lex("007");
        assert_eq!(tokens[0].kind, TokenKind::Number);
        assert!(diags.iter().any(|d| matches!(d.kind, DiagnosticKind::NumberLeadingZero)));
    }

    #[test]
    fn single_zero_is_not_a_leading_zero() {
        let (_, diags) = lex("0");
        assert!(!diags.iter().any(|d| matches!(d.kind, DiagnosticKind::NumberLeadingZero)));
    }

    #[test]
    fn zero_point_something_is_not_a_leading_zero() {
        let (_, diags) = lex("0.5");
        assert!(!diags.iter().any(|d| matches!(d.kind, DiagnosticKind::NumberLeadingZero)));
    }

    #[test]
    fn negative_leading_zero_is_diagnosed() {
        let (_, diags) = lex("-007");
        assert!(diags.iter().any(|d| matches!(d.kind, DiagnosticKind::NumberLeadingZero)));
    }

    #[test]
    fn unterminated_string_is_diagnosed() {
        let (_, diags) = lex("\"abc");
        assert!(diags.iter().any(|d| matches!(d.kind, DiagnosticKind::StringUnterminated)));
    }

    #[test]
    fn simple_embed_block_round_trips_lexically() {
        let (tokens, diags) = lex("%%bash\necho hi\n%%");
        assert!(diags.is_empty());
        let kinds: Vec<_> = tokens.iter().map(|t| t.kind).collect();
        assert_eq!(
            kinds,
            vec![
                TokenKind::EmbedOpenDelim,
                TokenKind::EmbedTag,
                TokenKind::EmbedPreambleNewline,
                TokenKind::EmbedContent,
                TokenKind::EmbedCloseDelim,
                TokenKind::Eof,
            ]
        );
    }

    #[test]
    fn embed_block_without_tag() {
        let (tokens, _) = lex("%%\nhi\n%%");
        let kinds: Vec<_> = tokens.iter().map(|t| t.kind).collect();
        assert!(!kinds.contains(&TokenKind::EmbedTag));
    }

    #[test]
    fn longer_delim_run_needed_to_close_when_content_has_short_run() {
        let (tokens, _) = lex("%%%\necho \"%% not a close\"\n%%%");
        let kinds: Vec<_> = tokens.iter().map(|t| t.kind).collect();
        assert!(kinds.contains(&TokenKind::EmbedCloseDelim));
        let content = tokens
            .iter()
            .find(|t| t.kind == TokenKind::EmbedContent)
            .unwrap();
        assert!(content.lexeme.contains("%% not a close"));
    }

    #[test]
    fn unterminated_embed_block_is_diagnosed() {
        let (_, diags) = lex("%%bash\necho hi");
        assert!(diags.iter().any(|d| matches!(d.kind, DiagnosticKind::EmbedUnterminated)));
    }

    #[test]
    fn end_dash_recognized_between_whitespace() {
        let ks = kinds("- 1\n. ");
        assert!(ks.contains(&TokenKind::EndDash));
    }

    #[test]
    fn illegal_character_is_diagnosed_and_scanning_continues() {
        let (tokens, diags) = lex("1 ` 2");
        assert!(diags.iter().any(|d| matches!(d.kind, DiagnosticKind::IllegalChar('`'))));
        let numbers: Vec<_> = tokens.iter().filter(|t| t.kind == TokenKind::Number).collect();
        assert_eq!(numbers.len(), 2);
    }
}
