//! Parser (spec §4.2): recursive-descent over the lexer's token stream,
//! producing an AST [`Root`](ast::Root). The root is always produced;
//! subtrees may contain [`ast::ErrorNode`]s where recovery kicked in.

use kson_diagnostics::{Diagnostic, DiagnosticKind, Location, Position};

use crate::ast::{
    self, Comment, EmbedBlockNode, ListNode, ListStyle, NumberNode, ObjectNode, Property,
    QuoteKind, Root, StringNode, Trivia, Value,
};
use crate::embed::{self, EmbedDelim};
use crate::number;
use crate::string;
use crate::token::{Token, TokenKind};

/// Containers nested this deep abort with [`DiagnosticKind::RecursionLimitExceeded`]
/// rather than risk a stack overflow on adversarial input.
const MAX_DEPTH: u32 = 512;

/// Parse a token stream (as produced by [`crate::lexer::lex`]) into an AST.
pub fn parse(tokens: &[Token]) -> (Root, Vec<Diagnostic>) {
    let mut parser = Parser {
        tokens,
        pos: 0,
        diagnostics: Vec::new(),
    };
    let leading = parser.collect_comments();
    let child = if parser.at_eof() {
        Value::Null(parser.current_location())
    } else if parser.looks_like_property() {
        parser.parse_object_internals(false, 0)
    } else {
        parser.parse_value(0)
    };
    let trailing = parser.collect_comments();
    (
        Root {
            child,
            leading,
            trailing,
        },
        parser.diagnostics,
    )
}

struct Parser<'a> {
    tokens: &'a [Token],
    pos: usize,
    diagnostics: Vec<Diagnostic>,
}

impl<'a> Parser<'a> {
    fn current(&self) -> &Token {
        &self.tokens[self.pos.min(self.tokens.len() - 1)]
    }

    fn current_kind(&self) -> TokenKind {
        self.current().kind
    }

    fn current_location(&self) -> Location {
        self.current().location
    }

    fn at_eof(&self) -> bool {
        self.current_kind() == TokenKind::Eof
    }

    fn advance(&mut self) -> &Token {
        let idx = self.pos.min(self.tokens.len() - 1);
        if self.pos < self.tokens.len() - 1 {
            self.pos += 1;
        }
        &self.tokens[idx]
    }

    fn skip_whitespace(&mut self) {
        while self.current_kind() == TokenKind::Whitespace {
            self.advance();
        }
    }

    /// Skip whitespace and comment tokens, returning the comments found
    /// (for attachment as leading trivia on whatever node follows).
    fn collect_comments(&mut self) -> Vec<Comment> {
        let mut comments = Vec::new();
        loop {
            match self.current_kind() {
                TokenKind::Whitespace => {
                    self.advance();
                }
                TokenKind::Comment => {
                    let tok = self.advance().clone();
                    comments.push(Comment {
                        text: tok.lexeme,
                        location: tok.location,
                    });
                }
                _ => break,
            }
        }
        comments
    }

    /// A same-line trailing comment: whitespace containing no newline,
    /// followed by a comment, consumed only if both are present.
    fn take_trailing_comment(&mut self) -> Option<Comment> {
        let save = self.pos;
        if self.current_kind() == TokenKind::Whitespace && !self.current().lexeme.contains('\n') {
            self.advance();
        }
        if self.current_kind() == TokenKind::Comment {
            let tok = self.advance().clone();
            return Some(Comment {
                text: tok.lexeme,
                location: tok.location,
            });
        }
        self.pos = save;
        None
    }

    fn diagnose(&mut self, kind: DiagnosticKind, location: Location) {
        self.diagnostics.push(Diagnostic::new(kind, location));
    }

    /// Lookahead: does the token stream from here start a `key ':'`
    /// property (used to decide whether an unbraced root/object body is
    /// present)?
    fn looks_like_property(&self) -> bool {
        let mut i = self.pos;
        while matches!(self.tokens[i].kind, TokenKind::Whitespace | TokenKind::Comment) {
            i += 1;
        }
        match self.tokens[i].kind {
            TokenKind::UnquotedString => {}
            TokenKind::StringOpenQuote => {
                while self.tokens[i].kind != TokenKind::StringCloseQuote {
                    if self.tokens[i].kind == TokenKind::Eof {
                        return false;
                    }
                    i += 1;
                }
            }
            _ => return false,
        }
        i += 1;
        while matches!(self.tokens[i].kind, TokenKind::Whitespace | TokenKind::Comment) {
            i += 1;
        }
        self.tokens[i].kind == TokenKind::Colon
    }

    fn parse_key(&mut self) -> StringNode {
        match self.current_kind() {
            TokenKind::StringOpenQuote => self.parse_quoted_string(),
            TokenKind::UnquotedString => {
                let tok = self.advance().clone();
                StringNode {
                    raw_content: tok.lexeme.clone(),
                    decoded_content: tok.lexeme,
                    quote_kind: QuoteKind::Unquoted,
                    location: tok.location,
                }
            }
            _ => {
                let loc = self.current_location();
                self.diagnose(DiagnosticKind::NonStringPropertyKey, loc);
                StringNode {
                    raw_content: String::new(),
                    decoded_content: String::new(),
                    quote_kind: QuoteKind::Unquoted,
                    location: loc,
                }
            }
        }
    }

    fn parse_quoted_string(&mut self) -> StringNode {
        let open = self.advance().clone();
        let quote_kind = if open.lexeme == "\"" {
            QuoteKind::Double
        } else {
            QuoteKind::Single
        };
        let body_start = open.location.end;
        let mut raw = String::new();
        loop {
            match self.current_kind() {
                TokenKind::StringContent
                | TokenKind::StringEscape
                | TokenKind::StringUnicodeEscape
                | TokenKind::StringIllegalControlCharacter => {
                    raw.push_str(&self.advance().lexeme);
                }
                TokenKind::StringCloseQuote | TokenKind::Eof => break,
                _ => break,
            }
        }
        let end_loc = if self.current_kind() == TokenKind::StringCloseQuote {
            self.advance().location.end
        } else {
            self.current_location().start
        };

        let decoded = string::decode(&raw);
        for (kind, raw_offset, len) in &decoded.diagnostics {
            let start = offset_position(body_start, &raw, *raw_offset);
            let end = offset_position(body_start, &raw, raw_offset + len);
            self.diagnose(kind.clone(), Location::new(start, end));
        }

        StringNode {
            raw_content: raw,
            decoded_content: decoded.decoded,
            quote_kind,
            location: Location::new(open.location.start, end_loc),
        }
    }

    fn parse_value(&mut self, depth: u32) -> Value {
        self.collect_comments();
        if depth >= MAX_DEPTH {
            return self.bail_recursion_limit();
        }

        match self.current_kind() {
            TokenKind::CurlyBraceL => self.parse_braced_object(depth),
            TokenKind::SquareBracketL => self.parse_bracket_list(depth),
            TokenKind::AngleBracketL => self.parse_angle_list(depth),
            TokenKind::ListDash => self.parse_dash_list(depth),
            TokenKind::StringOpenQuote => Value::String(self.parse_quoted_string()),
            TokenKind::UnquotedString => {
                let tok = self.advance().clone();
                Value::String(StringNode {
                    raw_content: tok.lexeme.clone(),
                    decoded_content: tok.lexeme,
                    quote_kind: QuoteKind::Unquoted,
                    location: tok.location,
                })
            }
            TokenKind::Number => {
                let tok = self.advance().clone();
                let (parsed, diag) = number::classify(&tok.lexeme);
                if let Some(kind) = diag {
                    self.diagnose(kind, tok.location);
                }
                Value::Number(NumberNode {
                    parsed,
                    raw_lexeme: tok.lexeme,
                    location: tok.location,
                })
            }
            TokenKind::True => {
                let tok = self.advance().clone();
                Value::Boolean(true, tok.location)
            }
            TokenKind::False => {
                let tok = self.advance().clone();
                Value::Boolean(false, tok.location)
            }
            TokenKind::Null => {
                let tok = self.advance().clone();
                Value::Null(tok.location)
            }
            TokenKind::EmbedOpenDelim => self.parse_embed_block(),
            _ => {
                let loc = self.current_location();
                let tok = self.advance().clone();
                self.diagnose(DiagnosticKind::UnexpectedToken(format!("{:?}", tok.kind)), loc);
                self.skip_to_stabilizer();
                Value::Error(ast::ErrorNode {
                    partial: None,
                    messages: vec![],
                    location: loc,
                })
            }
        }
    }

    /// Resync after an unexpected token by advancing to the nearest
    /// stabilizer (a comma, a closing bracket, or EOF) at the current
    /// nesting depth, per spec §4.2's recovery strategy — so a run of N
    /// consecutive garbage tokens produces one `Error` node and one
    /// diagnostic instead of N of each.
    fn skip_to_stabilizer(&mut self) {
        while !matches!(
            self.current_kind(),
            TokenKind::Comma
                | TokenKind::CurlyBraceR
                | TokenKind::SquareBracketR
                | TokenKind::AngleBracketR
                | TokenKind::Eof
        ) {
            self.advance();
        }
    }

    fn bail_recursion_limit(&mut self) -> Value {
        let start = self.current_location();
        self.diagnose(DiagnosticKind::RecursionLimitExceeded(MAX_DEPTH), start);
        let opener = self.current_kind();
        let closer = match opener {
            TokenKind::CurlyBraceL => Some(TokenKind::CurlyBraceR),
            TokenKind::SquareBracketL => Some(TokenKind::SquareBracketR),
            TokenKind::AngleBracketL => Some(TokenKind::AngleBracketR),
            _ => None,
        };
        self.advance();
        if let Some(closer) = closer {
            let mut nesting = 1i32;
            while nesting > 0 && !self.at_eof() {
                if self.current_kind() == opener {
                    nesting += 1;
                } else if self.current_kind() == closer {
                    nesting -= 1;
                }
                self.advance();
            }
        }
        let end = self.tokens[self.pos.saturating_sub(1)].location.end;
        Value::Error(ast::ErrorNode {
            partial: None,
            messages: vec![],
            location: Location::new(start.start, end),
        })
    }

    fn parse_braced_object(&mut self, depth: u32) -> Value {
        let open = self.advance().clone();
        let obj = self.parse_object_internals_body(true, depth + 1, open.location.start);
        obj
    }

    /// Root-level object body (no enclosing braces).
    fn parse_object_internals(&mut self, braced: bool, depth: u32) -> Value {
        let start = self.current_location().start;
        self.parse_object_internals_body(braced, depth, start)
    }

    fn parse_object_internals_body(&mut self, braced: bool, depth: u32, start: Position) -> Value {
        let mut properties = Vec::new();
        loop {
            let leading = self.collect_comments();

            if braced && self.current_kind() == TokenKind::CurlyBraceR {
                let close = self.advance();
                let end = close.location.end;
                return Value::Object(ObjectNode {
                    properties,
                    location: Location::new(start, end),
                    braced,
                });
            }
            if self.at_eof() {
                let end = self.current_location().end;
                if braced {
                    self.diagnose(DiagnosticKind::UnclosedContainer('{'), Location::new(start, end));
                }
                return Value::Object(ObjectNode {
                    properties,
                    location: Location::new(start, end),
                    braced,
                });
            }

            let progress_before = self.pos;
            let key = self.parse_key();
            self.collect_comments();
            if self.current_kind() == TokenKind::Colon {
                self.advance();
            } else {
                self.diagnose(DiagnosticKind::MissingColon, self.current_location());
            }
            self.collect_comments();
            let value = self.parse_value(depth + 1);
            let trailing = self.take_trailing_comment().into_iter().collect();
            let prop_loc = key.location.merge(&value.location());
            properties.push(Property {
                key,
                value,
                location: prop_loc,
                trivia: Trivia {
                    leading,
                    trailing,
                },
            });

            self.collect_comments();
            if self.current_kind() == TokenKind::Comma {
                self.advance();
            }

            if self.pos == progress_before {
                // Guarantee forward progress against pathological input.
                self.advance();
            }
        }
    }

    fn parse_bracket_list(&mut self, depth: u32) -> Value {
        let open = self.advance().clone();
        let start = open.location.start;
        let mut elements = Vec::new();
        loop {
            self.collect_comments();
            if self.current_kind() == TokenKind::SquareBracketR {
                let end = self.advance().location.end;
                return Value::List(ListNode {
                    elements,
                    style: ListStyle::Bracket,
                    location: Location::new(start, end),
                });
            }
            if self.at_eof() {
                let end = self.current_location().end;
                self.diagnose(DiagnosticKind::UnclosedContainer('['), Location::new(start, end));
                return Value::List(ListNode {
                    elements,
                    style: ListStyle::Bracket,
                    location: Location::new(start, end),
                });
            }
            let progress_before = self.pos;
            elements.push(self.parse_value(depth + 1));
            self.collect_comments();
            if self.current_kind() == TokenKind::Comma {
                self.advance();
            }
            if self.pos == progress_before {
                self.advance();
            }
        }
    }

    fn parse_dash_list(&mut self, depth: u32) -> Value {
        let start = self.current_location().start;
        let mut elements = Vec::new();
        let mut end = start;
        loop {
            if self.current_kind() != TokenKind::ListDash {
                break;
            }
            self.advance();
            self.skip_whitespace();
            let value = self.parse_value(depth + 1);
            end = value.location().end;
            elements.push(value);
            self.collect_comments();
            if self.current_kind() == TokenKind::EndDash {
                end = self.advance().location.end;
                break;
            }
        }
        Value::List(ListNode {
            elements,
            style: ListStyle::Dash,
            location: Location::new(start, end),
        })
    }

    fn parse_angle_list(&mut self, depth: u32) -> Value {
        let open = self.advance().clone();
        let start = open.location.start;
        let mut elements = Vec::new();
        loop {
            self.collect_comments();
            if self.current_kind() == TokenKind::AngleBracketR {
                let end = self.advance().location.end;
                return Value::List(ListNode {
                    elements,
                    style: ListStyle::Angle,
                    location: Location::new(start, end),
                });
            }
            if self.at_eof() {
                let end = self.current_location().end;
                self.diagnose(DiagnosticKind::UnclosedContainer('<'), Location::new(start, end));
                return Value::List(ListNode {
                    elements,
                    style: ListStyle::Angle,
                    location: Location::new(start, end),
                });
            }
            let progress_before = self.pos;
            if self.current_kind() == TokenKind::ListDash {
                self.advance();
                self.skip_whitespace();
            }
            elements.push(self.parse_value(depth + 1));
            self.collect_comments();
            if self.current_kind() == TokenKind::Comma {
                self.advance();
            }
            if self.pos == progress_before {
                self.advance();
            }
        }
    }

    fn parse_embed_block(&mut self) -> Value {
        let open = self.advance().clone();
        let start = open.location.start;
        let delim = if open.lexeme.starts_with('%') {
            EmbedDelim::Percent
        } else {
            EmbedDelim::Dollar
        };
        let n = open.lexeme.chars().count();

        let tag = if self.current_kind() == TokenKind::EmbedTag {
            Some(self.advance().lexeme.clone())
        } else {
            None
        };

        if self.current_kind() == TokenKind::EmbedPreambleNewline {
            self.advance();
        }

        let raw_content = if self.current_kind() == TokenKind::EmbedContent {
            self.advance().lexeme.clone()
        } else {
            String::new()
        };

        let end = if self.current_kind() == TokenKind::EmbedCloseDelim {
            self.advance().location.end
        } else {
            self.current_location().start
        };

        let unescaped = embed::unescape(&raw_content, delim.char(), n);
        let indent = embed::minimum_indent(&unescaped);
        let content = embed::strip_indent(&unescaped, indent);

        Value::EmbedBlock(EmbedBlockNode {
            delim,
            tag,
            content,
            location: Location::new(start, end),
        })
    }
}

/// Map a byte offset into a string's raw body back to an absolute
/// [`Position`], given the position right after the opening quote and the
/// raw body text itself (to recompute line/column deltas).
fn offset_position(body_start: Position, raw_body: &str, offset: usize) -> Position {
    let mut line = body_start.line;
    let mut column = body_start.column;
    for ch in raw_body[..offset.min(raw_body.len())].chars() {
        if ch == '\n' {
            line += 1;
            column = 0;
        } else {
            column += ch.len_utf16() as u32;
        }
    }
    Position::new(line, column, body_start.offset + offset as u32)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lexer::lex;

    fn parse_str(src: &str) -> (Root, Vec<Diagnostic>) {
        let (tokens, mut lex_diags) = lex(src);
        let (root, mut parse_diags) = parse(&tokens);
        lex_diags.append(&mut parse_diags);
        (root, lex_diags)
    }

    #[test]
    fn empty_source_is_null() {
        let (root, diags) = parse_str("");
        assert!(diags.is_empty());
        assert!(matches!(root.child, Value::Null(_)));
    }

    #[test]
    fn bare_root_object_without_braces() {
        let (root, diags) = parse_str("a: 1\nb: 2");
        assert!(diags.is_empty());
        let Value::Object(obj) = &root.child else {
            panic!("expected object");
        };
        assert_eq!(obj.properties.len(), 2);
        assert!(!obj.braced);
    }

    #[test]
    fn braced_object_parses() {
        let (root, diags) = parse_str("{ a: 1, b: 2 }");
        assert!(diags.is_empty());
        let Value::Object(obj) = &root.child else {
            panic!("expected object");
        };
        assert!(obj.braced);
        assert_eq!(obj.properties.len(), 2);
    }

    #[test]
    fn trailing_comma_is_allowed() {
        let (_, diags) = parse_str("[1, 2, 3,]");
        assert!(diags.is_empty());
    }

    #[test]
    fn a_run_of_garbage_tokens_produces_one_error_not_one_per_token() {
        let (root, diags) = parse_str("[: , 1]");
        let Value::List(list) = &root.child else {
            panic!("expected list");
        };
        assert_eq!(list.elements.len(), 2);
        assert!(matches!(list.elements[0], Value::Error(_)));
        assert!(matches!(list.elements[1], Value::Number(_)));
        let unexpected_token_diags = diags
            .iter()
            .filter(|d| matches!(d.kind, DiagnosticKind::UnexpectedToken(_)))
            .count();
        assert_eq!(unexpected_token_diags, 1, "expected one resync, got: {diags:?}");
    }

    #[test]
    fn bracket_list_parses_values() {
        let (root, _) = parse_str("[1, 2, 3]");
        let Value::List(list) = &root.child else {
            panic!("expected list");
        };
        assert_eq!(list.elements.len(), 3);
        assert_eq!(list.style, ListStyle::Bracket);
    }

    #[test]
    fn dash_list_with_end_dash() {
        let (root, _) = parse_str("- 1\n- 2\n. ");
        let Value::List(list) = &root.child else {
            panic!("expected list");
        };
        assert_eq!(list.elements.len(), 2);
        assert_eq!(list.style, ListStyle::Dash);
    }

    #[test]
    fn angle_list_parses() {
        let (root, _) = parse_str("<1, 2>");
        let Value::List(list) = &root.child else {
            panic!("expected list");
        };
        assert_eq!(list.elements.len(), 2);
        assert_eq!(list.style, ListStyle::Angle);
    }

    #[test]
    fn missing_colon_is_diagnosed() {
        let (_, diags) = parse_str("a 1");
        assert!(diags.iter().any(|d| matches!(d.kind, DiagnosticKind::MissingColon)));
    }

    #[test]
    fn unclosed_bracket_is_diagnosed() {
        let (_, diags) = parse_str("[1, 2");
        assert!(diags.iter().any(|d| matches!(d.kind, DiagnosticKind::UnclosedContainer('['))));
    }

    #[test]
    fn unquoted_value_is_unquoted_string() {
        let (root, _) = parse_str("hello");
        let Value::String(s) = &root.child else {
            panic!("expected string");
        };
        assert_eq!(s.quote_kind, QuoteKind::Unquoted);
        assert_eq!(s.decoded_content, "hello");
    }

    #[test]
    fn embed_block_round_trip() {
        let (root, diags) = parse_str("%%bash\necho hi\n%%");
        assert!(diags.is_empty());
        let Value::EmbedBlock(e) = &root.child else {
            panic!("expected embed block");
        };
        assert_eq!(e.tag.as_deref(), Some("bash"));
        assert_eq!(e.content, "echo hi\n");
    }

    #[test]
    fn embed_block_with_escaped_inner_run_unescapes() {
        let (root, _) = parse_str("%%%\necho \"%% not a close\"\n%%%");
        let Value::EmbedBlock(e) = &root.child else {
            panic!("expected embed block");
        };
        assert_eq!(e.content, "echo \"%% not a close\"\n");
    }

    #[test]
    fn string_escape_offset_is_reported_inside_body() {
        let (_, diags) = parse_str(r#""\q""#);
        let d = diags.iter().find(|d| matches!(d.kind, DiagnosticKind::StringBadEscape(_)));
        assert!(d.is_some());
    }
}
