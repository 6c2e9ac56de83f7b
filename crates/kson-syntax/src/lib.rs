//! KSON lexer, parser, AST, and canonical value model.
//!
//! The pipeline is: [`lexer::lex`] → [`parser::parse`] → [`value::lower`].
//! Diagnostics accumulate at every stage rather than aborting; a [`Value`]
//! is only produced once no `Error`-severity diagnostic exists.

pub mod ast;
pub mod embed;
pub mod lexer;
pub mod number;
pub mod parser;
pub mod string;
pub mod token;
pub mod value;

pub use ast::Root;
pub use value::Value;

use kson_diagnostics::{Diagnostic, has_errors};

/// The result of analyzing a KSON source document: its tokens, every
/// diagnostic collected along the way, and the AST root. `value` is
/// populated only when no `Error`-severity diagnostic was produced.
pub struct Analysis {
    pub tokens: Vec<token::Token>,
    pub root: Root,
    pub messages: Vec<Diagnostic>,
    pub value: Option<Value>,
}

/// Run the full lex → parse → lower pipeline over `source`.
#[tracing::instrument(level = "debug", skip_all, fields(len = source.len()))]
pub fn analyze(source: &str) -> Analysis {
    let (tokens, lex_diags) = lexer::lex(source);
    tracing::trace!(tokens = tokens.len(), diagnostics = lex_diags.len(), "lexed source");
    let (root, parse_diags) = parser::parse(&tokens);
    tracing::trace!(diagnostics = parse_diags.len(), "parsed token stream");

    let mut messages = lex_diags;
    messages.extend(parse_diags);

    let value = if has_errors(&messages) {
        None
    } else {
        let mut lowering_diags = Vec::new();
        let value = value::lower(&root.child, &mut lowering_diags);
        messages.extend(lowering_diags);
        value
    };
    tracing::debug!(has_value = value.is_some(), messages = messages.len(), "analyzed document");

    Analysis {
        tokens,
        root,
        messages,
        value,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn analyze_well_formed_document_produces_value() {
        let analysis = analyze("a: 1\nb: [1, 2, 3]");
        assert!(analysis.value.is_some());
        assert!(!has_errors(&analysis.messages));
    }

    #[test]
    fn analyze_malformed_document_has_no_value() {
        let analysis = analyze("a: [1, 2");
        assert!(analysis.value.is_none());
        assert!(has_errors(&analysis.messages));
    }

    #[test]
    fn duplicate_keys_still_produce_a_value() {
        let analysis = analyze("a: 1\na: 2");
        assert!(analysis.value.is_some());
        assert!(!has_errors(&analysis.messages));
    }
}
