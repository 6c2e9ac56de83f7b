//! The AST (spec §3): a tagged tree that retains trivia (comments,
//! whitespace) attached to nodes, so the formatter can reconstruct source
//! layout. Lowering an AST into a trivia-free [`crate::value::Value`] is in
//! `value.rs`.

use kson_diagnostics::{Diagnostic, Location};

use crate::embed::EmbedDelim;
use crate::number::NumberValue;

/// Quote style a string literal used in source, or `Unquoted` for a bare
/// identifier used as a value or key.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QuoteKind {
    Double,
    Single,
    Unquoted,
}

/// The bracket style a list used in source. The formatter preserves this
/// where the style allows, and chooses a default otherwise.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ListStyle {
    Bracket,
    Dash,
    Angle,
}

/// A comment token attached to a node, with which side it was found on.
#[derive(Debug, Clone, PartialEq)]
pub struct Comment {
    pub text: String,
    pub location: Location,
}

/// Comments immediately surrounding a node, captured during parsing so the
/// formatter can re-emit them in place.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Trivia {
    pub leading: Vec<Comment>,
    pub trailing: Vec<Comment>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct StringNode {
    pub raw_content: String,
    pub decoded_content: String,
    pub quote_kind: QuoteKind,
    pub location: Location,
}

#[derive(Debug, Clone, PartialEq)]
pub struct NumberNode {
    pub parsed: NumberValue,
    pub raw_lexeme: String,
    pub location: Location,
}

#[derive(Debug, Clone, PartialEq)]
pub struct EmbedBlockNode {
    pub delim: EmbedDelim,
    pub tag: Option<String>,
    pub content: String,
    pub location: Location,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Property {
    pub key: StringNode,
    pub value: Value,
    pub location: Location,
    pub trivia: Trivia,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ObjectNode {
    pub properties: Vec<Property>,
    pub location: Location,
    /// Whether the source wrote an enclosing `{ }` (root-level objects may
    /// omit it, per spec §4.2's `object_internals` production).
    pub braced: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ListNode {
    pub elements: Vec<Value>,
    pub style: ListStyle,
    pub location: Location,
}

/// A node that failed to parse cleanly. Carries whatever partial tree the
/// parser salvaged plus the diagnostics explaining the failure. Never
/// survives lowering to [`crate::value::Value`] — its presence anywhere in
/// the tree means [`crate::value::lower`] returns `None`.
#[derive(Debug, Clone, PartialEq)]
pub struct ErrorNode {
    pub partial: Option<Box<Value>>,
    pub messages: Vec<Diagnostic>,
    pub location: Location,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    String(StringNode),
    Number(NumberNode),
    Boolean(bool, Location),
    Null(Location),
    Object(ObjectNode),
    List(ListNode),
    EmbedBlock(EmbedBlockNode),
    Error(ErrorNode),
}

impl Value {
    pub fn location(&self) -> Location {
        match self {
            Value::String(n) => n.location,
            Value::Number(n) => n.location,
            Value::Boolean(_, loc) | Value::Null(loc) => *loc,
            Value::Object(n) => n.location,
            Value::List(n) => n.location,
            Value::EmbedBlock(n) => n.location,
            Value::Error(n) => n.location,
        }
    }

    pub fn is_error(&self) -> bool {
        matches!(self, Value::Error(_))
    }
}

/// The root of a parsed document: a single value plus the file-level
/// leading/trailing trivia that isn't attached to any inner node.
#[derive(Debug, Clone, PartialEq)]
pub struct Root {
    pub child: Value,
    pub leading: Vec<Comment>,
    pub trailing: Vec<Comment>,
}
