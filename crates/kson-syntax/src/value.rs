//! The canonical value model (spec §3): trivia-free, comment-free, with
//! object keys deduplicated first-writer-wins. Produced by [`lower`], which
//! only succeeds when the AST contains no [`crate::ast::ErrorNode`] and no
//! `Error`-severity diagnostic was recorded during parsing (spec invariant:
//! a `Value` is only produced when the parse has no errors).

use indexmap::IndexMap;
use kson_diagnostics::{Diagnostic, DiagnosticKind, Location};

use crate::ast;
use crate::embed::EmbedDelim;
use crate::number::NumberValue;

#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    String(String, Location),
    Number(NumberValue, Location),
    Boolean(bool, Location),
    Null(Location),
    Object(IndexMap<String, Value>, Location),
    List(Vec<Value>, Location),
    EmbedBlock {
        delim: EmbedDelim,
        tag: Option<String>,
        content: String,
        location: Location,
    },
}

impl Value {
    pub fn location(&self) -> Location {
        match self {
            Value::String(_, loc)
            | Value::Number(_, loc)
            | Value::Boolean(_, loc)
            | Value::Null(loc)
            | Value::Object(_, loc)
            | Value::List(_, loc)
            | Value::EmbedBlock { location: loc, .. } => *loc,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s, _) => Some(s),
            _ => None,
        }
    }

    pub fn type_name(&self) -> &'static str {
        match self {
            Value::String(..) => "string",
            Value::Number(NumberValue::Integer(_), _) => "integer",
            Value::Number(NumberValue::Decimal(_), _) => "number",
            Value::Boolean(..) => "boolean",
            Value::Null(_) => "null",
            Value::Object(..) => "object",
            Value::List(..) => "array",
            Value::EmbedBlock { .. } => "string",
        }
    }
}

/// Lower a parsed AST root into a canonical [`Value`], deduplicating object
/// keys (first write wins, later duplicates reported as a diagnostic into
/// `messages`). Returns `None` if the tree contains any `Error` node —
/// callers should check this only once no `Error`-severity diagnostic is
/// already known, per the invariant that those two conditions coincide.
pub fn lower(root: &ast::Value, messages: &mut Vec<Diagnostic>) -> Option<Value> {
    match root {
        ast::Value::Error(_) => None,
        ast::Value::String(s) => Some(Value::String(s.decoded_content.clone(), s.location)),
        ast::Value::Number(n) => Some(Value::Number(n.parsed, n.location)),
        ast::Value::Boolean(b, loc) => Some(Value::Boolean(*b, *loc)),
        ast::Value::Null(loc) => Some(Value::Null(*loc)),
        ast::Value::EmbedBlock(e) => Some(Value::EmbedBlock {
            delim: e.delim,
            tag: e.tag.clone(),
            content: e.content.clone(),
            location: e.location,
        }),
        ast::Value::List(list) => {
            let mut elements = Vec::with_capacity(list.elements.len());
            for el in &list.elements {
                elements.push(lower(el, messages)?);
            }
            Some(Value::List(elements, list.location))
        }
        ast::Value::Object(obj) => {
            let mut map = IndexMap::with_capacity(obj.properties.len());
            for prop in &obj.properties {
                let value = lower(&prop.value, messages)?;
                let key = prop.key.decoded_content.clone();
                if map.contains_key(&key) {
                    messages.push(Diagnostic::new(
                        DiagnosticKind::ObjectDuplicateKey(key),
                        prop.key.location,
                    ));
                } else {
                    map.insert(key, value);
                }
            }
            Some(Value::Object(map, obj.location))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::{ObjectNode, Property, QuoteKind, StringNode, Trivia};
    use kson_diagnostics::Position;

    fn loc() -> Location {
        Location::point(Position::ZERO)
    }

    fn string_node(s: &str) -> StringNode {
        StringNode {
            raw_content: s.to_string(),
            decoded_content: s.to_string(),
            quote_kind: QuoteKind::Double,
            location: loc(),
        }
    }

    #[test]
    fn duplicate_keys_keep_first_and_diagnose() {
        let obj = ast::Value::Object(ObjectNode {
            properties: vec![
                Property {
                    key: string_node("a"),
                    value: ast::Value::Number(ast::NumberNode {
                        parsed: NumberValue::Integer(1),
                        raw_lexeme: "1".to_string(),
                        location: loc(),
                    }),
                    location: loc(),
                    trivia: Trivia::default(),
                },
                Property {
                    key: string_node("a"),
                    value: ast::Value::Number(ast::NumberNode {
                        parsed: NumberValue::Integer(2),
                        raw_lexeme: "2".to_string(),
                        location: loc(),
                    }),
                    location: loc(),
                    trivia: Trivia::default(),
                },
            ],
            location: loc(),
            braced: true,
        });

        let mut messages = Vec::new();
        let value = lower(&obj, &mut messages).expect("no error nodes");
        let Value::Object(map, _) = value else {
            panic!("expected object");
        };
        assert_eq!(map.get("a"), Some(&Value::Number(NumberValue::Integer(1), loc())));
        assert_eq!(messages.len(), 1);
        assert!(matches!(messages[0].kind, DiagnosticKind::ObjectDuplicateKey(_)));
    }

    #[test]
    fn error_node_anywhere_blocks_lowering() {
        let list = ast::Value::List(ast::ListNode {
            elements: vec![ast::Value::Error(ast::ErrorNode {
                partial: None,
                messages: vec![],
                location: loc(),
            })],
            style: ast::ListStyle::Bracket,
            location: loc(),
        });
        let mut messages = Vec::new();
        assert!(lower(&list, &mut messages).is_none());
    }
}
