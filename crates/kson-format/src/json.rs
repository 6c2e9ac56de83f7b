//! KSON → JSON transpiler (spec §4.7): a pure function over the canonical
//! [`kson_syntax::Value`], emitting RFC 8259-compliant JSON text.

use kson_syntax::ast;
use kson_syntax::number::NumberValue;
use kson_syntax::value::Value;

use crate::doc::{Doc, PrintOptions};
use crate::options::FormatOptions;

#[derive(Debug, Clone, Copy)]
pub struct JsonOptions {
    pub retain_embed_tags: bool,
    pub print_width: usize,
}

impl Default for JsonOptions {
    fn default() -> Self {
        Self {
            retain_embed_tags: true,
            print_width: 80,
        }
    }
}

pub fn to_json(value: &Value, options: &JsonOptions) -> String {
    let doc = value_doc(value, options);
    let print_opts = PrintOptions {
        print_width: options.print_width,
        ..PrintOptions::default()
    };
    crate::doc::print(&doc, &print_opts)
}

fn value_doc(value: &Value, options: &JsonOptions) -> Doc {
    match value {
        Value::Null(_) => Doc::text("null"),
        Value::Boolean(b, _) => Doc::text(if *b { "true" } else { "false" }),
        Value::Number(n, _) => Doc::text(render_number(*n)),
        Value::String(s, _) => Doc::text(escape_json_string(s)),
        Value::EmbedBlock { tag, content, .. } => {
            if options.retain_embed_tags {
                Doc::group(Doc::concat(vec![
                    Doc::text("{"),
                    Doc::indent(Doc::concat(vec![
                        Doc::Line,
                        Doc::text(format!(
                            "\"embedTag\": {}",
                            tag.as_deref().map_or_else(|| "null".to_string(), |t| escape_json_string(t))
                        )),
                        Doc::text(","),
                        Doc::Line,
                        Doc::text(format!("\"embedContent\": {}", escape_json_string(content))),
                    ])),
                    Doc::Line,
                    Doc::text("}"),
                ]))
            } else {
                Doc::text(escape_json_string(content))
            }
        }
        Value::List(items, _) => {
            if items.is_empty() {
                return Doc::text("[]");
            }
            let mut parts = Vec::new();
            for (i, item) in items.iter().enumerate() {
                if i > 0 {
                    parts.push(Doc::text(","));
                    parts.push(Doc::Line);
                }
                parts.push(value_doc(item, options));
            }
            Doc::group(Doc::concat(vec![
                Doc::text("["),
                Doc::indent(Doc::concat(vec![Doc::Softline, Doc::concat(parts)])),
                Doc::Softline,
                Doc::text("]"),
            ]))
        }
        Value::Object(map, _) => {
            if map.is_empty() {
                return Doc::text("{}");
            }
            let mut parts = Vec::new();
            for (i, (key, value)) in map.iter().enumerate() {
                if i > 0 {
                    parts.push(Doc::text(","));
                    parts.push(Doc::Line);
                }
                parts.push(Doc::concat(vec![
                    Doc::text(escape_json_string(key)),
                    Doc::text(": "),
                    value_doc(value, options),
                ]));
            }
            Doc::group(Doc::concat(vec![
                Doc::text("{"),
                Doc::indent(Doc::concat(vec![Doc::Line, Doc::concat(parts)])),
                Doc::Line,
                Doc::text("}"),
            ]))
        }
    }
}

fn render_number(n: NumberValue) -> String {
    match n {
        NumberValue::Integer(i) => i.to_string(),
        NumberValue::Decimal(d) => {
            if d.is_infinite() || d.is_nan() {
                // Not representable in JSON; emit the closest finite
                // boundary so output always parses, per spec's "no
                // preservation beyond IEEE-754 double" non-goal.
                if d.is_sign_negative() {
                    f64::MIN.to_string()
                } else {
                    f64::MAX.to_string()
                }
            } else if d.fract() == 0.0 && d.abs() < 1e15 {
                format!("{d:.1}")
            } else {
                format!("{d}")
            }
        }
    }
}

/// RFC 8259 string escaping: control chars, `"`, `\`, U+2028/U+2029, and
/// `\/` for broad embeddability (spec §4.7).
pub fn escape_json_string(s: &str) -> String {
    let mut out = String::with_capacity(s.len() + 2);
    out.push('"');
    for ch in s.chars() {
        match ch {
            '"' => out.push_str("\\\""),
            '\\' => out.push_str("\\\\"),
            '/' => out.push_str("\\/"),
            '\u{8}' => out.push_str("\\b"),
            '\u{c}' => out.push_str("\\f"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            '\u{2028}' => out.push_str("\\u2028"),
            '\u{2029}' => out.push_str("\\u2029"),
            c if (c as u32) < 0x20 => out.push_str(&format!("\\u{:04x}", c as u32)),
            c if (c as u32) > 0xFFFF => {
                let v = c as u32 - 0x10000;
                let high = 0xD800 + (v >> 10);
                let low = 0xDC00 + (v & 0x3FF);
                out.push_str(&format!("\\u{high:04x}\\u{low:04x}"));
            }
            c => out.push(c),
        }
    }
    out.push('"');
    out
}

/// CLASSIC formatter style (SPEC_FULL §6): lower the AST to its JSON value
/// shape, then reuse this module's `Doc` construction with the formatter's
/// own indent/width settings rather than JSON's fixed 2-space default.
pub fn ast_to_json_doc_string(root: &ast::Root, options: &FormatOptions) -> String {
    let mut messages = Vec::new();
    let value = kson_syntax::value::lower(&root.child, &mut messages)
        .unwrap_or(Value::Null(root.child.location()));
    let doc = value_doc(&value, &JsonOptions::default());
    let print_opts = PrintOptions {
        print_width: options.print_width,
        indent: options.indent_type,
        force_flat: false,
    };
    let mut out = crate::doc::print(&doc, &print_opts);
    out.push('\n');
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use kson_syntax::analyze;

    fn render(src: &str) -> String {
        let value = analyze(src).value.expect("valid kson");
        to_json(&value, &JsonOptions::default())
    }

    #[test]
    fn unquoted_object_round_trips_to_json() {
        let out = render("key: \"value\"\nnumber: 42");
        assert_eq!(out, "{\n  \"key\": \"value\",\n  \"number\": 42\n}");
    }

    #[test]
    fn forward_slash_is_escaped() {
        assert_eq!(escape_json_string("a/b"), "\"a\\/b\"");
    }

    #[test]
    fn supplementary_plane_char_renders_as_surrogate_pair() {
        // U+1F600 GRINNING FACE = surrogate pair D83D DE00.
        assert_eq!(escape_json_string("\u{1F600}"), "\"\\ud83d\\ude00\"");
    }

    #[test]
    fn embed_block_renders_tag_retaining_object_by_default() {
        let out = render("script: %%bash\necho hi\n%%");
        assert!(out.contains("\"embedTag\": \"bash\""));
        assert!(out.contains("\"embedContent\""));
    }

    #[test]
    fn embed_block_renders_plain_string_when_tags_not_retained() {
        let value = analyze("script: %%bash\necho hi\n%%").value.unwrap();
        let out = to_json(&value, &JsonOptions {
            retain_embed_tags: false,
            ..JsonOptions::default()
        });
        assert!(out.contains("\"echo hi"));
        assert!(!out.contains("embedTag"));
    }

    #[test]
    fn duplicate_keys_keep_first_value() {
        let out = render("a: 1\na: 2");
        assert_eq!(out, "{\n  \"a\": 1\n}");
    }
}
