//! KSON → YAML transpiler (spec §4.8): a comment-preserving renderer over
//! the AST (unlike the JSON renderer, YAML must keep comments, so it walks
//! `ast::Value` rather than the trivia-free `Value`).

use kson_syntax::ast;

#[derive(Debug, Clone, Copy)]
pub struct YamlOptions {
    pub retain_embed_tags: bool,
}

impl Default for YamlOptions {
    fn default() -> Self {
        Self {
            retain_embed_tags: true,
        }
    }
}

pub fn to_yaml(root: &ast::Root, options: &YamlOptions) -> String {
    let mut out = String::new();
    for c in &root.leading {
        out.push('#');
        out.push_str(&c.text);
        out.push('\n');
    }
    match &root.child {
        ast::Value::Object(obj) if !obj.properties.is_empty() => {
            write_object_internals(&mut out, obj, 0, options);
        }
        other => write_value(&mut out, other, 0, options),
    }
    for c in &root.trailing {
        out.push('#');
        out.push_str(&c.text);
        out.push('\n');
    }
    if !out.ends_with('\n') {
        out.push('\n');
    }
    out
}

fn indent_str(depth: usize) -> String {
    "  ".repeat(depth)
}

fn write_object_internals(out: &mut String, obj: &ast::ObjectNode, depth: usize, options: &YamlOptions) {
    for prop in &obj.properties {
        for c in &prop.trivia.leading {
            out.push_str(&indent_str(depth));
            out.push('#');
            out.push_str(&c.text);
            out.push('\n');
        }
        out.push_str(&indent_str(depth));
        out.push_str(&plain_or_quoted(&prop.key.decoded_content));
        out.push(':');
        write_property_value(out, &prop.value, depth, options);
        for c in &prop.trivia.trailing {
            out.push(' ');
            out.push('#');
            out.push_str(&c.text);
        }
        if !out.ends_with('\n') {
            out.push('\n');
        }
    }
}

fn write_property_value(out: &mut String, value: &ast::Value, depth: usize, options: &YamlOptions) {
    match value {
        ast::Value::Object(obj) if !obj.properties.is_empty() => {
            out.push('\n');
            write_object_internals(out, obj, depth + 1, options);
        }
        ast::Value::List(list) if !list.elements.is_empty() => {
            out.push('\n');
            write_list_items(out, list, depth, options);
        }
        ast::Value::EmbedBlock(e) => {
            out.push(' ');
            write_embed_value(out, e, depth, options);
        }
        other => {
            out.push(' ');
            write_value(out, other, depth, options);
        }
    }
}

fn write_list_items(out: &mut String, list: &ast::ListNode, depth: usize, options: &YamlOptions) {
    for element in &list.elements {
        out.push_str(&indent_str(depth));
        out.push_str("- ");
        match element {
            ast::Value::Object(obj) if !obj.properties.is_empty() => {
                // First property shares the `- ` line; rest indent to align.
                let mut buf = String::new();
                write_object_internals(&mut buf, obj, depth + 1, options);
                let mut lines = buf.lines();
                if let Some(first) = lines.next() {
                    out.push_str(first.trim_start());
                    out.push('\n');
                }
                for line in lines {
                    out.push_str(line);
                    out.push('\n');
                }
            }
            other => {
                write_value(out, other, depth + 1, options);
                out.push('\n');
            }
        }
    }
}

fn write_value(out: &mut String, value: &ast::Value, depth: usize, options: &YamlOptions) {
    match value {
        ast::Value::String(s) => out.push_str(&render_scalar(&s.decoded_content)),
        ast::Value::Number(n) => out.push_str(&n.raw_lexeme),
        ast::Value::Boolean(b, _) => out.push_str(if *b { "true" } else { "false" }),
        ast::Value::Null(_) => out.push_str("null"),
        ast::Value::Object(obj) if obj.properties.is_empty() => out.push_str("{}"),
        ast::Value::Object(obj) => write_object_internals(out, obj, depth, options),
        ast::Value::List(list) if list.elements.is_empty() => out.push_str("[]"),
        ast::Value::List(list) => write_list_items(out, list, depth, options),
        ast::Value::EmbedBlock(e) => write_embed_value(out, e, depth, options),
        ast::Value::Error(_) => out.push_str("null"),
    }
}

fn write_embed_value(out: &mut String, e: &ast::EmbedBlockNode, depth: usize, options: &YamlOptions) {
    if options.retain_embed_tags && e.tag.is_some() {
        out.push('\n');
        let tag = e.tag.as_deref().unwrap_or_default();
        out.push_str(&indent_str(depth + 1));
        out.push_str("embedTag: ");
        out.push_str(&render_scalar(tag));
        out.push('\n');
        out.push_str(&indent_str(depth + 1));
        out.push_str("embedContent: ");
        out.push_str(&render_scalar(&e.content));
        return;
    }
    // Untagged embed blocks render as a literal block scalar.
    out.push_str("|\n");
    for line in e.content.lines() {
        out.push_str(&indent_str(depth + 1));
        out.push_str(line);
        out.push('\n');
    }
    out.pop();
}

/// YAML plain-scalar eligibility follows a conservative denylist
/// (SPEC_FULL §7): anything ambiguous with YAML's own grammar, or that
/// looks like a number/boolean/null, is double-quoted instead.
fn render_scalar(s: &str) -> String {
    if needs_quoting(s) {
        quote(s)
    } else {
        plain_or_quoted(s)
    }
}

fn plain_or_quoted(s: &str) -> String {
    if needs_quoting(s) {
        quote(s)
    } else {
        s.to_string()
    }
}

fn needs_quoting(s: &str) -> bool {
    if s.is_empty() {
        return true;
    }
    if s.trim() != s {
        return true;
    }
    if s.contains(": ") || s.ends_with(':') {
        return true;
    }
    if s.contains(" #") {
        return true;
    }
    let first = s.chars().next().unwrap();
    if "-?:,[]{}#&*!|>'\"%@`".contains(first) {
        return true;
    }
    matches!(s, "true" | "false" | "null" | "~" | "True" | "False" | "Null") || looks_numeric(s)
}

fn looks_numeric(s: &str) -> bool {
    s.parse::<i64>().is_ok() || s.parse::<f64>().is_ok()
}

/// YAML double-quote escaping: mirrors JSON's except YAML has no `\/`, so
/// a KSON `\/` escape renders as a bare `/` (spec §4.8).
fn quote(s: &str) -> String {
    let mut out = String::with_capacity(s.len() + 2);
    out.push('"');
    for ch in s.chars() {
        match ch {
            '"' => out.push_str("\\\""),
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            c if (c as u32) < 0x20 => out.push_str(&format!("\\x{:02x}", c as u32)),
            c => out.push(c),
        }
    }
    out.push('"');
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use kson_syntax::analyze;

    fn render(src: &str) -> String {
        to_yaml(&analyze(src).root, &YamlOptions::default())
    }

    #[test]
    fn dash_list_with_leading_comment() {
        let out = render("# leading\nitems:\n  - 1\n  - 2");
        assert_eq!(out, "# leading\nitems:\n  - 1\n  - 2\n");
    }

    #[test]
    fn string_requiring_quotes_is_double_quoted() {
        let out = render("key: \"a: b\"");
        assert!(out.contains("\"a: b\""));
    }

    #[test]
    fn plain_scalar_used_when_safe() {
        let out = render("key: \"hello\"");
        assert_eq!(out, "key: hello\n");
    }

    #[test]
    fn forward_slash_escape_becomes_bare_slash() {
        // decoded_content already has the literal `/`, since the lexer's
        // string transformer decodes `\/` to `/` before the AST is built.
        let out = render("path: \"a\\/b\"");
        assert!(out.contains("a/b"));
    }

    #[test]
    fn untagged_embed_block_renders_as_literal_scalar() {
        let out = render("script: %%\necho hi\n%%");
        assert!(out.contains("script: |"));
        assert!(out.contains("echo hi"));
    }
}
