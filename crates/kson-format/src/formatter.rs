//! AST → KSON source (spec §4.6), in the four styles `FormatOptions`
//! selects. Walks `kson_syntax::ast::Value` rather than the lowered
//! `Value` so comments and quote/bracket style survive.

use kson_syntax::ast;
use kson_syntax::embed::EmbedDelim;
use kson_syntax::string::encode_basic;

use crate::doc::{Doc, IndentType, PrintOptions};
use crate::embed_rules::{matching_rule, PathStack};
use crate::options::{FormatOptions, FormattingStyle};

pub fn format(root: &ast::Root, options: &FormatOptions) -> String {
    if options.formatting_style == FormattingStyle::Classic {
        return crate::json::ast_to_json_doc_string(root, options);
    }

    let mut ctx = Ctx {
        style: options.formatting_style,
        rules: &options.embed_block_rules,
    };
    let mut path = PathStack::new();
    let doc = ctx.root_doc(root, &mut path);
    let print_opts = PrintOptions {
        print_width: options.print_width,
        indent: options.indent_type,
        force_flat: options.formatting_style == FormattingStyle::Compact,
    };
    let mut out = crate::doc::print(&doc, &print_opts);
    if !out.ends_with('\n') && options.formatting_style != FormattingStyle::Compact {
        out.push('\n');
    }
    out
}

struct Ctx<'a> {
    style: FormattingStyle,
    rules: &'a [crate::options::EmbedBlockRule],
}

impl<'a> Ctx<'a> {
    fn root_doc(&mut self, root: &ast::Root, path: &mut PathStack) -> Doc {
        let mut parts = Vec::new();
        for c in &root.leading {
            parts.push(Doc::text(format!("#{}", c.text)));
            parts.push(Doc::Hardline);
        }

        let unwrap_root_object = self.style == FormattingStyle::Plain;

        match (&root.child, unwrap_root_object) {
            (ast::Value::Object(obj), true) => parts.push(self.object_internals_doc(obj, path)),
            _ => parts.push(self.value_doc(&root.child, path)),
        }

        for c in &root.trailing {
            parts.push(Doc::Hardline);
            parts.push(Doc::text(format!("#{}", c.text)));
        }

        Doc::concat(parts)
    }

    fn value_doc(&mut self, value: &ast::Value, path: &mut PathStack) -> Doc {
        if let Some(rule) = self.embed_override(value, path) {
            return self.embed_block_from_string(value, rule.tag.clone());
        }

        match value {
            ast::Value::String(s) => self.string_doc(s),
            ast::Value::Number(n) => Doc::text(n.raw_lexeme.clone()),
            ast::Value::Boolean(b, _) => Doc::text(if *b { "true" } else { "false" }),
            ast::Value::Null(_) => Doc::text("null"),
            ast::Value::Object(obj) => self.object_doc(obj, path),
            ast::Value::List(list) => self.list_doc(list, path),
            ast::Value::EmbedBlock(e) => self.embed_block_doc(e),
            ast::Value::Error(e) => {
                // Formatting a tree with Error nodes is best-effort: emit
                // whatever partial value survived, or an empty object.
                e.partial
                    .as_ref()
                    .map_or_else(|| Doc::text("{}"), |p| self.value_doc(p, path))
            }
        }
    }

    fn embed_override(&self, value: &ast::Value, path: &mut PathStack) -> Option<crate::options::EmbedBlockRule> {
        if !matches!(value, ast::Value::String(_)) {
            return None;
        }
        matching_rule(&path.as_pointer(), self.rules).cloned()
    }

    fn string_doc(&self, s: &ast::StringNode) -> Doc {
        if self.style == FormattingStyle::Plain && s.quote_kind == ast::QuoteKind::Unquoted {
            return Doc::text(s.decoded_content.clone());
        }
        Doc::text(encode_basic(&s.decoded_content, '"'))
    }

    fn embed_block_doc(&self, e: &ast::EmbedBlockNode) -> Doc {
        let chosen_delim = choose_embed_delim(&e.content);
        let n = fence_length(&e.content, chosen_delim);
        let fence = chosen_delim.char().to_string().repeat(n);
        let tag = e.tag.clone().unwrap_or_default();
        let indent = kson_syntax::embed::minimum_indent(&e.content);
        let escaped = kson_syntax::embed::escape(&e.content, chosen_delim.char(), n);
        let indented = kson_syntax::embed::restore_indent(&escaped, indent);
        Doc::concat(vec![
            Doc::text(format!("{fence}{tag}")),
            Doc::Hardline,
            Doc::text(indented),
            Doc::text(fence),
        ])
    }

    fn embed_block_from_string(&self, value: &ast::Value, tag: Option<String>) -> Doc {
        let ast::Value::String(s) = value else {
            unreachable!("embed_override only returns Some for String nodes")
        };
        let delim = choose_embed_delim(&s.decoded_content);
        let n = fence_length(&s.decoded_content, delim);
        let fence = delim.char().to_string().repeat(n);
        let escaped = kson_syntax::embed::escape(&s.decoded_content, delim.char(), n);
        Doc::concat(vec![
            Doc::text(format!("{fence}{}", tag.unwrap_or_default())),
            Doc::Hardline,
            Doc::text(escaped),
            Doc::text(fence),
        ])
    }

    // Only the true root ever unwraps in PLAIN (handled in `root_doc` via
    // `object_internals_doc` directly); every object reached here is nested
    // and always keeps its braces, regardless of style.
    fn object_doc(&mut self, obj: &ast::ObjectNode, path: &mut PathStack) -> Doc {
        if obj.properties.is_empty() {
            return Doc::text("{}");
        }
        let internals = self.object_internals_doc(obj, path);
        Doc::group(Doc::concat(vec![
            Doc::text("{"),
            Doc::indent(Doc::concat(vec![Doc::Line, internals])),
            Doc::Line,
            Doc::text("}"),
        ]))
    }

    fn object_internals_doc(&mut self, obj: &ast::ObjectNode, path: &mut PathStack) -> Doc {
        let mut parts = Vec::new();
        for (i, prop) in obj.properties.iter().enumerate() {
            if i > 0 {
                parts.push(Doc::Hardline);
            }
            for c in &prop.trivia.leading {
                parts.push(Doc::text(format!("#{}", c.text)));
                parts.push(Doc::Hardline);
            }
            path.push_key(&prop.key.decoded_content);
            let value_doc = self.value_doc(&prop.value, path);
            path.pop();

            parts.push(Doc::concat(vec![self.string_doc(&prop.key), Doc::text(": "), value_doc]));
            let is_last = i + 1 == obj.properties.len();
            match self.style {
                // Plain omits the optional trailing comma; commas only
                // separate, never terminate, a line-per-property listing.
                FormattingStyle::Plain if is_last => {}
                _ => parts.push(Doc::text(",")),
            }
            for c in &prop.trivia.trailing {
                parts.push(Doc::text(format!(" #{}", c.text)));
            }
        }
        Doc::concat(parts)
    }

    fn list_doc(&mut self, list: &ast::ListNode, path: &mut PathStack) -> Doc {
        if list.elements.is_empty() {
            return Doc::text("[]");
        }
        if matches!(self.style, FormattingStyle::Plain) && list.style == ast::ListStyle::Dash {
            let mut parts = Vec::new();
            for (i, el) in list.elements.iter().enumerate() {
                if i > 0 {
                    parts.push(Doc::Hardline);
                }
                path.push_index(i);
                let doc = self.value_doc(el, path);
                path.pop();
                parts.push(Doc::concat(vec![Doc::text("- "), doc]));
            }
            return Doc::concat(parts);
        }

        let mut items = Vec::new();
        for (i, el) in list.elements.iter().enumerate() {
            if i > 0 {
                items.push(Doc::text(","));
                items.push(Doc::Line);
            }
            path.push_index(i);
            items.push(self.value_doc(el, path));
            path.pop();
        }
        Doc::group(Doc::concat(vec![
            Doc::text("["),
            Doc::indent(Doc::concat(vec![Doc::Softline, Doc::concat(items)])),
            Doc::Softline,
            Doc::text("]"),
        ]))
    }
}

/// Pick the embed delimiter character per spec §4.6: prefer `%` unless the
/// content's `%`-run length exceeds its `$`-run length.
fn choose_embed_delim(content: &str) -> EmbedDelim {
    let percent_run = kson_syntax::embed::longest_run(content, '%');
    let dollar_run = kson_syntax::embed::longest_run(content, '$');
    if dollar_run > percent_run {
        EmbedDelim::Dollar
    } else {
        EmbedDelim::Percent
    }
}

/// `N = max(2, K+1)` where `K` is the longest run of the chosen delimiter
/// character already present in `content` (spec §4.6).
fn fence_length(content: &str, delim: EmbedDelim) -> usize {
    let k = kson_syntax::embed::longest_run(content, delim.char());
    (k + 1).max(2)
}

#[cfg(test)]
mod tests {
    use super::*;
    use kson_syntax::analyze;

    fn format_source(src: &str, style: FormattingStyle) -> String {
        let analysis = analyze(src);
        let opts = FormatOptions {
            formatting_style: style,
            ..FormatOptions::default()
        };
        format(&analysis.root, &opts)
    }

    #[test]
    fn plain_style_unwraps_root_object() {
        let out = format_source("a: 1\nb: 2", FormattingStyle::Plain);
        assert!(!out.starts_with('{'), "root object unwrapped in PLAIN: {out}");
        assert!(out.contains("a: 1"));
    }

    #[test]
    fn plain_style_keeps_braces_on_nested_object() {
        let out = format_source("a: {b: 1, c: 2}", FormattingStyle::Plain);
        assert!(out.contains('{') && out.contains('}'), "nested object must keep braces: {out}");
        assert!(!out.contains("a: b: 1"), "nested object must not unwrap: {out}");
    }

    #[test]
    fn delimited_style_wraps_root_object() {
        let out = format_source("a: 1", FormattingStyle::Delimited);
        assert!(out.trim_end().starts_with('{'));
        assert!(out.trim_end().ends_with('}'));
    }

    #[test]
    fn compact_style_is_single_line() {
        let out = format_source("a: 1\nb: [1, 2, 3]", FormattingStyle::Compact);
        assert_eq!(out.lines().count(), 1);
    }

    #[test]
    fn dash_list_preserved_in_plain_style() {
        let out = format_source("items:\n  - 1\n  - 2", FormattingStyle::Plain);
        assert!(out.contains("- 1"));
        assert!(out.contains("- 2"));
    }

    #[test]
    fn comments_survive_formatting() {
        let out = format_source("# leading\nitems:\n  - 1\n  - 2", FormattingStyle::Plain);
        assert!(out.contains("# leading"));
    }

    #[test]
    fn embed_rule_renders_matched_string_as_embed_block() {
        let analysis = analyze("script: \"echo hi\"");
        let opts = FormatOptions {
            formatting_style: FormattingStyle::Plain,
            embed_block_rules: vec![crate::options::EmbedBlockRule {
                path_pattern: "/script".to_string(),
                tag: Some("bash".to_string()),
            }],
            ..FormatOptions::default()
        };
        let out = format(&analysis.root, &opts);
        assert!(out.contains("%%bash"));
        assert!(out.contains("echo hi"));
    }

    #[test]
    fn embed_block_round_trip_chooses_wider_fence() {
        let out = format_source("script: %%bash\necho \"%% not a close\"\n%%", FormattingStyle::Plain);
        assert!(out.contains("%%%bash") || out.contains("%%%\n"), "expected a wider fence: {out}");
    }
}
