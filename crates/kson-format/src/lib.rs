//! Formatter, JSON renderer, and YAML renderer for KSON (spec §4.6-4.8).
//!
//! All three are pure functions: the formatter over the AST (it needs
//! trivia), the renderers over the canonical `Value` for JSON and over the
//! AST for YAML (comments must survive).

pub mod doc;
pub mod embed_rules;
pub mod formatter;
pub mod json;
pub mod options;
pub mod yaml;

use kson_diagnostics::{Diagnostic, has_errors};

pub use json::JsonOptions;
pub use options::{EmbedBlockRule, FormatOptions, FormattingStyle, IndentType};
pub use yaml::YamlOptions;

/// `format(source, format_options) -> source` (spec §6).
///
/// Returns the diagnostics instead of a string when `source` fails to
/// parse; a malformed document has no AST worth reformatting.
#[tracing::instrument(level = "debug", skip_all, fields(style = ?options.formatting_style))]
pub fn format(source: &str, options: &FormatOptions) -> Result<String, Vec<Diagnostic>> {
    let analysis = kson_syntax::analyze(source);
    if has_errors(&analysis.messages) {
        return Err(analysis.messages);
    }
    Ok(formatter::format(&analysis.root, options))
}

/// `to_json(source, { retain_embed_tags }) -> Result<string, messages>`.
pub fn to_json(source: &str, options: &JsonOptions) -> Result<String, Vec<Diagnostic>> {
    let analysis = kson_syntax::analyze(source);
    if has_errors(&analysis.messages) {
        return Err(analysis.messages);
    }
    let Some(value) = analysis.value else {
        return Err(analysis.messages);
    };
    let mut out = json::to_json(&value, options);
    out.push('\n');
    Ok(out)
}

/// `to_yaml(source, { retain_embed_tags }) -> Result<string, messages>`.
pub fn to_yaml(source: &str, options: &YamlOptions) -> Result<String, Vec<Diagnostic>> {
    let analysis = kson_syntax::analyze(source);
    if has_errors(&analysis.messages) {
        return Err(analysis.messages);
    }
    Ok(yaml::to_yaml(&analysis.root, options))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn format_rejects_malformed_input() {
        let result = format("{ unterminated", &FormatOptions::default());
        assert!(result.is_err());
    }

    #[test]
    fn to_json_scenario_a() {
        let out = to_json("key: \"value\"\nnumber: 42", &JsonOptions::default()).unwrap();
        let parsed: serde_json::Value = serde_json::from_str(&out).expect("valid JSON");
        assert_eq!(parsed["key"], "value");
        assert_eq!(parsed["number"], 42);
    }

    #[test]
    fn to_yaml_scenario_b() {
        let out = to_yaml("# leading\nitems:\n  - 1\n  - 2", &YamlOptions::default()).unwrap();
        assert_eq!(out, "# leading\nitems:\n  - 1\n  - 2\n");
    }

    #[test]
    fn format_is_idempotent_for_compact_style() {
        let opts = FormatOptions {
            formatting_style: FormattingStyle::Compact,
            ..FormatOptions::default()
        };
        let once = format("a: 1\nb: [1, 2]", &opts).unwrap();
        let twice = format(&once, &opts).unwrap();
        assert_eq!(once, twice);
    }
}
