//! Draft-7 JSON-Schema validation over the KSON value model (spec §4.9).
//!
//! The public surface mirrors spec §6 exactly: [`parse_schema`] compiles a
//! schema document once into a [`SchemaValidator`], which can then validate
//! any number of KSON/JSON instance documents without recompiling.

pub mod compile;
pub mod pointer;
pub mod regex_compat;
pub mod types;
pub mod validate;

use kson_diagnostics::Diagnostic;

pub use compile::CompileOptions;
pub use types::JsonType;

/// A compiled, immutable, reusable Draft-7 schema.
pub struct SchemaValidator {
    arena: compile::Arena,
    recursion_limit: u32,
}

impl SchemaValidator {
    /// Validate `source` (KSON or JSON text) against this schema.
    ///
    /// `filepath` is carried only for callers that want it in their own
    /// reporting; diagnostics themselves are anchored purely by
    /// [`kson_diagnostics::Location`], so it has no effect on validation.
    pub fn validate(&self, source: &str, _filepath: Option<&str>) -> Vec<Diagnostic> {
        let analysis = kson_syntax::analyze(source);
        let mut messages = analysis.messages;
        if let Some(value) = analysis.value {
            messages.extend(validate::validate(&self.arena, self.recursion_limit, &value));
        }
        messages
    }
}

/// Parse and compile `source` as a Draft-7 schema document.
///
/// Returns `Err` with the accumulated diagnostics if `source` itself fails
/// to parse as KSON, or if schema compilation hits an unresolvable `$ref`,
/// invalid `pattern` regex, or other compile-time problem (spec §4.9,
/// §7 "Schema compile" category) — in both cases no `SchemaValidator` is
/// produced, matching the "no errors -> no value" invariant the rest of the
/// engine follows.
pub fn parse_schema(source: &str) -> Result<SchemaValidator, Vec<Diagnostic>> {
    parse_schema_with_options(source, CompileOptions::default())
}

pub fn parse_schema_with_options(
    source: &str,
    options: CompileOptions,
) -> Result<SchemaValidator, Vec<Diagnostic>> {
    let analysis = kson_syntax::analyze(source);
    if kson_diagnostics::has_errors(&analysis.messages) {
        return Err(analysis.messages);
    }
    let Some(schema_value) = analysis.value else {
        return Err(analysis.messages);
    };

    let (arena, compile_diags) = compile::compile(&schema_value, options);
    let mut messages = analysis.messages;
    messages.extend(compile_diags.iter().cloned());
    if kson_diagnostics::has_errors(&messages) {
        return Err(messages);
    }

    Ok(SchemaValidator {
        arena,
        recursion_limit: options.recursion_limit,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn end_to_end_valid_instance() {
        let validator = parse_schema("type: \"object\"\nrequired: [\"name\"]").unwrap();
        let messages = validator.validate("{ name: \"ada\" }", None);
        assert!(messages.is_empty());
    }

    #[test]
    fn end_to_end_invalid_instance_reports_diagnostic() {
        let validator = parse_schema("required: [\"name\"]").unwrap();
        let messages = validator.validate("{}", None);
        assert_eq!(messages.len(), 1);
    }

    #[test]
    fn malformed_schema_source_fails_to_compile() {
        let result = parse_schema("{ unterminated");
        assert!(result.is_err());
    }

    #[test]
    fn same_validator_reused_across_many_instances() {
        let validator = parse_schema("type: \"number\"").unwrap();
        assert!(validator.validate("1", None).is_empty());
        assert!(!validator.validate("\"no\"", None).is_empty());
    }
}
