//! Recursive Draft-7 validation against a compiled [`crate::compile::Arena`]
//! (spec §4.9). Produces a flat `Vec<Diagnostic>`, document order, one entry
//! per keyword failure — there is no tree of nested validation errors to
//! walk, matching the diagnostics-as-values model the rest of the engine
//! uses (spec §4.10).

use std::collections::HashSet;

use kson_diagnostics::{Diagnostic, DiagnosticKind, Location};
use kson_syntax::Value;

use crate::compile::{Arena, CompiledSchema, DependencyEntry, ItemsPolicy, Keyword, OpenPolicy};
use crate::types::{schema_eq, JsonType};

/// `(schema arena index, value identity)` pairs already being validated on
/// the current path — a value's `Location` stands in for identity, since
/// distinct source positions can never alias (spec §4.9: "a `(schema_id,
/// value_identity)` visited set tolerates cycles introduced by recursive
/// `$ref`s without a fixed recursion budget").
type Visited = HashSet<(usize, (u32, u32))>;

pub struct Validator<'a> {
    arena: &'a Arena,
    recursion_limit: u32,
}

impl<'a> Validator<'a> {
    pub fn new(arena: &'a Arena, recursion_limit: u32) -> Self {
        Self {
            arena,
            recursion_limit,
        }
    }

    pub fn validate(&self, value: &Value) -> Vec<Diagnostic> {
        let mut diagnostics = Vec::new();
        let mut visited = Visited::new();
        self.validate_at(self.arena.root, value, 0, &mut visited, &mut diagnostics);
        diagnostics
    }

    fn identity(value: &Value) -> (u32, u32) {
        let loc = value.location();
        (loc.start.offset, loc.end.offset)
    }

    fn validate_at(
        &self,
        schema_idx: usize,
        value: &Value,
        depth: u32,
        visited: &mut Visited,
        out: &mut Vec<Diagnostic>,
    ) {
        if depth >= self.recursion_limit {
            out.push(Diagnostic::new(
                DiagnosticKind::RecursionLimitExceeded(self.recursion_limit),
                value.location(),
            ));
            return;
        }
        let key = (schema_idx, Self::identity(value));
        if !visited.insert(key) {
            return;
        }

        let schema = &self.arena.schemas[schema_idx];
        if let Some(allowed) = schema.boolean_schema {
            if !allowed {
                out.push(Diagnostic::new(
                    DiagnosticKind::TypeMismatch {
                        expected: "nothing (schema is `false`)".to_string(),
                        actual: value.type_name().to_string(),
                    },
                    value.location(),
                ));
            }
            return;
        }

        for keyword in &schema.keywords {
            self.check_keyword(keyword, value, depth, visited, out);
        }
    }

    #[allow(clippy::too_many_lines)]
    fn check_keyword(
        &self,
        keyword: &Keyword,
        value: &Value,
        depth: u32,
        visited: &mut Visited,
        out: &mut Vec<Diagnostic>,
    ) {
        match keyword {
            Keyword::Type(types) => {
                if !types.iter().any(|t| t.matches(value)) {
                    out.push(Diagnostic::new(
                        DiagnosticKind::TypeMismatch {
                            expected: types.iter().map(|t| t.name()).collect::<Vec<_>>().join(" | "),
                            actual: value.type_name().to_string(),
                        },
                        value.location(),
                    ));
                }
            }
            Keyword::Enum(values) => {
                if !values.iter().any(|v| schema_eq(v, value)) {
                    out.push(Diagnostic::new(DiagnosticKind::EnumMismatch, value.location()));
                }
            }
            Keyword::Const(expected) => {
                if !schema_eq(expected, value) {
                    out.push(Diagnostic::new(DiagnosticKind::ConstMismatch, value.location()));
                }
            }
            Keyword::Properties(props) => {
                let Value::Object(map, _) = value else { return };
                for (key, &schema_idx) in props {
                    if let Some(child) = map.get(key) {
                        self.validate_at(schema_idx, child, depth + 1, visited, out);
                    }
                }
            }
            Keyword::PatternProperties(patterns) => {
                let Value::Object(map, _) = value else { return };
                for (key, child) in map {
                    for (pattern, schema_idx) in patterns {
                        if pattern.is_match(key) {
                            self.validate_at(*schema_idx, child, depth + 1, visited, out);
                        }
                    }
                }
            }
            Keyword::AdditionalProperties(policy) => {
                let Value::Object(map, _) = value else { return };
                let declared = self.declared_property_names(value);
                for (key, child) in map {
                    if declared.contains(key.as_str()) {
                        continue;
                    }
                    match policy {
                        OpenPolicy::Allow => {}
                        OpenPolicy::Deny => out.push(Diagnostic::new(
                            DiagnosticKind::AdditionalPropertyNotAllowed(key.clone()),
                            child.location(),
                        )),
                        OpenPolicy::Schema(schema_idx) => {
                            self.validate_at(*schema_idx, child, depth + 1, visited, out);
                        }
                    }
                }
            }
            Keyword::Required(names) => {
                let Value::Object(map, loc) = value else { return };
                for name in names {
                    if !map.contains_key(name) {
                        out.push(Diagnostic::new(DiagnosticKind::RequiredMissing(name.clone()), *loc));
                    }
                }
            }
            Keyword::PropertyNames(schema_idx) => {
                let Value::Object(map, _) = value else { return };
                for key in map.keys() {
                    let key_value = Value::String(key.clone(), value.location());
                    let mut sub_diags = Vec::new();
                    self.validate_at(*schema_idx, &key_value, depth + 1, visited, &mut sub_diags);
                    if !sub_diags.is_empty() {
                        out.push(Diagnostic::new(
                            DiagnosticKind::PropertyNamesMismatch(key.clone()),
                            value.location(),
                        ));
                    }
                }
            }
            Keyword::Dependencies(deps) => {
                let Value::Object(map, loc) = value else { return };
                for (key, entry) in deps {
                    if !map.contains_key(key) {
                        continue;
                    }
                    match entry {
                        DependencyEntry::Required(names) => {
                            for name in names {
                                if !map.contains_key(name) {
                                    out.push(Diagnostic::new(
                                        DiagnosticKind::DependencyMissing(name.clone(), key.clone()),
                                        *loc,
                                    ));
                                }
                            }
                        }
                        DependencyEntry::Schema(schema_idx) => {
                            self.validate_at(*schema_idx, value, depth + 1, visited, out);
                        }
                    }
                }
            }
            Keyword::Items(policy) => {
                let Value::List(items, _) = value else { return };
                match policy {
                    ItemsPolicy::Single(schema_idx) => {
                        for item in items {
                            self.validate_at(*schema_idx, item, depth + 1, visited, out);
                        }
                    }
                    ItemsPolicy::Tuple(schemas) => {
                        for (item, &schema_idx) in items.iter().zip(schemas) {
                            self.validate_at(schema_idx, item, depth + 1, visited, out);
                        }
                    }
                }
            }
            Keyword::AdditionalItems(policy) => {
                let Value::List(items, _) = value else { return };
                let tuple_len = self.tuple_length(value);
                let Some(tuple_len) = tuple_len else { return };
                for (i, item) in items.iter().enumerate().skip(tuple_len) {
                    match policy {
                        OpenPolicy::Allow => {}
                        OpenPolicy::Deny => {
                            out.push(Diagnostic::new(DiagnosticKind::AdditionalItemNotAllowed(i), item.location()));
                        }
                        OpenPolicy::Schema(schema_idx) => {
                            self.validate_at(*schema_idx, item, depth + 1, visited, out);
                        }
                    }
                }
            }
            Keyword::Contains(schema_idx) => {
                let Value::List(items, loc) = value else { return };
                let any_match = items.iter().any(|item| {
                    let mut sub = Vec::new();
                    self.validate_at(*schema_idx, item, depth + 1, visited, &mut sub);
                    sub.is_empty()
                });
                if !any_match {
                    out.push(Diagnostic::new(DiagnosticKind::ContainsMismatch, *loc));
                }
            }
            Keyword::MinItems(n) => {
                let Value::List(items, loc) = value else { return };
                if (items.len() as u64) < *n {
                    out.push(Diagnostic::new(
                        DiagnosticKind::MinItems {
                            expected: *n,
                            actual: items.len(),
                        },
                        *loc,
                    ));
                }
            }
            Keyword::MaxItems(n) => {
                let Value::List(items, loc) = value else { return };
                if (items.len() as u64) > *n {
                    out.push(Diagnostic::new(
                        DiagnosticKind::MaxItems {
                            expected: *n,
                            actual: items.len(),
                        },
                        *loc,
                    ));
                }
            }
            Keyword::UniqueItems => {
                let Value::List(items, _) = value else { return };
                for i in 0..items.len() {
                    for j in (i + 1)..items.len() {
                        if schema_eq(&items[i], &items[j]) {
                            out.push(Diagnostic::new(
                                DiagnosticKind::UniqueItemsViolation(i, j),
                                value.location(),
                            ));
                        }
                    }
                }
            }
            Keyword::Minimum(n) => self.numeric_check(value, |x| x >= *n, DiagnosticKind::Minimum(*n), out),
            Keyword::Maximum(n) => self.numeric_check(value, |x| x <= *n, DiagnosticKind::Maximum(*n), out),
            Keyword::ExclusiveMinimum(n) => {
                self.numeric_check(value, |x| x > *n, DiagnosticKind::ExclusiveMinimum(*n), out);
            }
            Keyword::ExclusiveMaximum(n) => {
                self.numeric_check(value, |x| x < *n, DiagnosticKind::ExclusiveMaximum(*n), out);
            }
            Keyword::MultipleOf(n) => {
                self.numeric_check(value, |x| ((x / n) - (x / n).round()).abs() < 1e-9, DiagnosticKind::MultipleOf(*n), out);
            }
            Keyword::MinLength(n) => {
                let Some(s) = value.as_str() else { return };
                let len = s.chars().count() as u64;
                if len < *n {
                    out.push(Diagnostic::new(
                        DiagnosticKind::MinLength {
                            expected: *n,
                            actual: len as usize,
                        },
                        value.location(),
                    ));
                }
            }
            Keyword::MaxLength(n) => {
                let Some(s) = value.as_str() else { return };
                let len = s.chars().count() as u64;
                if len > *n {
                    out.push(Diagnostic::new(
                        DiagnosticKind::MaxLength {
                            expected: *n,
                            actual: len as usize,
                        },
                        value.location(),
                    ));
                }
            }
            Keyword::Pattern(re) => {
                let Some(s) = value.as_str() else { return };
                if !re.is_match(s) {
                    out.push(Diagnostic::new(
                        DiagnosticKind::PatternMismatch(re.as_str().to_string()),
                        value.location(),
                    ));
                }
            }
            Keyword::AllOf(schemas) => {
                let before = out.len();
                for &schema_idx in schemas {
                    self.validate_at(schema_idx, value, depth + 1, visited, out);
                }
                if out.len() > before {
                    out.insert(before, Diagnostic::new(DiagnosticKind::AllOfMismatch, value.location()));
                }
            }
            Keyword::AnyOf(schemas) => {
                let matches = schemas.iter().any(|&schema_idx| {
                    let mut sub = Vec::new();
                    self.validate_at(schema_idx, value, depth + 1, visited, &mut sub);
                    sub.is_empty()
                });
                if !matches {
                    out.push(Diagnostic::new(DiagnosticKind::AnyOfMismatch, value.location()));
                }
            }
            Keyword::OneOf(schemas) => {
                let count = schemas
                    .iter()
                    .filter(|&&schema_idx| {
                        let mut sub = Vec::new();
                        self.validate_at(schema_idx, value, depth + 1, visited, &mut sub);
                        sub.is_empty()
                    })
                    .count();
                if count != 1 {
                    out.push(Diagnostic::new(DiagnosticKind::OneOfMismatch(count), value.location()));
                }
            }
            Keyword::Not(schema_idx) => {
                let mut sub = Vec::new();
                self.validate_at(*schema_idx, value, depth + 1, visited, &mut sub);
                if sub.is_empty() {
                    out.push(Diagnostic::new(DiagnosticKind::NotMismatch, value.location()));
                }
            }
            Keyword::IfThenElse { if_, then_, else_ } => {
                let mut sub = Vec::new();
                self.validate_at(*if_, value, depth + 1, visited, &mut sub);
                let branch = if sub.is_empty() { *then_ } else { *else_ };
                if let Some(schema_idx) = branch {
                    self.validate_at(schema_idx, value, depth + 1, visited, out);
                }
            }
        }
    }

    fn numeric_check(&self, value: &Value, ok: impl Fn(f64) -> bool, kind: DiagnosticKind, out: &mut Vec<Diagnostic>) {
        let Value::Number(n, loc) = value else { return };
        if !ok(n.as_f64()) {
            out.push(Diagnostic::new(kind, *loc));
        }
    }

    /// All property names declared by `properties`/`patternProperties` on
    /// the schemas covering `value` — used by `additionalProperties` so it
    /// only restricts names no declared keyword already accounted for.
    fn declared_property_names(&self, value: &Value) -> HashSet<String> {
        let mut names = HashSet::new();
        self.collect_declared_names(self.arena.root, value, &mut names, &mut HashSet::new());
        names
    }

    fn collect_declared_names(&self, schema_idx: usize, value: &Value, names: &mut HashSet<String>, seen: &mut HashSet<usize>) {
        if !seen.insert(schema_idx) {
            return;
        }
        let Value::Object(map, _) = value else { return };
        let schema = &self.arena.schemas[schema_idx];
        for keyword in &schema.keywords {
            match keyword {
                Keyword::Properties(props) => names.extend(props.keys().cloned()),
                Keyword::PatternProperties(patterns) => {
                    for key in map.keys() {
                        if patterns.iter().any(|(re, _)| re.is_match(key)) {
                            names.insert(key.clone());
                        }
                    }
                }
                Keyword::AllOf(schemas) => {
                    for &idx in schemas {
                        self.collect_declared_names(idx, value, names, seen);
                    }
                }
                _ => {}
            }
        }
    }

    fn tuple_length(&self, value: &Value) -> Option<usize> {
        let schema = self.find_items_tuple(self.arena.root, value, &mut HashSet::new())?;
        Some(schema)
    }

    fn find_items_tuple(&self, schema_idx: usize, _value: &Value, seen: &mut HashSet<usize>) -> Option<usize> {
        if !seen.insert(schema_idx) {
            return None;
        }
        let schema = &self.arena.schemas[schema_idx];
        schema.keywords.iter().find_map(|keyword| match keyword {
            Keyword::Items(ItemsPolicy::Tuple(schemas)) => Some(schemas.len()),
            _ => None,
        })
    }
}

/// Validate `value` against a compiled schema without cycle-visiting state
/// leaking between independent top-level calls.
pub fn validate(arena: &Arena, recursion_limit: u32, value: &Value) -> Vec<Diagnostic> {
    Validator::new(arena, recursion_limit).validate(value)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compile::{compile, CompileOptions};
    use kson_syntax::analyze;

    fn check(schema_src: &str, value_src: &str) -> Vec<Diagnostic> {
        let schema_value = analyze(schema_src).value.expect("valid schema kson");
        let (arena, compile_diags) = compile(&schema_value, CompileOptions::default());
        assert!(compile_diags.is_empty(), "{compile_diags:?}");
        let value = analyze(value_src).value.expect("valid instance kson");
        validate(&arena, 512, &value)
    }

    #[test]
    fn type_mismatch_is_reported() {
        let diags = check("type: \"string\"", "42");
        assert_eq!(diags.len(), 1);
        assert!(matches!(diags[0].kind, DiagnosticKind::TypeMismatch { .. }));
    }

    #[test]
    fn required_property_missing() {
        let diags = check("required: [\"name\"]", "{}");
        assert!(matches!(diags[0].kind, DiagnosticKind::RequiredMissing(ref s) if s == "name"));
    }

    #[test]
    fn additional_properties_denied() {
        let diags = check(
            "properties: { a: { type: \"number\" } }\nadditionalProperties: false",
            "{ a: 1, b: 2 }",
        );
        assert!(matches!(diags[0].kind, DiagnosticKind::AdditionalPropertyNotAllowed(ref s) if s == "b"));
    }

    #[test]
    fn minimum_and_maximum_enforced() {
        let diags = check("minimum: 0\nmaximum: 10", "-1");
        assert!(diags.iter().any(|d| matches!(d.kind, DiagnosticKind::Minimum(_))));
    }

    #[test]
    fn one_of_requires_exactly_one_match() {
        let diags = check("oneOf: [{ type: \"string\" }, { type: \"number\" }]", "\"hi\"");
        assert!(diags.is_empty());
        let diags = check("oneOf: [{ type: \"string\" }, { minLength: 1 }]", "\"hi\"");
        assert!(matches!(diags[0].kind, DiagnosticKind::OneOfMismatch(2)));
    }

    #[test]
    fn valid_document_produces_no_diagnostics() {
        let diags = check(
            "type: \"object\"\nproperties: { name: { type: \"string\" } }\nrequired: [\"name\"]",
            "{ name: \"ada\" }",
        );
        assert!(diags.is_empty());
    }

    #[test]
    fn cyclic_schema_terminates_on_recursive_value() {
        let schema_value = analyze(
            "definitions: { node: { properties: { next: { $ref: \"#/definitions/node\" } } } }\n$ref: \"#/definitions/node\"",
        )
        .value
        .unwrap();
        let (arena, _) = compile(&schema_value, CompileOptions::default());
        let instance = analyze("{ next: { next: {} } }").value.unwrap();
        let diags = validate(&arena, 512, &instance);
        assert!(diags.is_empty());
    }
}
