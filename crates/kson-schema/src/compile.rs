//! Compile a [`kson_syntax::Value`] schema document into a flat arena of
//! [`CompiledSchema`]s (spec §4.9, SPEC_FULL §8): one tagged-union
//! [`Keyword`] variant per Draft-7 keyword, `$ref`/`$id` resolved once at
//! compile time to arena indices so validation never re-walks a pointer.

use std::collections::HashMap;

use indexmap::IndexMap;
use kson_diagnostics::{Diagnostic, DiagnosticKind, Location};
use kson_syntax::Value;

use crate::pointer;
use crate::regex_compat::normalize_ecma_regex;
use crate::types::JsonType;

/// How an `additionalProperties`/`additionalItems`-shaped keyword restricts
/// what's left over: allow anything, reject everything, or validate it
/// against a subschema.
#[derive(Debug, Clone, PartialEq)]
pub enum OpenPolicy {
    Allow,
    Deny,
    Schema(usize),
}

#[derive(Debug, Clone, PartialEq)]
pub enum ItemsPolicy {
    /// `items` is a single schema applied to every element.
    Single(usize),
    /// `items` is a tuple of per-position schemas.
    Tuple(Vec<usize>),
}

#[derive(Debug, Clone, PartialEq)]
pub enum DependencyEntry {
    /// Presence of the property requires these other properties.
    Required(Vec<String>),
    /// Presence of the property requires the whole object to match a schema.
    Schema(usize),
}

#[derive(Debug, Clone, PartialEq)]
pub enum Keyword {
    Type(Vec<JsonType>),
    Enum(Vec<Value>),
    Const(Value),
    Properties(IndexMap<String, usize>),
    PatternProperties(Vec<(regex::Regex, usize)>),
    AdditionalProperties(OpenPolicy),
    Required(Vec<String>),
    PropertyNames(usize),
    Dependencies(Vec<(String, DependencyEntry)>),
    Items(ItemsPolicy),
    AdditionalItems(OpenPolicy),
    Contains(usize),
    MinItems(u64),
    MaxItems(u64),
    UniqueItems,
    Minimum(f64),
    Maximum(f64),
    ExclusiveMinimum(f64),
    ExclusiveMaximum(f64),
    MultipleOf(f64),
    MinLength(u64),
    MaxLength(u64),
    Pattern(regex::Regex),
    AllOf(Vec<usize>),
    AnyOf(Vec<usize>),
    OneOf(Vec<usize>),
    Not(usize),
    IfThenElse {
        if_: usize,
        then_: Option<usize>,
        else_: Option<usize>,
    },
}

/// A schema compiled into the arena: either a boolean schema (`true`/`false`,
/// legal anywhere a schema is expected in Draft-7) or a set of keywords that
/// all must hold.
#[derive(Debug, Clone, PartialEq)]
pub struct CompiledSchema {
    pub boolean_schema: Option<bool>,
    pub keywords: Vec<Keyword>,
    pub location: Location,
}

impl CompiledSchema {
    fn always(value: bool, location: Location) -> Self {
        Self {
            boolean_schema: Some(value),
            keywords: Vec::new(),
            location,
        }
    }
}

/// Options controlling schema compilation, threaded in from the CLI/library
/// caller. Not serde-backed (SPEC_FULL §0): these are never persisted.
#[derive(Debug, Clone, Copy)]
pub struct CompileOptions {
    pub recursion_limit: u32,
}

impl Default for CompileOptions {
    fn default() -> Self {
        Self { recursion_limit: 512 }
    }
}

pub struct Arena {
    pub schemas: Vec<CompiledSchema>,
    pub root: usize,
}

struct Compiler<'a> {
    root_value: &'a Value,
    arena: Vec<CompiledSchema>,
    /// JSON-pointer path (already resolved through `$ref`) -> arena index.
    /// Doubles as the cycle breaker: a pointer is inserted before its
    /// children are compiled, so a `$ref` back to an ancestor resolves to
    /// the already-reserved slot instead of recursing forever.
    by_pointer: HashMap<String, usize>,
    /// `$id` value -> json pointer, collected in a pre-pass.
    id_registry: HashMap<String, String>,
    diagnostics: Vec<Diagnostic>,
    options: CompileOptions,
}

#[tracing::instrument(level = "debug", skip_all)]
pub fn compile(root_value: &Value, options: CompileOptions) -> (Arena, Vec<Diagnostic>) {
    let mut compiler = Compiler {
        root_value,
        arena: Vec::new(),
        by_pointer: HashMap::new(),
        id_registry: HashMap::new(),
        diagnostics: Vec::new(),
        options,
    };
    collect_ids(root_value, String::new(), &mut compiler.id_registry);
    tracing::trace!(ids = compiler.id_registry.len(), "collected $id registry");
    let root = compiler.compile_pointer(String::new(), 0);
    tracing::debug!(schemas = compiler.arena.len(), "compiled schema arena");
    (
        Arena {
            schemas: compiler.arena,
            root,
        },
        compiler.diagnostics,
    )
}

fn collect_ids(value: &Value, pointer: String, out: &mut HashMap<String, String>) {
    if let Value::Object(map, _) = value {
        if let Some(Value::String(id, _)) = map.get("$id") {
            out.insert(id.clone(), pointer.clone());
        }
        for (key, child) in map {
            collect_ids(child, format!("{pointer}/{}", escape_pointer_segment(key)), out);
        }
    } else if let Value::List(items, _) = value {
        for (i, child) in items.iter().enumerate() {
            collect_ids(child, format!("{pointer}/{i}"), out);
        }
    }
}

fn escape_pointer_segment(segment: &str) -> String {
    segment.replace('~', "~0").replace('/', "~1")
}

impl<'a> Compiler<'a> {
    fn compile_pointer(&mut self, ptr: String, depth: u32) -> usize {
        if let Some(&idx) = self.by_pointer.get(&ptr) {
            return idx;
        }
        let Some(value) = pointer::navigate(self.root_value, &ptr) else {
            let idx = self.arena.len();
            self.arena.push(CompiledSchema::always(true, self.root_value.location()));
            self.by_pointer.insert(ptr.clone(), idx);
            self.diagnostics.push(Diagnostic::new(
                DiagnosticKind::SchemaUnresolvedRef(ptr),
                self.root_value.location(),
            ));
            return idx;
        };
        self.compile_value(value, ptr, depth)
    }

    fn compile_value(&mut self, value: &Value, ptr: String, depth: u32) -> usize {
        let idx = self.arena.len();
        self.arena.push(CompiledSchema::always(true, value.location()));
        self.by_pointer.insert(ptr.clone(), idx);

        if depth >= self.options.recursion_limit {
            self.diagnostics.push(Diagnostic::new(
                DiagnosticKind::RecursionLimitExceeded(self.options.recursion_limit),
                value.location(),
            ));
            return idx;
        }

        match value {
            Value::Boolean(b, loc) => {
                self.arena[idx] = CompiledSchema::always(*b, *loc);
            }
            Value::Object(map, loc) => {
                let keywords = self.compile_object_keywords(map, &ptr, depth, *loc);
                self.arena[idx] = CompiledSchema {
                    boolean_schema: None,
                    keywords,
                    location: *loc,
                };
            }
            other => {
                // Any non-object, non-boolean value at a schema position
                // has no keywords to enforce; treat it as `true`.
                self.arena[idx] = CompiledSchema::always(true, other.location());
            }
        }
        idx
    }

    fn sub(&mut self, map: &IndexMap<String, Value>, parent_ptr: &str, key: &str, depth: u32) -> Option<usize> {
        map.get(key)
            .map(|child| self.compile_value(child, format!("{parent_ptr}/{}", escape_pointer_segment(key)), depth + 1))
    }

    #[allow(clippy::too_many_lines)]
    fn compile_object_keywords(
        &mut self,
        map: &IndexMap<String, Value>,
        ptr: &str,
        depth: u32,
        loc: Location,
    ) -> Vec<Keyword> {
        let mut keywords = Vec::new();

        if let Some(Value::String(ref_str, ref_loc)) = map.get("$ref") {
            let resolved = self.resolve_ref(ref_str, *ref_loc);
            if let Some(target_ptr) = resolved {
                let idx = self.compile_pointer(target_ptr, depth + 1);
                // `$ref` stands alone: siblings are ignored, matching
                // Draft-7 semantics (later drafts allow siblings; this one
                // doesn't).
                return vec![Keyword::AllOf(vec![idx])];
            }
            return Vec::new();
        }

        if let Some(Value::String(type_name, _)) = map.get("type") {
            match JsonType::parse(type_name) {
                Some(t) => keywords.push(Keyword::Type(vec![t])),
                None => self.diagnostics.push(Diagnostic::new(
                    DiagnosticKind::SchemaUnsupportedKeyword(format!("type: {type_name}")),
                    loc,
                )),
            }
        } else if let Some(Value::List(types, _)) = map.get("type") {
            let parsed: Vec<JsonType> = types
                .iter()
                .filter_map(|v| v.as_str().and_then(JsonType::parse))
                .collect();
            if !parsed.is_empty() {
                keywords.push(Keyword::Type(parsed));
            }
        }

        if let Some(Value::List(values, _)) = map.get("enum") {
            keywords.push(Keyword::Enum(values.clone()));
        }

        if let Some(value) = map.get("const") {
            keywords.push(Keyword::Const(value.clone()));
        }

        if let Some(Value::Object(props, _)) = map.get("properties") {
            let mut compiled = IndexMap::new();
            for key in props.keys() {
                if let Some(idx) = self.sub(props, &format!("{ptr}/properties"), key, depth) {
                    compiled.insert(key.clone(), idx);
                }
            }
            keywords.push(Keyword::Properties(compiled));
        }

        if let Some(Value::Object(pattern_props, _)) = map.get("patternProperties") {
            let mut compiled = Vec::new();
            for (pattern, schema) in pattern_props {
                match compile_regex(pattern, &mut self.diagnostics, loc, "patternProperties") {
                    Some(re) => {
                        let idx = self.compile_value(
                            schema,
                            format!("{ptr}/patternProperties/{}", escape_pointer_segment(pattern)),
                            depth + 1,
                        );
                        compiled.push((re, idx));
                    }
                    None => continue,
                }
            }
            keywords.push(Keyword::PatternProperties(compiled));
        }

        if let Some(policy) = self.compile_open_policy(map, ptr, "additionalProperties", depth) {
            keywords.push(Keyword::AdditionalProperties(policy));
        }

        if let Some(Value::List(required, _)) = map.get("required") {
            let names = required.iter().filter_map(Value::as_str).map(str::to_string).collect();
            keywords.push(Keyword::Required(names));
        }

        if let Some(idx) = self.sub(map, ptr, "propertyNames", depth) {
            keywords.push(Keyword::PropertyNames(idx));
        }

        if let Some(Value::Object(deps, _)) = map.get("dependencies") {
            let mut compiled = Vec::new();
            for (key, dep) in deps {
                let entry = match dep {
                    Value::List(names, _) => DependencyEntry::Required(
                        names.iter().filter_map(Value::as_str).map(str::to_string).collect(),
                    ),
                    other => DependencyEntry::Schema(self.compile_value(
                        other,
                        format!("{ptr}/dependencies/{}", escape_pointer_segment(key)),
                        depth + 1,
                    )),
                };
                compiled.push((key.clone(), entry));
            }
            keywords.push(Keyword::Dependencies(compiled));
        }

        match map.get("items") {
            Some(Value::List(tuple, _)) => {
                let mut compiled = Vec::new();
                for (i, schema) in tuple.iter().enumerate() {
                    compiled.push(self.compile_value(schema, format!("{ptr}/items/{i}"), depth + 1));
                }
                keywords.push(Keyword::Items(ItemsPolicy::Tuple(compiled)));
            }
            Some(other) => {
                let idx = self.compile_value(other, format!("{ptr}/items"), depth + 1);
                keywords.push(Keyword::Items(ItemsPolicy::Single(idx)));
            }
            None => {}
        }

        if let Some(policy) = self.compile_open_policy(map, ptr, "additionalItems", depth) {
            keywords.push(Keyword::AdditionalItems(policy));
        }

        if let Some(idx) = self.sub(map, ptr, "contains", depth) {
            keywords.push(Keyword::Contains(idx));
        }

        if let Some(n) = map.get("minItems").and_then(as_u64) {
            keywords.push(Keyword::MinItems(n));
        }
        if let Some(n) = map.get("maxItems").and_then(as_u64) {
            keywords.push(Keyword::MaxItems(n));
        }
        if matches!(map.get("uniqueItems"), Some(Value::Boolean(true, _))) {
            keywords.push(Keyword::UniqueItems);
        }

        if let Some(n) = map.get("minimum").and_then(as_f64) {
            keywords.push(Keyword::Minimum(n));
        }
        if let Some(n) = map.get("maximum").and_then(as_f64) {
            keywords.push(Keyword::Maximum(n));
        }
        if let Some(n) = map.get("exclusiveMinimum").and_then(as_f64) {
            keywords.push(Keyword::ExclusiveMinimum(n));
        }
        if let Some(n) = map.get("exclusiveMaximum").and_then(as_f64) {
            keywords.push(Keyword::ExclusiveMaximum(n));
        }
        if let Some(n) = map.get("multipleOf").and_then(as_f64) {
            keywords.push(Keyword::MultipleOf(n));
        }

        if let Some(n) = map.get("minLength").and_then(as_u64) {
            keywords.push(Keyword::MinLength(n));
        }
        if let Some(n) = map.get("maxLength").and_then(as_u64) {
            keywords.push(Keyword::MaxLength(n));
        }
        if let Some(Value::String(pattern, _)) = map.get("pattern")
            && let Some(re) = compile_regex(pattern, &mut self.diagnostics, loc, "pattern")
        {
            keywords.push(Keyword::Pattern(re));
        }

        // `format` is Draft-7's informational (non-assertive) vocabulary;
        // recorded as accepted but never enforced (SPEC_FULL §8, Open
        // Question resolution in DESIGN.md).

        if let Some(Value::List(schemas, _)) = map.get("allOf") {
            keywords.push(Keyword::AllOf(self.compile_list(schemas, ptr, "allOf", depth)));
        }
        if let Some(Value::List(schemas, _)) = map.get("anyOf") {
            keywords.push(Keyword::AnyOf(self.compile_list(schemas, ptr, "anyOf", depth)));
        }
        if let Some(Value::List(schemas, _)) = map.get("oneOf") {
            keywords.push(Keyword::OneOf(self.compile_list(schemas, ptr, "oneOf", depth)));
        }
        if let Some(idx) = self.sub(map, ptr, "not", depth) {
            keywords.push(Keyword::Not(idx));
        }

        let if_ = self.sub(map, ptr, "if", depth);
        if let Some(if_) = if_ {
            let then_ = self.sub(map, ptr, "then", depth);
            let else_ = self.sub(map, ptr, "else", depth);
            keywords.push(Keyword::IfThenElse { if_, then_, else_ });
        }

        // `definitions`/`$defs` hold no direct constraint; their subschemas
        // are compiled lazily, on first `$ref`, via `compile_pointer`.

        keywords
    }

    fn compile_list(&mut self, schemas: &[Value], ptr: &str, key: &str, depth: u32) -> Vec<usize> {
        schemas
            .iter()
            .enumerate()
            .map(|(i, s)| self.compile_value(s, format!("{ptr}/{key}/{i}"), depth + 1))
            .collect()
    }

    fn compile_open_policy(
        &mut self,
        map: &IndexMap<String, Value>,
        ptr: &str,
        key: &str,
        depth: u32,
    ) -> Option<OpenPolicy> {
        match map.get(key) {
            Some(Value::Boolean(true, _)) | None => None,
            Some(Value::Boolean(false, _)) => Some(OpenPolicy::Deny),
            Some(other) => Some(OpenPolicy::Schema(self.compile_value(
                other,
                format!("{ptr}/{key}"),
                depth + 1,
            ))),
        }
    }

    /// Resolve a `$ref` string to a JSON pointer within the document, or
    /// `None` if it's unsupported (remote) — a diagnostic is recorded in
    /// that case and the caller falls back to an always-true schema.
    fn resolve_ref(&mut self, ref_str: &str, loc: Location) -> Option<String> {
        if let Some(pointer) = ref_str.strip_prefix("#/") {
            return Some(format!("/{pointer}"));
        }
        if ref_str == "#" {
            return Some(String::new());
        }
        if let Some(id) = ref_str.strip_prefix('#') {
            if let Some(target) = self.id_registry.get(id) {
                return Some(target.clone());
            }
            self.diagnostics.push(Diagnostic::new(
                DiagnosticKind::SchemaUnresolvedRef(ref_str.to_string()),
                loc,
            ));
            return None;
        }
        self.diagnostics.push(Diagnostic::new(DiagnosticKind::SchemaRemoteRef(ref_str.to_string()), loc));
        None
    }
}

fn compile_regex(
    pattern: &str,
    diagnostics: &mut Vec<Diagnostic>,
    loc: Location,
    keyword: &str,
) -> Option<regex::Regex> {
    let normalized = normalize_ecma_regex(pattern);
    match regex::Regex::new(&normalized) {
        Ok(re) => Some(re),
        Err(err) => {
            diagnostics.push(Diagnostic::new(
                DiagnosticKind::SchemaInvalidRegex {
                    keyword: keyword.to_string(),
                    error: err.to_string(),
                },
                loc,
            ));
            None
        }
    }
}

fn as_u64(value: &Value) -> Option<u64> {
    match value {
        Value::Number(n, _) => {
            let f = n.as_f64();
            (f >= 0.0 && f.fract() == 0.0).then_some(f as u64)
        }
        _ => None,
    }
}

fn as_f64(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n, _) => Some(n.as_f64()),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use kson_syntax::analyze;

    fn compile_source(src: &str) -> (Arena, Vec<Diagnostic>) {
        let value = analyze(src).value.expect("valid kson");
        compile(&value, CompileOptions::default())
    }

    #[test]
    fn compiles_simple_type_schema() {
        let (arena, diags) = compile_source("type: \"string\"");
        assert!(diags.is_empty());
        let root = &arena.schemas[arena.root];
        assert!(matches!(root.keywords.as_slice(), [Keyword::Type(types)] if types == &[JsonType::String]));
    }

    #[test]
    fn boolean_schema_compiles_directly() {
        let (arena, _) = compile_source("false");
        assert_eq!(arena.schemas[arena.root].boolean_schema, Some(false));
    }

    #[test]
    fn ref_resolves_to_definitions_pointer() {
        let (arena, diags) = compile_source(
            "definitions: { pos: { type: \"integer\", minimum: 0 } }\nproperties: { n: { $ref: \"#/definitions/pos\" } }",
        );
        assert!(diags.is_empty());
        let root = &arena.schemas[arena.root];
        let Keyword::Properties(props) = &root.keywords[0] else {
            panic!("expected properties keyword");
        };
        let n_idx = props["n"];
        let Keyword::AllOf(refs) = &arena.schemas[n_idx].keywords[0] else {
            panic!("expected $ref to compile as allOf([target])");
        };
        let target = &arena.schemas[refs[0]];
        assert!(target.keywords.iter().any(|k| matches!(k, Keyword::Minimum(m) if *m == 0.0)));
    }

    #[test]
    fn cyclic_ref_terminates_compilation() {
        let (arena, diags) = compile_source(
            "definitions: { node: { properties: { next: { $ref: \"#/definitions/node\" } } } }\n$ref: \"#/definitions/node\"",
        );
        assert!(diags.is_empty());
        assert!(arena.schemas.len() < 20, "cyclic ref should not infinitely expand");
    }

    #[test]
    fn remote_ref_is_diagnosed() {
        let (_, diags) = compile_source("$ref: \"https://example.com/schema.json\"");
        assert!(diags.iter().any(|d| matches!(d.kind, DiagnosticKind::SchemaRemoteRef(_))));
    }

    #[test]
    fn invalid_pattern_is_diagnosed() {
        let (_, diags) = compile_source("pattern: \"[unterminated\"");
        assert!(diags.iter().any(|d| matches!(d.kind, DiagnosticKind::SchemaInvalidRegex { .. })));
    }
}
