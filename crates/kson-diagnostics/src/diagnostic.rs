//! The closed diagnostic catalogue.
//!
//! `DiagnosticKind` is a `thiserror` enum: the `#[error("...")]` templates
//! double as the catalogue's format strings, and the derive macro itself
//! enforces that every variant's template matches its field arity — there's
//! no separate template-validation step to keep in sync.

use thiserror::Error;

use crate::location::Location;

/// Diagnostic severity. Per spec, a `Value` is only produced when no
/// lexer/parser diagnostic at `Error` severity exists; `Warning`
/// diagnostics (duplicate keys, best-effort escape/illegal-char recovery)
/// never block lowering to a `Value`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Severity {
    Error,
    Warning,
}

impl core::fmt::Display for Severity {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Severity::Error => write!(f, "ERROR"),
            Severity::Warning => write!(f, "WARNING"),
        }
    }
}

/// The closed set of diagnostic kinds produced anywhere in the engine:
/// lexer, parser, string transformer, schema compiler, schema validator.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum DiagnosticKind {
    // ---- Lexical --------------------------------------------------------
    #[error("illegal character {0:?}")]
    IllegalChar(char),
    #[error("bad string escape '\\{0}'")]
    StringBadEscape(char),
    #[error("bad unicode escape")]
    StringBadUnicodeEscape,
    #[error("illegal control character in string literal")]
    StringIllegalControlCharacter,
    #[error("unterminated string literal")]
    StringUnterminated,
    #[error("unterminated embed block")]
    EmbedUnterminated,
    #[error("unexpected character {0:?} in number literal")]
    NumberBadChar(char),
    #[error("number out of representable range")]
    NumberOutOfRange,
    #[error("number literal has a leading zero")]
    NumberLeadingZero,

    // ---- Structural -------------------------------------------------------
    #[error("unexpected token: {0}")]
    UnexpectedToken(String),
    #[error("expected ':' after property key")]
    MissingColon,
    #[error("unclosed '{0}'")]
    UnclosedContainer(char),
    #[error("duplicate property key '{0}'")]
    ObjectDuplicateKey(String),
    #[error("property key must be a string")]
    NonStringPropertyKey,

    // ---- Semantic (value) -------------------------------------------------
    #[error("recursion limit of {0} exceeded")]
    RecursionLimitExceeded(u32),

    // ---- Schema compile -----------------------------------------------
    #[error("unsupported remote $ref '{0}'")]
    SchemaRemoteRef(String),
    #[error("could not resolve $ref '{0}'")]
    SchemaUnresolvedRef(String),
    #[error("invalid regular expression in '{keyword}': {error}")]
    SchemaInvalidRegex { keyword: String, error: String },
    #[error("unknown keyword '{0}' at a compile-required site")]
    SchemaUnsupportedKeyword(String),

    // ---- Schema validation (one per Draft-7 keyword failure) -----------
    #[error("expected type {expected}, found {actual}")]
    TypeMismatch { expected: String, actual: String },
    #[error("value is not one of the allowed enum values")]
    EnumMismatch,
    #[error("value does not equal the required constant")]
    ConstMismatch,
    #[error("missing required property '{0}'")]
    RequiredMissing(String),
    #[error("additional property '{0}' is not allowed")]
    AdditionalPropertyNotAllowed(String),
    #[error("additional item at index {0} is not allowed")]
    AdditionalItemNotAllowed(usize),
    #[error("array does not contain an item matching 'contains'")]
    ContainsMismatch,
    #[error("expected at least {expected} items, found {actual}")]
    MinItems { expected: u64, actual: usize },
    #[error("expected at most {expected} items, found {actual}")]
    MaxItems { expected: u64, actual: usize },
    #[error("array items must be unique, duplicates at indices {0} and {1}")]
    UniqueItemsViolation(usize, usize),
    #[error("item at index {0} does not match its schema")]
    ItemsMismatch(usize),
    #[error("value must be >= {0}")]
    Minimum(f64),
    #[error("value must be > {0}")]
    ExclusiveMinimum(f64),
    #[error("value must be <= {0}")]
    Maximum(f64),
    #[error("value must be < {0}")]
    ExclusiveMaximum(f64),
    #[error("value must be a multiple of {0}")]
    MultipleOf(f64),
    #[error("string must have at least {expected} characters, found {actual}")]
    MinLength { expected: u64, actual: usize },
    #[error("string must have at most {expected} characters, found {actual}")]
    MaxLength { expected: u64, actual: usize },
    #[error("string does not match pattern '{0}'")]
    PatternMismatch(String),
    #[error("value does not match every schema in 'allOf'")]
    AllOfMismatch,
    #[error("value does not match any schema in 'anyOf'")]
    AnyOfMismatch,
    #[error("value matches {0} schemas in 'oneOf', expected exactly one")]
    OneOfMismatch(usize),
    #[error("value matches a schema disallowed by 'not'")]
    NotMismatch,
    #[error("property name '{0}' does not match 'propertyNames'")]
    PropertyNamesMismatch(String),
    #[error("missing dependency '{0}' required by property '{1}'")]
    DependencyMissing(String, String),
}

impl DiagnosticKind {
    /// The severity a kind carries when no caller overrides it. Kinds whose
    /// recovery still yields a usable token/node are `Warning`; kinds that
    /// leave a gap the parser can't paper over are `Error`.
    pub fn default_severity(&self) -> Severity {
        use DiagnosticKind::{
            AdditionalItemNotAllowed, AdditionalPropertyNotAllowed, AllOfMismatch, AnyOfMismatch,
            ConstMismatch, ContainsMismatch, DependencyMissing, EmbedUnterminated, EnumMismatch,
            ExclusiveMaximum, ExclusiveMinimum, IllegalChar, ItemsMismatch, MaxItems, MaxLength,
            Maximum, MinItems, MinLength, Minimum, MissingColon, MultipleOf, NonStringPropertyKey,
            NotMismatch, NumberBadChar, NumberLeadingZero, NumberOutOfRange, ObjectDuplicateKey, OneOfMismatch,
            PatternMismatch, PropertyNamesMismatch, RecursionLimitExceeded, RequiredMissing,
            SchemaInvalidRegex, SchemaRemoteRef, SchemaUnresolvedRef, SchemaUnsupportedKeyword,
            StringBadEscape, StringBadUnicodeEscape, StringIllegalControlCharacter,
            StringUnterminated, TypeMismatch, UnclosedContainer, UnexpectedToken,
            UniqueItemsViolation,
        };
        match self {
            // Best-effort lexical recovery still produces a usable token.
            IllegalChar(_)
            | StringBadEscape(_)
            | StringBadUnicodeEscape
            | StringIllegalControlCharacter
            | NumberBadChar(_)
            | NumberOutOfRange
            | NumberLeadingZero
            | ObjectDuplicateKey(_) => Severity::Warning,

            // Unrecoverable lexical/structural/semantic gaps.
            StringUnterminated
            | EmbedUnterminated
            | UnexpectedToken(_)
            | MissingColon
            | UnclosedContainer(_)
            | NonStringPropertyKey
            | RecursionLimitExceeded(_) => Severity::Error,

            // Schema compile problems prevent a usable validator.
            SchemaRemoteRef(_)
            | SchemaUnresolvedRef(_)
            | SchemaInvalidRegex { .. }
            | SchemaUnsupportedKeyword(_) => Severity::Error,

            // Every Draft-7 validation failure is reported as an error.
            TypeMismatch { .. }
            | EnumMismatch
            | ConstMismatch
            | RequiredMissing(_)
            | AdditionalPropertyNotAllowed(_)
            | AdditionalItemNotAllowed(_)
            | ContainsMismatch
            | MinItems { .. }
            | MaxItems { .. }
            | UniqueItemsViolation(_, _)
            | ItemsMismatch(_)
            | Minimum(_)
            | ExclusiveMinimum(_)
            | Maximum(_)
            | ExclusiveMaximum(_)
            | MultipleOf(_)
            | MinLength { .. }
            | MaxLength { .. }
            | PatternMismatch(_)
            | AllOfMismatch
            | AnyOfMismatch
            | OneOfMismatch(_)
            | NotMismatch
            | PropertyNamesMismatch(_)
            | DependencyMissing(_, _) => Severity::Error,
        }
    }
}

/// A single diagnostic: a kind, a severity, and the source range it anchors to.
#[derive(Debug, Clone, PartialEq)]
pub struct Diagnostic {
    pub kind: DiagnosticKind,
    pub severity: Severity,
    pub location: Location,
}

impl Diagnostic {
    /// Build a diagnostic at its kind's default severity.
    pub fn new(kind: DiagnosticKind, location: Location) -> Self {
        let severity = kind.default_severity();
        Self {
            kind,
            severity,
            location,
        }
    }

    pub fn with_severity(kind: DiagnosticKind, severity: Severity, location: Location) -> Self {
        Self {
            kind,
            severity,
            location,
        }
    }

    pub fn message(&self) -> String {
        self.kind.to_string()
    }

    pub fn is_error(&self) -> bool {
        self.severity == Severity::Error
    }

    /// Render as `[SEVERITY] message at line:column`, the format the CLI
    /// prints per the library's external interface contract.
    pub fn render_line(&self) -> String {
        format!("[{}] {} at {}", self.severity, self.message(), self.location.start)
    }
}

impl core::fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "{}", self.render_line())
    }
}

/// True if any diagnostic in `messages` has `Error` severity — the gate on
/// whether a `Value` may be produced (spec §8 invariant 3).
pub fn has_errors(messages: &[Diagnostic]) -> bool {
    messages.iter().any(Diagnostic::is_error)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::location::Position;

    #[test]
    fn duplicate_key_is_warning_not_error() {
        let d = Diagnostic::new(
            DiagnosticKind::ObjectDuplicateKey("a".to_string()),
            Location::point(Position::ZERO),
        );
        assert_eq!(d.severity, Severity::Warning);
        assert!(!has_errors(&[d]));
    }

    #[test]
    fn unclosed_container_is_error() {
        let d = Diagnostic::new(
            DiagnosticKind::UnclosedContainer('{'),
            Location::point(Position::ZERO),
        );
        assert!(d.is_error());
        assert!(has_errors(&[d]));
    }

    #[test]
    fn render_line_matches_cli_format() {
        let d = Diagnostic::new(
            DiagnosticKind::MissingColon,
            Location::point(Position::new(2, 4, 10)),
        );
        assert_eq!(d.render_line(), "[ERROR] expected ':' after property key at 3:5");
    }
}
