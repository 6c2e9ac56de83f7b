//! The Draft-7 `type` keyword's vocabulary, and the numeric/structural
//! equality rules spec §4.9 calls out for `const`/`enum`/`uniqueItems`
//! ("numbers by mathematical value", "objects by unordered key set").

use kson_syntax::Value;
use kson_syntax::number::NumberValue;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JsonType {
    Null,
    Boolean,
    Object,
    Array,
    Number,
    String,
    Integer,
}

impl JsonType {
    pub fn parse(name: &str) -> Option<Self> {
        Some(match name {
            "null" => Self::Null,
            "boolean" => Self::Boolean,
            "object" => Self::Object,
            "array" => Self::Array,
            "number" => Self::Number,
            "string" => Self::String,
            "integer" => Self::Integer,
            _ => return None,
        })
    }

    pub fn name(self) -> &'static str {
        match self {
            Self::Null => "null",
            Self::Boolean => "boolean",
            Self::Object => "object",
            Self::Array => "array",
            Self::Number => "number",
            Self::String => "string",
            Self::Integer => "integer",
        }
    }

    pub fn matches(self, value: &Value) -> bool {
        match (self, value) {
            (Self::Null, Value::Null(_))
            | (Self::Boolean, Value::Boolean(..))
            | (Self::Object, Value::Object(..))
            | (Self::Array, Value::List(..))
            | (Self::String, Value::String(..) | Value::EmbedBlock { .. }) => true,
            (Self::Number, Value::Number(..)) => true,
            (Self::Integer, Value::Number(NumberValue::Integer(_), _)) => true,
            (Self::Integer, Value::Number(NumberValue::Decimal(d), _)) => d.fract() == 0.0,
            _ => false,
        }
    }
}

/// `const`/`enum` equality: numbers compare by mathematical value across
/// `Integer`/`Decimal`, objects compare as unordered key sets, everything
/// else is deep structural equality.
pub fn schema_eq(a: &Value, b: &Value) -> bool {
    match (a, b) {
        (Value::Number(na, _), Value::Number(nb, _)) => na.as_f64() == nb.as_f64(),
        (Value::String(sa, _), Value::String(sb, _)) => sa == sb,
        (Value::Boolean(ba, _), Value::Boolean(bb, _)) => ba == bb,
        (Value::Null(_), Value::Null(_)) => true,
        (Value::List(la, _), Value::List(lb, _)) => {
            la.len() == lb.len() && la.iter().zip(lb).all(|(x, y)| schema_eq(x, y))
        }
        (Value::Object(ma, _), Value::Object(mb, _)) => {
            ma.len() == mb.len()
                && ma
                    .iter()
                    .all(|(k, v)| mb.get(k).is_some_and(|ov| schema_eq(v, ov)))
        }
        (
            Value::EmbedBlock { content: ca, .. },
            Value::EmbedBlock { content: cb, .. },
        ) => ca == cb,
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use kson_diagnostics::{Location, Position};

    fn loc() -> Location {
        Location::point(Position::ZERO)
    }

    #[test]
    fn integer_and_decimal_compare_equal_by_value() {
        let a = Value::Number(NumberValue::Integer(1), loc());
        let b = Value::Number(NumberValue::Decimal(1.0), loc());
        assert!(schema_eq(&a, &b));
    }

    #[test]
    fn objects_compare_unordered() {
        use indexmap::IndexMap;
        let mut ma = IndexMap::new();
        ma.insert("a".to_string(), Value::Number(NumberValue::Integer(1), loc()));
        ma.insert("b".to_string(), Value::Number(NumberValue::Integer(2), loc()));
        let mut mb = IndexMap::new();
        mb.insert("b".to_string(), Value::Number(NumberValue::Integer(2), loc()));
        mb.insert("a".to_string(), Value::Number(NumberValue::Integer(1), loc()));
        assert!(schema_eq(&Value::Object(ma, loc()), &Value::Object(mb, loc())));
    }

    #[test]
    fn integer_type_matches_whole_decimal() {
        let whole = Value::Number(NumberValue::Decimal(4.0), loc());
        let fractional = Value::Number(NumberValue::Decimal(4.5), loc());
        assert!(JsonType::Integer.matches(&whole));
        assert!(!JsonType::Integer.matches(&fractional));
    }
}
