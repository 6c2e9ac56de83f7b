//! Number classification (spec §4.3): turn a raw numeric lexeme already
//! scanned by the lexer into either a 32-bit integer or an IEEE-754 double.

use kson_diagnostics::DiagnosticKind;

/// The classified, parsed form of a number literal.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum NumberValue {
    Integer(i32),
    Decimal(f64),
}

impl NumberValue {
    /// The value as `f64`, for schema numeric comparisons and `uniqueItems`.
    pub fn as_f64(self) -> f64 {
        match self {
            NumberValue::Integer(n) => f64::from(n),
            NumberValue::Decimal(d) => d,
        }
    }
}

/// Classify a raw number lexeme already validated by the lexer's scanner.
///
/// A lexeme with no `.` and no exponent that fits in `i32` becomes
/// [`NumberValue::Integer`]; everything else becomes [`NumberValue::Decimal`],
/// parsed with the platform's round-to-nearest-ties-to-even `f64` parser.
/// A lexeme whose magnitude exceeds `f64`'s range (only possible for
/// pathological exponents) is reported via the returned diagnostic and
/// represented as a signed infinity, per spec §4.3.
pub fn classify(raw: &str) -> (NumberValue, Option<DiagnosticKind>) {
    let is_plain_integer = !raw.contains('.') && !raw.contains('e') && !raw.contains('E');

    if is_plain_integer
        && let Ok(n) = raw.parse::<i32>()
    {
        return (NumberValue::Integer(n), None);
    }

    match raw.parse::<f64>() {
        Ok(value) if value.is_finite() => (NumberValue::Decimal(value), None),
        Ok(value) => (
            NumberValue::Decimal(value),
            Some(DiagnosticKind::NumberOutOfRange),
        ),
        Err(_) => {
            // Overflowed the exponent range entirely: sign comes from the
            // lexeme's leading `-`, magnitude is infinite either way.
            let signed_inf = if raw.starts_with('-') {
                f64::NEG_INFINITY
            } else {
                f64::INFINITY
            };
            (
                NumberValue::Decimal(signed_inf),
                Some(DiagnosticKind::NumberOutOfRange),
            )
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[rstest::rstest]
    #[case("42", NumberValue::Integer(42))]
    #[case("-7", NumberValue::Integer(-7))]
    #[case("4.0", NumberValue::Decimal(4.0))]
    #[case("1e3", NumberValue::Decimal(1000.0))]
    #[case("99999999999", NumberValue::Decimal(99_999_999_999.0))]
    fn classifies_in_range_lexemes(#[case] raw: &str, #[case] expected: NumberValue) {
        let (value, diag) = classify(raw);
        assert_eq!(value, expected);
        assert!(diag.is_none());
    }

    #[rstest::rstest]
    #[case("1e400", f64::INFINITY)]
    #[case("-1e400", f64::NEG_INFINITY)]
    fn extreme_exponent_is_signed_infinity_and_out_of_range(
        #[case] raw: &str,
        #[case] expected: f64,
    ) {
        let (value, diag) = classify(raw);
        assert_eq!(value, NumberValue::Decimal(expected));
        assert_eq!(diag, Some(DiagnosticKind::NumberOutOfRange));
    }
}
