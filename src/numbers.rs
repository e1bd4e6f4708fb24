//! Numeric text normalization.
//!
//! Event detail sections render numbers for a German locale: a decimal comma,
//! optional thousands dots and a currency suffix separated by a non-breaking
//! space (`"1.234,56\u{a0}€"`). Plain amounts arrive either as JSON numbers or
//! as dot-decimal strings.

use crate::error::{Error, Result};
use rust_decimal::Decimal;
use serde_json::Value;
use std::str::FromStr;

const NBSP: char = '\u{a0}';

/// Parse a locale formatted number such as `"0,512345"` or `"25,00\u{a0}€"`.
pub fn parse_locale_decimal(text: &str) -> Result<Decimal> {
    let number = text.split(NBSP).next().unwrap_or(text).trim();

    let cleaned = if number.contains(',') {
        number.replace('.', "").replace(',', ".")
    } else {
        number.to_string()
    };

    parse_decimal(&cleaned).map_err(|_| Error::InvalidAmount(text.to_string()))
}

/// Parse a dot-decimal string, accepting scientific notation.
pub fn parse_decimal(text: &str) -> Result<Decimal> {
    let trimmed = text.trim();
    Decimal::from_str(trimmed)
        .or_else(|_| Decimal::from_scientific(trimmed))
        .map_err(|_| Error::InvalidAmount(text.to_string()))
}

/// Convert a JSON amount into an exact decimal.
///
/// Numbers go through their shortest textual form so `-7.01` stays `-7.01`
/// instead of picking up binary float noise.
pub fn decimal_from_json(value: &Value) -> Result<Decimal> {
    match value {
        Value::Number(number) => parse_decimal(&number.to_string()),
        Value::String(text) => parse_decimal(text),
        other => Err(Error::InvalidAmount(other.to_string())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_parse_locale_decimal() {
        assert_eq!(parse_locale_decimal("0,512345").unwrap(), Decimal::from_str("0.512345").unwrap());
        assert_eq!(parse_locale_decimal("25,00\u{a0}€").unwrap(), Decimal::from_str("25.00").unwrap());
        assert_eq!(parse_locale_decimal("1.234,56\u{a0}€").unwrap(), Decimal::from_str("1234.56").unwrap());
        assert_eq!(parse_locale_decimal("12").unwrap(), Decimal::from(12));
    }

    #[test]
    fn test_parse_locale_decimal_rejects_garbage() {
        assert!(matches!(parse_locale_decimal("n/a"), Err(Error::InvalidAmount(_))));
        assert!(parse_locale_decimal("\u{a0}€").is_err());
    }

    #[test]
    fn test_decimal_from_json() {
        assert_eq!(decimal_from_json(&json!(-7.01)).unwrap().to_string(), "-7.01");
        assert_eq!(decimal_from_json(&json!(100)).unwrap(), Decimal::from(100));
        assert_eq!(decimal_from_json(&json!("2.5")).unwrap(), Decimal::from_str("2.5").unwrap());
        assert_eq!(decimal_from_json(&json!(1e-7)).unwrap(), Decimal::from_str("0.0000001").unwrap());
        assert!(decimal_from_json(&json!(null)).is_err());
    }
}
