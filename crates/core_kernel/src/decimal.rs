//! Exact decimal helpers
//!
//! All quantity, price and amount arithmetic in the workspace goes through
//! rust_decimal. This module holds the small set of shared operations the
//! validators and the ERP client agree on: half-up rounding, percentage and
//! relative error, and lenient parsing of numbers produced by OCR.

use std::str::FromStr;

use rust_decimal::{Decimal, RoundingStrategy};
use rust_decimal_macros::dec;
use thiserror::Error;

/// Values with an absolute magnitude below this are treated as absent
pub const ZERO_EPSILON: Decimal = dec!(0.000001);

/// Errors that can occur while handling decimal values
#[derive(Debug, Error, PartialEq, Eq)]
pub enum DecimalError {
    #[error("Invalid number: {0:?}")]
    InvalidNumber(String),

    #[error("Division by zero")]
    DivisionByZero,

    #[error("Arithmetic overflow")]
    Overflow,
}

/// Rounds half away from zero to `dp` decimal places
pub fn round_half_up(value: Decimal, dp: u32) -> Decimal {
    value.round_dp_with_strategy(dp, RoundingStrategy::MidpointAwayFromZero)
}

/// Percentage deviation of `actual` from `expected`
///
/// Returns 0 when both are zero and 100 when only `expected` is zero.
pub fn percent_error(expected: Decimal, actual: Decimal) -> Result<Decimal, DecimalError> {
    if expected.is_zero() {
        return Ok(if actual.is_zero() { Decimal::ZERO } else { Decimal::ONE_HUNDRED });
    }
    let diff = checked_sub(actual, expected)?;
    let scaled = checked_mul(Decimal::ONE_HUNDRED, diff)?;
    Ok(checked_div(scaled, expected)?.abs())
}

/// Relative difference `|a - b| / max(|a|, |b|)`, zero when both are zero
pub fn relative_difference(a: Decimal, b: Decimal) -> Result<Decimal, DecimalError> {
    let scale = a.abs().max(b.abs());
    if scale.is_zero() {
        return Ok(Decimal::ZERO);
    }
    checked_div(checked_sub(a, b)?.abs(), scale)
}

/// Returns true when the value is absent or indistinguishable from zero
pub fn is_effectively_zero(value: Option<Decimal>) -> bool {
    value.map_or(true, |v| v.abs() < ZERO_EPSILON)
}

/// Checked division returning a `DecimalError` on a zero divisor
pub fn checked_div(dividend: Decimal, divisor: Decimal) -> Result<Decimal, DecimalError> {
    if divisor.is_zero() {
        return Err(DecimalError::DivisionByZero);
    }
    dividend.checked_div(divisor).ok_or(DecimalError::Overflow)
}

/// Checked multiplication; OCR can produce products beyond the 96-bit range
pub fn checked_mul(a: Decimal, b: Decimal) -> Result<Decimal, DecimalError> {
    a.checked_mul(b).ok_or(DecimalError::Overflow)
}

fn checked_sub(a: Decimal, b: Decimal) -> Result<Decimal, DecimalError> {
    a.checked_sub(b).ok_or(DecimalError::Overflow)
}

/// Parses a number as printed on an invoice and read back by OCR
///
/// Accepts grouping spaces (`1 250`), comma decimals (`12,5`), and either
/// European (`1.250.000,00`) or English (`1,250,000.00`) grouping. When both
/// separators appear, the rightmost one is the decimal separator. A lone
/// comma is a decimal separator only when followed by one or two digits.
pub fn parse_ocr_number(raw: &str) -> Result<Decimal, DecimalError> {
    let cleaned: String = raw
        .trim()
        .chars()
        .filter(|c| !c.is_whitespace() && *c != '\'' && *c != '_')
        .collect();

    if cleaned.is_empty() {
        return Err(DecimalError::InvalidNumber(raw.to_string()));
    }

    let last_comma = cleaned.rfind(',');
    let last_dot = cleaned.rfind('.');

    let normalized = match (last_comma, last_dot) {
        (Some(c), Some(d)) if c > d => cleaned.replace('.', "").replace(',', "."),
        (Some(_), Some(_)) => cleaned.replace(',', ""),
        (Some(c), None) => {
            let decimals = cleaned.len() - c - 1;
            if cleaned.matches(',').count() == 1 && (1..=2).contains(&decimals) {
                cleaned.replace(',', ".")
            } else {
                cleaned.replace(',', "")
            }
        }
        (None, Some(_)) if cleaned.matches('.').count() > 1 => cleaned.replace('.', ""),
        _ => cleaned,
    };

    Decimal::from_str(&normalized).map_err(|_| DecimalError::InvalidNumber(raw.to_string()))
}

/// Formats a value rounded to whole units with `,` thousands grouping
pub fn format_grouped(value: Decimal) -> String {
    let rounded = round_half_up(value, 0).normalize();
    let digits = rounded.abs().trunc().to_string();
    let mut grouped = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(ch);
    }
    if rounded.is_sign_negative() && !rounded.is_zero() {
        format!("-{}", grouped)
    } else {
        grouped
    }
}

/// Serde helpers for numeric fields that may arrive as numbers or OCR text
pub mod lenient {
    use super::*;
    use serde::{Deserialize, Deserializer};

    #[derive(Deserialize)]
    #[serde(untagged)]
    enum RawNumber {
        Int(i64),
        Float(f64),
        Text(String),
    }

    /// Deserializes an optional decimal; unparseable text becomes `None`
    pub fn deserialize_option<'de, D>(deserializer: D) -> Result<Option<Decimal>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw = Option::<RawNumber>::deserialize(deserializer)?;
        Ok(match raw {
            None => None,
            Some(RawNumber::Int(i)) => Some(Decimal::from(i)),
            Some(RawNumber::Float(f)) => Decimal::from_str(&f.to_string()).ok(),
            Some(RawNumber::Text(s)) => parse_ocr_number(&s).ok(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_round_half_up_rounds_ties_away_from_zero() {
        assert_eq!(round_half_up(dec!(2.345), 2), dec!(2.35));
        assert_eq!(round_half_up(dec!(-2.345), 2), dec!(-2.35));
        assert_eq!(round_half_up(dec!(2.344), 2), dec!(2.34));
    }

    #[test]
    fn test_percent_error() {
        assert_eq!(percent_error(dec!(100), dec!(101)), Ok(dec!(1)));
        assert_eq!(percent_error(dec!(0), dec!(0)), Ok(dec!(0)));
        assert_eq!(percent_error(dec!(0), dec!(5)), Ok(dec!(100)));
    }

    #[test]
    fn test_relative_difference() {
        assert_eq!(relative_difference(dec!(100), dec!(50)), Ok(dec!(0.5)));
        assert_eq!(relative_difference(dec!(0), dec!(0)), Ok(dec!(0)));
    }

    #[test]
    fn test_effectively_zero() {
        assert!(is_effectively_zero(None));
        assert!(is_effectively_zero(Some(dec!(0.0000001))));
        assert!(!is_effectively_zero(Some(dec!(0.01))));
    }

    #[test]
    fn test_parse_ocr_number_formats() {
        assert_eq!(parse_ocr_number("1 250").unwrap(), dec!(1250));
        assert_eq!(parse_ocr_number("12,5").unwrap(), dec!(12.5));
        assert_eq!(parse_ocr_number("1.250.000,00").unwrap(), dec!(1250000.00));
        assert_eq!(parse_ocr_number("1,250,000.50").unwrap(), dec!(1250000.50));
        assert_eq!(parse_ocr_number("25,000").unwrap(), dec!(25000));
        assert_eq!(parse_ocr_number("1.250.000").unwrap(), dec!(1250000));
        assert_eq!(parse_ocr_number("-3.5").unwrap(), dec!(-3.5));
    }

    #[test]
    fn test_parse_ocr_number_rejects_garbage() {
        assert!(matches!(parse_ocr_number("2x"), Err(DecimalError::InvalidNumber(_))));
        assert!(parse_ocr_number("   ").is_err());
    }

    #[test]
    fn test_format_grouped() {
        assert_eq!(format_grouped(dec!(1000000)), "1,000,000");
        assert_eq!(format_grouped(dec!(999.6)), "1,000");
        assert_eq!(format_grouped(dec!(12)), "12");
        assert_eq!(format_grouped(dec!(-25000)), "-25,000");
    }

    #[test]
    fn test_checked_div_zero() {
        assert_eq!(checked_div(dec!(1), dec!(0)), Err(DecimalError::DivisionByZero));
        assert_eq!(checked_div(dec!(10), dec!(4)), Ok(dec!(2.5)));
    }

    #[test]
    fn test_checked_arithmetic_overflow() {
        let huge = dec!(1000000000000000);
        assert_eq!(checked_mul(huge, dec!(100000000000000)), Err(DecimalError::Overflow));
        assert_eq!(checked_mul(dec!(2.5), dec!(4)), Ok(dec!(10)));
        assert_eq!(checked_div(Decimal::MAX, dec!(0.1)), Err(DecimalError::Overflow));
        assert_eq!(percent_error(dec!(0.01), Decimal::MAX), Err(DecimalError::Overflow));
        assert_eq!(relative_difference(Decimal::MAX, Decimal::MIN), Err(DecimalError::Overflow));
    }

    #[test]
    fn test_lenient_deserialize() {
        #[derive(serde::Deserialize)]
        struct Row {
            #[serde(default, deserialize_with = "lenient::deserialize_option")]
            qty: Option<Decimal>,
        }

        let row: Row = serde_json::from_str(r#"{"qty": "1 250,5"}"#).unwrap();
        assert_eq!(row.qty, Some(dec!(1250.5)));
        let row: Row = serde_json::from_str(r#"{"qty": 2.5}"#).unwrap();
        assert_eq!(row.qty, Some(dec!(2.5)));
        let row: Row = serde_json::from_str(r#"{"qty": null}"#).unwrap();
        assert_eq!(row.qty, None);
        let row: Row = serde_json::from_str(r#"{}"#).unwrap();
        assert_eq!(row.qty, None);
        let row: Row = serde_json::from_str(r#"{"qty": "2x"}"#).unwrap();
        assert_eq!(row.qty, None);
    }
}
