//! Fixed-precision decimals for money and rating columns.
//!
//! `Fixed<DIGITS, PLACES>` accepts a value only if it fits in `DIGITS`
//! significant digits with at most `PLACES` of them after the point, and
//! stores it quantized to exactly `PLACES` decimals. SQLite has no decimal
//! type, so values are persisted as text.

use rusqlite::types::{FromSql, FromSqlError, FromSqlResult, ToSql, ToSqlOutput, ValueRef};
use rust_decimal::Decimal;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

use crate::error::SchemaError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Fixed<const DIGITS: u32, const PLACES: u32>(Decimal);

/// decimal(10, 2): salary expectation and offer salary.
pub type Money = Fixed<10, 2>;

/// decimal(3, 2): performance review rating.
pub type Rating = Fixed<3, 2>;

#[derive(Debug, Clone, Error, PartialEq)]
#[error("{reason}")]
pub struct PrecisionError {
    pub reason: String,
}

impl<const DIGITS: u32, const PLACES: u32> Fixed<DIGITS, PLACES> {
    pub fn new(value: Decimal) -> Result<Self, PrecisionError> {
        let (digits, decimals) = digit_counts(value);
        let whole = digits - decimals;

        if digits > DIGITS {
            return Err(PrecisionError {
                reason: format!("ensure there are no more than {} digits in total", DIGITS),
            });
        }
        if decimals > PLACES {
            return Err(PrecisionError {
                reason: format!("ensure there are no more than {} decimal places", PLACES),
            });
        }
        if whole > DIGITS - PLACES {
            return Err(PrecisionError {
                reason: format!(
                    "ensure there are no more than {} digits before the decimal point",
                    DIGITS - PLACES
                ),
            });
        }

        let mut quantized = value;
        quantized.rescale(PLACES);
        Ok(Self(quantized))
    }

    /// Parse user input for a named column, reporting failures against it.
    pub fn parse_field(field: &'static str, raw: &str) -> crate::error::Result<Self> {
        let invalid = |reason: String| SchemaError::InvalidDecimal {
            field,
            value: raw.to_string(),
            reason,
        };
        let value = Decimal::from_str(raw.trim()).map_err(|e| invalid(e.to_string()))?;
        Self::new(value).map_err(|e| invalid(e.reason))
    }
}

/// Count significant digits and digits after the point, ignoring trailing
/// zeros in the fraction.
fn digit_counts(value: Decimal) -> (u32, u32) {
    let normalized = value.normalize();
    let scale = normalized.scale();
    let len = normalized.mantissa().unsigned_abs().to_string().len() as u32;

    if scale == 0 {
        (len, 0)
    } else if scale > len {
        (scale, scale)
    } else {
        (len, scale)
    }
}

impl<const DIGITS: u32, const PLACES: u32> fmt::Display for Fixed<DIGITS, PLACES> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.0, f)
    }
}

impl<const DIGITS: u32, const PLACES: u32> FromStr for Fixed<DIGITS, PLACES> {
    type Err = PrecisionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let value = Decimal::from_str(s.trim()).map_err(|e| PrecisionError {
            reason: e.to_string(),
        })?;
        Self::new(value)
    }
}

impl<const DIGITS: u32, const PLACES: u32> TryFrom<Decimal> for Fixed<DIGITS, PLACES> {
    type Error = PrecisionError;

    fn try_from(value: Decimal) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl<const DIGITS: u32, const PLACES: u32> From<Fixed<DIGITS, PLACES>> for Decimal {
    fn from(value: Fixed<DIGITS, PLACES>) -> Self {
        value.0
    }
}

impl<const DIGITS: u32, const PLACES: u32> Serialize for Fixed<DIGITS, PLACES> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        Serialize::serialize(&self.0, serializer)
    }
}

impl<'de, const DIGITS: u32, const PLACES: u32> Deserialize<'de> for Fixed<DIGITS, PLACES> {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let value = <Decimal as Deserialize>::deserialize(deserializer)?;
        Self::new(value).map_err(serde::de::Error::custom)
    }
}

impl<const DIGITS: u32, const PLACES: u32> ToSql for Fixed<DIGITS, PLACES> {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        Ok(ToSqlOutput::from(self.0.to_string()))
    }
}

impl<const DIGITS: u32, const PLACES: u32> FromSql for Fixed<DIGITS, PLACES> {
    fn column_result(value: ValueRef<'_>) -> FromSqlResult<Self> {
        let decimal = match value {
            ValueRef::Text(bytes) => {
                let text = std::str::from_utf8(bytes).map_err(|e| FromSqlError::Other(Box::new(e)))?;
                Decimal::from_str(text).map_err(|e| FromSqlError::Other(Box::new(e)))?
            }
            ValueRef::Integer(i) => Decimal::from(i),
            _ => return Err(FromSqlError::InvalidType),
        };
        Self::new(decimal).map_err(|e| FromSqlError::Other(Box::new(e)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn money_is_quantized_to_two_places() {
        let salary: Money = "85000".parse().unwrap();
        assert_eq!(salary.to_string(), "85000.00");

        let salary: Money = "1234.5".parse().unwrap();
        assert_eq!(salary.to_string(), "1234.50");
    }

    #[test]
    fn money_rejects_too_many_places() {
        let err = "10.123".parse::<Money>().unwrap_err();
        assert!(err.reason.contains("2 decimal places"));
    }

    #[test]
    fn money_rejects_too_many_whole_digits() {
        assert!("99999999.99".parse::<Money>().is_ok());
        let err = "100000000".parse::<Money>().unwrap_err();
        assert!(err.reason.contains("before the decimal point"));
    }

    #[test]
    fn trailing_zeros_do_not_count() {
        assert!("10.100000".parse::<Money>().is_ok());
    }

    #[test]
    fn rating_allows_one_whole_digit() {
        assert_eq!("4.5".parse::<Rating>().unwrap().to_string(), "4.50");
        assert!("9.99".parse::<Rating>().is_ok());
        assert!("10".parse::<Rating>().is_err());
        assert!("0.05".parse::<Rating>().is_ok());
    }

    #[test]
    fn negative_values_are_accepted() {
        assert_eq!("-3.2".parse::<Rating>().unwrap().to_string(), "-3.20");
    }

    #[test]
    fn parse_field_names_the_column() {
        let err = Money::parse_field("offer_salary", "abc").unwrap_err();
        match err {
            SchemaError::InvalidDecimal { field, value, .. } => {
                assert_eq!(field, "offer_salary");
                assert_eq!(value, "abc");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn deserializes_from_string_and_number() {
        let from_str: Money = serde_json::from_str("\"120000.00\"").unwrap();
        let from_num: Money = serde_json::from_str("120000").unwrap();
        assert_eq!(from_str, from_num);
        assert!(serde_json::from_str::<Rating>("\"12.5\"").is_err());
    }

    #[test]
    fn serializes_at_fixed_scale() {
        let salary: Money = "98000".parse().unwrap();
        let json = serde_json::to_string(&salary).unwrap();
        assert_eq!(json, "\"98000.00\"");
        let back: Money = serde_json::from_str(&json).unwrap();
        assert_eq!(back, salary);
    }
}
