//! Defensive JSON field extraction shared by the marketplace adapters
//!
//! Providers are inconsistent about numeric encodings (strings vs numbers),
//! so monetary fields go through `Decimal` parsing of the literal text
//! rather than an f64 round-trip.

use rust_decimal::Decimal;
use serde_json::Value;
use std::str::FromStr;

/// Parse a price-like value from either a JSON string or number
pub(crate) fn decimal_from_value(value: &Value) -> Option<Decimal> {
	match value {
		Value::String(s) => Decimal::from_str(s.trim()).ok(),
		Value::Number(n) => Decimal::from_str(&n.to_string()).ok(),
		_ => None,
	}
}

/// Parse a ratio/percentage value from either a JSON string or number
pub(crate) fn f64_from_value(value: &Value) -> Option<f64> {
	match value {
		Value::String(s) => s.trim().parse::<f64>().ok(),
		Value::Number(n) => n.as_f64(),
		_ => None,
	}
}

/// Required string field; `None` when absent or not a string
pub(crate) fn str_field<'a>(value: &'a Value, field: &str) -> Option<&'a str> {
	value.get(field).and_then(Value::as_str)
}
