//! Tracking records and the storage-boundary parse step.
//!
//! Rows leave the store loosely typed: a timestamp may be a JSON number or a
//! numeric string (the way a `bigint` column round-trips), a coordinate may be
//! missing entirely. [`RawRow::parse`] is the only place where those values
//! are coerced into a typed [`Record`]. Anything that cannot be read becomes
//! the `None` sentinel for that field; downstream consumers decide what the
//! sentinel means for them (see [`Record::x`]).

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// One tracked human at one moment.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Record {
    /// Index of the instance inside its source frame
    pub human_id: u32,

    /// Milliseconds since epoch, `None` if unparseable
    pub timestamp: Option<u64>,

    /// Planar position [m], `None` if unparseable
    pub pos_x: Option<f64>,
    pub pos_y: Option<f64>,

    /// Planar velocity [m/s]
    pub vel_x: Option<f64>,
    pub vel_y: Option<f64>,

    /// Detector confidence in [0, 1]
    pub confidence: Option<f64>,
}

impl Record {
    /// Creates a record with a valid timestamp and position.
    pub fn new(timestamp: u64, pos_x: f64, pos_y: f64) -> Self {
        Self {
            timestamp: Some(timestamp),
            pos_x: Some(pos_x),
            pos_y: Some(pos_y),
            ..Default::default()
        }
    }

    /// X coordinate with the invalid sentinel (or NaN) coerced to `0.0`.
    pub fn x(&self) -> f64 {
        or_zero(self.pos_x)
    }

    /// Y coordinate with the invalid sentinel (or NaN) coerced to `0.0`.
    pub fn y(&self) -> f64 {
        or_zero(self.pos_y)
    }
}

/// `None` and NaN both read as zero; the fields are public, so a NaN can
/// arrive without going through [`RawRow::parse`].
fn or_zero(v: Option<f64>) -> f64 {
    v.filter(|v| !v.is_nan()).unwrap_or(0.0)
}

/// A row as it comes out of the record store.
///
/// Every measurement column is kept as an untyped JSON value until
/// [`RawRow::parse`] runs.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct RawRow {
    #[serde(default)]
    pub human_id: u32,
    #[serde(default)]
    pub timestamp: Value,
    #[serde(default)]
    pub pos_x: Value,
    #[serde(default)]
    pub pos_y: Value,
    #[serde(default)]
    pub vel_x: Value,
    #[serde(default)]
    pub vel_y: Value,
    #[serde(default)]
    pub confidence: Value,
}

impl RawRow {
    /// Converts the loose row into a typed [`Record`].
    pub fn parse(&self) -> Record {
        Record {
            human_id: self.human_id,
            timestamp: parse_timestamp(&self.timestamp),
            pos_x: coerce_number(&self.pos_x),
            pos_y: coerce_number(&self.pos_y),
            vel_x: coerce_number(&self.vel_x),
            vel_y: coerce_number(&self.vel_y),
            confidence: coerce_number(&self.confidence),
        }
    }

    /// Timestamp of the row after coercion.
    pub fn timestamp_ms(&self) -> Option<u64> {
        parse_timestamp(&self.timestamp)
    }
}

impl From<&Record> for RawRow {
    fn from(record: &Record) -> Self {
        let num = |v: Option<f64>| v.map(Value::from).unwrap_or(Value::Null);
        Self {
            human_id: record.human_id,
            timestamp: record.timestamp.map(Value::from).unwrap_or(Value::Null),
            pos_x: num(record.pos_x),
            pos_y: num(record.pos_y),
            vel_x: num(record.vel_x),
            vel_y: num(record.vel_y),
            confidence: num(record.confidence),
        }
    }
}

/// Reads a finite number out of a loosely typed value.
///
/// Numbers pass through, numeric strings are parsed (an empty string reads as
/// zero, `0x`/`0o`/`0b` prefixes read as unsigned integers), booleans map to
/// `1.0`/`0.0`. Null, arrays, objects, garbage strings and non-finite results
/// yield `None`.
pub fn coerce_number(value: &Value) -> Option<f64> {
    let n = match value {
        Value::Number(n) => n.as_f64()?,
        Value::String(s) => {
            let s = s.trim();
            if s.is_empty() {
                0.0
            } else if let Some(n) = parse_radix(s) {
                n
            } else {
                s.parse::<f64>().ok()?
            }
        }
        Value::Bool(b) => {
            if *b {
                1.0
            } else {
                0.0
            }
        }
        Value::Null | Value::Array(_) | Value::Object(_) => return None,
    };
    n.is_finite().then_some(n)
}

/// Unsigned integer literal with a `0x`, `0o` or `0b` prefix (either case).
fn parse_radix(s: &str) -> Option<f64> {
    let (prefix, digits) = (s.get(..2)?, s.get(2..)?);
    if digits.starts_with('+') {
        return None;
    }
    let radix = match prefix {
        "0x" | "0X" => 16,
        "0o" | "0O" => 8,
        "0b" | "0B" => 2,
        _ => return None,
    };
    u64::from_str_radix(digits, radix).ok().map(|n| n as f64)
}

/// Reads a non-negative millisecond timestamp, flooring fractional values.
pub fn parse_timestamp(value: &Value) -> Option<u64> {
    if let Value::Number(n) = value {
        if let Some(ms) = n.as_u64() {
            return Some(ms);
        }
    }
    if let Value::String(s) = value {
        if let Ok(ms) = s.trim().parse::<u64>() {
            return Some(ms);
        }
    }
    let ms = coerce_number(value)?;
    if ms < 0.0 || ms >= u64::MAX as f64 {
        return None;
    }
    Some(ms.floor() as u64)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_coerce_number_variants() {
        assert_eq!(coerce_number(&json!(1.5)), Some(1.5));
        assert_eq!(coerce_number(&json!(" 2.25 ")), Some(2.25));
        assert_eq!(coerce_number(&json!("")), Some(0.0));
        assert_eq!(coerce_number(&json!(true)), Some(1.0));
        assert_eq!(coerce_number(&json!("abc")), None);
        assert_eq!(coerce_number(&json!("inf")), None);
        assert_eq!(coerce_number(&Value::Null), None);
        assert_eq!(coerce_number(&json!([1])), None);
    }

    #[test]
    fn test_coerce_number_radix_prefixes() {
        assert_eq!(coerce_number(&json!("0x10")), Some(16.0));
        assert_eq!(coerce_number(&json!("0XfF")), Some(255.0));
        assert_eq!(coerce_number(&json!("0o17")), Some(15.0));
        assert_eq!(coerce_number(&json!("0b101")), Some(5.0));
        assert_eq!(coerce_number(&json!("0x")), None);
        assert_eq!(coerce_number(&json!("0xg1")), None);
        assert_eq!(coerce_number(&json!("-0x10")), None);
    }

    #[test]
    fn test_nan_coordinates_read_as_zero() {
        let record = Record::new(0, f64::NAN, f64::NAN);
        assert_eq!(record.x(), 0.0);
        assert_eq!(record.y(), 0.0);

        let record = Record::new(0, f64::INFINITY, -1.5);
        assert_eq!(record.x(), f64::INFINITY);
        assert_eq!(record.y(), -1.5);
    }

    #[test]
    fn test_timestamp_from_bigint_string() {
        // Large epoch values must not lose precision through f64
        assert_eq!(
            parse_timestamp(&json!("1662896400123")),
            Some(1_662_896_400_123)
        );
        assert_eq!(parse_timestamp(&json!(1662896400123u64)), Some(1_662_896_400_123));
        assert_eq!(parse_timestamp(&json!(1400.9)), Some(1400));
    }

    #[test]
    fn test_timestamp_rejects_negative_and_garbage() {
        assert_eq!(parse_timestamp(&json!(-5)), None);
        assert_eq!(parse_timestamp(&json!("soon")), None);
        assert_eq!(parse_timestamp(&Value::Null), None);
    }

    #[test]
    fn test_parse_row_keeps_sentinels() {
        let row: RawRow = serde_json::from_value(json!({
            "human_id": 3,
            "timestamp": "1000",
            "pos_x": "1.5",
            "pos_y": null,
            "confidence": 0.9
        }))
        .unwrap();

        let record = row.parse();
        assert_eq!(record.human_id, 3);
        assert_eq!(record.timestamp, Some(1000));
        assert_eq!(record.pos_x, Some(1.5));
        assert_eq!(record.pos_y, None);
        assert_eq!(record.y(), 0.0);
        assert_eq!(record.vel_x, None);
        assert_eq!(record.confidence, Some(0.9));
    }

    #[test]
    fn test_record_to_row_and_back() {
        let mut record = Record::new(6000, 0.5, -2.0);
        record.human_id = 7;
        record.confidence = Some(0.75);

        let row = RawRow::from(&record);
        assert_eq!(row.parse(), record);
    }
}
