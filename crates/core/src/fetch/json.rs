//! Lenient accessors for API payload values.
//!
//! The API is not consistent about numeric types (activity minutes arrive
//! as strings, some averages as integers), so every accessor accepts both
//! numbers and numeric strings and returns `None` for anything else.

use serde_json::Value;

/// Integer value, accepting integral numbers and numeric strings.
pub fn as_int(value: &Value) -> Option<i64> {
    match value {
        Value::Number(n) => n.as_i64().or_else(|| n.as_f64().and_then(integral_f64)),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

/// `f` as an integer when it is whole and inside the `i64` range.
fn integral_f64(f: f64) -> Option<i64> {
    // i64::MAX as f64 rounds up to 2^63, hence the exclusive bound.
    let in_range = f >= i64::MIN as f64 && f < i64::MAX as f64;
    (f.fract() == 0.0 && in_range).then_some(f as i64)
}

/// Float value, accepting any number or numeric string.
pub fn as_float(value: &Value) -> Option<f64> {
    let parsed = match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    };
    parsed.filter(|f| f.is_finite())
}

pub fn int_at(record: &Value, key: &str) -> Option<i64> {
    record.get(key).and_then(as_int)
}

pub fn float_at(record: &Value, key: &str) -> Option<f64> {
    record.get(key).and_then(as_float)
}

pub fn str_at<'a>(record: &'a Value, key: &str) -> Option<&'a str> {
    record.get(key).and_then(Value::as_str)
}

/// Array at a dotted path, empty when any segment is missing.
pub fn array_at<'a>(root: &'a Value, path: &[&str]) -> &'a [Value] {
    path.iter()
        .try_fold(root, |node, key| node.get(key))
        .and_then(Value::as_array)
        .map_or(&[][..], Vec::as_slice)
}
