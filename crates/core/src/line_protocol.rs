//! Line protocol codec.
//!
//! ```text
//! measurement,tag1=val1,tag2=val2 field1=1i,field2=0.5 timestamp_ns
//! ```
//!
//! Measurement names escape commas and spaces; tag keys, tag values and
//! field keys additionally escape `=`. Backslashes are escaped everywhere so
//! that [`parse_line`] can reverse [`encode_point`] exactly. Integers carry
//! the `i` suffix, floats are written with Rust's shortest round-trip form.

use chrono::DateTime;
use vitalsync_domain::{FieldValue, Point, Result, VitalSyncError};

/// Encode one point as a single line (no trailing newline).
pub fn encode_point(point: &Point) -> String {
    let mut line = escape_measurement(point.measurement());

    for (key, value) in point.tags() {
        line.push(',');
        line.push_str(&escape_key(key));
        line.push('=');
        line.push_str(&escape_key(value));
    }

    line.push(' ');
    for (i, (key, value)) in point.fields().iter().enumerate() {
        if i > 0 {
            line.push(',');
        }
        line.push_str(&escape_key(key));
        line.push('=');
        line.push_str(&encode_field(value));
    }

    line.push(' ');
    line.push_str(&point.timestamp_nanos().to_string());
    line
}

/// Encode a batch, one line per point, joined with `\n`.
pub fn encode_batch(points: &[Point]) -> String {
    points.iter().map(encode_point).collect::<Vec<_>>().join("\n")
}

fn encode_field(value: &FieldValue) -> String {
    match value {
        FieldValue::Integer(v) => format!("{v}i"),
        FieldValue::Float(v) => format!("{v}"),
    }
}

fn escape_measurement(s: &str) -> String {
    s.replace('\\', "\\\\").replace(',', "\\,").replace(' ', "\\ ")
}

fn escape_key(s: &str) -> String {
    s.replace('\\', "\\\\").replace(',', "\\,").replace('=', "\\=").replace(' ', "\\ ")
}

/// Parse a line produced by [`encode_point`] back into a [`Point`].
///
/// # Errors
/// Returns `VitalSyncError::Payload` for malformed lines and propagates
/// point validation failures.
pub fn parse_line(line: &str) -> Result<Point> {
    let sections = split_unescaped(line, ' ');
    let [series, fields, timestamp] = sections.as_slice() else {
        return Err(malformed(line, "expected three space-separated sections"));
    };

    let mut series_parts = split_unescaped(series, ',').into_iter();
    let measurement = unescape(&series_parts.next().unwrap_or_default());
    let nanos: i64 = timestamp.parse().map_err(|_| malformed(line, "bad timestamp"))?;
    let mut builder = Point::builder(measurement, DateTime::from_timestamp_nanos(nanos));

    for tag in series_parts {
        let (key, value) = split_pair(&tag).ok_or_else(|| malformed(line, "bad tag"))?;
        builder = builder.tag(key, value);
    }

    for field in split_unescaped(fields, ',') {
        let (key, raw) = split_pair(&field).ok_or_else(|| malformed(line, "bad field"))?;
        let value = match raw.strip_suffix('i') {
            Some(int) => FieldValue::Integer(
                int.parse().map_err(|_| malformed(line, "bad integer field"))?,
            ),
            None => FieldValue::Float(raw.parse().map_err(|_| malformed(line, "bad float field"))?),
        };
        builder = builder.field(key, value);
    }

    builder.build()
}

fn malformed(line: &str, reason: &str) -> VitalSyncError {
    VitalSyncError::Payload(format!("malformed line protocol ({reason}): {line}"))
}

/// Split on `sep` where it is not preceded by an escaping backslash. Escape
/// sequences are kept intact for a later [`unescape`].
fn split_unescaped(s: &str, sep: char) -> Vec<String> {
    let mut parts = Vec::new();
    let mut current = String::new();
    let mut chars = s.chars();
    while let Some(c) = chars.next() {
        if c == '\\' {
            current.push(c);
            if let Some(next) = chars.next() {
                current.push(next);
            }
        } else if c == sep {
            parts.push(std::mem::take(&mut current));
        } else {
            current.push(c);
        }
    }
    parts.push(current);
    parts
}

fn split_pair(s: &str) -> Option<(String, String)> {
    let mut parts = split_unescaped(s, '=').into_iter();
    let key = parts.next()?;
    let value = parts.next()?;
    if parts.next().is_some() {
        return None;
    }
    Some((unescape(&key), unescape(&value)))
}

fn unescape(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut chars = s.chars();
    while let Some(c) = chars.next() {
        if c == '\\' {
            if let Some(next) = chars.next() {
                out.push(next);
            }
        } else {
            out.push(c);
        }
    }
    out
}
