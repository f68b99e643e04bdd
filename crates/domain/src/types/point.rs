use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::errors::{Result, VitalSyncError};

/// Tag key that carries the configured device display name.
pub const DEVICE_TAG: &str = "Device";

/// Numeric payload of a field. The integer/float distinction is preserved
/// through encoding.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FieldValue {
    Integer(i64),
    Float(f64),
}

impl FieldValue {
    pub fn is_integer(&self) -> bool {
        matches!(self, Self::Integer(_))
    }
}

impl From<i64> for FieldValue {
    fn from(value: i64) -> Self {
        Self::Integer(value)
    }
}

impl From<f64> for FieldValue {
    fn from(value: f64) -> Self {
        Self::Float(value)
    }
}

/// A single time-stamped, tagged, multi-field measurement.
///
/// Constructed only through [`PointBuilder`], which guarantees a non-empty
/// field set, finite floats and a timestamp that fits in i64 nanoseconds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Point {
    measurement: String,
    timestamp: DateTime<Utc>,
    tags: BTreeMap<String, String>,
    fields: BTreeMap<String, FieldValue>,
}

impl Point {
    pub fn builder(measurement: impl Into<String>, timestamp: DateTime<Utc>) -> PointBuilder {
        PointBuilder {
            measurement: measurement.into(),
            timestamp,
            tags: BTreeMap::new(),
            fields: BTreeMap::new(),
        }
    }

    pub fn measurement(&self) -> &str {
        &self.measurement
    }

    pub fn timestamp(&self) -> DateTime<Utc> {
        self.timestamp
    }

    /// Nanoseconds since the Unix epoch.
    pub fn timestamp_nanos(&self) -> i64 {
        // Range checked by the builder.
        self.timestamp.timestamp_nanos_opt().unwrap_or_default()
    }

    pub fn tags(&self) -> &BTreeMap<String, String> {
        &self.tags
    }

    pub fn tag(&self, key: &str) -> Option<&str> {
        self.tags.get(key).map(String::as_str)
    }

    pub fn device(&self) -> Option<&str> {
        self.tag(DEVICE_TAG)
    }

    pub fn fields(&self) -> &BTreeMap<String, FieldValue> {
        &self.fields
    }

    pub fn field(&self, key: &str) -> Option<FieldValue> {
        self.fields.get(key).copied()
    }
}

/// Builder for [`Point`].
#[derive(Debug, Clone)]
pub struct PointBuilder {
    measurement: String,
    timestamp: DateTime<Utc>,
    tags: BTreeMap<String, String>,
    fields: BTreeMap<String, FieldValue>,
}

impl PointBuilder {
    pub fn tag(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.tags.insert(key.into(), value.into());
        self
    }

    /// Attach the `Device` tag.
    pub fn device(self, name: impl Into<String>) -> Self {
        self.tag(DEVICE_TAG, name)
    }

    pub fn field(mut self, key: impl Into<String>, value: impl Into<FieldValue>) -> Self {
        self.fields.insert(key.into(), value.into());
        self
    }

    /// Add the field only when a value is present.
    pub fn field_opt(self, key: impl Into<String>, value: Option<FieldValue>) -> Self {
        match value {
            Some(value) => self.field(key, value),
            None => self,
        }
    }

    pub fn has_fields(&self) -> bool {
        !self.fields.is_empty()
    }

    /// Validate and freeze the point.
    ///
    /// # Errors
    /// Returns `VitalSyncError::InvalidInput` when the measurement is empty,
    /// no field was set, a float is not finite, a key is empty or the
    /// timestamp is outside the i64 nanosecond range.
    pub fn build(self) -> Result<Point> {
        if self.measurement.is_empty() {
            return Err(VitalSyncError::InvalidInput("measurement name is empty".into()));
        }
        if self.fields.is_empty() {
            return Err(VitalSyncError::InvalidInput(format!(
                "point '{}' has no fields",
                self.measurement
            )));
        }
        if let Some((key, _)) = self
            .fields
            .iter()
            .find(|(_, value)| matches!(value, FieldValue::Float(v) if !v.is_finite()))
        {
            return Err(VitalSyncError::InvalidInput(format!(
                "field '{key}' of '{}' is not a finite number",
                self.measurement
            )));
        }
        if self.tags.keys().chain(self.fields.keys()).any(String::is_empty) {
            return Err(VitalSyncError::InvalidInput(format!(
                "point '{}' has an empty tag or field key",
                self.measurement
            )));
        }
        if self.timestamp.timestamp_nanos_opt().is_none() {
            return Err(VitalSyncError::InvalidInput(format!(
                "timestamp {} cannot be expressed in nanoseconds",
                self.timestamp
            )));
        }

        Ok(Point {
            measurement: self.measurement,
            timestamp: self.timestamp,
            tags: self.tags,
            fields: self.fields,
        })
    }
}
