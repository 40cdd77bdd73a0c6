use std::collections::BTreeMap;
use std::fmt;

use chrono::{DateTime, Utc};

/// One typed field value.
///
/// Integers are kept apart from floats because the line protocol types the
/// series differently on the server side, and a series cannot change type
/// once written.
#[derive(Clone, Debug, PartialEq)]
pub enum FieldValue {
    Float(f64),
    Integer(i64),
    Boolean(bool),
    Text(String),
}

impl From<f64> for FieldValue {
    fn from(value: f64) -> Self {
        FieldValue::Float(value)
    }
}

impl From<f32> for FieldValue {
    fn from(value: f32) -> Self {
        FieldValue::Float(value as f64)
    }
}

impl From<i64> for FieldValue {
    fn from(value: i64) -> Self {
        FieldValue::Integer(value)
    }
}

impl From<u16> for FieldValue {
    fn from(value: u16) -> Self {
        FieldValue::Integer(value as i64)
    }
}

impl From<bool> for FieldValue {
    fn from(value: bool) -> Self {
        FieldValue::Boolean(value)
    }
}

impl From<&str> for FieldValue {
    fn from(value: &str) -> Self {
        FieldValue::Text(value.to_string())
    }
}

/// One named, tagged sample in the shape InfluxDB expects.
///
/// Tags identify the series and are set once at startup; fields carry the
/// per-cycle values and are cleared and repopulated every iteration.
/// Tag and field sets are ordered so the encoded line is deterministic.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct DataPoint {
    measurement: String,
    tags: BTreeMap<String, String>,
    fields: BTreeMap<String, FieldValue>,
    timestamp: Option<DateTime<Utc>>,
}

impl DataPoint {
    pub fn new(measurement: impl Into<String>) -> Self {
        Self {
            measurement: measurement.into(),
            ..Default::default()
        }
    }

    pub fn add_tag(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.tags.insert(key.into(), value.into());
    }

    pub fn add_field(&mut self, key: impl Into<String>, value: impl Into<FieldValue>) {
        self.fields.insert(key.into(), value.into());
    }

    /// Drops every field and the timestamp. Measurement name and tags
    /// survive for the next cycle.
    pub fn clear_fields(&mut self) {
        self.fields.clear();
        self.timestamp = None;
    }

    pub fn set_timestamp(&mut self, when: DateTime<Utc>) {
        self.timestamp = Some(when);
    }

    pub fn tag(&self, key: &str) -> Option<&str> {
        self.tags.get(key).map(String::as_str)
    }

    pub fn field(&self, key: &str) -> Option<&FieldValue> {
        self.fields.get(key)
    }

    pub fn has_field(&self, key: &str) -> bool {
        self.fields.contains_key(key)
    }

    pub fn field_count(&self) -> usize {
        self.fields.len()
    }

    /// Encodes the point as one InfluxDB v2 line, nanosecond precision.
    pub fn to_line_protocol(&self) -> String {
        let mut line = escape_measurement(&self.measurement);

        for (key, value) in &self.tags {
            line.push(',');
            line.push_str(&escape_key(key));
            line.push('=');
            line.push_str(&escape_key(value));
        }

        line.push(' ');
        let mut first = true;
        for (key, value) in &self.fields {
            if !first {
                line.push(',');
            }
            first = false;
            line.push_str(&escape_key(key));
            line.push('=');
            match value {
                FieldValue::Float(v) => line.push_str(&format!("{v}")),
                FieldValue::Integer(v) => line.push_str(&format!("{v}i")),
                FieldValue::Boolean(v) => line.push_str(if *v { "true" } else { "false" }),
                FieldValue::Text(v) => {
                    line.push('"');
                    line.push_str(&v.replace('\\', "\\\\").replace('"', "\\\""));
                    line.push('"');
                }
            }
        }

        if let Some(when) = self.timestamp {
            line.push(' ');
            line.push_str(&when.timestamp_nanos_opt().unwrap_or_default().to_string());
        }

        line
    }
}

impl fmt::Display for DataPoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_line_protocol())
    }
}

/// Measurement names escape commas and spaces.
fn escape_measurement(input: &str) -> String {
    input.replace(',', "\\,").replace(' ', "\\ ")
}

/// Tag keys, tag values and field keys escape commas, equals and spaces.
fn escape_key(input: &str) -> String {
    input
        .replace(',', "\\,")
        .replace('=', "\\=")
        .replace(' ', "\\ ")
}
