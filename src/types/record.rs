//! Decoded telemetry records

use serde::Serialize;
use std::collections::HashMap;
use std::fmt;
use std::time::SystemTime;

use super::Value;

/// Decoded value of one field.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum FieldValue {
    /// Unscaled primitive value
    Scalar(Value),
    /// Linearly scaled physical value
    Scaled(f64),
    /// Single-bit flag
    Flag(bool),
    /// Text, including rendered IP addresses
    Text(String),
    /// Payload samples
    Sequence(Vec<Value>),
}

impl FieldValue {
    /// Numeric view of scalar, scaled and flag values.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            FieldValue::Scalar(v) => v.as_f64(),
            FieldValue::Scaled(v) => Some(*v),
            FieldValue::Flag(b) => Some(f64::from(u8::from(*b))),
            FieldValue::Text(_) | FieldValue::Sequence(_) => None,
        }
    }

    /// Unsigned integer view of scalar values.
    pub fn as_u64(&self) -> Option<u64> {
        match self {
            FieldValue::Scalar(v) => v.as_u64(),
            FieldValue::Flag(b) => Some(u64::from(*b)),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            FieldValue::Flag(b) => Some(*b),
            FieldValue::Scalar(Value::Bool(b)) => Some(*b),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            FieldValue::Text(s) => Some(s),
            FieldValue::Scalar(Value::Text(s)) => Some(s),
            _ => None,
        }
    }

    pub fn as_sequence(&self) -> Option<&[Value]> {
        match self {
            FieldValue::Sequence(values) => Some(values),
            _ => None,
        }
    }
}

impl fmt::Display for FieldValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FieldValue::Scalar(Value::Text(s)) | FieldValue::Text(s) => f.write_str(s),
            FieldValue::Scalar(Value::UInt64(v)) => write!(f, "{v}"),
            FieldValue::Scalar(v) => match (v.as_i64(), v.as_f64()) {
                (Some(n), _) => write!(f, "{n}"),
                (None, Some(n)) => write!(f, "{n}"),
                (None, None) => write!(f, "{v:?}"),
            },
            FieldValue::Scaled(v) => write!(f, "{v:.6}"),
            FieldValue::Flag(b) => write!(f, "{}", u8::from(*b)),
            FieldValue::Sequence(values) => write!(f, "[{} samples]", values.len()),
        }
    }
}

/// Named values decoded from one datagram.
///
/// Created fresh per received packet and immutable after decode.
#[derive(Debug, Clone, Serialize)]
pub struct DecodedRecord {
    /// Name of the schema that produced the record
    pub schema: String,
    /// Field values in schema order
    fields: Vec<(String, FieldValue)>,
    #[serde(skip)]
    index: HashMap<String, usize>,
    /// Capture time of the datagram
    pub captured_at: SystemTime,
}

impl DecodedRecord {
    pub(crate) fn new(
        schema: impl Into<String>,
        fields: Vec<(String, FieldValue)>,
        captured_at: SystemTime,
    ) -> Self {
        let index = fields.iter().enumerate().map(|(i, (name, _))| (name.clone(), i)).collect();
        Self { schema: schema.into(), fields, index, captured_at }
    }

    /// Look up a field value by name.
    pub fn get(&self, name: &str) -> Option<&FieldValue> {
        self.index.get(name).and_then(|&i| self.fields.get(i)).map(|(_, value)| value)
    }

    /// Numeric value of a field.
    pub fn get_f64(&self, name: &str) -> Option<f64> {
        self.get(name).and_then(FieldValue::as_f64)
    }

    /// Text value of a field.
    pub fn get_str(&self, name: &str) -> Option<&str> {
        self.get(name).and_then(FieldValue::as_str)
    }

    /// Iterate fields in schema order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &FieldValue)> {
        self.fields.iter().map(|(name, value)| (name.as_str(), value))
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}
