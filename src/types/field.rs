//! Field descriptors for fixed-layout packets

use serde::{Deserialize, Serialize};

use super::PrimitiveType;

/// Byte length of a field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FieldLength {
    /// Exactly this many bytes
    Fixed(usize),
    /// Everything from the field offset to the end of the packet.
    ///
    /// Kept for the legacy science layout; explicit per-mode payload
    /// lengths are preferred.
    Rest,
}

/// Linear scale turning a raw reading into a physical value:
/// `value = raw * lsb + constant`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Scale {
    pub lsb: f64,
    pub constant: f64,
}

impl Scale {
    pub const fn new(lsb: f64, constant: f64) -> Self {
        Self { lsb, constant }
    }

    /// Apply the scale to a raw reading.
    pub fn apply(&self, raw: f64) -> f64 {
        raw * self.lsb + self.constant
    }
}

/// Wire rules that override the plain type-driven decode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum WireRule {
    /// Decode by primitive type, then apply the scale if present
    Standard,
    /// 16-bit board location rendered as `192.168.<hi>.<lo>`
    BoardLocation,
    /// Text transmitted last-character-first
    ReversedText,
    /// Integer passthrough, scale is never applied (IDs, timestamps)
    Raw,
}

/// Description of one named field in a packet.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldSpec {
    /// Field name, unique within its schema
    pub name: String,
    /// Byte offset from the start of the packet
    pub offset: usize,
    /// Byte length of the field
    pub length: FieldLength,
    /// Primitive type of one element
    pub data_type: PrimitiveType,
    /// Optional linear scale
    pub scale: Option<Scale>,
    /// Single-bit flag index (0-7) inside a one-byte field
    pub bit: Option<u8>,
    /// Special decode rule
    pub rule: WireRule,
    /// Units of the decoded value (e.g. "V", "A", "degC")
    pub units: String,
}

impl FieldSpec {
    /// A fixed-length field decoded by type.
    pub fn new(name: impl Into<String>, offset: usize, length: usize, data_type: PrimitiveType) -> Self {
        Self {
            name: name.into(),
            offset,
            length: FieldLength::Fixed(length),
            data_type,
            scale: None,
            bit: None,
            rule: WireRule::Standard,
            units: String::new(),
        }
    }

    /// A field running to the end of the packet.
    pub fn rest(name: impl Into<String>, offset: usize, data_type: PrimitiveType) -> Self {
        Self { length: FieldLength::Rest, ..Self::new(name, offset, 0, data_type) }
    }

    /// A single-bit flag inside a one-byte field.
    pub fn flag(name: impl Into<String>, offset: usize, bit: u8) -> Self {
        Self { bit: Some(bit), ..Self::new(name, offset, 1, PrimitiveType::UInt8) }
    }

    /// Attach a linear scale (`raw * lsb + constant`).
    pub fn scaled(mut self, lsb: f64, constant: f64) -> Self {
        self.scale = Some(Scale::new(lsb, constant));
        self
    }

    /// Attach a special decode rule.
    pub fn with_rule(mut self, rule: WireRule) -> Self {
        self.rule = rule;
        self
    }

    /// Attach units.
    pub fn with_units(mut self, units: impl Into<String>) -> Self {
        self.units = units.into();
        self
    }

    /// Fixed byte length, or `None` for rest-of-packet fields.
    pub fn fixed_len(&self) -> Option<usize> {
        match self.length {
            FieldLength::Fixed(len) => Some(len),
            FieldLength::Rest => None,
        }
    }

    /// Smallest buffer length that contains this field.
    pub fn end(&self) -> usize {
        self.offset + self.fixed_len().unwrap_or(0)
    }

    /// Number of primitive elements in a fixed-length field.
    pub fn count(&self) -> Option<usize> {
        self.fixed_len().map(|len| len / self.data_type.size())
    }

    /// Borrow this field's bytes from a packet buffer.
    ///
    /// Returns `None` when the buffer is too short; never reads out of bounds.
    pub fn slice<'a>(&self, buffer: &'a [u8]) -> Option<&'a [u8]> {
        match self.length {
            FieldLength::Fixed(len) => buffer.get(self.offset..self.offset.checked_add(len)?),
            FieldLength::Rest => buffer.get(self.offset..),
        }
    }
}
