//! Packet schema types

use serde::Serialize;
use std::collections::HashMap;

use super::{FieldLength, FieldSpec, PrimitiveType, ProtocolVersion};

/// Ordered set of named fields describing one fixed-layout packet.
///
/// Field order is documentation order; every field carries an absolute
/// offset, so decoding does not depend on it.
#[derive(Debug, Clone, Serialize)]
pub struct PacketSchema {
    /// Schema name (e.g. "housekeeping", "ph")
    pub name: String,
    /// Fields in wire order
    fields: Vec<FieldSpec>,
    /// Name to position in `fields` (O(1) lookup)
    #[serde(skip)]
    index: HashMap<String, usize>,
    /// Nominal packet length in bytes
    pub packet_len: usize,
    /// Protocol revision the layout belongs to
    pub version: ProtocolVersion,
}

impl PacketSchema {
    /// Create a new PacketSchema with validation.
    pub fn new(
        name: impl Into<String>,
        fields: Vec<FieldSpec>,
        packet_len: usize,
        version: ProtocolVersion,
    ) -> crate::Result<Self> {
        let index = fields.iter().enumerate().map(|(i, f)| (f.name.clone(), i)).collect();
        let schema = Self { name: name.into(), fields, index, packet_len, version };
        schema.validate()?;
        Ok(schema)
    }

    /// Validate the schema for consistency.
    pub fn validate(&self) -> crate::Result<()> {
        if self.index.len() != self.fields.len() {
            return Err(crate::QuaboError::schema(format!(
                "Schema '{}' has duplicate field names",
                self.name
            )));
        }

        for field in &self.fields {
            if let Some(bit) = field.bit {
                if bit > 7 {
                    return Err(crate::QuaboError::schema(format!(
                        "Field '{}' selects bit {}, flags address bits 0-7",
                        field.name, bit
                    )));
                }
                if field.length != FieldLength::Fixed(1) {
                    return Err(crate::QuaboError::schema(format!(
                        "Flag field '{}' must be one byte long",
                        field.name
                    )));
                }
            }

            match field.length {
                FieldLength::Fixed(0) => {
                    return Err(crate::QuaboError::schema(format!(
                        "Field '{}' has zero length",
                        field.name
                    )));
                }
                FieldLength::Fixed(len) => {
                    if field.data_type != PrimitiveType::Bytes && len % field.data_type.size() != 0
                    {
                        return Err(crate::QuaboError::schema(format!(
                            "Field '{}' length {} is not a multiple of {:?}",
                            field.name, len, field.data_type
                        )));
                    }
                    if field.offset + len > self.packet_len {
                        return Err(crate::QuaboError::schema(format!(
                            "Field '{}' ends at byte {} past packet length {}",
                            field.name,
                            field.offset + len,
                            self.packet_len
                        )));
                    }
                }
                FieldLength::Rest => {
                    if field.offset > self.packet_len {
                        return Err(crate::QuaboError::schema(format!(
                            "Field '{}' starts past packet length {}",
                            field.name, self.packet_len
                        )));
                    }
                }
            }
        }

        Ok(())
    }

    /// Get field info by name (O(1) lookup).
    pub fn get_field(&self, name: &str) -> Option<&FieldSpec> {
        self.index.get(name).and_then(|&i| self.fields.get(i))
    }

    /// Check if a field exists.
    pub fn has_field(&self, name: &str) -> bool {
        self.index.contains_key(name)
    }

    /// Fields in wire order.
    pub fn fields(&self) -> &[FieldSpec] {
        &self.fields
    }

    /// Get the number of fields.
    pub fn field_count(&self) -> usize {
        self.fields.len()
    }

    /// Smallest buffer that satisfies every fixed-length field.
    pub fn required_len(&self) -> usize {
        self.fields.iter().map(FieldSpec::end).max().unwrap_or(0)
    }
}
