//! Telemetry decoder
//!
//! Applies a [`PacketSchema`] to a received buffer and produces a
//! [`DecodedRecord`]. Decoding is all-or-nothing: the first field that fails
//! aborts the packet with an error naming that field, and no default value is
//! ever substituted.
//!
//! Per field, in order of precedence:
//! 1. `bit` set: `(byte >> bit) & 1` as a flag, scale ignored
//! 2. special wire rule: board location, reversed text, raw passthrough
//! 3. primitive decode, then `raw * lsb + constant` when a scale is present
//!
//! Multi-element and rest-of-packet fields decode to a sequence of samples.

use std::net::{IpAddr, Ipv4Addr};
use std::sync::Arc;
use std::time::SystemTime;
use tracing::{debug, trace};

use crate::types::{
    ByteOrder, DecodedRecord, FieldSpec, FieldValue, PacketSchema, PrimitiveType, RawPacket, Value,
    WireRule,
};
use crate::{QuaboError, Result};

/// Render a packed board location as the device's IPv4 address.
///
/// The high octet is the third address byte and the low octet the fourth,
/// under the fixed `192.168.` prefix.
pub fn board_location(raw: u16) -> Ipv4Addr {
    let [hi, lo] = raw.to_be_bytes();
    Ipv4Addr::new(192, 168, hi, lo)
}

/// Decode one buffer against a schema.
pub fn decode(schema: &PacketSchema, raw: &[u8], timestamp: SystemTime) -> Result<DecodedRecord> {
    let order = schema.version.byte_order();
    let mut fields = Vec::with_capacity(schema.field_count());

    for field in schema.fields() {
        let bytes = field.slice(raw).ok_or_else(|| {
            QuaboError::truncated(&field.name, field.end().max(field.offset), raw.len())
        })?;
        let value = decode_field(field, bytes, order).map_err(|e| attach_field(e, field))?;
        trace!(field = %field.name, value = %value, "decoded field");
        fields.push((field.name.clone(), value));
    }

    Ok(DecodedRecord::new(schema.name.clone(), fields, timestamp))
}

fn decode_field(
    field: &FieldSpec,
    bytes: &[u8],
    order: ByteOrder,
) -> Result<FieldValue> {
    if let Some(bit) = field.bit {
        let byte = bytes.first().ok_or_else(|| QuaboError::truncated(&field.name, 1, 0))?;
        return Ok(FieldValue::Flag((byte >> bit) & 1 == 1));
    }

    match field.rule {
        WireRule::BoardLocation => {
            let raw = field.data_type.decode(bytes, order)?;
            let packed = raw
                .as_u64()
                .and_then(|v| u16::try_from(v).ok())
                .ok_or_else(|| QuaboError::decode_failed(&field.name, "board location is not a u16"))?;
            Ok(FieldValue::Text(board_location(packed).to_string()))
        }
        WireRule::ReversedText => {
            let text = match PrimitiveType::Bytes.decode(bytes, order)? {
                Value::Text(text) => text,
                other => {
                    return Err(QuaboError::decode_failed(
                        &field.name,
                        format!("expected text, got {other:?}"),
                    ));
                }
            };
            Ok(FieldValue::Text(text.chars().rev().collect()))
        }
        WireRule::Raw => Ok(FieldValue::Scalar(field.data_type.decode(bytes, order)?)),
        WireRule::Standard => decode_standard(field, bytes, order),
    }
}

fn decode_standard(
    field: &FieldSpec,
    bytes: &[u8],
    order: ByteOrder,
) -> Result<FieldValue> {
    if field.data_type == PrimitiveType::Bytes {
        return match field.data_type.decode(bytes, order)? {
            Value::Text(text) => Ok(FieldValue::Text(text)),
            other => Ok(FieldValue::Scalar(other)),
        };
    }

    if field.fixed_len() != Some(field.data_type.size()) {
        return Ok(FieldValue::Sequence(field.data_type.decode_array(bytes, order)?));
    }

    let value = field.data_type.decode(bytes, order)?;
    match (field.scale, value.as_f64()) {
        (Some(scale), Some(raw)) => Ok(FieldValue::Scaled(scale.apply(raw))),
        _ => Ok(FieldValue::Scalar(value)),
    }
}

// Primitive decode errors do not know which field they came from.
fn attach_field(error: QuaboError, field: &FieldSpec) -> QuaboError {
    match error {
        QuaboError::Decode { details, .. } => QuaboError::decode_failed(&field.name, details),
        QuaboError::SizeMismatch { expected, actual } => QuaboError::decode_failed(
            &field.name,
            format!("expected a multiple of {expected} bytes, got {actual}"),
        ),
        other => other,
    }
}

/// Schema-bound decoder for one telemetry stream.
///
/// Optionally pinned to a device address: datagrams from any other sender are
/// rejected with [`QuaboError::UnexpectedSender`] before decoding.
#[derive(Debug, Clone)]
pub struct TelemetryDecoder {
    schema: Arc<PacketSchema>,
    device: Option<IpAddr>,
}

impl TelemetryDecoder {
    pub fn new(schema: Arc<PacketSchema>) -> Self {
        Self { schema, device: None }
    }

    /// Only accept datagrams sent from `device`.
    pub fn with_device(mut self, device: IpAddr) -> Self {
        self.device = Some(device);
        self
    }

    pub fn schema(&self) -> &Arc<PacketSchema> {
        &self.schema
    }

    /// Decode a raw buffer captured at `timestamp`.
    pub fn decode(&self, raw: &[u8], timestamp: SystemTime) -> Result<DecodedRecord> {
        decode(&self.schema, raw, timestamp)
    }

    /// Check the sender, then decode a received datagram.
    pub fn decode_packet(&self, packet: &RawPacket) -> Result<DecodedRecord> {
        if let Some(expected) = self.device {
            let actual = packet.source.ip();
            if actual != expected {
                debug!(%expected, %actual, "rejecting datagram from unexpected sender");
                return Err(QuaboError::UnexpectedSender { expected, actual });
            }
        }
        self.decode(&packet.data, packet.received_at)
    }
}
