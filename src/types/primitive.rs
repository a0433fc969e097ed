//! Primitive wire types and the fixed-width codec.

use serde::{Deserialize, Serialize};

use crate::{QuaboError, Result};

/// Byte order of multi-byte values on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ByteOrder {
    Little,
    Big,
}

/// Telemetry protocol revision.
///
/// The first firmware revision transmitted telemetry big-endian; the current
/// one is little-endian. Each schema names the revision it was written for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ProtocolVersion {
    Legacy,
    Current,
}

impl ProtocolVersion {
    /// Byte order used by this protocol revision.
    pub const fn byte_order(self) -> ByteOrder {
        match self {
            ProtocolVersion::Legacy => ByteOrder::Big,
            ProtocolVersion::Current => ByteOrder::Little,
        }
    }
}

/// Protocol revision spoken by current device firmware.
pub const WIRE_PROTOCOL: ProtocolVersion = ProtocolVersion::Current;

/// Supported primitive field types.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PrimitiveType {
    Int8,
    UInt8,
    Int16,
    UInt16,
    Int32,
    UInt32,
    Int64,
    UInt64,
    Float32,
    Float64,
    /// Raw octets, decoded as text
    Bytes,
    Bool,
}

impl PrimitiveType {
    /// Size in bytes of one element of this type.
    pub const fn size(&self) -> usize {
        match self {
            PrimitiveType::Int8 | PrimitiveType::UInt8 => 1,
            PrimitiveType::Bytes | PrimitiveType::Bool => 1,
            PrimitiveType::Int16 | PrimitiveType::UInt16 => 2,
            PrimitiveType::Int32 | PrimitiveType::UInt32 | PrimitiveType::Float32 => 4,
            PrimitiveType::Int64 | PrimitiveType::UInt64 | PrimitiveType::Float64 => 8,
        }
    }

    /// Whether values of this type are signed integers.
    pub const fn is_signed(&self) -> bool {
        matches!(
            self,
            PrimitiveType::Int8 | PrimitiveType::Int16 | PrimitiveType::Int32 | PrimitiveType::Int64
        )
    }

    /// Whether values of this type are IEEE-754 floats.
    pub const fn is_float(&self) -> bool {
        matches!(self, PrimitiveType::Float32 | PrimitiveType::Float64)
    }

    /// Decode exactly one element from `bytes`.
    ///
    /// `Bytes` consumes the whole slice as text; every other type requires
    /// `bytes.len() == self.size()`.
    pub fn decode(&self, bytes: &[u8], order: ByteOrder) -> Result<Value> {
        if *self != PrimitiveType::Bytes && bytes.len() != self.size() {
            return Err(QuaboError::SizeMismatch { expected: self.size(), actual: bytes.len() });
        }

        macro_rules! read {
            ($ty:ty, $variant:ident) => {{
                let raw: [u8; std::mem::size_of::<$ty>()] = bytes
                    .try_into()
                    .map_err(|_| QuaboError::SizeMismatch { expected: self.size(), actual: bytes.len() })?;
                Value::$variant(match order {
                    ByteOrder::Little => <$ty>::from_le_bytes(raw),
                    ByteOrder::Big => <$ty>::from_be_bytes(raw),
                })
            }};
        }

        Ok(match self {
            PrimitiveType::Int8 => Value::Int8(bytes[0] as i8),
            PrimitiveType::UInt8 => Value::UInt8(bytes[0]),
            PrimitiveType::Bool => Value::Bool(bytes[0] != 0),
            PrimitiveType::Int16 => read!(i16, Int16),
            PrimitiveType::UInt16 => read!(u16, UInt16),
            PrimitiveType::Int32 => read!(i32, Int32),
            PrimitiveType::UInt32 => read!(u32, UInt32),
            PrimitiveType::Int64 => read!(i64, Int64),
            PrimitiveType::UInt64 => read!(u64, UInt64),
            PrimitiveType::Float32 => read!(f32, Float32),
            PrimitiveType::Float64 => read!(f64, Float64),
            PrimitiveType::Bytes => std::str::from_utf8(bytes)
                .map(|text| Value::Text(text.to_string()))
                .map_err(|e| QuaboError::decode_failed("<bytes>", e.to_string()))?,
        })
    }

    /// Decode a packed array of elements.
    ///
    /// Fails with `SizeMismatch` unless the slice length is a whole number of
    /// elements.
    pub fn decode_array(&self, bytes: &[u8], order: ByteOrder) -> Result<Vec<Value>> {
        let size = self.size();
        if bytes.len() % size != 0 {
            return Err(QuaboError::SizeMismatch {
                expected: bytes.len() / size * size + size,
                actual: bytes.len(),
            });
        }
        bytes.chunks_exact(size).map(|chunk| self.decode(chunk, order)).collect()
    }

    /// Encode one value of this type.
    pub fn encode(&self, value: &Value, order: ByteOrder) -> Result<Vec<u8>> {
        if value.primitive_type() != *self {
            return Err(QuaboError::TypeConversion {
                details: format!("Expected {:?}, got {:?}", self, value.primitive_type()),
            });
        }
        Ok(value.to_bytes(order))
    }
}

/// Runtime value of a primitive type.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Value {
    Int8(i8),
    UInt8(u8),
    Int16(i16),
    UInt16(u16),
    Int32(i32),
    UInt32(u32),
    Int64(i64),
    UInt64(u64),
    Float32(f32),
    Float64(f64),
    Text(String),
    Bool(bool),
}

impl Value {
    /// Primitive type this value encodes as.
    pub fn primitive_type(&self) -> PrimitiveType {
        match self {
            Value::Int8(_) => PrimitiveType::Int8,
            Value::UInt8(_) => PrimitiveType::UInt8,
            Value::Int16(_) => PrimitiveType::Int16,
            Value::UInt16(_) => PrimitiveType::UInt16,
            Value::Int32(_) => PrimitiveType::Int32,
            Value::UInt32(_) => PrimitiveType::UInt32,
            Value::Int64(_) => PrimitiveType::Int64,
            Value::UInt64(_) => PrimitiveType::UInt64,
            Value::Float32(_) => PrimitiveType::Float32,
            Value::Float64(_) => PrimitiveType::Float64,
            Value::Text(_) => PrimitiveType::Bytes,
            Value::Bool(_) => PrimitiveType::Bool,
        }
    }

    /// Serialize this value in the given byte order.
    pub fn to_bytes(&self, order: ByteOrder) -> Vec<u8> {
        macro_rules! put {
            ($v:expr) => {
                match order {
                    ByteOrder::Little => $v.to_le_bytes().to_vec(),
                    ByteOrder::Big => $v.to_be_bytes().to_vec(),
                }
            };
        }

        match self {
            Value::Int8(v) => vec![*v as u8],
            Value::UInt8(v) => vec![*v],
            Value::Bool(v) => vec![u8::from(*v)],
            Value::Int16(v) => put!(v),
            Value::UInt16(v) => put!(v),
            Value::Int32(v) => put!(v),
            Value::UInt32(v) => put!(v),
            Value::Int64(v) => put!(v),
            Value::UInt64(v) => put!(v),
            Value::Float32(v) => put!(v),
            Value::Float64(v) => put!(v),
            Value::Text(text) => text.as_bytes().to_vec(),
        }
    }

    /// Numeric view of the value, used for linear scaling.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Int8(v) => Some(*v as f64),
            Value::UInt8(v) => Some(*v as f64),
            Value::Int16(v) => Some(*v as f64),
            Value::UInt16(v) => Some(*v as f64),
            Value::Int32(v) => Some(*v as f64),
            Value::UInt32(v) => Some(*v as f64),
            Value::Int64(v) => Some(*v as f64),
            Value::UInt64(v) => Some(*v as f64),
            Value::Float32(v) => Some(*v as f64),
            Value::Float64(v) => Some(*v),
            Value::Bool(v) => Some(f64::from(u8::from(*v))),
            Value::Text(_) => None,
        }
    }

    /// Integer view of the value. Floats and text return `None`.
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Value::Int8(v) => Some(*v as i64),
            Value::UInt8(v) => Some(*v as i64),
            Value::Int16(v) => Some(*v as i64),
            Value::UInt16(v) => Some(*v as i64),
            Value::Int32(v) => Some(*v as i64),
            Value::UInt32(v) => Some(*v as i64),
            Value::Int64(v) => Some(*v),
            Value::UInt64(v) => i64::try_from(*v).ok(),
            Value::Bool(v) => Some(i64::from(*v)),
            Value::Float32(_) | Value::Float64(_) | Value::Text(_) => None,
        }
    }

    /// Unsigned view of the value. Negative numbers, floats and text return `None`.
    pub fn as_u64(&self) -> Option<u64> {
        match self {
            Value::UInt64(v) => Some(*v),
            other => other.as_i64().and_then(|v| u64::try_from(v).ok()),
        }
    }
}
