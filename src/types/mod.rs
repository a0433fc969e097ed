//! Core types for packet layouts and decoded values.
//!
//! ## Architecture
//!
//! - [`PrimitiveType`] maps a wire type to its width and fixed-width codec
//! - [`FieldSpec`] places one named field inside a packet, with optional
//!   linear scale, single-bit flag or special wire rule
//! - [`PacketSchema`] is the validated, ordered field set of one packet layout
//! - [`RawPacket`] carries a received datagram (zero-copy via Arc)
//! - [`DecodedRecord`] holds the named values decoded from one datagram
//!
//! Byte order is never inferred: each schema names its [`ProtocolVersion`],
//! and [`WIRE_PROTOCOL`] is the revision current firmware speaks.
//!
//! ## Usage Example
//!
//! ```rust
//! use quabo::types::{FieldSpec, PacketSchema, PrimitiveType, ProtocolVersion};
//!
//! let schema = PacketSchema::new(
//!     "example",
//!     vec![
//!         FieldSpec::new("tag", 0, 1, PrimitiveType::UInt8),
//!         FieldSpec::new("hvmon0", 4, 2, PrimitiveType::UInt16).scaled(-1.209361e-3, 0.0),
//!     ],
//!     64,
//!     ProtocolVersion::Current,
//! )
//! .unwrap();
//!
//! assert_eq!(schema.get_field("hvmon0").unwrap().offset, 4);
//! assert_eq!(schema.required_len(), 6);
//! ```

mod field;
mod frame;
mod primitive;
mod record;
mod schema;
mod update_rate;

// Re-export all public types
pub use field::{FieldLength, FieldSpec, Scale, WireRule};
pub use frame::RawPacket;
pub use primitive::{ByteOrder, PrimitiveType, ProtocolVersion, Value, WIRE_PROTOCOL};
pub use record::{DecodedRecord, FieldValue};
pub use schema::PacketSchema;
pub use update_rate::UpdateRate;
