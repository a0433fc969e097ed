//! Housekeeping packet layout (64 bytes)
//!
//! ```text
//!  0      tag            int8
//!  2..4   boardloc       u16, rendered 192.168.<hi>.<lo>
//!  4..12  hvmon0-3       u16 x -1.209361 mV
//! 12..20  hvimon0-3      (65536 - N) x 38.147 nA
//! 20..22  rawhvmon       u16 x -1.209361 mV
//! 22..30  v12/v18/v33/v37mon
//! 30..36  i10/i18/i33mon
//! 36..38  det_temp       0.25 degC
//! 38..40  fpga_temp      N / 130.04 - 273.15
//! 40..44  vccint, vccaux 3 / 65536 V
//! 44..52  uid            u64, raw
//! 52      bit0 shutter_status, bit1 sensor_status
//! 53      bit0 pcbrev
//! 56..60  fwtime         u32, raw
//! 60..64  fwver          4 ASCII chars, transmitted reversed
//! ```

use crate::Result;
use crate::types::{FieldSpec, PacketSchema, PrimitiveType, ProtocolVersion, WIRE_PROTOCOL, WireRule};

/// Housekeeping packet length in bytes.
pub const HOUSEKEEPING_LEN: usize = 64;

pub const HVMON_LSB: f64 = -1.209361e-3;
pub const HVIMON_LSB: f64 = -38.147e-9;
pub const HVIMON_CONSTANT: f64 = 65536.0 * 38.147e-9;

/// Housekeeping schema for the protocol revision current firmware speaks.
pub fn housekeeping() -> Result<PacketSchema> {
    housekeeping_for(WIRE_PROTOCOL)
}

/// Housekeeping schema for a given protocol revision.
///
/// The layout is identical across revisions; only the byte order differs.
pub fn housekeeping_for(version: ProtocolVersion) -> Result<PacketSchema> {
    use PrimitiveType::{Bytes, UInt8, UInt16, UInt32, UInt64};

    let u16_at = |name: &str, offset: usize| FieldSpec::new(name, offset, 2, UInt16);

    let mut fields = vec![
        FieldSpec::new("tag", 0, 1, UInt8),
        u16_at("boardloc", 2).with_rule(WireRule::BoardLocation),
    ];

    for (i, offset) in [4, 6, 8, 10].into_iter().enumerate() {
        fields.push(u16_at(&format!("hvmon{i}"), offset).scaled(HVMON_LSB, 0.0).with_units("V"));
    }
    for (i, offset) in [12, 14, 16, 18].into_iter().enumerate() {
        fields.push(
            u16_at(&format!("hvimon{i}"), offset)
                .scaled(HVIMON_LSB, HVIMON_CONSTANT)
                .with_units("A"),
        );
    }

    fields.extend([
        u16_at("rawhvmon", 20).scaled(HVMON_LSB, 0.0).with_units("V"),
        u16_at("v12mon", 22).scaled(19.07e-6, 0.0).with_units("V"),
        u16_at("v18mon", 24).scaled(38.14e-6, 0.0).with_units("V"),
        u16_at("v33mon", 26).scaled(76.2e-6, 0.0).with_units("V"),
        u16_at("v37mon", 28).scaled(76.2e-6, 0.0).with_units("V"),
        u16_at("i10mon", 30).scaled(182e-6, 0.0).with_units("A"),
        u16_at("i18mon", 32).scaled(37.8e-6, 0.0).with_units("A"),
        u16_at("i33mon", 34).scaled(37.8e-6, 0.0).with_units("A"),
        u16_at("det_temp", 36).scaled(0.25, 0.0).with_units("degC"),
        u16_at("fpga_temp", 38).scaled(1.0 / 130.04, -273.15).with_units("degC"),
        u16_at("vccint", 40).scaled(3.0 / 65536.0, 0.0).with_units("V"),
        u16_at("vccaux", 42).scaled(3.0 / 65536.0, 0.0).with_units("V"),
        FieldSpec::new("uid", 44, 8, UInt64).with_rule(WireRule::Raw),
        FieldSpec::flag("shutter_status", 52, 0),
        FieldSpec::flag("sensor_status", 52, 1),
        FieldSpec::flag("pcbrev", 53, 0),
        FieldSpec::new("fwtime", 56, 4, UInt32).with_rule(WireRule::Raw),
        FieldSpec::new("fwver", 60, 4, Bytes).with_rule(WireRule::ReversedText),
    ]);

    PacketSchema::new("housekeeping", fields, HOUSEKEEPING_LEN, version)
}
