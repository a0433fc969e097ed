//! Numeric values as they appear in hand-edited configuration files
//!
//! Integers may be YAML numbers or strings with an optional `0x`, `0o` or
//! `0b` prefix. Mask strings are always hex, prefixed or not. MAROC settings
//! are four values, written as a list or as one comma-separated string.

use serde::de::{self, Deserializer, SeqAccess, Visitor};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Parse an integer with an optional radix prefix.
pub fn parse_int(text: &str) -> Option<u64> {
    let text = text.trim();
    let (digits, radix) = if let Some(hex) = text.strip_prefix("0x").or_else(|| text.strip_prefix("0X")) {
        (hex, 16)
    } else if let Some(bin) = text.strip_prefix("0b").or_else(|| text.strip_prefix("0B")) {
        (bin, 2)
    } else if let Some(oct) = text.strip_prefix("0o").or_else(|| text.strip_prefix("0O")) {
        (oct, 8)
    } else {
        (text, 10)
    };
    u64::from_str_radix(&digits.replace('_', ""), radix).ok()
}

/// Parse a hex string, with or without a `0x` prefix.
pub fn parse_hex(text: &str) -> Option<u64> {
    let text = text.trim();
    let digits = text.strip_prefix("0x").or_else(|| text.strip_prefix("0X")).unwrap_or(text);
    u64::from_str_radix(&digits.replace('_', ""), 16).ok()
}

/// Integer accepted either as a number or as a prefixed string.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(transparent)]
pub struct ConfigInt(pub u64);

struct ConfigIntVisitor;

impl Visitor<'_> for ConfigIntVisitor {
    type Value = ConfigInt;

    fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("a non-negative integer or a string such as \"0x1f\"")
    }

    fn visit_u64<E: de::Error>(self, v: u64) -> Result<ConfigInt, E> {
        Ok(ConfigInt(v))
    }

    fn visit_i64<E: de::Error>(self, v: i64) -> Result<ConfigInt, E> {
        u64::try_from(v).map(ConfigInt).map_err(|_| E::custom(format!("negative value {v}")))
    }

    fn visit_str<E: de::Error>(self, v: &str) -> Result<ConfigInt, E> {
        parse_int(v).map(ConfigInt).ok_or_else(|| E::custom(format!("invalid integer {v:?}")))
    }
}

impl<'de> Deserialize<'de> for ConfigInt {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        deserializer.deserialize_any(ConfigIntVisitor)
    }
}

/// Mask accepted either as a number or as a hex string (`"ffffffff"`, `"0x3"`).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(transparent)]
pub struct HexInt(pub u64);

struct HexIntVisitor;

impl Visitor<'_> for HexIntVisitor {
    type Value = HexInt;

    fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("a non-negative integer or a hex string such as \"ffffffff\"")
    }

    fn visit_u64<E: de::Error>(self, v: u64) -> Result<HexInt, E> {
        Ok(HexInt(v))
    }

    fn visit_i64<E: de::Error>(self, v: i64) -> Result<HexInt, E> {
        u64::try_from(v).map(HexInt).map_err(|_| E::custom(format!("negative value {v}")))
    }

    fn visit_str<E: de::Error>(self, v: &str) -> Result<HexInt, E> {
        parse_hex(v).map(HexInt).ok_or_else(|| E::custom(format!("invalid hex value {v:?}")))
    }
}

impl<'de> Deserialize<'de> for HexInt {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        deserializer.deserialize_any(HexIntVisitor)
    }
}

/// `deserialize_with` helper narrowing a [`ConfigInt`] to the field's type.
pub fn flexible<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: TryFrom<u64>,
{
    let ConfigInt(raw) = ConfigInt::deserialize(deserializer)?;
    T::try_from(raw).map_err(|_| de::Error::custom(format!("value {raw} out of range")))
}

/// Per-chip values of one MAROC setting.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct MarocValues(pub Vec<u32>);

impl AsRef<[u32]> for MarocValues {
    fn as_ref(&self) -> &[u32] {
        &self.0
    }
}

impl From<Vec<u32>> for MarocValues {
    fn from(values: Vec<u32>) -> Self {
        Self(values)
    }
}

impl std::str::FromStr for MarocValues {
    type Err = String;

    fn from_str(text: &str) -> Result<Self, Self::Err> {
        text.split(',')
            .map(|piece| {
                parse_int(piece)
                    .and_then(|v| u32::try_from(v).ok())
                    .ok_or_else(|| format!("invalid value {:?}", piece.trim()))
            })
            .collect::<Result<Vec<_>, _>>()
            .map(Self)
    }
}

struct MarocValuesVisitor;

impl<'de> Visitor<'de> for MarocValuesVisitor {
    type Value = MarocValues;

    fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("a list of integers or a comma-separated string")
    }

    fn visit_str<E: de::Error>(self, v: &str) -> Result<MarocValues, E> {
        v.parse().map_err(E::custom)
    }

    fn visit_u64<E: de::Error>(self, v: u64) -> Result<MarocValues, E> {
        u32::try_from(v)
            .map(|v| MarocValues(vec![v]))
            .map_err(|_| E::custom(format!("value {v} out of range")))
    }

    fn visit_seq<A: SeqAccess<'de>>(self, mut seq: A) -> Result<MarocValues, A::Error> {
        let mut values = Vec::with_capacity(seq.size_hint().unwrap_or(4));
        while let Some(ConfigInt(raw)) = seq.next_element()? {
            let value = u32::try_from(raw)
                .map_err(|_| de::Error::custom(format!("value {raw} out of range")))?;
            values.push(value);
        }
        Ok(MarocValues(values))
    }
}

impl<'de> Deserialize<'de> for MarocValues {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        deserializer.deserialize_any(MarocValuesVisitor)
    }
}
