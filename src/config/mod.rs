//! Device configuration file
//!
//! The configuration is a YAML document with one mapping per section:
//!
//! ```yaml
//! dest_ips:
//!   PH: 10.0.0.5
//!   MOVIE: 10.0.0.5
//!   HK: 10.0.0.6
//! maroc:
//!   DAC1: "0x1a0,0x1a0,0x1a0,0x1a0"
//!   GAIN0: [16, 16, 16, 16]
//! hv:
//!   HV_0: 41000
//! acq:
//!   ACQMODE: "0x02"
//!   ACQINT: 1000
//! chanmask:
//!   CHANMASK_0: "0xffffffff"
//!   GOEMASK: 0
//! ```
//!
//! Integers may be written as numbers or as prefixed strings. `chanmask`
//! strings are hex, so `"ffffffff"` and `"0xffffffff"` are the same mask.
//!
//! Existing JSON device files (`quabo_config.json`) load unchanged, since
//! JSON is valid YAML flow syntax. Their `ips` section is read as `dest_ips`
//! and the `MOIVE` spelling as `MOVIE`. Saving writes YAML.

mod device;
mod value;

pub use device::{DeviceConfig, Timeouts};
pub use value::{ConfigInt, HexInt, MarocValues, flexible, parse_hex, parse_int};

use serde::{Deserialize, Serialize};
use serde_yaml_ng::{Mapping, Value};
use std::collections::BTreeMap;
use std::fmt;
use std::path::Path;
use tracing::{debug, info};

use crate::command::{AcqParams, HV_CHANNELS, MAX_CHANMASK_INDEX};
use crate::register::{CHIP_COUNT, RegisterImages};
use crate::{QuaboError, Result};

const INLINE_SOURCE: &str = "<inline>";

/// Destination addresses for data the device sends.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DestIps {
    #[serde(rename = "PH", default, skip_serializing_if = "Option::is_none")]
    pub ph: Option<String>,
    #[serde(
        rename = "MOVIE",
        alias = "movie",
        alias = "MOIVE",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub movie: Option<String>,
    #[serde(rename = "HK", default, skip_serializing_if = "Option::is_none")]
    pub hk: Option<String>,
}

/// Which stream a destination address applies to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DestKind {
    PulseHeight,
    Movie,
    Housekeeping,
}

/// High-voltage settings in DAC counts.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct HvSettings {
    #[serde(rename = "HV_0", default, deserialize_with = "flexible")]
    pub hv0: u16,
    #[serde(rename = "HV_1", default, deserialize_with = "flexible")]
    pub hv1: u16,
    #[serde(rename = "HV_2", default, deserialize_with = "flexible")]
    pub hv2: u16,
    #[serde(rename = "HV_3", default, deserialize_with = "flexible")]
    pub hv3: u16,
}

impl HvSettings {
    pub fn values(&self) -> [u16; HV_CHANNELS] {
        [self.hv0, self.hv1, self.hv2, self.hv3]
    }

    fn slot(&mut self, channel: usize) -> Option<&mut u16> {
        match channel {
            0 => Some(&mut self.hv0),
            1 => Some(&mut self.hv1),
            2 => Some(&mut self.hv2),
            3 => Some(&mut self.hv3),
            _ => None,
        }
    }
}

/// Trigger channel masks and the GOE mask.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "BTreeMap<String, HexInt>", into = "BTreeMap<String, HexInt>")]
pub struct ChanMask {
    /// `CHANMASK_<n>` by index
    pub masks: BTreeMap<u8, u32>,
    pub goe: Option<u8>,
}

impl TryFrom<BTreeMap<String, HexInt>> for ChanMask {
    type Error = String;

    fn try_from(entries: BTreeMap<String, HexInt>) -> std::result::Result<Self, Self::Error> {
        let mut chanmask = ChanMask::default();
        for (tag, HexInt(raw)) in entries {
            if tag == "GOEMASK" {
                chanmask.goe = Some(u8::try_from(raw).map_err(|_| format!("GOEMASK {raw} out of range"))?);
                continue;
            }
            let index = tag
                .strip_prefix("CHANMASK_")
                .and_then(|n| n.parse::<u8>().ok())
                .filter(|&n| n <= MAX_CHANMASK_INDEX)
                .ok_or_else(|| format!("unknown chanmask entry {tag}"))?;
            let mask = u32::try_from(raw).map_err(|_| format!("{tag} {raw:#x} exceeds 32 bits"))?;
            chanmask.masks.insert(index, mask);
        }
        Ok(chanmask)
    }
}

impl From<ChanMask> for BTreeMap<String, HexInt> {
    fn from(chanmask: ChanMask) -> Self {
        let mut entries: BTreeMap<String, HexInt> = chanmask
            .masks
            .into_iter()
            .map(|(index, mask)| (format!("CHANMASK_{index}"), HexInt(u64::from(mask))))
            .collect();
        if let Some(goe) = chanmask.goe {
            entries.insert("GOEMASK".to_string(), HexInt(u64::from(goe)));
        }
        entries
    }
}

/// One top-level section of the configuration file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Section {
    DestIps,
    Maroc,
    Hv,
    Acq,
    Chanmask,
}

impl Section {
    pub const ALL: [Section; 5] =
        [Section::DestIps, Section::Maroc, Section::Hv, Section::Acq, Section::Chanmask];

    /// Key of the section in the file.
    pub fn key(self) -> &'static str {
        match self {
            Section::DestIps => "dest_ips",
            Section::Maroc => "maroc",
            Section::Hv => "hv",
            Section::Acq => "acq",
            Section::Chanmask => "chanmask",
        }
    }

    /// Older key of the section in JSON device files.
    fn legacy_key(self) -> Option<&'static str> {
        match self {
            Section::DestIps => Some("ips"),
            _ => None,
        }
    }
}

impl fmt::Display for Section {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

/// Configuration for one device.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct QuaboConfig {
    #[serde(default, alias = "ips")]
    pub dest_ips: DestIps,
    /// MAROC tag to per-chip values
    #[serde(default)]
    pub maroc: BTreeMap<String, MarocValues>,
    #[serde(default)]
    pub hv: HvSettings,
    #[serde(default)]
    pub acq: AcqParams,
    #[serde(default)]
    pub chanmask: ChanMask,
}

impl QuaboConfig {
    /// Load a configuration file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)
            .map_err(|e| QuaboError::io(format!("reading {}", path.display()), e))?;
        let config = Self::parse(&text, path)?;
        info!("Loaded configuration from {}", path.display());
        Ok(config)
    }

    /// Parse a configuration document.
    pub fn from_yaml_str(text: &str) -> Result<Self> {
        Self::parse(text, Path::new(INLINE_SOURCE))
    }

    fn parse(text: &str, origin: &Path) -> Result<Self> {
        if text.trim().is_empty() {
            return Ok(Self::default());
        }
        serde_yaml_ng::from_str(text).map_err(|e| QuaboError::config(origin, e.to_string()))
    }

    pub fn to_yaml_string(&self) -> Result<String> {
        serde_yaml_ng::to_string(self).map_err(|e| QuaboError::config(INLINE_SOURCE, e.to_string()))
    }

    /// Write the whole configuration, replacing the file.
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let path = path.as_ref();
        let text = self.to_yaml_string()?;
        std::fs::write(path, text).map_err(|e| QuaboError::io(format!("writing {}", path.display()), e))?;
        info!("Saved configuration to {}", path.display());
        Ok(())
    }

    /// Merge one section into the file at `path`, keeping the others.
    ///
    /// A missing or unreadable file is replaced by one holding just this
    /// section.
    pub fn write_section<P: AsRef<Path>>(&self, path: P, section: Section) -> Result<()> {
        let path = path.as_ref();
        info!("Writing {} configuration to {}", section, path.display());

        let mut document = match std::fs::read_to_string(path) {
            Ok(text) => match serde_yaml_ng::from_str::<Mapping>(&text) {
                Ok(mapping) => mapping,
                Err(e) => {
                    debug!("Replacing unparseable {}: {}", path.display(), e);
                    Mapping::new()
                }
            },
            Err(e) => {
                debug!("New configuration file {} ({})", path.display(), e);
                Mapping::new()
            }
        };

        if let Some(legacy) = section.legacy_key() {
            document.remove(legacy);
        }
        document.insert(Value::String(section.key().to_string()), self.section_value(section, path)?);

        let text =
            serde_yaml_ng::to_string(&document).map_err(|e| QuaboError::config(path, e.to_string()))?;
        std::fs::write(path, text).map_err(|e| QuaboError::io(format!("writing {}", path.display()), e))
    }

    fn section_value(&self, section: Section, path: &Path) -> Result<Value> {
        let value = match section {
            Section::DestIps => serde_yaml_ng::to_value(&self.dest_ips),
            Section::Maroc => serde_yaml_ng::to_value(&self.maroc),
            Section::Hv => serde_yaml_ng::to_value(self.hv),
            Section::Acq => serde_yaml_ng::to_value(self.acq),
            Section::Chanmask => serde_yaml_ng::to_value(&self.chanmask),
        };
        value.map_err(|e| QuaboError::config(path, e.to_string()))
    }

    /// Set `HV_<channel>`.
    pub fn set_hv(&mut self, channel: usize, value: u16) -> Result<()> {
        let slot = self.hv.slot(channel).ok_or_else(|| {
            QuaboError::command(format!("HV channel {channel} out of range 0..{HV_CHANNELS}"))
        })?;
        info!("configure HV: HV_{} - {}", channel, value);
        *slot = value;
        Ok(())
    }

    /// Set the four per-chip values of a MAROC tag.
    pub fn set_maroc(&mut self, tag: &str, values: Vec<u32>) -> Result<()> {
        if values.len() != CHIP_COUNT {
            return Err(QuaboError::Arity {
                field: tag.to_string(),
                expected: CHIP_COUNT,
                actual: values.len(),
            });
        }
        info!("configure MAROC: {} - {:?}", tag, values);
        self.maroc.insert(tag.to_string(), MarocValues(values));
        Ok(())
    }

    /// Set one acquisition parameter by its file key (e.g. `ACQINT`).
    pub fn set_acq(&mut self, key: &str, value: u32) -> Result<()> {
        fn narrow<T: TryFrom<u32>>(key: &str, value: u32) -> Result<T> {
            T::try_from(value).map_err(|_| QuaboError::command(format!("{key} value {value} out of range")))
        }

        let acq = &mut self.acq;
        match key {
            "ACQMODE" => acq.acq_mode = narrow(key, value)?,
            "ACQINT" => acq.acq_int = narrow(key, value)?,
            "HOLD1" => acq.hold1 = narrow(key, value)?,
            "HOLD2" => acq.hold2 = narrow(key, value)?,
            "ADCCLKPH" => acq.adc_clk_ph = narrow(key, value)?,
            "MONCHAN" => acq.mon_chan = narrow(key, value)?,
            "STIMON" => acq.stim_on = narrow(key, value)?,
            "STIM_LEVEL" => acq.stim_level = narrow(key, value)?,
            "STIM_RATE" => acq.stim_rate = narrow(key, value)?,
            "FLASH_RATE" => acq.flash_rate = narrow(key, value)?,
            "FLASH_LEVEL" => acq.flash_level = narrow(key, value)?,
            "FLASH_WIDTH" => acq.flash_width = narrow(key, value)?,
            other => return Err(QuaboError::command(format!("unknown acquisition parameter {other}"))),
        }
        info!("configure acq param: {} - {}", key, value);
        Ok(())
    }

    /// Set `CHANMASK_<index>`.
    pub fn set_chanmask(&mut self, index: u8, mask: u32) -> Result<()> {
        if index > MAX_CHANMASK_INDEX {
            return Err(QuaboError::command(format!(
                "CHANMASK_{index} out of range 0..={MAX_CHANMASK_INDEX}"
            )));
        }
        info!("configure chanmask: CHANMASK_{} - {:#x}", index, mask);
        self.chanmask.masks.insert(index, mask);
        Ok(())
    }

    pub fn set_goe_mask(&mut self, mask: u8) {
        info!("configure GOE mask: {:#x}", mask);
        self.chanmask.goe = Some(mask);
    }

    /// Set a destination host (name or dotted quad).
    pub fn set_dest(&mut self, kind: DestKind, host: &str) {
        info!("configure {:?} destination: {}", kind, host);
        let host = Some(host.trim().to_string());
        match kind {
            DestKind::PulseHeight => self.dest_ips.ph = host,
            DestKind::Movie => self.dest_ips.movie = host,
            DestKind::Housekeeping => self.dest_ips.hk = host,
        }
    }

    /// Destination host for `kind`.
    pub fn dest(&self, kind: DestKind) -> Option<&str> {
        match kind {
            DestKind::PulseHeight => self.dest_ips.ph.as_deref(),
            DestKind::Movie => self.dest_ips.movie.as_deref(),
            DestKind::Housekeeping => self.dest_ips.hk.as_deref(),
        }
    }

    /// Register images for the `maroc` section.
    pub fn register_images(&self) -> Result<RegisterImages> {
        RegisterImages::from_settings(self.maroc.iter().map(|(tag, values)| (tag.as_str(), values)))
    }
}
