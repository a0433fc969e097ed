//! Command parameter sets

use serde::{Deserialize, Serialize};

use crate::config::flexible;
use crate::schema::acq_mode;

/// Acquisition parameters, as stored in the `acq` configuration section.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE", default)]
pub struct AcqParams {
    #[serde(rename = "ACQMODE", deserialize_with = "flexible")]
    pub acq_mode: u16,
    #[serde(rename = "ACQINT", deserialize_with = "flexible")]
    pub acq_int: u16,
    #[serde(rename = "HOLD1", deserialize_with = "flexible")]
    pub hold1: u16,
    #[serde(rename = "HOLD2", deserialize_with = "flexible")]
    pub hold2: u16,
    #[serde(rename = "ADCCLKPH", deserialize_with = "flexible")]
    pub adc_clk_ph: u16,
    #[serde(rename = "MONCHAN", deserialize_with = "flexible")]
    pub mon_chan: u16,
    #[serde(rename = "STIMON", deserialize_with = "flexible")]
    pub stim_on: u8,
    #[serde(deserialize_with = "flexible")]
    pub stim_level: u8,
    /// 0-7, see [`super::units::stim_rate_hz`]
    #[serde(deserialize_with = "flexible")]
    pub stim_rate: u8,
    /// 0-7, see [`super::units::flash_rate_hz`]
    #[serde(deserialize_with = "flexible")]
    pub flash_rate: u8,
    /// 0-31
    #[serde(deserialize_with = "flexible")]
    pub flash_level: u8,
    /// 0-15
    #[serde(deserialize_with = "flexible")]
    pub flash_width: u8,
}

/// Stimulus generator settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct StimParams {
    pub rate: u8,
    pub level: u8,
}

/// LED flasher settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FlashParams {
    pub rate: u8,
    pub level: u8,
    pub width: u8,
}

/// Data acquisition settings expressed as modes rather than raw registers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DaqParams {
    pub image: bool,
    pub image_8bit: bool,
    pub pulse_height: bool,
    pub baseline_subtract: bool,
    /// Movie integration time in microseconds
    pub image_us: u16,
    pub stim: Option<StimParams>,
    pub flash: Option<FlashParams>,
}

impl Default for DaqParams {
    fn default() -> Self {
        Self {
            image: false,
            image_8bit: false,
            pulse_height: false,
            baseline_subtract: true,
            image_us: 0,
            stim: None,
            flash: None,
        }
    }
}

impl DaqParams {
    /// Acquisition mode bits.
    pub fn mode(&self) -> u8 {
        let mut mode = 0;
        if self.image {
            mode |= acq_mode::IMAGE;
        }
        if self.image_8bit {
            mode |= acq_mode::IMAGE_8BIT;
        }
        if self.pulse_height {
            mode |= acq_mode::PULSE_HEIGHT;
        }
        if !self.baseline_subtract {
            mode |= acq_mode::NO_BASELINE_SUBTRACT;
        }
        mode
    }
}

/// Shutter state shared by the focus, shutter and fan commands.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShutterState {
    pub open: bool,
    pub power: bool,
}

impl ShutterState {
    /// Wire encoding: bit 0 open, bit 1 power.
    pub fn bits(self) -> u8 {
        u8::from(self.open) | (u8::from(self.power) << 1)
    }
}
