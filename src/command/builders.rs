//! Simple 64-byte command builders

use std::collections::BTreeMap;
use std::net::Ipv4Addr;
use tracing::debug;

use super::units;
use super::{AcqParams, COMMAND_FRAME_LEN, CommandFrame, DaqParams, Opcode, ShutterState};
use crate::{QuaboError, Result};

/// Number of high-voltage channels.
pub const HV_CHANNELS: usize = 4;

/// Highest `CHANMASK_<n>` index that fits in a command frame.
pub const MAX_CHANMASK_INDEX: u8 = ((COMMAND_FRAME_LEN - 4) / 4 - 1) as u8;

const FOCUS_ENDZONE: u16 = 300;
const FOCUS_BACKOFF: u16 = 200;
const FOCUS_STEP_ON_TIME: u16 = 10000;
const FOCUS_STEP_OFF_TIME: u16 = 10000;

/// Magic value the firmware expects at byte 12 of the DAQ command.
const DAQ_MARKER: u8 = 69;

impl CommandFrame {
    /// High voltage for the channels selected by `channel_mask` (bit i = HV_i).
    ///
    /// With `on` false the selected channels are zeroed. Unselected channels
    /// are always zero.
    pub fn high_voltage(values: [u16; HV_CHANNELS], channel_mask: u8, on: bool) -> Self {
        let mut frame = Self::new(Opcode::HighVoltage);
        for (i, &value) in values.iter().enumerate() {
            let value = if on && channel_mask & (1 << i) != 0 { value } else { 0 };
            debug!(channel = i, value, volts = units::hv_volts(value), "HV setting");
            frame.put_u16(2 + 2 * i, value);
        }
        frame
    }

    /// Raw acquisition parameters (opcode 0x03).
    pub fn acq_params(params: &AcqParams) -> Self {
        let mut frame = Self::new(Opcode::AcqParams);
        frame
            .put_u16(2, params.acq_mode)
            .put_u16(4, params.acq_int)
            .put_u16(6, params.hold1)
            .put_u16(8, params.hold2)
            .put_u16(10, params.adc_clk_ph)
            .put_u16(12, params.mon_chan)
            .put_u8(14, params.stim_on & 0x01)
            .put_u8(16, params.stim_level)
            .put_u8(18, params.stim_rate & 0x07)
            .put_u8(22, params.flash_rate & 0x07)
            .put_u8(24, params.flash_level & 0x1f)
            .put_u8(26, params.flash_width & 0x0f);
        debug!(?params, "acquisition parameters");
        frame
    }

    /// Mode-level acquisition parameters (opcode 0x03).
    pub fn daq_params(params: &DaqParams) -> Self {
        let mut frame = Self::new(Opcode::AcqParams);
        frame.put_u8(2, params.mode()).put_u16(4, params.image_us).put_u8(12, DAQ_MARKER);

        if let Some(stim) = params.stim {
            debug!(level = stim.level, rate = stim.rate, hz = ?units::stim_rate_hz(stim.rate), "STIM on");
            frame.put_u8(14, 1).put_u8(16, stim.level).put_u8(18, stim.rate);
        }
        if let Some(flash) = params.flash {
            debug!(
                rate = flash.rate,
                hz = ?units::flash_rate_hz(flash.rate),
                level = flash.level,
                width = flash.width,
                "flash LED on"
            );
            frame.put_u8(22, flash.rate).put_u8(24, flash.level).put_u8(26, flash.width);
        }
        frame
    }

    pub fn reset() -> Self {
        Self::new(Opcode::Reset)
    }

    /// Move the focus motor `steps` (1-50000, 0 recalibrates).
    pub fn focus(steps: u16, shutter: ShutterState, fan_speed: u8) -> Self {
        let mut frame = Self::new(Opcode::Focus);
        frame
            .put_u16(4, steps)
            .put_u8(6, shutter.bits())
            .put_u8(8, fan_speed)
            .put_u16(10, FOCUS_ENDZONE)
            .put_u16(12, FOCUS_BACKOFF)
            .put_u16(14, FOCUS_STEP_ON_TIME)
            .put_u16(16, FOCUS_STEP_OFF_TIME);
        frame
    }

    /// Shutter drive through the focus opcode, without a motor move.
    pub fn shutter_legacy(shutter: ShutterState, fan_speed: u8) -> Self {
        let mut frame = Self::new(Opcode::Focus);
        frame.put_u8(6, shutter.bits()).put_u8(8, fan_speed);
        frame
    }

    /// Fan speed (0-15).
    pub fn fan(shutter: ShutterState, fan_speed: u8) -> Result<Self> {
        if fan_speed > 15 {
            return Err(QuaboError::command(format!("fan speed {fan_speed} out of range 0-15")));
        }
        let mut frame = Self::new(Opcode::Fan);
        frame.put_u8(6, shutter.bits()).put_u8(8, fan_speed);
        Ok(frame)
    }

    /// Trigger channel masks, `CHANMASK_<n>` at bytes `4 + 4n`.
    pub fn trigger_mask(masks: &BTreeMap<u8, u32>) -> Result<Self> {
        let mut frame = Self::new(Opcode::TriggerMask);
        for (&index, &mask) in masks {
            if index > MAX_CHANMASK_INDEX {
                return Err(QuaboError::command(format!(
                    "CHANMASK_{index} out of range 0-{MAX_CHANMASK_INDEX}"
                )));
            }
            debug!(index, mask = format_args!("{mask:#x}"), "channel mask");
            frame.put_u32(4 + 4 * usize::from(index), mask);
        }
        Ok(frame)
    }

    /// GOE mask (low two bits).
    pub fn goe_mask(mask: u32) -> Self {
        let mut frame = Self::new(Opcode::GoeMask);
        frame.put_u8(4, (mask & 0x03) as u8);
        frame
    }

    /// Request a pulse-height baseline calibration; the device replies.
    pub fn ph_baseline() -> Self {
        Self::new(Opcode::PhBaseline)
    }

    pub fn shutter(closed: bool) -> Self {
        let mut frame = Self::new(Opcode::Shutter);
        frame.put_u8(1, u8::from(closed));
        frame
    }

    pub fn led_flasher(on: bool) -> Self {
        let mut frame = Self::new(Opcode::LedFlasher);
        frame.put_u8(1, u8::from(on));
        frame
    }

    /// Destinations of pulse-height and movie packets; the device replies
    /// with the two resolved MAC addresses.
    pub fn data_destinations(ph: Ipv4Addr, movie: Ipv4Addr) -> Self {
        let mut frame = Self::new(Opcode::DataDestinations);
        frame.put_ipv4(1, ph).put_ipv4(5, movie);
        frame
    }

    pub fn hk_destination(hk: Ipv4Addr) -> Self {
        let mut frame = Self::new(Opcode::HkDestination);
        frame.put_ipv4(1, hk);
        frame
    }
}
