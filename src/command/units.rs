//! Physical meaning of command codes, for logging and reports

/// High-voltage setting, volts per count.
pub const HV_LSB_VOLTS: f64 = -1.14e-3;

/// Flash LED level, volts per count.
pub const FLASH_LEVEL_LSB_VOLTS: f64 = 0.312;

/// Flash LED pulse width, nanoseconds per count.
pub const FLASH_WIDTH_LSB_NS: f64 = 15.0;

const STIM_DIVIDERS: [u32; 8] = [19, 18, 17, 16, 15, 14, 13, 12];
const FLASH_RATES_HZ: [u32; 8] = [1, 95, 191, 381, 763, 1526, 3052, 6104];

/// Volts for a high-voltage setting.
pub fn hv_volts(counts: u16) -> f64 {
    f64::from(counts) * HV_LSB_VOLTS
}

/// Stimulus rate in Hz for a 3-bit rate code (100 MHz / divider).
pub fn stim_rate_hz(code: u8) -> Option<f64> {
    STIM_DIVIDERS.get(usize::from(code)).map(|&div| 100e6 / f64::from(div))
}

/// Flash rate in Hz for a 3-bit rate code.
pub fn flash_rate_hz(code: u8) -> Option<u32> {
    FLASH_RATES_HZ.get(usize::from(code)).copied()
}
