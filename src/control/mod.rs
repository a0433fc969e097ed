//! Command sequencing for one device
//!
//! [`QuaboControl`] owns the command channel and the configuration it builds
//! frames from. Commands that expect a reply drain stale datagrams first so
//! the reply read back belongs to the command just sent.

use std::net::{IpAddr, Ipv4Addr};
use std::time::Duration;
use tracing::{debug, error, info};

use crate::command::{
    CommandFrame, DaqParams, MacAddress, REGISTER_FRAME_LEN, ShutterState, parse_destination_reply,
    parse_ipv4, parse_ph_baseline,
};
use crate::config::{DestKind, DeviceConfig, QuaboConfig, Timeouts};
use crate::transport::{COMMAND_PORT, Channel, FLUSH_LIMIT, UdpChannel};
use crate::types::RawPacket;
use crate::{QuaboError, Result};

/// Time the shutter motor is powered before the legacy shutter command
/// releases it.
pub const SHUTTER_SETTLE: Duration = Duration::from_secs(1);

/// Wait after a fan command before flushing its chatter.
pub const FAN_SETTLE: Duration = Duration::from_secs(1);

/// Time the device needs to measure pulse-height baselines.
pub const BASELINE_SETTLE: Duration = Duration::from_secs(2);

/// Largest baseline reply read back.
const BASELINE_REPLY_LEN: usize = 1024;

/// Destination MACs the device resolved for science data.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DataDestinations {
    pub ph: MacAddress,
    pub movie: MacAddress,
}

/// Command interface to one device
pub struct QuaboControl<C = UdpChannel> {
    channel: C,
    config: QuaboConfig,
    timeouts: Timeouts,
    shutter: ShutterState,
    fan_speed: u8,
}

impl QuaboControl<UdpChannel> {
    /// Bind the command port for `device`.
    pub async fn connect(device: &DeviceConfig, config: QuaboConfig) -> Result<Self> {
        let channel =
            UdpChannel::bind(device.local_addr(COMMAND_PORT), device.device_addr(COMMAND_PORT)).await?;
        info!("Command channel to {}", device.ip);
        Ok(Self::new(channel, config, device.timeouts))
    }
}

impl<C: Channel> QuaboControl<C> {
    pub fn new(channel: C, config: QuaboConfig, timeouts: Timeouts) -> Self {
        Self { channel, config, timeouts, shutter: ShutterState::default(), fan_speed: 0 }
    }

    pub fn config(&self) -> &QuaboConfig {
        &self.config
    }

    /// Edit the configuration used by later commands.
    pub fn config_mut(&mut self) -> &mut QuaboConfig {
        &mut self.config
    }

    pub fn channel(&self) -> &C {
        &self.channel
    }

    pub fn shutter_state(&self) -> ShutterState {
        self.shutter
    }

    pub fn fan_speed(&self) -> u8 {
        self.fan_speed
    }

    async fn send(&self, frame: &CommandFrame) -> Result<()> {
        debug!(opcode = ?frame.opcode(), len = frame.len(), "send command");
        self.channel.send(frame.as_bytes()).await
    }

    async fn flush(&self) -> Result<()> {
        self.channel.flush(FLUSH_LIMIT).await.map(|_| ())
    }

    async fn reply(&self, max_len: usize) -> Result<RawPacket> {
        let timeout = self.timeouts.reply();
        self.channel.receive(max_len, timeout).await?.ok_or(QuaboError::Timeout { duration: timeout })
    }

    /// Send the MAROC register command built from the `maroc` section.
    ///
    /// With `echo` the device returns the frame and it is compared byte for
    /// byte outside the reserved ranges.
    pub async fn set_maroc_params(&self, echo: bool) -> Result<()> {
        info!("set MAROC parameters");
        let images = self.config.register_images()?;
        let frame = CommandFrame::register(&images, echo);

        if !echo {
            return self.send(&frame).await;
        }

        self.flush().await?;
        self.send(&frame).await?;
        let reply = self.reply(REGISTER_FRAME_LEN).await?;
        debug!("reply len from MAROC: {}", reply.len());
        if let Err(e) = frame.verify_echo(&reply.data) {
            error!("MAROC echo check failed: {}", e);
            return Err(e);
        }
        info!("MAROC parameters set successfully");
        Ok(())
    }

    /// Apply (or zero, with `on` false) the configured HV on the channels in
    /// `channel_mask`.
    pub async fn set_hv(&self, on: bool, channel_mask: u8) -> Result<()> {
        info!("set HV: {} (channels {:#06b})", if on { "on" } else { "off" }, channel_mask);
        let frame = CommandFrame::high_voltage(self.config.hv.values(), channel_mask, on);
        self.flush().await?;
        self.send(&frame).await
    }

    /// Send the `acq` section.
    pub async fn set_acq_params(&self) -> Result<()> {
        info!("set acq parameters");
        let frame = CommandFrame::acq_params(&self.config.acq);
        self.flush().await?;
        self.send(&frame).await
    }

    /// Send mode-level acquisition settings.
    pub async fn set_daq_params(&self, params: &DaqParams) -> Result<()> {
        info!("configure DAQ parameters: mode {:#04x}, {} us", params.mode(), params.image_us);
        self.send(&CommandFrame::daq_params(params)).await
    }

    pub async fn reset(&self) -> Result<()> {
        info!("reset the quabo");
        self.send(&CommandFrame::reset()).await
    }

    /// Move the focus motor; 0 recalibrates.
    pub async fn set_focus(&self, steps: u16) -> Result<()> {
        info!("set focus: steps - {}", steps);
        self.send(&CommandFrame::focus(steps, self.shutter, self.fan_speed)).await
    }

    /// Drive the shutter through the focus command, then release the motor.
    pub async fn set_shutter_legacy(&mut self, closed: bool) -> Result<()> {
        info!("set shutter (legacy): closed - {}", closed);
        self.shutter = ShutterState { open: !closed, power: true };
        self.send(&CommandFrame::shutter_legacy(self.shutter, self.fan_speed)).await?;

        tokio::time::sleep(SHUTTER_SETTLE).await;

        self.shutter = ShutterState::default();
        self.send(&CommandFrame::shutter_legacy(self.shutter, self.fan_speed)).await
    }

    /// Open or close the shutter.
    pub async fn set_shutter(&self, closed: bool) -> Result<()> {
        info!("set shutter: closed - {}", closed);
        self.send(&CommandFrame::shutter(closed)).await
    }

    /// Set the fan speed (0-15).
    pub async fn set_fan(&mut self, speed: u8) -> Result<()> {
        info!("set fan: speed - {}", speed);
        let frame = CommandFrame::fan(self.shutter, speed)?;
        self.fan_speed = speed;
        self.send(&frame).await?;
        tokio::time::sleep(FAN_SETTLE).await;
        self.flush().await
    }

    pub async fn set_led_flasher(&self, on: bool) -> Result<()> {
        info!("set LED flasher: on - {}", on);
        self.send(&CommandFrame::led_flasher(on)).await
    }

    /// Measure and return the 256 pulse-height baselines.
    pub async fn cal_ph_baseline(&self) -> Result<Vec<u16>> {
        info!("calibrate PH baseline");
        self.flush().await?;
        self.send(&CommandFrame::ph_baseline()).await?;
        tokio::time::sleep(BASELINE_SETTLE).await;
        let reply = self.reply(BASELINE_REPLY_LEN).await?;
        parse_ph_baseline(&reply.data)
    }

    /// Point pulse-height and movie data at the configured hosts.
    ///
    /// Returns the MAC addresses the device resolved for them.
    pub async fn set_data_destinations(&self) -> Result<DataDestinations> {
        let ph = resolve_ipv4(self.configured_dest(DestKind::PulseHeight)?).await?;
        let movie = resolve_ipv4(self.configured_dest(DestKind::Movie)?).await?;
        info!("set PH packets destination IP: {}", ph);
        info!("set MOVIE packets destination IP: {}", movie);

        self.flush().await?;
        self.send(&CommandFrame::data_destinations(ph, movie)).await?;
        let reply = self.reply(12).await?;
        let (ph, movie) = parse_destination_reply(&reply.data).inspect_err(|e| error!("{}", e))?;
        info!("PH packets destination MAC: {}", ph);
        info!("MOVIE packets destination MAC: {}", movie);
        Ok(DataDestinations { ph, movie })
    }

    /// Point housekeeping packets at the configured host.
    pub async fn set_hk_destination(&self) -> Result<()> {
        let hk = resolve_ipv4(self.configured_dest(DestKind::Housekeeping)?).await?;
        info!("set HK packets destination IP: {}", hk);
        self.send(&CommandFrame::hk_destination(hk)).await
    }

    /// Send the configured `CHANMASK_<n>` entries.
    pub async fn set_trigger_mask(&self) -> Result<()> {
        info!("set trigger mask");
        let frame = CommandFrame::trigger_mask(&self.config.chanmask.masks)?;
        self.flush().await?;
        self.send(&frame).await
    }

    /// Send the configured GOE mask (zero when unset).
    pub async fn set_goe_mask(&self) -> Result<()> {
        info!("set GOE mask");
        let frame = CommandFrame::goe_mask(u32::from(self.config.chanmask.goe.unwrap_or(0)));
        self.flush().await?;
        self.send(&frame).await
    }

    fn configured_dest(&self, kind: DestKind) -> Result<&str> {
        self.config
            .dest(kind)
            .ok_or_else(|| QuaboError::command(format!("no {kind:?} destination configured")))
    }
}

/// Resolve a dotted quad or host name to an IPv4 address.
pub async fn resolve_ipv4(host: &str) -> Result<Ipv4Addr> {
    if let Ok(addr) = parse_ipv4(host) {
        return Ok(addr);
    }

    let addrs = tokio::net::lookup_host((host.trim(), 0))
        .await
        .map_err(|e| QuaboError::io(format!("resolving {host}"), e))?;
    addrs
        .filter_map(|addr| match addr.ip() {
            IpAddr::V4(v4) => Some(v4),
            IpAddr::V6(_) => None,
        })
        .next()
        .ok_or_else(|| QuaboError::command(format!("{host} has no IPv4 address")))
}

#[cfg(test)]
mod tests;
