//! Device location and timeouts

use serde::{Deserialize, Serialize};
use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::time::Duration;

/// Receive deadlines, in milliseconds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Timeouts {
    /// Wait for a command reply
    pub reply_ms: u64,
    /// Wait for a telemetry packet
    pub telemetry_ms: u64,
    /// Wait for a firmware transfer block
    pub transfer_ms: u64,
}

impl Default for Timeouts {
    fn default() -> Self {
        Self { reply_ms: 500, telemetry_ms: 3000, transfer_ms: 5000 }
    }
}

impl Timeouts {
    pub fn reply(&self) -> Duration {
        Duration::from_millis(self.reply_ms)
    }

    pub fn telemetry(&self) -> Duration {
        Duration::from_millis(self.telemetry_ms)
    }

    pub fn transfer(&self) -> Duration {
        Duration::from_millis(self.transfer_ms)
    }
}

/// Where the device is and which local interface talks to it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceConfig {
    pub ip: IpAddr,
    /// Local address to bind; all interfaces when absent
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub local_ip: Option<IpAddr>,
    #[serde(default)]
    pub timeouts: Timeouts,
}

impl DeviceConfig {
    pub fn new(ip: IpAddr) -> Self {
        Self { ip, local_ip: None, timeouts: Timeouts::default() }
    }

    pub fn with_local_ip(mut self, local_ip: IpAddr) -> Self {
        self.local_ip = Some(local_ip);
        self
    }

    pub fn with_timeouts(mut self, timeouts: Timeouts) -> Self {
        self.timeouts = timeouts;
        self
    }

    /// Device endpoint for `port`.
    pub fn device_addr(&self, port: u16) -> SocketAddr {
        SocketAddr::new(self.ip, port)
    }

    /// Local endpoint to bind for `port`.
    pub fn local_addr(&self, port: u16) -> SocketAddr {
        SocketAddr::new(self.local_ip.unwrap_or(IpAddr::V4(Ipv4Addr::UNSPECIFIED)), port)
    }
}
