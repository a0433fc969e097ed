//! UDP channel on a tokio socket

use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::time::Duration;

use tokio::net::UdpSocket;
use tokio::time::Instant;
use tracing::{debug, trace};

use super::{Channel, MAX_DATAGRAM_LEN};
use crate::types::RawPacket;
use crate::{QuaboError, Result};

/// Channel bound to a local port, exchanging datagrams with one device.
#[derive(Debug)]
pub struct UdpChannel {
    socket: UdpSocket,
    device: SocketAddr,
}

impl UdpChannel {
    /// Bind `local` and address all sends to `device`.
    pub async fn bind(local: SocketAddr, device: SocketAddr) -> Result<Self> {
        let socket = UdpSocket::bind(local)
            .await
            .map_err(|e| QuaboError::io(format!("binding UDP socket {local}"), e))?;
        debug!("UDP channel {} -> {}", local, device);
        Ok(Self { socket, device })
    }

    /// Bind the device port on all local interfaces, as the device replies to
    /// the same port number it was addressed on.
    pub async fn open(device_ip: IpAddr, port: u16) -> Result<Self> {
        let local = SocketAddr::new(IpAddr::V4(Ipv4Addr::UNSPECIFIED), port);
        Self::bind(local, SocketAddr::new(device_ip, port)).await
    }

    /// Local address the socket is bound to.
    pub fn local_addr(&self) -> Result<SocketAddr> {
        self.socket.local_addr().map_err(|e| QuaboError::io("reading local address", e))
    }

    /// Device address sends go to.
    pub fn device(&self) -> SocketAddr {
        self.device
    }

    fn accepts(&self, source: SocketAddr) -> bool {
        source.ip() == self.device.ip()
    }
}

#[async_trait::async_trait]
impl Channel for UdpChannel {
    async fn send(&self, bytes: &[u8]) -> Result<()> {
        trace!("send {} bytes to {}", bytes.len(), self.device);
        self.socket
            .send_to(bytes, self.device)
            .await
            .map_err(|e| QuaboError::io(format!("sending to {}", self.device), e))?;
        Ok(())
    }

    async fn receive(&self, max_len: usize, timeout: Duration) -> Result<Option<RawPacket>> {
        let deadline = Instant::now() + timeout;
        let mut buf = vec![0u8; max_len.max(1)];

        loop {
            let received = tokio::time::timeout_at(deadline, self.socket.recv_from(&mut buf)).await;
            let (len, source) = match received {
                Ok(result) => result.map_err(|e| QuaboError::io("receiving datagram", e))?,
                Err(_) => return Ok(None),
            };

            if !self.accepts(source) {
                debug!("Discarding {} byte datagram from {} (expected {})", len, source, self.device.ip());
                continue;
            }

            trace!("received {} bytes from {}", len, source);
            buf.truncate(len.min(max_len));
            return Ok(Some(RawPacket::new(buf, source)));
        }
    }

    async fn flush(&self, max_datagrams: usize) -> Result<usize> {
        let mut buf = [0u8; MAX_DATAGRAM_LEN];
        let mut count = 0;
        let mut bytes = 0;
        while count < max_datagrams {
            match self.socket.try_recv_from(&mut buf) {
                Ok((len, _)) => {
                    count += 1;
                    bytes += len;
                }
                Err(e) if e.kind() == std::io::ErrorKind::WouldBlock => break,
                Err(e) => return Err(QuaboError::io("flushing receive buffer", e)),
            }
        }
        if count > 0 {
            debug!("Flushed {} datagrams ({} bytes)", count, bytes);
        }
        Ok(count)
    }
}
