//! Minimal octet-mode TFTP client (RFC 1350)
//!
//! Only what the device's flash server needs: one read or write request per
//! socket, 512-byte blocks, lock-step acknowledgement and retransmission of
//! the last packet on timeout.

use std::net::{IpAddr, Ipv4Addr, Ipv6Addr, SocketAddr};
use std::time::Duration;

use tokio::net::UdpSocket;
use tokio::time::Instant;
use tracing::{debug, trace};

use super::FlashTransport;
use crate::{QuaboError, Result};

/// Well-known TFTP server port.
pub const TFTP_PORT: u16 = 69;

/// Payload size of a full DATA packet.
pub const BLOCK_SIZE: usize = 512;

const OP_RRQ: u16 = 1;
const OP_WRQ: u16 = 2;
const OP_DATA: u16 = 3;
const OP_ACK: u16 = 4;
const OP_ERROR: u16 = 5;

const MODE: &str = "octet";

/// One TFTP packet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum Packet<'a> {
    ReadRequest(&'a str),
    WriteRequest(&'a str),
    Data { block: u16, data: &'a [u8] },
    Ack(u16),
    Error { code: u16, message: String },
}

impl<'a> Packet<'a> {
    pub(crate) fn encode(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(4 + BLOCK_SIZE);
        match self {
            Packet::ReadRequest(name) | Packet::WriteRequest(name) => {
                let op = if matches!(self, Packet::ReadRequest(_)) { OP_RRQ } else { OP_WRQ };
                out.extend_from_slice(&op.to_be_bytes());
                out.extend_from_slice(name.as_bytes());
                out.push(0);
                out.extend_from_slice(MODE.as_bytes());
                out.push(0);
            }
            Packet::Data { block, data } => {
                out.extend_from_slice(&OP_DATA.to_be_bytes());
                out.extend_from_slice(&block.to_be_bytes());
                out.extend_from_slice(data);
            }
            Packet::Ack(block) => {
                out.extend_from_slice(&OP_ACK.to_be_bytes());
                out.extend_from_slice(&block.to_be_bytes());
            }
            Packet::Error { code, message } => {
                out.extend_from_slice(&OP_ERROR.to_be_bytes());
                out.extend_from_slice(&code.to_be_bytes());
                out.extend_from_slice(message.as_bytes());
                out.push(0);
            }
        }
        out
    }

    /// Parse a received packet; `None` for anything malformed.
    pub(crate) fn parse(bytes: &'a [u8]) -> Option<Self> {
        let op = u16::from_be_bytes([*bytes.first()?, *bytes.get(1)?]);
        let rest = &bytes[2..];
        let word = |b: &[u8]| Some(u16::from_be_bytes([*b.first()?, *b.get(1)?]));

        match op {
            OP_RRQ | OP_WRQ => {
                let mut parts = rest.split(|&b| b == 0);
                let name = std::str::from_utf8(parts.next()?).ok()?;
                let mode = parts.next()?;
                if !mode.eq_ignore_ascii_case(MODE.as_bytes()) {
                    return None;
                }
                Some(match op {
                    OP_RRQ => Packet::ReadRequest(name),
                    _ => Packet::WriteRequest(name),
                })
            }
            OP_DATA => Some(Packet::Data { block: word(rest)?, data: &rest[2..] }),
            OP_ACK => Some(Packet::Ack(word(rest)?)),
            OP_ERROR => {
                let code = word(rest)?;
                let text = &rest[2..];
                let end = text.iter().position(|&b| b == 0).unwrap_or(text.len());
                let message = String::from_utf8_lossy(&text[..end]).into_owned();
                Some(Packet::Error { code, message })
            }
            _ => None,
        }
    }
}

/// Block numbers wrap at 16 bits.
fn block_no(index: usize) -> u16 {
    (index % 0x1_0000) as u16
}

/// TFTP client for one server.
#[derive(Debug, Clone)]
pub struct TftpClient {
    server: SocketAddr,
    timeout: Duration,
    retries: u32,
}

impl TftpClient {
    pub fn new(ip: IpAddr) -> Self {
        Self::with_server(SocketAddr::new(ip, TFTP_PORT))
    }

    pub fn with_server(server: SocketAddr) -> Self {
        Self { server, timeout: Duration::from_secs(5), retries: 3 }
    }

    /// Wait per packet before retransmitting.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Retransmissions before giving up.
    pub fn with_retries(mut self, retries: u32) -> Self {
        self.retries = retries;
        self
    }

    pub fn server(&self) -> SocketAddr {
        self.server
    }

    async fn socket(&self) -> Result<UdpSocket> {
        let local: IpAddr = match self.server {
            SocketAddr::V4(_) => Ipv4Addr::UNSPECIFIED.into(),
            SocketAddr::V6(_) => Ipv6Addr::UNSPECIFIED.into(),
        };
        UdpSocket::bind(SocketAddr::new(local, 0))
            .await
            .map_err(|e| QuaboError::io("binding TFTP socket", e))
    }

    /// Next datagram from the server. Once the transfer has a peer (the
    /// server's transfer port), other sources are ignored.
    async fn recv(
        &self,
        socket: &UdpSocket,
        peer: Option<SocketAddr>,
        buf: &mut [u8],
    ) -> Result<Option<(usize, SocketAddr)>> {
        let deadline = Instant::now() + self.timeout;
        loop {
            match tokio::time::timeout_at(deadline, socket.recv_from(buf)).await {
                Err(_) => return Ok(None),
                Ok(Err(e)) => return Err(QuaboError::io("receiving TFTP packet", e)),
                Ok(Ok((len, from))) => {
                    let accepted = match peer {
                        Some(peer) => peer == from,
                        None => from.ip() == self.server.ip(),
                    };
                    if accepted {
                        return Ok(Some((len, from)));
                    }
                    debug!("Ignoring TFTP packet from {}", from);
                }
            }
        }
    }

    async fn send_to(&self, socket: &UdpSocket, packet: &[u8], to: SocketAddr) -> Result<()> {
        socket
            .send_to(packet, to)
            .await
            .map(|_| ())
            .map_err(|e| QuaboError::io(format!("sending TFTP packet to {to}"), e))
    }

    /// Read the remote file `remote`.
    pub async fn get(&self, remote: &str) -> Result<Vec<u8>> {
        let socket = self.socket().await?;
        let mut last = Packet::ReadRequest(remote).encode();
        self.send_to(&socket, &last, self.server).await?;

        let mut buf = vec![0u8; 4 + BLOCK_SIZE];
        let mut peer = None;
        let mut expected: u16 = 1;
        let mut attempts = 0;
        let mut contents = Vec::new();

        loop {
            let Some((len, from)) = self.recv(&socket, peer, &mut buf).await? else {
                attempts += 1;
                if attempts > self.retries {
                    return Err(QuaboError::timeout(self.timeout));
                }
                trace!("TFTP read of {} timed out, resending", remote);
                self.send_to(&socket, &last, peer.unwrap_or(self.server)).await?;
                continue;
            };

            match Packet::parse(&buf[..len]) {
                Some(Packet::Data { block, data }) if block == expected => {
                    let peer = *peer.get_or_insert(from);
                    contents.extend_from_slice(data);
                    let done = data.len() < BLOCK_SIZE;
                    last = Packet::Ack(block).encode();
                    self.send_to(&socket, &last, peer).await?;
                    attempts = 0;
                    if done {
                        debug!("TFTP read {} ({} bytes)", remote, contents.len());
                        return Ok(contents);
                    }
                    expected = expected.wrapping_add(1);
                }
                Some(Packet::Data { block, .. }) => {
                    trace!("Duplicate TFTP block {}", block);
                    self.send_to(&socket, &Packet::Ack(block).encode(), from).await?;
                }
                Some(Packet::Error { code, message }) => {
                    let details = format!("server error {code}: {message}");
                    return Err(QuaboError::transfer(remote, details));
                }
                other => debug!("Unexpected TFTP packet during read: {:?}", other),
            }
        }
    }

    /// Write `data` to the remote file `remote`.
    pub async fn put(&self, remote: &str, data: &[u8]) -> Result<()> {
        let socket = self.socket().await?;
        let mut last = Packet::WriteRequest(remote).encode();
        self.send_to(&socket, &last, self.server).await?;

        // A final short (possibly empty) block ends the transfer
        let blocks = data.len() / BLOCK_SIZE + 1;
        let mut buf = [0u8; 4 + BLOCK_SIZE];
        let mut peer = None;
        let mut acked = 0usize;
        let mut attempts = 0;

        loop {
            let Some((len, from)) = self.recv(&socket, peer, &mut buf).await? else {
                attempts += 1;
                if attempts > self.retries {
                    return Err(QuaboError::timeout(self.timeout));
                }
                trace!("TFTP write of {} timed out, resending", remote);
                self.send_to(&socket, &last, peer.unwrap_or(self.server)).await?;
                continue;
            };

            match Packet::parse(&buf[..len]) {
                Some(Packet::Ack(block)) if block == block_no(acked) => {
                    let peer = *peer.get_or_insert(from);
                    if acked == blocks {
                        debug!("TFTP wrote {} ({} bytes)", remote, data.len());
                        return Ok(());
                    }
                    acked += 1;
                    let start = (acked - 1) * BLOCK_SIZE;
                    let chunk = &data[start..(start + BLOCK_SIZE).min(data.len())];
                    last = Packet::Data { block: block_no(acked), data: chunk }.encode();
                    self.send_to(&socket, &last, peer).await?;
                    attempts = 0;
                }
                Some(Packet::Ack(block)) => trace!("Stale TFTP ack {}", block),
                Some(Packet::Error { code, message }) => {
                    let details = format!("server error {code}: {message}");
                    return Err(QuaboError::transfer(remote, details));
                }
                other => debug!("Unexpected TFTP packet during write: {:?}", other),
            }
        }
    }
}

#[async_trait::async_trait]
impl FlashTransport for TftpClient {
    async fn download(&self, remote: &str) -> Result<Vec<u8>> {
        self.get(remote).await
    }

    async fn upload(&self, remote: &str, data: &[u8]) -> Result<()> {
        self.put(remote, data).await
    }
}
