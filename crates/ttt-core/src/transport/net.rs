//! Tokio socket adapters for [`StreamLink`] and [`DatagramLink`].

use std::net::SocketAddr;
use std::time::Duration;

use async_trait::async_trait;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpStream, ToSocketAddrs, UdpSocket};
use tokio::time::{self, Instant};
use tracing::debug;

use super::{DatagramLink, StreamLink, TransportError};

/// Receive buffer size.  Anything longer than one byte is rejected by the
/// codec anyway; the slack lets oversized datagrams be seen and logged.
const MAX_DATAGRAM: usize = 64;

/// Returns `true` for errors a datagram socket may report after an ICMP
/// "port unreachable" that should not end the game.
fn is_transient_error(e: &std::io::Error) -> bool {
    matches!(
        e.kind(),
        std::io::ErrorKind::ConnectionRefused
            | std::io::ErrorKind::ConnectionReset
            | std::io::ErrorKind::WouldBlock
            | std::io::ErrorKind::Interrupted
    )
}

/// Returns `true` for errors that mean the stream peer has gone away.
fn is_disconnect_error(e: &std::io::Error) -> bool {
    matches!(
        e.kind(),
        std::io::ErrorKind::ConnectionReset
            | std::io::ErrorKind::ConnectionAborted
            | std::io::ErrorKind::BrokenPipe
            | std::io::ErrorKind::UnexpectedEof
    )
}

// ── Datagram ──────────────────────────────────────────────────────────────────

/// A bound UDP socket.
pub struct UdpLink {
    socket: UdpSocket,
}

impl UdpLink {
    /// Binds a UDP socket to `addr`.
    ///
    /// # Errors
    ///
    /// Returns [`TransportError::Bind`] if the address is unavailable.
    pub async fn bind(addr: impl ToSocketAddrs + std::fmt::Display) -> Result<Self, TransportError> {
        let label = addr.to_string();
        let socket = UdpSocket::bind(addr)
            .await
            .map_err(|source| TransportError::Bind { addr: label, source })?;
        Ok(Self { socket })
    }

    pub fn local_addr(&self) -> Result<SocketAddr, TransportError> {
        Ok(self.socket.local_addr()?)
    }
}

#[async_trait]
impl DatagramLink for UdpLink {
    async fn send_to(&mut self, payload: &[u8], dest: SocketAddr) -> Result<(), TransportError> {
        self.socket.send_to(payload, dest).await?;
        Ok(())
    }

    async fn recv_from(
        &mut self,
        wait: Duration,
    ) -> Result<Option<(Vec<u8>, SocketAddr)>, TransportError> {
        let deadline = Instant::now() + wait;
        let mut buf = [0u8; MAX_DATAGRAM];
        loop {
            match time::timeout_at(deadline, self.socket.recv_from(&mut buf)).await {
                Err(_elapsed) => return Ok(None),
                Ok(Ok((len, from))) => return Ok(Some((buf[..len].to_vec(), from))),
                Ok(Err(e)) if is_transient_error(&e) => {
                    debug!("transient datagram receive error: {e}");
                }
                Ok(Err(e)) => return Err(TransportError::Io(e)),
            }
        }
    }
}

// ── Stream ────────────────────────────────────────────────────────────────────

/// A connected TCP stream.
pub struct TcpLink {
    stream: TcpStream,
    peer: SocketAddr,
}

impl TcpLink {
    pub fn new(stream: TcpStream) -> Result<Self, TransportError> {
        let peer = stream.peer_addr()?;
        Ok(Self { stream, peer })
    }

    /// Connects to `addr`.
    ///
    /// # Errors
    ///
    /// Returns [`TransportError::Connect`] if no listener accepts.
    pub async fn connect(addr: impl ToSocketAddrs + std::fmt::Display) -> Result<Self, TransportError> {
        let label = addr.to_string();
        let stream = TcpStream::connect(addr)
            .await
            .map_err(|source| TransportError::Connect { addr: label, source })?;
        stream.set_nodelay(true)?;
        Self::new(stream)
    }

    pub fn peer_addr(&self) -> SocketAddr {
        self.peer
    }
}

#[async_trait]
impl StreamLink for TcpLink {
    async fn send(&mut self, byte: u8) -> Result<(), TransportError> {
        self.stream.write_all(&[byte]).await?;
        self.stream.flush().await?;
        Ok(())
    }

    async fn recv(&mut self) -> Result<Option<u8>, TransportError> {
        let mut buf = [0u8; 1];
        match self.stream.read(&mut buf).await {
            Ok(0) => Ok(None),
            Ok(_) => Ok(Some(buf[0])),
            Err(e) if is_disconnect_error(&e) => {
                debug!(peer = %self.peer, "stream dropped: {e}");
                Ok(None)
            }
            Err(e) => Err(TransportError::Io(e)),
        }
    }
}
