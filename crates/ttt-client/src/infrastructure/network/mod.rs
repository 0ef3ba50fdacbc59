//! Network infrastructure for the client application.
//!
//! Resolves the server address and opens the transport the game uses.  The
//! datagram socket is bound to an ephemeral port on the matching address
//! family and pinned to the resolved server address.

use std::net::SocketAddr;

use tokio::net::lookup_host;
use tracing::{debug, info};
use ttt_core::transport::net::{TcpLink, UdpLink};
use ttt_core::{ReliabilityConfig, ReliableChannel, TransportError};

/// Resolves `host:port` to the first address it yields.
///
/// # Errors
///
/// Returns [`TransportError::Connect`] if the name does not resolve.
pub async fn resolve(host: &str, port: u16) -> Result<SocketAddr, TransportError> {
    let label = format!("{host}:{port}");
    let mut addrs = lookup_host((host, port))
        .await
        .map_err(|source| TransportError::Connect {
            addr: label.clone(),
            source,
        })?;
    addrs.next().ok_or_else(|| TransportError::Connect {
        addr: label,
        source: std::io::Error::new(std::io::ErrorKind::NotFound, "no address found"),
    })
}

/// Opens a TCP connection to the server.
///
/// # Errors
///
/// Returns [`TransportError::Connect`] if the server refuses or cannot be
/// reached.
pub async fn connect_stream(server: SocketAddr) -> Result<TcpLink, TransportError> {
    let link = TcpLink::connect(server).await?;
    info!(%server, "connected");
    Ok(link)
}

/// Binds an ephemeral UDP socket and pins it to the server.
///
/// # Errors
///
/// Returns [`TransportError::Bind`] if no local socket can be bound.
pub async fn open_datagram(
    server: SocketAddr,
    reliability: ReliabilityConfig,
) -> Result<ReliableChannel<UdpLink>, TransportError> {
    let local = if server.is_ipv4() { "0.0.0.0:0" } else { "[::]:0" };
    let link = UdpLink::bind(local).await?;
    debug!(local = %link.local_addr()?, %server, "datagram socket ready");
    Ok(ReliableChannel::with_peer(link, reliability, server))
}
