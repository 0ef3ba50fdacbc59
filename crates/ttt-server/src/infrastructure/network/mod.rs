//! Network infrastructure for the server application.
//!
//! Binds the configured port for whichever transport the game uses.  The
//! stream variant accepts exactly one connection; the datagram variant
//! hands the bound socket to a [`ReliableChannel`] with no peer yet, and the
//! first greeting pins one.

use tokio::net::TcpListener;
use tracing::info;
use ttt_core::transport::net::{TcpLink, UdpLink};
use ttt_core::{ReliabilityConfig, ReliableChannel, TransportError};

use crate::infrastructure::storage::config::NetworkConfig;

/// Binds the TCP listener.
///
/// # Errors
///
/// Returns [`TransportError::Bind`] if the address is unavailable.
pub async fn bind_stream(network: &NetworkConfig) -> Result<TcpListener, TransportError> {
    let addr = network.listen_addr();
    let listener = TcpListener::bind(&addr)
        .await
        .map_err(|source| TransportError::Bind { addr: addr.clone(), source })?;
    info!("listening for a stream client on {addr}");
    Ok(listener)
}

/// Waits for the single client connection.
///
/// # Errors
///
/// Returns [`TransportError::Io`] if the accept fails.
pub async fn accept_one(listener: &TcpListener) -> Result<TcpLink, TransportError> {
    let (stream, peer) = listener.accept().await?;
    stream.set_nodelay(true)?;
    info!(%peer, "client connected");
    TcpLink::new(stream)
}

/// Binds the UDP socket and wraps it in an unpinned channel.
///
/// # Errors
///
/// Returns [`TransportError::Bind`] if the address is unavailable.
pub async fn bind_datagram(
    network: &NetworkConfig,
    reliability: ReliabilityConfig,
) -> Result<ReliableChannel<UdpLink>, TransportError> {
    let addr = network.listen_addr();
    let link = UdpLink::bind(addr.as_str()).await?;
    info!("waiting for a datagram greeting on {}", link.local_addr()?);
    Ok(ReliableChannel::new(link, reliability))
}
