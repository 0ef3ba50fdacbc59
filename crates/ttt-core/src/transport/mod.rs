//! Byte-level transport seams.
//!
//! The protocol drivers in the server and client crates are generic over
//! these two traits, so the same game logic runs against real sockets
//! ([`net`]) and against in-memory doubles ([`mock`]).

pub mod mock;
pub mod net;

use std::fmt;
use std::net::SocketAddr;
use std::str::FromStr;
use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Which protocol variant a game is played over.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransportKind {
    /// TCP, plain request/reply.
    Stream,
    /// UDP with the echo-confirmed reliability layer.
    #[default]
    Datagram,
}

impl FromStr for TransportKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "stream" | "tcp" => Ok(TransportKind::Stream),
            "datagram" | "udp" => Ok(TransportKind::Datagram),
            other => Err(format!(
                "unknown transport '{other}' (expected stream/tcp or datagram/udp)"
            )),
        }
    }
}

impl fmt::Display for TransportKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TransportKind::Stream => write!(f, "stream"),
            TransportKind::Datagram => write!(f, "datagram"),
        }
    }
}

/// Errors raised by transport adapters.  All of them are fatal to a game.
#[derive(Debug, Error)]
pub enum TransportError {
    #[error("failed to bind {addr}: {source}")]
    Bind {
        addr: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to connect to {addr}: {source}")]
    Connect {
        addr: String,
        #[source]
        source: std::io::Error,
    },

    #[error("socket I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The link has nothing more to deliver.
    #[error("link closed")]
    Closed,
}

/// Reliable, ordered byte stream carrying one symbol per byte.
#[async_trait]
pub trait StreamLink: Send {
    async fn send(&mut self, byte: u8) -> Result<(), TransportError>;

    /// Waits for the next byte.  `Ok(None)` means the peer closed the stream.
    async fn recv(&mut self) -> Result<Option<u8>, TransportError>;
}

/// Unreliable, unordered datagram socket carrying one symbol per datagram.
#[async_trait]
pub trait DatagramLink: Send {
    async fn send_to(&mut self, payload: &[u8], dest: SocketAddr) -> Result<(), TransportError>;

    /// Waits at most `wait` for one datagram.  `Ok(None)` means the wait
    /// timed out.
    async fn recv_from(
        &mut self,
        wait: Duration,
    ) -> Result<Option<(Vec<u8>, SocketAddr)>, TransportError>;
}
