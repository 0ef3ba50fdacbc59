//! Reliable single-symbol exchange over an unreliable datagram link.
//!
//! [`ReliableChannel`] turns a [`DatagramLink`] into a lock-step
//! conversation with one pinned peer:
//!
//! - every outbound symbol becomes the *pending* symbol;
//! - a receive that times out resends the pending symbol byte-for-byte;
//! - an inbound symbol identical to the previous one is a retransmission
//!   and is answered by resending the pending symbol, with nothing else
//!   changing;
//! - datagrams from any address other than the peer, and payloads that do
//!   not decode, are logged and dropped.
//!
//! # Why echoes? (for beginners)
//!
//! UDP may lose, duplicate or reorder datagrams and never tells the sender.
//! The only way for a side to know its message arrived is to hear a reply
//! that could only have been produced after the peer saw it: usually the
//! same symbol echoed back.  Until then the side keeps resending.  Because
//! both sides behave this way, a lost datagram in either direction is
//! repaired by whichever side times out first.
//!
//! In-game waits are unbounded: a silent peer is retried forever.  Only the
//! handshake and the quit acknowledgement are bounded, by
//! [`ReliabilityConfig::handshake_retries`].

use std::net::SocketAddr;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info, trace, warn};

use crate::domain::session::FirstMover;
use crate::protocol::codec::{decode_symbol, encode_symbol};
use crate::protocol::exchange::{Delivery, Exchange};
use crate::protocol::messages::Symbol;
use crate::transport::{DatagramLink, TransportError};

/// Timing and retry settings of the datagram variant.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct ReliabilityConfig {
    /// Receive timeout before the pending symbol is resent, in milliseconds.
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,
    /// Retransmissions of the greeting (and of a quit) before giving up.
    #[serde(default = "default_handshake_retries")]
    pub handshake_retries: u32,
    /// Consecutive silent timeouts after which a closing side stops
    /// answering duplicates.
    #[serde(default = "default_linger_intervals")]
    pub linger_intervals: u32,
}

fn default_timeout_ms() -> u64 {
    1000
}
fn default_handshake_retries() -> u32 {
    5
}
fn default_linger_intervals() -> u32 {
    3
}

impl Default for ReliabilityConfig {
    fn default() -> Self {
        Self {
            timeout_ms: default_timeout_ms(),
            handshake_retries: default_handshake_retries(),
            linger_intervals: default_linger_intervals(),
        }
    }
}

impl ReliabilityConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

#[derive(Debug, Error)]
pub enum ReliabilityError {
    /// The greeting was never echoed.
    #[error("no response from server after {attempts} attempts")]
    NoServerResponse { attempts: u32 },

    /// A send was attempted before a peer was known.
    #[error("no peer to send to")]
    NoPeer,

    #[error(transparent)]
    Transport(#[from] TransportError),
}

/// Counters reported when a game ends.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ChannelStats {
    /// Datagrams sent, retransmissions included.
    pub transmissions: u64,
    pub retransmissions: u64,
    pub timeouts: u64,
    pub duplicates: u64,
    /// Datagrams from foreign addresses or with undecodable payloads.
    pub strays: u64,
}

/// Result of one receive attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Received {
    Fresh(Symbol),
    Duplicate(Symbol),
    Timeout,
    Stray,
}

/// A lock-step conversation with one datagram peer.
pub struct ReliableChannel<L> {
    link: L,
    config: ReliabilityConfig,
    peer: Option<SocketAddr>,
    exchange: Exchange,
    stats: ChannelStats,
}

impl<L: DatagramLink> ReliableChannel<L> {
    /// Creates a channel with no peer yet; use [`accept`](Self::accept).
    pub fn new(link: L, config: ReliabilityConfig) -> Self {
        Self {
            link,
            config,
            peer: None,
            exchange: Exchange::new(),
            stats: ChannelStats::default(),
        }
    }

    /// Creates a channel talking to a known peer; use
    /// [`connect`](Self::connect).
    pub fn with_peer(link: L, config: ReliabilityConfig, peer: SocketAddr) -> Self {
        Self {
            peer: Some(peer),
            ..Self::new(link, config)
        }
    }

    pub fn peer(&self) -> Option<SocketAddr> {
        self.peer
    }

    pub fn stats(&self) -> ChannelStats {
        self.stats
    }

    pub fn config(&self) -> &ReliabilityConfig {
        &self.config
    }

    /// The symbol a retransmission would repeat.
    pub fn pending(&self) -> Option<Symbol> {
        self.exchange.pending()
    }

    pub fn link(&self) -> &L {
        &self.link
    }

    // ── Handshake ─────────────────────────────────────────────────────────────

    /// Initiator handshake: sends `greeting` until the peer echoes it.
    ///
    /// # Errors
    ///
    /// Returns [`ReliabilityError::NoServerResponse`] after the initial
    /// transmission and `handshake_retries` retransmissions each went
    /// unanswered for one timeout interval.
    pub async fn connect(&mut self, greeting: Symbol) -> Result<(), ReliabilityError> {
        let attempts = self.config.handshake_retries + 1;
        if self.send_until_echo(greeting, attempts).await? {
            info!(peer = ?self.peer, %greeting, "handshake confirmed");
            Ok(())
        } else {
            Err(ReliabilityError::NoServerResponse { attempts })
        }
    }

    /// Responder handshake: waits indefinitely for the first greeting from
    /// any address, pins that address as the peer and echoes the greeting.
    /// Returns the role assignment the greeting asked for.
    ///
    /// # Errors
    ///
    /// Returns [`ReliabilityError::Transport`] on socket failure.
    pub async fn accept(&mut self) -> Result<FirstMover, ReliabilityError> {
        loop {
            let Some((payload, from)) = self.link.recv_from(self.config.timeout()).await? else {
                trace!("still waiting for a greeting");
                continue;
            };
            match decode_symbol(&payload) {
                Ok(symbol) => match symbol.as_greeting() {
                    Some(first_mover) => {
                        self.peer = Some(from);
                        self.exchange.record_received(symbol);
                        self.send(symbol).await?;
                        info!(%from, greeting = %symbol, "accepted client");
                        return Ok(first_mover);
                    }
                    None => {
                        warn!(%from, %symbol, "expected a greeting, waiting for resend");
                        self.stats.strays += 1;
                    }
                },
                Err(e) => {
                    warn!(%from, "undecodable greeting: {e}");
                    self.stats.strays += 1;
                }
            }
        }
    }

    // ── Lock-step exchange ────────────────────────────────────────────────────

    /// Sends `symbol` and makes it the pending symbol.
    ///
    /// # Errors
    ///
    /// Returns [`ReliabilityError::NoPeer`] before a handshake, or a
    /// transport error.
    pub async fn send(&mut self, symbol: Symbol) -> Result<(), ReliabilityError> {
        self.exchange.record_sent(symbol);
        self.transmit(symbol).await
    }

    /// Waits for the next fresh symbol from the peer, resending the pending
    /// symbol on every timeout and every duplicate.
    ///
    /// # Errors
    ///
    /// Returns [`ReliabilityError::Transport`] on socket failure.
    pub async fn next(&mut self) -> Result<Symbol, ReliabilityError> {
        loop {
            match self.poll().await? {
                Received::Fresh(symbol) => return Ok(symbol),
                Received::Duplicate(_) | Received::Timeout => self.retransmit().await?,
                Received::Stray => {}
            }
        }
    }

    /// Sends `symbol` until the peer echoes it, at most `attempts` times.
    /// Anything other than the echo is ignored.  Returns whether the echo
    /// arrived.
    ///
    /// # Errors
    ///
    /// Returns [`ReliabilityError::Transport`] on socket failure.
    pub async fn send_until_echo(
        &mut self,
        symbol: Symbol,
        attempts: u32,
    ) -> Result<bool, ReliabilityError> {
        self.exchange.record_sent(symbol);
        for attempt in 0..attempts {
            if attempt == 0 {
                self.transmit(symbol).await?;
            } else {
                self.retransmit().await?;
            }
            if self.await_echo(symbol).await? {
                self.exchange.record_received(symbol);
                return Ok(true);
            }
            debug!(%symbol, attempt = attempt + 1, attempts, "no echo yet");
        }
        Ok(false)
    }

    /// Keeps answering retransmissions with the pending symbol until
    /// `done` accepts a fresh symbol or `linger_intervals` consecutive
    /// timeouts pass in silence.
    ///
    /// # Errors
    ///
    /// Returns [`ReliabilityError::Transport`] on socket failure.
    pub async fn linger<F>(&mut self, mut done: F) -> Result<(), ReliabilityError>
    where
        F: FnMut(Symbol) -> bool + Send,
    {
        let mut silent = 0;
        while silent < self.config.linger_intervals {
            match self.poll().await? {
                Received::Fresh(symbol) if done(symbol) => return Ok(()),
                Received::Fresh(symbol) => {
                    debug!(%symbol, "ignoring symbol while closing");
                    silent = 0;
                }
                Received::Duplicate(_) => {
                    silent = 0;
                    self.retransmit().await?;
                }
                Received::Timeout => silent += 1,
                Received::Stray => {}
            }
        }
        Ok(())
    }

    /// Best-effort single `Q` to the peer, used on interactive abort.
    pub async fn abort(&mut self) {
        if self.peer.is_none() {
            return;
        }
        if let Err(e) = self.send(Symbol::Quit).await {
            debug!("abort quit not sent: {e}");
        }
    }

    // ── Internals ─────────────────────────────────────────────────────────────

    async fn transmit(&mut self, symbol: Symbol) -> Result<(), ReliabilityError> {
        let peer = self.peer.ok_or(ReliabilityError::NoPeer)?;
        self.link.send_to(&encode_symbol(symbol), peer).await?;
        self.stats.transmissions += 1;
        trace!(%peer, %symbol, "sent");
        Ok(())
    }

    async fn retransmit(&mut self) -> Result<(), ReliabilityError> {
        if let Some(symbol) = self.exchange.pending() {
            self.stats.retransmissions += 1;
            debug!(%symbol, "resending");
            self.transmit(symbol).await?;
        }
        Ok(())
    }

    /// One timed receive, classified.
    async fn poll(&mut self) -> Result<Received, ReliabilityError> {
        let Some((payload, from)) = self.link.recv_from(self.config.timeout()).await? else {
            self.stats.timeouts += 1;
            return Ok(Received::Timeout);
        };

        if Some(from) != self.peer {
            warn!(%from, peer = ?self.peer, "ignoring datagram from foreign address");
            self.stats.strays += 1;
            return Ok(Received::Stray);
        }

        let symbol = match decode_symbol(&payload) {
            Ok(symbol) => symbol,
            Err(e) => {
                debug!(%from, "dropping undecodable datagram: {e}");
                self.stats.strays += 1;
                return Ok(Received::Stray);
            }
        };

        match self.exchange.classify(symbol) {
            Delivery::Fresh => {
                trace!(%symbol, "received");
                Ok(Received::Fresh(symbol))
            }
            Delivery::Duplicate => {
                debug!(%symbol, "duplicate received");
                self.stats.duplicates += 1;
                Ok(Received::Duplicate(symbol))
            }
        }
    }

    /// Waits one timeout interval for `symbol` from the peer, skipping
    /// anything else.
    async fn await_echo(&mut self, symbol: Symbol) -> Result<bool, ReliabilityError> {
        let mut wait = self.config.timeout();
        let deadline = tokio::time::Instant::now() + wait;
        loop {
            let Some((payload, from)) = self.link.recv_from(wait).await? else {
                self.stats.timeouts += 1;
                return Ok(false);
            };
            wait = deadline.saturating_duration_since(tokio::time::Instant::now());
            if Some(from) != self.peer {
                self.stats.strays += 1;
                continue;
            }
            match decode_symbol(&payload) {
                Ok(echo) if echo == symbol => return Ok(true),
                Ok(other) => debug!(expected = %symbol, got = %other, "waiting for echo"),
                Err(e) => {
                    debug!("dropping undecodable datagram: {e}");
                    self.stats.strays += 1;
                }
            }
        }
    }
}
