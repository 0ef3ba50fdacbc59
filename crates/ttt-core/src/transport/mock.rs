//! In-memory transport doubles for tests and benchmarks.
//!
//! - [`ScriptedDatagramLink`] / [`ScriptedStreamLink`] replay a fixed inbound
//!   script and record everything sent, with no real time passing.
//! - [`MemoryLink::pair`] connects two peers through unbounded channels.
//! - [`LossyLink`] wraps any datagram link and drops or duplicates chosen
//!   outbound datagrams.

use std::collections::{HashSet, VecDeque};
use std::net::SocketAddr;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::mpsc;

use super::{DatagramLink, StreamLink, TransportError};
use crate::protocol::codec::decode_symbol;
use crate::protocol::messages::Symbol;

// ── Scripted datagram link ────────────────────────────────────────────────────

/// One scripted receive result.
#[derive(Debug, Clone)]
pub enum Inbound {
    Datagram { payload: Vec<u8>, from: SocketAddr },
    /// The receive times out after its full wait.
    Silence,
}

/// Replays `Inbound` events in order.  Once the script is exhausted every
/// receive fails with [`TransportError::Closed`], so a driver under test can
/// never spin forever.
#[derive(Debug, Default)]
pub struct ScriptedDatagramLink {
    inbound: VecDeque<Inbound>,
    sent: Vec<(Vec<u8>, SocketAddr)>,
    elapsed: Duration,
}

impl ScriptedDatagramLink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_symbol(self, symbol: Symbol, from: SocketAddr) -> Self {
        self.with_bytes(&[symbol.to_byte()], from)
    }

    pub fn with_bytes(mut self, payload: &[u8], from: SocketAddr) -> Self {
        self.inbound.push_back(Inbound::Datagram {
            payload: payload.to_vec(),
            from,
        });
        self
    }

    pub fn with_silence(mut self) -> Self {
        self.inbound.push_back(Inbound::Silence);
        self
    }

    /// Raw payloads with their destinations, in send order.
    pub fn sent(&self) -> &[(Vec<u8>, SocketAddr)] {
        &self.sent
    }

    /// Decoded symbols in send order.
    pub fn sent_symbols(&self) -> Vec<Symbol> {
        self.sent
            .iter()
            .filter_map(|(payload, _)| decode_symbol(payload).ok())
            .collect()
    }

    /// Virtual time spent in timed-out receives.
    pub fn elapsed(&self) -> Duration {
        self.elapsed
    }

    pub fn remaining(&self) -> usize {
        self.inbound.len()
    }
}

#[async_trait]
impl DatagramLink for ScriptedDatagramLink {
    async fn send_to(&mut self, payload: &[u8], dest: SocketAddr) -> Result<(), TransportError> {
        self.sent.push((payload.to_vec(), dest));
        Ok(())
    }

    async fn recv_from(
        &mut self,
        wait: Duration,
    ) -> Result<Option<(Vec<u8>, SocketAddr)>, TransportError> {
        match self.inbound.pop_front() {
            Some(Inbound::Datagram { payload, from }) => Ok(Some((payload, from))),
            Some(Inbound::Silence) => {
                self.elapsed += wait;
                Ok(None)
            }
            None => Err(TransportError::Closed),
        }
    }
}

// ── Scripted stream link ──────────────────────────────────────────────────────

/// Replays inbound bytes, then reports end of stream.
#[derive(Debug, Default)]
pub struct ScriptedStreamLink {
    inbound: VecDeque<u8>,
    sent: Vec<u8>,
}

impl ScriptedStreamLink {
    pub fn new(inbound: &[u8]) -> Self {
        Self {
            inbound: inbound.iter().copied().collect(),
            sent: Vec::new(),
        }
    }

    pub fn sent(&self) -> &[u8] {
        &self.sent
    }
}

#[async_trait]
impl StreamLink for ScriptedStreamLink {
    async fn send(&mut self, byte: u8) -> Result<(), TransportError> {
        self.sent.push(byte);
        Ok(())
    }

    async fn recv(&mut self) -> Result<Option<u8>, TransportError> {
        Ok(self.inbound.pop_front())
    }
}

// ── In-memory datagram network ────────────────────────────────────────────────

/// One end of a two-peer in-memory datagram network.  Datagrams are
/// delivered in order to the other end regardless of the destination
/// address, tagged with this end's address.
pub struct MemoryLink {
    local: SocketAddr,
    tx: mpsc::UnboundedSender<(Vec<u8>, SocketAddr)>,
    rx: mpsc::UnboundedReceiver<(Vec<u8>, SocketAddr)>,
}

impl MemoryLink {
    /// Creates two connected ends with the given local addresses.
    pub fn pair(a: SocketAddr, b: SocketAddr) -> (MemoryLink, MemoryLink) {
        let (a_tx, b_rx) = mpsc::unbounded_channel();
        let (b_tx, a_rx) = mpsc::unbounded_channel();
        (
            MemoryLink {
                local: a,
                tx: a_tx,
                rx: a_rx,
            },
            MemoryLink {
                local: b,
                tx: b_tx,
                rx: b_rx,
            },
        )
    }

    pub fn local_addr(&self) -> SocketAddr {
        self.local
    }
}

#[async_trait]
impl DatagramLink for MemoryLink {
    async fn send_to(&mut self, payload: &[u8], _dest: SocketAddr) -> Result<(), TransportError> {
        // A vanished peer looks like a lost datagram, not a socket failure.
        let _ = self.tx.send((payload.to_vec(), self.local));
        Ok(())
    }

    async fn recv_from(
        &mut self,
        wait: Duration,
    ) -> Result<Option<(Vec<u8>, SocketAddr)>, TransportError> {
        match tokio::time::timeout(wait, self.rx.recv()).await {
            Ok(Some(datagram)) => Ok(Some(datagram)),
            // Peer dropped: nothing will ever arrive, behave like silence.
            Ok(None) => {
                tokio::time::sleep(wait).await;
                Ok(None)
            }
            Err(_elapsed) => Ok(None),
        }
    }
}

// ── Fault injection ───────────────────────────────────────────────────────────

/// Counters shared between a [`LossyLink`] and the test that built it.
#[derive(Debug, Default)]
pub struct FaultLog {
    /// Every payload handed to `send_to`, including dropped ones.
    pub attempted: Vec<Vec<u8>>,
    pub dropped: usize,
    pub duplicated: usize,
}

/// Drops or duplicates chosen outbound datagrams by their zero-based send
/// index.
pub struct LossyLink<L> {
    inner: L,
    sends: usize,
    drop: HashSet<usize>,
    duplicate: HashSet<usize>,
    log: Arc<Mutex<FaultLog>>,
}

impl<L: DatagramLink> LossyLink<L> {
    pub fn new(inner: L) -> Self {
        Self {
            inner,
            sends: 0,
            drop: HashSet::new(),
            duplicate: HashSet::new(),
            log: Arc::new(Mutex::new(FaultLog::default())),
        }
    }

    pub fn drop_outbound(mut self, index: usize) -> Self {
        self.drop.insert(index);
        self
    }

    pub fn duplicate_outbound(mut self, index: usize) -> Self {
        self.duplicate.insert(index);
        self
    }

    /// Handle to the shared fault log; stays valid after the link is moved.
    pub fn log(&self) -> Arc<Mutex<FaultLog>> {
        Arc::clone(&self.log)
    }

    pub fn inner(&self) -> &L {
        &self.inner
    }
}

#[async_trait]
impl<L: DatagramLink> DatagramLink for LossyLink<L> {
    async fn send_to(&mut self, payload: &[u8], dest: SocketAddr) -> Result<(), TransportError> {
        let index = self.sends;
        self.sends += 1;
        let (drop, duplicate) = (self.drop.contains(&index), self.duplicate.contains(&index));
        {
            let mut log = self.log.lock().unwrap_or_else(|e| e.into_inner());
            log.attempted.push(payload.to_vec());
            if drop {
                log.dropped += 1;
            } else if duplicate {
                log.duplicated += 1;
            }
        }

        if drop {
            return Ok(());
        }
        self.inner.send_to(payload, dest).await?;
        if duplicate {
            self.inner.send_to(payload, dest).await?;
        }
        Ok(())
    }

    async fn recv_from(
        &mut self,
        wait: Duration,
    ) -> Result<Option<(Vec<u8>, SocketAddr)>, TransportError> {
        self.inner.recv_from(wait).await
    }
}
