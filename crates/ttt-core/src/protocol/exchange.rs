//! Last-sent / last-received bookkeeping for the datagram transport.
//!
//! There are no sequence numbers.  A side recognises a retransmission only
//! because it is byte-identical to the last symbol it received, and it
//! recovers from loss only by resending the last symbol it sent.

use crate::protocol::messages::Symbol;

/// Classification of an inbound symbol.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Delivery {
    /// Not seen immediately before; hand it to the state machine.
    Fresh,
    /// Identical to the previous inbound symbol; answer with the pending
    /// outbound symbol and change nothing else.
    Duplicate,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Exchange {
    last_sent: Option<Symbol>,
    last_received: Option<Symbol>,
}

impl Exchange {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records `symbol` as the pending outbound message.
    pub fn record_sent(&mut self, symbol: Symbol) {
        self.last_sent = Some(symbol);
    }

    /// Marks `symbol` as received without classifying it.  Used when a
    /// handshake is confirmed outside the normal receive path.
    pub fn record_received(&mut self, symbol: Symbol) {
        self.last_received = Some(symbol);
    }

    /// The exact symbol a retransmission must repeat.
    pub fn pending(&self) -> Option<Symbol> {
        self.last_sent
    }

    /// Classifies `inbound`, remembering it when fresh.
    pub fn classify(&mut self, inbound: Symbol) -> Delivery {
        if self.last_received == Some(inbound) {
            Delivery::Duplicate
        } else {
            self.last_received = Some(inbound);
            Delivery::Fresh
        }
    }
}
