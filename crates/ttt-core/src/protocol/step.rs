//! What a protocol state machine asks its driver to do next.

use crate::domain::session::GameEnd;
use crate::protocol::messages::Symbol;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Step {
    /// Transmit the symbol and wait for the peer's reply.
    Send(Symbol),
    /// Ask the local player for a move (Initiator only).
    Prompt,
    /// The inbound symbol is not expected in the current state.  Nothing
    /// changed; keep waiting.
    Ignore,
    /// The game is over.  Transmit `reply` if present, then close.
    End { reply: Option<Symbol>, end: GameEnd },
}
