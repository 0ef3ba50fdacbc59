//! # ttt-core
//!
//! Shared library for networked tic-tac-toe containing the board, the
//! single-byte wire protocol, its per-transport state machines and the
//! datagram reliability layer.
//!
//! This crate is used by both the server (Responder) and client (Initiator)
//! applications.  The game rules and state machines do no I/O at all; socket
//! access is confined to the thin adapters in [`transport::net`].
//!
//! # Architecture overview (for beginners)
//!
//! Two peers play one game.  The **Initiator** is a person at a terminal;
//! the **Responder** is a program that keeps the authoritative board and
//! answers every move with a random free cell.  Every message on the wire
//! is a single ASCII byte, such as `A` (let's start, I go first), `4` (I
//! play cell 4) or `E` (my turn is over).
//!
//! - **`domain`**: the board, the random move selector and the per-game
//!   session.  Pure rules, no networking.
//!
//! - **`protocol`**: the message alphabet and the state machines that decide
//!   what to send next.  There is one machine per side and per transport:
//!   over TCP a plain request/reply, over UDP an echo-confirmed lock-step.
//!
//! - **`reliability`**: makes UDP behave: resend on timeout, answer
//!   duplicates, talk only to the pinned peer.
//!
//! - **`transport`**: the byte-level traits the applications are written
//!   against, with tokio socket adapters and in-memory test doubles.

pub mod domain;
pub mod protocol;
pub mod reliability;
pub mod transport;

// Re-export the most-used types at the crate root so callers can write
// `ttt_core::GameSession` instead of `ttt_core::domain::session::GameSession`.
pub use domain::board::{Board, IllegalMove, Mark, Position, Side, Verdict, CELL_COUNT};
pub use domain::move_selector::{MoveSelector, RandomSelector, ScriptedSelector, SelectorError};
pub use domain::session::{FirstMover, GameEnd, GameError, GameSession, Outcome};
pub use protocol::{ProtocolError, Step, Symbol, DEFAULT_PORT};
pub use reliability::{ChannelStats, ReliabilityConfig, ReliabilityError, ReliableChannel};
pub use transport::{DatagramLink, StreamLink, TransportError, TransportKind};
