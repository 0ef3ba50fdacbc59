//! Application layer use cases for the game server.
//!
//! # What does the server do? (for beginners)
//!
//! The server is the **Responder**: it never chooses who goes first and it
//! never thinks about strategy.  It keeps the authoritative board, checks
//! every move the client sends and answers with a random free cell.
//!
//! Both use cases are generic over the transport traits from `ttt_core`, so
//! tests drive them with scripted in-memory links instead of sockets.
//!
//! # Sub-modules
//!
//! - **`serve_stream`**   – One game over TCP: read a byte, write a byte.
//!
//! - **`serve_datagram`** – One game over UDP through the reliability layer,
//!   with the peer pinned at the greeting.
//!
//! - **`game_report`**    – The summary both use cases return, and
//!   [`ServeError`](game_report::ServeError).

pub mod game_report;
pub mod serve_datagram;
pub mod serve_stream;

pub use game_report::{GameReport, ServeError};
pub use serve_datagram::serve_datagram;
pub use serve_stream::{abort_stream, serve_stream};
