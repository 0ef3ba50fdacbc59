//! Application layer use cases for the game client.
//!
//! # What does the client do? (for beginners)
//!
//! The client is the **Initiator**: it decides who moves first, sends the
//! greeting and relays the player's moves.  It never decides whether a move
//! is legal on its own authority; the server does, and the client commits a
//! move only once the server has confirmed it.
//!
//! # Sub-modules
//!
//! - **`move_source`**   – The [`MoveSource`](move_source::MoveSource) trait
//!   through which the use cases read moves and show the board.
//!
//! - **`play_stream`**   – One game over TCP.
//!
//! - **`play_datagram`** – One game over UDP through the reliability layer.
//!
//! - **`play_report`**   – The summary both use cases return, and
//!   [`PlayError`](play_report::PlayError).

pub mod move_source;
pub mod play_datagram;
pub mod play_report;
pub mod play_stream;

pub use move_source::{MoveChoice, MoveSource, Notice};
pub use play_datagram::play_datagram;
pub use play_report::{PlayError, PlayReport};
pub use play_stream::{abort_stream, play_stream};
