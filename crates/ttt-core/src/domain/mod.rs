//! Domain entities for networked tic-tac-toe.
//!
//! Pure game rules with no knowledge of sockets, bytes, or timeouts.
//!
//! # What lives here? (for beginners)
//!
//! - **`board`**: the 3×3 grid, cell ownership and the win/draw predicate.
//! - **`move_selector`**: how the automated Responder picks a free cell.
//! - **`session`**: one game's board, turn order and history, owned by each
//!   peer and handed to the protocol state machines on every transition.
//!
//! Protocol code in [`crate::protocol`] depends on these types; nothing in
//! this module depends on the protocol.

pub mod board;
pub mod move_selector;
pub mod session;
