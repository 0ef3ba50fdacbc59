//! Where the player's moves come from, and what the player is told.
//!
//! The play use cases never touch stdin or stdout.  They ask a
//! [`MoveSource`] for the next move and push [`Notice`]s to it; the console
//! implementation lives in the infrastructure layer and tests use a
//! scripted one.

use async_trait::async_trait;
use thiserror::Error;
use ttt_core::{FirstMover, GameEnd, GameSession, Mark, Position, Side, CELL_COUNT};

/// Error type for reading player input.
#[derive(Debug, Error)]
pub enum InputError {
    #[error("failed to read player input: {0}")]
    Io(#[from] std::io::Error),
}

/// What the player decided to do on their turn.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MoveChoice {
    Play(Position),
    Quit,
}

/// Cell contents as shown to the player.
pub type BoardView = [Option<Mark>; CELL_COUNT];

/// Events the player should see.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Notice {
    /// Shown once when the game starts.
    Directions { first_mover: FirstMover, mark: Mark },
    /// The confirmed board changed.
    Board(BoardView),
    /// The chosen cell is taken; another one is needed.
    Rejected(Position),
    Finished(GameEnd),
}

/// Source of the local player's moves.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait MoveSource: Send {
    /// Blocks until the player picks a cell or quits.
    async fn next_move(&mut self, session: &GameSession) -> Result<MoveChoice, InputError>;

    fn notify(&mut self, notice: Notice);
}

/// Board marks of `session`, by cell.
pub fn board_view(session: &GameSession) -> BoardView {
    let mut view = [None; CELL_COUNT];
    for (cell, slot) in view.iter_mut().enumerate() {
        *slot = session.board().cell(cell).map(|side| session.mark_of(side));
    }
    view
}

/// Directions notice for the start of `session`.
pub fn directions(session: &GameSession) -> Notice {
    Notice::Directions {
        first_mover: session.first_mover(),
        mark: session.mark_of(Side::Initiator),
    }
}
