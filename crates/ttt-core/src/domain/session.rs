//! Per-side game state.
//!
//! Each peer owns exactly one [`GameSession`] for the lifetime of a game and
//! passes it by mutable reference into every protocol transition.  The two
//! peers' sessions are only kept consistent by the confirmation protocol.

use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

use crate::domain::board::{Board, IllegalMove, Mark, Position, Side, Verdict};
use crate::domain::move_selector::SelectorError;

/// Who places the first `X`.  Fixed by the Initiator's greeting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FirstMover {
    Initiator,
    Responder,
}

impl FirstMover {
    pub fn side(self) -> Side {
        match self {
            FirstMover::Initiator => Side::Initiator,
            FirstMover::Responder => Side::Responder,
        }
    }
}

/// Game result as seen by both peers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Outcome {
    InProgress,
    InitiatorWins,
    ResponderWins,
    Draw,
}

impl Outcome {
    pub fn is_terminal(self) -> bool {
        self != Outcome::InProgress
    }
}

/// How a game ended, as reported by the application drivers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GameEnd {
    /// A terminal outcome was reached and confirmed.
    Finished(Outcome),
    /// One side sent `Q` (or the stream closed) before a terminal outcome.
    Quit { by: Side },
}

/// Errors raised when a transition would break the session's invariants.
///
/// These never stem from remote input that the protocol validates first;
/// seeing one means the two board copies have diverged.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum GameError {
    #[error(transparent)]
    Illegal(#[from] IllegalMove),

    #[error("it is not the {0}'s turn")]
    OutOfTurn(Side),

    #[error("the game is already over")]
    AlreadyOver,

    #[error(transparent)]
    Selector(#[from] SelectorError),
}

/// The board, role assignment and move history of one game.
#[derive(Debug, Clone)]
pub struct GameSession {
    id: Uuid,
    first_mover: FirstMover,
    board: Board,
    history: Vec<(Side, Position)>,
}

impl GameSession {
    pub fn new(first_mover: FirstMover) -> Self {
        Self {
            id: Uuid::new_v4(),
            first_mover,
            board: Board::new(),
            history: Vec::new(),
        }
    }

    /// Identifier used to correlate log lines of one game.
    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn first_mover(&self) -> FirstMover {
        self.first_mover
    }

    pub fn board(&self) -> &Board {
        &self.board
    }

    /// Confirmed moves in the order they were committed.
    pub fn history(&self) -> &[(Side, Position)] {
        &self.history
    }

    /// `X` for the first mover, `O` for the other side.
    pub fn mark_of(&self, side: Side) -> Mark {
        if side == self.first_mover.side() {
            Mark::X
        } else {
            Mark::O
        }
    }

    /// The side whose turn it is, or `None` once the game is over.
    pub fn to_move(&self) -> Option<Side> {
        if self.outcome().is_terminal() {
            return None;
        }
        let first = self.first_mover.side();
        if self.history.len() % 2 == 0 {
            Some(first)
        } else {
            Some(first.opponent())
        }
    }

    /// Whether `side` may play `position` right now.
    pub fn is_legal(&self, side: Side, position: Position) -> bool {
        self.to_move() == Some(side) && self.board.is_free(position)
    }

    /// Commits a move and returns the resulting outcome.
    ///
    /// # Errors
    ///
    /// Returns [`GameError::AlreadyOver`] after a terminal outcome,
    /// [`GameError::OutOfTurn`] when `side` is not to move, and
    /// [`GameError::Illegal`] when the cell is taken.  Nothing is mutated on
    /// error.
    pub fn apply(&mut self, side: Side, position: Position) -> Result<Outcome, GameError> {
        match self.to_move() {
            None => return Err(GameError::AlreadyOver),
            Some(turn) if turn != side => return Err(GameError::OutOfTurn(side)),
            Some(_) => {}
        }
        self.board.place(position.index(), side)?;
        self.history.push((side, position));
        Ok(self.outcome())
    }

    /// One-line board picture for log output, e.g. `X.O/.X./...`.
    pub fn summary(&self) -> String {
        let mut out = String::with_capacity(11);
        for (i, position) in Position::all().enumerate() {
            if i > 0 && i % 3 == 0 {
                out.push('/');
            }
            out.push(match self.board.cell(position.index()) {
                Some(side) => self.mark_of(side).as_char(),
                None => '.',
            });
        }
        out
    }

    /// How the game ends when `by` closes it now: a quit mid-game, or the
    /// outcome the board already shows.
    pub fn quit_end(&self, by: Side) -> GameEnd {
        match self.outcome() {
            Outcome::InProgress => GameEnd::Quit { by },
            outcome => GameEnd::Finished(outcome),
        }
    }

    /// Current outcome.  A win for either side takes precedence over a draw.
    pub fn outcome(&self) -> Outcome {
        let initiator = self.board.evaluate(Side::Initiator);
        let responder = self.board.evaluate(Side::Responder);
        match (initiator, responder) {
            (Verdict::Win, _) => Outcome::InitiatorWins,
            (_, Verdict::Win) => Outcome::ResponderWins,
            (Verdict::Draw, _) => Outcome::Draw,
            _ => Outcome::InProgress,
        }
    }
}
