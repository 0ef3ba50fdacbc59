//! The 3×3 board and its win/draw predicate.
//!
//! Cells are indexed 0..8 in row-major order:
//!
//! ```text
//!  0 | 1 | 2
//! ---+---+---
//!  3 | 4 | 5
//! ---+---+---
//!  6 | 7 | 8
//! ```
//!
//! The board does not know which side moves first; it only records which
//! [`Side`] owns each cell.  Mapping a side to its printed `X`/`O` mark is
//! the job of [`crate::domain::session::GameSession`].

use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Number of cells on the board.
pub const CELL_COUNT: usize = 9;

/// The eight winning lines: three rows, three columns, two diagonals.
pub const WINNING_LINES: [[usize; 3]; 8] = [
    [0, 1, 2],
    [3, 4, 5],
    [6, 7, 8],
    [0, 3, 6],
    [1, 4, 7],
    [2, 5, 8],
    [0, 4, 8],
    [2, 4, 6],
];

/// The two participants of a game.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Side {
    /// The interactive peer that opens the connection.
    Initiator,
    /// The automated peer holding the authoritative board.
    Responder,
}

impl Side {
    /// Returns the other participant.
    pub fn opponent(self) -> Side {
        match self {
            Side::Initiator => Side::Responder,
            Side::Responder => Side::Initiator,
        }
    }
}

impl fmt::Display for Side {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Side::Initiator => write!(f, "initiator"),
            Side::Responder => write!(f, "responder"),
        }
    }
}

/// The printed symbol of a side.  `X` always belongs to whoever moves first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Mark {
    X,
    O,
}

impl Mark {
    pub fn as_char(self) -> char {
        match self {
            Mark::X => 'X',
            Mark::O => 'O',
        }
    }
}

/// A validated cell index in `0..=8`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Position(u8);

impl Position {
    /// Creates a position, returning `None` when `index` is not a board cell.
    pub fn new(index: usize) -> Option<Self> {
        if index < CELL_COUNT {
            Some(Self(index as u8))
        } else {
            None
        }
    }

    /// Returns the zero-based cell index.
    pub fn index(self) -> usize {
        self.0 as usize
    }

    /// Iterates over all nine positions in index order.
    pub fn all() -> impl Iterator<Item = Position> {
        (0..CELL_COUNT as u8).map(Position)
    }
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Result of evaluating the board from one side's point of view.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verdict {
    /// The side owns a complete line.
    Win,
    /// Every cell is filled and the side owns no line.
    Draw,
    /// At least one cell is free and the side owns no line.
    InProgress,
}

/// Why a placement was refused.  The board is never mutated on error.
#[derive(Debug, Clone, Copy, Error, PartialEq, Eq)]
pub enum IllegalMove {
    #[error("cell index {index} is outside the board (0-8)")]
    OutOfRange { index: usize },

    #[error("cell {index} is already taken")]
    Occupied { index: usize },
}

/// The 3×3 grid.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Board {
    cells: [Option<Side>; CELL_COUNT],
}

impl Board {
    /// Creates an empty board.
    pub fn new() -> Self {
        Self::default()
    }

    /// Places `side`'s mark on cell `index`.
    ///
    /// # Errors
    ///
    /// Returns [`IllegalMove::OutOfRange`] when `index > 8` and
    /// [`IllegalMove::Occupied`] when the cell already holds a mark.
    pub fn place(&mut self, index: usize, side: Side) -> Result<(), IllegalMove> {
        let cell = self
            .cells
            .get_mut(index)
            .ok_or(IllegalMove::OutOfRange { index })?;
        if cell.is_some() {
            return Err(IllegalMove::Occupied { index });
        }
        *cell = Some(side);
        Ok(())
    }

    /// Evaluates the board for `side`.  A completed line wins even when the
    /// same move also filled the last free cell.
    pub fn evaluate(&self, side: Side) -> Verdict {
        let owns_line = WINNING_LINES
            .iter()
            .any(|line| line.iter().all(|&i| self.cells[i] == Some(side)));

        if owns_line {
            Verdict::Win
        } else if self.is_full() {
            Verdict::Draw
        } else {
            Verdict::InProgress
        }
    }

    /// Returns the owner of cell `index`, or `None` when empty or out of range.
    pub fn cell(&self, index: usize) -> Option<Side> {
        self.cells.get(index).copied().flatten()
    }

    pub fn is_free(&self, position: Position) -> bool {
        self.cells[position.index()].is_none()
    }

    /// Lists the empty cells in index order.
    pub fn free_cells(&self) -> Vec<Position> {
        Position::all().filter(|&p| self.is_free(p)).collect()
    }

    /// Number of non-empty cells.
    pub fn filled(&self) -> usize {
        self.cells.iter().filter(|c| c.is_some()).count()
    }

    pub fn is_full(&self) -> bool {
        self.cells.iter().all(Option::is_some)
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
