//! Scripted move source for tests.
//!
//! Plays the given cells in order, then quits.  Every notice is recorded so
//! tests can check what the player would have seen.

use async_trait::async_trait;
use ttt_core::{GameSession, Position};

use crate::application::move_source::{InputError, MoveChoice, MoveSource, Notice};

#[derive(Debug, Default)]
pub struct ScriptedMoves {
    moves: Vec<usize>,
    next: usize,
    notices: Vec<Notice>,
}

impl ScriptedMoves {
    pub fn new(moves: impl IntoIterator<Item = usize>) -> Self {
        Self {
            moves: moves.into_iter().collect(),
            ..Self::default()
        }
    }

    pub fn notices(&self) -> &[Notice] {
        &self.notices
    }

    /// Moves not yet handed out.
    pub fn remaining(&self) -> usize {
        self.moves.len().saturating_sub(self.next)
    }
}

#[async_trait]
impl MoveSource for ScriptedMoves {
    async fn next_move(&mut self, _session: &GameSession) -> Result<MoveChoice, InputError> {
        let choice = self
            .moves
            .get(self.next)
            .and_then(|&cell| Position::new(cell))
            .map_or(MoveChoice::Quit, MoveChoice::Play);
        self.next += 1;
        Ok(choice)
    }

    fn notify(&mut self, notice: Notice) {
        self.notices.push(notice);
    }
}
