//! Responder move selection: uniform random pick among free cells.

use std::collections::VecDeque;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use thiserror::Error;

use crate::domain::board::Position;

#[derive(Debug, Clone, Copy, Error, PartialEq, Eq)]
pub enum SelectorError {
    #[error("no free cells left to play")]
    NoMovesLeft,
}

/// Chooses the Responder's next cell from a set of free cells.
#[cfg_attr(test, mockall::automock)]
pub trait MoveSelector: Send {
    /// # Errors
    ///
    /// Returns [`SelectorError::NoMovesLeft`] when `free` is empty.
    fn pick(&mut self, free: &[Position]) -> Result<Position, SelectorError>;
}

/// Uniform random selection backed by a standard RNG.
pub struct RandomSelector {
    rng: StdRng,
}

impl RandomSelector {
    /// Seeds from the operating system.
    pub fn from_os() -> Self {
        Self {
            rng: StdRng::from_os_rng(),
        }
    }

    /// Deterministic sequence for reproducible games.
    pub fn seeded(seed: u64) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
        }
    }
}

impl MoveSelector for RandomSelector {
    fn pick(&mut self, free: &[Position]) -> Result<Position, SelectorError> {
        pick_random(&mut self.rng, free)
    }
}

/// Picks one element of `free` uniformly at random.
///
/// # Errors
///
/// Returns [`SelectorError::NoMovesLeft`] when `free` is empty.
pub fn pick_random<R: Rng + ?Sized>(
    rng: &mut R,
    free: &[Position],
) -> Result<Position, SelectorError> {
    if free.is_empty() {
        return Err(SelectorError::NoMovesLeft);
    }
    Ok(free[rng.random_range(0..free.len())])
}

/// Plays a fixed list of preferred cells, skipping any that are taken, then
/// falls back to the lowest free cell.
#[derive(Debug, Clone, Default)]
pub struct ScriptedSelector {
    preferred: VecDeque<Position>,
}

impl ScriptedSelector {
    pub fn new(preferred: impl IntoIterator<Item = usize>) -> Self {
        Self {
            preferred: preferred.into_iter().filter_map(Position::new).collect(),
        }
    }
}

impl MoveSelector for ScriptedSelector {
    fn pick(&mut self, free: &[Position]) -> Result<Position, SelectorError> {
        while let Some(next) = self.preferred.pop_front() {
            if free.contains(&next) {
                return Ok(next);
            }
        }
        free.first().copied().ok_or(SelectorError::NoMovesLeft)
    }
}
