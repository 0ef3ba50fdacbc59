//! What a played game produced, and why playing can fail.

use thiserror::Error;
use ttt_core::{ChannelStats, GameEnd, GameError, GameSession, ReliabilityError, TransportError};

use super::move_source::InputError;

/// Errors that end a game abnormally.
#[derive(Debug, Error)]
pub enum PlayError {
    #[error(transparent)]
    Transport(#[from] TransportError),

    /// The datagram greeting was never echoed.
    #[error("no response from server after {attempts} attempts")]
    HandshakeTimeout { attempts: u32 },

    #[error(transparent)]
    Reliability(ReliabilityError),

    #[error(transparent)]
    Input(#[from] InputError),

    /// A confirmed move did not fit the local board.
    #[error("game state diverged: {0}")]
    Game(#[from] GameError),
}

impl From<ReliabilityError> for PlayError {
    fn from(e: ReliabilityError) -> Self {
        match e {
            ReliabilityError::NoServerResponse { attempts } => PlayError::HandshakeTimeout { attempts },
            ReliabilityError::Transport(e) => PlayError::Transport(e),
            other => PlayError::Reliability(other),
        }
    }
}

/// The finished game as the client saw it.
#[derive(Debug, Clone)]
pub struct PlayReport {
    pub session: GameSession,
    pub end: GameEnd,
    /// Datagram channel counters; `None` for stream games.
    pub stats: Option<ChannelStats>,
}
