//! What a served game produced, and why serving can fail.

use std::net::SocketAddr;

use thiserror::Error;
use ttt_core::{Board, ChannelStats, GameEnd, GameError, GameSession, ReliabilityError, TransportError};
use uuid::Uuid;

/// Errors that end a served game abnormally.
#[derive(Debug, Error)]
pub enum ServeError {
    #[error(transparent)]
    Transport(#[from] TransportError),

    #[error(transparent)]
    Reliability(#[from] ReliabilityError),

    /// A validated move could not be committed; the boards have diverged.
    #[error("game state diverged: {0}")]
    Game(#[from] GameError),

    /// The client went away before sending a greeting.
    #[error("client closed the connection before starting a game")]
    NotStarted,
}

/// Summary of one finished game.
#[derive(Debug, Clone)]
pub struct GameReport {
    pub session_id: Uuid,
    pub peer: Option<SocketAddr>,
    pub end: GameEnd,
    pub board: Board,
    pub moves: usize,
    /// Datagram channel counters; `None` for stream games.
    pub stats: Option<ChannelStats>,
}

impl GameReport {
    pub fn new(session: &GameSession, end: GameEnd, peer: Option<SocketAddr>) -> Self {
        Self {
            session_id: session.id(),
            peer,
            end,
            board: session.board().clone(),
            moves: session.history().len(),
            stats: None,
        }
    }

    pub fn with_stats(mut self, stats: ChannelStats) -> Self {
        self.stats = Some(stats);
        self
    }
}
