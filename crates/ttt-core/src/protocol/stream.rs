//! Turn-taking over a reliable, ordered byte stream.
//!
//! The stream already guarantees delivery and order, so each message is a
//! plain request followed by exactly one reply:
//!
//! ```text
//! Initiator                 Responder
//!   A  ───────────────────▶
//!      ◀─────────────────── W            (Initiator moves first)
//!   4  ───────────────────▶             apply 4, pick 0
//!      ◀─────────────────── 0
//!   ?  ───────────────────▶
//!      ◀─────────────────── P            (S / D when terminal)
//! ```
//!
//! A move that ends the game is answered with `C` or `D` instead of a
//! counter-move.  Once the Initiator has seen the outcome it closes with
//! `Q`.  `Q` from either side is answered once before closing.

use tracing::debug;

use crate::domain::board::{Position, Side};
use crate::domain::move_selector::MoveSelector;
use crate::domain::session::{FirstMover, GameEnd, GameError, GameSession, Outcome};
use crate::protocol::messages::Symbol;
use crate::protocol::step::Step;

// ── Initiator ─────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StreamInitiatorState {
    /// Greeting sent; expecting `W` or the Responder's opening digit.
    AwaitingGreetingReply,
    /// Waiting for the local player.
    Composing,
    /// A digit was sent; expecting `W`, a counter-move, `C` or `D`.
    AwaitingMoveReply { proposed: Position },
    /// `?` was sent; expecting `S`, `D` or a continue reply.
    AwaitingStatus,
    Done,
}

/// Client side of the stream protocol.
#[derive(Debug, Clone)]
pub struct StreamInitiator {
    state: StreamInitiatorState,
}

impl StreamInitiator {
    /// Starts a game; the returned step carries the greeting.
    pub fn open(first_mover: FirstMover) -> (Self, Step) {
        let machine = Self {
            state: StreamInitiatorState::AwaitingGreetingReply,
        };
        (machine, Step::Send(Symbol::greeting(first_mover)))
    }

    pub fn state(&self) -> StreamInitiatorState {
        self.state
    }

    /// Sends the player's chosen cell.  The Responder validates it.
    pub fn propose(&mut self, position: Position) -> Step {
        if self.state != StreamInitiatorState::Composing {
            debug!(state = ?self.state, %position, "move proposed out of turn");
            return Step::Ignore;
        }
        self.state = StreamInitiatorState::AwaitingMoveReply { proposed: position };
        Step::Send(Symbol::Play(position))
    }

    /// The local player quits.
    pub fn quit(&mut self, session: &GameSession) -> Step {
        self.state = StreamInitiatorState::Done;
        Step::End {
            reply: Some(Symbol::Quit),
            end: session.quit_end(Side::Initiator),
        }
    }

    /// Handles one reply from the Responder.
    ///
    /// # Errors
    ///
    /// Returns [`GameError`] when a confirmed move does not fit the local
    /// board, meaning the two copies have diverged.
    pub fn on_symbol(
        &mut self,
        session: &mut GameSession,
        symbol: Symbol,
    ) -> Result<Step, GameError> {
        use StreamInitiatorState as S;

        if symbol == Symbol::Quit && self.state != S::Done {
            self.state = S::Done;
            return Ok(Step::End {
                reply: Some(Symbol::Quit),
                end: session.quit_end(Side::Responder),
            });
        }

        let step = match (self.state, symbol) {
            (S::AwaitingGreetingReply, Symbol::Wait) => {
                self.state = S::Composing;
                Step::Prompt
            }
            (S::AwaitingGreetingReply, Symbol::Play(opening)) => {
                session.apply(Side::Responder, opening)?;
                self.state = S::AwaitingStatus;
                Step::Send(Symbol::Query)
            }
            (S::AwaitingMoveReply { .. }, Symbol::Wait) => {
                self.state = S::Composing;
                Step::Prompt
            }
            (S::AwaitingMoveReply { proposed }, Symbol::Play(counter)) => {
                session.apply(Side::Initiator, proposed)?;
                session.apply(Side::Responder, counter)?;
                self.state = S::AwaitingStatus;
                Step::Send(Symbol::Query)
            }
            (S::AwaitingMoveReply { proposed }, Symbol::InitiatorWon | Symbol::Draw) => {
                session.apply(Side::Initiator, proposed)?;
                self.finish(symbol)
            }
            (S::AwaitingStatus, Symbol::ResponderWon | Symbol::Draw | Symbol::InitiatorWon) => {
                self.finish(symbol)
            }
            (S::AwaitingStatus, _) => {
                self.state = S::Composing;
                Step::Prompt
            }
            (state, symbol) => {
                debug!(?state, %symbol, "ignoring unexpected symbol");
                Step::Ignore
            }
        };
        Ok(step)
    }

    fn finish(&mut self, symbol: Symbol) -> Step {
        self.state = StreamInitiatorState::Done;
        match symbol.as_outcome() {
            Some(outcome) => Step::End {
                reply: Some(Symbol::Quit),
                end: GameEnd::Finished(outcome),
            },
            None => Step::Ignore,
        }
    }
}

// ── Responder ─────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StreamResponderState {
    Playing,
    Done,
}

/// Server side of the stream protocol.
#[derive(Debug, Clone)]
pub struct StreamResponder {
    state: StreamResponderState,
}

impl StreamResponder {
    /// Answers the greeting that created `session`: `W` when the Initiator
    /// moves first, otherwise the Responder's opening digit.
    ///
    /// # Errors
    ///
    /// Returns [`GameError::Selector`] if no cell can be picked.
    pub fn open(
        session: &mut GameSession,
        selector: &mut dyn MoveSelector,
    ) -> Result<(Self, Step), GameError> {
        let machine = Self {
            state: StreamResponderState::Playing,
        };
        let step = match session.first_mover() {
            FirstMover::Initiator => Step::Send(Symbol::Wait),
            FirstMover::Responder => Step::Send(Symbol::Play(play_random(session, selector)?)),
        };
        Ok((machine, step))
    }

    pub fn state(&self) -> StreamResponderState {
        self.state
    }

    /// The Responder closes the game on its own.
    pub fn quit(&mut self, session: &GameSession) -> Step {
        self.state = StreamResponderState::Done;
        Step::End {
            reply: Some(Symbol::Quit),
            end: session.quit_end(Side::Responder),
        }
    }

    /// Handles one request from the Initiator.  Every request except a
    /// quit yields exactly one reply.
    ///
    /// # Errors
    ///
    /// Returns [`GameError`] if the board cannot accept a move that was
    /// validated against it, or no free cell remains to counter with.
    pub fn on_symbol(
        &mut self,
        session: &mut GameSession,
        selector: &mut dyn MoveSelector,
        symbol: Symbol,
    ) -> Result<Step, GameError> {
        if self.state == StreamResponderState::Done {
            return Ok(Step::Ignore);
        }

        let step = match symbol {
            Symbol::Quit => {
                self.state = StreamResponderState::Done;
                Step::End {
                    reply: Some(Symbol::Quit),
                    end: session.quit_end(Side::Initiator),
                }
            }
            Symbol::Play(position) if session.is_legal(Side::Initiator, position) => {
                match session.apply(Side::Initiator, position)? {
                    Outcome::InProgress => {
                        Step::Send(Symbol::Play(play_random(session, selector)?))
                    }
                    outcome => Step::Send(Symbol::from_outcome(outcome)),
                }
            }
            Symbol::Play(position) => {
                debug!(%position, "rejecting illegal move");
                Step::Send(Symbol::Wait)
            }
            Symbol::Query => Step::Send(Symbol::from_outcome(session.outcome())),
            other => {
                debug!(symbol = %other, "unexpected request, asking for a move");
                Step::Send(Symbol::Wait)
            }
        };
        Ok(step)
    }
}

/// Picks and commits the Responder's move.
fn play_random(
    session: &mut GameSession,
    selector: &mut dyn MoveSelector,
) -> Result<Position, GameError> {
    let free = session.board().free_cells();
    let position = selector.pick(&free)?;
    session.apply(Side::Responder, position)?;
    Ok(position)
}
