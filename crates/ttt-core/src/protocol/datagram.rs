//! Turn-taking over an unreliable datagram transport.
//!
//! Every move is confirmed by echo before either side commits it:
//!
//! ```text
//! Initiator                 Responder
//!   A  ───────────────────▶             pin peer, create session
//!      ◀─────────────────── A
//!   4  ───────────────────▶             validate, hold as pending
//!      ◀─────────────────── 4            (I if illegal)
//!   E  ───────────────────▶             commit 4, pick 0
//!      ◀─────────────────── 0
//!   0  ───────────────────▶             commit 0
//!      ◀─────────────────── E            (C / S / D when terminal)
//! ```
//!
//! The machines here only decide what to send next.  Loss, duplication and
//! stray senders are handled by [`crate::reliability::ReliableChannel`],
//! which repeats the pending symbol until a fresh reply arrives.  A symbol
//! that is legal in no current state is ignored.

use tracing::debug;

use crate::domain::board::{IllegalMove, Position, Side};
use crate::domain::move_selector::MoveSelector;
use crate::domain::session::{FirstMover, GameEnd, GameError, GameSession, Outcome};
use crate::protocol::messages::Symbol;
use crate::protocol::step::Step;

// ── Initiator ─────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DatagramInitiatorState {
    /// Waiting for the local player.
    Composing,
    /// Own digit sent; expecting its echo or `I`.
    AwaitingMoveAck { proposed: Position },
    /// `I` acknowledged; expecting `W`.
    AwaitingRetryPrompt,
    /// `E` sent; expecting the Responder's digit, `C` or `D`.
    AwaitingResponderMove,
    /// Responder's digit echoed; expecting `E`, `S` or `D`.
    AwaitingEndOfTurn { pending: Position },
    Done,
}

/// Client side of the datagram protocol, entered after the handshake.
#[derive(Debug, Clone)]
pub struct DatagramInitiator {
    state: DatagramInitiatorState,
}

impl DatagramInitiator {
    /// Enters the game after a confirmed handshake.  When the Responder moves
    /// first the Initiator yields the turn with `E`.
    pub fn open(first_mover: FirstMover) -> (Self, Step) {
        match first_mover {
            FirstMover::Initiator => (
                Self {
                    state: DatagramInitiatorState::Composing,
                },
                Step::Prompt,
            ),
            FirstMover::Responder => (
                Self {
                    state: DatagramInitiatorState::AwaitingResponderMove,
                },
                Step::Send(Symbol::EndTurn),
            ),
        }
    }

    pub fn state(&self) -> DatagramInitiatorState {
        self.state
    }

    /// Proposes the player's chosen cell.
    ///
    /// A cell already taken on the local board is refused here and never
    /// sent: it could repeat the Responder's last move byte-for-byte and be
    /// mistaken for a retransmitted echo.
    ///
    /// # Errors
    ///
    /// Returns [`GameError::Illegal`] when the cell is occupied locally.
    pub fn propose(&mut self, session: &GameSession, position: Position) -> Result<Step, GameError> {
        if self.state != DatagramInitiatorState::Composing {
            debug!(state = ?self.state, %position, "move proposed out of turn");
            return Ok(Step::Ignore);
        }
        if !session.board().is_free(position) {
            return Err(IllegalMove::Occupied {
                index: position.index(),
            }
            .into());
        }
        self.state = DatagramInitiatorState::AwaitingMoveAck { proposed: position };
        Ok(Step::Send(Symbol::Play(position)))
    }

    /// The local player quits.
    pub fn quit(&mut self, session: &GameSession) -> Step {
        self.state = DatagramInitiatorState::Done;
        Step::End {
            reply: Some(Symbol::Quit),
            end: session.quit_end(Side::Initiator),
        }
    }

    /// Handles one fresh symbol from the Responder.
    ///
    /// # Errors
    ///
    /// Returns [`GameError`] when a confirmed move does not fit the local
    /// board.
    pub fn on_symbol(
        &mut self,
        session: &mut GameSession,
        symbol: Symbol,
    ) -> Result<Step, GameError> {
        use DatagramInitiatorState as S;

        if symbol == Symbol::Quit && self.state != S::Done {
            self.state = S::Done;
            return Ok(Step::End {
                reply: Some(Symbol::Quit),
                end: session.quit_end(Side::Responder),
            });
        }

        let step = match (self.state, symbol) {
            (S::AwaitingMoveAck { proposed }, Symbol::Play(echo)) if echo == proposed => {
                session.apply(Side::Initiator, proposed)?;
                self.state = S::AwaitingResponderMove;
                Step::Send(Symbol::EndTurn)
            }
            (S::AwaitingMoveAck { proposed }, Symbol::Illegal) => {
                debug!(%proposed, "responder rejected move");
                self.state = S::AwaitingRetryPrompt;
                Step::Send(Symbol::Illegal)
            }
            (S::AwaitingRetryPrompt, Symbol::Wait) => {
                self.state = S::Composing;
                Step::Prompt
            }
            (S::AwaitingResponderMove, Symbol::Play(counter))
                if session.is_legal(Side::Responder, counter) =>
            {
                self.state = S::AwaitingEndOfTurn { pending: counter };
                Step::Send(Symbol::Play(counter))
            }
            (S::AwaitingResponderMove, Symbol::InitiatorWon | Symbol::Draw) => {
                self.finish(symbol)
            }
            (S::AwaitingEndOfTurn { pending }, Symbol::EndTurn) => {
                session.apply(Side::Responder, pending)?;
                self.state = S::Composing;
                Step::Prompt
            }
            (S::AwaitingEndOfTurn { pending }, Symbol::ResponderWon | Symbol::Draw) => {
                session.apply(Side::Responder, pending)?;
                self.finish(symbol)
            }
            (state, symbol) => {
                debug!(?state, %symbol, "ignoring unexpected symbol");
                Step::Ignore
            }
        };
        Ok(step)
    }

    /// Echoes the terminal symbol back as confirmation.
    fn finish(&mut self, symbol: Symbol) -> Step {
        match symbol.as_outcome() {
            Some(outcome) => {
                self.state = DatagramInitiatorState::Done;
                Step::End {
                    reply: Some(symbol),
                    end: GameEnd::Finished(outcome),
                }
            }
            None => Step::Ignore,
        }
    }
}

// ── Responder ─────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DatagramResponderState {
    /// Expecting the Initiator's digit.
    AwaitingProposal,
    /// `I` sent; expecting its echo.
    AwaitingRejectAck,
    /// Initiator's digit echoed; expecting `E`.
    AwaitingEndOfTurn { pending: Position },
    /// Responder moves first; expecting the Initiator's opening `E`.
    AwaitingOpening,
    /// Own digit sent; expecting its echo.
    AwaitingMoveEcho { proposed: Position },
    /// Terminal outcome sent; expecting its echo.
    Finishing { outcome: Outcome },
    Done,
}

/// Server side of the datagram protocol, entered after the handshake.
#[derive(Debug, Clone)]
pub struct DatagramResponder {
    state: DatagramResponderState,
}

impl DatagramResponder {
    /// Enters the game after the greeting was echoed.
    pub fn open(first_mover: FirstMover) -> Self {
        let state = match first_mover {
            FirstMover::Initiator => DatagramResponderState::AwaitingProposal,
            FirstMover::Responder => DatagramResponderState::AwaitingOpening,
        };
        Self { state }
    }

    pub fn state(&self) -> DatagramResponderState {
        self.state
    }

    /// The Responder closes the game on its own.
    pub fn quit(&mut self, session: &GameSession) -> Step {
        self.state = DatagramResponderState::Done;
        Step::End {
            reply: Some(Symbol::Quit),
            end: session.quit_end(Side::Responder),
        }
    }

    /// Handles one fresh symbol from the pinned Initiator.
    ///
    /// # Errors
    ///
    /// Returns [`GameError`] if a validated move cannot be committed or no
    /// free cell remains to play.
    pub fn on_symbol(
        &mut self,
        session: &mut GameSession,
        selector: &mut dyn MoveSelector,
        symbol: Symbol,
    ) -> Result<Step, GameError> {
        use DatagramResponderState as S;

        if symbol == Symbol::Quit && self.state != S::Done {
            self.state = S::Done;
            return Ok(Step::End {
                reply: Some(Symbol::Quit),
                end: session.quit_end(Side::Initiator),
            });
        }

        let step = match (self.state, symbol) {
            (S::AwaitingProposal, Symbol::Play(position)) => {
                if session.is_legal(Side::Initiator, position) {
                    self.state = S::AwaitingEndOfTurn { pending: position };
                    Step::Send(Symbol::Play(position))
                } else {
                    debug!(%position, "rejecting illegal move");
                    self.state = S::AwaitingRejectAck;
                    Step::Send(Symbol::Illegal)
                }
            }
            (S::AwaitingRejectAck, Symbol::Illegal) => {
                self.state = S::AwaitingProposal;
                Step::Send(Symbol::Wait)
            }
            (S::AwaitingEndOfTurn { pending }, Symbol::EndTurn) => {
                match session.apply(Side::Initiator, pending)? {
                    Outcome::InProgress => self.counter(session, selector)?,
                    outcome => self.report(outcome),
                }
            }
            (S::AwaitingOpening, Symbol::EndTurn) => self.counter(session, selector)?,
            (S::AwaitingMoveEcho { proposed }, Symbol::Play(echo)) if echo == proposed => {
                match session.apply(Side::Responder, proposed)? {
                    Outcome::InProgress => {
                        self.state = S::AwaitingProposal;
                        Step::Send(Symbol::EndTurn)
                    }
                    outcome => self.report(outcome),
                }
            }
            (S::Finishing { outcome }, echo) if echo == Symbol::from_outcome(outcome) => {
                self.state = S::Done;
                Step::End {
                    reply: Some(Symbol::Quit),
                    end: GameEnd::Finished(outcome),
                }
            }
            (state, symbol) => {
                debug!(?state, %symbol, "ignoring unexpected symbol");
                Step::Ignore
            }
        };
        Ok(step)
    }

    /// Proposes a random free cell; it is committed once echoed.
    fn counter(
        &mut self,
        session: &GameSession,
        selector: &mut dyn MoveSelector,
    ) -> Result<Step, GameError> {
        let free = session.board().free_cells();
        let proposed = selector.pick(&free)?;
        self.state = DatagramResponderState::AwaitingMoveEcho { proposed };
        Ok(Step::Send(Symbol::Play(proposed)))
    }

    fn report(&mut self, outcome: Outcome) -> Step {
        self.state = DatagramResponderState::Finishing { outcome };
        Step::Send(Symbol::from_outcome(outcome))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::move_selector::{MockMoveSelector, ScriptedSelector};

    fn pos(i: usize) -> Position {
        Position::new(i).expect("valid position")
    }

    // ── Responder ─────────────────────────────────────────────────────────────

    #[test]
    fn test_responder_echoes_legal_proposal_without_committing() {
        // Arrange
        let mut session = GameSession::new(FirstMover::Initiator);
        let mut selector = ScriptedSelector::default();
        let mut responder = DatagramResponder::open(FirstMover::Initiator);

        // Act
        let step = responder
            .on_symbol(&mut session, &mut selector, Symbol::Play(pos(4)))
            .expect("step");

        // Assert
        assert_eq!(step, Step::Send(Symbol::Play(pos(4))));
        assert_eq!(session.board().filled(), 0);
        assert_eq!(
            responder.state(),
            DatagramResponderState::AwaitingEndOfTurn { pending: pos(4) }
        );
    }

    #[test]
    fn test_responder_commits_on_end_of_turn_and_proposes_counter() {
        // Arrange
        let mut session = GameSession::new(FirstMover::Initiator);
        let mut selector = MockMoveSelector::new();
        selector.expect_pick().times(1).returning(|free| {
            assert_eq!(free.len(), 8);
            Ok(free[0])
        });
        let mut responder = DatagramResponder::open(FirstMover::Initiator);
        responder
            .on_symbol(&mut session, &mut selector, Symbol::Play(pos(4)))
            .expect("step");

        // Act
        let step = responder
            .on_symbol(&mut session, &mut selector, Symbol::EndTurn)
            .expect("step");

        // Assert
        assert_eq!(step, Step::Send(Symbol::Play(pos(0))));
        assert_eq!(session.board().cell(4), Some(Side::Initiator));
        assert_eq!(session.board().cell(0), None);
    }

    #[test]
    fn test_responder_commits_own_move_on_echo_then_rejects_same_cell() {
        // Arrange: responder opens on 4 and the initiator confirms it
        let mut session = GameSession::new(FirstMover::Responder);
        let mut selector = ScriptedSelector::new([4]);
        let mut responder = DatagramResponder::open(FirstMover::Responder);
        responder
            .on_symbol(&mut session, &mut selector, Symbol::EndTurn)
            .expect("step");
        let end_of_turn = responder
            .on_symbol(&mut session, &mut selector, Symbol::Play(pos(4)))
            .expect("step");
        let before = session.board().clone();

        // Act
        let reject = responder
            .on_symbol(&mut session, &mut selector, Symbol::Play(pos(4)))
            .expect("step");

        // Assert
        assert_eq!(end_of_turn, Step::Send(Symbol::EndTurn));
        assert_eq!(before.cell(4), Some(Side::Responder));
        assert_eq!(reject, Step::Send(Symbol::Illegal));
        assert_eq!(session.board(), &before);
    }

    #[test]
    fn test_responder_illegal_path_sends_i_then_w() {
        // Arrange: initiator-first game where cell 0 is already taken
        let mut session = GameSession::new(FirstMover::Initiator);
        session.apply(Side::Initiator, pos(8)).expect("apply");
        session.apply(Side::Responder, pos(0)).expect("apply");
        let mut selector = ScriptedSelector::default();
        let mut responder = DatagramResponder::open(FirstMover::Initiator);

        // Act
        let reject = responder
            .on_symbol(&mut session, &mut selector, Symbol::Play(pos(0)))
            .expect("step");
        let wait = responder
            .on_symbol(&mut session, &mut selector, Symbol::Illegal)
            .expect("step");

        // Assert
        assert_eq!(reject, Step::Send(Symbol::Illegal));
        assert_eq!(wait, Step::Send(Symbol::Wait));
        assert_eq!(responder.state(), DatagramResponderState::AwaitingProposal);
        assert_eq!(session.board().filled(), 2);
    }

    #[test]
    fn test_responder_ignores_symbols_outside_current_state() {
        let mut session = GameSession::new(FirstMover::Initiator);
        let mut selector = ScriptedSelector::default();
        let mut responder = DatagramResponder::open(FirstMover::Initiator);

        for symbol in [Symbol::EndTurn, Symbol::Wait, Symbol::Query, Symbol::Draw] {
            let step = responder
                .on_symbol(&mut session, &mut selector, symbol)
                .expect("step");
            assert_eq!(step, Step::Ignore, "{symbol}");
        }
        assert_eq!(responder.state(), DatagramResponderState::AwaitingProposal);
    }

    #[test]
    fn test_responder_finishing_sends_quit_after_outcome_echo() {
        // Arrange: initiator about to complete the top row
        let mut session = GameSession::new(FirstMover::Initiator);
        for (side, cell) in [
            (Side::Initiator, 0),
            (Side::Responder, 3),
            (Side::Initiator, 1),
            (Side::Responder, 4),
        ] {
            session.apply(side, pos(cell)).expect("apply");
        }
        let mut selector = ScriptedSelector::default();
        let mut responder = DatagramResponder::open(FirstMover::Initiator);
        responder
            .on_symbol(&mut session, &mut selector, Symbol::Play(pos(2)))
            .expect("step");

        // Act
        let report = responder
            .on_symbol(&mut session, &mut selector, Symbol::EndTurn)
            .expect("step");
        let close = responder
            .on_symbol(&mut session, &mut selector, Symbol::InitiatorWon)
            .expect("step");

        // Assert
        assert_eq!(report, Step::Send(Symbol::InitiatorWon));
        assert_eq!(
            close,
            Step::End {
                reply: Some(Symbol::Quit),
                end: GameEnd::Finished(Outcome::InitiatorWins)
            }
        );
    }

    #[test]
    fn test_responder_echoes_quit_mid_game() {
        let mut session = GameSession::new(FirstMover::Initiator);
        let mut selector = ScriptedSelector::default();
        let mut responder = DatagramResponder::open(FirstMover::Initiator);

        let step = responder
            .on_symbol(&mut session, &mut selector, Symbol::Quit)
            .expect("step");

        assert_eq!(
            step,
            Step::End {
                reply: Some(Symbol::Quit),
                end: GameEnd::Quit { by: Side::Initiator }
            }
        );
    }

    // ── Initiator ─────────────────────────────────────────────────────────────

    #[test]
    fn test_initiator_yields_first_turn_with_end_of_turn() {
        let (initiator, step) = DatagramInitiator::open(FirstMover::Responder);
        assert_eq!(step, Step::Send(Symbol::EndTurn));
        assert_eq!(
            initiator.state(),
            DatagramInitiatorState::AwaitingResponderMove
        );
    }

    #[test]
    fn test_initiator_commits_own_move_only_after_echo() {
        // Arrange
        let mut session = GameSession::new(FirstMover::Initiator);
        let (mut initiator, _) = DatagramInitiator::open(FirstMover::Initiator);
        initiator.propose(&session, pos(4)).expect("propose");
        assert_eq!(session.board().filled(), 0);

        // Act
        let step = initiator
            .on_symbol(&mut session, Symbol::Play(pos(4)))
            .expect("step");

        // Assert
        assert_eq!(step, Step::Send(Symbol::EndTurn));
        assert_eq!(session.board().cell(4), Some(Side::Initiator));
    }

    #[test]
    fn test_initiator_refuses_locally_occupied_cell() {
        let mut session = GameSession::new(FirstMover::Responder);
        session.apply(Side::Responder, pos(4)).expect("apply");
        let (mut initiator, _) = DatagramInitiator::open(FirstMover::Initiator);

        let result = initiator.propose(&session, pos(4));

        assert_eq!(
            result,
            Err(GameError::Illegal(IllegalMove::Occupied { index: 4 }))
        );
        assert_eq!(initiator.state(), DatagramInitiatorState::Composing);
    }

    #[test]
    fn test_initiator_acknowledges_rejection_and_reprompts_on_wait() {
        let mut session = GameSession::new(FirstMover::Initiator);
        let (mut initiator, _) = DatagramInitiator::open(FirstMover::Initiator);
        initiator.propose(&session, pos(4)).expect("propose");

        let ack = initiator.on_symbol(&mut session, Symbol::Illegal).expect("step");
        let prompt = initiator.on_symbol(&mut session, Symbol::Wait).expect("step");

        assert_eq!(ack, Step::Send(Symbol::Illegal));
        assert_eq!(prompt, Step::Prompt);
        assert_eq!(session.board().filled(), 0);
    }

    #[test]
    fn test_initiator_echoes_responder_move_and_commits_on_end_of_turn() {
        // Arrange
        let mut session = GameSession::new(FirstMover::Responder);
        let (mut initiator, _) = DatagramInitiator::open(FirstMover::Responder);

        // Act
        let echo = initiator
            .on_symbol(&mut session, Symbol::Play(pos(6)))
            .expect("step");
        let filled_before_end = session.board().filled();
        let prompt = initiator
            .on_symbol(&mut session, Symbol::EndTurn)
            .expect("step");

        // Assert
        assert_eq!(echo, Step::Send(Symbol::Play(pos(6))));
        assert_eq!(filled_before_end, 0);
        assert_eq!(prompt, Step::Prompt);
        assert_eq!(session.board().cell(6), Some(Side::Responder));
    }

    #[test]
    fn test_initiator_echoes_terminal_outcome() {
        // Arrange: responder about to complete the left column
        let mut session = GameSession::new(FirstMover::Responder);
        for (side, cell) in [
            (Side::Responder, 0),
            (Side::Initiator, 1),
            (Side::Responder, 3),
            (Side::Initiator, 2),
        ] {
            session.apply(side, pos(cell)).expect("apply");
        }
        let (mut initiator, _) = DatagramInitiator::open(FirstMover::Responder);
        initiator
            .on_symbol(&mut session, Symbol::Play(pos(6)))
            .expect("step");

        // Act
        let step = initiator
            .on_symbol(&mut session, Symbol::ResponderWon)
            .expect("step");

        // Assert
        assert_eq!(
            step,
            Step::End {
                reply: Some(Symbol::ResponderWon),
                end: GameEnd::Finished(Outcome::ResponderWins)
            }
        );
        assert_eq!(session.outcome(), Outcome::ResponderWins);
    }

    #[test]
    fn test_initiator_ignores_echo_of_a_different_cell() {
        let mut session = GameSession::new(FirstMover::Initiator);
        let (mut initiator, _) = DatagramInitiator::open(FirstMover::Initiator);
        initiator.propose(&session, pos(4)).expect("propose");

        let step = initiator
            .on_symbol(&mut session, Symbol::Play(pos(5)))
            .expect("step");

        assert_eq!(step, Step::Ignore);
        assert_eq!(
            initiator.state(),
            DatagramInitiatorState::AwaitingMoveAck { proposed: pos(4) }
        );
    }
}
