//! The single-byte message alphabet shared by both transports.

use std::fmt;

use crate::domain::board::Position;
use crate::domain::session::{FirstMover, Outcome};

/// Default port for both the stream and the datagram variant.
pub const DEFAULT_PORT: u16 = 13037;

/// One wire message.  Every symbol encodes to exactly one ASCII byte.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Symbol {
    /// `A`: start, Initiator moves first (also the handshake echo).
    StartInitiatorFirst,
    /// `B`: start, Responder moves first (also the handshake echo).
    StartResponderFirst,
    /// `0`–`8`: play or echo-confirm a cell.
    Play(Position),
    /// `?`: ask for the current outcome (stream only).
    Query,
    /// `Q`: quit, close, or quit echo.
    Quit,
    /// `W`: waiting for a (new) move.
    Wait,
    /// `C`: the Initiator has won.
    InitiatorWon,
    /// `S`: the Responder has won.
    ResponderWon,
    /// `D`: draw.
    Draw,
    /// `P`: the game is still in progress (stream reply to `?`).
    InProgress,
    /// `I`: the proposed move is illegal, or acknowledgement thereof.
    Illegal,
    /// `E`: my turn has ended.
    EndTurn,
}

impl Symbol {
    /// The ASCII byte carried on the wire.
    pub fn to_byte(self) -> u8 {
        match self {
            Symbol::StartInitiatorFirst => b'A',
            Symbol::StartResponderFirst => b'B',
            Symbol::Play(p) => b'0' + p.index() as u8,
            Symbol::Query => b'?',
            Symbol::Quit => b'Q',
            Symbol::Wait => b'W',
            Symbol::InitiatorWon => b'C',
            Symbol::ResponderWon => b'S',
            Symbol::Draw => b'D',
            Symbol::InProgress => b'P',
            Symbol::Illegal => b'I',
            Symbol::EndTurn => b'E',
        }
    }

    /// Greeting for the chosen first mover.
    pub fn greeting(first_mover: FirstMover) -> Symbol {
        match first_mover {
            FirstMover::Initiator => Symbol::StartInitiatorFirst,
            FirstMover::Responder => Symbol::StartResponderFirst,
        }
    }

    /// Inverse of [`Symbol::greeting`].
    pub fn as_greeting(self) -> Option<FirstMover> {
        match self {
            Symbol::StartInitiatorFirst => Some(FirstMover::Initiator),
            Symbol::StartResponderFirst => Some(FirstMover::Responder),
            _ => None,
        }
    }

    /// Status symbol reporting `outcome`.
    pub fn from_outcome(outcome: Outcome) -> Symbol {
        match outcome {
            Outcome::InProgress => Symbol::InProgress,
            Outcome::InitiatorWins => Symbol::InitiatorWon,
            Outcome::ResponderWins => Symbol::ResponderWon,
            Outcome::Draw => Symbol::Draw,
        }
    }

    /// Terminal outcome announced by this symbol, if any.
    pub fn as_outcome(self) -> Option<Outcome> {
        match self {
            Symbol::InitiatorWon => Some(Outcome::InitiatorWins),
            Symbol::ResponderWon => Some(Outcome::ResponderWins),
            Symbol::Draw => Some(Outcome::Draw),
            _ => None,
        }
    }
}

impl TryFrom<u8> for Symbol {
    type Error = ();

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            b'A' => Ok(Symbol::StartInitiatorFirst),
            b'B' => Ok(Symbol::StartResponderFirst),
            b'0'..=b'8' => Position::new((value - b'0') as usize)
                .map(Symbol::Play)
                .ok_or(()),
            b'?' => Ok(Symbol::Query),
            b'Q' => Ok(Symbol::Quit),
            b'W' => Ok(Symbol::Wait),
            b'C' => Ok(Symbol::InitiatorWon),
            b'S' => Ok(Symbol::ResponderWon),
            b'D' => Ok(Symbol::Draw),
            b'P' => Ok(Symbol::InProgress),
            b'I' => Ok(Symbol::Illegal),
            b'E' => Ok(Symbol::EndTurn),
            _ => Err(()),
        }
    }
}

impl fmt::Display for Symbol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_byte() as char)
    }
}
