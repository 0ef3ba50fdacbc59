//! Payload codec: one symbol per byte, one byte per payload.
//!
//! On the datagram transport a payload is a whole datagram; on the stream
//! transport it is a single byte read.

use thiserror::Error;

use crate::protocol::messages::Symbol;

/// Errors that can occur while decoding a payload.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ProtocolError {
    #[error("empty payload")]
    Empty,

    #[error("payload of {0} bytes; every message is exactly one byte")]
    Oversized(usize),

    #[error("unknown symbol byte: 0x{0:02X}")]
    UnknownSymbol(u8),
}

/// Encodes a symbol into its one-byte payload.
pub fn encode_symbol(symbol: Symbol) -> [u8; 1] {
    [symbol.to_byte()]
}

/// Decodes a single byte.
///
/// # Errors
///
/// Returns [`ProtocolError::UnknownSymbol`] for bytes outside the alphabet.
pub fn decode_byte(byte: u8) -> Result<Symbol, ProtocolError> {
    Symbol::try_from(byte).map_err(|_| ProtocolError::UnknownSymbol(byte))
}

/// Decodes a complete payload, which must hold exactly one known byte.
///
/// # Errors
///
/// Returns [`ProtocolError::Empty`], [`ProtocolError::Oversized`] or
/// [`ProtocolError::UnknownSymbol`].
pub fn decode_symbol(payload: &[u8]) -> Result<Symbol, ProtocolError> {
    match payload {
        [] => Err(ProtocolError::Empty),
        [byte] => decode_byte(*byte),
        _ => Err(ProtocolError::Oversized(payload.len())),
    }
}
