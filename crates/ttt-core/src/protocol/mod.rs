//! Protocol module: the message alphabet, its codec, and the per-transport
//! state machines.

pub mod codec;
pub mod datagram;
pub mod exchange;
pub mod messages;
pub mod step;
pub mod stream;

pub use codec::{decode_byte, decode_symbol, encode_symbol, ProtocolError};
pub use datagram::{
    DatagramInitiator, DatagramInitiatorState, DatagramResponder, DatagramResponderState,
};
pub use exchange::{Delivery, Exchange};
pub use messages::{Symbol, DEFAULT_PORT};
pub use step::Step;
pub use stream::{StreamInitiator, StreamInitiatorState, StreamResponder, StreamResponderState};
