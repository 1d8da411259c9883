//! Protocol module containing message types and the binary codec.

pub mod codec;
pub mod messages;
pub mod sequence;

pub use codec::{
    decode_header, decode_inbound, decode_outbound, encode_inbound, encode_outbound,
    encode_outbound_now, ProtocolError,
};
pub use messages::*;
pub use sequence::SequenceCounter;
