//! # textlink-core
//!
//! Shared wire-protocol library for textlink: message types, the binary
//! codec, and the sequence counter stamped into frame headers.
//!
//! textlink keeps a durable duplex channel open between an in-process
//! text-service client and an out-of-process host application. The client
//! forwards focus and edit events outward; the host sends edit commands
//! inward. This crate defines only the bytes on that channel – it has zero
//! dependencies on OS APIs, sockets, or async runtimes, and is shared by the
//! client, by host implementations, and by tests standing in for a host.
//!
//! The two message families are deliberately distinct Rust types
//! ([`OutboundMessage`] and [`InboundMessage`]): a client can neither decode
//! its own traffic as commands nor emit a host-only frame, and the codec
//! rejects frames whose type code belongs to the wrong direction.

pub mod protocol;

// Re-export the most-used types at the crate root so callers can write
// `textlink_core::OutboundMessage` instead of the full module path.
pub use protocol::codec::{
    decode_header, decode_inbound, decode_outbound, encode_inbound, encode_outbound,
    encode_outbound_now, ProtocolError,
};
pub use protocol::messages::{InboundMessage, OutboundMessage, ScreenRect};
pub use protocol::sequence::SequenceCounter;
