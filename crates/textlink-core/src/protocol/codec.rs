//! Binary codec for encoding and decoding textlink protocol messages.
//!
//! Wire format:
//! ```text
//! [version:1][msg_type:1][reserved:2][payload_len:4][seq:8][timestamp_us:8][payload:N]
//! ```
//! Total header size: 24 bytes. All multi-byte integers are big-endian.
//!
//! The `payload_len` field doubles as the framing layer: a reader pulls
//! [`HEADER_SIZE`](crate::protocol::messages::HEADER_SIZE) bytes, decodes the
//! header with [`decode_header`], then pulls `payload_len` more bytes to
//! complete the frame. This preserves message boundaries over a byte stream.

use std::time::{SystemTime, UNIX_EPOCH};

use crate::protocol::messages::{
    EndEditMessage, FocusChangedMessage, FocusTextReplyMessage, GetFocusTextMessage,
    InboundMessage, InitializedMessage, MessageHeader, MessageType, OutboundMessage, ScreenRect,
    SetFocusTextMessage, HEADER_SIZE, PROTOCOL_VERSION,
};
use thiserror::Error;

/// Errors that can occur during message encoding or decoding.
#[derive(Debug, Error, PartialEq)]
pub enum ProtocolError {
    /// The byte slice is shorter than the minimum required length.
    #[error("insufficient data: need at least {needed} bytes, got {available}")]
    InsufficientData { needed: usize, available: usize },

    /// The message type byte in the header is not a recognized value.
    #[error("unknown message type: 0x{0:02X}")]
    UnknownMessageType(u8),

    /// The protocol version in the header is not supported.
    #[error("unsupported protocol version: {0}")]
    UnsupportedVersion(u8),

    /// The message type belongs to the other direction family.
    #[error("message type {0:?} does not belong to the expected direction")]
    WrongDirection(MessageType),

    /// The payload could not be parsed (field value out of range, UTF-8 error, etc.).
    #[error("malformed payload: {0}")]
    MalformedPayload(String),

    /// The encoded payload length field does not match the actual data available.
    #[error("payload length mismatch: header says {declared}, available is {available}")]
    PayloadLengthMismatch { declared: usize, available: usize },
}

// ── Public API ────────────────────────────────────────────────────────────────

/// Encodes an [`OutboundMessage`] into a byte vector including the 24-byte
/// header.
///
/// The sequence number is **not** set by this function – pass a
/// pre-incremented value from a [`crate::protocol::SequenceCounter`].
///
/// # Errors
///
/// Returns [`ProtocolError`] if serialization fails.
///
/// # Examples
///
/// ```rust
/// use textlink_core::protocol::{encode_outbound, decode_outbound};
/// use textlink_core::protocol::messages::{EndEditMessage, OutboundMessage};
///
/// let msg = OutboundMessage::EndEdit(EndEditMessage { context_id: 42 });
/// let bytes = encode_outbound(&msg, 0, 0).unwrap();
/// let (decoded, consumed) = decode_outbound(&bytes).unwrap();
/// assert_eq!(decoded, msg);
/// assert_eq!(consumed, bytes.len());
/// ```
pub fn encode_outbound(
    msg: &OutboundMessage,
    sequence_number: u64,
    timestamp_us: u64,
) -> Result<Vec<u8>, ProtocolError> {
    let payload = encode_outbound_payload(msg);
    Ok(frame(msg.message_type(), payload, sequence_number, timestamp_us))
}

/// Encodes an [`OutboundMessage`] using the current system time as the timestamp.
///
/// # Errors
///
/// Returns [`ProtocolError`] if serialization fails.
pub fn encode_outbound_now(
    msg: &OutboundMessage,
    sequence_number: u64,
) -> Result<Vec<u8>, ProtocolError> {
    encode_outbound(msg, sequence_number, now_us())
}

/// Encodes an [`InboundMessage`] into a byte vector including the 24-byte
/// header. Used by the host side (and by tests standing in for the host).
///
/// # Errors
///
/// Returns [`ProtocolError`] if serialization fails.
pub fn encode_inbound(
    msg: &InboundMessage,
    sequence_number: u64,
    timestamp_us: u64,
) -> Result<Vec<u8>, ProtocolError> {
    let payload = encode_inbound_payload(msg);
    Ok(frame(msg.message_type(), payload, sequence_number, timestamp_us))
}

/// Decodes one [`OutboundMessage`] from the beginning of `bytes`.
///
/// Returns the decoded message and the total number of bytes consumed
/// (header + payload), so the caller can advance their read cursor.
///
/// # Errors
///
/// Returns [`ProtocolError::WrongDirection`] if the frame carries an inbound
/// message type, or another [`ProtocolError`] if the bytes are malformed.
pub fn decode_outbound(bytes: &[u8]) -> Result<(OutboundMessage, usize), ProtocolError> {
    let (header, payload) = split_frame(bytes)?;
    if !header.message_type.is_outbound() {
        return Err(ProtocolError::WrongDirection(header.message_type));
    }
    let msg = decode_outbound_payload(header.message_type, payload)?;
    Ok((msg, HEADER_SIZE + payload.len()))
}

/// Decodes one [`InboundMessage`] from the beginning of `bytes`.
///
/// # Errors
///
/// Returns [`ProtocolError::WrongDirection`] if the frame carries an outbound
/// message type, or another [`ProtocolError`] if the bytes are malformed.
pub fn decode_inbound(bytes: &[u8]) -> Result<(InboundMessage, usize), ProtocolError> {
    let (header, payload) = split_frame(bytes)?;
    if !header.message_type.is_inbound() {
        return Err(ProtocolError::WrongDirection(header.message_type));
    }
    let msg = decode_inbound_payload(header.message_type, payload)?;
    Ok((msg, HEADER_SIZE + payload.len()))
}

/// Decodes just the 24-byte header, without touching the payload.
///
/// This is what a stream reader uses to learn how many payload bytes follow.
///
/// # Errors
///
/// Returns [`ProtocolError`] if fewer than [`HEADER_SIZE`] bytes are supplied
/// or the version/type bytes are invalid.
pub fn decode_header(bytes: &[u8]) -> Result<MessageHeader, ProtocolError> {
    if bytes.len() < HEADER_SIZE {
        return Err(ProtocolError::InsufficientData {
            needed: HEADER_SIZE,
            available: bytes.len(),
        });
    }

    let version = bytes[0];
    if version != PROTOCOL_VERSION {
        return Err(ProtocolError::UnsupportedVersion(version));
    }

    let msg_type_byte = bytes[1];
    let message_type = MessageType::try_from(msg_type_byte)
        .map_err(|_| ProtocolError::UnknownMessageType(msg_type_byte))?;

    // bytes[2..4] are reserved – ignored on decode

    let payload_length = u32::from_be_bytes([bytes[4], bytes[5], bytes[6], bytes[7]]);
    let sequence_number = read_u64(bytes, 8)?;
    let timestamp_us = read_u64(bytes, 16)?;

    Ok(MessageHeader {
        version,
        message_type,
        payload_length,
        sequence_number,
        timestamp_us,
    })
}

// ── Framing helpers ───────────────────────────────────────────────────────────

fn frame(msg_type: MessageType, payload: Vec<u8>, sequence_number: u64, timestamp_us: u64) -> Vec<u8> {
    let payload_len = payload.len() as u32;

    let mut buf = Vec::with_capacity(HEADER_SIZE + payload.len());

    // Header: version (1) + msg_type (1) + reserved (2) + payload_len (4) +
    //         seq (8) + timestamp_us (8) = 24 bytes
    buf.push(PROTOCOL_VERSION);
    buf.push(msg_type as u8);
    buf.push(0x00); // reserved
    buf.push(0x00); // reserved
    buf.extend_from_slice(&payload_len.to_be_bytes());
    buf.extend_from_slice(&sequence_number.to_be_bytes());
    buf.extend_from_slice(&timestamp_us.to_be_bytes());

    buf.extend_from_slice(&payload);
    buf
}

fn split_frame(bytes: &[u8]) -> Result<(MessageHeader, &[u8]), ProtocolError> {
    let header = decode_header(bytes)?;
    let payload_len = header.payload_length as usize;

    if bytes.len() < HEADER_SIZE + payload_len {
        return Err(ProtocolError::PayloadLengthMismatch {
            declared: payload_len,
            available: bytes.len() - HEADER_SIZE,
        });
    }

    Ok((header, &bytes[HEADER_SIZE..HEADER_SIZE + payload_len]))
}

fn now_us() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_micros() as u64
}

// ── Payload encoding ──────────────────────────────────────────────────────────

fn encode_outbound_payload(msg: &OutboundMessage) -> Vec<u8> {
    let mut buf = Vec::new();
    match msg {
        OutboundMessage::Initialized(m) => encode_initialized(&mut buf, m),
        OutboundMessage::FocusChanged(m) => encode_focus_changed(&mut buf, m),
        OutboundMessage::EndEdit(m) => encode_end_edit(&mut buf, m),
        OutboundMessage::FocusTextReply(m) => encode_focus_text_reply(&mut buf, m),
    }
    buf
}

fn encode_inbound_payload(msg: &InboundMessage) -> Vec<u8> {
    let mut buf = Vec::new();
    match msg {
        InboundMessage::GetFocusText(m) => buf.push(if m.selection_only { 0x01 } else { 0x00 }),
        InboundMessage::SetFocusText(m) => encode_set_focus_text(&mut buf, m),
    }
    buf
}

// ── Payload decoding ──────────────────────────────────────────────────────────

fn decode_outbound_payload(
    msg_type: MessageType,
    payload: &[u8],
) -> Result<OutboundMessage, ProtocolError> {
    match msg_type {
        MessageType::Initialized => decode_initialized(payload).map(OutboundMessage::Initialized),
        MessageType::FocusChanged => {
            decode_focus_changed(payload).map(OutboundMessage::FocusChanged)
        }
        MessageType::EndEdit => decode_end_edit(payload).map(OutboundMessage::EndEdit),
        MessageType::FocusTextReply => {
            decode_focus_text_reply(payload).map(OutboundMessage::FocusTextReply)
        }
        // split_frame has already checked the direction
        other => Err(ProtocolError::WrongDirection(other)),
    }
}

fn decode_inbound_payload(
    msg_type: MessageType,
    payload: &[u8],
) -> Result<InboundMessage, ProtocolError> {
    match msg_type {
        MessageType::GetFocusText => {
            require_len(payload, 1, "GetFocusText")?;
            Ok(InboundMessage::GetFocusText(GetFocusTextMessage {
                selection_only: payload[0] != 0,
            }))
        }
        MessageType::SetFocusText => {
            decode_set_focus_text(payload).map(InboundMessage::SetFocusText)
        }
        other => Err(ProtocolError::WrongDirection(other)),
    }
}

// ── Per-message encode helpers ────────────────────────────────────────────────

fn encode_initialized(buf: &mut Vec<u8>, m: &InitializedMessage) {
    buf.extend_from_slice(&m.pid.to_be_bytes());
}

fn encode_focus_changed(buf: &mut Vec<u8>, m: &FocusChangedMessage) {
    buf.extend_from_slice(&m.context_id.to_be_bytes());
    buf.extend_from_slice(&m.window_handle.to_be_bytes());
    buf.extend_from_slice(&m.prev_context_id.to_be_bytes());
    buf.extend_from_slice(&m.prev_window_handle.to_be_bytes());
    encode_screen_rect(buf, &m.screen_rect);
}

fn encode_screen_rect(buf: &mut Vec<u8>, r: &ScreenRect) {
    buf.extend_from_slice(&r.left.to_be_bytes());
    buf.extend_from_slice(&r.top.to_be_bytes());
    buf.extend_from_slice(&r.right.to_be_bytes());
    buf.extend_from_slice(&r.bottom.to_be_bytes());
}

fn encode_end_edit(buf: &mut Vec<u8>, m: &EndEditMessage) {
    buf.extend_from_slice(&m.context_id.to_be_bytes());
}

fn encode_focus_text_reply(buf: &mut Vec<u8>, m: &FocusTextReplyMessage) {
    write_length_prefixed_string(buf, &m.text);
}

fn encode_set_focus_text(buf: &mut Vec<u8>, m: &SetFocusTextMessage) {
    write_length_prefixed_string(buf, &m.text);
    buf.push(if m.append { 0x01 } else { 0x00 });
}

// ── Per-message decode helpers ────────────────────────────────────────────────

fn decode_initialized(p: &[u8]) -> Result<InitializedMessage, ProtocolError> {
    require_len(p, 4, "Initialized")?;
    let pid = u32::from_be_bytes([p[0], p[1], p[2], p[3]]);
    Ok(InitializedMessage { pid })
}

fn decode_focus_changed(p: &[u8]) -> Result<FocusChangedMessage, ProtocolError> {
    // 4 × u64 handles + 4 × i32 rect bounds = 48
    require_len(p, 48, "FocusChanged")?;
    let context_id = read_u64(p, 0)?;
    let window_handle = read_u64(p, 8)?;
    let prev_context_id = read_u64(p, 16)?;
    let prev_window_handle = read_u64(p, 24)?;
    let screen_rect = decode_screen_rect(p, 32)?;
    Ok(FocusChangedMessage {
        context_id,
        window_handle,
        prev_context_id,
        prev_window_handle,
        screen_rect,
    })
}

fn decode_screen_rect(p: &[u8], off: usize) -> Result<ScreenRect, ProtocolError> {
    require_len(p, off + 16, "ScreenRect")?;
    let left = i32::from_be_bytes([p[off], p[off + 1], p[off + 2], p[off + 3]]);
    let top = i32::from_be_bytes([p[off + 4], p[off + 5], p[off + 6], p[off + 7]]);
    let right = i32::from_be_bytes([p[off + 8], p[off + 9], p[off + 10], p[off + 11]]);
    let bottom = i32::from_be_bytes([p[off + 12], p[off + 13], p[off + 14], p[off + 15]]);
    Ok(ScreenRect {
        left,
        top,
        right,
        bottom,
    })
}

fn decode_end_edit(p: &[u8]) -> Result<EndEditMessage, ProtocolError> {
    require_len(p, 8, "EndEdit")?;
    let context_id = read_u64(p, 0)?;
    Ok(EndEditMessage { context_id })
}

fn decode_focus_text_reply(p: &[u8]) -> Result<FocusTextReplyMessage, ProtocolError> {
    let (text, _) = read_length_prefixed_string(p, 0)?;
    Ok(FocusTextReplyMessage { text })
}

fn decode_set_focus_text(p: &[u8]) -> Result<SetFocusTextMessage, ProtocolError> {
    let (text, text_end) = read_length_prefixed_string(p, 0)?;
    require_len(p, text_end + 1, "SetFocusText.append")?;
    let append = p[text_end] != 0;
    Ok(SetFocusTextMessage { text, append })
}

// ── Utility helpers ───────────────────────────────────────────────────────────

fn require_len(buf: &[u8], needed: usize, context: &str) -> Result<(), ProtocolError> {
    if buf.len() < needed {
        Err(ProtocolError::MalformedPayload(format!(
            "{context}: need {needed} bytes, got {}",
            buf.len()
        )))
    } else {
        Ok(())
    }
}

fn read_u64(buf: &[u8], offset: usize) -> Result<u64, ProtocolError> {
    if buf.len() < offset + 8 {
        return Err(ProtocolError::InsufficientData {
            needed: offset + 8,
            available: buf.len(),
        });
    }
    Ok(u64::from_be_bytes([
        buf[offset],
        buf[offset + 1],
        buf[offset + 2],
        buf[offset + 3],
        buf[offset + 4],
        buf[offset + 5],
        buf[offset + 6],
        buf[offset + 7],
    ]))
}

/// Writes a 4-byte length prefix followed by the UTF-8 string bytes.
///
/// Focus text can exceed 64 KiB (think "select all" in an editor), so the
/// prefix is u32 rather than the u16 typical of short identifier strings.
fn write_length_prefixed_string(buf: &mut Vec<u8>, s: &str) {
    let bytes = s.as_bytes();
    let len = bytes.len().min(u32::MAX as usize) as u32;
    buf.extend_from_slice(&len.to_be_bytes());
    buf.extend_from_slice(&bytes[..len as usize]);
}

/// Reads a 4-byte length prefix and then that many UTF-8 bytes.
/// Returns the string and the offset of the byte after the string.
fn read_length_prefixed_string(buf: &[u8], offset: usize) -> Result<(String, usize), ProtocolError> {
    if buf.len() < offset + 4 {
        return Err(ProtocolError::MalformedPayload(format!(
            "need 4 bytes for string length at offset {offset}"
        )));
    }
    let len = u32::from_be_bytes([
        buf[offset],
        buf[offset + 1],
        buf[offset + 2],
        buf[offset + 3],
    ]) as usize;
    let start = offset + 4;
    if buf.len() < start + len {
        return Err(ProtocolError::MalformedPayload(format!(
            "string of length {len} at offset {start} exceeds buffer"
        )));
    }
    let s = std::str::from_utf8(&buf[start..start + len])
        .map_err(|e| ProtocolError::MalformedPayload(format!("invalid UTF-8: {e}")))?
        .to_string();
    Ok((s, start + len))
}

// ── Tests ─────────────────────────────────────────────────────────────────────
