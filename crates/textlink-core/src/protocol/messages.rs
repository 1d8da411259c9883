//! All textlink protocol message types.
//!
//! The wire carries two distinct message families, discriminated by the
//! `msg_type` header byte:
//!
//! - **Outbound** (client → host, codes 0x01–0x3F): focus and edit events
//!   produced inside the instrumented process.
//! - **Inbound** (host → client, codes 0x40–0x7F): edit commands issued by
//!   the host application.
//!
//! Identifiers crossing the channel (`pid`, context and window handles) are
//! opaque numbers: the host echoes them back but never dereferences them.

use serde::{Deserialize, Serialize};

// ── Protocol constants ────────────────────────────────────────────────────────

/// Current protocol version byte.
pub const PROTOCOL_VERSION: u8 = 0x01;

/// Total size of the common message header in bytes.
pub const HEADER_SIZE: usize = 24;

// ── Message type codes ────────────────────────────────────────────────────────

/// All message type codes, split into the two direction families.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[repr(u8)]
pub enum MessageType {
    // Client → host (0x01–0x3F)
    Initialized = 0x01,
    FocusChanged = 0x02,
    EndEdit = 0x03,
    FocusTextReply = 0x04,
    // Host → client (0x40–0x7F)
    GetFocusText = 0x40,
    SetFocusText = 0x41,
}

impl TryFrom<u8> for MessageType {
    type Error = ();

    fn try_from(value: u8) -> Result<Self, ()> {
        match value {
            0x01 => Ok(MessageType::Initialized),
            0x02 => Ok(MessageType::FocusChanged),
            0x03 => Ok(MessageType::EndEdit),
            0x04 => Ok(MessageType::FocusTextReply),
            0x40 => Ok(MessageType::GetFocusText),
            0x41 => Ok(MessageType::SetFocusText),
            _ => Err(()),
        }
    }
}

impl MessageType {
    /// Returns `true` for client → host message codes.
    pub fn is_outbound(self) -> bool {
        (self as u8) < 0x40
    }

    /// Returns `true` for host → client message codes.
    pub fn is_inbound(self) -> bool {
        !self.is_outbound()
    }
}

// ── Common message header ─────────────────────────────────────────────────────

/// 24-byte header prepended to every message on the wire.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MessageHeader {
    /// Protocol version; always [`PROTOCOL_VERSION`].
    pub version: u8,
    /// Identifies the payload type.
    pub message_type: MessageType,
    /// Length of the payload in bytes (not including this header).
    pub payload_length: u32,
    /// Monotonically increasing per-channel counter.
    pub sequence_number: u64,
    /// Microseconds since Unix epoch at time of generation.
    pub timestamp_us: u64,
}

// ── Shared field types ────────────────────────────────────────────────────────

/// Screen-space bounds of the focused editing element, in pixels.
///
/// The four bounds match the rectangle convention of the originating window
/// system; the host treats them as-is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ScreenRect {
    pub left: i32,
    pub top: i32,
    pub right: i32,
    pub bottom: i32,
}

// ── Outbound payload structs ──────────────────────────────────────────────────

/// INITIALIZED (0x01): handshake sent immediately after connecting, before
/// any other traffic. The host uses the pid to associate the channel with a
/// process.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InitializedMessage {
    /// OS process id of the client.
    pub pid: u32,
}

/// FOCUS_CHANGED (0x02): the focused editing context moved.
///
/// Context and window handles are opaque numeric identifiers; a value of 0
/// means "none" (e.g. focus left every tracked context).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FocusChangedMessage {
    /// Handle of the newly focused editing context.
    pub context_id: u64,
    /// Native window handle hosting the new context.
    pub window_handle: u64,
    /// Handle of the previously focused context.
    pub prev_context_id: u64,
    /// Native window handle hosting the previous context.
    pub prev_window_handle: u64,
    /// Screen bounds of the newly focused element.
    pub screen_rect: ScreenRect,
}

/// END_EDIT (0x03): an edit session on a context finished.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EndEditMessage {
    /// Handle of the context whose edit session ended.
    pub context_id: u64,
}

/// FOCUS_TEXT_REPLY (0x04): response to a [`GetFocusTextMessage`], carrying
/// the text read from the focused element.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FocusTextReplyMessage {
    /// The focused element's text (or just its selection).
    pub text: String,
}

// ── Inbound payload structs ───────────────────────────────────────────────────

/// GET_FOCUS_TEXT (0x40): host asks for the text of the focused element.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct GetFocusTextMessage {
    /// When `true`, only the current selection is returned.
    pub selection_only: bool,
}

/// SET_FOCUS_TEXT (0x41): host replaces or appends text at the focus.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SetFocusTextMessage {
    /// Text to write into the focused element.
    pub text: String,
    /// When `true`, append to the existing content instead of replacing it.
    pub append: bool,
}

// ── Top-level message enums ───────────────────────────────────────────────────

/// All valid client → host messages, discriminated by type.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum OutboundMessage {
    Initialized(InitializedMessage),
    FocusChanged(FocusChangedMessage),
    EndEdit(EndEditMessage),
    FocusTextReply(FocusTextReplyMessage),
}

impl OutboundMessage {
    /// Returns the [`MessageType`] discriminant for this message.
    pub fn message_type(&self) -> MessageType {
        match self {
            OutboundMessage::Initialized(_) => MessageType::Initialized,
            OutboundMessage::FocusChanged(_) => MessageType::FocusChanged,
            OutboundMessage::EndEdit(_) => MessageType::EndEdit,
            OutboundMessage::FocusTextReply(_) => MessageType::FocusTextReply,
        }
    }
}

/// All valid host → client messages, discriminated by type.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum InboundMessage {
    GetFocusText(GetFocusTextMessage),
    SetFocusText(SetFocusTextMessage),
}

impl InboundMessage {
    /// Returns the [`MessageType`] discriminant for this message.
    pub fn message_type(&self) -> MessageType {
        match self {
            InboundMessage::GetFocusText(_) => MessageType::GetFocusText,
            InboundMessage::SetFocusText(_) => MessageType::SetFocusText,
        }
    }
}
