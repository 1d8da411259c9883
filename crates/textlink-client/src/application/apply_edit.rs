//! ApplyEditUseCase: translates host requests into focus-field edits.
//!
//! This use case sits at the application layer and delegates to a
//! [`FocusTextEditor`] trait object for the actual text-field access.
//! The platform-specific implementations are in the infrastructure layer.

use textlink_core::{
    protocol::messages::FocusTextReplyMessage, InboundMessage, OutboundMessage,
};
use thiserror::Error;

/// Error type for focus-field edit operations.
#[derive(Debug, Error)]
pub enum EditError {
    #[error("platform error: {0}")]
    Platform(String),
    #[error("no focused text field")]
    NoFocus,
}

/// Platform-agnostic access to the focused text field.
///
/// Each supported environment provides an implementation in the
/// infrastructure layer.
pub trait FocusTextEditor: Send + Sync {
    /// Reads the focused field's text, or only its current selection when
    /// `selection_only` is set.
    fn read_focus_text(&self, selection_only: bool) -> Result<String, EditError>;

    /// Replaces the focused field's content with `text`, or appends `text`
    /// to it when `append` is set.
    fn replace_focus_text(&self, text: &str, append: bool) -> Result<(), EditError>;
}

/// The Apply Edit use case.
///
/// Receives decoded host requests and dispatches them to the editor. A read
/// request produces the reply message to send back; a write request produces
/// nothing.
pub struct ApplyEditUseCase {
    editor: std::sync::Arc<dyn FocusTextEditor>,
}

impl ApplyEditUseCase {
    /// Creates a new use case with the given editor.
    pub fn new(editor: std::sync::Arc<dyn FocusTextEditor>) -> Self {
        Self { editor }
    }

    /// Handles one host request.
    ///
    /// # Errors
    ///
    /// Returns [`EditError`] if the editor cannot access the focused field.
    pub fn handle(&self, msg: &InboundMessage) -> Result<Option<OutboundMessage>, EditError> {
        match msg {
            InboundMessage::GetFocusText(req) => {
                let text = self.editor.read_focus_text(req.selection_only)?;
                Ok(Some(OutboundMessage::FocusTextReply(
                    FocusTextReplyMessage { text },
                )))
            }
            InboundMessage::SetFocusText(req) => {
                self.editor.replace_focus_text(&req.text, req.append)?;
                Ok(None)
            }
        }
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
