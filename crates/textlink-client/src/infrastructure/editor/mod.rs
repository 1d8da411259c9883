//! Focus-field editor implementations and the host-request subscriber.
//!
//! Platform editors implement [`FocusTextEditor`]; the [`EditSubscriber`]
//! connects the channel's inbound broadcast to the edit use case and sends
//! read replies back through the channel.

pub mod mock;

use std::sync::Arc;

use textlink_core::InboundMessage;
use tracing::debug;

use crate::application::apply_edit::ApplyEditUseCase;
use crate::infrastructure::channel::{ChannelSender, InboundSubscriber};

/// Subscriber that applies host edit requests to the focused field.
///
/// Registered with the channel at startup. Each inbound request is handed to
/// the use case on the reader task; a read request's reply is enqueued on the
/// outbound queue like any other message.
pub struct EditSubscriber {
    use_case: ApplyEditUseCase,
    sender: ChannelSender,
}

impl EditSubscriber {
    pub fn new(use_case: ApplyEditUseCase, sender: ChannelSender) -> Self {
        Self { use_case, sender }
    }
}

impl InboundSubscriber for EditSubscriber {
    fn deliver(&self, msg: &InboundMessage) -> anyhow::Result<()> {
        if let Some(reply) = self.use_case.handle(msg)? {
            debug!("enqueueing edit reply");
            self.sender.send(reply);
        }
        Ok(())
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
