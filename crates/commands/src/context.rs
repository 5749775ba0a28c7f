use std::sync::Arc;

use {
    ivebot_channels::{Author, ConversationClient, InboundMessage, MessageHandle, Payload},
    ivebot_storage::DocumentStore,
};

use crate::{extract::Invocation, registry::CommandRegistry, state::EphemeralState};

/// Everything a generator or post-hook may look at or act through.
///
/// Cheap to clone: all parts are shared.
#[derive(Clone)]
pub struct CommandContext {
    pub message: Arc<InboundMessage>,
    pub invocation: Arc<Invocation>,
    pub client: Arc<dyn ConversationClient>,
    pub state: Arc<EphemeralState>,
    pub store: Arc<dyn DocumentStore>,
    pub registry: Arc<CommandRegistry>,
}

impl CommandContext {
    pub fn args(&self) -> &[String] {
        &self.invocation.args
    }

    /// Text after the command word, spacing preserved.
    pub fn rest(&self) -> &str {
        &self.invocation.rest
    }

    pub fn author(&self) -> &Author {
        &self.message.author
    }

    pub fn conversation_id(&self) -> &str {
        &self.message.conversation_id
    }

    /// Post to the conversation the command was invoked in.
    pub async fn reply(&self, payload: impl Into<Payload>) -> ivebot_channels::Result<MessageHandle> {
        self.client
            .send_message(&self.message.conversation_id, &payload.into())
            .await
    }
}
