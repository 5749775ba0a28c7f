use {async_trait::async_trait, tracing::debug};

use crate::{
    Result,
    message::{Author, InboundMessage},
    payload::{MessageHandle, Payload},
};

/// Outbound side of the chat gateway.
///
/// Everything the dispatch core and the commands do to the outside world
/// goes through this trait, so tests can substitute a recording fake.
#[async_trait]
pub trait ConversationClient: Send + Sync {
    /// Post `payload` to a conversation and return a handle to the new message.
    async fn send_message(&self, conversation_id: &str, payload: &Payload)
    -> Result<MessageHandle>;

    /// Replace the body of a message the bot posted earlier.
    async fn edit_message(&self, handle: &MessageHandle, payload: &Payload) -> Result<()>;

    /// Delete a message. `reason` ends up in the platform's audit log.
    async fn delete_message(&self, handle: &MessageHandle, reason: Option<&str>) -> Result<()>;

    /// Open (or reuse) the direct conversation with an actor.
    async fn direct_channel(&self, actor_id: &str) -> Result<String>;

    /// Whether the bot may post in the conversation right now.
    async fn can_send(&self, conversation_id: &str) -> bool;

    /// Show a "typing" indicator. No-op by default.
    async fn send_typing(&self, _conversation_id: &str) -> Result<()> {
        Ok(())
    }

    /// Remove a member from a guild.
    async fn kick_member(&self, guild_id: &str, actor_id: &str, reason: &str) -> Result<()>;

    /// Find a guild member by id, username or `name#discriminator`.
    /// Adapters without a member cache may return `Ok(None)`.
    async fn find_member(&self, _guild_id: &str, _query: &str) -> Result<Option<Author>> {
        Ok(None)
    }

    /// Position of a member's highest role in a guild, `0` when they hold
    /// none. `Ok(None)` when the member or guild is unknown.
    async fn role_position(&self, _guild_id: &str, _actor_id: &str) -> Result<Option<u32>> {
        Ok(None)
    }
}

/// Receives every message that is not a recognised command invocation.
#[async_trait]
pub trait FallbackHandler: Send + Sync {
    async fn handle(&self, message: &InboundMessage);
}

/// Fallback that only records the message at debug level.
#[derive(Debug, Default, Clone, Copy)]
pub struct IgnoreFallback;

#[async_trait]
impl FallbackHandler for IgnoreFallback {
    async fn handle(&self, message: &InboundMessage) {
        debug!(
            conversation_id = %message.conversation_id,
            author_id = %message.author.id,
            "non-command message ignored"
        );
    }
}
