//! Recording fakes for the gateway collaborators.

use std::{
    collections::{HashMap, HashSet},
    sync::{
        Arc, Mutex,
        atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering},
    },
};

use {
    async_trait::async_trait,
    ivebot_channels::{
        Author, CapabilitySet, ConversationClient, Error, FallbackHandler, GuildInfo,
        InboundMessage, MessageHandle, Payload, Result,
    },
    ivebot_storage::{DocumentStore, MemoryStore},
};

use crate::{
    context::CommandContext, extract::ArgumentExtractor, registry::CommandRegistry,
    state::EphemeralState,
};

/// Every outbound call, in order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Recorded {
    Sent { conversation_id: String, payload: Payload, message_id: String },
    Edited { handle: MessageHandle, payload: Payload },
    Deleted { handle: MessageHandle, reason: Option<String> },
    Typing { conversation_id: String },
    Kicked { guild_id: String, actor_id: String, reason: String },
}

/// A [`ConversationClient`] that records instead of talking to a platform.
#[derive(Default)]
pub struct RecordingClient {
    calls: Mutex<Vec<Recorded>>,
    muted: Mutex<HashSet<String>>,
    members: Mutex<Vec<Author>>,
    role_positions: Mutex<HashMap<String, u32>>,
    next_id: AtomicU64,
    fail_sends: AtomicBool,
    fail_deletes: AtomicBool,
}

impl RecordingClient {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Make `can_send` return false for a conversation.
    pub fn mute(&self, conversation_id: &str) {
        self.muted
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .insert(conversation_id.to_string());
    }

    /// Make `find_member` aware of a guild member.
    pub fn add_member(&self, member: Author) {
        self.members.lock().unwrap_or_else(|e| e.into_inner()).push(member);
    }

    /// Give a member a highest-role position for `role_position`.
    pub fn set_role_position(&self, actor_id: &str, position: u32) {
        self.role_positions
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .insert(actor_id.to_string(), position);
    }

    pub fn fail_sends(&self) {
        self.fail_sends.store(true, Ordering::SeqCst);
    }

    pub fn fail_deletes(&self) {
        self.fail_deletes.store(true, Ordering::SeqCst);
    }

    pub fn calls(&self) -> Vec<Recorded> {
        self.calls.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }

    /// Bodies of every sent message (rich payloads rendered as their title).
    pub fn sent_texts(&self) -> Vec<String> {
        self.calls()
            .into_iter()
            .filter_map(|call| match call {
                Recorded::Sent { payload, .. } => Some(match payload {
                    Payload::Text { text } => text,
                    Payload::Rich(rich) => rich.title.or(rich.content).unwrap_or_default(),
                }),
                _ => None,
            })
            .collect()
    }

    pub fn sent_payloads(&self) -> Vec<(String, Payload)> {
        self.calls()
            .into_iter()
            .filter_map(|call| match call {
                Recorded::Sent {
                    conversation_id,
                    payload,
                    ..
                } => Some((conversation_id, payload)),
                _ => None,
            })
            .collect()
    }

    pub fn deleted(&self) -> Vec<MessageHandle> {
        self.calls()
            .into_iter()
            .filter_map(|call| match call {
                Recorded::Deleted { handle, .. } => Some(handle),
                _ => None,
            })
            .collect()
    }

    fn record(&self, call: Recorded) {
        self.calls.lock().unwrap_or_else(|e| e.into_inner()).push(call);
    }
}

#[async_trait]
impl ConversationClient for RecordingClient {
    async fn send_message(&self, conversation_id: &str, payload: &Payload) -> Result<MessageHandle> {
        if self.fail_sends.load(Ordering::SeqCst) {
            return Err(Error::unavailable("send rejected"));
        }
        let message_id = format!("sent-{}", self.next_id.fetch_add(1, Ordering::SeqCst));
        self.record(Recorded::Sent {
            conversation_id: conversation_id.to_string(),
            payload: payload.clone(),
            message_id: message_id.clone(),
        });
        Ok(MessageHandle::new(conversation_id, message_id))
    }

    async fn edit_message(&self, handle: &MessageHandle, payload: &Payload) -> Result<()> {
        self.record(Recorded::Edited {
            handle: handle.clone(),
            payload: payload.clone(),
        });
        Ok(())
    }

    async fn delete_message(&self, handle: &MessageHandle, reason: Option<&str>) -> Result<()> {
        if self.fail_deletes.load(Ordering::SeqCst) {
            return Err(Error::forbidden("missing manage messages"));
        }
        self.record(Recorded::Deleted {
            handle: handle.clone(),
            reason: reason.map(str::to_string),
        });
        Ok(())
    }

    async fn direct_channel(&self, actor_id: &str) -> Result<String> {
        Ok(format!("dm-{actor_id}"))
    }

    async fn can_send(&self, conversation_id: &str) -> bool {
        !self
            .muted
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .contains(conversation_id)
    }

    async fn send_typing(&self, conversation_id: &str) -> Result<()> {
        self.record(Recorded::Typing {
            conversation_id: conversation_id.to_string(),
        });
        Ok(())
    }

    async fn kick_member(&self, guild_id: &str, actor_id: &str, reason: &str) -> Result<()> {
        self.record(Recorded::Kicked {
            guild_id: guild_id.to_string(),
            actor_id: actor_id.to_string(),
            reason: reason.to_string(),
        });
        Ok(())
    }

    async fn find_member(&self, _guild_id: &str, query: &str) -> Result<Option<Author>> {
        let members = self.members.lock().unwrap_or_else(|e| e.into_inner());
        Ok(members
            .iter()
            .find(|m| m.id == query || m.username.eq_ignore_ascii_case(query) || m.tag() == query)
            .cloned())
    }

    async fn role_position(&self, _guild_id: &str, actor_id: &str) -> Result<Option<u32>> {
        let positions = self.role_positions.lock().unwrap_or_else(|e| e.into_inner());
        Ok(positions.get(actor_id).copied())
    }
}

/// Fallback that counts what it receives.
#[derive(Default)]
pub struct CountingFallback {
    count: AtomicUsize,
}

impl CountingFallback {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn count(&self) -> usize {
        self.count.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl FallbackHandler for CountingFallback {
    async fn handle(&self, _message: &InboundMessage) {
        self.count.fetch_add(1, Ordering::SeqCst);
    }
}

pub fn guild() -> GuildInfo {
    GuildInfo {
        id: "guild-1".into(),
        name: "Test Guild".into(),
    }
}

/// A message from `author_id` in guild channel `chan-1` holding `caps`.
pub fn guild_message(author_id: &str, content: &str, caps: CapabilitySet) -> InboundMessage {
    InboundMessage::new("msg-1", "chan-1", Author::new(author_id, "tester"), content)
        .in_guild(guild(), caps)
}

/// A direct message from `author_id`.
pub fn direct_message(author_id: &str, content: &str) -> InboundMessage {
    InboundMessage::new("msg-1", format!("dm-{author_id}"), Author::new(author_id, "tester"), content)
}

/// Build a context for calling a generator directly, outside the dispatcher.
pub fn context_for(
    message: InboundMessage,
    client: Arc<RecordingClient>,
    registry: Arc<CommandRegistry>,
) -> CommandContext {
    context_with(message, client, registry, Arc::new(EphemeralState::new()), Arc::new(MemoryStore::new()))
}

pub fn context_with(
    message: InboundMessage,
    client: Arc<RecordingClient>,
    registry: Arc<CommandRegistry>,
    state: Arc<EphemeralState>,
    store: Arc<dyn DocumentStore>,
) -> CommandContext {
    let invocation = ArgumentExtractor::new('/', registry.case_insensitive())
        .extract(&message.content)
        .unwrap_or_else(|| crate::extract::Invocation {
            raw_body: message.content.clone(),
            command_token: String::new(),
            args: Vec::new(),
            rest: String::new(),
        });
    CommandContext {
        message: Arc::new(message),
        invocation: Arc::new(invocation),
        client,
        state,
        store,
        registry,
    }
}
