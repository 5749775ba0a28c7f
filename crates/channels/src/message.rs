use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::payload::MessageHandle;

/// Where a message was posted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConversationKind {
    /// A channel inside a guild (group conversation).
    Guild,
    /// A one-to-one direct message channel.
    Direct,
}

/// Named permissions an actor holds in one group conversation.
///
/// Stored as `name -> granted` so that explicit denials survive a
/// round-trip. Capabilities only exist inside guilds; direct messages carry
/// no set at all.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CapabilitySet(BTreeMap<String, bool>);

impl CapabilitySet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a set where each listed name is granted.
    pub fn granted<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self(names.into_iter().map(|n| (n.into(), true)).collect())
    }

    #[must_use]
    pub fn with(mut self, name: impl Into<String>, granted: bool) -> Self {
        self.0.insert(name.into(), granted);
        self
    }

    pub fn is_granted(&self, name: &str) -> bool {
        self.0.get(name).copied().unwrap_or(false)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, bool)> {
        self.0.iter().map(|(k, v)| (k.as_str(), *v))
    }

    /// Whether this (granted) set covers every entry of `required`.
    ///
    /// Overlays `required` onto a copy of `self` and compares the result
    /// with `self`: any required key the actor lacks, or holds with a
    /// different value, makes the two differ.
    pub fn covers(&self, required: &CapabilitySet) -> bool {
        let mut merged = self.0.clone();
        merged.extend(required.0.iter().map(|(k, v)| (k.clone(), *v)));
        merged == self.0
    }
}

/// The human (or bot) that authored a message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Author {
    pub id: String,
    pub username: String,
    /// Legacy four-digit discriminator, if the platform still has one.
    pub discriminator: Option<String>,
    /// Set for bots and webhooks.
    pub bot: bool,
    pub avatar_url: Option<String>,
}

impl Author {
    pub fn new(id: impl Into<String>, username: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            username: username.into(),
            discriminator: None,
            bot: false,
            avatar_url: None,
        }
    }

    /// `name#1234`, or just `name` when there is no discriminator.
    pub fn tag(&self) -> String {
        match self.discriminator.as_deref() {
            Some(d) if !d.is_empty() && d != "0" => format!("{}#{d}", self.username),
            _ => self.username.clone(),
        }
    }

    /// Platform mention markup.
    pub fn mention(&self) -> String {
        format!("<@{}>", self.id)
    }
}

/// Guild a group conversation belongs to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GuildInfo {
    pub id: String,
    pub name: String,
}

/// A chat message as delivered by the gateway.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InboundMessage {
    pub id: String,
    pub conversation_id: String,
    pub kind: ConversationKind,
    pub guild: Option<GuildInfo>,
    pub author: Author,
    pub content: String,
    /// Users mentioned in the message, in order of appearance.
    pub mentions: Vec<Author>,
    /// Conversation ids mentioned in the message (`<#id>`).
    pub channel_mentions: Vec<String>,
    /// Author's effective capabilities in this conversation (guilds only).
    pub member_capabilities: Option<CapabilitySet>,
}

impl InboundMessage {
    /// A direct message with no mentions.
    pub fn new(
        id: impl Into<String>,
        conversation_id: impl Into<String>,
        author: Author,
        content: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            conversation_id: conversation_id.into(),
            kind: ConversationKind::Direct,
            guild: None,
            author,
            content: content.into(),
            mentions: Vec::new(),
            channel_mentions: Vec::new(),
            member_capabilities: None,
        }
    }

    /// Move the message into a guild channel where the author holds `capabilities`.
    #[must_use]
    pub fn in_guild(mut self, guild: GuildInfo, capabilities: CapabilitySet) -> Self {
        self.kind = ConversationKind::Guild;
        self.guild = Some(guild);
        self.member_capabilities = Some(capabilities);
        self
    }

    #[must_use]
    pub fn with_mentions(mut self, mentions: Vec<Author>) -> Self {
        self.mentions = mentions;
        self
    }

    #[must_use]
    pub fn with_channel_mentions(mut self, channels: Vec<String>) -> Self {
        self.channel_mentions = channels;
        self
    }

    pub fn is_guild(&self) -> bool {
        self.kind == ConversationKind::Guild
    }

    pub fn guild_id(&self) -> Option<&str> {
        self.guild.as_ref().map(|g| g.id.as_str())
    }

    /// Handle addressing this message, for deletion or replies.
    pub fn handle(&self) -> MessageHandle {
        MessageHandle::new(&self.conversation_id, &self.id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn covers_requires_every_key() {
        let granted = CapabilitySet::granted(["sendMessages", "manageMessages"]);
        assert!(granted.covers(&CapabilitySet::granted(["manageMessages"])));
        assert!(granted.covers(&CapabilitySet::new()));
        assert!(!granted.covers(&CapabilitySet::granted(["manageGuild"])));
    }

    #[test]
    fn covers_respects_explicit_denial() {
        let granted = CapabilitySet::new()
            .with("manageMessages", false)
            .with("sendMessages", true);
        assert!(!granted.covers(&CapabilitySet::granted(["manageMessages"])));
        assert!(!granted.is_granted("manageMessages"));
    }

    #[test]
    fn tag_omits_zero_discriminator() {
        let mut author = Author::new("1", "voldemort");
        assert_eq!(author.tag(), "voldemort");
        author.discriminator = Some("6931".into());
        assert_eq!(author.tag(), "voldemort#6931");
        author.discriminator = Some("0".into());
        assert_eq!(author.tag(), "voldemort");
    }

    #[test]
    fn in_guild_switches_kind() {
        let msg = InboundMessage::new("m", "c", Author::new("1", "a"), "/ping").in_guild(
            GuildInfo {
                id: "g".into(),
                name: "Guild".into(),
            },
            CapabilitySet::new(),
        );
        assert!(msg.is_guild());
        assert_eq!(msg.guild_id(), Some("g"));
        assert_eq!(msg.handle(), MessageHandle::new("c", "m"));
    }
}
