use std::sync::Arc;

use {
    async_trait::async_trait,
    ivebot_channels::{
        Author, ConversationClient, Error, MessageHandle, Payload, Result, RichPayload,
    },
    serenity::{
        all::{
            Cache, ChannelId, CreateEmbed, CreateEmbedFooter, CreateMessage, EditMessage, GuildId,
            Http, MessageId, UserId,
        },
        http::HttpError,
        prelude::SerenityError,
    },
    tracing::debug,
};

use crate::convert::{author, snowflake};

/// Discord's maximum message content length in characters.
const MAX_DISCORD_LEN: usize = 2000;

/// [`ConversationClient`] over serenity's HTTP client and gateway cache.
pub struct DiscordClient {
    http: Arc<Http>,
    cache: Arc<Cache>,
}

impl DiscordClient {
    pub fn new(http: Arc<Http>, cache: Arc<Cache>) -> Self {
        Self { http, cache }
    }
}

fn channel_id(id: &str) -> Result<ChannelId> {
    snowflake(id).map(ChannelId::new)
}

/// Map a serenity failure onto the gateway error taxonomy.
fn classify(context: &str, err: SerenityError) -> Error {
    if let SerenityError::Http(HttpError::UnsuccessfulRequest(response)) = &err {
        match response.status_code.as_u16() {
            403 => return Error::forbidden(format!("{context}: {}", response.error.message)),
            404 => return Error::not_found(format!("{context}: {}", response.error.message)),
            _ => {},
        }
    }
    Error::external(context, err)
}

/// Truncate to Discord's limit on a char boundary.
fn truncate(s: &str) -> &str {
    match s.char_indices().nth(MAX_DISCORD_LEN) {
        Some((end, _)) => &s[..end],
        None => s,
    }
}

fn build_embed(rich: &RichPayload) -> CreateEmbed {
    let mut embed = CreateEmbed::new();
    if let Some(title) = &rich.title {
        embed = embed.title(title);
    }
    if let Some(description) = &rich.description {
        embed = embed.description(description);
    }
    if let Some(color) = rich.color {
        embed = embed.color(color);
    }
    for field in &rich.fields {
        embed = embed.field(&field.name, &field.value, field.inline);
    }
    if let Some(footer) = &rich.footer {
        embed = embed.footer(CreateEmbedFooter::new(footer));
    }
    embed
}

fn create_message(payload: &Payload) -> CreateMessage {
    match payload {
        Payload::Text { text } => CreateMessage::new().content(truncate(text)),
        Payload::Rich(rich) => {
            let builder = CreateMessage::new().embed(build_embed(rich));
            match &rich.content {
                Some(content) => builder.content(truncate(content)),
                None => builder,
            }
        },
    }
}

fn edit_message(payload: &Payload) -> EditMessage {
    match payload {
        Payload::Text { text } => EditMessage::new().content(truncate(text)),
        Payload::Rich(rich) => {
            let builder = EditMessage::new().embed(build_embed(rich));
            match &rich.content {
                Some(content) => builder.content(truncate(content)),
                None => builder,
            }
        },
    }
}

#[async_trait]
impl ConversationClient for DiscordClient {
    async fn send_message(
        &self,
        conversation_id: &str,
        payload: &Payload,
    ) -> Result<MessageHandle> {
        let channel = channel_id(conversation_id)?;
        let sent = channel
            .send_message(&*self.http, create_message(payload))
            .await
            .map_err(|e| classify("send message", e))?;
        Ok(MessageHandle::new(conversation_id, sent.id.to_string()))
    }

    async fn edit_message(&self, handle: &MessageHandle, payload: &Payload) -> Result<()> {
        let channel = channel_id(&handle.conversation_id)?;
        let message = MessageId::new(snowflake(&handle.message_id)?);
        channel
            .edit_message(&*self.http, message, edit_message(payload))
            .await
            .map_err(|e| classify("edit message", e))?;
        Ok(())
    }

    async fn delete_message(&self, handle: &MessageHandle, reason: Option<&str>) -> Result<()> {
        let channel = channel_id(&handle.conversation_id)?;
        let message = MessageId::new(snowflake(&handle.message_id)?);
        self.http
            .delete_message(channel, message, reason)
            .await
            .map_err(|e| classify("delete message", e))
    }

    async fn direct_channel(&self, actor_id: &str) -> Result<String> {
        let user = UserId::new(snowflake(actor_id)?);
        let channel = user
            .create_dm_channel(&*self.http)
            .await
            .map_err(|e| classify("open direct channel", e))?;
        Ok(channel.id.to_string())
    }

    async fn can_send(&self, conversation_id: &str) -> bool {
        let Ok(channel_id) = channel_id(conversation_id) else {
            return false;
        };
        let bot_id = self.cache.current_user().id;
        // Only guild channels are cached; DMs are always writable.
        let Some(channel) = self.cache.channel(channel_id).map(|c| c.clone()) else {
            return true;
        };
        let Some(guild) = self.cache.guild(channel.guild_id) else {
            debug!(%conversation_id, "guild not cached, assuming writable");
            return true;
        };
        match guild.members.get(&bot_id) {
            Some(member) => guild.user_permissions_in(&channel, member).send_messages(),
            None => true,
        }
    }

    async fn send_typing(&self, conversation_id: &str) -> Result<()> {
        self.http
            .broadcast_typing(channel_id(conversation_id)?)
            .await
            .map_err(|e| classify("send typing", e))
    }

    async fn kick_member(&self, guild_id: &str, actor_id: &str, reason: &str) -> Result<()> {
        let guild = GuildId::new(snowflake(guild_id)?);
        let user = UserId::new(snowflake(actor_id)?);
        guild
            .kick_with_reason(&*self.http, user, reason)
            .await
            .map_err(|e| classify("kick member", e))
    }

    async fn find_member(&self, guild_id: &str, query: &str) -> Result<Option<Author>> {
        let guild_id = GuildId::new(snowflake(guild_id)?);
        let Some(guild) = self.cache.guild(guild_id) else {
            return Ok(None);
        };
        let found = guild
            .members
            .values()
            .map(|member| author(&member.user))
            .find(|a| a.id == query || a.username == query || a.tag() == query);
        Ok(found)
    }

    async fn role_position(&self, guild_id: &str, actor_id: &str) -> Result<Option<u32>> {
        let guild_id = GuildId::new(snowflake(guild_id)?);
        let user_id = UserId::new(snowflake(actor_id)?);
        let Some(guild) = self.cache.guild(guild_id) else {
            return Ok(None);
        };
        let position = guild.members.get(&user_id).map(|member| {
            member
                .roles
                .iter()
                .filter_map(|role| guild.roles.get(role))
                .map(|role| u32::from(role.position))
                .max()
                .unwrap_or(0)
        });
        Ok(position)
    }
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn truncate_respects_char_boundaries() {
        let long = "é".repeat(MAX_DISCORD_LEN + 10);
        assert_eq!(truncate(&long).chars().count(), MAX_DISCORD_LEN);
        assert_eq!(truncate("short"), "short");
    }

    #[test]
    fn rejects_non_snowflake_conversations() {
        assert!(channel_id("dm-1").is_err());
        assert_eq!(channel_id("42").unwrap(), ChannelId::new(42));
    }
}
