//! Discord event handler for serenity.
//!
//! Translates gateway messages and feeds them to the command dispatcher.

use std::sync::{Arc, OnceLock};

use {
    ivebot_commands::{Dispatcher, Outcome},
    serenity::{
        all::{Context, EventHandler, GatewayIntents, GuildId, Message, Ready},
        async_trait,
    },
    tracing::{debug, info, warn},
};

use crate::convert::inbound_message;

/// Handler for Discord gateway events.
///
/// The dispatcher is attached after the serenity client exists, because
/// the dispatcher's outbound client needs the client's HTTP handle and cache.
#[derive(Default)]
pub struct DiscordHandler {
    dispatcher: OnceLock<Arc<Dispatcher>>,
}

impl DiscordHandler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Required gateway intents for the bot.
    pub fn intents() -> GatewayIntents {
        GatewayIntents::GUILDS
            | GatewayIntents::GUILD_MEMBERS
            | GatewayIntents::GUILD_MESSAGES
            | GatewayIntents::DIRECT_MESSAGES
            | GatewayIntents::MESSAGE_CONTENT
    }

    /// Attach the dispatcher. Only the first call has an effect.
    pub fn attach(&self, dispatcher: Arc<Dispatcher>) {
        if self.dispatcher.set(dispatcher).is_err() {
            warn!("dispatcher already attached, ignoring");
        }
    }
}

#[async_trait]
impl EventHandler for DiscordHandler {
    async fn ready(&self, _ctx: Context, ready: Ready) {
        info!(
            bot_name = %ready.user.name,
            guilds = ready.guilds.len(),
            "discord bot ready"
        );
    }

    async fn message(&self, ctx: Context, msg: Message) {
        let Some(dispatcher) = self.dispatcher.get() else {
            debug!(message_id = %msg.id, "no dispatcher attached, dropping message");
            return;
        };

        let inbound = inbound_message(&ctx.cache, &msg);
        let outcome = dispatcher.on_message(inbound).await;
        match &outcome {
            Outcome::IgnoredAutomated | Outcome::Forwarded => {},
            _ => debug!(
                channel_id = %msg.channel_id,
                author_id = %msg.author.id,
                ?outcome,
                "command handled"
            ),
        }
    }

    async fn cache_ready(&self, _ctx: Context, guilds: Vec<GuildId>) {
        debug!(guild_count = guilds.len(), "discord cache ready");
    }
}
