//! Discord adapter: serenity gateway events in, [`ConversationClient`] calls out.
//!
//! [`ConversationClient`]: ivebot_channels::ConversationClient

pub mod client;
pub mod convert;
pub mod handler;

use std::sync::Arc;

use {
    ivebot_channels::{Error, Result},
    serenity::Client,
};

pub use {client::DiscordClient, handler::DiscordHandler};

/// Build a serenity client wired to `handler`, without connecting.
///
/// Attach a dispatcher to the handler before calling `Client::start`.
pub async fn build_client(token: &str, handler: Arc<DiscordHandler>) -> Result<Client> {
    Client::builder(token, DiscordHandler::intents())
        .event_handler_arc(handler)
        .await
        .map_err(|e| Error::external("build discord client", e))
}

/// Outbound client sharing the serenity client's HTTP handle and cache.
pub fn conversation_client(client: &Client) -> DiscordClient {
    DiscordClient::new(Arc::clone(&client.http), Arc::clone(&client.cache))
}
