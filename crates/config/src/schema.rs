//! Config schema types.

use std::{collections::HashMap, fmt, time::Duration};

use {
    secrecy::{ExposeSecret, Secret},
    serde::{Deserialize, Serialize},
};

pub const DEFAULT_DATABASE_URL: &str = "sqlite://ivebot.db?mode=rwc";
/// `database.url` value selecting the non-persistent store.
pub const MEMORY_DATABASE: &str = "memory";

/// Root configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct IveBotConfig {
    /// Character that starts a command invocation.
    pub prefix: char,
    pub case_insensitive: bool,
    /// Owner's actor id.
    pub host: String,
    pub test_pilots: Vec<String>,
    /// How long a `/leave` waits for its confirmation.
    pub leave_confirmation_secs: u64,
    pub discord: DiscordConfig,
    pub database: DatabaseConfig,
    /// Per-guild settings keyed by guild id.
    pub guilds: HashMap<String, GuildConfig>,
}

impl Default for IveBotConfig {
    fn default() -> Self {
        Self {
            prefix: '/',
            case_insensitive: true,
            host: String::new(),
            test_pilots: Vec::new(),
            leave_confirmation_secs: 30,
            discord: DiscordConfig::default(),
            database: DatabaseConfig::default(),
            guilds: HashMap::new(),
        }
    }
}

impl IveBotConfig {
    pub fn leave_confirmation(&self) -> Duration {
        Duration::from_secs(self.leave_confirmation_secs)
    }

    /// Guild id -> warn log channel, for guilds that configured one.
    pub fn warn_log_channels(&self) -> HashMap<String, String> {
        self.guilds
            .iter()
            .filter_map(|(guild_id, guild)| {
                guild
                    .warn_log_channel
                    .as_ref()
                    .filter(|channel| !channel.is_empty())
                    .map(|channel| (guild_id.clone(), channel.clone()))
            })
            .collect()
    }
}

#[derive(Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct DiscordConfig {
    #[serde(
        default,
        serialize_with = "serialize_option_secret",
        skip_serializing_if = "Option::is_none"
    )]
    pub token: Option<Secret<String>>,
}

impl fmt::Debug for DiscordConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DiscordConfig")
            .field("token", &self.token.as_ref().map(|_| "[REDACTED]"))
            .finish()
    }
}

impl DiscordConfig {
    /// The token, if one is set and non-blank.
    pub fn token(&self) -> Option<&str> {
        self.token
            .as_ref()
            .map(|t| t.expose_secret().as_str())
            .filter(|t| !t.trim().is_empty())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DatabaseConfig {
    /// sqlx SQLite URL, or `memory`.
    pub url: String,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: DEFAULT_DATABASE_URL.to_string(),
        }
    }
}

impl DatabaseConfig {
    pub fn is_memory(&self) -> bool {
        self.url == MEMORY_DATABASE
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct GuildConfig {
    /// Conversation that receives a notice whenever someone is warned.
    pub warn_log_channel: Option<String>,
}

fn serialize_option_secret<S: serde::Serializer>(
    secret: &Option<Secret<String>>,
    serializer: S,
) -> Result<S::Ok, S::Error> {
    match secret {
        Some(s) => serializer.serialize_some(s.expose_secret()),
        None => serializer.serialize_none(),
    }
}
