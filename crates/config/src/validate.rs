//! Configuration validation.
//!
//! Reports misspelled keys in TOML files and semantic problems that would
//! make the bot misbehave at startup.

use std::fmt;

use crate::schema::IveBotConfig;

/// Severity level for a diagnostic.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Severity {
    Error,
    Warning,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Error => write!(f, "error"),
            Self::Warning => write!(f, "warning"),
        }
    }
}

/// A single validation diagnostic.
#[derive(Debug, Clone)]
pub struct Diagnostic {
    pub severity: Severity,
    /// Dotted path, e.g. "discord.token"
    pub path: String,
    pub message: String,
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} [{}]: {}", self.severity, self.path, self.message)
    }
}

#[derive(Debug, Clone, Default)]
pub struct ValidationResult {
    pub diagnostics: Vec<Diagnostic>,
}

impl ValidationResult {
    /// Returns `true` if any diagnostic is an error.
    #[must_use]
    pub fn has_errors(&self) -> bool {
        self.diagnostics
            .iter()
            .any(|d| d.severity == Severity::Error)
    }

    /// Count diagnostics by severity.
    #[must_use]
    pub fn count(&self, severity: Severity) -> usize {
        self.diagnostics
            .iter()
            .filter(|d| d.severity == severity)
            .count()
    }

    fn push(&mut self, severity: Severity, path: impl Into<String>, message: impl Into<String>) {
        self.diagnostics.push(Diagnostic {
            severity,
            path: path.into(),
            message: message.into(),
        });
    }
}

const TOP_LEVEL_KEYS: &[&str] = &[
    "prefix",
    "case_insensitive",
    "host",
    "test_pilots",
    "leave_confirmation_secs",
    "discord",
    "database",
    "guilds",
];
const DISCORD_KEYS: &[&str] = &["token"];
const DATABASE_KEYS: &[&str] = &["url"];
const GUILD_KEYS: &[&str] = &["warn_log_channel"];

/// Semantic checks on a parsed config.
///
/// `require_token` is set when the caller is about to connect to the gateway.
pub fn validate(config: &IveBotConfig, require_token: bool) -> ValidationResult {
    let mut result = ValidationResult::default();

    if config.prefix.is_whitespace() {
        result.push(Severity::Error, "prefix", "prefix cannot be whitespace");
    }
    if require_token && config.discord.token().is_none() {
        result.push(
            Severity::Error,
            "discord.token",
            "a bot token is required (set discord.token or ${DISCORD_TOKEN})",
        );
    }
    if config.database.url.trim().is_empty() {
        result.push(Severity::Error, "database.url", "database url is empty");
    }

    if config.host.trim().is_empty() {
        result.push(
            Severity::Warning,
            "host",
            "no host configured; host-only commands will be unusable",
        );
    }
    if config.leave_confirmation_secs == 0 {
        result.push(
            Severity::Warning,
            "leave_confirmation_secs",
            "leave confirmations expire immediately",
        );
    }
    for (i, pilot) in config.test_pilots.iter().enumerate() {
        if pilot.trim().is_empty() {
            result.push(Severity::Warning, format!("test_pilots[{i}]"), "empty actor id");
        }
    }
    let mut guild_ids: Vec<_> = config.guilds.keys().collect();
    guild_ids.sort();
    for guild_id in guild_ids {
        let channel = config.guilds[guild_id].warn_log_channel.as_deref();
        if channel.is_some_and(|c| c.trim().is_empty()) {
            result.push(
                Severity::Warning,
                format!("guilds.{guild_id}.warn_log_channel"),
                "empty channel id; warnings will not be logged",
            );
        }
    }

    result
}

/// Parse a TOML document, flag unknown keys, then run [`validate`].
pub fn validate_toml_str(raw: &str, require_token: bool) -> ValidationResult {
    let value: toml::Value = match toml::from_str(raw) {
        Ok(v) => v,
        Err(e) => {
            let mut result = ValidationResult::default();
            result.push(Severity::Error, "", format!("syntax error: {e}"));
            return result;
        },
    };

    let mut result = ValidationResult::default();
    check_keys(&value, "", TOP_LEVEL_KEYS, &mut result);
    if let Some(discord) = value.get("discord") {
        check_keys(discord, "discord.", DISCORD_KEYS, &mut result);
    }
    if let Some(database) = value.get("database") {
        check_keys(database, "database.", DATABASE_KEYS, &mut result);
    }
    if let Some(guilds) = value.get("guilds").and_then(toml::Value::as_table) {
        for (guild_id, guild) in guilds {
            check_keys(guild, &format!("guilds.{guild_id}."), GUILD_KEYS, &mut result);
        }
    }

    match value.try_into::<IveBotConfig>() {
        Ok(config) => result
            .diagnostics
            .extend(validate(&config, require_token).diagnostics),
        Err(e) => result.push(Severity::Error, "", format!("type error: {e}")),
    }
    result
}

fn check_keys(value: &toml::Value, prefix: &str, known: &[&str], result: &mut ValidationResult) {
    let Some(table) = value.as_table() else {
        return;
    };
    for key in table.keys() {
        if known.contains(&key.as_str()) {
            continue;
        }
        let message = match suggest(key, known, 3) {
            Some(s) => format!("unknown field \"{key}\"; did you mean \"{s}\"?"),
            None => format!("unknown field \"{key}\""),
        };
        result.push(Severity::Warning, format!("{prefix}{key}"), message);
    }
}

fn levenshtein(a: &str, b: &str) -> usize {
    let b: Vec<char> = b.chars().collect();
    let mut prev: Vec<usize> = (0..=b.len()).collect();
    let mut curr = vec![0; b.len() + 1];

    for (i, ca) in a.chars().enumerate() {
        curr[0] = i + 1;
        for (j, cb) in b.iter().enumerate() {
            let cost = usize::from(ca != *cb);
            curr[j + 1] = (prev[j] + cost).min(prev[j + 1] + 1).min(curr[j] + 1);
        }
        std::mem::swap(&mut prev, &mut curr);
    }
    prev[b.len()]
}

fn suggest<'a>(needle: &str, candidates: &[&'a str], max_distance: usize) -> Option<&'a str> {
    candidates
        .iter()
        .map(|c| (*c, levenshtein(needle, c)))
        .filter(|(_, d)| *d <= max_distance)
        .min_by_key(|(_, d)| *d)
        .map(|(c, _)| c)
}
