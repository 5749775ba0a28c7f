//! Wiring: config -> store, registry, dispatcher, Discord client.

use std::{path::Path, sync::Arc};

use {
    anyhow::{Context, Result, bail},
    ivebot_builtins::BuiltinSettings,
    ivebot_commands::{CommandRegistry, Dispatcher},
    ivebot_config::{IveBotConfig, Severity},
    ivebot_discord::DiscordHandler,
    ivebot_storage::{DocumentStore, MemoryStore, SqliteStore},
    tracing::{error, info, warn},
};

/// Load the config from `path`, or discover it.
pub fn load(path: Option<&Path>) -> Result<IveBotConfig> {
    match path {
        Some(path) => ivebot_config::load_config(path)
            .with_context(|| format!("loading {}", path.display())),
        None => Ok(ivebot_config::discover_and_load()),
    }
}

pub fn settings(config: &IveBotConfig) -> BuiltinSettings {
    BuiltinSettings {
        host: config.host.clone(),
        test_pilots: config.test_pilots.clone(),
        leave_confirmation: config.leave_confirmation(),
        warn_log_channels: config.warn_log_channels(),
    }
}

pub fn registry(config: &IveBotConfig) -> Result<CommandRegistry> {
    let mut registry = CommandRegistry::new(config.case_insensitive);
    ivebot_builtins::register_all(&mut registry, &settings(config))?;
    Ok(registry)
}

async fn store(config: &IveBotConfig) -> Result<Arc<dyn DocumentStore>> {
    if config.database.is_memory() {
        warn!("using the in-memory store; warnings are lost on restart");
        return Ok(Arc::new(MemoryStore::new()));
    }
    let store = SqliteStore::new(&config.database.url).await?;
    Ok(Arc::new(store))
}

/// Connect to Discord and dispatch until Ctrl-C.
pub async fn run(config: IveBotConfig) -> Result<()> {
    let validation = ivebot_config::validate(&config, true);
    for diagnostic in &validation.diagnostics {
        match diagnostic.severity {
            Severity::Error => error!(path = %diagnostic.path, "{}", diagnostic.message),
            Severity::Warning => warn!(path = %diagnostic.path, "{}", diagnostic.message),
        }
    }
    if validation.has_errors() {
        bail!(
            "invalid configuration ({} error(s))",
            validation.count(Severity::Error)
        );
    }
    let Some(token) = config.discord.token() else {
        bail!("no discord token configured");
    };

    let registry = Arc::new(registry(&config)?);
    info!(commands = registry.len(), "commands registered");
    let store = store(&config).await?;

    let handler = Arc::new(DiscordHandler::new());
    let mut client = ivebot_discord::build_client(token, Arc::clone(&handler)).await?;
    let conversation = Arc::new(ivebot_discord::conversation_client(&client));

    let dispatcher = Dispatcher::new(registry, conversation, store).with_prefix(config.prefix);
    handler.attach(Arc::new(dispatcher));

    let shard_manager = Arc::clone(&client.shard_manager);
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("shutting down");
            shard_manager.shutdown_all().await;
        }
    });

    client.start().await.context("discord client stopped")?;
    Ok(())
}

pub fn list_commands(config: &IveBotConfig) -> Result<()> {
    let registry = registry(config)?;
    let mut commands: Vec<_> = registry.iter().filter(|c| !c.hidden).collect();
    commands.sort_by(|a, b| a.name.cmp(&b.name));
    for command in commands {
        if command.aliases.is_empty() {
            println!("  {}{:<16} {}", config.prefix, command.name, command.description);
        } else {
            println!(
                "  {}{:<16} {} (aliases: {})",
                config.prefix,
                command.name,
                command.description,
                command.aliases.join(", ")
            );
        }
    }
    Ok(())
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use {super::*, std::time::Duration};

    #[test]
    fn settings_follow_config() {
        let config: IveBotConfig = toml_config(
            r#"
            host = "1"
            test_pilots = ["2"]
            leave_confirmation_secs = 5

            [guilds.g]
            warn_log_channel = "c"
            "#,
        );
        let settings = settings(&config);
        assert_eq!(settings.host, "1");
        assert_eq!(settings.trusted(), vec!["2".to_string(), "1".to_string()]);
        assert_eq!(settings.leave_confirmation, Duration::from_secs(5));
        assert_eq!(settings.warn_log_channels["g"], "c");
    }

    #[test]
    fn registry_respects_case_setting() {
        let sensitive = toml_config("case_insensitive = false");
        let registry = registry(&sensitive).unwrap();
        assert!(!registry.case_insensitive());
        assert!(registry.resolve("help").is_some());
        assert!(registry.resolve("HELP").is_none());

        let registry = registry_for_default();
        assert!(registry.resolve("HELP").is_some());
    }

    #[test]
    fn explicit_config_path_must_load() {
        let dir = tempfile::tempdir().unwrap();
        assert!(load(Some(&dir.path().join("missing.toml"))).is_err());
    }

    #[tokio::test]
    async fn run_refuses_without_token() {
        let config = toml_config("host = \"1\"\n[database]\nurl = \"memory\"");
        let err = run(config).await.unwrap_err();
        assert!(err.to_string().contains("invalid configuration"));
    }

    fn registry_for_default() -> CommandRegistry {
        registry(&IveBotConfig::default()).unwrap()
    }

    fn toml_config(raw: &str) -> IveBotConfig {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("ivebot.toml");
        std::fs::write(&path, raw).unwrap();
        load(Some(&path)).unwrap()
    }
}
