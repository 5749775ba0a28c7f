//! The commands IveBot ships with.
//!
//! Everything here is an ordinary [`CommandDef`] built on the public
//! `ivebot-commands` API; the dispatcher knows nothing about them.

use std::{collections::HashMap, sync::Arc, time::Duration};

use {
    ivebot_commands::{CommandDef, CommandRegistry, Requirement},
    tracing::info,
};

pub mod admin;
pub mod args;
pub mod games;
pub mod utility;

/// Deployment-specific inputs of the built-in commands.
#[derive(Debug, Clone)]
pub struct BuiltinSettings {
    /// Bot owner. Receives `/request` DMs and may use `/edit`.
    pub host: String,
    /// Trusted users allowed to run `/say` and friends anywhere.
    pub test_pilots: Vec<String>,
    pub leave_confirmation: Duration,
    /// Guild id -> channel that receives a notice for every `/warn`.
    pub warn_log_channels: HashMap<String, String>,
}

impl Default for BuiltinSettings {
    fn default() -> Self {
        Self {
            host: String::new(),
            test_pilots: Vec::new(),
            leave_confirmation: Duration::from_secs(30),
            warn_log_channels: HashMap::new(),
        }
    }
}

impl BuiltinSettings {
    /// Test pilots plus the host.
    pub fn trusted(&self) -> Vec<String> {
        self.test_pilots
            .iter()
            .cloned()
            .chain((!self.host.is_empty()).then(|| self.host.clone()))
            .collect()
    }

    /// Trusted users, or anyone who may manage messages where they are.
    pub(crate) fn trusted_or_moderator(&self) -> Requirement {
        Requirement::actors(self.trusted()).or_capabilities(["manageMessages"])
    }
}

/// Every built-in command, in registration order.
pub fn definitions(settings: &BuiltinSettings) -> Vec<CommandDef> {
    let settings = Arc::new(settings.clone());
    let mut defs = utility::definitions(&settings);
    defs.extend(games::definitions());
    defs.extend(admin::definitions(&settings));
    defs
}

/// Register every built-in command. A collision aborts with the registry
/// left holding the commands registered so far.
pub fn register_all(
    registry: &mut CommandRegistry,
    settings: &BuiltinSettings,
) -> ivebot_commands::Result<()> {
    for def in definitions(settings) {
        registry.register(def)?;
    }
    info!(commands = registry.len(), "built-in commands registered");
    Ok(())
}


#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn all_builtins_register_without_collisions() {
        let mut registry = CommandRegistry::default();
        register_all(&mut registry, &BuiltinSettings::default()).unwrap();
        for key in [
            "help", "h", "request", "req", "say", "type", "remindme", "rm", "avatar", "av",
            "leave", "edit", "editlastsay", "els", "choose", "cho", "reverse", "rev", "8ball",
            "zalgo", "zgo", "dezalgo", "dzgo", "repeat", "rep", "random", "rand", "warn",
            "warnings", "warns", "clearwarns", "cw",
        ] {
            assert!(registry.resolve(key).is_some(), "{key} not registered");
        }
    }

    #[test]
    fn registering_twice_fails() {
        let mut registry = CommandRegistry::default();
        register_all(&mut registry, &BuiltinSettings::default()).unwrap();
        let err = register_all(&mut registry, &BuiltinSettings::default()).unwrap_err();
        assert!(err.is_configuration_error());
    }

    #[test]
    fn trusted_includes_host_once_set() {
        let mut settings = BuiltinSettings::default();
        assert!(settings.trusted().is_empty());
        settings.host = "1".into();
        settings.test_pilots = vec!["2".into()];
        assert_eq!(settings.trusted(), vec!["2", "1"]);
    }
}
