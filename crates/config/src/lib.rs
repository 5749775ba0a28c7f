//! Configuration loading, env substitution and validation.
//!
//! Config files: `ivebot.toml`, `ivebot.yaml`, `ivebot.yml` or `ivebot.json`.
//! Searched in `./` then the user config directory (`~/.config/ivebot/` on
//! Linux).
//!
//! Supports `${ENV_VAR}` and `${ENV_VAR:-fallback}` substitution anywhere
//! in the file.

pub mod env_subst;
pub mod error;
pub mod loader;
pub mod schema;
pub mod validate;

pub use {
    error::{Error, Result},
    loader::{config_dir, discover_and_load, find_config_file, load_config},
    schema::{DatabaseConfig, DiscordConfig, GuildConfig, IveBotConfig},
    validate::{Diagnostic, Severity, ValidationResult, validate, validate_toml_str},
};
