use std::path::{Path, PathBuf};

use {
    anyhow::{Context, Result},
    clap::Subcommand,
};

use ivebot_config::{Severity, ValidationResult};

#[derive(Subcommand)]
pub enum ConfigAction {
    /// Validate the configuration file and report errors/warnings.
    Check {
        /// Also require a Discord token, as `run` does.
        #[arg(long)]
        require_token: bool,
    },
    /// Print the effective configuration (secrets redacted).
    Show,
    /// Print the user-global config directory.
    Path,
}

pub fn handle_config(action: ConfigAction, explicit: Option<&Path>) -> Result<()> {
    match action {
        ConfigAction::Check { require_token } => check(explicit, require_token),
        ConfigAction::Show => {
            let config = crate::bot::load(explicit)?;
            println!("{config:#?}");
            Ok(())
        },
        ConfigAction::Path => {
            match ivebot_config::config_dir() {
                Some(dir) => println!("{}", dir.display()),
                None => eprintln!("no home directory; only ./ivebot.toml is searched"),
            }
            Ok(())
        },
    }
}

/// ANSI color codes.
const RED: &str = "\x1b[31m";
const YELLOW: &str = "\x1b[33m";
const BOLD: &str = "\x1b[1m";
const RESET: &str = "\x1b[0m";

fn check(explicit: Option<&Path>, require_token: bool) -> Result<()> {
    let path: Option<PathBuf> = explicit
        .map(Path::to_path_buf)
        .or_else(ivebot_config::find_config_file);

    let result = match &path {
        Some(path) => {
            eprintln!("Checking {}\n", path.display());
            let raw = std::fs::read_to_string(path)
                .with_context(|| format!("failed to read {}", path.display()))?;
            let raw = ivebot_config::env_subst::substitute_env(&raw);
            if path.extension().is_some_and(|e| e == "toml") {
                ivebot_config::validate_toml_str(&raw, require_token)
            } else {
                let config = ivebot_config::load_config(path)?;
                ivebot_config::validate(&config, require_token)
            }
        },
        None => {
            eprintln!("No config file found; checking defaults.\n");
            ivebot_config::validate(&ivebot_config::IveBotConfig::default(), require_token)
        },
    };

    report(&result);
    if result.has_errors() {
        std::process::exit(1);
    }
    Ok(())
}

fn report(result: &ValidationResult) {
    for d in &result.diagnostics {
        let color = match d.severity {
            Severity::Error => RED,
            Severity::Warning => YELLOW,
        };
        if d.path.is_empty() {
            eprintln!("  {BOLD}{color}{}{RESET} {}", d.severity, d.message);
        } else {
            eprintln!("  {BOLD}{color}{}{RESET} {}: {}", d.severity, d.path, d.message);
        }
    }

    let errors = result.count(Severity::Error);
    let warnings = result.count(Severity::Warning);

    if !result.diagnostics.is_empty() {
        eprintln!();
    }
    if errors == 0 && warnings == 0 {
        eprintln!("No issues found.");
    } else {
        eprintln!("{errors} error(s), {warnings} warning(s)");
    }
}
