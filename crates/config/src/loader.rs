use std::path::{Path, PathBuf};

use tracing::{debug, warn};

use crate::{
    env_subst::substitute_env,
    error::{Error, Result},
    schema::IveBotConfig,
};

/// Standard config file names, checked in order.
const CONFIG_FILENAMES: &[&str] = &["ivebot.toml", "ivebot.yaml", "ivebot.yml", "ivebot.json"];

/// Load config from the given path (any supported format).
pub fn load_config(path: &Path) -> Result<IveBotConfig> {
    let raw = std::fs::read_to_string(path).map_err(|source| Error::Read {
        path: path.to_path_buf(),
        source,
    })?;
    let raw = substitute_env(&raw);
    parse_config(&raw, path)
}

/// Discover and load config from standard locations.
///
/// Search order:
/// 1. `./ivebot.{toml,yaml,yml,json}` (project-local)
/// 2. `~/.config/ivebot/ivebot.{toml,yaml,yml,json}` (user-global)
///
/// Returns `IveBotConfig::default()` if no config file is found or the one
/// found does not parse.
pub fn discover_and_load() -> IveBotConfig {
    if let Some(path) = find_config_file() {
        debug!(path = %path.display(), "loading config");
        match load_config(&path) {
            Ok(cfg) => return cfg,
            Err(e) => {
                warn!(path = %path.display(), error = %e, "failed to load config, using defaults");
            },
        }
    } else {
        debug!("no config file found, using defaults");
    }
    IveBotConfig::default()
}

/// Find the first config file in standard locations.
pub fn find_config_file() -> Option<PathBuf> {
    find_in(Path::new(".")).or_else(|| config_dir().and_then(|dir| find_in(&dir)))
}

fn find_in(dir: &Path) -> Option<PathBuf> {
    CONFIG_FILENAMES
        .iter()
        .map(|name| dir.join(name))
        .find(|p| p.exists())
}

/// Returns the user-global config directory (`~/.config/ivebot/`).
pub fn config_dir() -> Option<PathBuf> {
    directories::ProjectDirs::from("", "", "ivebot").map(|d| d.config_dir().to_path_buf())
}

fn parse_config(raw: &str, path: &Path) -> Result<IveBotConfig> {
    let ext = path.extension().and_then(|e| e.to_str()).unwrap_or("toml");

    match ext {
        "toml" => toml::from_str(raw).map_err(|e| Error::parse(path, e)),
        "yaml" | "yml" => serde_yaml::from_str(raw).map_err(|e| Error::parse(path, e)),
        "json" => serde_json::from_str(raw).map_err(|e| Error::parse(path, e)),
        other => Err(Error::UnsupportedFormat {
            extension: other.to_string(),
        }),
    }
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use {super::*, std::fs};

    fn write(dir: &tempfile::TempDir, name: &str, body: &str) -> PathBuf {
        let path = dir.path().join(name);
        fs::write(&path, body).unwrap();
        path
    }

    #[test]
    fn loads_each_format() {
        let dir = tempfile::tempdir().unwrap();
        let toml = write(&dir, "ivebot.toml", "prefix = \"!\"\nhost = \"1\"\n");
        let yaml = write(&dir, "ivebot.yaml", "prefix: \"!\"\nhost: \"1\"\n");
        let json = write(&dir, "ivebot.json", r#"{"prefix": "!", "host": "1"}"#);

        for path in [toml, yaml, json] {
            let cfg = load_config(&path).unwrap();
            assert_eq!(cfg.prefix, '!');
            assert_eq!(cfg.host, "1");
        }
    }

    #[test]
    fn substitutes_fallbacks_before_parsing() {
        let dir = tempfile::tempdir().unwrap();
        let path = write(
            &dir,
            "ivebot.toml",
            "[discord]\ntoken = \"${IVEBOT_TEST_TOKEN_THAT_IS_NEVER_SET:-from-fallback}\"\n",
        );
        let cfg = load_config(&path).unwrap();
        assert_eq!(cfg.discord.token(), Some("from-fallback"));
    }

    #[test]
    fn reports_parse_errors_with_path() {
        let dir = tempfile::tempdir().unwrap();
        let path = write(&dir, "ivebot.toml", "prefix = [");
        let err = load_config(&path).unwrap_err();
        assert!(matches!(err, Error::Parse { .. }));
        assert!(err.to_string().contains("ivebot.toml"));
    }

    #[test]
    fn rejects_unknown_extension() {
        let dir = tempfile::tempdir().unwrap();
        let path = write(&dir, "ivebot.ini", "prefix = !");
        assert!(matches!(
            load_config(&path),
            Err(Error::UnsupportedFormat { extension }) if extension == "ini"
        ));
    }

    #[test]
    fn missing_file_is_a_read_error() {
        let dir = tempfile::tempdir().unwrap();
        assert!(matches!(
            load_config(&dir.path().join("nope.toml")),
            Err(Error::Read { .. })
        ));
    }

    #[test]
    fn find_in_respects_filename_order() {
        let dir = tempfile::tempdir().unwrap();
        assert!(find_in(dir.path()).is_none());
        write(&dir, "ivebot.json", "{}");
        write(&dir, "ivebot.yaml", "{}");
        assert_eq!(find_in(dir.path()).unwrap(), dir.path().join("ivebot.yaml"));
    }
}
