use std::path::{Path, PathBuf};

use tracing::{debug, info};

use crate::{
    Error, Result,
    env_subst::substitute_env,
    schema::AlertcastConfig,
};

/// Standard config file names, checked in order.
const CONFIG_FILENAMES: &[&str] = &[
    "alertcast.toml",
    "alertcast.yaml",
    "alertcast.yml",
    "alertcast.json",
];

const APP_NAME: &str = "alertcast";

/// Env var holding the bot token. `TELEGRAM_BOT_TOKEN` is read as a fallback.
pub const TOKEN_ENV: &str = "ALERTCAST_TELEGRAM_TOKEN";
const LEGACY_TOKEN_ENV: &str = "TELEGRAM_BOT_TOKEN";
pub const BOT_USERNAME_ENV: &str = "ALERTCAST_TELEGRAM_BOT_USERNAME";
pub const DATA_DIR_ENV: &str = "ALERTCAST_DATA_DIR";

/// Load config from the given path (any supported format).
pub fn load_config(path: &Path) -> Result<AlertcastConfig> {
    let raw = std::fs::read_to_string(path).map_err(|source| Error::Read {
        path: path.to_path_buf(),
        source,
    })?;
    parse_config(&substitute_env(&raw), path)
}

/// Load `path`, or the first config file found in the standard locations.
///
/// Search order:
/// 1. `./alertcast.{toml,yaml,yml,json}` (project-local)
/// 2. `~/.config/alertcast/alertcast.{toml,yaml,yml,json}` (user-global)
///
/// Returns the defaults when no file exists. A file that exists but does not
/// parse is an error. Env overrides are applied last.
pub fn discover_and_load(path: Option<&Path>) -> Result<(AlertcastConfig, Option<PathBuf>)> {
    let source = match path {
        Some(p) => Some(p.to_path_buf()),
        None => find_config_file(),
    };
    let config = match &source {
        Some(p) => {
            debug!(path = %p.display(), "loading config");
            load_config(p)?
        },
        None => {
            debug!("no config file found, using defaults");
            AlertcastConfig::default()
        },
    };
    Ok((apply_env_overrides(config), source))
}

/// Find the first config file in standard locations.
pub fn find_config_file() -> Option<PathBuf> {
    let mut dirs = vec![PathBuf::from(".")];
    dirs.extend(config_dir());
    find_config_file_in(&dirs)
}

fn find_config_file_in(dirs: &[PathBuf]) -> Option<PathBuf> {
    dirs.iter()
        .flat_map(|dir| CONFIG_FILENAMES.iter().map(move |name| dir.join(name)))
        .find(|p| p.is_file())
}

/// Returns the user-global config directory (`~/.config/alertcast/`).
pub fn config_dir() -> Option<PathBuf> {
    directories::ProjectDirs::from("", "", APP_NAME).map(|d| d.config_dir().to_path_buf())
}

/// Platform data directory (`~/.local/share/alertcast/` on Linux).
pub fn default_data_dir() -> Option<PathBuf> {
    directories::ProjectDirs::from("", "", APP_NAME).map(|d| d.data_dir().to_path_buf())
}

/// Apply `ALERTCAST_*` environment overrides on top of the file config.
pub fn apply_env_overrides(config: AlertcastConfig) -> AlertcastConfig {
    apply_env_overrides_with(config, |name| std::env::var(name).ok())
}

fn apply_env_overrides_with(
    mut config: AlertcastConfig,
    lookup: impl Fn(&str) -> Option<String>,
) -> AlertcastConfig {
    let non_empty = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());

    if let Some(token) = non_empty(TOKEN_ENV) {
        config.set_telegram("token", token);
    } else if let Some(token) = non_empty(LEGACY_TOKEN_ENV) {
        info!(
            env = LEGACY_TOKEN_ENV,
            "using legacy token variable, prefer {TOKEN_ENV}"
        );
        config.set_telegram("token", token);
    }
    if let Some(username) = non_empty(BOT_USERNAME_ENV) {
        config.set_telegram("bot_username", username);
    }
    if let Some(dir) = non_empty(DATA_DIR_ENV) {
        config.storage.data_dir = Some(PathBuf::from(dir));
    }
    config
}

fn parse_config(raw: &str, path: &Path) -> Result<AlertcastConfig> {
    match extension(path) {
        "toml" => toml::from_str(raw).map_err(|e| Error::parse(path, e)),
        "yaml" | "yml" => serde_yaml::from_str(raw).map_err(|e| Error::parse(path, e)),
        "json" => serde_json::from_str(raw).map_err(|e| Error::parse(path, e)),
        ext => Err(Error::UnsupportedFormat { ext: ext.into() }),
    }
}

/// Parse into an untyped tree, for structural validation.
pub(crate) fn parse_config_value(raw: &str, path: &Path) -> Result<serde_json::Value> {
    match extension(path) {
        "toml" => toml::from_str::<toml::Value>(raw)
            .map_err(|e| Error::parse(path, e))
            .and_then(|v| serde_json::to_value(v).map_err(|e| Error::parse(path, e))),
        "yaml" | "yml" => serde_yaml::from_str::<serde_yaml::Value>(raw)
            .map_err(|e| Error::parse(path, e))
            .and_then(|v| serde_json::to_value(v).map_err(|e| Error::parse(path, e))),
        "json" => serde_json::from_str(raw).map_err(|e| Error::parse(path, e)),
        ext => Err(Error::UnsupportedFormat { ext: ext.into() }),
    }
}

fn extension(path: &Path) -> &str {
    path.extension().and_then(|e| e.to_str()).unwrap_or("toml")
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use {super::*, rstest::rstest, std::collections::HashMap};

    fn env(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |name| map.get(name).cloned()
    }

    #[rstest]
    #[case("alertcast.toml", "[telegram]\ntoken = \"1:a\"\n")]
    #[case("alertcast.yaml", "telegram:\n  token: \"1:a\"\n")]
    #[case("alertcast.json", r#"{"telegram": {"token": "1:a"}}"#)]
    fn loads_every_format(#[case] name: &str, #[case] body: &str) {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(name);
        std::fs::write(&path, body).unwrap();

        let cfg = load_config(&path).unwrap();
        assert_eq!(cfg.telegram_str("token"), Some("1:a"));
    }

    #[test]
    fn parse_error_names_the_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("alertcast.toml");
        std::fs::write(&path, "[telegram\n").unwrap();

        let err = load_config(&path).unwrap_err();
        assert!(matches!(err, Error::Parse { .. }));
        assert!(err.to_string().contains("alertcast.toml"), "{err}");
    }

    #[test]
    fn unsupported_extension_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("alertcast.ini");
        std::fs::write(&path, "token=1").unwrap();
        assert!(matches!(
            load_config(&path),
            Err(Error::UnsupportedFormat { .. })
        ));
    }

    #[test]
    fn discovery_prefers_first_directory_and_toml() {
        let local = tempfile::tempdir().unwrap();
        let global = tempfile::tempdir().unwrap();
        std::fs::write(global.path().join("alertcast.toml"), "").unwrap();
        std::fs::write(local.path().join("alertcast.json"), "{}").unwrap();
        std::fs::write(local.path().join("alertcast.yaml"), "").unwrap();

        let found = find_config_file_in(&[
            local.path().to_path_buf(),
            global.path().to_path_buf(),
        ]);
        assert_eq!(found, Some(local.path().join("alertcast.yaml")));
    }

    #[test]
    fn discovery_finds_nothing_in_empty_dirs() {
        let dir = tempfile::tempdir().unwrap();
        assert_eq!(find_config_file_in(&[dir.path().to_path_buf()]), None);
    }

    #[test]
    fn explicit_missing_path_is_a_read_error() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("nope.toml");
        assert!(matches!(
            discover_and_load(Some(&missing)),
            Err(Error::Read { .. })
        ));
    }

    #[test]
    fn env_overrides_replace_file_values() {
        let mut cfg = AlertcastConfig::default();
        cfg.set_telegram("token", "from-file");
        let cfg = apply_env_overrides_with(
            cfg,
            env(&[
                (TOKEN_ENV, "from-env"),
                (BOT_USERNAME_ENV, "alerts_bot"),
                (DATA_DIR_ENV, "/tmp/alertcast"),
            ]),
        );
        assert_eq!(cfg.telegram_str("token"), Some("from-env"));
        assert_eq!(cfg.telegram_str("bot_username"), Some("alerts_bot"));
        assert_eq!(cfg.data_dir(), PathBuf::from("/tmp/alertcast"));
    }

    #[test]
    fn legacy_token_variable_is_a_fallback() {
        let cfg = apply_env_overrides_with(
            AlertcastConfig::default(),
            env(&[(LEGACY_TOKEN_ENV, "legacy")]),
        );
        assert_eq!(cfg.telegram_str("token"), Some("legacy"));

        let cfg = apply_env_overrides_with(
            AlertcastConfig::default(),
            env(&[(LEGACY_TOKEN_ENV, "legacy"), (TOKEN_ENV, "current")]),
        );
        assert_eq!(cfg.telegram_str("token"), Some("current"));
    }

    #[test]
    fn blank_env_values_are_ignored() {
        let mut cfg = AlertcastConfig::default();
        cfg.set_telegram("token", "from-file");
        let cfg = apply_env_overrides_with(cfg, env(&[(TOKEN_ENV, "  ")]));
        assert_eq!(cfg.telegram_str("token"), Some("from-file"));
    }
}
