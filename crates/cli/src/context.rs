//! Startup wiring shared by every command: config, store, Telegram clients.

use std::{
    path::{Path, PathBuf},
    sync::Arc,
};

use {
    alertcast_config::{AlertcastConfig, Diagnostic, Severity},
    alertcast_subscribers::{FileBackend, InMemoryBackend, SubscriberBackend, SubscriberStore},
    alertcast_telegram::{
        Reconciler, TelegramAccountConfig, TelegramFeed, TelegramSender, bot::build_bot,
    },
    anyhow::{Context, bail},
    tracing::{debug, info, warn},
};

/// Global flags that decide where state comes from.
#[derive(Debug, Clone, Default)]
pub struct StartupOptions {
    pub config: Option<PathBuf>,
    pub data_dir: Option<PathBuf>,
    pub ephemeral: bool,
}

/// Where the subscriber store lives.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreLocation {
    Memory,
    File(PathBuf),
}

impl std::fmt::Display for StoreLocation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Memory => f.write_str("in-memory (ephemeral)"),
            Self::File(path) => write!(f, "{}", path.display()),
        }
    }
}

pub struct AppContext {
    pub config: AlertcastConfig,
    pub config_path: Option<PathBuf>,
    pub store: SubscriberStore,
    pub store_location: StoreLocation,
}

impl AppContext {
    /// Load config and open the store. Invalid storage settings abort here;
    /// Telegram settings are only checked by commands that talk to Telegram.
    pub async fn load(opts: &StartupOptions) -> anyhow::Result<Self> {
        let (mut config, config_path) = alertcast_config::discover_and_load(opts.config.as_deref())?;
        if let Some(dir) = &opts.data_dir {
            config.storage.data_dir = Some(dir.clone());
        }
        ensure_valid(&config, "storage")?;

        let (backend, store_location) = if opts.ephemeral {
            let backend: Arc<dyn SubscriberBackend> = Arc::new(InMemoryBackend::new());
            (backend, StoreLocation::Memory)
        } else {
            let file = FileBackend::in_dir(&config.data_dir(), &config.storage.storage_name);
            let location = StoreLocation::File(file.path().to_path_buf());
            let backend: Arc<dyn SubscriberBackend> = Arc::new(file);
            (backend, location)
        };
        let store = SubscriberStore::open(backend)
            .await
            .with_context(|| format!("failed to open subscriber store at {store_location}"))?;
        debug!(
            config = ?config_path,
            store = %store_location,
            subscribers = store.subscribers().await.len(),
            "context ready"
        );

        Ok(Self {
            config,
            config_path,
            store,
            store_location,
        })
    }

    /// Typed `[telegram]` settings, rejecting a missing token and other errors.
    pub fn telegram(&self) -> anyhow::Result<TelegramAccountConfig> {
        ensure_valid(&self.config, "telegram")?;
        serde_json::from_value(self.config.telegram.clone()).context("invalid [telegram] section")
    }

    pub fn telegram_clients(&self) -> anyhow::Result<TelegramClients> {
        TelegramClients::new(self.telegram()?)
    }
}

/// Everything built from one bot: the reconciler owns the update cursor, so
/// keep one instance for as long as the process polls.
pub struct TelegramClients {
    pub config: TelegramAccountConfig,
    pub bot: teloxide::Bot,
    pub reconciler: Reconciler,
    pub sender: TelegramSender,
}

impl TelegramClients {
    pub fn new(config: TelegramAccountConfig) -> anyhow::Result<Self> {
        let bot = build_bot(&config)?;
        let feed = Arc::new(TelegramFeed::new(bot.clone(), config.poll_timeout_secs));
        let mut reconciler = Reconciler::new(feed, config.subscription_policy);
        if let Some(username) = &config.bot_username {
            reconciler = reconciler.with_bot_username(username.clone());
        }
        info!(policy = ?config.subscription_policy, "telegram clients ready");
        Ok(Self {
            sender: TelegramSender::new(bot.clone()),
            config,
            bot,
            reconciler,
        })
    }
}

/// Log warnings for `section` and fail on its errors.
fn ensure_valid(config: &AlertcastConfig, section: &str) -> anyhow::Result<()> {
    let result = alertcast_config::validate(config);
    let in_section = |d: &&Diagnostic| d.path.split('.').next() == Some(section);

    for d in result
        .diagnostics
        .iter()
        .filter(in_section)
        .filter(|d| d.severity == Severity::Warning)
    {
        warn!(path = %d.path, "{}", d.message);
    }

    let errors: Vec<String> = result
        .diagnostics
        .iter()
        .filter(in_section)
        .filter(|d| d.severity == Severity::Error)
        .map(ToString::to_string)
        .collect();
    if !errors.is_empty() {
        bail!(
            "invalid configuration (run `alertcast doctor` for details):\n  {}",
            errors.join("\n  ")
        );
    }
    Ok(())
}

/// Human label for an optional config file.
pub fn describe_config_path(path: Option<&Path>) -> String {
    path.map(|p| p.display().to_string())
        .unwrap_or_else(|| "defaults (no config file)".into())
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use super::*;

    const TOKEN: &str = "123456789:AAHdqTcvCH1vGWJxfSeofSAs0K5PALDsaw";

    fn write_config(dir: &Path, body: &str) -> PathBuf {
        let path = dir.join("alertcast.toml");
        std::fs::write(&path, body).unwrap();
        path
    }

    #[tokio::test]
    async fn file_store_lives_in_data_dir() {
        let dir = tempfile::tempdir().unwrap();
        let config = write_config(dir.path(), "[storage]\nstorage_name = \"subs\"\n");
        let opts = StartupOptions {
            config: Some(config),
            data_dir: Some(dir.path().join("data")),
            ephemeral: false,
        };

        let ctx = AppContext::load(&opts).await.unwrap();
        assert_eq!(
            ctx.store_location,
            StoreLocation::File(dir.path().join("data").join("subs.json"))
        );

        ctx.store.add_subscriber("alice", Some("1")).await.unwrap();
        let reopened = AppContext::load(&opts).await.unwrap();
        assert_eq!(reopened.store.subscribers().await.len(), 1);
    }

    #[tokio::test]
    async fn ephemeral_store_writes_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let config = write_config(dir.path(), "");
        let opts = StartupOptions {
            config: Some(config),
            data_dir: Some(dir.path().join("data")),
            ephemeral: true,
        };

        let ctx = AppContext::load(&opts).await.unwrap();
        ctx.store.add_subscriber("alice", Some("1")).await.unwrap();
        assert_eq!(ctx.store_location, StoreLocation::Memory);
        assert!(!dir.path().join("data").exists());
    }

    #[tokio::test]
    async fn invalid_storage_aborts_startup() {
        let dir = tempfile::tempdir().unwrap();
        let config = write_config(dir.path(), "[storage]\nstorage_name = \"\"\n");
        let opts = StartupOptions {
            config: Some(config),
            ephemeral: true,
            ..Default::default()
        };

        let err = AppContext::load(&opts).await.err().unwrap();
        assert!(err.to_string().contains("storage.storage_name"), "{err}");
    }

    #[tokio::test]
    async fn missing_token_only_blocks_telegram_commands() {
        let dir = tempfile::tempdir().unwrap();
        let config = write_config(dir.path(), "");
        let mut ctx = AppContext::load(&StartupOptions {
            config: Some(config),
            ephemeral: true,
            ..Default::default()
        })
        .await
        .unwrap();

        ctx.config.telegram = serde_json::json!({});
        assert!(ctx.telegram().is_err());

        ctx.config.set_telegram("token", TOKEN);
        ctx.config.set_telegram("subscription_policy", "any_message");
        let telegram = ctx.telegram().unwrap();
        assert!(telegram.has_token());
        assert!(ctx.telegram_clients().is_ok());
    }

    #[tokio::test]
    async fn mistyped_telegram_section_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let config = write_config(dir.path(), "");
        let mut ctx = AppContext::load(&StartupOptions {
            config: Some(config),
            ephemeral: true,
            ..Default::default()
        })
        .await
        .unwrap();

        ctx.config.set_telegram("token", TOKEN);
        ctx.config.set_telegram("poll_timeout_secs", "soon");
        assert!(ctx.telegram().is_err());
    }
}
