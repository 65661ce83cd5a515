mod console;
mod context;
mod doctor_commands;
mod subscriber_commands;
mod telegram_commands;

use std::path::PathBuf;

use {
    alertcast_telegram::Language,
    clap::{Parser, Subcommand},
    tracing::info,
    tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt},
};

use crate::context::{AppContext, StartupOptions};

#[derive(Parser)]
#[command(name = "alertcast", about = "alertcast: Telegram alerts for self-service subscribers")]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Log level (trace, debug, info, warn, error).
    #[arg(long, global = true, default_value = "warn")]
    log_level: String,

    /// Output logs as JSON instead of human-readable.
    #[arg(long, global = true, default_value_t = false)]
    json_logs: bool,

    /// Config file (default: ./alertcast.toml, then ~/.config/alertcast/).
    #[arg(long, global = true, env = "ALERTCAST_CONFIG")]
    config: Option<PathBuf>,

    /// Directory holding the subscriber store (overrides config).
    #[arg(long, global = true)]
    data_dir: Option<PathBuf>,

    /// Keep subscribers in memory only; nothing is written to disk.
    #[arg(long, global = true, default_value_t = false)]
    ephemeral: bool,
}

impl Cli {
    fn startup_options(&self) -> StartupOptions {
        StartupOptions {
            config: self.config.clone(),
            data_dir: self.data_dir.clone(),
            ephemeral: self.ephemeral,
        }
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Subscriber management.
    Subscribers {
        #[command(subcommand)]
        action: subscriber_commands::SubscriberAction,
    },
    /// Look for new subscribers once.
    Check,
    /// Send an alert to every subscriber.
    Broadcast {
        #[arg(short, long)]
        message: String,
        /// english, french, thai or japanese.
        #[arg(short, long, default_value_t = Language::English)]
        language: Language,
    },
    /// Print the link people use to subscribe.
    Link,
    /// Config validation and environment checks.
    Doctor,
    /// Interactive loop that keeps the update cursor between checks.
    Console,
}

/// Logs go to stderr; stdout carries command output.
fn init_telemetry(cli: &Cli) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&cli.log_level));

    let registry = tracing_subscriber::registry().with(filter);

    if cli.json_logs {
        registry
            .with(
                fmt::layer()
                    .json()
                    .with_target(true)
                    .with_thread_ids(false)
                    .with_writer(std::io::stderr),
            )
            .init();
    } else {
        registry
            .with(
                fmt::layer()
                    .with_target(false)
                    .with_thread_ids(false)
                    .with_ansi(true)
                    .with_writer(std::io::stderr),
            )
            .init();
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();
    init_telemetry(&cli);

    info!(version = env!("CARGO_PKG_VERSION"), "alertcast starting");
    let opts = cli.startup_options();

    match cli.command {
        Commands::Doctor => doctor_commands::handle_doctor(&opts).await,
        Commands::Subscribers { action } => {
            let ctx = AppContext::load(&opts).await?;
            subscriber_commands::handle_subscribers(&ctx.store, action).await
        },
        Commands::Check => {
            let ctx = AppContext::load(&opts).await?;
            let clients = ctx.telegram_clients()?;
            telegram_commands::run_check(&ctx.store, &clients.reconciler).await?;
            Ok(())
        },
        Commands::Broadcast { message, language } => {
            let ctx = AppContext::load(&opts).await?;
            let clients = ctx.telegram_clients()?;
            telegram_commands::run_broadcast(&ctx.store, &clients, &message, language).await?;
            Ok(())
        },
        Commands::Link => {
            let ctx = AppContext::load(&opts).await?;
            let clients = ctx.telegram_clients()?;
            telegram_commands::run_link(&clients).await?;
            Ok(())
        },
        Commands::Console => {
            let ctx = AppContext::load(&opts).await?;
            let clients = ctx.telegram_clients()?;
            console::run_console(&ctx, &clients).await
        },
    }
}
