//! `alertcast doctor`: config validation and environment audit.
//!
//! Prints a report with `[ok]`, `[warn]`, `[fail]`, `[skip]` or `[info]`
//! per item and exits non-zero when anything failed.

use std::path::Path;

use {
    alertcast_config::{AlertcastConfig, Severity, ValidationResult},
    alertcast_telegram::{TelegramAccountConfig, bot::build_bot, link},
    anyhow::Result,
};

use crate::context::{AppContext, StartupOptions, describe_config_path};

const GREEN: &str = "\x1b[32m";
const RED: &str = "\x1b[31m";
const YELLOW: &str = "\x1b[33m";
const CYAN: &str = "\x1b[36m";
const DIM: &str = "\x1b[2m";
const BOLD: &str = "\x1b[1m";
const RESET: &str = "\x1b[0m";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Status {
    Ok,
    Warn,
    Fail,
    Skip,
    Info,
}

impl Status {
    fn label(self) -> &'static str {
        match self {
            Self::Ok => "ok",
            Self::Warn => "warn",
            Self::Fail => "fail",
            Self::Skip => "skip",
            Self::Info => "info",
        }
    }

    fn color(self) -> &'static str {
        match self {
            Self::Ok => GREEN,
            Self::Warn => YELLOW,
            Self::Fail => RED,
            Self::Skip => DIM,
            Self::Info => CYAN,
        }
    }
}

impl From<Severity> for Status {
    fn from(severity: Severity) -> Self {
        match severity {
            Severity::Error => Self::Fail,
            Severity::Warning => Self::Warn,
            Severity::Info => Self::Info,
        }
    }
}

struct Section {
    title: String,
    items: Vec<(Status, String)>,
}

impl Section {
    fn new(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            items: Vec::new(),
        }
    }

    fn push(&mut self, status: Status, message: impl Into<String>) {
        self.items.push((status, message.into()));
    }

    fn push_diagnostics(&mut self, result: &ValidationResult) {
        for d in &result.diagnostics {
            let message = if d.path.is_empty() {
                d.message.clone()
            } else {
                format!("{}: {}", d.path, d.message)
            };
            self.push(d.severity.into(), message);
        }
    }
}

fn print_report(sections: &[Section]) -> (usize, usize) {
    let mut errors = 0usize;
    let mut warnings = 0usize;

    for section in sections {
        eprintln!("{BOLD}{}{RESET}", section.title);
        for (status, message) in &section.items {
            eprintln!("  [{}{}{RESET}]  {message}", status.color(), status.label());
            match status {
                Status::Fail => errors += 1,
                Status::Warn => warnings += 1,
                _ => {},
            }
        }
        eprintln!();
    }

    (errors, warnings)
}

pub async fn handle_doctor(opts: &StartupOptions) -> Result<()> {
    eprintln!("{BOLD}alertcast doctor{RESET}");
    eprintln!("{BOLD}================{RESET}\n");

    let mut sections = Vec::new();
    match alertcast_config::discover_and_load(opts.config.as_deref()) {
        Ok((mut config, config_path)) => {
            if let Some(dir) = &opts.data_dir {
                config.storage.data_dir = Some(dir.clone());
            }
            sections.push(check_config_file(config_path.as_deref()));
            sections.push(check_effective_config(&config));
        },
        Err(e) => {
            let mut section = Section::new("Config file");
            section.push(Status::Fail, e.to_string());
            sections.push(section);
        },
    }

    // Loading the context repeats the startup checks, so a broken store or
    // config shows up here instead of aborting the report.
    match AppContext::load(opts).await {
        Ok(ctx) => {
            sections.push(check_store(&ctx).await);
            sections.push(check_telegram(&ctx).await);
        },
        Err(e) => {
            let mut section = Section::new("Subscriber store");
            section.push(Status::Fail, format!("{e:#}"));
            sections.push(section);
        },
    }

    let (errors, warnings) = print_report(&sections);
    eprintln!("{BOLD}Summary:{RESET} {errors} error(s), {warnings} warning(s)");

    if errors > 0 {
        std::process::exit(1);
    }
    Ok(())
}

fn check_config_file(path: Option<&Path>) -> Section {
    let mut section = Section::new(format!("Config file ({})", describe_config_path(path)));
    let Some(path) = path else {
        section.push(Status::Skip, "no config file, using defaults and environment");
        return section;
    };

    let result = alertcast_config::validate_file(path);
    if result.diagnostics.is_empty() {
        section.push(Status::Ok, "syntax valid, all fields recognized");
    } else {
        section.push_diagnostics(&result);
    }
    section
}

fn check_effective_config(config: &AlertcastConfig) -> Section {
    let mut section = Section::new("Effective config (file + environment)");
    let result = alertcast_config::validate(config);
    if !result.has_errors() {
        section.push(Status::Ok, "required settings present");
    }
    section.push_diagnostics(&result);
    section
}

async fn check_store(ctx: &AppContext) -> Section {
    let mut section = Section::new(format!("Subscriber store ({})", ctx.store_location));
    let active = ctx.store.subscribers().await;
    let removed = ctx.store.removed_subscribers().await;
    let reachable = ctx.store.conversation_ids().await.len();

    section.push(
        Status::Ok,
        format!("{} active, {} removed", active.len(), removed.len()),
    );
    let unreachable = active.len().saturating_sub(reachable);
    if unreachable > 0 {
        section.push(
            Status::Info,
            format!("{unreachable} subscriber(s) without a Telegram chat will not receive alerts"),
        );
    }
    section
}

async fn check_telegram(ctx: &AppContext) -> Section {
    let mut section = Section::new("Telegram");
    let config = match ctx.telegram() {
        Ok(config) => config,
        Err(e) => {
            section.push(Status::Skip, format!("not checked: {e}"));
            return section;
        },
    };
    check_bot_identity(&config, &mut section).await;
    section
}

async fn check_bot_identity(config: &TelegramAccountConfig, section: &mut Section) {
    let bot = match build_bot(config) {
        Ok(bot) => bot,
        Err(e) => {
            section.push(Status::Fail, e.to_string());
            return;
        },
    };
    // Skip the configured name so getMe proves the token works.
    match link::resolve_bot_username(&bot, None).await {
        Ok(username) => {
            section.push(Status::Ok, format!("token accepted, bot is @{username}"));
            if let Some(configured) = config.bot_username.as_deref()
                && !configured
                    .trim_start_matches('@')
                    .eq_ignore_ascii_case(&username)
            {
                section.push(
                    Status::Warn,
                    format!("bot_username is {configured:?} but Telegram says @{username}"),
                );
            }
            match link::subscribe_link(&username, &config.start_parameter) {
                Ok(url) => section.push(Status::Info, format!("subscribe link: {url}")),
                Err(e) => section.push(Status::Fail, e.to_string()),
            }
        },
        Err(e) => section.push(Status::Fail, format!("getMe failed: {e}")),
    }
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn severities_map_to_statuses() {
        assert_eq!(Status::from(Severity::Error), Status::Fail);
        assert_eq!(Status::from(Severity::Warning), Status::Warn);
        assert_eq!(Status::from(Severity::Info), Status::Info);
    }

    #[test]
    fn report_counts_failures_and_warnings() {
        let mut a = Section::new("a");
        a.push(Status::Ok, "fine");
        a.push(Status::Fail, "broken");
        let mut b = Section::new("b");
        b.push(Status::Warn, "hmm");
        b.push(Status::Skip, "later");
        assert_eq!(print_report(&[a, b]), (1, 1));
    }

    #[test]
    fn missing_config_file_is_skipped() {
        let section = check_config_file(None);
        assert_eq!(section.items.len(), 1);
        assert_eq!(section.items[0].0, Status::Skip);
    }

    #[test]
    fn config_file_diagnostics_are_listed() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("alertcast.toml");
        std::fs::write(&path, "[telegram]\ntokn = \"x\"\n").unwrap();

        let section = check_config_file(Some(&path));
        assert!(
            section
                .items
                .iter()
                .any(|(status, msg)| *status == Status::Fail && msg.starts_with("telegram.tokn"))
        );
    }
}
