//! `alertcast console`: an interactive operator loop.
//!
//! One process, one reconciler: the Telegram update cursor survives between
//! `check` runs, so each pass only looks at updates it has not seen.

use std::io::Write;

use {
    alertcast_telegram::Language,
    tokio::io::{AsyncBufReadExt, BufReader},
    tracing::debug,
};

use crate::{
    context::{AppContext, TelegramClients, describe_config_path},
    subscriber_commands::{SubscriberAction, handle_subscribers},
    telegram_commands::{run_broadcast, run_check, run_link},
};

const HELP: &str = "\
commands:
  check                              look for new subscribers
  broadcast [language] <message>     send an alert (english, french, thai, japanese)
  list                               active subscribers
  removed                            removed subscribers
  add <name> [chat id]               add a subscriber by hand
  remove <subscriber id>             remove a subscriber
  resubscribe <chat id> [name]       bring a removed chat back
  link                               print the subscribe link
  help                               this text
  quit                               leave";

#[derive(Debug, Clone, PartialEq, Eq)]
enum ConsoleCommand {
    Check,
    Broadcast { language: Language, message: String },
    Subscribers(SubscriberLine),
    Link,
    Help,
    Quit,
}

/// Store commands, kept separate from clap's enum so they can be compared.
#[derive(Debug, Clone, PartialEq, Eq)]
enum SubscriberLine {
    List,
    Removed,
    Add {
        name: String,
        conversation: Option<String>,
    },
    Remove {
        id: String,
    },
    Resubscribe {
        conversation: String,
        name: Option<String>,
    },
}

impl From<SubscriberLine> for SubscriberAction {
    fn from(line: SubscriberLine) -> Self {
        match line {
            SubscriberLine::List => Self::List,
            SubscriberLine::Removed => Self::Removed,
            SubscriberLine::Add { name, conversation } => Self::Add { name, conversation },
            SubscriberLine::Remove { id } => Self::Remove { id },
            SubscriberLine::Resubscribe { conversation, name } => {
                Self::Resubscribe { conversation, name }
            },
        }
    }
}

/// Parse one input line. Blank lines yield `Ok(None)`.
fn parse_line(line: &str) -> Result<Option<ConsoleCommand>, String> {
    let line = line.trim();
    let (verb, rest) = match line.split_once(char::is_whitespace) {
        Some((verb, rest)) => (verb, rest.trim()),
        None => (line, ""),
    };
    let words: Vec<&str> = rest.split_whitespace().collect();

    let command = match verb.to_ascii_lowercase().as_str() {
        "" => return Ok(None),
        "check" => ConsoleCommand::Check,
        "link" => ConsoleCommand::Link,
        "help" | "?" => ConsoleCommand::Help,
        "quit" | "exit" => ConsoleCommand::Quit,
        "list" => ConsoleCommand::Subscribers(SubscriberLine::List),
        "removed" => ConsoleCommand::Subscribers(SubscriberLine::Removed),
        "broadcast" => {
            let (language, message) = match rest.split_once(char::is_whitespace) {
                Some((first, tail)) => match first.parse::<Language>() {
                    Ok(language) => (language, tail.trim()),
                    Err(_) => (Language::English, rest),
                },
                None => (Language::English, rest),
            };
            if message.is_empty() {
                return Err("usage: broadcast [language] <message>".into());
            }
            ConsoleCommand::Broadcast {
                language,
                message: message.to_string(),
            }
        },
        "add" => match words.as_slice() {
            [name] => ConsoleCommand::Subscribers(SubscriberLine::Add {
                name: (*name).to_string(),
                conversation: None,
            }),
            [name, conversation] => ConsoleCommand::Subscribers(SubscriberLine::Add {
                name: (*name).to_string(),
                conversation: Some((*conversation).to_string()),
            }),
            _ => return Err("usage: add <name> [chat id]".into()),
        },
        "remove" => match words.as_slice() {
            [id] => ConsoleCommand::Subscribers(SubscriberLine::Remove {
                id: (*id).to_string(),
            }),
            _ => return Err("usage: remove <subscriber id>".into()),
        },
        "resubscribe" => match words.as_slice() {
            [conversation, name @ ..] => {
                ConsoleCommand::Subscribers(SubscriberLine::Resubscribe {
                    conversation: (*conversation).to_string(),
                    name: (!name.is_empty()).then(|| name.join(" ")),
                })
            },
            [] => return Err("usage: resubscribe <chat id> [name]".into()),
        },
        other => return Err(format!("unknown command {other:?}, type `help`")),
    };
    Ok(Some(command))
}

pub async fn run_console(ctx: &AppContext, clients: &TelegramClients) -> anyhow::Result<()> {
    println!(
        "alertcast console\n  config: {}\n  store:  {}",
        describe_config_path(ctx.config_path.as_deref()),
        ctx.store_location
    );
    println!("{HELP}");

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        print!("> ");
        std::io::stdout().flush()?;

        let Some(line) = lines.next_line().await? else {
            break;
        };
        let command = match parse_line(&line) {
            Ok(Some(command)) => command,
            Ok(None) => continue,
            Err(usage) => {
                eprintln!("{usage}");
                continue;
            },
        };
        debug!(?command, "console command");

        let outcome = match command {
            ConsoleCommand::Quit => break,
            ConsoleCommand::Help => {
                println!("{HELP}");
                Ok(())
            },
            ConsoleCommand::Check => run_check(&ctx.store, &clients.reconciler)
                .await
                .map(|_| ()),
            ConsoleCommand::Broadcast { language, message } => {
                run_broadcast(&ctx.store, clients, &message, language)
                    .await
                    .map(|_| ())
            },
            ConsoleCommand::Link => run_link(clients).await.map(|_| ()),
            ConsoleCommand::Subscribers(line) => handle_subscribers(&ctx.store, line.into()).await,
        };
        // Failures are notices here; the loop keeps going.
        if let Err(e) = outcome {
            eprintln!("error: {e:#}");
        }
    }
    Ok(())
}
