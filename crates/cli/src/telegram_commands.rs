//! Commands that talk to Telegram: `check`, `broadcast`, `link`.

use {
    alertcast_subscribers::SubscriberStore,
    alertcast_telegram::{
        BroadcastReport, Error as TelegramError, Language, ReconcileReport, Reconciler,
        broadcast, link,
    },
    tracing::info,
};

use crate::{context::TelegramClients, subscriber_commands::format_subscriber};

/// Run one reconciliation pass and print what it did.
pub async fn run_check(
    store: &SubscriberStore,
    reconciler: &Reconciler,
) -> anyhow::Result<ReconcileReport> {
    let report = reconciler.reconcile(store).await?;
    print_reconcile_report(&report);
    Ok(report)
}

pub fn print_reconcile_report(report: &ReconcileReport) {
    if let Some(error) = &report.provider_error {
        eprintln!("Could not reach Telegram: {error}");
        return;
    }
    if report.found_nothing() {
        println!("No new subscribers.");
    } else {
        for subscriber in &report.added {
            println!("New subscriber: {}", format_subscriber(subscriber));
        }
    }
    if !report.skipped_removed.is_empty() {
        println!(
            "Ignored {} removed chat(s): {}",
            report.skipped_removed.len(),
            report.skipped_removed.join(", ")
        );
    }
}

/// Send `message` to every subscriber. An empty audience is a notice, not a
/// failure.
pub async fn run_broadcast(
    store: &SubscriberStore,
    clients: &TelegramClients,
    message: &str,
    language: Language,
) -> anyhow::Result<Option<BroadcastReport>> {
    match broadcast(&clients.sender, store, message, language).await {
        Ok(report) => {
            print_broadcast_report(&report);
            Ok(Some(report))
        },
        Err(TelegramError::NoRecipients) => {
            eprintln!("Nobody to notify yet: no subscriber has a Telegram chat.");
            Ok(None)
        },
        Err(e) => Err(e.into()),
    }
}

pub fn print_broadcast_report(report: &BroadcastReport) {
    println!("Delivered to {} chat(s).", report.delivered.len());
    for failure in &report.failed {
        eprintln!(
            "Failed to deliver to {}: {}",
            failure.conversation_id, failure.error
        );
    }
}

/// Print the self-service subscribe link.
pub async fn run_link(clients: &TelegramClients) -> anyhow::Result<String> {
    let username =
        link::resolve_bot_username(&clients.bot, clients.config.bot_username.as_deref()).await?;
    let url = link::subscribe_link(&username, &clients.config.start_parameter)?;
    info!(bot = %username, "subscribe link generated");
    println!("Share this link to let people subscribe:");
    println!("  {url}");
    println!();
    println!("{}", link::render_qr(&url)?);
    Ok(url)
}
