use {
    alertcast_subscribers::{Subscriber, SubscriberPatch, SubscriberStore},
    anyhow::bail,
    clap::Subcommand,
    tracing::debug,
};

#[derive(Subcommand)]
pub enum SubscriberAction {
    /// List active subscribers.
    List,
    /// Add a subscriber by hand.
    Add {
        /// Display name.
        name: String,
        /// Telegram chat id, when known.
        #[arg(long)]
        conversation: Option<String>,
    },
    /// Remove a subscriber. Its chat will not be re-added automatically.
    Remove {
        /// Subscriber id.
        id: String,
    },
    /// Change a subscriber's name or chat id.
    Update {
        /// Subscriber id.
        id: String,
        #[arg(long)]
        name: Option<String>,
        #[arg(long)]
        conversation: Option<String>,
    },
    /// Bring a removed chat back as a fresh subscriber.
    Resubscribe {
        /// Telegram chat id.
        conversation: String,
        /// Display name; defaults to the last known name.
        #[arg(long)]
        name: Option<String>,
    },
    /// List removed subscribers (the denylist).
    Removed,
}

pub async fn handle_subscribers(
    store: &SubscriberStore,
    action: SubscriberAction,
) -> anyhow::Result<()> {
    match action {
        SubscriberAction::List => {
            print_subscribers(&store.subscribers().await, "No subscribers yet.");
        },
        SubscriberAction::Removed => {
            print_subscribers(&store.removed_subscribers().await, "No removed subscribers.");
        },
        SubscriberAction::Add { name, conversation } => {
            let subscriber = store
                .add_subscriber(&name, conversation.as_deref())
                .await?;
            println!("Subscribed: {}", format_subscriber(&subscriber));
        },
        SubscriberAction::Remove { id } => match store.remove_subscriber(&id).await? {
            Some(removed) => println!("Removed: {}", format_subscriber(&removed)),
            None => debug!(subscriber_id = %id, "remove: no such subscriber"),
        },
        SubscriberAction::Update {
            id,
            name,
            conversation,
        } => {
            let patch = SubscriberPatch {
                conversation_id: conversation,
                display_name: name,
            };
            if patch.is_empty() {
                bail!("nothing to update, pass --name and/or --conversation");
            }
            match store.update_subscriber(&id, patch).await? {
                Some(updated) => println!("Updated: {}", format_subscriber(&updated)),
                None => debug!(subscriber_id = %id, "update: no such subscriber"),
            }
        },
        SubscriberAction::Resubscribe { conversation, name } => {
            match store.resubscribe(&conversation, name.as_deref()).await? {
                Some(subscriber) => println!("Resubscribed: {}", format_subscriber(&subscriber)),
                None => bail!("chat {conversation} was never subscribed, pass --name to add it"),
            }
        },
    }
    Ok(())
}

pub fn print_subscribers(subscribers: &[Subscriber], empty: &str) {
    if subscribers.is_empty() {
        println!("{empty}");
        return;
    }
    for subscriber in subscribers {
        println!("  {}", format_subscriber(subscriber));
    }
    println!("{} total", subscribers.len());
}

/// One line per subscriber: `<id>  <name>  chat=<id>  since <date>`.
pub fn format_subscriber(subscriber: &Subscriber) -> String {
    format!(
        "{}  {}  chat={}  since {}",
        subscriber.id,
        subscriber.display_name.as_deref().unwrap_or("(unnamed)"),
        subscriber.conversation_id.as_deref().unwrap_or("-"),
        subscriber.subscribed_at.format("%Y-%m-%d %H:%M UTC"),
    )
}
