//! Fan an alert out to every subscribed conversation.
//!
//! Delivery is best effort per destination: a failed send is logged and
//! reported, and the remaining sends still go out.

use std::{fmt, str::FromStr};

use {
    alertcast_subscribers::SubscriberStore,
    serde::{Deserialize, Serialize},
    tracing::{info, warn},
};

use crate::{Error, Result, outbound::MessageSender};

/// Broadcast language. Non-English languages open with a greeting.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum Language {
    #[default]
    English,
    French,
    Thai,
    Japanese,
}

impl Language {
    pub const ALL: [Self; 4] = [Self::English, Self::French, Self::Thai, Self::Japanese];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::English => "english",
            Self::French => "french",
            Self::Thai => "thai",
            Self::Japanese => "japanese",
        }
    }

    fn greeting(self) -> Option<&'static str> {
        match self {
            Self::English => None,
            Self::French => Some("Bonjour"),
            Self::Thai => Some("Sawasdee-krub"),
            Self::Japanese => Some("Konnichiwa"),
        }
    }

    /// Prefix `text` with this language's greeting.
    pub fn compose(self, text: &str) -> String {
        match self.greeting() {
            Some(greeting) => format!("{greeting} {text}"),
            None => text.to_string(),
        }
    }
}

impl fmt::Display for Language {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Language {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let wanted = s.trim().to_ascii_lowercase();
        Self::ALL
            .into_iter()
            .find(|lang| lang.as_str() == wanted)
            .ok_or_else(|| Error::invalid_input(format!("unknown language: {s}")))
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeliveryFailure {
    pub conversation_id: String,
    pub error: String,
}

/// Per-destination outcome of a broadcast.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BroadcastReport {
    pub delivered: Vec<String>,
    pub failed: Vec<DeliveryFailure>,
}

impl BroadcastReport {
    pub fn all_delivered(&self) -> bool {
        self.failed.is_empty()
    }
}

/// Send `text` once to every distinct conversation in `store`.
///
/// Blank text and an empty audience are rejected before anything is sent.
pub async fn broadcast(
    sender: &dyn MessageSender,
    store: &SubscriberStore,
    text: &str,
    language: Language,
) -> Result<BroadcastReport> {
    if text.trim().is_empty() {
        return Err(Error::invalid_input("message must not be empty"));
    }
    let recipients = store.conversation_ids().await;
    if recipients.is_empty() {
        return Err(Error::NoRecipients);
    }

    let message = language.compose(text.trim());
    let mut report = BroadcastReport::default();
    for conversation_id in recipients {
        match sender.send_text(&conversation_id, &message).await {
            Ok(()) => report.delivered.push(conversation_id),
            Err(e) => {
                warn!(chat_id = %conversation_id, error = %e, "broadcast delivery failed");
                report.failed.push(DeliveryFailure {
                    conversation_id,
                    error: e.to_string(),
                });
            },
        }
    }

    info!(
        %language,
        delivered = report.delivered.len(),
        failed = report.failed.len(),
        "broadcast finished"
    );
    Ok(report)
}
