//! Core data types for subscriber bookkeeping.

use {
    chrono::{DateTime, Utc},
    serde::{Deserialize, Serialize},
};

/// A person who receives broadcasts.
///
/// `conversation_id` is the messaging provider's handle for the one-on-one
/// chat with the bot; it is absent for subscribers that were added by hand
/// and have not talked to the bot yet.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Subscriber {
    pub id: String,
    #[serde(default, alias = "chatId", skip_serializing_if = "Option::is_none")]
    pub conversation_id: Option<String>,
    #[serde(default, alias = "username", skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,
    pub subscribed_at: DateTime<Utc>,
}

impl Subscriber {
    /// Create a subscriber with a fresh id and the current time.
    pub fn new(display_name: Option<String>, conversation_id: Option<String>) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            conversation_id,
            display_name,
            subscribed_at: Utc::now(),
        }
    }

    pub fn has_conversation(&self, conversation_id: &str) -> bool {
        self.conversation_id.as_deref() == Some(conversation_id)
    }

    fn has_display_name(&self, normalized: &str) -> bool {
        self.display_name
            .as_deref()
            .is_some_and(|name| name.to_lowercase() == normalized.to_lowercase())
    }
}

/// Partial update for [`Subscriber`]. `None` leaves the field untouched.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct SubscriberPatch {
    pub conversation_id: Option<String>,
    pub display_name: Option<String>,
}

impl SubscriberPatch {
    #[must_use]
    pub fn conversation_id(mut self, conversation_id: impl Into<String>) -> Self {
        self.conversation_id = Some(conversation_id.into());
        self
    }

    #[must_use]
    pub fn display_name(mut self, display_name: impl Into<String>) -> Self {
        self.display_name = Some(display_name.into());
        self
    }

    pub fn is_empty(&self) -> bool {
        self.conversation_id.is_none() && self.display_name.is_none()
    }
}

/// Everything that gets persisted: the active list and the removal denylist.
///
/// Removed records are only ever appended; an explicit re-subscription is the
/// one path that drops them again.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct SubscriberState {
    pub subscribers: Vec<Subscriber>,
    pub removed_subscribers: Vec<Subscriber>,
}

impl SubscriberState {
    pub fn find(&self, id: &str) -> Option<&Subscriber> {
        self.subscribers.iter().find(|s| s.id == id)
    }

    pub fn find_by_conversation(&self, conversation_id: &str) -> Option<&Subscriber> {
        self.subscribers
            .iter()
            .find(|s| s.has_conversation(conversation_id))
    }

    /// Case-insensitive lookup on an already normalized (`@`-prefixed) name.
    pub fn find_by_display_name(&self, normalized: &str) -> Option<&Subscriber> {
        self.subscribers
            .iter()
            .find(|s| s.has_display_name(normalized))
    }

    pub fn is_removed(&self, conversation_id: &str) -> bool {
        self.removed_subscribers
            .iter()
            .any(|s| s.has_conversation(conversation_id))
    }

    /// Most recent removed record for a conversation.
    pub fn last_removed(&self, conversation_id: &str) -> Option<&Subscriber> {
        self.removed_subscribers
            .iter()
            .rev()
            .find(|s| s.has_conversation(conversation_id))
    }

    /// Drop every removed record for `conversation_id`. Returns whether any
    /// record was dropped.
    pub fn forget_removed(&mut self, conversation_id: &str) -> bool {
        let before = self.removed_subscribers.len();
        self.removed_subscribers
            .retain(|s| !s.has_conversation(conversation_id));
        self.removed_subscribers.len() != before
    }

    /// Distinct conversation ids of active subscribers, in insertion order.
    pub fn conversation_ids(&self) -> Vec<String> {
        let mut ids: Vec<String> = Vec::new();
        for id in self
            .subscribers
            .iter()
            .filter_map(|s| s.conversation_id.as_deref())
        {
            if !ids.iter().any(|seen| seen == id) {
                ids.push(id.to_string());
            }
        }
        ids
    }
}

/// Trim a display name and make sure it starts with `@`.
///
/// Returns `None` when nothing but whitespace and the marker is left.
pub fn normalize_display_name(raw: &str) -> Option<String> {
    let trimmed = raw.trim();
    let bare = trimmed.strip_prefix('@').unwrap_or(trimmed).trim();
    if bare.is_empty() {
        None
    } else {
        Some(format!("@{bare}"))
    }
}
