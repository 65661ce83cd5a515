//! Turns the provider's update feed into net-new subscribers.
//!
//! The reconciler owns the polling cursor. It starts unset, only ever moves
//! forward to one past the highest update id seen, and stays put when a poll
//! fails so the next pass retries the same window.

use std::sync::Arc;

use {
    alertcast_subscribers::{Subscriber, SubscriberStore, Upsert},
    teloxide::types::{Update, UpdateKind},
    tokio::sync::Mutex,
    tracing::{debug, info, warn},
};

use crate::{Error, Result, config::SubscriptionPolicy, feed::UpdateFeed};

/// A conversation that asked to subscribe.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Candidate {
    pub conversation_id: String,
    pub display_name: String,
}

/// What one reconciliation pass did.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReconcileReport {
    pub added: Vec<Subscriber>,
    /// Conversations that already had an active subscriber.
    pub existing: Vec<String>,
    /// Conversations on the removal denylist.
    pub skipped_removed: Vec<String>,
    /// Set when the provider call failed; the pass then found nothing.
    pub provider_error: Option<String>,
}

impl ReconcileReport {
    pub fn found_nothing(&self) -> bool {
        self.added.is_empty()
    }
}

struct Pull {
    candidates: Vec<Candidate>,
    next_offset: Option<i32>,
    error: Option<String>,
}

pub struct Reconciler {
    feed: Arc<dyn UpdateFeed>,
    policy: SubscriptionPolicy,
    bot_username: Option<String>,
    next_offset: Mutex<Option<i32>>,
}

impl Reconciler {
    pub fn new(feed: Arc<dyn UpdateFeed>, policy: SubscriptionPolicy) -> Self {
        Self {
            feed,
            policy,
            bot_username: None,
            next_offset: Mutex::new(None),
        }
    }

    /// Only accept `/start@<name>` addressed to this bot.
    #[must_use]
    pub fn with_bot_username(mut self, bot_username: impl Into<String>) -> Self {
        self.bot_username = Some(bot_username.into());
        self
    }

    /// Offset the next poll will send, `None` before the first update.
    pub async fn next_offset(&self) -> Option<i32> {
        *self.next_offset.lock().await
    }

    /// Poll once and return the deduplicated subscription candidates.
    ///
    /// Provider failures are logged and yield an empty list.
    pub async fn fetch_new_subscribers(&self) -> Vec<Candidate> {
        let mut cursor = self.next_offset.lock().await;
        let pull = self.pull(*cursor).await;
        advance(&mut cursor, pull.next_offset);
        pull.candidates
    }

    /// One reconciliation pass: poll, then merge every candidate into `store`.
    ///
    /// Removed conversations are skipped and existing ones left alone. Fails
    /// with [`Error::PassInFlight`] while another pass is running. The cursor
    /// only advances once every candidate is stored, so a storage failure
    /// replays the same updates on the next pass. After a pass that saw
    /// updates, the new cursor is confirmed to the feed.
    pub async fn reconcile(&self, store: &SubscriberStore) -> Result<ReconcileReport> {
        let Ok(mut cursor) = self.next_offset.try_lock() else {
            warn!("reconciliation requested while a pass is in flight");
            return Err(Error::PassInFlight);
        };

        let pull = self.pull(*cursor).await;
        let mut report = ReconcileReport {
            provider_error: pull.error,
            ..Default::default()
        };

        for candidate in pull.candidates {
            match store
                .upsert_discovered(&candidate.conversation_id, &candidate.display_name)
                .await?
            {
                Upsert::Added(subscriber) => report.added.push(subscriber),
                Upsert::Existing(_) => report.existing.push(candidate.conversation_id),
                Upsert::Removed => report.skipped_removed.push(candidate.conversation_id),
            }
        }
        advance(&mut cursor, pull.next_offset);
        let next_offset = *cursor;
        if pull.next_offset.is_some()
            && let Some(offset) = next_offset
            && let Err(e) = self.feed.acknowledge(offset).await
        {
            warn!(offset, error = %e, "failed to confirm telegram updates");
        }

        info!(
            added = report.added.len(),
            existing = report.existing.len(),
            skipped_removed = report.skipped_removed.len(),
            provider_failed = report.provider_error.is_some(),
            ?next_offset,
            "reconciliation pass finished"
        );
        Ok(report)
    }

    async fn pull(&self, offset: Option<i32>) -> Pull {
        let updates = match self.feed.fetch(offset).await {
            Ok(updates) => updates,
            Err(e) => {
                warn!(?offset, error = %e, "telegram getUpdates failed, cursor unchanged");
                return Pull {
                    candidates: Vec::new(),
                    next_offset: None,
                    error: Some(e.to_string()),
                };
            },
        };

        let next_offset = updates.iter().map(|u| u.id.as_offset()).max();
        let candidates = dedupe(updates.iter().filter_map(|update| {
            extract_candidate(update, self.policy, self.bot_username.as_deref())
        }));
        debug!(
            updates = updates.len(),
            candidates = candidates.len(),
            "polled subscription candidates"
        );
        Pull {
            candidates,
            next_offset,
            error: None,
        }
    }
}

fn advance(cursor: &mut Option<i32>, seen: Option<i32>) {
    if let Some(seen) = seen {
        *cursor = Some(cursor.map_or(seen, |current| current.max(seen)));
    }
}

/// Keep one candidate per conversation, in order of first appearance, with
/// the most recently seen display name.
fn dedupe(candidates: impl IntoIterator<Item = Candidate>) -> Vec<Candidate> {
    let mut unique: Vec<Candidate> = Vec::new();
    for candidate in candidates {
        match unique
            .iter_mut()
            .find(|c| c.conversation_id == candidate.conversation_id)
        {
            Some(seen) => seen.display_name = candidate.display_name,
            None => unique.push(candidate),
        }
    }
    unique
}

/// Map an update to a subscription candidate under `policy`.
pub fn extract_candidate(
    update: &Update,
    policy: SubscriptionPolicy,
    bot_username: Option<&str>,
) -> Option<Candidate> {
    let UpdateKind::Message(msg) = &update.kind else {
        return None;
    };
    if policy == SubscriptionPolicy::StartCommand
        && !msg
            .text()
            .is_some_and(|text| is_start_command(text, bot_username))
    {
        return None;
    }

    let chat = &msg.chat;
    let display_name = chat
        .username()
        .or_else(|| chat.first_name())
        .or_else(|| chat.title())
        .unwrap_or("unknown");
    Some(Candidate {
        conversation_id: chat.id.0.to_string(),
        display_name: display_name.to_string(),
    })
}

/// `/start`, `/start <payload>`, or `/start@<bot>` for this bot.
fn is_start_command(text: &str, bot_username: Option<&str>) -> bool {
    let Some(command) = text.split_whitespace().next() else {
        return false;
    };
    let Some(rest) = command.strip_prefix("/start") else {
        return false;
    };
    if rest.is_empty() {
        return true;
    }
    match (rest.strip_prefix('@'), bot_username) {
        (Some(target), Some(bot)) => target.eq_ignore_ascii_case(bot.trim_start_matches('@')),
        (Some(_), None) => true,
        (None, _) => false,
    }
}
