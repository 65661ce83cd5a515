//! The subscriber store: active list, removal denylist, and the mutation
//! paths that keep both consistent.
//!
//! Every mutation runs against a copy of the current state, is saved through
//! the backend, and only then replaces the in-memory state. A failed save
//! therefore changes nothing. Unknown ids are silent no-ops.

use std::sync::Arc;

use {
    tokio::sync::RwLock,
    tracing::{debug, info},
};

use crate::{
    Error, Result,
    store::SubscriberBackend,
    types::{Subscriber, SubscriberPatch, SubscriberState, normalize_display_name},
};

/// Outcome of merging a discovered conversation into the store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Upsert {
    /// New subscriber created with the conversation id attached.
    Added(Subscriber),
    /// An active subscriber already holds this conversation.
    Existing(Subscriber),
    /// The conversation is on the removal denylist and was left alone.
    Removed,
}

/// Whether a mutation has to be persisted.
enum Change<T> {
    Persist(T),
    Unchanged(T),
}

/// Single source of truth for active and removed subscribers.
pub struct SubscriberStore {
    backend: Arc<dyn SubscriberBackend>,
    state: RwLock<SubscriberState>,
}

impl SubscriberStore {
    /// Load the persisted state once and wrap it.
    pub async fn open(backend: Arc<dyn SubscriberBackend>) -> Result<Self> {
        let state = backend.load().await?;
        info!(
            active = state.subscribers.len(),
            removed = state.removed_subscribers.len(),
            "subscriber store loaded"
        );
        Ok(Self {
            backend,
            state: RwLock::new(state),
        })
    }

    async fn mutate<T, F>(&self, apply: F) -> Result<T>
    where
        F: FnOnce(&mut SubscriberState) -> Result<Change<T>>,
    {
        let mut current = self.state.write().await;
        let mut next = current.clone();
        match apply(&mut next)? {
            Change::Unchanged(value) => Ok(value),
            Change::Persist(value) => {
                self.backend.save(&next).await?;
                *current = next;
                Ok(value)
            },
        }
    }

    /// Add a subscriber by hand, or return the one that already matches.
    ///
    /// With a conversation id the match is on that id; without one it is a
    /// case-insensitive match on the normalized display name. An explicit add
    /// for a removed conversation takes it off the denylist.
    pub async fn add_subscriber(
        &self,
        display_name: &str,
        conversation_id: Option<&str>,
    ) -> Result<Subscriber> {
        let name = normalize_display_name(display_name)
            .ok_or_else(|| Error::invalid_input("display name must not be empty"))?;
        let conversation_id = conversation_id
            .map(str::trim)
            .filter(|c| !c.is_empty())
            .map(str::to_owned);

        self.mutate(move |state| {
            let existing = match conversation_id.as_deref() {
                Some(cid) => state.find_by_conversation(cid),
                None => state.find_by_display_name(&name),
            };
            if let Some(existing) = existing {
                debug!(subscriber_id = %existing.id, "subscriber already present");
                return Ok(Change::Unchanged(existing.clone()));
            }

            if let Some(cid) = conversation_id.as_deref()
                && state.forget_removed(cid)
            {
                info!(conversation_id = cid, "removed conversation re-added explicitly");
            }

            let subscriber = Subscriber::new(Some(name), conversation_id);
            info!(
                subscriber_id = %subscriber.id,
                conversation_id = ?subscriber.conversation_id,
                display_name = ?subscriber.display_name,
                "subscriber added"
            );
            state.subscribers.push(subscriber.clone());
            Ok(Change::Persist(subscriber))
        })
        .await
    }

    /// Move a subscriber to the removed set. Returns the removed record, or
    /// `None` when the id is unknown.
    pub async fn remove_subscriber(&self, id: &str) -> Result<Option<Subscriber>> {
        self.mutate(|state| {
            let Some(pos) = state.subscribers.iter().position(|s| s.id == id) else {
                debug!(subscriber_id = id, "remove: unknown subscriber");
                return Ok(Change::Unchanged(None));
            };
            let removed = state.subscribers.remove(pos);
            state.removed_subscribers.push(removed.clone());
            info!(
                subscriber_id = %removed.id,
                conversation_id = ?removed.conversation_id,
                "subscriber removed"
            );
            Ok(Change::Persist(Some(removed)))
        })
        .await
    }

    /// Merge `patch` into the active subscriber with `id`. Returns the updated
    /// record, or `None` when the id is unknown.
    ///
    /// Assigning a removed conversation counts as re-subscribing it and drops
    /// it from the denylist.
    pub async fn update_subscriber(
        &self,
        id: &str,
        patch: SubscriberPatch,
    ) -> Result<Option<Subscriber>> {
        let display_name = match patch.display_name.as_deref() {
            Some(raw) => Some(
                normalize_display_name(raw)
                    .ok_or_else(|| Error::invalid_input("display name must not be empty"))?,
            ),
            None => None,
        };
        let conversation_id = match patch.conversation_id.as_deref().map(str::trim) {
            Some("") => return Err(Error::invalid_input("conversation id must not be empty")),
            other => other.map(str::to_owned),
        };

        self.mutate(move |state| {
            let Some(pos) = state.subscribers.iter().position(|s| s.id == id) else {
                debug!(subscriber_id = id, "update: unknown subscriber");
                return Ok(Change::Unchanged(None));
            };
            if let Some(cid) = conversation_id.as_deref()
                && let Some(other) = state
                    .subscribers
                    .iter()
                    .find(|s| s.id != id && s.has_conversation(cid))
            {
                return Err(Error::conversation_taken(cid, other.id.clone()));
            }

            if let Some(cid) = conversation_id.as_deref()
                && state.forget_removed(cid)
            {
                info!(
                    subscriber_id = id,
                    conversation_id = cid,
                    "removed conversation re-assigned explicitly"
                );
            }

            let subscriber = &mut state.subscribers[pos];
            if let Some(cid) = conversation_id {
                subscriber.conversation_id = Some(cid);
            }
            if let Some(name) = display_name {
                subscriber.display_name = Some(name);
            }
            debug!(subscriber_id = id, "subscriber updated");
            Ok(Change::Persist(Some(subscriber.clone())))
        })
        .await
    }

    /// Whether the conversation is on the removal denylist.
    pub async fn is_removed(&self, conversation_id: &str) -> bool {
        self.state.read().await.is_removed(conversation_id)
    }

    /// Explicitly bring a removed conversation back.
    ///
    /// Drops the conversation from the denylist and creates a fresh subscriber
    /// (new id, new timestamp) named `display_name` or, failing that, after
    /// the last removed record. Returns the active subscriber if one is
    /// already present, and `None` when the conversation was never seen and
    /// no name was given.
    pub async fn resubscribe(
        &self,
        conversation_id: &str,
        display_name: Option<&str>,
    ) -> Result<Option<Subscriber>> {
        let cid = conversation_id.trim();
        if cid.is_empty() {
            return Err(Error::invalid_input("conversation id must not be empty"));
        }
        let name = match display_name {
            Some(raw) => Some(
                normalize_display_name(raw)
                    .ok_or_else(|| Error::invalid_input("display name must not be empty"))?,
            ),
            None => None,
        };

        self.mutate(move |state| {
            if let Some(existing) = state.find_by_conversation(cid).cloned() {
                return Ok(if state.forget_removed(cid) {
                    Change::Persist(Some(existing))
                } else {
                    Change::Unchanged(Some(existing))
                });
            }

            let previous_name = state
                .last_removed(cid)
                .and_then(|s| s.display_name.clone());
            let was_removed = state.forget_removed(cid);
            if !was_removed && name.is_none() {
                debug!(conversation_id = cid, "resubscribe: unknown conversation");
                return Ok(Change::Unchanged(None));
            }

            let subscriber = Subscriber::new(name.or(previous_name), Some(cid.to_string()));
            info!(
                subscriber_id = %subscriber.id,
                conversation_id = cid,
                was_removed,
                "subscriber re-subscribed"
            );
            state.subscribers.push(subscriber.clone());
            Ok(Change::Persist(Some(subscriber)))
        })
        .await
    }

    /// Merge one conversation discovered on the provider feed.
    ///
    /// Never revives a removed conversation and never duplicates an existing
    /// one; creation and identity attachment happen in one step.
    pub async fn upsert_discovered(
        &self,
        conversation_id: &str,
        display_name: &str,
    ) -> Result<Upsert> {
        let cid = conversation_id.trim();
        if cid.is_empty() {
            return Err(Error::invalid_input("conversation id must not be empty"));
        }
        let name = normalize_display_name(display_name);

        self.mutate(move |state| {
            if state.is_removed(cid) {
                debug!(conversation_id = cid, "skipping removed conversation");
                return Ok(Change::Unchanged(Upsert::Removed));
            }
            if let Some(existing) = state.find_by_conversation(cid) {
                return Ok(Change::Unchanged(Upsert::Existing(existing.clone())));
            }
            let subscriber = Subscriber::new(name, Some(cid.to_string()));
            info!(
                subscriber_id = %subscriber.id,
                conversation_id = cid,
                display_name = ?subscriber.display_name,
                "new subscriber discovered"
            );
            state.subscribers.push(subscriber.clone());
            Ok(Change::Persist(Upsert::Added(subscriber)))
        })
        .await
    }

    /// Active subscribers in insertion order.
    pub async fn subscribers(&self) -> Vec<Subscriber> {
        self.state.read().await.subscribers.clone()
    }

    pub async fn removed_subscribers(&self) -> Vec<Subscriber> {
        self.state.read().await.removed_subscribers.clone()
    }

    pub async fn find(&self, id: &str) -> Option<Subscriber> {
        self.state.read().await.find(id).cloned()
    }

    pub async fn find_by_conversation(&self, conversation_id: &str) -> Option<Subscriber> {
        self.state
            .read()
            .await
            .find_by_conversation(conversation_id)
            .cloned()
    }

    /// Distinct conversation ids that a broadcast can reach.
    pub async fn conversation_ids(&self) -> Vec<String> {
        self.state.read().await.conversation_ids()
    }

    pub async fn snapshot(&self) -> SubscriberState {
        self.state.read().await.clone()
    }
}
