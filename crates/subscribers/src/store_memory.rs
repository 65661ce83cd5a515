//! In-memory backend for tests and ephemeral runs.

use std::sync::{
    Mutex,
    atomic::{AtomicUsize, Ordering},
};

use async_trait::async_trait;

use crate::{Result, store::SubscriberBackend, types::SubscriberState};

/// Keeps the last saved state in memory. Nothing survives the process.
#[derive(Default)]
pub struct InMemoryBackend {
    state: Mutex<SubscriberState>,
    saves: AtomicUsize,
}

impl InMemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start from a pre-populated state.
    pub fn with_state(state: SubscriberState) -> Self {
        Self {
            state: Mutex::new(state),
            saves: AtomicUsize::new(0),
        }
    }

    /// Number of successful `save` calls so far.
    pub fn save_count(&self) -> usize {
        self.saves.load(Ordering::SeqCst)
    }

    /// Snapshot of what was last saved.
    pub fn snapshot(&self) -> SubscriberState {
        self.state.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }
}

#[async_trait]
impl SubscriberBackend for InMemoryBackend {
    async fn load(&self) -> Result<SubscriberState> {
        Ok(self.snapshot())
    }

    async fn save(&self, state: &SubscriberState) -> Result<()> {
        let mut stored = self.state.lock().unwrap_or_else(|e| e.into_inner());
        *stored = state.clone();
        self.saves.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use {super::*, crate::types::Subscriber};

    #[tokio::test]
    async fn save_replaces_state_and_counts() {
        let backend = InMemoryBackend::new();
        assert_eq!(backend.save_count(), 0);

        let state = SubscriberState {
            subscribers: vec![Subscriber::new(Some("@a".into()), None)],
            removed_subscribers: Vec::new(),
        };
        backend.save(&state).await.unwrap();

        assert_eq!(backend.save_count(), 1);
        assert_eq!(backend.load().await.unwrap(), state);
    }

    #[tokio::test]
    async fn with_state_seeds_load() {
        let state = SubscriberState {
            subscribers: Vec::new(),
            removed_subscribers: vec![Subscriber::new(None, Some("9".into()))],
        };
        let backend = InMemoryBackend::with_state(state.clone());
        assert_eq!(backend.load().await.unwrap(), state);
        assert_eq!(backend.save_count(), 0);
    }
}
