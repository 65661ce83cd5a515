//! Persistence trait for subscriber state.

use async_trait::async_trait;

use crate::{Result, types::SubscriberState};

/// Persistence backend for the whole subscriber state blob.
///
/// The state is small, so backends load and save it in one piece.
#[async_trait]
pub trait SubscriberBackend: Send + Sync {
    async fn load(&self) -> Result<SubscriberState>;
    async fn save(&self, state: &SubscriberState) -> Result<()>;
}
