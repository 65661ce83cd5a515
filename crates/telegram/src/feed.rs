//! Source of raw provider updates.

use {
    async_trait::async_trait,
    teloxide::{
        prelude::*,
        types::{AllowedUpdate, Update},
    },
    tracing::debug,
};

use crate::Result;

/// Polling endpoint of the messaging provider.
#[async_trait]
pub trait UpdateFeed: Send + Sync {
    /// Fetch updates starting at `offset` (everything unconfirmed when `None`).
    async fn fetch(&self, offset: Option<i32>) -> Result<Vec<Update>>;

    /// Tell the provider every update below `offset` has been handled, so a
    /// fresh process does not start from the same backlog. Feeds that keep no
    /// server-side position need nothing here.
    async fn acknowledge(&self, _offset: i32) -> Result<()> {
        Ok(())
    }
}

/// `getUpdates` over the Telegram Bot API.
pub struct TelegramFeed {
    bot: Bot,
    poll_timeout_secs: u32,
}

impl TelegramFeed {
    pub fn new(bot: Bot, poll_timeout_secs: u32) -> Self {
        Self {
            bot,
            poll_timeout_secs,
        }
    }
}

#[async_trait]
impl UpdateFeed for TelegramFeed {
    async fn fetch(&self, offset: Option<i32>) -> Result<Vec<Update>> {
        let mut request = self
            .bot
            .get_updates()
            .timeout(self.poll_timeout_secs)
            .allowed_updates(vec![AllowedUpdate::Message]);
        if let Some(offset) = offset {
            request = request.offset(offset);
        }
        let updates = request.await?;
        debug!(?offset, count = updates.len(), "got telegram updates");
        Ok(updates)
    }

    /// Telegram confirms everything below the offset of a `getUpdates` call.
    /// The short, one-update request keeps the call from long-polling; what
    /// it returns is not confirmed and is read again by the next fetch.
    async fn acknowledge(&self, offset: i32) -> Result<()> {
        self.bot
            .get_updates()
            .offset(offset)
            .limit(1)
            .timeout(0)
            .allowed_updates(vec![AllowedUpdate::Message])
            .await?;
        debug!(offset, "confirmed telegram updates");
        Ok(())
    }
}
