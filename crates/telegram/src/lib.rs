//! Telegram side of alertcast.
//!
//! Polls the Bot API for conversations that opted in, reconciles them into
//! the subscriber store, and broadcasts alerts to every known conversation.

pub mod bot;
pub mod broadcast;
pub mod config;
pub mod error;
pub mod feed;
pub mod link;
pub mod outbound;
pub mod reconciler;

#[cfg(test)]
pub(crate) mod mock_api;

pub use {
    broadcast::{BroadcastReport, DeliveryFailure, Language, broadcast},
    config::{SubscriptionPolicy, TelegramAccountConfig},
    error::{Error, Result},
    feed::{TelegramFeed, UpdateFeed},
    link::{render_qr, resolve_bot_username, subscribe_link, validate_start_parameter},
    outbound::{MessageSender, TelegramSender},
    reconciler::{Candidate, ReconcileReport, Reconciler},
};
