//! Subscriber bookkeeping for alert broadcasts.
//!
//! Holds the active subscriber list plus a denylist of removed subscribers so
//! that feed reconciliation never brings back someone who opted out.
//! Persistent storage at `<data_dir>/subscriber-storage.json`.

pub mod error;
pub mod service;
pub mod store;
pub mod store_file;
pub mod store_memory;
pub mod types;

pub use {
    error::{Error, Result},
    service::{SubscriberStore, Upsert},
    store::SubscriberBackend,
    store_file::FileBackend,
    store_memory::InMemoryBackend,
    types::{Subscriber, SubscriberPatch, SubscriberState, normalize_display_name},
};
